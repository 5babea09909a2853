mod render;

pub use render::{run_html, run_url};
