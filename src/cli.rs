use clap::{Args, Parser, Subcommand, ValueEnum};
use pagepress_lib::Viewport;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pagepress")]
#[command(
    version,
    about = "pagepress - Render HTML documents or web pages to PDF with headless Chromium",
    long_about = "pagepress\n\nModes:\n- html: render an HTML file (or stdin) with optional print options.\n- url: navigate to a page, wait for the network to settle, and print it.\n\nThe PDF is written to --output; a JSON summary (or error payload) goes to stdout."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Optional config file (TOML) for launch, timeout and settle defaults; CLI flags override config"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render an HTML document to PDF
    Html {
        #[arg(long, short, value_name = "FILE|-", help = "HTML file to render ('-' reads stdin)")]
        input: PathBuf,

        #[arg(
            long,
            value_name = "JSON",
            help = "JSON file with print options (marginTop, format, scale, headerTemplate, ...)"
        )]
        options: Option<PathBuf>,

        #[arg(long, short, value_name = "PDF", help = "Where to write the PDF")]
        output: PathBuf,

        #[command(flatten)]
        engine: EngineArgs,

        #[arg(long, value_enum, default_value = "json", help = "Summary format")]
        format: OutputFormat,
    },

    /// Render a web page to PDF
    Url {
        #[arg(long, help = "Absolute http(s), file or data URL")]
        url: String,

        #[arg(long, short, value_name = "PDF", help = "Where to write the PDF")]
        output: PathBuf,

        #[command(flatten)]
        engine: EngineArgs,

        #[arg(long, value_enum, default_value = "json", help = "Summary format")]
        format: OutputFormat,
    },
}

/// Engine flags shared by both modes. Unset flags fall back to the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct EngineArgs {
    #[arg(long, value_name = "SECS", help = "Navigation timeout in seconds (URL mode)")]
    pub nav_timeout: Option<u64>,

    #[arg(long, value_name = "SECS", help = "PDF export timeout in seconds")]
    pub export_timeout: Option<u64>,

    #[arg(long, value_name = "PATH", help = "Chromium/Chrome executable")]
    pub chrome: Option<PathBuf>,

    #[arg(long, help = "Show the browser window instead of running headless")]
    pub headful: bool,

    #[arg(long, help = "Viewport dimensions (WIDTHxHEIGHT)")]
    pub viewport: Option<Viewport>,
}

#[derive(Clone, Copy, Debug, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Json,
    Pretty,
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands, OutputFormat};
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn html_command_uses_defaults() {
        let cli = Cli::parse_from(["pagepress", "html", "--input", "page.html", "--output", "out.pdf"]);

        assert!(!cli.verbose);
        assert!(cli.config.is_none());

        match cli.command {
            Commands::Html {
                input,
                options,
                output,
                engine,
                format,
            } => {
                assert_eq!(input, PathBuf::from("page.html"));
                assert!(options.is_none());
                assert_eq!(output, PathBuf::from("out.pdf"));
                assert!(engine.nav_timeout.is_none());
                assert!(engine.export_timeout.is_none());
                assert!(!engine.headful);
                assert_eq!(format, OutputFormat::Json);
            }
            _ => panic!("expected html command"),
        }
    }

    #[test]
    fn url_command_parses_engine_flags() {
        let cli = Cli::parse_from([
            "pagepress",
            "--verbose",
            "url",
            "--url",
            "https://example.com",
            "-o",
            "page.pdf",
            "--nav-timeout",
            "20",
            "--export-timeout",
            "90",
            "--chrome",
            "/usr/bin/chromium",
            "--headful",
            "--viewport",
            "1024x768",
            "--format",
            "pretty",
        ]);

        assert!(cli.verbose);
        match cli.command {
            Commands::Url {
                url,
                output,
                engine,
                format,
            } => {
                assert_eq!(url, "https://example.com");
                assert_eq!(output, PathBuf::from("page.pdf"));
                assert_eq!(engine.nav_timeout, Some(20));
                assert_eq!(engine.export_timeout, Some(90));
                assert_eq!(engine.chrome, Some(PathBuf::from("/usr/bin/chromium")));
                assert!(engine.headful);
                assert_eq!(engine.viewport.map(|v| v.width), Some(1024));
                assert_eq!(format, OutputFormat::Pretty);
            }
            _ => panic!("expected url command"),
        }
    }

    #[test]
    fn output_is_required() {
        assert!(Cli::try_parse_from(["pagepress", "url", "--url", "https://example.com"]).is_err());
    }

    #[test]
    fn bad_viewport_is_rejected() {
        assert!(Cli::try_parse_from([
            "pagepress",
            "url",
            "--url",
            "https://example.com",
            "-o",
            "x.pdf",
            "--viewport",
            "wide"
        ])
        .is_err());
    }
}
