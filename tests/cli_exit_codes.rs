use std::path::Path;
use std::process::{Command, Output};

use pagepress_lib::PressOutput;
use tempfile::TempDir;

const SHORT_HTML: &str = "<html><body>short</body></html>";

fn pagepress(envs: &[(&str, &str)]) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_pagepress"));
    cmd.env_remove("PAGEPRESS_CONFIG")
        .env_remove("PAGEPRESS_MOCK_STATUS")
        .env_remove("PAGEPRESS_MOCK_NAV_ERROR")
        .env_remove("PAGEPRESS_MOCK_LAUNCH_ERROR")
        .env("PAGEPRESS_MOCK_ENGINE", "1");
    for (key, value) in envs {
        cmd.env(key, value);
    }
    cmd
}

fn run(cmd: &mut Command) -> Output {
    cmd.output().expect("run pagepress")
}

fn parse_json(stdout: &[u8]) -> PressOutput {
    serde_json::from_slice(stdout).expect("output should be valid JSON")
}

fn write_html(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("page.html");
    std::fs::write(&path, SHORT_HTML).expect("write html");
    path
}

#[test]
fn html_render_writes_pdf_and_summary() {
    let dir = TempDir::new().expect("tempdir");
    let input = write_html(dir.path());
    let pdf = dir.path().join("page.pdf");

    let output = run(pagepress(&[]).args([
        "html",
        "--input",
        input.to_str().unwrap(),
        "--output",
        pdf.to_str().unwrap(),
    ]));
    assert_eq!(output.status.code(), Some(0), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let bytes = std::fs::read(&pdf).expect("pdf written");
    assert!(bytes.starts_with(b"%PDF"));
    match parse_json(&output.stdout) {
        PressOutput::Render(summary) => {
            assert_eq!(summary.bytes, bytes.len());
            assert_eq!(summary.media_type, "application/pdf");
        }
        other => panic!("expected render output, got {other:?}"),
    }
}

#[test]
fn html_options_file_selects_paper_size() {
    let dir = TempDir::new().expect("tempdir");
    let input = write_html(dir.path());
    let options = dir.path().join("options.json");
    std::fs::write(&options, r#"{"format":"Letter","marginTop":"1in","scale":0}"#)
        .expect("write options");
    let pdf = dir.path().join("letter.pdf");

    let output = run(pagepress(&[]).args([
        "html",
        "--input",
        input.to_str().unwrap(),
        "--options",
        options.to_str().unwrap(),
        "--output",
        pdf.to_str().unwrap(),
    ]));
    assert_eq!(output.status.code(), Some(0));

    let text = String::from_utf8(std::fs::read(&pdf).expect("pdf written")).expect("ascii pdf");
    assert!(text.contains("/MediaBox [0 0 612 792]"), "letter size: {text}");
}

#[test]
fn empty_html_is_bad_request() {
    let dir = TempDir::new().expect("tempdir");
    let input = dir.path().join("empty.html");
    std::fs::write(&input, "").expect("write html");
    let pdf = dir.path().join("empty.pdf");

    let output = run(pagepress(&[]).args([
        "html",
        "--input",
        input.to_str().unwrap(),
        "--output",
        pdf.to_str().unwrap(),
    ]));

    assert_eq!(output.status.code(), Some(2));
    assert!(!pdf.exists());
    match parse_json(&output.stdout) {
        PressOutput::Error(err) => assert_eq!(err.error.http_status, Some(400)),
        other => panic!("expected error output, got {other:?}"),
    }
}

#[test]
fn relative_url_is_bad_request() {
    let dir = TempDir::new().expect("tempdir");
    let pdf = dir.path().join("page.pdf");

    let output = run(pagepress(&[]).args(["url", "--url", "not a url", "-o", pdf.to_str().unwrap()]));

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn remote_not_found_exits_with_transport_class() {
    let dir = TempDir::new().expect("tempdir");
    let pdf = dir.path().join("page.pdf");

    let output = run(pagepress(&[("PAGEPRESS_MOCK_STATUS", "404")]).args([
        "url",
        "--url",
        "https://example.com/missing",
        "-o",
        pdf.to_str().unwrap(),
    ]));

    assert_eq!(output.status.code(), Some(3));
    match parse_json(&output.stdout) {
        PressOutput::Error(err) => {
            assert_eq!(err.error.http_status, Some(404));
            assert!(err.error.message.contains("404"));
        }
        other => panic!("expected error output, got {other:?}"),
    }
}

#[test]
fn unreachable_host_exits_with_transport_class() {
    let dir = TempDir::new().expect("tempdir");
    let pdf = dir.path().join("page.pdf");

    let output = run(pagepress(&[("PAGEPRESS_MOCK_NAV_ERROR", "net::ERR_NAME_NOT_RESOLVED")]).args([
        "url",
        "--url",
        "https://no-such-host.invalid",
        "-o",
        pdf.to_str().unwrap(),
    ]));

    assert_eq!(output.status.code(), Some(3));
    match parse_json(&output.stdout) {
        PressOutput::Error(err) => assert_eq!(err.error.http_status, Some(500)),
        other => panic!("expected error output, got {other:?}"),
    }
}

#[test]
fn launch_failure_exits_with_engine_class() {
    let dir = TempDir::new().expect("tempdir");
    let pdf = dir.path().join("page.pdf");

    let output = run(pagepress(&[("PAGEPRESS_MOCK_LAUNCH_ERROR", "cannot fork")]).args([
        "url",
        "--url",
        "https://example.com",
        "-o",
        pdf.to_str().unwrap(),
    ]));

    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn invalid_config_exits_with_config_class() {
    let dir = TempDir::new().expect("tempdir");
    let cfg = dir.path().join("pagepress.toml");
    std::fs::write(&cfg, "[settle]\nceiling_fraction = 3.0\n").expect("write config");
    let pdf = dir.path().join("page.pdf");

    let output = run(pagepress(&[]).args([
        "url",
        "--url",
        "https://example.com",
        "-o",
        pdf.to_str().unwrap(),
        "--config",
        cfg.to_str().unwrap(),
    ]));

    assert_eq!(output.status.code(), Some(2));
    match parse_json(&output.stdout) {
        PressOutput::Error(err) => assert!(err.error.message.contains("ceiling_fraction")),
        other => panic!("expected error output, got {other:?}"),
    }
}

#[test]
fn config_file_is_found_through_env_var() {
    let dir = TempDir::new().expect("tempdir");
    let cfg = dir.path().join("pagepress.toml");
    std::fs::write(&cfg, "[timeouts]\nnavigation = \"0s\"\n").expect("write config");
    let pdf = dir.path().join("page.pdf");

    let output = run(pagepress(&[("PAGEPRESS_CONFIG", cfg.to_str().unwrap())]).args([
        "url",
        "--url",
        "https://example.com",
        "-o",
        pdf.to_str().unwrap(),
    ]));

    assert_eq!(output.status.code(), Some(2));
}
