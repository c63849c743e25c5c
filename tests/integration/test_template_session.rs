//! Integration tests for the template session
//!
//! Runs real processes (`cat`, `echo`, `sh`), so only on unix.

#![cfg(unix)]

use scanpane::ansi::AnsiColor;
use scanpane::config::{Config, NoColorMatch};
use scanpane::sinks::CollectingErrorSink;
use scanpane::terminal::RunBuffer;
use scanpane::{Error, TemplateSession};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::timeout;

const TEMPLATE: &str = "id: demo\ninfo:\n  name: Demo\n";

fn session_with_sink(yaml: &str) -> (TemplateSession, CollectingErrorSink) {
    let sink = CollectingErrorSink::new();
    let session = TemplateSession::with_surface(
        Path::new("echo"),
        "http://localhost:8081",
        yaml,
        Config::default(),
        RunBuffer::new(),
        Arc::new(sink.clone()),
    )
    .unwrap();
    (session, sink)
}

async fn run_to_end(session: &mut TemplateSession) -> Option<i32> {
    session.execute().await.unwrap();
    timeout(Duration::from_secs(10), session.wait())
        .await
        .expect("scan should finish")
}

#[tokio::test]
async fn test_default_command_line_runs_tool() {
    let (mut session, sink) = session_with_sink(TEMPLATE);
    let template_path = session.template_path().display().to_string();

    let code = run_to_end(&mut session).await;

    assert_eq!(code, Some(0));
    assert_eq!(
        session.output_text(),
        format!(
            "-v -t {} -u http://localhost:8081\n\nThe process exited with code 0",
            template_path
        )
    );
    assert!(sink.messages().is_empty());
}

#[tokio::test]
async fn test_execute_writes_template_and_renders_it() {
    let (mut session, _sink) = session_with_sink("\x1b[31mred\x1b[0m plain\n");
    let cat = format!("cat {}", session.template_path().display());
    session.set_command_line(cat);

    run_to_end(&mut session).await;

    assert_eq!(
        std::fs::read_to_string(session.template_path()).unwrap(),
        "\x1b[31mred\x1b[0m plain\n"
    );
    let runs = session.output_runs();
    assert_eq!(runs[0].text, "red");
    assert_eq!(runs[0].foreground, Some(AnsiColor::Red));
    assert_eq!(runs[1].text, " plain\n");
    assert!(runs[1].style().is_default());
}

#[tokio::test]
async fn test_edited_template_is_rewritten_on_each_run() {
    let (mut session, _sink) = session_with_sink("first\n");
    let cat = format!("cat {}", session.template_path().display());
    session.set_command_line(cat);

    run_to_end(&mut session).await;
    session.set_template("second\n");
    run_to_end(&mut session).await;

    assert_eq!(
        session.output_text(),
        "second\n\nThe process exited with code 0"
    );
}

#[tokio::test]
async fn test_no_color_flag_renders_plain() {
    let dir = TempDir::new().unwrap();
    let script = dir.path().join("colored.sh");
    std::fs::write(&script, "printf '\\033[1;32mgreen\\033[0m\\n'\n").unwrap();

    let (mut session, _sink) = session_with_sink(TEMPLATE);
    session.set_command_line(format!("sh {} -nc -u x", script.display()));
    assert!(session.is_plain());

    run_to_end(&mut session).await;

    let runs = session.output_runs();
    assert!(runs.iter().all(|run| run.style().is_default()));
    assert!(session.output_text().starts_with("green\n"));
    assert!(session.last_run().unwrap().plain);
}

#[tokio::test]
async fn test_trailing_no_color_depends_on_match_mode() {
    let mut config = Config::default();
    let mut session =
        TemplateSession::new(Path::new("nuclei"), "http://h", TEMPLATE, config.clone()).unwrap();
    session.set_command_line("nuclei -u http://h -nc");
    assert!(!session.is_plain());

    config.output.no_color_match = NoColorMatch::Tokenized;
    let mut session = TemplateSession::new(Path::new("nuclei"), "http://h", TEMPLATE, config).unwrap();
    session.set_command_line("nuclei -u http://h -nc");
    assert!(session.is_plain());
}

#[tokio::test]
async fn test_exit_status_line_can_be_disabled() {
    let mut config = Config::default();
    config.output.show_exit_status = false;
    let mut session = TemplateSession::new(Path::new("echo"), "h", TEMPLATE, config).unwrap();
    session.set_command_line("echo done");

    let code = run_to_end(&mut session).await;
    assert_eq!(code, Some(0));
    assert_eq!(session.output_text(), "done\n");
}

#[tokio::test]
async fn test_new_run_replaces_running_one() {
    let (mut session, _sink) = session_with_sink(TEMPLATE);
    session.set_command_line("sleep 30");
    session.execute().await.unwrap();
    assert!(session.is_running());

    session.set_command_line("echo again");
    let code = timeout(Duration::from_secs(10), async {
        session.execute().await.unwrap();
        session.wait().await
    })
    .await
    .expect("previous scan should be cancelled");

    assert_eq!(code, Some(0));
    assert_eq!(
        session.output_text(),
        "again\n\nThe process exited with code 0"
    );
}

#[tokio::test]
async fn test_close_cancels_and_removes_file() {
    let (mut session, _sink) = session_with_sink(TEMPLATE);
    session.set_command_line("sleep 30");
    session.execute().await.unwrap();
    let canceller = session.canceller().unwrap();

    let path = session.template_path().to_path_buf();
    session.close().unwrap();

    assert!(canceller.is_cancelled());
    assert!(!path.exists());
    assert!(session.close().is_ok());
}

#[tokio::test]
async fn test_close_after_external_removal() {
    let (mut session, sink) = session_with_sink(TEMPLATE);
    std::fs::remove_file(session.template_path()).unwrap();

    assert!(session.close().is_ok());
    assert!(session.close().is_ok());
    assert!(sink.messages().is_empty());
}

#[tokio::test]
async fn test_unwritable_template_path_is_reported() {
    let (mut session, sink) = session_with_sink(TEMPLATE);
    let path = session.template_path().to_path_buf();
    std::fs::remove_file(&path).unwrap();
    std::fs::create_dir(&path).unwrap();

    let result = session.execute().await;
    assert!(matches!(result, Err(Error::TemplateWriteFailed { .. })));

    // A directory in its place cannot be removed as a file either
    let result = session.close();
    assert!(matches!(result, Err(Error::TempFileCleanupFailed { .. })));
    assert_eq!(sink.messages().len(), 2);

    std::fs::remove_dir(&path).unwrap();
}

#[tokio::test]
async fn test_run_record_tracks_exit() {
    let (mut session, _sink) = session_with_sink(TEMPLATE);
    session.set_command_line("sh -c exit");
    run_to_end(&mut session).await;

    let record = session.last_run().unwrap();
    assert_eq!(record.command_line, "sh -c exit");
    assert_eq!(record.exit_code, Some(0));
    assert!(record.finished_at.unwrap() >= record.started_at);
}
