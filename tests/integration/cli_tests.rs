//! Command-line front end over recorded describes and pages

use crate::common::{account, write_describes, write_pages};
use futures::future::AbortHandle;
use serde_json::json;
use soqlx::cli::{CompleteArgs, ExportArgs, OutputFormat, run_complete, run_export_command};
use soqlx::config::Settings;
use tempfile::TempDir;

fn complete_args(dir: &TempDir, query: &str) -> CompleteArgs {
    CompleteArgs {
        describe_dir: dir.path().to_path_buf(),
        query: query.to_string(),
        cursor: None,
        selection_end: None,
        tooling: false,
        query_all: false,
        ctrl_space: false,
        pages: None,
    }
}

fn export_args(pages: &TempDir, query: &str, format: OutputFormat) -> ExportArgs {
    ExportArgs {
        pages: pages.path().to_path_buf(),
        query: query.to_string(),
        describe_dir: None,
        format,
        filter: None,
        delimiter: None,
        tooling: false,
        query_all: false,
    }
}

fn two_pages(dir: &TempDir) {
    write_pages(
        dir.path(),
        &[
            json!({"totalSize": 3, "done": false, "records": [account("001", "Acme"), account("002", "Globex")]}),
            json!({"totalSize": 3, "done": true, "records": [account("003", "Acme Labs")]}),
        ],
    );
}

#[tokio::test]
async fn test_complete_prints_suggestions() {
    let dir = TempDir::new().unwrap();
    write_describes(dir.path());
    let output = run_complete(&complete_args(&dir, "SELECT Id FROM Gr"), Settings::default())
        .await
        .unwrap();
    assert_eq!(output.stdout, "Objects suggestions:\n  Group\n");
    assert!(output.status.is_empty());
}

#[tokio::test]
async fn test_complete_rejects_cursor_past_end() {
    let dir = TempDir::new().unwrap();
    let mut args = complete_args(&dir, "SELECT");
    args.cursor = Some(20);
    assert!(run_complete(&args, Settings::default()).await.is_err());
}

#[tokio::test]
async fn test_complete_reports_rewritten_query() {
    let dir = TempDir::new().unwrap();
    write_describes(dir.path());
    let mut args = complete_args(&dir, "SELECT  FROM Group");
    args.cursor = Some(7);
    args.ctrl_space = true;
    let output = run_complete(&args, Settings::default()).await.unwrap();
    assert_eq!(output.status, vec!["Query: SELECT Id, Name FROM Group"]);
}

#[tokio::test]
async fn test_export_csv_with_settings_separator() {
    let pages = TempDir::new().unwrap();
    two_pages(&pages);
    let settings = Settings {
        csv_separator: ";".to_string(),
        display_performance: false,
        ..Settings::default()
    };
    let args = export_args(&pages, "SELECT Id, Name FROM Account", OutputFormat::Csv);
    let output = run_export_command(&args, settings, None).await.unwrap();

    let lines: Vec<&str> = output.stdout.split("\r\n").collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "\"_\";\"Id\";\"Name\"");
    assert_eq!(output.status, vec!["Exported 3 records"]);
    assert!(!output.failed);
}

#[tokio::test]
async fn test_export_filter_and_preview() {
    let pages = TempDir::new().unwrap();
    two_pages(&pages);
    let mut args = export_args(&pages, "SELECT Id, Name FROM Account", OutputFormat::Preview);
    args.filter = Some("acme".to_string());
    let output = run_export_command(&args, Settings::default(), None).await.unwrap();

    assert_eq!(output.status[0], "Filtered 2 records out of 3 records");
    let lines: Vec<&str> = output.stdout.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "Id   | Name");
    assert_eq!(lines[3], "003  | Acme Labs");
}

#[tokio::test]
async fn test_export_aborted_before_start() {
    let pages = TempDir::new().unwrap();
    two_pages(&pages);
    let (handle, registration) = AbortHandle::new_pair();
    handle.abort();
    let args = export_args(&pages, "SELECT Id FROM Account", OutputFormat::Json);
    let output = run_export_command(&args, Settings::default(), Some(registration))
        .await
        .unwrap();
    assert_eq!(output.status[0], "No data exported.");
    assert_eq!(output.stdout, "[]");
    assert!(!output.failed);
}

#[tokio::test]
async fn test_export_remote_error_fails() {
    let pages = TempDir::new().unwrap();
    write_pages(
        pages.path(),
        &[json!([{"message": "unexpected token: FORM", "errorCode": "MALFORMED_QUERY"}])],
    );
    let args = export_args(&pages, "SELECT Id FORM Account", OutputFormat::Csv);
    let output = run_export_command(&args, Settings::default(), None).await.unwrap();
    assert_eq!(output.status[..2], ["Error", "unexpected token: FORM"]);
    assert!(output.stdout.is_empty());
    assert!(output.failed);
}
