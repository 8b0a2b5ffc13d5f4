//! Export flow: pagination, cancellation and partial failures

use crate::common::{ScriptedExecutor, account, batch};
use futures::future::AbortHandle;
use serde_json::json;
use soqlx::api::{ExportStatus, QueryMode, run_export};
use soqlx::app::{AppEvent, Driver, Session};
use soqlx::config::Settings;
use soqlx::error::QueryError;
use soqlx::export::ExportFormat;
use soqlx::metadata::DirectoryMetadataProvider;
use soqlx::query::{QuerySpan, extract_columns};
use soqlx::table::RecordTable;

fn table_for(query: &str) -> RecordTable {
    RecordTable::new(extract_columns(query))
}

#[tokio::test]
async fn test_pages_are_merged_in_order() {
    let query = "SELECT Id, Name FROM Account";
    let executor = ScriptedExecutor::new(vec![
        Ok(batch(vec![account("001", "Acme"), account("002", "Globex")], 5, Some("/next/1"))),
        Ok(batch(vec![account("003", "Initech"), account("004", "Umbrella")], 5, Some("/next/2"))),
        Ok(batch(vec![account("005", "Hooli")], 5, None)),
    ]);
    let mut table = table_for(query);
    let mut progress = Vec::new();
    let (_handle, registration) = AbortHandle::new_pair();

    let report = run_export(
        &executor,
        QueryMode::Query,
        query,
        &mut table,
        registration,
        |status| progress.push(status.to_string()),
    )
    .await;

    assert_eq!(report.status, ExportStatus::Completed { exported: 5, total: 5 });
    assert_eq!(report.status.to_string(), "Exported 5 records");
    assert_eq!(
        progress,
        vec![
            "Exporting...",
            "Exporting... Completed 2 of 5 records.",
            "Exporting... Completed 4 of 5 records.",
            "Exported 5 records",
        ]
    );
    let perf = report.timer.summary().unwrap();
    assert!(perf.text.starts_with("3 Batches / "));
    let ids: Vec<Option<&str>> = (0..5)
        .map(|i| table.row(i).and_then(|row| row[1].as_deref()))
        .collect();
    assert_eq!(ids, vec![Some("001"), Some("002"), Some("003"), Some("004"), Some("005")]);
}

#[tokio::test]
async fn test_abort_keeps_merged_records() {
    let query = "SELECT Id, Name FROM Account";
    let (handle, registration) = AbortHandle::new_pair();
    let executor = ScriptedExecutor::new(vec![
        Ok(batch(vec![account("001", "Acme"), account("002", "Globex")], 5, Some("/next/1"))),
        Ok(batch(vec![account("003", "Initech")], 5, None)),
    ])
    .abort_on_next(handle);
    let mut table = table_for(query);

    let report = run_export(&executor, QueryMode::Query, query, &mut table, registration, |_| {}).await;

    assert_eq!(report.status, ExportStatus::Completed { exported: 2, total: 5 });
    assert_eq!(report.status.to_string(), "Exported 2 of 5 records");
    assert_eq!(table.record_count(), 2);
}

#[tokio::test]
async fn test_error_after_first_page_stops_export() {
    let query = "SELECT Id, Name FROM Account";
    let executor = ScriptedExecutor::new(vec![
        Ok(batch(vec![account("001", "Acme"), account("002", "Globex")], 4, Some("/next/1"))),
        Err(QueryError::RemoteFailure("QUERY_TIMEOUT".to_string())),
    ]);
    let mut table = table_for(query);
    let (_handle, registration) = AbortHandle::new_pair();

    let report = run_export(&executor, QueryMode::Query, query, &mut table, registration, |_| {}).await;

    assert_eq!(
        report.status.to_string(),
        "Exported 2 of 4 records. Stopped by error."
    );
    assert_eq!(table.record_count(), 2);
}

#[tokio::test]
async fn test_first_page_error_fails_the_session_export() {
    let dir = tempfile::TempDir::new().unwrap();
    let provider = DirectoryMetadataProvider::new(dir.path());
    let executor = ScriptedExecutor::new(vec![Err(QueryError::RemoteFailure(
        "unexpected token: FORM".to_string(),
    ))]);
    let driver = Driver::new(&provider, &executor);
    let mut session = Session::new(Settings::default());
    session.handle_event(AppEvent::Edit(QuerySpan::at_end("SELECT Id FORM Account")));

    let actions = session.handle_event(AppEvent::Export);
    driver.run(&mut session, actions, None).await;

    assert!(!session.is_exporting());
    assert_eq!(session.status(), "Error");
    assert_eq!(session.export_error(), Some("unexpected token: FORM"));
    assert!(session.table().is_none());
}

#[tokio::test]
async fn test_session_export_uses_query_all_endpoint() {
    let dir = tempfile::TempDir::new().unwrap();
    let provider = DirectoryMetadataProvider::new(dir.path());
    let executor = ScriptedExecutor::new(vec![Ok(batch(vec![account("001", "Acme")], 1, None))]);
    let driver = Driver::new(&provider, &executor);
    let mut session = Session::new(Settings::default());
    session.handle_event(AppEvent::ToggleQueryAll(true));
    session.handle_event(AppEvent::Edit(QuerySpan::at_end("SELECT Id, Name FROM Account")));

    let actions = session.handle_event(AppEvent::Export);
    driver.run(&mut session, actions, None).await;

    assert_eq!(executor.queries()[0].0, QueryMode::QueryAll);
    assert_eq!(session.status(), "Exported 1 record");
    assert!(session.perf().is_some());
    assert!(session.can_delete());
}

#[tokio::test]
async fn test_search_results_count_as_total() {
    let query = "FIND {acme} RETURNING Account(Id, Name)";
    let page = soqlx::api::QueryBatch {
        records: Vec::new(),
        search_records: vec![account("001", "Acme"), account("002", "Acme Corp")],
        done: true,
        total_size: -1,
        next_records_url: None,
    };
    let executor = ScriptedExecutor::new(vec![Ok(page)]);
    let mut table = RecordTable::default();
    let (_handle, registration) = AbortHandle::new_pair();

    let report = run_export(&executor, QueryMode::Search, query, &mut table, registration, |_| {}).await;

    assert_eq!(report.status, ExportStatus::Completed { exported: 2, total: 2 });
    assert_eq!(executor.queries()[0].0, QueryMode::Search);
}

#[test]
fn test_columns_follow_select_list_then_discovery() {
    let mut table = table_for("SELECT Name, Id FROM Account");
    table.add_batch(&[json!({"attributes": {"type": "Account"}, "Id": "001", "Name": "Acme"})]);
    table.add_batch(&[json!({
        "attributes": {"type": "Account"},
        "Id": "002",
        "Name": "Globex",
        "Industry": "Energy",
    })]);

    assert_eq!(table.header(), vec!["_", "Name", "Id", "Industry"]);
    // Rows merged before a column appeared are padded
    assert_eq!(table.row(0).unwrap().len(), 4);
    assert_eq!(table.row(0).unwrap()[3], None);
    assert_eq!(table.row(1).unwrap()[3].as_deref(), Some("Energy"));
}

#[test]
fn test_relationship_columns_are_flattened() {
    let mut table = table_for("SELECT Id, Owner.Name FROM Account");
    table.add_batch(&[json!({
        "attributes": {"type": "Account"},
        "Id": "001",
        "Owner": {"attributes": {"type": "User"}, "Name": "Ada"},
    })]);
    let name = table.column_index("Owner.Name").unwrap();
    assert_eq!(table.row(0).unwrap()[name].as_deref(), Some("Ada"));
}

#[test]
fn test_filter_is_idempotent() {
    let mut table = table_for("SELECT Id, Name FROM Account");
    table.add_batch(&[account("001", "Acme"), account("002", "Globex"), account("003", "ACME Labs")]);

    table.set_filter("acme");
    let first = table.visible_table();
    let status = table.filter_status();
    table.set_filter("acme");
    assert_eq!(table.visible_table(), first);
    assert_eq!(table.filter_status(), status);
    assert_eq!(status, "Filtered 2 records out of 3 records");
    assert_eq!(first.len(), 3);
}

#[test]
fn test_csv_rows_split_on_crlf() {
    let mut table = table_for("SELECT Id, Name FROM Account");
    table.add_batch(&[
        account("001", "Line one\nline two"),
        account("002", "Plain"),
    ]);
    let csv = ExportFormat::Csv.serialize(&table, ',');
    let lines: Vec<&str> = csv.split("\r\n").collect();
    // Embedded newlines stay inside their quoted cell
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1], "\"[Account]\",\"001\",\"Line one\nline two\"");
}

#[test]
fn test_declared_order_survives_record_key_order() {
    let first = json!({"attributes": {"type": "Account"}, "Name": "Acme", "Id": "001", "Site": "HQ"});
    let second = json!({"attributes": {"type": "Account"}, "Id": "002", "Name": "Globex"});

    let mut forward = table_for("SELECT Id, Name FROM Account");
    forward.add_batch(&[first.clone(), second.clone()]);
    let mut reverse = table_for("SELECT Id, Name FROM Account");
    reverse.add_batch(&[second, first]);

    assert_eq!(forward.header()[..3], ["_", "Id", "Name"]);
    assert_eq!(reverse.header()[..3], ["_", "Id", "Name"]);
}

#[test]
fn test_serialized_cells_round_trip() {
    let mut table = table_for("SELECT Id, Name FROM Account");
    table.add_batch(&[account("001", "Smith, \"Jr\""), account("002", "a;b")]);
    let text = table.serialize(',');

    let parsed: Vec<Vec<String>> = text
        .split("\r\n")
        .map(|line| {
            let inner = line.strip_prefix('"').unwrap().strip_suffix('"').unwrap();
            inner
                .split("\",\"")
                .map(|cell| cell.replace("\"\"", "\""))
                .collect()
        })
        .collect();
    assert_eq!(parsed, table.visible_table());
    assert_eq!(parsed[1][2], "Smith, \"Jr\"");
}
