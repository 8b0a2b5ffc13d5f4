//! Common test utilities and helpers
//!
//! Recorded describes for a small org (Account, Contact, User, Group, Task,
//! Case) and a scripted query executor.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::future::AbortHandle;
use serde_json::{Value, json};
use soqlx::api::{QueryBatch, QueryExecutor, QueryMode};
use soqlx::app::{AppEvent, Driver, Session};
use soqlx::config::Settings;
use soqlx::error::{QueryError, QueryResult};
use soqlx::metadata::DirectoryMetadataProvider;
use soqlx::query::QuerySpan;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;

fn field(name: &str, label: &str, field_type: &str) -> Value {
    json!({"name": name, "label": label, "type": field_type, "nillable": false})
}

fn lookup(name: &str, label: &str, relationship: &str, targets: &[&str]) -> Value {
    json!({
        "name": name,
        "label": label,
        "type": "reference",
        "nillable": true,
        "relationshipName": relationship,
        "referenceTo": targets,
    })
}

fn picklist(name: &str, label: &str, values: &[&str]) -> Value {
    let entries: Vec<Value> = values
        .iter()
        .map(|v| json!({"value": v, "label": v}))
        .collect();
    json!({
        "name": name,
        "label": label,
        "type": "picklist",
        "nillable": true,
        "picklistValues": entries,
    })
}

fn global() -> Value {
    let queryable = |name: &str, label: &str| json!({"name": name, "label": label, "queryable": true});
    json!({
        "sobjects": [
            queryable("Account", "Account"),
            queryable("Case", "Case"),
            queryable("Contact", "Contact"),
            queryable("Group", "Group"),
            queryable("Task", "Task"),
            queryable("User", "User"),
            {"name": "AccountFeed", "label": "Account Feed", "queryable": false},
        ]
    })
}

fn sobjects() -> Vec<Value> {
    vec![
        json!({
            "name": "Account",
            "label": "Account",
            "fields": [
                field("Id", "Account ID", "id"),
                field("Name", "Account Name", "string"),
                picklist("Type", "Account Type", &["Customer", "Partner", "Prospect"]),
                picklist("Industry", "Industry", &["Banking", "Energy"]),
                lookup("OwnerId", "Owner ID", "Owner", &["User"]),
                field("IsDeleted", "Deleted", "boolean"),
                field("CreatedDate", "Created Date", "datetime"),
            ],
            "childRelationships": [
                {"relationshipName": "Contacts", "childSObject": "Contact", "field": "AccountId"},
                {"relationshipName": "Cases", "childSObject": "Case", "field": "AccountId"},
                {"relationshipName": null, "childSObject": "AccountFeed", "field": "ParentId"},
            ],
        }),
        json!({
            "name": "Contact",
            "label": "Contact",
            "fields": [
                field("Id", "Contact ID", "id"),
                field("LastName", "Last Name", "string"),
                lookup("AccountId", "Account ID", "Account", &["Account"]),
                {"name": "Birthdate", "label": "Birthdate", "type": "date", "nillable": true},
                lookup("OwnerId", "Owner ID", "Owner", &["User"]),
            ],
        }),
        json!({
            "name": "User",
            "label": "User",
            "fields": [
                field("Id", "User ID", "id"),
                field("Name", "Full Name", "string"),
                field("Username", "Username", "string"),
            ],
        }),
        json!({
            "name": "Group",
            "label": "Group",
            "fields": [field("Id", "Group ID", "id"), field("Name", "Name", "string")],
        }),
        json!({
            "name": "Task",
            "label": "Task",
            "fields": [
                field("Id", "Activity ID", "id"),
                field("Subject", "Subject", "string"),
                lookup("WhoId", "Name ID", "Who", &["Contact"]),
                lookup("WhatId", "Related To ID", "What", &["Account", "Case"]),
                lookup("OwnerId", "Assigned To ID", "Owner", &["User", "Group"]),
            ],
        }),
        json!({
            "name": "Case",
            "label": "Case",
            "fields": [
                field("Id", "Case ID", "id"),
                field("Subject", "Subject", "string"),
                picklist("Status", "Status", &["New", "Closed"]),
                lookup("AccountId", "Account ID", "Account", &["Account"]),
            ],
        }),
    ]
}

fn write_json(path: &Path, value: &Value) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

/// Write the recorded describes under `dir`
pub fn write_describes(dir: &Path) {
    write_json(&dir.join("global.json"), &global());
    for sobject in sobjects() {
        let name = sobject["name"].as_str().unwrap().to_string();
        write_json(&dir.join("sobjects").join(format!("{name}.json")), &sobject);
    }
}

/// Temporary describe directory
pub fn describe_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_describes(dir.path());
    dir
}

/// Write `page-N.json` files under `dir`
pub fn write_pages(dir: &Path, pages: &[Value]) {
    for (i, page) in pages.iter().enumerate() {
        write_json(&dir.join(format!("page-{i}.json")), page);
    }
}

pub fn account(id: &str, name: &str) -> Value {
    json!({
        "attributes": {"type": "Account", "url": format!("/services/data/v59.0/sobjects/Account/{id}")},
        "Id": id,
        "Name": name,
    })
}

/// One page of a paginated result
pub fn batch(records: Vec<Value>, total_size: i64, next: Option<&str>) -> QueryBatch {
    QueryBatch {
        records,
        search_records: Vec::new(),
        done: next.is_none(),
        total_size,
        next_records_url: next.map(str::to_string),
    }
}

/// Executor answering from a scripted list of pages
#[derive(Default)]
pub struct ScriptedExecutor {
    pages: Mutex<VecDeque<QueryResult<QueryBatch>>>,
    queries: Mutex<Vec<(QueryMode, String)>>,
    abort_on_next: Mutex<Option<AbortHandle>>,
}

impl ScriptedExecutor {
    pub fn new(pages: Vec<QueryResult<QueryBatch>>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            ..Default::default()
        }
    }

    /// Abort through `handle` when the second page is requested
    pub fn abort_on_next(self, handle: AbortHandle) -> Self {
        *self.abort_on_next.lock().unwrap() = Some(handle);
        self
    }

    pub fn queries(&self) -> Vec<(QueryMode, String)> {
        self.queries.lock().unwrap().clone()
    }

    fn pop(&self) -> QueryResult<QueryBatch> {
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(QueryError::RemoteFailure("no more pages".to_string())))
    }
}

#[async_trait]
impl QueryExecutor for ScriptedExecutor {
    async fn query(&self, mode: QueryMode, query: &str) -> QueryResult<QueryBatch> {
        self.queries.lock().unwrap().push((mode, query.to_string()));
        self.pop()
    }

    async fn next_batch(&self, _next_records_url: &str) -> QueryResult<QueryBatch> {
        let handle = self.abort_on_next.lock().unwrap().take();
        if let Some(handle) = handle {
            handle.abort();
            tokio::task::yield_now().await;
        }
        self.pop()
    }
}

/// Session with `text` edited at `cursor`, driven until idle
pub async fn complete_at(
    describes: &Path,
    executor: &dyn QueryExecutor,
    text: &str,
    cursor: usize,
    ctrl_space: bool,
) -> Session {
    let provider = DirectoryMetadataProvider::new(describes);
    let driver = Driver::new(&provider, executor);
    let mut session = Session::new(Settings::default());
    let actions = session.handle_event(AppEvent::Edit(QuerySpan::cursor(text, cursor)));
    driver.run(&mut session, actions, None).await;
    if ctrl_space {
        let actions = session.handle_event(AppEvent::CtrlSpace);
        driver.run(&mut session, actions, None).await;
    }
    session
}

/// Completion with the cursor at the end of `text`
pub async fn complete(describes: &Path, text: &str) -> Session {
    let executor = ScriptedExecutor::default();
    complete_at(describes, &executor, text, text.len(), false).await
}

/// Values of the current suggestions
pub fn values(session: &Session) -> Vec<String> {
    session
        .completer
        .suggestions()
        .map(|set| set.results.iter().map(|s| s.value.clone()).collect())
        .unwrap_or_default()
}

pub fn title(session: &Session) -> String {
    session
        .completer
        .suggestions()
        .map(|set| set.title.clone())
        .unwrap_or_default()
}
