//! End-to-end completion against recorded describes
//!
//! Each test drives a session until every metadata fetch it queued has been
//! answered, then inspects the final suggestion set.

use crate::common::{ScriptedExecutor, batch, complete, complete_at, describe_dir, title, values};
use serde_json::json;
use soqlx::api::QueryMode;
use soqlx::app::{Action, AppEvent, Driver, Session};
use soqlx::config::Settings;
use soqlx::metadata::DirectoryMetadataProvider;
use soqlx::query::{QuerySpan, SuggestionKind};

#[tokio::test]
async fn test_objects_after_from() {
    let dir = describe_dir();
    let session = complete(dir.path(), "SELECT Id FROM ").await;
    assert_eq!(title(&session), "Objects suggestions:");
    // Non-queryable objects are left out
    assert_eq!(
        values(&session),
        vec!["Account", "Case", "Contact", "Group", "Task", "User"]
    );
}

#[tokio::test]
async fn test_objects_ranked_by_prefix() {
    let dir = describe_dir();
    let session = complete(dir.path(), "SELECT Id FROM Co").await;
    assert_eq!(values(&session), vec!["Contact", "Account"]);
}

#[tokio::test]
async fn test_fields_in_select_list() {
    let dir = describe_dir();
    let executor = ScriptedExecutor::default();
    let session = complete_at(dir.path(), &executor, "SELECT Ow FROM Account", 9, false).await;
    assert_eq!(title(&session), "Account fields suggestions:");
    assert_eq!(values(&session), vec!["Owner.", "OwnerId"]);

    let set = session.completer.suggestions().unwrap();
    assert_eq!(set.results[0].kind, SuggestionKind::RelationshipName);
    assert_eq!(set.results[0].suffix, "");
    assert_eq!(set.results[1].suffix, ", ");
}

#[tokio::test]
async fn test_fields_along_relationship_path() {
    let dir = describe_dir();
    let executor = ScriptedExecutor::default();
    let session = complete_at(dir.path(), &executor, "SELECT Owner.Us FROM Account", 15, false).await;
    assert_eq!(title(&session), "User fields suggestions:");
    assert_eq!(values(&session), vec!["Username", "Id"]);
}

#[tokio::test]
async fn test_polymorphic_relationship_fans_out() {
    let dir = describe_dir();
    let session = complete(dir.path(), "SELECT Id FROM Task WHERE Owner.Na").await;
    assert_eq!(title(&session), "User, Group fields suggestions:");
    let found = values(&session);
    assert_eq!(found[..2], ["Name", "Name"]);
    assert!(found.contains(&"Username".to_string()));
    // Filter clauses take a trailing space instead of a comma
    let set = session.completer.suggestions().unwrap();
    assert_eq!(set.results[0].suffix, " ");
}

#[tokio::test]
async fn test_polymorphic_type_suggests_objects() {
    let dir = describe_dir();
    let session = complete(dir.path(), "SELECT Id FROM Task WHERE What.Type = 'Ac").await;
    assert_eq!(title(&session), "Objects suggestions:");
    assert_eq!(values(&session), vec!["Account", "Contact"]);
}

#[tokio::test]
async fn test_relationship_names_in_subquery_from() {
    let dir = describe_dir();
    let executor = ScriptedExecutor::default();
    let text = "SELECT Id, (SELECT Id FROM Con) FROM Account";
    let session = complete_at(dir.path(), &executor, text, 30, false).await;
    assert_eq!(title(&session), "Relations suggestions:");
    assert_eq!(values(&session), vec!["Contacts"]);
    let set = session.completer.suggestions().unwrap();
    assert_eq!(set.results[0].title, "Contacts(Contact.AccountId)");
}

#[tokio::test]
async fn test_subquery_select_list_uses_child_object() {
    let dir = describe_dir();
    let executor = ScriptedExecutor::default();
    let text = "SELECT Id, (SELECT La FROM Contacts) FROM Account";
    let session = complete_at(dir.path(), &executor, text, 21, false).await;
    assert_eq!(title(&session), "Contact fields suggestions:");
    assert_eq!(values(&session), vec!["LastName"]);
}

#[tokio::test]
async fn test_picklist_values() {
    let dir = describe_dir();
    let session = complete(dir.path(), "SELECT Id FROM Account WHERE Type = 'Cu").await;
    assert_eq!(title(&session), "Account.Type values:");
    assert_eq!(values(&session), vec!["'Customer'"]);
    // The replaced range includes the opening quote
    let resolution = session.completer.resolution().unwrap();
    assert_eq!(resolution.replace_start, "SELECT Id FROM Account WHERE Type = ".len());
}

#[tokio::test]
async fn test_boolean_values() {
    let dir = describe_dir();
    let session = complete(dir.path(), "SELECT Id FROM Account WHERE IsDeleted = ").await;
    let mut found = values(&session);
    found.sort();
    assert_eq!(found, vec!["false", "true"]);
}

#[tokio::test]
async fn test_unknown_field_and_object() {
    let dir = describe_dir();
    let session = complete(dir.path(), "SELECT Id FROM Account WHERE Bogus = ").await;
    assert_eq!(title(&session), "Unknown field: Account.Bogus");
    assert!(values(&session).is_empty());

    let session = complete(dir.path(), "SELECT Id FROM Nope WHERE ").await;
    assert_eq!(title(&session), "Unknown object: Nope");
}

#[tokio::test]
async fn test_missing_from_keyword() {
    let dir = describe_dir();
    let session = complete(dir.path(), "SELECT Id").await;
    assert_eq!(title(&session), "\"from\" keyword not found");
}

#[tokio::test]
async fn test_ctrl_space_value_lookup() {
    let dir = describe_dir();
    let executor = ScriptedExecutor::new(vec![Ok(batch(
        vec![
            json!({"attributes": {"type": "Account"}, "Name": "Acme Corp"}),
            json!({"attributes": {"type": "Account"}, "Name": "Acme"}),
            json!({"attributes": {"type": "Account"}, "Name": ""}),
        ],
        3,
        None,
    ))]);
    let text = "SELECT Id FROM Account WHERE Name = 'Ac";
    let session = complete_at(dir.path(), &executor, text, text.len(), true).await;

    assert_eq!(title(&session), "Account.Name values suggestions:");
    assert_eq!(values(&session), vec!["'Acme'", "'Acme Corp'"]);
    // Loaded values replace the quoted literal, like static ones do
    let resolution = session.completer.resolution().unwrap();
    assert_eq!(resolution.replace_start, text.len() - "'Ac".len());
    assert_eq!(resolution.replace_end, text.len());
    assert!(session.completer.pending_lookup().is_none());
    let queries = executor.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].0, QueryMode::Query);
    assert_eq!(
        queries[0].1,
        "select Name from Account where Name like '%Ac%' group by Name limit 100"
    );
}

#[tokio::test]
async fn test_value_lookup_failure_is_shown() {
    let dir = describe_dir();
    let executor = ScriptedExecutor::default();
    let text = "SELECT Id FROM Account WHERE Name = 'Ac";
    let session = complete_at(dir.path(), &executor, text, text.len(), true).await;
    assert_eq!(title(&session), "Error: no more pages");
}

#[tokio::test]
async fn test_ctrl_space_inserts_all_objects() {
    let dir = describe_dir();
    let executor = ScriptedExecutor::default();
    let text = "FIND {acme} RETURNING ";
    let session = complete_at(dir.path(), &executor, text, text.len(), true).await;
    assert_eq!(
        session.span().text,
        "FIND {acme} RETURNING Account, Case, Contact, Group, Task, User"
    );
    assert_eq!(session.span().selection_start, session.span().text.len());

    // A structured query's FROM only lists them
    let session = complete_at(dir.path(), &executor, "SELECT Id FROM ", 15, true).await;
    assert_eq!(session.span().text, "SELECT Id FROM ");
    assert_eq!(title(&session), "Objects suggestions:");
}

#[tokio::test]
async fn test_ctrl_space_inserts_all_fields() {
    let dir = describe_dir();
    let executor = ScriptedExecutor::default();
    let session = complete_at(dir.path(), &executor, "SELECT  FROM Group", 7, true).await;
    assert_eq!(session.span().text, "SELECT Id, Name FROM Group");
}

#[tokio::test]
async fn test_choosing_field_suggestion() {
    let dir = describe_dir();
    let executor = ScriptedExecutor::default();
    let mut session = complete_at(dir.path(), &executor, "SELECT Id, Las FROM Contact", 14, false).await;
    assert_eq!(values(&session), vec!["LastName"]);
    session.handle_event(AppEvent::SuggestionChosen(0));
    assert_eq!(session.span().text, "SELECT Id, LastName FROM Contact");
}

#[tokio::test]
async fn test_sosl_returning_objects_and_fields() {
    let dir = describe_dir();
    let session = complete(dir.path(), "FIND {acme} IN ALL FIELDS RETURNING Acc").await;
    assert_eq!(title(&session), "Objects suggestions:");
    assert_eq!(values(&session)[0], "Account");

    let session = complete(dir.path(), "FIND {acme} RETURNING Account(Id), Contact(La").await;
    assert_eq!(title(&session), "Contact fields suggestions:");
    assert_eq!(values(&session), vec!["LastName"]);
}

#[tokio::test]
async fn test_missing_describe_directory_offers_retry() {
    let dir = tempfile::TempDir::new().unwrap();
    let session = complete(dir.path(), "SELECT Id FROM ").await;
    assert_eq!(title(&session), "Loading metadata failed.");
    assert_eq!(values(&session), vec!["Retry"]);
}

#[tokio::test]
async fn test_cursor_after_from_ignores_where_clause() {
    let dir = describe_dir();
    let executor = ScriptedExecutor::default();
    let text = "SELECT Id FROM Account WHERE Name = 'x'";
    let session = complete_at(dir.path(), &executor, text, 15, false).await;
    assert_eq!(title(&session), "Objects suggestions:");
    let found = values(&session);
    assert!(found.contains(&"Account".to_string()));
    assert!(!found.contains(&"Name".to_string()));
}

#[tokio::test]
async fn test_full_relationship_name_in_subquery_from() {
    let dir = describe_dir();
    let executor = ScriptedExecutor::default();
    let text = "SELECT Id, (SELECT Id FROM Contacts) FROM Account";
    let session = complete_at(dir.path(), &executor, text, 35, false).await;
    assert_eq!(title(&session), "Relations suggestions:");
    assert_eq!(values(&session), vec!["Contacts"]);
}

#[tokio::test]
async fn test_owner_type_on_single_target_lookup() {
    let dir = describe_dir();
    let session = complete(dir.path(), "SELECT Id FROM Account WHERE Owner.Type = 'Us").await;
    assert_eq!(title(&session), "Objects suggestions:");
    assert_eq!(values(&session), vec!["User"]);
}

#[tokio::test]
async fn test_value_lookup_on_polymorphic_field_is_ambiguous() {
    let dir = describe_dir();
    let executor = ScriptedExecutor::default();
    let text = "SELECT Id FROM Task WHERE What.Id = '00";
    let session = complete_at(dir.path(), &executor, text, text.len(), true).await;

    assert_eq!(title(&session), "Multiple possible fields: Account.Id, Case.Id");
    assert!(values(&session).is_empty());
    assert!(executor.queries().is_empty());
}

#[tokio::test]
async fn test_lookup_answer_after_edit_is_dropped() {
    let dir = describe_dir();
    let provider = DirectoryMetadataProvider::new(dir.path());
    let executor = ScriptedExecutor::new(vec![Ok(batch(
        vec![json!({"attributes": {"type": "Account"}, "Name": "Acme"})],
        1,
        None,
    ))]);
    let driver = Driver::new(&provider, &executor);
    let mut session = Session::new(Settings::default());
    let text = "SELECT Id FROM Account WHERE Name = 'Ac";
    let actions = session.handle_event(AppEvent::Edit(QuerySpan::at_end(text)));
    driver.run(&mut session, actions, None).await;

    let lookup = session.handle_event(AppEvent::CtrlSpace);
    assert!(lookup.iter().any(|a| matches!(a, Action::LookupValues { .. })));

    // Typing on supersedes the lookup before it answers
    let actions = session.handle_event(AppEvent::Edit(QuerySpan::at_end(format!("{text}x"))));
    assert!(matches!(actions[..], [Action::CancelValueLookup(_)]));
    let before = session.completer.suggestions().cloned();

    driver.run(&mut session, lookup, None).await;

    assert_eq!(executor.queries().len(), 1);
    assert_eq!(session.completer.suggestions().cloned(), before);
    assert_eq!(
        title(&session),
        "Account.Name values (Press Ctrl+Space to load suggestions):"
    );
    assert!(values(&session).is_empty());
}

#[tokio::test]
async fn test_malformed_queries_resolve_at_every_cursor() {
    let dir = describe_dir();
    let executor = ScriptedExecutor::default();
    let queries = [
        "SELECT ))(( FROM (( Account ) WHERE",
        "SELECT Id, (SELECT Id FROM",
        "SELECT Id, (SELECT Id FROM Contacts WHERE (Name = 'a' FROM Account",
        "SELECT FROM FROM Account WHERE Name = = 'x",
        "FIND {a\\} b} IN ALL FIELDS RETURNING Account(Id, , Contact( , Ca",
        "FIND {日本} RETURNING Account(Name WHERE Name = 'é",
        "SELECT Id FROM Account WHERE Name = 'é' AND Owner.",
        "select id from account where id in (select",
        "(((",
        "",
    ];
    for query in queries {
        let cursors = query
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(query.len()));
        for cursor in cursors {
            for ctrl_space in [false, true] {
                let session = complete_at(dir.path(), &executor, query, cursor, ctrl_space).await;
                assert!(
                    session.completer.resolution().is_some(),
                    "no resolution for {query:?} at {cursor} (ctrl_space: {ctrl_space})"
                );
            }
        }
    }
}
