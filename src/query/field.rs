//! Field, value and object contexts
//!
//! Given the object a query (or subquery) reads from, complete field names
//! along dotted relationship paths, or literal values on the right-hand side
//! of a comparison.
//!
//! For `select Id from Contact where Account.Owner.Usern` the term is `Usern`,
//! the context path `Account.Owner.` and the object `Contact`. For
//! `select Id from Contact where Account.Type = 'Cus` the term is `Cus`, the
//! compared field `Type` and the context path `Account.`.

use crate::metadata::cache::{DescribeState, DescribeStatus};
use crate::metadata::describe::{FieldDescribe, SObjectDescribe};
use crate::query::Resolver;
use crate::query::span::trailing_identifier;
use crate::query::suggestion::{
    Resolution, Suggestion, SuggestionKind, SuggestionSet, TextEdit, ValueLookup, sort_suggestions,
};
use crate::query::values::{field_values, matching};
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Functions offered alongside field names
const FUNCTIONS: &[&str] = &[
    "FIELDS(ALL)",
    "FIELDS(STANDARD)",
    "FIELDS(CUSTOM)",
    "AVG",
    "COUNT",
    "COUNT_DISTINCT",
    "MIN",
    "MAX",
    "SUM",
    "CALENDAR_MONTH",
    "CALENDAR_QUARTER",
    "CALENDAR_YEAR",
    "DAY_IN_MONTH",
    "DAY_IN_WEEK",
    "DAY_IN_YEAR",
    "DAY_ONLY",
    "FISCAL_MONTH",
    "FISCAL_QUARTER",
    "FISCAL_YEAR",
    "HOUR_IN_DAY",
    "WEEK_IN_MONTH",
    "WEEK_IN_YEAR",
    "convertTimezone",
    "toLabel",
    "convertCurrency",
    "FORMAT",
];

/// Relationship aliases whose `Type` field names an object
const POLYMORPHIC_ALIASES: &[&str] = &["who.", "what.", "owner."];

fn field_value_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\s*(=|<|>|<=|>=|!=|includes|excludes|like|in)\s*\(?('?[^'\s]*)$")
            .expect("valid comparison regex")
    })
}

fn context_path_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[a-zA-Z0-9_.]*$").expect("valid context path regex"))
}

/// Status message for an object whose describe is not ready
pub(crate) fn unavailable_object(status: DescribeStatus, name: &str) -> SuggestionSet {
    match status {
        DescribeStatus::Loading => {
            SuggestionSet::message(name, format!("Loading {name} metadata..."))
        }
        DescribeStatus::LoadFailed => {
            SuggestionSet::retry(name, format!("Loading {name} metadata failed."))
        }
        DescribeStatus::NotFound => SuggestionSet::message(name, format!("Unknown object: {name}")),
        DescribeStatus::Ready => SuggestionSet::message(
            name,
            format!("Unexpected error for object: {name}: {status}"),
        ),
    }
}

/// Describe `name`, or the message to show instead
pub(crate) fn describe_or_message(
    r: &Resolver<'_>,
    name: &str,
) -> Result<Arc<SObjectDescribe>, SuggestionSet> {
    match r.cache.describe_sobject(r.options.tooling, name) {
        DescribeState::Ready(describe) => Ok(describe),
        other => Err(unavailable_object(other.status(), name)),
    }
}

/// Object names matching the term (API name or label)
pub(crate) fn autocomplete_object(r: &Resolver<'_>, ctrl_space: bool) -> Resolution {
    let global = match r.cache.describe_global(r.options.tooling) {
        DescribeState::Ready(global) => global,
        DescribeState::Loading => return r.at_token(SuggestionSet::message("", "Loading metadata...")),
        DescribeState::LoadFailed => {
            return r.at_token(SuggestionSet::retry("", "Loading metadata failed."));
        }
        DescribeState::NotFound => {
            return r.at_token(SuggestionSet::message(
                "",
                format!("Unexpected error: {}", DescribeStatus::NotFound),
            ));
        }
    };

    let term = r.term().to_lowercase();
    let matches: Vec<_> = global
        .sobjects
        .iter()
        .filter(|s| {
            s.queryable
                && (s.name.to_lowercase().contains(&term) || s.label.to_lowercase().contains(&term))
        })
        .collect();

    let mut results: Vec<Suggestion> = matches
        .iter()
        .map(|s| Suggestion::new(&s.name, &s.label, SuggestionKind::Object))
        .collect();
    sort_suggestions(&mut results, r.term());
    let resolution = r.at_token(SuggestionSet::new("", "Objects suggestions:", results));

    if ctrl_space && !matches.is_empty() {
        let names: Vec<&str> = matches.iter().map(|s| s.name.as_str()).collect();
        return resolution.with_edit(TextEdit {
            start: r.token_start(),
            end: r.selection_end(),
            text: names.join(", "),
        });
    }
    resolution
}

/// Field names, relationship names and functions of `sobject_name`, or
/// values when the cursor follows a comparison operator.
///
/// `is_after_where` switches the inserted suffix from `, ` (select list)
/// to a single space (filter clauses).
pub(crate) fn autocomplete_field(
    r: &Resolver<'_>,
    sobject_name: &str,
    is_after_where: bool,
) -> Resolution {
    let query = r.query();
    let sel_start = r.token_start();

    let mut context_end = sel_start;
    let mut value_start = sel_start;
    let mut value_field: Option<&str> = None;
    if let Some(caps) = field_value_re().captures(&query[..sel_start]) {
        let field_end = sel_start - caps[0].len();
        let field_name = trailing_identifier(&query[..field_end]);
        context_end = field_end - field_name.len();
        value_start -= caps[2].len();
        value_field = Some(field_name);
    }
    let context_path = context_path_re()
        .find(&query[..context_end])
        .map_or("", |m| m.as_str());

    let root = match describe_or_message(r, sobject_name) {
        Ok(describe) => describe,
        Err(set) => return r.at_token(set),
    };

    // Objects reachable through the relationship path; a polymorphic
    // relationship fans out to several.
    let mut contexts: Vec<Arc<SObjectDescribe>> = vec![Arc::clone(&root)];
    let mut unavailable: HashMap<DescribeStatus, String> = HashMap::new();
    if !context_path.is_empty() {
        let mut segments: Vec<&str> = context_path.split('.').collect();
        segments.pop();
        for segment in segments {
            let targets: Vec<String> = contexts
                .iter()
                .flat_map(|d| d.relationship_fields(segment))
                .flat_map(|f| f.reference_to.iter().cloned())
                .collect();
            let mut next: Vec<Arc<SObjectDescribe>> = Vec::new();
            for target in targets {
                match r.cache.describe_sobject(r.options.tooling, &target) {
                    DescribeState::Ready(d) => {
                        if !next.iter().any(|n| n.name == d.name) {
                            next.push(d);
                        }
                    }
                    other => {
                        unavailable.insert(other.status(), target);
                    }
                }
            }
            contexts = next;
        }
    }

    if let Some(name) = unavailable.get(&DescribeStatus::Loading) {
        return r.at_token(SuggestionSet::message(
            sobject_name,
            format!("Loading {name} metadata..."),
        ));
    }
    if let Some(name) = unavailable.get(&DescribeStatus::LoadFailed) {
        return r.at_token(SuggestionSet::retry(
            sobject_name,
            format!("Loading {name} metadata failed."),
        ));
    }
    if contexts.is_empty() {
        let title = match unavailable.get(&DescribeStatus::NotFound) {
            Some(name) => format!("Unknown object: {name}"),
            None => format!("Unknown field: {sobject_name}.{context_path}"),
        };
        return r.at_token(SuggestionSet::message(sobject_name, title));
    }

    match value_field {
        Some(field_name) => complete_value(
            r,
            ValueContext {
                sobject_name,
                root: &root,
                contexts: &contexts,
                context_path,
                field_name,
                value_start,
            },
        ),
        None => complete_field_name(r, sobject_name, &contexts, context_path, is_after_where),
    }
}

struct ValueContext<'c> {
    sobject_name: &'c str,
    root: &'c SObjectDescribe,
    contexts: &'c [Arc<SObjectDescribe>],
    context_path: &'c str,
    field_name: &'c str,
    value_start: usize,
}

fn complete_value(r: &Resolver<'_>, ctx: ValueContext<'_>) -> Resolution {
    let path = ctx.context_path.to_ascii_lowercase();
    if ctx.field_name.eq_ignore_ascii_case("type")
        && POLYMORPHIC_ALIASES.iter().any(|alias| path.ends_with(alias))
    {
        return autocomplete_object(r, r.options.ctrl_space);
    }

    let value_fields: Vec<(&SObjectDescribe, &FieldDescribe)> = ctx
        .contexts
        .iter()
        .flat_map(|d| {
            d.fields
                .iter()
                .filter(|f| f.name.eq_ignore_ascii_case(ctx.field_name))
                .map(move |f| (d.as_ref(), f))
        })
        .collect();
    let sel_end = r.selection_end();
    if value_fields.is_empty() {
        return r.at_token(SuggestionSet::message(
            ctx.sobject_name,
            format!(
                "Unknown field: {}.{}{}",
                ctx.root.name, ctx.context_path, ctx.field_name
            ),
        ));
    }
    let field_names = value_fields
        .iter()
        .map(|(d, f)| format!("{}.{}", d.name, f.name))
        .collect::<Vec<_>>()
        .join(", ");

    if r.options.ctrl_space {
        // Querying distinct values costs a remote call, so it is opt-in.
        if value_fields.len() > 1 {
            return Resolution::new(
                SuggestionSet::message(
                    ctx.sobject_name,
                    format!("Multiple possible fields: {field_names}"),
                ),
                ctx.value_start,
                sel_end,
            );
        }
        let (sobject, field) = value_fields[0];
        let term = r.term();
        if let Some(loaded) = r.loaded_values {
            let set = match loaded {
                Ok(values) => {
                    let mut results: Vec<Suggestion> = values
                        .iter()
                        .map(|v| Suggestion::new(format!("'{v}'"), v, SuggestionKind::FieldValue))
                        .collect();
                    sort_suggestions(&mut results, term);
                    SuggestionSet::new(
                        ctx.sobject_name,
                        format!("{field_names} values suggestions:"),
                        results,
                    )
                }
                Err(err) => SuggestionSet::message(ctx.sobject_name, format!("Error: {err}")),
            };
            return Resolution::new(set, ctx.value_start, sel_end);
        }
        let lookup = ValueLookup {
            query: value_lookup_query(
                &sobject.name,
                &field.name,
                term,
                r.options.value_lookup_limit,
            ),
            mode: r.lookup_mode(),
            field_name: field.name.clone(),
            title: field_names.clone(),
            search_term: term.to_string(),
        };
        return Resolution::new(
            SuggestionSet::message(ctx.sobject_name, format!("Loading {field_names} values...")),
            ctx.value_start,
            sel_end,
        )
        .with_value_lookup(lookup);
    }

    let candidates = value_fields
        .iter()
        .flat_map(|(_, f)| field_values(f, &r.now))
        .collect();
    let mut results = matching(candidates, r.term());
    sort_suggestions(&mut results, r.term());
    let title = if results.is_empty() {
        format!("{field_names} values (Press Ctrl+Space to load suggestions):")
    } else {
        format!("{field_names} values:")
    };
    Resolution::new(
        SuggestionSet::new(ctx.sobject_name, title, results),
        ctx.value_start,
        sel_end,
    )
}

fn complete_field_name(
    r: &Resolver<'_>,
    sobject_name: &str,
    contexts: &[Arc<SObjectDescribe>],
    context_path: &str,
    is_after_where: bool,
) -> Resolution {
    let term = r.term();
    let term_lower = term.to_lowercase();
    let matched: Vec<&FieldDescribe> = contexts
        .iter()
        .flat_map(|d| d.fields.iter())
        .filter(|f| {
            f.name.to_lowercase().contains(&term_lower)
                || f.label.to_lowercase().contains(&term_lower)
        })
        .collect();

    let field_suffix = if is_after_where { " " } else { ", " };
    let mut results: Vec<Suggestion> = Vec::new();
    for field in &matched {
        results.push(
            Suggestion::new(&field.name, &field.label, SuggestionKind::FieldName)
                .with_suffix(field_suffix)
                .with_data_type(&field.field_type),
        );
        if let Some(rel) = &field.relationship_name {
            results.push(
                Suggestion::new(format!("{rel}."), &field.label, SuggestionKind::RelationshipName)
                    .with_suffix(""),
            );
        }
    }
    results.extend(
        FUNCTIONS
            .iter()
            .filter(|f| f.to_lowercase().starts_with(&term_lower))
            .map(|f| {
                // FIELDS(...) carries its argument already
                let suggestion = if f.contains(')') {
                    Suggestion::new(*f, *f, SuggestionKind::Variable).with_suffix("")
                } else {
                    Suggestion::new(*f, format!("{f}()"), SuggestionKind::Variable).with_suffix("(")
                };
                suggestion.with_rank(2)
            }),
    );
    sort_suggestions(&mut results, term);

    let title = format!(
        "{} fields suggestions:",
        contexts
            .iter()
            .map(|d| d.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    let resolution = r.at_token(SuggestionSet::new(sobject_name, title, results));

    if r.options.ctrl_space && !matched.is_empty() {
        let names: Vec<String> = matched
            .iter()
            .map(|f| format!("{context_path}{}", f.name))
            .collect();
        let mut text = names.join(", ");
        if is_after_where {
            text.push(' ');
        }
        return resolution.with_edit(TextEdit {
            start: r.token_start() - context_path.len(),
            end: r.selection_end(),
            text,
        });
    }
    resolution
}

/// Distinct-value query for a field, filtered by the typed term
pub fn value_lookup_query(sobject: &str, field: &str, term: &str, limit: usize) -> String {
    let escaped = term.replace('\'', "\\'");
    format!(
        "select {field} from {sobject} where {field} like '%{escaped}%' group by {field} limit {limit}"
    )
}
