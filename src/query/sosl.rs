//! Search query (`FIND {...} IN ... RETURNING ...`) context resolution
//!
//! The text before the cursor is consumed clause by clause. The first clause
//! found incomplete decides the suggestions; completed clauses are never
//! revisited.

use crate::query::Resolver;
use crate::query::field::{autocomplete_field, autocomplete_object};
use crate::query::span::starts_with_ignore_case;
use crate::query::suggestion::{Resolution, Suggestion, SuggestionSet};
use regex::Regex;
use std::sync::OnceLock;

const SEARCH_SCOPES: &[&str] = &[
    "ALL FIELDS",
    "NAME FIELDS",
    "EMAIL FIELDS",
    "PHONE FIELDS",
    "SIDEBAR FIELDS",
];

/// Clause keywords with the suffix inserted after each
const CLAUSE_KEYWORDS: &[(&str, &str)] = &[
    ("IN", " "),
    ("RETURNING", " "),
    ("WITH DIVISION", " "),
    ("WITH DATA CATEGORY", " "),
    ("WITH HIGHLIGHT", " "),
    ("WITH SNIPPET", " "),
    ("WITH NETWORK", " "),
    ("WITH PricebookId", " = "),
    ("WITH METADATA", " = "),
    ("LIMIT", " "),
];

fn object_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([a-zA-Z0-9_-]+)").expect("valid object name regex"))
}

fn where_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\s+where\s+([a-z0-9_]*)").expect("valid where regex"))
}

fn keywords(title: &str, entries: &[(&str, &str)]) -> SuggestionSet {
    SuggestionSet::new(
        "",
        title,
        entries
            .iter()
            .map(|(value, suffix)| Suggestion::keyword(value, suffix))
            .collect(),
    )
}

/// Drop `n` bytes from the front, then surrounding whitespace
fn advance(rest: &str, n: usize) -> &str {
    rest.get(n..).unwrap_or("").trim()
}

pub(crate) fn resolve(r: &Resolver<'_>) -> Resolution {
    let span = r.span;
    let mut rest = span.text[..span.selection_start].trim();

    if !starts_with_ignore_case(rest, "FIND") {
        return r.at_token(keywords("Suggestions:", &[("FIND", " ")]));
    }
    rest = advance(rest, 4);

    if !rest.starts_with('{') {
        return r.at_token(keywords("Suggestions:", &[("{", "")]));
    }
    rest = advance(rest, 1);

    // Escaped braces do not close the search term
    while let (Some(escaped), Some(close)) = (rest.find("\\}"), rest.find('}')) {
        if close <= escaped {
            break;
        }
        rest = advance(rest, escaped + 2);
    }
    let Some(close) = rest.find('}') else {
        return r.at_token(keywords(
            "keyword or boolean suggestions:",
            &[("AND", ""), ("OR", ""), ("NOT", "")],
        ));
    };
    rest = advance(rest, close + 1);

    if starts_with_ignore_case(rest, "IN") {
        rest = advance(rest, 2);
        if !SEARCH_SCOPES
            .iter()
            .any(|scope| starts_with_ignore_case(rest, scope))
        {
            let scopes: Vec<(&str, &str)> = SEARCH_SCOPES.iter().map(|s| (*s, " ")).collect();
            return r.at_token(keywords("IN suggestions:", &scopes));
        }
        let fields_at = rest.to_ascii_uppercase().find("FIELDS").unwrap_or(0);
        rest = advance(rest, fields_at + "FIELDS".len());
    }

    if starts_with_ignore_case(rest, "RETURNING") {
        rest = advance(rest, "RETURNING".len());
        while let Some(name) = object_name_re().find(rest).map(|m| m.as_str()) {
            if name.eq_ignore_ascii_case("WITH") || name.eq_ignore_ascii_case("LIMIT") {
                break;
            }
            rest = advance(rest, name.len());
            if rest.starts_with('(') {
                match rest.find(')') {
                    None => {
                        // Cursor inside this object's field list
                        let is_after_where = where_re().is_match(rest);
                        return autocomplete_field(r, name, is_after_where);
                    }
                    Some(close) => rest = advance(rest, close + 1),
                }
            }
            if rest.starts_with(',') {
                rest = advance(rest, 1);
            }
            if rest.is_empty() {
                break;
            }
        }
        if rest.is_empty() {
            return autocomplete_object(r, r.options.ctrl_space);
        }
    }

    let term = r.term().to_lowercase();
    let remaining: Vec<(&str, &str)> = CLAUSE_KEYWORDS
        .iter()
        .filter(|(value, _)| value.to_lowercase().contains(&term))
        .copied()
        .collect();
    r.at_token(keywords("Suggestions:", &remaining))
}
