//! Structured query (`SELECT ... FROM ...`) context resolution

use crate::query::Resolver;
use crate::query::field::{autocomplete_field, autocomplete_object, describe_or_message};
use crate::query::span::starts_with_ignore_case;
use crate::query::suggestion::{
    Resolution, Suggestion, SuggestionKind, SuggestionSet, TextEdit, sort_suggestions,
};
use regex::Regex;
use std::sync::OnceLock;

fn from_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(^|\s)from\s+([a-z0-9_]*)").expect("valid from regex"))
}

fn trailing_from_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(^|\s)from\s*$").expect("valid trailing from regex"))
}

fn sub_query_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\((\s*select.*)(\sfrom\s+)([a-z0-9_]*)(\s*.*)\)")
            .expect("valid subquery regex")
    })
}

/// Scratch state of one structured-query resolution
#[derive(Debug, Clone, Default)]
pub struct ResolutionContext {
    /// Object the cursor's (sub)query reads from
    pub sobject_name: String,
    /// Object owning the relationship a subquery reads
    pub parent_sobject_name: Option<String>,
    /// Relationship name typed after the subquery's FROM
    pub from_object_alias: Option<String>,
    pub is_after_from: bool,
}

/// True when `text` has as many `(` as `)`
fn parens_balanced(text: &str) -> bool {
    text.matches('(').count() == text.matches(')').count()
}

/// True when the innermost open parenthesis before a FROM starts a subquery
fn inside_subquery(before_from: &str) -> bool {
    let last_segment = before_from.rsplit('(').next().unwrap_or(before_from);
    !before_from.is_empty()
        && !parens_balanced(before_from)
        && starts_with_ignore_case(last_segment.trim_start(), "select")
}

pub(crate) fn resolve(r: &Resolver<'_>) -> Resolution {
    let query = r.query();
    let lower = query.to_ascii_lowercase();
    let sel_start = r.token_start();

    // Pick the FROM governing the cursor. Subquery FROMs are skipped unless
    // the cursor sits in a WHERE-clause subquery after the outer FROM.
    let mut sobject_name: Option<&str> = None;
    let mut is_after_from = false;
    for caps in from_re().captures_iter(query) {
        let Some(whole) = caps.get(0) else { continue };
        let idx = whole.start();
        let name = caps.get(2).map_or("", |m| m.as_str());
        let subquery_close = query[idx..]
            .find(')')
            .map_or(idx as i64 - 1, |p| (idx + p) as i64);
        if sobject_name.is_some_and(|s| !s.is_empty())
            && is_after_from
            && lower[..idx].rfind("select").is_none_or(|p| sel_start > p)
            && (sel_start as i64) <= subquery_close
        {
            sobject_name = Some(name);
            is_after_from = sel_start > idx + 1;
            break;
        }
        if !inside_subquery(&query[..idx]) {
            sobject_name = Some(name);
            is_after_from = sel_start > idx + 1;
        }
    }

    // Right after a FROM keyword: complete the object name
    if let Some(m) = trailing_from_re().find(&query[..sel_start]) {
        if !inside_subquery(&query[..m.start()]) || is_after_from {
            return autocomplete_object(r, false);
        }
    }

    let Some(sobject_name) = sobject_name.filter(|s| !s.is_empty()) else {
        return r.at_token(SuggestionSet::message("", "\"from\" keyword not found"));
    };

    let mut ctx = ResolutionContext {
        sobject_name: sobject_name.to_string(),
        is_after_from,
        ..Default::default()
    };
    if !ctx.is_after_from {
        if let SubQuery::Resolved(resolution) = parse_sub_query(r, &mut ctx) {
            return resolution;
        }
    }
    autocomplete_field(r, &ctx.sobject_name, ctx.is_after_from)
}

enum SubQuery {
    /// Not in a select-list subquery, or in one whose object is now known
    Fields,
    Resolved(Resolution),
}

/// Captured parts of a `(SELECT ... FROM rel ...)` match
struct SubQueryMatch {
    start: usize,
    end: usize,
    select_list: String,
    from_keyword_len: usize,
    from_object: String,
}

impl SubQueryMatch {
    fn find(text: &str, pos: usize) -> Option<Self> {
        let caps = sub_query_re().captures_at(text, pos)?;
        let whole = caps.get(0)?;
        Some(Self {
            start: whole.start(),
            end: whole.end(),
            select_list: caps.get(1).map_or("", |m| m.as_str()).to_string(),
            from_keyword_len: caps.get(2).map_or(0, |m| m.len()),
            from_object: caps.get(3).map_or("", |m| m.as_str()).to_string(),
        })
    }
}

/// Detect a select-list subquery around the cursor and resolve the
/// relationship it reads. Nested subqueries are handled by re-scanning the
/// text truncated to the enclosing select list.
fn parse_sub_query(r: &Resolver<'_>, ctx: &mut ResolutionContext) -> SubQuery {
    let sel_start = r.token_start();
    let mut text = r.query().to_string();
    let mut pos = 0;
    while let Some(found) = SubQueryMatch::find(&text, pos) {
        if !(found.start < sel_start && found.end > sel_start) {
            pos = found.end;
            continue;
        }
        let parent = ctx.sobject_name.clone();
        ctx.parent_sobject_name = Some(parent.clone());
        ctx.from_object_alias = Some(found.from_object.clone());
        ctx.is_after_from = false;

        let select_end = found.start + found.select_list.len();
        let from_end = select_end + found.from_keyword_len;
        let object_end = from_end + found.from_object.len();

        if select_end > sel_start {
            // In the subquery's select list
            match child_object(r, &parent, &found.from_object) {
                Ok(child) => ctx.sobject_name = child.unwrap_or(parent),
                Err(set) => return SubQuery::Resolved(r.at_token(set)),
            }
            text = format!("{}({}", &text[..found.start], found.select_list);
            pos = 0;
        } else if from_end > sel_start {
            // On the FROM keyword itself
            return SubQuery::Resolved(r.at_token(SuggestionSet::message(parent, "")));
        } else if object_end >= sel_start {
            return SubQuery::Resolved(suggest_relations(r, &parent, &found.from_object));
        } else {
            return match child_object(r, &parent, &found.from_object) {
                Ok(Some(child)) => {
                    ctx.sobject_name = child;
                    ctx.is_after_from = true;
                    SubQuery::Fields
                }
                Ok(None) => SubQuery::Resolved(suggest_relations(r, &parent, &found.from_object)),
                Err(set) => SubQuery::Resolved(r.at_token(set)),
            };
        }
    }
    SubQuery::Fields
}

/// Child relationships of `parent` whose name starts with `from_object`
fn relations(
    r: &Resolver<'_>,
    parent: &str,
    from_object: &str,
) -> Result<Vec<Suggestion>, SuggestionSet> {
    let describe = describe_or_message(r, parent)?;
    let prefix = from_object.to_lowercase();
    let mut out: Vec<Suggestion> = describe
        .child_relationships
        .iter()
        .filter_map(|rel| {
            let name = rel.relationship_name.as_deref()?;
            name.to_lowercase().starts_with(&prefix).then(|| {
                Suggestion::new(
                    name,
                    format!("{name}({}.{})", rel.child_sobject, rel.field),
                    SuggestionKind::Object,
                )
                .with_data_type(&rel.child_sobject)
            })
        })
        .collect();
    sort_suggestions(&mut out, r.term());
    Ok(out)
}

/// Object read by relationship `from_object` of `parent`, if it exists
fn child_object(
    r: &Resolver<'_>,
    parent: &str,
    from_object: &str,
) -> Result<Option<String>, SuggestionSet> {
    Ok(relations(r, parent, from_object)?
        .into_iter()
        .find(|s| !from_object.is_empty() && s.value.eq_ignore_ascii_case(from_object))
        .map(|s| s.data_type))
}

fn suggest_relations(r: &Resolver<'_>, parent: &str, from_object: &str) -> Resolution {
    let results = match relations(r, parent, from_object) {
        Ok(results) => results,
        Err(set) => return r.at_token(set),
    };
    let first = results.first().map(|s| s.value.clone());
    let resolution = r.at_token(SuggestionSet::new(parent, "Relations suggestions:", results));
    match first {
        Some(value) if r.options.ctrl_space => resolution.with_edit(TextEdit {
            start: r.token_start(),
            end: r.selection_end(),
            text: value,
        }),
        _ => resolution,
    }
}
