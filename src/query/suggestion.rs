//! Suggestion types and the relevance ranker

use crate::api::types::QueryMode;
use std::cmp::Ordering;

/// What a suggestion completes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuggestionKind {
    Keyword,
    Object,
    FieldName,
    RelationshipName,
    FieldValue,
    PicklistValue,
    Variable,
    Null,
}

/// One completion candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    /// Text inserted into the query
    pub value: String,
    /// Human-readable label (field label, picklist label, description)
    pub title: String,
    /// Text appended after `value` on insertion
    pub suffix: String,
    /// Intrinsic tie-break rank, lower first
    pub rank: i32,
    pub kind: SuggestionKind,
    /// Field type, or the child object of a relationship
    pub data_type: String,
}

impl Suggestion {
    pub fn new(value: impl Into<String>, title: impl Into<String>, kind: SuggestionKind) -> Self {
        Self {
            value: value.into(),
            title: title.into(),
            suffix: " ".to_string(),
            rank: 1,
            kind,
            data_type: String::new(),
        }
    }

    /// Keyword whose title is its own value
    pub fn keyword(value: &str, suffix: &str) -> Self {
        Self::new(value, value, SuggestionKind::Keyword).with_suffix(suffix)
    }

    pub fn with_suffix(mut self, suffix: &str) -> Self {
        self.suffix = suffix.to_string();
        self
    }

    pub fn with_rank(mut self, rank: i32) -> Self {
        self.rank = rank;
        self
    }

    pub fn with_data_type(mut self, data_type: &str) -> Self {
        self.data_type = data_type.to_string();
        self
    }
}

/// What choosing an entry of a suggestion set does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClickAction {
    /// Replace the token with `value + suffix`
    #[default]
    Insert,
    /// Drop all cached metadata and fetch again
    ReloadMetadata,
}

/// A titled, ranked list of suggestions
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SuggestionSet {
    /// Object the suggestions relate to, if any
    pub sobject_name: String,
    pub title: String,
    pub results: Vec<Suggestion>,
    pub click: ClickAction,
}

impl SuggestionSet {
    pub fn new(sobject_name: impl Into<String>, title: impl Into<String>, results: Vec<Suggestion>) -> Self {
        Self {
            sobject_name: sobject_name.into(),
            title: title.into(),
            results,
            click: ClickAction::Insert,
        }
    }

    /// An informational set with no entries
    pub fn message(sobject_name: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(sobject_name, title, Vec::new())
    }

    /// A failure message offering a single "Retry" entry that reloads metadata
    pub fn retry(sobject_name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            sobject_name: sobject_name.into(),
            title: title.into(),
            results: vec![Suggestion::keyword("Retry", "")],
            click: ClickAction::ReloadMetadata,
        }
    }
}

/// Replace `start..end` of the query with `text`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// Opt-in distinct value query for a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueLookup {
    pub query: String,
    pub mode: QueryMode,
    /// Field whose values the result rows carry
    pub field_name: String,
    /// `Object.Field` list used in the result title
    pub title: String,
    pub search_term: String,
}

/// Outcome of one resolution pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub suggestions: SuggestionSet,
    /// Byte range a chosen suggestion replaces
    pub replace_start: usize,
    pub replace_end: usize,
    /// Immediate text change requested by a bulk (Ctrl+Space) insertion
    pub edit: Option<TextEdit>,
    /// Remote value lookup the caller should start
    pub value_lookup: Option<ValueLookup>,
}

impl Resolution {
    pub fn new(suggestions: SuggestionSet, replace_start: usize, replace_end: usize) -> Self {
        Self {
            suggestions,
            replace_start,
            replace_end,
            edit: None,
            value_lookup: None,
        }
    }

    pub fn with_edit(mut self, edit: TextEdit) -> Self {
        self.edit = Some(edit);
        self
    }

    pub fn with_value_lookup(mut self, lookup: ValueLookup) -> Self {
        self.value_lookup = Some(lookup);
        self
    }
}

/// Relevance bucket of `suggestion` for the lowercase `term`, 0 (best) to 7.
pub fn sort_rank(term: &str, suggestion: &Suggestion) -> u8 {
    let value = suggestion.value.to_lowercase();
    let title = suggestion.title.to_lowercase();
    if value == term {
        0
    } else if title == term {
        1
    } else if value.starts_with(term) {
        2
    } else if title.starts_with(term) {
        3
    } else if value.contains(&format!("__{term}")) {
        4
    } else if value.contains(&format!("_{term}")) {
        5
    } else if title.contains(&format!(" {term}")) {
        6
    } else {
        7
    }
}

/// Total order for `term`: relevance bucket, then intrinsic rank, then value.
pub fn compare(term: &str, a: &Suggestion, b: &Suggestion) -> Ordering {
    sort_rank(term, a)
        .cmp(&sort_rank(term, b))
        .then(a.rank.cmp(&b.rank))
        .then_with(|| a.value.cmp(&b.value))
}

/// Sort in place by relevance to `term` (case-insensitive).
pub fn sort_suggestions(suggestions: &mut [Suggestion], term: &str) {
    let term = term.to_lowercase();
    suggestions.sort_by(|a, b| compare(&term, a, b));
}
