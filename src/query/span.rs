//! Query text plus cursor/selection
//!
//! Offsets are byte offsets into `text`, always on char boundaries.

/// The query being edited and the current selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpan {
    pub text: String,
    pub selection_start: usize,
    pub selection_end: usize,
}

impl QuerySpan {
    /// Build a span, clamping the selection into the text.
    pub fn new(text: impl Into<String>, selection_start: usize, selection_end: usize) -> Self {
        let text = text.into();
        let end = floor_char_boundary(&text, selection_end);
        let start = floor_char_boundary(&text, selection_start.min(end));
        Self {
            text,
            selection_start: start,
            selection_end: end,
        }
    }

    /// Collapsed cursor at `pos`
    pub fn cursor(text: impl Into<String>, pos: usize) -> Self {
        Self::new(text, pos, pos)
    }

    /// Collapsed cursor at the end of the text
    pub fn at_end(text: impl Into<String>) -> Self {
        let text = text.into();
        let len = text.len();
        Self::new(text, len, len)
    }

    pub fn has_selection(&self) -> bool {
        self.selection_start != self.selection_end
    }

    /// The token being completed: the selection, or the identifier run
    /// immediately before the cursor.
    pub fn search_term(&self) -> &str {
        if self.has_selection() {
            &self.text[self.selection_start..self.selection_end]
        } else {
            trailing_identifier(&self.text[..self.selection_start])
        }
    }

    /// Start offset of [`search_term`](Self::search_term)
    pub fn token_start(&self) -> usize {
        self.selection_end - self.search_term().len()
    }

    /// Search-language queries start with `f` (as in FIND).
    pub fn is_search_mode(&self) -> bool {
        self.text
            .trim_start()
            .chars()
            .next()
            .is_some_and(|c| c.eq_ignore_ascii_case(&'f'))
    }
}

/// The run of `[A-Za-z0-9_]` at the end of `s`
pub(crate) fn trailing_identifier(s: &str) -> &str {
    let start = s
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_alphanumeric() || *c == '_')
        .last()
        .map_or(s.len(), |(i, _)| i);
    &s[start..]
}

/// ASCII case-insensitive `starts_with`
pub(crate) fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len()
        && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    if idx >= s.len() {
        return s.len();
    }
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
