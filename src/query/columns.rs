//! Select-list extraction
//!
//! Reads the `SELECT ... FROM obj` clause of a structured query into a field
//! tree used to seed result columns before any record arrives. Only the
//! select list and the object name are kept; everything after the object
//! name is skipped up to the end of the enclosing scope.

use regex::Regex;
use std::sync::OnceLock;

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*([a-z0-9'_.]+|,|\(|\))").expect("valid token regex"))
}

/// One entry of a select list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNode {
    /// Field path, function alias or `exprN`; the relationship name for a subquery
    pub name: String,
    /// Zero-based position in the select list
    pub position: usize,
    /// Select list of a subquery
    pub subfields: Option<Vec<FieldNode>>,
    /// Relationship read by a subquery
    pub object_name: Option<String>,
}

impl FieldNode {
    fn field(name: &str, position: usize) -> Self {
        Self {
            name: name.to_string(),
            position,
            subfields: None,
            object_name: None,
        }
    }

    pub fn is_subquery(&self) -> bool {
        self.subfields.is_some()
    }
}

/// Parsed select list of a query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectList {
    pub fields: Vec<FieldNode>,
    /// Object after FROM; empty when none was found
    pub object_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'q> {
    Word(&'q str),
    Comma,
    Open,
    Close,
    /// A character the tokenizer does not recognize
    Other,
    End,
}

impl Token<'_> {
    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Word(w) if w.eq_ignore_ascii_case(keyword))
    }
}

struct Tokens<'q> {
    query: &'q str,
    pos: usize,
    current: Token<'q>,
}

impl<'q> Tokens<'q> {
    fn new(query: &'q str) -> Self {
        Self {
            query,
            pos: 0,
            current: Token::End,
        }
    }

    fn advance(&mut self) -> Token<'q> {
        let rest = &self.query[self.pos..];
        self.current = if let Some(caps) = token_re().captures(rest) {
            self.pos += caps[0].len();
            match caps.get(1).map_or("", |m| m.as_str()) {
                "," => Token::Comma,
                "(" => Token::Open,
                ")" => Token::Close,
                word => Token::Word(word),
            }
        } else if let Some(c) = rest.trim_start().chars().next() {
            self.pos = self.query.len() - rest.trim_start().len() + c.len_utf8();
            Token::Other
        } else {
            self.pos = self.query.len();
            Token::End
        };
        self.current
    }
}

/// Extract the select list of `query`.
///
/// Subqueries become nodes named after their relationship, carrying their own
/// select list. Function calls are named by their alias, or `expr0`, `expr1`,
/// ... in order when they have none.
pub fn extract_columns(query: &str) -> SelectList {
    let mut tokens = Tokens::new(query);
    tokens.advance();
    parse_select(&mut tokens)
}

/// Parse from the current token, which should be SELECT. Returns with the
/// closing parenthesis of the enclosing scope (or the end) as current token.
fn parse_select(tokens: &mut Tokens<'_>) -> SelectList {
    let mut result = SelectList::default();
    if !tokens.current.is_keyword("select") {
        return result;
    }
    tokens.advance();

    let mut position = 0;
    let mut expression_index = 0;
    loop {
        let token = tokens.current;
        match token {
            Token::End => break,
            Token::Word(w) if w.eq_ignore_ascii_case("from") => break,
            Token::Open => {
                tokens.advance();
                let sub = parse_select(tokens);
                result.fields.push(FieldNode {
                    name: sub.object_name.clone(),
                    position,
                    subfields: Some(sub.fields),
                    object_name: Some(sub.object_name),
                });
                position += 1;
                // past the subquery's closing parenthesis
                tokens.advance();
            }
            Token::Word(name) => {
                let mut field = FieldNode::field(name, position);
                position += 1;
                if tokens.advance() == Token::Open {
                    skip_group(tokens);
                    match tokens.advance() {
                        Token::Word(alias) if !alias.eq_ignore_ascii_case("from") => {
                            field.name = alias.to_string();
                            tokens.advance();
                        }
                        _ => {
                            field.name = format!("expr{expression_index}");
                            expression_index += 1;
                        }
                    }
                }
                result.fields.push(field);
            }
            Token::Comma | Token::Close | Token::Other => {
                tokens.advance();
            }
        }
    }

    if tokens.current.is_keyword("from") {
        if let Token::Word(object) = tokens.advance() {
            result.object_name = object.to_string();
        }
    }

    // Skip trailing clauses up to the end of this scope
    let mut depth = 0usize;
    loop {
        match tokens.advance() {
            Token::End => break,
            Token::Open => depth += 1,
            Token::Close if depth == 0 => break,
            Token::Close => depth -= 1,
            _ => {}
        }
    }
    result
}

/// With `(` current, advance to its matching `)` (or the end)
fn skip_group(tokens: &mut Tokens<'_>) {
    let mut depth = 0usize;
    loop {
        match tokens.advance() {
            Token::End => return,
            Token::Open => depth += 1,
            Token::Close if depth == 0 => return,
            Token::Close => depth -= 1,
            _ => {}
        }
    }
}
