//! Conditional compilation: which parts of a file sit in an active `#if`
//! branch for a given set of compilation conditions.
//!
//! Directives are found by scanning lines, so this works the same on files
//! whose syntax tree contains errors.

use serde::Deserialize;
use std::collections::BTreeSet;
use std::ops::Range;

/// Compilation conditions considered set, e.g. `DEBUG` or `os(macOS)`.
///
/// Call-like conditions are stored with whitespace removed so `os( macOS )`
/// and `os(macOS)` name the same condition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Vec<String>")]
pub struct ConditionSet {
    active: BTreeSet<String>,
}

impl ConditionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, condition: &str) {
        let normalized = normalize(condition);
        if !normalized.is_empty() {
            self.active.insert(normalized);
        }
    }

    pub fn contains(&self, condition: &str) -> bool {
        self.active.contains(&normalize(condition))
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.active.iter().map(String::as_str)
    }

    /// Evaluate a condition expression as written after `#if`/`#elseif`.
    ///
    /// Malformed expressions evaluate to `false`.
    pub fn evaluate(&self, expression: &str) -> bool {
        let tokens = tokenize(expression);
        let mut parser = ExprParser {
            tokens: &tokens,
            pos: 0,
            conditions: self,
        };
        match parser.parse_or() {
            Some(value) if parser.pos == tokens.len() => value,
            _ => false,
        }
    }
}

impl From<Vec<String>> for ConditionSet {
    fn from(conditions: Vec<String>) -> Self {
        conditions.iter().map(String::as_str).collect()
    }
}

impl<'a> FromIterator<&'a str> for ConditionSet {
    fn from_iter<T: IntoIterator<Item = &'a str>>(iter: T) -> Self {
        let mut set = ConditionSet::new();
        for condition in iter {
            set.insert(condition);
        }
        set
    }
}

fn normalize(condition: &str) -> String {
    condition.chars().filter(|c| !c.is_whitespace()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Not,
    And,
    Or,
    Open,
    Close,
    /// An identifier or a call form such as `os(macOS)`.
    Atom(String),
    Invalid,
}

fn tokenize(expression: &str) -> Vec<Token> {
    let chars: Vec<char> = expression.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '!' => {
                tokens.push(Token::Not);
                i += 1;
            }
            '&' if chars.get(i + 1) == Some(&'&') => {
                tokens.push(Token::And);
                i += 2;
            }
            '|' if chars.get(i + 1) == Some(&'|') => {
                tokens.push(Token::Or);
                i += 2;
            }
            '(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            ')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            c if c.is_alphanumeric() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let mut atom: String = chars[start..i].iter().collect();

                // Call form: swallow the balanced argument list verbatim.
                let mut lookahead = i;
                while lookahead < chars.len() && chars[lookahead].is_whitespace() {
                    lookahead += 1;
                }
                if chars.get(lookahead) == Some(&'(') {
                    let mut depth = 0usize;
                    let mut end = lookahead;
                    while end < chars.len() {
                        match chars[end] {
                            '(' => depth += 1,
                            ')' => {
                                depth -= 1;
                                if depth == 0 {
                                    break;
                                }
                            }
                            _ => {}
                        }
                        end += 1;
                    }
                    if end == chars.len() {
                        tokens.push(Token::Invalid);
                        return tokens;
                    }
                    atom.extend(chars[lookahead..=end].iter());
                    i = end + 1;
                }
                tokens.push(Token::Atom(normalize(&atom)));
            }
            _ => {
                tokens.push(Token::Invalid);
                i += 1;
            }
        }
    }

    tokens
}

struct ExprParser<'a> {
    tokens: &'a [Token],
    pos: usize,
    conditions: &'a ConditionSet,
}

impl ExprParser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn parse_or(&mut self) -> Option<bool> {
        let mut value = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let rhs = self.parse_and()?;
            value = value || rhs;
        }
        Some(value)
    }

    fn parse_and(&mut self) -> Option<bool> {
        let mut value = self.parse_unary()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let rhs = self.parse_unary()?;
            value = value && rhs;
        }
        Some(value)
    }

    fn parse_unary(&mut self) -> Option<bool> {
        let token = self.peek()?.clone();
        self.pos += 1;
        match token {
            Token::Not => self.parse_unary().map(|value| !value),
            Token::Open => {
                let value = self.parse_or()?;
                if self.peek() != Some(&Token::Close) {
                    return None;
                }
                self.pos += 1;
                Some(value)
            }
            Token::Atom(atom) => Some(match atom.as_str() {
                "true" => true,
                "false" => false,
                _ => self.conditions.active.contains(&atom),
            }),
            Token::And | Token::Or | Token::Close | Token::Invalid => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Directive<'a> {
    If(&'a str),
    ElseIf(&'a str),
    Else,
    EndIf,
}

fn directive(line: &str) -> Option<Directive<'_>> {
    let trimmed = line.trim_start();
    let rest = trimmed.strip_prefix('#')?;
    let word_end = rest
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    let (word, tail) = rest.split_at(word_end);
    let condition = tail.split("//").next().unwrap_or("").trim();
    match word {
        "if" => Some(Directive::If(condition)),
        "elseif" => Some(Directive::ElseIf(condition)),
        "else" => Some(Directive::Else),
        "endif" => Some(Directive::EndIf),
        _ => None,
    }
}

struct Frame {
    /// Whether the enclosing region is active.
    parent_active: bool,
    /// Whether some earlier branch of this `#if` was taken.
    taken: bool,
    /// Whether the current branch is active.
    active: bool,
}

/// Byte ranges of a file that lie in inactive `#if` branches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveRegions {
    inactive: Vec<Range<usize>>,
}

impl ActiveRegions {
    /// Scan `source` for `#if`/`#elseif`/`#else`/`#endif` lines.
    ///
    /// An unterminated `#if` runs to the end of the file;
    /// a stray `#endif` or `#else` is ignored.
    pub fn compute(source: &str, conditions: &ConditionSet) -> Self {
        let mut stack: Vec<Frame> = Vec::new();
        let mut inactive = Vec::new();
        let mut inactive_start: Option<usize> = None;
        let mut offset = 0;

        for line in source.split_inclusive('\n') {
            let line_start = offset;
            let line_end = offset + line.len();
            offset = line_end;

            let Some(directive) = directive(line) else {
                continue;
            };

            let current_active = |stack: &[Frame]| stack.last().map_or(true, |f| f.active);

            match directive {
                Directive::If(condition) => {
                    let parent_active = current_active(&stack);
                    let active = parent_active && conditions.evaluate(condition);
                    stack.push(Frame {
                        parent_active,
                        taken: active,
                        active,
                    });
                }
                Directive::ElseIf(condition) => {
                    if let Some(frame) = stack.last_mut() {
                        frame.active =
                            frame.parent_active && !frame.taken && conditions.evaluate(condition);
                        frame.taken |= frame.active;
                    }
                }
                Directive::Else => {
                    if let Some(frame) = stack.last_mut() {
                        frame.active = frame.parent_active && !frame.taken;
                        frame.taken = true;
                    }
                }
                Directive::EndIf => {
                    stack.pop();
                }
            }

            // Directive lines close any open inactive range and are never
            // themselves reported inactive.
            if let Some(start) = inactive_start.take() {
                if start < line_start {
                    inactive.push(start..line_start);
                }
            }
            if !current_active(&stack) {
                inactive_start = Some(line_end);
            }
        }

        if let Some(start) = inactive_start {
            if start < source.len() {
                inactive.push(start..source.len());
            }
        }

        ActiveRegions { inactive }
    }

    /// Whether `offset` is outside every inactive branch.
    pub fn is_active(&self, offset: usize) -> bool {
        !self.inactive.iter().any(|range| range.contains(&offset))
    }

    pub fn inactive_ranges(&self) -> &[Range<usize>] {
        &self.inactive
    }
}
