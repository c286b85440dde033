//! YAMLPath query string parser.

use super::ast::{Comparator, Operand, PathSegment, Pattern, Predicate, YamlPath};
use super::error::YamlPathError;
use crate::document::node::{ScalarValue, YamlNumber};

/// Parser for YAMLPath query strings.
///
/// Positions in errors are character offsets into the query.
pub struct Parser {
    input: Vec<char>,
    position: usize,
}

impl Parser {
    /// Creates a new parser for the given query string.
    pub fn new(query: &str) -> Self {
        Self {
            input: query.chars().collect(),
            position: 0,
        }
    }

    /// Parses the query string into a YamlPath.
    pub fn parse(query: &str) -> Result<YamlPath, YamlPathError> {
        let mut parser = Parser::new(query);
        parser.parse_query()
    }

    /// Query := Path (',' Path)*
    fn parse_query(&mut self) -> Result<YamlPath, YamlPathError> {
        let mut alternatives = vec![self.parse_path()?];
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => break,
                Some(',') => {
                    self.next();
                    alternatives.push(self.parse_path()?);
                }
                Some(ch) => {
                    return Err(YamlPathError::UnexpectedToken {
                        position: self.position,
                        found: ch.to_string(),
                        expected: "'.', '[', ',' or end of expression".to_string(),
                    })
                }
            }
        }

        let mut segments = vec![PathSegment::Root];
        if alternatives.len() == 1 {
            segments.extend(alternatives.into_iter().flatten());
        } else {
            segments.push(PathSegment::Union(alternatives));
        }
        Ok(YamlPath::new(segments))
    }

    /// Path := '$' Segment*, returning the segments after the root.
    fn parse_path(&mut self) -> Result<Vec<PathSegment>, YamlPathError> {
        self.skip_whitespace();
        match self.peek() {
            Some('$') => {
                self.next();
                self.parse_segments()
            }
            Some(ch) => Err(YamlPathError::UnexpectedToken {
                position: self.position,
                found: ch.to_string(),
                expected: "'$'".to_string(),
            }),
            None => Err(YamlPathError::UnexpectedEnd {
                position: self.position,
                expected: "'$'".to_string(),
            }),
        }
    }

    fn parse_segments(&mut self) -> Result<Vec<PathSegment>, YamlPathError> {
        let mut segments = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('.') => {
                    self.next();
                    if self.peek() == Some('.') {
                        self.next();
                        segments.push(PathSegment::RecursiveDescent);
                        match self.peek() {
                            Some('[') => segments.push(self.parse_bracket()?),
                            Some('*') => {
                                self.next();
                                segments.push(PathSegment::Wildcard);
                            }
                            _ => segments.push(PathSegment::Child(self.parse_identifier()?)),
                        }
                    } else if self.peek() == Some('*') {
                        self.next();
                        segments.push(PathSegment::Wildcard);
                    } else {
                        segments.push(PathSegment::Child(self.parse_identifier()?));
                    }
                }
                Some('[') => segments.push(self.parse_bracket()?),
                _ => break,
            }
        }
        Ok(segments)
    }

    /// Returns the current character without advancing.
    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    /// Returns the next character and advances position.
    fn next(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += 1;
        Some(ch)
    }

    fn starts_with(&self, token: &str) -> bool {
        let mut pos = self.position;
        for expected in token.chars() {
            if self.input.get(pos) != Some(&expected) {
                return false;
            }
            pos += 1;
        }
        true
    }

    /// Skips whitespace characters.
    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.next();
            } else {
                break;
            }
        }
    }

    /// Expects a specific character and advances, or returns an error.
    fn expect(&mut self, expected: char) -> Result<(), YamlPathError> {
        self.skip_whitespace();
        let pos = self.position;
        match self.next() {
            Some(ch) if ch == expected => Ok(()),
            Some(ch) => Err(YamlPathError::UnexpectedToken {
                position: pos,
                found: ch.to_string(),
                expected: format!("'{}'", expected),
            }),
            None => Err(YamlPathError::UnexpectedEnd {
                position: pos,
                expected: format!("'{}'", expected),
            }),
        }
    }

    fn unexpected(&self, expected: &str) -> YamlPathError {
        match self.peek() {
            Some(ch) => YamlPathError::UnexpectedToken {
                position: self.position,
                found: ch.to_string(),
                expected: expected.to_string(),
            },
            None => YamlPathError::UnexpectedEnd {
                position: self.position,
                expected: expected.to_string(),
            },
        }
    }

    /// Parses a dot-notation member name: `[A-Za-z0-9_-]+`.
    fn parse_identifier(&mut self) -> Result<String, YamlPathError> {
        self.skip_whitespace();
        let mut name = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' {
                name.push(ch);
                self.next();
            } else {
                break;
            }
        }
        if name.is_empty() {
            Err(self.unexpected("member name"))
        } else {
            Ok(name)
        }
    }

    /// Parses `[ Item (',' Item)* ]`. More than one item makes a union.
    fn parse_bracket(&mut self) -> Result<PathSegment, YamlPathError> {
        let open = self.position;
        self.expect('[')?;
        let end = self.input.len();
        // Running out of input inside a bracket is reported at the bracket.
        self.parse_bracket_items().map_err(|err| match err {
            YamlPathError::UnexpectedEnd { position, expected } if position == end => {
                YamlPathError::UnexpectedEnd {
                    position: open,
                    expected: format!("{} before the closing ']'", expected),
                }
            }
            other => other,
        })
    }

    fn parse_bracket_items(&mut self) -> Result<PathSegment, YamlPathError> {
        let mut items = vec![self.parse_bracket_item()?];
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(',') => {
                    self.next();
                    items.push(self.parse_bracket_item()?);
                }
                Some(']') => {
                    self.next();
                    break;
                }
                _ => return Err(self.unexpected("',' or ']'")),
            }
        }
        if items.len() == 1 {
            Ok(items.remove(0))
        } else {
            Ok(PathSegment::Union(items.into_iter().map(|item| vec![item]).collect()))
        }
    }

    fn parse_bracket_item(&mut self) -> Result<PathSegment, YamlPathError> {
        self.skip_whitespace();
        match self.peek() {
            Some('*') => {
                self.next();
                Ok(PathSegment::Wildcard)
            }
            Some('\'') | Some('"') => Ok(PathSegment::Child(self.parse_quoted()?)),
            Some('?') => {
                self.next();
                Ok(PathSegment::Filter(self.parse_or()?))
            }
            Some('-') | Some(':') | Some('0'..='9') => self.parse_index_or_slice(),
            _ => Err(self.unexpected("'*', quoted name, index, slice or filter")),
        }
    }

    /// Parses a quoted string with JSON-style escapes.
    fn parse_quoted(&mut self) -> Result<String, YamlPathError> {
        let quote = match self.next() {
            Some(ch @ ('\'' | '"')) => ch,
            _ => return Err(self.unexpected("quote")),
        };

        let mut value = String::new();
        loop {
            let escape_pos = self.position;
            match self.next() {
                Some(ch) if ch == quote => break,
                Some('\\') => match self.next() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some('b') => value.push('\u{8}'),
                    Some('f') => value.push('\u{c}'),
                    Some('/') => value.push('/'),
                    Some('\\') => value.push('\\'),
                    Some('\'') => value.push('\''),
                    Some('"') => value.push('"'),
                    Some('u') => value.push(self.parse_unicode_escape(escape_pos)?),
                    Some(_) => {
                        return Err(YamlPathError::InvalidSyntax {
                            position: escape_pos,
                            message: "invalid escape sequence".to_string(),
                        })
                    }
                    None => {
                        return Err(YamlPathError::UnexpectedEnd {
                            position: self.position,
                            expected: "escaped character".to_string(),
                        })
                    }
                },
                Some(ch) => value.push(ch),
                None => {
                    return Err(YamlPathError::UnexpectedEnd {
                        position: self.position,
                        expected: format!("closing quote {}", quote),
                    })
                }
            }
        }
        Ok(value)
    }

    fn parse_unicode_escape(&mut self, escape_pos: usize) -> Result<char, YamlPathError> {
        let invalid = || YamlPathError::InvalidSyntax {
            position: escape_pos,
            message: "invalid unicode escape".to_string(),
        };
        let mut code = 0u32;
        for _ in 0..4 {
            let digit = self
                .next()
                .and_then(|ch| ch.to_digit(16))
                .ok_or_else(invalid)?;
            code = code * 16 + digit;
        }
        char::from_u32(code).ok_or_else(invalid)
    }

    /// Parses an optionally signed integer.
    fn parse_integer(&mut self) -> Result<isize, YamlPathError> {
        let start = self.position;
        let mut num = String::new();
        if self.peek() == Some('-') {
            num.push('-');
            self.next();
        }
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                num.push(ch);
                self.next();
            } else {
                break;
            }
        }
        if num.is_empty() || num == "-" {
            return Err(self.unexpected("digit"));
        }
        num.parse::<isize>().map_err(|_| YamlPathError::InvalidSyntax {
            position: start,
            message: format!("integer out of range: {}", num),
        })
    }

    fn parse_optional_integer(&mut self) -> Result<Option<isize>, YamlPathError> {
        self.skip_whitespace();
        match self.peek() {
            Some('-') | Some('0'..='9') => self.parse_integer().map(Some),
            _ => Ok(None),
        }
    }

    /// Parses `[start:end:step]` or a plain index.
    fn parse_index_or_slice(&mut self) -> Result<PathSegment, YamlPathError> {
        let start = self.parse_optional_integer()?;
        self.skip_whitespace();
        if self.peek() != Some(':') {
            return match start {
                Some(index) => Ok(PathSegment::Index(index)),
                None => Err(self.unexpected("index or slice")),
            };
        }
        self.next();

        let end = self.parse_optional_integer()?;
        self.skip_whitespace();

        let step = if self.peek() == Some(':') {
            self.next();
            self.skip_whitespace();
            let step_pos = self.position;
            let step = self.parse_optional_integer()?;
            if step == Some(0) {
                return Err(YamlPathError::InvalidSyntax {
                    position: step_pos,
                    message: "slice step cannot be zero".to_string(),
                });
            }
            step
        } else {
            None
        };

        Ok(PathSegment::Slice(start, end, step))
    }

    /// Or := And ('||' And)*
    fn parse_or(&mut self) -> Result<Predicate, YamlPathError> {
        let mut left = self.parse_and()?;
        loop {
            self.skip_whitespace();
            if !self.starts_with("||") {
                return Ok(left);
            }
            self.position += 2;
            let right = self.parse_and()?;
            left = Predicate::Or(Box::new(left), Box::new(right));
        }
    }

    /// And := Unary ('&&' Unary)*
    fn parse_and(&mut self) -> Result<Predicate, YamlPathError> {
        let mut left = self.parse_unary()?;
        loop {
            self.skip_whitespace();
            if !self.starts_with("&&") {
                return Ok(left);
            }
            self.position += 2;
            let right = self.parse_unary()?;
            left = Predicate::And(Box::new(left), Box::new(right));
        }
    }

    fn parse_unary(&mut self) -> Result<Predicate, YamlPathError> {
        self.skip_whitespace();
        match self.peek() {
            Some('!') => {
                self.next();
                Ok(Predicate::Not(Box::new(self.parse_unary()?)))
            }
            Some('(') => {
                self.next();
                let inner = self.parse_or()?;
                self.expect(')')?;
                Ok(inner)
            }
            _ => {
                let left = self.parse_operand()?;
                self.skip_whitespace();
                if self.starts_with("=~") {
                    self.position += 2;
                    let pattern = self.parse_regex()?;
                    return Ok(Predicate::Matches(left, pattern));
                }
                match self.parse_comparator() {
                    Some(op) => {
                        let right = self.parse_operand()?;
                        Ok(Predicate::Compare(left, op, right))
                    }
                    None => Ok(Predicate::Exists(left)),
                }
            }
        }
    }

    fn parse_comparator(&mut self) -> Option<Comparator> {
        let (op, len) = if self.starts_with("==") {
            (Comparator::Eq, 2)
        } else if self.starts_with("!=") {
            (Comparator::Ne, 2)
        } else if self.starts_with("<=") {
            (Comparator::Le, 2)
        } else if self.starts_with(">=") {
            (Comparator::Ge, 2)
        } else if self.starts_with("<") {
            (Comparator::Lt, 1)
        } else if self.starts_with(">") {
            (Comparator::Gt, 1)
        } else {
            return None;
        };
        self.position += len;
        Some(op)
    }

    fn parse_operand(&mut self) -> Result<Operand, YamlPathError> {
        self.skip_whitespace();
        match self.peek() {
            Some('@') => {
                self.next();
                Ok(Operand::Current(self.parse_segments()?))
            }
            Some('$') => {
                self.next();
                Ok(Operand::Root(self.parse_segments()?))
            }
            Some('\'') | Some('"') => Ok(Operand::Literal(ScalarValue::String(self.parse_quoted()?))),
            Some('-') | Some('0'..='9') => Ok(Operand::Literal(ScalarValue::Number(
                self.parse_number_literal()?,
            ))),
            Some(ch) if ch.is_ascii_alphabetic() => {
                let start = self.position;
                let mut word = String::new();
                while let Some(ch) = self.peek().filter(|c| c.is_ascii_alphabetic()) {
                    word.push(ch);
                    self.next();
                }
                match word.as_str() {
                    "true" => Ok(Operand::Literal(ScalarValue::Boolean(true))),
                    "false" => Ok(Operand::Literal(ScalarValue::Boolean(false))),
                    "null" => Ok(Operand::Literal(ScalarValue::Null)),
                    _ => Err(YamlPathError::UnexpectedToken {
                        position: start,
                        found: word,
                        expected: "filter operand".to_string(),
                    }),
                }
            }
            _ => Err(self.unexpected("filter operand")),
        }
    }

    /// Number := '-'? digits ('.' digits)? ([eE] [+-]? digits)?
    fn parse_number_literal(&mut self) -> Result<YamlNumber, YamlPathError> {
        let start = self.position;
        let mut text = String::new();
        if self.peek() == Some('-') {
            text.push('-');
            self.next();
        }
        let mut is_float = false;
        while let Some(ch) = self.peek() {
            match ch {
                '0'..='9' => {}
                '.' | 'e' | 'E' => is_float = true,
                '+' | '-' if text.ends_with(['e', 'E']) => {}
                _ => break,
            }
            text.push(ch);
            self.next();
        }

        let invalid = || YamlPathError::InvalidSyntax {
            position: start,
            message: format!("invalid number: {}", text),
        };
        if is_float {
            match text.parse::<f64>() {
                Ok(value) if value.is_finite() => Ok(YamlNumber::Float(value)),
                _ => Err(invalid()),
            }
        } else {
            text.parse::<i64>().map(YamlNumber::Integer).map_err(|_| invalid())
        }
    }

    /// Regex := '/' pattern '/', with `\/` standing for a literal slash.
    fn parse_regex(&mut self) -> Result<Pattern, YamlPathError> {
        self.expect('/')?;
        let start = self.position;
        let mut source = String::new();
        loop {
            match self.next() {
                Some('/') => break,
                Some('\\') => match self.next() {
                    Some('/') => source.push('/'),
                    Some(ch) => {
                        source.push('\\');
                        source.push(ch);
                    }
                    None => break,
                },
                Some(ch) => source.push(ch),
                None => {
                    return Err(YamlPathError::UnexpectedEnd {
                        position: self.position,
                        expected: "closing '/'".to_string(),
                    })
                }
            }
        }
        Pattern::new(&source).map_err(|err| YamlPathError::InvalidSyntax {
            position: start,
            message: format!("invalid regular expression: {}", err),
        })
    }
}
