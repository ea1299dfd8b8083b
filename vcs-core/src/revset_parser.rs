// Copyright 2026 The vcs-core Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Hand-written lexer and recursive-descent parser for the revset language.
//!
//! The grammar is a fixed set of a dozen functions with no aliases and no
//! keyword arguments, so a small lexer plus a precedence-climbing parser
//! covers it without pulling in a full parser-generator crate.

use crate::revset::Expr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevsetParseError {
    UnexpectedChar { position: usize, ch: char },
    UnexpectedEnd { message: String },
    UnexpectedToken { position: usize, message: String },
    UnknownFunction { name: String, position: usize },
    ArityError { name: String, expected: &'static str, position: usize },
}

impl std::fmt::Display for RevsetParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedChar { position, ch } => write!(f, "unexpected character '{ch}' at {position}"),
            Self::UnexpectedEnd { message } => write!(f, "unexpected end of input: {message}"),
            Self::UnexpectedToken { position, message } => write!(f, "{message} at {position}"),
            Self::UnknownFunction { name, position } => write!(f, "unknown function '{name}' at {position}"),
            Self::ArityError { name, expected, position } => {
                write!(f, "'{name}' expects {expected} at {position}")
            }
        }
    }
}

impl std::error::Error for RevsetParseError {}

pub type RevsetParseResult<T> = Result<T, RevsetParseError>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    StringLiteral(String),
    At,
    LParen,
    RParen,
    Comma,
    Amp,
    Pipe,
    Tilde,
    DotDot,
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    input: &'a str,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self { chars: input.char_indices().peekable(), input }
    }

    fn tokenize(mut self) -> RevsetParseResult<Vec<(usize, Token)>> {
        let mut tokens = Vec::new();
        while let Some(&(pos, ch)) = self.chars.peek() {
            if ch.is_whitespace() {
                self.chars.next();
                continue;
            }
            match ch {
                '@' => {
                    self.chars.next();
                    tokens.push((pos, Token::At));
                }
                '(' => {
                    self.chars.next();
                    tokens.push((pos, Token::LParen));
                }
                ')' => {
                    self.chars.next();
                    tokens.push((pos, Token::RParen));
                }
                ',' => {
                    self.chars.next();
                    tokens.push((pos, Token::Comma));
                }
                '&' => {
                    self.chars.next();
                    tokens.push((pos, Token::Amp));
                }
                '|' => {
                    self.chars.next();
                    tokens.push((pos, Token::Pipe));
                }
                '~' => {
                    self.chars.next();
                    tokens.push((pos, Token::Tilde));
                }
                '.' => {
                    self.chars.next();
                    match self.chars.next() {
                        Some((_, '.')) => tokens.push((pos, Token::DotDot)),
                        _ => return Err(RevsetParseError::UnexpectedChar { position: pos, ch: '.' }),
                    }
                }
                '"' | '\'' => {
                    let quote = ch;
                    self.chars.next();
                    let mut literal = String::new();
                    loop {
                        match self.chars.next() {
                            Some((_, c)) if c == quote => break,
                            Some((_, c)) => literal.push(c),
                            None => return Err(RevsetParseError::UnexpectedEnd { message: "unterminated string".into() }),
                        }
                    }
                    tokens.push((pos, Token::StringLiteral(literal)));
                }
                c if c.is_alphanumeric() || c == '_' || c == '-' => {
                    let start = pos;
                    let mut end = pos + c.len_utf8();
                    self.chars.next();
                    while let Some(&(p, c)) = self.chars.peek() {
                        if c.is_alphanumeric() || c == '_' || c == '-' {
                            end = p + c.len_utf8();
                            self.chars.next();
                        } else {
                            break;
                        }
                    }
                    tokens.push((start, Token::Ident(self.input[start..end].to_string())));
                }
                _ => return Err(RevsetParseError::UnexpectedChar { position: pos, ch }),
            }
        }
        Ok(tokens)
    }
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
}

/// Parses a revset string into an [`Expr`] tree.
pub fn parse(input: &str) -> RevsetParseResult<Expr> {
    let tokens = Lexer::new(input).tokenize()?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_range()?;
    if parser.pos != parser.tokens.len() {
        let (position, _) = parser.tokens[parser.pos].clone();
        return Err(RevsetParseError::UnexpectedToken { position, message: "trailing input".into() });
    }
    Ok(expr)
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn peek_pos(&self) -> usize {
        self.tokens.get(self.pos).map(|(p, _)| *p).unwrap_or(usize::MAX)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token, message: &str) -> RevsetParseResult<()> {
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(RevsetParseError::UnexpectedToken { position: self.peek_pos(), message: message.to_string() })
        }
    }

    fn parse_range(&mut self) -> RevsetParseResult<Expr> {
        let left = self.parse_union()?;
        if self.peek() == Some(&Token::DotDot) {
            self.advance();
            let right = self.parse_union()?;
            return Ok(Expr::Range(Box::new(left), Box::new(right)));
        }
        Ok(left)
    }

    fn parse_union(&mut self) -> RevsetParseResult<Expr> {
        let mut left = self.parse_difference()?;
        while self.peek() == Some(&Token::Pipe) {
            self.advance();
            let right = self.parse_difference()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_difference(&mut self) -> RevsetParseResult<Expr> {
        let mut left = self.parse_intersection()?;
        while self.peek() == Some(&Token::Tilde) {
            self.advance();
            let right = self.parse_intersection()?;
            left = Expr::Difference(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_intersection(&mut self) -> RevsetParseResult<Expr> {
        let mut left = self.parse_primary()?;
        while self.peek() == Some(&Token::Amp) {
            self.advance();
            let right = self.parse_primary()?;
            left = Expr::Intersection(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> RevsetParseResult<Expr> {
        let position = self.peek_pos();
        match self.advance() {
            Some(Token::At) => Ok(Expr::WorkingCopy),
            Some(Token::LParen) => {
                let inner = self.parse_range()?;
                self.expect(&Token::RParen, "expected ')'")?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.parse_function(name, position)
                } else {
                    Ok(Expr::Symbol(name))
                }
            }
            Some(other) => Err(RevsetParseError::UnexpectedToken {
                position,
                message: format!("unexpected token {other:?}"),
            }),
            None => Err(RevsetParseError::UnexpectedEnd { message: "expected an expression".into() }),
        }
    }

    fn parse_function(&mut self, name: String, position: usize) -> RevsetParseResult<Expr> {
        self.advance(); // consume '('
        let mut expr_args = Vec::new();
        let mut string_args = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            loop {
                if let Some(Token::StringLiteral(_)) = self.peek() {
                    if let Some(Token::StringLiteral(s)) = self.advance() {
                        string_args.push(s);
                    }
                } else {
                    expr_args.push(self.parse_range()?);
                }
                if self.peek() == Some(&Token::Comma) {
                    self.advance();
                    continue;
                }
                break;
            }
        }
        self.expect(&Token::RParen, "expected ')'")?;

        macro_rules! one_expr {
            ($variant:ident) => {{
                let mut iter = expr_args.into_iter();
                match (iter.next(), iter.next()) {
                    (Some(a), None) if string_args.is_empty() => Ok(Expr::$variant(Box::new(a))),
                    _ => Err(RevsetParseError::ArityError { name, expected: "exactly one revset argument", position }),
                }
            }};
        }
        macro_rules! one_string {
            ($variant:ident) => {{
                let mut iter = string_args.into_iter();
                match (iter.next(), iter.next()) {
                    (Some(s), None) if expr_args.is_empty() => Ok(Expr::$variant(s)),
                    _ => Err(RevsetParseError::ArityError { name, expected: "exactly one string argument", position }),
                }
            }};
        }

        match name.as_str() {
            "all" => nullary(Expr::All, &expr_args, &string_args, &name, position),
            "none" => nullary(Expr::None, &expr_args, &string_args, &name, position),
            "root" => nullary(Expr::Root, &expr_args, &string_args, &name, position),
            "visible_heads" => nullary(Expr::VisibleHeads, &expr_args, &string_args, &name, position),
            "git_refs" => nullary(Expr::GitRefs, &expr_args, &string_args, &name, position),
            "git_head" => nullary(Expr::GitHead, &expr_args, &string_args, &name, position),
            "mine" => nullary(Expr::Mine, &expr_args, &string_args, &name, position),
            "empty" => nullary(Expr::Empty, &expr_args, &string_args, &name, position),
            "conflicted" => nullary(Expr::Conflicted, &expr_args, &string_args, &name, position),
            "parents" => one_expr!(Parents),
            "ancestors" => one_expr!(Ancestors),
            "descendants" => one_expr!(Descendants),
            "children" => one_expr!(Children),
            "reachable" => one_expr!(Reachable),
            "bookmark" => one_string!(Bookmark),
            "author" => one_string!(Author),
            "committer" => one_string!(Committer),
            "description" => one_string!(Description),
            "paths" => one_string!(Paths),
            "tags" => {
                if expr_args.is_empty() && string_args.len() <= 1 {
                    Ok(Expr::Tags(string_args.into_iter().next()))
                } else {
                    Err(RevsetParseError::ArityError { name, expected: "zero or one string argument", position })
                }
            }
            "connected" => {
                let mut iter = expr_args.into_iter();
                match (iter.next(), iter.next(), iter.next()) {
                    (Some(a), Some(b), None) if string_args.is_empty() => {
                        Ok(Expr::Connected(Box::new(a), Box::new(b)))
                    }
                    _ => Err(RevsetParseError::ArityError { name, expected: "exactly two revset arguments", position }),
                }
            }
            _ => Err(RevsetParseError::UnknownFunction { name, position }),
        }
    }
}

fn nullary(
    expr: Expr,
    expr_args: &[Expr],
    string_args: &[String],
    name: &str,
    position: usize,
) -> RevsetParseResult<Expr> {
    if expr_args.is_empty() && string_args.is_empty() {
        Ok(expr)
    } else {
        Err(RevsetParseError::ArityError { name: name.to_string(), expected: "no arguments", position })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nullary_functions() {
        assert_eq!(parse("all()").unwrap(), Expr::All);
        assert_eq!(parse("none()").unwrap(), Expr::None);
        assert_eq!(parse("@").unwrap(), Expr::WorkingCopy);
    }

    #[test]
    fn parses_unary_with_nested_symbol() {
        let expr = parse("parents(@)").unwrap();
        assert_eq!(expr, Expr::Parents(Box::new(Expr::WorkingCopy)));
    }

    #[test]
    fn parses_binary_operators_with_precedence() {
        // `&` binds tighter than `~`, which binds tighter than `|`.
        let expr = parse("all() | none() ~ root()").unwrap();
        assert_eq!(
            expr,
            Expr::Union(
                Box::new(Expr::All),
                Box::new(Expr::Difference(Box::new(Expr::None), Box::new(Expr::Root))),
            )
        );
    }

    #[test]
    fn parses_range_operator() {
        let expr = parse("abc..def").unwrap();
        assert_eq!(
            expr,
            Expr::Range(Box::new(Expr::Symbol("abc".into())), Box::new(Expr::Symbol("def".into())))
        );
    }

    #[test]
    fn parses_string_argument_function() {
        let expr = parse("bookmark(\"main\")").unwrap();
        assert_eq!(expr, Expr::Bookmark("main".into()));
    }

    #[test]
    fn unknown_function_is_an_error() {
        let err = parse("bogus()").unwrap_err();
        assert!(matches!(err, RevsetParseError::UnknownFunction { .. }));
    }

    #[test]
    fn wrong_arity_is_an_error() {
        let err = parse("parents()").unwrap_err();
        assert!(matches!(err, RevsetParseError::ArityError { .. }));
    }

    #[test]
    fn unclosed_paren_is_an_error() {
        assert!(parse("(all()").is_err());
    }
}
