// Predicate Parser Implementation
//
// This module implements a small recursive descent parser that turns WHERE
// and JOIN condition text into predicate trees. It is total: text the grammar
// does not cover is kept as an opaque predicate instead of being rejected.

use std::iter::Peekable;
use std::vec::IntoIter;

use log::debug;

use super::ast::*;
use super::lexer::{Lexer, Token, TokenType};

/// Internal failure of the structured predicate grammar
#[derive(Debug)]
struct PredicateError(String);

type PredicateResult<T> = Result<T, PredicateError>;

/// Predicate parser over a token stream
struct PredicateParser {
    tokens: Peekable<IntoIter<Token>>,
    current_token: Option<Token>,
}

impl PredicateParser {
    fn new(tokens: Vec<Token>) -> Self {
        let mut parser = PredicateParser {
            tokens: tokens.into_iter().peekable(),
            current_token: None,
        };
        parser.next_token();
        parser
    }

    /// Advance to the next token
    fn next_token(&mut self) {
        self.current_token = self.tokens.next();
    }

    fn current_type(&self) -> Option<&TokenType> {
        self.current_token.as_ref().map(|t| &t.token_type)
    }

    fn current_token_is(&self, token_type: &TokenType) -> bool {
        self.current_type() == Some(token_type)
    }

    fn expect_token(&mut self, expected: TokenType) -> PredicateResult<()> {
        if self.current_token_is(&expected) {
            self.next_token();
            Ok(())
        } else {
            Err(self.unexpected(&format!("{:?}", expected)))
        }
    }

    fn unexpected(&self, wanted: &str) -> PredicateError {
        match &self.current_token {
            Some(token) => PredicateError(format!("expected {}, found {}", wanted, token)),
            None => PredicateError(format!("expected {}, found end of input", wanted)),
        }
    }

    /// Parse a complete predicate; trailing tokens are an error
    fn parse_complete(&mut self) -> PredicateResult<Predicate> {
        let predicate = self.parse_or()?;
        if !self.current_token_is(&TokenType::EOF) {
            return Err(self.unexpected("end of predicate"));
        }
        Ok(predicate)
    }

    fn parse_or(&mut self) -> PredicateResult<Predicate> {
        let mut items = vec![self.parse_and()?];
        while self.current_token_is(&TokenType::OR) {
            self.next_token();
            items.push(self.parse_and()?);
        }
        Ok(if items.len() == 1 { items.remove(0) } else { Predicate::Or(items) })
    }

    fn parse_and(&mut self) -> PredicateResult<Predicate> {
        let mut items = vec![self.parse_unary()?];
        while self.current_token_is(&TokenType::AND) {
            self.next_token();
            items.push(self.parse_unary()?);
        }
        Ok(if items.len() == 1 { items.remove(0) } else { Predicate::And(items) })
    }

    fn parse_unary(&mut self) -> PredicateResult<Predicate> {
        if self.current_token_is(&TokenType::NOT) {
            self.next_token();
            let inner = self.parse_unary()?;
            return Ok(Predicate::Not(Box::new(inner)));
        }
        if self.current_token_is(&TokenType::LeftParen) {
            self.next_token();
            let inner = self.parse_or()?;
            self.expect_token(TokenType::RightParen)?;
            return Ok(inner);
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> PredicateResult<Predicate> {
        let left = self.parse_operand()?;

        let op = match self.current_type() {
            Some(TokenType::EQUALS) => CompareOp::Eq,
            Some(TokenType::NotEqual) => CompareOp::NotEq,
            Some(TokenType::LessThan) => CompareOp::Lt,
            Some(TokenType::LessEqual) => CompareOp::LtEq,
            Some(TokenType::GreaterThan) => CompareOp::Gt,
            Some(TokenType::GreaterEqual) => CompareOp::GtEq,
            Some(TokenType::LIKE) => CompareOp::Like,
            Some(TokenType::IS) => {
                self.next_token();
                let negated = if self.current_token_is(&TokenType::NOT) {
                    self.next_token();
                    true
                } else {
                    false
                };
                self.expect_token(TokenType::NULL)?;
                return Ok(Predicate::IsNull { operand: left, negated });
            }
            Some(TokenType::NOT) => {
                // NOT LIKE
                self.next_token();
                self.expect_token(TokenType::LIKE)?;
                let right = self.parse_operand()?;
                return Ok(Predicate::Not(Box::new(Predicate::Comparison(Comparison {
                    left,
                    op: CompareOp::Like,
                    right,
                }))));
            }
            _ => return Err(self.unexpected("comparison operator")),
        };
        self.next_token();

        let right = self.parse_operand()?;
        Ok(Predicate::Comparison(Comparison { left, op, right }))
    }

    fn parse_operand(&mut self) -> PredicateResult<Operand> {
        let Some(token_type) = self.current_type().cloned() else {
            return Err(self.unexpected("operand"));
        };
        match token_type {
            TokenType::IDENTIFIER(first) => {
                self.next_token();
                if self.current_token_is(&TokenType::DOT) {
                    self.next_token();
                    match self.current_type().cloned() {
                        Some(TokenType::IDENTIFIER(name)) => {
                            self.next_token();
                            Ok(Operand::Column(ColumnRef::qualified(first, name)))
                        }
                        _ => Err(self.unexpected("column name after '.'")),
                    }
                } else if self.current_token_is(&TokenType::LeftParen) {
                    Err(PredicateError(format!("function call {} is not supported", first)))
                } else {
                    Ok(Operand::Column(ColumnRef::bare(first)))
                }
            }
            TokenType::NUMBER(n) => {
                self.next_token();
                Ok(Operand::Literal(Literal::Number(n)))
            }
            TokenType::MINUS => {
                self.next_token();
                match self.current_type().cloned() {
                    Some(TokenType::NUMBER(n)) => {
                        self.next_token();
                        Ok(Operand::Literal(Literal::Number(format!("-{}", n))))
                    }
                    _ => Err(self.unexpected("number after '-'")),
                }
            }
            TokenType::STRING(s) => {
                self.next_token();
                Ok(Operand::Literal(Literal::String(s)))
            }
            TokenType::NULL => {
                self.next_token();
                Ok(Operand::Literal(Literal::Null))
            }
            _ => Err(self.unexpected("operand")),
        }
    }
}

/// Parse predicate text into a conjunction of atomic predicates.
///
/// Top-level ANDs (including ones inside a fully parenthesized group) are
/// flattened. If the text does not fit the predicate grammar, it is split on
/// top-level ANDs and every segment that still does not parse is kept as
/// [`Predicate::Opaque`].
pub fn parse_conjunction(text: &str) -> Conjunction {
    let text = text.trim();
    if text.is_empty() {
        return Conjunction::new();
    }

    let tokens = Lexer::tokenize(text);
    match PredicateParser::new(tokens.clone()).parse_complete() {
        Ok(predicate) => {
            let mut items = Vec::new();
            flatten_and(predicate, &mut items);
            Conjunction::from(items)
        }
        Err(PredicateError(reason)) => {
            debug!("Predicate '{}' kept partially opaque: {}", text, reason);
            let mut items = Vec::new();
            for segment in split_top_level_and(text, &tokens) {
                flatten_and(parse_segment(segment), &mut items);
            }
            Conjunction::from(items)
        }
    }
}

fn flatten_and(predicate: Predicate, out: &mut Vec<Predicate>) {
    match predicate {
        Predicate::And(items) => {
            for item in items {
                flatten_and(item, out);
            }
        }
        other => out.push(other),
    }
}

/// Parse one AND-free segment, falling back to an opaque predicate
fn parse_segment(segment: &str) -> Predicate {
    let tokens = Lexer::tokenize(segment);
    match PredicateParser::new(tokens.clone()).parse_complete() {
        Ok(predicate) => predicate,
        Err(_) => Predicate::Opaque {
            text: segment.to_string(),
            columns: scan_columns(&tokens),
        },
    }
}

/// Split `text` at AND tokens outside parentheses. The AND belonging to a
/// BETWEEN range is not a separator.
fn split_top_level_and<'a>(text: &'a str, tokens: &[Token]) -> Vec<&'a str> {
    let mut segments = Vec::new();
    let mut depth: i32 = 0;
    let mut pending_between = false;
    let mut start = 0;

    for token in tokens {
        match token.token_type {
            TokenType::LeftParen => depth += 1,
            TokenType::RightParen => depth -= 1,
            TokenType::BETWEEN if depth == 0 => pending_between = true,
            TokenType::AND if depth == 0 => {
                if pending_between {
                    pending_between = false;
                    continue;
                }
                let segment = text[start..token.offset].trim();
                if !segment.is_empty() {
                    segments.push(segment);
                }
                start = token.offset + token.literal.len();
            }
            _ => {}
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        segments.push(tail);
    }
    segments
}

/// Collect column references from raw tokens: `T.C` pairs and bare
/// identifiers that are not function names.
fn scan_columns(tokens: &[Token]) -> Vec<ColumnRef> {
    let mut columns = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        if let TokenType::IDENTIFIER(first) = &tokens[i].token_type {
            let next = tokens.get(i + 1).map(|t| &t.token_type);
            let after = tokens.get(i + 2).map(|t| &t.token_type);
            match (next, after) {
                (Some(TokenType::DOT), Some(TokenType::IDENTIFIER(name))) => {
                    columns.push(ColumnRef::qualified(first.clone(), name.clone()));
                    i += 3;
                    continue;
                }
                (Some(TokenType::LeftParen), _) => {}
                _ => columns.push(ColumnRef::bare(first.clone())),
            }
        }
        i += 1;
    }
    columns
}
