// Predicate Lexer Implementation
//
// This module tokenizes WHERE and JOIN condition text so the predicate parser
// can build expression trees from it.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

/// Predicate token types
#[derive(Debug, PartialEq, Clone)]
pub enum TokenType {
    // Keywords
    AND,
    OR,
    NOT,
    LIKE,
    IS,
    NULL,
    BETWEEN,
    IN,

    // Literals
    STRING(String),
    NUMBER(String),

    // Identifiers
    IDENTIFIER(String),

    // Operators
    EQUALS,         // =
    LessThan,       // <
    GreaterThan,    // >
    LessEqual,      // <=
    GreaterEqual,   // >=
    NotEqual,       // <> or !=
    PLUS,           // +
    MINUS,          // -
    MULTIPLY,       // *
    DIVIDE,         // /

    // Punctuation
    COMMA,          // ,
    LeftParen,      // (
    RightParen,     // )
    DOT,            // .

    // Special
    EOF,
    ILLEGAL(String),
}

/// A Token represents a lexical unit in a predicate
#[derive(Debug, Clone)]
pub struct Token {
    pub token_type: TokenType,
    pub literal: String,
    /// Byte offset of the token in the input
    pub offset: usize,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}({})", self.token_type, self.literal)
    }
}

/// Lexer for breaking predicate text into tokens
pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
    offset: usize,
    ch: Option<char>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer over predicate text
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer {
            input: input.chars().peekable(),
            offset: 0,
            ch: None,
        };
        lexer.read_char();
        lexer
    }

    /// Tokenize the whole input, including the trailing EOF token
    pub fn tokenize(input: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(input);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            let is_eof = token.token_type == TokenType::EOF;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    /// Read the next character from the input
    fn read_char(&mut self) -> Option<char> {
        if let Some(c) = self.ch {
            self.offset += c.len_utf8();
        }
        self.ch = self.input.next();
        self.ch
    }

    /// Peek at the next character without advancing
    fn peek_char(&mut self) -> Option<char> {
        self.input.peek().copied()
    }

    /// Skip whitespace characters
    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.ch {
            if ch.is_whitespace() {
                self.read_char();
            } else {
                break;
            }
        }
    }

    /// Read an identifier or keyword
    fn read_identifier(&mut self) -> String {
        let mut identifier = String::new();

        // First character is already read in self.ch
        if let Some(ch) = self.ch {
            identifier.push(ch);
        }

        while let Some(next_ch) = self.peek_char() {
            if is_letter(next_ch) || next_ch.is_ascii_digit() {
                identifier.push(next_ch);
                self.read_char();
            } else {
                break;
            }
        }

        // Advance past the identifier
        self.read_char();

        identifier
    }

    /// Read a number (integer or decimal)
    fn read_number(&mut self) -> String {
        let mut number = String::new();
        let mut has_dot = false;

        if let Some(ch) = self.ch {
            number.push(ch);
        }

        while let Some(next_ch) = self.peek_char() {
            if next_ch.is_ascii_digit() {
                number.push(next_ch);
                self.read_char();
            } else if next_ch == '.' && !has_dot {
                has_dot = true;
                number.push(next_ch);
                self.read_char();
            } else {
                break;
            }
        }

        self.read_char();

        number
    }

    /// Read a string literal (enclosed in single quotes). A doubled quote is
    /// an escaped quote.
    fn read_string(&mut self) -> Option<String> {
        let mut string = String::new();

        // Skip opening quote which is in self.ch
        self.read_char();

        while let Some(ch) = self.ch {
            if ch == '\'' {
                if self.peek_char() == Some('\'') {
                    string.push('\'');
                    self.read_char();
                    self.read_char();
                    continue;
                }
                self.read_char();
                return Some(string);
            }
            string.push(ch);
            self.read_char();
        }

        // Unterminated
        None
    }

    /// Get the token type for an identifier (could be a keyword)
    fn lookup_identifier(&self, ident: &str) -> TokenType {
        match ident.to_uppercase().as_str() {
            "AND" => TokenType::AND,
            "OR" => TokenType::OR,
            "NOT" => TokenType::NOT,
            "LIKE" => TokenType::LIKE,
            "IS" => TokenType::IS,
            "NULL" => TokenType::NULL,
            "BETWEEN" => TokenType::BETWEEN,
            "IN" => TokenType::IN,
            _ => TokenType::IDENTIFIER(ident.to_string()),
        }
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let mut token = Token {
            token_type: TokenType::EOF,
            literal: String::new(),
            offset: self.offset,
        };

        let Some(ch) = self.ch else {
            return token;
        };
        token.literal = ch.to_string();

        match ch {
            ',' => token.token_type = TokenType::COMMA,
            '(' => token.token_type = TokenType::LeftParen,
            ')' => token.token_type = TokenType::RightParen,
            '.' => token.token_type = TokenType::DOT,
            '+' => token.token_type = TokenType::PLUS,
            '-' => token.token_type = TokenType::MINUS,
            '*' => token.token_type = TokenType::MULTIPLY,
            '/' => token.token_type = TokenType::DIVIDE,
            '=' => token.token_type = TokenType::EQUALS,
            '!' => {
                if self.peek_char() == Some('=') {
                    self.read_char();
                    token.literal.push('=');
                    token.token_type = TokenType::NotEqual;
                } else {
                    token.token_type = TokenType::ILLEGAL(ch.to_string());
                }
            }
            '<' => match self.peek_char() {
                Some('=') => {
                    self.read_char();
                    token.literal.push('=');
                    token.token_type = TokenType::LessEqual;
                }
                Some('>') => {
                    self.read_char();
                    token.literal.push('>');
                    token.token_type = TokenType::NotEqual;
                }
                _ => token.token_type = TokenType::LessThan,
            },
            '>' => {
                if self.peek_char() == Some('=') {
                    self.read_char();
                    token.literal.push('=');
                    token.token_type = TokenType::GreaterEqual;
                } else {
                    token.token_type = TokenType::GreaterThan;
                }
            }
            '\'' => {
                match self.read_string() {
                    Some(value) => {
                        token.literal = format!("'{}'", value.replace('\'', "''"));
                        token.token_type = TokenType::STRING(value);
                    }
                    None => {
                        token.token_type = TokenType::ILLEGAL("unterminated string".to_string());
                    }
                }
                // read_string already advanced past the literal
                return token;
            }
            _ => {
                if is_letter(ch) {
                    let identifier = self.read_identifier();
                    token.token_type = self.lookup_identifier(&identifier);
                    token.literal = identifier;
                    return token;
                } else if ch.is_ascii_digit() {
                    let number = self.read_number();
                    token.literal = number.clone();
                    token.token_type = TokenType::NUMBER(number);
                    return token;
                } else {
                    token.token_type = TokenType::ILLEGAL(ch.to_string());
                }
            }
        }

        self.read_char();
        token
    }
}

/// Check if a character can start an identifier
fn is_letter(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}
