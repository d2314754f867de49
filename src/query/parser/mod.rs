// SQL Parser Module
//
// This module is responsible for validating SQL queries and converting them
// into the query model (AST) representation.

// Re-export public components
pub mod ast;
pub mod grammar;
pub mod lexer;
pub mod parser;
pub mod predicate;

// Export key types
pub use self::ast::QueryModel;
pub use self::lexer::{Lexer, Token};
pub use self::parser::{ParseError, ParseResult, Parser, parse};
pub use self::predicate::parse_conjunction;
