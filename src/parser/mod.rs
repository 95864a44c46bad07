//! Script parser
//!
//! This module transforms script source text into an Abstract Syntax Tree (AST):
//! - [`lexer`]: Tokenization (source text → tokens, with indentation tokens)
//! - [`parser`]: Parsing (tokens → AST)
//! - [`ast`]: AST node definitions
//! - [`rewrite`]: Pre-execution pass that turns list displays into tracked lists
//!
//! # Supported Subset
//!
//! The parser accepts the common core of Python used in teaching material:
//! - Statements: assignment (plain, chained, tuple-unpacking, augmented),
//!   `if`/`elif`/`else`, `while`, `for`, `def`, `class`, `return`, `break`,
//!   `continue`, `pass`, `global`, `del`, `assert`, `raise`, `import`
//! - Expressions: arithmetic, comparison chains, boolean logic, conditional
//!   expressions, `lambda`, calls with keyword arguments, attribute access,
//!   subscripts and slices, list/tuple/dict/set displays, comprehensions,
//!   f-strings
//! - No `try`/`except`, `with`, generators, decorators or `*args`
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser with one function per precedence
//! level. No external parser generator dependencies.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod rewrite;

use ast::Program;
use parser::{ParseError, Parser};

/// Parse a complete script
pub fn parse_program(source: &str) -> Result<Program, ParseError> {
    Parser::new(source)?.parse_program()
}
