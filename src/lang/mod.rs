/*!
# Rust Language Module

This Rust module provides lexical analysis of the BASIC language:
the token set, variable names, number text and the error type
shared by the whole interpreter.

*/

#[macro_use]
mod error;
mod ident;
mod lex;
mod number;
mod token;

pub use error::Error;
pub use error::ErrorCode;
pub use ident::{Kind, Name};
pub use lex::{lex, Lexer};
pub use number::{format_number, listing_number, parse_number};
pub use token::{Token, Word};

pub mod code {
    pub use super::token::code::*;
}

/// Line numbers are stored as one address word.
pub type LineNumber = u16;

/// Every value on the operand stack and in a scalar variable.
pub type Number = f64;

/// An offset into the arena. Never a native pointer.
pub type Address = usize;
