mod evaluator;
mod lexer;
mod symbols;

pub use evaluator::Evaluator;
pub use lexer::{Lexer, Token, TokenKind, MAX_IDENTIFIER_LEN};
pub use symbols::{SymbolTable, TableFull, SYMBOL_CAPACITY};

use thiserror::Error;

/// A runtime datum produced by evaluating one line.
///
/// `Void` never comes out of the lexer or the arithmetic; it can only enter an
/// expression through a symbol bound to it, and any arithmetic on it reports
/// "wrong data type".
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Void,
    Real(f64),
}

/// Everything that can go wrong while evaluating a line. All of these are
/// line-scoped and recoverable; the read-eval loop carries on with the next
/// line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("unrecognized token")]
    UnrecognizedToken,
    #[error("identifier name too long")]
    IdentifierTooLong,
    #[error("expected value")]
    ExpectedValue,
    #[error("expected operator")]
    ExpectedOperator,
    #[error("parenthesis not closed")]
    ParenthesisNotClosed,
    #[error("mismatched parenthesis")]
    MismatchedParenthesis,
    #[error("identifier not found")]
    IdentifierNotFound,
    #[error("wrong data type")]
    WrongDataType,
    #[error("divide by zero")]
    DivideByZero,
    #[error("negative power base")]
    NegativePowerBase,
    #[error("factorial of negative number")]
    NegativeFactorial,
}

/// An evaluation failure: what went wrong plus the byte offset in the input
/// line where it went wrong, so the caller can point a caret at the fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct EvalError {
    pub kind: ErrorKind,
    pub offset: usize,
}

impl EvalError {
    pub(crate) fn new(kind: ErrorKind, offset: usize) -> Self {
        Self { kind, offset }
    }
}
