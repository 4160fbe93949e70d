pub mod eval;

pub use eval::{ErrorKind, EvalError, Evaluator, SymbolTable, Value};

/// Evaluates a single line of input against a symbol table.
///
/// ```
/// use calcline::{evaluate_expression, SymbolTable, Value};
///
/// let symbols = SymbolTable::new();
/// assert_eq!(evaluate_expression("2 + 3 * 4", &symbols), Ok(Value::Real(14.0)));
/// ```
pub fn evaluate_expression(line: &str, symbols: &SymbolTable) -> Result<Value, EvalError> {
    let mut evaluator = Evaluator::new(symbols);
    evaluator.evaluate(line)
}
