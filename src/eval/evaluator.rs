use log::debug;

use super::lexer::{Lexer, TokenKind};
use super::{ErrorKind, EvalError, SymbolTable, Value};

/// Initial capacity for both working stacks; interactive one-line input
/// rarely nests deeper, and the `Vec`s grow when it does.
const STACK_CAPACITY: usize = 64;

/// Operators that can wait on the operator stack. Factorial is absent on
/// purpose: it applies immediately and never waits. Keeping this enum separate
/// from `TokenKind` makes "fold an operator the table does not know" a state
/// the type system cannot express.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpKind {
    /// Bottom-of-stack sentinel. Its precedence loses to everything, so the
    /// final fold at end of line drains the stack down to it and stops.
    LineStart,
    OpenParen,
    /// Unary minus.
    Negate,
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
}

#[derive(Debug, Clone, Copy)]
struct Op {
    kind: OpKind,
    /// Source offset of the operator, used for fault attribution: arithmetic
    /// errors point at the operator, not at its operands.
    pos: usize,
}

/// Right-binding precedence of an operator waiting on the stack.
fn stack_precedence(kind: OpKind) -> u8 {
    match kind {
        OpKind::LineStart | OpKind::OpenParen => 0,
        OpKind::Add | OpKind::Subtract => 50,
        OpKind::Multiply | OpKind::Divide => 55,
        OpKind::Negate => 59,
        OpKind::Power => 60,
    }
}

/// Left-binding precedence of an incoming token. A pending operator folds
/// while its right-binding precedence is at least this, so equal pairs fold
/// (left associativity for `+ - * /`), while power's 61 against its own
/// right-binding 60 leaves a pending `^` on the stack (right associativity).
/// Tokens that can never follow a value bind at 255: nothing folds before
/// they are rejected as "expected operator".
fn incoming_precedence(kind: &TokenKind) -> u8 {
    match kind {
        TokenKind::EndOfLine | TokenKind::CloseParen => 1,
        TokenKind::Add | TokenKind::Subtract => 50,
        TokenKind::Multiply | TokenKind::Divide => 55,
        TokenKind::Power => 61,
        TokenKind::Factorial => 62,
        _ => 255,
    }
}

enum State {
    ExpectValue,
    ExpectOperator,
    Done(Value),
}

/// Single-pass precedence-climbing evaluator.
///
/// Lexing, parsing and evaluation are fused: tokens are pulled on demand and
/// completed sub-expressions fold eagerly, so no parse tree is built and one
/// forward scan suffices. Both working stacks live only for the duration of
/// one [`evaluate`](Evaluator::evaluate) call; the symbol table is the only
/// state shared across lines.
pub struct Evaluator<'t> {
    symbols: &'t SymbolTable,
    opers: Vec<Op>,
    values: Vec<Value>,
}

impl<'t> Evaluator<'t> {
    pub fn new(symbols: &'t SymbolTable) -> Self {
        Self {
            symbols,
            opers: Vec::with_capacity(STACK_CAPACITY),
            values: Vec::with_capacity(STACK_CAPACITY),
        }
    }

    /// Evaluates one line of input to a single value. Any error aborts the
    /// line immediately and carries the byte offset of the fault.
    pub fn evaluate(&mut self, line: &str) -> Result<Value, EvalError> {
        debug!("evaluating {line:?}");
        self.opers.clear();
        self.opers.push(Op {
            kind: OpKind::LineStart,
            pos: 0,
        });
        self.values.clear();

        let mut lexer = Lexer::new(line);
        let mut state = State::ExpectValue;
        loop {
            state = match state {
                State::ExpectValue => self.expect_value(&mut lexer)?,
                State::ExpectOperator => self.expect_operator(&mut lexer)?,
                State::Done(value) => return Ok(value),
            };
        }
    }

    fn expect_value(&mut self, lexer: &mut Lexer) -> Result<State, EvalError> {
        let token = lexer.next_token()?;
        match token.kind {
            TokenKind::OpenParen => {
                self.opers.push(Op {
                    kind: OpKind::OpenParen,
                    pos: token.pos,
                });
                Ok(State::ExpectValue)
            }
            // unary plus is consumed silently
            TokenKind::Add => Ok(State::ExpectValue),
            TokenKind::Subtract => {
                self.opers.push(Op {
                    kind: OpKind::Negate,
                    pos: token.pos,
                });
                Ok(State::ExpectValue)
            }
            TokenKind::Identifier(name) => {
                let value = self
                    .symbols
                    .get(name)
                    .ok_or_else(|| EvalError::new(ErrorKind::IdentifierNotFound, token.pos))?;
                self.values.push(value);
                Ok(State::ExpectOperator)
            }
            TokenKind::Number(value) => {
                self.values.push(Value::Real(value));
                Ok(State::ExpectOperator)
            }
            _ => Err(EvalError::new(ErrorKind::ExpectedValue, token.pos)),
        }
    }

    fn expect_operator(&mut self, lexer: &mut Lexer) -> Result<State, EvalError> {
        let token = lexer.next_token()?;

        loop {
            let top = self.top_op();
            if stack_precedence(top.kind) < incoming_precedence(&token.kind) {
                break;
            }
            self.opers.pop();
            debug!("folding {top:?}");
            self.fold(top)?;
        }

        match token.kind {
            TokenKind::Add => Ok(self.push_binary(OpKind::Add, token.pos)),
            TokenKind::Subtract => Ok(self.push_binary(OpKind::Subtract, token.pos)),
            TokenKind::Multiply => Ok(self.push_binary(OpKind::Multiply, token.pos)),
            TokenKind::Divide => Ok(self.push_binary(OpKind::Divide, token.pos)),
            TokenKind::Power => Ok(self.push_binary(OpKind::Power, token.pos)),
            TokenKind::Factorial => {
                // applied in place to the value-stack top; never pushed
                let x = self.pop_real(token.pos)?;
                if x < 0.0 {
                    return Err(EvalError::new(ErrorKind::NegativeFactorial, token.pos));
                }
                self.values.push(Value::Real(libm::tgamma(1.0 + x)));
                Ok(State::ExpectOperator)
            }
            TokenKind::EndOfLine => {
                // anything above the sentinel at this point is an unclosed `(`
                if self.opers.len() != 1 {
                    return Err(EvalError::new(ErrorKind::ParenthesisNotClosed, token.pos));
                }
                let value = self.values.pop().expect("value stack empty at end of line");
                Ok(State::Done(value))
            }
            TokenKind::CloseParen => {
                if self.top_op().kind != OpKind::OpenParen {
                    return Err(EvalError::new(ErrorKind::MismatchedParenthesis, token.pos));
                }
                self.opers.pop();
                Ok(State::ExpectOperator)
            }
            _ => Err(EvalError::new(ErrorKind::ExpectedOperator, token.pos)),
        }
    }

    /// Applies one already-popped operator to the top of the value stack.
    fn fold(&mut self, op: Op) -> Result<(), EvalError> {
        let result = match op.kind {
            OpKind::Negate => -self.pop_real(op.pos)?,
            OpKind::Add => {
                let (left, right) = self.pop_pair(op.pos)?;
                left + right
            }
            OpKind::Subtract => {
                let (left, right) = self.pop_pair(op.pos)?;
                left - right
            }
            OpKind::Multiply => {
                let (left, right) = self.pop_pair(op.pos)?;
                left * right
            }
            OpKind::Divide => {
                let (left, right) = self.pop_pair(op.pos)?;
                if right == 0.0 {
                    return Err(EvalError::new(ErrorKind::DivideByZero, op.pos));
                }
                left / right
            }
            OpKind::Power => {
                let (left, right) = self.pop_pair(op.pos)?;
                if left < 0.0 {
                    return Err(EvalError::new(ErrorKind::NegativePowerBase, op.pos));
                }
                left.powf(right)
            }
            // both bind at 0, so the fold loop can never pop them
            OpKind::LineStart | OpKind::OpenParen => {
                unreachable!("precedence table let a non-operator fold")
            }
        };
        self.values.push(Value::Real(result));
        Ok(())
    }

    fn push_binary(&mut self, kind: OpKind, pos: usize) -> State {
        self.opers.push(Op { kind, pos });
        State::ExpectValue
    }

    fn top_op(&self) -> Op {
        *self.opers.last().expect("operator stack lost its sentinel")
    }

    /// Pops one operand, requiring it to be a real number. The error offset
    /// is the operator's, per the fault-attribution rule.
    fn pop_real(&mut self, at: usize) -> Result<f64, EvalError> {
        match self.values.pop() {
            Some(Value::Real(x)) => Ok(x),
            Some(_) => Err(EvalError::new(ErrorKind::WrongDataType, at)),
            None => unreachable!("value stack underflow"),
        }
    }

    /// Pops two operands, right on top of left.
    fn pop_pair(&mut self, at: usize) -> Result<(f64, f64), EvalError> {
        let right = self.pop_real(at)?;
        let left = self.pop_real(at)?;
        Ok((left, right))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(line: &str) -> Result<Value, EvalError> {
        let symbols = SymbolTable::new();
        let mut evaluator = Evaluator::new(&symbols);
        evaluator.evaluate(line)
    }

    fn eval_real(line: &str) -> f64 {
        match eval(line) {
            Ok(Value::Real(x)) => x,
            other => panic!("expected a real result for {line:?}, got {other:?}"),
        }
    }

    fn eval_err(line: &str) -> EvalError {
        match eval(line) {
            Err(err) => err,
            other => panic!("expected an error for {line:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_basic_arithmetic() {
        assert_eq!(eval_real("1 + 2"), 3.0);
        assert_eq!(eval_real("7 - 4"), 3.0);
        assert_eq!(eval_real("6 * 7"), 42.0);
        assert_eq!(eval_real("10 / 4"), 2.5);
        assert_eq!(eval_real("2 ^ 10"), 1024.0);
    }

    #[test]
    fn test_left_associativity() {
        assert_eq!(eval_real("2 - 3 - 4"), -5.0);
        assert_eq!(eval_real("8 / 4 / 2"), 1.0);
    }

    #[test]
    fn test_power_is_right_associative() {
        assert_eq!(eval_real("2 ^ 3 ^ 2"), 512.0);
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval_real("2 + 3 * 4"), 14.0);
        assert_eq!(eval_real("(2 + 3) * 4"), 20.0);
        assert_eq!(eval_real("2 * 3 ^ 2"), 18.0);
        assert_eq!(eval_real("2 ^ 2 * 3"), 12.0);
    }

    #[test]
    fn test_unary_minus() {
        assert_eq!(eval_real("-2 - -3"), 1.0);
        assert_eq!(eval_real("- -5"), 5.0);
        // unary minus binds looser than power and factorial
        assert_eq!(eval_real("-2 ^ 2"), -4.0);
        assert_eq!(eval_real("-3!"), -6.0);
    }

    #[test]
    fn test_unary_plus_is_silent() {
        assert_eq!(eval_real("+5"), 5.0);
        assert_eq!(eval_real("1 + +2"), 3.0);
    }

    #[test]
    fn test_factorial_gamma_extension() {
        assert!((eval_real("3!") - 6.0).abs() < 1e-9);
        assert!((eval_real("0!") - 1.0).abs() < 1e-9);
        assert!((eval_real("4.5!") - 52.342_777_784_553_52).abs() < 1e-9);
        assert!((eval_real("3!!") - 720.0).abs() < 1e-6);
    }

    #[test]
    fn test_seeded_identifiers() {
        assert_eq!(eval_real("e"), std::f64::consts::E);
        assert_eq!(eval_real("pi"), std::f64::consts::PI);
        assert_eq!(eval_real("2 * pi"), 2.0 * std::f64::consts::PI);
    }

    #[test]
    fn test_identifier_not_found() {
        assert_eq!(
            eval_err("foo"),
            EvalError::new(ErrorKind::IdentifierNotFound, 0)
        );
        assert_eq!(
            eval_err("1 + bar"),
            EvalError::new(ErrorKind::IdentifierNotFound, 4)
        );
    }

    #[test]
    fn test_expected_value_positions() {
        assert_eq!(eval_err("1 +"), EvalError::new(ErrorKind::ExpectedValue, 3));
        assert_eq!(eval_err(""), EvalError::new(ErrorKind::ExpectedValue, 0));
        assert_eq!(
            eval_err("1 + * 2"),
            EvalError::new(ErrorKind::ExpectedValue, 4)
        );
        assert_eq!(eval_err("()"), EvalError::new(ErrorKind::ExpectedValue, 1));
    }

    #[test]
    fn test_expected_operator_positions() {
        assert_eq!(
            eval_err("1 2"),
            EvalError::new(ErrorKind::ExpectedOperator, 2)
        );
        assert_eq!(
            eval_err("(1)(2)"),
            EvalError::new(ErrorKind::ExpectedOperator, 3)
        );
        // longest-prefix lexing: `2e` is the number 2 then the identifier `e`
        assert_eq!(
            eval_err("2e"),
            EvalError::new(ErrorKind::ExpectedOperator, 1)
        );
    }

    #[test]
    fn test_divide_by_zero_points_at_operator() {
        assert_eq!(eval_err("1 / 0"), EvalError::new(ErrorKind::DivideByZero, 2));
        assert_eq!(
            eval_err("1 / (3 - 3)"),
            EvalError::new(ErrorKind::DivideByZero, 2)
        );
    }

    #[test]
    fn test_negative_power_base() {
        assert_eq!(
            eval_err("(-1) ^ 0.5"),
            EvalError::new(ErrorKind::NegativePowerBase, 5)
        );
        // the restriction applies even where the result would be well-defined
        assert_eq!(
            eval_err("(-2) ^ 3"),
            EvalError::new(ErrorKind::NegativePowerBase, 5)
        );
    }

    #[test]
    fn test_negative_factorial() {
        assert_eq!(
            eval_err("(-1)!"),
            EvalError::new(ErrorKind::NegativeFactorial, 4)
        );
    }

    #[test]
    fn test_unmatched_parentheses() {
        assert_eq!(
            eval_err("(1 + 2"),
            EvalError::new(ErrorKind::ParenthesisNotClosed, 6)
        );
        assert_eq!(
            eval_err("1 + 2)"),
            EvalError::new(ErrorKind::MismatchedParenthesis, 5)
        );
    }

    #[test]
    fn test_lexical_errors_propagate() {
        assert_eq!(
            eval_err("1 # 2"),
            EvalError::new(ErrorKind::UnrecognizedToken, 2)
        );
        let long = "a".repeat(65);
        assert_eq!(
            eval_err(&long),
            EvalError::new(ErrorKind::IdentifierTooLong, 0)
        );
    }

    #[test]
    fn test_wrong_data_type_points_at_operator() {
        let mut symbols = SymbolTable::new();
        symbols.set("nothing", Value::Void).unwrap();
        let mut evaluator = Evaluator::new(&symbols);

        assert_eq!(evaluator.evaluate("nothing"), Ok(Value::Void));
        assert_eq!(
            evaluator.evaluate("1 + nothing"),
            Err(EvalError::new(ErrorKind::WrongDataType, 2))
        );
        assert_eq!(
            evaluator.evaluate("-nothing"),
            Err(EvalError::new(ErrorKind::WrongDataType, 0))
        );
        assert_eq!(
            evaluator.evaluate("nothing!"),
            Err(EvalError::new(ErrorKind::WrongDataType, 7))
        );
    }

    #[test]
    fn test_evaluation_leaves_table_unchanged() {
        let symbols = SymbolTable::new();
        let mut evaluator = Evaluator::new(&symbols);
        evaluator.evaluate("1 + pi").unwrap();
        evaluator.evaluate("1 / 0").unwrap_err();
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols.get("pi"), Some(Value::Real(std::f64::consts::PI)));
    }

    #[test]
    fn test_evaluator_is_reusable_across_lines() {
        let symbols = SymbolTable::new();
        let mut evaluator = Evaluator::new(&symbols);
        assert_eq!(evaluator.evaluate("(1 + 2"), Err(EvalError::new(ErrorKind::ParenthesisNotClosed, 6)));
        assert_eq!(evaluator.evaluate("1 + 2"), Ok(Value::Real(3.0)));
    }

    #[test]
    fn test_nesting_deeper_than_initial_capacity() {
        let depth = STACK_CAPACITY + 8;
        let line = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(eval(&line), Ok(Value::Real(1.0)));
    }

    #[test]
    fn test_whitespace_and_tabs() {
        assert_eq!(eval_real("  2 \t+  3 "), 5.0);
        assert_eq!(
            eval_err("\t@"),
            EvalError::new(ErrorKind::UnrecognizedToken, 1)
        );
    }

    #[test]
    fn test_trailing_newline_terminates() {
        assert_eq!(eval_real("1 + 2\n"), 3.0);
    }
}
