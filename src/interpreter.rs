//! Tree-walking evaluator.
//!
//! The interpreter owns the global environment, the currently-active
//! environment, and the `locals` side table written by the resolver.  A
//! variable reference with an entry in `locals` is read by climbing exactly
//! that many environment frames; one without is a global.
//!
//! `return` unwinds through the statement evaluators as the non-error arm
//! of [`Interrupt`]; the function-call boundary converts it back into an
//! ordinary value.  Block execution restores the previous environment on
//! every exit path, unwind included.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};

use crate::environment::Environment;
use crate::error::{LarkError, Result};
use crate::expr::{Expr, ExprId, LiteralValue};
use crate::stmt::Stmt;
use crate::token::{Token, TokenType};
use crate::value::{Function, Value};

/// Non-local exit from a statement: either a `return` carrying its value
/// up to the innermost call boundary, or an actual runtime failure.
pub enum Interrupt {
    Return(Value),
    Failure(LarkError),
}

impl From<LarkError> for Interrupt {
    fn from(err: LarkError) -> Self {
        Interrupt::Failure(err)
    }
}

type ExecResult = std::result::Result<(), Interrupt>;
type EvalResult = std::result::Result<Value, Interrupt>;

pub struct Interpreter<'out> {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: HashMap<ExprId, usize>,
    out: &'out mut dyn Write,
}

impl<'out> Interpreter<'out> {
    /// Fresh interpreter writing `print` output to `out`.  The globals come
    /// pre-populated with the native `clock`.
    pub fn new(out: &'out mut dyn Write) -> Self {
        let globals = Rc::new(RefCell::new(Environment::new()));

        globals.borrow_mut().define(
            "clock",
            Value::NativeFunction {
                name: "clock",
                arity: 0,
                func: clock_native,
            },
        );

        Interpreter {
            environment: globals.clone(),
            globals,
            locals: HashMap::new(),
            out,
        }
    }

    /// Record a resolved binding distance for a variable occurrence.
    /// Called by the resolver; occurrences it never notes are globals.
    pub fn note_local(&mut self, id: ExprId, depth: usize) {
        self.locals.insert(id, depth);
    }

    /// Run a resolved program.  Stops at the first runtime error.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        info!("Interpreting {} statement(s)", statements.len());

        for statement in statements {
            match self.execute(statement) {
                Ok(()) => {}

                Err(Interrupt::Failure(e)) => return Err(e),

                // The resolver rejects top-level `return`, so an unwind can
                // only surface here on an unresolved program.
                Err(Interrupt::Return(_)) => {
                    return Err(LarkError::runtime(0, "Can't return from top-level code."));
                }
            }
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────

    fn execute(&mut self, stmt: &Stmt) -> ExecResult {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;

                Ok(())
            }

            Stmt::Print(expr) => {
                let value: Value = self.evaluate(expr)?;

                writeln!(self.out, "{}", value).map_err(LarkError::from)?;

                Ok(())
            }

            Stmt::Var { name, initializer } => {
                let value: Value = if let Some(expr) = initializer {
                    self.evaluate(expr)?
                } else {
                    Value::Nil
                };

                self.environment.borrow_mut().define(&name.lexeme, value);

                Ok(())
            }

            Stmt::Block(statements) => {
                let enclosing: Rc<RefCell<Environment>> = self.environment.clone();

                self.execute_block(
                    statements,
                    Rc::new(RefCell::new(Environment::with_enclosing(enclosing))),
                )
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.execute(then_branch)?;
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)?;
                }

                Ok(())
            }

            Stmt::While { condition, body } => {
                while is_truthy(&self.evaluate(condition)?) {
                    self.execute(body)?;
                }

                Ok(())
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);

                let function = Value::Function(Rc::new(Function {
                    declaration: declaration.clone(),
                    closure: self.environment.clone(),
                }));

                self.environment
                    .borrow_mut()
                    .define(&declaration.name.lexeme, function);

                Ok(())
            }

            Stmt::Return { keyword: _, value } => {
                let value: Value = if let Some(expr) = value {
                    self.evaluate(expr)?
                } else {
                    Value::Nil
                };

                Err(Interrupt::Return(value))
            }
        }
    }

    /// Run `statements` under `environment`, restoring the previous
    /// environment on every exit path (normal, failure, return-unwind).
    fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> ExecResult {
        let previous: Rc<RefCell<Environment>> = self.environment.clone();

        self.environment = environment;

        for statement in statements {
            if let Err(interrupt) = self.execute(statement) {
                self.environment = previous;
                return Err(interrupt);
            }
        }

        self.environment = previous;

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────

    fn evaluate(&mut self, expr: &Expr) -> EvalResult {
        match expr {
            Expr::Literal(literal) => Ok(evaluate_literal(literal)),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => self.evaluate_logical(left, operator, right),

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::Assign { id, name, value } => {
                let value: Value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => {
                        Environment::assign_at(
                            &self.environment,
                            distance,
                            &name.lexeme,
                            value.clone(),
                        );
                    }

                    None => {
                        self.globals
                            .borrow_mut()
                            .assign(&name.lexeme, value.clone(), name.line)?;
                    }
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => self.evaluate_call(callee, paren, arguments),
        }
    }

    fn look_up_variable(&mut self, id: ExprId, name: &Token) -> EvalResult {
        match self.locals.get(&id) {
            Some(&distance) => Ok(Environment::get_at(
                &self.environment,
                distance,
                &name.lexeme,
            )),

            None => Ok(self.globals.borrow().get(&name.lexeme, name.line)?),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> EvalResult {
        let value: Value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match value {
                Value::Number(n) => Ok(Value::Number(-n)),

                _ => Err(LarkError::runtime(operator.line, "Operand must be a number.").into()),
            },

            TokenType::BANG => Ok(Value::Bool(!is_truthy(&value))),

            _ => Err(LarkError::runtime(operator.line, "Invalid unary operator.").into()),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> EvalResult {
        let left_val: Value = self.evaluate(left)?;
        let right_val: Value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::PLUS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),

                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),

                _ => Err(LarkError::runtime(
                    operator.line,
                    "Operands must be two numbers or two strings.",
                )
                .into()),
            },

            TokenType::MINUS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),

                _ => Err(numbers_expected(operator)),
            },

            TokenType::STAR => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),

                _ => Err(numbers_expected(operator)),
            },

            // Division by zero follows IEEE-754 and yields an infinity or
            // NaN rather than an error.
            TokenType::SLASH => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),

                _ => Err(numbers_expected(operator)),
            },

            TokenType::GREATER => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a > b)),

                _ => Err(numbers_expected(operator)),
            },

            TokenType::GREATER_EQUAL => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a >= b)),

                _ => Err(numbers_expected(operator)),
            },

            TokenType::LESS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a < b)),

                _ => Err(numbers_expected(operator)),
            },

            TokenType::LESS_EQUAL => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a <= b)),

                _ => Err(numbers_expected(operator)),
            },

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(is_equal(&left_val, &right_val))),

            TokenType::BANG_EQUAL => Ok(Value::Bool(!is_equal(&left_val, &right_val))),

            _ => Err(LarkError::runtime(operator.line, "Invalid binary operator.").into()),
        }
    }

    fn evaluate_logical(&mut self, left: &Expr, operator: &Token, right: &Expr) -> EvalResult {
        let left_val: Value = self.evaluate(left)?;

        match operator.token_type {
            TokenType::OR => {
                if is_truthy(&left_val) {
                    return Ok(left_val);
                }
            }

            _ => {
                if !is_truthy(&left_val) {
                    return Ok(left_val);
                }
            }
        }

        self.evaluate(right)
    }

    fn evaluate_call(&mut self, callee: &Expr, paren: &Token, arguments: &[Expr]) -> EvalResult {
        let callee_val: Value = self.evaluate(callee)?;

        let mut arg_values: Vec<Value> = Vec::with_capacity(arguments.len());

        for argument in arguments {
            arg_values.push(self.evaluate(argument)?);
        }

        match callee_val {
            Value::Function(function) => {
                if arg_values.len() != function.arity() {
                    return Err(arity_mismatch(paren, function.arity(), arg_values.len()));
                }

                self.call_function(&function, arg_values)
            }

            Value::NativeFunction { arity, func, name } => {
                if arg_values.len() != arity {
                    return Err(arity_mismatch(paren, arity, arg_values.len()));
                }

                debug!("Calling native function '{}'", name);

                Ok(func(&arg_values)?)
            }

            _ => Err(LarkError::runtime(
                paren.line,
                "Can only call functions and classes.",
            )
            .into()),
        }
    }

    /// The user-function call protocol: bind parameters in a fresh scope
    /// hanging off the closure, run the body as a block, convert a
    /// return-unwind into the call's result.
    fn call_function(&mut self, function: &Function, arguments: Vec<Value>) -> EvalResult {
        debug!(
            "Calling '{}' with {} argument(s)",
            function.declaration.name.lexeme,
            arguments.len()
        );

        let environment = Rc::new(RefCell::new(Environment::with_enclosing(
            function.closure.clone(),
        )));

        for (param, argument) in function.declaration.params.iter().zip(arguments) {
            environment.borrow_mut().define(&param.lexeme, argument);
        }

        match self.execute_block(&function.declaration.body, environment) {
            Ok(()) => Ok(Value::Nil),

            Err(Interrupt::Return(value)) => Ok(value),

            Err(failure) => Err(failure),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Value helpers
// ─────────────────────────────────────────────────────────────────────────

fn evaluate_literal(literal: &LiteralValue) -> Value {
    match literal {
        LiteralValue::Number(n) => Value::Number(*n),

        LiteralValue::Str(s) => Value::String(s.clone()),

        LiteralValue::True => Value::Bool(true),

        LiteralValue::False => Value::Bool(false),

        LiteralValue::Nil => Value::Nil,
    }
}

/// Only `nil` and `false` are falsy.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Nil => false,

        Value::Bool(b) => *b,

        _ => true,
    }
}

/// Same-variant pairwise comparison; cross-type is never equal.
fn is_equal(left: &Value, right: &Value) -> bool {
    left == right
}

fn numbers_expected(operator: &Token) -> Interrupt {
    LarkError::runtime(operator.line, "Operands must be numbers.").into()
}

fn arity_mismatch(paren: &Token, expected: usize, got: usize) -> Interrupt {
    LarkError::runtime(
        paren.line,
        format!("Expected {} arguments but got {}.", expected, got),
    )
    .into()
}

fn clock_native(_args: &[Value]) -> Result<Value> {
    let timestamp: f64 = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| LarkError::runtime(0, format!("Clock error: {}", e)))?
        .as_secs_f64();

    Ok(Value::Number(timestamp))
}
