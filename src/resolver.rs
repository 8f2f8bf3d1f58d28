//! Static resolution pass for the Lark interpreter.
//!
//! This module performs a single AST walk to:
//! 1. **Build lexical scopes**: maintains a stack of `HashMap<String, bool>`
//!    tracking declared (false) and fully defined (true) names in each nested
//!    block or function body.
//! 2. **Enforce static rules**: reports redeclaration in the same scope,
//!    reading a variable in its own initializer, and `return` outside any
//!    function.
//! 3. **Record binding distances**: for every variable occurrence
//!    (`Expr::Variable` or `Expr::Assign`), notes on the interpreter how many
//!    scopes separate the use from its binding.  Occurrences bound in no
//!    lexical scope get no note and are treated as globals at runtime.  This
//!    is what makes closures capture by definition-site scope rather than by
//!    call-site name lookup.
//!
//! Unlike the runtime, resolution does not stop at the first problem: every
//! static error found in one pass is accumulated and handed back together,
//! so the user sees them all at once.
//!
//! # Usage
//!
//! After parsing, before interpretation:
//! ```ignore
//! let mut resolver = Resolver::new(&mut interpreter);
//! let errors = resolver.resolve(&statements);
//! ```

use std::collections::HashMap;

use log::{debug, info};

use crate::error::LarkError;
use crate::expr::{Expr, ExprId};
use crate::interpreter::Interpreter;
use crate::stmt::Stmt;
use crate::token::Token;

/// Are we inside a user function?  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
}

/// Resolver: tracks scopes, enforces static rules, and *records* binding
/// distances (locals vs. globals) by calling back into the interpreter.
pub struct Resolver<'a, 'out> {
    interpreter: &'a mut Interpreter<'out>,
    scopes: Vec<HashMap<String, bool>>, // false=declared, true=defined
    current_function: FunctionType,
    errors: Vec<LarkError>,
}

impl<'a, 'out> Resolver<'a, 'out> {
    /// Create a new resolver bound to the given interpreter.
    pub fn new(interpreter: &'a mut Interpreter<'out>) -> Self {
        Resolver {
            interpreter,
            scopes: Vec::new(),
            current_function: FunctionType::None,
            errors: Vec::new(),
        }
    }

    /// Walk all top-level statements in program order.  Returns every static
    /// error found; an empty vector means the program is ready to run.
    pub fn resolve(mut self, statements: &[Stmt]) -> Vec<LarkError> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            self.resolve_stmt(stmt);
        }

        self.errors
    }

    // ─────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();

                for s in statements {
                    self.resolve_stmt(s);
                }

                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                // Declared-but-not-defined while its own initializer runs,
                // which is how `var a = a;` gets caught below.
                self.declare(name);

                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }

                self.define(name);
            }

            Stmt::Function(declaration) => {
                // Declare and define eagerly so the body can recurse.
                self.declare(&declaration.name);
                self.define(&declaration.name);

                self.resolve_function(&declaration.params, &declaration.body);
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);

                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.report(keyword.line, "Can't return from top-level code.");
                }

                if let Some(expr) = value {
                    self.resolve_expr(expr);
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => {
                self.resolve_expr(inner);
            }

            Expr::Unary { right, .. } => {
                self.resolve_expr(right);
            }

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Variable { id, name } => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.lexeme) == Some(&false) {
                        self.report(
                            name.line,
                            "Can't read local variable in its own initializer.",
                        );
                    }
                }

                self.resolve_local(*id, name);
            }

            Expr::Assign { id, name, value } => {
                // Right-hand side first, then bind the assignment target.
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);

                for argument in arguments {
                    self.resolve_expr(argument);
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function's parameters + body, tracking the
    /// function context so nested `return` validates correctly.
    fn resolve_function(&mut self, params: &[Token], body: &[Stmt]) {
        let enclosing: FunctionType = self.current_function;
        self.current_function = FunctionType::Function;

        self.begin_scope();

        for param in params {
            self.declare(param);
            self.define(param);
        }

        for stmt in body {
            self.resolve_stmt(stmt);
        }

        self.end_scope();

        self.current_function = enclosing;
    }

    // ─────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    /// Mark `name` as declared but not yet usable in the innermost scope.
    /// Global declarations (empty scope stack) skip the duplicate check.
    fn declare(&mut self, name: &Token) {
        let Some(scope) = self.scopes.last() else {
            return;
        };

        if scope.contains_key(&name.lexeme) {
            self.report(
                name.line,
                "Already a variable with this name in this scope.",
            );
            return;
        }

        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), false);
        }
    }

    /// Mark `name` as fully defined in the innermost scope.
    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Binding-distance helper
    // ─────────────────────────────────────────────────────────────────────

    /// Record this variable occurrence as a local at its lexical depth, or
    /// leave it unnoted (a global) if no scope binds the name.
    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                debug!("Resolved '{}' at depth {}", name.lexeme, depth);

                self.interpreter.note_local(id, depth);
                return;
            }
        }

        debug!("Resolved '{}' as global", name.lexeme);
    }

    fn report<S: Into<String>>(&mut self, line: usize, message: S) {
        self.errors.push(LarkError::resolve(line, message));
    }
}
