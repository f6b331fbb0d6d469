//! Integer evaluation of constant expressions (buffer sizes, offsets, loop
//! bounds).

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use crate::diagnostics::{Diagnostic, DiagnosticCollector};
use crate::parser::ast::{BinOp, ConstDecl, Expr, ExprKind, Program, UnaryOp};
use crate::span::SourceLocation;

/// Constants visible to an expression, by name.
pub type ConstEnv = HashMap<String, i64>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("forward reference to undeclared constant `{name}`")]
    ForwardReference { name: String, location: Option<SourceLocation> },

    #[error("division by zero in constant expression")]
    DivisionByZero { location: Option<SourceLocation> },

    #[error("float literals not allowed in constant expressions")]
    FloatNotAllowed { location: Option<SourceLocation> },

    #[error("cannot evaluate expression type {kind}")]
    Unsupported { kind: &'static str, location: Option<SourceLocation> },

    #[error("integer overflow in constant expression")]
    Overflow { location: Option<SourceLocation> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvalErrorKind {
    ForwardReference,
    DivisionByZero,
    FloatNotAllowed,
    Unsupported,
    Overflow,
}

impl EvalError {
    pub fn kind(&self) -> EvalErrorKind {
        match self {
            EvalError::ForwardReference { .. } => EvalErrorKind::ForwardReference,
            EvalError::DivisionByZero { .. } => EvalErrorKind::DivisionByZero,
            EvalError::FloatNotAllowed { .. } => EvalErrorKind::FloatNotAllowed,
            EvalError::Unsupported { .. } => EvalErrorKind::Unsupported,
            EvalError::Overflow { .. } => EvalErrorKind::Overflow,
        }
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            EvalError::ForwardReference { location, .. }
            | EvalError::DivisionByZero { location }
            | EvalError::FloatNotAllowed { location }
            | EvalError::Unsupported { location, .. }
            | EvalError::Overflow { location } => location.as_ref(),
        }
    }
}

/// Evaluate `expr` to an integer. `/` truncates toward zero and `mod` takes
/// the sign of the dividend.
pub fn evaluate(expr: &Expr, env: &ConstEnv) -> Result<i64, EvalError> {
    let location = || expr.location.clone();
    match &expr.kind {
        ExprKind::IntLiteral(value) => Ok(*value),
        ExprKind::Identifier(name) => env
            .get(name)
            .copied()
            .ok_or_else(|| EvalError::ForwardReference { name: name.clone(), location: location() }),
        ExprKind::ParenExpr(inner) => evaluate(inner, env),
        ExprKind::UnaryOp { op: UnaryOp::Neg, operand } => {
            let value = evaluate(operand, env)?;
            value.checked_neg().ok_or(EvalError::Overflow { location: location() })
        }
        ExprKind::BinaryOp { op, left, right } => {
            let lhs = evaluate(left, env)?;
            let rhs = evaluate(right, env)?;
            if matches!(op, BinOp::Div | BinOp::Mod) && rhs == 0 {
                return Err(EvalError::DivisionByZero { location: location() });
            }
            let result = match op {
                BinOp::Add => lhs.checked_add(rhs),
                BinOp::Sub => lhs.checked_sub(rhs),
                BinOp::Mul => lhs.checked_mul(rhs),
                BinOp::Div => lhs.checked_div(rhs),
                BinOp::Mod => lhs.checked_rem(rhs),
            };
            result.ok_or(EvalError::Overflow { location: location() })
        }
        ExprKind::FloatLiteral(_) => Err(EvalError::FloatNotAllowed { location: location() }),
        ExprKind::StringLiteral(_) | ExprKind::ArrayLiteral(_) => {
            Err(EvalError::Unsupported { kind: expr.kind.name(), location: location() })
        }
    }
}

/// Values of every `const` in a program, evaluated in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ConstTable {
    env: ConstEnv,
    order: Vec<String>,
}

impl ConstTable {
    /// Seed constants come first (sorted by name), then declarations. A
    /// declaration that fails to evaluate is reported and left out; a later
    /// declaration of the same name replaces the earlier value.
    pub fn build(program: &Program, seed: &ConstEnv, diag: &mut DiagnosticCollector) -> Self {
        let mut table = ConstTable::default();
        let mut seeded: Vec<_> = seed.iter().collect();
        seeded.sort();
        for (name, value) in seeded {
            table.insert(name.clone(), *value);
        }

        for decl in program.consts() {
            match evaluate(&decl.value, &table.env) {
                Ok(value) => {
                    debug!(name = %decl.name, value, "const evaluated");
                    table.insert(decl.name.clone(), value);
                }
                Err(err) => diag.push(Self::diagnostic(decl, &err)),
            }
        }
        table
    }

    fn diagnostic(decl: &ConstDecl, err: &EvalError) -> Diagnostic {
        let location = err.location().or(decl.location.as_ref()).cloned();
        let diagnostic = Diagnostic::error(format!("Cannot evaluate constant '{}': {err}", decl.name), location);
        match err.kind() {
            EvalErrorKind::ForwardReference => {
                diagnostic.with_note("constants must be declared before they are used")
            }
            EvalErrorKind::FloatNotAllowed => diagnostic.with_note("constant expressions are integer-only"),
            _ => diagnostic,
        }
    }

    fn insert(&mut self, name: String, value: i64) {
        if self.env.insert(name.clone(), value).is_none() {
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<i64> {
        self.env.get(name).copied()
    }

    pub fn env(&self) -> &ConstEnv {
        &self.env
    }

    /// Entries in first-declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> + '_ {
        self.order.iter().filter_map(|name| self.env.get(name).map(|value| (name.as_str(), *value)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
