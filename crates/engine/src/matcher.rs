//! Check-shape matcher: recognizes one statement as a manual permission gate.
//!
//! The supported idioms are the variants of [`CheckShape`]; each one has its
//! own recognizer and they are tried in [`CheckShape::ALL`] order. Which
//! methods count as permission APIs is configuration ([`EngineConfig::check_apis`]).
//!
//! A statement only matches if it is a *pure* gate: the check plus the denial
//! signal. Extra statements in a denial branch are tolerated only when the
//! [`SideEffectPolicy`](crate::config::SideEffectPolicy) calls them logging,
//! and they are recorded as [`Deviation`]s.

use crate::config::{ApiKind, CheckApi, Combinator, EngineConfig, IdentityArg};
use crate::ir::{BinaryOp, Call, Expr, Statement, StatementKind};
use crate::predicate::Permission;
use common::SourceSpan;
use std::fmt;

/// The manual-check idioms the engine knows how to fold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckShape {
    /// `ctx.enforceCallingOrSelfPermission(P, msg);`
    EnforceCall,
    /// `if (ctx.checkCallingPermission(P) != PERMISSION_GRANTED) { throw new SecurityException(..); }`
    GuardThrow,
    /// `if (ctx.checkCallingPermission(P) != PERMISSION_GRANTED) { return DENIED; }`
    GuardReturn,
}

impl CheckShape {
    pub const ALL: [CheckShape; 3] = [
        CheckShape::EnforceCall,
        CheckShape::GuardThrow,
        CheckShape::GuardReturn,
    ];
}

/// How a matched check signals denial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureAction {
    /// The denial branch throws. `canonical` iff the exception is a configured
    /// denial exception constructed in place.
    Throw { exception: String, canonical: bool },
    /// The denial branch returns. `canonical` iff the value is a configured
    /// denied constant.
    ReturnDenied {
        value: Option<String>,
        canonical: bool,
    },
    /// The called API throws on its own.
    Delegate,
}

impl FailureAction {
    pub fn is_canonical(&self) -> bool {
        match self {
            FailureAction::Throw { canonical, .. } | FailureAction::ReturnDenied { canonical, .. } => {
                *canonical
            }
            FailureAction::Delegate => true,
        }
    }
}

/// Why a conversion is not provably equivalent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deviation {
    /// A statement inside the denial branch would be deleted with the guard.
    DroppedSideEffect { span: SourceSpan, call: String },
    NonCanonicalException(String),
    NonCanonicalReturn(Option<String>),
    /// Consumed checks disagree on how their permissions combine.
    MixedCombinators,
}

impl fmt::Display for Deviation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Deviation::DroppedSideEffect { span, call } => {
                write!(f, "denial branch call `{call}` at {} would be removed", span.start)
            }
            Deviation::NonCanonicalException(ty) => {
                write!(f, "denial throws `{ty}` instead of SecurityException")
            }
            Deviation::NonCanonicalReturn(Some(value)) => {
                write!(f, "denial returns `{value}` instead of a denied constant")
            }
            Deviation::NonCanonicalReturn(None) => {
                write!(f, "denial returns without a value instead of throwing")
            }
            Deviation::MixedCombinators => {
                write!(f, "checks combine permissions inconsistently")
            }
        }
    }
}

/// One recognized manual-check statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckMatch {
    pub shape: CheckShape,
    /// Permissions in source order; never empty.
    pub permissions: Vec<Permission>,
    /// `Single` whenever exactly one permission is involved.
    pub combinator: Combinator,
    pub span: SourceSpan,
    pub failure: FailureAction,
    pub deviations: Vec<Deviation>,
}

pub struct Matcher<'c> {
    config: &'c EngineConfig,
}

impl<'c> Matcher<'c> {
    pub fn new(config: &'c EngineConfig) -> Self {
        Self { config }
    }

    /// Tries every [`CheckShape`] against `stmt`; the first hit wins.
    pub fn match_statement(&self, stmt: &Statement) -> Option<CheckMatch> {
        CheckShape::ALL
            .iter()
            .find_map(|&shape| self.try_shape(shape, stmt))
    }

    fn try_shape(&self, shape: CheckShape, stmt: &Statement) -> Option<CheckMatch> {
        match shape {
            CheckShape::EnforceCall => self.enforce_call(stmt),
            CheckShape::GuardThrow | CheckShape::GuardReturn => self.guard(shape, stmt),
        }
    }

    fn enforce_call(&self, stmt: &Statement) -> Option<CheckMatch> {
        let StatementKind::Call(call) = &stmt.kind else {
            return None;
        };
        let api = self.api(call, ApiKind::Enforce)?;
        let permissions = self.permissions(api, &call.args)?;
        Some(CheckMatch {
            shape: CheckShape::EnforceCall,
            combinator: effective_combinator(api, permissions.len()),
            permissions,
            span: stmt.span,
            failure: FailureAction::Delegate,
            deviations: Vec::new(),
        })
    }

    fn guard(&self, shape: CheckShape, stmt: &Statement) -> Option<CheckMatch> {
        let StatementKind::If {
            condition,
            then_branch,
            else_branch: None,
        } = &stmt.kind
        else {
            return None;
        };
        let (permissions, combinator) = self.denial_condition(condition)?;
        let (terminal, effects) = then_branch.split_last()?;

        let failure = match (shape, &terminal.kind) {
            (CheckShape::GuardThrow, StatementKind::Throw(exception)) => self.throw_action(exception),
            (CheckShape::GuardReturn, StatementKind::Return(value)) => {
                self.return_action(value.as_ref())
            }
            _ => return None,
        };

        let mut deviations = Vec::new();
        for effect in effects {
            deviations.push(self.benign_effect(effect)?);
        }

        Some(CheckMatch {
            shape,
            permissions,
            combinator,
            span: stmt.span,
            failure,
            deviations,
        })
    }

    /// Parses the `if` condition under which the branch denies access.
    ///
    /// `a || b` denies when either permission is missing, i.e. both are
    /// required (`AllOf`); `a && b` denies only when both are missing
    /// (`AnyOf`). Chains mixing `||` and `&&` are not matched.
    fn denial_condition(&self, condition: &Expr) -> Option<(Vec<Permission>, Combinator)> {
        match condition {
            Expr::Binary {
                op: op @ (BinaryOp::Or | BinaryOp::And),
                ..
            } => {
                let permissions = self.denial_chain(condition, *op)?;
                let combinator = match op {
                    BinaryOp::Or => Combinator::AllOf,
                    _ => Combinator::AnyOf,
                };
                Some((permissions, combinator))
            }
            _ => self
                .denial_leaf(condition)
                .map(|p| (vec![p], Combinator::Single)),
        }
    }

    fn denial_chain(&self, expr: &Expr, chain_op: BinaryOp) -> Option<Vec<Permission>> {
        match expr {
            Expr::Binary { op, lhs, rhs } if *op == chain_op => {
                let mut permissions = self.denial_chain(lhs, chain_op)?;
                permissions.extend(self.denial_chain(rhs, chain_op)?);
                Some(permissions)
            }
            _ => self.denial_leaf(expr).map(|p| vec![p]),
        }
    }

    fn denial_leaf(&self, expr: &Expr) -> Option<Permission> {
        match expr {
            Expr::Binary {
                op: BinaryOp::Ne,
                lhs,
                rhs,
            } => self
                .compared_check(lhs, rhs, |v| self.config.is_granted(v))
                .or_else(|| self.compared_check(rhs, lhs, |v| self.config.is_granted(v))),
            Expr::Binary {
                op: BinaryOp::Eq,
                lhs,
                rhs,
            } => self
                .compared_check(lhs, rhs, |v| self.config.is_denied(v))
                .or_else(|| self.compared_check(rhs, lhs, |v| self.config.is_denied(v))),
            Expr::Not(inner) => {
                let Expr::Call(call) = inner.as_ref() else {
                    return None;
                };
                let api = self.api(call, ApiKind::Predicate)?;
                single(self.permissions(api, &call.args)?)
            }
            _ => None,
        }
    }

    /// `call_side` must be a `Check` API call and `value_side` a name accepted
    /// by `accept`.
    fn compared_check(
        &self,
        call_side: &Expr,
        value_side: &Expr,
        accept: impl Fn(&str) -> bool,
    ) -> Option<Permission> {
        let Expr::Call(call) = call_side else {
            return None;
        };
        let api = self.api(call, ApiKind::Check)?;
        if !value_side.as_text().is_some_and(accept) {
            return None;
        }
        single(self.permissions(api, &call.args)?)
    }

    fn throw_action(&self, exception: &Expr) -> FailureAction {
        match exception {
            Expr::New { type_name, .. } => FailureAction::Throw {
                canonical: self.config.is_denial_exception(type_name),
                exception: type_name.clone(),
            },
            other => FailureAction::Throw {
                exception: other.as_text().unwrap_or("<expression>").to_string(),
                canonical: false,
            },
        }
    }

    fn return_action(&self, value: Option<&Expr>) -> FailureAction {
        let text = value.map(|v| v.as_text().unwrap_or("<expression>").to_string());
        let canonical = value
            .and_then(Expr::as_text)
            .is_some_and(|v| self.config.is_denied(v));
        FailureAction::ReturnDenied {
            value: text,
            canonical,
        }
    }

    /// A denial-branch statement other than the terminal one. Only logging
    /// calls are accepted; they surface as a deviation.
    fn benign_effect(&self, stmt: &Statement) -> Option<Deviation> {
        let StatementKind::Call(call) = &stmt.kind else {
            return None;
        };
        let receiver = call.receiver_name()?;
        if !self.config.side_effects.is_logging_receiver(receiver) {
            return None;
        }
        Some(Deviation::DroppedSideEffect {
            span: stmt.span,
            call: format!("{receiver}.{}", call.name),
        })
    }

    fn api(&self, call: &Call, kind: ApiKind) -> Option<&'c CheckApi> {
        self.config.lookup(&call.name).filter(|api| api.kind == kind)
    }

    /// Extracts the permission arguments of `api`. Every selected argument
    /// must be constant-like, otherwise the call is not a gate we can lift
    /// into an annotation.
    fn permissions(&self, api: &CheckApi, args: &[Expr]) -> Option<Vec<Permission>> {
        let selected: &[Expr] = if api.variadic {
            args.get(api.permission_arg..)?
        } else {
            std::slice::from_ref(args.get(api.permission_arg)?)
        };
        if selected.is_empty() || !selected.iter().all(Expr::is_constant_like) {
            return None;
        }
        if !api.identity_args.iter().all(|rule| is_caller_identity(rule, args)) {
            return None;
        }
        selected
            .iter()
            .map(|e| e.as_text().map(Permission::new))
            .collect()
    }
}

/// The argument at `rule.index` is an argument-less call to one of the
/// accepted caller-identity getters.
fn is_caller_identity(rule: &IdentityArg, args: &[Expr]) -> bool {
    match args.get(rule.index) {
        Some(Expr::Call(call)) => call.args.is_empty() && rule.accepts(call.receiver_name(), &call.name),
        _ => false,
    }
}

fn single(mut permissions: Vec<Permission>) -> Option<Permission> {
    if permissions.len() == 1 {
        permissions.pop()
    } else {
        None
    }
}

fn effective_combinator(api: &CheckApi, count: usize) -> Combinator {
    match (count, api.combinator) {
        (0 | 1, _) => Combinator::Single,
        (_, Combinator::Single) => Combinator::AllOf,
        (_, c) => c,
    }
}
