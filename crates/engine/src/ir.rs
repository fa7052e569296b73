//! Syntax-agnostic view of one method, as handed over by a front end.
//!
//! The engine never sees a parser tree. A front end lowers each stub method
//! into a [`MethodDecl`] whose body is a flat list of [`Statement`]s; only the
//! shapes the matcher cares about are modelled, everything else is
//! [`StatementKind::Other`] / [`Expr::Other`].

use common::SourceSpan;

/// One method declaration with its lowered body.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub name: String,
    /// Simple name of the enclosing class (`"<anonymous>"` for anonymous stubs).
    pub class_name: String,
    /// Whole declaration, including modifiers and annotations.
    pub span: SourceSpan,
    /// Annotation names as written (`"Override"`, `"android.annotation.EnforcePermission"`).
    pub annotations: Vec<String>,
    pub is_static: bool,
    /// Source text of the enclosing class' superclass / instantiated type
    /// (e.g. `"IFooService.Stub"`), if any.
    pub supertype: Option<String>,
    pub body: MethodBody,
}

impl MethodDecl {
    /// `Class.method`, used for reporting and baseline fingerprints.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.class_name, self.name)
    }

    /// `true` if an annotation with simple name `simple` is present, in either
    /// bare or fully-qualified form.
    pub fn has_annotation(&self, simple: &str) -> bool {
        self.annotations
            .iter()
            .any(|a| a == simple || a.rsplit('.').next() == Some(simple))
    }
}

/// Ordered statements of a method body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MethodBody {
    pub statements: Vec<Statement>,
}

impl MethodBody {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub span: SourceSpan,
    pub kind: StatementKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    /// Expression statement whose expression is a call.
    Call(Call),
    If {
        condition: Expr,
        /// Braces are flattened: `if (c) x;` and `if (c) { x; }` look alike.
        then_branch: Vec<Statement>,
        else_branch: Option<Vec<Statement>>,
    },
    Throw(Expr),
    Return(Option<Expr>),
    Block(Vec<Statement>),
    /// Anything else; the string is the front end's node kind, for logging.
    Other(String),
}

/// A call expression. `name` is the resolved method name, `receiver` whatever
/// precedes the dot.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub receiver: Option<Box<Expr>>,
    pub name: String,
    pub args: Vec<Expr>,
}

impl Call {
    /// Receiver rendered as a dotted name, if it is one (`Slog`, `mContext`, `a.b`).
    pub fn receiver_name(&self) -> Option<&str> {
        match self.receiver.as_deref() {
            Some(Expr::Name(n)) => Some(n.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Ne,
    And,
    Or,
    Other,
}

impl BinaryOp {
    pub fn from_token(token: &str) -> Self {
        match token {
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            "&&" => BinaryOp::And,
            "||" => BinaryOp::Or,
            _ => BinaryOp::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Call(Call),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Not(Box<Expr>),
    /// Identifier or dotted field access, as written (`PackageManager.PERMISSION_GRANTED`).
    Name(String),
    /// String literal including its quotes.
    StringLiteral(String),
    /// `new T(args)`; `type_name` as written.
    New {
        type_name: String,
        args: Vec<Expr>,
    },
    /// Any other literal (`true`, `-1`, `null`), as written.
    Literal(String),
    Other(String),
}

impl Expr {
    /// Source-like text for names and literals; `None` for compound expressions.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Expr::Name(s) | Expr::StringLiteral(s) | Expr::Literal(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// `true` for expressions usable as an annotation argument: a string
    /// literal, or a name whose last segment is `SCREAMING_CASE`.
    pub fn is_constant_like(&self) -> bool {
        match self {
            Expr::StringLiteral(s) => s.len() >= 2,
            Expr::Name(n) => n.rsplit('.').next().is_some_and(is_screaming_case),
            _ => false,
        }
    }
}

fn is_screaming_case(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
