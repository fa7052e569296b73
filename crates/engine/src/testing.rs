//! Builders for synthetic method bodies used across the engine's tests.

use crate::ir::{BinaryOp, Call, Expr, MethodBody, MethodDecl, Statement, StatementKind};
use common::{Position, SourceSpan};

pub(crate) fn dummy_span() -> SourceSpan {
    let p = Position::new(0, 1, 1);
    SourceSpan::new(p, p)
}

pub(crate) fn stmt(kind: StatementKind) -> Statement {
    Statement {
        span: dummy_span(),
        kind,
    }
}

pub(crate) fn name(n: &str) -> Expr {
    Expr::Name(n.to_string())
}

pub(crate) fn string(s: &str) -> Expr {
    Expr::StringLiteral(s.to_string())
}

pub(crate) fn call(receiver: Option<&str>, method: &str, args: Vec<Expr>) -> Call {
    Call {
        receiver: receiver.map(|r| Box::new(name(r))),
        name: method.to_string(),
        args,
    }
}

pub(crate) fn check_call(api: &str, permission: &str) -> Expr {
    Expr::Call(call(Some("mContext"), api, vec![name(permission)]))
}

pub(crate) fn ne_granted(api: &str, permission: &str) -> Expr {
    Expr::Binary {
        op: BinaryOp::Ne,
        lhs: Box::new(check_call(api, permission)),
        rhs: Box::new(name("PackageManager.PERMISSION_GRANTED")),
    }
}

pub(crate) fn throw_new(type_name: &str) -> StatementKind {
    StatementKind::Throw(Expr::New {
        type_name: type_name.to_string(),
        args: vec![],
    })
}

pub(crate) fn enforce(api: &str, permission: &str) -> StatementKind {
    StatementKind::Call(call(
        Some("mContext"),
        api,
        vec![name(permission), Expr::Literal("null".into())],
    ))
}

pub(crate) fn guard_throw(api: &str, permission: &str) -> StatementKind {
    StatementKind::If {
        condition: ne_granted(api, permission),
        then_branch: vec![stmt(throw_new("SecurityException"))],
        else_branch: None,
    }
}

pub(crate) fn guard_return(api: &str, permission: &str, value: Option<Expr>) -> StatementKind {
    StatementKind::If {
        condition: ne_granted(api, permission),
        then_branch: vec![stmt(StatementKind::Return(value))],
        else_branch: None,
    }
}

pub(crate) fn body(kinds: Vec<StatementKind>) -> MethodBody {
    MethodBody::new(kinds.into_iter().map(stmt).collect())
}

/// Lays statements out inside a stub method so spans point at real text.
///
/// ```text
/// class Svc extends ISvc.Stub {
///     @Override
///     public void doThing() {
///         <statement>
///     }
/// }
/// ```
pub(crate) struct Fixture {
    source: String,
    decl_start: usize,
    annotations: Vec<String>,
    pending: Vec<(usize, usize, StatementKind)>,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        Self::annotated(&["Override"])
    }

    pub(crate) fn annotated(annotations: &[&str]) -> Self {
        let mut source = String::from("class Svc extends ISvc.Stub {\n    ");
        let decl_start = source.len();
        for a in annotations {
            source.push_str(&format!("@{a}\n    "));
        }
        source.push_str("public void doThing() {\n");
        Self {
            source,
            decl_start,
            annotations: annotations.iter().map(|s| s.to_string()).collect(),
            pending: Vec::new(),
        }
    }

    pub(crate) fn stmt(mut self, text: &str, kind: StatementKind) -> Self {
        self.source.push_str("        ");
        let start = self.source.len();
        self.source.push_str(text);
        let end = self.source.len();
        self.source.push('\n');
        self.pending.push((start, end, kind));
        self
    }

    pub(crate) fn finish(mut self) -> (String, MethodDecl) {
        self.source.push_str("    }");
        let decl_end = self.source.len();
        self.source.push_str("\n}\n");
        let source = self.source;
        let statements = self
            .pending
            .into_iter()
            .map(|(start, end, kind)| Statement {
                span: SourceSpan::from_offsets(&source, start, end),
                kind,
            })
            .collect();
        let decl = MethodDecl {
            name: "doThing".into(),
            class_name: "Svc".into(),
            span: SourceSpan::from_offsets(&source, self.decl_start, decl_end),
            annotations: self.annotations,
            is_static: false,
            supertype: Some("ISvc.Stub".into()),
            body: MethodBody::new(statements),
        };
        (source, decl)
    }
}

pub(crate) const GUARD_P: &str = "if (mContext.checkCallingPermission(P) != PackageManager.PERMISSION_GRANTED) throw new SecurityException();";
