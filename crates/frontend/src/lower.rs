//! Lowers tree-sitter-java nodes into the engine's method IR.
//!
//! Only the node kinds the matcher inspects get a structured form; the rest
//! become `Other` carrying the node kind (statements) or source text
//! (expressions).

use common::{Position, SourceSpan};
use engine::ir::{BinaryOp, Call, Expr, MethodBody, MethodDecl, Statement, StatementKind};
use tree_sitter::Node;

/// Class name reported for methods of anonymous stub instances.
pub const ANONYMOUS_CLASS: &str = "<anonymous>";

/// Every method declaration with a body, in source order, including
/// methods of nested and anonymous classes.
pub fn collect_methods(root: Node<'_>, source: &str) -> Vec<MethodDecl> {
    let mut out = Vec::new();
    collect(root, source, &mut out);
    out
}

fn collect(node: Node<'_>, source: &str, out: &mut Vec<MethodDecl>) {
    if node.kind() == "method_declaration" {
        if let Some(decl) = lower_method(node, source) {
            out.push(decl);
        }
    }
    for child in named(node) {
        collect(child, source, out);
    }
}

/// Named, non-comment children.
fn named<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|n| !n.is_extra())
        .collect()
}

fn text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

pub(crate) fn span_of(node: Node<'_>) -> SourceSpan {
    let (start, end) = (node.start_position(), node.end_position());
    SourceSpan::new(
        Position::new(
            node.start_byte() as u32,
            start.row as u32 + 1,
            start.column as u32 + 1,
        ),
        Position::new(
            node.end_byte() as u32,
            end.row as u32 + 1,
            end.column as u32 + 1,
        ),
    )
}

fn lower_method(node: Node<'_>, source: &str) -> Option<MethodDecl> {
    let body = node.child_by_field_name("body")?;
    let name = text(node.child_by_field_name("name")?, source).to_string();

    let mut annotations = Vec::new();
    let mut is_static = false;
    if let Some(modifiers) = named(node).into_iter().find(|n| n.kind() == "modifiers") {
        let mut cursor = modifiers.walk();
        for m in modifiers.children(&mut cursor) {
            match m.kind() {
                "static" => is_static = true,
                "marker_annotation" | "annotation" => {
                    if let Some(n) = m.child_by_field_name("name") {
                        annotations.push(dotted_name(n, source).unwrap_or_else(|| text(n, source).to_string()));
                    }
                }
                _ => {}
            }
        }
    }

    let (class_name, supertype) = enclosing_class(node, source);
    Some(MethodDecl {
        name,
        class_name,
        span: span_of(node),
        annotations,
        is_static,
        supertype,
        body: MethodBody::new(lower_block(body, source)),
    })
}

/// Name and supertype text of the class declaring `method`.
fn enclosing_class(method: Node<'_>, source: &str) -> (String, Option<String>) {
    let owner = method
        .parent()
        .filter(|p| p.kind() == "class_body")
        .and_then(|body| body.parent());
    match owner {
        Some(class) if class.kind() == "class_declaration" => {
            let name = class
                .child_by_field_name("name")
                .map(|n| text(n, source).to_string())
                .unwrap_or_default();
            let supertype = class
                .child_by_field_name("superclass")
                .and_then(|s| named(s).into_iter().next())
                .map(|t| strip_type_arguments(text(t, source)));
            (name, supertype)
        }
        Some(creation) if creation.kind() == "object_creation_expression" => {
            let supertype = creation
                .child_by_field_name("type")
                .map(|t| strip_type_arguments(text(t, source)));
            (ANONYMOUS_CLASS.to_string(), supertype)
        }
        Some(other) => (
            other
                .child_by_field_name("name")
                .map(|n| text(n, source).to_string())
                .unwrap_or_default(),
            None,
        ),
        None => (String::new(), None),
    }
}

fn strip_type_arguments(ty: &str) -> String {
    ty.split('<').next().unwrap_or(ty).trim().to_string()
}

fn lower_block(block: Node<'_>, source: &str) -> Vec<Statement> {
    named(block)
        .into_iter()
        .map(|s| lower_statement(s, source))
        .collect()
}

/// `if (c) x;` and `if (c) { x; }` both lower to a one-statement branch.
fn lower_branch(node: Node<'_>, source: &str) -> Vec<Statement> {
    if node.kind() == "block" {
        lower_block(node, source)
    } else {
        vec![lower_statement(node, source)]
    }
}

pub(crate) fn lower_statement(node: Node<'_>, source: &str) -> Statement {
    let kind = match node.kind() {
        "expression_statement" => match named(node).into_iter().next() {
            Some(e) if e.kind() == "method_invocation" => lower_call(e, source)
                .map(StatementKind::Call)
                .unwrap_or_else(|| StatementKind::Other(node.kind().to_string())),
            _ => StatementKind::Other(node.kind().to_string()),
        },
        "if_statement" => match (
            node.child_by_field_name("condition"),
            node.child_by_field_name("consequence"),
        ) {
            (Some(condition), Some(consequence)) => StatementKind::If {
                condition: lower_expr(condition, source),
                then_branch: lower_branch(consequence, source),
                else_branch: node
                    .child_by_field_name("alternative")
                    .map(|alt| lower_branch(alt, source)),
            },
            _ => StatementKind::Other(node.kind().to_string()),
        },
        "throw_statement" => match named(node).into_iter().next() {
            Some(e) => StatementKind::Throw(lower_expr(e, source)),
            None => StatementKind::Other(node.kind().to_string()),
        },
        "return_statement" => {
            StatementKind::Return(named(node).into_iter().next().map(|e| lower_expr(e, source)))
        }
        "block" => StatementKind::Block(lower_block(node, source)),
        other => StatementKind::Other(other.to_string()),
    };
    Statement {
        span: span_of(node),
        kind,
    }
}

fn lower_call(node: Node<'_>, source: &str) -> Option<Call> {
    let name = text(node.child_by_field_name("name")?, source).to_string();
    let receiver = node
        .child_by_field_name("object")
        .map(|o| Box::new(lower_expr(o, source)));
    let args = node
        .child_by_field_name("arguments")
        .map(|a| named(a).into_iter().map(|e| lower_expr(e, source)).collect())
        .unwrap_or_default();
    Some(Call {
        receiver,
        name,
        args,
    })
}

pub(crate) fn lower_expr(node: Node<'_>, source: &str) -> Expr {
    let other = || Expr::Other(text(node, source).to_string());
    match node.kind() {
        "parenthesized_expression" => named(node)
            .into_iter()
            .next()
            .map(|inner| lower_expr(inner, source))
            .unwrap_or_else(other),
        "method_invocation" => lower_call(node, source).map(Expr::Call).unwrap_or_else(other),
        "binary_expression" => {
            let parts = (
                node.child_by_field_name("left"),
                node.child_by_field_name("operator"),
                node.child_by_field_name("right"),
            );
            match parts {
                (Some(lhs), Some(op), Some(rhs)) => Expr::Binary {
                    op: BinaryOp::from_token(op.kind()),
                    lhs: Box::new(lower_expr(lhs, source)),
                    rhs: Box::new(lower_expr(rhs, source)),
                },
                _ => other(),
            }
        }
        "unary_expression" => {
            let is_not = node
                .child_by_field_name("operator")
                .is_some_and(|op| op.kind() == "!");
            match node.child_by_field_name("operand") {
                Some(operand) if is_not => Expr::Not(Box::new(lower_expr(operand, source))),
                _ => other(),
            }
        }
        "identifier" | "field_access" | "this" => {
            dotted_name(node, source).map(Expr::Name).unwrap_or_else(other)
        }
        "string_literal" => Expr::StringLiteral(text(node, source).to_string()),
        "object_creation_expression" => match node.child_by_field_name("type") {
            Some(ty) => Expr::New {
                type_name: strip_type_arguments(text(ty, source)),
                args: node
                    .child_by_field_name("arguments")
                    .map(|a| named(a).into_iter().map(|e| lower_expr(e, source)).collect())
                    .unwrap_or_default(),
            },
            None => other(),
        },
        "true" | "false" | "null_literal" | "character_literal" | "decimal_integer_literal"
        | "hex_integer_literal" | "octal_integer_literal" | "binary_integer_literal"
        | "decimal_floating_point_literal" => Expr::Literal(text(node, source).to_string()),
        _ => other(),
    }
}

/// `a.b.C` for identifier / field-access / scoped-identifier chains,
/// normalized to drop any whitespace between segments.
fn dotted_name(node: Node<'_>, source: &str) -> Option<String> {
    match node.kind() {
        "identifier" | "type_identifier" | "this" => Some(text(node, source).to_string()),
        "field_access" => {
            let object = dotted_name(node.child_by_field_name("object")?, source)?;
            let field = text(node.child_by_field_name("field")?, source);
            Some(format!("{object}.{field}"))
        }
        "scoped_identifier" => {
            let scope = dotted_name(node.child_by_field_name("scope")?, source)?;
            let name = text(node.child_by_field_name("name")?, source);
            Some(format!("{scope}.{name}"))
        }
        _ => None,
    }
}
