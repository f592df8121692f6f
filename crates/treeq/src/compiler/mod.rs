use crate::engine::runtime::Error;
use crate::model::Scalar;
use crate::parser::ast::{self, BinaryOp, Expr, Key, Literal};
use crate::parser::parse_expression;

pub mod ir;

use ir::{ExpressionNode, Operation, PathKey, TraversePreferences};

/// Compile expression text into an expression tree.
pub fn compile(expr: &str) -> Result<ExpressionNode, Error> {
    let ast = parse_expression(expr)?;
    let tree = lower(&ast)?;
    tracing::trace!(source = expr, root = tree.operation.name(), "compiled expression");
    Ok(tree)
}

/// Lower a syntax tree into the expression tree the navigator evaluates.
pub fn lower(expr: &Expr) -> Result<ExpressionNode, Error> {
    use ExpressionNode as N;
    match expr {
        Expr::Identity => Ok(N::self_reference()),
        Expr::Recurse { include_keys } => {
            Ok(N::leaf(Operation::RecursiveDescent { include_keys: *include_keys }))
        }
        Expr::Literal(l) => Ok(N::leaf(Operation::Value(literal_scalar(l)))),
        Expr::Variable(name) => Ok(N::leaf(Operation::GetVariable(name.clone()))),
        Expr::Key { target, key, optional } => {
            let key = match key {
                Key::Name(name) => PathKey::Str(name.clone()),
                Key::Index(i) => PathKey::Int(*i),
            };
            let prefs = TraversePreferences { optional: *optional, ..TraversePreferences::default() };
            let step = N::leaf(Operation::TraversePath { key, prefs });
            match target.as_ref() {
                Expr::Identity => Ok(step),
                target => Ok(N::pipe(lower(target)?, step)),
            }
        }
        Expr::Index { target, index, optional } => {
            let prefs = TraversePreferences { optional: *optional, ..TraversePreferences::default() };
            let indices = match index {
                Some(index) => lower(index)?,
                None => N::leaf(Operation::Empty),
            };
            Ok(N::binary(
                Operation::TraverseArray { prefs },
                lower(target)?,
                N::unary(Operation::Collect, indices),
            ))
        }
        Expr::Collect(inner) => {
            let inner = match inner {
                Some(inner) => lower(inner)?,
                None => N::leaf(Operation::Empty),
            };
            Ok(N::unary(Operation::Collect, inner))
        }
        Expr::Object(entries) => {
            let mut rows: Option<ExpressionNode> = None;
            for (key, value) in entries {
                let row = N::binary(Operation::CreateMap, lower(key)?, lower(value)?);
                rows = Some(match rows {
                    Some(prev) => N::binary(Operation::Union, prev, row),
                    None => row,
                });
            }
            Ok(N::unary(Operation::CollectObject, rows.unwrap_or_else(|| N::leaf(Operation::Empty))))
        }
        Expr::Binary { left, op, right } => {
            let operation = match op {
                BinaryOp::Pipe => Operation::Pipe,
                BinaryOp::Comma => Operation::Union,
                BinaryOp::Assign => Operation::Assign { update: false },
                BinaryOp::Update => Operation::Assign { update: true },
                BinaryOp::Or => Operation::Or,
                BinaryOp::And => Operation::And,
                BinaryOp::Eq => Operation::Equals { negate: false },
                BinaryOp::Ne => Operation::Equals { negate: true },
                BinaryOp::Mul => Operation::Multiply,
            };
            Ok(N::binary(operation, lower(left)?, lower(right)?))
        }
        Expr::Bind { source, name, body } => Ok(N::binary(
            Operation::AssignVariable(name.clone()),
            lower(source)?,
            lower(body)?,
        )),
        Expr::Call { name, args } => lower_call(name, args),
    }
}

fn literal_scalar(literal: &Literal) -> Scalar {
    match literal {
        Literal::Null => Scalar::null(),
        Literal::Boolean(b) => Scalar::bool(*b),
        Literal::Integer(i) => Scalar::int(*i),
        Literal::Double(x) => Scalar::float(*x),
        Literal::String(s) => Scalar::string(s.as_str()),
    }
}

fn lower_call(name: &str, args: &[ast::Expr]) -> Result<ExpressionNode, Error> {
    use ExpressionNode as N;
    let leaf = |op| Ok(N::leaf(op));
    match (name, args) {
        ("unique", []) => leaf(Operation::Unique),
        ("document_index" | "di", []) => leaf(Operation::DocumentIndex),
        ("file_index" | "fi", []) => leaf(Operation::FileIndex),
        ("filename", []) => leaf(Operation::Filename),
        ("parent", []) => leaf(Operation::Parent),
        ("path", []) => leaf(Operation::GetPath),
        ("now", []) => leaf(Operation::Now),
        ("not", []) => leaf(Operation::Not),
        ("empty", []) => leaf(Operation::Empty),
        ("unique_by", [key]) => Ok(N::unary(Operation::UniqueBy, lower(key)?)),
        ("select", [cond]) => Ok(N::unary(Operation::Select, lower(cond)?)),
        ("format_datetime", [format]) => Ok(N::unary(Operation::FormatDateTime, lower(format)?)),
        ("format_datetime", [layout, format]) => {
            Ok(N::unary(Operation::FormatDateTime, block(layout, format)?))
        }
        ("tz", [zone]) => Ok(N::unary(Operation::TimeZone, lower(zone)?)),
        ("tz", [layout, zone]) => Ok(N::unary(Operation::TimeZone, block(layout, zone)?)),
        _ => Err(Error::syntax(format!("unknown function {name}/{}", args.len()))),
    }
}

fn block(first: &Expr, second: &Expr) -> Result<ExpressionNode, Error> {
    Ok(ExpressionNode::binary(Operation::Block, lower(first)?, lower(second)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::runtime::ErrorCode;

    #[test]
    fn nested_path_lowers_to_pipe() {
        let tree = compile(".a.b").unwrap();
        assert_eq!(tree, ExpressionNode::pipe(ExpressionNode::path("a"), ExpressionNode::path("b")));
    }

    #[test]
    fn splat_lowers_to_empty_collect() {
        let tree = compile(".a[]").unwrap();
        assert_eq!(tree, ExpressionNode::splat(ExpressionNode::path("a")));
    }

    #[test]
    fn two_argument_functions_use_a_block() {
        let tree = compile("tz(\"%Y\"; \"UTC\")").unwrap();
        let rhs = tree.rhs.unwrap();
        assert_eq!(rhs.operation, Operation::Block);
    }

    #[test]
    fn unknown_function_is_a_syntax_error() {
        let err = compile("frobnicate(1)").unwrap_err();
        assert_eq!(err.code, ErrorCode::Syntax);
        assert!(err.message.contains("frobnicate/1"));
    }

    #[test]
    fn wrong_arity_is_a_syntax_error() {
        assert_eq!(compile("unique(1)").unwrap_err().code, ErrorCode::Syntax);
    }

    #[test]
    fn grammar_failure_is_a_syntax_error() {
        let err = compile(".a[").unwrap_err();
        assert_eq!(err.code, ErrorCode::Syntax);
        assert!(std::error::Error::source(&err).is_some());
    }
}
