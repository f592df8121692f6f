use crate::compiler::ir::ExpressionNode;
use crate::engine::candidate::CandidateNode;
use crate::engine::context::Context;
use crate::engine::navigator::Navigator;
use crate::engine::runtime::Error;
use crate::model::{MapEntry, Node, NodeId, NodeTree, Scalar};

/// `lhs * rhs`, crossing every lhs result with every rhs result.
///
/// Runs per candidate, unless the first candidate asks for the context to be
/// evaluated together, in which case both sides see the whole context once.
pub(crate) fn multiply(
    nav: &mut Navigator,
    tree: &mut NodeTree,
    ctx: &Context,
    expr: &ExpressionNode,
) -> Result<Context, Error> {
    if ctx.first().is_some_and(|c| c.evaluate_together) {
        let results = cross(nav, tree, ctx, expr)?;
        return Ok(ctx.child_context(results));
    }
    let mut results = Vec::new();
    for candidate in ctx {
        results.extend(cross(nav, tree, &ctx.single_child_context(candidate.clone()), expr)?);
    }
    Ok(ctx.child_context(results))
}

fn cross(
    nav: &mut Navigator,
    tree: &mut NodeTree,
    ctx: &Context,
    expr: &ExpressionNode,
) -> Result<Vec<CandidateNode>, Error> {
    let lhs = nav.evaluate_lhs(tree, ctx, expr)?;
    let rhs = nav.evaluate_rhs(tree, ctx, expr)?;
    let mut results = Vec::with_capacity(lhs.len() * rhs.len());
    for l in &lhs {
        for r in &rhs {
            let product = multiply_nodes(tree, l.node, r.node);
            results.push(l.create_replacement(product));
        }
    }
    Ok(results)
}

/// New node holding `lhs * rhs`: mappings deep-merge (rhs wins on conflicts),
/// numbers multiply, anything else yields a copy of rhs. Neither input is
/// modified.
pub(crate) fn multiply_nodes(tree: &mut NodeTree, lhs: NodeId, rhs: NodeId) -> NodeId {
    let (l, r) = (tree.resolve(lhs), tree.resolve(rhs));
    match (tree.get(l), tree.get(r)) {
        (Node::Mapping(_), Node::Mapping(source)) => {
            let source = source.clone();
            let merged = tree.deep_copy(l);
            for entry in source {
                merge_entry(tree, merged, entry);
            }
            merged
        }
        (Node::Scalar(a), Node::Scalar(b)) if a.tag.is_numeric() && b.tag.is_numeric() => {
            let product = match (a.as_i64(), b.as_i64()) {
                (Some(x), Some(y)) => x.checked_mul(y).map(Scalar::int),
                _ => None,
            };
            let product = product.unwrap_or_else(|| {
                Scalar::float(a.as_f64().unwrap_or(f64::NAN) * b.as_f64().unwrap_or(f64::NAN))
            });
            tree.alloc_scalar(product)
        }
        _ => tree.deep_copy(r),
    }
}

fn merge_entry(tree: &mut NodeTree, target: NodeId, entry: MapEntry) {
    let existing = tree
        .entries(target)
        .unwrap_or_default()
        .iter()
        .position(|e| !tree.is_merge_key(e.key) && tree.deep_equal(e.key, entry.key));
    match existing {
        Some(pos) => {
            let mut entries = tree.entries(target).unwrap_or_default().to_vec();
            entries[pos].value = multiply_nodes(tree, entries[pos].value, entry.value);
            tree.replace(target, Node::Mapping(entries));
        }
        None => {
            let key = tree.deep_copy(entry.key);
            let value = tree.deep_copy(entry.value);
            tree.push_entry(target, key, value);
        }
    }
}
