use crate::compiler::ir::ExpressionNode;
use crate::engine::context::Context;
use crate::engine::navigator::Navigator;
use crate::engine::runtime::Error;
use crate::model::{Node, NodeId, NodeTree};
use std::collections::HashSet;
use std::rc::Rc;

/// `unique`, i.e. `unique_by(.)`.
pub(crate) fn unique(nav: &mut Navigator, tree: &mut NodeTree, ctx: &Context) -> Result<Context, Error> {
    unique_with(nav, tree, ctx, &ExpressionNode::self_reference())
}

pub(crate) fn unique_by(
    nav: &mut Navigator,
    tree: &mut NodeTree,
    ctx: &Context,
    expr: &ExpressionNode,
) -> Result<Context, Error> {
    match expr.rhs.as_deref() {
        Some(key) => unique_with(nav, tree, ctx, key),
        None => unique(nav, tree, ctx),
    }
}

/// Keeps the first element of each key, in order. The key of an element is
/// the YAML rendering of the first result of `key_expr` evaluated read-only
/// on it, or `null` when there is none. Strings are quoted where their text
/// would read back as another type, so `1` and `"1"` are distinct keys.
fn unique_with(
    nav: &mut Navigator,
    tree: &mut NodeTree,
    ctx: &Context,
    key_expr: &ExpressionNode,
) -> Result<Context, Error> {
    let mut results = Vec::with_capacity(ctx.len());
    for candidate in ctx {
        let seq = tree.resolve(candidate.node);
        let Some(items) = tree.items(seq).map(<[NodeId]>::to_vec) else {
            return Err(Error::structural(format!(
                "only arrays are supported for unique, got {:?} at [{}]",
                tree.kind(seq),
                candidate.nice_path()
            )));
        };

        let parent = Rc::new(candidate.clone());
        let mut seen = HashSet::new();
        let mut kept = Vec::new();
        for (i, item) in items.into_iter().enumerate() {
            let element = ctx.single_read_only_child_context(parent.create_array_child(i, item));
            let keyed = nav.evaluate(tree, &element, key_expr)?;
            let key = match keyed.first() {
                Some(first) => tree.render(first.node),
                None => String::from("null"),
            };
            if seen.insert(key) {
                kept.push(item);
            }
        }
        tracing::trace!(path = %candidate.nice_path(), kept = kept.len(), "unique");
        let deduped = tree.alloc(Node::Sequence(kept));
        results.push(candidate.create_replacement(deduped));
    }
    Ok(ctx.child_context(results))
}
