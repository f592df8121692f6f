use super::fresh_candidate;
use crate::compiler::ir::ExpressionNode;
use crate::engine::context::Context;
use crate::engine::navigator::Navigator;
use crate::engine::runtime::Error;
use crate::model::{Node, NodeTree};

/// `[rhs]`: gathers every result of rhs into one new sequence. Always yields
/// exactly one candidate; an empty input gives an empty sequence.
pub(crate) fn collect(
    nav: &mut Navigator,
    tree: &mut NodeTree,
    ctx: &Context,
    expr: &ExpressionNode,
) -> Result<Context, Error> {
    let gathered = nav.evaluate_rhs(tree, ctx, expr)?;
    let items: Vec<_> = gathered.iter().map(|c| tree.unwrap_document(c.node)).collect();
    tracing::trace!(items = items.len(), "collect");
    let seq = tree.alloc(Node::Sequence(items));
    let anchor = if gathered.is_empty() { ctx } else { &gathered };
    Ok(ctx.single_child_context(fresh_candidate(anchor, seq)))
}
