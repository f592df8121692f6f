use super::fresh_candidate;
use crate::compiler::ir::ExpressionNode;
use crate::engine::context::Context;
use crate::engine::navigator::Navigator;
use crate::engine::runtime::Error;
use crate::model::{MapEntry, Node, NodeTree};

/// `key: value` inside `{...}`.
///
/// Yields a single candidate: a row sequence with one element per context
/// candidate, each element a sequence of single-entry mappings, one per
/// key x value combination. An empty context still produces one element.
pub(crate) fn create_map(
    nav: &mut Navigator,
    tree: &mut NodeTree,
    ctx: &Context,
    expr: &ExpressionNode,
) -> Result<Context, Error> {
    let inputs = if ctx.is_empty() {
        vec![ctx.clone()]
    } else {
        ctx.iter().map(|c| ctx.single_child_context(c.clone())).collect()
    };

    let mut elements = Vec::with_capacity(inputs.len());
    for single in &inputs {
        let keys = nav.evaluate_lhs(tree, single, expr)?;
        let values = nav.evaluate_rhs(tree, single, expr)?;
        let mut pairs = Vec::with_capacity(keys.len() * values.len());
        for k in &keys {
            for v in &values {
                let key = tree.deep_copy(tree.unwrap_document(k.node));
                let value = tree.deep_copy(tree.unwrap_document(v.node));
                pairs.push(tree.alloc(Node::Mapping(vec![MapEntry { key, value }])));
            }
        }
        elements.push(tree.alloc(Node::Sequence(pairs)));
    }

    let row = tree.alloc(Node::Sequence(elements));
    Ok(ctx.single_child_context(fresh_candidate(ctx, row)))
}
