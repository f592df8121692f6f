//! Operator implementations, one module per family. The navigator owns the
//! dispatch; operators call back into it for their operands.

pub(crate) mod assign;
pub(crate) mod basic;
pub(crate) mod collect;
pub(crate) mod collect_object;
pub(crate) mod create_map;
pub(crate) mod datetime;
pub(crate) mod document_index;
pub(crate) mod multiply;
pub(crate) mod traverse;
pub(crate) mod unique;

use crate::engine::candidate::CandidateNode;
use crate::engine::context::Context;
use crate::model::{NodeId, NodeTree};

/// New candidate carrying `node`, attributed to the first match of `ctx`.
pub(crate) fn fresh_candidate(ctx: &Context, node: NodeId) -> CandidateNode {
    match ctx.first() {
        Some(first) => first.detached(node),
        None => CandidateNode::root(node, 0, 0),
    }
}

/// Truthiness of the node behind `id`: containers are true, scalars by value.
pub(crate) fn is_truthy(tree: &NodeTree, id: NodeId) -> bool {
    tree.scalar(tree.resolve(id)).is_none_or(|s| s.is_truthy())
}
