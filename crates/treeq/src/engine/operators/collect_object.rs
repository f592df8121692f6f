//! `{...}` object construction.
//!
//! The rhs yields rows (one per `key: value` pair, see `create_map`), each a
//! sequence with one element per input candidate. Rows are rotated into
//! columns; within a column every element is splatted and the alternatives
//! are cross-multiplied, so `{a: (1, 2), b: 3}` builds two mappings.

use super::fresh_candidate;
use super::multiply::multiply_nodes;
use super::traverse::splat;
use crate::compiler::ir::{ExpressionNode, TraversePreferences};
use crate::engine::candidate::CandidateNode;
use crate::engine::context::Context;
use crate::engine::navigator::Navigator;
use crate::engine::runtime::Error;
use crate::model::{Node, NodeId, NodeTree};
use std::rc::Rc;

pub(crate) fn collect_object(
    nav: &mut Navigator,
    tree: &mut NodeTree,
    ctx: &Context,
    expr: &ExpressionNode,
) -> Result<Context, Error> {
    let writable = ctx.writable_clone();
    let rows = nav.evaluate_rhs(tree, &writable, expr)?;
    let Some(first) = rows.first() else {
        let empty = tree.alloc(Node::Mapping(Vec::new()));
        return Ok(ctx.single_child_context(fresh_candidate(ctx, empty)));
    };
    let width = row_items(tree, first)?.len();

    let mut columns: Vec<Vec<CandidateNode>> = vec![Vec::new(); width];
    for row in &rows {
        let items = row_items(tree, row)?;
        if items.len() != width {
            return Err(Error::precondition(format!(
                "object rows differ in length ({} vs {width})",
                items.len()
            )));
        }
        let parent = Rc::new(row.clone());
        for (column, (i, item)) in columns.iter_mut().zip(items.into_iter().enumerate()) {
            column.push(parent.create_array_child(i, item));
        }
    }

    let mut objects = Vec::new();
    for column in columns {
        objects.extend(combine(nav, tree, &rows, column)?);
    }
    tracing::debug!(rows = rows.len(), objects = objects.len(), "collect object");
    Ok(ctx.child_context(objects))
}

fn row_items(tree: &NodeTree, row: &CandidateNode) -> Result<Vec<NodeId>, Error> {
    tree.items(tree.resolve(row.node))
        .map(<[NodeId]>::to_vec)
        .ok_or_else(|| Error::precondition("object construction expects sequence rows"))
}

fn combine(
    nav: &mut Navigator,
    tree: &mut NodeTree,
    rows: &Context,
    column: Vec<CandidateNode>,
) -> Result<Vec<CandidateNode>, Error> {
    let prefs = TraversePreferences { dont_follow_alias: true, ..TraversePreferences::default() };
    let mut aggregate: Vec<CandidateNode> = Vec::new();
    for cell in column {
        let splatted: Vec<CandidateNode> = splat(nav, tree, &rows.single_child_context(cell), prefs)?
            .into_iter()
            .map(|mut c| {
                c.path.clear();
                c
            })
            .collect();
        if aggregate.is_empty() {
            aggregate = splatted;
            continue;
        }
        let mut next = Vec::with_capacity(aggregate.len() * splatted.len());
        for agg in &aggregate {
            for piece in &splatted {
                let merged = multiply_nodes(tree, agg.node, piece.node);
                let mut candidate = agg.create_replacement(merged);
                candidate.path.clear();
                next.push(candidate);
            }
        }
        aggregate = next;
    }
    Ok(aggregate)
}
