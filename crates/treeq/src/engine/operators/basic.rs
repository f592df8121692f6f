use super::{fresh_candidate, is_truthy};
use crate::compiler::ir::ExpressionNode;
use crate::engine::candidate::CandidateNode;
use crate::engine::context::Context;
use crate::engine::navigator::Navigator;
use crate::engine::runtime::Error;
use crate::model::{NodeTree, Scalar};

pub(crate) fn pipe(
    nav: &mut Navigator,
    tree: &mut NodeTree,
    ctx: &Context,
    expr: &ExpressionNode,
) -> Result<Context, Error> {
    let lhs = nav.evaluate_lhs(tree, ctx, expr)?;
    nav.evaluate_rhs(tree, &lhs, expr)
}

pub(crate) fn union(
    nav: &mut Navigator,
    tree: &mut NodeTree,
    ctx: &Context,
    expr: &ExpressionNode,
) -> Result<Context, Error> {
    let mut matches = nav.evaluate_lhs(tree, ctx, expr)?.into_matches();
    matches.extend(nav.evaluate_rhs(tree, ctx, expr)?);
    Ok(ctx.child_context(matches))
}

/// One fresh literal per evaluation, whatever the size of the context.
pub(crate) fn value(tree: &mut NodeTree, ctx: &Context, scalar: &Scalar) -> Context {
    let id = tree.alloc_scalar(scalar.clone());
    ctx.single_child_context(fresh_candidate(ctx, id))
}

/// `source as $name | body`: the body runs once per source result, with the
/// binding in scope, against the candidate that produced it.
pub(crate) fn assign_variable(
    nav: &mut Navigator,
    tree: &mut NodeTree,
    ctx: &Context,
    expr: &ExpressionNode,
    name: &str,
) -> Result<Context, Error> {
    let mut results = Vec::new();
    for candidate in ctx {
        let single = ctx.single_child_context(candidate.clone());
        let sources = nav.evaluate_lhs(tree, &single, expr)?;
        for source in sources {
            let scoped = single.with_variable(name, vec![source]);
            results.extend(nav.evaluate_rhs(tree, &scoped, expr)?);
        }
    }
    Ok(ctx.child_context(results))
}

pub(crate) fn get_variable(ctx: &Context, name: &str) -> Context {
    match ctx.variable(name) {
        Some(bound) => ctx.child_context(bound.to_vec()),
        None => {
            tracing::debug!(name, "unbound variable");
            ctx.child_context(Vec::new())
        }
    }
}

/// First result of `side` for `candidate`, evaluated read-only.
fn first_of_side(
    nav: &mut Navigator,
    tree: &mut NodeTree,
    ctx: &Context,
    candidate: &CandidateNode,
    side: Option<&ExpressionNode>,
) -> Result<Option<CandidateNode>, Error> {
    let single = ctx.single_read_only_child_context(candidate.clone());
    let out = match side {
        Some(side) => nav.evaluate(tree, &single, side)?,
        None => single,
    };
    Ok(out.into_matches().into_iter().next())
}

fn bool_candidate(tree: &mut NodeTree, candidate: &CandidateNode, value: bool) -> CandidateNode {
    candidate.detached(tree.alloc_scalar(Scalar::bool(value)))
}

/// Compares the first result of each side per candidate; a side without a
/// result compares as null.
pub(crate) fn equals(
    nav: &mut Navigator,
    tree: &mut NodeTree,
    ctx: &Context,
    expr: &ExpressionNode,
    negate: bool,
) -> Result<Context, Error> {
    let mut results = Vec::with_capacity(ctx.len());
    for candidate in ctx {
        let lhs = first_of_side(nav, tree, ctx, candidate, expr.lhs.as_deref())?;
        let rhs = first_of_side(nav, tree, ctx, candidate, expr.rhs.as_deref())?;
        let equal = match (lhs, rhs) {
            (Some(l), Some(r)) => tree.deep_equal(l.node, r.node),
            (Some(one), None) | (None, Some(one)) => tree.get(tree.resolve(one.node)).is_null(),
            (None, None) => true,
        };
        results.push(bool_candidate(tree, candidate, equal != negate));
    }
    Ok(ctx.child_context(results))
}

pub(crate) fn and(
    nav: &mut Navigator,
    tree: &mut NodeTree,
    ctx: &Context,
    expr: &ExpressionNode,
) -> Result<Context, Error> {
    logical(nav, tree, ctx, expr, false)
}

pub(crate) fn or(
    nav: &mut Navigator,
    tree: &mut NodeTree,
    ctx: &Context,
    expr: &ExpressionNode,
) -> Result<Context, Error> {
    logical(nav, tree, ctx, expr, true)
}

// `short_on` is the lhs value that decides the result without the rhs.
fn logical(
    nav: &mut Navigator,
    tree: &mut NodeTree,
    ctx: &Context,
    expr: &ExpressionNode,
    short_on: bool,
) -> Result<Context, Error> {
    let mut results = Vec::with_capacity(ctx.len());
    for candidate in ctx {
        let lhs = first_of_side(nav, tree, ctx, candidate, expr.lhs.as_deref())?
            .is_some_and(|c| is_truthy(tree, c.node));
        let value = if lhs == short_on {
            short_on
        } else {
            first_of_side(nav, tree, ctx, candidate, expr.rhs.as_deref())?
                .is_some_and(|c| is_truthy(tree, c.node))
        };
        results.push(bool_candidate(tree, candidate, value));
    }
    Ok(ctx.child_context(results))
}

pub(crate) fn not(tree: &mut NodeTree, ctx: &Context) -> Context {
    let results = ctx
        .iter()
        .map(|c| {
            let value = !is_truthy(tree, c.node);
            bool_candidate(tree, c, value)
        })
        .collect();
    ctx.child_context(results)
}

pub(crate) fn select(
    nav: &mut Navigator,
    tree: &mut NodeTree,
    ctx: &Context,
    expr: &ExpressionNode,
) -> Result<Context, Error> {
    let mut kept = Vec::new();
    for candidate in ctx {
        let keep = first_of_side(nav, tree, ctx, candidate, expr.rhs.as_deref())?
            .is_some_and(|c| is_truthy(tree, c.node));
        if keep {
            kept.push(candidate.clone());
        }
    }
    Ok(ctx.child_context(kept))
}
