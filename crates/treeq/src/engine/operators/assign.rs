use crate::compiler::ir::ExpressionNode;
use crate::engine::context::Context;
use crate::engine::navigator::Navigator;
use crate::engine::runtime::Error;
use crate::model::NodeTree;

/// `lhs = rhs` and `lhs |= rhs`.
///
/// Plain assignment evaluates rhs once, read-only, against the incoming
/// context. Update assignment evaluates rhs against each lhs match. Either way
/// the first rhs result is copied into the lhs slot; no result leaves the slot
/// untouched. The incoming context is returned.
pub(crate) fn assign(
    nav: &mut Navigator,
    tree: &mut NodeTree,
    ctx: &Context,
    expr: &ExpressionNode,
    update: bool,
) -> Result<Context, Error> {
    let shared = if update {
        None
    } else {
        let rhs = nav.evaluate_rhs(tree, &ctx.read_only_clone(), expr)?;
        Some(rhs.first().map(|c| c.node))
    };

    let targets = nav.evaluate_lhs(tree, ctx, expr)?;
    for target in &targets {
        let source = match shared {
            Some(source) => source,
            None => {
                let rhs = nav.evaluate_rhs(tree, &ctx.single_child_context(target.clone()), expr)?;
                rhs.first().map(|c| c.node)
            }
        };
        if let Some(source) = source {
            target.update_from(tree, source)?;
        }
    }
    tracing::debug!(update, targets = targets.len(), "assign");
    Ok(ctx.clone())
}
