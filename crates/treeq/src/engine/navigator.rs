use crate::compiler::ir::{ExpressionNode, Operation};
use crate::engine::config::EngineConfig;
use crate::engine::context::Context;
use crate::engine::key_match::KeyMatcher;
use crate::engine::operators::{
    assign, basic, collect, collect_object, create_map, datetime, document_index, multiply,
    traverse, unique,
};
use crate::engine::runtime::Error;
use crate::model::NodeTree;

/// Evaluate `expr` against `ctx` with the default configuration.
pub fn evaluate(
    tree: &mut NodeTree,
    ctx: &Context,
    expr: &ExpressionNode,
) -> Result<Context, Error> {
    Navigator::new(EngineConfig::default()).evaluate(tree, ctx, expr)
}

/// Convenience: compile and evaluate an expression string.
pub fn evaluate_expr(tree: &mut NodeTree, ctx: &Context, expr: &str) -> Result<Context, Error> {
    let compiled = crate::compiler::compile(expr)?;
    evaluate(tree, ctx, &compiled)
}

/// Walks an expression tree, dispatching each node to its operator.
///
/// A navigator holds no per-document state and may be reused across
/// documents and trees. The expression tree is never mutated.
pub struct Navigator {
    config: EngineConfig,
    keys: KeyMatcher,
}

impl Navigator {
    pub fn new(config: EngineConfig) -> Self {
        let keys = KeyMatcher::new(config.key_match, config.key_pattern_cache);
        Self { config, keys }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn keys(&mut self) -> &mut KeyMatcher {
        &mut self.keys
    }

    pub fn evaluate(
        &mut self,
        tree: &mut NodeTree,
        ctx: &Context,
        expr: &ExpressionNode,
    ) -> Result<Context, Error> {
        tracing::trace!(op = expr.operation.name(), matches = ctx.len(), "evaluate");
        match &expr.operation {
            Operation::SelfReference => Ok(ctx.clone()),
            Operation::Empty => Ok(ctx.child_context(Vec::new())),
            Operation::Pipe => basic::pipe(self, tree, ctx, expr),
            Operation::Union => basic::union(self, tree, ctx, expr),
            Operation::Block => Err(Error::precondition(
                "argument block evaluated outside of a function call",
            )),
            Operation::Value(scalar) => Ok(basic::value(tree, ctx, scalar)),
            Operation::TraversePath { key, prefs } => {
                traverse::traverse_path(self, tree, ctx, key, *prefs)
            }
            Operation::TraverseArray { prefs } => {
                traverse::traverse_array(self, tree, ctx, expr, *prefs)
            }
            Operation::RecursiveDescent { include_keys } => {
                traverse::recursive_descent(self, tree, ctx, *include_keys)
            }
            Operation::Collect => collect::collect(self, tree, ctx, expr),
            Operation::CollectObject => collect_object::collect_object(self, tree, ctx, expr),
            Operation::CreateMap => create_map::create_map(self, tree, ctx, expr),
            Operation::Multiply => multiply::multiply(self, tree, ctx, expr),
            Operation::Assign { update } => assign::assign(self, tree, ctx, expr, *update),
            Operation::AssignVariable(name) => basic::assign_variable(self, tree, ctx, expr, name),
            Operation::GetVariable(name) => Ok(basic::get_variable(ctx, name)),
            Operation::Equals { negate } => basic::equals(self, tree, ctx, expr, *negate),
            Operation::And => basic::and(self, tree, ctx, expr),
            Operation::Or => basic::or(self, tree, ctx, expr),
            Operation::Not => Ok(basic::not(tree, ctx)),
            Operation::Select => basic::select(self, tree, ctx, expr),
            Operation::Parent => Ok(document_index::parent(ctx)),
            Operation::GetPath => Ok(document_index::get_path(tree, ctx)),
            Operation::Unique => unique::unique(self, tree, ctx),
            Operation::UniqueBy => unique::unique_by(self, tree, ctx, expr),
            Operation::DocumentIndex => Ok(document_index::document_index(tree, ctx)),
            Operation::FileIndex => Ok(document_index::file_index(tree, ctx)),
            Operation::Filename => Ok(document_index::filename(tree, ctx)),
            Operation::FormatDateTime => datetime::format_datetime(self, tree, ctx, expr),
            Operation::TimeZone => datetime::time_zone(self, tree, ctx, expr),
            Operation::Now => Ok(datetime::now(self, tree, ctx)),
        }
    }

    /// Left operand, or the context itself when there is none.
    pub(crate) fn evaluate_lhs(
        &mut self,
        tree: &mut NodeTree,
        ctx: &Context,
        expr: &ExpressionNode,
    ) -> Result<Context, Error> {
        match expr.lhs.as_deref() {
            Some(lhs) => self.evaluate(tree, ctx, lhs),
            None => Ok(ctx.clone()),
        }
    }

    /// Right operand, or the context itself when there is none.
    pub(crate) fn evaluate_rhs(
        &mut self,
        tree: &mut NodeTree,
        ctx: &Context,
        expr: &ExpressionNode,
    ) -> Result<Context, Error> {
        match expr.rhs.as_deref() {
            Some(rhs) => self.evaluate(tree, ctx, rhs),
            None => Ok(ctx.clone()),
        }
    }
}
