#![allow(dead_code)]

use treeq::{
    CandidateNode, Context, DocumentDecoder, EngineConfig, Error, Navigator, NodeTree, YamlDecoder,
    compile,
};

/// First document of `yaml` with a root context over it.
pub fn load(yaml: &str) -> (NodeTree, Context) {
    let doc = YamlDecoder
        .decode(yaml.as_bytes())
        .next()
        .unwrap_or_else(|| panic!("'{yaml}' should contain a document"))
        .unwrap_or_else(|e| panic!("'{yaml}' should decode: {e}"));
    let ctx = Context::new(vec![CandidateNode::root(doc.root, 0, 0)]);
    (doc.tree, ctx)
}

/// Evaluate and return the results plus the (possibly mutated) tree.
pub fn run_with(
    config: EngineConfig,
    yaml: &str,
    expr: &str,
) -> Result<(NodeTree, Context, Context), Error> {
    let (mut tree, ctx) = load(yaml);
    let ctx = ctx.with_auto_create(config.auto_create);
    let compiled = compile(expr)?;
    let results = Navigator::new(config).evaluate(&mut tree, &ctx, &compiled)?;
    Ok((tree, ctx, results))
}

pub fn eval_with(config: EngineConfig, yaml: &str, expr: &str) -> Result<Vec<String>, Error> {
    let (tree, _, results) = run_with(config, yaml, expr)?;
    Ok(results.iter().map(|c| tree.render(c.node)).collect())
}

/// Flow-style rendering of every result.
pub fn eval(yaml: &str, expr: &str) -> Vec<String> {
    eval_with(EngineConfig::default(), yaml, expr)
        .unwrap_or_else(|e| panic!("'{expr}' should evaluate: {e}"))
}

pub fn eval_err(yaml: &str, expr: &str) -> Error {
    match eval_with(EngineConfig::default(), yaml, expr) {
        Ok(results) => panic!("'{expr}' should fail, got {results:?}"),
        Err(e) => e,
    }
}

/// The whole document after evaluating `expr`.
pub fn document_after(yaml: &str, expr: &str) -> String {
    let (tree, ctx, _) = run_with(EngineConfig::default(), yaml, expr)
        .unwrap_or_else(|e| panic!("'{expr}' should evaluate: {e}"));
    tree.render(ctx.matches[0].node)
}
