//! Provenance operators: structure-independent, one output per input.

use crate::engine::candidate::PathSegment;
use crate::engine::context::Context;
use crate::model::{Node, NodeTree, Scalar};

pub(crate) fn document_index(tree: &mut NodeTree, ctx: &Context) -> Context {
    let results = ctx
        .iter()
        .map(|c| c.create_replacement(tree.alloc_scalar(Scalar::int(c.document as i64))))
        .collect();
    ctx.child_context(results)
}

pub(crate) fn file_index(tree: &mut NodeTree, ctx: &Context) -> Context {
    let results = ctx
        .iter()
        .map(|c| c.create_replacement(tree.alloc_scalar(Scalar::int(c.file_index as i64))))
        .collect();
    ctx.child_context(results)
}

/// Source name, or null for anonymous input.
pub(crate) fn filename(tree: &mut NodeTree, ctx: &Context) -> Context {
    let results = ctx
        .iter()
        .map(|c| {
            let scalar = match &c.filename {
                Some(name) => Scalar::string(name.as_ref()),
                None => Scalar::null(),
            };
            c.create_replacement(tree.alloc_scalar(scalar))
        })
        .collect();
    ctx.child_context(results)
}

/// Enclosing candidate; roots have none.
pub(crate) fn parent(ctx: &Context) -> Context {
    let results = ctx.iter().filter_map(|c| c.parent.as_deref().cloned()).collect();
    ctx.child_context(results)
}

/// Path from the document root as a sequence of keys and indices.
pub(crate) fn get_path(tree: &mut NodeTree, ctx: &Context) -> Context {
    let results = ctx
        .iter()
        .map(|c| {
            let segments = c
                .path
                .iter()
                .map(|segment| {
                    tree.alloc_scalar(match segment {
                        PathSegment::Key { text, tag } => Scalar::new(*tag, text.as_str()),
                        PathSegment::Index(i) => Scalar::int(*i as i64),
                    })
                })
                .collect();
            c.create_replacement(tree.alloc(Node::Sequence(segments)))
        })
        .collect();
    ctx.child_context(results)
}
