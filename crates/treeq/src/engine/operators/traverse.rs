//! Path descent: `.key`, `.[indices]`, splat and recursive descent.
//!
//! Candidates are resolved through aliases and documents before dispatch.
//! Null targets are replaced in place by an empty container when the context
//! permits auto-creation. Map lookups expand `<<` merge entries; an explicit
//! key always shadows a merged-in key with the same path.

use crate::compiler::ir::{ExpressionNode, PathKey, TraversePreferences};
use crate::engine::candidate::{CandidateNode, PathSegment};
use crate::engine::context::Context;
use crate::engine::key_match::{KeyMatcher, KeyValue};
use crate::engine::navigator::Navigator;
use crate::engine::runtime::Error;
use crate::model::{MapEntry, Node, NodeId, NodeKind, NodeTree};
use std::collections::HashMap;
use std::rc::Rc;

const MAX_MERGE_DEPTH: usize = 64;

pub(crate) fn traverse_path(
    nav: &mut Navigator,
    tree: &mut NodeTree,
    ctx: &Context,
    key: &PathKey,
    prefs: TraversePreferences,
) -> Result<Context, Error> {
    let wanted = match key {
        PathKey::Str(s) => KeyValue::Str(s.clone()),
        PathKey::Int(i) => KeyValue::Int(*i),
    };
    let mut traversal = Traversal::new(tree, nav.keys(), prefs, ctx.auto_create());
    let mut results = Vec::new();
    for candidate in ctx {
        results.extend(traversal.step(candidate, &wanted)?);
    }
    tracing::debug!(key = %key, inputs = ctx.len(), results = results.len(), "traverse path");
    Ok(ctx.child_context(results))
}

/// `lhs[rhs]`: rhs is evaluated read-only against the original context and
/// must collect the indices into one sequence; an empty sequence splats.
pub(crate) fn traverse_array(
    nav: &mut Navigator,
    tree: &mut NodeTree,
    ctx: &Context,
    expr: &ExpressionNode,
    prefs: TraversePreferences,
) -> Result<Context, Error> {
    let lhs = nav.evaluate_lhs(tree, ctx, expr)?;
    let indices = match expr.rhs.as_deref() {
        Some(rhs) => {
            let collected = nav.evaluate(tree, &ctx.read_only_clone(), rhs)?;
            let Some(first) = collected.first() else {
                return Err(Error::precondition("index expression produced no value"));
            };
            let items = tree
                .items(tree.unwrap_document(first.node))
                .ok_or_else(|| Error::precondition("index expression did not collect a sequence"))?
                .to_vec();
            items
                .into_iter()
                .map(|item| {
                    KeyValue::of(tree, item)
                        .ok_or_else(|| Error::structural("cannot use a collection as an index"))
                })
                .collect::<Result<Vec<_>, _>>()?
        }
        None => Vec::new(),
    };
    let mut traversal = Traversal::new(tree, nav.keys(), prefs, lhs.auto_create());
    let mut results = Vec::new();
    for candidate in &lhs {
        results.extend(traversal.with_indices(candidate, &indices)?);
    }
    tracing::debug!(indices = indices.len(), results = results.len(), "traverse array");
    Ok(ctx.child_context(results))
}

/// Every child of every candidate, in document order.
pub(crate) fn splat(
    nav: &mut Navigator,
    tree: &mut NodeTree,
    ctx: &Context,
    prefs: TraversePreferences,
) -> Result<Context, Error> {
    let mut traversal = Traversal::new(tree, nav.keys(), prefs, false);
    let mut results = Vec::new();
    for candidate in ctx {
        results.extend(traversal.with_indices(candidate, &[])?);
    }
    Ok(ctx.child_context(results))
}

/// `..` emits each candidate followed by all of its descendants; `...` also
/// emits map keys. Aliases are not followed.
pub(crate) fn recursive_descent(
    nav: &mut Navigator,
    tree: &mut NodeTree,
    ctx: &Context,
    include_keys: bool,
) -> Result<Context, Error> {
    let prefs = TraversePreferences {
        dont_follow_alias: true,
        include_map_keys: include_keys,
        ..TraversePreferences::default()
    };
    let mut traversal = Traversal::new(tree, nav.keys(), prefs, false);
    let mut results = Vec::new();
    for candidate in ctx {
        traversal.descend(candidate, &mut results)?;
    }
    Ok(ctx.child_context(results))
}

/// Matches keyed by candidate identity. Explicit entries replace merged-in
/// entries at the same identity; merged-in entries never replace anything, so
/// the first merge source listed wins.
#[derive(Default)]
struct MatchSet {
    ordered: Vec<CandidateNode>,
    positions: HashMap<String, (usize, bool)>,
}

impl MatchSet {
    fn insert(&mut self, candidate: CandidateNode, merged: bool) {
        let identity = candidate.identity();
        match self.positions.get_mut(&identity) {
            Some((pos, was_merged)) => {
                if !merged {
                    self.ordered[*pos] = candidate;
                    *was_merged = false;
                }
            }
            None => {
                self.positions.insert(identity, (self.ordered.len(), merged));
                self.ordered.push(candidate);
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    fn into_vec(self) -> Vec<CandidateNode> {
        self.ordered
    }
}

struct Traversal<'a> {
    tree: &'a mut NodeTree,
    keys: &'a mut KeyMatcher,
    prefs: TraversePreferences,
    auto_create: bool,
}

impl<'a> Traversal<'a> {
    fn new(
        tree: &'a mut NodeTree,
        keys: &'a mut KeyMatcher,
        prefs: TraversePreferences,
        ctx_auto_create: bool,
    ) -> Self {
        let auto_create = ctx_auto_create && !prefs.dont_auto_create;
        Self { tree, keys, prefs, auto_create }
    }

    /// Candidate re-pointed at the resolved container.
    fn resolved(&self, candidate: &CandidateNode) -> CandidateNode {
        let mut current = candidate.clone();
        current.node = self.tree.resolve(candidate.node);
        current
    }

    fn step(&mut self, candidate: &CandidateNode, wanted: &KeyValue) -> Result<Vec<CandidateNode>, Error> {
        let current = self.resolved(candidate);
        if self.auto_create && self.tree.get(current.node).is_null() {
            let node = match wanted {
                KeyValue::Int(_) => Node::Sequence(Vec::new()),
                _ => Node::Mapping(Vec::new()),
            };
            tracing::trace!(path = %current.nice_path(), kind = ?node.kind(), "auto-creating container");
            current.replace_with(self.tree, node)?;
        }
        match self.tree.kind(current.node) {
            NodeKind::Mapping => self.map(&current, Some(wanted)),
            NodeKind::Sequence => self.sequence(&current, std::slice::from_ref(wanted)),
            _ => Ok(Vec::new()),
        }
    }

    fn with_indices(
        &mut self,
        candidate: &CandidateNode,
        indices: &[KeyValue],
    ) -> Result<Vec<CandidateNode>, Error> {
        let current = self.resolved(candidate);
        if self.auto_create && !indices.is_empty() && self.tree.get(current.node).is_null() {
            let node = match indices[0] {
                KeyValue::Int(_) => Node::Sequence(Vec::new()),
                _ => Node::Mapping(Vec::new()),
            };
            current.replace_with(self.tree, node)?;
        }
        match self.tree.kind(current.node) {
            NodeKind::Sequence => self.sequence(&current, indices),
            NodeKind::Mapping if indices.is_empty() => self.map(&current, None),
            NodeKind::Mapping => {
                let mut results = Vec::new();
                for index in indices {
                    results.extend(self.map(&current, Some(index))?);
                }
                Ok(results)
            }
            _ => Ok(Vec::new()),
        }
    }

    /// `wanted == None` is a splat.
    fn map(&mut self, current: &CandidateNode, wanted: Option<&KeyValue>) -> Result<Vec<CandidateNode>, Error> {
        let parent = Rc::new(current.clone());
        let mut matches = MatchSet::default();
        self.scan_map(&parent, current.node, wanted, &mut matches, false, 0);

        if let Some(wanted) = wanted
            && matches.is_empty()
            && self.auto_create
        {
            let key = self.tree.alloc_scalar(wanted.to_scalar());
            let value = self.tree.alloc(Node::null());
            self.tree.push_entry(current.node, key, value);
            tracing::trace!(path = %current.nice_path(), key = %wanted, "auto-creating map entry");
            self.emit(&parent, MapEntry { key, value }, &mut matches, false);
        }
        Ok(matches.into_vec())
    }

    fn scan_map(
        &mut self,
        parent: &Rc<CandidateNode>,
        map: NodeId,
        wanted: Option<&KeyValue>,
        matches: &mut MatchSet,
        merged: bool,
        depth: usize,
    ) {
        let entries = self.tree.entries(map).map(<[MapEntry]>::to_vec).unwrap_or_default();
        for entry in entries {
            if self.tree.is_merge_key(entry.key) && !self.prefs.dont_follow_alias {
                self.scan_merge(parent, entry.value, wanted, matches, depth + 1);
            } else if wanted.is_none_or(|w| self.key_matches(entry.key, w)) {
                self.emit(parent, entry, matches, merged);
            }
        }
    }

    fn scan_merge(
        &mut self,
        parent: &Rc<CandidateNode>,
        source: NodeId,
        wanted: Option<&KeyValue>,
        matches: &mut MatchSet,
        depth: usize,
    ) {
        if depth > MAX_MERGE_DEPTH {
            tracing::warn!(path = %parent.nice_path(), "merge nesting too deep, ignoring");
            return;
        }
        let source = self.tree.resolve(source);
        match self.tree.kind(source) {
            NodeKind::Mapping => self.scan_map(parent, source, wanted, matches, true, depth),
            NodeKind::Sequence => {
                let items = self.tree.items(source).unwrap_or_default().to_vec();
                for item in items {
                    self.scan_merge(parent, item, wanted, matches, depth + 1);
                }
            }
            _ => {}
        }
    }

    fn key_matches(&mut self, key: NodeId, wanted: &KeyValue) -> bool {
        match KeyValue::of(self.tree, key) {
            Some(actual) => self.keys.matches(&actual, wanted),
            None => false,
        }
    }

    fn emit(&mut self, parent: &Rc<CandidateNode>, entry: MapEntry, matches: &mut MatchSet, merged: bool) {
        let segment = match self.tree.scalar(self.tree.resolve(entry.key)) {
            Some(scalar) => PathSegment::key(scalar),
            None => PathSegment::name(&self.tree.render(entry.key)),
        };
        if self.prefs.include_map_keys {
            let mut key = parent.create_map_child(entry.key, segment.clone(), entry.key);
            key.is_map_key = true;
            matches.insert(key, merged);
        }
        if !self.prefs.dont_include_map_values {
            matches.insert(parent.create_map_child(entry.key, segment, entry.value), merged);
        }
    }

    fn sequence(&mut self, current: &CandidateNode, indices: &[KeyValue]) -> Result<Vec<CandidateNode>, Error> {
        let parent = Rc::new(current.clone());
        let seq = current.node;
        if indices.is_empty() {
            let items = self.tree.items(seq).unwrap_or_default().to_vec();
            return Ok(items
                .into_iter()
                .enumerate()
                .map(|(i, item)| parent.create_array_child(i, item))
                .collect());
        }

        let mut results = Vec::with_capacity(indices.len());
        for index in indices {
            let KeyValue::Int(index) = *index else {
                if self.prefs.optional {
                    continue;
                }
                return Err(Error::structural(format!("cannot index array with '{index}'")));
            };
            let mut len = self.tree.items(seq).map_or(0, <[NodeId]>::len);
            if index >= len as i64 {
                if !self.auto_create {
                    continue;
                }
                while len as i64 <= index {
                    let hole = self.tree.alloc(Node::null());
                    self.tree.push_item(seq, hole);
                    len += 1;
                }
            }
            let resolved = if index < 0 { len as i64 + index } else { index };
            if resolved < 0 {
                if self.prefs.optional {
                    continue;
                }
                return Err(Error::index_range(format!(
                    "index [{index}] out of range, array size is {len}"
                )));
            }
            let resolved = resolved as usize;
            if let Some(item) = self.tree.items(seq).and_then(|items| items.get(resolved)).copied() {
                results.push(parent.create_array_child(resolved, item));
            }
        }
        Ok(results)
    }

    fn descend(&mut self, candidate: &CandidateNode, out: &mut Vec<CandidateNode>) -> Result<(), Error> {
        out.push(candidate.clone());
        if candidate.is_map_key {
            return Ok(());
        }
        let target = self.tree.unwrap_document(candidate.node);
        if !matches!(self.tree.kind(target), NodeKind::Mapping | NodeKind::Sequence) {
            return Ok(());
        }
        let children = self.with_indices(candidate, &[])?;
        for child in &children {
            self.descend(child, out)?;
        }
        Ok(())
    }
}
