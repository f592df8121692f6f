use crate::engine::runtime::Error;
use crate::model::{Node, NodeId, NodeTree, Scalar, ScalarTag};
use compact_str::CompactString;
use core::fmt;
use smallvec::SmallVec;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Map key. The tag keeps `1` and `"1"` apart.
    Key { text: CompactString, tag: ScalarTag },
    Index(usize),
}

impl PathSegment {
    pub fn key(scalar: &Scalar) -> Self {
        PathSegment::Key { text: CompactString::from(scalar.value.as_str()), tag: scalar.tag }
    }

    /// String key.
    pub fn name(text: &str) -> Self {
        PathSegment::Key { text: CompactString::from(text), tag: ScalarTag::Str }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key { text, .. } => f.write_str(text),
            PathSegment::Index(i) => write!(f, "{i}"),
        }
    }
}

pub type Path = SmallVec<[PathSegment; 8]>;

/// A position inside one document: the node plus how it was reached.
#[derive(Debug, Clone)]
pub struct CandidateNode {
    pub node: NodeId,
    /// Enclosing candidate. Only consulted by `parent`; never used to walk
    /// the tree.
    pub parent: Option<Rc<CandidateNode>>,
    /// Key node of the entry this candidate occupies in its parent mapping.
    pub key: Option<NodeId>,
    /// Position inside the parent sequence.
    pub index: Option<usize>,
    pub path: Path,
    pub document: usize,
    pub file_index: usize,
    pub filename: Option<Rc<str>>,
    /// Treat the whole context as one unit for this candidate. Not inherited
    /// by children.
    pub evaluate_together: bool,
    pub is_map_key: bool,
}

impl CandidateNode {
    pub fn root(node: NodeId, document: usize, file_index: usize) -> Self {
        Self {
            node,
            parent: None,
            key: None,
            index: None,
            path: Path::new(),
            document,
            file_index,
            filename: None,
            evaluate_together: false,
            is_map_key: false,
        }
    }

    #[must_use]
    pub fn with_filename(mut self, filename: Rc<str>) -> Self {
        self.filename = Some(filename);
        self
    }

    /// New value with this candidate's provenance but no position.
    pub fn detached(&self, node: NodeId) -> Self {
        Self {
            filename: self.filename.clone(),
            ..Self::root(node, self.document, self.file_index)
        }
    }

    pub fn create_map_child(self: &Rc<Self>, key: NodeId, segment: PathSegment, value: NodeId) -> Self {
        Self {
            node: value,
            parent: Some(Rc::clone(self)),
            key: Some(key),
            index: None,
            path: self.child_path(segment),
            document: self.document,
            file_index: self.file_index,
            filename: self.filename.clone(),
            evaluate_together: false,
            is_map_key: false,
        }
    }

    pub fn create_array_child(self: &Rc<Self>, index: usize, value: NodeId) -> Self {
        Self {
            node: value,
            parent: Some(Rc::clone(self)),
            key: None,
            index: Some(index),
            path: self.child_path(PathSegment::Index(index)),
            document: self.document,
            file_index: self.file_index,
            filename: self.filename.clone(),
            evaluate_together: false,
            is_map_key: false,
        }
    }

    /// Same position, different value. Does not touch the tree.
    pub fn create_replacement(&self, value: NodeId) -> Self {
        Self {
            node: value,
            parent: self.parent.clone(),
            key: self.key,
            index: self.index,
            path: self.path.clone(),
            document: self.document,
            file_index: self.file_index,
            filename: self.filename.clone(),
            evaluate_together: false,
            is_map_key: false,
        }
    }

    // Always a fresh copy: siblings share the parent's path.
    fn child_path(&self, segment: PathSegment) -> Path {
        let mut path = Path::with_capacity(self.path.len() + 1);
        path.extend(self.path.iter().cloned());
        path.push(segment);
        path
    }

    /// Identity used to deduplicate matches; keys and values of the same entry
    /// stay distinct.
    pub fn identity(&self) -> String {
        let prefix = if self.is_map_key { "key-" } else { "" };
        format!("{prefix}{} - {:?}", self.document, self.path)
    }

    /// Human readable path such as `a.b[0]`.
    pub fn nice_path(&self) -> String {
        let mut out = String::new();
        for segment in &self.path {
            match segment {
                PathSegment::Index(i) => out.push_str(&format!("[{i}]")),
                PathSegment::Key { text, .. } => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(text);
                }
            }
        }
        out
    }

    /// Overwrite the referenced slot in the shared tree. A document root
    /// keeps its wrapper; its body is replaced.
    pub fn replace_with(&self, tree: &mut NodeTree, node: Node) -> Result<(), Error> {
        if self.is_map_key {
            return Err(Error::unsupported_mutation(format!(
                "cannot replace map key at [{}]",
                self.nice_path()
            )));
        }
        tree.replace(tree.unwrap_document(self.node), node);
        Ok(())
    }

    /// Overwrite the referenced slot with a copy of `source`.
    pub fn update_from(&self, tree: &mut NodeTree, source: NodeId) -> Result<(), Error> {
        let source = tree.unwrap_document(source);
        let node = tree.copy_node(source);
        self.replace_with(tree, node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::runtime::ErrorCode;
    use crate::model::NodeKind;

    fn document(tree: &mut NodeTree) -> Rc<CandidateNode> {
        let body = tree.alloc(Node::Sequence(Vec::new()));
        Rc::new(CandidateNode::root(tree.alloc(Node::Document(body)), 0, 0))
    }

    #[test]
    fn nice_path_joins_keys_and_indices() {
        let mut tree = NodeTree::new();
        let root = document(&mut tree);
        let key = tree.alloc_scalar(Scalar::string("a"));
        let a = Rc::new(root.create_map_child(key, PathSegment::name("a"), key));
        let item = a.create_array_child(2, key);
        assert_eq!(item.nice_path(), "a[2]");
        assert_eq!(item.index, Some(2));
        assert!(Rc::ptr_eq(item.parent.as_ref().unwrap(), &a));
    }

    #[test]
    fn keys_and_values_have_distinct_identities() {
        let mut tree = NodeTree::new();
        let root = document(&mut tree);
        let key = tree.alloc_scalar(Scalar::string("a"));
        let value = root.create_map_child(key, PathSegment::name("a"), key);
        let mut map_key = value.clone();
        map_key.is_map_key = true;
        assert_ne!(value.identity(), map_key.identity());
    }

    #[test]
    fn int_and_string_keys_have_distinct_identities() {
        let mut tree = NodeTree::new();
        let root = document(&mut tree);
        let int_key = tree.alloc_scalar(Scalar::int(1));
        let str_key = tree.alloc_scalar(Scalar::string("1"));
        let by_int = root.create_map_child(int_key, PathSegment::key(&Scalar::int(1)), int_key);
        let by_str = root.create_map_child(str_key, PathSegment::key(&Scalar::string("1")), str_key);
        assert_ne!(by_int.identity(), by_str.identity());
        assert_eq!(by_int.nice_path(), by_str.nice_path());
    }

    #[test]
    fn map_keys_cannot_be_replaced() {
        let mut tree = NodeTree::new();
        let key = tree.alloc_scalar(Scalar::string("a"));
        let mut candidate = CandidateNode::root(key, 0, 0);
        candidate.is_map_key = true;
        let err = candidate.replace_with(&mut tree, Node::null()).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedMutation);
    }

    #[test]
    fn replacing_a_document_root_keeps_the_wrapper() {
        let mut tree = NodeTree::new();
        let root = document(&mut tree);
        root.replace_with(&mut tree, Node::Scalar(Scalar::int(1))).unwrap();
        assert_eq!(tree.kind(root.node), NodeKind::Document);
        assert_eq!(tree.render(root.node), "1");
    }
}
