use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::str::Chars;

use yaml_rust2::parser::{Event, EventReceiver, Parser};
use yaml_rust2::scanner::{Scanner, TScalarStyle, Token, TokenType};

use super::{DocumentDecoder, ParsedDocument};
use crate::engine::context::Context;
use crate::engine::runtime::Error;
use crate::model::{MapEntry, Node, NodeId, NodeTree, Scalar};
use crate::stream::ResultSink;

const MERGE_KEY: &str = "<<";
const MAX_ENCODE_DEPTH: usize = 256;

/// Multi-document YAML decoder over the `yaml-rust2` event parser.
///
/// An anchored node is decoded once; every `*alias` to it becomes a
/// [`Node::Alias`] pointing at that slot, so edits through the anchor are seen
/// through its aliases and merge users. Plain `<<` keys are tagged as merge
/// keys. Documents are parsed one at a time as the iterator advances.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlDecoder;

impl DocumentDecoder for YamlDecoder {
    fn decode<'a>(
        &'a self,
        content: &'a [u8],
    ) -> Box<dyn Iterator<Item = Result<ParsedDocument, Error>> + 'a> {
        match std::str::from_utf8(content) {
            Ok(text) => Box::new(Documents::new(text)),
            Err(e) => Box::new(std::iter::once(Err(
                Error::parse(format!("input is not valid UTF-8: {e}")).with_source(e),
            ))),
        }
    }
}

struct Documents<'a> {
    parser: Parser<Chars<'a>>,
    names: AnchorNames<'a>,
    done: bool,
}

impl<'a> Documents<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            parser: Parser::new(text.chars()),
            names: AnchorNames { tokens: Scanner::new(text.chars()), names: Vec::new() },
            done: false,
        }
    }
}

impl Iterator for Documents<'_> {
    type Item = Result<ParsedDocument, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut builder = DocumentBuilder::default();
        let parsed = match self.parser.load(&mut builder, false) {
            Ok(()) => builder.finish(&mut self.names),
            Err(e) => Some(Err(Error::from(e))),
        };
        self.done = !matches!(parsed, Some(Ok(_)));
        parsed
    }
}

/// Anchor names in stream order. The parser numbers anchors from 1 in the
/// order their `&name` tokens appear; only the numbers reach the events.
struct AnchorNames<'a> {
    tokens: Scanner<Chars<'a>>,
    names: Vec<String>,
}

impl AnchorNames<'_> {
    fn name(&mut self, anchor: usize) -> String {
        while self.names.len() < anchor {
            match self.tokens.next() {
                Some(Token(_, TokenType::Anchor(name))) => self.names.push(name),
                Some(_) => {}
                None => break,
            }
        }
        anchor
            .checked_sub(1)
            .and_then(|i| self.names.get(i))
            .cloned()
            .unwrap_or_else(|| format!("anchor{anchor}"))
    }
}

enum Frame {
    Sequence { anchor: usize, items: Vec<NodeId> },
    Mapping { anchor: usize, entries: Vec<MapEntry>, key: Option<NodeId> },
}

/// Builds one document's arena from parser events.
#[derive(Default)]
struct DocumentBuilder {
    tree: NodeTree,
    stack: Vec<Frame>,
    /// Completed anchored nodes by parser anchor id.
    anchors: HashMap<usize, NodeId>,
    named: Vec<(NodeId, usize)>,
    body: Option<NodeId>,
    started: bool,
    error: Option<String>,
}

impl EventReceiver for DocumentBuilder {
    fn on_event(&mut self, event: Event) {
        if self.error.is_some() {
            return;
        }
        match event {
            Event::DocumentStart { .. } => self.started = true,
            Event::Alias(anchor) => match self.anchors.get(&anchor) {
                Some(target) => {
                    let alias = self.tree.alloc(Node::Alias(*target));
                    self.complete(alias);
                }
                // also covers an alias inside its own anchored node
                None => {
                    self.error = Some(String::from(
                        "failed to decode: alias refers to an anchor that is not complete",
                    ));
                }
            },
            Event::Scalar(text, style, anchor, ..) => {
                let scalar = if !matches!(style, TScalarStyle::Plain) {
                    Scalar::string(text)
                } else if text == MERGE_KEY && self.expecting_key() {
                    Scalar::merge()
                } else {
                    Scalar::resolve(&text)
                };
                let id = self.tree.alloc_scalar(scalar);
                self.finish_node(id, anchor);
            }
            Event::SequenceStart(anchor, ..) => {
                self.stack.push(Frame::Sequence { anchor, items: Vec::new() });
            }
            Event::MappingStart(anchor, ..) => {
                self.stack.push(Frame::Mapping { anchor, entries: Vec::new(), key: None });
            }
            Event::SequenceEnd | Event::MappingEnd => {
                let (node, anchor) = match self.stack.pop() {
                    Some(Frame::Sequence { anchor, items }) => (Node::Sequence(items), anchor),
                    Some(Frame::Mapping { anchor, entries, .. }) => (Node::Mapping(entries), anchor),
                    None => return,
                };
                let id = self.tree.alloc(node);
                self.finish_node(id, anchor);
            }
            _ => {}
        }
    }
}

impl DocumentBuilder {
    fn expecting_key(&self) -> bool {
        matches!(self.stack.last(), Some(Frame::Mapping { key: None, .. }))
    }

    fn finish_node(&mut self, id: NodeId, anchor: usize) {
        if anchor > 0 {
            self.anchors.insert(anchor, id);
            self.named.push((id, anchor));
        }
        self.complete(id);
    }

    fn complete(&mut self, id: NodeId) {
        match self.stack.last_mut() {
            None => self.body = Some(id),
            Some(Frame::Sequence { items, .. }) => items.push(id),
            Some(Frame::Mapping { entries, key, .. }) => match key.take() {
                Some(k) => entries.push(MapEntry { key: k, value: id }),
                None => *key = Some(id),
            },
        }
    }

    /// `None` once the stream has no further document.
    fn finish(self, names: &mut AnchorNames<'_>) -> Option<Result<ParsedDocument, Error>> {
        if let Some(message) = self.error {
            return Some(Err(Error::parse(message)));
        }
        if !self.started {
            return None;
        }
        let mut tree = self.tree;
        let body = match self.body {
            Some(body) => body,
            None => tree.alloc(Node::null()),
        };
        for (id, anchor) in self.named {
            tree.set_anchor(id, names.name(anchor));
        }
        let root = tree.alloc(Node::Document(body));
        Some(Ok(ParsedDocument { tree, root }))
    }
}

/// Render the subtree at `id` as block-style YAML text.
///
/// An alias target reached more than once is written with its `&anchor` the
/// first time and as `*anchor` afterwards. A target reached only through a
/// single alias is expanded in place.
pub fn to_yaml_string(tree: &NodeTree, id: NodeId) -> Result<String, Error> {
    let root = tree.unwrap_document(id);
    let mut emitter = Emitter {
        tree,
        out: String::new(),
        targets: alias_targets(tree, root),
        written: HashMap::new(),
        names: HashSet::new(),
    };
    emitter.node(root, Slot::Top, 0, 0)?;
    Ok(emitter.out)
}

/// Alias targets reached more than once from `root`, directly or through
/// aliases. Only these need an anchor on output.
fn alias_targets(tree: &NodeTree, root: NodeId) -> HashSet<NodeId> {
    let mut arrivals: HashMap<NodeId, usize> = HashMap::new();
    let mut aliased = HashSet::new();
    let mut pending = vec![root];
    while let Some(id) = pending.pop() {
        let seen = arrivals.entry(id).or_default();
        *seen += 1;
        if *seen > 1 {
            continue;
        }
        match tree.get(id) {
            Node::Mapping(entries) => pending.extend(entries.iter().flat_map(|e| [e.key, e.value])),
            Node::Sequence(items) => pending.extend(items.iter().copied()),
            Node::Alias(target) => {
                let target = tree.resolve(*target);
                aliased.insert(target);
                pending.push(target);
            }
            Node::Document(body) => pending.push(*body),
            Node::Scalar(_) => {}
        }
    }
    aliased.retain(|id| arrivals.get(id).is_some_and(|n| *n > 1));
    aliased
}

/// Where the next node is written.
#[derive(Debug, Clone, Copy)]
enum Slot {
    Top,
    /// After `key:` of an entry at the given indent.
    Value,
    /// After `- `, `? ` or `: ` at the given indent.
    Item,
}

struct Emitter<'t> {
    tree: &'t NodeTree,
    out: String,
    targets: HashSet<NodeId>,
    written: HashMap<NodeId, String>,
    names: HashSet<String>,
}

impl Emitter<'_> {
    fn node(&mut self, id: NodeId, slot: Slot, indent: usize, depth: usize) -> Result<(), Error> {
        if depth > MAX_ENCODE_DEPTH {
            return Err(Error::structural(format!(
                "node {id} is nested deeper than {MAX_ENCODE_DEPTH} levels"
            )));
        }
        let tree = self.tree;
        let id = tree.unwrap_document(id);
        if let Node::Alias(target) = tree.get(id) {
            let target = tree.resolve(*target);
            if let Some(name) = self.written.get(&target) {
                let text = format!("*{name}");
                self.inline(slot, &text);
                return Ok(());
            }
            return self.node(target, slot, indent, depth + 1);
        }

        let anchor = self.anchor_for(id);
        match tree.get(id) {
            Node::Scalar(s) => self.inline(slot, &with_anchor(anchor, &s.to_yaml_text())),
            Node::Mapping(entries) if entries.is_empty() => self.inline(slot, &with_anchor(anchor, "{}")),
            Node::Sequence(items) if items.is_empty() => self.inline(slot, &with_anchor(anchor, "[]")),
            Node::Mapping(entries) => {
                let inner = match slot {
                    Slot::Top => 0,
                    Slot::Value | Slot::Item => indent + 2,
                };
                let mut same_line = self.open(slot, anchor);
                for entry in entries {
                    if !same_line {
                        self.pad(inner);
                    }
                    same_line = false;
                    self.entry(*entry, inner, depth + 1)?;
                }
            }
            Node::Sequence(items) => {
                // block sequences under a key are not indented
                let inner = match slot {
                    Slot::Top => 0,
                    Slot::Value => indent,
                    Slot::Item => indent + 2,
                };
                let mut same_line = self.open(slot, anchor);
                for item in items {
                    if !same_line {
                        self.pad(inner);
                    }
                    same_line = false;
                    self.out.push_str("- ");
                    self.node(*item, Slot::Item, inner, depth + 1)?;
                }
            }
            Node::Alias(_) | Node::Document(_) => {
                return Err(Error::structural(format!("alias cycle through node {id}")));
            }
        }
        Ok(())
    }

    fn entry(&mut self, entry: MapEntry, indent: usize, depth: usize) -> Result<(), Error> {
        let tree = self.tree;
        if let Node::Scalar(key) = tree.get(tree.resolve(entry.key)) {
            self.out.push_str(&key.to_yaml_text());
            self.out.push(':');
            return self.node(entry.value, Slot::Value, indent, depth);
        }
        self.out.push_str("? ");
        self.node(entry.key, Slot::Item, indent, depth)?;
        self.pad(indent);
        self.out.push_str(": ");
        self.node(entry.value, Slot::Item, indent, depth)
    }

    /// Starts a non-empty collection. Returns true when its first line
    /// continues the current one.
    fn open(&mut self, slot: Slot, anchor: Option<String>) -> bool {
        match (slot, anchor) {
            (Slot::Value, anchor) => {
                if let Some(anchor) = anchor {
                    self.out.push(' ');
                    self.out.push_str(&anchor);
                }
                self.out.push('\n');
                false
            }
            (Slot::Top | Slot::Item, Some(anchor)) => {
                self.out.push_str(&anchor);
                self.out.push('\n');
                false
            }
            (Slot::Item, None) => true,
            (Slot::Top, None) => false,
        }
    }

    fn inline(&mut self, slot: Slot, text: &str) {
        if matches!(slot, Slot::Value) {
            self.out.push(' ');
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn pad(&mut self, indent: usize) {
        self.out.extend(std::iter::repeat_n(' ', indent));
    }

    /// `&name` the first time an alias target is written.
    fn anchor_for(&mut self, id: NodeId) -> Option<String> {
        if !self.targets.contains(&id) || self.written.contains_key(&id) {
            return None;
        }
        let base = self.tree.anchor(id).map_or_else(|| format!("anchor{}", id.index()), String::from);
        let mut name = base.clone();
        let mut suffix = 1;
        while self.names.contains(&name) {
            suffix += 1;
            name = format!("{base}{suffix}");
        }
        self.names.insert(name.clone());
        let props = format!("&{name}");
        self.written.insert(id, name);
        Some(props)
    }
}

fn with_anchor(anchor: Option<String>, text: &str) -> String {
    match anchor {
        Some(anchor) => format!("{anchor} {text}"),
        None => text.to_string(),
    }
}

/// Result sink printing every result as YAML. A `---` line separates
/// results that come from different documents.
#[derive(Debug)]
pub struct YamlPrinter<W: Write> {
    writer: W,
    separators: bool,
    last_document: Option<(usize, usize)>,
}

impl<W: Write> YamlPrinter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, separators: true, last_document: None }
    }

    #[must_use]
    pub fn with_document_separators(mut self, enabled: bool) -> Self {
        self.separators = enabled;
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ResultSink for YamlPrinter<W> {
    fn accept(&mut self, tree: &NodeTree, results: &Context) -> Result<(), Error> {
        for candidate in results {
            let origin = (candidate.file_index, candidate.document);
            if self.separators && self.last_document.is_some_and(|last| last != origin) {
                self.writer.write_all(b"---\n")?;
            }
            self.last_document = Some(origin);
            let text = to_yaml_string(tree, candidate.node)?;
            self.writer.write_all(text.as_bytes())?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::candidate::CandidateNode;
    use crate::engine::runtime::ErrorCode;
    use crate::model::{NodeKind, ScalarTag};

    fn decode_all(text: &str) -> Vec<Result<ParsedDocument, Error>> {
        YamlDecoder.decode(text.as_bytes()).collect()
    }

    fn decode(text: &str) -> ParsedDocument {
        decode_all(text).remove(0).unwrap()
    }

    #[test]
    fn decodes_every_document_in_order() {
        let docs = decode_all("a: 1\n---\na: 2\n");
        assert_eq!(docs.len(), 2);
        let rendered: Vec<String> = docs
            .iter()
            .map(|d| {
                let d = d.as_ref().unwrap();
                d.tree.render(d.root)
            })
            .collect();
        assert_eq!(rendered, ["{a: 1}", "{a: 2}"]);
    }

    #[test]
    fn blank_input_has_no_documents() {
        assert!(decode_all("").is_empty());
        assert!(decode_all("  \n\n").is_empty());
        assert!(decode_all("# only a comment\n").is_empty());
    }

    #[test]
    fn resolves_scalar_tags() {
        let doc = decode("[~, true, 3, 1.5, x, 2001-12-15, '7']");
        let body = doc.tree.unwrap_document(doc.root);
        let tags: Vec<ScalarTag> = doc
            .tree
            .items(body)
            .unwrap()
            .iter()
            .map(|i| doc.tree.scalar(*i).unwrap().tag)
            .collect();
        assert_eq!(
            tags,
            [
                ScalarTag::Null,
                ScalarTag::Bool,
                ScalarTag::Int,
                ScalarTag::Float,
                ScalarTag::Str,
                ScalarTag::Timestamp,
                ScalarTag::Str,
            ]
        );
    }

    #[test]
    fn aliases_point_at_their_anchor() {
        let doc = decode("base: &b {a: 2}\nref: *b\n");
        let body = doc.tree.unwrap_document(doc.root);
        let entries = doc.tree.entries(body).unwrap();
        let (base, reference) = (entries[0].value, entries[1].value);
        assert_eq!(doc.tree.get(reference), &Node::Alias(base));
        assert_eq!(doc.tree.anchor(base), Some("b"));
    }

    #[test]
    fn merge_keys_are_tagged_and_keep_their_alias() {
        let doc = decode("base: &b {a: 2}\nchild:\n  <<: *b\n  a: 1\n");
        let body = doc.tree.unwrap_document(doc.root);
        let base = doc.tree.entries(body).unwrap()[0].value;
        let child = doc.tree.entries(body).unwrap()[1].value;
        let entries = doc.tree.entries(child).unwrap();
        assert!(doc.tree.is_merge_key(entries[0].key));
        assert_eq!(doc.tree.get(entries[0].value), &Node::Alias(base));
        assert!(!doc.tree.is_merge_key(entries[1].key));
    }

    #[test]
    fn quoted_merge_key_is_a_plain_string() {
        let doc = decode("'<<': 1\n");
        let body = doc.tree.unwrap_document(doc.root);
        let key = doc.tree.entries(body).unwrap()[0].key;
        assert_eq!(doc.tree.scalar(key).map(|s| s.tag), Some(ScalarTag::Str));
    }

    #[test]
    fn anchor_names_follow_each_document() {
        let docs = decode_all("a: &x 1\n---\nb: &y 2\nc: *y\n");
        let second = docs[1].as_ref().unwrap();
        let body = second.tree.unwrap_document(second.root);
        let b = second.tree.entries(body).unwrap()[0].value;
        assert_eq!(second.tree.anchor(b), Some("y"));
    }

    #[test]
    fn self_referencing_alias_is_rejected() {
        let docs = decode_all("a: &x [*x]\n");
        assert_eq!(docs[0].as_ref().unwrap_err().code, ErrorCode::ParseDelegation);
    }

    #[test]
    fn malformed_input_stops_with_a_parse_error() {
        let docs = decode_all("a: [1, 2\n");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].as_ref().unwrap_err().code, ErrorCode::ParseDelegation);
    }

    #[test]
    fn encodes_through_document_wrappers() {
        let doc = decode("a: {b: [1, two]}\n");
        assert_eq!(to_yaml_string(&doc.tree, doc.root).unwrap(), "a:\n  b:\n  - 1\n  - two\n");
    }

    #[test]
    fn encodes_nested_block_collections() {
        let doc = decode("- a: 1\n  b: [x, []]\n- - 1\n  - {}\n");
        assert_eq!(
            to_yaml_string(&doc.tree, doc.root).unwrap(),
            "- a: 1\n  b:\n  - x\n  - []\n- - 1\n  - {}\n"
        );
    }

    #[test]
    fn encodes_anchors_and_aliases() {
        let text = "base: &b\n  a: 1\nref: *b\nchild:\n  <<: *b\n  c: 2\nlist:\n- &s x\n- *s\n";
        let doc = decode(text);
        assert_eq!(to_yaml_string(&doc.tree, doc.root).unwrap(), text);
    }

    #[test]
    fn alias_without_its_anchor_is_expanded() {
        let doc = decode("base: &b {a: 1}\nref: *b\n");
        let body = doc.tree.unwrap_document(doc.root);
        let reference = doc.tree.entries(body).unwrap()[1].value;
        assert_eq!(to_yaml_string(&doc.tree, reference).unwrap(), "a: 1\n");
    }

    #[test]
    fn ambiguous_strings_are_quoted_on_output() {
        let doc = decode("a: '1'\nb: 'x: y'\n'2': c\n");
        assert_eq!(to_yaml_string(&doc.tree, doc.root).unwrap(), "a: '1'\nb: 'x: y'\n'2': c\n");
    }

    #[test]
    fn printer_separates_documents() {
        let mut tree = NodeTree::new();
        let one = tree.alloc_scalar(Scalar::int(1));
        let two = tree.alloc_scalar(Scalar::int(2));
        let three = tree.alloc_scalar(Scalar::int(3));
        let results = Context::new(vec![
            CandidateNode::root(one, 0, 0),
            CandidateNode::root(two, 0, 0),
            CandidateNode::root(three, 1, 0),
        ]);

        let mut printer = YamlPrinter::new(Vec::new());
        printer.accept(&tree, &results).unwrap();
        assert_eq!(String::from_utf8(printer.into_inner()).unwrap(), "1\n2\n---\n3\n");

        let mut bare = YamlPrinter::new(Vec::new()).with_document_separators(false);
        bare.accept(&tree, &results).unwrap();
        assert_eq!(String::from_utf8(bare.into_inner()).unwrap(), "1\n2\n3\n");
    }

    #[test]
    fn kinds_survive_a_round_trip() {
        let doc = decode("a: [1, {b: c}]\n");
        let text = to_yaml_string(&doc.tree, doc.root).unwrap();
        let again = decode(&text);
        let body = again.tree.unwrap_document(again.root);
        let a = again.tree.entries(body).unwrap()[0].value;
        assert_eq!(again.tree.kind(a), NodeKind::Sequence);
    }
}
