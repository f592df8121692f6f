//! Evaluators that drive an expression over input sources.
//!
//! [`StreamEvaluator`] decodes and evaluates one document at a time and
//! hands each document's results to a [`ResultSink`] before the next
//! document is decoded. [`AllAtOnceEvaluator`] loads every document into
//! one tree first so an expression can see all of them together.

use std::path::Path;
use std::rc::Rc;

use tracing::debug;

use crate::codec::{DocumentDecoder, ParsedDocument, YamlDecoder};
use crate::compiler::ir::ExpressionNode;
use crate::engine::candidate::CandidateNode;
use crate::engine::config::EngineConfig;
use crate::engine::context::Context;
use crate::engine::navigator::Navigator;
use crate::engine::runtime::Error;
use crate::model::{Node, NodeId, NodeTree};

/// Raw input: bytes plus an optional display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub name: Option<String>,
    pub content: Vec<u8>,
}

impl Source {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self { name: Some(name.into()), content: content.into() }
    }

    pub fn anonymous(content: impl Into<Vec<u8>>) -> Self {
        Self { name: None, content: content.into() }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let content = std::fs::read(path).map_err(|e| {
            Error::from(e).with_context(format!("cannot read {}", path.display()))
        })?;
        Ok(Self::new(path.display().to_string(), content))
    }
}

/// Receives the results of one evaluation, in order.
pub trait ResultSink {
    fn accept(&mut self, tree: &NodeTree, results: &Context) -> Result<(), Error>;
}

impl<F> ResultSink for F
where
    F: FnMut(&NodeTree, &Context) -> Result<(), Error>,
{
    fn accept(&mut self, tree: &NodeTree, results: &Context) -> Result<(), Error> {
        self(tree, results)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    NotStarted,
    PerDocument { file_index: usize, document: usize },
    Drained,
}

/// Evaluates an expression against every document of every source, one
/// document at a time.
///
/// Each document gets its own tree and a root context of one candidate.
/// The first error aborts the run; results already handed to the sink
/// stay delivered. When no source produced a document the expression runs
/// once against a null document.
pub struct StreamEvaluator<D: DocumentDecoder = YamlDecoder> {
    navigator: Navigator,
    decoder: D,
    state: StreamState,
}

impl StreamEvaluator<YamlDecoder> {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_decoder(config, YamlDecoder)
    }
}

impl<D: DocumentDecoder> StreamEvaluator<D> {
    pub fn with_decoder(config: EngineConfig, decoder: D) -> Self {
        Self { navigator: Navigator::new(config), decoder, state: StreamState::NotStarted }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Run `expr` over `sources` in order. Returns the number of documents
    /// evaluated; `0` means the null document was used.
    pub fn evaluate_sources<I>(
        &mut self,
        expr: &ExpressionNode,
        sources: I,
        sink: &mut dyn ResultSink,
    ) -> Result<usize, Error>
    where
        I: IntoIterator<Item = Result<Source, Error>>,
    {
        self.state = StreamState::NotStarted;
        let auto_create = self.navigator.config().auto_create;
        let mut total = 0;
        for (file_index, source) in sources.into_iter().enumerate() {
            let source = source?;
            let filename: Option<Rc<str>> = source.name.as_deref().map(Rc::from);
            for (document, parsed) in self.decoder.decode(&source.content).enumerate() {
                let ParsedDocument { mut tree, root } = parsed.map_err(|e| match &filename {
                    Some(name) => e.with_context(format!("in {name}")),
                    None => e,
                })?;
                self.state = StreamState::PerDocument { file_index, document };
                let candidate = root_candidate(root, document, file_index, filename.as_ref());
                let ctx = Context::new(vec![candidate]).with_auto_create(auto_create);
                let results = self.navigator.evaluate(&mut tree, &ctx, expr)?;
                debug!(file_index, document, results = results.len(), "document evaluated");
                sink.accept(&tree, &results)?;
                total += 1;
            }
        }
        if total == 0 {
            debug!("no input documents, evaluating the null document");
            self.evaluate_null_document(expr, sink)?;
        }
        self.state = StreamState::Drained;
        Ok(total)
    }

    /// Run `expr` once against a document holding a single null.
    pub fn evaluate_null_document(
        &mut self,
        expr: &ExpressionNode,
        sink: &mut dyn ResultSink,
    ) -> Result<(), Error> {
        let mut tree = NodeTree::new();
        let root = null_document(&mut tree);
        self.state = StreamState::PerDocument { file_index: 0, document: 0 };
        let ctx = Context::new(vec![CandidateNode::root(root, 0, 0)])
            .with_auto_create(self.navigator.config().auto_create);
        let results = self.navigator.evaluate(&mut tree, &ctx, expr)?;
        sink.accept(&tree, &results)
    }
}

/// Loads every document of every source into one tree, then evaluates the
/// expression once over a context holding all document roots.
pub struct AllAtOnceEvaluator<D: DocumentDecoder = YamlDecoder> {
    navigator: Navigator,
    decoder: D,
}

impl AllAtOnceEvaluator<YamlDecoder> {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_decoder(config, YamlDecoder)
    }
}

impl<D: DocumentDecoder> AllAtOnceEvaluator<D> {
    pub fn with_decoder(config: EngineConfig, decoder: D) -> Self {
        Self { navigator: Navigator::new(config), decoder }
    }

    /// Returns the number of documents loaded; `0` means the null document
    /// was used.
    pub fn evaluate_sources<I>(
        &mut self,
        expr: &ExpressionNode,
        sources: I,
        sink: &mut dyn ResultSink,
    ) -> Result<usize, Error>
    where
        I: IntoIterator<Item = Result<Source, Error>>,
    {
        let mut tree = NodeTree::new();
        let mut roots = Vec::new();
        for (file_index, source) in sources.into_iter().enumerate() {
            let source = source?;
            let filename: Option<Rc<str>> = source.name.as_deref().map(Rc::from);
            for (document, parsed) in self.decoder.decode(&source.content).enumerate() {
                let parsed = parsed?;
                let root = tree.graft(&parsed.tree, parsed.root);
                roots.push(root_candidate(root, document, file_index, filename.as_ref()));
            }
        }
        let total = roots.len();
        debug!(documents = total, nodes = tree.len(), "loaded all documents");
        if roots.is_empty() {
            roots.push(CandidateNode::root(null_document(&mut tree), 0, 0));
        }
        for root in &mut roots {
            root.evaluate_together = true;
        }
        let ctx = Context::new(roots).with_auto_create(self.navigator.config().auto_create);
        let results = self.navigator.evaluate(&mut tree, &ctx, expr)?;
        sink.accept(&tree, &results)?;
        Ok(total)
    }
}

fn root_candidate(
    root: NodeId,
    document: usize,
    file_index: usize,
    filename: Option<&Rc<str>>,
) -> CandidateNode {
    let candidate = CandidateNode::root(root, document, file_index);
    match filename {
        Some(name) => candidate.with_filename(Rc::clone(name)),
        None => candidate,
    }
}

fn null_document(tree: &mut NodeTree) -> NodeId {
    let body = tree.alloc(Node::null());
    tree.alloc(Node::Document(body))
}
