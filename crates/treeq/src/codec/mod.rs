//! Document decoding and encoding.
//!
//! A decoder turns the bytes of one source into an ordered stream of
//! documents, each owning its own [`NodeTree`]. The stream is lazy so an
//! evaluator only keeps one document alive at a time.

use crate::engine::runtime::Error;
use crate::model::{NodeId, NodeTree};

pub mod yaml;

pub use yaml::{YamlDecoder, YamlPrinter, to_yaml_string};

/// One decoded document. `root` is the [`crate::model::Node::Document`] node.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub tree: NodeTree,
    pub root: NodeId,
}

pub trait DocumentDecoder {
    /// Decode `content` into its documents, in source order.
    fn decode<'a>(
        &'a self,
        content: &'a [u8],
    ) -> Box<dyn Iterator<Item = Result<ParsedDocument, Error>> + 'a>;
}
