pub mod codec;
pub mod compiler;
pub mod engine;
pub mod model;
pub mod parser;
pub mod stream;

pub use codec::{DocumentDecoder, ParsedDocument, YamlDecoder, YamlPrinter, to_yaml_string};
pub use compiler::compile;
pub use compiler::ir::ExpressionNode;
pub use engine::candidate::{CandidateNode, PathSegment};
pub use engine::config::{EngineConfig, EngineConfigBuilder, KeyMatchMode, RFC3339_LAYOUT};
pub use engine::context::Context;
pub use engine::navigator::{Navigator, evaluate, evaluate_expr};
pub use engine::runtime::{Error, ErrorCode};
pub use model::{Node, NodeId, NodeKind, NodeTree, Scalar, ScalarTag};
pub use parser::parse_expression;
pub use stream::{AllAtOnceEvaluator, ResultSink, Source, StreamEvaluator, StreamState};
