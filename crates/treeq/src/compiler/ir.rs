use crate::model::Scalar;
use core::fmt;

/// Per-step traversal switches. Attached to the traversal operation, never
/// global.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TraversePreferences {
    pub dont_follow_alias: bool,
    pub include_map_keys: bool,
    pub dont_include_map_values: bool,
    pub dont_auto_create: bool,
    /// `.a?`: non-numeric indices against a sequence are skipped.
    pub optional: bool,
}

/// Static key of a `.key` traversal.
#[derive(Debug, Clone, PartialEq)]
pub enum PathKey {
    Str(String),
    Int(i64),
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathKey::Str(s) => f.write_str(s),
            PathKey::Int(i) => write!(f, "{i}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// `.`
    SelfReference,
    /// Produces an empty context (`[]` collects nothing).
    Empty,
    /// `lhs | rhs`
    Pipe,
    /// `lhs , rhs`
    Union,
    /// Argument pair of a two-parameter function (`a; b`).
    Block,
    Value(Scalar),
    /// `.key`
    TraversePath { key: PathKey, prefs: TraversePreferences },
    /// `lhs[rhs]`; rhs is a collect yielding the indices, empty means splat.
    TraverseArray { prefs: TraversePreferences },
    /// `..` / `...`
    RecursiveDescent { include_keys: bool },
    /// `[rhs]`
    Collect,
    /// `{rhs}` where rhs yields create-map rows.
    CollectObject,
    /// `lhs: rhs` inside an object construction.
    CreateMap,
    /// `lhs * rhs`
    Multiply,
    /// `lhs = rhs` (`update: false`) and `lhs |= rhs` (`update: true`).
    Assign { update: bool },
    /// `lhs as $name | rhs`
    AssignVariable(String),
    GetVariable(String),
    Equals { negate: bool },
    And,
    Or,
    Not,
    Select,
    Parent,
    GetPath,
    Unique,
    UniqueBy,
    DocumentIndex,
    FileIndex,
    Filename,
    FormatDateTime,
    TimeZone,
    Now,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::SelfReference => "self",
            Operation::Empty => "empty",
            Operation::Pipe => "pipe",
            Operation::Union => "union",
            Operation::Block => "block",
            Operation::Value(_) => "value",
            Operation::TraversePath { .. } => "traverse_path",
            Operation::TraverseArray { .. } => "traverse_array",
            Operation::RecursiveDescent { .. } => "recursive_descent",
            Operation::Collect => "collect",
            Operation::CollectObject => "collect_object",
            Operation::CreateMap => "create_map",
            Operation::Multiply => "multiply",
            Operation::Assign { .. } => "assign",
            Operation::AssignVariable(_) => "assign_variable",
            Operation::GetVariable(_) => "get_variable",
            Operation::Equals { .. } => "equals",
            Operation::And => "and",
            Operation::Or => "or",
            Operation::Not => "not",
            Operation::Select => "select",
            Operation::Parent => "parent",
            Operation::GetPath => "path",
            Operation::Unique => "unique",
            Operation::UniqueBy => "unique_by",
            Operation::DocumentIndex => "document_index",
            Operation::FileIndex => "file_index",
            Operation::Filename => "filename",
            Operation::FormatDateTime => "format_datetime",
            Operation::TimeZone => "tz",
            Operation::Now => "now",
        }
    }
}

/// Binary expression tree. Read-only during evaluation; one tree is evaluated
/// once per document.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionNode {
    pub operation: Operation,
    pub lhs: Option<Box<ExpressionNode>>,
    pub rhs: Option<Box<ExpressionNode>>,
}

impl ExpressionNode {
    pub fn leaf(operation: Operation) -> Self {
        Self { operation, lhs: None, rhs: None }
    }

    pub fn binary(operation: Operation, lhs: ExpressionNode, rhs: ExpressionNode) -> Self {
        Self { operation, lhs: Some(Box::new(lhs)), rhs: Some(Box::new(rhs)) }
    }

    pub fn unary(operation: Operation, rhs: ExpressionNode) -> Self {
        Self { operation, lhs: None, rhs: Some(Box::new(rhs)) }
    }

    pub fn self_reference() -> Self {
        Self::leaf(Operation::SelfReference)
    }

    pub fn pipe(lhs: ExpressionNode, rhs: ExpressionNode) -> Self {
        Self::binary(Operation::Pipe, lhs, rhs)
    }

    pub fn path(key: impl Into<String>) -> Self {
        Self::leaf(Operation::TraversePath {
            key: PathKey::Str(key.into()),
            prefs: TraversePreferences::default(),
        })
    }

    /// `.[]`-style splat over `target`.
    pub fn splat(target: ExpressionNode) -> Self {
        Self::binary(
            Operation::TraverseArray { prefs: TraversePreferences::default() },
            target,
            Self::unary(Operation::Collect, Self::leaf(Operation::Empty)),
        )
    }
}
