//! Syntax tree produced by the parser, before lowering to the expression tree.

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Key {
    Name(String),
    Index(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Pipe,
    Comma,
    Assign,
    Update,
    Or,
    And,
    Eq,
    Ne,
    Mul,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `.`
    Identity,
    /// `..` or `...`
    Recurse { include_keys: bool },
    Literal(Literal),
    Variable(String),
    /// `target.key`, `target."key"`, `target.0`
    Key { target: Box<Expr>, key: Key, optional: bool },
    /// `target[index]`; no index is a splat.
    Index { target: Box<Expr>, index: Option<Box<Expr>>, optional: bool },
    /// `[inner]`
    Collect(Option<Box<Expr>>),
    /// `{key: value, ...}`
    Object(Vec<(Expr, Expr)>),
    Call { name: String, args: Vec<Expr> },
    Binary { left: Box<Expr>, op: BinaryOp, right: Box<Expr> },
    /// `source as $name | body`
    Bind { source: Box<Expr>, name: String, body: Box<Expr> },
}

impl Expr {
    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Self {
        Expr::Binary { left: Box::new(left), op, right: Box::new(right) }
    }
}
