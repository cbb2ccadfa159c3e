//! Syntax tree for custom-code scripts

use super::lexer::TokenSpan;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let {
        name: String,
        mutable: bool,
        init: Option<Expr>,
        span: TokenSpan,
    },
    Expr(Expr),
    If {
        condition: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Option<Vec<Stmt>>,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
    },
    Return(Option<Expr>),
    Throw(Expr),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: TokenSpan,
    depth: usize,
}

impl Expr {
    pub fn new(kind: ExprKind, span: TokenSpan) -> Self {
        let depth = kind.child_depth() + 1;
        Self { kind, span, depth }
    }

    /// Height of the tree rooted here; a leaf is 1
    pub fn depth(&self) -> usize {
        self.depth
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Value),
    Ident(String),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Member {
        object: Box<Expr>,
        property: String,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `&&` and `||`, which short-circuit
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Target is an identifier, member or index expression
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
}

impl ExprKind {
    fn child_depth(&self) -> usize {
        match self {
            ExprKind::Literal(_) | ExprKind::Ident(_) => 0,
            ExprKind::Array(items) => deepest(items.iter()),
            ExprKind::Object(props) => deepest(props.iter().map(|(_, value)| value)),
            ExprKind::Member { object, .. } => object.depth,
            ExprKind::Call { callee, args } => callee.depth.max(deepest(args.iter())),
            ExprKind::Unary { operand, .. } => operand.depth,
            ExprKind::Index { object: a, index: b }
            | ExprKind::Binary { left: a, right: b, .. }
            | ExprKind::Logical { left: a, right: b, .. }
            | ExprKind::Assign { target: a, value: b } => a.depth.max(b.depth),
        }
    }
}

fn deepest<'a>(exprs: impl Iterator<Item = &'a Expr>) -> usize {
    exprs.map(Expr::depth).max().unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}
