// ABOUTME: Abstract syntax tree node types produced by the parser

use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Sigil {
    Scalar,
    Array,
    Hash,
    Func,
}

impl Sigil {
    pub fn ch(self) -> char {
        match self {
            Sigil::Scalar => '$',
            Sigil::Array => '@',
            Sigil::Hash => '%',
            Sigil::Func => '&',
        }
    }

    /// The environment key for a sigil-prefixed name, e.g. `$x`.
    pub fn key(self, name: &str) -> String {
        format!("{}{}", self.ch(), name)
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum UnaryOp {
    Neg,
    Pos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    In,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Param {
    pub name: String,
    pub default: Option<Expr>,
    pub is_vararg: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum FuncKind {
    Indented,
    AnonBlock,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum AssignTarget {
    Var { sigil: Sigil, name: String, span: Span },
    Index { collection: Box<Expr>, key: Box<Expr>, span: Span },
    Attr { obj: Box<Expr>, name: String, span: Span },
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum Expr {
    Literal { value: Literal, span: Span },
    VarRef { sigil: Sigil, name: String, span: Span },
    IdentRef { name: String, span: Span },
    Index { collection: Box<Expr>, key: Box<Expr>, span: Span },
    Attr { obj: Box<Expr>, name: String, span: Span },
    MethodCall { obj: Box<Expr>, name: String, args: Vec<Expr>, span: Span },
    Call { callee: Box<Expr>, args: Vec<Expr>, span: Span },
    Unary { op: UnaryOp, expr: Box<Expr>, span: Span },
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr>, span: Span },
    And { left: Box<Expr>, right: Box<Expr>, span: Span },
    Or { left: Box<Expr>, right: Box<Expr>, span: Span },
    Not { expr: Box<Expr>, span: Span },
    Compare { left: Box<Expr>, op: CompareOp, right: Box<Expr>, span: Span },
    RegexMatch { target: Box<Expr>, pattern: Box<Expr>, negated: bool, span: Span },
    RegexSubst { target: Box<Expr>, pattern: String, replacement: String, flags: String, span: Span },
    ListLit { elems: Vec<Expr>, span: Span },
    HashLit { pairs: Vec<(Expr, Expr)>, span: Span },
    RegexLit { pattern: String, flags: String, span: Span },
    Lambda { params: Vec<Param>, body: Box<Expr>, span: Span },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal { span, .. }
            | Expr::VarRef { span, .. }
            | Expr::IdentRef { span, .. }
            | Expr::Index { span, .. }
            | Expr::Attr { span, .. }
            | Expr::MethodCall { span, .. }
            | Expr::Call { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Binary { span, .. }
            | Expr::And { span, .. }
            | Expr::Or { span, .. }
            | Expr::Not { span, .. }
            | Expr::Compare { span, .. }
            | Expr::RegexMatch { span, .. }
            | Expr::RegexSubst { span, .. }
            | Expr::ListLit { span, .. }
            | Expr::HashLit { span, .. }
            | Expr::RegexLit { span, .. }
            | Expr::Lambda { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum ClassMember {
    Prop { name: String, default: Option<Expr>, span: Span },
    Method { name: String, params: Vec<Param>, body: Vec<Stmt>, is_init: bool, span: Span },
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum Stmt {
    Assign { target: AssignTarget, value: Expr, span: Span },
    ExprStmt { expr: Expr, span: Span },
    Return { value: Option<Expr>, span: Span },
    Print { args: Vec<Expr>, span: Span },
    Assert { cond: Expr, span: Span },
    If {
        cond: Expr,
        then_body: Vec<Stmt>,
        elifs: Vec<(Expr, Vec<Stmt>)>,
        else_body: Option<Vec<Stmt>>,
        span: Span,
    },
    While { cond: Expr, body: Vec<Stmt>, span: Span },
    For { var: String, iter: Expr, body: Vec<Stmt>, span: Span },
    FuncDef {
        name: String,
        params: Vec<Param>,
        body: Vec<Stmt>,
        kind: FuncKind,
        span: Span,
    },
    ClassDef {
        name: String,
        parent: Option<String>,
        members: Vec<ClassMember>,
        span: Span,
    },
    TestBlock { label: String, body: Vec<Stmt>, span: Span },
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Program {
    pub stmts: Vec<Stmt>,
}
