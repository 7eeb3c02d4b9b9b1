//! Abstract Syntax Tree definitions
//!
//! Function and class nodes sit behind `Rc` so closures created at runtime
//! share the parsed body instead of cloning it.

use crate::span::Span;
use std::rc::Rc;

/// A parsed script
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Var,
    Let,
    Const,
}

/// `let a = 1, [b, c] = pair;`
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub kind: VarKind,
    pub declarations: Vec<VarDeclarator>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclarator {
    pub target: Pattern,
    pub init: Option<Expr>,
    pub span: Span,
}

/// Binding and assignment targets
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Identifier(Identifier),
    /// `obj.x` or `arr[i]`; only valid in assignment position
    Member(Box<Expr>),
    Array {
        elements: Vec<Option<Pattern>>,
        rest: Option<Box<Pattern>>,
        span: Span,
    },
    Object {
        properties: Vec<PatternProperty>,
        rest: Option<Box<Pattern>>,
        span: Span,
    },
    /// `target = default`
    Default {
        target: Box<Pattern>,
        default: Box<Expr>,
        span: Span,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatternProperty {
    pub key: PropertyKey,
    pub value: Pattern,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKey {
    Named(String),
    Computed(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionBody {
    Block(Vec<Stmt>),
    /// Concise arrow body: `x => x * 2`
    Expression(Box<Expr>),
}

/// Any function: declaration, expression, arrow, method or constructor
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionNode {
    pub name: Option<Identifier>,
    pub params: Vec<Pattern>,
    pub rest: Option<Pattern>,
    pub body: FunctionBody,
    pub is_arrow: bool,
    pub span: Span,
}

impl FunctionNode {
    /// Declared parameter count as reported by `fn.length`
    pub fn arity(&self) -> usize {
        self.params
            .iter()
            .take_while(|p| !matches!(p, Pattern::Default { .. }))
            .count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassNode {
    pub name: Option<Identifier>,
    pub superclass: Option<Box<Expr>>,
    pub constructor: Option<Rc<FunctionNode>>,
    pub members: Vec<ClassMember>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassMember {
    pub key: PropertyKey,
    pub is_static: bool,
    pub kind: ClassMemberKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassMemberKind {
    Method(Rc<FunctionNode>),
    Field(Option<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    VarDecl(VarDecl),
    Expr(Expr),
}

/// Left-hand side of `for...of` / `for...in`
#[derive(Debug, Clone, PartialEq)]
pub enum ForHead {
    Declaration(VarKind, Pattern),
    Pattern(Pattern),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub param: Option<Pattern>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// `None` for `default:`
    pub test: Option<Expr>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr(Expr),
    VarDecl(VarDecl),
    Function(Rc<FunctionNode>),
    Class(Rc<ClassNode>),
    Return(Option<Expr>, Span),
    If {
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
        span: Span,
    },
    Block(Block),
    While {
        test: Expr,
        body: Box<Stmt>,
        span: Span,
    },
    DoWhile {
        body: Box<Stmt>,
        test: Expr,
        span: Span,
    },
    For {
        init: Option<ForInit>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
        span: Span,
    },
    ForIn {
        left: ForHead,
        right: Expr,
        body: Box<Stmt>,
        span: Span,
    },
    ForOf {
        left: ForHead,
        right: Expr,
        body: Box<Stmt>,
        span: Span,
    },
    Break(Option<String>, Span),
    Continue(Option<String>, Span),
    Throw(Expr, Span),
    Try {
        block: Block,
        handler: Option<CatchClause>,
        finalizer: Option<Block>,
        span: Span,
    },
    Switch {
        discriminant: Expr,
        cases: Vec<SwitchCase>,
        span: Span,
    },
    Labeled {
        label: String,
        body: Box<Stmt>,
        span: Span,
    },
    Empty(Span),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Expr(e) => e.span(),
            Stmt::VarDecl(d) => d.span,
            Stmt::Function(f) => f.span,
            Stmt::Class(c) => c.span,
            Stmt::Block(b) => b.span,
            Stmt::Return(_, span)
            | Stmt::Break(_, span)
            | Stmt::Continue(_, span)
            | Stmt::Throw(_, span)
            | Stmt::Empty(span)
            | Stmt::If { span, .. }
            | Stmt::While { span, .. }
            | Stmt::DoWhile { span, .. }
            | Stmt::For { span, .. }
            | Stmt::ForIn { span, .. }
            | Stmt::ForOf { span, .. }
            | Stmt::Try { span, .. }
            | Stmt::Switch { span, .. }
            | Stmt::Labeled { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
    Plus,
    BitNot,
    Typeof,
    Void,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Exp,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    Le,
    Gt,
    Ge,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
    In,
    Instanceof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Compound(BinaryOp),
    Logical(LogicalOp),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberProperty {
    Named(String),
    Computed(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Expr(Expr),
    Spread(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrayElement {
    Expr(Expr),
    Spread(Expr),
    Hole,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectProperty {
    KeyValue {
        key: PropertyKey,
        value: Expr,
        span: Span,
    },
    Spread(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64, Span),
    String(Rc<str>, Span),
    Bool(bool, Span),
    Null(Span),
    Template {
        quasis: Vec<Rc<str>>,
        expressions: Vec<Expr>,
        span: Span,
    },
    Identifier(Identifier),
    This(Span),
    Array {
        elements: Vec<ArrayElement>,
        span: Span,
    },
    Object {
        properties: Vec<ObjectProperty>,
        span: Span,
    },
    Function(Rc<FunctionNode>),
    Class(Rc<ClassNode>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },
    Update {
        op: UpdateOp,
        prefix: bool,
        target: Box<Expr>,
        span: Span,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
        span: Span,
    },
    Assign {
        op: AssignOp,
        target: Box<Pattern>,
        value: Box<Expr>,
        span: Span,
    },
    Sequence(Vec<Expr>, Span),
    Member {
        object: Box<Expr>,
        property: MemberProperty,
        optional: bool,
        span: Span,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Argument>,
        optional: bool,
        span: Span,
    },
    New {
        callee: Box<Expr>,
        args: Vec<Argument>,
        span: Span,
    },
    SuperCall {
        args: Vec<Argument>,
        span: Span,
    },
    SuperMember {
        property: MemberProperty,
        span: Span,
    },
    /// Boundary of a chain containing `?.`; a short-circuit inside yields `undefined`
    OptionalChain(Box<Expr>, Span),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Number(_, span)
            | Expr::String(_, span)
            | Expr::Bool(_, span)
            | Expr::Null(span)
            | Expr::This(span)
            | Expr::Sequence(_, span)
            | Expr::OptionalChain(_, span) => *span,
            Expr::Identifier(id) => id.span,
            Expr::Function(f) => f.span,
            Expr::Class(c) => c.span,
            Expr::Template { span, .. }
            | Expr::Array { span, .. }
            | Expr::Object { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Update { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Logical { span, .. }
            | Expr::Conditional { span, .. }
            | Expr::Assign { span, .. }
            | Expr::Member { span, .. }
            | Expr::Call { span, .. }
            | Expr::New { span, .. }
            | Expr::SuperCall { span, .. }
            | Expr::SuperMember { span, .. } => *span,
        }
    }
}

impl Pattern {
    pub fn span(&self) -> Span {
        match self {
            Pattern::Identifier(id) => id.span,
            Pattern::Member(expr) => expr.span(),
            Pattern::Array { span, .. }
            | Pattern::Object { span, .. }
            | Pattern::Default { span, .. } => *span,
        }
    }

    /// Names bound by this pattern, in source order
    pub fn bound_names(&self, out: &mut Vec<String>) {
        match self {
            Pattern::Identifier(id) => out.push(id.name.clone()),
            Pattern::Member(_) => {}
            Pattern::Array { elements, rest, .. } => {
                for element in elements.iter().flatten() {
                    element.bound_names(out);
                }
                if let Some(rest) = rest {
                    rest.bound_names(out);
                }
            }
            Pattern::Object {
                properties, rest, ..
            } => {
                for property in properties {
                    property.value.bound_names(out);
                }
                if let Some(rest) = rest {
                    rest.bound_names(out);
                }
            }
            Pattern::Default { target, .. } => target.bound_names(out),
        }
    }
}
