//! The abstract syntax tree.
//!
//! All nodes live in entity pools owned by the [`TranslationUnit`] and refer
//! to each other by typed entity references, so the resolver and type
//! checker can annotate nodes in place without fighting ownership. Every
//! node carries the source range it was parsed from.
//!
//! Identifier handling changes shape across the passes: the parser leaves
//! uses as [`ExprKind::Name`] and declarations without an [`Ident`]; the
//! resolver creates one [`IdentData`] record per binding, rewrites uses to
//! [`ExprKind::Var`], and fills in the declarations. After resolution no
//! `Name` node remains and no name lookup ever happens again.

use mcc_arena::Symbol;
use mcc_entity::{entity_impl, PrimaryMap};

use crate::srcloc::SourceRange;
use crate::types::Type;

/// A reference to an expression node.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Expr(u32);
entity_impl!(Expr, "expr");

/// A reference to a statement node.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Stmt(u32);
entity_impl!(Stmt, "stmt");

/// A reference to a declaration node.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decl(u32);
entity_impl!(Decl, "decl");

/// A reference to an identifier record.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ident(u32);
entity_impl!(Ident, "ident");

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-`
    Negate,
    /// `~`
    Complement,
    /// `!`
    Not,
}

impl UnaryOp {
    /// The operator's source spelling.
    pub fn spelling(self) -> &'static str {
        match self {
            Self::Negate => "-",
            Self::Complement => "~",
            Self::Not => "!",
        }
    }
}

/// Binary operators, including assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `&`
    BitAnd,
    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,
    /// `&&`
    LogicalAnd,
    /// `||`
    LogicalOr,
    /// `=`
    Assign,
}

impl BinaryOp {
    /// The operator's source spelling.
    pub fn spelling(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::LogicalAnd => "&&",
            Self::LogicalOr => "||",
            Self::Assign => "=",
        }
    }
}

/// An expression node.
#[derive(Debug, Clone)]
pub struct ExprData {
    /// The expression's structure.
    pub kind: ExprKind,
    /// Source range covering the whole expression.
    pub range: SourceRange,
    /// Filled in by the type checker; `Some` on every node afterwards.
    pub ty: Option<Type>,
}

/// Expression variants.
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// An integer constant.
    Const(i32),
    /// An unresolved identifier use. None survive resolution.
    Name(Symbol),
    /// A resolved identifier use.
    Var(Ident),
    /// A unary operator application.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// The operand.
        inner: Expr,
    },
    /// A binary operator application (including assignment).
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Expr,
        /// Right operand.
        rhs: Expr,
    },
    /// The conditional operator `cond ? then : else`.
    Ternary {
        /// Condition.
        cond: Expr,
        /// Value when the condition is nonzero.
        then_expr: Expr,
        /// Value when the condition is zero.
        else_expr: Expr,
    },
    /// A function call.
    Call {
        /// The called expression.
        callee: Expr,
        /// Arguments in source order.
        args: Box<[Expr]>,
    },
}

/// A statement node.
#[derive(Debug, Clone)]
pub struct StmtData {
    /// The statement's structure.
    pub kind: StmtKind,
    /// Source range covering the whole statement.
    pub range: SourceRange,
}

/// An ordered sequence of block items.
pub type Block = Box<[BlockItem]>;

/// One entry of a compound statement.
#[derive(Debug, Clone, Copy)]
pub enum BlockItem {
    /// A statement.
    Stmt(Stmt),
    /// A declaration.
    Decl(Decl),
}

/// The initializer clause of a `for` statement.
#[derive(Debug, Clone, Copy)]
pub enum ForInit {
    /// `for (int i = ...; ...)`
    Decl(Decl),
    /// `for (expr; ...)` or `for (; ...)`
    Expr(Option<Expr>),
}

/// Statement variants.
#[derive(Debug, Clone)]
pub enum StmtKind {
    /// `;`
    Empty,
    /// An expression evaluated for its effect.
    Expr(Expr),
    /// `{ ... }`
    Compound(Block),
    /// `return expr;`
    Return(Expr),
    /// `if (cond) then else?`
    If {
        /// Condition.
        cond: Expr,
        /// Taken when the condition is nonzero.
        then_stmt: Stmt,
        /// Taken when the condition is zero, if present.
        else_stmt: Option<Stmt>,
    },
    /// `while (cond) body`
    While {
        /// Condition.
        cond: Expr,
        /// Loop body.
        body: Stmt,
    },
    /// `do body while (cond);`
    DoWhile {
        /// Loop body.
        body: Stmt,
        /// Condition.
        cond: Expr,
    },
    /// `for (init; cond?; post?) body`
    For {
        /// Initializer clause.
        init: ForInit,
        /// Optional condition.
        cond: Option<Expr>,
        /// Optional post-iteration expression.
        post: Option<Expr>,
        /// Loop body.
        body: Stmt,
    },
    /// `break;`
    Break,
    /// `continue;`
    Continue,
}

/// A declaration node.
#[derive(Debug, Clone)]
pub struct DeclData {
    /// The declaration's structure.
    pub kind: DeclKind,
    /// Source range covering the whole declaration.
    pub range: SourceRange,
}

/// A function parameter.
#[derive(Debug, Clone, Copy)]
pub struct ParamDecl {
    /// Source spelling.
    pub name: Symbol,
    /// Filled in by the resolver.
    pub ident: Option<Ident>,
    /// Source range of the parameter declaration.
    pub range: SourceRange,
}

/// Declaration variants.
#[derive(Debug, Clone)]
pub enum DeclKind {
    /// `int name;` or `int name = init;`
    Var {
        /// Source spelling.
        name: Symbol,
        /// Filled in by the resolver.
        ident: Option<Ident>,
        /// Optional initializer expression.
        init: Option<Expr>,
    },
    /// `int name(params);` or `int name(params) { ... }`
    Func {
        /// Source spelling.
        name: Symbol,
        /// Filled in by the resolver.
        ident: Option<Ident>,
        /// Parameters in source order.
        params: Box<[ParamDecl]>,
        /// The body compound statement for a definition.
        body: Option<Stmt>,
    },
}

/// How an identifier may be referenced from other translation units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
    /// Not visible outside its scope.
    None,
    /// Visible to the linker under its own name.
    External,
}

/// Which kind of entity an identifier names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentKind {
    /// A variable.
    Object,
    /// A function.
    Function,
}

/// One record per binding, created by the resolver.
#[derive(Debug, Clone)]
pub struct IdentData {
    /// Source spelling.
    pub name: Symbol,
    /// Unique name within the translation unit; differs from `name` only
    /// for shadowed objects (`x` becomes `x.1`, `x.2`, ...).
    pub rewritten: Symbol,
    /// Which renaming of `name` this is. Zero for the first binding.
    pub shadow_index: u32,
    /// Object or function.
    pub kind: IdentKind,
    /// Linkage of the binding.
    pub linkage: Linkage,
    /// Filled in by the type checker.
    pub ty: Option<Type>,
    /// Whether a definition (initializer or body) has been seen.
    pub has_definition: bool,
}

/// A parsed translation unit owning all of its nodes.
#[derive(Debug, Default)]
pub struct TranslationUnit {
    /// Expression pool.
    pub exprs: PrimaryMap<Expr, ExprData>,
    /// Statement pool.
    pub stmts: PrimaryMap<Stmt, StmtData>,
    /// Declaration pool.
    pub decls: PrimaryMap<Decl, DeclData>,
    /// Identifier records, populated by the resolver.
    pub idents: PrimaryMap<Ident, IdentData>,
    /// Top-level declarations in source order.
    pub items: Box<[Decl]>,
}

impl TranslationUnit {
    /// The source range of an expression.
    pub fn expr_range(&self, e: Expr) -> SourceRange {
        self.exprs[e].range
    }

    /// The identifier record a resolved variable use refers to.
    ///
    /// Only valid after resolution.
    pub fn var_ident(&self, e: Expr) -> Ident {
        match self.exprs[e].kind {
            ExprKind::Var(ident) => ident,
            ref kind => unreachable!("expected resolved variable, found {:?}", kind),
        }
    }
}
