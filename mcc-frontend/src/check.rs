//! The type checker.
//!
//! Walks the resolved AST, annotating every expression with its type and
//! reporting violations. Inside one expression a failure stops further
//! checks (its operands have no trustworthy types), but statements,
//! declarations and functions are always checked to the end, so one pass
//! reports every independent error, and a clean pass guarantees every
//! expression node carries a type.
//!
//! Break and continue placement is validated here too, so IR lowering can
//! assume every `break` has an enclosing loop.

use mcc_arena::StringInterner;

use crate::ast::{
    BinaryOp, Block, BlockItem, Decl, DeclKind, Expr, ExprKind, ForInit, Stmt, StmtKind,
    TranslationUnit,
};
use crate::diagnostic::Diagnostic;
use crate::srcloc::SourceRange;
use crate::types::{Type, TypeData, TypePool};

struct Checker<'a> {
    tu: &'a mut TranslationUnit,
    types: &'a mut TypePool,
    syms: &'a StringInterner,
    diagnostics: Vec<Diagnostic>,
    loop_depth: u32,
}

/// Type-check `tu`, annotating expressions and identifier records.
pub fn type_check(
    tu: &mut TranslationUnit,
    types: &mut TypePool,
    syms: &StringInterner,
) -> Vec<Diagnostic> {
    let mut checker = Checker {
        tu,
        types,
        syms,
        diagnostics: Vec::new(),
        loop_depth: 0,
    };

    let items: Vec<Decl> = checker.tu.items.to_vec();
    for decl in items {
        checker.function_decl(decl);
    }

    log::debug!(
        "type check produced {} diagnostics",
        checker.diagnostics.len()
    );
    checker.diagnostics
}

impl Checker<'_> {
    fn error(&mut self, range: SourceRange, message: String) {
        self.diagnostics.push(Diagnostic::new(message, range));
    }

    /// The annotation set by a successful [`Checker::expr`].
    fn expr_ty(&self, e: Expr) -> Type {
        self.tu.exprs[e].ty.expect("expression was not checked")
    }

    fn is_int(&self, e: Expr) -> bool {
        self.types.is_int(self.expr_ty(e))
    }

    fn ty_name(&self, e: Expr) -> String {
        self.types.name(self.expr_ty(e))
    }

    /// Check one expression tree; `false` means a diagnostic was issued and
    /// the node carries no type.
    fn expr(&mut self, e: Expr) -> bool {
        match self.tu.exprs[e].kind.clone() {
            ExprKind::Const(_) => {
                self.tu.exprs[e].ty = Some(self.types.int());
                true
            }
            ExprKind::Name(_) => unreachable!("unresolved name reached the type checker"),
            ExprKind::Var(ident) => {
                let ty = self.tu.idents[ident].ty;
                debug_assert!(ty.is_some(), "identifier used before its declaration");
                self.tu.exprs[e].ty = ty;
                true
            }
            ExprKind::Unary { inner, .. } => {
                if !self.expr(inner) {
                    return false;
                }
                if !self.is_int(inner) {
                    let message = format!(
                        "invalid argument type '{}' to unary expression",
                        self.ty_name(inner)
                    );
                    let range = self.tu.exprs[inner].range;
                    self.error(range, message);
                    return false;
                }
                self.tu.exprs[e].ty = self.tu.exprs[inner].ty;
                true
            }
            ExprKind::Binary {
                op: BinaryOp::Assign,
                lhs,
                rhs,
            } => {
                if !self.expr(lhs) || !self.expr(rhs) {
                    return false;
                }
                if !matches!(self.tu.exprs[lhs].kind, ExprKind::Var(_)) {
                    let range = self.tu.exprs[lhs].range;
                    self.error(range, "expression is not assignable".to_string());
                    return false;
                }
                if !self.is_int(lhs) || !self.is_int(rhs) {
                    let message = format!(
                        "invalid operands to binary expression ('{}' and '{}')",
                        self.ty_name(lhs),
                        self.ty_name(rhs)
                    );
                    let range = self.tu.exprs[e].range;
                    self.error(range, message);
                    return false;
                }
                self.tu.exprs[e].ty = Some(self.types.int());
                true
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                if !self.expr(lhs) || !self.expr(rhs) {
                    return false;
                }
                if !self.is_int(lhs) || !self.is_int(rhs) {
                    let message = format!(
                        "invalid operands to binary expression ('{}' and '{}')",
                        self.ty_name(lhs),
                        self.ty_name(rhs)
                    );
                    let range = self.tu.exprs[e].range;
                    self.error(range, message);
                    return false;
                }
                self.tu.exprs[e].ty = Some(self.types.int());
                true
            }
            ExprKind::Ternary {
                cond,
                then_expr,
                else_expr,
            } => {
                if !self.expr(cond) || !self.expr(then_expr) || !self.expr(else_expr) {
                    return false;
                }
                if !self.is_int(cond) {
                    let message = format!(
                        "used type '{}' where arithmetic type is required",
                        self.ty_name(cond)
                    );
                    let range = self.tu.exprs[cond].range;
                    self.error(range, message);
                    return false;
                }
                if !self.is_int(then_expr) || !self.is_int(else_expr) {
                    let message = format!(
                        "incompatible operand types ('{}' and '{}')",
                        self.ty_name(then_expr),
                        self.ty_name(else_expr)
                    );
                    let range = self.tu.exprs[e].range;
                    self.error(range, message);
                    return false;
                }
                self.tu.exprs[e].ty = self.tu.exprs[then_expr].ty;
                true
            }
            ExprKind::Call { callee, args } => {
                if !self.expr(callee) {
                    return false;
                }
                let callee_range = self.tu.exprs[callee].range;
                let (ret, param_count) = match *self.types.data(self.expr_ty(callee)) {
                    TypeData::Function { ret, param_count } => (ret, param_count),
                    _ => {
                        let message = format!(
                            "called object with type '{}', which is not callable",
                            self.ty_name(callee)
                        );
                        self.error(callee_range, message);
                        return false;
                    }
                };
                if param_count as usize != args.len() {
                    let message = format!(
                        "too {} arguments to function call, expected {}, have {}",
                        if (param_count as usize) > args.len() {
                            "few"
                        } else {
                            "many"
                        },
                        param_count,
                        args.len()
                    );
                    self.error(callee_range, message);
                    return false;
                }
                for &arg in args.iter() {
                    if !self.expr(arg) {
                        return false;
                    }
                    if !self.is_int(arg) {
                        let message = format!(
                            "passing '{}' to parameter of type 'int'",
                            self.ty_name(arg)
                        );
                        let range = self.tu.exprs[arg].range;
                        self.error(range, message);
                        return false;
                    }
                }
                self.tu.exprs[e].ty = Some(ret);
                true
            }
        }
    }

    /// Check a statement condition: it must be an `int`.
    fn condition(&mut self, cond: Expr) -> bool {
        if !self.expr(cond) {
            return false;
        }
        if !self.is_int(cond) {
            let message = format!(
                "statement requires expression of scalar type ('{}' invalid)",
                self.ty_name(cond)
            );
            let range = self.tu.exprs[cond].range;
            self.error(range, message);
            return false;
        }
        true
    }

    fn stmt(&mut self, s: Stmt) -> bool {
        match self.tu.stmts[s].kind.clone() {
            StmtKind::Empty => true,
            StmtKind::Expr(e) => self.expr(e),
            StmtKind::Compound(block) => self.block(&block),
            StmtKind::Return(e) => {
                if !self.expr(e) {
                    return false;
                }
                if !self.is_int(e) {
                    let message = format!(
                        "returning '{}' from a function with incompatible result type 'int'",
                        self.ty_name(e)
                    );
                    let range = self.tu.exprs[e].range;
                    self.error(range, message);
                    return false;
                }
                true
            }
            StmtKind::If {
                cond,
                then_stmt,
                else_stmt,
            } => {
                let mut result = self.condition(cond);
                result &= self.stmt(then_stmt);
                if let Some(else_stmt) = else_stmt {
                    result &= self.stmt(else_stmt);
                }
                result
            }
            StmtKind::While { cond, body } | StmtKind::DoWhile { body, cond } => {
                let mut result = self.condition(cond);
                self.loop_depth += 1;
                result &= self.stmt(body);
                self.loop_depth -= 1;
                result
            }
            StmtKind::For {
                init,
                cond,
                post,
                body,
            } => {
                let mut result = match init {
                    ForInit::Decl(d) => self.var_decl(d),
                    ForInit::Expr(Some(e)) => self.expr(e),
                    ForInit::Expr(None) => true,
                };
                if let Some(cond) = cond {
                    result &= self.condition(cond);
                }
                if let Some(post) = post {
                    result &= self.expr(post);
                }
                self.loop_depth += 1;
                result &= self.stmt(body);
                self.loop_depth -= 1;
                result
            }
            StmtKind::Break => {
                if self.loop_depth == 0 {
                    let range = self.tu.stmts[s].range;
                    self.error(range, "'break' statement not in loop statement".to_string());
                    return false;
                }
                true
            }
            StmtKind::Continue => {
                if self.loop_depth == 0 {
                    let range = self.tu.stmts[s].range;
                    self.error(
                        range,
                        "'continue' statement not in loop statement".to_string(),
                    );
                    return false;
                }
                true
            }
        }
    }

    fn block(&mut self, block: &Block) -> bool {
        let mut result = true;
        for &item in block.iter() {
            match item {
                BlockItem::Stmt(s) => result &= self.stmt(s),
                BlockItem::Decl(d) => match self.tu.decls[d].kind {
                    DeclKind::Var { .. } => result &= self.var_decl(d),
                    DeclKind::Func { .. } => result &= self.function_decl(d),
                },
            }
        }
        result
    }

    fn var_decl(&mut self, d: Decl) -> bool {
        let DeclKind::Var { ident, init, .. } = self.tu.decls[d].kind else {
            unreachable!("not a variable declaration")
        };
        let Some(ident) = ident else {
            // The resolver already rejected this binding.
            return false;
        };
        self.tu.idents[ident].ty = Some(self.types.int());

        if let Some(init) = init {
            self.tu.idents[ident].has_definition = true;
            if !self.expr(init) {
                return false;
            }
            if !self.is_int(init) {
                let message =
                    format!("initialization of 'int' from '{}'", self.ty_name(init));
                let range = self.tu.exprs[init].range;
                self.error(range, message);
                return false;
            }
        }
        true
    }

    fn function_decl(&mut self, d: Decl) -> bool {
        let DeclKind::Func {
            name,
            ident,
            ref params,
            body,
        } = self.tu.decls[d].kind
        else {
            // A stray top-level variable; the resolver already rejected it.
            return false;
        };
        let params = params.clone();
        let range = self.tu.decls[d].range;
        let Some(ident) = ident else {
            return false;
        };

        let int = self.types.int();
        let fn_ty = self.types.function(int, params.len() as u32);
        match self.tu.idents[ident].ty {
            None => self.tu.idents[ident].ty = Some(fn_ty),
            Some(existing) if existing == fn_ty => {}
            Some(_) => {
                let spelled = self.syms.resolve(name).to_string();
                self.error(range, format!("conflicting types for '{}'", spelled));
                return false;
            }
        }

        let Some(body) = body else {
            return true;
        };
        if self.tu.idents[ident].has_definition {
            let spelled = self.syms.resolve(name).to_string();
            self.error(range, format!("multiple definition of '{}'", spelled));
            return false;
        }
        self.tu.idents[ident].has_definition = true;

        for param in params.iter() {
            if let Some(param_ident) = param.ident {
                self.tu.idents[param_ident].ty = Some(int);
            }
        }
        self.stmt(body)
    }
}
