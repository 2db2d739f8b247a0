//! Symbol resolution.
//!
//! A single AST walk that gives every identifier use a direct link to its
//! declaration. Block scopes form a stack of maps; a declaration errors when
//! its name is already bound in the current scope and otherwise creates an
//! identifier record. Shadowed (and re-used) object names are alpha-renamed
//! `name.1`, `name.2`, ... by a per-name counter, so every object's
//! rewritten name is unique across the translation unit, and IR lowering can
//! treat names as storage locations without thinking about scopes.
//!
//! Functions always land in the file scope with external linkage; repeated
//! declarations of the same function share one record. Whether the
//! declarations agree is the type checker's business.

use std::collections::HashMap;

use mcc_arena::{StringInterner, Symbol};

use crate::ast::{
    BlockItem, Decl, DeclKind, Expr, ExprKind, ForInit, Ident, IdentData, IdentKind, Linkage,
    ParamDecl, Stmt, StmtKind, TranslationUnit,
};
use crate::diagnostic::Diagnostic;

struct Resolver<'a> {
    tu: &'a mut TranslationUnit,
    syms: &'a mut StringInterner,
    /// Innermost scope last; `scopes[0]` is the file scope.
    scopes: Vec<HashMap<Symbol, Ident>>,
    /// How many times each object name has been bound so far, for renaming.
    bindings_seen: HashMap<Symbol, u32>,
    diagnostics: Vec<Diagnostic>,
}

/// Resolve every name in `tu`, creating identifier records in place.
pub fn resolve(tu: &mut TranslationUnit, syms: &mut StringInterner) -> Vec<Diagnostic> {
    let mut resolver = Resolver {
        tu,
        syms,
        scopes: vec![HashMap::new()],
        bindings_seen: HashMap::new(),
        diagnostics: Vec::new(),
    };

    let items: Vec<Decl> = resolver.tu.items.to_vec();
    for decl in items {
        resolver.top_level_decl(decl);
    }

    log::debug!(
        "resolved {} identifiers, {} diagnostics",
        resolver.tu.idents.len(),
        resolver.diagnostics.len()
    );
    resolver.diagnostics
}

impl Resolver<'_> {
    fn error(&mut self, range: crate::srcloc::SourceRange, message: String) {
        self.diagnostics.push(Diagnostic::new(message, range));
    }

    fn lookup(&self, name: Symbol) -> Option<Ident> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(&name).copied())
    }

    fn current_scope(&mut self) -> &mut HashMap<Symbol, Ident> {
        self.scopes.last_mut().expect("scope stack is never empty")
    }

    /// Create the record for a new object binding, renaming re-bound names.
    fn new_object_ident(&mut self, name: Symbol) -> Ident {
        let n = self.bindings_seen.entry(name).or_insert(0);
        let shadow_index = *n;
        *n += 1;
        let rewritten = if shadow_index == 0 {
            name
        } else {
            let spelled = format!("{}.{}", self.syms.resolve(name), shadow_index);
            self.syms.intern(&spelled)
        };
        self.tu.idents.push(IdentData {
            name,
            rewritten,
            shadow_index,
            kind: IdentKind::Object,
            linkage: Linkage::None,
            ty: None,
            has_definition: false,
        })
    }

    /// Bind an object name in the current scope.
    fn declare_object(
        &mut self,
        name: Symbol,
        range: crate::srcloc::SourceRange,
    ) -> Option<Ident> {
        if self.current_scope().contains_key(&name) {
            let spelled = self.syms.resolve(name).to_string();
            self.error(range, format!("redefinition of '{}'", spelled));
            return None;
        }
        let ident = self.new_object_ident(name);
        self.current_scope().insert(name, ident);
        Some(ident)
    }

    /// Bind (or re-use) a function name in the file scope.
    fn declare_function(
        &mut self,
        name: Symbol,
        range: crate::srcloc::SourceRange,
    ) -> Option<Ident> {
        if let Some(existing) = self.scopes[0].get(&name).copied() {
            if self.tu.idents[existing].kind == IdentKind::Function {
                return Some(existing);
            }
            let spelled = self.syms.resolve(name).to_string();
            self.error(range, format!("redefinition of '{}'", spelled));
            return None;
        }
        let ident = self.tu.idents.push(IdentData {
            name,
            rewritten: name,
            shadow_index: 0,
            kind: IdentKind::Function,
            linkage: Linkage::External,
            ty: None,
            has_definition: false,
        });
        self.scopes[0].insert(name, ident);
        Some(ident)
    }

    fn top_level_decl(&mut self, decl: Decl) {
        match self.tu.decls[decl].kind.clone() {
            DeclKind::Func { name, params, body, .. } => {
                self.function_decl(decl, name, &params, body, true)
            }
            DeclKind::Var { name, .. } => {
                // File-scope objects are not part of the language.
                let range = self.tu.decls[decl].range;
                let spelled = self.syms.resolve(name).to_string();
                self.error(
                    range,
                    format!("global variable '{}' is not supported", spelled),
                );
            }
        }
    }

    fn function_decl(
        &mut self,
        decl: Decl,
        name: Symbol,
        params: &[ParamDecl],
        body: Option<Stmt>,
        at_top_level: bool,
    ) {
        let range = self.tu.decls[decl].range;
        let ident = self.declare_function(name, range);
        if let DeclKind::Func { ident: slot, .. } = &mut self.tu.decls[decl].kind {
            *slot = ident;
        }

        if body.is_none() {
            return;
        }
        if !at_top_level {
            self.error(range, "function definition is not allowed here".to_string());
            return;
        }

        // Parameters live in the same scope as the body's own items.
        self.scopes.push(HashMap::new());
        let mut resolved_params = Vec::with_capacity(params.len());
        for param in params.iter() {
            let ident = self.declare_object(param.name, param.range);
            resolved_params.push(ident);
        }
        if let DeclKind::Func { params: slots, .. } = &mut self.tu.decls[decl].kind {
            for (slot, resolved) in slots.iter_mut().zip(resolved_params) {
                slot.ident = resolved;
            }
        }

        let body = body.expect("checked above");
        match self.tu.stmts[body].kind.clone() {
            StmtKind::Compound(block) => {
                for item in block.iter() {
                    self.block_item(*item);
                }
            }
            ref kind => unreachable!("function body must be a compound statement, got {:?}", kind),
        }
        self.scopes.pop();
    }

    fn block_item(&mut self, item: BlockItem) {
        match item {
            BlockItem::Stmt(s) => self.stmt(s),
            BlockItem::Decl(d) => self.decl(d),
        }
    }

    fn decl(&mut self, decl: Decl) {
        match self.tu.decls[decl].kind.clone() {
            DeclKind::Var { name, init, .. } => {
                // The binding is in scope in its own initializer, so
                // `int a = a;` refers to the new `a`.
                let range = self.tu.decls[decl].range;
                let ident = self.declare_object(name, range);
                if let DeclKind::Var { ident: slot, .. } = &mut self.tu.decls[decl].kind {
                    *slot = ident;
                }
                if let Some(init) = init {
                    self.expr(init);
                }
            }
            DeclKind::Func { name, params, body, .. } => {
                self.function_decl(decl, name, &params, body, false)
            }
        }
    }

    fn stmt(&mut self, stmt: Stmt) {
        match self.tu.stmts[stmt].kind.clone() {
            StmtKind::Empty | StmtKind::Break | StmtKind::Continue => {}
            StmtKind::Expr(e) | StmtKind::Return(e) => self.expr(e),
            StmtKind::Compound(block) => {
                self.scopes.push(HashMap::new());
                for item in block.iter() {
                    self.block_item(*item);
                }
                self.scopes.pop();
            }
            StmtKind::If {
                cond,
                then_stmt,
                else_stmt,
            } => {
                self.expr(cond);
                self.stmt(then_stmt);
                if let Some(else_stmt) = else_stmt {
                    self.stmt(else_stmt);
                }
            }
            StmtKind::While { cond, body } => {
                self.expr(cond);
                self.stmt(body);
            }
            StmtKind::DoWhile { body, cond } => {
                self.stmt(body);
                self.expr(cond);
            }
            StmtKind::For {
                init,
                cond,
                post,
                body,
            } => {
                // A for-init declaration scopes over the whole loop.
                self.scopes.push(HashMap::new());
                match init {
                    ForInit::Decl(d) => self.decl(d),
                    ForInit::Expr(Some(e)) => self.expr(e),
                    ForInit::Expr(None) => {}
                }
                if let Some(cond) = cond {
                    self.expr(cond);
                }
                if let Some(post) = post {
                    self.expr(post);
                }
                self.stmt(body);
                self.scopes.pop();
            }
        }
    }

    fn expr(&mut self, expr: Expr) {
        match self.tu.exprs[expr].kind.clone() {
            ExprKind::Const(_) => {}
            ExprKind::Name(name) => match self.lookup(name) {
                Some(ident) => self.tu.exprs[expr].kind = ExprKind::Var(ident),
                None => {
                    let range = self.tu.exprs[expr].range;
                    let spelled = self.syms.resolve(name).to_string();
                    self.error(range, format!("use of undeclared identifier '{}'", spelled));
                }
            },
            ExprKind::Var(_) => unreachable!("expression resolved twice"),
            ExprKind::Unary { inner, .. } => self.expr(inner),
            ExprKind::Binary { lhs, rhs, .. } => {
                self.expr(lhs);
                self.expr(rhs);
            }
            ExprKind::Ternary {
                cond,
                then_expr,
                else_expr,
            } => {
                self.expr(cond);
                self.expr(then_expr);
                self.expr(else_expr);
            }
            ExprKind::Call { callee, args } => {
                self.expr(callee);
                for &arg in args.iter() {
                    self.expr(arg);
                }
            }
        }
    }
}
