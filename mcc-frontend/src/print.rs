//! AST pretty printer.
//!
//! Prints a translation unit back as C source. Compound expressions are
//! fully parenthesized, which makes the output unambiguous: reparsing it
//! yields a structurally identical tree, so the printer doubles as the
//! canonical form used by the parser round-trip tests.

use core::fmt::Write;

use mcc_arena::StringInterner;

use crate::ast::{
    Block, BlockItem, Decl, DeclKind, Expr, ExprKind, ForInit, Stmt, StmtKind, TranslationUnit,
};

struct Printer<'a> {
    tu: &'a TranslationUnit,
    syms: &'a StringInterner,
    out: String,
    indent: usize,
}

impl<'a> Printer<'a> {
    fn pad(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
    }

    fn expr(&mut self, e: Expr) {
        let tu = self.tu;
        match tu.exprs[e].kind {
            ExprKind::Const(value) => {
                let _ = write!(self.out, "{}", value);
            }
            ExprKind::Name(name) => self.out.push_str(self.syms.resolve(name)),
            ExprKind::Var(ident) => {
                // Print the source spelling so output is valid source.
                let name = tu.idents[ident].name;
                self.out.push_str(self.syms.resolve(name));
            }
            ExprKind::Unary { op, inner } => {
                self.out.push('(');
                self.out.push_str(op.spelling());
                self.expr(inner);
                self.out.push(')');
            }
            ExprKind::Binary { op, lhs, rhs } => {
                self.out.push('(');
                self.expr(lhs);
                let _ = write!(self.out, " {} ", op.spelling());
                self.expr(rhs);
                self.out.push(')');
            }
            ExprKind::Ternary {
                cond,
                then_expr,
                else_expr,
            } => {
                self.out.push('(');
                self.expr(cond);
                self.out.push_str(" ? ");
                self.expr(then_expr);
                self.out.push_str(" : ");
                self.expr(else_expr);
                self.out.push(')');
            }
            ExprKind::Call { callee, ref args } => {
                self.expr(callee);
                self.out.push('(');
                for (i, &arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.expr(arg);
                }
                self.out.push(')');
            }
        }
    }

    fn block(&mut self, block: &Block) {
        self.out.push_str("{\n");
        self.indent += 1;
        for &item in block.iter() {
            match item {
                BlockItem::Stmt(s) => self.stmt(s),
                BlockItem::Decl(d) => {
                    self.pad();
                    self.decl(d);
                    self.out.push('\n');
                }
            }
        }
        self.indent -= 1;
        self.pad();
        self.out.push('}');
    }

    /// Print a statement on its own line(s), indented.
    fn stmt(&mut self, s: Stmt) {
        self.pad();
        self.stmt_inline(s);
        self.out.push('\n');
    }

    fn stmt_inline(&mut self, s: Stmt) {
        let tu = self.tu;
        match tu.stmts[s].kind {
            StmtKind::Empty => self.out.push(';'),
            StmtKind::Expr(e) => {
                self.expr(e);
                self.out.push(';');
            }
            StmtKind::Compound(ref block) => self.block(block),
            StmtKind::Return(e) => {
                self.out.push_str("return ");
                self.expr(e);
                self.out.push(';');
            }
            StmtKind::If {
                cond,
                then_stmt,
                else_stmt,
            } => {
                self.out.push_str("if (");
                self.expr(cond);
                self.out.push_str(") ");
                self.stmt_inline(then_stmt);
                if let Some(else_stmt) = else_stmt {
                    self.out.push_str(" else ");
                    self.stmt_inline(else_stmt);
                }
            }
            StmtKind::While { cond, body } => {
                self.out.push_str("while (");
                self.expr(cond);
                self.out.push_str(") ");
                self.stmt_inline(body);
            }
            StmtKind::DoWhile { body, cond } => {
                self.out.push_str("do ");
                self.stmt_inline(body);
                self.out.push_str(" while (");
                self.expr(cond);
                self.out.push_str(");");
            }
            StmtKind::For {
                init,
                cond,
                post,
                body,
            } => {
                self.out.push_str("for (");
                match init {
                    ForInit::Decl(d) => self.decl(d),
                    ForInit::Expr(Some(e)) => {
                        self.expr(e);
                        self.out.push(';');
                    }
                    ForInit::Expr(None) => self.out.push(';'),
                }
                self.out.push(' ');
                if let Some(cond) = cond {
                    self.expr(cond);
                }
                self.out.push(';');
                if let Some(post) = post {
                    self.out.push(' ');
                    self.expr(post);
                }
                self.out.push_str(") ");
                self.stmt_inline(body);
            }
            StmtKind::Break => self.out.push_str("break;"),
            StmtKind::Continue => self.out.push_str("continue;"),
        }
    }

    fn decl(&mut self, d: Decl) {
        let tu = self.tu;
        match tu.decls[d].kind {
            DeclKind::Var { name, init, .. } => {
                let _ = write!(self.out, "int {}", self.syms.resolve(name));
                if let Some(init) = init {
                    self.out.push_str(" = ");
                    self.expr(init);
                }
                self.out.push(';');
            }
            DeclKind::Func {
                name,
                ref params,
                body,
                ..
            } => {
                let _ = write!(self.out, "int {}(", self.syms.resolve(name));
                if params.is_empty() {
                    self.out.push_str("void");
                } else {
                    for (i, param) in params.iter().enumerate() {
                        if i > 0 {
                            self.out.push_str(", ");
                        }
                        let _ = write!(self.out, "int {}", self.syms.resolve(param.name));
                    }
                }
                self.out.push(')');
                match body {
                    Some(body) => {
                        self.out.push(' ');
                        self.stmt_inline(body);
                    }
                    None => self.out.push(';'),
                }
            }
        }
    }
}

/// Print `tu` as C source.
pub fn print(tu: &TranslationUnit, syms: &StringInterner) -> String {
    let mut printer = Printer {
        tu,
        syms,
        out: String::new(),
        indent: 0,
    };
    for &item in tu.items.iter() {
        printer.decl(item);
        printer.out.push('\n');
    }
    printer.out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::parser::parse;

    fn printed(source: &str) -> String {
        let tokens = lex(source);
        let mut syms = StringInterner::new();
        let result = parse(source, &tokens, &mut syms);
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        print(&result.tu, &syms)
    }

    #[test]
    fn parenthesizes_by_structure() {
        let out = printed("int main(void) { return 1 + 2 * 3; }");
        assert!(out.contains("return (1 + (2 * 3));"), "{}", out);
    }

    #[test]
    fn prints_declarations_and_control_flow() {
        let out = printed("int f(int a, int b); int main(void) { int x = 1; if (x) return f(x, 2); else x = 0; return x; }");
        assert!(out.contains("int f(int a, int b);"), "{}", out);
        assert!(out.contains("int x = 1;"), "{}", out);
        assert!(out.contains("if (x) return f(x, 2); else (x = 0);"), "{}", out);
    }

    #[test]
    fn print_then_reparse_is_stable() {
        let sources = [
            "int main(void) { return 42; }",
            "int main(void) { return 1 + 2 * 3 - -4; }",
            "int main(void) { return 1 && 2 || !3; }",
            "int main(void) { int a = 1; { int a = 2; return a; } }",
            "int f(int x) { return x + 1; } int main(void) { return f(41); }",
            "int main(void) { int i; for (i = 0; i < 10; i = i + 1) { if (i == 5) break; } return i; }",
            "int main(void) { int x = 0; do x = x + 1; while (x < 3); return x ? 1 : 2; }",
            "int main(void) { while (0) ; return (1 << 3) % 5 & 7 ^ 2 | 1; }",
        ];
        for source in sources {
            let first = printed(source);
            let second = printed(&first);
            assert_eq!(first, second, "printer not stable for {:?}", source);
        }
    }
}
