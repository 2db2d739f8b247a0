//! Lowering from the typed AST to three-address IR.
//!
//! Expressions are flattened into instructions writing fresh `$N`
//! temporaries; control flow becomes labels and conditional jumps. `&&` and
//! `||` short-circuit, the conditional operator selects between two copies
//! into one temporary, and loops push their continue/break labels onto a
//! stack that `break`/`continue` statements consume. A single per-function
//! counter feeds every label so names never collide.
//!
//! Only function definitions produce IR; declarations without bodies exist
//! solely for the type checker.

use mcc_arena::{StringInterner, Symbol};
use mcc_codegen::ir;
use smallvec::SmallVec;

use crate::ast::{
    BinaryOp, Block, BlockItem, Decl, DeclKind, Expr, ExprKind, ForInit, Stmt, StmtKind,
    TranslationUnit, UnaryOp,
};

struct LoopLabels {
    continue_label: Symbol,
    break_label: Symbol,
}

struct FuncLowerer<'a> {
    tu: &'a TranslationUnit,
    syms: &'a mut StringInterner,
    insts: Vec<ir::Inst>,
    next_temp: u32,
    next_label: u32,
    /// Innermost loop last; loops rarely nest deep.
    loops: SmallVec<[LoopLabels; 4]>,
}

/// Lower every function definition in `tu`.
pub fn lower(tu: &TranslationUnit, syms: &mut StringInterner) -> ir::Program {
    let mut functions = Vec::new();
    for &item in tu.items.iter() {
        let DeclKind::Func {
            ident,
            ref params,
            body: Some(body),
            ..
        } = tu.decls[item].kind
        else {
            continue;
        };
        let ident = ident.expect("lowering requires a resolved tree");

        let mut lowerer = FuncLowerer {
            tu,
            syms: &mut *syms,
            insts: Vec::new(),
            next_temp: 0,
            next_label: 0,
            loops: SmallVec::new(),
        };
        let param_names: Vec<Symbol> = params
            .iter()
            .map(|p| {
                let param_ident = p.ident.expect("lowering requires a resolved tree");
                tu.idents[param_ident].rewritten
            })
            .collect();
        lowerer.stmt(body);
        // Falling off the end of a function returns zero.
        lowerer.insts.push(ir::Inst::Return(ir::Value::Const(0)));

        functions.push(ir::Function {
            name: tu.idents[ident].rewritten,
            params: param_names.into_boxed_slice(),
            instructions: lowerer.insts.into_boxed_slice(),
        });
    }

    log::debug!("lowered {} function definitions", functions.len());
    ir::Program {
        functions: functions.into_boxed_slice(),
    }
}

fn unary_op(op: UnaryOp) -> ir::UnaryOp {
    match op {
        UnaryOp::Negate => ir::UnaryOp::Neg,
        UnaryOp::Complement => ir::UnaryOp::Complement,
        UnaryOp::Not => ir::UnaryOp::Not,
    }
}

fn binary_op(op: BinaryOp) -> ir::BinaryOp {
    match op {
        BinaryOp::Add => ir::BinaryOp::Add,
        BinaryOp::Sub => ir::BinaryOp::Sub,
        BinaryOp::Mul => ir::BinaryOp::Mul,
        BinaryOp::Div => ir::BinaryOp::Div,
        BinaryOp::Mod => ir::BinaryOp::Mod,
        BinaryOp::BitAnd => ir::BinaryOp::BitAnd,
        BinaryOp::BitOr => ir::BinaryOp::BitOr,
        BinaryOp::BitXor => ir::BinaryOp::BitXor,
        BinaryOp::Shl => ir::BinaryOp::Shl,
        BinaryOp::Shr => ir::BinaryOp::Sar,
        BinaryOp::Equal => ir::BinaryOp::Equal,
        BinaryOp::NotEqual => ir::BinaryOp::NotEqual,
        BinaryOp::Less => ir::BinaryOp::Less,
        BinaryOp::LessEqual => ir::BinaryOp::LessEqual,
        BinaryOp::Greater => ir::BinaryOp::Greater,
        BinaryOp::GreaterEqual => ir::BinaryOp::GreaterEqual,
        BinaryOp::LogicalAnd | BinaryOp::LogicalOr | BinaryOp::Assign => {
            unreachable!("{:?} has no direct IR opcode", op)
        }
    }
}

impl FuncLowerer<'_> {
    fn push(&mut self, inst: ir::Inst) {
        self.insts.push(inst);
    }

    fn fresh_temp(&mut self) -> ir::Value {
        let name = format!("${}", self.next_temp);
        self.next_temp += 1;
        ir::Value::Var(self.syms.intern(&name))
    }

    fn fresh_label(&mut self, stem: &str) -> Symbol {
        let name = format!("{}.{}", stem, self.next_label);
        self.next_label += 1;
        self.syms.intern(&name)
    }

    /// The storage name of the identifier behind a resolved variable use.
    fn var_value(&self, e: Expr) -> ir::Value {
        ir::Value::Var(self.tu.idents[self.tu.var_ident(e)].rewritten)
    }

    fn expr(&mut self, e: Expr) -> ir::Value {
        let tu = self.tu;
        match tu.exprs[e].kind {
            ExprKind::Const(value) => ir::Value::Const(value),
            ExprKind::Name(_) => unreachable!("unresolved name survived resolution"),
            ExprKind::Var(ident) => ir::Value::Var(tu.idents[ident].rewritten),
            ExprKind::Unary { op, inner } => {
                let src = self.expr(inner);
                let dst = self.fresh_temp();
                self.push(ir::Inst::Unary {
                    op: unary_op(op),
                    dst,
                    src,
                });
                dst
            }
            ExprKind::Binary {
                op: BinaryOp::Assign,
                lhs,
                rhs,
            } => {
                let src = self.expr(rhs);
                let dst = self.var_value(lhs);
                self.push(ir::Inst::Copy { dst, src });
                dst
            }
            ExprKind::Binary {
                op: BinaryOp::LogicalAnd,
                lhs,
                rhs,
            } => self.short_circuit(lhs, rhs, true),
            ExprKind::Binary {
                op: BinaryOp::LogicalOr,
                lhs,
                rhs,
            } => self.short_circuit(lhs, rhs, false),
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.expr(lhs);
                let rhs = self.expr(rhs);
                let dst = self.fresh_temp();
                self.push(ir::Inst::Binary {
                    op: binary_op(op),
                    dst,
                    lhs,
                    rhs,
                });
                dst
            }
            ExprKind::Ternary {
                cond,
                then_expr,
                else_expr,
            } => {
                let else_label = self.fresh_label("cond.else");
                let end_label = self.fresh_label("cond.end");
                let result = self.fresh_temp();

                let cond = self.expr(cond);
                self.push(ir::Inst::JumpIfZero {
                    cond,
                    target: else_label,
                });
                let then_value = self.expr(then_expr);
                self.push(ir::Inst::Copy {
                    dst: result,
                    src: then_value,
                });
                self.push(ir::Inst::Jump(end_label));
                self.push(ir::Inst::Label(else_label));
                let else_value = self.expr(else_expr);
                self.push(ir::Inst::Copy {
                    dst: result,
                    src: else_value,
                });
                self.push(ir::Inst::Label(end_label));
                result
            }
            ExprKind::Call { callee, ref args } => {
                let callee = self.tu.idents[self.tu.var_ident(callee)].rewritten;
                let arg_values: Vec<ir::Value> = args.iter().map(|&a| self.expr(a)).collect();
                let dst = self.fresh_temp();
                self.push(ir::Inst::Call {
                    dst,
                    callee,
                    args: arg_values.into_boxed_slice(),
                });
                dst
            }
        }
    }

    /// Lower `&&` (`is_and`) or `||` with short-circuit evaluation,
    /// producing 0 or 1.
    fn short_circuit(&mut self, lhs: Expr, rhs: Expr, is_and: bool) -> ir::Value {
        let (stem_skip, stem_end) = if is_and {
            ("and.false", "and.end")
        } else {
            ("or.true", "or.end")
        };
        let skip_label = self.fresh_label(stem_skip);
        let end_label = self.fresh_label(stem_end);
        let result = self.fresh_temp();

        let jump = |cond, target| {
            if is_and {
                ir::Inst::JumpIfZero { cond, target }
            } else {
                ir::Inst::JumpIfNotZero { cond, target }
            }
        };

        let lhs = self.expr(lhs);
        self.push(jump(lhs, skip_label));
        let rhs = self.expr(rhs);
        self.push(jump(rhs, skip_label));

        let (fallthrough, skipped) = if is_and { (1, 0) } else { (0, 1) };
        self.push(ir::Inst::Copy {
            dst: result,
            src: ir::Value::Const(fallthrough),
        });
        self.push(ir::Inst::Jump(end_label));
        self.push(ir::Inst::Label(skip_label));
        self.push(ir::Inst::Copy {
            dst: result,
            src: ir::Value::Const(skipped),
        });
        self.push(ir::Inst::Label(end_label));
        result
    }

    fn block(&mut self, block: &Block) {
        for &item in block.iter() {
            match item {
                BlockItem::Stmt(s) => self.stmt(s),
                BlockItem::Decl(d) => self.decl(d),
            }
        }
    }

    fn decl(&mut self, d: Decl) {
        match self.tu.decls[d].kind {
            DeclKind::Var { ident, init, .. } => {
                if let Some(init) = init {
                    let src = self.expr(init);
                    let ident = ident.expect("lowering requires a resolved tree");
                    let dst = ir::Value::Var(self.tu.idents[ident].rewritten);
                    self.push(ir::Inst::Copy { dst, src });
                }
            }
            // Local function declarations produce no code.
            DeclKind::Func { .. } => {}
        }
    }

    fn stmt(&mut self, s: Stmt) {
        let tu = self.tu;
        match tu.stmts[s].kind {
            StmtKind::Empty => {}
            StmtKind::Expr(e) => {
                self.expr(e);
            }
            StmtKind::Compound(ref block) => self.block(block),
            StmtKind::Return(e) => {
                let value = self.expr(e);
                self.push(ir::Inst::Return(value));
            }
            StmtKind::If {
                cond,
                then_stmt,
                else_stmt,
            } => {
                let cond = self.expr(cond);
                match else_stmt {
                    None => {
                        let end_label = self.fresh_label("if.end");
                        self.push(ir::Inst::JumpIfZero {
                            cond,
                            target: end_label,
                        });
                        self.stmt(then_stmt);
                        self.push(ir::Inst::Label(end_label));
                    }
                    Some(else_stmt) => {
                        let else_label = self.fresh_label("if.else");
                        let end_label = self.fresh_label("if.end");
                        self.push(ir::Inst::JumpIfZero {
                            cond,
                            target: else_label,
                        });
                        self.stmt(then_stmt);
                        self.push(ir::Inst::Jump(end_label));
                        self.push(ir::Inst::Label(else_label));
                        self.stmt(else_stmt);
                        self.push(ir::Inst::Label(end_label));
                    }
                }
            }
            StmtKind::While { cond, body } => {
                let start_label = self.fresh_label("while.start");
                let end_label = self.fresh_label("while.end");

                self.push(ir::Inst::Label(start_label));
                let cond = self.expr(cond);
                self.push(ir::Inst::JumpIfZero {
                    cond,
                    target: end_label,
                });
                self.loops.push(LoopLabels {
                    continue_label: start_label,
                    break_label: end_label,
                });
                self.stmt(body);
                self.loops.pop();
                self.push(ir::Inst::Jump(start_label));
                self.push(ir::Inst::Label(end_label));
            }
            StmtKind::DoWhile { body, cond } => {
                let start_label = self.fresh_label("do.start");
                let continue_label = self.fresh_label("do.continue");
                let end_label = self.fresh_label("do.end");

                self.push(ir::Inst::Label(start_label));
                self.loops.push(LoopLabels {
                    continue_label,
                    break_label: end_label,
                });
                self.stmt(body);
                self.loops.pop();
                self.push(ir::Inst::Label(continue_label));
                let cond = self.expr(cond);
                self.push(ir::Inst::JumpIfNotZero {
                    cond,
                    target: start_label,
                });
                self.push(ir::Inst::Label(end_label));
            }
            StmtKind::For {
                init,
                cond,
                post,
                body,
            } => {
                let start_label = self.fresh_label("for.start");
                let continue_label = self.fresh_label("for.continue");
                let end_label = self.fresh_label("for.end");

                match init {
                    ForInit::Decl(d) => self.decl(d),
                    ForInit::Expr(Some(e)) => {
                        self.expr(e);
                    }
                    ForInit::Expr(None) => {}
                }
                self.push(ir::Inst::Label(start_label));
                if let Some(cond) = cond {
                    let cond = self.expr(cond);
                    self.push(ir::Inst::JumpIfZero {
                        cond,
                        target: end_label,
                    });
                }
                self.loops.push(LoopLabels {
                    continue_label,
                    break_label: end_label,
                });
                self.stmt(body);
                self.loops.pop();
                self.push(ir::Inst::Label(continue_label));
                if let Some(post) = post {
                    self.expr(post);
                }
                self.push(ir::Inst::Jump(start_label));
                self.push(ir::Inst::Label(end_label));
            }
            StmtKind::Break => {
                let target = self
                    .loops
                    .last()
                    .expect("the checker rejects break outside loops")
                    .break_label;
                self.push(ir::Inst::Jump(target));
            }
            StmtKind::Continue => {
                let target = self
                    .loops
                    .last()
                    .expect("the checker rejects continue outside loops")
                    .continue_label;
                self.push(ir::Inst::Jump(target));
            }
        }
    }
}
