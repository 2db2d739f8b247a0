//! Instruction selection: IR to x86-64 with pseudo operands.
//!
//! Each IR instruction maps to a fixed template of one or more x86
//! instructions. Variables stay symbolic (`Operand::Pseudo`); the stack and
//! legalization passes turn the result into encodable code. All arithmetic
//! is 32-bit.

use smallvec::SmallVec;

use crate::ir;

use super::args::{CondCode, Operand, OperandSize, Reg};
use super::inst::{AluOp, Inst, UnaryOp};

/// Registers carrying the first six integer call arguments, in order.
const ARG_REGS: [Reg; 6] = [Reg::Di, Reg::Si, Reg::Dx, Reg::Cx, Reg::R8, Reg::R9];

fn operand(value: ir::Value) -> Operand {
    match value {
        ir::Value::Const(c) => Operand::Imm(c),
        ir::Value::Var(name) => Operand::Pseudo(name),
    }
}

fn cond_code(op: ir::BinaryOp) -> CondCode {
    match op {
        ir::BinaryOp::Equal => CondCode::E,
        ir::BinaryOp::NotEqual => CondCode::Ne,
        ir::BinaryOp::Less => CondCode::L,
        ir::BinaryOp::LessEqual => CondCode::Le,
        ir::BinaryOp::Greater => CondCode::G,
        ir::BinaryOp::GreaterEqual => CondCode::Ge,
        _ => unreachable!("not a comparison: {:?}", op),
    }
}

fn alu_op(op: ir::BinaryOp) -> AluOp {
    match op {
        ir::BinaryOp::Add => AluOp::Add,
        ir::BinaryOp::Sub => AluOp::Sub,
        ir::BinaryOp::Mul => AluOp::Imul,
        ir::BinaryOp::BitAnd => AluOp::And,
        ir::BinaryOp::BitOr => AluOp::Or,
        ir::BinaryOp::BitXor => AluOp::Xor,
        ir::BinaryOp::Shl => AluOp::Shl,
        ir::BinaryOp::Sar => AluOp::Sar,
        _ => unreachable!("no direct ALU template for {:?}", op),
    }
}

/// `dst = lhs op rhs` with a direct two-operand template.
fn select_binary(insts: &mut Vec<Inst>, op: AluOp, dst: Operand, lhs: Operand, rhs: Operand) {
    insts.push(Inst::mov(OperandSize::Dword, dst, lhs));
    insts.push(Inst::alu(op, OperandSize::Dword, dst, rhs));
}

/// Division and remainder go through the `cdq`/`idiv` pair; the quotient
/// lands in `eax` and the remainder in `edx`.
fn select_div_mod(insts: &mut Vec<Inst>, op: ir::BinaryOp, dst: Operand, lhs: Operand, rhs: Operand) {
    insts.push(Inst::mov(OperandSize::Dword, Operand::Reg(Reg::Ax), lhs));
    insts.push(Inst::Cdq);
    insts.push(Inst::unary(UnaryOp::Idiv, OperandSize::Dword, rhs));
    let result = match op {
        ir::BinaryOp::Div => Reg::Ax,
        ir::BinaryOp::Mod => Reg::Dx,
        _ => unreachable!(),
    };
    insts.push(Inst::mov(OperandSize::Dword, dst, Operand::Reg(result)));
}

/// Comparisons materialize a 0/1 result: clear the destination, compare,
/// then `set<cc>` its low byte.
fn select_comparison(insts: &mut Vec<Inst>, cc: CondCode, dst: Operand, lhs: Operand, rhs: Operand) {
    insts.push(Inst::mov(OperandSize::Dword, dst, Operand::Imm(0)));
    insts.push(Inst::alu(AluOp::Cmp, OperandSize::Dword, lhs, rhs));
    insts.push(Inst::SetCC { cc, dst });
}

/// Calls follow the System V integer convention: six register arguments,
/// the rest pushed right to left with the stack kept 16-byte aligned at the
/// call.
fn select_call(insts: &mut Vec<Inst>, dst: Operand, callee: mcc_arena::Symbol, args: &[ir::Value]) {
    let stack_args: &[ir::Value] = if args.len() > ARG_REGS.len() {
        &args[ARG_REGS.len()..]
    } else {
        &[]
    };
    let padding: u32 = if stack_args.len() % 2 == 1 { 8 } else { 0 };
    if padding != 0 {
        insts.push(Inst::alu(
            AluOp::Sub,
            OperandSize::Qword,
            Operand::Reg(Reg::Sp),
            Operand::Imm(padding as i32),
        ));
    }

    for (i, &arg) in args.iter().take(ARG_REGS.len()).enumerate() {
        insts.push(Inst::mov(
            OperandSize::Dword,
            Operand::Reg(ARG_REGS[i]),
            operand(arg),
        ));
    }
    for &arg in stack_args.iter().rev() {
        match operand(arg) {
            imm @ Operand::Imm(_) => insts.push(Inst::Push(imm)),
            src => {
                // An 8-byte push of a 4-byte stack slot could read past the
                // frame, so stage the value through a register.
                insts.push(Inst::mov(OperandSize::Dword, Operand::Reg(Reg::Ax), src));
                insts.push(Inst::Push(Operand::Reg(Reg::Ax)));
            }
        }
    }

    insts.push(Inst::Call(callee));

    let cleanup = 8 * stack_args.len() as u32 + padding;
    if cleanup != 0 {
        insts.push(Inst::alu(
            AluOp::Add,
            OperandSize::Qword,
            Operand::Reg(Reg::Sp),
            Operand::Imm(cleanup as i32),
        ));
    }
    insts.push(Inst::mov(OperandSize::Dword, dst, Operand::Reg(Reg::Ax)));
}

/// Copy incoming parameters into their pseudo registers. The first six live
/// in registers; the rest sit above the return address at `rbp+16`,
/// `rbp+24`, ...
fn lower_params(insts: &mut Vec<Inst>, params: &[mcc_arena::Symbol]) {
    for (i, &param) in params.iter().enumerate() {
        let src = if i < ARG_REGS.len() {
            Operand::Reg(ARG_REGS[i])
        } else {
            Operand::Stack(16 + 8 * (i - ARG_REGS.len()) as i32)
        };
        insts.push(Inst::mov(OperandSize::Dword, Operand::Pseudo(param), src));
    }
}

/// Select x86 instructions for one IR function.
pub(super) fn lower_function(func: &ir::Function) -> Vec<Inst> {
    let mut insts = Vec::new();
    lower_params(&mut insts, &func.params);

    for ir_inst in func.instructions.iter() {
        match *ir_inst {
            ir::Inst::Return(v) => {
                insts.push(Inst::mov(
                    OperandSize::Dword,
                    Operand::Reg(Reg::Ax),
                    operand(v),
                ));
                insts.push(Inst::Ret);
            }
            ir::Inst::Unary { op, dst, src } => {
                let dst = operand(dst);
                let src = operand(src);
                match op {
                    ir::UnaryOp::Neg => {
                        insts.push(Inst::mov(OperandSize::Dword, dst, src));
                        insts.push(Inst::unary(UnaryOp::Neg, OperandSize::Dword, dst));
                    }
                    ir::UnaryOp::Complement => {
                        insts.push(Inst::mov(OperandSize::Dword, dst, src));
                        insts.push(Inst::unary(UnaryOp::Not, OperandSize::Dword, dst));
                    }
                    ir::UnaryOp::Not => {
                        insts.push(Inst::mov(OperandSize::Dword, dst, Operand::Imm(0)));
                        insts.push(Inst::alu(AluOp::Cmp, OperandSize::Dword, src, Operand::Imm(0)));
                        insts.push(Inst::SetCC {
                            cc: CondCode::E,
                            dst,
                        });
                    }
                }
            }
            ir::Inst::Binary { op, dst, lhs, rhs } => {
                let (dst, lhs, rhs) = (operand(dst), operand(lhs), operand(rhs));
                match op {
                    ir::BinaryOp::Div | ir::BinaryOp::Mod => {
                        select_div_mod(&mut insts, op, dst, lhs, rhs)
                    }
                    op if op.is_comparison() => {
                        select_comparison(&mut insts, cond_code(op), dst, lhs, rhs)
                    }
                    op => select_binary(&mut insts, alu_op(op), dst, lhs, rhs),
                }
            }
            ir::Inst::Copy { dst, src } => {
                insts.push(Inst::mov(OperandSize::Dword, operand(dst), operand(src)));
            }
            ir::Inst::Jump(target) => insts.push(Inst::Jmp(target)),
            ir::Inst::JumpIfZero { cond, target } => {
                insts.push(Inst::alu(
                    AluOp::Cmp,
                    OperandSize::Dword,
                    operand(cond),
                    Operand::Imm(0),
                ));
                insts.push(Inst::JmpCC {
                    cc: CondCode::E,
                    target,
                });
            }
            ir::Inst::JumpIfNotZero { cond, target } => {
                insts.push(Inst::alu(
                    AluOp::Cmp,
                    OperandSize::Dword,
                    operand(cond),
                    Operand::Imm(0),
                ));
                insts.push(Inst::JmpCC {
                    cc: CondCode::Ne,
                    target,
                });
            }
            ir::Inst::Label(name) => insts.push(Inst::Label(name)),
            ir::Inst::Call {
                dst,
                callee,
                ref args,
            } => {
                // Flatten the argument list once so the helpers below can
                // slice it.
                let args: SmallVec<[ir::Value; 8]> = args.iter().copied().collect();
                select_call(&mut insts, operand(dst), callee, &args);
            }
        }
    }

    insts
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcc_arena::StringInterner;

    fn function(
        syms: &mut StringInterner,
        params: &[&str],
        instructions: Vec<ir::Inst>,
    ) -> ir::Function {
        ir::Function {
            name: syms.intern("f"),
            params: params.iter().map(|p| syms.intern(p)).collect(),
            instructions: instructions.into_boxed_slice(),
        }
    }

    #[test]
    fn return_constant() {
        let mut syms = StringInterner::new();
        let func = function(&mut syms, &[], vec![ir::Inst::Return(ir::Value::Const(42))]);
        let insts = lower_function(&func);
        assert_eq!(
            insts,
            vec![
                Inst::mov(OperandSize::Dword, Operand::Reg(Reg::Ax), Operand::Imm(42)),
                Inst::Ret,
            ]
        );
    }

    #[test]
    fn binary_template() {
        let mut syms = StringInterner::new();
        let t = ir::Value::Var(syms.intern("$0"));
        let func = function(
            &mut syms,
            &[],
            vec![ir::Inst::Binary {
                op: ir::BinaryOp::Add,
                dst: t,
                lhs: ir::Value::Const(1),
                rhs: ir::Value::Const(2),
            }],
        );
        let insts = lower_function(&func);
        let p = Operand::Pseudo(syms.intern("$0"));
        assert_eq!(
            insts,
            vec![
                Inst::mov(OperandSize::Dword, p, Operand::Imm(1)),
                Inst::alu(AluOp::Add, OperandSize::Dword, p, Operand::Imm(2)),
            ]
        );
    }

    #[test]
    fn remainder_uses_edx() {
        let mut syms = StringInterner::new();
        let t = ir::Value::Var(syms.intern("$0"));
        let func = function(
            &mut syms,
            &[],
            vec![ir::Inst::Binary {
                op: ir::BinaryOp::Mod,
                dst: t,
                lhs: ir::Value::Const(7),
                rhs: ir::Value::Const(3),
            }],
        );
        let insts = lower_function(&func);
        assert_eq!(insts.len(), 4);
        assert_eq!(insts[1], Inst::Cdq);
        assert_eq!(
            insts[3],
            Inst::mov(
                OperandSize::Dword,
                Operand::Pseudo(syms.intern("$0")),
                Operand::Reg(Reg::Dx)
            )
        );
    }

    #[test]
    fn comparison_clears_then_sets() {
        let mut syms = StringInterner::new();
        let t = ir::Value::Var(syms.intern("$0"));
        let func = function(
            &mut syms,
            &[],
            vec![ir::Inst::Binary {
                op: ir::BinaryOp::Less,
                dst: t,
                lhs: ir::Value::Const(1),
                rhs: ir::Value::Const(2),
            }],
        );
        let insts = lower_function(&func);
        let p = Operand::Pseudo(syms.intern("$0"));
        assert_eq!(insts[0], Inst::mov(OperandSize::Dword, p, Operand::Imm(0)));
        assert_eq!(
            insts[1],
            Inst::alu(AluOp::Cmp, OperandSize::Dword, Operand::Imm(1), Operand::Imm(2))
        );
        assert_eq!(
            insts[2],
            Inst::SetCC {
                cc: CondCode::L,
                dst: p
            }
        );
    }

    #[test]
    fn params_arrive_in_arg_registers() {
        let mut syms = StringInterner::new();
        let func = function(&mut syms, &["x", "y"], vec![]);
        let insts = lower_function(&func);
        assert_eq!(
            insts,
            vec![
                Inst::mov(
                    OperandSize::Dword,
                    Operand::Pseudo(syms.intern("x")),
                    Operand::Reg(Reg::Di)
                ),
                Inst::mov(
                    OperandSize::Dword,
                    Operand::Pseudo(syms.intern("y")),
                    Operand::Reg(Reg::Si)
                ),
            ]
        );
    }

    #[test]
    fn seventh_param_comes_from_the_caller_frame() {
        let mut syms = StringInterner::new();
        let names: Vec<String> = (0..8).map(|i| format!("p{}", i)).collect();
        let params: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
        let func = function(&mut syms, &params, vec![]);
        let insts = lower_function(&func);
        assert_eq!(
            insts[6],
            Inst::mov(
                OperandSize::Dword,
                Operand::Pseudo(syms.intern("p6")),
                Operand::Stack(16)
            )
        );
        assert_eq!(
            insts[7],
            Inst::mov(
                OperandSize::Dword,
                Operand::Pseudo(syms.intern("p7")),
                Operand::Stack(24)
            )
        );
    }

    #[test]
    fn call_moves_args_then_result() {
        let mut syms = StringInterner::new();
        let f = syms.intern("callee");
        let t = ir::Value::Var(syms.intern("$0"));
        let func = function(
            &mut syms,
            &[],
            vec![ir::Inst::Call {
                dst: t,
                callee: f,
                args: Box::new([ir::Value::Const(41)]),
            }],
        );
        let insts = lower_function(&func);
        assert_eq!(
            insts,
            vec![
                Inst::mov(OperandSize::Dword, Operand::Reg(Reg::Di), Operand::Imm(41)),
                Inst::Call(syms.intern("callee")),
                Inst::mov(
                    OperandSize::Dword,
                    Operand::Pseudo(syms.intern("$0")),
                    Operand::Reg(Reg::Ax)
                ),
            ]
        );
    }

    #[test]
    fn call_with_stack_args_keeps_alignment() {
        let mut syms = StringInterner::new();
        let f = syms.intern("callee");
        let t = ir::Value::Var(syms.intern("$0"));
        let args: Vec<ir::Value> = (0..7).map(ir::Value::Const).collect();
        let func = function(
            &mut syms,
            &[],
            vec![ir::Inst::Call {
                dst: t,
                callee: f,
                args: args.into_boxed_slice(),
            }],
        );
        let insts = lower_function(&func);
        // One stack argument: 8 bytes of padding keep the call aligned.
        assert_eq!(
            insts[0],
            Inst::alu(
                AluOp::Sub,
                OperandSize::Qword,
                Operand::Reg(Reg::Sp),
                Operand::Imm(8)
            )
        );
        assert_eq!(insts[7], Inst::Push(Operand::Imm(6)));
        // 8 bytes pushed + 8 bytes padding reclaimed after the call.
        assert_eq!(
            insts[9],
            Inst::alu(
                AluOp::Add,
                OperandSize::Qword,
                Operand::Reg(Reg::Sp),
                Operand::Imm(16)
            )
        );
    }
}
