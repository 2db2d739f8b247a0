//! Instruction legalization.
//!
//! The selector's templates are oblivious to x86-64 encoding restrictions;
//! after stack slot assignment most operands are memory, and several of the
//! produced forms cannot be encoded. This pass rewrites each offending
//! instruction into an equivalent sequence:
//!
//! - `mov`/`add`/`sub`/`and`/`or`/`xor` with two memory operands route the
//!   source through `r10d`.
//! - `imul` cannot write to memory: the product is computed in `r11d` and
//!   stored back.
//! - `idiv` cannot take an immediate: it is materialized in `r10d`.
//! - shift counts that are not immediates are moved into `cl`.
//! - `cmp` cannot have an immediate first operand nor two memory operands:
//!   the first operand goes through `r10d`.
//!
//! When the function owns stack slots, a `sub rsp, S` is prepended to
//! reserve the frame.

use smallvec::SmallVec;

use super::args::{Operand, OperandSize, Reg};
use super::inst::{AluOp, Inst, UnaryOp};

fn scratch(reg: Reg) -> Operand {
    Operand::Reg(reg)
}

/// Legalize one instruction into `out`.
fn legalize_inst(out: &mut SmallVec<[Inst; 4]>, inst: Inst) {
    match inst {
        Inst::Alu { op, size, dst, src } => match op {
            AluOp::Mov | AluOp::Add | AluOp::Sub | AluOp::And | AluOp::Or | AluOp::Xor => {
                if dst.is_memory() && src.is_memory() {
                    out.push(Inst::mov(size, scratch(Reg::R10), src));
                    out.push(Inst::alu(op, size, dst, scratch(Reg::R10)));
                } else {
                    out.push(inst);
                }
            }
            AluOp::Imul => {
                if dst.is_memory() {
                    out.push(Inst::mov(size, scratch(Reg::R11), dst));
                    out.push(Inst::alu(AluOp::Imul, size, scratch(Reg::R11), src));
                    out.push(Inst::mov(size, dst, scratch(Reg::R11)));
                } else {
                    out.push(inst);
                }
            }
            AluOp::Shl | AluOp::Sar => {
                if src.is_immediate() || src == Operand::Reg(Reg::Cx) {
                    out.push(inst);
                } else {
                    out.push(Inst::mov(OperandSize::Byte, scratch(Reg::Cx), src));
                    out.push(Inst::alu(op, size, dst, scratch(Reg::Cx)));
                }
            }
            AluOp::Cmp => {
                let first_is_immediate = dst.is_immediate();
                let both_are_memory = dst.is_memory() && src.is_memory();
                if first_is_immediate || both_are_memory {
                    out.push(Inst::mov(size, scratch(Reg::R10), dst));
                    out.push(Inst::alu(AluOp::Cmp, size, scratch(Reg::R10), src));
                } else {
                    out.push(inst);
                }
            }
        },
        Inst::Unary {
            op: UnaryOp::Idiv,
            size,
            operand,
        } if operand.is_immediate() => {
            out.push(Inst::mov(size, scratch(Reg::R10), operand));
            out.push(Inst::unary(UnaryOp::Idiv, size, scratch(Reg::R10)));
        }
        _ => out.push(inst),
    }
}

/// Legalize a whole function, reserving `frame_size` bytes of stack.
pub(super) fn legalize_function(insts: Vec<Inst>, frame_size: u32) -> Vec<Inst> {
    let mut result = Vec::with_capacity(insts.len() + 1);
    if frame_size > 0 {
        result.push(Inst::alu(
            AluOp::Sub,
            OperandSize::Qword,
            Operand::Reg(Reg::Sp),
            Operand::Imm(frame_size as i32),
        ));
    }
    let mut buf: SmallVec<[Inst; 4]> = SmallVec::new();
    for inst in insts {
        buf.clear();
        legalize_inst(&mut buf, inst);
        result.extend(buf.drain(..));
    }
    result
}
