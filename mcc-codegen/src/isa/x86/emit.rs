//! Textual assembly emission.
//!
//! Produces an Intel-syntax document for GNU `as`: a `.intel_syntax
//! noprefix` header, `.globl`/label pairs per function with the standard
//! frame prolog, and on Linux a `.note.GNU-stack` footer marking the stack
//! non-executable. `Ret` expands to the frame teardown. Output is
//! deterministic byte for byte for a given program.

use core::fmt::{self, Write};

use mcc_arena::StringInterner;
use target_lexicon::{OperatingSystem, Triple};

use super::args::{Operand, OperandSize, Reg};
use super::inst::{AluOp, Inst, UnaryOp};
use super::{Function, Program};

fn write_operand(
    w: &mut dyn Write,
    operand: Operand,
    size: OperandSize,
    syms: &StringInterner,
) -> fmt::Result {
    match operand {
        Operand::Imm(value) => write!(w, "{}", value),
        Operand::Reg(reg) => w.write_str(reg.name(size)),
        Operand::Pseudo(_) => unreachable!("pseudo operand survived stack slot assignment"),
        Operand::Stack(offset) => {
            if offset < 0 {
                write!(w, "{} [rbp-{}]", size.ptr_directive(), -offset)
            } else {
                write!(w, "{} [rbp+{}]", size.ptr_directive(), offset)
            }
        }
        Operand::Data(name) => write!(w, "{} {}[rip]", size.ptr_directive(), syms.resolve(name)),
    }
}

fn write_inst(w: &mut dyn Write, inst: &Inst, syms: &StringInterner) -> fmt::Result {
    match *inst {
        Inst::Alu { op, size, dst, src } => {
            write!(w, "  {:<6} ", op.mnemonic())?;
            write_operand(w, dst, size, syms)?;
            w.write_str(", ")?;
            // The count operand of a register shift is the low byte `cl`.
            let src_size = if op.is_shift() && matches!(src, Operand::Reg(_)) {
                OperandSize::Byte
            } else {
                size
            };
            write_operand(w, src, src_size, syms)?;
            writeln!(w)
        }
        Inst::Unary { op, size, operand } => {
            write!(w, "  {:<6} ", op.mnemonic())?;
            write_operand(w, operand, size, syms)?;
            writeln!(w)
        }
        Inst::Cdq => writeln!(w, "  cdq"),
        Inst::Push(operand) => {
            write!(w, "  {:<6} ", "push")?;
            write_operand(w, operand, OperandSize::Qword, syms)?;
            writeln!(w)
        }
        Inst::Call(name) => writeln!(w, "  {:<6} {}", "call", syms.resolve(name)),
        Inst::Jmp(target) => writeln!(w, "  jmp .L{}", syms.resolve(target)),
        Inst::JmpCC { cc, target } => {
            writeln!(w, "  {:<6} .L{}", cc.jump_mnemonic(), syms.resolve(target))
        }
        Inst::SetCC { cc, dst } => {
            write!(w, "  {:<6} ", cc.set_mnemonic())?;
            write_operand(w, dst, OperandSize::Byte, syms)?;
            writeln!(w)
        }
        Inst::Label(name) => writeln!(w, ".L{}:", syms.resolve(name)),
        Inst::Ret => {
            writeln!(w, "  mov    rsp, rbp")?;
            writeln!(w, "  pop    rbp")?;
            writeln!(w, "  ret")
        }
    }
}

fn write_function(w: &mut dyn Write, function: &Function, syms: &StringInterner) -> fmt::Result {
    let name = syms.resolve(function.name);
    writeln!(w, ".globl {}", name)?;
    writeln!(w, "{}:", name)?;
    writeln!(w, "  push   rbp")?;
    writeln!(w, "  mov    rbp, rsp")?;
    for inst in function.instructions.iter() {
        write_inst(w, inst, syms)?;
    }
    Ok(())
}

/// Write the complete assembly document for `program`.
pub fn write_program(
    w: &mut dyn Write,
    program: &Program,
    syms: &StringInterner,
    triple: &Triple,
) -> fmt::Result {
    writeln!(w, ".intel_syntax noprefix")?;
    for function in program.functions.iter() {
        write_function(w, function, syms)?;
    }
    if triple.operating_system == OperatingSystem::Linux {
        // Marks the object as not needing an executable stack.
        writeln!(w, ".section .note.GNU-stack,\"\",@progbits")?;
    }
    Ok(())
}

/// Render `program` to a string.
pub fn program_to_string(program: &Program, syms: &StringInterner, triple: &Triple) -> String {
    let mut out = String::new();
    write_program(&mut out, program, syms, triple)
        .expect("formatting to a string cannot fail");
    out
}

#[cfg(test)]
mod tests {
    use super::super::args::CondCode;
    use super::*;
    use std::str::FromStr;

    fn linux() -> Triple {
        Triple::from_str("x86_64-unknown-linux-gnu").unwrap()
    }

    fn macos() -> Triple {
        Triple::from_str("x86_64-apple-darwin").unwrap()
    }

    #[test]
    fn return_42() {
        let mut syms = StringInterner::new();
        let main = syms.intern("main");
        let program = Program {
            functions: Box::new([Function {
                name: main,
                instructions: Box::new([
                    Inst::mov(OperandSize::Dword, Operand::Reg(Reg::Ax), Operand::Imm(42)),
                    Inst::Ret,
                ]),
            }]),
        };
        let text = program_to_string(&program, &syms, &linux());
        assert_eq!(
            text,
            "\
.intel_syntax noprefix
.globl main
main:
  push   rbp
  mov    rbp, rsp
  mov    eax, 42
  mov    rsp, rbp
  pop    rbp
  ret
.section .note.GNU-stack,\"\",@progbits
"
        );
    }

    #[test]
    fn gnu_stack_footer_is_linux_only() {
        let syms = StringInterner::new();
        let program = Program {
            functions: Box::new([]),
        };
        let on_linux = program_to_string(&program, &syms, &linux());
        let on_mac = program_to_string(&program, &syms, &macos());
        assert!(on_linux.contains(".note.GNU-stack"));
        assert!(!on_mac.contains(".note.GNU-stack"));
    }

    #[test]
    fn stack_operands_use_size_directives() {
        let mut out = String::new();
        let syms = StringInterner::new();
        write_inst(
            &mut out,
            &Inst::mov(OperandSize::Dword, Operand::Stack(-4), Operand::Imm(1)),
            &syms,
        )
        .unwrap();
        assert_eq!(out, "  mov    dword ptr [rbp-4], 1\n");
    }

    #[test]
    fn incoming_stack_arguments_render_above_rbp() {
        let mut out = String::new();
        let syms = StringInterner::new();
        write_inst(
            &mut out,
            &Inst::mov(OperandSize::Dword, Operand::Reg(Reg::Ax), Operand::Stack(16)),
            &syms,
        )
        .unwrap();
        assert_eq!(out, "  mov    eax, dword ptr [rbp+16]\n");
    }

    #[test]
    fn setcc_uses_byte_registers() {
        let mut out = String::new();
        let syms = StringInterner::new();
        write_inst(
            &mut out,
            &Inst::SetCC {
                cc: CondCode::Le,
                dst: Operand::Reg(Reg::Ax),
            },
            &syms,
        )
        .unwrap();
        assert_eq!(out, "  setle  al\n");
    }

    #[test]
    fn register_shift_count_renders_as_cl() {
        let mut out = String::new();
        let syms = StringInterner::new();
        write_inst(
            &mut out,
            &Inst::alu(
                AluOp::Sar,
                OperandSize::Dword,
                Operand::Stack(-4),
                Operand::Reg(Reg::Cx),
            ),
            &syms,
        )
        .unwrap();
        assert_eq!(out, "  sar    dword ptr [rbp-4], cl\n");
    }

    #[test]
    fn conditional_jumps_and_labels() {
        let mut syms = StringInterner::new();
        let l = syms.intern("end.0");
        let mut out = String::new();
        write_inst(
            &mut out,
            &Inst::JmpCC {
                cc: CondCode::Ne,
                target: l,
            },
            &syms,
        )
        .unwrap();
        write_inst(&mut out, &Inst::Label(l), &syms).unwrap();
        write_inst(&mut out, &Inst::Jmp(l), &syms).unwrap();
        assert_eq!(out, "  jne    .Lend.0\n.Lend.0:\n  jmp .Lend.0\n");
    }

    #[test]
    fn idiv_of_divisor_register() {
        let mut out = String::new();
        let syms = StringInterner::new();
        write_inst(
            &mut out,
            &Inst::unary(UnaryOp::Idiv, OperandSize::Dword, Operand::Reg(Reg::R10)),
            &syms,
        )
        .unwrap();
        assert_eq!(out, "  idiv   r10d\n");
    }
}
