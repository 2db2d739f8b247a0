//! Stack slot assignment for pseudo registers.
//!
//! Walks a function twice: the first pass assigns each distinct pseudo
//! register the next dword slot below the frame pointer (`-4`, `-8`, ...),
//! in order of first appearance; the second pass rewrites every pseudo
//! operand to its slot. The returned frame size is rounded up to 16 bytes so
//! the stack stays ABI-aligned at any later call site.

use mcc_arena::Symbol;
use mcc_entity::SecondaryMap;

use super::args::Operand;
use super::inst::Inst;

/// Apply `f` to every operand of `inst`.
fn visit_operands(inst: &mut Inst, mut f: impl FnMut(&mut Operand)) {
    match inst {
        Inst::Alu { dst, src, .. } => {
            f(dst);
            f(src);
        }
        Inst::Unary { operand, .. } => f(operand),
        Inst::SetCC { dst, .. } => f(dst),
        Inst::Push(operand) => f(operand),
        Inst::Cdq
        | Inst::Call(_)
        | Inst::Jmp(_)
        | Inst::JmpCC { .. }
        | Inst::Label(_)
        | Inst::Ret => {}
    }
}

/// Replace all pseudo registers with stack slots and return the frame size
/// in bytes.
pub(super) fn replace_pseudo_registers(insts: &mut [Inst]) -> u32 {
    // Slot offsets keyed by pseudo name; 0 marks "not assigned yet" since
    // real offsets start at 4.
    let mut offsets: SecondaryMap<Symbol, u32> = SecondaryMap::new();
    let mut slot_count: u32 = 0;

    for inst in insts.iter_mut() {
        visit_operands(inst, |operand| {
            if let Operand::Pseudo(name) = *operand {
                if offsets[name] == 0 {
                    slot_count += 1;
                    offsets[name] = slot_count * 4;
                }
            }
        });
    }

    for inst in insts.iter_mut() {
        visit_operands(inst, |operand| {
            if let Operand::Pseudo(name) = *operand {
                *operand = Operand::Stack(-(offsets[name] as i32));
            }
        });
    }

    (slot_count * 4 + 15) & !15
}

#[cfg(test)]
mod tests {
    use super::super::args::{OperandSize, Reg};
    use super::super::inst::AluOp;
    use super::*;
    use mcc_arena::StringInterner;

    #[test]
    fn slots_are_assigned_in_first_use_order() {
        let mut syms = StringInterner::new();
        let a = syms.intern("$0");
        let b = syms.intern("$1");
        let mut insts = vec![
            Inst::mov(OperandSize::Dword, Operand::Pseudo(a), Operand::Imm(1)),
            Inst::mov(OperandSize::Dword, Operand::Pseudo(b), Operand::Pseudo(a)),
        ];
        let frame = replace_pseudo_registers(&mut insts);
        assert_eq!(frame, 16);
        assert_eq!(
            insts,
            vec![
                Inst::mov(OperandSize::Dword, Operand::Stack(-4), Operand::Imm(1)),
                Inst::mov(OperandSize::Dword, Operand::Stack(-8), Operand::Stack(-4)),
            ]
        );
    }

    #[test]
    fn no_pseudo_operand_survives() {
        let mut syms = StringInterner::new();
        let names: Vec<Symbol> = (0..5).map(|i| syms.intern(&format!("${}", i))).collect();
        let mut insts: Vec<Inst> = names
            .iter()
            .map(|&n| Inst::alu(AluOp::Add, OperandSize::Dword, Operand::Pseudo(n), Operand::Pseudo(n)))
            .collect();
        let frame = replace_pseudo_registers(&mut insts);
        // Five dword slots round up to 32 bytes.
        assert_eq!(frame, 32);
        for inst in insts.iter_mut() {
            visit_operands(inst, |operand| {
                match *operand {
                    Operand::Pseudo(_) => panic!("pseudo operand survived"),
                    Operand::Stack(offset) => {
                        assert!(offset < 0);
                        let below = (-offset) as u32;
                        assert_eq!(below % 4, 0);
                        assert!(below <= frame);
                    }
                    _ => {}
                }
            });
        }
    }

    #[test]
    fn registers_and_immediates_are_untouched() {
        let mut insts = vec![Inst::mov(
            OperandSize::Dword,
            Operand::Reg(Reg::Ax),
            Operand::Imm(3),
        )];
        let frame = replace_pseudo_registers(&mut insts);
        assert_eq!(frame, 0);
        assert_eq!(
            insts[0],
            Inst::mov(OperandSize::Dword, Operand::Reg(Reg::Ax), Operand::Imm(3))
        );
    }

    #[test]
    fn frame_size_is_rounded_to_sixteen() {
        for (count, expect) in [(0u32, 0u32), (1, 16), (4, 16), (5, 32), (8, 32), (9, 48)] {
            let mut syms = StringInterner::new();
            let mut insts: Vec<Inst> = (0..count)
                .map(|i| {
                    let n = syms.intern(&format!("${}", i));
                    Inst::mov(OperandSize::Dword, Operand::Pseudo(n), Operand::Imm(0))
                })
                .collect();
            assert_eq!(replace_pseudo_registers(&mut insts), expect);
        }
    }
}
