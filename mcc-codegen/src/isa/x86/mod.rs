//! The x86-64 backend.
//!
//! Code generation for a function runs as three passes over a flat
//! instruction list:
//!
//! 1. `lower`: map each IR instruction to one or more x86 instructions
//!    whose variable operands are still symbolic pseudo registers.
//! 2. `stack`: assign every pseudo register a stack slot relative to the
//!    frame pointer and rewrite the operands.
//! 3. `legalize`: rewrite instructions whose operand combinations are not
//!    encodable on x86-64, materializing scratch registers, and reserve the
//!    frame with a `sub rsp` when the function needs stack space.
//!
//! The passes preserve relative instruction order; assembly text is produced
//! afterwards by [`emit`].

mod args;
mod inst;
mod legalize;
mod lower;
mod stack;

pub mod emit;

pub use self::args::{CondCode, Operand, OperandSize, Reg};
pub use self::inst::{AluOp, Inst, UnaryOp};

use crate::ir;
use mcc_arena::Symbol;

/// A compiled function: a name and its final instruction sequence.
#[derive(Debug, Clone)]
pub struct Function {
    /// The function's linker-visible name.
    pub name: Symbol,
    /// Legalized instructions in emission order.
    pub instructions: Box<[Inst]>,
}

/// A compiled translation unit.
#[derive(Debug, Clone)]
pub struct Program {
    /// Compiled functions in source order.
    pub functions: Box<[Function]>,
}

/// Run the backend passes over one IR function.
pub fn compile_function(func: &ir::Function) -> Function {
    let mut insts = lower::lower_function(func);
    log::debug!(
        "selected {} x86 instructions for function {:?}",
        insts.len(),
        func.name
    );
    let frame_size = stack::replace_pseudo_registers(&mut insts);
    log::debug!("frame size {} bytes", frame_size);
    let insts = legalize::legalize_function(insts, frame_size);
    Function {
        name: func.name,
        instructions: insts.into_boxed_slice(),
    }
}

/// Compile a whole IR program.
pub fn compile_program(program: &ir::Program) -> Program {
    Program {
        functions: program.functions.iter().map(compile_function).collect(),
    }
}
