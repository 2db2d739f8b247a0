//! Instruction set architectures.
//!
//! Only x86-64 is supported; the module boundary keeps ISA-specific types
//! out of the IR.

pub mod x86;
