//! mcc code generation library.
//!
//! This crate owns the back half of the mcc pipeline: the three-address
//! intermediate representation produced by the frontend ([`ir`]), and the
//! x86-64 backend that selects instructions for it, assigns pseudo registers
//! to stack slots, legalizes operand combinations, and writes Intel-syntax
//! assembly ([`isa::x86`]).

#![deny(missing_docs, trivial_numeric_casts, unused_extern_crates)]
#![warn(unused_import_braces)]

pub mod ir;
pub mod isa;

pub use crate::isa::x86;

/// Version number of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
