//! mcc compiler frontend.
//!
//! Everything between source text and the three-address IR lives here:
//!
//! - [`lexer`] turns bytes into a token array,
//! - [`parser`] builds the entity-pooled AST in [`ast`],
//! - [`resolve`] links identifier uses to their declarations and
//!   alpha-renames shadowed variables,
//! - [`check`] validates and annotates types,
//! - [`lower`] emits `mcc_codegen::ir` from the typed AST.
//!
//! Each pass collects user-facing problems as [`diagnostic::Diagnostic`]
//! values rather than failing fast; the driver decides when to stop.

pub mod ast;
pub mod check;
pub mod diagnostic;
pub mod lexer;
pub mod lines;
pub mod lower;
pub mod parser;
pub mod print;
pub mod resolve;
pub mod srcloc;
pub mod token;
pub mod types;

pub use crate::diagnostic::Diagnostic;
pub use crate::srcloc::{SourceLoc, SourceRange};
