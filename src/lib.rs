//! Pipeline glue for the mcc compiler.
//!
//! The heavy lifting lives in `mcc-frontend` and `mcc-codegen`; this crate
//! just runs the passes in order and turns pass diagnostics into a rendered
//! error. The `mcc` binary layers file I/O and the external assembler and
//! linker on top; integration tests drive [`compile_to_assembly`] directly.

use mcc_arena::StringInterner;
use mcc_codegen::x86;
use mcc_frontend::diagnostic::{Diagnostic, DiagnosticContext};
use mcc_frontend::lines::LineTable;
use mcc_frontend::{check, lexer, lower, parser, resolve, types};
use target_lexicon::Triple;

pub use mcc_arena;
pub use mcc_codegen;
pub use mcc_frontend;

/// Why a compilation produced no assembly.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// The source contained errors; the payload is the full rendered
    /// diagnostic text, source excerpts included.
    #[error("{0}")]
    Diagnostics(String),
}

/// Render `diagnostics` against their source file.
pub fn render_diagnostics(path: &str, source: &str, diagnostics: &[Diagnostic]) -> String {
    let lines = LineTable::compute(source);
    let context = DiagnosticContext {
        path,
        source,
        lines: &lines,
    };
    context.render_all(diagnostics)
}

/// Compile preprocessed source text to an assembly document for the host.
///
/// Runs the whole pipeline: lex, parse, resolve, type check, IR lowering,
/// and x86-64 code generation. Stops at the first pass that reports
/// diagnostics and returns them rendered.
pub fn compile_to_assembly(path: &str, source: &str) -> Result<String, CompileError> {
    compile_to_assembly_for(path, source, &Triple::host())
}

/// [`compile_to_assembly`], but for an explicit target triple.
pub fn compile_to_assembly_for(
    path: &str,
    source: &str,
    triple: &Triple,
) -> Result<String, CompileError> {
    let fail = |diagnostics: &[Diagnostic]| {
        CompileError::Diagnostics(render_diagnostics(path, source, diagnostics))
    };

    let tokens = lexer::lex(source);

    let mut syms = StringInterner::new();
    let parsed = parser::parse(source, &tokens, &mut syms);
    if !parsed.diagnostics.is_empty() {
        return Err(fail(&parsed.diagnostics));
    }
    let mut tu = parsed.tu;

    let diagnostics = resolve::resolve(&mut tu, &mut syms);
    if !diagnostics.is_empty() {
        return Err(fail(&diagnostics));
    }

    let mut type_pool = types::TypePool::new();
    let diagnostics = check::type_check(&mut tu, &mut type_pool, &syms);
    if !diagnostics.is_empty() {
        return Err(fail(&diagnostics));
    }

    let ir = lower::lower(&tu, &mut syms);
    let program = x86::compile_program(&ir);
    Ok(x86::emit::program_to_string(&program, &syms, triple))
}
