//! The `mcc` driver.
//!
//! Thin glue around the compiler libraries: preprocess with the system C
//! compiler, run the pipeline (stopping early for the dump options), then
//! hand the assembly to `as` and `cc`. Exit status 0 means success, 1 means
//! the source failed to compile, and 2 means an I/O or tool failure.

use std::path::{Path, PathBuf};
use std::process::{self, Command};

use anyhow::{bail, Context};
use clap::Parser;

use mcc_tools::mcc_arena::StringInterner;
use mcc_tools::mcc_frontend::token::TokenKind;
use mcc_tools::mcc_frontend::{check, lexer, lines, lower, parser, print, resolve, types};
use mcc_tools::{render_diagnostics, CompileError};

/// A compiler for a small subset of C.
#[derive(Parser)]
#[command(name = "mcc", version)]
struct Options {
    /// The C source file to compile.
    source_file: PathBuf,

    /// Stop after lexing and dump the tokens.
    #[arg(long)]
    lex: bool,

    /// Stop after parsing and dump the AST.
    #[arg(long)]
    parse: bool,

    /// Stop after IR generation and dump the IR.
    #[arg(long, alias = "tacky")]
    ir: bool,

    /// Dump the generated assembly to stdout instead of writing files.
    #[arg(long)]
    codegen: bool,

    /// Emit an assembly file only; do not assemble or link.
    #[arg(short = 'S')]
    assembly_only: bool,

    /// Emit an object file only; do not link.
    #[arg(short = 'c')]
    no_link: bool,
}

fn main() {
    env_logger::init();
    let options = Options::parse();
    match run(&options) {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("mcc: error: {:#}", err);
            process::exit(2);
        }
    }
}

/// Run an external tool, failing when it exits nonzero.
fn run_tool(command: &mut Command) -> anyhow::Result<()> {
    let program = command.get_program().to_string_lossy().to_string();
    let status = command
        .status()
        .with_context(|| format!("failed to run '{}'", program))?;
    if !status.success() {
        bail!("'{}' exited with {}", program, status);
    }
    Ok(())
}

/// Preprocess the input with the system C compiler.
fn preprocess(path: &Path) -> anyhow::Result<String> {
    let output = Command::new("cc")
        .arg("-E")
        .arg("-P")
        .arg(path)
        .arg("-o")
        .arg("-")
        .output()
        .context("failed to run the preprocessor 'cc -E'")?;
    if !output.status.success() {
        bail!("preprocessor exited with {}", output.status);
    }
    String::from_utf8(output.stdout).context("preprocessed source is not UTF-8")
}

fn with_extension(path: &Path, extension: &str) -> PathBuf {
    path.with_extension(extension)
}

fn run(options: &Options) -> anyhow::Result<i32> {
    let path = options.source_file.as_path();
    let path_display = path.display().to_string();
    let source = preprocess(path)?;

    let tokens = lexer::lex(&source);

    if options.lex {
        let table = lines::LineTable::compute(&source);
        let mut saw_error = false;
        for token in tokens.iter() {
            let lc = table.line_and_column(token.loc.offset);
            println!("{}:{} {:?} {:?}", lc.line, lc.column, token.kind, token.text(&source));
            if matches!(token.kind, TokenKind::Error(_)) {
                saw_error = true;
            }
        }
        return Ok(if saw_error { 1 } else { 0 });
    }

    if options.parse || options.ir {
        // Staged pipeline for the dump options.
        let mut syms = StringInterner::new();
        let parsed = parser::parse(&source, &tokens, &mut syms);
        if !parsed.diagnostics.is_empty() {
            eprint!("{}", render_diagnostics(&path_display, &source, &parsed.diagnostics));
            return Ok(1);
        }
        let mut tu = parsed.tu;

        if options.parse {
            print!("{}", print::print(&tu, &syms));
            return Ok(0);
        }

        let diagnostics = resolve::resolve(&mut tu, &mut syms);
        if !diagnostics.is_empty() {
            eprint!("{}", render_diagnostics(&path_display, &source, &diagnostics));
            return Ok(1);
        }
        let mut type_pool = types::TypePool::new();
        let diagnostics = check::type_check(&mut tu, &mut type_pool, &syms);
        if !diagnostics.is_empty() {
            eprint!("{}", render_diagnostics(&path_display, &source, &diagnostics));
            return Ok(1);
        }

        let ir = lower::lower(&tu, &mut syms);
        print!("{}", ir.display(&syms));
        return Ok(0);
    }

    let assembly = match mcc_tools::compile_to_assembly(&path_display, &source) {
        Ok(assembly) => assembly,
        Err(CompileError::Diagnostics(rendered)) => {
            eprint!("{}", rendered);
            return Ok(1);
        }
    };

    if options.codegen {
        print!("{}", assembly);
        return Ok(0);
    }

    let asm_path = with_extension(path, "s");
    std::fs::write(&asm_path, &assembly)
        .with_context(|| format!("cannot write '{}'", asm_path.display()))?;
    if options.assembly_only {
        return Ok(0);
    }

    let obj_path = with_extension(path, "o");
    run_tool(
        Command::new("as")
            .arg("-c")
            .arg(&asm_path)
            .arg("-o")
            .arg(&obj_path)
            .arg("-msyntax=intel")
            .arg("-mnaked-reg"),
    )?;
    if options.no_link {
        return Ok(0);
    }

    let exe_path = path.with_extension("");
    run_tool(
        Command::new("cc")
            .arg(&obj_path)
            .arg("-o")
            .arg(&exe_path),
    )?;
    Ok(0)
}
