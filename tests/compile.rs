//! End-to-end pipeline tests: source text in, assembly text out.

use std::str::FromStr;

use target_lexicon::Triple;

use mcc_tools::{compile_to_assembly_for, CompileError};

fn linux() -> Triple {
    Triple::from_str("x86_64-unknown-linux-gnu").unwrap()
}

fn compile(source: &str) -> String {
    compile_to_assembly_for("test.c", source, &linux()).expect("program should compile")
}

fn compile_err(source: &str) -> String {
    match compile_to_assembly_for("test.c", source, &linux()) {
        Ok(_) => panic!("program should not compile"),
        Err(CompileError::Diagnostics(rendered)) => rendered,
    }
}

#[test]
fn return_constant() {
    let asm = compile("int main(void) { return 42; }");
    assert!(asm.starts_with(".intel_syntax noprefix\n"), "{}", asm);
    assert!(asm.contains(".globl main\n"), "{}", asm);
    let ret_seq = "  mov    eax, 42\n  mov    rsp, rbp\n  pop    rbp\n  ret\n";
    assert!(asm.contains(ret_seq), "{}", asm);
    assert!(asm.ends_with(".section .note.GNU-stack,\"\",@progbits\n"), "{}", asm);
}

#[test]
fn arithmetic_precedence() {
    // 1 + 2 * 3: the multiplication happens first into a temporary.
    let asm = compile("int main(void) { return 1 + 2 * 3; }");
    let imul = asm.find("imul").expect("imul missing");
    let add = asm.find("add").expect("add missing");
    assert!(imul < add, "{}", asm);
}

#[test]
fn block_scoped_shadowing() {
    let asm = compile("int main(void) { int a = 1; { int a = 2; return a; } }");
    // Two distinct stack slots: the outer and the shadowing inner variable.
    assert!(asm.contains("dword ptr [rbp-4]"), "{}", asm);
    assert!(asm.contains("dword ptr [rbp-8]"), "{}", asm);
}

#[test]
fn function_call_through_edi() {
    let asm = compile("int f(int x) { return x + 1; } int main(void) { return f(41); }");
    assert!(asm.contains(".globl f\n"), "{}", asm);
    assert!(asm.contains("  mov    edi, 41\n"), "{}", asm);
    assert!(asm.contains("  call   f\n"), "{}", asm);
    // The callee reads its parameter out of edi.
    assert!(asm.contains("edi"), "{}", asm);
}

#[test]
fn short_circuit_and() {
    let asm = compile("int main(void) { return 1 && 2; }");
    // Two compares against zero and the two result labels.
    assert_eq!(asm.matches("  cmp    ").count(), 2, "{}", asm);
    assert!(asm.contains(".Land.false.0:"), "{}", asm);
    assert!(asm.contains(".Land.end.1:"), "{}", asm);
    assert!(asm.contains("  je     .Land.false.0\n"), "{}", asm);
}

#[test]
fn syntax_error_has_no_assembly_and_points_at_the_semicolon() {
    let rendered = compile_err("int main(void) { return 1 + ; }");
    assert!(rendered.contains("test.c:1:29: Error: expected expression"), "{}", rendered);
    assert!(rendered.contains("1 | int main(void) { return 1 + ; }"), "{}", rendered);
    // The caret sits under the `;`, 28 columns into the line.
    let underline = format!("  | {}^", " ".repeat(28));
    assert!(rendered.contains(&underline), "{}", rendered);
}

#[test]
fn semantic_errors_stop_the_pipeline() {
    let rendered = compile_err("int main(void) { return b; }");
    assert!(rendered.contains("use of undeclared identifier 'b'"), "{}", rendered);

    let rendered = compile_err("int f(void); int main(void) { return f + 1; }");
    assert!(
        rendered.contains("invalid operands to binary expression"),
        "{}",
        rendered
    );
}

#[test]
fn loops_compile() {
    let asm = compile(
        "int main(void) {
             int acc = 0;
             for (int i = 1; i <= 10; i = i + 1) acc = acc + i;
             while (acc > 100) acc = acc - 1;
             do acc = acc + 0; while (0);
             return acc;
         }",
    );
    assert!(asm.contains(".Lfor.start.0:"), "{}", asm);
    assert!(asm.contains("  jmp .Lfor.start.0\n"), "{}", asm);
    assert!(asm.contains(".Lwhile.start"), "{}", asm);
    assert!(asm.contains(".Ldo.start"), "{}", asm);
}

#[test]
fn ternary_and_comparisons() {
    let asm = compile("int main(void) { int a = 3; return a < 5 ? 1 : 2; }");
    assert!(asm.contains("  setl   "), "{}", asm);
    assert!(asm.contains(".Lcond.else"), "{}", asm);
}

#[test]
fn frame_is_reserved_and_aligned() {
    let asm = compile("int main(void) { int a = 1; int b = 2; return a + b; }");
    // Three dword slots (a, b, and the sum temporary) round up to 16.
    assert!(asm.contains("  sub    rsp, 16\n"), "{}", asm);
}

#[test]
fn gnu_stack_footer_only_on_linux() {
    let mac = Triple::from_str("x86_64-apple-darwin").unwrap();
    let asm = compile_to_assembly_for("test.c", "int main(void) { return 0; }", &mac).unwrap();
    assert!(!asm.contains(".note.GNU-stack"), "{}", asm);
}

#[test]
fn pipeline_is_deterministic() {
    let source = "
        int mul(int a, int b) { return a * b; }
        int main(void) {
            int acc = 0;
            for (int i = 0; i < 4; i = i + 1) acc = acc + mul(i, i);
            return acc && 1 ? acc % 7 : -acc;
        }";
    let first = compile(source);
    let second = compile(source);
    assert_eq!(first, second);
}

#[test]
fn division_uses_cdq_and_idiv() {
    let asm = compile("int main(void) { return 7 / 2; }");
    assert!(asm.contains("  cdq\n"), "{}", asm);
    assert!(asm.contains("  idiv   "), "{}", asm);
    // The quotient is read out of eax.
    assert!(asm.contains("  mov    eax, 7\n"), "{}", asm);
}

#[test]
fn remainder_reads_edx() {
    let asm = compile("int main(void) { return 7 % 2; }");
    assert!(asm.contains("edx"), "{}", asm);
}

#[test]
fn shifts_by_a_variable_go_through_cl() {
    let asm = compile("int main(void) { int n = 2; return 1 << n; }");
    assert!(asm.contains(", cl\n"), "{}", asm);
}
