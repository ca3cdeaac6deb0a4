use crate::language::ast::Program;
use crate::language::parser::parse_program;
use crate::language::typecheck::{check_program, TypeDiagnostic, TypeErrorKind};
use crate::runtime::error::RuntimeError;
use crate::runtime::Interpreter;

mod interpreter;
mod parser;

fn parse(source: &str) -> Program {
    match parse_program(source) {
        Ok(program) => program,
        Err(errors) => panic!("unexpected syntax errors: {:#?}", errors.errors),
    }
}

fn run(source: &str) -> (Vec<String>, Vec<RuntimeError>) {
    let program = parse(source);
    let mut interp = Interpreter::with_captured_output();
    let outcome = interp.run(&program);
    (interp.take_output(), outcome.errors)
}

fn run_ok(source: &str) -> Vec<String> {
    let (output, errors) = run(source);
    assert!(errors.is_empty(), "unexpected runtime errors: {errors:#?}");
    output
}

fn check(source: &str) -> Vec<TypeDiagnostic> {
    check_program(&parse(source))
}

fn kinds(diagnostics: &[TypeDiagnostic]) -> Vec<TypeErrorKind> {
    diagnostics.iter().map(|d| d.kind).collect()
}
