use maple_lang::diagnostics;
use maple_lang::language::{parser::parse_program, typecheck::check_program};
use maple_lang::runtime::Interpreter;
use std::env;
use std::fs;
use std::path::Path;
use std::process;

fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    if args.len() != 3 {
        eprintln!("Usage: maple [run|check] <filename.ml>");
        process::exit(1);
    }

    let command = &args[1];
    let filename = &args[2];
    let path = Path::new(filename);

    if !filename.ends_with(".ml") {
        eprintln!("Invalid file extension. Only .ml files are allowed.");
        process::exit(1);
    }

    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            diagnostics::report_io_error(path, &err);
            process::exit(1);
        }
    };

    let program = match parse_program(&source) {
        Ok(program) => program,
        Err(errors) => {
            diagnostics::emit_syntax_errors(path, &source, &errors.errors);
            process::exit(1);
        }
    };

    let findings = check_program(&program);

    match command.as_str() {
        "check" => {
            diagnostics::emit_type_diagnostics(path, &source, &findings);
            if findings.is_empty() {
                println!("No type errors found.");
            } else {
                println!("{} type error(s) found.", findings.len());
                process::exit(1);
            }
        }
        "run" => {
            // Diagnostics are advisory: report them, then run anyway.
            diagnostics::emit_type_diagnostics(path, &source, &findings);
            let mut interpreter = Interpreter::new();
            let outcome = interpreter.run(&program);
            for err in &outcome.errors {
                diagnostics::report_runtime_error(err);
            }
            if !outcome.is_clean() {
                process::exit(1);
            }
        }
        _ => {
            eprintln!("Invalid command. Usage: maple [run|check] <filename.ml>");
            process::exit(1);
        }
    }
}
