use crate::{
    language::{errors::SyntaxError, typecheck::TypeDiagnostic},
    runtime::error::RuntimeError,
};
use miette::{Diagnostic, NamedSource, Report, SourceSpan};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic, Clone)]
#[error("{message}")]
pub struct SyntaxReport {
    #[source_code]
    src: NamedSource<String>,
    #[label("{message}")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
    message: String,
}

impl SyntaxReport {
    pub fn from_error(src: NamedSource<String>, err: SyntaxError) -> Self {
        Self {
            src,
            span: err.to_source_span(),
            help: err.help.clone(),
            message: err.message,
        }
    }
}

#[derive(Debug, Error, Diagnostic, Clone)]
#[error("{message}")]
pub struct TypeReport {
    #[source_code]
    src: NamedSource<String>,
    #[label("{message}")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
    message: String,
}

impl TypeReport {
    pub fn from_diagnostic(src: NamedSource<String>, diagnostic: TypeDiagnostic) -> Self {
        Self {
            src,
            span: diagnostic.to_source_span(),
            help: diagnostic.help.clone(),
            message: diagnostic.display_message(),
        }
    }
}

pub fn emit_syntax_errors(path: &Path, source: &str, errors: &[SyntaxError]) {
    for err in errors {
        let src = NamedSource::new(path.display().to_string(), source.to_string());
        let report = SyntaxReport::from_error(src, err.clone());
        eprintln!("{:?}", Report::new(report));
    }
}

pub fn emit_type_diagnostics(path: &Path, source: &str, diagnostics: &[TypeDiagnostic]) {
    for diagnostic in diagnostics {
        let src = NamedSource::new(path.display().to_string(), source.to_string());
        let report = TypeReport::from_diagnostic(src, diagnostic.clone());
        eprintln!("{:?}", Report::new(report));
    }
}

pub fn report_runtime_error(error: &RuntimeError) {
    eprintln!("Runtime error: {error}");
}

pub fn report_io_error(path: &Path, error: &std::io::Error) {
    eprintln!("Failed to access {}: {}", path.display(), error);
}
