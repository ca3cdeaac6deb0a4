use crate::language::lexer::LexError;
use crate::language::span::Span;
use miette::SourceSpan;

/// Parse-phase error with an optional hint line. Errors are collected rather
/// than thrown: the parser recovers at statement boundaries, so one pass
/// reports every syntax problem in a file.
#[derive(Clone, Debug)]
pub struct SyntaxError {
    pub message: String,
    pub span: Span,
    pub help: Option<String>,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            help: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Label for the rendered report. A zero-width span widens to one byte so
    /// the caret has a character to sit under.
    pub fn to_source_span(&self) -> SourceSpan {
        (self.span.start, self.span.len().max(1)).into()
    }
}

#[derive(Clone, Debug, Default)]
pub struct SyntaxErrors {
    pub errors: Vec<SyntaxError>,
}

impl SyntaxErrors {
    pub fn new(errors: Vec<SyntaxError>) -> Self {
        Self { errors }
    }
}

/// Scanner errors surface through the same reporting path as parse errors.
impl From<Vec<LexError>> for SyntaxErrors {
    fn from(errors: Vec<LexError>) -> Self {
        Self {
            errors: errors
                .into_iter()
                .map(|err| SyntaxError::new(err.message, err.span))
                .collect(),
        }
    }
}
