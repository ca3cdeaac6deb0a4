use crate::language::span::Span;
use miette::SourceSpan;

/// Taxonomy of static findings. The checker is advisory: diagnostics are
/// collected and reported, execution proceeds regardless.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeErrorKind {
    ArgumentTypeMismatch,
    ArityMismatch,
    UndefinedIdentifier,
    InvalidIndexAccess,
    InvalidPropertyAccess,
    IncompatibleArithmetic,
    IncompatibleComparison,
    ReturnTypeMismatch,
    NotCallable,
}

impl TypeErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            TypeErrorKind::ArgumentTypeMismatch => "arg-type",
            TypeErrorKind::ArityMismatch => "arity",
            TypeErrorKind::UndefinedIdentifier => "undefined-name",
            TypeErrorKind::InvalidIndexAccess => "bad-index",
            TypeErrorKind::InvalidPropertyAccess => "bad-property",
            TypeErrorKind::IncompatibleArithmetic => "bad-arithmetic",
            TypeErrorKind::IncompatibleComparison => "bad-comparison",
            TypeErrorKind::ReturnTypeMismatch => "return-type",
            TypeErrorKind::NotCallable => "not-callable",
        }
    }
}

#[derive(Clone, Debug)]
pub struct TypeDiagnostic {
    pub kind: TypeErrorKind,
    pub span: Span,
    pub message: String,
    pub help: Option<String>,
}

impl TypeDiagnostic {
    pub fn new(kind: TypeErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
            help: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn display_message(&self) -> String {
        format!("[{}] {}", self.kind.code(), self.message)
    }

    pub fn to_source_span(&self) -> SourceSpan {
        (self.span.start, self.span.len().max(1)).into()
    }
}

mod checker;

pub use checker::check_program;
