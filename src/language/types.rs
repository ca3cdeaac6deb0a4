use crate::language::span::Span;

/// Annotation surface for parameters, `let` bindings and return positions.
/// Annotations are hints for the static checker; the interpreter never looks
/// at them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeExpr {
    Number,
    String,
    Bool,
    Null,
    Array,
    Object,
    Function,
    Any,
}

impl TypeExpr {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "number" => Some(TypeExpr::Number),
            "string" => Some(TypeExpr::String),
            "bool" => Some(TypeExpr::Bool),
            "null" => Some(TypeExpr::Null),
            "array" => Some(TypeExpr::Array),
            "object" => Some(TypeExpr::Object),
            "function" => Some(TypeExpr::Function),
            "any" => Some(TypeExpr::Any),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TypeAnnotation {
    pub ty: TypeExpr,
    pub span: Span,
}
