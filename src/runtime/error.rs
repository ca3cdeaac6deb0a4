use thiserror::Error;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[derive(Clone, Debug, Error)]
pub enum RuntimeError {
    #[error("Undefined variable `{name}`")]
    UndefinedVariable { name: String },
    #[error("Value of type `{type_name}` is not an object")]
    NotAnObject { type_name: &'static str },
    #[error("Value of type `{type_name}` cannot be indexed")]
    NotIndexable { type_name: &'static str },
    #[error("Value of type `{type_name}` is not callable")]
    NotCallable { type_name: &'static str },
    #[error("Index {index} is out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },
    #[error("Invalid assignment target: {message}")]
    InvalidTarget { message: String },
    #[error("Type mismatch: {message}")]
    TypeMismatch { message: String },
    #[error("Unknown module `{name}`")]
    UnknownModule { name: String },
    #[error("`{module}.{name}` failed: {message}")]
    HostError {
        module: String,
        name: String,
        message: String,
    },
}
