pub mod environment;
pub mod error;
pub mod host;
pub mod interpreter;
pub mod value;

pub use interpreter::Interpreter;
