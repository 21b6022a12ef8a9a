use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LowerError {
    #[error("Variable '{name}' does not exist in function '{function}'.")]
    UndefinedVariable { name: String, function: String },

    #[error("Tried to call function '{name}' but it doesn't exist.")]
    UnknownFunction { name: String },

    #[error("Sprite '{name}' already exists.")]
    DuplicateSprite { name: String },

    #[error("Builtin '{name}' does not accept {got} argument(s).")]
    ArgumentCount { name: String, got: usize },

    #[error("Internal error: {0}")]
    InternalInvariantViolation(String),
}

pub type LowerResult<T> = Result<T, LowerError>;
