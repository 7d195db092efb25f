use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("instruction index {index} out of bounds (body length: {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("listing line {line}: unknown mnemonic `{mnemonic}`")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("listing line {line}: {message}")]
    BadOperand { line: usize, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
