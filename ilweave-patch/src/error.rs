use thiserror::Error;

use crate::cursor::OperandLoader;

#[derive(Debug, Error)]
pub enum Error {
    /// A pattern an edit relies on has no remaining match. Recovered by
    /// skipping that insertion; never aborts other hooks.
    #[error("pattern not found: [{0}]")]
    PatternNotFound(String),

    /// The named method target cannot be located. Fatal for that hook only.
    #[error("target not found: {0}")]
    TargetNotFound(String),

    /// A loader for an injected call references an operand the method does
    /// not have. Indicates the assumed instruction shape was wrong, so it
    /// is handled exactly like a pattern miss.
    #[error("operand {loader:?} unavailable (method has {num_args} argument slots)")]
    OperandUnavailable {
        loader: OperandLoader,
        num_args: u16,
    },

    #[error("cursor move by {delta} from index {index} leaves body of length {len}")]
    CursorOutOfRange {
        index: usize,
        delta: isize,
        len: usize,
    },

    #[error(transparent)]
    Il(#[from] ilweave_il::Error),

    // Evaluator errors.
    #[error("arity mismatch: body expects {expected} arguments, got {got}")]
    ArityMismatch { expected: u16, got: usize },

    #[error("evaluation stack underflow at instruction {0}")]
    StackUnderflow(usize),

    #[error("non-numeric operand in arithmetic at instruction {0}")]
    TypeMismatch(usize),

    #[error("malformed operand at instruction {0}")]
    BadOperand(usize),

    #[error("host cannot resolve call to {0}")]
    UnresolvedCall(String),

    #[error("host cannot resolve field {0}")]
    UnresolvedField(String),
}

pub type Result<T> = std::result::Result<T, Error>;
