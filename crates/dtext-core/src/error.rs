use thiserror::Error;

/// Every failure is fatal to the call that produced it; no partial HTML is
/// ever returned alongside an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DTextError {
    #[error("input contains a null byte at offset {offset}")]
    ControlByte { offset: usize },

    #[error("input is not valid UTF-8 (invalid byte at offset {offset})")]
    Encoding { offset: usize },

    #[error("too many nested elements (maximum depth is {max_depth})")]
    NestingLimitExceeded { max_depth: usize },

    #[error("expected a string, found {found}")]
    Type { found: String },
}

pub type DTextResult<T> = Result<T, DTextError>;
