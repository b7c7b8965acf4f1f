use thiserror::Error;

pub type Result<T> = std::result::Result<T, BridgeError>;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("bridge error - {msg}")]
    Generic { msg: String },

    #[error("failed to parse - {msg}")]
    ParseError { msg: String },

    #[error("backend refused command - {msg}")]
    BackendError { msg: String },

    #[error("video encoder - {msg}")]
    EncoderError { msg: String },

    #[error(transparent)]
    IOError(#[from] std::io::Error),

    #[error(transparent)]
    Utf8Error(#[from] std::str::Utf8Error),
}
