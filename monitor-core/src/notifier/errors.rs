// notifier/errors.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Render error: {0}")]
    Render(#[from] std::fmt::Error),

    #[error("Nothing to send: {0}")]
    Empty(String),
}
