use thiserror::Error;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("Notification failed: {0}")]
    Notify(String),

    #[error("Provider rejected message (status {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
