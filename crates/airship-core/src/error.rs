use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid title {0:?}: it must contain at least one letter or digit")]
    InvalidTitle(String),

    #[error("Invalid release date {0:?}: expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid blob reference: {0}")]
    InvalidBlobReference(String),
}

pub type Result<T> = std::result::Result<T, Error>;
