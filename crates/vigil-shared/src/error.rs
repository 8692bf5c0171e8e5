use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Unknown media kind: {0}")]
    UnknownMediaKind(String),

    #[error("Unknown origin source: {0}")]
    UnknownOrigin(String),

    #[error("Empty field name")]
    EmptyFieldName,
}
