// error.rs
use thiserror::Error;

use crate::model::ModelError;
use crate::utils::IoError;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}
