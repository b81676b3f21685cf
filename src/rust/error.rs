use std::io;

use crate::pipeline::PipelineError;
use crate::resource_manager::ResourceError;

/// Errors surfaced by a training run
#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    #[error("Data access error: {0}")]
    DataAccess(#[from] rusqlite::Error),
    #[error("Schema error: {0}")]
    Schema(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),
    #[error("Lexicon error: {0}")]
    Lexicon(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
    #[error("Incompatible model artifact: format version {found}, expected {expected}")]
    IncompatibleModel { found: u32, expected: u32 },
}

pub type Result<T> = std::result::Result<T, TrainError>;
