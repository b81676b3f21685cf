use std::fmt;

/// Represents the different types of errors that can occur while fitting or
/// applying a pipeline stage.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// The vectorizer learned no terms from the training corpus
    EmptyVocabulary,
    /// A stage was asked to fit on zero samples
    EmptyTrainingSet(String),
    /// Inputs disagree on their dimensions
    ShapeMismatch(String),
    /// A hyperparameter value cannot be used
    InvalidParameter(String),
    /// The pipeline or search could not be assembled
    BuildError(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyVocabulary => write!(
                f,
                "Empty vocabulary; perhaps the documents only contain stop words"
            ),
            Self::EmptyTrainingSet(msg) => write!(f, "Empty training set: {}", msg),
            Self::ShapeMismatch(msg) => write!(f, "Shape mismatch: {}", msg),
            Self::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            Self::BuildError(msg) => write!(f, "Build error: {}", msg),
        }
    }
}

impl std::error::Error for PipelineError {}
