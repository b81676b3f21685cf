//! Trains a multi-label classifier for disaster response messages.
//!
//! Messages and their category flags are read from an SQLite `messages`
//! table, split into training and evaluation sets, and fitted with a
//! count vectorizer, TF-IDF and one random forest per category. A grid
//! search picks the vocabulary limit and forest size by cross-validation.
//! The fitted search is evaluated on the held-out messages and saved.
//!
//! # Basic Usage
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use disaster_classifier::{Lexicon, PipelineBuilder, ParamGrid, RuntimeConfig, create_thread_pool};
//! use disaster_classifier::{StopwordList, WordNetLemmatizer};
//! use ndarray::array;
//!
//! let lexicon = Lexicon::new(StopwordList::parse("and\n"), WordNetLemmatizer::default());
//! let search = PipelineBuilder::new()
//!     .with_lexicon(lexicon)
//!     .with_grid(ParamGrid { n_estimators: vec![5], max_features: vec![None] })
//!     .with_seed(Some(42))
//!     .build()?;
//!
//! let messages: Vec<String> = ["flood water rising", "need food and water", "ok thanks"]
//!     .iter()
//!     .map(|s| s.to_string())
//!     .collect();
//! let targets = array![[1u8, 0], [1, 1], [0, 0]];
//!
//! let pool = create_thread_pool(&RuntimeConfig::default())?;
//! let fitted = search.fit(&messages, targets.view(), &pool)?;
//! let predicted = fitted.predict(&messages)?;
//! assert_eq!(predicted.dim(), (3, 2));
//! # Ok(())
//! # }
//! ```

use std::io::Write;
use std::sync::Arc;

use log::info;

pub mod cli;
pub mod data;
pub mod error;
pub mod evaluation;
pub mod persist;
pub mod pipeline;
pub mod resource_manager;
pub mod resources;
mod runtime;
pub mod text;

pub use cli::{parse_args, Cli, ParsedArgs, TrainOptions, USAGE, USAGE_EXIT_CODE};
pub use data::{load_data, load_messages, train_test_split, Dataset, MessageRecord, TrainTestSplit};
pub use error::{Result, TrainError};
pub use evaluation::{evaluate_model, write_evaluation, ClassificationReport, Evaluation};
pub use persist::{load_model, save_model, TrainedModel, MODEL_FORMAT_VERSION};
pub use pipeline::{
    build_model, FittedGridSearch, GridSearch, ParamGrid, PipelineBuilder, PipelineError, PipelineInfo,
    PipelineParams,
};
pub use resource_manager::{ResourceError, ResourceManager};
pub use resources::LanguageResource;
pub use runtime::{create_thread_pool, RuntimeConfig};
pub use text::{Lexicon, StopwordList, Tokenizer, WordNetLemmatizer};

pub fn init_logger() {
    env_logger::init();
}

/// Runs load, split, search, evaluation and save, reporting each stage on `out`
pub fn run_training(options: &TrainOptions, lexicon: Lexicon, out: &mut impl Write) -> Result<TrainedModel> {
    writeln!(out, "Loading data...\n    DATABASE: {}", options.database_path.display())?;
    let dataset = load_data(&options.database_path)?;
    let split = train_test_split(&dataset.messages, &dataset.targets, options.test_size, options.seed)?;

    writeln!(out, "Building model...")?;
    let tokenizer = Arc::new(Tokenizer::new(lexicon));
    let search = build_model(tokenizer, options.folds, options.seed)?;
    let pool = create_thread_pool(&options.runtime)?;

    writeln!(out, "Training model...")?;
    let fitted = search.fit(&split.x_train, split.y_train.view(), &pool)?;
    let summary = fitted.info();
    info!(
        "Best parameters {} with cross-validated score {:.3}; vocabulary of {} terms",
        summary.best_params, summary.best_score, summary.vocabulary_size
    );

    writeln!(out, "Evaluating model...")?;
    let evaluation = pool.install(|| {
        Evaluation::from_model(&fitted, &split.x_test, split.y_test.view(), &dataset.category_names)
    })?;
    evaluation.write_to(out)?;

    writeln!(out, "Saving model...\n    MODEL: {}", options.model_path.display())?;
    let model = TrainedModel::new(dataset.category_names, fitted);
    save_model(&model, &options.model_path)?;

    writeln!(out, "Trained model saved!")?;
    Ok(model)
}
