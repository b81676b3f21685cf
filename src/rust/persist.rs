use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrainError};
use crate::pipeline::FittedGridSearch;

/// Bumped whenever the serialized layout of [`TrainedModel`] changes
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// Everything needed to classify new messages after training
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModel {
    pub format_version: u32,
    pub category_names: Vec<String>,
    pub search: FittedGridSearch,
}

impl TrainedModel {
    pub fn new(category_names: Vec<String>, search: FittedGridSearch) -> Self {
        Self {
            format_version: MODEL_FORMAT_VERSION,
            category_names,
            search,
        }
    }
}

/// Writes `model` to `path`, replacing any existing file
pub fn save_model(model: &TrainedModel, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    bincode::serialize_into(&mut writer, model)?;
    writer.flush()?;
    info!("Model written to {}", path.display());
    Ok(())
}

/// Reads a model written by [`save_model`].
///
/// The format version leads the encoding and is checked before the rest is
/// decoded.
pub fn load_model(path: &Path) -> Result<TrainedModel> {
    let mut bytes = Vec::new();
    BufReader::new(File::open(path)?).read_to_end(&mut bytes)?;

    let found: u32 = bincode::deserialize(&bytes)?;
    if found != MODEL_FORMAT_VERSION {
        return Err(TrainError::IncompatibleModel {
            found,
            expected: MODEL_FORMAT_VERSION,
        });
    }
    Ok(bincode::deserialize(&bytes)?)
}
