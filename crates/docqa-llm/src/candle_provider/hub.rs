use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ModelError;

/// Local paths of the three files a BERT-family checkpoint needs.
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,
}

/// Resolve model files from a local directory or the `HuggingFace` Hub.
///
/// A `model` that names an existing directory is used as-is; anything else is
/// treated as a Hub repo id and downloaded into the hf-hub cache.
///
/// # Errors
///
/// Returns an error if a file is missing locally or the download fails.
pub fn fetch(model: &str) -> Result<ModelFiles, ModelError> {
    let local = Path::new(model);
    if local.is_dir() {
        let files = ModelFiles {
            config: local.join("config.json"),
            tokenizer: local.join("tokenizer.json"),
            weights: local.join("model.safetensors"),
        };
        for path in [&files.config, &files.tokenizer, &files.weights] {
            if !path.is_file() {
                return Err(ModelError::ModelLoad(format!(
                    "missing model file: {}",
                    path.display()
                )));
            }
        }
        return Ok(files);
    }

    let api = hf_hub::api::sync::Api::new().map_err(|e| {
        ModelError::ModelLoad(format!("failed to create HuggingFace API client: {e}"))
    })?;
    let repo = api.model(model.to_owned());
    let get = |name: &str| {
        repo.get(name).map_err(|e| {
            ModelError::ModelLoad(format!("failed to download {name} from {model}: {e}"))
        })
    };

    Ok(ModelFiles {
        config: get("config.json")?,
        tokenizer: get("tokenizer.json")?,
        weights: get("model.safetensors")?,
    })
}

#[derive(Deserialize)]
struct HiddenSize {
    hidden_size: usize,
}

/// Read `hidden_size` from a BERT `config.json` body.
///
/// # Errors
///
/// Returns an error if the JSON has no `hidden_size`.
pub fn hidden_size(config_json: &str) -> Result<usize, ModelError> {
    let parsed: HiddenSize = serde_json::from_str(config_json)?;
    Ok(parsed.hidden_size)
}
