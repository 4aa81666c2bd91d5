use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::types::AppConfig;
use super::validation::validate_config;
use crate::core::errors::PipelineError;

const REDACTED: &str = "****";

/// Key fragments whose values never reach logs or `check` output.
const SECRET_MARKERS: [&str; 4] = ["api_key", "secret", "password", "authorization"];

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("BUDDY_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.secrets_path.clone()
    }

    /// Public config with the secrets file merged over it, as raw values.
    pub fn load_value(&self) -> Result<Value, PipelineError> {
        let mut merged = read_mapping(&self.config_path())?;
        merge_into(&mut merged, read_mapping(&self.secrets_path())?);
        Ok(merged)
    }

    /// Typed, validated configuration. Missing keys take their defaults.
    pub fn load(&self) -> Result<AppConfig, PipelineError> {
        let merged = self.load_value()?;
        let config: AppConfig = serde_json::from_value(merged)
            .map_err(|e| PipelineError::Config(format!("Failed to parse config: {}", e)))?;
        validate_config(&config)?;
        Ok(config)
    }

    pub fn redact_sensitive_values(&self, value: &Value) -> Value {
        let mut redacted = value.clone();
        redact(&mut redacted);
        redacted
    }
}

/// A missing, blank or `null` file reads as an empty mapping.
fn read_mapping(path: &Path) -> Result<Value, PipelineError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Value::Object(Map::new())),
        Err(e) => {
            return Err(PipelineError::Config(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            )))
        }
    };

    let parsed: Value = if contents.trim().is_empty() {
        Value::Null
    } else {
        serde_yaml::from_str(&contents).map_err(|e| {
            PipelineError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?
    };

    match parsed {
        Value::Null => Ok(Value::Object(Map::new())),
        mapping @ Value::Object(_) => Ok(mapping),
        _ => Err(PipelineError::Config(format!(
            "{} must contain a mapping at the top level",
            path.display()
        ))),
    }
}

/// Recursively merge `overlay` into `base`. Mappings merge key by key; any
/// other value in `overlay` replaces the one in `base`.
fn merge_into(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(&key) {
                    Some(existing) => merge_into(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

fn is_secret_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SECRET_MARKERS.iter().any(|marker| key.contains(marker))
}

fn redact(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, entry) in map.iter_mut() {
                if is_secret_key(key) && !entry.is_null() {
                    *entry = Value::String(REDACTED.to_string());
                } else {
                    redact(entry);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact),
        _ => {}
    }
}
