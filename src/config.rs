use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{
    error::EstimatorError,
    speed::{DEFAULT_SPEED_H_COLUMN, DEFAULT_SPEED_M_COLUMN},
};

pub const CONFIG_ENV_VAR: &str = "DRIVE_DYNAMICS_CONFIG";
pub const CONFIG_FILE_NAME: &str = "drive_dynamics.json";

/// where a model artifact lives and how to read it
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case", tag = "format")]
pub enum ModelSource {
    /// JSON model artifact (linear, logistic or tree ensemble)
    Json { path: PathBuf },
    /// TorchScript module plus a meta.json listing its feat_list.
    /// requires the `torch` feature
    Torchscript { path: PathBuf, meta: PathBuf },
}

/// Locations of every reference table and model artifact. Relative paths are
/// taken from the directory holding the config file.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct EstimatorConfig {
    pub zones: PathBuf,
    pub average_speed_h: PathBuf,
    pub average_speed_m: PathBuf,
    #[serde(default = "default_speed_h_column")]
    pub speed_h_column: String,
    #[serde(default = "default_speed_m_column")]
    pub speed_m_column: String,
    pub peak_model: ModelSource,
    pub duration_model: ModelSource,
    pub fare_model: ModelSource,
}

fn default_speed_h_column() -> String {
    DEFAULT_SPEED_H_COLUMN.to_string()
}

fn default_speed_m_column() -> String {
    DEFAULT_SPEED_M_COLUMN.to_string()
}

impl EstimatorConfig {
    pub fn load(path: &Path) -> Result<Self, EstimatorError> {
        let data = fs::read_to_string(path).map_err(|e| EstimatorError::from_io(path, e))?;
        let config: EstimatorConfig =
            serde_json::from_str(&data).map_err(|e| EstimatorError::ReadError {
                filepath: path.display().to_string(),
                error: format!("invalid config JSON: {e}"),
            })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(config.relative_to(base))
    }

    /// anchors every relative path at `base`
    pub fn relative_to(mut self, base: &Path) -> Self {
        let anchor = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        anchor(&mut self.zones);
        anchor(&mut self.average_speed_h);
        anchor(&mut self.average_speed_m);
        for source in [
            &mut self.peak_model,
            &mut self.duration_model,
            &mut self.fare_model,
        ] {
            match source {
                ModelSource::Json { path } => anchor(path),
                ModelSource::Torchscript { path, meta } => {
                    anchor(path);
                    anchor(meta);
                }
            }
        }
        self
    }
}

/// Picks the config file: an explicit path wins, then the environment
/// variable, then the first conventional location that exists.
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    if let Ok(p) = std::env::var(CONFIG_ENV_VAR) {
        return PathBuf::from(p);
    }

    let candidates = [
        PathBuf::from(CONFIG_FILE_NAME),
        PathBuf::from("config").join(CONFIG_FILE_NAME),
        PathBuf::from("data/sample").join(CONFIG_FILE_NAME),
        {
            let mut p = std::env::current_exe().unwrap_or_else(|_| PathBuf::from("."));
            p.pop(); // exe dir
            p.push(CONFIG_FILE_NAME);
            p
        },
    ];

    for c in candidates {
        if c.exists() {
            return c;
        }
    }

    // load() reports the missing file
    PathBuf::from(CONFIG_FILE_NAME)
}
