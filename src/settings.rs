use crate::compiler::ExportOptions;
use crate::error::SettingsError;
use crate::graph::LayoutOptions;
use crate::store::StoreConfig;
use crate::suggest::OracleOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Every tunable of the crate in one document. Missing sections take their defaults.
///
/// ```json
/// {
///   "export": { "maxResolveDepth": 32, "defaultVersion": "1.0" },
///   "layout": { "sourceX": 100, "transformX": 400, "targetX": 700, "top": 100, "rowPitch": 100 },
///   "oracle": { "sampleLimit": 5 },
///   "store": { "bootstrapVersion": "1.0" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub export: ExportOptions,
    pub layout: LayoutOptions,
    pub oracle: OracleOptions,
    pub store: StoreConfig,
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content).map_err(|source| SettingsError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}
