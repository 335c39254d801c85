use super::execution::ExecutionMappingConfig;
use crate::error::ArtifactError;
use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Read, Write};

pub const ARTIFACT_FORMAT_VERSION: u16 = 1;

/// A packed execution configuration handed to the runtime.
///
/// Rule values are arbitrary JSON, which bincode cannot describe, so the rules
/// travel as a JSON body inside a fixed binary envelope.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MappingArtifact {
    pub format_version: u16,
    pub name: Option<String>,
    pub version: Option<String>,
    pub rule_count: u32,
    pub body: Vec<u8>,
}

impl MappingArtifact {
    pub fn pack(config: &ExecutionMappingConfig) -> Result<Self, ArtifactError> {
        Ok(Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            name: config.name.clone(),
            version: config.version.clone(),
            rule_count: u32::try_from(config.mappings.len()).unwrap_or(u32::MAX),
            body: serde_json::to_vec(config)?,
        })
    }

    pub fn unpack(&self) -> Result<ExecutionMappingConfig, ArtifactError> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(ArtifactError::FormatVersion {
                found: self.format_version,
                expected: ARTIFACT_FORMAT_VERSION,
            });
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ArtifactError> {
        encode_to_vec(self, standard()).map_err(|e| ArtifactError::Encode(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ArtifactError> {
        decode_from_slice(bytes, standard())
            .map(|(artifact, _)| artifact)
            .map_err(|e| ArtifactError::Decode(e.to_string()))
    }

    /// Saves the artifact to a file using the bincode format.
    pub fn save(&self, path: &str) -> Result<(), ArtifactError> {
        let bytes = self.to_bytes()?;
        let mut file = fs::File::create(path).map_err(|source| ArtifactError::Io {
            path: path.to_string(),
            source,
        })?;
        file.write_all(&bytes).map_err(|source| ArtifactError::Io {
            path: path.to_string(),
            source,
        })
    }

    pub fn from_file(path: &str) -> Result<Self, ArtifactError> {
        let mut file = fs::File::open(path).map_err(|source| ArtifactError::Io {
            path: path.to_string(),
            source,
        })?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).map_err(|source| ArtifactError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_bytes(&bytes)
    }
}
