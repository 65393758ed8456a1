use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::DetectorError;
use crate::model::DetectorConfig;

/// Error type for I/O operations
#[derive(Error, Debug)]
pub enum IoError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("IO error: {0}")]
    StdIo(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reads a file to string with proper error handling
pub fn read_to_string(path: impl AsRef<Path>) -> Result<String, IoError> {
    let path = path.as_ref();
    fs::read_to_string(path)
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                IoError::FileNotFound(path.to_path_buf())
            } else {
                IoError::StdIo(e)
            }
        })
}

/// Parses a JSON file into any deserializable type
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, IoError> {
    let text = read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Writes pretty JSON, creating parent directories if needed
pub fn write_json<T: Serialize>(path: impl AsRef<Path>, data: &T) -> Result<(), IoError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(data)?)?;
    Ok(())
}

/// Loads and validates a detector configuration
pub fn load_config(path: impl AsRef<Path>) -> Result<DetectorConfig, DetectorError> {
    let config: DetectorConfig = load_json(path)?;
    config.validate()?;
    Ok(config)
}

/// Serializes data to a binary file using bincode
pub fn serialize_to_file<T: Serialize>(
    path: impl AsRef<Path>,
    data: &T,
) -> Result<(), IoError> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    bincode::serialize_into(writer, data)?;
    Ok(())
}

/// Deserializes data from a binary file using bincode
pub fn deserialize_from_file<T: DeserializeOwned>(
    path: impl AsRef<Path>,
) -> Result<T, IoError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let data = bincode::deserialize_from(reader)?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;
    use tempfile::tempdir;

    use crate::model::PositionEncodingConfig;

    #[test]
    fn test_config_round_trip() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("configs/detector.json");

        let config = DetectorConfig {
            hidden_dim: 64,
            position_encoding: Some(PositionEncodingConfig::for_hidden_dim(64)),
            ..Default::default()
        };
        write_json(&file_path, &config).unwrap();

        let loaded = load_config(&file_path).unwrap();
        assert_eq!(loaded.hidden_dim, 64);
        assert_eq!(loaded.position_encoding, config.position_encoding);
    }

    #[test]
    fn test_load_config_rejects_invalid() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("bad.json");
        std::fs::write(&file_path, r#"{"backbone_strides": [8, 16], "backbone_channels": [512]}"#).unwrap();

        assert!(matches!(load_config(&file_path), Err(DetectorError::Model(_))));
    }

    #[test]
    fn test_shipped_config_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("configs/detector.json");
        let config = load_config(path).unwrap();
        assert_eq!(config.position_encoding_config().num_pos_feats * 2, config.hidden_dim);
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = tempdir().unwrap();
        let result = load_config(temp_dir.path().join("missing.json"));
        assert!(matches!(result, Err(DetectorError::Io(IoError::FileNotFound(_)))));
    }

    #[test]
    fn test_serialize_deserialize_embedding() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("pos.bin");

        let data = Array4::from_shape_fn((1, 2, 3, 4), |(_, c, i, j)| (c * 12 + i * 4 + j) as f32);
        serialize_to_file(&file_path, &data).unwrap();
        let loaded: Array4<f32> = deserialize_from_file(&file_path).unwrap();

        assert_eq!(data, loaded);
    }
}
