use serde::{Serialize, Deserialize};

use super::error::ModelError;

/// Configuration for the 2D sine position encoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionEncodingConfig {
    #[serde(default = "default_num_pos_feats")]
    pub num_pos_feats: usize,           // Features per spatial axis, output has twice as many channels
    #[serde(default = "default_temperature")]
    pub temperature: f32,               // Base of the frequency scaling
    #[serde(default)]
    pub normalize: bool,                // Rescale cumulative positions into [0, scale]
    #[serde(default)]
    pub scale: Option<f32>,             // Only valid with normalize, 2*pi when omitted
}

fn default_num_pos_feats() -> usize { 64 }
fn default_temperature() -> f32 { 10000.0 }
fn default_hidden_dim() -> usize { 256 }
fn default_num_feature_levels() -> usize { 4 }
fn default_backbone_strides() -> Vec<usize> { vec![8, 16, 32] }
fn default_backbone_channels() -> Vec<usize> { vec![512, 1024, 2048] }
fn default_image_size() -> usize { 384 }
fn default_batch_size() -> usize { 1 }

impl Default for PositionEncodingConfig {
    fn default() -> Self {
        Self {
            num_pos_feats: default_num_pos_feats(),
            temperature: default_temperature(),
            normalize: false,
            scale: None,
        }
    }
}

impl PositionEncodingConfig {
    /// Builder convention of Deformable DETR: half the hidden size per axis, normalized.
    pub fn for_hidden_dim(hidden_dim: usize) -> Self {
        Self {
            num_pos_feats: hidden_dim / 2,
            normalize: true,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.scale.is_some() && !self.normalize {
            return Err(ModelError::ConfigError(
                "normalize should be true if scale is passed".to_string(),
            ));
        }
        if self.num_pos_feats % 2 != 0 {
            return Err(ModelError::ConfigError(format!(
                "num_pos_feats must be even to pair sin/cos bands, got {}",
                self.num_pos_feats
            )));
        }
        Ok(())
    }
}

/// Configuration for the detector scaffolding around the position encoding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    // --- Transformer ---
    #[serde(default = "default_hidden_dim")]
    pub hidden_dim: usize,              // d_model of the deformable transformer
    #[serde(default = "default_num_feature_levels")]
    pub num_feature_levels: usize,      // Levels the transformer attends over

    // --- Backbone ---
    #[serde(default = "default_backbone_strides")]
    pub backbone_strides: Vec<usize>,   // Downsampling factor of each returned level
    #[serde(default = "default_backbone_channels")]
    pub backbone_channels: Vec<usize>,  // Channel count of each returned level

    // --- Input ---
    #[serde(default = "default_image_size")]
    pub image_size: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    // --- Position encoding ---
    #[serde(default)]
    pub position_encoding: Option<PositionEncodingConfig>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            hidden_dim: default_hidden_dim(),
            num_feature_levels: default_num_feature_levels(),
            backbone_strides: default_backbone_strides(),
            backbone_channels: default_backbone_channels(),
            image_size: default_image_size(),
            batch_size: default_batch_size(),
            position_encoding: None,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.hidden_dim == 0 {
            return Err(ModelError::ConfigError("hidden_dim must be positive".to_string()));
        }
        if self.num_feature_levels == 0 {
            return Err(ModelError::ConfigError("num_feature_levels must be positive".to_string()));
        }
        if self.backbone_strides.is_empty() || self.backbone_strides.iter().any(|&s| s == 0) {
            return Err(ModelError::ConfigError("backbone strides must be positive".to_string()));
        }
        if self.backbone_strides.len() != self.backbone_channels.len() {
            return Err(ModelError::ConfigError(format!(
                "{} backbone strides but {} channel counts",
                self.backbone_strides.len(),
                self.backbone_channels.len()
            )));
        }
        Ok(())
    }

    /// Stride of every level the transformer sees. With fewer levels than backbone
    /// outputs the deepest ones are kept; extra levels each halve the previous resolution.
    pub fn level_strides(&self) -> Vec<usize> {
        let available = self.backbone_strides.len();
        if self.num_feature_levels <= available {
            return self.backbone_strides[available - self.num_feature_levels..].to_vec();
        }

        let mut strides = self.backbone_strides.clone();
        while strides.len() < self.num_feature_levels {
            let last = strides.last().copied().unwrap_or(1);
            strides.push(last * 2);
        }
        strides
    }

    /// Channel count of every level returned by `level_strides`. Extra levels are
    /// projected to `hidden_dim`.
    pub fn level_channels(&self) -> Vec<usize> {
        let available = self.backbone_channels.len();
        if self.num_feature_levels <= available {
            return self.backbone_channels[available - self.num_feature_levels..].to_vec();
        }

        let mut channels = self.backbone_channels.clone();
        channels.resize(self.num_feature_levels, self.hidden_dim);
        channels
    }

    /// Explicit override if present, otherwise derived from `hidden_dim`.
    pub fn position_encoding_config(&self) -> PositionEncodingConfig {
        self.position_encoding
            .clone()
            .unwrap_or_else(|| PositionEncodingConfig::for_hidden_dim(self.hidden_dim))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_encoding_defaults() {
        let config = PositionEncodingConfig::default();
        assert_eq!(config.num_pos_feats, 64);
        assert_eq!(config.temperature, 10000.0);
        assert!(!config.normalize);
        assert!(config.scale.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_scale_without_normalize_rejected() {
        let config = PositionEncodingConfig { scale: Some(1.0), ..Default::default() };
        assert!(matches!(config.validate(), Err(ModelError::ConfigError(_))));

        let config = PositionEncodingConfig { scale: Some(1.0), normalize: true, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_odd_num_pos_feats_rejected() {
        let config = PositionEncodingConfig { num_pos_feats: 5, ..Default::default() };
        assert!(matches!(config.validate(), Err(ModelError::ConfigError(_))));
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: PositionEncodingConfig = serde_json::from_str(r#"{"normalize": true}"#).unwrap();
        assert_eq!(config.num_pos_feats, 64);
        assert!(config.normalize);

        let detector: DetectorConfig = serde_json::from_str(r#"{"hidden_dim": 128}"#).unwrap();
        assert_eq!(detector.hidden_dim, 128);
        assert_eq!(detector.backbone_strides, vec![8, 16, 32]);
        assert!(detector.position_encoding.is_none());
    }

    #[test]
    fn test_position_encoding_derived_from_hidden_dim() {
        let detector = DetectorConfig { hidden_dim: 128, ..Default::default() };
        let config = detector.position_encoding_config();
        assert_eq!(config.num_pos_feats, 64);
        assert!(config.normalize);

        let explicit = PositionEncodingConfig { num_pos_feats: 16, ..Default::default() };
        let detector = DetectorConfig { position_encoding: Some(explicit.clone()), ..Default::default() };
        assert_eq!(detector.position_encoding_config(), explicit);
    }

    #[test]
    fn test_level_strides() {
        let detector = DetectorConfig::default();
        assert_eq!(detector.level_strides(), vec![8, 16, 32, 64]);

        let detector = DetectorConfig { num_feature_levels: 1, ..Default::default() };
        assert_eq!(detector.level_strides(), vec![32]);

        let detector = DetectorConfig { num_feature_levels: 3, ..Default::default() };
        assert_eq!(detector.level_strides(), vec![8, 16, 32]);
    }

    #[test]
    fn test_level_channels() {
        let detector = DetectorConfig::default();
        assert_eq!(detector.level_channels(), vec![512, 1024, 2048, 256]);

        let detector = DetectorConfig { num_feature_levels: 1, ..Default::default() };
        assert_eq!(detector.level_channels(), vec![2048]);
    }

    #[test]
    fn test_detector_validation() {
        assert!(DetectorConfig::default().validate().is_ok());

        let bad = DetectorConfig { backbone_channels: vec![512], ..Default::default() };
        assert!(bad.validate().is_err());

        let bad = DetectorConfig { backbone_strides: vec![8, 0, 32], ..Default::default() };
        assert!(bad.validate().is_err());

        let bad = DetectorConfig { num_feature_levels: 0, ..Default::default() };
        assert!(bad.validate().is_err());
    }
}
