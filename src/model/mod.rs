//! Detector components that live in this crate

mod config;
mod error;
mod positional;

pub use config::{DetectorConfig, PositionEncodingConfig};
pub use error::ModelError;
pub use positional::{PositionEmbeddingSine, PositionEncoding};

use tracing::info;

/// Builds the position encoding a detector with this configuration feeds to its transformer
pub fn build_position_encoding(config: &DetectorConfig) -> Result<Box<dyn PositionEncoding>, ModelError> {
    config.validate()?;

    let encoding = PositionEmbeddingSine::new(config.position_encoding_config())?;
    if encoding.output_channels() != config.hidden_dim {
        return Err(ModelError::ConfigError(format!(
            "position encoding produces {} channels but hidden_dim is {}",
            encoding.output_channels(),
            config.hidden_dim
        )));
    }

    info!("Built position encoding with {} channels", encoding.output_channels());
    Ok(Box::new(encoding))
}
