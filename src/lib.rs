pub mod model;
pub use model::{build_position_encoding, DetectorConfig, PositionEmbeddingSine, PositionEncoding, PositionEncodingConfig};

pub mod utils;
pub use utils::{load_config, NestedTensor};

pub mod error;
pub use error::{DetectorError};
