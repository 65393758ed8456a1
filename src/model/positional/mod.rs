//! Position encoding implementations
mod positional;
pub use positional::{PositionEncoding};

mod sine;
pub use sine::PositionEmbeddingSine;
