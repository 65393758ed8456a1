use std::fmt;

use ndarray::{Array4, ArrayView3, ArrayView4};

use crate::utils::NestedTensor;

/// Trait for all position encoding implementations
#[typetag::serde]
pub trait PositionEncoding: fmt::Debug + Send + Sync {
    /// Encode pixel positions of a feature map
    /// features shape: (batch_size, channels, height, width)
    /// mask shape: (batch_size, height, width), `true` on padding
    fn forward(&self, features: ArrayView4<f32>, mask: Option<ArrayView3<bool>>) -> Array4<f32>;

    /// Number of channels in the returned embedding
    fn output_channels(&self) -> usize;

    fn forward_nested(&self, input: &NestedTensor) -> Array4<f32> {
        let (tensors, mask) = input.decompose();
        self.forward(tensors, Some(mask))
    }
}
