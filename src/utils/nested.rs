use ndarray::{s, Array3, Array4, ArrayView3, ArrayView4};

use crate::model::ModelError;

/// A batch of images or feature maps together with its padding mask
/// (`true` where a pixel is padding).
#[derive(Debug, Clone)]
pub struct NestedTensor {
    pub tensors: Array4<f32>, // Shape: [batch_size, channels, height, width]
    pub mask: Array3<bool>,   // Shape: [batch_size, height, width]
}

impl NestedTensor {
    pub fn new(tensors: Array4<f32>, mask: Option<Array3<bool>>) -> Result<Self, ModelError> {
        let (batch_size, _, height, width) = tensors.dim();
        let mask = match mask {
            Some(mask) => {
                if mask.dim() != (batch_size, height, width) {
                    return Err(ModelError::DimensionMismatch(format!(
                        "mask shape {:?} does not match tensors {:?}",
                        mask.shape(),
                        tensors.shape()
                    )));
                }
                mask
            }
            None => Array3::from_elem((batch_size, height, width), false),
        };

        Ok(Self { tensors, mask })
    }

    /// Pads [channels, height, width] images to the largest height and width in the
    /// batch. Padded pixels are zero in `tensors` and `true` in `mask`.
    pub fn from_images(images: &[Array3<f32>]) -> Result<Self, ModelError> {
        let first = images.first().ok_or_else(|| {
            ModelError::DimensionMismatch("cannot batch an empty image list".to_string())
        })?;
        let channels = first.dim().0;

        let mut max_height = 0;
        let mut max_width = 0;
        for image in images {
            let (c, h, w) = image.dim();
            if c != channels {
                return Err(ModelError::DimensionMismatch(format!(
                    "expected {} channels, got {}",
                    channels, c
                )));
            }
            max_height = max_height.max(h);
            max_width = max_width.max(w);
        }

        let mut tensors = Array4::zeros((images.len(), channels, max_height, max_width));
        let mut mask = Array3::from_elem((images.len(), max_height, max_width), true);
        for (b, image) in images.iter().enumerate() {
            let (_, h, w) = image.dim();
            tensors.slice_mut(s![b, .., ..h, ..w]).assign(image);
            mask.slice_mut(s![b, ..h, ..w]).fill(false);
        }

        Ok(Self { tensors, mask })
    }

    pub fn decompose(&self) -> (ArrayView4<f32>, ArrayView3<bool>) {
        (self.tensors.view(), self.mask.view())
    }

    pub fn shape(&self) -> &[usize] {
        self.tensors.shape()
    }

    /// Nearest-neighbour resampling of the mask to `height` x `width`.
    pub fn resize_mask(&self, height: usize, width: usize) -> Array3<bool> {
        let (batch_size, in_height, in_width) = self.mask.dim();
        Array3::from_shape_fn((batch_size, height, width), |(b, i, j)| {
            let src_i = (i * in_height / height).min(in_height.saturating_sub(1));
            let src_j = (j * in_width / width).min(in_width.saturating_sub(1));
            self.mask[[b, src_i, src_j]]
        })
    }
}
