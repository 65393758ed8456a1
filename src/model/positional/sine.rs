use std::fmt;

use ndarray::{Array1, Array3, Array4, ArrayView3, ArrayView4, Axis};
use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::model::{config::PositionEncodingConfig, positional::PositionEncoding, ModelError};

const NORMALIZE_EPS: f32 = 1e-6;

/// 2D sinusoidal position embedding for image feature maps.
///
/// Positions are the running count of valid pixels along each axis, so padded
/// regions of a batch do not shift the coordinates of real content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionEmbeddingSine {
    num_pos_feats: usize,
    temperature: f32,
    normalize: bool,
    scale: f32,
}

impl PositionEmbeddingSine {
    pub fn new(config: PositionEncodingConfig) -> Result<Self, ModelError> {
        config.validate()?;

        Ok(Self {
            num_pos_feats: config.num_pos_feats,
            temperature: config.temperature,
            normalize: config.normalize,
            scale: config.scale.unwrap_or(2.0 * std::f32::consts::PI),
        })
    }

    pub fn num_pos_feats(&self) -> usize {
        self.num_pos_feats
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn normalize(&self) -> bool {
        self.normalize
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Frequency divisors: `temperature ^ (2 * floor(k / 2) / num_pos_feats)`, equal within each sin/cos pair.
    pub fn dim_t(&self) -> Array1<f32> {
        let n = self.num_pos_feats as f32;
        Array1::from_shape_fn(self.num_pos_feats, |k| {
            self.temperature.powf(2.0 * (k / 2) as f32 / n)
        })
    }

    /// Cumulative valid-pixel counts `(y_embed, x_embed)`, each [batch, height, width],
    /// normalized into `[0, scale]` when configured.
    pub fn cumulative_positions(&self, not_mask: &Array3<f32>) -> (Array3<f32>, Array3<f32>) {
        let mut y_embed = not_mask.clone();
        let mut x_embed = not_mask.clone();
        y_embed.accumulate_axis_inplace(Axis(1), |&prev, curr| *curr += prev);
        x_embed.accumulate_axis_inplace(Axis(2), |&prev, curr| *curr += prev);

        if self.normalize {
            normalize_along(&mut y_embed, Axis(1), self.scale);
            normalize_along(&mut x_embed, Axis(2), self.scale);
        }

        (y_embed, x_embed)
    }

    /// Forward pass: features [batch, channels, height, width], mask [batch, height, width]
    /// with `true` on padding. Output is [batch, 2 * num_pos_feats, height, width].
    pub fn encode(&self, features: ArrayView4<f32>, mask: Option<ArrayView3<bool>>) -> Array4<f32> {
        let (batch_size, _, height, width) = features.dim();
        let not_mask = match mask {
            Some(mask) => mask.mapv(|padded| if padded { 0.0 } else { 1.0 }),
            None => Array3::ones((batch_size, height, width)),
        };

        let (y_embed, x_embed) = self.cumulative_positions(&not_mask);
        let dim_t = self.dim_t();
        let n = self.num_pos_feats;

        debug!(
            "Sine position encoding: batch={}, height={}, width={}, channels={}",
            batch_size, height, width, 2 * n
        );

        // y bands occupy channels [0, n), x bands [n, 2n); even slots sin, odd slots cos
        Array4::from_shape_fn((batch_size, 2 * n, height, width), |(b, c, i, j)| {
            let (embed, k) = if c < n { (&y_embed, c) } else { (&x_embed, c - n) };
            let pos = embed[[b, i, j]] / dim_t[k];
            if k % 2 == 0 {
                pos.sin()
            } else {
                pos.cos()
            }
        })
    }
}

/// Divides every lane along `axis` by its last value (plus epsilon) and multiplies by `scale`.
fn normalize_along(embed: &mut Array3<f32>, axis: Axis, scale: f32) {
    let len = embed.len_of(axis);
    if len == 0 {
        return;
    }
    let denom = embed.index_axis(axis, len - 1).to_owned().insert_axis(axis) + NORMALIZE_EPS;
    *embed /= &denom;
    *embed *= scale;
}

#[typetag::serde]
impl PositionEncoding for PositionEmbeddingSine {
    fn forward(&self, features: ArrayView4<f32>, mask: Option<ArrayView3<bool>>) -> Array4<f32> {
        self.encode(features, mask)
    }

    fn output_channels(&self) -> usize {
        2 * self.num_pos_feats
    }
}

impl fmt::Display for PositionEmbeddingSine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indent = " ".repeat(4);
        writeln!(f, "Positional encoding PositionEmbeddingSine")?;
        writeln!(f, "{}num_pos_feats: {}", indent, self.num_pos_feats)?;
        writeln!(f, "{}temperature: {}", indent, self.temperature)?;
        writeln!(f, "{}normalize: {}", indent, self.normalize)?;
        write!(f, "{}scale: {}", indent, self.scale)
    }
}
