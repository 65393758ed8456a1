use std::env;

use anyhow::{Context, Result};
use ndarray::{Array3, Array4};
use ndarray_rand::{rand_distr::Uniform, RandomExt};
use rand::{rngs::StdRng, SeedableRng};
use tracing::info;

use dot_detector::model::{build_position_encoding, DetectorConfig, PositionEmbeddingSine, PositionEncoding};
use dot_detector::utils::{describe_arrays, describe_levels, load_config, serialize_to_file, NestedTensor};

const CONFIG_ENV: &str = "DOT_DETECTOR_CONFIG";

/// Explicit path argument, then the environment, then built-in defaults
fn resolve_config(path: Option<&str>) -> Result<DetectorConfig> {
    let path = path.map(str::to_string).or_else(|| env::var(CONFIG_ENV).ok());
    match path {
        Some(path) => {
            info!("Loading config from {}", path);
            load_config(&path).with_context(|| format!("failed to load config {}", path))
        }
        None => {
            info!("No config given, using defaults");
            Ok(DetectorConfig::default())
        }
    }
}

/// Random image batch with an all-valid mask, as the backbone would receive it
fn random_batch(config: &DetectorConfig, rng: &mut StdRng) -> Result<NestedTensor> {
    let shape = (config.batch_size, 3, config.image_size, config.image_size);
    let image = Array4::random_using(shape, Uniform::new(0.0f32, 1.0), rng);
    Ok(NestedTensor::new(image, None)?)
}

/// One random feature map per level, with the input mask resized to its resolution
fn feature_levels(config: &DetectorConfig, sample: &NestedTensor, rng: &mut StdRng) -> Result<Vec<NestedTensor>> {
    let (batch_size, _, height, width) = sample.tensors.dim();
    let mut levels = Vec::new();
    let strides = config.level_strides();
    let channels = config.level_channels();
    for (stride, channels) in strides.into_iter().zip(channels) {
        let level_height = height.div_ceil(stride);
        let level_width = width.div_ceil(stride);

        let features = Array4::random_using(
            (batch_size, channels, level_height, level_width),
            Uniform::new(-1.0f32, 1.0),
            rng,
        );
        let mask: Array3<bool> = sample.resize_mask(level_height, level_width);
        levels.push(NestedTensor::new(features, Some(mask))?);
    }
    Ok(levels)
}

fn show_config(config: &DetectorConfig) -> Result<()> {
    let encoding = PositionEmbeddingSine::new(config.position_encoding_config())?;
    println!("\n========== config ==========\n");
    println!("{:#?}", config);
    println!("\n========== position encoding ==========\n");
    println!("{}", encoding);
    Ok(())
}

fn check_backbone_outputs(config: &DetectorConfig) -> Result<()> {
    let encoding = build_position_encoding(config)?;
    let mut rng = StdRng::seed_from_u64(0);
    let sample = random_batch(config, &mut rng)?;
    let levels = feature_levels(config, &sample, &mut rng)?;

    let positions: Vec<Array4<f32>> = levels
        .iter()
        .map(|level| encoding.forward_nested(level))
        .collect();
    info!("Encoded {} feature levels", positions.len());

    let feature_shapes: Vec<&[usize]> = levels.iter().map(|level| level.shape()).collect();
    let position_shapes: Vec<&[usize]> = positions.iter().map(|pos| pos.shape()).collect();
    println!("{}", describe_levels(&feature_shapes, &position_shapes));
    Ok(())
}

fn encode_single(config: &DetectorConfig, output: Option<&str>) -> Result<()> {
    let encoding = build_position_encoding(config)?;
    let mut rng = StdRng::seed_from_u64(0);
    let sample = random_batch(config, &mut rng)?;

    let stride = config.backbone_strides.last().copied().unwrap_or(32);
    let height = config.image_size.div_ceil(stride);
    let mask = sample.resize_mask(height, height);
    let features = Array4::<f32>::zeros((config.batch_size, config.hidden_dim, height, height));
    let pos = encoding.forward(features.view(), Some(mask.view()));

    println!(
        "{}",
        describe_arrays("outputs", &[("features", features.shape()), ("pos", pos.shape())])
    );

    if let Some(path) = output {
        serialize_to_file(path, &pos).with_context(|| format!("failed to write {}", path))?;
        info!("Saved position embedding to {}", path);
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dot_detector=info".into()),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let config_arg = args.get(2).map(|s| s.as_str());

    match args.get(1).map(|s| s.as_str()) {
        Some("config") => show_config(&resolve_config(config_arg)?),
        Some("backbone") => check_backbone_outputs(&resolve_config(config_arg)?),
        Some("encode") => {
            let output = args.get(3).map(|s| s.as_str());
            encode_single(&resolve_config(config_arg)?, output)
        }
        _ => {
            println!("Usage: dot-detector [config|backbone|encode] [config.json] [out.bin]");
            println!("Example commands:");
            println!("  cargo run -- config");
            println!("  cargo run -- backbone configs/detector.json");
            println!("  cargo run -- encode configs/detector.json pos.bin");
            println!("The config path may also be set with {}", CONFIG_ENV);
            Ok(())
        }
    }
}
