//! ONNX Runtime segmenter for the U2-Net family (u2net, u2netp, silueta).

use super::{Segmenter, mask};
use crate::{Error, Result, config::ModelConfig, imaging};
use image::{DynamicImage, ImageFormat, RgbaImage, imageops, imageops::FilterType};
use ndarray::Array4;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;
use std::{io::Cursor, sync::Mutex, time::Instant};
use tracing::{debug, info};

const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Resize to the model's square input and lay the pixels out as a 1x3xSxS
/// tensor, scaled by the brightest channel value and standardized with the
/// ImageNet mean and deviation.
pub(crate) fn input_tensor(image: &DynamicImage, size: u32) -> Array4<f32> {
    let resized = imageops::resize(&image.to_rgb8(), size, size, FilterType::Lanczos3);
    let max = f32::from(resized.as_raw().iter().copied().max().unwrap_or(0).max(1));

    let side = size as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, side, side));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for channel in 0..3 {
            tensor[[0, channel, y as usize, x as usize]] =
                (f32::from(pixel.0[channel]) / max - MEAN[channel]) / STD[channel];
        }
    }
    tensor
}

pub struct OnnxSegmenter {
    name: String,
    input_size: u32,
    post_process_mask: bool,
    // `Session::run` needs exclusive access.
    session: Mutex<Session>,
}

impl OnnxSegmenter {
    pub fn load(config: &ModelConfig) -> Result<Self> {
        let path = config
            .path
            .as_ref()
            .ok_or_else(|| Error::config("model.path is required to load an ONNX model"))?;

        info!("Loading {} model from {}", config.name, path.display());
        let start = Instant::now();

        let mut builder = Session::builder()
            .map_err(|e| Error::inference(format!("Failed to create session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| Error::inference(format!("Failed to set optimization level: {e}")))?;

        if let Some(threads) = config.intra_threads {
            builder = builder
                .with_intra_threads(threads)
                .map_err(|e| Error::inference(format!("Failed to set intra threads: {e}")))?;
        }

        let session = builder
            .commit_from_file(path)
            .map_err(|e| Error::inference(format!("Failed to load model {}: {e}", path.display())))?;

        info!(
            "Model {} loaded in {:.1}s",
            config.name,
            start.elapsed().as_secs_f64()
        );

        Ok(Self {
            name: config.name.clone(),
            input_size: config.input_size,
            post_process_mask: config.post_process_mask,
            session: Mutex::new(session),
        })
    }

    fn predict(&self, tensor: Array4<f32>) -> Result<image::GrayImage> {
        let input = Tensor::from_array(tensor)
            .map_err(|e| Error::inference(format!("Failed to convert input tensor: {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| Error::internal("ONNX session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| Error::inference(format!("ONNX inference failed: {e}")))?;

        let keys: Vec<_> = outputs.keys().collect();
        let first_key = keys
            .first()
            .ok_or_else(|| Error::inference("Model produced no outputs"))?;
        let prediction = outputs
            .get(first_key)
            .ok_or_else(|| Error::inference("First output tensor not found"))?
            .try_extract_array::<f32>()
            .map_err(|e| Error::inference(format!("Failed to extract output tensor: {e}")))?;

        let shape = prediction.shape().to_vec();
        let [_, _, height, width] = shape[..] else {
            return Err(Error::inference(format!(
                "Expected 4D output tensor, got shape {shape:?}"
            )));
        };

        // First batch, first channel.
        let values: Vec<f32> = prediction.iter().take(height * width).copied().collect();
        mask::normalize_prediction(&values, width as u32, height as u32)
            .ok_or_else(|| Error::inference("Output tensor is smaller than its shape"))
    }
}

impl Segmenter for OnnxSegmenter {
    fn name(&self) -> &str {
        &self.name
    }

    fn segment(&self, image: &[u8]) -> Result<Vec<u8>> {
        let decoded = imaging::decode_oriented(image)?;
        let original: RgbaImage = decoded.to_rgba8();
        let (width, height) = original.dimensions();

        let start = Instant::now();
        let prediction = self.predict(input_tensor(&decoded, self.input_size))?;
        debug!(
            "Inference on {}x{} image took {:.2}ms",
            width,
            height,
            start.elapsed().as_secs_f64() * 1000.0
        );

        let mut alpha = imageops::resize(&prediction, width, height, FilterType::Lanczos3);
        if self.post_process_mask {
            alpha = mask::post_process(&alpha);
        }

        let cutout = mask::apply_alpha(&original, &alpha)
            .ok_or_else(|| Error::internal("Mask size does not match the input image"))?;

        let mut encoded = Vec::new();
        DynamicImage::ImageRgba8(cutout).write_to(&mut Cursor::new(&mut encoded), ImageFormat::Png)?;
        Ok(encoded)
    }
}
