use bg_remove_service::{Error, Result, segmenter::Segmenter};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Fake segmenter that decodes the upload and makes the right half of the
/// image transparent. Undecodable input fails like a real model would.
#[derive(Debug, Default)]
pub struct HalfMaskSegmenter {
    pub calls: AtomicUsize,
}

impl HalfMaskSegmenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Segmenter for HalfMaskSegmenter {
    fn name(&self) -> &str {
        "fake-half-mask"
    }

    fn segment(&self, image: &[u8]) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut rgba = image::load_from_memory(image)?.to_rgba8();
        let half = rgba.width() / 2;
        for (x, _, pixel) in rgba.enumerate_pixels_mut() {
            if x >= half {
                *pixel = Rgba([0, 0, 0, 0]);
            }
        }
        encode_png(&rgba)
    }
}

/// Fake segmenter that always fails with an inference error.
#[derive(Debug)]
pub struct FailingSegmenter {
    pub error: String,
}

impl FailingSegmenter {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

impl Segmenter for FailingSegmenter {
    fn name(&self) -> &str {
        "fake-failing"
    }

    fn segment(&self, _image: &[u8]) -> Result<Vec<u8>> {
        Err(Error::inference(self.error.clone()))
    }
}

/// Fake segmenter that panics mid-inference.
#[derive(Debug)]
pub struct PanickingSegmenter;

impl Segmenter for PanickingSegmenter {
    fn name(&self) -> &str {
        "fake-panicking"
    }

    fn segment(&self, _image: &[u8]) -> Result<Vec<u8>> {
        panic!("model weights corrupted");
    }
}

/// Fake segmenter that panics as soon as the request handler asks for its
/// name, outside the blocking inference task.
#[derive(Debug)]
pub struct NamelessSegmenter;

impl Segmenter for NamelessSegmenter {
    fn name(&self) -> &str {
        panic!("model name table missing");
    }

    fn segment(&self, _image: &[u8]) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }
}

/// Fake segmenter returning bytes that are not an image.
#[derive(Debug)]
pub struct GarbageSegmenter;

impl Segmenter for GarbageSegmenter {
    fn name(&self) -> &str {
        "fake-garbage"
    }

    fn segment(&self, _image: &[u8]) -> Result<Vec<u8>> {
        Ok(b"\x00\x01garbage".to_vec())
    }
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(image.clone()).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}
