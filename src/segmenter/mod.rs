pub mod mask;
#[cfg(feature = "onnx")]
mod onnx;

#[cfg(feature = "onnx")]
pub use onnx::OnnxSegmenter;

use crate::Result;

/// Opaque background-removal model.
///
/// Takes an encoded image and returns an encoded image whose background
/// pixels are transparent. Implementations are loaded once and shared by
/// every request, so `segment` only borrows `self`.
pub trait Segmenter: Send + Sync {
    fn name(&self) -> &str;

    /// Runs synchronously and may take seconds; callers keep it off the
    /// async executor.
    fn segment(&self, image: &[u8]) -> Result<Vec<u8>>;
}
