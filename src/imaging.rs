//! Output container negotiation and encoding.
//!
//! The segmenter hands back an encoded image; this module decodes it, forces
//! an RGBA8 layout so the alpha produced by the mask survives, and re-encodes
//! it into whichever container the client asked for.

use crate::{Error, Result};
use image::{
    DynamicImage, ImageDecoder, ImageEncoder, ImageReader, RgbaImage,
    codecs::png::{CompressionType, FilterType, PngEncoder},
};
use std::{fmt, io::Cursor, str::FromStr};

/// Lossy WebP quality used for every `webp` response.
pub const WEBP_QUALITY: f32 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Png,
    WebP,
}

impl OutputFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::WebP => "image/webp",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
        }
    }

    /// Synthetic download name attached to every response.
    pub fn download_name(self) -> String {
        format!("result.{}", self.extension())
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Rejected `format` value, already lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedFormat(pub String);

impl fmt::Display for UnsupportedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unsupported output format: {}. Use png or webp.", self.0)
    }
}

impl std::error::Error for UnsupportedFormat {}

impl FromStr for OutputFormat {
    type Err = UnsupportedFormat;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.to_lowercase();
        match normalized.as_str() {
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::WebP),
            _ => Err(UnsupportedFormat(normalized)),
        }
    }
}

/// Decode an upload and turn it upright according to its EXIF orientation
/// tag, the way camera viewers display it.
pub fn decode_oriented(bytes: &[u8]) -> Result<DynamicImage> {
    let mut decoder = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .into_decoder()?;
    let orientation = decoder.orientation()?;

    let mut image = DynamicImage::from_decoder(decoder)?;
    image.apply_orientation(orientation);
    Ok(image)
}

/// Decode arbitrary image bytes into an RGBA8 buffer.
pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage> {
    let image = image::load_from_memory(bytes)?;
    Ok(image.to_rgba8())
}

pub fn encode(image: &RgbaImage, format: OutputFormat) -> Result<Vec<u8>> {
    match format {
        OutputFormat::Png => encode_png(image),
        OutputFormat::WebP => encode_webp(image),
    }
}

fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut buffer, CompressionType::Best, FilterType::Adaptive);
    encoder.write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ExtendedColorType::Rgba8,
    )?;
    Ok(buffer)
}

fn encode_webp(image: &RgbaImage) -> Result<Vec<u8>> {
    let encoder = webp::Encoder::from_rgba(image.as_raw(), image.width(), image.height());
    let memory = encoder
        .encode_simple(false, WEBP_QUALITY)
        .map_err(|e| Error::encode(format!("WebP encoding failed: {e:?}")))?;
    Ok(memory.to_vec())
}
