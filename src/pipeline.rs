use crate::{
    Result,
    imaging::{self, OutputFormat},
    segmenter::Segmenter,
};

/// Segment `input` and re-encode the cutout as `format`.
pub fn remove_background(
    segmenter: &dyn Segmenter,
    input: &[u8],
    format: OutputFormat,
) -> Result<Vec<u8>> {
    let segmented = segmenter.segment(input)?;
    let rgba = imaging::decode_rgba(&segmented)?;
    imaging::encode(&rgba, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    /// Returns a fixed half-transparent tile regardless of input.
    struct Fixed;

    impl Segmenter for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn segment(&self, _image: &[u8]) -> Result<Vec<u8>> {
            let tile = RgbaImage::from_fn(8, 8, |x, _| {
                if x < 4 {
                    Rgba([255, 255, 255, 255])
                } else {
                    Rgba([0, 0, 0, 0])
                }
            });
            let mut bytes = Vec::new();
            image::DynamicImage::ImageRgba8(tile).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
            Ok(bytes)
        }
    }

    struct Failing;

    impl Segmenter for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn segment(&self, _image: &[u8]) -> Result<Vec<u8>> {
            Err(Error::inference("model exploded"))
        }
    }

    #[test]
    fn test_png_output_has_alpha() {
        let output = remove_background(&Fixed, b"ignored", OutputFormat::Png).unwrap();
        let decoded = image::load_from_memory_with_format(&output, ImageFormat::Png).unwrap();
        assert!(decoded.color().has_alpha());
        assert_eq!(decoded.to_rgba8().get_pixel(6, 0), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_webp_output() {
        let output = remove_background(&Fixed, b"ignored", OutputFormat::WebP).unwrap();
        assert_eq!(image::guess_format(&output).unwrap(), ImageFormat::WebP);
    }

    #[test]
    fn test_segmenter_failure_propagates() {
        let err = remove_background(&Failing, b"ignored", OutputFormat::Png).unwrap_err();
        assert_eq!(err.to_string(), "Inference error: model exploded");
    }
}
