use std::io::Cursor;
use std::str::FromStr;

use base64::{engine::general_purpose, Engine as _};
use image::ImageFormat;
use thumbsim_core::{RasterImage, SimError, SimResult};

/// Encoded output formats for embedded images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
}

impl OutputFormat {
    /// Subtype used in `data:image/<subtype>;base64,`
    pub fn subtype(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpeg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }

    fn image_format(&self) -> ImageFormat {
        match self {
            OutputFormat::Png => ImageFormat::Png,
            OutputFormat::Jpeg => ImageFormat::Jpeg,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            other => Err(SimError::EncodingError {
                reason: format!("unsupported output format '{}'", other),
            }),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.subtype())
    }
}

/// Encode to an in-memory PNG or JPEG stream
pub fn encode_image(img: &RasterImage, format: OutputFormat) -> SimResult<Vec<u8>> {
    if img.width() == 0 || img.height() == 0 {
        return Err(SimError::EncodingError {
            reason: format!("cannot encode an empty {}x{} image", img.width(), img.height()),
        });
    }
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), format.image_format())
        .map_err(|e| SimError::EncodingError { reason: e.to_string() })?;
    Ok(bytes)
}

/// `data:image/<format>;base64,<payload>`
pub fn encode_to_data_uri(img: &RasterImage, format: OutputFormat) -> SimResult<String> {
    let bytes = encode_image(img, format)?;
    Ok(format!(
        "data:image/{};base64,{}",
        format.subtype(),
        general_purpose::STANDARD.encode(bytes)
    ))
}

/// Split a data URI produced by `encode_to_data_uri` back into format and bytes
pub fn decode_data_uri(uri: &str) -> SimResult<(OutputFormat, Vec<u8>)> {
    let malformed = || SimError::EncodingError {
        reason: "malformed image data URI".to_string(),
    };
    let rest = uri.strip_prefix("data:image/").ok_or_else(malformed)?;
    let (subtype, payload) = rest.split_once(";base64,").ok_or_else(malformed)?;
    let format = subtype.parse()?;
    let bytes = general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| SimError::EncodingError { reason: e.to_string() })?;
    Ok((format, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn create_test_image() -> RasterImage {
        RasterImage::from_fn(37, 23, |x, y| Rgb([(x * 6) as u8, (y * 11) as u8, 128]))
    }

    #[test]
    fn test_png_data_uri_decodes_to_same_pixels() {
        let img = create_test_image();
        let uri = encode_to_data_uri(&img, OutputFormat::Png).unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));

        let (format, bytes) = decode_data_uri(&uri).unwrap();
        assert_eq!(format, OutputFormat::Png);
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(decoded, img);
    }

    #[test]
    fn test_jpeg_data_uri_keeps_dimensions() {
        let img = create_test_image();
        let uri = encode_to_data_uri(&img, OutputFormat::Jpeg).unwrap();
        assert!(uri.starts_with("data:image/jpeg;base64,"));

        let (_, bytes) = decode_data_uri(&uri).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (37, 23));
    }

    #[test]
    fn test_parse_formats() {
        assert_eq!("PNG".parse::<OutputFormat>().unwrap(), OutputFormat::Png);
        assert_eq!("jpg".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert!(matches!("gif".parse::<OutputFormat>(), Err(SimError::EncodingError { .. })));
    }

    #[test]
    fn test_empty_image_fails() {
        let result = encode_to_data_uri(&RasterImage::new(0, 5), OutputFormat::Png);
        assert!(matches!(result, Err(SimError::EncodingError { .. })));
    }

    #[test]
    fn test_malformed_uri() {
        assert!(decode_data_uri("data:text/plain;base64,AAAA").is_err());
        assert!(decode_data_uri("data:image/png;base64,***").is_err());
    }
}
