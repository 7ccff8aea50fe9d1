//! Encoded payload to RGB raster.

use crate::error::DecodeError;
use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use image::RgbImage;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Standard alphabet; trailing `=` padding optional.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode a base64 image payload (optionally a `data:<mime>;base64,` URL).
#[cfg_attr(feature = "tracing", instrument(level = "debug", skip(payload), fields(len = payload.len())))]
pub fn decode_base64_image(payload: &str) -> Result<RgbImage, DecodeError> {
    let body = strip_data_url(payload.trim());
    let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = PAYLOAD_ENGINE.decode(compact.as_bytes())?;
    decode_image_bytes(&bytes)
}

/// Decode compressed image bytes; the format is sniffed from the content.
pub fn decode_image_bytes(bytes: &[u8]) -> Result<RgbImage, DecodeError> {
    let img = image::load_from_memory(bytes)?;
    if img.width() == 0 || img.height() == 0 {
        return Err(DecodeError::EmptyImage);
    }
    log::debug!("decoded {}x{} {:?}", img.width(), img.height(), img.color());
    Ok(img.to_rgb8())
}

fn strip_data_url(s: &str) -> &str {
    if !s.starts_with("data:") {
        return s;
    }
    match s.find(";base64,") {
        Some(i) => &s[i + ";base64,".len()..],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};
    use std::io::Cursor;

    fn png_bytes(img: &RgbImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).expect("encode png");
        buf.into_inner()
    }

    fn sample() -> RgbImage {
        RgbImage::from_fn(7, 5, |x, y| Rgb([(x * 30) as u8, (y * 40) as u8, 200]))
    }

    #[test]
    fn png_round_trip_is_exact() {
        let img = sample();
        let encoded = base64::engine::general_purpose::STANDARD.encode(png_bytes(&img));
        let decoded = decode_base64_image(&encoded).expect("decode");
        assert_eq!(decoded, img);
    }

    #[test]
    fn data_url_whitespace_and_missing_padding_are_accepted() {
        let img = sample();
        let encoded = base64::engine::general_purpose::STANDARD_NO_PAD.encode(png_bytes(&img));
        let (a, b) = encoded.split_at(encoded.len() / 2);
        let payload = format!("  data:image/png;base64,{a}\n{b}\n");
        assert_eq!(decode_base64_image(&payload).expect("decode"), img);
    }

    #[test]
    fn invalid_base64_and_garbage_bytes_fail() {
        assert!(matches!(
            decode_base64_image("not*base64!"),
            Err(DecodeError::Base64(_))
        ));
        let garbage = base64::engine::general_purpose::STANDARD.encode(b"hello, world");
        assert!(matches!(
            decode_base64_image(&garbage),
            Err(DecodeError::Image(_))
        ));
        assert!(matches!(decode_image_bytes(&[]), Err(DecodeError::Image(_))));
    }
}
