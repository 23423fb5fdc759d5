use std::io::Cursor;

use image::ImageReader;
use image::imageops::FilterType;
use thiserror::Error;

pub const INPUT_WIDTH: u32 = 224;
pub const INPUT_HEIGHT: u32 = 224;
pub const INPUT_CHANNELS: usize = 3;

const CHANNEL_MEAN: [f32; INPUT_CHANNELS] = [0.485, 0.456, 0.406];
const CHANNEL_STD: [f32; INPUT_CHANNELS] = [0.229, 0.224, 0.225];

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Empty upload")]
    EmptyUpload,
    #[error("Unsupported image format")]
    UnsupportedFormat,
    #[error("Corrupt image data: {0}")]
    CorruptImage(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub pixels: Vec<f32>,
    pub width: u32,
    pub height: u32,
}

pub fn decode(bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::EmptyUpload);
    }

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DecodeError::CorruptImage(e.to_string()))?;
    if reader.format().is_none() {
        return Err(DecodeError::UnsupportedFormat);
    }

    let decoded = reader
        .decode()
        .map_err(|e| DecodeError::CorruptImage(e.to_string()))?;

    let resized = decoded
        .resize_exact(INPUT_WIDTH, INPUT_HEIGHT, FilterType::Triangle)
        .to_rgb8();

    // HWC u8 -> CHW f32 with fixed per-channel normalization.
    let plane = (INPUT_WIDTH * INPUT_HEIGHT) as usize;
    let mut pixels = vec![0.0f32; plane * INPUT_CHANNELS];
    for (x, y, pixel) in resized.enumerate_pixels() {
        let offset = (y * INPUT_WIDTH + x) as usize;
        for channel in 0..INPUT_CHANNELS {
            let value = pixel[channel] as f32 / 255.0;
            pixels[channel * plane + offset] = (value - CHANNEL_MEAN[channel]) / CHANNEL_STD[channel];
        }
    }

    Ok(DecodedImage {
        pixels,
        width: INPUT_WIDTH,
        height: INPUT_HEIGHT,
    })
}
