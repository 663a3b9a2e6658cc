//! Validation of raw engine frames into the canonical [FrameBuffer].
use rnes_core::{RawFrame, RawPixels};

use crate::session::errors::DecodeError;

/// Frames larger than this in either direction are rejected, no display texture can hold them.
pub const MAX_DIMENSION: u32 = 4096;

/// A validated `RGBA_u8` frame, `pixels.len() == width * height * 4` always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl FrameBuffer {
    /// A frame where every pixel has the given colour.
    pub fn filled(width: u32, height: u32, colour: [u8; 4]) -> Self {
        let pixels = colour.repeat(width as usize * height as usize);

        Self { width, height, pixels }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::filled(rnes_core::DISPLAY_WIDTH, rnes_core::DISPLAY_HEIGHT, [0, 0, 0, 0xFF])
    }
}

/// Check a raw frame's shape and normalise its payload to bytes.
///
/// Payloads longer than the declared dimensions require are cut to size.
pub fn decode(raw: RawFrame) -> Result<FrameBuffer, DecodeError> {
    let RawFrame { width, height, pixels } = raw;

    let pixels = match pixels {
        RawPixels::Absent => return Err(DecodeError::MissingPixels),
        RawPixels::Bytes(mut bytes) => {
            let expected = expected_len(width, height, bytes.len())?;
            bytes.truncate(expected);
            bytes
        }
        RawPixels::Values(values) => {
            let expected = expected_len(width, height, values.len())?;

            values[..expected]
                .iter()
                .enumerate()
                .map(|(index, &value)| u8::try_from(value).map_err(|_| DecodeError::ValueOutOfRange { index, value }))
                .collect::<Result<Vec<u8>, _>>()?
        }
    };

    Ok(FrameBuffer { width, height, pixels })
}

/// The amount of channel values a `width` x `height` frame needs, if `actual` provides at least that many.
fn expected_len(width: u32, height: u32, actual: usize) -> Result<usize, DecodeError> {
    if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(DecodeError::InvalidDimensions { width, height });
    }

    let expected = width as usize * height as usize * 4;

    if actual < expected {
        return Err(DecodeError::Truncated {
            width,
            height,
            expected,
            actual,
        });
    }

    Ok(expected)
}
