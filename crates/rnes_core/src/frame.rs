/// A frame exactly as an engine handed it over, before any validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Declared width in pixels.
    pub width: u32,
    /// Declared height in pixels.
    pub height: u32,
    pub pixels: RawPixels,
}

/// The shapes in which engines deliver pixel payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawPixels {
    /// Packed `RGBA_u8` bytes.
    Bytes(Vec<u8>),
    /// One number per channel, as produced by engines which serialise their framebuffer as a generic array.
    /// Every value has to fit in a byte.
    Values(Vec<u32>),
    /// The engine did not attach any pixel data.
    Absent,
}

impl RawFrame {
    pub fn rgba(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels: RawPixels::Bytes(pixels),
        }
    }
}
