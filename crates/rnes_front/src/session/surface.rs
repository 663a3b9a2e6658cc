use crate::session::errors::DecodeError;
use crate::session::frame::FrameBuffer;

pub const PLACEHOLDER_COLOUR: [u8; 4] = [0x40, 0x10, 0x10, 0xFF];

/// Owns the backbuffer, which is replaced wholesale on every presentation.
pub struct PresentationSurface {
    backbuffer: FrameBuffer,
    placeholder: Option<DecodeError>,
    pending_resize: Option<(u32, u32)>,
}

impl PresentationSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            backbuffer: FrameBuffer::filled(width, height, [0, 0, 0, 0xFF]),
            placeholder: None,
            pending_resize: None,
        }
    }

    pub fn present(&mut self, frame: FrameBuffer) {
        self.note_dimensions(frame.dimensions());
        self.backbuffer = frame;
        self.placeholder = None;
    }

    /// Show a solid fill at the last known dimensions instead of a frame which failed to decode.
    pub fn present_placeholder(&mut self, error: DecodeError) {
        let (width, height) = self.backbuffer.dimensions();

        self.backbuffer = FrameBuffer::filled(width, height, PLACEHOLDER_COLOUR);
        self.placeholder = Some(error);
    }

    pub fn backbuffer(&self) -> &FrameBuffer {
        &self.backbuffer
    }

    /// The reason the current backbuffer is a placeholder, if it is one.
    pub fn placeholder(&self) -> Option<&DecodeError> {
        self.placeholder.as_ref()
    }

    /// The new backbuffer dimensions, once after every change.
    pub fn take_resize(&mut self) -> Option<(u32, u32)> {
        self.pending_resize.take()
    }

    fn note_dimensions(&mut self, dimensions: (u32, u32)) {
        if dimensions != self.backbuffer.dimensions() {
            log::debug!("Backbuffer resized to {}x{}", dimensions.0, dimensions.1);
            self.pending_resize = Some(dimensions);
        }
    }
}

impl Default for PresentationSurface {
    fn default() -> Self {
        Self::new(rnes_core::DISPLAY_WIDTH, rnes_core::DISPLAY_HEIGHT)
    }
}
