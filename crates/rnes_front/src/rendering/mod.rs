use std::time::Instant;

use anyhow::Context;
use pixels::{wgpu, Pixels};
use winit::event_loop::EventLoop;
use winit::window::{Window, WindowId};

use crate::gui::EguiFramework;
use crate::rendering::framerate::FrameRate;
use crate::session::frame::FrameBuffer;

mod framerate;

pub const TITLE: &str = "RNES";

#[derive(Debug, Clone)]
pub struct RendererOptions {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            title: TITLE.to_string(),
            width: rnes_core::DISPLAY_WIDTH * 3,
            height: rnes_core::DISPLAY_HEIGHT * 3,
        }
    }
}

pub struct Renderer {
    pub pixels: Pixels,
    primary_window: Window,
    framerate: FrameRate,
    last_title_update: Instant,
    program_name: Option<String>,
}

impl Renderer {
    pub fn new(event_loop: &EventLoop<()>, options: RendererOptions) -> anyhow::Result<Self> {
        let window = {
            let size = winit::dpi::LogicalSize::new(options.width as f64, options.height as f64);
            let min_size = winit::dpi::LogicalSize::new(rnes_core::DISPLAY_WIDTH as f64, rnes_core::DISPLAY_HEIGHT as f64);
            winit::window::WindowBuilder::new()
                .with_title(options.title)
                .with_inner_size(size)
                .with_min_inner_size(min_size)
                .build(event_loop)?
        };

        let pixels = {
            let window_size = window.inner_size();
            let surface_texture = pixels::SurfaceTexture::new(window_size.width, window_size.height, &window);

            pixels::PixelsBuilder::new(rnes_core::DISPLAY_WIDTH, rnes_core::DISPLAY_HEIGHT, surface_texture)
                .request_adapter_options(wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::HighPerformance,
                    force_fallback_adapter: false,
                    compatible_surface: None,
                })
                // Fifo waits for vsync, which is what paces the whole session.
                .present_mode(wgpu::PresentMode::Fifo)
                .build()?
        };

        Ok(Self {
            pixels,
            primary_window: window,
            framerate: FrameRate::new(),
            last_title_update: Instant::now(),
            program_name: None,
        })
    }

    pub fn window(&self) -> &Window {
        &self.primary_window
    }

    pub fn primary_window_id(&self) -> WindowId {
        self.primary_window.id()
    }

    pub fn scale_factor(&self) -> f32 {
        self.primary_window.scale_factor() as f32
    }

    pub fn fps(&self) -> f32 {
        self.framerate.fps()
    }

    pub fn request_redraw(&self) {
        self.primary_window.request_redraw();
    }

    pub fn set_program_name(&mut self, name: Option<&str>) {
        if self.program_name.as_deref() != name {
            self.program_name = name.map(str::to_string);
            self.update_title();
        }
    }

    /// To be called after `input.update(event)` returns `true`
    ///
    /// Will update the scale factor, as well as handle window resize events for both `egui` and `pixels`.
    /// Lastly, it will request a redraw.
    pub fn after_window_update(&mut self, input: &winit_input_helper::WinitInputHelper, gui: &mut EguiFramework) {
        if let Some(scale_factor) = input.scale_factor() {
            gui.scale_factor(scale_factor as f32);
        }

        if let Some(size) = input.window_resized() {
            if let Err(e) = self.pixels.resize_surface(size.width, size.height) {
                log::error!("Failed to resize surface: {}", e);
            }
            gui.resize(size.width, size.height);
        }

        if self.last_title_update.elapsed().as_secs() >= 1 {
            self.update_title();
        }

        self.request_redraw();
    }

    /// Match the pixel buffer to new backbuffer dimensions.
    pub fn resize_buffer(&mut self, width: u32, height: u32) -> anyhow::Result<()> {
        self.pixels
            .resize_buffer(width, height)
            .with_context(|| format!("Failed to resize pixel buffer to {}x{}", width, height))
    }

    /// Renders the backbuffer with the GUI on top.
    pub fn render(&mut self, backbuffer: &FrameBuffer, gui: &mut EguiFramework) -> anyhow::Result<()> {
        profiling::scope!("Render");

        let frame = self.pixels.frame_mut();
        anyhow::ensure!(
            frame.len() == backbuffer.pixels().len(),
            "Pixel buffer holds {} bytes but the backbuffer has {}",
            frame.len(),
            backbuffer.pixels().len()
        );
        frame.copy_from_slice(backbuffer.pixels());

        let result = self
            .pixels
            .render_with(|encoder, render_target, context| {
                context.scaling_renderer.render(encoder, render_target);

                gui.render(encoder, render_target, context)?;

                Ok(())
            })
            .context("Failed to render pixels");

        self.framerate.frame_finished();

        result
    }

    fn update_title(&mut self) {
        let fps = self.framerate.fps();
        let title = match &self.program_name {
            Some(name) => format!("{} - {} - [{:.1} FPS]", TITLE, name, fps),
            None => format!("{} - [{:.1} FPS]", TITLE, fps),
        };

        self.primary_window.set_title(&title);
        self.last_title_update = Instant::now();
    }
}
