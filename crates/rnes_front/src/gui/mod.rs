use egui::{Align, Align2, ClippedPrimitive, Color32, Context, Layout, RichText, TexturesDelta};
use egui_wgpu_backend::{BackendError, RenderPass, ScreenDescriptor};
use pixels::{wgpu, PixelsContext};
use winit::event_loop::EventLoop;
use winit::window::Window;

use crate::gui::machine_state_view::MachineStateView;
use crate::session::lifecycle::ProgramStatus;
use crate::session::Session;

mod colors;
mod machine_state_view;

/// Requests from the GUI which need more than the session to carry out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuiAction {
    OpenRom,
    ToggleRunning,
    ToggleTestMode,
}

/// Manages all state required for rendering egui over `Pixels`.
pub struct EguiFramework {
    // State for egui.
    egui_ctx: Context,
    // Egui Winit helper
    egui_state: egui_winit::State,
    // Egui WebGPU backend
    rpass: RenderPass,
    screen_descriptor: ScreenDescriptor,
    paint_jobs: Vec<ClippedPrimitive>,
    textures: TexturesDelta,

    gui: Gui,
}

impl EguiFramework {
    pub fn new(width: u32, height: u32, scale_factor: f32, pixels: &pixels::Pixels, event_loop: &EventLoop<()>) -> Self {
        let max_texture_size = pixels.device().limits().max_texture_dimension_2d as usize;
        let mut egui_state = egui_winit::State::new(event_loop);
        egui_state.set_pixels_per_point(scale_factor);
        egui_state.set_max_texture_side(max_texture_size);

        let screen_descriptor = ScreenDescriptor {
            physical_width: width,
            physical_height: height,
            scale_factor,
        };
        let rpass = RenderPass::new(pixels.device(), pixels.render_texture_format(), 1);

        Self {
            egui_ctx: Context::default(),
            egui_state,
            screen_descriptor,
            rpass,
            paint_jobs: Vec::new(),
            textures: Default::default(),
            gui: Gui::new(),
        }
    }

    /// Run the egui frame and create all paint jobs to prepare for rendering.
    pub fn prepare(&mut self, window: &Window, session: &Session, fps: f32) -> Vec<GuiAction> {
        profiling::scope!("Prepare GUI");

        let mut actions = Vec::new();
        let raw_input = self.egui_state.take_egui_input(window);
        let full_output = self.egui_ctx.run(raw_input, |egui_ctx| {
            actions = self.gui.ui(egui_ctx, session, fps);
        });

        self.textures.append(full_output.textures_delta);
        self.egui_state
            .handle_platform_output(window, &self.egui_ctx, full_output.platform_output);
        self.paint_jobs = self.egui_ctx.tessellate(full_output.shapes);

        actions
    }

    /// Render egui.
    pub fn render(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        render_target: &wgpu::TextureView,
        context: &PixelsContext,
    ) -> Result<(), BackendError> {
        // Upload all resources to the GPU.
        self.rpass
            .add_textures(&context.device, &context.queue, &self.textures)?;

        self.rpass.update_buffers(
            &context.device,
            &context.queue,
            &self.paint_jobs,
            &self.screen_descriptor,
        );

        self.rpass
            .execute(encoder, render_target, &self.paint_jobs, &self.screen_descriptor, None)?;

        let textures = std::mem::take(&mut self.textures);
        self.rpass.remove_textures(textures)
    }

    /// Handle input events from the window manager.
    ///
    /// # Returns
    ///
    /// Whether egui wants the event for itself.
    pub fn handle_event(&mut self, event: &winit::event::WindowEvent) -> bool {
        self.egui_state.on_event(&self.egui_ctx, event).consumed
    }

    /// Resize egui.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.screen_descriptor.physical_width = width;
            self.screen_descriptor.physical_height = height;
        }
    }

    /// Update scaling factor.
    pub fn scale_factor(&mut self, scale_factor: f32) {
        self.screen_descriptor.scale_factor = scale_factor;
        self.egui_ctx.set_pixels_per_point(scale_factor);
    }
}

struct Gui {
    machine_state_view: MachineStateView,
}

impl Gui {
    fn new() -> Self {
        Self {
            machine_state_view: MachineStateView::new(),
        }
    }

    fn ui(&mut self, ctx: &Context, session: &Session, fps: f32) -> Vec<GuiAction> {
        let mut actions = Vec::new();

        egui::TopBottomPanel::top("menubar_container").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("Emulation", |ui| {
                    if ui.button("Open ROM...").clicked() {
                        actions.push(GuiAction::OpenRom);
                        ui.close_menu()
                    }

                    let mut running = session.is_running();
                    let running_toggle = egui::Checkbox::new(&mut running, "Running (K)");
                    if ui.add_enabled(session.can_toggle_running(), running_toggle).clicked() {
                        actions.push(GuiAction::ToggleRunning);
                        ui.close_menu()
                    }

                    // Only reflects the engine's answer, so the click itself must not flip it.
                    let mut test_mode = session.test_mode_enabled();
                    let label = if session.test_mode_pending() { "Test mode (waiting...)" } else { "Test mode" };
                    if ui.checkbox(&mut test_mode, label).clicked() {
                        actions.push(GuiAction::ToggleTestMode);
                        ui.close_menu()
                    }
                });

                ui.menu_button("View", |ui| {
                    ui.checkbox(&mut self.machine_state_view.open, MachineStateView::NAME);
                });
            });
        });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let status = session.status();
                let status_text = RichText::new(status.to_string());
                let status_text = match status {
                    ProgramStatus::Error(_) => status_text.color(colors::LIGHT_RED),
                    ProgramStatus::Ready => status_text.color(colors::HIGHLIGHT),
                    _ => status_text,
                };
                ui.label(status_text);

                if let Some(program) = session.program() {
                    ui.separator();
                    ui.label(program.name.as_str());
                }

                ui.separator();
                ui.label(format!("Frame: {}", session.frame_count()));

                if session.decode_failures() > 0 {
                    ui.separator();
                    ui.colored_label(colors::DARK_RED, format!("Bad frames: {}", session.decode_failures()));
                }

                let held = session.controller_state();
                if held.bits() != 0 {
                    let names: Vec<String> = held.pressed().map(|button| format!("{:?}", button)).collect();
                    ui.separator();
                    ui.label(names.join(" "));
                }

                if session.test_mode_enabled() {
                    ui.separator();
                    ui.colored_label(colors::DARK_PURPLE, "TEST MODE");
                }

                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    ui.label(format!("{:.1} FPS", fps));
                });
            });
        });

        if let Some(error) = session.surface().placeholder() {
            egui::Area::new("placeholder")
                .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
                .interactable(false)
                .show(ctx, |ui| {
                    ui.label(RichText::new(error.short_text()).heading().color(Color32::WHITE));
                });
        }

        self.machine_state_view
            .draw(ctx, session.machine_state(), session.diagnostics_failures());

        actions
    }
}
