use std::time::Instant;

use anyhow::Context;
use log::LevelFilter;
use winit::event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};

use rnes_core::PreviewEngine;

use crate::config::AppConfig;
use crate::gui::{EguiFramework, GuiAction};
use crate::picker::RomPicker;
use crate::rendering::{Renderer, RendererOptions};
use crate::runner::{EngineRunner, RunnerHandle};
use crate::session::input::KeyDisposition;
use crate::session::Session;
use crate::utils::MainArgs;

mod config;
mod gui;
mod picker;
mod rendering;
mod runner;
mod session;
mod utils;

fn main() {
    let cli_options = utils::parse_main_args();

    if let Err(e) = run(cli_options) {
        log::error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli_options: MainArgs) -> anyhow::Result<()> {
    let config_path = match &cli_options.config {
        Some(path) => path.clone(),
        None => config::get_full_config_path()?,
    };
    let app_config = config::load_config(&config_path)?;

    init_logger(cli_options.log_level.unwrap_or(app_config.log_level))?;
    log::debug!("Using config `{}`", config_path.display());

    let event_loop = EventLoop::new();
    let application = Application::new(cli_options, app_config, &event_loop)?;

    application.run(event_loop)
}

fn init_logger(level: LevelFilter) -> anyhow::Result<()> {
    let cfg = simplelog::ConfigBuilder::new()
        .add_filter_allow_str("rnes_front")
        .add_filter_allow_str("rnes_core")
        .build();

    simplelog::SimpleLogger::init(level, cfg).context("Failed to initialise logger")
}

struct Application {
    session: Session,
    picker: RomPicker,
    runner: Option<RunnerHandle>,
    gui: EguiFramework,
    renderer: Renderer,

    input: winit_input_helper::WinitInputHelper,
}

impl Application {
    pub fn new(cli_options: MainArgs, app_config: AppConfig, event_loop: &EventLoop<()>) -> anyhow::Result<Application> {
        let bindings = app_config.key_bindings().context("Invalid key bindings")?;
        let input = winit_input_helper::WinitInputHelper::new();
        let scale = app_config.scale.max(1);
        let renderer = Renderer::new(
            event_loop,
            RendererOptions {
                width: rnes_core::DISPLAY_WIDTH * scale,
                height: rnes_core::DISPLAY_HEIGHT * scale,
                ..Default::default()
            },
        )?;
        let window_size = renderer.window().inner_size();
        let gui = EguiFramework::new(
            window_size.width,
            window_size.height,
            renderer.scale_factor(),
            &renderer.pixels,
            event_loop,
        );

        let (runner, channel) = EngineRunner::new(Box::new(PreviewEngine::new())).run()?;
        let mut session = Session::new(channel, bindings, app_config.session_options(cli_options.start_paused));

        // Set the initial state according to our CLI parameters
        if let Some(initial_rom) = cli_options.rom {
            session.select_file(Some(initial_rom));
        }

        Ok(Application {
            session,
            picker: RomPicker::default(),
            runner: Some(runner),
            gui,
            renderer,
            input,
        })
    }

    pub fn run(mut self, event_loop: EventLoop<()>) -> ! {
        event_loop.run(move |event, _window, control_flow| {
            // Redraws are paced by vsync through the present mode.
            *control_flow = ControlFlow::Poll;

            // Handle input events
            if self.input.update(&event) {
                // Close events
                if self.input.key_pressed(VirtualKeyCode::Escape) || self.input.quit() {
                    *control_flow = ControlFlow::Exit;
                    return;
                }
                // Update renderer state and request new frame.
                self.renderer.after_window_update(&self.input, &mut self.gui);
            }

            match event {
                Event::WindowEvent { event, window_id } => {
                    if window_id != self.renderer.primary_window_id() {
                        return;
                    }

                    match &event {
                        WindowEvent::DroppedFile(path) => {
                            log::debug!("Dropped file: {:?}", path);
                            self.session.select_file(Some(path.clone()));
                        }
                        WindowEvent::Focused(false) => self.session.on_focus_lost(),
                        WindowEvent::KeyboardInput { input, .. } => {
                            if handle_key(*input, &mut self.session) == KeyDisposition::Consumed {
                                return;
                            }
                        }
                        _ => {}
                    }

                    // Update egui inputs
                    self.gui.handle_event(&event);
                }
                // Draw the current frame
                Event::RedrawRequested(_) => {
                    if let Err(e) = self.redraw() {
                        *control_flow = ControlFlow::Exit;
                        log::error!("Failed to render {:#}", e);
                    }
                }
                Event::LoopDestroyed => {
                    self.session.teardown();

                    if let Some(runner) = self.runner.take() {
                        runner.stop();
                    }
                }
                _ => (),
            }
        });
    }

    fn redraw(&mut self) -> anyhow::Result<()> {
        profiling::scope!("Redraw");

        if let Some(path) = self.picker.poll() {
            self.session.select_file(path);
        }

        self.session.tick(Instant::now());

        if let Some((width, height)) = self.session.surface_mut().take_resize() {
            self.renderer.resize_buffer(width, height)?;
        }
        self.renderer
            .set_program_name(self.session.program().map(|program| program.name.as_str()));

        let actions = self
            .gui
            .prepare(self.renderer.window(), &self.session, self.renderer.fps());

        self.renderer
            .render(self.session.surface().backbuffer(), &mut self.gui)?;

        for action in actions {
            match action {
                GuiAction::OpenRom => self.open_rom(),
                GuiAction::ToggleRunning => {
                    if let Err(e) = self.session.toggle_running() {
                        log::warn!("{}", e);
                    }
                }
                GuiAction::ToggleTestMode => self.session.request_test_mode_toggle(),
            }
        }

        profiling::finish_frame!();

        Ok(())
    }

    /// The selection is handed to the session once the dialog closes, see [Application::redraw].
    fn open_rom(&mut self) {
        if self.picker.is_open() {
            return;
        }

        if let Err(e) = self.session.begin_selection() {
            log::warn!("{}", e);
            return;
        }

        if let Err(e) = self.picker.open() {
            log::error!("{:#}", e);
            self.session.select_file(None);
        }
    }
}

fn handle_key(input: KeyboardInput, session: &mut Session) -> KeyDisposition {
    let Some(key) = input.virtual_keycode else {
        return KeyDisposition::Passthrough;
    };
    let pressed = input.state == ElementState::Pressed;

    if session.on_key_event(key, pressed) == KeyDisposition::Consumed {
        return KeyDisposition::Consumed;
    }

    match key {
        VirtualKeyCode::K if !pressed => {
            if let Err(e) = session.toggle_running() {
                log::warn!("{}", e);
            }
            KeyDisposition::Consumed
        }
        _ => KeyDisposition::Passthrough,
    }
}
