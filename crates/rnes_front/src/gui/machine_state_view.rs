use egui::{Context, RichText, TextStyle, Ui};

use rnes_core::{MachineState, StatusFlags};

use crate::gui::colors;

pub struct MachineStateView {
    pub open: bool,
}

impl MachineStateView {
    pub const NAME: &'static str = "Machine State";

    pub fn new() -> Self {
        Self { open: true }
    }

    /// # Arguments
    ///
    /// * `failures` - Polls which failed so far, the last good snapshot stays on display.
    pub fn draw(&mut self, ctx: &Context, state: Option<&MachineState>, failures: u64) {
        egui::containers::Window::new(Self::NAME)
            .resizable(false)
            .open(&mut self.open)
            .show(ctx, |ui| {
                match state {
                    Some(state) => draw_state(ui, state),
                    None => {
                        ui.label("Waiting for the engine...");
                    }
                }

                if failures > 0 {
                    ui.separator();
                    ui.colored_label(colors::DARK_RED, format!("Failed polls: {}", failures));
                }
            });
    }
}

fn draw_state(ui: &mut Ui, state: &MachineState) {
    ui.style_mut().override_text_style = Some(TextStyle::Monospace);

    egui::Grid::new("Machine State Registers Grid")
        .striped(true)
        .show(ui, |ui| {
            register(ui, "A:", format!("{:02X}", state.accumulator));
            register(ui, "X:", format!("{:02X}", state.x_register));
            register(ui, "Y:", format!("{:02X}", state.y_register));
            ui.end_row();

            register(ui, "SP:", format!("{:02X}", state.stack_pointer));
            register(ui, "PC:", format!("{:04X}", state.program_counter));
            ui.end_row();
        });

    ui.separator();

    ui.label("P:");

    let flags = state.flags();

    ui.horizontal(|ui| {
        ui.style_mut().spacing.item_spacing.x = 5.0;

        for (name, flag) in StatusFlags::NAMES {
            draw_flag(ui, name, flags.contains(flag));
        }
    });
}

fn register(ui: &mut Ui, name: &str, value: String) {
    ui.colored_label(colors::DARK_PURPLE, name);
    ui.label(RichText::new(value).background_color(colors::LIGHT_GREY));
}

fn draw_flag(ui: &mut Ui, name: char, set: bool) {
    ui.vertical(|ui| {
        let text = RichText::new(format!("{:b}", set as u8)).background_color(colors::LIGHT_GREY);
        ui.label(text);

        ui.colored_label(colors::DARK_PURPLE, name.to_string());
    });
}
