use egui::Color32;

pub const DARK_PURPLE: Color32 = Color32::from_rgb(125, 0, 125);
pub const LIGHT_GREY: Color32 = Color32::from_rgb(45, 45, 45);
pub const DARK_RED: Color32 = Color32::from_rgb(140, 0, 0);
pub const LIGHT_RED: Color32 = Color32::from_rgb(255, 0, 0);
pub const HIGHLIGHT: Color32 = Color32::from_rgb(0, 140, 140);
