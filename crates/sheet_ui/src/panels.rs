//! Form and stage panels.
//!
//! The panels never own application state. Each frame they receive a
//! read-only [`FormView`] and [`StageView`] and report what the user did as
//! [`FormActions`]. Only the raw text of the inputs lives here, in
//! [`FormInputs`], because egui edits strings in place.

use std::path::PathBuf;

use egui::{Color32, Pos2, Rect, Stroke, StrokeKind};
use glam::Vec2;
use sheet_core::scale::fit_canvas;

const ACCENT: Color32 = Color32::from_rgb(0x00, 0x7b, 0xff);
const DISABLED: Color32 = Color32::from_rgb(0xcc, 0xcc, 0xcc);
const BORDER: Color32 = Color32::from_rgb(0xcc, 0xcc, 0xcc);
const PLACEHOLDER_BG: Color32 = Color32::from_rgb(0xf0, 0xf0, 0xf0);
const PLACEHOLDER_TEXT: Color32 = Color32::from_rgb(0x66, 0x66, 0x66);
const PLACEHOLDER_DASH: Color32 = Color32::from_rgb(0x99, 0x99, 0x99);

/// Raw text behind the form's inputs.
#[derive(Debug, Clone)]
pub struct FormInputs {
    pub path: String,
    pub width: String,
    pub height: String,
}

impl FormInputs {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            path: String::new(),
            width: width.to_string(),
            height: height.to_string(),
        }
    }
}

/// Read-only snapshot of the form state for one frame.
#[derive(Debug, Clone, Default)]
pub struct FormView<'a> {
    pub selected_file: Option<&'a str>,
    pub can_run: bool,
    pub alert: Option<&'a str>,
    pub live_urls: usize,
    pub session_label: &'a str,
    pub fps: f64,
}

/// What the user did during one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormActions {
    pub open_path: Option<PathBuf>,
    pub browse: bool,
    pub width_changed: Option<String>,
    pub height_changed: Option<String>,
    pub run: bool,
    pub dismiss_alert: bool,
}

/// One textured quad in canvas coordinates.
#[derive(Debug, Clone, Copy)]
pub struct StageSprite {
    pub texture: egui::TextureId,
    pub uv: [f32; 4],
    pub center: Vec2,
    pub size: Vec2,
}

#[derive(Debug, Clone)]
pub enum StageView {
    Placeholder {
        message: String,
    },
    Active {
        container: Vec2,
        canvas: (u32, u32),
        background: [u8; 3],
        sprites: Vec<StageSprite>,
    },
}

pub fn show_form(
    ctx: &egui::Context,
    inputs: &mut FormInputs,
    view: &FormView<'_>,
    actions: &mut FormActions,
) {
    egui::TopBottomPanel::top("upload_form").show(ctx, |ui| {
        ui.add_space(8.0);
        ui.heading("Spritesheet Demo Tool");
        ui.add_space(4.0);

        ui.add_enabled_ui(view.alert.is_none(), |ui| {
            ui.horizontal(|ui| {
                ui.label("1. Spritesheet image:");
                let response = ui.add(
                    egui::TextEdit::singleline(&mut inputs.path)
                        .hint_text("path/to/sheet.png")
                        .desired_width(320.0),
                );
                let submitted =
                    response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                if (ui.button("Open").clicked() || submitted) && !inputs.path.trim().is_empty() {
                    actions.open_path = Some(PathBuf::from(inputs.path.trim()));
                }
                if ui.button("Browse…").clicked() {
                    actions.browse = true;
                }
            });
            match view.selected_file {
                Some(name) => {
                    ui.label(egui::RichText::new(format!("Selected file: {name}")).small());
                }
                None => {
                    ui.label(
                        egui::RichText::new("No file selected (drop an image onto the window)")
                            .small()
                            .weak(),
                    );
                }
            }

            ui.add_space(6.0);
            ui.horizontal(|ui| {
                ui.label("2. Frame width (px):");
                let response =
                    ui.add(egui::TextEdit::singleline(&mut inputs.width).desired_width(80.0));
                if response.changed() {
                    actions.width_changed = Some(inputs.width.clone());
                }
                ui.add_space(20.0);
                ui.label("Frame height (px):");
                let response =
                    ui.add(egui::TextEdit::singleline(&mut inputs.height).desired_width(80.0));
                if response.changed() {
                    actions.height_changed = Some(inputs.height.clone());
                }
            });

            ui.add_space(6.0);
            let run_button = egui::Button::new(
                egui::RichText::new("▶ Run Demo").color(Color32::WHITE),
            )
            .fill(if view.can_run { ACCENT } else { DISABLED });
            let response = ui.add_enabled(view.can_run, run_button);
            if response.clicked() {
                actions.run = true;
            }
            // F5 bypasses the button so the validation path stays reachable.
            // Disabled UI still sees key presses, hence the explicit alert check.
            if view.alert.is_none() && ui.input(|i| i.key_pressed(egui::Key::F5)) {
                actions.run = true;
            }
        });

        ui.add_space(4.0);
        ui.label(
            egui::RichText::new(format!(
                "{} | live preview URLs: {} | {:.0} fps",
                view.session_label, view.live_urls, view.fps
            ))
            .small()
            .weak(),
        );
        ui.add_space(4.0);
    });

    if let Some(message) = view.alert {
        egui::Window::new("Notice")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(message);
                ui.add_space(8.0);
                if ui.button("OK").clicked() || ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    actions.dismiss_alert = true;
                }
            });
    }
}

pub fn show_stage(ctx: &egui::Context, stage: &StageView) {
    egui::CentralPanel::default().show(ctx, |ui| {
        ui.heading("Demo Area");
        ui.add_space(20.0);
        ui.vertical_centered(|ui| match stage {
            StageView::Placeholder { message } => paint_placeholder(ui, message),
            StageView::Active {
                container,
                canvas,
                background,
                sprites,
            } => paint_stage(ui, *container, *canvas, *background, sprites),
        });
    });
}

fn paint_placeholder(ui: &mut egui::Ui, message: &str) {
    let size = clamp_to_available(ui, Vec2::new(800.0, 600.0));
    let (rect, _) = ui.allocate_exact_size(egui::vec2(size.x, size.y), egui::Sense::hover());
    let painter = ui.painter_at(rect.expand(2.0));
    painter.rect_filled(rect, 0.0, PLACEHOLDER_BG);

    let corners = [
        rect.left_top(),
        rect.right_top(),
        rect.right_bottom(),
        rect.left_bottom(),
        rect.left_top(),
    ];
    painter.extend(egui::Shape::dashed_line(
        &corners,
        Stroke::new(2.0, PLACEHOLDER_DASH),
        8.0,
        6.0,
    ));
    painter.text(
        rect.center(),
        egui::Align2::CENTER_CENTER,
        message,
        egui::FontId::proportional(16.0),
        PLACEHOLDER_TEXT,
    );
}

fn paint_stage(
    ui: &mut egui::Ui,
    container: Vec2,
    canvas: (u32, u32),
    background: [u8; 3],
    sprites: &[StageSprite],
) {
    let size = clamp_to_available(ui, container);
    let (rect, _) = ui.allocate_exact_size(egui::vec2(size.x, size.y), egui::Sense::hover());
    // Border sits outside the container; everything else is clipped to it.
    ui.painter()
        .rect_stroke(rect, 0.0, Stroke::new(1.0, BORDER), StrokeKind::Outside);
    let painter = ui.painter_at(rect);

    let display = fit_canvas(canvas, size);
    let origin = Vec2::new(rect.min.x, rect.min.y);
    let canvas_min = origin + display.offset;
    let canvas_rect = Rect::from_min_size(
        Pos2::new(canvas_min.x, canvas_min.y),
        egui::vec2(display.size.x, display.size.y),
    );
    painter.rect_filled(
        canvas_rect,
        0.0,
        Color32::from_rgb(background[0], background[1], background[2]),
    );

    for sprite in sprites {
        let center = origin + display.canvas_to_screen(sprite.center);
        let size = sprite.size * display.scale;
        let quad = Rect::from_center_size(
            Pos2::new(center.x, center.y),
            egui::vec2(size.x, size.y),
        );
        let uv = Rect::from_min_max(
            Pos2::new(sprite.uv[0], sprite.uv[1]),
            Pos2::new(sprite.uv[2], sprite.uv[3]),
        );
        painter.image(sprite.texture, quad, uv, Color32::WHITE);
    }
}

fn clamp_to_available(ui: &egui::Ui, wanted: Vec2) -> Vec2 {
    let available = ui.available_size();
    Vec2::new(
        wanted.x.clamp(1.0, available.x.max(1.0)),
        wanted.y.clamp(1.0, available.y.max(1.0)),
    )
}
