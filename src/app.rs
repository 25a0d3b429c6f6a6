use std::time::Duration;

use egui::{Align2, Color32, RichText};
use tracing::warn;

use crate::utils::*;

pub struct AttendanceApp {
    shared_state: SharedState,
    frame_interval: Duration,
    texture: Option<egui::TextureHandle>,
    texture_seq: u64,
}

impl AttendanceApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        shared_state: SharedState,
        frame_interval: Duration,
    ) -> Self {
        Self {
            shared_state,
            frame_interval,
            texture: None,
            texture_seq: 0,
        }
    }

    fn on_start_clicked(&self) {
        let mut state = lock(&self.shared_state);
        let readiness = state.readiness();

        let notice = match state.session.toggle(&readiness) {
            Ok(true) => Notice::info("Status", "Recognition mode started"),
            Ok(false) => Notice::info("Status", "Recognition mode stopped"),
            Err(err) => {
                warn!("Cannot start recognition: {}", err);
                Notice::error("Error", capitalize(&err.to_string()))
            }
        };
        state.push_notice(notice);
    }

    /// Upload the latest frame if the worker published a new one.
    fn refresh_texture(&mut self, ctx: &egui::Context) {
        let state = lock(&self.shared_state);
        if state.frame_seq == self.texture_seq {
            return;
        }
        let Some(image) = state.image.as_ref() else {
            return;
        };

        let size = [image.width() as usize, image.height() as usize];
        let color_image = egui::ColorImage::from_rgb(size, image.as_raw());
        self.texture_seq = state.frame_seq;
        drop(state);

        match self.texture.as_mut() {
            Some(texture) => texture.set(color_image, egui::TextureOptions::default()),
            None => {
                self.texture =
                    Some(ctx.load_texture("camera", color_image, egui::TextureOptions::default()));
            }
        }
    }

    fn show_notice(&self, ctx: &egui::Context) {
        let Some(notice) = lock(&self.shared_state).notices.front().cloned() else {
            return;
        };

        let color = match notice.level {
            NoticeLevel::Info => ctx.style().visuals.text_color(),
            NoticeLevel::Error => Color32::LIGHT_RED,
        };

        egui::Window::new(notice.title.as_str())
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(RichText::new(notice.message.as_str()).color(color));
                ui.add_space(8.0);
                if ui.button("OK").clicked() {
                    lock(&self.shared_state).notices.pop_front();
                }
            });
    }
}

impl eframe::App for AttendanceApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.refresh_texture(ctx);

        let modal_open = !lock(&self.shared_state).notices.is_empty();

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Quit").clicked() {
                        _frame.close();
                    }
                });
            });
        });

        egui::SidePanel::left("side_panel")
            .min_width(260.0)
            .show(ctx, |ui| {
                ui.set_enabled(!modal_open);

                let (readiness, recognizing, fps, resolution, roster_size) = {
                    let state = lock(&self.shared_state);
                    (
                        state.readiness(),
                        state.session.is_recognizing(),
                        state.fps.unwrap_or(0.0),
                        state.resolution.unwrap_or((0, 0)),
                        state.roster_size,
                    )
                };

                let label = if recognizing {
                    "Stop recognition"
                } else {
                    "Start recognition"
                };
                let enabled = readiness.camera_open && readiness.detector_loaded;
                if ui
                    .add_enabled(enabled, egui::Button::new(label))
                    .clicked()
                {
                    self.on_start_clicked();
                }

                ui.separator();
                ui.add(egui::Label::new(format!("FPS: {}", fps)));
                ui.add(egui::Label::new(format!(
                    "Resolution: {}x{}",
                    resolution.0, resolution.1
                )));
                ui.add(egui::Label::new(format!("Roster: {} records", roster_size)));
                ui.add(egui::Label::new(format!(
                    "Training samples: {}",
                    readiness.training_samples
                )));

                ui.separator();
                egui::ScrollArea::vertical().show(ui, |ui| {
                    attendance_table(ui, &self.shared_state);
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(texture) = self.texture.as_ref() else {
                ui.centered_and_justified(|ui| {
                    ui.label("Waiting for camera…");
                });
                return;
            };

            // scale the frame to the panel width, keeping its aspect ratio
            let [width, height] = texture.size();
            let ui_img_width = ui.available_width();
            let ui_img_height = ui_img_width * height as f32 / width.max(1) as f32;

            ui.image(texture, egui::Vec2::new(ui_img_width, ui_img_height));
        });

        self.show_notice(ctx);

        ctx.request_repaint_after(self.frame_interval);
    }
}

fn attendance_table(ui: &mut egui::Ui, shared_state: &SharedState) {
    let state = lock(shared_state);

    egui::Grid::new("attendance_table")
        .num_columns(2)
        .striped(true)
        .show(ui, |ui| {
            ui.strong("Name");
            ui.strong("Check-in time");
            ui.end_row();

            for row in state.attendance.rows() {
                ui.label(row.name.as_str());
                ui.label(row.formatted_time());
                ui.end_row();
            }
        });
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
