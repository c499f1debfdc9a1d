//! Desktop form for a single move or move-and-measure run.
//!
//! Runs execute on a background tokio runtime; the result comes back over a
//! channel that is polled every frame.

use std::sync::mpsc::{Receiver, TryRecvError, channel};

use eframe::egui;
use tracing::{error, info};

use crate::{
    config::AppConfig,
    form::{FormInput, FormKind},
    jobs,
    scan::{Direction, ScanReport},
};

pub struct StageScanApp {
    config: AppConfig,
    runtime: tokio::runtime::Runtime,
    input: FormInput,
    kind: FormKind,
    pending: Option<Receiver<anyhow::Result<ScanReport>>>,
}

impl StageScanApp {
    pub fn new(config: AppConfig, runtime: tokio::runtime::Runtime) -> Self {
        let input = FormInput {
            wavelength_nm: config.job.wavelength_nm.to_string(),
            ..Default::default()
        };

        Self {
            config,
            runtime,
            input,
            kind: FormKind::MoveAndMeasure,
            pending: None,
        }
    }

    fn is_running(&self) -> bool {
        self.pending.is_some()
    }

    /// Every form input is locked while a run is in flight.
    fn inputs_enabled(&self) -> bool {
        !self.is_running()
    }

    fn start(&mut self, ctx: &egui::Context) {
        let request = match self.input.validate(self.kind, self.config.job.samples) {
            Ok(request) => request,
            Err(e) => {
                show_error("Invalid input", &e.to_string());
                return;
            }
        };

        info!(?request, "Starting run from the form");

        let (tx, rx) = channel();
        let config = self.config.clone();
        let options = config.scan_options();
        let ctx = ctx.clone();

        self.runtime.spawn(async move {
            let result = jobs::execute_scan(&config, &request, &options).await;
            let _ = tx.send(result);
            ctx.request_repaint();
        });

        self.pending = Some(rx);
    }

    fn poll_result(&mut self) {
        let Some(rx) = &self.pending else {
            return;
        };

        match rx.try_recv() {
            Ok(Ok(report)) => {
                self.pending = None;
                let message = if report.reached {
                    format!(
                        "The stage has reached the target position ({:.4} mm).",
                        report.final_mm
                    )
                } else {
                    format!(
                        "The stage stopped at {:.4} mm, outside the tolerance of the {:.4} mm target.",
                        report.final_mm, report.target_mm
                    )
                };
                show_info("Done", &message);
            }
            Ok(Err(e)) => {
                self.pending = None;
                error!("Run failed: {:#}", e);
                show_error("Run failed", &format!("{e:#}"));
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                self.pending = None;
                show_error("Run failed", "The run ended without a result");
            }
        }
    }

    fn form(&mut self, ui: &mut egui::Ui) {
        let enabled = self.inputs_enabled();

        ui.add_enabled_ui(enabled, |ui| {
            ui.horizontal(|ui| {
                ui.selectable_value(&mut self.kind, FormKind::Move, "Move");
                ui.selectable_value(&mut self.kind, FormKind::MoveAndMeasure, "Move and measure");
            });
        });
        ui.separator();

        egui::Grid::new("scan_form")
            .num_columns(2)
            .spacing([12.0, 8.0])
            .show(ui, |ui| {
                ui.label("Target position (mm)");
                ui.add_enabled(
                    enabled,
                    egui::TextEdit::singleline(&mut self.input.target_mm),
                );
                ui.end_row();

                ui.label("Number of steps");
                ui.add_enabled(enabled, egui::TextEdit::singleline(&mut self.input.steps));
                ui.end_row();

                ui.label("Direction");
                ui.add_enabled_ui(enabled, |ui| {
                    ui.horizontal(|ui| {
                        ui.radio_value(&mut self.input.direction, Direction::Forward, "Forward");
                        ui.radio_value(&mut self.input.direction, Direction::Backward, "Backward");
                    });
                });
                ui.end_row();

                if self.kind == FormKind::MoveAndMeasure {
                    ui.label("Wavelength (nm)");
                    ui.add_enabled(
                        enabled,
                        egui::TextEdit::singleline(&mut self.input.wavelength_nm),
                    );
                    ui.end_row();

                    ui.label("Save to");
                    ui.horizontal(|ui| {
                        if ui
                            .add_enabled(enabled, egui::Button::new("Browse…"))
                            .clicked()
                        {
                            if let Some(path) = rfd::FileDialog::new()
                                .set_file_name("power_scan.txt")
                                .add_filter("Text Files", &["txt"])
                                .add_filter("All Files", &["*"])
                                .save_file()
                            {
                                self.input.save_path = Some(path);
                            }
                        }
                        match &self.input.save_path {
                            Some(path) => ui.label(path.display().to_string()),
                            None => ui.weak("No file selected"),
                        };
                    });
                    ui.end_row();
                }
            });

        ui.separator();
        ui.horizontal(|ui| {
            if ui.add_enabled(enabled, egui::Button::new("Run")).clicked() {
                self.start(ui.ctx());
            }
            if !enabled {
                ui.spinner();
                ui.label("Running…");
            }
        });
    }
}

impl eframe::App for StageScanApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_result();

        egui::CentralPanel::default().show(ctx, |ui| self.form(ui));

        if self.is_running() {
            ctx.request_repaint_after(std::time::Duration::from_millis(200));
        }
    }
}

fn show_error(title: &str, message: &str) {
    rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Error)
        .set_title(title)
        .set_description(message)
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
}

fn show_info(title: &str, message: &str) {
    rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Info)
        .set_title(title)
        .set_description(message)
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
}
