use std::path::PathBuf;

use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use egui::Align2;
use serde::{Deserialize, Serialize};
use shared::{
    domain::{OutputFormat, SessionId},
    protocol::ProgressUpdate,
};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorCategory, UiErrorContext, UiEvent};
use crate::controller::form::FormState;
use crate::controller::orchestration::dispatch_backend_command;

pub const SETTINGS_STORAGE_KEY: &str = "converter_desktop_settings";

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PersistedSettings {
    pub last_format: OutputFormat,
}

/// Lifecycle of one conversion attempt. `Converting` only exists under the
/// session contract; the direct-binary contract goes straight from
/// `Submitting` back to `Idle`.
#[derive(Debug, Clone, PartialEq)]
enum ConversionPhase {
    Idle,
    Submitting,
    Converting {
        session_id: SessionId,
        latest: Option<ProgressUpdate>,
    },
}

fn err_label(category: UiErrorCategory) -> &'static str {
    match category {
        UiErrorCategory::Validation => "Invalid input",
        UiErrorCategory::Request => "Request failed",
        UiErrorCategory::Stream => "Conversion failed",
        UiErrorCategory::Unknown => "Unexpected error",
    }
}

pub struct ConverterApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    form: FormState,
    phase: ConversionPhase,
    status: String,
    active_error: Option<UiError>,
    last_saved: Option<PathBuf>,
}

impl ConverterApp {
    pub fn new(
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
        persisted: Option<PersistedSettings>,
    ) -> Self {
        let format = persisted
            .map(|settings| settings.last_format)
            .unwrap_or_default();
        Self {
            cmd_tx,
            ui_rx,
            form: FormState::new(format),
            phase: ConversionPhase::Idle,
            status: String::new(),
            active_error: None,
            last_saved: None,
        }
    }

    /// Restore the idle configuration. Idempotent; every terminal outcome
    /// funnels through here so the attempt leaves no residue behind.
    fn reset(&mut self) {
        self.phase = ConversionPhase::Idle;
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Info(message) => {
                    self.status = message;
                }
                UiEvent::ConversionAccepted(session_id) => {
                    self.status = "Converting...".to_string();
                    self.phase = ConversionPhase::Converting {
                        session_id,
                        latest: None,
                    };
                }
                UiEvent::Progress(update) => {
                    if let ConversionPhase::Converting { latest, .. } = &mut self.phase {
                        *latest = Some(update);
                    }
                }
                UiEvent::ConversionFinished { saved_to } => {
                    self.status = match &saved_to {
                        Some(path) => format!("Saved to {}", path.display()),
                        None => "Conversion finished; save was cancelled".to_string(),
                    };
                    self.last_saved = saved_to;
                    self.reset();
                }
                UiEvent::Error(error) => {
                    tracing::error!(context = ?error.context(), "conversion attempt failed: {}", error.message());
                    self.active_error = Some(error);
                    self.reset();
                }
            }
        }
    }

    fn offer_file(&mut self, path: PathBuf) {
        match self.form.offer_file(path) {
            Ok(()) => {
                if let Some(name) = self.form.selected_file_name() {
                    self.status = format!("Selected file: {name}");
                }
            }
            Err(err) => {
                self.active_error = Some(UiError::new(
                    UiErrorCategory::Validation,
                    UiErrorContext::Submit,
                    err.user_message(),
                ));
            }
        }
    }

    fn on_convert_clicked(&mut self) {
        match self.form.build_submission() {
            Ok(submission) => {
                // A new attempt invalidates whatever the previous one left
                // on screen.
                self.reset();
                self.last_saved = None;
                let dispatched = dispatch_backend_command(
                    &self.cmd_tx,
                    BackendCommand::Convert {
                        input: submission.input,
                        format: submission.format,
                    },
                    &mut self.status,
                );
                if dispatched {
                    self.status = "Uploading...".to_string();
                    self.phase = ConversionPhase::Submitting;
                }
            }
            Err(err) => {
                self.active_error = Some(UiError::new(
                    UiErrorCategory::Validation,
                    UiErrorContext::Submit,
                    err.user_message(),
                ));
            }
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        if self.phase != ConversionPhase::Idle || self.active_error.is_some() {
            return;
        }
        let dropped = ctx.input(|input| input.raw.dropped_files.clone());
        if let Some(file) = dropped.into_iter().next() {
            if let Some(path) = file.path {
                self.offer_file(path);
            }
        }
    }

    fn draw_upload_area(&mut self, ui: &mut egui::Ui) {
        let hovering_files = ui.ctx().input(|input| !input.raw.hovered_files.is_empty());
        let fill = if hovering_files {
            ui.visuals().selection.bg_fill.gamma_multiply(0.2)
        } else {
            ui.visuals().faint_bg_color
        };
        egui::Frame::group(ui.style()).fill(fill).show(ui, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(12.0);
                ui.label("Drop an audio file here");
                if ui.button("Browse...").clicked() {
                    let picked = rfd::FileDialog::new()
                        .add_filter("Audio", &["mp3", "wav", "flac", "ogg", "m4a", "aac"])
                        .pick_file();
                    if let Some(path) = picked {
                        self.offer_file(path);
                    }
                }
                match self.form.selected_file_name() {
                    Some(name) => ui.label(format!("Selected file: {name}")),
                    None => ui.weak("No file selected"),
                };
                ui.add_space(12.0);
            });
        });
    }

    fn show_form(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Audio Conversion");
            ui.add_space(8.0);

            let idle = self.phase == ConversionPhase::Idle;
            ui.add_enabled_ui(idle, |ui| {
                self.draw_upload_area(ui);
                ui.add_space(8.0);
                ui.label("Or convert from a media URL:");
                let response = ui.add(
                    egui::TextEdit::singleline(&mut self.form.url_text)
                        .hint_text("https://www.youtube.com/watch?v=..."),
                );
                if response.changed() {
                    self.form.apply_url_edit();
                }
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    ui.label("Output format:");
                    for format in OutputFormat::ALL {
                        ui.radio_value(&mut self.form.format, format, format.label());
                    }
                });
            });

            ui.add_space(12.0);
            let mut convert_clicked = false;
            match &self.phase {
                ConversionPhase::Idle => {
                    if ui.button("Convert").clicked() {
                        convert_clicked = true;
                    }
                }
                ConversionPhase::Submitting => {
                    ui.horizontal(|ui| {
                        ui.add(egui::Spinner::new());
                        ui.label("Uploading...");
                    });
                }
                ConversionPhase::Converting { latest, .. } => {
                    let (fraction, label, step) = match latest {
                        Some(update) => (
                            f32::from(update.percent()) / 100.0,
                            format!("{}%", update.percent()),
                            update.current_step.clone(),
                        ),
                        None => (0.0, "0%".to_string(), String::new()),
                    };
                    ui.add(egui::ProgressBar::new(fraction).text(label));
                    if !step.is_empty() {
                        ui.label(step);
                    }
                }
            }
            if convert_clicked {
                self.on_convert_clicked();
            }

            ui.add_space(12.0);
            if !self.status.is_empty() {
                ui.weak(self.status.as_str());
            }
            if let Some(path) = &self.last_saved {
                ui.weak(format!("Last saved: {}", path.display()));
            }
        });
    }

    fn draw_error_modal(&mut self, ctx: &egui::Context) {
        let Some(error) = self.active_error.clone() else {
            return;
        };
        egui::Window::new(err_label(error.category()))
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(error.message());
                ui.add_space(8.0);
                if ui.button("OK").clicked() {
                    self.active_error = None;
                }
            });
    }
}

impl eframe::App for ConverterApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();
        self.handle_dropped_files(ctx);
        self.show_form(ctx);
        self.draw_error_modal(ctx);

        // Progress arrives over the channel without any input event, so keep
        // repainting while an attempt is in flight.
        if self.phase != ConversionPhase::Idle {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        let settings = PersistedSettings {
            last_format: self.form.format,
        };
        if let Ok(serialized) = serde_json::to_string(&settings) {
            storage.set_string(SETTINGS_STORAGE_KEY, serialized);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use shared::protocol::ProgressStatus;

    fn test_app() -> (
        ConverterApp,
        crossbeam_channel::Receiver<BackendCommand>,
        Sender<UiEvent>,
    ) {
        let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(4);
        let (ui_tx, ui_rx) = bounded::<UiEvent>(16);
        (ConverterApp::new(cmd_tx, ui_rx, None), cmd_rx, ui_tx)
    }

    fn snapshot(progress: u64, total: u64, status: ProgressStatus) -> ProgressUpdate {
        ProgressUpdate {
            progress,
            total,
            current_step: "Transcribing".to_string(),
            status,
            error: None,
        }
    }

    #[test]
    fn terminal_error_restores_the_initial_idle_state() {
        let (mut app, _cmd_rx, ui_tx) = test_app();
        app.phase = ConversionPhase::Converting {
            session_id: SessionId("sess-42".to_string()),
            latest: Some(snapshot(50, 200, ProgressStatus::InProgress)),
        };

        ui_tx
            .send(UiEvent::Error(UiError::new(
                UiErrorCategory::Stream,
                UiErrorContext::Progress,
                "Error: decoding input",
            )))
            .expect("queue error event");
        app.process_ui_events();

        assert_eq!(app.phase, ConversionPhase::Idle);
        let error = app.active_error.as_ref().expect("blocking error shown");
        assert_eq!(error.category(), UiErrorCategory::Stream);
        assert_eq!(error.message(), "Error: decoding input");
    }

    #[test]
    fn finished_conversion_resets_and_reports_the_saved_path() {
        let (mut app, _cmd_rx, ui_tx) = test_app();
        app.phase = ConversionPhase::Submitting;

        ui_tx
            .send(UiEvent::ConversionFinished {
                saved_to: Some(PathBuf::from("/tmp/out.mp3")),
            })
            .expect("queue finished event");
        app.process_ui_events();

        assert_eq!(app.phase, ConversionPhase::Idle);
        assert!(app.active_error.is_none());
        assert_eq!(app.last_saved, Some(PathBuf::from("/tmp/out.mp3")));
        assert!(app.status.contains("/tmp/out.mp3"));
    }

    #[test]
    fn only_the_latest_progress_snapshot_is_retained() {
        let (mut app, _cmd_rx, ui_tx) = test_app();

        ui_tx
            .send(UiEvent::ConversionAccepted(SessionId("sess-42".to_string())))
            .expect("queue accepted event");
        ui_tx
            .send(UiEvent::Progress(snapshot(50, 200, ProgressStatus::InProgress)))
            .expect("queue first snapshot");
        ui_tx
            .send(UiEvent::Progress(snapshot(150, 200, ProgressStatus::InProgress)))
            .expect("queue second snapshot");
        app.process_ui_events();

        match &app.phase {
            ConversionPhase::Converting { session_id, latest } => {
                assert_eq!(session_id.0, "sess-42");
                let latest = latest.as_ref().expect("snapshot retained");
                assert_eq!(latest.progress, 150);
                assert_eq!(latest.percent(), 75);
            }
            other => panic!("unexpected phase: {other:?}"),
        }
    }

    #[test]
    fn empty_form_submission_shows_validation_error_and_sends_nothing() {
        let (mut app, cmd_rx, _ui_tx) = test_app();

        app.on_convert_clicked();

        assert!(cmd_rx.try_recv().is_err(), "no command may be queued");
        assert_eq!(app.phase, ConversionPhase::Idle);
        let error = app.active_error.as_ref().expect("validation error shown");
        assert_eq!(error.category(), UiErrorCategory::Validation);
    }

    #[test]
    fn valid_form_submission_queues_a_convert_command() {
        let (mut app, cmd_rx, _ui_tx) = test_app();
        app.form.format = OutputFormat::Flac;
        app.form
            .offer_file(PathBuf::from("/tmp/take1.wav"))
            .expect("wav is audio");

        app.on_convert_clicked();

        assert_eq!(app.phase, ConversionPhase::Submitting);
        match cmd_rx.try_recv().expect("command queued") {
            BackendCommand::Convert { input, format } => {
                assert_eq!(format, OutputFormat::Flac);
                assert_eq!(
                    input,
                    crate::backend_bridge::commands::ConversionInput::File {
                        path: PathBuf::from("/tmp/take1.wav")
                    }
                );
            }
        }
    }

    #[test]
    fn reset_is_idempotent() {
        let (mut app, _cmd_rx, _ui_tx) = test_app();
        app.reset();
        app.reset();
        assert_eq!(app.phase, ConversionPhase::Idle);
    }
}
