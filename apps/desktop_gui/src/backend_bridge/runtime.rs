//! Backend worker: a dedicated thread owning a tokio runtime that drives
//! the conversion client and feeds results back to the UI event queue.

use crossbeam_channel::{Receiver, Sender};

use client_core::{Artifact, ConversionClient, SubmitOutcome};
use shared::{
    domain::{OutputFormat, SessionId},
    protocol::ProgressStatus,
};

use crate::backend_bridge::commands::{BackendCommand, ConversionInput};
use crate::controller::events::{UiError, UiErrorCategory, UiErrorContext, UiEvent};

pub fn launch(server_url: String, cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>) {
    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::new(
                    UiErrorCategory::Unknown,
                    UiErrorContext::Submit,
                    format!("backend worker startup failure: failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let client = match ConversionClient::new(&server_url) {
                Ok(client) => client,
                Err(err) => {
                    let _ = ui_tx.try_send(UiEvent::Error(UiError::new(
                        UiErrorCategory::Unknown,
                        UiErrorContext::Submit,
                        format!("backend worker startup failure: {err}"),
                    )));
                    tracing::error!("failed to build conversion client: {err}");
                    return;
                }
            };
            let _ = ui_tx.try_send(UiEvent::Info("Ready".to_string()));

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    BackendCommand::Convert { input, format } => {
                        handle_convert(&client, &ui_tx, input, format).await;
                    }
                }
            }
        });
    });
}

async fn handle_convert(
    client: &ConversionClient,
    ui_tx: &Sender<UiEvent>,
    input: ConversionInput,
    format: OutputFormat,
) {
    tracing::info!(format = format.as_str(), "backend: convert");
    let outcome = match input {
        ConversionInput::File { path } => {
            let filename = path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("audio.bin")
                .to_string();
            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    let _ = ui_tx.try_send(UiEvent::Error(UiError::new(
                        UiErrorCategory::Validation,
                        UiErrorContext::Submit,
                        format!("Failed to read '{}': {err}", path.display()),
                    )));
                    return;
                }
            };
            let mime_type = mime_guess::from_path(&path).first_raw().map(str::to_string);
            client.convert_file(&filename, mime_type, bytes, format).await
        }
        ConversionInput::RemoteUrl(url) => client.convert_remote(&url, format).await,
    };

    match outcome {
        Ok(SubmitOutcome::Finished(artifact)) => {
            save_artifact(ui_tx, artifact, format).await;
        }
        Ok(SubmitOutcome::Accepted(session_id)) => {
            let _ = ui_tx.try_send(UiEvent::ConversionAccepted(session_id.clone()));
            track_progress(client, ui_tx, session_id, format).await;
        }
        Err(err) => {
            tracing::error!("backend: convert failed: {err}");
            let _ = ui_tx.try_send(UiEvent::Error(UiError::from_client_error(
                UiErrorContext::Submit,
                &err,
            )));
        }
    }
}

/// Consume the session's progress stream, forwarding every snapshot. The
/// first terminal snapshot ends the stream: `completed` triggers exactly one
/// artifact download, `error` surfaces the reported failure.
async fn track_progress(
    client: &ConversionClient,
    ui_tx: &Sender<UiEvent>,
    session_id: SessionId,
    format: OutputFormat,
) {
    let mut stream = match client.stream_progress(&session_id).await {
        Ok(stream) => stream,
        Err(err) => {
            tracing::error!(session_id = %session_id, "backend: progress stream failed to open: {err}");
            let _ = ui_tx.try_send(UiEvent::Error(UiError::from_client_error(
                UiErrorContext::Progress,
                &err,
            )));
            return;
        }
    };

    let terminal = loop {
        match stream.next_update().await {
            Some(Ok(update)) => {
                let _ = ui_tx.try_send(UiEvent::Progress(update.clone()));
                if update.status.is_terminal() {
                    break Ok(update);
                }
            }
            Some(Err(err)) => break Err(err),
            // The stream only ends after a terminal snapshot or a failure,
            // both of which break above.
            None => return,
        }
    };
    drop(stream);

    match terminal {
        Ok(update) if update.status == ProgressStatus::Completed => {
            tracing::info!(session_id = %session_id, "backend: conversion completed, fetching artifact");
            match client.download(&session_id).await {
                Ok(artifact) => save_artifact(ui_tx, artifact, format).await,
                Err(err) => {
                    tracing::error!(session_id = %session_id, "backend: download failed: {err}");
                    let _ = ui_tx.try_send(UiEvent::Error(UiError::from_client_error(
                        UiErrorContext::Download,
                        &err,
                    )));
                }
            }
        }
        Ok(update) => {
            let message = update.failure_message();
            tracing::error!(session_id = %session_id, "backend: conversion failed: {message}");
            let _ = ui_tx.try_send(UiEvent::Error(UiError::new(
                UiErrorCategory::Stream,
                UiErrorContext::Progress,
                message,
            )));
        }
        Err(err) => {
            tracing::error!(session_id = %session_id, "backend: progress stream failed: {err}");
            let _ = ui_tx.try_send(UiEvent::Error(UiError::from_client_error(
                UiErrorContext::Progress,
                &err,
            )));
        }
    }
}

async fn save_artifact(ui_tx: &Sender<UiEvent>, artifact: Artifact, format: OutputFormat) {
    let filename = artifact.download_name(format);
    let save_path = rfd::FileDialog::new().set_file_name(&filename).save_file();
    let Some(path) = save_path else {
        let _ = ui_tx.try_send(UiEvent::ConversionFinished { saved_to: None });
        return;
    };

    match tokio::fs::write(&path, &artifact.bytes).await {
        Ok(()) => {
            tracing::info!(path = %path.display(), "backend: artifact saved");
            let _ = ui_tx.try_send(UiEvent::ConversionFinished {
                saved_to: Some(path),
            });
        }
        Err(err) => {
            let _ = ui_tx.try_send(UiEvent::Error(UiError::new(
                UiErrorCategory::Unknown,
                UiErrorContext::SaveArtifact,
                format!("Failed to save '{}': {err}", path.display()),
            )));
        }
    }
}
