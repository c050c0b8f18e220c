//! UI/backend events and error modeling for the conversion form.

use std::path::PathBuf;

use client_core::ClientError;
use shared::{domain::SessionId, protocol::ProgressUpdate};

pub enum UiEvent {
    Info(String),
    /// The server accepted the job under the session contract.
    ConversionAccepted(SessionId),
    /// Latest progress snapshot for the active session.
    Progress(ProgressUpdate),
    /// Terminal success. `saved_to` is `None` when the user dismissed the
    /// save dialog.
    ConversionFinished { saved_to: Option<PathBuf> },
    Error(UiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Validation,
    Request,
    Stream,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    Submit,
    Progress,
    Download,
    SaveArtifact,
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn new(
        category: UiErrorCategory,
        context: UiErrorContext,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            context,
            message: message.into(),
        }
    }

    /// Wrap a client error, mapping its variant onto the surface taxonomy:
    /// request failures for submit/download, stream failures for progress.
    pub fn from_client_error(context: UiErrorContext, err: &ClientError) -> Self {
        let category = match err {
            ClientError::Http(_) | ClientError::Status { .. } => UiErrorCategory::Request,
            ClientError::Stream(_) => UiErrorCategory::Stream,
        };
        Self::new(category, context, err.to_string())
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
