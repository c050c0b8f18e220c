//! Form model for a conversion request: one input (local audio file or
//! remote-media URL, mutually exclusive) plus an output-format choice.
//! Kept free of UI-toolkit types so validation behavior is testable.

use std::path::PathBuf;

use shared::domain::OutputFormat;
use url::Url;

use crate::backend_bridge::commands::ConversionInput;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SelectedInput {
    #[default]
    None,
    File {
        path: PathBuf,
    },
    RemoteUrl(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormError {
    InvalidFile,
    MissingInput,
    InvalidUrl,
}

impl FormError {
    pub fn user_message(self) -> &'static str {
        match self {
            Self::InvalidFile => "Please drop a valid audio file.",
            Self::MissingInput => "Please select an audio file or enter a media URL.",
            Self::InvalidUrl => "The media URL is not a valid http(s) address.",
        }
    }
}

/// A validated submission, ready to hand to the backend worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub input: ConversionInput,
    pub format: OutputFormat,
}

#[derive(Debug, Default)]
pub struct FormState {
    input: SelectedInput,
    /// Live contents of the URL text field; synced into `input` through
    /// `apply_url_edit`.
    pub url_text: String,
    pub format: OutputFormat,
}

impl FormState {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            input: SelectedInput::None,
            url_text: String::new(),
            format,
        }
    }

    pub fn selected_input(&self) -> &SelectedInput {
        &self.input
    }

    pub fn selected_file_name(&self) -> Option<String> {
        match &self.input {
            SelectedInput::File { path } => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
            _ => None,
        }
    }

    /// Offer a dropped or picked file. Only files whose guessed media type
    /// is `audio/*` are accepted; anything else is rejected without
    /// touching the current selection. Accepting a file clears any URL.
    pub fn offer_file(&mut self, path: PathBuf) -> Result<(), FormError> {
        let is_audio = mime_guess::from_path(&path)
            .first_raw()
            .map(|mime| mime.starts_with("audio/"))
            .unwrap_or(false);
        if !is_audio {
            return Err(FormError::InvalidFile);
        }
        self.input = SelectedInput::File { path };
        self.url_text.clear();
        Ok(())
    }

    /// Sync the URL text field into the selection. Non-empty text replaces
    /// any chosen file (last write wins); cleared text drops a previous URL
    /// selection but leaves a file selection alone.
    pub fn apply_url_edit(&mut self) {
        let trimmed = self.url_text.trim();
        if !trimmed.is_empty() {
            self.input = SelectedInput::RemoteUrl(trimmed.to_string());
        } else if matches!(self.input, SelectedInput::RemoteUrl(_)) {
            self.input = SelectedInput::None;
        }
    }

    /// Validate the form into a submission. Fails fast before anything
    /// reaches the network.
    pub fn build_submission(&self) -> Result<Submission, FormError> {
        let input = match &self.input {
            SelectedInput::None => return Err(FormError::MissingInput),
            SelectedInput::File { path } => ConversionInput::File { path: path.clone() },
            SelectedInput::RemoteUrl(text) => {
                let parsed = Url::parse(text).map_err(|_| FormError::InvalidUrl)?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(FormError::InvalidUrl);
                }
                ConversionInput::RemoteUrl(parsed.into())
            }
        };
        Ok(Submission {
            input,
            format: self.format,
        })
    }
}
