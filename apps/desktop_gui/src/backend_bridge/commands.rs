//! Backend commands queued from UI to backend worker.

use std::path::PathBuf;

use shared::domain::OutputFormat;

/// The one input a submission carries: a local file or a remote-media URL,
/// never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionInput {
    File { path: PathBuf },
    RemoteUrl(String),
}

pub enum BackendCommand {
    Convert {
        input: ConversionInput,
        format: OutputFormat,
    },
}
