use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque token correlating one submission with its progress stream and
/// final artifact. Lives for a single conversion attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Output containers the conversion service can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Mp3,
    Wav,
    Flac,
    Ogg,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::Mp3,
        OutputFormat::Wav,
        OutputFormat::Flac,
        OutputFormat::Ogg,
    ];

    /// Value sent in the `format` form field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::Flac => "flac",
            Self::Ogg => "ogg",
        }
    }

    pub fn extension(self) -> &'static str {
        self.as_str()
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Mp3 => "MP3",
            Self::Wav => "WAV",
            Self::Flac => "FLAC",
            Self::Ogg => "OGG",
        }
    }

    /// Download name used when the server supplies no filename of its own.
    pub fn default_download_name(self) -> String {
        format!("conversion.{}", self.extension())
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Mp3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_wire_values_are_lowercase() {
        for format in OutputFormat::ALL {
            let encoded = serde_json::to_string(&format).expect("serialize format");
            assert_eq!(encoded, format!("\"{}\"", format.as_str()));
        }
    }

    #[test]
    fn default_download_name_carries_the_extension() {
        assert_eq!(OutputFormat::Flac.default_download_name(), "conversion.flac");
    }
}
