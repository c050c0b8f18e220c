use serde::{Deserialize, Serialize};

/// JSON body the server attaches to non-success submit and download
/// responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_round_trips() {
        let body: ServerErrorBody =
            serde_json::from_str(r#"{"error": "Processing failed"}"#).expect("parse error body");
        assert_eq!(body.error, "Processing failed");
    }
}
