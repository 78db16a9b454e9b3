use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T, E = LoveNoteError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum LoveNoteError {
    /// A required credential or identifier is missing or malformed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Geocoding returned no match for the query.
    #[error("no location found for '{0}'")]
    ResolutionNotFound(String),

    /// The request never completed, came back non-2xx, or the body was not JSON.
    #[error("{provider} request failed{}: {body}", describe_status(.status))]
    Transport {
        provider: &'static str,
        status: Option<StatusCode>,
        body: String,
    },

    /// 2xx response whose own status field reports a failure.
    #[error("{provider} rejected the request: {detail}")]
    ProviderProtocol {
        provider: &'static str,
        detail: String,
    },

    #[error("template '{0}' not found in the account's template list")]
    TemplateNotFound(String),

    #[error("template '{0}' contains no {{{{key.DATA}}}} field markers")]
    NoTemplateFields(String),
}

impl LoveNoteError {
    pub(crate) fn transport(provider: &'static str, err: reqwest::Error) -> Self {
        LoveNoteError::Transport {
            provider,
            status: err.status(),
            body: err.to_string(),
        }
    }

    pub(crate) fn protocol(provider: &'static str, raw: &str) -> Self {
        LoveNoteError::ProviderProtocol {
            provider,
            detail: truncate_body(raw),
        }
    }
}

fn describe_status(status: &Option<StatusCode>) -> String {
    status
        .map(|s| format!(" with status {s}"))
        .unwrap_or_default()
}

/// Shortens a response body for diagnostics, keeping it on one line.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    let flat = body.replace('\n', "\\n");
    match flat.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_bodies() {
        assert_eq!(truncate_body("{\"ok\":true}"), "{\"ok\":true}");
    }

    #[test]
    fn truncate_cuts_on_char_boundary() {
        let body = "é".repeat(300);
        let out = truncate_body(&body);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), 203);
    }

    #[test]
    fn transport_message_names_provider_and_status() {
        let err = LoveNoteError::Transport {
            provider: "wechat",
            status: Some(StatusCode::BAD_GATEWAY),
            body: "upstream down".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("wechat"));
        assert!(msg.contains("502"));
        assert!(msg.contains("upstream down"));
    }

    #[test]
    fn no_fields_message_shows_marker_syntax() {
        let err = LoveNoteError::NoTemplateFields("tpl".into());
        assert!(err.to_string().contains("{{key.DATA}}"));
    }
}
