//! JSON parsing helpers for AI backend responses
//!
//! Models often wrap their JSON in prose or markdown fences, so the helpers
//! below cut out the outermost `{...}` before deserializing.

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

const RAW_SNIPPET_CHARS: usize = 200;

/// Deserialize the outermost JSON object found in a model response
pub fn extract_json_object<T: DeserializeOwned>(response: &str) -> Result<T> {
    let response = response.trim();

    match (response.find('{'), response.rfind('}')) {
        (Some(s), Some(e)) if s < e => {
            let json_str = &response[s..=e];
            serde_json::from_str(json_str).map_err(|e| {
                Error::InvalidData(format!(
                    "Invalid JSON from AI: {} | Raw: {}",
                    e,
                    truncate(json_str)
                ))
            })
        }
        _ => Err(Error::InvalidData(format!(
            "No JSON found in AI response | Raw: {}",
            truncate(response)
        ))),
    }
}

/// Clean a plain-text answer: strip wrapping quotes and collapse whitespace
pub fn clean_plain_text(response: &str) -> Option<String> {
    let text = response
        .trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    (!text.is_empty()).then_some(text)
}

fn truncate(text: &str) -> String {
    match text.char_indices().nth(RAW_SNIPPET_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Reading {
        reading: Option<f64>,
    }

    #[test]
    fn test_extracts_wrapped_json() {
        let response = "Sure! Here it is:\n```json\n{\"reading\": 12345.6}\n```";
        let parsed: Reading = extract_json_object(response).unwrap();
        assert_eq!(parsed.reading, Some(12345.6));
    }

    #[test]
    fn test_no_json_is_an_error() {
        let err = extract_json_object::<Reading>("I cannot read this image").unwrap_err();
        assert!(err.to_string().contains("No JSON found"));
    }

    #[test]
    fn test_long_raw_text_is_truncated() {
        let garbage = format!("{{{}}}", "é".repeat(500));
        let err = extract_json_object::<Reading>(&garbage).unwrap_err();
        assert!(err.to_string().ends_with("..."));
    }

    #[test]
    fn test_clean_plain_text() {
        assert_eq!(
            clean_plain_text("  \"Team dinner at\n Olive Garden.\" ").as_deref(),
            Some("Team dinner at Olive Garden.")
        );
        assert_eq!(clean_plain_text("  \"\" "), None);
    }
}
