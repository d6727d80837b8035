// Request/response types for the HTTP surface

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub store: String,
    pub uptime_seconds: u64,
}

/// Poster request body. Required fields arrive as options so the handler can
/// answer 400 with the missing field's name instead of a deserializer error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosterBody {
    pub title_prompt: Option<String>,
    pub subtitle_prompt: Option<String>,
    pub ai_image_url: Option<String>,
    pub template_file_name: Option<String>,
}

impl PosterBody {
    /// Name of the first required field that is missing or blank, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        fn blank(v: &Option<String>) -> bool {
            v.as_deref().map(str::trim).unwrap_or("").is_empty()
        }
        if blank(&self.title_prompt) {
            Some("titlePrompt")
        } else if blank(&self.subtitle_prompt) {
            Some("subtitlePrompt")
        } else if blank(&self.ai_image_url) {
            Some("aiImageUrl")
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_first_missing_required_field() {
        let body: PosterBody = serde_json::from_str(r#"{"titlePrompt": "t"}"#).unwrap();
        assert_eq!(body.missing_field(), Some("subtitlePrompt"));

        let body: PosterBody =
            serde_json::from_str(r#"{"titlePrompt": "t", "subtitlePrompt": "s"}"#).unwrap();
        assert_eq!(body.missing_field(), Some("aiImageUrl"));
    }

    #[test]
    fn blank_values_count_as_missing() {
        let body: PosterBody = serde_json::from_str(
            r#"{"titlePrompt": "  ", "subtitlePrompt": "s", "aiImageUrl": "http://x"}"#,
        )
        .unwrap();
        assert_eq!(body.missing_field(), Some("titlePrompt"));
    }

    #[test]
    fn complete_body_passes_and_template_is_optional() {
        let body: PosterBody = serde_json::from_str(
            r#"{"titlePrompt": "t", "subtitlePrompt": "s", "aiImageUrl": "http://x"}"#,
        )
        .unwrap();
        assert_eq!(body.missing_field(), None);
        assert_eq!(body.template_file_name, None);
    }
}
