//! Pulling structured data out of model responses.
//!
//! Models often wrap JSON in a Markdown fence or surround it with prose.
//! Extraction tries a `json` fence, then any fence, then the first balanced
//! array or object.

use quill_error::{ValidationError, ValidationErrorKind};

/// Find the JSON payload in a model response.
///
/// # Errors
///
/// Returns `MalformedOutput` if the response holds no JSON-looking text.
///
/// # Examples
///
/// ```
/// use quill_pipeline::extract_json;
///
/// let response = "Here is the cast:\n```json\n[{\"name\": \"Maren\"}]\n```\n";
/// assert_eq!(extract_json(response, "characters").unwrap(), "[{\"name\": \"Maren\"}]");
/// ```
pub fn extract_json(response: &str, context: &str) -> Result<String, ValidationError> {
    if let Some(json) = extract_from_code_block(response, "json") {
        return Ok(json);
    }

    let bracket_pos = response.find('[');
    let brace_pos = response.find('{');

    let order = match (bracket_pos, brace_pos) {
        (Some(b), Some(c)) if b < c => [('[', ']'), ('{', '}')],
        (Some(_), None) => [('[', ']'), ('[', ']')],
        _ => [('{', '}'), ('[', ']')],
    };
    for (open, close) in order {
        if let Some(json) = extract_balanced(response, open, close) {
            return Ok(json);
        }
    }

    tracing::debug!(context, response_length = response.len(), "No JSON found in model response");
    Err(ValidationError::new(ValidationErrorKind::MalformedOutput {
        context: context.to_string(),
        message: format!("no JSON found in response of {} bytes", response.len()),
    }))
}

/// Extract and deserialize the JSON payload of a response.
///
/// # Errors
///
/// Returns `MalformedOutput` if no JSON is found or it does not match `T`.
pub fn parse_json<T>(response: &str, context: &str) -> Result<T, ValidationError>
where
    T: serde::de::DeserializeOwned,
{
    let json = extract_json(response, context)?;
    serde_json::from_str(&json).map_err(|e| {
        let preview: String = json.chars().take(100).collect();
        tracing::debug!(context, error = %e, json_preview = %preview, "JSON parsing failed");
        ValidationError::new(ValidationErrorKind::MalformedOutput {
            context: context.to_string(),
            message: e.to_string(),
        })
    })
}

fn extract_from_code_block(response: &str, language: &str) -> Option<String> {
    let pattern = format!("```{}", language);

    if let Some(start) = response.find(&pattern) {
        let content_start = start + pattern.len();
        let rest = &response[content_start..];
        // Unclosed fence: the response was probably truncated
        let content = rest.find("```").map(|end| &rest[..end]).unwrap_or(rest);
        return Some(content.trim().to_string());
    }

    let start = response.find("```")?;
    let after_fence = start + 3;
    let skip_to = response[after_fence..]
        .find('\n')
        .map(|n| after_fence + n + 1)
        .unwrap_or(after_fence);
    let rest = &response[skip_to..];
    let content = rest.find("```").map(|end| &rest[..end]).unwrap_or(rest);
    let content = content.trim();
    if content.starts_with('[') || content.starts_with('{') {
        Some(content.to_string())
    } else {
        None
    }
}

fn extract_balanced(response: &str, open: char, close: char) -> Option<String> {
    let start = response.find(open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in response[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            c if c == open && !in_string => depth += 1,
            c if c == close && !in_string => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(response[start..start + i + ch.len_utf8()].to_string());
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_json_fence() {
        let response = "Notes [draft]\n```json\n{\"a\": 1}\n```\nDone.";
        assert_eq!(extract_json(response, "test").unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn unlabelled_fence_with_json() {
        let response = "```\n[1, 2]\n```";
        assert_eq!(extract_json(response, "test").unwrap(), "[1, 2]");
    }

    #[test]
    fn balanced_object_in_prose() {
        let response = r#"Sure! {"id": 4, "nested": {"v": "a}b"}} hope that helps"#;
        let json = extract_json(response, "test").unwrap();
        assert_eq!(json, r#"{"id": 4, "nested": {"v": "a}b"}}"#);
    }

    #[test]
    fn array_before_object() {
        let response = r#"Scenes: [{"n": 1}, {"n": 2}]"#;
        assert!(extract_json(response, "test").unwrap().starts_with('['));
    }

    #[test]
    fn escaped_quotes_inside_strings() {
        let response = r#"{"text": "She said \"hi}\""}"#;
        assert_eq!(extract_json(response, "test").unwrap(), response);
    }

    #[test]
    fn plain_text_is_malformed() {
        let err = extract_json("no structure here", "outline").unwrap_err();
        assert!(matches!(
            err.kind,
            ValidationErrorKind::MalformedOutput { ref context, .. } if context == "outline"
        ));
    }

    #[test]
    fn parse_reports_shape_mismatch() {
        let err = parse_json::<Vec<u32>>("[\"a\"]", "numbers").unwrap_err();
        assert!(matches!(err.kind, ValidationErrorKind::MalformedOutput { .. }));
    }
}
