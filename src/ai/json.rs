//! Defensive parsing of structured model output.

use serde::de::DeserializeOwned;

use super::AiError;

/// Strip one fenced code block (```` ```json ```` or plain ```` ``` ````),
/// returning the inner text. Text without a fence is returned unchanged.
#[must_use]
pub fn strip_code_fence(text: &str) -> &str {
    let (start, marker_len) = match (text.find("```json"), text.find("```")) {
        (Some(json), _) => (json, "```json".len()),
        (None, Some(plain)) => (plain, "```".len()),
        (None, None) => return text.trim(),
    };
    let body = &text[start + marker_len..];
    let body = body.find("```").map_or(body, |end| &body[..end]);
    body.trim()
}

/// Find the first balanced `{...}` object in `text`.
///
/// Braces inside JSON string literals are ignored.
#[must_use]
pub fn find_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Extract a JSON object from text and parse it into `T`.
///
/// # Errors
///
/// Returns `AiError::ParseError` if no balanced object is found or parsing
/// fails.
pub fn extract_json<T: DeserializeOwned>(text: &str) -> Result<T, AiError> {
    let object = find_json_object(text)
        .ok_or_else(|| AiError::ParseError("No JSON object found in response".to_string()))?;
    serde_json::from_str(object)
        .map_err(|e| AiError::ParseError(format!("Failed to parse JSON: {e}")))
}

/// Parse model output that should be JSON.
///
/// Strips one code fence and parses; if that fails, falls back to the first
/// balanced object anywhere in the text. The error reported is the one from
/// the direct parse.
///
/// # Errors
///
/// Returns `AiError::ParseError` when neither attempt succeeds.
pub fn parse_structured<T: DeserializeOwned>(text: &str) -> Result<T, AiError> {
    let stripped = strip_code_fence(text);
    match serde_json::from_str(stripped) {
        Ok(value) => Ok(value),
        Err(direct) => extract_json(text)
            .map_err(|_| AiError::ParseError(format!("Failed to parse JSON: {direct}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_strip_json_fence() {
        let text = "Here you go:\n```json\n{\"a\": 1}\n```\nDone.";
        assert_eq!(strip_code_fence(text), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_plain_fence() {
        assert_eq!(strip_code_fence("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
    }

    #[test]
    fn test_no_fence_is_trimmed() {
        assert_eq!(strip_code_fence("  {\"a\": 1}\n"), "{\"a\": 1}");
    }

    #[test]
    fn test_find_object_ignores_braces_in_strings() {
        let text = r#"prefix {"note": "use } carefully", "n": {"x": 1}} suffix"#;
        assert_eq!(
            find_json_object(text),
            Some(r#"{"note": "use } carefully", "n": {"x": 1}}"#)
        );
    }

    #[test]
    fn test_find_object_handles_escaped_quotes() {
        let text = r#"{"q": "say \"}\" now"}"#;
        assert_eq!(find_json_object(text), Some(text));
    }

    #[test]
    fn test_find_object_unbalanced() {
        assert_eq!(find_json_object("{\"a\": 1"), None);
        assert_eq!(find_json_object("no json"), None);
    }

    #[test]
    fn test_parse_structured_fenced() {
        let value: Value = parse_structured("```json\n{\"hypotheses\": []}\n```").unwrap();
        assert!(value["hypotheses"].is_array());
    }

    #[test]
    fn test_parse_structured_prose_fallback() {
        let value: Value =
            parse_structured("I think the answer is {\"final\": \"done\"} as requested").unwrap();
        assert_eq!(value["final"], "done");
    }

    #[test]
    fn test_parse_structured_failure() {
        let err = parse_structured::<Value>("not json at all").unwrap_err();
        assert!(matches!(err, AiError::ParseError(_)));
        assert!(err.to_string().contains("Failed to parse JSON"));
    }
}
