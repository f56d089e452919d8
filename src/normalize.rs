//! Backend output normalization: pull the `result` text out of the structured payload and drop
//! any reasoning/preamble the backend wrote before the document proper.

/// Section marker every generated document is expected to start with.
pub const ANCHOR_HEADING: &str = "## BUSINESS POSTURE";

/// Placeholder used instead of an empty document.
pub const NO_RESPONSE_PLACEHOLDER: &str = "No response from backend";

/// Extract the document text from a backend payload.
///
/// - JSON object: the `result` field; absent, non-string or blank yields the placeholder.
/// - Anything else (e.g. a backend that ignored the output format): the text itself, or the
///   placeholder when blank.
pub fn extract_result(raw: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(raw.trim()) {
        Ok(serde_json::Value::Object(map)) => match map.get("result") {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => s.clone(),
            _ => NO_RESPONSE_PLACEHOLDER.to_string(),
        },
        _ => {
            if raw.trim().is_empty() {
                NO_RESPONSE_PLACEHOLDER.to_string()
            } else {
                raw.to_string()
            }
        }
    }
}

/// Drop everything before the first occurrence of `anchor`; pass `text` through unchanged when
/// the anchor is absent. Case-sensitive literal match.
pub fn strip_preamble(text: &str, anchor: &str) -> String {
    if anchor.is_empty() {
        return text.to_string();
    }
    match text.find(anchor) {
        Some(pos) => text[pos..].to_string(),
        None => text.to_string(),
    }
}

/// `extract_result` followed by `strip_preamble` with the standard anchor.
pub fn normalize_document(raw: &str) -> String {
    strip_preamble(&extract_result(raw), ANCHOR_HEADING)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = "\n\nThe system serves...\n\n```mermaid\nC4Context\n```\n";

    #[test]
    fn test_extract_result_field() {
        let raw = r###"{"type":"result","result":"## BUSINESS POSTURE\n...doc..."}"###;
        assert_eq!(extract_result(raw), "## BUSINESS POSTURE\n...doc...");
    }

    #[test]
    fn test_extract_result_missing_field_is_placeholder() {
        assert_eq!(extract_result(r#"{"type":"result"}"#), NO_RESPONSE_PLACEHOLDER);
        assert_eq!(extract_result(r#"{"result":null}"#), NO_RESPONSE_PLACEHOLDER);
        assert_eq!(extract_result(r#"{"result":"   "}"#), NO_RESPONSE_PLACEHOLDER);
        assert_eq!(extract_result(""), NO_RESPONSE_PLACEHOLDER);
        assert_eq!(extract_result(" \n"), NO_RESPONSE_PLACEHOLDER);
    }

    #[test]
    fn test_extract_result_unstructured_passthrough() {
        assert_eq!(extract_result("## BUSINESS POSTURE\nx"), "## BUSINESS POSTURE\nx");
        // JSON that is not an object is treated as text
        assert_eq!(extract_result("[1,2]"), "[1,2]");
    }

    #[test]
    fn test_strip_preamble_anchor_first_is_identity() {
        let doc = format!("{ANCHOR_HEADING}{BODY}");
        assert_eq!(strip_preamble(&doc, ANCHOR_HEADING), doc);
    }

    #[test]
    fn test_strip_preamble_discards_prefix_exactly() {
        for prefix in [
            "I'll analyze the codebase first.\n\n",
            "x",
            "## BUSINESS POSTURE-ish? no: # BUSINESS POSTURE\n",
        ] {
            let doc = format!("{prefix}{ANCHOR_HEADING}{BODY}");
            assert_eq!(
                strip_preamble(&doc, ANCHOR_HEADING),
                format!("{ANCHOR_HEADING}{BODY}"),
                "prefix {prefix:?}"
            );
        }
    }

    #[test]
    fn test_strip_preamble_without_anchor_is_passthrough() {
        let text = "# Architecture\n\nno anchor here\n";
        assert_eq!(strip_preamble(text, ANCHOR_HEADING), text);
        // case-sensitive
        let lower = "## business posture\nbody";
        assert_eq!(strip_preamble(lower, ANCHOR_HEADING), lower);
    }

    #[test]
    fn test_strip_preamble_uses_first_occurrence() {
        let text = format!("pre\n{ANCHOR_HEADING}\na\n{ANCHOR_HEADING}\nb");
        assert_eq!(
            strip_preamble(&text, ANCHOR_HEADING),
            format!("{ANCHOR_HEADING}\na\n{ANCHOR_HEADING}\nb")
        );
    }

    #[test]
    fn test_normalize_document_end_to_end() {
        let raw = serde_json::json!({
            "result": format!("Let me look around.\n{ANCHOR_HEADING}\n...doc...")
        })
        .to_string();
        assert_eq!(normalize_document(&raw), format!("{ANCHOR_HEADING}\n...doc..."));
    }
}
