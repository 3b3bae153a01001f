/// Keeps letters, whitespace, hyphens and apostrophes.
pub fn sanitize_text(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || c.is_whitespace() || *c == '\'' || *c == '-')
        .collect()
}

/// Drops a `data:<mime>;base64,` prefix if present.
pub fn strip_data_uri_prefix(value: &str) -> &str {
    if value.starts_with("data:") {
        if let Some((_, payload)) = value.split_once(',') {
            return payload;
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_text() {
        assert_eq!(sanitize_text("Ada Lovelace"), "Ada Lovelace");
        assert_eq!(sanitize_text("d'Artagnan-Smith"), "d'Artagnan-Smith");
        assert_eq!(sanitize_text("R2D2 <script>"), "RD script");
        assert_eq!(sanitize_text("東京"), "");
    }

    #[test]
    fn test_strip_data_uri_prefix() {
        assert_eq!(strip_data_uri_prefix("data:image/jpeg;base64,AAAA"), "AAAA");
        assert_eq!(strip_data_uri_prefix("AAAA"), "AAAA");
        assert_eq!(strip_data_uri_prefix("data:broken"), "data:broken");
    }
}
