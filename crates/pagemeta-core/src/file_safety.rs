//! Upload filename hygiene.

/// Reduce an uploaded filename to a single safe path component.
///
/// Strips directory components, replaces characters that are unsafe on common
/// filesystems, and rejects names that would resolve to the upload directory
/// itself. Returns `None` when nothing usable remains.
pub fn sanitize_filename(filename: &str) -> Option<String> {
    // Remove path components
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);

    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let sanitized = sanitized.trim();
    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        return None;
    }

    // Truncate if too long (preserve extension)
    if sanitized.len() > 255 {
        let mut cut = 255;
        if let Some(dot_pos) = sanitized.rfind('.') {
            let ext = &sanitized[dot_pos..];
            if ext.len() < 255 {
                cut = 255 - ext.len();
                while !sanitized.is_char_boundary(cut) {
                    cut -= 1;
                }
                return Some(format!("{}{}", &sanitized[..cut], ext));
            }
        }
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        return Some(sanitized[..cut].to_string());
    }

    Some(sanitized.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_name_is_kept() {
        assert_eq!(sanitize_filename("urls.csv").as_deref(), Some("urls.csv"));
    }

    #[test]
    fn test_directory_components_are_stripped() {
        assert_eq!(
            sanitize_filename("../../etc/passwd").as_deref(),
            Some("passwd")
        );
        assert_eq!(
            sanitize_filename("C:\\Users\\me\\urls.csv").as_deref(),
            Some("urls.csv")
        );
    }

    #[test]
    fn test_unsafe_characters_are_replaced() {
        assert_eq!(
            sanitize_filename("a<b>c?.csv").as_deref(),
            Some("a_b_c_.csv")
        );
    }

    #[test]
    fn test_empty_and_dot_names_are_rejected() {
        assert!(sanitize_filename("").is_none());
        assert!(sanitize_filename("   ").is_none());
        assert!(sanitize_filename("..").is_none());
        assert!(sanitize_filename("uploads/").is_none());
    }

    #[test]
    fn test_long_names_keep_extension() {
        let long = format!("{}.csv", "a".repeat(300));
        let sanitized = sanitize_filename(&long).unwrap();
        assert_eq!(sanitized.len(), 255);
        assert!(sanitized.ends_with(".csv"));
    }
}
