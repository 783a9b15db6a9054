/// Upload size/type checks applied before anything is sent to the object
/// store. These mirror the limits the course forms enforce client-side.
pub const MAX_ATTACHMENT_BYTES: usize = 5_242_880; // 5 MB

const ALLOWED_EXTENSIONS: &[&str] = &[
    "pdf", "py", "js", "css", "html", "ts", "ppt", "pptx", "txt", "docx", "xlsx", "csv", "rar",
    "zip", "png", "jpg", "jpeg",
];

/// Whether a filename carries an accepted attachment extension.
///
/// The comparison is case-insensitive on the extension only; a name without
/// any dot is rejected.
pub fn has_allowed_extension(filename: &str) -> bool {
    match filename.rsplit_once('.') {
        Some((_, ext)) => ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_extensions() {
        assert!(has_allowed_extension("homework.pdf"));
        assert!(has_allowed_extension("solution.tar.zip"));
        assert!(has_allowed_extension("REPORT.DOCX"));
    }

    #[test]
    fn rejects_unknown_or_missing_extensions() {
        assert!(!has_allowed_extension("malware.exe"));
        assert!(!has_allowed_extension("noextension"));
        assert!(!has_allowed_extension("archive.tar.gz"));
    }
}
