//! Content types
//!
//! Extension to content-type lookup used for downloads and inline previews.

use mime_guess::Mime;

/// Content type for a file name, guessed from its extension case-insensitively.
/// Unknown or missing extensions fall back to `application/octet-stream`.
pub fn content_type_for(file_name: &str) -> Mime {
    mime_guess::from_path(file_name).first_or_octet_stream()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_extensions() {
        assert_eq!(content_type_for("x.png").essence_str(), "image/png");
        assert_eq!(content_type_for("report.PDF").essence_str(), "application/pdf");
        assert_eq!(content_type_for("notes.txt").essence_str(), "text/plain");
        assert_eq!(content_type_for("clip.mp4").essence_str(), "video/mp4");
    }

    #[test]
    fn test_unknown_extensions() {
        let octet_stream = mime_guess::mime::APPLICATION_OCTET_STREAM;
        assert_eq!(content_type_for("binary.xyz123"), octet_stream);
        assert_eq!(content_type_for("Makefile"), octet_stream);
        assert_eq!(content_type_for(".bashrc"), octet_stream);
        assert_eq!(content_type_for("trailing."), octet_stream);
    }
}
