//! Display helpers for source citations

use crate::types::SourceCitation;

/// Filename segments that precede the descriptive part of a document name,
/// e.g. `1_AT_OOE_0_GE_Bauordnung_1994` or `3_AT_0_0_OIB_Richtlinie_2`.
const TITLE_MARKERS: [&str; 4] = ["GE", "VE", "OIB", "OEN"];

/// Derive a human-readable title from a cited document's file name.
///
/// Best effort only: names that do not follow the `<prefix>_<marker>_<title>[_<year>]`
/// convention fall back to the bare file name with underscores turned into spaces.
pub fn document_title(pdf_name: &str) -> String {
    let name = pdf_name.replacen(".pdf", "", 1);
    let filename = name.rsplit('/').next().unwrap_or(&name);

    let parts: Vec<&str> = filename.split('_').collect();
    if let Some(marker) = parts.iter().position(|p| TITLE_MARKERS.contains(p)) {
        let mut title = &parts[marker + 1..];
        if let Some((last, rest)) = title.split_last() {
            if is_year(last) {
                title = rest;
            }
        }
        if !title.is_empty() {
            return title.join(" ");
        }
    }

    filename.replace('_', " ")
}

fn is_year(part: &str) -> bool {
    part.len() == 4 && part.bytes().all(|b| b.is_ascii_digit())
}

impl SourceCitation {
    /// Human-readable title of the cited document
    pub fn document_title(&self) -> String {
        document_title(&self.pdf_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_after_marker_drops_year() {
        assert_eq!(
            document_title("1_AT_OOE_0_GE_Oberoesterreichische_Bauordnung_1994.pdf"),
            "Oberoesterreichische Bauordnung"
        );
    }

    #[test]
    fn test_title_oib_marker() {
        assert_eq!(
            document_title("3_AT_0_0_OIB_Richtlinie_2_Brandschutz.pdf"),
            "Richtlinie 2 Brandschutz"
        );
    }

    #[test]
    fn test_title_uses_last_path_component() {
        assert_eq!(
            document_title("laws/ooe/2_AT_OOE_0_VE_Bautechnikverordnung_2013.pdf"),
            "Bautechnikverordnung"
        );
    }

    #[test]
    fn test_title_first_marker_wins() {
        assert_eq!(document_title("X_GE_Teil_OEN_B_1800.pdf"), "Teil OEN B");
    }

    #[test]
    fn test_title_year_only_keeps_middle_parts() {
        assert_eq!(document_title("OEN_B_1800.pdf"), "B");
    }

    #[test]
    fn test_title_without_marker() {
        assert_eq!(document_title("some_random_document.pdf"), "some random document");
    }

    #[test]
    fn test_title_marker_is_last_part() {
        assert_eq!(document_title("1_AT_GE.pdf"), "1 AT GE");
    }

    #[test]
    fn test_title_only_year_after_marker_falls_back() {
        assert_eq!(document_title("1_AT_GE_2020.pdf"), "1 AT GE 2020");
    }

    #[test]
    fn test_title_without_extension() {
        assert_eq!(document_title("1_AT_OOE_0_GE_Bauordnung"), "Bauordnung");
    }

    #[test]
    fn test_citation_wrapper() {
        let citation = SourceCitation {
            pdf_name: "1_AT_OOE_0_GE_Bauordnung_1994.pdf".into(),
            page: 4,
            paragraph: 2,
            chunk_id: "c".into(),
            file_path: "/x".into(),
            relevant_content: "...".into(),
            calculations: None,
            area_measurements: None,
        };
        assert_eq!(citation.document_title(), "Bauordnung");
    }
}
