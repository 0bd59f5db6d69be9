//! /meta command - how the gateway classified the last query

use super::CommandResult;
use normo_session::ConversationState;
use std::collections::HashMap;

/// Known attributes in display order
const LABELS: [(&str, &str); 5] = [
    ("country", "Country"),
    ("state", "State/Region"),
    ("legal_domain", "Legal Domain"),
    ("document_type", "Document Type"),
    ("subject_area", "Subject Area"),
];

pub struct MetadataCommand;

impl MetadataCommand {
    pub fn execute(state: &ConversationState) -> CommandResult {
        match state.latest_metadata() {
            Some(meta) => CommandResult::Message(format_metadata(meta)),
            None => CommandResult::Message("No query classification available yet.".to_string()),
        }
    }
}

/// Render the known attributes first, then any others sorted by key
pub fn format_metadata(meta: &HashMap<String, String>) -> String {
    let mut output = String::from("Query Classification\n");
    output.push_str(&"-".repeat(40));
    output.push('\n');

    for (key, label) in LABELS {
        output.push_str(&format!("{:<15} {}\n", format!("{}:", label), display_value(meta.get(key))));
    }

    let mut extra: Vec<_> = meta
        .iter()
        .filter(|(key, _)| !LABELS.iter().any(|(known, _)| *known == key.as_str()))
        .collect();
    extra.sort_by(|a, b| a.0.cmp(b.0));
    for (key, value) in extra {
        output.push_str(&format!("{:<15} {}\n", format!("{}:", key), display_value(Some(value))));
    }

    output.trim_end().to_string()
}

fn display_value(value: Option<&String>) -> &str {
    match value.map(|v| v.trim()) {
        Some(v) if !v.is_empty() && !v.eq_ignore_ascii_case("unknown") => v,
        _ => "Not specified",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_known_labels_in_order() {
        let output = format_metadata(&meta(&[
            ("state", "Oberösterreich"),
            ("country", "Österreich"),
            ("legal_domain", "unknown"),
            ("document_type", ""),
        ]));
        let lines: Vec<&str> = output.lines().skip(2).collect();
        assert_eq!(lines[0], "Country:        Österreich");
        assert_eq!(lines[1], "State/Region:   Oberösterreich");
        assert_eq!(lines[2], "Legal Domain:   Not specified");
        assert_eq!(lines[3], "Document Type:  Not specified");
        assert_eq!(lines[4], "Subject Area:   Not specified");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn test_extra_keys_follow() {
        let output = format_metadata(&meta(&[("zone", "Bauland"), ("building_class", "GK 2")]));
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[7], "building_class: GK 2");
        assert_eq!(lines[8], "zone:           Bauland");
    }

    #[test]
    fn test_no_metadata() {
        assert_eq!(
            MetadataCommand::execute(&ConversationState::default()),
            CommandResult::Message("No query classification available yet.".into())
        );
    }
}
