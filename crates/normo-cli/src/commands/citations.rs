//! /sources and /pdf commands

use super::CommandResult;
use normo_api::SourceCitation;
use normo_session::{ChatMessage, ConversationState};

/// Width at which quoted excerpts are cut
const EXCERPT_CHARS: usize = 300;

pub struct SourcesCommand;

impl SourcesCommand {
    /// Show the sources of the last answer, or of the n-th answer (1-based)
    pub fn execute(args: &str, state: &ConversationState) -> CommandResult {
        let answer = if args.is_empty() {
            state.last_assistant_message()
        } else {
            match args.parse::<usize>() {
                Ok(n) if n >= 1 => state.messages.iter().filter(|m| m.is_assistant()).nth(n - 1),
                _ => return CommandResult::Message("Usage: /sources [n]".to_string()),
            }
        };

        let Some(answer) = answer else {
            return CommandResult::Message("No answer to show sources for.".to_string());
        };
        if answer.citations().is_empty() {
            return CommandResult::Message("This answer cites no sources.".to_string());
        }

        CommandResult::Message(format_sources(answer))
    }
}

/// Render every citation of an answer
pub fn format_sources(answer: &ChatMessage) -> String {
    let mut output = format!("Sources ({})\n", answer.citations().len());
    output.push_str(&"-".repeat(40));
    output.push('\n');
    for (i, citation) in answer.citations().iter().enumerate() {
        output.push_str(&format_citation(i + 1, citation));
        output.push('\n');
    }
    output.push_str("Use /pdf <n> to download a document.");
    output
}

/// Render one citation: title, location, excerpt and any extracted figures
pub fn format_citation(index: usize, citation: &SourceCitation) -> String {
    let mut output = format!(
        "[{}] {}\n    Page {}, Section {}\n",
        index,
        citation.document_title(),
        citation.page,
        citation.paragraph
    );

    let excerpt = citation.relevant_content.trim();
    if !excerpt.is_empty() {
        output.push_str(&format!(
            "    \"{}\"\n",
            crate::utils::truncate_chars(excerpt, EXCERPT_CHARS)
        ));
    }

    if let Some(calculations) = citation.calculations.as_deref().filter(|c| !c.is_empty()) {
        output.push_str("    Calculations:\n");
        for line in calculations {
            output.push_str(&format!("      - {}\n", line));
        }
    }
    if let Some(areas) = citation.area_measurements.as_deref().filter(|a| !a.is_empty()) {
        output.push_str("    Area measurements:\n");
        for line in areas {
            output.push_str(&format!("      - {}\n", line));
        }
    }
    output
}

pub struct PdfCommand;

impl PdfCommand {
    /// Resolve the n-th source of the last answer to its document name
    pub fn execute(args: &str, state: &ConversationState) -> CommandResult {
        let Ok(n) = args.parse::<usize>() else {
            return CommandResult::Message("Usage: /pdf <n>".to_string());
        };
        let citations = state
            .last_assistant_message()
            .map(|m| m.citations())
            .unwrap_or_default();

        match n.checked_sub(1).and_then(|i| citations.get(i)) {
            Some(citation) => CommandResult::DownloadPdf(citation.pdf_name.clone()),
            None => CommandResult::Message(format!(
                "The last answer has {} source(s); there is no #{}.",
                citations.len(),
                n
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use normo_api::Role;

    fn citation(pdf_name: &str) -> SourceCitation {
        SourceCitation {
            pdf_name: pdf_name.into(),
            page: 12,
            paragraph: 5,
            chunk_id: "chunk-1".into(),
            file_path: format!("/docs/{}", pdf_name),
            relevant_content: "Der Mindestabstand beträgt 3 m.".into(),
            calculations: None,
            area_measurements: None,
        }
    }

    fn answer(id: &str, citations: Vec<SourceCitation>) -> ChatMessage {
        let mut message = ChatMessage::user(id, "Antwort");
        message.role = Role::Assistant;
        message.citations = Some(citations);
        message
    }

    fn state() -> ConversationState {
        ConversationState {
            messages: vec![
                ChatMessage::user("user-1", "Frage 1"),
                answer("assistant-1", vec![citation("1_AT_OOE_0_GE_Bauordnung_1994.pdf")]),
                ChatMessage::user("user-2", "Frage 2"),
                answer(
                    "assistant-2",
                    vec![
                        citation("2_AT_W_0_GE_Bauordnung fuer Wien_2023.pdf"),
                        citation("3_AT_OOE_0_VE_Bautechnikverordnung_2013.pdf"),
                    ],
                ),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_format_citation() {
        let mut c = citation("1_AT_OOE_0_GE_Bauordnung_1994.pdf");
        c.area_measurements = Some(vec!["Bebauungsfläche 120 m²".into()]);
        let output = format_citation(1, &c);
        assert!(output.starts_with("[1] Bauordnung\n    Page 12, Section 5\n"));
        assert!(output.contains("\"Der Mindestabstand beträgt 3 m.\""));
        assert!(output.contains("Area measurements:\n      - Bebauungsfläche 120 m²"));
        assert!(!output.contains("Calculations"));
    }

    #[test]
    fn test_sources_of_last_answer() {
        let CommandResult::Message(output) = SourcesCommand::execute("", &state()) else {
            panic!("expected message");
        };
        assert!(output.starts_with("Sources (2)"));
        assert!(output.contains("[2] Bautechnikverordnung"));
    }

    #[test]
    fn test_sources_of_nth_answer() {
        let CommandResult::Message(output) = SourcesCommand::execute("1", &state()) else {
            panic!("expected message");
        };
        assert!(output.starts_with("Sources (1)"));
        assert!(output.contains("[1] Bauordnung"));
    }

    #[test]
    fn test_sources_without_answer() {
        assert_eq!(
            SourcesCommand::execute("", &ConversationState::default()),
            CommandResult::Message("No answer to show sources for.".into())
        );
    }

    #[test]
    fn test_pdf_resolves_name() {
        assert_eq!(
            PdfCommand::execute("2", &state()),
            CommandResult::DownloadPdf("3_AT_OOE_0_VE_Bautechnikverordnung_2013.pdf".into())
        );
    }

    #[test]
    fn test_pdf_out_of_range() {
        assert!(matches!(PdfCommand::execute("0", &state()), CommandResult::Message(_)));
        assert!(matches!(PdfCommand::execute("3", &state()), CommandResult::Message(_)));
        assert!(matches!(PdfCommand::execute("x", &state()), CommandResult::Message(_)));
    }
}
