//! Slash commands for interactive mode

mod citations;
mod conversations;
mod metadata;
mod session;

pub use citations::{PdfCommand, SourcesCommand, format_citation};
pub use conversations::{ListCommand, SwitchCommand};
pub use metadata::MetadataCommand;
pub use session::SessionCommand;

use normo_session::ConversationState;

/// Result of executing a slash command
#[derive(Debug, PartialEq)]
pub enum CommandResult {
    /// Start a fresh conversation
    NewConversation,
    /// Refresh and print the conversation catalog
    ListConversations,
    /// Switch to the conversation with this id
    SwitchConversation(String),
    /// Deactivate the current conversation
    Clear,
    /// Download a cited document by its file name
    DownloadPdf(String),
    /// Check gateway health
    Health,
    /// Ask through the legacy endpoint
    Legacy(String),
    /// Show a message to the user (not sent to the gateway)
    Message(String),
    /// Exit the application
    Exit,
    /// Unknown command
    Unknown(String),
}

/// Parse and execute a slash command
pub fn execute_command(input: &str, state: &ConversationState) -> Option<CommandResult> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;
    let parts: Vec<&str> = rest.splitn(2, ' ').collect();
    let command = parts[0].to_lowercase();
    let args = parts.get(1).map(|s| s.trim()).unwrap_or("");

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),

        "new" | "n" => CommandResult::NewConversation,

        "list" | "l" => CommandResult::ListConversations,

        "switch" | "sw" => SwitchCommand::execute(args, state),

        "clear" | "c" => CommandResult::Clear,

        "session" | "s" => SessionCommand::execute(state),

        "sources" | "src" => SourcesCommand::execute(args, state),

        "meta" => MetadataCommand::execute(state),

        "pdf" => PdfCommand::execute(args, state),

        "health" => CommandResult::Health,

        "legacy" => {
            if args.is_empty() {
                CommandResult::Message("Usage: /legacy <question>".to_string())
            } else {
                CommandResult::Legacy(args.to_string())
            }
        }

        "quit" | "exit" | "q" => CommandResult::Exit,

        _ => CommandResult::Unknown(command),
    })
}

fn help_message() -> String {
    r#"Available commands:
  /help, /h, /?           Show this help message
  /new, /n                Start a new conversation
  /list, /l               List recent conversations
  /switch, /sw <n|id>     Switch to conversation n of /list, or by id
  /clear, /c              Leave the current conversation
  /session, /s            Show the current conversation and message counts
  /sources, /src [n]      Show the sources of the last answer (or of answer n)
  /meta                   Show how the last query was classified
  /pdf <n>                Download the n-th source of the last answer
  /health                 Check that the gateway is reachable
  /legacy <question>      Ask through the legacy endpoint
  /quit, /exit, /q        Exit normo

Examples:
  /list                   Show conversations
  /switch 2               Continue the second conversation in the list
  /sources                Cited paragraphs for the last answer
  /pdf 1                  Save the first cited document"#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_a_command() {
        assert_eq!(execute_command("Wie hoch darf ein Zaun sein?", &ConversationState::default()), None);
    }

    #[test]
    fn test_simple_commands() {
        let state = ConversationState::default();
        assert_eq!(execute_command("/new", &state), Some(CommandResult::NewConversation));
        assert_eq!(execute_command(" /L ", &state), Some(CommandResult::ListConversations));
        assert_eq!(execute_command("/clear", &state), Some(CommandResult::Clear));
        assert_eq!(execute_command("/health", &state), Some(CommandResult::Health));
        assert_eq!(execute_command("/q", &state), Some(CommandResult::Exit));
    }

    #[test]
    fn test_legacy_requires_question() {
        let state = ConversationState::default();
        assert_eq!(
            execute_command("/legacy  Stellplatzpflicht ", &state),
            Some(CommandResult::Legacy("Stellplatzpflicht".into()))
        );
        assert!(matches!(
            execute_command("/legacy", &state),
            Some(CommandResult::Message(_))
        ));
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            execute_command("/Frobnicate now", &ConversationState::default()),
            Some(CommandResult::Unknown("frobnicate".into()))
        );
    }

    #[test]
    fn test_help_lists_commands() {
        let Some(CommandResult::Message(help)) = execute_command("/help", &ConversationState::default()) else {
            panic!("expected help text");
        };
        for cmd in ["/new", "/list", "/switch", "/sources", "/pdf", "/meta"] {
            assert!(help.contains(cmd), "missing {}", cmd);
        }
    }
}
