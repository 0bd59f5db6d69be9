//! /list and /switch commands

use super::CommandResult;
use chrono::{DateTime, Utc};
use normo_api::ConversationListItem;
use normo_session::ConversationState;

use crate::utils::{conversation_title, format_catalog_date};

pub struct ListCommand;

impl ListCommand {
    /// Render the catalog, newest first as the gateway returns it
    pub fn render(state: &ConversationState, now: DateTime<Utc>) -> String {
        if state.conversations.is_empty() {
            return "No conversations yet. Ask a question to start one.".to_string();
        }

        let mut output = String::from("Conversations\n");
        output.push_str(&"-".repeat(40));
        output.push('\n');

        for (i, item) in state.conversations.iter().enumerate() {
            let marker = if state.current_conversation_id.as_deref() == Some(&item.conversation_id) {
                "*"
            } else {
                " "
            };
            output.push_str(&format!(
                "{} {:>2}. {:<53} {:>6}  ({} messages)\n",
                marker,
                i + 1,
                conversation_title(item),
                format_catalog_date(&item.updated_at, now),
                item.message_count
            ));
        }

        output.push_str("\nUse /switch <n> to continue a conversation.");
        output
    }
}

pub struct SwitchCommand;

impl SwitchCommand {
    pub fn execute(args: &str, state: &ConversationState) -> CommandResult {
        if args.is_empty() {
            return CommandResult::Message("Usage: /switch <n|conversation-id>".to_string());
        }

        match resolve(args, &state.conversations) {
            Some(id) => CommandResult::SwitchConversation(id),
            None => CommandResult::Message(format!(
                "No conversation #{} in the list. Run /list to refresh it.",
                args
            )),
        }
    }
}

/// A 1-based catalog index, or otherwise a conversation id taken as-is
fn resolve(args: &str, catalog: &[ConversationListItem]) -> Option<String> {
    match args.parse::<usize>() {
        Ok(n) if n >= 1 => catalog.get(n - 1).map(|item| item.conversation_id.clone()),
        Ok(_) => None,
        Err(_) => Some(args.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(id: &str, first_message: &str, count: u32) -> ConversationListItem {
        ConversationListItem {
            conversation_id: id.into(),
            user_id: None,
            created_at: "2024-05-01T09:00:00Z".into(),
            updated_at: "2024-05-01T10:00:00Z".into(),
            message_count: count,
            first_message: first_message.into(),
        }
    }

    fn state() -> ConversationState {
        ConversationState {
            current_conversation_id: Some("c2".into()),
            conversations: vec![item("c1", "Abstand zur Grundgrenze?", 4), item("c2", "", 0)],
            ..Default::default()
        }
    }

    #[test]
    fn test_switch_by_index() {
        assert_eq!(
            SwitchCommand::execute("1", &state()),
            CommandResult::SwitchConversation("c1".into())
        );
    }

    #[test]
    fn test_switch_by_id() {
        assert_eq!(
            SwitchCommand::execute("abc-123", &state()),
            CommandResult::SwitchConversation("abc-123".into())
        );
    }

    #[test]
    fn test_switch_out_of_range() {
        assert!(matches!(SwitchCommand::execute("0", &state()), CommandResult::Message(_)));
        assert!(matches!(SwitchCommand::execute("3", &state()), CommandResult::Message(_)));
        assert!(matches!(SwitchCommand::execute("", &state()), CommandResult::Message(_)));
    }

    #[test]
    fn test_list_marks_current() {
        let now = Utc.with_ymd_and_hms(2024, 5, 20, 0, 0, 0).unwrap();
        let output = ListCommand::render(&state(), now);
        let lines: Vec<&str> = output.lines().collect();
        assert!(lines[2].starts_with("   1. Abstand zur Grundgrenze?"));
        assert!(lines[2].contains("(4 messages)"));
        assert!(lines[3].starts_with("*  2. New Conversation"));
    }

    #[test]
    fn test_list_empty() {
        let output = ListCommand::render(&ConversationState::default(), Utc::now());
        assert!(output.starts_with("No conversations yet"));
    }
}
