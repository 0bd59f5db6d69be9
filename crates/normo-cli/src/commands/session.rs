//! /session command - show the active conversation

use super::CommandResult;
use normo_session::ConversationState;

use crate::utils::short_id;

pub struct SessionCommand;

impl SessionCommand {
    pub fn execute(state: &ConversationState) -> CommandResult {
        let mut output = String::from("Session Info\n");
        output.push_str(&"-".repeat(40));
        output.push('\n');

        match &state.current_conversation_id {
            Some(id) => output.push_str(&format!("Conversation: {} ({})\n", short_id(id), id)),
            None => output.push_str("Conversation: none (next question starts one)\n"),
        }

        let user_msgs = state.messages.iter().filter(|m| m.is_user()).count();
        let assistant_msgs = state.messages.iter().filter(|m| m.is_assistant()).count();
        output.push_str(&format!("Messages:     {} total\n", state.messages.len()));
        output.push_str(&format!(
            "              {} user, {} assistant\n",
            user_msgs, assistant_msgs
        ));

        let citations: usize = state.messages.iter().map(|m| m.citations().len()).sum();
        output.push_str(&format!("Sources:      {} cited\n", citations));
        output.push_str(&format!("Known:        {} conversations\n", state.conversations.len()));

        if state.is_loading {
            output.push_str("\nA request is in progress.");
        }
        if let Some(error) = &state.error {
            output.push_str(&format!("\nLast error: {}", error));
        }

        CommandResult::Message(output.trim_end().to_string())
    }
}
