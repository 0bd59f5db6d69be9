//! Session manager: the single owner of conversation state

use chrono::SecondsFormat;
use normo_api::{ChatGateway, ChatTurn, ConversationListItem, Role};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::{
    error::{Error, Result},
    events::SessionEvent,
    state::{ChatMessage, ConversationState, MessageIds},
    store::{CURRENT_CONVERSATION_KEY, SessionStore},
};

/// What became of a completed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The result was applied to the session
    Applied,
    /// Nothing to do (blank input); no request was made
    Skipped,
    /// The view moved on while the request was in flight; the result was dropped
    Discarded,
}

/// Mutable session state. Only touched while holding the manager's lock, and the
/// lock is never held across an await point.
#[derive(Default)]
struct Inner {
    current_conversation_id: Option<String>,
    conversations: Vec<ConversationListItem>,
    messages: Vec<ChatMessage>,
    error: Option<String>,
    /// Outstanding create/switch/send operations
    in_flight: usize,
    /// Bumped when a navigation (create, switch, clear) is requested
    intent: u64,
    /// Bumped when the displayed conversation is replaced
    epoch: u64,
}

/// Decrements the in-flight counter when an operation ends, including when the
/// caller drops the operation's future.
struct LoadingGuard<'a> {
    state: &'a Mutex<Inner>,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
    }
}

/// Owns the active conversation, its messages and the conversation catalog, and
/// mediates every call to the chat gateway and the local session store.
///
/// Operations take `&self` and may run concurrently. Completions that arrive after
/// the user navigated elsewhere are discarded instead of being applied to the wrong
/// conversation.
pub struct SessionManager {
    gateway: Arc<dyn ChatGateway>,
    store: Arc<dyn SessionStore>,
    state: Mutex<Inner>,
    event_tx: broadcast::Sender<SessionEvent>,
    ids: MessageIds,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(gateway: Arc<dyn ChatGateway>, store: Arc<dyn SessionStore>) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            gateway,
            store,
            state: Mutex::new(Inner::default()),
            event_tx,
            ids: MessageIds::new(),
        }
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Get a snapshot of the current state
    pub fn snapshot(&self) -> ConversationState {
        let state = self.state.lock();
        ConversationState {
            current_conversation_id: state.current_conversation_id.clone(),
            conversations: state.conversations.clone(),
            messages: state.messages.clone(),
            is_loading: state.in_flight > 0,
            error: state.error.clone(),
        }
    }

    /// The active conversation id
    pub fn current_conversation_id(&self) -> Option<String> {
        self.state.lock().current_conversation_id.clone()
    }

    /// Whether a create, switch or send is outstanding
    pub fn is_loading(&self) -> bool {
        self.state.lock().in_flight > 0
    }

    /// The conversation id left in the session store by a previous session
    pub fn persisted_conversation_id(&self) -> Option<String> {
        self.store.load(CURRENT_CONVERSATION_KEY)
    }

    /// Load the catalog and, if a previous session left an active conversation,
    /// switch back to it. Both requests run concurrently.
    pub async fn start(&self) {
        let restore = async {
            if let Some(id) = self.persisted_conversation_id() {
                tracing::debug!("Restoring conversation {}", id);
                if let Err(e) = self.switch_to_conversation(&id).await {
                    tracing::warn!("Could not restore conversation {}: {}", id, e.gateway_error());
                }
            }
        };
        tokio::join!(self.load_conversations(), restore);
    }

    /// Ask the gateway for a new conversation and make it active.
    ///
    /// Returns the new id. If another navigation was requested meanwhile, the id is
    /// still returned but the session is left as that navigation set it.
    pub async fn create_new_conversation(&self) -> Result<String> {
        let _loading = self.begin();
        let intent = self.bump_intent();

        match self.gateway.create_conversation().await {
            Ok(conversation_id) => {
                {
                    let mut state = self.state.lock();
                    if state.intent != intent {
                        drop(state);
                        self.discard("create_conversation");
                        return Ok(conversation_id);
                    }
                    self.set_current(&mut state, Some(conversation_id.clone()));
                    state.messages.clear();
                    state.epoch += 1;
                }
                tracing::debug!("Created conversation {}", conversation_id);
                self.emit(SessionEvent::ConversationCreated {
                    conversation_id: conversation_id.clone(),
                });

                self.load_conversations().await;
                Ok(conversation_id)
            }
            Err(e) => {
                let err = Error::CreateConversation(e);
                self.fail_navigation(intent, &err, "create_conversation");
                Err(err)
            }
        }
    }

    /// Load a stored conversation and make it active, replacing the displayed
    /// messages. On failure the previous conversation stays active.
    pub async fn switch_to_conversation(&self, conversation_id: &str) -> Result<Delivery> {
        let _loading = self.begin();
        let intent = self.bump_intent();

        match self.gateway.get_conversation(conversation_id).await {
            Ok(conversation) => {
                let messages: Vec<ChatMessage> = conversation
                    .messages
                    .iter()
                    .enumerate()
                    .map(|(index, m)| ChatMessage::from_stored(conversation_id, index, m))
                    .collect();
                let message_count = messages.len();

                {
                    let mut state = self.state.lock();
                    if state.intent != intent {
                        drop(state);
                        self.discard("switch_conversation");
                        return Ok(Delivery::Discarded);
                    }
                    self.set_current(&mut state, Some(conversation_id.to_string()));
                    state.messages = messages;
                    state.epoch += 1;
                }
                tracing::debug!(
                    "Loaded conversation {} ({} messages)",
                    conversation_id,
                    message_count
                );
                self.emit(SessionEvent::ConversationLoaded {
                    conversation_id: conversation_id.to_string(),
                    message_count,
                });
                Ok(Delivery::Applied)
            }
            Err(e) => {
                let err = Error::LoadConversation(e);
                self.fail_navigation(intent, &err, "switch_conversation");
                Err(err)
            }
        }
    }

    /// Send a user message.
    ///
    /// The user turn is appended before the request is made. On success the reply
    /// is appended; on failure the user turn is removed again. Blank input is
    /// ignored without touching the session. If the displayed conversation was
    /// replaced while the request was in flight, its outcome (reply or failure) is
    /// dropped and `Delivery::Discarded` is returned.
    pub async fn send_message(&self, text: &str) -> Result<Delivery> {
        let content = text.trim();
        if content.is_empty() {
            return Ok(Delivery::Skipped);
        }

        let _loading = self.begin();
        let user_message = ChatMessage::user(self.ids.next(Role::User), content);
        let (epoch, conversation_id) = {
            let mut state = self.state.lock();
            state.messages.push(user_message.clone());
            (state.epoch, state.current_conversation_id.clone())
        };
        self.emit(SessionEvent::MessageAppended {
            message: user_message.clone(),
        });

        let turn = ChatTurn {
            role: Role::User,
            content: content.to_string(),
            timestamp: Some(
                user_message
                    .timestamp
                    .to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
        };

        match self
            .gateway
            .send_message(turn, conversation_id.as_deref())
            .await
        {
            Ok(response) => {
                let reply = ChatMessage::from_reply(self.ids.next(Role::Assistant), &response);
                let adopted = {
                    let mut state = self.state.lock();
                    if state.epoch != epoch {
                        drop(state);
                        self.discard("send_message");
                        return Ok(Delivery::Discarded);
                    }
                    state.messages.push(reply.clone());
                    match response.conversation_id {
                        Some(id) if !id.is_empty() && state.current_conversation_id.is_none() => {
                            self.set_current(&mut state, Some(id.clone()));
                            Some(id)
                        }
                        _ => None,
                    }
                };
                self.emit(SessionEvent::MessageAppended { message: reply });

                if let Some(conversation_id) = adopted {
                    tracing::debug!("Adopted conversation {} from chat response", conversation_id);
                    self.emit(SessionEvent::ConversationAdopted { conversation_id });
                    self.load_conversations().await;
                }
                Ok(Delivery::Applied)
            }
            Err(e) => {
                let err = Error::SendMessage(e);
                let rolled_back = {
                    let mut state = self.state.lock();
                    if state.epoch != epoch {
                        false
                    } else {
                        state.error = Some(err.to_string());
                        if let Some(pos) =
                            state.messages.iter().rposition(|m| m.id == user_message.id)
                        {
                            state.messages.remove(pos);
                        }
                        true
                    }
                };

                if !rolled_back {
                    tracing::debug!("Send failed after the view moved on: {}", err.gateway_error());
                    self.discard("send_message");
                    return Ok(Delivery::Discarded);
                }
                self.report(&err);
                self.emit(SessionEvent::MessageRolledBack {
                    message_id: user_message.id,
                });
                Err(err)
            }
        }
    }

    /// Replace the catalog with the gateway's list. A failure empties the catalog
    /// rather than leaving a possibly stale list in place.
    pub async fn load_conversations(&self) {
        let conversations = match self.gateway.list_conversations().await {
            Ok(conversations) => conversations,
            Err(e) => {
                tracing::warn!("Failed to load conversations: {}", e);
                vec![]
            }
        };
        let count = conversations.len();
        self.state.lock().conversations = conversations;
        self.emit(SessionEvent::CatalogRefreshed { count });
    }

    /// Deactivate the current conversation and empty the message list
    pub fn clear_current_conversation(&self) {
        {
            let mut state = self.state.lock();
            state.intent += 1;
            state.epoch += 1;
            self.set_current(&mut state, None);
            state.messages.clear();
        }
        self.emit(SessionEvent::ConversationCleared);
    }

    // ---- Private helpers ----

    /// Mark an operation as started: clears the last error and raises the loading flag.
    fn begin(&self) -> LoadingGuard<'_> {
        let mut state = self.state.lock();
        state.in_flight += 1;
        state.error = None;
        LoadingGuard { state: &self.state }
    }

    fn bump_intent(&self) -> u64 {
        let mut state = self.state.lock();
        state.intent += 1;
        state.intent
    }

    /// Change the active conversation and mirror it into the session store.
    fn set_current(&self, state: &mut Inner, conversation_id: Option<String>) {
        if state.current_conversation_id == conversation_id {
            return;
        }
        let persisted = match &conversation_id {
            Some(id) => self.store.save(CURRENT_CONVERSATION_KEY, id),
            None => self.store.remove(CURRENT_CONVERSATION_KEY),
        };
        if let Err(e) = persisted {
            tracing::warn!("Failed to persist active conversation: {}", e);
        }
        state.current_conversation_id = conversation_id;
    }

    /// Record a failed create/switch unless a newer navigation superseded it.
    fn fail_navigation(&self, intent: u64, err: &Error, operation: &'static str) {
        let current = {
            let mut state = self.state.lock();
            if state.intent == intent {
                state.error = Some(err.to_string());
                true
            } else {
                false
            }
        };
        if current {
            self.report(err);
        } else {
            self.discard(operation);
        }
    }

    fn report(&self, err: &Error) {
        tracing::warn!("{}: {}", err, err.gateway_error());
        self.emit(SessionEvent::Error {
            message: err.to_string(),
        });
    }

    fn discard(&self, operation: &'static str) {
        tracing::debug!("Discarding stale {} completion", operation);
        self.emit(SessionEvent::CompletionDiscarded { operation });
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.event_tx.send(event);
    }
}
