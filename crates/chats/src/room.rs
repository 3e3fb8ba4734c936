//! The chat room controller: resolves a conversation, keeps its message
//! snapshot current, and owns the polling task for as long as the room is
//! open.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use parley_api::{Conversation, Message, OutgoingAttachment};
use parley_session::SessionStore;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::{ChatError, ChatResult};

/// Lifecycle of a room. `Resolving` covers conversation lookup plus the
/// initial history load; polling only ever runs while `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Resolving,
    Ready,
    Failed,
}

enum Target {
    Direct(String),
    Group(String),
}

struct RoomState {
    phase: Phase,
    conversation: Option<Conversation>,
    messages: Vec<Message>,
    sending: bool,
    last_error: Option<String>,
}

struct Shared {
    session: Arc<SessionStore>,
    state: RwLock<RoomState>,
}

impl Shared {
    fn read(&self) -> RwLockReadGuard<'_, RoomState> {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RoomState> {
        self.state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn conversation_id(&self) -> ChatResult<String> {
        self.read()
            .conversation
            .as_ref()
            .map(|conversation| conversation.id.clone())
            .ok_or(ChatError::NoActiveConversation)
    }

    /// Refetch the full history. The latest fetch wins outright; the
    /// previous snapshot is never merged with.
    async fn fetch_latest(&self) -> ChatResult<()> {
        let token = self.session.require_token()?;
        let chat_id = self.conversation_id()?;
        let messages = self.session.api().list_messages(&token, &chat_id).await?;
        self.write().messages = messages;
        Ok(())
    }
}

/// Owns the background refresh task; dropping it cancels the task. The room
/// keeps the handle while open so navigation away can never leak a timer.
pub struct PollHandle {
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn stop(self) {
        // Drop aborts.
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub struct ChatRoom {
    shared: Arc<Shared>,
    poll: Option<PollHandle>,
}

impl ChatRoom {
    pub fn new(session: Arc<SessionStore>) -> Self {
        Self {
            shared: Arc::new(Shared {
                session,
                state: RwLock::new(RoomState {
                    phase: Phase::Idle,
                    conversation: None,
                    messages: Vec::new(),
                    sending: false,
                    last_error: None,
                }),
            }),
            poll: None,
        }
    }

    /// Resolve (or create) the one-on-one conversation with `receiver_id`,
    /// then load its history.
    pub async fn open_direct(&mut self, receiver_id: &str) -> ChatResult<()> {
        self.open(Target::Direct(receiver_id.to_string())).await
    }

    /// Open an existing group conversation and load its history.
    pub async fn open_group(&mut self, chat_id: &str) -> ChatResult<()> {
        self.open(Target::Group(chat_id.to_string())).await
    }

    async fn open(&mut self, target: Target) -> ChatResult<()> {
        self.stop_polling();
        {
            let mut state = self.shared.write();
            state.phase = Phase::Resolving;
            state.conversation = None;
            state.messages.clear();
            state.last_error = None;
        }

        let resolved = self.resolve_and_load(target).await;
        match resolved {
            Ok((conversation, messages)) => {
                debug!(chat = %conversation.id, count = messages.len(), "conversation ready");
                let mut state = self.shared.write();
                state.conversation = Some(conversation);
                state.messages = messages;
                state.phase = Phase::Ready;
                Ok(())
            }
            Err(error) => {
                let mut state = self.shared.write();
                state.phase = Phase::Failed;
                state.last_error = Some(error.to_string());
                Err(error)
            }
        }
    }

    async fn resolve_and_load(
        &self,
        target: Target,
    ) -> ChatResult<(Conversation, Vec<Message>)> {
        let session = &self.shared.session;
        let token = session.require_token()?;
        let conversation = match target {
            Target::Direct(receiver_id) => {
                session.api().create_direct_chat(&token, &receiver_id).await?
            }
            Target::Group(chat_id) => session.api().group_details(&token, &chat_id).await?,
        };
        let messages = session.api().list_messages(&token, &conversation.id).await?;
        Ok((conversation, messages))
    }

    /// Begin refreshing the history on a fixed cadence. No-op unless the
    /// room is `Ready`, and never stacks a second task.
    pub fn start_polling(&mut self, interval: Duration) {
        if self.poll.is_some() || self.shared.read().phase != Phase::Ready {
            return;
        }

        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // History was loaded when the room opened; skip the immediate
            // first tick so the first refresh lands one full interval later.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(error) = shared.fetch_latest().await {
                    warn!(%error, "message refresh failed");
                    shared.write().last_error = Some(error.to_string());
                }
            }
        });
        self.poll = Some(PollHandle { task });
    }

    pub fn stop_polling(&mut self) {
        self.poll = None;
    }

    pub fn is_polling(&self) -> bool {
        self.poll
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    /// Leave the conversation: cancel polling and return to `Idle`.
    pub fn close(&mut self) {
        self.stop_polling();
        let mut state = self.shared.write();
        state.phase = Phase::Idle;
        state.conversation = None;
        state.messages.clear();
        state.sending = false;
        state.last_error = None;
    }

    /// Submit a message, then refetch the history. Returns `Ok(false)`
    /// without touching the network when there is nothing to send: blank
    /// content, no active conversation, or a send already in flight.
    pub async fn send_message(
        &self,
        content: &str,
        attachments: Vec<OutgoingAttachment>,
    ) -> ChatResult<bool> {
        if content.trim().is_empty() {
            return Ok(false);
        }
        let Ok(chat_id) = self.shared.conversation_id() else {
            return Ok(false);
        };
        {
            let mut state = self.shared.write();
            if state.sending {
                return Ok(false);
            }
            state.sending = true;
        }

        let result = self.submit(&chat_id, content, attachments).await;
        self.shared.write().sending = false;

        match result {
            Ok(()) => Ok(true),
            Err(error) => {
                self.shared.write().last_error = Some(error.to_string());
                Err(error)
            }
        }
    }

    async fn submit(
        &self,
        chat_id: &str,
        content: &str,
        attachments: Vec<OutgoingAttachment>,
    ) -> ChatResult<()> {
        let token = self.shared.session.require_token()?;
        self.shared
            .session
            .api()
            .send_message(&token, chat_id, content, attachments)
            .await?;
        self.shared.fetch_latest().await
    }

    /// Delete a message, then refetch. The error string is what a caller
    /// shows the user; the room stays usable.
    pub async fn delete_message(&self, message_id: &str) -> ChatResult<()> {
        let token = self.shared.session.require_token()?;
        let chat_id = self.shared.conversation_id()?;

        let result: ChatResult<()> = async {
            self.shared
                .session
                .api()
                .delete_message(&token, &chat_id, message_id)
                .await?;
            self.shared.fetch_latest().await
        }
        .await;

        if let Err(error) = &result {
            self.shared.write().last_error = Some(error.to_string());
        }
        result
    }

    /// Refetch the history once, outside the polling cadence.
    pub async fn refresh(&self) -> ChatResult<()> {
        self.shared.fetch_latest().await
    }

    pub fn phase(&self) -> Phase {
        self.shared.read().phase
    }

    pub fn conversation(&self) -> Option<Conversation> {
        self.shared.read().conversation.clone()
    }

    pub fn is_group(&self) -> bool {
        self.shared
            .read()
            .conversation
            .as_ref()
            .map_or(false, |conversation| conversation.is_group)
    }

    /// Current message snapshot, oldest first.
    pub fn messages(&self) -> Vec<Message> {
        self.shared.read().messages.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.shared.read().last_error.clone()
    }
}
