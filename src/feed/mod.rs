//! Message feed for one chatroom: history, visible window, optimistic sends
//! and the simulated assistant reply.
//!
//! The controller never blocks and never spawns work that touches its own
//! state. Anything delayed (the initial history load, revealing an older
//! page, the assistant's reply) is scheduled as a timer that sends a
//! [`FeedEvent`] back over an mpsc channel. The owner drains that channel
//! and hands each event to [`FeedController::apply`], so every mutation
//! happens on the owner's task.

pub mod image;
mod timer;

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::models::{IdGenerator, Message, MessageBody, Sender};
use crate::store::{history_key, SharedStore};

use timer::Timers;

/// Messages per page of the visible window.
pub const PAGE_SIZE: usize = 20;

/// Simulated latency of reading history from storage.
pub const HISTORY_LOAD_DELAY: Duration = Duration::from_millis(600);

/// Simulated latency of revealing an older page.
pub const OLDER_PAGE_DELAY: Duration = Duration::from_millis(700);

/// Simulated time the assistant takes to "compose" a reply.
pub const AGENT_REPLY_DELAY: Duration = Duration::from_millis(1000);

/// Reply text for an image message.
const IMAGE_REPLY: &str = "Nice image!";

/// Distinguishes controllers so events from a torn-down one are never
/// applied to its successor, even for the same chatroom.
static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("chatroom id must not be empty")]
    EmptyRoomId,
}

/// A deferred completion, delivered by a timer.
#[derive(Debug, Clone)]
pub struct FeedEvent {
    session: u64,
    kind: FeedEventKind,
}

#[derive(Debug, Clone)]
enum FeedEventKind {
    HistoryLoaded { generation: u64 },
    OlderPageReady { generation: u64 },
    AgentReply { ticket: u64, trigger: Message },
}

/// What [`FeedController::apply`] changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedUpdate {
    /// Stale, foreign, or arrived after teardown.
    Ignored,
    /// History finished loading.
    Loaded { count: usize },
    /// The window grew backwards by `count` messages.
    OlderRevealed { count: usize },
    /// An assistant reply was appended.
    AgentReplied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Loading,
    Ready,
}

/// `Idle -> AwaitingReply -> Idle`. Each user message holds one ticket until
/// its reply lands.
#[derive(Debug, Default)]
enum ReplyState {
    #[default]
    Idle,
    AwaitingReply { outstanding: BTreeSet<u64> },
}

impl ReplyState {
    fn begin(&mut self, ticket: u64) {
        match self {
            ReplyState::Idle => {
                *self = ReplyState::AwaitingReply {
                    outstanding: BTreeSet::from([ticket]),
                };
            }
            ReplyState::AwaitingReply { outstanding } => {
                outstanding.insert(ticket);
            }
        }
    }

    /// Retire a ticket. Returns false if it was not outstanding.
    fn complete(&mut self, ticket: u64) -> bool {
        let (removed, drained) = match self {
            ReplyState::Idle => return false,
            ReplyState::AwaitingReply { outstanding } => {
                let removed = outstanding.remove(&ticket);
                (removed, outstanding.is_empty())
            }
        };
        if drained {
            *self = ReplyState::Idle;
        }
        removed
    }

    fn is_awaiting(&self) -> bool {
        matches!(self, ReplyState::AwaitingReply { .. })
    }
}

/// Page a freshly loaded history starts on: `ceil(len / PAGE_SIZE)`, at least 1.
pub fn initial_page(len: usize) -> usize {
    len.div_ceil(PAGE_SIZE).max(1)
}

/// Index of the first message in a window of `page` pages over `len` messages.
pub fn window_start(len: usize, page: usize) -> usize {
    len.saturating_sub(page.saturating_mul(PAGE_SIZE))
}

/// Owns the history of one chatroom and the window of it that is on screen.
pub struct FeedController {
    room_id: String,
    store: SharedStore,
    session: u64,
    timers: Timers,
    ids: IdGenerator,
    /// Full history, oldest first.
    messages: Vec<Message>,
    page: usize,
    /// The visible window is `messages[visible_start..]`.
    visible_start: usize,
    phase: Phase,
    loading_older: bool,
    reply: ReplyState,
    next_ticket: u64,
    scroll_to_latest: bool,
    /// Bumped whenever the history changes; captured by page loads.
    generation: u64,
    mounted: bool,
    persist_error: Option<String>,
}

impl FeedController {
    /// Create a controller for `room_id` and start loading its history.
    ///
    /// Completions are sent to `events`; feed them back through [`apply`].
    /// Must be called from within a tokio runtime.
    ///
    /// [`apply`]: FeedController::apply
    pub fn open(
        room_id: impl Into<String>,
        store: SharedStore,
        events: mpsc::UnboundedSender<FeedEvent>,
    ) -> Result<Self, FeedError> {
        let room_id = room_id.into();
        if room_id.trim().is_empty() {
            return Err(FeedError::EmptyRoomId);
        }

        let mut feed = Self {
            room_id,
            store,
            session: NEXT_SESSION.fetch_add(1, Ordering::Relaxed),
            timers: Timers::new(events),
            ids: IdGenerator::new(),
            messages: Vec::new(),
            page: 1,
            visible_start: 0,
            phase: Phase::Loading,
            loading_older: false,
            reply: ReplyState::Idle,
            next_ticket: 0,
            scroll_to_latest: false,
            generation: 0,
            mounted: true,
            persist_error: None,
        };
        feed.initialize();
        Ok(feed)
    }

    fn initialize(&mut self) {
        tracing::debug!("Loading history for chatroom {}", self.room_id);
        self.phase = Phase::Loading;
        let generation = self.generation;
        self.schedule(
            HISTORY_LOAD_DELAY,
            FeedEventKind::HistoryLoaded { generation },
        );
    }

    fn schedule(&mut self, delay: Duration, kind: FeedEventKind) {
        let event = FeedEvent {
            session: self.session,
            kind,
        };
        self.timers.schedule(delay, event);
    }

    // -- Presentation-facing state --

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Full history, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The part of the history currently on screen. Always a suffix of
    /// [`messages`](FeedController::messages).
    pub fn visible_messages(&self) -> &[Message] {
        &self.messages[self.visible_start..]
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// The initial history load has not completed yet.
    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }

    pub fn is_loading_older(&self) -> bool {
        self.loading_older
    }

    /// An assistant reply is pending.
    pub fn is_agent_typing(&self) -> bool {
        self.reply.is_awaiting()
    }

    /// Whether the view should jump to the newest message. Reading clears it.
    pub fn take_scroll_to_latest(&mut self) -> bool {
        std::mem::take(&mut self.scroll_to_latest)
    }

    /// Last failure to write the history, if any. Reading clears it.
    pub fn take_persist_error(&mut self) -> Option<String> {
        self.persist_error.take()
    }

    // -- User intents --

    /// Send a text message. Whitespace-only text is ignored.
    pub fn submit_text(&mut self, text: &str) -> Option<Message> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let msg = Message::text(self.ids.next_id(), text, Sender::User);
        self.append_user_message(msg)
    }

    /// Send an image given as a `data:` URI.
    pub fn attach_image(&mut self, data_uri: String) -> Option<Message> {
        if data_uri.is_empty() {
            return None;
        }
        let msg = Message::image(self.ids.next_id(), data_uri, Sender::User);
        self.append_user_message(msg)
    }

    fn append_user_message(&mut self, msg: Message) -> Option<Message> {
        if !self.mounted {
            return None;
        }
        // Appending now would be clobbered when the stored history arrives.
        if self.phase == Phase::Loading {
            tracing::warn!(
                "Chatroom {} is still loading; message not sent",
                self.room_id
            );
            return None;
        }

        tracing::debug!("Appending user message {} to {}", msg.id, self.room_id);
        self.push(msg.clone());
        self.simulate_agent_reply(msg.clone());
        Some(msg)
    }

    fn simulate_agent_reply(&mut self, trigger: Message) {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.reply.begin(ticket);
        self.schedule(
            AGENT_REPLY_DELAY,
            FeedEventKind::AgentReply { ticket, trigger },
        );
    }

    /// Reveal one more page of older messages. The viewport should stay
    /// where it is; this never requests a scroll to the latest message.
    ///
    /// Returns false when there is nothing to do: still loading, a page load
    /// already in flight, or already on the first page.
    pub fn load_older_page(&mut self) -> bool {
        if !self.mounted || self.phase != Phase::Ready || self.loading_older || self.page <= 1 {
            return false;
        }

        self.loading_older = true;
        let generation = self.generation;
        self.schedule(
            OLDER_PAGE_DELAY,
            FeedEventKind::OlderPageReady { generation },
        );
        true
    }

    /// Stop everything: pending timers are aborted and any event still in
    /// the channel will be ignored.
    pub fn close(&mut self) {
        if !self.mounted {
            return;
        }
        tracing::debug!(
            "Closing chatroom {} ({} timers pending)",
            self.room_id,
            self.timers.pending()
        );
        self.mounted = false;
        self.timers.cancel_all();
        self.reply = ReplyState::Idle;
        self.loading_older = false;
    }

    // -- Deferred completions --

    /// Apply a completion delivered by one of this controller's timers.
    pub fn apply(&mut self, event: FeedEvent) -> FeedUpdate {
        if !self.mounted || event.session != self.session {
            tracing::debug!("Ignoring feed event from another session");
            return FeedUpdate::Ignored;
        }

        match event.kind {
            FeedEventKind::HistoryLoaded { generation } => {
                if self.phase != Phase::Loading || generation != self.generation {
                    return FeedUpdate::Ignored;
                }
                self.finish_load()
            }
            FeedEventKind::OlderPageReady { generation } => {
                if !self.loading_older {
                    return FeedUpdate::Ignored;
                }
                self.loading_older = false;
                if generation != self.generation {
                    tracing::debug!(
                        "History of {} changed while loading an older page; discarding",
                        self.room_id
                    );
                    return FeedUpdate::Ignored;
                }
                self.reveal_older_page()
            }
            FeedEventKind::AgentReply { ticket, trigger } => {
                if !self.reply.complete(ticket) {
                    return FeedUpdate::Ignored;
                }
                let reply = self.reply_to(&trigger);
                self.push(reply);
                FeedUpdate::AgentReplied
            }
        }
    }

    fn finish_load(&mut self) -> FeedUpdate {
        let messages = self.read_history();
        for msg in &messages {
            self.ids.observe(&msg.id);
        }

        self.messages = messages;
        self.page = initial_page(self.messages.len());
        self.visible_start = window_start(self.messages.len(), self.page);
        self.phase = Phase::Ready;

        tracing::info!(
            "Loaded {} messages for chatroom {} (page {})",
            self.messages.len(),
            self.room_id,
            self.page
        );
        FeedUpdate::Loaded {
            count: self.messages.len(),
        }
    }

    /// Stored history, or empty if it is absent, unreadable or malformed.
    fn read_history(&self) -> Vec<Message> {
        let key = history_key(&self.room_id);
        let raw = match self.store.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!("Could not read {}: {}; starting with empty history", key, e);
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!("Malformed history in {}: {}; starting with empty history", key, e);
                Vec::new()
            }
        }
    }

    fn reveal_older_page(&mut self) -> FeedUpdate {
        let before = self.visible_start;
        self.page -= 1;
        self.visible_start = before.min(window_start(self.messages.len(), self.page));
        let count = before - self.visible_start;

        tracing::debug!(
            "Revealed {} older messages in {} (page {})",
            count,
            self.room_id,
            self.page
        );
        FeedUpdate::OlderRevealed { count }
    }

    fn reply_to(&mut self, trigger: &Message) -> Message {
        let text = match &trigger.body {
            MessageBody::Image(_) => IMAGE_REPLY.to_string(),
            MessageBody::Text(text) => format!("You said: {}", text),
        };
        Message::text(format!("{}_ai", self.ids.next_id()), text, Sender::Agent)
    }

    /// Append to history (and so to the window), persist, and ask the view
    /// to follow.
    fn push(&mut self, msg: Message) {
        self.messages.push(msg);
        self.generation += 1;
        self.persist();
        self.scroll_to_latest = true;
    }

    /// Write the full history. Failures are logged and remembered, never fatal.
    fn persist(&mut self) {
        let key = history_key(&self.room_id);
        let result = serde_json::to_string(&self.messages)
            .map_err(|e| e.to_string())
            .and_then(|json| self.store.set(&key, &json).map_err(|e| e.to_string()));

        if let Err(e) = result {
            tracing::error!("Failed to save {}: {}", key, e);
            self.persist_error = Some(e);
        }
    }
}

impl Drop for FeedController {
    fn drop(&mut self) {
        self.close();
    }
}
