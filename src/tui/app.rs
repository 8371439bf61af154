//! TUI application state and main event loop

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::DefaultTerminal;
use tokio::sync::mpsc;

use super::backend::{self, BackendCommand, BackendHandle, BackendResponse};
use super::clipboard::{Clipboard, Osc52Clipboard};
use super::compose::{ComposeState, Submission};
use super::debug_log::DebugLogState;
use super::input::LineInput;
use super::log_capture::LogBuffer;
use super::messages::{MessagesState, MessagesView};
use super::prompt::{Prompt, PromptOutcome};
use super::search::{SearchResultKind, SearchState};
use super::sidebar::SidebarState;
use super::ui;
use crate::config::Config;
use crate::feed::{FeedController, FeedEvent, FeedUpdate};
use crate::registry::ChatroomRegistry;
use crate::store::SharedStore;

/// Redraw interval (~30 fps); also how often status messages expire.
const FRAME_DURATION_MS: u64 = 33;

/// How long a status bar notification stays up.
const STATUS_DURATION: Duration = Duration::from_secs(3);

/// Active pane in the TUI
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    #[default]
    Sidebar,
    Messages,
    Compose,
}

impl Pane {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pane::Sidebar => "chatrooms",
            Pane::Messages => "messages",
            Pane::Compose => "compose",
        }
    }

    fn next(self) -> Self {
        match self {
            Pane::Sidebar => Pane::Messages,
            Pane::Messages => Pane::Compose,
            Pane::Compose => Pane::Sidebar,
        }
    }

    fn previous(self) -> Self {
        match self {
            Pane::Sidebar => Pane::Compose,
            Pane::Messages => Pane::Sidebar,
            Pane::Compose => Pane::Messages,
        }
    }
}

/// Application state
pub struct App {
    pub should_exit: bool,
    pub active_pane: Pane,
    store: SharedStore,
    config: Config,
    /// Write `last_room` back to the config file.
    remember_last_room: bool,
    registry: ChatroomRegistry,
    /// Controller of the open chatroom.
    pub feed: Option<FeedController>,
    feed_tx: mpsc::UnboundedSender<FeedEvent>,
    backend: BackendHandle,
    clipboard: Box<dyn Clipboard>,
    pub sidebar: SidebarState,
    pub messages: MessagesState,
    pub compose: ComposeState,
    pub search: SearchState,
    pub debug_log: DebugLogState,
    pub prompt: Option<Prompt>,
    pub show_help: bool,
    pub status_message: Option<String>,
    pub status_is_error: bool,
    status_expires: Option<Instant>,
}

impl App {
    pub fn new(
        store: SharedStore,
        config: Config,
        log_buffer: LogBuffer,
        feed_tx: mpsc::UnboundedSender<FeedEvent>,
        backend: BackendHandle,
    ) -> Result<Self> {
        let registry = ChatroomRegistry::load(store.clone()).context("Failed to load chatrooms")?;
        let mut sidebar = SidebarState::default();
        sidebar.update_rooms(registry.list().to_vec());

        Ok(Self {
            should_exit: false,
            active_pane: Pane::default(),
            store,
            config,
            remember_last_room: false,
            registry,
            feed: None,
            feed_tx,
            backend,
            clipboard: Box::new(Osc52Clipboard),
            sidebar,
            messages: MessagesState::default(),
            compose: ComposeState::default(),
            search: SearchState::default(),
            debug_log: DebugLogState::new(log_buffer),
            prompt: None,
            show_help: false,
            status_message: None,
            status_is_error: false,
            status_expires: None,
        })
    }

    /// Reopen the chatroom from the last session, if it still exists.
    pub fn restore_last_room(&mut self) {
        let Some(id) = self.config.last_room.clone() else {
            return;
        };
        if self.registry.get(&id).is_some() {
            self.sidebar.select_id(&id);
            self.open_room(&id);
        } else {
            tracing::debug!("Last chatroom {} no longer exists", id);
        }
    }

    /// Name of the open chatroom, or empty.
    pub fn room_name(&self) -> &str {
        self.feed
            .as_ref()
            .and_then(|feed| self.registry.get(feed.room_id()))
            .map(|room| room.name.as_str())
            .unwrap_or("")
    }

    /// What the messages pane shows for the open chatroom.
    pub fn messages_view(&self) -> Option<MessagesView<'_>> {
        let feed = self.feed.as_ref()?;
        let visible = feed.visible_messages();
        Some(MessagesView {
            header: self.room_name(),
            messages: visible,
            hidden: feed.messages().len() - visible.len(),
            loading: feed.is_loading(),
            loading_older: feed.is_loading_older(),
            agent_typing: feed.is_agent_typing(),
        })
    }

    // -- Status bar --

    fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_is_error = false;
        self.status_expires = Some(Instant::now() + STATUS_DURATION);
    }

    fn set_error(&mut self, msg: impl Into<String>) {
        self.set_status(msg);
        self.status_is_error = true;
    }

    /// Clear the status message once it has been up long enough.
    pub fn expire_status(&mut self) {
        if self.status_expires.is_some_and(|at| Instant::now() >= at) {
            self.status_message = None;
            self.status_is_error = false;
            self.status_expires = None;
        }
    }

    // -- Chatrooms --

    /// Open a chatroom in the messages pane, closing the previous one.
    fn open_room(&mut self, id: &str) {
        if self.feed.as_ref().is_some_and(|feed| feed.room_id() == id) {
            self.active_pane = Pane::Messages;
            return;
        }

        // Dropping the old controller aborts its timers.
        self.feed = None;
        match FeedController::open(id, self.store.clone(), self.feed_tx.clone()) {
            Ok(feed) => {
                tracing::info!("Opened chatroom {}", id);
                self.feed = Some(feed);
                self.sidebar.open_room = Some(id.to_string());
                self.messages.reset();
                self.active_pane = Pane::Messages;
                self.config.set_last_room(Some(id.to_string()));
                self.save_config();
            }
            Err(e) => {
                tracing::error!("Could not open chatroom {}: {}", id, e);
                self.set_error(format!("Could not open chatroom: {}", e));
            }
        }
    }

    fn create_room(&mut self, name: &str) {
        match self.registry.create(name) {
            Ok(room) => {
                self.sidebar.update_rooms(self.registry.list().to_vec());
                self.sidebar.select_id(&room.id);
                self.set_status("Chatroom added!");
            }
            Err(e) => {
                tracing::error!("Could not create chatroom: {}", e);
                self.set_error(format!("Could not create chatroom: {}", e));
            }
        }
    }

    fn delete_room(&mut self, id: &str) {
        match self.registry.delete(id) {
            Ok(true) => {
                if self.feed.as_ref().is_some_and(|feed| feed.room_id() == id) {
                    self.feed = None;
                    self.sidebar.open_room = None;
                    self.messages.reset();
                    self.config.set_last_room(None);
                    self.save_config();
                }
                self.sidebar.update_rooms(self.registry.list().to_vec());
                self.set_status("Chatroom deleted!");
            }
            Ok(false) => tracing::debug!("Chatroom {} already gone", id),
            Err(e) => {
                tracing::error!("Could not delete chatroom {}: {}", id, e);
                self.set_error(format!("Could not delete chatroom: {}", e));
            }
        }
    }

    fn save_config(&self) {
        if !self.remember_last_room {
            return;
        }
        if let Err(e) = self.config.save() {
            tracing::warn!("Could not save config: {:#}", e);
        }
    }

    // -- Feed --

    /// Apply a timer completion to the open chatroom.
    pub fn handle_feed_event(&mut self, event: FeedEvent) {
        let Some(feed) = self.feed.as_mut() else {
            return;
        };
        match feed.apply(event) {
            FeedUpdate::Loaded { count } => {
                tracing::debug!("Chatroom ready with {} messages", count);
                self.messages.select_last(feed.visible_messages().len());
            }
            FeedUpdate::OlderRevealed { count } => {
                self.messages.shift_for_revealed(count);
                if count == 0 {
                    self.set_status("No older messages");
                }
            }
            FeedUpdate::AgentReplied | FeedUpdate::Ignored => {}
        }
        self.sync_feed();
    }

    /// Pick up the flags the controller raises after a change.
    fn sync_feed(&mut self) {
        let Some(feed) = self.feed.as_mut() else {
            return;
        };
        let scroll = feed.take_scroll_to_latest();
        let persist_error = feed.take_persist_error();
        let visible = feed.visible_messages().len();

        if scroll {
            self.messages.select_last(visible);
        }
        if let Some(e) = persist_error {
            self.set_error(format!("Message not saved: {}", e));
        }
    }

    pub fn handle_backend_response(&mut self, resp: BackendResponse) {
        match resp {
            BackendResponse::ImageRead {
                room_id,
                path,
                result,
            } => {
                let Some(feed) = self.feed.as_mut().filter(|f| f.room_id() == room_id) else {
                    tracing::debug!("Dropping image for chatroom {} (no longer open)", room_id);
                    return;
                };
                match result {
                    Ok(data_uri) => {
                        if feed.attach_image(data_uri).is_none() {
                            self.set_error("Chatroom is still loading");
                        }
                        self.sync_feed();
                    }
                    Err(e) => {
                        tracing::warn!("Could not attach {}: {}", path.display(), e);
                        self.set_error(format!("Could not attach image: {}", e));
                    }
                }
            }
        }
    }

    fn submit_compose(&mut self) {
        let Some(feed) = self.feed.as_mut() else {
            self.set_error("Open a chatroom first");
            return;
        };
        // Keep the draft while the history is loading.
        if feed.is_loading() {
            self.set_error("Chatroom is still loading");
            return;
        }
        let room_id = feed.room_id().to_string();

        match self.compose.submit() {
            Some(Submission::Text(text)) => {
                feed.submit_text(&text);
                self.sync_feed();
            }
            Some(Submission::Image(path)) => {
                tracing::debug!("Reading image {}", path.display());
                self.backend.send(BackendCommand::ReadImage { room_id, path });
                self.set_status("Attaching image...");
            }
            None => {}
        }
    }

    // -- Input --

    pub fn handle_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if ctrl && key.code == KeyCode::Char('c') {
            self.should_exit = true;
            return;
        }

        if let Some(prompt) = self.prompt.as_mut() {
            match prompt.handle_key(key) {
                PromptOutcome::Pending => {}
                PromptOutcome::Cancelled => self.prompt = None,
                PromptOutcome::Create(name) => {
                    self.prompt = None;
                    self.create_room(&name);
                }
                PromptOutcome::Delete(id) => {
                    self.prompt = None;
                    self.delete_room(&id);
                }
            }
            return;
        }

        if self.show_help {
            self.show_help = false;
            return;
        }

        if self.search.active {
            self.handle_search_key(key);
            return;
        }

        match key.code {
            KeyCode::Char('k') if ctrl => {
                self.search.activate();
                return;
            }
            KeyCode::Char('d') if ctrl => {
                self.debug_log.toggle();
                return;
            }
            KeyCode::Char('n') if ctrl => {
                self.prompt = Some(Prompt::NewRoom(LineInput::default()));
                return;
            }
            KeyCode::PageUp if self.debug_log.visible => {
                self.debug_log.scroll_back(5);
                return;
            }
            KeyCode::PageDown if self.debug_log.visible => {
                self.debug_log.scroll_forward(5);
                return;
            }
            KeyCode::Tab => {
                self.active_pane = self.active_pane.next();
                return;
            }
            KeyCode::BackTab => {
                self.active_pane = self.active_pane.previous();
                return;
            }
            _ => {}
        }

        match self.active_pane {
            Pane::Sidebar => self.handle_sidebar_key(key),
            Pane::Messages => self.handle_messages_key(key),
            Pane::Compose => self.handle_compose_key(key),
        }
    }

    fn handle_sidebar_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.sidebar.move_up(),
            KeyCode::Down | KeyCode::Char('j') => self.sidebar.move_down(),
            KeyCode::Right => self.active_pane = Pane::Messages,
            KeyCode::Enter => {
                if let Some(id) = self.sidebar.selected_room().map(|r| r.id.clone()) {
                    self.open_room(&id);
                }
            }
            KeyCode::Char('n') => self.prompt = Some(Prompt::NewRoom(LineInput::default())),
            KeyCode::Char('d') => {
                if let Some(room) = self.sidebar.selected_room() {
                    self.prompt = Some(Prompt::ConfirmDelete {
                        id: room.id.clone(),
                        name: room.name.clone(),
                    });
                }
            }
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Char('q') => self.should_exit = true,
            _ => {}
        }
    }

    fn handle_messages_key(&mut self, key: KeyEvent) {
        let visible = self
            .feed
            .as_ref()
            .map_or(0, |feed| feed.visible_messages().len());

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                if self.messages.selected > 0 {
                    self.messages.select_previous();
                } else if let Some(feed) = self.feed.as_mut() {
                    // Past the top: ask for the previous page.
                    feed.load_older_page();
                }
            }
            KeyCode::Down | KeyCode::Char('j') => self.messages.select_next(visible),
            KeyCode::End | KeyCode::Char('G') => self.messages.select_last(visible),
            KeyCode::Char('y') => self.copy_selected_message(),
            KeyCode::Left => self.active_pane = Pane::Sidebar,
            KeyCode::Enter | KeyCode::Char('i') => self.active_pane = Pane::Compose,
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Char('q') => self.should_exit = true,
            _ => {}
        }
    }

    /// Copy the selected text message. Images are not copied.
    fn copy_selected_message(&mut self) {
        let Some(feed) = self.feed.as_ref() else {
            return;
        };
        let Some(text) = feed
            .visible_messages()
            .get(self.messages.selected)
            .and_then(|msg| msg.as_text())
        else {
            return;
        };
        match self.clipboard.copy_text(text) {
            Ok(()) => self.set_status("Copied!"),
            Err(e) => self.set_error(format!("Copy failed: {}", e)),
        }
    }

    fn handle_compose_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Enter => self.submit_compose(),
            KeyCode::Char('p') if ctrl => self.compose.toggle_attach(),
            KeyCode::Esc => self.active_pane = Pane::Messages,
            _ => {
                self.compose.input.handle_key(key);
            }
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.search.deactivate(),
            KeyCode::Up => self.search.select_previous(),
            KeyCode::Down => self.search.select_next(),
            KeyCode::Enter => {
                let selected = self.search.selected_result().map(|r| r.kind.clone());
                self.search.deactivate();
                match selected {
                    Some(SearchResultKind::Chatroom(id)) => {
                        self.sidebar.select_id(&id);
                        self.open_room(&id);
                    }
                    Some(SearchResultKind::Message(idx)) => {
                        self.messages.selected = idx;
                        self.active_pane = Pane::Messages;
                    }
                    None => {}
                }
            }
            _ => {
                if self.search.input.handle_key(key) {
                    let messages = self.feed.as_ref().map_or(&[][..], |f| f.visible_messages());
                    self.search.update_results(&self.registry, messages);
                }
            }
        }
    }
}

/// Run the TUI until the user quits. The terminal is restored on exit and
/// on panic.
pub async fn run(
    store: SharedStore,
    config: Config,
    log_buffer: LogBuffer,
    remember_last_room: bool,
) -> Result<()> {
    let mut terminal = ratatui::init();
    let result = run_app(&mut terminal, store, config, log_buffer, remember_last_room).await;
    ratatui::restore();
    result
}

async fn run_app(
    terminal: &mut DefaultTerminal,
    store: SharedStore,
    config: Config,
    log_buffer: LogBuffer,
    remember_last_room: bool,
) -> Result<()> {
    let (feed_tx, mut feed_rx) = mpsc::unbounded_channel();
    let (backend, mut backend_rx) = backend::start();

    let mut app = App::new(store, config, log_buffer, feed_tx, backend)?;
    app.remember_last_room = remember_last_room;
    app.restore_last_room();

    let mut events = EventStream::new();
    let mut tick = tokio::time::interval(Duration::from_millis(FRAME_DURATION_MS));

    while !app.should_exit {
        app.debug_log.refresh();
        app.expire_status();
        terminal.draw(|frame| ui::render(frame, &app))?;

        tokio::select! {
            maybe_event = events.next() => match maybe_event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => app.handle_key(key),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e).context("Failed to read terminal events"),
                None => break,
            },
            Some(event) = feed_rx.recv() => app.handle_feed_event(event),
            Some(resp) = backend_rx.recv() => app.handle_backend_response(resp),
            _ = tick.tick() => {}
        }
    }

    tracing::info!("Exiting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{AGENT_REPLY_DELAY, HISTORY_LOAD_DELAY};
    use crate::store::MemoryStore;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    struct RecordingClipboard(Arc<Mutex<Vec<String>>>);

    impl Clipboard for RecordingClipboard {
        fn copy_text(&mut self, text: &str) -> std::io::Result<()> {
            self.0.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    struct FailingClipboard;

    impl Clipboard for FailingClipboard {
        fn copy_text(&mut self, _text: &str) -> std::io::Result<()> {
            Err(std::io::Error::other("no terminal"))
        }
    }

    struct Harness {
        app: App,
        feed_rx: mpsc::UnboundedReceiver<FeedEvent>,
        backend_rx: mpsc::UnboundedReceiver<BackendResponse>,
        copied: Arc<Mutex<Vec<String>>>,
    }

    impl Harness {
        fn new() -> Self {
            let (feed_tx, feed_rx) = mpsc::unbounded_channel();
            let (backend, backend_rx) = backend::start();
            let store: SharedStore = Arc::new(MemoryStore::new());
            let mut app =
                App::new(store, Config::default(), LogBuffer::new(), feed_tx, backend).unwrap();
            let copied = Arc::new(Mutex::new(Vec::new()));
            app.clipboard = Box::new(RecordingClipboard(copied.clone()));
            Self {
                app,
                feed_rx,
                backend_rx,
                copied,
            }
        }

        fn copied(&self) -> Vec<String> {
            self.copied.lock().unwrap().clone()
        }

        fn press(&mut self, code: KeyCode) {
            self.app.handle_key(KeyEvent::from(code));
        }

        fn ctrl(&mut self, c: char) {
            self.app.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL));
        }

        fn type_str(&mut self, s: &str) {
            for c in s.chars() {
                self.press(KeyCode::Char(c));
            }
        }

        async fn next_feed_event(&mut self) {
            let event = self.feed_rx.recv().await.unwrap();
            self.app.handle_feed_event(event);
        }

        fn create(&mut self, name: &str) {
            self.press(KeyCode::Char('n'));
            self.type_str(name);
            self.press(KeyCode::Enter);
        }

        /// Create a chatroom, open it and wait for its history to load.
        /// Leaves the messages pane focused.
        async fn open_loaded(&mut self, name: &str) {
            self.create(name);
            self.press(KeyCode::Enter);
            tokio::time::advance(HISTORY_LOAD_DELAY).await;
            self.next_feed_event().await;
        }
    }

    #[tokio::test]
    async fn test_create_room_via_prompt() {
        let mut h = Harness::new();
        h.create("Trips");

        assert!(h.app.prompt.is_none());
        assert_eq!(h.app.sidebar.rooms.len(), 1);
        assert_eq!(h.app.sidebar.rooms[0].name, "Trips");
        assert_eq!(h.app.status_message.as_deref(), Some("Chatroom added!"));
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let mut h = Harness::new();
        h.create("Trips");

        h.press(KeyCode::Char('d'));
        h.press(KeyCode::Char('n'));
        assert_eq!(h.app.sidebar.rooms.len(), 1);

        h.press(KeyCode::Char('d'));
        h.press(KeyCode::Char('y'));
        assert!(h.app.sidebar.rooms.is_empty());
        assert_eq!(h.app.status_message.as_deref(), Some("Chatroom deleted!"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_and_receive_reply() {
        let mut h = Harness::new();
        h.create("Chat");
        h.press(KeyCode::Enter);
        assert_eq!(h.app.active_pane, Pane::Messages);
        assert!(h.app.messages_view().unwrap().loading);

        // Sending while loading keeps the draft.
        h.press(KeyCode::Enter);
        h.type_str("hello");
        h.press(KeyCode::Enter);
        assert_eq!(h.app.compose.input.text(), "hello");
        assert!(h.app.status_is_error);

        tokio::time::advance(HISTORY_LOAD_DELAY).await;
        h.next_feed_event().await;
        assert!(!h.app.messages_view().unwrap().loading);

        h.press(KeyCode::Enter);
        assert!(h.app.compose.input.is_empty());
        let view = h.app.messages_view().unwrap();
        assert_eq!(view.messages.len(), 1);
        assert!(view.agent_typing);

        tokio::time::advance(AGENT_REPLY_DELAY).await;
        h.next_feed_event().await;
        let view = h.app.messages_view().unwrap();
        assert_eq!(view.messages.len(), 2);
        assert_eq!(view.messages[1].as_text(), Some("You said: hello"));
        assert!(!view.agent_typing);
        assert_eq!(h.app.messages.selected, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deleting_open_room_closes_feed() {
        let mut h = Harness::new();
        h.create("Chat");
        h.press(KeyCode::Enter);
        assert!(h.app.feed.is_some());

        h.app.active_pane = Pane::Sidebar;
        h.press(KeyCode::Char('d'));
        h.press(KeyCode::Char('y'));
        assert!(h.app.feed.is_none());
        assert!(h.app.sidebar.open_room.is_none());
    }

    #[tokio::test]
    async fn test_attach_failure_shows_error() {
        let mut h = Harness::new();
        h.create("Pics");
        h.press(KeyCode::Enter);
        h.next_feed_event().await;

        h.press(KeyCode::Tab);
        assert_eq!(h.app.active_pane, Pane::Compose);
        h.ctrl('p');
        h.type_str("/nonexistent/cat.png");
        h.press(KeyCode::Enter);

        let resp = h.backend_rx.recv().await.unwrap();
        h.app.handle_backend_response(resp);
        assert!(h.app.status_is_error);
        assert!(h.app.messages_view().unwrap().messages.is_empty());
    }

    #[tokio::test]
    async fn test_search_opens_room() {
        let mut h = Harness::new();
        h.create("Travel");
        h.create("Recipes");

        h.ctrl('k');
        h.type_str("trav");
        assert_eq!(h.app.search.results.len(), 1);
        h.press(KeyCode::Enter);

        assert!(!h.app.search.active);
        assert_eq!(h.app.room_name(), "Travel");
    }

    #[tokio::test]
    async fn test_help_and_quit() {
        let mut h = Harness::new();
        h.press(KeyCode::Char('?'));
        assert!(h.app.show_help);
        h.press(KeyCode::Char('q'));
        assert!(!h.app.show_help);
        assert!(!h.app.should_exit);
        h.press(KeyCode::Char('q'));
        assert!(h.app.should_exit);
    }

    #[tokio::test(start_paused = true)]
    async fn test_copy_selected_message() {
        let mut h = Harness::new();
        h.open_loaded("Chat").await;
        h.press(KeyCode::Enter);
        h.type_str("hello");
        h.press(KeyCode::Enter);
        tokio::time::advance(AGENT_REPLY_DELAY).await;
        h.next_feed_event().await;

        h.press(KeyCode::Esc);
        assert_eq!(h.app.active_pane, Pane::Messages);
        assert_eq!(h.app.messages.selected, 1);
        h.press(KeyCode::Char('y'));
        assert_eq!(h.app.status_message.as_deref(), Some("Copied!"));
        assert!(!h.app.status_is_error);

        h.press(KeyCode::Up);
        h.press(KeyCode::Char('y'));
        assert_eq!(h.copied(), vec!["You said: hello", "hello"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_copy_ignores_image_messages() {
        let mut h = Harness::new();
        h.open_loaded("Pics").await;
        let room_id = h.app.feed.as_ref().unwrap().room_id().to_string();
        h.app.handle_backend_response(BackendResponse::ImageRead {
            room_id,
            path: PathBuf::from("cat.png"),
            result: Ok("data:image/png;base64,AA==".to_string()),
        });
        assert_eq!(h.app.messages_view().unwrap().messages.len(), 1);

        h.press(KeyCode::Char('y'));
        assert!(h.copied().is_empty());
        assert!(h.app.status_message.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_copy_failure_shows_error() {
        let mut h = Harness::new();
        h.open_loaded("Chat").await;
        h.press(KeyCode::Enter);
        h.type_str("hi");
        h.press(KeyCode::Enter);
        h.press(KeyCode::Esc);

        h.app.clipboard = Box::new(FailingClipboard);
        h.press(KeyCode::Char('y'));
        assert!(h.app.status_is_error);
        let status = h.app.status_message.clone().unwrap();
        assert!(status.starts_with("Copy failed"), "{}", status);
    }
}
