//! One-shot subcommands: manage chatrooms and talk to a feed from the shell
//!
//! Each command opens what it needs, drives the feed's timers to completion,
//! prints to stdout, and exits.

use std::path::Path;

use anyhow::{bail, Context, Result};
use tokio::sync::mpsc;

use crate::feed::{self, image, FeedController, FeedEvent, FeedUpdate};
use crate::models::{Message, MessageBody};
use crate::registry::ChatroomRegistry;
use crate::store::SharedStore;

/// One line per message: `[You] hello`.
pub fn format_message(msg: &Message) -> String {
    match &msg.body {
        MessageBody::Text(text) => format!("[{}] {}", msg.sender.display_name(), text),
        MessageBody::Image(uri) => format!(
            "[{}] [image] {}",
            msg.sender.display_name(),
            image::describe_data_uri(uri)
        ),
    }
}

/// List chatrooms, optionally filtered by name.
pub fn list_rooms(store: SharedStore, search: Option<&str>) -> Result<()> {
    let registry = ChatroomRegistry::load(store).context("Failed to load chatrooms")?;
    let rooms = registry.search(search.unwrap_or(""));

    println!("\nChatrooms:");
    println!("{:-<60}", "");

    if rooms.is_empty() {
        println!("  (no chatrooms found)");
        return Ok(());
    }

    for room in rooms {
        println!("{}", room.name);
        println!("  ID: {}", room.id);
    }
    Ok(())
}

pub fn create_room(store: SharedStore, name: &str) -> Result<()> {
    let mut registry = ChatroomRegistry::load(store).context("Failed to load chatrooms")?;
    let room = registry.create(name)?;
    println!("Chatroom added: {} ({})", room.name, room.id);
    Ok(())
}

pub fn delete_room(store: SharedStore, id: &str) -> Result<()> {
    let mut registry = ChatroomRegistry::load(store).context("Failed to load chatrooms")?;
    if !registry.delete(id)? {
        bail!("Unknown chatroom '{}'. Run 'gemini-chat rooms'.", id);
    }
    println!("Chatroom deleted: {}", id);
    Ok(())
}

/// Print a chatroom's visible window, after revealing `older` extra pages.
pub async fn read_room(store: SharedStore, id: &str, older: usize) -> Result<()> {
    let (mut feed, mut events) = open_feed(store, id).await?;

    for _ in 0..older {
        if !feed.load_older_page() {
            break;
        }
        drive_until(&mut feed, &mut events, |update| {
            matches!(update, FeedUpdate::OlderRevealed { .. })
        })
        .await?;
    }

    let visible = feed.visible_messages();
    println!(
        "\n{} of {} messages (page {}):",
        visible.len(),
        feed.messages().len(),
        feed.page()
    );
    println!("{:-<60}", "");

    if visible.is_empty() {
        println!("  (no messages yet)");
    }
    for msg in visible {
        println!("{}", format_message(msg));
    }
    Ok(())
}

/// Send a text message and wait for the reply.
pub async fn send_text(store: SharedStore, id: &str, text: &str) -> Result<()> {
    let (mut feed, mut events) = open_feed(store, id).await?;
    let Some(sent) = feed.submit_text(text) else {
        bail!("Message is empty");
    };
    finish_send(&mut feed, &mut events, &sent).await
}

/// Send an image file and wait for the reply.
pub async fn attach_image(store: SharedStore, id: &str, path: &Path) -> Result<()> {
    let data_uri = image::read_data_uri(path).await?;
    let (mut feed, mut events) = open_feed(store, id).await?;
    let Some(sent) = feed.attach_image(data_uri) else {
        bail!("Could not attach {}", path.display());
    };
    finish_send(&mut feed, &mut events, &sent).await
}

async fn finish_send(
    feed: &mut FeedController,
    events: &mut mpsc::UnboundedReceiver<FeedEvent>,
    sent: &Message,
) -> Result<()> {
    println!("{}", format_message(sent));
    if let Some(err) = feed.take_persist_error() {
        tracing::warn!("Message was not saved: {}", err);
    }

    tracing::debug!("Waiting for reply...");
    drive_until(feed, events, |update| update == FeedUpdate::AgentReplied).await?;

    if let Some(reply) = feed.messages().last() {
        println!("{}", format_message(reply));
    }
    Ok(())
}

/// Open a registered chatroom's feed and wait for its history to load.
async fn open_feed(
    store: SharedStore,
    id: &str,
) -> Result<(FeedController, mpsc::UnboundedReceiver<FeedEvent>)> {
    let registry = ChatroomRegistry::load(store.clone()).context("Failed to load chatrooms")?;
    if registry.get(id).is_none() {
        bail!("Unknown chatroom '{}'. Run 'gemini-chat rooms'.", id);
    }

    let (tx, mut events) = mpsc::unbounded_channel();
    let mut feed = FeedController::open(id, store, tx)?;
    drive_until(&mut feed, &mut events, |update| {
        matches!(update, FeedUpdate::Loaded { .. })
    })
    .await?;
    Ok((feed, events))
}

/// Apply timer events until one produces an update matching `done`.
async fn drive_until(
    feed: &mut FeedController,
    events: &mut mpsc::UnboundedReceiver<FeedEvent>,
    done: impl Fn(FeedUpdate) -> bool,
) -> Result<()> {
    // Generous bound: every feed timer is shorter than this.
    let deadline = feed::AGENT_REPLY_DELAY * 10;
    loop {
        let event = tokio::time::timeout(deadline, events.recv())
            .await
            .context("Timed out waiting for the chatroom")?
            .context("Chatroom event channel closed")?;
        if done(feed.apply(event)) {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sender;
    use crate::store::{history_key, KeyValueStore, MemoryStore};
    use std::sync::Arc;

    #[test]
    fn test_format_message() {
        let text = Message::text("1".to_string(), "hello", Sender::User);
        assert_eq!(format_message(&text), "[You] hello");

        let reply = Message::text("2_ai".to_string(), "You said: hello", Sender::Agent);
        assert_eq!(format_message(&reply), "[Gemini] You said: hello");

        let img = Message::image("3".to_string(), "data:image/png;base64,AA==", Sender::User);
        assert_eq!(format_message(&img), "[You] [image] image/png, 1 B");
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_text_round_trip() {
        let store = Arc::new(MemoryStore::new());
        let room = ChatroomRegistry::load(store.clone())
            .unwrap()
            .create("Test")
            .unwrap();

        send_text(store.clone(), &room.id, "hello").await.unwrap();

        let raw = store.get(&history_key(&room.id)).unwrap().unwrap();
        let history: Vec<Message> = serde_json::from_str(&raw).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].as_text(), Some("You said: hello"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_room_rejected() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let err = send_text(store, "nope", "hello").await.unwrap_err();
        assert!(err.to_string().contains("Unknown chatroom"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_message_rejected() {
        let store = Arc::new(MemoryStore::new());
        let room = ChatroomRegistry::load(store.clone())
            .unwrap()
            .create("Test")
            .unwrap();
        assert!(send_text(store.clone(), &room.id, "   ").await.is_err());
        assert_eq!(store.get(&history_key(&room.id)).unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attach_missing_file() {
        let store = Arc::new(MemoryStore::new());
        let room = ChatroomRegistry::load(store.clone())
            .unwrap()
            .create("Pics")
            .unwrap();
        let result = attach_image(store.clone(), &room.id, Path::new("/nonexistent/cat.png")).await;
        assert!(result.is_err());
        assert_eq!(store.get(&history_key(&room.id)).unwrap(), None);
    }
}
