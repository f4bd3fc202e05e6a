use std::path::PathBuf;

use serde::{Deserialize, Deserializer};
use tokio::task::JoinHandle;

use crate::api::{ApiClient, ApiResponse, BatchOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Chat,
    Sentiment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Which input box the sentiment screen is acting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentimentField {
    Text,
    File,
}

/// The role of a chat message sender.
///
/// The wire value is an open string; anything the server invents that is not
/// `"user"` displays as assistant, so rendering never has to reject a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatRole {
    User,
    #[default]
    Assistant,
}

impl<'de> Deserialize<'de> for ChatRole {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let role = String::deserialize(deserializer)?;
        Ok(if role == "user" {
            ChatRole::User
        } else {
            ChatRole::Assistant
        })
    }
}

/// One exchanged message. Immutable once created; conversation order is
/// insertion order.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub role: ChatRole,
    #[serde(default)]
    pub content: String,
}

/// The ordered conversation as last confirmed by the server.
///
/// The displayed sequence is always exactly the last server-returned history,
/// or empty after a reset. There is no append: the client never speculatively
/// adds a message before the server confirms it.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn replace_all(&mut self, messages: Vec<ChatMessage>) {
        self.messages = messages;
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Classification of a single text, display-only.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SentimentResult {
    #[serde(default)]
    pub sentimiento: String,
    #[serde(default)]
    pub confianza: f64,
    #[serde(default)]
    pub explicacion: String,
}

/// What a sentiment result slot is currently showing.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Panel {
    #[default]
    Empty,
    /// In-flight call; rendered with an animated working label.
    Working,
    /// Prompts, completion messages and errors.
    Notice(String),
    /// A classification result, rendered into the three fixed slots.
    Result(SentimentResult),
}

pub struct App {
    pub should_quit: bool,
    pub screen: Screen,
    pub input_mode: InputMode,

    // Chat state
    pub conversation: Conversation,
    /// Bootstrap failure text, shown in place of the message list.
    pub history_error: Option<String>,
    pub chat_input: String,
    pub chat_cursor: usize,
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,
    /// Modal error raised by a failed send; swallows input until dismissed.
    pub alert: Option<String>,
    pub history_task: Option<JoinHandle<ApiResponse>>,
    pub send_tasks: Vec<JoinHandle<ApiResponse>>,

    // Sentiment state
    pub sentiment_field: SentimentField,
    pub text_input: String,
    pub text_cursor: usize,
    pub file_input: String,
    pub file_cursor: usize,
    pub text_panel: Panel,
    pub csv_panel: Panel,
    pub text_tasks: Vec<JoinHandle<ApiResponse>>,
    pub csv_tasks: Vec<JoinHandle<BatchOutcome>>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    pub api: ApiClient,
    pub download_dir: PathBuf,
}

impl App {
    pub fn new(api: ApiClient, download_dir: PathBuf) -> Self {
        Self {
            should_quit: false,
            screen: Screen::Chat,
            input_mode: InputMode::Normal,

            conversation: Conversation::default(),
            history_error: None,
            chat_input: String::new(),
            chat_cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            alert: None,
            history_task: None,
            send_tasks: Vec::new(),

            sentiment_field: SentimentField::Text,
            text_input: String::new(),
            text_cursor: 0,
            file_input: String::new(),
            file_cursor: 0,
            text_panel: Panel::Empty,
            csv_panel: Panel::Empty,
            text_tasks: Vec::new(),
            csv_tasks: Vec::new(),

            animation_frame: 0,

            api,
            download_dir,
        }
    }

    /// Kick off the initial history fetch. Called once at startup.
    pub fn bootstrap(&mut self) {
        let api = self.api.clone();
        self.history_task = Some(tokio::spawn(async move { api.fetch_history().await }));
    }

    pub fn send_pending(&self) -> bool {
        !self.send_tasks.is_empty()
    }

    fn any_call_pending(&self) -> bool {
        self.history_task.is_some()
            || !self.send_tasks.is_empty()
            || !self.text_tasks.is_empty()
            || !self.csv_tasks.is_empty()
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.any_call_pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Chat scrolling
    pub fn chat_scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn chat_scroll_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1);
    }

    /// Pin the chat pane to the most recent message.
    pub fn scroll_chat_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if the
        // pane has not been rendered yet
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in self.conversation.messages() {
            total_lines += 1; // Role line
            for line in msg.content.lines() {
                // Character count, not byte length, for UTF-8 text
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1;
                } else {
                    total_lines += ((char_count / wrap_width) + 1) as u16;
                }
            }
            total_lines += 1; // Blank line after message
        }

        if self.send_pending() {
            total_lines += 2; // Role line plus working indicator
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        if total_lines > visible_height {
            self.chat_scroll = total_lines.saturating_sub(visible_height);
        } else {
            self.chat_scroll = 0;
        }
    }
}
