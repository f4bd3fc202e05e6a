use std::path::{Path, PathBuf};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::task::JoinHandle;

use crate::api::{ApiResponse, BatchOutcome, ARTIFACT_FILENAME, SEND_FALLBACK, TEXT_FALLBACK};
use crate::app::{App, InputMode, Panel, Screen, SentimentField};
use crate::decode::{error_from, history_from, sentiment_from, Decoded};
use crate::tui::AppEvent;

/// Prompt shown when the text field is submitted empty.
pub const TEXT_PROMPT: &str = "Introduce un texto para analizar.";
/// Prompt shown when no CSV path was given.
pub const CSV_PROMPT: &str = "Selecciona un archivo CSV.";

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Ctrl-C quits from anywhere
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // A raised alert swallows every key until dismissed
    if app.alert.is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
            app.alert = None;
        }
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match app.screen {
        Screen::Chat => handle_chat_normal(app, key),
        Screen::Sentiment => handle_sentiment_normal(app, key),
    }
}

fn handle_chat_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('i') | KeyCode::Enter => app.input_mode = InputMode::Editing,
        KeyCode::Char('r') => reset_conversation(app),
        KeyCode::Char('j') | KeyCode::Down => app.chat_scroll_down(),
        KeyCode::Char('k') | KeyCode::Up => app.chat_scroll_up(),
        KeyCode::Char('G') => app.scroll_chat_to_bottom(),
        KeyCode::Char('s') => app.screen = Screen::Sentiment,
        _ => {}
    }
}

fn handle_sentiment_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Esc => app.screen = Screen::Chat,
        KeyCode::Tab => {
            app.sentiment_field = match app.sentiment_field {
                SentimentField::Text => SentimentField::File,
                SentimentField::File => SentimentField::Text,
            };
        }
        KeyCode::Char('i') => app.input_mode = InputMode::Editing,
        KeyCode::Enter => run_analysis(app),
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Esc {
        app.input_mode = InputMode::Normal;
        return;
    }

    match app.screen {
        Screen::Chat => {
            if key.code == KeyCode::Enter {
                submit_message(app);
            } else {
                edit_input(&mut app.chat_input, &mut app.chat_cursor, key.code);
            }
        }
        Screen::Sentiment => {
            if key.code == KeyCode::Enter {
                run_analysis(app);
            } else {
                match app.sentiment_field {
                    SentimentField::Text => {
                        edit_input(&mut app.text_input, &mut app.text_cursor, key.code)
                    }
                    SentimentField::File => {
                        edit_input(&mut app.file_input, &mut app.file_cursor, key.code)
                    }
                }
            }
        }
    }
}

/// Cursor-aware editing shared by the three input boxes.
fn edit_input(input: &mut String, cursor: &mut usize, code: KeyCode) {
    match code {
        KeyCode::Backspace => {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(input, *cursor);
                input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if *cursor < input.chars().count() {
                let byte_pos = char_to_byte_index(input, *cursor);
                input.remove(byte_pos);
            }
        }
        KeyCode::Left => *cursor = cursor.saturating_sub(1),
        KeyCode::Right => *cursor = (*cursor + 1).min(input.chars().count()),
        KeyCode::Home => *cursor = 0,
        KeyCode::End => *cursor = input.chars().count(),
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(input, *cursor);
            input.insert(byte_pos, c);
            *cursor += 1;
        }
        _ => {}
    }
}

fn submit_message(app: &mut App) {
    let message = app.chat_input.trim().to_string();
    // Whitespace-only input never reaches the network
    if message.is_empty() {
        return;
    }

    // The input clears before the call resolves, whatever the outcome. The
    // message itself is not added to the conversation until the server
    // returns it as part of the history.
    app.chat_input.clear();
    app.chat_cursor = 0;
    app.input_mode = InputMode::Normal;

    let api = app.api.clone();
    app.send_tasks
        .push(tokio::spawn(async move { api.send_message(&message).await }));
    app.scroll_chat_to_bottom();
}

fn reset_conversation(app: &mut App) {
    // The view clears now; the call's outcome is never inspected
    app.conversation.clear();
    app.history_error = None;
    app.chat_scroll = 0;

    let api = app.api.clone();
    tokio::spawn(async move { api.reset_chat().await });
}

fn run_analysis(app: &mut App) {
    match app.sentiment_field {
        SentimentField::Text => analyze_text(app),
        SentimentField::File => analyze_csv(app),
    }
}

fn analyze_text(app: &mut App) {
    let text = app.text_input.trim().to_string();
    if text.is_empty() {
        app.text_panel = Panel::Notice(TEXT_PROMPT.to_string());
        return;
    }

    app.text_panel = Panel::Working;
    app.input_mode = InputMode::Normal;

    let api = app.api.clone();
    app.text_tasks
        .push(tokio::spawn(async move { api.analyze_text(&text).await }));
}

fn analyze_csv(app: &mut App) {
    let path = app.file_input.trim().to_string();
    if path.is_empty() {
        app.csv_panel = Panel::Notice(CSV_PROMPT.to_string());
        return;
    }

    app.csv_panel = Panel::Working;
    app.input_mode = InputMode::Normal;

    let api = app.api.clone();
    app.csv_tasks.push(tokio::spawn(async move {
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => return BatchOutcome::Failed(format!("No se pudo leer el archivo: {}", e)),
        };
        let filename = Path::new(&path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "datos.csv".to_string());
        api.analyze_csv(&filename, bytes).await
    }));
}

/// Apply every finished network task to the app state. Tasks are drained as
/// they complete, so overlapping calls resolve last-write-wins.
pub async fn poll_tasks(app: &mut App) {
    if let Some(task) = app.history_task.take() {
        if task.is_finished() {
            if let Ok(response) = task.await {
                apply_history_response(app, response);
            }
        } else {
            app.history_task = Some(task);
        }
    }

    for task in drain_finished(&mut app.send_tasks) {
        if let Ok(response) = task.await {
            apply_send_response(app, response);
        }
    }

    for task in drain_finished(&mut app.text_tasks) {
        if let Ok(response) = task.await {
            apply_text_response(app, response);
        }
    }

    for task in drain_finished(&mut app.csv_tasks) {
        if let Ok(outcome) = task.await {
            apply_csv_outcome(app, outcome);
        }
    }
}

fn drain_finished<T>(tasks: &mut Vec<JoinHandle<T>>) -> Vec<JoinHandle<T>> {
    let mut finished = Vec::new();
    let mut i = 0;
    while i < tasks.len() {
        if tasks[i].is_finished() {
            finished.push(tasks.remove(i));
        } else {
            i += 1;
        }
    }
    finished
}

fn apply_history_response(app: &mut App, response: ApiResponse) {
    // Bootstrap only looks at the decode tag; a decode failure replaces the
    // message list with the error text and leaves the store empty
    match response.decoded {
        Decoded::Ok(value) => {
            app.conversation.replace_all(history_from(&value));
            app.scroll_chat_to_bottom();
        }
        Decoded::Err(message) => app.history_error = Some(message),
    }
}

fn apply_send_response(app: &mut App, response: ApiResponse) {
    let status = response.status;
    match (response.ok, response.decoded) {
        (true, Decoded::Ok(value)) => {
            app.history_error = None;
            app.conversation.replace_all(history_from(&value));
            app.scroll_chat_to_bottom();
        }
        (false, Decoded::Ok(value)) => {
            tracing::warn!("Chat send rejected (HTTP {})", status);
            app.alert = Some(error_from(&value, SEND_FALLBACK));
        }
        (_, Decoded::Err(message)) => {
            tracing::warn!("Chat send undecodable (HTTP {}): {}", status, message);
            app.alert = Some(message);
        }
    }
}

fn apply_text_response(app: &mut App, response: ApiResponse) {
    app.text_panel = match (response.ok, response.decoded) {
        (true, Decoded::Ok(value)) => Panel::Result(sentiment_from(&value)),
        (false, Decoded::Ok(value)) => Panel::Notice(error_from(&value, TEXT_FALLBACK)),
        (_, Decoded::Err(message)) => Panel::Notice(message),
    };
}

fn apply_csv_outcome(app: &mut App, outcome: BatchOutcome) {
    app.csv_panel = match outcome {
        BatchOutcome::Artifact(bytes) => match save_artifact(&app.download_dir, &bytes) {
            Ok(path) => Panel::Notice(format!(
                "Análisis completado. Resultados guardados en {}.",
                path.display()
            )),
            Err(e) => Panel::Notice(format!("No se pudo guardar el resultado: {}", e)),
        },
        BatchOutcome::Failed(message) => Panel::Notice(message),
    };
}

/// Write the opaque artifact under its fixed filename. The bytes are never
/// inspected.
fn save_artifact(dir: &Path, bytes: &[u8]) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(ARTIFACT_FILENAME);
    std::fs::write(&path, bytes)?;
    Ok(path)
}
