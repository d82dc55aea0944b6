use anyhow::{Context, Result};
use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};
use std::time::Instant;

use crate::app::{App, AppMode};
use crate::upload::UploadPhase;

// --- Helpers ---

/// Convert a char index to a byte offset within the string.
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
  s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

// --- Event Handling ---

pub async fn handle_key_event(app: &mut App, key: event::KeyEvent) -> Result<()> {
  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
    app.should_quit = true;
    return Ok(());
  }

  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('t') {
    app.next_theme();
    return Ok(());
  }

  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('s') {
    if app.player.is_playing() {
      app.player.stop().await.context("Failed to stop playback")?;
    }
    return Ok(());
  }

  // The upload overlay captures everything else while open.
  if app.mode == AppMode::Upload {
    handle_upload_key(app, key);
    return Ok(());
  }

  // Discrete searcher toggles: re-commit immediately, no debounce delay.
  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('g') {
    app.toggle_strict();
    return Ok(());
  }
  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('b') {
    app.toggle_backend();
    return Ok(());
  }
  if key.code == KeyCode::Tab {
    app.toggle_media_type();
    return Ok(());
  }
  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('u') {
    app.open_upload();
    return Ok(());
  }

  match app.mode {
    AppMode::Input => handle_input_key(app, key),
    AppMode::Results => handle_results_key(app, key).await.context("Failed to handle results key event")?,
    AppMode::Upload => unreachable!("handled above"),
  }
  Ok(())
}

fn handle_input_key(app: &mut App, key: event::KeyEvent) {
  app.clear_error();
  let now = Instant::now();
  match key.code {
    KeyCode::Enter => {
      app.commit_now();
    }
    KeyCode::Char(c) => {
      let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
      app.input.insert(byte_idx, c);
      app.cursor_position += 1;
      app.on_input_edited(now);
    }
    KeyCode::Backspace => {
      if app.cursor_position > 0 {
        app.cursor_position -= 1;
        let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
        app.input.remove(byte_idx);
        app.on_input_edited(now);
      }
    }
    KeyCode::Delete => {
      if app.cursor_position < app.input.chars().count() {
        let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
        app.input.remove(byte_idx);
        app.on_input_edited(now);
      }
    }
    KeyCode::Left => {
      app.cursor_position = app.cursor_position.saturating_sub(1);
    }
    KeyCode::Right => {
      if app.cursor_position < app.input.chars().count() {
        app.cursor_position += 1;
      }
    }
    KeyCode::Home => {
      app.cursor_position = 0;
    }
    KeyCode::End => {
      app.cursor_position = app.input.chars().count();
    }
    KeyCode::Esc => {
      if !app.input.is_empty() {
        app.input.clear();
        app.cursor_position = 0;
        app.input_scroll = 0;
        app.on_input_edited(now);
      } else if !app.results.is_empty() {
        app.mode = AppMode::Results;
      } else {
        app.should_quit = true;
      }
    }
    KeyCode::Down => {
      if !app.results.is_empty() {
        app.mode = AppMode::Results;
      }
    }
    _ => {}
  }
}

async fn handle_results_key(app: &mut App, key: event::KeyEvent) -> Result<()> {
  match key.code {
    KeyCode::Enter => {
      app.play_selected().await;
    }
    KeyCode::Down | KeyCode::Char('j') => {
      let count = app.results.len();
      if count > 0 {
        let i = app.list_state.selected().map_or(0, |i| (i + 1) % count);
        app.list_state.select(Some(i));
      }
    }
    KeyCode::Up | KeyCode::Char('k') => {
      let count = app.results.len();
      if count > 0 {
        let i = app.list_state.selected().map_or(0, |i| if i == 0 { count - 1 } else { i - 1 });
        app.list_state.select(Some(i));
      }
    }
    KeyCode::Esc => {
      app.mode = AppMode::Input;
    }
    _ => {}
  }
  Ok(())
}

fn handle_upload_key(app: &mut App, key: event::KeyEvent) {
  // An in-flight upload ignores input until it settles.
  if app.upload.is_uploading() {
    return;
  }

  // A failure blocks the overlay until acknowledged.
  if matches!(app.upload.phase(), UploadPhase::Error(_)) {
    if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
      app.upload.acknowledge_error();
    }
    return;
  }

  match key.code {
    KeyCode::Enter => {
      app.trigger_upload();
    }
    KeyCode::Char(c) => {
      let byte_idx = char_to_byte_index(&app.upload.path, app.upload.cursor);
      app.upload.path.insert(byte_idx, c);
      app.upload.cursor += 1;
    }
    KeyCode::Backspace => {
      if app.upload.cursor > 0 {
        app.upload.cursor -= 1;
        let byte_idx = char_to_byte_index(&app.upload.path, app.upload.cursor);
        app.upload.path.remove(byte_idx);
      }
    }
    KeyCode::Delete => {
      if app.upload.cursor < app.upload.path.chars().count() {
        let byte_idx = char_to_byte_index(&app.upload.path, app.upload.cursor);
        app.upload.path.remove(byte_idx);
      }
    }
    KeyCode::Left => {
      app.upload.cursor = app.upload.cursor.saturating_sub(1);
    }
    KeyCode::Right => {
      if app.upload.cursor < app.upload.path.chars().count() {
        app.upload.cursor += 1;
      }
    }
    KeyCode::Home => {
      app.upload.cursor = 0;
    }
    KeyCode::End => {
      app.upload.cursor = app.upload.path.chars().count();
    }
    KeyCode::Esc => {
      app.upload.dismiss();
      app.mode = AppMode::Input;
    }
    _ => {}
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  // --- char_to_byte_index ---

  #[test]
  fn char_to_byte_ascii() {
    assert_eq!(char_to_byte_index("hello", 0), 0);
    assert_eq!(char_to_byte_index("hello", 3), 3);
    assert_eq!(char_to_byte_index("hello", 5), 5); // past end
  }

  #[test]
  fn char_to_byte_multibyte() {
    let s = "aé日"; // a=1 byte, é=2 bytes, 日=3 bytes
    assert_eq!(char_to_byte_index(s, 0), 0); // 'a'
    assert_eq!(char_to_byte_index(s, 1), 1); // 'é' starts at byte 1
    assert_eq!(char_to_byte_index(s, 2), 3); // '日' starts at byte 3
    assert_eq!(char_to_byte_index(s, 3), 6); // past end
  }

  #[test]
  fn char_to_byte_empty() {
    assert_eq!(char_to_byte_index("", 0), 0);
    assert_eq!(char_to_byte_index("", 5), 0);
  }
}
