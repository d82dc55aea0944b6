use image::imageops::FilterType;
use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Layout, Rect},
  style::{Modifier, Style, Stylize},
  text::{Line, Span},
  widgets::{Block, Clear, List, ListItem, Padding, Paragraph},
};

use crate::app::{App, AppMode};
use crate::cache::playback_url;
use crate::display::DisplayMode;
use crate::graphics::PreviewWidget;
use crate::search::MediaType;
use crate::theme::Theme;
use crate::upload::UploadPhase;

// --- Helpers ---

/// Compute the display width of the first `n` chars (accounting for double-width CJK).
pub fn display_width(s: &str, n: usize) -> usize {
  use unicode_width::UnicodeWidthChar;
  s.chars().take(n).map(|c| c.width().unwrap_or(0)).sum()
}

/// Truncate a string to `max_width` characters, appending "…" if truncated.
fn truncate_str(s: &str, max_width: usize) -> String {
  if s.chars().count() <= max_width {
    s.to_string()
  } else {
    let truncated: String = s.chars().take(max_width.saturating_sub(1)).collect();
    format!("{}…", truncated)
  }
}

// --- UI Rendering ---

pub fn ui(frame: &mut Frame, app: &mut App) {
  let theme = app.theme();
  app.gfx.preview_area = None;
  app.visible_window = None;

  frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), frame.area());

  let [header_area, main_area, status_area, input_area, footer_area] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Min(3),
    Constraint::Length(1),
    Constraint::Length(3),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  render_header(frame, app, header_area);
  render_main(frame, app, main_area);
  render_status(frame, app, status_area);
  render_input(frame, app, input_area);
  render_footer(frame, app, footer_area);

  if app.upload.open {
    let full = frame.area();
    render_upload_overlay(frame, app, full);
  }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let left = Line::from(Span::styled(" ⌕ mq ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)));
  frame.render_widget(left, area);

  let strict = if app.strict_mode { "strict" } else { "any" };
  let right = format!("{} · {} · {} · v{} ", app.backend.label(), app.media_type.label(), strict, env!("CARGO_PKG_VERSION"));
  let right_line = Line::from(Span::styled(&right, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(right.len() as u16), width: right.len() as u16, ..area };
  frame.render_widget(right_line, right_area);
}

fn render_main(frame: &mut Frame, app: &mut App, area: Rect) {
  if app.results.is_empty() {
    render_welcome(frame, app.theme(), area);
    return;
  }
  let [list_area, preview_area] =
    Layout::horizontal([Constraint::Percentage(58), Constraint::Percentage(42)]).areas(area);
  render_results(frame, app, list_area);
  render_preview(frame, app, preview_area);
}

fn render_welcome(frame: &mut Frame, theme: &Theme, area: Rect) {
  let text = vec![
    Line::from(""),
    Line::from(Span::styled("⌕  Welcome to mq", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))),
    Line::from(""),
    Line::from(Span::styled("Search your media corpus. In the terminal.", Style::default().fg(theme.fg))),
    Line::from(""),
    Line::from(Span::styled("Type below — results update as you pause.", Style::default().fg(theme.muted))),
    Line::from(Span::styled("Ctrl+U seeds the search from an image.", Style::default().fg(theme.muted))),
  ];
  let paragraph = Paragraph::new(text).alignment(Alignment::Center).block(
    Block::bordered()
      .border_type(ratatui::widgets::BorderType::Rounded)
      .border_style(Style::default().fg(theme.border)),
  );
  frame.render_widget(paragraph, area);
}

fn render_results(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();

  // Inner width: area minus 2 borders minus 2 chars for highlight symbol ("▶ ")
  let inner_w = area.width.saturating_sub(4) as usize;

  let items: Vec<ListItem> = app
    .results
    .iter()
    .enumerate()
    .map(|(i, item)| {
      let is_selected = Some(i) == app.list_state.selected();
      let fg = if is_selected { theme.highlight_fg } else { theme.fg };
      let bg = if is_selected {
        theme.highlight_bg
      } else if i % 2 == 1 {
        theme.stripe_bg
      } else {
        theme.bg
      };

      let right = match item.media_type {
        MediaType::Video => format!("video @{:.0}s", item.timestamp),
        MediaType::Image => "image".to_string(),
      };
      let right_w = right.chars().count();
      let caption_max = inner_w.saturating_sub(right_w + 2);
      let caption = truncate_str(&item.caption, caption_max);
      let gap = inner_w.saturating_sub(caption.chars().count() + right_w);

      let spans = vec![
        Span::styled(caption, Style::default().fg(fg)),
        Span::raw(" ".repeat(gap)),
        Span::styled(right, Style::default().fg(theme.muted)),
      ];
      ListItem::new(Line::from(spans)).bg(bg)
    })
    .collect();

  let title = format!(" Results — {} ", app.results.len());
  let list = List::new(items)
    .block(
      Block::bordered()
        .title(title)
        .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
        .border_type(ratatui::widgets::BorderType::Rounded)
        .border_style(Style::default().fg(theme.border)),
    )
    .highlight_symbol("▶ ")
    .highlight_style(Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD));

  frame.render_stateful_widget(list, area, &mut app.list_state);

  // Record what's on screen so the run loop can feed the viewport loaders.
  let rows = area.height.saturating_sub(2) as usize;
  app.visible_window = Some((app.list_state.offset(), rows));
}

fn render_preview(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let block = Block::bordered()
    .title(" Preview ")
    .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
    .border_type(ratatui::widgets::BorderType::Rounded)
    .border_style(Style::default().fg(theme.border))
    .padding(Padding::horizontal(1));
  let inner = block.inner(area);
  frame.render_widget(block, area);

  let Some(selected) = app.list_state.selected() else { return };
  let active = app.loaders.is_active(selected);
  let Some(item) = app.results.get(selected).cloned() else { return };

  if !active {
    // Still pending: lightweight placeholder, no media request yet.
    frame.render_widget(
      Paragraph::new("Loading…").alignment(Alignment::Center).style(Style::default().fg(theme.muted)),
      inner,
    );
    return;
  }

  match item.media_type {
    MediaType::Image => render_image_preview(frame, app, &item.filename, &item.caption, inner),
    MediaType::Video => {
      let url = app.cache.resolve(item.media_type, &item.filename);
      let at = playback_url(&url, item.timestamp);
      let inner_w = inner.width.saturating_sub(1) as usize;
      let lines = vec![
        Line::from(""),
        Line::from(Span::styled(truncate_str(&item.caption, inner_w), Style::default().fg(theme.fg).add_modifier(Modifier::BOLD))),
        Line::from(""),
        Line::from(vec![
          Span::styled("File      ", Style::default().fg(theme.muted)),
          Span::styled(truncate_str(&item.filename, inner_w.saturating_sub(10)), Style::default().fg(theme.fg)),
        ]),
        Line::from(vec![
          Span::styled("Moment    ", Style::default().fg(theme.muted)),
          Span::styled(format!("{:.1}s", item.timestamp), Style::default().fg(theme.fg)),
        ]),
        Line::from(""),
        Line::from(Span::styled(truncate_str(&at, inner_w), Style::default().fg(theme.accent).add_modifier(Modifier::UNDERLINED))),
        Line::from(""),
        Line::from(Span::styled("Enter plays in mpv at the matched moment.", Style::default().fg(theme.muted))),
      ];
      frame.render_widget(Paragraph::new(lines), inner);
    }
  }
}

fn render_image_preview(frame: &mut Frame, app: &mut App, filename: &str, caption: &str, area: Rect) {
  let theme = app.theme();
  let [image_area, caption_area] = Layout::vertical([Constraint::Min(1), Constraint::Length(2)]).areas(area);

  let Some(image) = app.previews.get(filename) else {
    frame.render_widget(
      Paragraph::new("Loading…").alignment(Alignment::Center).style(Style::default().fg(theme.muted)),
      image_area,
    );
    return;
  };

  let needs_resize = match &app.gfx.resized_preview {
    Some((name, w, h, _)) => name != filename || *w != image_area.width || *h != image_area.height,
    None => true,
  };
  if needs_resize {
    let target_w = image_area.width as u32;
    let target_h = match app.display_mode {
      // Half-blocks pack two pixels per cell row.
      DisplayMode::Direct => (image_area.height as u32) * 2,
      _ => image_area.height as u32,
    };
    let resized = image.resize(target_w.max(1), target_h.max(1), FilterType::Lanczos3);
    app.gfx.resized_preview = Some((filename.to_string(), image_area.width, image_area.height, resized));
  }

  if let Some((_, _, _, ref resized)) = app.gfx.resized_preview {
    let widget = PreviewWidget { image: resized, display_mode: app.display_mode };
    frame.render_widget(widget, image_area);
  }
  if app.display_mode == DisplayMode::Kitty {
    app.gfx.preview_area = Some(image_area);
  }

  frame.render_widget(
    Paragraph::new(truncate_str(caption, caption_area.width as usize))
      .alignment(Alignment::Center)
      .style(Style::default().fg(theme.fg)),
    caption_area,
  );
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let (text, style) = if let Some(msg) = &app.status_message {
    (format!(" ⏳ {}", msg), Style::default().fg(theme.status))
  } else if let Some(err) = &app.last_error {
    (format!(" ⚠  {}", err), Style::default().fg(theme.error))
  } else if app.upload.is_uploading() {
    (" ⏳ Captioning image…".to_string(), Style::default().fg(theme.status))
  } else if app.debounce.pending() {
    (" ✎ …".to_string(), Style::default().fg(theme.muted))
  } else if app.player.is_playing() {
    match (app.player.last_status(), &app.player.current_caption) {
      (Some(status), _) => (format!(" ▶ {}", status), Style::default().fg(theme.status)),
      (None, Some(caption)) => (format!(" ▶ {}", caption), Style::default().fg(theme.status)),
      (None, None) => (" ▶ Playing".to_string(), Style::default().fg(theme.status)),
    }
  } else {
    (" Ready".to_string(), Style::default().fg(theme.muted))
  };
  frame.render_widget(Paragraph::new(text).style(style), area);
}

fn render_input(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let border_color = if app.mode == AppMode::Input { theme.accent } else { theme.border };
  let input_block = Block::bordered()
    .title(format!(" Search {} ", app.media_type.label()))
    .title_style(Style::default().fg(border_color))
    .border_type(ratatui::widgets::BorderType::Rounded)
    .border_style(Style::default().fg(border_color))
    .padding(Padding::horizontal(1));

  let inner_w = area.width.saturating_sub(4) as usize;
  let cursor_col = display_width(&app.input, app.cursor_position);

  if cursor_col < app.input_scroll {
    app.input_scroll = cursor_col;
  } else if cursor_col >= app.input_scroll + inner_w {
    app.input_scroll = cursor_col.saturating_sub(inner_w) + 1;
  }

  let visible: String = app
    .input
    .chars()
    .scan(0usize, |col, c| {
      let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
      let start = *col;
      *col += w;
      Some((start, *col, c))
    })
    .skip_while(|(_, end, _)| *end <= app.input_scroll)
    .take_while(|(start, _, _)| *start < app.input_scroll + inner_w)
    .map(|(_, _, c)| c)
    .collect();

  let paragraph = Paragraph::new(visible).style(Style::default().fg(theme.fg)).block(input_block);
  frame.render_widget(paragraph, area);

  if app.mode == AppMode::Input {
    let cursor_x = area.x + 2 + (cursor_col - app.input_scroll) as u16;
    frame.set_cursor_position((cursor_x, area.y + 1));
  }
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let has_results = !app.results.is_empty();
  let keys: Vec<(&str, &str)> = match app.mode {
    AppMode::Input => {
      let mut k = vec![("Enter", "Search now"), ("Tab", "Type"), ("^g", "Strict"), ("^b", "Backend"), ("^u", "Upload")];
      if has_results {
        k.push(("↓", "Results"));
      }
      k.push(("Esc", if app.input.is_empty() { "Quit" } else { "Clear" }));
      k
    }
    AppMode::Results => {
      let mut k = vec![("Enter", "Play"), ("j/k", "Navigate"), ("Tab", "Type"), ("^b", "Backend")];
      if app.player.is_playing() {
        k.push(("^s", "Stop"));
      }
      k.push(("Esc", "Back"));
      k
    }
    AppMode::Upload => vec![("Enter", "Upload"), ("Esc", "Close")],
  };

  let spans: Vec<Span> = keys
    .iter()
    .enumerate()
    .flat_map(|(i, (key, action))| {
      let mut s = vec![
        Span::styled(format!(" {} ", key), Style::default().fg(theme.key_fg).bg(theme.key_bg)),
        Span::styled(format!(" {} ", action), Style::default().fg(theme.muted)),
      ];
      if i < keys.len() - 1 {
        s.push(Span::raw("  "));
      }
      s
    })
    .collect();

  frame.render_widget(Line::from(spans), area);

  let theme_label = format!("{} ", theme.name);
  let right = Line::from(Span::styled(&theme_label, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(theme_label.len() as u16), width: theme_label.len() as u16, ..area };
  frame.render_widget(right, right_area);
}

// --- Upload overlay ---

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
  let x = area.x + area.width.saturating_sub(width) / 2;
  let y = area.y + area.height.saturating_sub(height) / 2;
  Rect { x, y, width: width.min(area.width), height: height.min(area.height) }
}

fn render_upload_overlay(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let overlay = centered_rect(area.width.saturating_sub(10).min(70), 9, area);
  frame.render_widget(Clear, overlay);

  let (title, border) = match app.upload.phase() {
    UploadPhase::Error(_) => (" Upload failed ", theme.error),
    UploadPhase::Uploading => (" Uploading… ", theme.status),
    UploadPhase::Idle => (" Image search ", theme.accent),
  };
  let block = Block::bordered()
    .title(title)
    .title_style(Style::default().fg(border).add_modifier(Modifier::BOLD))
    .border_type(ratatui::widgets::BorderType::Rounded)
    .border_style(Style::default().fg(border))
    .padding(Padding::horizontal(1))
    .style(Style::default().bg(theme.bg));
  let inner = block.inner(overlay);
  frame.render_widget(block, overlay);

  let inner_w = inner.width as usize;
  let lines = match app.upload.phase() {
    UploadPhase::Uploading => vec![
      Line::from(""),
      Line::from(Span::styled("Processing…", Style::default().fg(theme.status).add_modifier(Modifier::BOLD))),
      Line::from(""),
      Line::from(Span::styled("The captioning model is describing your image.", Style::default().fg(theme.muted))),
    ],
    UploadPhase::Error(msg) => vec![
      Line::from(""),
      Line::from(Span::styled(truncate_str(msg, inner_w), Style::default().fg(theme.error))),
      Line::from(""),
      Line::from(Span::styled("Press Enter or Esc to try again.", Style::default().fg(theme.muted))),
    ],
    UploadPhase::Idle => {
      let shown = truncate_str(&app.upload.path, inner_w.saturating_sub(2));
      vec![
        Line::from(Span::styled("Path to an image file:", Style::default().fg(theme.fg))),
        Line::from(""),
        Line::from(Span::styled(format!("> {}", shown), Style::default().fg(theme.accent))),
        Line::from(""),
        Line::from(Span::styled("Its caption becomes the search query.", Style::default().fg(theme.muted))),
      ]
    }
  };
  frame.render_widget(Paragraph::new(lines), inner);

  if app.mode == AppMode::Upload && *app.upload.phase() == UploadPhase::Idle {
    let cursor_col = display_width(&app.upload.path, app.upload.cursor);
    let cursor_x = inner.x + 2 + cursor_col.min(inner_w.saturating_sub(3)) as u16;
    frame.set_cursor_position((cursor_x, inner.y + 2));
  }
}
