mod app;
mod cache;
mod config;
mod constants;
mod debounce;
mod dispatch;
mod display;
mod graphics;
mod input;
mod loader;
mod player;
mod query;
mod search;
mod theme;
mod ui;
mod upload;

use anyhow::{Context, Result};
use clap::Parser;
use directories::ProjectDirs;
use ratatui::{
  DefaultTerminal,
  crossterm::event::{self, Event, KeyEventKind},
};
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

use app::App;
use config::Config;
use display::{CliDisplayMode, DisplayMode};
use graphics::{kitty_delete_all, kitty_render_image};
use input::handle_key_event;

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  /// Display mode for media previews: 'auto', 'kitty', 'direct', or 'ascii'
  #[arg(short, long, default_value = "auto")]
  display_mode: CliDisplayMode,

  /// Override the primary search backend address
  #[arg(long)]
  primary_backend: Option<String>,

  /// Override the secondary search backend address
  #[arg(long)]
  secondary_backend: Option<String>,

  /// Override the media-serving backend address
  #[arg(long)]
  media_backend: Option<String>,
}

/// Send tracing output to a rolling file — stdout belongs to the TUI.
/// The returned guard must stay alive for the process lifetime.
fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
  let proj_dirs = ProjectDirs::from("", "", "mq")?;
  let log_dir = proj_dirs.data_local_dir().join("logs");
  std::fs::create_dir_all(&log_dir).ok()?;

  let appender = tracing_appender::rolling::daily(log_dir, "mq.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).with_ansi(false).init();
  Some(guard)
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();
  let _log_guard = init_logging();

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    ratatui::restore();
    default_hook(info);
  }));

  let mut terminal = ratatui::init();
  let result = run(&mut terminal, args).await;
  ratatui::restore();
  result
}

async fn run(terminal: &mut DefaultTerminal, args: Args) -> Result<()> {
  let display_mode = display::resolve_display_mode(args.display_mode);

  let mut config = Config::load();
  if args.primary_backend.is_some() {
    config.primary_backend = args.primary_backend;
  }
  if args.secondary_backend.is_some() {
    config.secondary_backend = args.secondary_backend;
  }
  if args.media_backend.is_some() {
    config.media_backend = args.media_backend;
  }

  info!(
    primary = config.primary_backend(),
    secondary = config.secondary_backend(),
    media = config.media_backend(),
    mode = display_mode.label(),
    "starting"
  );

  let mut app = App::new(display_mode, config);
  // Populate the grid immediately, like the source UI does on mount.
  app.commit_now();

  loop {
    app.tick(Instant::now());
    app.check_pending();

    terminal.draw(|frame| ui::ui(frame, &mut app))?;

    // Feed the viewport loaders whatever the draw put on screen.
    if let Some((offset, rows)) = app.visible_window {
      app.mark_visible(offset, rows);
    }

    if display_mode == DisplayMode::Kitty {
      render_kitty_preview(&mut app)?;
    }

    if event::poll(Duration::from_millis(50))? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
          handle_key_event(&mut app, key).await?;
        }
        _ => {}
      }
    }

    if app.should_quit {
      break;
    }
  }

  if display_mode == DisplayMode::Kitty {
    kitty_delete_all()?;
  }
  app.player.stop().await?;
  Ok(())
}

/// Kitty graphics bypass the ratatui buffer, so the preview is emitted after
/// draw and only re-sent when the image or its area changes.
fn render_kitty_preview(app: &mut App) -> Result<()> {
  if let Some(area) = app.gfx.preview_area {
    let selected = app.selected_item().map(|item| item.filename.clone());
    if let Some(filename) = selected
      && let Some(image) = app.previews.get(&filename)
    {
      let key = (filename.clone(), area);
      if app.gfx.last_sent.as_ref() != Some(&key) {
        kitty_delete_all()?;
        kitty_render_image(image, area).context("Failed to render preview via kitty protocol")?;
        app.gfx.last_sent = Some(key);
      }
    }
  } else if app.gfx.last_sent.is_some() {
    kitty_delete_all()?;
    app.gfx.last_sent = None;
  }
  Ok(())
}
