use image::DynamicImage;
use ratatui::{layout::Rect, widgets::ListState};
use reqwest::Client;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cache::MediaCache;
use crate::config::{Backend, Config};
use crate::constants::constants;
use crate::debounce::DebouncedInput;
use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::display::DisplayMode;
use crate::loader::LoaderSet;
use crate::player::VideoPlayer;
use crate::search::{self, MediaItem, MediaType};
use crate::theme::THEMES;
use crate::upload::UploadPipeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
  Input,
  Results,
  Upload,
}

/// Terminal graphics rendering state for the preview pane (Kitty protocol
/// draws outside the ratatui buffer, so the run loop needs the area and what
/// was last sent).
#[derive(Default)]
pub struct GraphicsCache {
  pub preview_area: Option<Rect>,
  pub last_sent: Option<(String, Rect)>,
  pub resized_preview: Option<(String, u16, u16, DynamicImage)>,
}

pub struct App {
  // --- Search state ---
  pub input: String,
  pub cursor_position: usize,
  pub input_scroll: usize,
  pub strict_mode: bool,
  pub media_type: MediaType,
  pub backend: Backend,
  pub debounce: DebouncedInput,
  pub dispatcher: Dispatcher,

  // --- Results & media ---
  pub results: Vec<MediaItem>,
  pub list_state: ListState,
  pub loaders: LoaderSet,
  pub cache: MediaCache,
  /// Decoded preview images keyed by filename. Grows like the URL cache;
  /// accepted for the session lifetime.
  pub previews: HashMap<String, DynamicImage>,
  preview_tx: mpsc::Sender<(String, DynamicImage)>,
  preview_rx: mpsc::Receiver<(String, DynamicImage)>,

  // --- Collaborators ---
  pub upload: UploadPipeline,
  pub player: VideoPlayer,
  pub client: Client,
  pub config: Config,

  // --- View state ---
  pub mode: AppMode,
  pub theme_index: usize,
  pub display_mode: DisplayMode,
  pub status_message: Option<String>,
  pub last_error: Option<String>,
  pub should_quit: bool,
  pub gfx: GraphicsCache,
  /// Visible window of the results list, recorded during render so the run
  /// loop can feed the viewport loaders after each draw.
  pub visible_window: Option<(usize, usize)>,
  /// When the last error was set — used for auto-dismiss.
  error_time: Option<Instant>,
}

impl App {
  pub fn new(display_mode: DisplayMode, config: Config) -> Self {
    let theme_index =
      if let Some(ref name) = config.theme_name { THEMES.iter().position(|t| t.name == name).unwrap_or(0) } else { 0 };
    let strict_mode = config.strict_mode.unwrap_or(false);
    let cache = MediaCache::new(config.media_backend().to_string());
    let (preview_tx, preview_rx) = mpsc::channel(32);

    Self {
      input: String::new(),
      cursor_position: 0,
      input_scroll: 0,
      strict_mode,
      media_type: MediaType::Image,
      backend: Backend::Primary,
      debounce: DebouncedInput::new(Duration::from_millis(constants().debounce_ms)),
      dispatcher: Dispatcher::new(),
      results: Vec::new(),
      list_state: ListState::default(),
      loaders: LoaderSet::default(),
      cache,
      previews: HashMap::new(),
      preview_tx,
      preview_rx,
      upload: UploadPipeline::new(),
      player: VideoPlayer::new(),
      client: Client::new(),
      config,
      mode: AppMode::Input,
      theme_index,
      display_mode,
      status_message: None,
      last_error: None,
      should_quit: false,
      gfx: GraphicsCache::default(),
      visible_window: None,
      error_time: None,
    }
  }

  pub fn theme(&self) -> &'static crate::theme::Theme {
    &THEMES[self.theme_index % THEMES.len()]
  }

  pub fn next_theme(&mut self) {
    self.theme_index = (self.theme_index + 1) % THEMES.len();
    self.save_config();
  }

  fn save_config(&self) {
    let config = Config {
      theme_name: Some(self.theme().name.to_string()),
      strict_mode: Some(self.strict_mode),
      ..self.config.clone()
    };
    config.save();
  }

  /// Set an error message with auto-dismiss tracking.
  pub fn set_error(&mut self, msg: String) {
    self.last_error = Some(msg);
    self.error_time = Some(Instant::now());
  }

  pub fn clear_error(&mut self) {
    self.last_error = None;
    self.error_time = None;
  }

  /// Clear stale error messages after the configured dismiss window.
  pub fn expire_error(&mut self) {
    if let Some(t) = self.error_time
      && t.elapsed() >= Duration::from_secs(constants().error_dismiss_secs)
    {
      self.last_error = None;
      self.error_time = None;
    }
  }

  // --- Committing & dispatching ---

  /// Record an input edit: the raw text echoes immediately, the commit waits
  /// for the quiet period.
  pub fn on_input_edited(&mut self, now: Instant) {
    self.debounce.on_keystroke(self.input.clone(), now);
  }

  /// Run-loop tick: fire a debounce commit if the quiet period elapsed, and
  /// age out stale errors.
  pub fn tick(&mut self, now: Instant) {
    if let Some(commit) = self.debounce.poll(now, self.strict_mode) {
      debug!(raw = self.debounce.raw(), term = %commit.term, "quiet period elapsed");
      self.dispatch_search(commit.term);
    }
    self.expire_error();
  }

  /// Commit the current raw text immediately (Enter, toggles, backend
  /// switch) and issue the query.
  pub fn commit_now(&mut self) {
    self.debounce.set_raw(self.input.clone());
    let commit = self.debounce.commit_now(self.strict_mode);
    self.dispatch_search(commit.term);
  }

  fn dispatch_search(&mut self, term: String) {
    let base = self.backend.base_url(&self.config).to_string();
    self.status_message = Some(format!("Searching '{}'…", term));
    self.dispatcher.dispatch(self.client.clone(), base, term, self.media_type);
  }

  // --- Discrete toggles (immediate re-commit, no debounce delay) ---

  pub fn toggle_strict(&mut self) {
    self.strict_mode = !self.strict_mode;
    info!(strict = self.strict_mode, "strict mode toggled");
    self.commit_now();
  }

  pub fn toggle_media_type(&mut self) {
    self.media_type = self.media_type.toggled();
    info!(kind = self.media_type.label(), "media type switched");
    self.commit_now();
  }

  pub fn toggle_backend(&mut self) {
    self.backend = self.backend.toggled();
    info!(backend = self.backend.label(), "backend switched");
    self.commit_now();
  }

  // --- Upload hand-off ---

  pub fn open_upload(&mut self) {
    self.upload.show();
    self.mode = AppMode::Upload;
  }

  pub fn trigger_upload(&mut self) {
    // Captioning is served by the primary backend address.
    let base = self.config.primary_backend().to_string();
    self.upload.trigger(self.client.clone(), base);
  }

  /// Apply a caption returned by the upload pipeline: it replaces the input
  /// text and commits immediately, bypassing the debounce timer.
  fn apply_caption(&mut self, caption: String) {
    self.input = caption;
    self.cursor_position = self.input.chars().count();
    self.input_scroll = 0;
    self.mode = AppMode::Input;
    self.commit_now();
  }

  // --- Async result polling ---

  /// Drain all pending async work: search responses (in sequence order),
  /// caption uploads, fetched previews, and player status.
  pub fn check_pending(&mut self) {
    match self.dispatcher.poll() {
      Some(DispatchOutcome::Results(items)) => {
        self.status_message = None;
        self.clear_error();
        info!(count = items.len(), "result set replaced");
        self.results = items;
        self.loaders.rebuild(self.results.len(), constants().visibility_threshold);
        if self.results.is_empty() {
          self.list_state.select(None);
        } else {
          self.list_state.select(Some(0));
        }
      }
      Some(DispatchOutcome::Failed(msg)) => {
        // Previous result set stays on screen; stale-but-valid beats blank.
        self.status_message = None;
        warn!(err = %msg, "search failed, keeping previous results");
        self.set_error(msg);
      }
      None => {
        if !self.dispatcher.busy() && self.status_message.as_deref().is_some_and(|m| m.starts_with("Searching")) {
          self.status_message = None;
        }
      }
    }

    if let Some(caption) = self.upload.poll() {
      self.apply_caption(caption);
    }

    while let Ok((filename, image)) = self.preview_rx.try_recv() {
      debug!(%filename, "preview loaded");
      self.previews.insert(filename, image);
    }

    self.player.check_status();
  }

  // --- Lazy media loading ---

  /// Feed the loaders the rows currently on screen. Newly activated items
  /// get their URL resolved through the cache (at most once per filename)
  /// and, for images, a background byte fetch for the preview pane.
  pub fn mark_visible(&mut self, offset: usize, rows: usize) {
    let activated = self.loaders.observe_range(offset, offset + rows);
    if activated.is_empty() {
      return;
    }

    let mut jobs = Vec::new();
    for index in activated {
      let Some(item) = self.results.get(index) else { continue };
      let url = self.cache.resolve(item.media_type, &item.filename);
      if item.media_type == MediaType::Image && !self.previews.contains_key(&item.filename) {
        jobs.push((item.filename.clone(), url));
      }
    }
    debug!(cached_urls = self.cache.len(), derivations = self.cache.derivations(), "viewport activation");
    if !jobs.is_empty() {
      self.spawn_preview_fetch(jobs);
    }
  }

  /// Fetch activated previews with bounded concurrency, reporting each as it
  /// lands. Results for superseded result sets are harmless: the map is
  /// keyed by filename and insertion is idempotent.
  fn spawn_preview_fetch(&self, jobs: Vec<(String, String)>) {
    use futures::stream::{self, StreamExt};

    let client = self.client.clone();
    let tx = self.preview_tx.clone();
    tokio::spawn(async move {
      stream::iter(jobs)
        .map(|(filename, url)| {
          let client = client.clone();
          let tx = tx.clone();
          async move {
            match search::fetch_preview(&client, &url).await {
              Ok(image) => {
                let _ = tx.send((filename, image)).await;
              }
              Err(e) => {
                // A missing preview keeps its placeholder; not fatal.
                debug!(%filename, err = %format!("{:#}", e), "preview fetch failed");
              }
            }
          }
        })
        .buffer_unordered(constants().preview_concurrency)
        .collect::<()>()
        .await;
    });
  }

  // --- Playback ---

  /// Play the selected video result in mpv, starting at the matched moment.
  pub async fn play_selected(&mut self) {
    let Some(selected) = self.list_state.selected() else { return };
    let Some(item) = self.results.get(selected) else { return };
    if item.media_type != MediaType::Video {
      return;
    }
    let url = self.cache.resolve(item.media_type, &item.filename);
    let caption = item.caption.clone();
    let timestamp = item.timestamp;
    if let Err(e) = self.player.play(&url, timestamp, caption).await {
      self.set_error(format!("Playback error: {:#}", e));
      let _ = self.player.stop().await;
    }
  }

  /// Item under the cursor, if any.
  pub fn selected_item(&self) -> Option<&MediaItem> {
    self.results.get(self.list_state.selected()?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn app() -> App {
    App::new(DisplayMode::Ascii, Config::default())
  }

  fn item(filename: &str, media_type: MediaType) -> MediaItem {
    MediaItem { filename: filename.to_string(), caption: format!("caption for {}", filename), media_type, timestamp: 3.5 }
  }

  #[tokio::test]
  async fn keystrokes_commit_once_after_quiet_period() {
    let mut app = app();
    let t0 = Instant::now();

    for (text, ms) in [("h", 0u64), ("ho", 100), ("hot", 200)] {
      app.input = text.to_string();
      app.on_input_edited(t0 + Duration::from_millis(ms));
    }
    app.tick(t0 + Duration::from_millis(300));
    assert_eq!(app.debounce.committed(), "", "no commit before the quiet period");

    app.tick(t0 + Duration::from_millis(700));
    assert_eq!(app.debounce.committed(), "hot");
    assert!(app.dispatcher.busy(), "commit issues a query");

    app.tick(t0 + Duration::from_millis(800));
    assert_eq!(app.debounce.committed(), "hot", "no second commit for the same quiet period");
  }

  #[tokio::test]
  async fn toggles_recommit_without_debounce_delay() {
    let mut app = app();
    app.input = "hot dog".to_string();
    app.toggle_strict();
    assert_eq!(app.debounce.committed(), "hot AND dog");
    assert!(app.dispatcher.busy());

    app.toggle_strict();
    assert_eq!(app.debounce.committed(), "hot dog");
  }

  #[tokio::test]
  async fn caption_feeds_input_and_commits_immediately() {
    let mut app = app();
    app.mode = AppMode::Upload;
    app.apply_caption("red car".to_string());

    assert_eq!(app.input, "red car");
    assert_eq!(app.debounce.committed(), "red car");
    assert!(app.dispatcher.busy(), "query issued without waiting for the debounce timer");
    assert_eq!(app.mode, AppMode::Input);
  }

  #[tokio::test]
  async fn visible_items_resolve_urls_once() {
    let mut app = app();
    app.results = vec![item("a.mp4", MediaType::Video), item("b.mp4", MediaType::Video)];
    app.loaders.rebuild(2, 0.1);

    app.mark_visible(0, 2);
    assert_eq!(app.cache.derivations(), 2);

    // Scrolling the same rows back into view re-derives nothing.
    app.mark_visible(0, 2);
    assert_eq!(app.cache.derivations(), 2);
  }

  #[tokio::test]
  async fn failed_search_keeps_previous_results() {
    let mut app = app();
    app.results = vec![item("keep.jpg", MediaType::Image)];
    app.commit_now();
    // No backend is listening; once the response lands it must not blank
    // the result set. We can't await the real response here, but the apply
    // path is what matters:
    app.check_pending();
    assert_eq!(app.results.len(), 1);
  }
}
