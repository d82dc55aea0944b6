use anyhow::{Context, Result, anyhow};
use std::process::Stdio;
use tokio::{
  io::AsyncBufReadExt,
  io::BufReader as TokioBufReader,
  process::{Child as TokioChild, Command},
  sync::mpsc,
  task::JoinHandle,
};

/// Plays video results in an external mpv process, starting at the matched
/// moment. Mirrors the source corpus viewer's muted looping preview.
pub struct VideoPlayer {
  current_process: Option<TokioChild>,
  /// Caption of the item currently playing, for the status line.
  pub current_caption: Option<String>,
  monitor_handle: Option<JoinHandle<()>>,
  status_rx: Option<mpsc::Receiver<String>>,
  last_status: Option<String>,
}

impl VideoPlayer {
  pub fn new() -> Self {
    Self { current_process: None, current_caption: None, monitor_handle: None, status_rx: None, last_status: None }
  }

  pub fn is_playing(&self) -> bool {
    self.current_process.is_some()
  }

  pub fn check_status(&mut self) {
    if let Some(rx) = &mut self.status_rx {
      while let Ok(status) = rx.try_recv() {
        self.last_status = Some(status);
      }
    }
  }

  pub fn last_status(&self) -> Option<String> {
    self.last_status.clone()
  }

  /// Start playback of `url` at `start_secs`. The timestamp is applied here,
  /// at presentation time — the URL comes from the cache unchanged.
  pub async fn play(&mut self, url: &str, start_secs: f64, caption: String) -> Result<()> {
    self.stop().await.context("Failed to stop previous playback")?;
    self.current_caption = Some(caption);

    let mut cmd = Command::new("mpv");
    cmd.args([
      "--mute=yes",
      "--loop-file=inf",
      &format!("--start={}", start_secs),
      "--term-status-msg=Time: ${time-pos/full} / ${duration/full} | ${percent-pos}%",
      url,
    ]);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    // Send stderr to null — if piped but never drained, the pipe buffer
    // fills and mpv blocks.
    cmd.stderr(Stdio::null());

    let mut child = cmd.spawn().map_err(|e| {
      if e.kind() == std::io::ErrorKind::NotFound {
        anyhow!("mpv not found. Install it with: brew install mpv (macOS) or apt install mpv (Linux)")
      } else {
        anyhow!(e).context("Failed to spawn mpv process")
      }
    })?;

    let stdout = child.stdout.take().context("Failed to get mpv stdout")?;
    let (tx, rx) = mpsc::channel::<String>(10);
    self.status_rx = Some(rx);

    let monitor_handle = tokio::spawn(async move {
      let reader = TokioBufReader::new(stdout);
      let mut lines = reader.lines();
      while let Ok(Some(line)) = lines.next_line().await {
        if tx.send(line).await.is_err() {
          break;
        }
      }
    });

    self.current_process = Some(child);
    self.monitor_handle = Some(monitor_handle);
    Ok(())
  }

  pub async fn stop(&mut self) -> Result<()> {
    if let Some(handle) = self.monitor_handle.take() {
      handle.abort();
      let _ = handle.await;
    }
    self.status_rx = None;
    self.last_status = None;

    if let Some(mut child) = self.current_process.take() {
      child.kill().await.context("Failed to kill mpv process")?;
      let _ = child.wait().await;
    }

    self.current_caption = None;
    Ok(())
  }
}
