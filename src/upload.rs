//! Upload → caption → search pipeline.
//!
//! The upload overlay takes an image path, ships it to the captioning
//! endpoint, and on success the first returned caption is fed back into the
//! search input as if the user had typed it and the quiet period had already
//! elapsed. Failures keep the overlay open until acknowledged; the committed
//! search term is untouched.

use anyhow::Result;
use reqwest::Client;
use std::path::PathBuf;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::search;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadPhase {
  Idle,
  Uploading,
  Error(String),
}

pub struct UploadPipeline {
  /// Whether the upload overlay is on screen.
  pub open: bool,
  /// Path input buffer (char-indexed cursor, like the search input).
  pub path: String,
  pub cursor: usize,
  phase: UploadPhase,
  rx: Option<oneshot::Receiver<Result<Vec<String>>>>,
}

impl UploadPipeline {
  pub fn new() -> Self {
    Self { open: false, path: String::new(), cursor: 0, phase: UploadPhase::Idle, rx: None }
  }

  pub fn phase(&self) -> &UploadPhase {
    &self.phase
  }

  pub fn is_uploading(&self) -> bool {
    self.phase == UploadPhase::Uploading
  }

  pub fn show(&mut self) {
    self.open = true;
  }

  /// Close the overlay. An in-flight upload keeps running; its result is
  /// dropped with the receiver.
  pub fn dismiss(&mut self) {
    self.open = false;
    self.path.clear();
    self.cursor = 0;
    self.phase = UploadPhase::Idle;
    self.rx = None;
  }

  /// Acknowledge a failure: back to `Idle` with the overlay still open so
  /// the user can retry.
  pub fn acknowledge_error(&mut self) {
    if matches!(self.phase, UploadPhase::Error(_)) {
      self.phase = UploadPhase::Idle;
    }
  }

  /// Start the upload. An empty path is a validation failure caught before
  /// any network call.
  pub fn trigger(&mut self, client: Client, caption_base_url: String) {
    if self.is_uploading() {
      return;
    }
    let trimmed = self.path.trim();
    if trimmed.is_empty() {
      self.phase = UploadPhase::Error("Select an image file first.".to_string());
      return;
    }
    let path = PathBuf::from(trimmed);
    info!(path = %path.display(), "caption upload started");
    self.phase = UploadPhase::Uploading;

    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send(search::caption_image(&client, &caption_base_url, &path).await);
    });
    self.rx = Some(rx);
  }

  /// Drain the pending upload, if its response arrived. On success the
  /// overlay closes and the first caption is returned for immediate commit;
  /// on failure the phase flips to `Error` and the overlay stays open.
  pub fn poll(&mut self) -> Option<String> {
    let mut rx = self.rx.take()?;
    match rx.try_recv() {
      Ok(Ok(captions)) => {
        // caption_image guarantees at least one entry on success.
        let caption = captions.into_iter().next().unwrap_or_default();
        info!(caption = %caption, "caption upload succeeded");
        self.dismiss();
        Some(caption)
      }
      Ok(Err(e)) => {
        warn!(err = %format!("{:#}", e), "caption upload failed");
        self.phase = UploadPhase::Error(format!("Upload failed: {:#}", e));
        None
      }
      Err(oneshot::error::TryRecvError::Empty) => {
        self.rx = Some(rx);
        None
      }
      Err(oneshot::error::TryRecvError::Closed) => {
        self.phase = UploadPhase::Error("Upload task failed.".to_string());
        None
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn empty_path_is_rejected_without_network() {
    let mut pipeline = UploadPipeline::new();
    pipeline.show();
    pipeline.trigger(Client::new(), "http://unused.invalid".to_string());
    assert!(matches!(pipeline.phase(), UploadPhase::Error(_)));
    // No task spawned, nothing to poll.
    assert!(pipeline.rx.is_none());
    assert!(pipeline.poll().is_none());
  }

  #[tokio::test]
  async fn success_closes_overlay_and_yields_caption() {
    let mut pipeline = UploadPipeline::new();
    pipeline.show();
    pipeline.path = "photo.jpg".to_string();
    pipeline.phase = UploadPhase::Uploading;

    let (tx, rx) = oneshot::channel();
    pipeline.rx = Some(rx);
    tx.send(Ok(vec!["red car".to_string(), "a car".to_string()])).unwrap();

    assert_eq!(pipeline.poll(), Some("red car".to_string()));
    assert!(!pipeline.open);
    assert_eq!(*pipeline.phase(), UploadPhase::Idle);
  }

  #[tokio::test]
  async fn failure_blocks_overlay_open_until_acknowledged() {
    let mut pipeline = UploadPipeline::new();
    pipeline.show();
    pipeline.path = "photo.jpg".to_string();
    pipeline.phase = UploadPhase::Uploading;

    let (tx, rx) = oneshot::channel();
    pipeline.rx = Some(rx);
    tx.send(Err(anyhow::anyhow!("connection refused"))).unwrap();

    assert!(pipeline.poll().is_none());
    assert!(pipeline.open, "overlay must stay open on failure");
    assert!(matches!(pipeline.phase(), UploadPhase::Error(_)));

    pipeline.acknowledge_error();
    assert_eq!(*pipeline.phase(), UploadPhase::Idle);
    assert!(pipeline.open);
  }

  #[tokio::test]
  async fn pending_upload_stays_pending() {
    let mut pipeline = UploadPipeline::new();
    pipeline.phase = UploadPhase::Uploading;
    let (_tx, rx) = oneshot::channel::<Result<Vec<String>>>();
    pipeline.rx = Some(rx);

    assert!(pipeline.poll().is_none());
    assert!(pipeline.rx.is_some(), "receiver is kept for the next tick");
    assert!(pipeline.is_uploading());
  }
}
