//! Search dispatcher.
//!
//! Each outbound query is tagged with a monotonically increasing sequence
//! number. Responses come back over a channel in arrival order, which is not
//! issuance order; the gate applies a response only if its sequence number
//! exceeds the highest already applied, so a stale request can never
//! overwrite results produced by a newer one. In-flight requests are not
//! aborted — invalidation via the gate is sufficient.

use anyhow::Result;
use reqwest::Client;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::search::{self, MediaItem, MediaType};

/// Outcome of draining the dispatcher on one run-loop tick.
#[derive(Debug)]
pub enum DispatchOutcome {
  /// A fresh result set to apply wholesale.
  Results(Vec<MediaItem>),
  /// The newest request failed; the previous result set stays on screen.
  Failed(String),
}

/// Admits responses in issuance order, discarding stale ones.
#[derive(Debug, Default)]
pub struct SequenceGate {
  issued: u64,
  applied: u64,
}

impl SequenceGate {
  /// Tag the next outbound request.
  pub fn issue(&mut self) -> u64 {
    self.issued += 1;
    self.issued
  }

  /// Whether a response with this sequence number may be applied. Admission
  /// advances the high-water mark, so an older response arriving later is
  /// rejected.
  pub fn admit(&mut self, seq: u64) -> bool {
    if seq > self.applied {
      self.applied = seq;
      true
    } else {
      false
    }
  }

  /// Number of requests issued but not yet applied or superseded.
  pub fn in_flight(&self) -> u64 {
    self.issued - self.applied
  }
}

pub struct Dispatcher {
  gate: SequenceGate,
  tx: mpsc::UnboundedSender<(u64, Result<Vec<MediaItem>>)>,
  rx: mpsc::UnboundedReceiver<(u64, Result<Vec<MediaItem>>)>,
}

impl Dispatcher {
  pub fn new() -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    Self { gate: SequenceGate::default(), tx, rx }
  }

  /// Whether any request is still awaiting an applicable response.
  pub fn busy(&self) -> bool {
    self.gate.in_flight() > 0
  }

  /// Issue a query against `base_url` as a background task.
  pub fn dispatch(&mut self, client: Client, base_url: String, text: String, media_type: MediaType) {
    let seq = self.gate.issue();
    info!(seq, query = %text, kind = media_type.label(), base = %base_url, "search dispatched");

    let tx = self.tx.clone();
    tokio::spawn(async move {
      let result = search::search_media(&client, &base_url, &text, media_type).await;
      // The receiver only goes away on app teardown; a failed send is fine.
      let _ = tx.send((seq, result));
    });
  }

  /// Drain arrived responses and return the newest applicable outcome, if
  /// any. Stale responses (lower sequence than one already applied) are
  /// logged and dropped.
  pub fn poll(&mut self) -> Option<DispatchOutcome> {
    let mut outcome = None;
    while let Ok((seq, result)) = self.rx.try_recv() {
      if !self.gate.admit(seq) {
        debug!(seq, "stale search response discarded");
        continue;
      }
      outcome = Some(match result {
        Ok(items) => DispatchOutcome::Results(items),
        Err(e) => DispatchOutcome::Failed(format!("Search failed: {:#}", e)),
      });
    }
    outcome
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use anyhow::anyhow;

  fn item(filename: &str) -> MediaItem {
    MediaItem {
      filename: filename.to_string(),
      caption: String::new(),
      media_type: MediaType::Image,
      timestamp: 0.0,
    }
  }

  #[test]
  fn gate_admits_in_issue_order() {
    let mut gate = SequenceGate::default();
    let first = gate.issue();
    let second = gate.issue();
    assert!(gate.admit(first));
    assert!(gate.admit(second));
  }

  #[test]
  fn gate_rejects_stale_response() {
    let mut gate = SequenceGate::default();
    let first = gate.issue();
    let second = gate.issue();
    // Request #2 resolves before #1.
    assert!(gate.admit(second));
    assert!(!gate.admit(first));
  }

  #[test]
  fn gate_tracks_in_flight() {
    let mut gate = SequenceGate::default();
    assert_eq!(gate.in_flight(), 0);
    let a = gate.issue();
    let _b = gate.issue();
    assert_eq!(gate.in_flight(), 2);
    assert!(gate.admit(a));
    assert_eq!(gate.in_flight(), 1);
  }

  #[tokio::test]
  async fn out_of_order_arrival_keeps_newest_results() {
    let mut d = Dispatcher::new();
    let first = d.gate.issue();
    let second = d.gate.issue();

    // Simulate #1's response arriving after #2's.
    d.tx.send((second, Ok(vec![item("newer.jpg")]))).unwrap();
    match d.poll() {
      Some(DispatchOutcome::Results(items)) => assert_eq!(items[0].filename, "newer.jpg"),
      other => panic!("expected results, got {:?}", other),
    }

    d.tx.send((first, Ok(vec![item("older.jpg")]))).unwrap();
    assert!(d.poll().is_none(), "stale response must be discarded");
  }

  #[tokio::test]
  async fn stale_error_does_not_surface() {
    let mut d = Dispatcher::new();
    let first = d.gate.issue();
    let second = d.gate.issue();

    d.tx.send((second, Ok(vec![item("fresh.jpg")]))).unwrap();
    d.tx.send((first, Err(anyhow!("timeout")))).unwrap();

    // Both arrive in one tick; the newest applicable outcome wins and the
    // stale error is dropped.
    match d.poll() {
      Some(DispatchOutcome::Results(items)) => assert_eq!(items[0].filename, "fresh.jpg"),
      other => panic!("expected results, got {:?}", other),
    }
    assert!(d.poll().is_none());
  }

  #[tokio::test]
  async fn newest_error_is_reported() {
    let mut d = Dispatcher::new();
    let seq = d.gate.issue();
    d.tx.send((seq, Err(anyhow!("connection refused")))).unwrap();
    match d.poll() {
      Some(DispatchOutcome::Failed(msg)) => assert!(msg.contains("connection refused")),
      other => panic!("expected failure, got {:?}", other),
    }
  }
}
