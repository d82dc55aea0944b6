//! Debounced input controller.
//!
//! Coalesces rapid keystrokes into a single committed search term after a
//! quiet period. The controller never owns a timer: it records a deadline
//! `Instant` and the run loop polls it on every tick, so teardown is simply
//! dropping the struct — nothing can fire afterwards.

use std::time::{Duration, Instant};

use crate::query;

/// A committed search term, produced when the quiet period elapses or a
/// discrete action forces an immediate commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
  pub term: String,
}

pub struct DebouncedInput {
  /// Quiet period that must elapse after the last keystroke.
  quiet: Duration,
  /// The most recent raw text (echoed by the UI immediately).
  raw: String,
  /// Pending commit deadline; `None` when nothing is scheduled.
  deadline: Option<Instant>,
  /// The last committed term, kept so re-commits after toggles are observable.
  committed: String,
}

impl DebouncedInput {
  pub fn new(quiet: Duration) -> Self {
    Self { quiet, raw: String::new(), deadline: None, committed: String::new() }
  }

  /// The raw text as last typed (not yet necessarily committed).
  pub fn raw(&self) -> &str {
    &self.raw
  }

  /// The term produced by the most recent commit.
  pub fn committed(&self) -> &str {
    &self.committed
  }

  /// Whether a commit is scheduled but has not fired yet.
  pub fn pending(&self) -> bool {
    self.deadline.is_some()
  }

  /// Record a keystroke: update the raw text and re-arm the quiet-period
  /// deadline. Any previously scheduled commit is superseded.
  pub fn on_keystroke(&mut self, text: impl Into<String>, now: Instant) {
    self.raw = text.into();
    self.deadline = Some(now + self.quiet);
  }

  /// Replace the raw text without scheduling a commit (cursor-only edits or
  /// programmatic restores).
  pub fn set_raw(&mut self, text: impl Into<String>) {
    self.raw = text.into();
  }

  /// Check whether the quiet period has elapsed. Returns the commit at most
  /// once per scheduled deadline; the commit reflects only the most recent
  /// raw text.
  pub fn poll(&mut self, now: Instant, strict: bool) -> Option<Commit> {
    match self.deadline {
      Some(deadline) if now >= deadline => {
        self.deadline = None;
        Some(self.commit(strict))
      }
      _ => None,
    }
  }

  /// Commit immediately, bypassing the timer. Used when a discrete action
  /// (strict/type/backend toggle, upload caption) should re-query without
  /// the typing-stream delay. Cancels any pending deadline.
  pub fn commit_now(&mut self, strict: bool) -> Commit {
    self.deadline = None;
    self.commit(strict)
  }

  fn commit(&mut self, strict: bool) -> Commit {
    self.committed = query::build(&self.raw, strict);
    Commit { term: self.committed.clone() }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const QUIET: Duration = Duration::from_millis(400);

  fn controller() -> (DebouncedInput, Instant) {
    (DebouncedInput::new(QUIET), Instant::now())
  }

  #[test]
  fn rapid_keystrokes_commit_once_with_last_text() {
    let (mut d, t0) = controller();
    d.on_keystroke("h", t0);
    d.on_keystroke("ho", t0 + Duration::from_millis(100));
    d.on_keystroke("hot", t0 + Duration::from_millis(200));

    // Quiet period measured from the last keystroke, not the first.
    assert_eq!(d.poll(t0 + Duration::from_millis(450), false), None);

    let commit = d.poll(t0 + Duration::from_millis(600), false);
    assert_eq!(commit, Some(Commit { term: "hot".to_string() }));
    assert_eq!(d.committed(), "hot");

    // No second commit for the same quiet period.
    assert_eq!(d.poll(t0 + Duration::from_millis(700), false), None);
  }

  #[test]
  fn raw_text_is_visible_before_commit() {
    let (mut d, t0) = controller();
    d.on_keystroke("partial", t0);
    assert_eq!(d.raw(), "partial");
    assert_eq!(d.committed(), "");
  }

  #[test]
  fn commit_now_bypasses_timer_and_cancels_deadline() {
    let (mut d, t0) = controller();
    d.on_keystroke("red car", t0);

    let commit = d.commit_now(false);
    assert_eq!(commit.term, "red car");
    assert!(!d.pending());

    // The superseded deadline must not fire a second commit.
    assert_eq!(d.poll(t0 + QUIET * 2, false), None);
  }

  #[test]
  fn commit_applies_query_builder() {
    let (mut d, t0) = controller();
    d.on_keystroke("hot dog", t0);
    let commit = d.poll(t0 + QUIET, true).unwrap();
    assert_eq!(commit.term, "hot AND dog");
  }

  #[test]
  fn empty_input_commits_match_all() {
    let (mut d, _) = controller();
    let commit = d.commit_now(false);
    assert_eq!(commit.term, "*");
  }
}
