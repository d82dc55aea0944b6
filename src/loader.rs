//! One-shot viewport loaders.
//!
//! Each result row carries a two-state machine: `Pending` until the row is
//! sufficiently visible, then `Active` forever. The transition fires exactly
//! once — repeated visibility toggles never re-fire it and nothing moves an
//! item back to `Pending`. While pending the UI renders a placeholder; on
//! activation the app resolves the media URL and starts the lazy preview
//! fetch. Teardown is dropping the loader set (rebuilt wholesale with each
//! applied result set), so no observer callbacks can dangle.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
  Pending,
  Active,
}

#[derive(Debug)]
pub struct ViewportLoader {
  phase: Phase,
  threshold: f32,
}

impl ViewportLoader {
  pub fn new(threshold: f32) -> Self {
    Self { phase: Phase::Pending, threshold }
  }

  pub fn is_active(&self) -> bool {
    self.phase == Phase::Active
  }

  /// Report the fraction of the row currently visible. Returns `true` only
  /// on the single pending → active transition.
  pub fn observe(&mut self, visible_fraction: f32) -> bool {
    if self.phase == Phase::Active {
      return false;
    }
    if visible_fraction >= self.threshold {
      self.phase = Phase::Active;
      return true;
    }
    false
  }
}

/// The loader set for the current result set, one per row.
#[derive(Debug, Default)]
pub struct LoaderSet {
  loaders: Vec<ViewportLoader>,
}

impl LoaderSet {
  /// Rebuild for a freshly applied result set. All prior loaders (and any
  /// observation state) are discarded with the rows they tracked.
  pub fn rebuild(&mut self, count: usize, threshold: f32) {
    self.loaders = (0..count).map(|_| ViewportLoader::new(threshold)).collect();
  }

  pub fn is_active(&self, index: usize) -> bool {
    self.loaders.get(index).is_some_and(ViewportLoader::is_active)
  }

  /// Mark the given range of rows visible (full rows in a terminal list, so
  /// fraction 1.0). Returns the indices that transitioned on this call.
  pub fn observe_range(&mut self, start: usize, end: usize) -> Vec<usize> {
    let mut activated = Vec::new();
    for index in start..end.min(self.loaders.len()) {
      if self.loaders[index].observe(1.0) {
        activated.push(index);
      }
    }
    activated
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn activates_at_threshold() {
    let mut loader = ViewportLoader::new(0.1);
    assert!(!loader.is_active());
    assert!(loader.observe(0.1));
    assert!(loader.is_active());
  }

  #[test]
  fn below_threshold_stays_pending() {
    let mut loader = ViewportLoader::new(0.1);
    assert!(!loader.observe(0.05));
    assert!(!loader.observe(0.0));
    assert!(!loader.is_active());
  }

  #[test]
  fn transition_fires_exactly_once() {
    let mut loader = ViewportLoader::new(0.1);
    assert!(loader.observe(0.5));
    // Visibility toggling off and on again must not re-fire.
    assert!(!loader.observe(0.0));
    assert!(!loader.observe(1.0));
    assert!(loader.is_active(), "never reverts to pending");
  }

  #[test]
  fn loader_set_reports_new_activations_only() {
    let mut set = LoaderSet::default();
    set.rebuild(5, 0.1);

    assert_eq!(set.observe_range(0, 3), vec![0, 1, 2]);
    // Same window again: nothing new.
    assert!(set.observe_range(0, 3).is_empty());
    // Scrolled down: only the newly visible rows activate.
    assert_eq!(set.observe_range(2, 5), vec![3, 4]);
  }

  #[test]
  fn rebuild_discards_prior_state() {
    let mut set = LoaderSet::default();
    set.rebuild(2, 0.1);
    set.observe_range(0, 2);
    assert!(set.is_active(0));

    set.rebuild(2, 0.1);
    assert!(!set.is_active(0));
  }

  #[test]
  fn observe_range_clamps_to_len() {
    let mut set = LoaderSet::default();
    set.rebuild(2, 0.1);
    assert_eq!(set.observe_range(0, 10), vec![0, 1]);
  }
}
