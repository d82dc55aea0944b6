//! Media URL cache.
//!
//! Maps a media filename to its resolved URL on the media-serving backend.
//! Each filename is derived at most once per session; the map is never
//! evicted (acceptable for a session-lifetime process). Keyed purely by
//! filename — the playback timestamp is a presentation concern applied by
//! `playback_url`, never part of the key.

use std::collections::HashMap;
use tracing::debug;

use crate::search::MediaType;

pub struct MediaCache {
  base_url: String,
  entries: HashMap<String, String>,
  /// Count of URL derivations, i.e. cache misses.
  derivations: u64,
}

impl MediaCache {
  pub fn new(base_url: String) -> Self {
    Self { base_url, entries: HashMap::new(), derivations: 0 }
  }

  /// Resolve `filename` to a playable URL. Idempotent: the first call
  /// derives and stores the URL, every later call returns the stored value.
  pub fn resolve(&mut self, media_type: MediaType, filename: &str) -> String {
    if let Some(url) = self.entries.get(filename) {
      return url.clone();
    }
    let segment = match media_type {
      MediaType::Image => "images",
      MediaType::Video => "videos",
    };
    let url = format!("{}/{}/{}", self.base_url, segment, filename);
    self.derivations += 1;
    debug!(filename, url = %url, "media url derived");
    self.entries.insert(filename.to_string(), url.clone());
    url
  }

  /// Number of distinct filenames resolved so far.
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn derivations(&self) -> u64 {
    self.derivations
  }
}

/// Append the playback-position fragment to a resolved URL. Presentation
/// only: two timestamps for the same file share one cache entry.
pub fn playback_url(base: &str, timestamp: f64) -> String {
  format!("{}#t={}", base, timestamp)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn resolve_is_idempotent() {
    let mut cache = MediaCache::new("http://media.local".to_string());
    let first = cache.resolve(MediaType::Video, "a.mp4");
    let second = cache.resolve(MediaType::Video, "a.mp4");
    assert_eq!(first, second);
    assert_eq!(first, "http://media.local/videos/a.mp4");
    assert_eq!(cache.derivations(), 1);
    assert_eq!(cache.len(), 1);
  }

  #[test]
  fn images_and_videos_use_distinct_paths() {
    let mut cache = MediaCache::new("http://media.local".to_string());
    assert_eq!(cache.resolve(MediaType::Image, "a.jpg"), "http://media.local/images/a.jpg");
    assert_eq!(cache.resolve(MediaType::Video, "b.mp4"), "http://media.local/videos/b.mp4");
    assert_eq!(cache.derivations(), 2);
  }

  #[test]
  fn timestamp_is_not_part_of_the_key() {
    let mut cache = MediaCache::new("http://media.local".to_string());
    let base = cache.resolve(MediaType::Video, "a.mp4");
    let at_ten = playback_url(&base, 10.0);
    let at_thirty = playback_url(&base, 30.5);
    assert_eq!(at_ten, "http://media.local/videos/a.mp4#t=10");
    assert_eq!(at_thirty, "http://media.local/videos/a.mp4#t=30.5");
    // Two playback positions, one derivation.
    assert_eq!(cache.derivations(), 1);
  }
}
