//! Query text construction.
//!
//! Turns the raw input text and the strict-mode flag into the text payload
//! sent to the search backend. Pure and deterministic so it can be tested
//! in isolation.

/// Sentinel the backend treats as "match everything".
pub const MATCH_ALL: &str = "*";

/// Connective inserted between tokens in strict mode.
const STRICT_JOIN: &str = " AND ";

/// Build the query text for `raw` under the given strict-mode setting.
///
/// - Empty (or whitespace-only) input yields the match-all sentinel `"*"`.
/// - With strict mode off, the trimmed input is passed through unchanged.
/// - With strict mode on, the input is split on whitespace (runs of
///   whitespace collapse — `split_whitespace` drops empty tokens) and the
///   tokens are joined with `" AND "` so the backend requires all of them.
///   A single token yields itself with no connective.
pub fn build(raw: &str, strict: bool) -> String {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return MATCH_ALL.to_string();
  }
  if !strict {
    return trimmed.to_string();
  }
  trimmed.split_whitespace().collect::<Vec<_>>().join(STRICT_JOIN)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn strict_joins_tokens_with_and() {
    assert_eq!(build("hot dog", true), "hot AND dog");
    assert_eq!(build("red hot dog", true), "red AND hot AND dog");
  }

  #[test]
  fn non_strict_passes_through() {
    assert_eq!(build("hot dog", false), "hot dog");
  }

  #[test]
  fn empty_input_is_match_all() {
    assert_eq!(build("", false), "*");
    assert_eq!(build("", true), "*");
    assert_eq!(build("   ", true), "*");
  }

  #[test]
  fn single_token_has_no_connective() {
    assert_eq!(build("single", true), "single");
  }

  #[test]
  fn strict_normalizes_repeated_whitespace() {
    assert_eq!(build("hot  dog", true), "hot AND dog");
    assert_eq!(build("  hot \t dog  ", true), "hot AND dog");
  }

  #[test]
  fn non_strict_trims_edges() {
    assert_eq!(build("  hot dog ", false), "hot dog");
  }
}
