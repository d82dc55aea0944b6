use anyhow::{Context, Result, anyhow};
use image::DynamicImage;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::constants::constants;

// --- Wire types ---

/// Media kind, both a result attribute and the query's type filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
  Image,
  Video,
}

impl MediaType {
  pub fn label(self) -> &'static str {
    match self {
      MediaType::Image => "image",
      MediaType::Video => "video",
    }
  }

  pub fn toggled(self) -> Self {
    match self {
      MediaType::Image => MediaType::Video,
      MediaType::Video => MediaType::Image,
    }
  }
}

/// A single search hit. Immutable once received; the result set is replaced
/// wholesale on each applied response, never patched in place.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaItem {
  pub filename: String,
  pub caption: String,
  #[serde(rename = "type")]
  pub media_type: MediaType,
  /// Playback position of the matched moment, in seconds. Zero for images.
  #[serde(default)]
  pub timestamp: f64,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
  text: &'a str,
  #[serde(rename = "type")]
  media_type: MediaType,
  n: usize,
}

#[derive(Deserialize)]
struct QueryResponse {
  response: String,
  #[serde(default)]
  results: Vec<MediaItem>,
}

#[derive(Deserialize)]
struct CaptionResponse {
  response: String,
  #[serde(default)]
  caption: Vec<String>,
}

/// Status string a well-formed backend reply carries.
const RESPONSE_OKAY: &str = "okay";

// --- Search ---

/// POST the query to `{base_url}/query` and return the result items.
///
/// Transport failures and non-"okay" replies both surface as errors; the
/// caller keeps its previous result set in either case.
pub async fn search_media(client: &Client, base_url: &str, text: &str, media_type: MediaType) -> Result<Vec<MediaItem>> {
  let request = QueryRequest { text, media_type, n: constants().result_cap };
  debug!(base = %base_url, text = %text, kind = media_type.label(), "query dispatched");

  let response = client
    .post(format!("{}/query", base_url))
    .json(&request)
    .send()
    .await
    .with_context(|| format!("Search request to {} failed", base_url))?;

  let body: QueryResponse =
    response.json().await.with_context(|| format!("Malformed search response from {}", base_url))?;

  if body.response != RESPONSE_OKAY {
    return Err(anyhow!("Backend refused the query: {}", body.response));
  }
  Ok(body.results)
}

// --- Captioning ---

/// Upload an image to `{base_url}/caption` and return the caption strings.
///
/// The file is read here so a bad path fails before any network traffic.
pub async fn caption_image(client: &Client, base_url: &str, path: &Path) -> Result<Vec<String>> {
  let bytes = tokio::fs::read(path).await.with_context(|| format!("Failed to read {}", path.display()))?;
  let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| "image".to_string());

  let form = Form::new().part("image", Part::bytes(bytes).file_name(file_name));

  let response = client
    .post(format!("{}/caption", base_url))
    .multipart(form)
    .send()
    .await
    .with_context(|| format!("Caption request to {} failed", base_url))?;

  let body: CaptionResponse =
    response.json().await.with_context(|| format!("Malformed caption response from {}", base_url))?;

  if body.response != RESPONSE_OKAY {
    return Err(anyhow!("Captioning service refused the image: {}", body.response));
  }
  if body.caption.is_empty() {
    return Err(anyhow!("Captioning service returned no captions"));
  }
  Ok(body.caption)
}

// --- Media bytes ---

/// Fetch and decode an image for in-terminal preview rendering.
pub async fn fetch_preview(client: &Client, url: &str) -> Result<DynamicImage> {
  let response = client.get(url).send().await.with_context(|| format!("Failed to fetch {}", url))?;
  if !response.status().is_success() {
    return Err(anyhow!("Media server returned {} for {}", response.status(), url));
  }
  let bytes = response.bytes().await.with_context(|| format!("Failed to read image bytes from {}", url))?;
  let image =
    image::load_from_memory(&bytes).with_context(|| format!("Failed to decode image from memory (URL: {})", url))?;
  Ok(image)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn query_request_serializes_wire_shape() {
    let request = QueryRequest { text: "hot AND dog", media_type: MediaType::Video, n: 100 };
    let json = serde_json::to_value(&request).unwrap();
    assert_eq!(json, serde_json::json!({"text": "hot AND dog", "type": "video", "n": 100}));
  }

  #[test]
  fn query_response_deserializes_items() {
    let raw = r#"{
      "response": "okay",
      "results": [
        {"filename": "a.jpg", "caption": "a red car", "type": "image", "timestamp": 0},
        {"filename": "b.mp4", "caption": "a dog running", "type": "video", "timestamp": 12.5}
      ]
    }"#;
    let body: QueryResponse = serde_json::from_str(raw).unwrap();
    assert_eq!(body.response, "okay");
    assert_eq!(body.results.len(), 2);
    assert_eq!(body.results[0].media_type, MediaType::Image);
    assert_eq!(body.results[1].timestamp, 12.5);
  }

  #[test]
  fn query_response_tolerates_missing_results() {
    let body: QueryResponse = serde_json::from_str(r#"{"response": "error"}"#).unwrap();
    assert_eq!(body.response, "error");
    assert!(body.results.is_empty());
  }

  #[test]
  fn caption_response_deserializes() {
    let body: CaptionResponse = serde_json::from_str(r#"{"response": "okay", "caption": ["red car"]}"#).unwrap();
    assert_eq!(body.caption, vec!["red car"]);
  }

  #[tokio::test]
  async fn caption_upload_rejects_unreadable_file_before_network() {
    let client = Client::new();
    let err = caption_image(&client, "http://unused.invalid", Path::new("/no/such/file.jpg")).await.unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to read"));
  }

  #[test]
  fn media_type_toggles() {
    assert_eq!(MediaType::Image.toggled(), MediaType::Video);
    assert_eq!(MediaType::Video.toggled(), MediaType::Image);
  }
}
