use crate::error::SubclipError;
use crate::json3::{self, Json3Document};

use std::time::Duration;

use log::{debug, info};
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, COOKIE};
use serde::Deserialize;
use serde_json::json;

const WATCH_URL: &str = "https://www.youtube.com/watch";
const PLAYER_URL: &str = "https://www.youtube.com/youtubei/v1/player";
const CONSENT_FORM: &str = r#"action="https://consent.youtube.com/s""#;
const RECAPTCHA_MARKER: &str = r#"class="g-recaptcha""#;

/// The innertube client YouTube answers with unsigned caption URLs.
const CLIENT_NAME: &str = "ANDROID";
const CLIENT_VERSION: &str = "20.10.38";

/// One caption track available for a video.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub language: String,
    pub language_code: String,
    pub is_generated: bool,
    pub base_url: String,
}

#[derive(Debug)]
pub struct Selection<'a> {
    pub track: &'a Track,
    /// The preferred language was missing and the first track was taken instead.
    pub fell_back: bool,
}

/// Pick the track for `preferred`, or the first one listed when there is none.
pub fn select_track<'a>(tracks: &'a [Track], preferred: &str) -> Option<Selection<'a>> {
    if let Some(track) = tracks.iter().find(|t| t.language_code == preferred) {
        return Some(Selection {
            track,
            fell_back: false,
        });
    }
    tracks.first().map(|track| Selection {
        track,
        fell_back: true,
    })
}

pub struct TranscriptClient {
    client: Client,
}

impl TranscriptClient {
    pub fn new(timeout: Duration) -> Result<Self, SubclipError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US"));
        let client = Client::builder()
            .user_agent(concat!("subclip/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(service)?;
        Ok(Self { client })
    }

    /// List the caption tracks of a video, manually created ones first.
    pub fn list_tracks(&self, video_id: &str) -> Result<Vec<Track>, SubclipError> {
        let html = self.fetch_watch_page(video_id)?;
        let api_key = extract_api_key(&html)?;

        debug!("POST {} for {}", PLAYER_URL, video_id);
        let player: PlayerResponse = self
            .client
            .post(PLAYER_URL)
            .query(&[("key", api_key.as_str())])
            .json(&json!({
                "context": {
                    "client": {
                        "clientName": CLIENT_NAME,
                        "clientVersion": CLIENT_VERSION,
                    }
                },
                "videoId": video_id,
            }))
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(service)?
            .json()
            .map_err(service)?;

        let tracks = parse_tracks(player)?;
        info!("{} caption tracks available for {}", tracks.len(), video_id);
        Ok(tracks)
    }

    /// Download the JSON3 rendition of `track`.
    pub fn fetch_json3(&self, track: &Track) -> Result<Json3Document, SubclipError> {
        let url = json3_url(&track.base_url);
        debug!("GET {}", url);
        let body = self
            .client
            .get(&url)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.text())
            .map_err(service)?;
        json3::parse_json3(&body)
    }

    fn fetch_watch_page(&self, video_id: &str) -> Result<String, SubclipError> {
        let html = self.get_watch_page(video_id, None)?;
        if !html.contains(CONSENT_FORM) {
            return Ok(html);
        }

        debug!("accepting cookie consent");
        let consent = extract_consent_value(&html).ok_or_else(|| {
            SubclipError::Service("Failed to accept the YouTube cookie consent".to_string())
        })?;
        let html = self.get_watch_page(video_id, Some(&format!("CONSENT=YES+{}", consent)))?;
        if html.contains(CONSENT_FORM) {
            return Err(SubclipError::Service(
                "Failed to accept the YouTube cookie consent".to_string(),
            ));
        }
        Ok(html)
    }

    fn get_watch_page(&self, video_id: &str, cookie: Option<&str>) -> Result<String, SubclipError> {
        debug!("GET {}?v={}", WATCH_URL, video_id);
        let mut request = self.client.get(WATCH_URL).query(&[("v", video_id)]);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        request
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.text())
            .map_err(service)
    }
}

fn service(err: reqwest::Error) -> SubclipError {
    SubclipError::Service(err.to_string())
}

fn json3_url(base_url: &str) -> String {
    let sep = if base_url.contains('?') { '&' } else { '?' };
    format!("{}{}fmt=json3", base_url, sep)
}

fn extract_api_key(html: &str) -> Result<String, SubclipError> {
    let re = Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#)
        .map_err(|e| SubclipError::ParseError(e.to_string()))?;
    if let Some(caps) = re.captures(html) {
        return Ok(caps[1].to_string());
    }
    if html.contains(RECAPTCHA_MARKER) {
        return Err(SubclipError::Service(
            "YouTube is blocking requests from your IP (reCAPTCHA challenge)".to_string(),
        ));
    }
    Err(SubclipError::Service(
        "Could not find the innertube API key on the video page".to_string(),
    ))
}

fn extract_consent_value(html: &str) -> Option<String> {
    let re = Regex::new(r#"name="v" value="(.*?)""#).ok()?;
    re.captures(html).map(|caps| caps[1].to_string())
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    playability_status: Option<PlayabilityStatus>,
    captions: Option<Captions>,
}

#[derive(Deserialize, Debug)]
struct PlayabilityStatus {
    status: String,
    reason: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Captions {
    player_captions_tracklist_renderer: Option<TracklistRenderer>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct TracklistRenderer {
    #[serde(default)]
    caption_tracks: Vec<CaptionTrack>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    name: TrackName,
    language_code: String,
    kind: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct TrackName {
    simple_text: Option<String>,
    #[serde(default)]
    runs: Vec<TextRun>,
}

#[derive(Deserialize, Debug)]
struct TextRun {
    text: String,
}

impl TrackName {
    fn into_string(self) -> String {
        match self.simple_text {
            Some(text) => text,
            None => self.runs.into_iter().map(|r| r.text).collect(),
        }
    }
}

fn parse_tracks(player: PlayerResponse) -> Result<Vec<Track>, SubclipError> {
    if let Some(status) = player.playability_status {
        if status.status != "OK" {
            return Err(SubclipError::Service(format!(
                "Video is unplayable ({}): {}",
                status.status,
                status.reason.as_deref().unwrap_or("no reason given")
            )));
        }
    }

    let caption_tracks = player
        .captions
        .and_then(|c| c.player_captions_tracklist_renderer)
        .map(|r| r.caption_tracks)
        .unwrap_or_default();
    if caption_tracks.is_empty() {
        return Err(SubclipError::Service(
            "Subtitles are disabled for this video".to_string(),
        ));
    }

    let mut tracks: Vec<Track> = caption_tracks
        .into_iter()
        .map(|t| Track {
            language: t.name.into_string(),
            is_generated: t.kind.as_deref() == Some("asr"),
            base_url: t.base_url.replace("&fmt=srv3", ""),
            language_code: t.language_code,
        })
        .collect();
    tracks.sort_by_key(|t| t.is_generated);
    Ok(tracks)
}
