use crate::error::SubclipError;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A YouTube `fmt=json3` timed-text document.
///
/// Only the event list is interpreted. Every other top-level field is kept
/// as-is and written back after `events`, in its original order.
#[derive(Debug, Serialize, Deserialize)]
pub struct Json3Document {
    pub events: Vec<TimedEvent>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// One caption unit. Styling, window and segment metadata pass through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedEvent {
    #[serde(rename = "tStartMs", default, skip_serializing_if = "Option::is_none")]
    pub t_start_ms: Option<i64>,
    #[serde(rename = "dDurationMs", default, skip_serializing_if = "Option::is_none")]
    pub d_duration_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segs: Option<Vec<Segment>>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utf8: Option<String>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// Decode a downloaded JSON3 body.
pub fn parse_json3(body: &str) -> Result<Json3Document, SubclipError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| SubclipError::Payload(format!("Malformed JSON3 response: {}", e)))?;
    Json3Document::from_value(value)
}

impl Json3Document {
    pub fn from_value(value: Value) -> Result<Self, SubclipError> {
        let has_events = value
            .as_object()
            .map_or(false, |obj| obj.contains_key("events"));
        if !has_events {
            return Err(SubclipError::Payload(
                "JSON3 payload does not include events.".to_string(),
            ));
        }
        serde_json::from_value(value)
            .map_err(|e| SubclipError::Payload(format!("Malformed JSON3 events: {}", e)))
    }
}

impl TimedEvent {
    #[cfg(test)]
    pub fn timed(start_ms: Option<i64>, duration_ms: Option<i64>) -> Self {
        Self {
            t_start_ms: start_ms,
            d_duration_ms: duration_ms,
            segs: None,
            rest: Map::new(),
        }
    }

    /// The caption text, assembled from all segments.
    pub fn text(&self) -> String {
        self.segs
            .iter()
            .flatten()
            .filter_map(|seg| seg.utf8.as_deref())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keeps_unknown_fields() {
        let value = json!({
            "wireMagic": "pb3",
            "pens": [{}],
            "events": [
                {"id": 1, "wpWinPosId": 1, "wsWinStyleId": 1},
                {"tStartMs": 160, "dDurationMs": 4000, "wWinId": 1,
                 "segs": [{"utf8": "tere", "acAsrConf": 0}, {"utf8": " päevast", "tOffsetMs": 400}]}
            ]
        });

        let doc = Json3Document::from_value(value.clone()).unwrap();
        assert_eq!(doc.events.len(), 2);
        assert_eq!(doc.events[0].t_start_ms, None);
        assert_eq!(doc.events[1].t_start_ms, Some(160));
        assert_eq!(doc.events[1].text(), "tere päevast");
        assert_eq!(doc.rest["wireMagic"], "pb3");

        let back = serde_json::to_value(&doc).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn top_level_field_order_is_preserved() {
        let raw = r#"{"wireMagic":"pb3","events":[],"pens":[]}"#;
        let doc: Json3Document = serde_json::from_str(raw).unwrap();
        let keys: Vec<&String> = doc.rest.keys().collect();
        assert_eq!(keys, ["wireMagic", "pens"]);
    }

    #[test]
    fn null_duration_is_absent() {
        let doc = Json3Document::from_value(json!({
            "events": [{"tStartMs": 10, "dDurationMs": null}]
        }))
        .unwrap();
        assert_eq!(doc.events[0].d_duration_ms, None);
    }

    #[test]
    fn missing_events_is_a_payload_error() {
        for value in [json!({"wireMagic": "pb3"}), json!([]), json!("events")] {
            match Json3Document::from_value(value) {
                Err(SubclipError::Payload(msg)) => {
                    assert_eq!(msg, "JSON3 payload does not include events.")
                }
                other => panic!("unexpected result: {:?}", other),
            }
        }
    }

    #[test]
    fn non_numeric_start_is_rejected() {
        let result = Json3Document::from_value(json!({
            "events": [{"tStartMs": "soon"}]
        }));
        assert!(matches!(result, Err(SubclipError::Payload(_))));
    }

    #[test]
    fn undecodable_body_is_a_payload_error() {
        for body in ["<html>429 Too Many Requests</html>", "", "{\"events\": ["] {
            match parse_json3(body) {
                Err(SubclipError::Payload(msg)) => {
                    assert!(msg.starts_with("Malformed JSON3 response"), "{}", msg)
                }
                other => panic!("unexpected result: {:?}", other),
            }
        }
    }

    #[test]
    fn body_is_decoded() {
        let doc = parse_json3(r#"{"wireMagic":"pb3","events":[{"tStartMs":0,"dDurationMs":10}]}"#)
            .unwrap();
        assert_eq!(doc.events, vec![TimedEvent::timed(Some(0), Some(10))]);
    }

    #[test]
    fn text_without_segments_is_empty() {
        assert_eq!(TimedEvent::timed(Some(0), None).text(), "");
    }
}
