use crate::caption::Caption;
use crate::error::SubclipError;
use crate::json3::TimedEvent;

use std::time::Duration;

/// A half-open millisecond interval `[start_ms, end_ms)`.
/// A missing bound is unbounded on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClipWindow {
    pub start_ms: Option<i64>,
    pub end_ms: Option<i64>,
}

impl ClipWindow {
    pub fn new(start_ms: Option<i64>, end_ms: Option<i64>) -> Result<Self, SubclipError> {
        if start_ms.map_or(false, |s| s < 0) {
            return Err(SubclipError::InvalidWindow(
                "--start-ms must be >= 0.".to_string(),
            ));
        }
        if end_ms.map_or(false, |e| e < 0) {
            return Err(SubclipError::InvalidWindow(
                "--end-ms must be >= 0.".to_string(),
            ));
        }
        if let (Some(start), Some(end)) = (start_ms, end_ms) {
            if end <= start {
                return Err(SubclipError::InvalidWindow(
                    "--end-ms must be greater than --start-ms.".to_string(),
                ));
            }
        }
        Ok(Self { start_ms, end_ms })
    }

    pub fn is_unbounded(&self) -> bool {
        self.start_ms.is_none() && self.end_ms.is_none()
    }

    /// Whether `event` belongs in the clip.
    ///
    /// Events with a positive duration are kept when their span overlaps the
    /// window at all. Everything else is a point event and must start inside
    /// it. Events without a start time are metadata and always kept.
    pub fn keeps(&self, event: &TimedEvent) -> bool {
        let start = match event.t_start_ms {
            Some(start) => start,
            None => return true,
        };
        let before_end = self.end_ms.map_or(true, |end| start < end);

        match event.d_duration_ms.filter(|d| *d > 0) {
            Some(duration) => {
                let event_end = start.saturating_add(duration);
                self.start_ms.map_or(true, |limit| event_end > limit) && before_end
            }
            None => self.start_ms.map_or(true, |limit| start >= limit) && before_end,
        }
    }
}

/// Keep the events that fall inside `window`, in their original order.
pub fn clip_events(events: Vec<TimedEvent>, window: &ClipWindow) -> Vec<TimedEvent> {
    if window.is_unbounded() {
        return events;
    }
    events.into_iter().filter(|e| window.keeps(e)).collect()
}

/// Turn timed events into numbered captions for the text sinks.
pub fn to_captions(events: &[TimedEvent]) -> Vec<Caption> {
    let mut seqnum = 0;
    events
        .iter()
        .filter_map(|event| {
            let start = event.t_start_ms?;
            let text: Vec<String> = event
                .text()
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect();
            // ASR tracks carry bare "\n" append events between lines.
            if text.is_empty() {
                return None;
            }
            let show_at = Duration::from_millis(start.max(0) as u64);
            let duration = event.d_duration_ms.unwrap_or(0).max(0);
            let hide_at = show_at + Duration::from_millis(duration as u64);
            seqnum += 1;
            Some(Caption {
                sequence_number: seqnum,
                show_at,
                hide_at,
                text,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json3::Segment;
    use serde_json::Map;

    fn ev(start: i64, duration: i64) -> TimedEvent {
        TimedEvent::timed(Some(start), Some(duration))
    }

    fn window(start: Option<i64>, end: Option<i64>) -> ClipWindow {
        ClipWindow {
            start_ms: start,
            end_ms: end,
        }
    }

    fn spoken(start: i64, duration: i64, text: &str) -> TimedEvent {
        TimedEvent {
            segs: Some(vec![Segment {
                utf8: Some(text.to_string()),
                rest: Map::new(),
            }]),
            ..ev(start, duration)
        }
    }

    macro_rules! test_keeps {
        ($($name:ident: $value:expr,)*) => {
        $(
            #[test]
            fn $name() {
                let (event, win, expected) = $value;

                assert_eq!(win.keeps(&event), expected);
            }
        )*
        }
    }

    test_keeps! {
        point_at_lower_bound_is_kept: (ev(500, 0), window(Some(500), Some(1000)), true),
        point_at_upper_bound_is_dropped: (ev(1000, 0), window(Some(500), Some(1000)), false),
        point_before_window_is_dropped: (ev(499, 0), window(Some(500), None), false),
        negative_duration_is_a_point: (ev(400, -50), window(Some(500), None), false),
        missing_duration_is_a_point: (TimedEvent::timed(Some(1000), None), window(None, Some(1000)), false),
        span_ending_at_lower_bound_is_dropped: (ev(0, 500), window(Some(500), None), false),
        span_starting_at_upper_bound_is_dropped: (ev(1000, 200), window(None, Some(1000)), false),
        span_straddling_lower_bound_is_kept: (ev(400, 200), window(Some(500), Some(1000)), true),
        span_straddling_upper_bound_is_kept: (ev(900, 200), window(Some(500), Some(1000)), true),
        span_covering_window_is_kept: (ev(0, 5000), window(Some(500), Some(1000)), true),
        span_with_huge_duration_does_not_overflow: (ev(10, i64::MAX), window(Some(20), None), true),
        untimed_event_is_always_kept: (TimedEvent::timed(None, Some(10)), window(Some(5), Some(6)), true),
    }

    #[test]
    fn unbounded_window_is_identity() {
        let events = vec![ev(3000, 10), TimedEvent::timed(None, None), ev(0, -1)];
        assert_eq!(clip_events(events.clone(), &ClipWindow::default()), events);
        assert!(clip_events(vec![], &ClipWindow::default()).is_empty());
    }

    #[test]
    fn overlapping_events_are_kept_whole() {
        let events = vec![ev(0, 1000), ev(1000, 500), ev(2000, 1000)];
        let clipped = clip_events(events, &window(Some(500), Some(1500)));
        assert_eq!(clipped, vec![ev(0, 1000), ev(1000, 500)]);
    }

    #[test]
    fn window_outside_all_events_keeps_only_metadata() {
        let meta = TimedEvent::timed(None, None);
        let events = vec![ev(0, 100), meta.clone(), ev(200, 0)];
        assert_eq!(
            clip_events(events, &window(Some(10_000), Some(20_000))),
            vec![meta]
        );
        assert!(clip_events(vec![ev(0, 100)], &window(Some(10_000), None)).is_empty());
    }

    #[test]
    fn order_is_preserved() {
        let events = vec![
            ev(0, 100),
            ev(600, 100),
            ev(5000, 0),
            ev(700, 0),
            ev(100, 10),
            ev(900, 500),
        ];
        let clipped = clip_events(events, &window(Some(500), Some(1000)));
        assert_eq!(clipped, vec![ev(600, 100), ev(700, 0), ev(900, 500)]);
    }

    #[test]
    fn empty_input_stays_empty() {
        assert!(clip_events(vec![], &window(Some(0), Some(1))).is_empty());
    }

    macro_rules! test_window_validation {
        ($($name:ident: $value:expr,)*) => {
        $(
            #[test]
            fn $name() {
                let (start, end, expected): (Option<i64>, Option<i64>, Result<(), &str>) = $value;

                let result = ClipWindow::new(start, end).map(|_| ()).map_err(|e| e.to_string());

                assert_eq!(result, expected.map_err(String::from));
            }
        )*
        }
    }

    test_window_validation! {
        validate_no_bounds: (None, None, Ok(())),
        validate_start_only: (Some(0), None, Ok(())),
        validate_end_only: (None, Some(0), Ok(())),
        validate_both: (Some(500), Some(1500), Ok(())),
        validate_negative_start: (Some(-1), None, Err("--start-ms must be >= 0.")),
        validate_negative_end: (Some(10), Some(-1), Err("--end-ms must be >= 0.")),
        validate_empty_window: (Some(1500), Some(1500), Err("--end-ms must be greater than --start-ms.")),
        validate_reversed_window: (Some(2000), Some(1500), Err("--end-ms must be greater than --start-ms.")),
    }

    #[test]
    fn captions_skip_untimed_and_blank_events() {
        let events = vec![
            TimedEvent::timed(None, None),
            spoken(1000, 2500, "hello\nworld"),
            spoken(2000, 10, "\n"),
            spoken(3500, 0, "bye"),
        ];

        let captions = to_captions(&events);

        assert_eq!(
            captions,
            vec![
                Caption {
                    sequence_number: 1,
                    show_at: Duration::from_millis(1000),
                    hide_at: Duration::from_millis(3500),
                    text: vec!["hello".to_string(), "world".to_string()],
                },
                Caption {
                    sequence_number: 2,
                    show_at: Duration::from_millis(3500),
                    hide_at: Duration::from_millis(3500),
                    text: vec!["bye".to_string()],
                },
            ]
        );
    }
}
