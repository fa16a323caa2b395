use std::time::Duration;

/// A numbered caption ready for the SRT and plain text sinks.
#[derive(Debug, PartialEq)]
pub struct Caption {
    pub(crate) sequence_number: usize,
    pub(crate) show_at: Duration,
    pub(crate) hide_at: Duration,
    pub(crate) text: Vec<String>,
}
