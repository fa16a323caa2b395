use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum SubclipError {
    /// Rejected `--start-ms`/`--end-ms` combination.
    InvalidWindow(String),
    ParseError(String),
    /// Track listing or download failed.
    Service(String),
    /// The downloaded JSON3 document has the wrong shape.
    Payload(String),
}

impl Error for SubclipError {}

impl fmt::Display for SubclipError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SubclipError::InvalidWindow(msg) => write!(fmt, "{}", msg),
            SubclipError::ParseError(msg) => write!(fmt, "{}", msg),
            SubclipError::Service(msg) => write!(fmt, "{}", msg),
            SubclipError::Payload(msg) => write!(fmt, "{}", msg),
        }
    }
}
