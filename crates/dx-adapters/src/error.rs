/// Errors from the host adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    /// A wheel `deltaMode` outside pixel (0), line (1) and page (2).
    InvalidDeltaMode(u32),
    /// An event name no wheel adapter understands.
    UnknownWheelEvent(String),
    /// Malformed host event JSON.
    Json(String),
    /// Missing required field in a host event.
    MissingField(&'static str),
    /// The image never reported complete within the configured poll limit.
    PollLimitExceeded { polls: u32 },
}

impl std::fmt::Display for AdapterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDeltaMode(mode) => write!(f, "invalid wheel delta mode: {mode}"),
            Self::UnknownWheelEvent(name) => write!(f, "unknown wheel event: {name}"),
            Self::Json(msg) => write!(f, "JSON parse error: {msg}"),
            Self::MissingField(field) => write!(f, "missing required field: {field}"),
            Self::PollLimitExceeded { polls } => {
                write!(f, "image not complete after {polls} polls")
            }
        }
    }
}

impl std::error::Error for AdapterError {}
