#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line, with the active span attached.
    #[default]
    Json,
    /// Compact human-readable lines for local runs.
    Compact,
}

impl LogFormat {
    /// Unknown values fall back to JSON.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "compact" | "text" | "pretty" => Self::Compact,
            _ => Self::Json,
        }
    }
}
