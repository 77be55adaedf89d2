/// A normalized chat command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Unknown,
}

impl Command {
    /// Case-insensitive match on the whole message after trimming whitespace.
    pub fn parse(text: &str) -> Self {
        let normalized = text.trim().to_lowercase();
        match normalized.as_str() {
            "start" => Self::Start,
            "stop" => Self::Stop,
            _ => Self::Unknown,
        }
    }
}
