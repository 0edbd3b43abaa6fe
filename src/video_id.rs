use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// YouTube's canonical 11-character video identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    /// Accept a bare ID only. Use [`resolve`] for URLs.
    pub fn parse(id: &str) -> Option<Self> {
        is_valid_id(id).then(|| VideoId(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Priority order matters: watch, embed, short link, shorts, bare ID.
static PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"youtube\.com/watch\?(?:[^#]*&)?v=([^&?/#]+)",
        r"youtube\.com/embed/([^&?/#]+)",
        r"youtu\.be/([^&?/#]+)",
        r"youtube\.com/shorts/([^&?/#]+)",
        r"^([a-zA-Z0-9_-]{11})$",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){p}")).expect("static video ID pattern"))
    .collect()
});

fn is_valid_id(candidate: &str) -> bool {
    candidate.len() == 11
        && candidate
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Extract a video ID from a watch, embed, short-link or shorts URL, or a bare ID.
///
/// Returns `None` when nothing matches or the captured ID is not exactly 11
/// characters from `[A-Za-z0-9_-]`.
pub fn resolve(input: &str) -> Option<VideoId> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    PATTERNS
        .iter()
        .filter_map(|re| re.captures(input))
        .map(|caps| caps[1].to_string())
        .find(|candidate| is_valid_id(candidate))
        .map(VideoId)
}
