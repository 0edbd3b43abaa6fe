use crate::Segment;

/// Render as plain text (one segment per line, no timestamps)
pub fn render_text(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render as `MM:SS text` lines
pub fn render_timestamped(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| format!("{} {}", format_timestamp(s.start), s.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render as the `/transcript` JSON array
pub fn render_json(segments: &[Segment]) -> String {
    serde_json::to_string_pretty(segments).unwrap_or_else(|_| "[]".to_string())
}

/// `MM:SS` from milliseconds. Minutes keep counting past an hour.
pub fn format_timestamp(ms: u64) -> String {
    let total_seconds = ms / 1000;
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Segment> {
        vec![
            Segment {
                text: "Hello world".to_string(),
                start: 0,
                duration: 1500,
            },
            Segment {
                text: "This is a test".to_string(),
                start: 61000,
                duration: 2000,
            },
        ]
    }

    #[test]
    fn test_render_text() {
        assert_eq!(render_text(&sample()), "Hello world\nThis is a test");
    }

    #[test]
    fn test_render_text_empty() {
        assert_eq!(render_text(&[]), "");
    }

    #[test]
    fn test_render_timestamped() {
        assert_eq!(
            render_timestamped(&sample()),
            "00:00 Hello world\n01:01 This is a test"
        );
    }

    #[test]
    fn test_render_json_field_names() {
        let value: serde_json::Value = serde_json::from_str(&render_json(&sample())).unwrap();
        assert_eq!(value[1]["start"], 61000);
        assert_eq!(value[1]["duration"], 2000);
        assert_eq!(value[0]["text"], "Hello world");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "00:00");
        assert_eq!(format_timestamp(1000), "00:01");
        assert_eq!(format_timestamp(28960), "00:28");
        assert_eq!(format_timestamp(60000), "01:00");
        assert_eq!(format_timestamp(148840), "02:28");
        assert_eq!(format_timestamp(3600000), "60:00");
    }
}
