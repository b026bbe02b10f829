//! Time formatting helpers

/// Render milliseconds as `m:ss` for log lines
pub fn format_millis(millis: i64) -> String {
    if millis < 0 {
        return "--:--".to_string();
    }
    let total_secs = millis / 1000;
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}
