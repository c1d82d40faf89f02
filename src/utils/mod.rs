//! Shared helpers: authentication, logging setup, validation, and a few
//! small formatting utilities.

pub mod auth;
pub mod logging;
pub mod validation;

/// Generate a unique client ID for an SSE connection
pub fn generate_client_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Generate a timestamp in RFC 3339 format
pub fn generate_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Format duration as human-readable string
pub fn format_duration(duration: std::time::Duration) -> String {
    let total_seconds = duration.as_secs();

    if total_seconds < 60 {
        format!("{}s", total_seconds)
    } else if total_seconds < 3600 {
        let minutes = total_seconds / 60;
        let seconds = total_seconds % 60;
        format!("{}m {}s", minutes, seconds)
    } else {
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;
        format!("{}h {}m {}s", hours, minutes, seconds)
    }
}

/// Truncate a string to a maximum length with ellipsis, respecting char
/// boundaries
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let mut end = max_len - 3;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}
