use std::time::Duration;

use super::ConfigError;

/// Parse a duration such as `"1h"`, `"7d"`, `"250ms"` or `"1h 30m"`.
///
/// A bare integer is read as seconds.
pub fn parse_duration(input: &str) -> Result<Duration, ConfigError> {
    let trimmed = input.trim();
    if let Ok(seconds) = trimmed.parse::<u64>() {
        return Ok(Duration::from_secs(seconds));
    }

    humantime::parse_duration(trimmed).map_err(|e| {
        ConfigError::InvalidDuration(format!("{input}: {e}"))
    })
}
