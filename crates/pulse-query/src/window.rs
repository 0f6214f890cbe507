// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::error::QueryError;
use chrono::Duration;

/// Parse `"Ns"|"Nm"|"Nh"|"Nd"`, with an optional leading `"last "`.
pub fn parse_window(expr: &str) -> Result<Duration, QueryError> {
    let trimmed = expr.trim();
    let body = trimmed.strip_prefix("last ").unwrap_or(trimmed);
    let (digits, unit) = body.split_at(body.len().saturating_sub(1));
    let amount: i64 = digits
        .parse()
        .map_err(|_| QueryError::InvalidWindow(expr.to_string()))?;
    let duration = match unit {
        "s" => Duration::seconds(amount),
        "m" => Duration::minutes(amount),
        "h" => Duration::hours(amount),
        "d" => Duration::days(amount),
        _ => return Err(QueryError::InvalidWindow(expr.to_string())),
    };
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_unit() {
        assert_eq!(parse_window("30s").unwrap(), Duration::seconds(30));
        assert_eq!(parse_window("10m").unwrap(), Duration::minutes(10));
        assert_eq!(parse_window("1h").unwrap(), Duration::hours(1));
        assert_eq!(parse_window("2d").unwrap(), Duration::days(2));
    }

    #[test]
    fn accepts_last_prefix() {
        assert_eq!(parse_window("last 1h").unwrap(), Duration::hours(1));
    }

    #[test]
    fn rejects_unknown_unit() {
        assert!(parse_window("5w").is_err());
    }

    #[test]
    fn rejects_non_numeric_amount() {
        assert!(parse_window("xh").is_err());
    }
}
