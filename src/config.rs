use std::time::Duration;

use anyhow::Context;
use thiserror::Error;

/// Environment variable holding the artificial response delay.
pub const LATENCY_ENV: &str = "COFFEESHOP_LATENCY";
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(100);
pub const DEFAULT_PORT: u16 = 8088;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid duration {0:?}")]
    InvalidDuration(String),

    #[error("negative duration {0:?}")]
    NegativeDuration(String),
}

/// Process-level settings read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub latency: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: match lookup("PORT") {
                Some(port) => port.parse().context("PORT must be a valid number")?,
                None => DEFAULT_PORT,
            },
            latency: match lookup(LATENCY_ENV) {
                Some(expr) => parse_duration(&expr).with_context(|| {
                    format!("{LATENCY_ENV} must be a duration such as 250ms or 10s")
                })?,
                None => DEFAULT_LATENCY,
            },
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Settings fixed for the lifetime of one server instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Pause applied before every request reaches its handler.
    pub latency: Duration,
    /// Upper bound on total handling time, delay included.
    pub request_timeout: Duration,
    /// Longest a connection read may stall.
    pub read_timeout: Duration,
    /// Longest a connection write may stall.
    pub write_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            latency: DEFAULT_LATENCY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            read_timeout: DEFAULT_IO_TIMEOUT,
            write_timeout: DEFAULT_IO_TIMEOUT,
        }
    }
}

impl ServerConfig {
    /// Override the latency from a duration expression such as `"250ms"`.
    pub fn with_latency(self, expr: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            latency: parse_duration(expr)?,
            ..self
        })
    }
}

fn unit_nanos(unit: &str) -> Option<u128> {
    Some(match unit {
        "ns" => 1,
        "us" | "µs" | "μs" => 1_000,
        "ms" => 1_000_000,
        "s" => 1_000_000_000,
        "m" => 60 * 1_000_000_000,
        "h" => 3_600 * 1_000_000_000,
        _ => return None,
    })
}

/// Parse a duration expression: one or more `<decimal><unit>` terms, e.g.
/// `"100ms"`, `"1.5s"`, `"1h30m"`. A bare `"0"` is allowed; any other
/// number needs a unit. Negative values are rejected.
pub fn parse_duration(expr: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::InvalidDuration(expr.to_string());

    let (negative, mut rest) = match expr.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, expr.strip_prefix('+').unwrap_or(expr)),
    };
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let int_len = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let (int_part, tail) = rest.split_at(int_len);
        let (frac_part, tail) = match tail.strip_prefix('.') {
            Some(after) => {
                let len = after.find(|c: char| !c.is_ascii_digit()).unwrap_or(after.len());
                after.split_at(len)
            }
            None => ("", tail),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        let scale = unit_nanos(unit).ok_or_else(invalid)?;

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| invalid())?
        };
        let mut nanos = whole.checked_mul(scale).ok_or_else(invalid)?;
        if !frac_part.is_empty() {
            // digits past nanosecond precision cannot change the result
            let digits = &frac_part[..frac_part.len().min(18)];
            let frac: u128 = digits.parse().map_err(|_| invalid())?;
            nanos += frac * scale / 10u128.pow(digits.len() as u32);
        }
        total = total.checked_add(nanos).ok_or_else(invalid)?;
        rest = tail;
    }

    let nanos = u64::try_from(total).map_err(|_| invalid())?;
    if negative && nanos > 0 {
        return Err(ConfigError::NegativeDuration(expr.to_string()));
    }
    Ok(Duration::from_nanos(nanos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    // ── Duration expressions ──────────────────────────────────────────────────

    #[test]
    fn parses_single_terms() {
        assert_eq!(parse_duration("100ms").unwrap(), Duration::from_millis(100));
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("150s").unwrap(), Duration::from_secs(150));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3_600));
        assert_eq!(parse_duration("750us").unwrap(), Duration::from_micros(750));
        assert_eq!(parse_duration("5µs").unwrap(), Duration::from_micros(5));
        assert_eq!(parse_duration("42ns").unwrap(), Duration::from_nanos(42));
    }

    #[test]
    fn parses_zero() {
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("0ms").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("-0s").unwrap(), Duration::ZERO);
    }

    #[test]
    fn parses_fractions_and_compound_terms() {
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1_500));
        assert_eq!(parse_duration(".5s").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5_400));
        assert_eq!(parse_duration("1s250ms").unwrap(), Duration::from_millis(1_250));
        assert_eq!(parse_duration("+3s").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn rejects_malformed_expressions() {
        for expr in ["", "abc", "10", "ms", "10x", "1.2.3s", ".s", "s10", "10 s", "-"] {
            assert_eq!(
                parse_duration(expr),
                Err(ConfigError::InvalidDuration(expr.to_string())),
                "{expr:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_negative_durations() {
        assert_eq!(
            parse_duration("-1s"),
            Err(ConfigError::NegativeDuration("-1s".to_string()))
        );
    }

    #[test]
    fn rejects_overflow() {
        assert!(parse_duration("99999999999999999999h").is_err());
    }

    // ── Server config ─────────────────────────────────────────────────────────

    #[test]
    fn server_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.latency, Duration::from_millis(100));
        assert_eq!(config.request_timeout, Duration::from_secs(120));
        assert_eq!(config.read_timeout, Duration::from_secs(30));
        assert_eq!(config.write_timeout, Duration::from_secs(30));
    }

    #[test]
    fn with_latency_overrides_only_latency() {
        let config = ServerConfig::default().with_latency("250ms").unwrap();
        assert_eq!(config.latency, Duration::from_millis(250));
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
    }

    #[test]
    fn with_latency_rejects_bad_expression() {
        assert!(ServerConfig::default().with_latency("soon").is_err());
    }

    // ── Process config ────────────────────────────────────────────────────────

    #[test]
    fn unset_latency_matches_server_default() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.latency, ServerConfig::default().latency);
        assert_eq!(parse_duration("100ms").unwrap(), DEFAULT_LATENCY);
    }

    #[test]
    fn env_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.latency, Duration::from_millis(100));
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.addr(), "0.0.0.0:8088");
    }

    #[test]
    fn env_overrides() {
        let config = Config::from_lookup(lookup(&[
            (LATENCY_ENV, "10s"),
            ("HOST", "127.0.0.1"),
            ("PORT", "9000"),
        ]))
        .unwrap();
        assert_eq!(config.latency, Duration::from_secs(10));
        assert_eq!(config.addr(), "127.0.0.1:9000");
    }

    #[test]
    fn invalid_latency_fails_startup() {
        let err = Config::from_lookup(lookup(&[(LATENCY_ENV, "fast")])).unwrap_err();
        assert!(err.to_string().contains(LATENCY_ENV));
    }

    #[test]
    fn invalid_port_fails_startup() {
        assert!(Config::from_lookup(lookup(&[("PORT", "http")])).is_err());
    }
}
