//! Logger port and its implementations.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    /// Trace level.
    Trace = 0,
    /// Debug level.
    Debug = 1,
    /// Info level.
    #[default]
    Info = 2,
    /// Warning level.
    Warn = 3,
    /// Error level.
    Error = 4,
    /// Off (no logging).
    Off = 5,
}

impl LogLevel {
    fn label(self) -> Option<&'static str> {
        match self {
            LogLevel::Trace => Some("TRACE"),
            LogLevel::Debug => Some("DEBUG"),
            LogLevel::Info => Some("INFO"),
            LogLevel::Warn => Some("WARN"),
            LogLevel::Error => Some("ERROR"),
            LogLevel::Off => None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level.
    pub level: LogLevel,
    /// Include timestamps.
    pub include_timestamps: bool,
    /// Redact credentials from messages and context.
    pub redact_sensitive: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            include_timestamps: true,
            redact_sensitive: true,
        }
    }
}

impl LogConfig {
    /// Creates a new log configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the log level.
    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Disables sensitive data redaction.
    pub fn no_redact(mut self) -> Self {
        self.redact_sensitive = false;
        self
    }
}

/// Logger port.
///
/// UI code and interceptors log through this trait; the application picks
/// the adapter.
pub trait Logger: Send + Sync {
    /// Logs a message at the specified level.
    fn log(&self, level: LogLevel, message: &str, context: Option<&HashMap<String, String>>);

    /// Logs at debug level.
    fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message, None);
    }

    /// Logs at info level.
    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message, None);
    }

    /// Logs at warning level.
    fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message, None);
    }

    /// Logs at error level.
    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message, None);
    }
}

fn redaction_patterns() -> &'static [(Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (r"Bearer [A-Za-z0-9._~+/=-]+", "Bearer ***"),
            (r"(?i)api[_-]?key[=:]\s*[^\s,}]+", "api_key=***"),
            (r"(?i)token[=:]\s*[^\s,}]+", "token=***"),
        ]
        .into_iter()
        .filter_map(|(pattern, replacement)| Regex::new(pattern).ok().map(|re| (re, replacement)))
        .collect()
    })
}

/// Redacts bearer tokens and key/token assignments from text.
pub fn redact(text: &str) -> String {
    let mut result = text.to_string();
    for (re, replacement) in redaction_patterns() {
        result = re.replace_all(&result, *replacement).into_owned();
    }
    result
}

/// Writes formatted lines to stdout / stderr.
pub struct ConsoleLogger {
    config: LogConfig,
}

impl ConsoleLogger {
    /// Creates a new console logger.
    pub fn new(config: LogConfig) -> Self {
        Self { config }
    }

    /// Formats a line, or returns `None` when the level is filtered out.
    pub fn format(
        &self,
        level: LogLevel,
        message: &str,
        context: Option<&HashMap<String, String>>,
    ) -> Option<String> {
        if level < self.config.level {
            return None;
        }
        let label = level.label()?;

        let mut parts = Vec::new();

        if self.config.include_timestamps {
            parts.push(format!("[{}]", chrono::Utc::now().to_rfc3339()));
        }

        parts.push(format!("[{}]", label));

        if self.config.redact_sensitive {
            parts.push(redact(message));
        } else {
            parts.push(message.to_string());
        }

        if let Some(ctx) = context {
            let shown: HashMap<&String, String> = ctx
                .iter()
                .map(|(k, v)| {
                    let lower = k.to_ascii_lowercase();
                    let sensitive = lower.contains("key")
                        || lower.contains("token")
                        || lower.contains("auth");
                    let v = if self.config.redact_sensitive && sensitive {
                        "***".to_string()
                    } else {
                        v.clone()
                    };
                    (k, v)
                })
                .collect();

            if let Ok(json) = serde_json::to_string(&shown) {
                parts.push(json);
            }
        }

        Some(parts.join(" "))
    }
}

impl Logger for ConsoleLogger {
    fn log(&self, level: LogLevel, message: &str, context: Option<&HashMap<String, String>>) {
        let Some(output) = self.format(level, message, context) else {
            return;
        };

        match level {
            LogLevel::Error | LogLevel::Warn => eprintln!("{}", output),
            _ => println!("{}", output),
        }
    }
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new(LogConfig::default())
    }
}

impl std::fmt::Debug for ConsoleLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleLogger")
            .field("config", &self.config)
            .finish()
    }
}

/// Forwards to `tracing` events, redacting messages first.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str, context: Option<&HashMap<String, String>>) {
        let message = redact(message);
        let context = context.map(|c| format!("{:?}", c.keys().collect::<Vec<_>>()));
        match level {
            LogLevel::Trace => tracing::trace!(context = ?context, "{}", message),
            LogLevel::Debug => tracing::debug!(context = ?context, "{}", message),
            LogLevel::Info => tracing::info!(context = ?context, "{}", message),
            LogLevel::Warn => tracing::warn!(context = ?context, "{}", message),
            LogLevel::Error => tracing::error!(context = ?context, "{}", message),
            LogLevel::Off => {}
        }
    }
}

/// No-op logger that discards all messages.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn log(&self, _level: LogLevel, _message: &str, _context: Option<&HashMap<String, String>>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Error < LogLevel::Off);
    }

    #[test]
    fn test_redaction() {
        let redacted = redact("Authorization: Bearer abc.def-123");
        assert!(!redacted.contains("abc.def-123"));
        assert!(redacted.contains("Bearer ***"));

        let redacted = redact("url?api_key=secret123&x=1");
        assert!(!redacted.contains("secret123"));
    }

    #[test]
    fn test_format_filters_by_level() {
        let logger = ConsoleLogger::new(LogConfig::new().level(LogLevel::Warn));
        assert!(logger.format(LogLevel::Info, "hidden", None).is_none());
        assert!(logger.format(LogLevel::Error, "shown", None).is_some());
    }

    #[test]
    fn test_format_redacts_context() {
        let logger = ConsoleLogger::new(LogConfig {
            include_timestamps: false,
            ..LogConfig::default()
        });
        let mut ctx = HashMap::new();
        ctx.insert("auth_token".to_string(), "s3cr3t".to_string());
        ctx.insert("path".to_string(), "/orders".to_string());

        let line = logger.format(LogLevel::Info, "sent", Some(&ctx)).unwrap();
        assert!(line.starts_with("[INFO] sent"));
        assert!(!line.contains("s3cr3t"));
        assert!(line.contains("/orders"));
    }

    #[test]
    fn test_no_redact() {
        let logger = ConsoleLogger::new(LogConfig {
            include_timestamps: false,
            ..LogConfig::new().no_redact()
        });
        let line = logger
            .format(LogLevel::Info, "Bearer visible", None)
            .unwrap();
        assert!(line.contains("Bearer visible"));
    }
}
