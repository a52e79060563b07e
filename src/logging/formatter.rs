use std::io::{self, Write};

use chrono::{DateTime, FixedOffset, SecondsFormat};
use owo_colors::{AnsiColors, OwoColorize};
use serde::Serialize;

use crate::verbosity::Verbosity;

/// Where a log call was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    pub file: &'static str,
    pub line: u32,
    /// Fully-qualified path of the calling function; empty when unknown.
    pub function: &'static str,
}

impl CallSite {
    pub const fn new(file: &'static str, line: u32, function: &'static str) -> Self {
        Self {
            file,
            line,
            function,
        }
    }
}

/// One log event, alive only while it is being formatted.
#[derive(Debug, Clone)]
pub struct Record<'a> {
    pub time: DateTime<FixedOffset>,
    pub level: Verbosity,
    pub module: &'a str,
    pub call_site: CallSite,
    pub message: &'a str,
}

pub trait Formatter: Send + Sync {
    /// Writes one complete line for `record`, including the trailing newline.
    fn format(&self, record: &Record<'_>, out: &mut dyn Write) -> io::Result<()>;
}

/// `15:04:05.000 WARNING: message`, optionally coloured by level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextFormatter {
    pub colour: bool,
}

impl Formatter for TextFormatter {
    fn format(&self, record: &Record<'_>, out: &mut dyn Write) -> io::Result<()> {
        let line = format!(
            "{} {:>7}: {}",
            record.time.format("%H:%M:%S%.3f"),
            record.level.label(),
            record.message
        );
        match level_colour(record.level) {
            Some(colour) if self.colour => writeln!(out, "{}", line.color(colour)),
            _ => writeln!(out, "{}", line),
        }
    }
}

// Info lines stay in the terminal's own colour.
fn level_colour(level: Verbosity) -> Option<AnsiColors> {
    match level {
        Verbosity::Critical => Some(AnsiColors::Magenta),
        Verbosity::Error => Some(AnsiColors::Red),
        Verbosity::Warning => Some(AnsiColors::Yellow),
        Verbosity::Notice => Some(AnsiColors::Green),
        Verbosity::Info => None,
        Verbosity::Debug => Some(AnsiColors::Cyan),
    }
}

/// One JSON object per line. External tooling parses these, so the field
/// names, their order and the timestamp layout must stay as they are.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

#[derive(Serialize)]
struct JsonEntry<'a> {
    file: String,
    func: &'a str,
    level: &'static str,
    module: &'a str,
    msg: &'a str,
    time: String,
}

impl Formatter for JsonFormatter {
    fn format(&self, record: &Record<'_>, out: &mut dyn Write) -> io::Result<()> {
        let entry = JsonEntry {
            file: format!("{}:{}", record.call_site.file, record.call_site.line),
            func: record.call_site.function,
            level: record.level.name(),
            module: record.module,
            msg: record.message,
            // 2006-01-02T15:04:05.000Z, or with a +07:00 style offset outside UTC
            time: record.time.to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        serde_json::to_writer(&mut *out, &entry)?;
        out.write_all(b"\n")
    }
}

/// Forcing colour on wins over forcing it off; otherwise colour only terminals.
pub fn should_colour(is_terminal: bool, force_colour: bool, force_no_colour: bool) -> bool {
    if force_colour {
        true
    } else if force_no_colour {
        false
    } else {
        is_terminal
    }
}

pub fn formatter(structured: bool, colour: bool) -> Box<dyn Formatter> {
    if structured {
        Box::new(JsonFormatter)
    } else {
        Box::new(TextFormatter { colour })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record<'a>(time: DateTime<FixedOffset>, level: Verbosity, message: &'a str) -> Record<'a> {
        Record {
            time,
            level,
            module: "test_module",
            call_site: CallSite::new("src/logging/formatter.rs", 42, "cli_init::logging::tests::f"),
            message,
        }
    }

    fn epoch() -> DateTime<FixedOffset> {
        chrono::Utc.timestamp_opt(0, 0).unwrap().fixed_offset()
    }

    fn render(formatter: &dyn Formatter, record: &Record<'_>) -> String {
        let mut out = Vec::new();
        formatter.format(record, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn json_layout() {
        let line = render(&JsonFormatter, &record(epoch(), Verbosity::Info, "hello world"));
        assert_eq!(
            line,
            concat!(
                r#"{"file":"src/logging/formatter.rs:42","func":"cli_init::logging::tests::f","#,
                r#""level":"info","module":"test_module","msg":"hello world","#,
                r#""time":"1970-01-01T00:00:00.000Z"}"#,
                "\n"
            )
        );
    }

    #[test]
    fn json_time_keeps_non_utc_offset() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let time = offset.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let line = render(&JsonFormatter, &record(time, Verbosity::Debug, "x"));
        assert!(line.contains(r#""time":"2024-05-06T07:08:09.000+02:00""#), "{line}");
        assert!(line.contains(r#""level":"debug""#));
    }

    #[test]
    fn json_escapes_messages() {
        let line = render(&JsonFormatter, &record(epoch(), Verbosity::Error, "a \"quoted\"\nline"));
        let value: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(value["msg"], "a \"quoted\"\nline");
        assert_eq!(line.matches('\n').count(), 1);
    }

    #[test]
    fn text_layout_pads_level() {
        let f = TextFormatter { colour: false };
        assert_eq!(
            render(&f, &record(epoch(), Verbosity::Info, "hello")),
            "00:00:00.000    INFO: hello\n"
        );
        assert_eq!(
            render(&f, &record(epoch(), Verbosity::Critical, "boom")),
            "00:00:00.000 CRITICAL: boom\n"
        );
    }

    #[test]
    fn coloured_text_is_wrapped_in_escapes() {
        let f = TextFormatter { colour: true };
        let line = render(&f, &record(epoch(), Verbosity::Error, "bad"));
        assert!(line.starts_with("\u{1b}[31m"), "{line:?}");
        assert!(line.contains("ERROR: bad"));
        assert!(line.trim_end().ends_with('m'));
    }

    #[test]
    fn coloured_info_has_no_escapes() {
        let f = TextFormatter { colour: true };
        assert_eq!(
            render(&f, &record(epoch(), Verbosity::Info, "plain")),
            "00:00:00.000    INFO: plain\n"
        );
    }

    #[test]
    fn colour_overrides() {
        assert!(should_colour(false, true, false));
        assert!(should_colour(false, true, true));
        assert!(!should_colour(true, false, true));
        assert!(should_colour(true, false, false));
        assert!(!should_colour(false, false, false));
    }
}
