//! Access Log Decoding
//!
//! Turns raw nginx access log lines into structured records. The decoder is
//! driven by the same `$variable` format strings nginx uses for `log_format`,
//! compiled once into an anchored regex with one named capture per variable.

use anyhow::{Context, Result};
use regex::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::warn;

/// The combined log format, nginx's de-facto default for access logs.
pub const COMBINED_FORMAT: &str = "$remote_addr - $remote_user [$time_local] \"$request\" $status $body_bytes_sent \"$http_referer\" \"$http_user_agent\"";

/// One decoded access log row. Only the fields the replay needs are kept;
/// any other variable in the format still has to match, it is just dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogRecord {
    pub time_local: String,
    pub request: String,
    pub status: String,
    pub http_user_agent: String,
}

/// A compiled log format.
///
/// `$name` placeholders become non-greedy named groups; everything else is
/// matched literally. Variables the format does not mention come back as
/// empty strings in the record.
pub struct LogFormat {
    pattern: Regex,
}

impl LogFormat {
    pub fn compile(format: &str) -> Result<Self> {
        let mut pattern = String::with_capacity(format.len() * 2);
        pattern.push('^');

        let bytes = format.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'$' {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len()
                    && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_')
                {
                    end += 1;
                }
                if end > start {
                    pattern.push_str("(?P<");
                    pattern.push_str(&format[start..end]);
                    pattern.push_str(">.*?)");
                    i = end;
                    continue;
                }
            }
            let ch = format[i..].chars().next().unwrap();
            pattern.push_str(&regex::escape(&ch.to_string()));
            i += ch.len_utf8();
        }
        pattern.push('$');

        let pattern = Regex::new(&pattern)
            .with_context(|| format!("invalid log format: {}", format))?;
        Ok(Self { pattern })
    }

    /// Decode one line. None when the line does not match the format.
    pub fn parse(&self, line: &str) -> Option<LogRecord> {
        let caps = self.pattern.captures(line)?;
        let field = |name: &str| {
            caps.name(name)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        };
        Some(LogRecord {
            time_local: field("time_local"),
            request: field("request"),
            status: field("status"),
            http_user_agent: field("http_user_agent"),
        })
    }
}

/// Read and decode a whole access log. Lines that do not match the format
/// are skipped with a single warning; an unreadable file is an error.
pub fn read_records(path: &Path, format: &LogFormat) -> Result<Vec<LogRecord>> {
    let file =
        File::open(path).with_context(|| format!("cannot open log file {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    let mut unmatched = 0usize;
    for line in reader.lines() {
        let line = line.with_context(|| format!("failed reading {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        match format.parse(&line) {
            Some(record) => records.push(record),
            None => unmatched += 1,
        }
    }
    if unmatched > 0 {
        warn!(
            unmatched,
            "line(s) did not match the log format and were skipped"
        );
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"203.0.113.7 - frank [10/Oct/2000:13:55:36 -0700] "GET /apache_pb.gif?x=1 HTTP/1.0" 200 2326 "http://example.com/start.html" "Mozilla/4.08 [en] (Win98; I ;Nav)""#;

    #[test]
    fn test_combined_format_parses_sample_line() {
        let format = LogFormat::compile(COMBINED_FORMAT).unwrap();
        let record = format.parse(SAMPLE).expect("sample line should match");
        assert_eq!(record.time_local, "10/Oct/2000:13:55:36 -0700");
        assert_eq!(record.request, "GET /apache_pb.gif?x=1 HTTP/1.0");
        assert_eq!(record.status, "200");
        assert_eq!(record.http_user_agent, "Mozilla/4.08 [en] (Win98; I ;Nav)");
    }

    #[test]
    fn test_non_matching_line_yields_none() {
        let format = LogFormat::compile(COMBINED_FORMAT).unwrap();
        assert!(format.parse("not an access log line").is_none());
    }

    #[test]
    fn test_custom_format() {
        let format = LogFormat::compile("[$time_local] \"$request\" $status").unwrap();
        let record = format
            .parse("[01/Jan/2024:00:00:00 +0000] \"POST /login HTTP/1.1\" 401")
            .unwrap();
        assert_eq!(record.time_local, "01/Jan/2024:00:00:00 +0000");
        assert_eq!(record.request, "POST /login HTTP/1.1");
        assert_eq!(record.status, "401");
        // Variables absent from the format stay empty.
        assert_eq!(record.http_user_agent, "");
    }

    #[test]
    fn test_read_records_skips_unmatched_lines() {
        let format = LogFormat::compile(COMBINED_FORMAT).unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", SAMPLE).unwrap();
        writeln!(file, "garbage line").unwrap();
        writeln!(file, "{}", SAMPLE).unwrap();
        writeln!(file).unwrap();

        let records = read_records(file.path(), &format).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_read_records_missing_file_errors() {
        let format = LogFormat::compile(COMBINED_FORMAT).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no-such.log");
        assert!(read_records(&missing, &format).is_err());
    }
}
