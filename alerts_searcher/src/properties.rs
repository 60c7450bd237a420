//! Minimal reader/writer for Java-style `.properties` text.
//!
//! Both the job configuration and the searcher state file use this format.
//! Supported: `key=value` and `key:value` pairs, `#` and `!` comment lines,
//! whitespace around keys and values, and a trailing `\` joining the next
//! line. Unicode escapes are not interpreted.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use crate::error::Result;

/// Flat string-keyed configuration, loaded once and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses properties text. Later duplicates of a key win.
    pub fn parse(text: &str) -> Self {
        let mut entries = BTreeMap::new();
        let mut pending = String::new();

        for raw in text.lines() {
            let line = raw.trim_start();
            let is_comment = line.starts_with('#') || line.starts_with('!');
            if pending.is_empty() && (line.is_empty() || is_comment) {
                continue;
            }

            if let Some(continued) = line.strip_suffix('\\') {
                pending.push_str(continued);
                continue;
            }
            pending.push_str(line);

            if let Some((key, value)) = split_pair(&pending) {
                entries.insert(key.to_string(), value.to_string());
            }
            pending.clear();
        }

        if let Some((key, value)) = split_pair(&pending) {
            entries.insert(key.to_string(), value.to_string());
        }

        Self { entries }
    }

    /// Reads and parses a properties file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(Self::parse(&content))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Value for `key`, or `default` when the key is absent.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Renders the entries with each comment as a leading `#` line.
    pub fn render(&self, comments: &[&str]) -> String {
        let mut out = String::new();
        for comment in comments {
            let _ = writeln!(out, "#{comment}");
        }
        for (key, value) in &self.entries {
            let _ = writeln!(out, "{key}={value}");
        }
        out
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn split_pair(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match line.find(['=', ':']) {
        Some(idx) => Some((line[..idx].trim_end(), line[idx + 1..].trim_start())),
        // A bare key maps to an empty value
        None => Some((line, "")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pairs_and_skips_comments() {
        let props = Properties::parse(
            "# comment\n! also a comment\n\nhomeDir = /var/opensoc/\nkafkaTopicName:alerts\n",
        );
        assert_eq!(props.get("homeDir"), Some("/var/opensoc/"));
        assert_eq!(props.get("kafkaTopicName"), Some("alerts"));
        assert_eq!(props.get("comment"), None);
    }

    #[test]
    fn joins_continuation_lines() {
        let props = Properties::parse("hosts=a,\\\n    b,\\\n    c\nother=1\n");
        assert_eq!(props.get("hosts"), Some("a,b,c"));
        assert_eq!(props.get("other"), Some("1"));
    }

    #[test]
    fn later_duplicate_wins_and_bare_key_is_empty() {
        let props = Properties::parse("a=1\na=2\nflag\n");
        assert_eq!(props.get("a"), Some("2"));
        assert_eq!(props.get("flag"), Some(""));
    }

    #[test]
    fn value_keeps_later_separators() {
        let props = Properties::parse("url=http://localhost:9200/a=b");
        assert_eq!(props.get("url"), Some("http://localhost:9200/a=b"));
    }

    #[test]
    fn render_then_parse_preserves_entries() {
        let mut props = Properties::new();
        props.set("lastSearchTime", "1500");
        let text = props.render(&["", "Mon Jan 01 00:00:00 UTC 2024"]);
        assert!(text.starts_with("#\n#Mon Jan 01"));
        assert_eq!(Properties::parse(&text), props);
    }
}
