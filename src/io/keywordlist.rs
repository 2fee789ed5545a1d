//! Flat keyword list used to persist model state.
//!
//! Nesting is expressed with dotted key prefixes (`orbit[3].position`,
//! `solver.max_iterations`). The text form is one `key: value` pair per line,
//! keys sorted. Floats are written in Rust's shortest round-trip notation, so a
//! save/load cycle restores them bit for bit.

use crate::types::{SarError, SarResult};
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keywordlist {
    entries: BTreeMap<String, String>,
}

/// Join a prefix and a key name
pub fn key(prefix: &str, name: &str) -> String {
    format!("{}{}", prefix, name)
}

impl Keywordlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn add<V: ToString>(&mut self, key: impl Into<String>, value: V) {
        self.entries.insert(key.into(), value.to_string());
    }

    pub fn add_time(&mut self, key: impl Into<String>, time: DateTime<Utc>) {
        self.add(key, time.to_rfc3339_opts(SecondsFormat::Nanos, true));
    }

    pub fn add_list(&mut self, key: impl Into<String>, values: &[f64]) {
        let text: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        self.add(key, text.join(" "));
    }

    pub fn find(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove every key starting with `prefix`
    pub fn remove_prefix(&mut self, prefix: &str) {
        self.entries.retain(|k, _| !k.starts_with(prefix));
    }

    fn require(&self, key: &str) -> SarResult<&str> {
        self.find(key)
            .ok_or_else(|| SarError::MissingKeyword(key.to_string()))
    }

    /// Parse the value of a required keyword
    pub fn get<T>(&self, key: &str) -> SarResult<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let value = self.require(key)?;
        value.trim().parse().map_err(|e: T::Err| SarError::Keyword {
            key: key.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })
    }

    /// Parse an optional keyword, falling back to `default` when absent
    pub fn get_or<T>(&self, key: &str, default: T) -> SarResult<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        if self.contains(key) {
            self.get(key)
        } else {
            Ok(default)
        }
    }

    pub fn get_time(&self, key: &str) -> SarResult<DateTime<Utc>> {
        let value = self.require(key)?;
        DateTime::parse_from_rfc3339(value.trim())
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| SarError::Keyword {
                key: key.to_string(),
                value: value.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn get_list(&self, key: &str) -> SarResult<Vec<f64>> {
        let value = self.require(key)?;
        value
            .split_whitespace()
            .map(|item| {
                item.parse::<f64>().map_err(|e| SarError::Keyword {
                    key: key.to_string(),
                    value: value.to_string(),
                    reason: e.to_string(),
                })
            })
            .collect()
    }

    /// Fixed-size list, e.g. a 3-vector
    pub fn get_array<const N: usize>(&self, key: &str) -> SarResult<[f64; N]> {
        let values = self.get_list(key)?;
        let count = values.len();
        values.try_into().map_err(|_| SarError::Keyword {
            key: key.to_string(),
            value: self.find(key).unwrap_or_default().to_string(),
            reason: format!("expected {} values, found {}", N, count),
        })
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> SarResult<()> {
        for (k, v) in &self.entries {
            writeln!(writer, "{}: {}", k, v)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Parse `key: value` lines; blank lines and `//` comments are skipped
    pub fn read_from<R: BufRead>(reader: R) -> SarResult<Self> {
        let mut list = Self::new();
        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with("//") {
                continue;
            }
            let (k, v) = trimmed.split_once(':').ok_or_else(|| SarError::Keyword {
                key: format!("line {}", number + 1),
                value: trimmed.to_string(),
                reason: "expected 'key: value'".to_string(),
            })?;
            list.add(k.trim(), v.trim());
        }
        Ok(list)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> SarResult<()> {
        log::debug!("Writing keyword list to {}", path.as_ref().display());
        let file = std::fs::File::create(path)?;
        self.write_to(std::io::BufWriter::new(file))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> SarResult<Self> {
        log::debug!("Reading keyword list from {}", path.as_ref().display());
        let file = std::fs::File::open(path)?;
        Self::read_from(BufReader::new(file))
    }
}

impl fmt::Display for Keywordlist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, v) in &self.entries {
            writeln!(f, "{}: {}", k, v)?;
        }
        Ok(())
    }
}

impl FromStr for Keywordlist {
    type Err = SarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::read_from(s.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_text_round_trip_is_exact() {
        let mut kwl = Keywordlist::new();
        let t = Utc.with_ymd_and_hms(2020, 1, 3, 17, 8, 15).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        kwl.add("sensor.prf", 1686.0674_f64);
        kwl.add("sensor.tiny", 1.0e-17_f64 / 3.0);
        kwl.add_time("sensor.azimuth_start", t);
        kwl.add_list("orbit[0].position", &[0.1 + 0.2, -6_378_137.25, 1e300]);

        let reloaded: Keywordlist = kwl.to_string().parse().unwrap();
        assert_eq!(reloaded, kwl);
        assert_eq!(reloaded.get::<f64>("sensor.tiny").unwrap(), 1.0e-17 / 3.0);
        assert_eq!(reloaded.get_time("sensor.azimuth_start").unwrap(), t);
        assert_eq!(
            reloaded.get_array::<3>("orbit[0].position").unwrap(),
            [0.1 + 0.2, -6_378_137.25, 1e300]
        );
    }

    #[test]
    fn test_missing_and_malformed_keywords() {
        let mut kwl = Keywordlist::new();
        kwl.add("a", "not-a-number");
        assert!(matches!(kwl.get::<f64>("b"), Err(SarError::MissingKeyword(_))));
        assert!(matches!(kwl.get::<f64>("a"), Err(SarError::Keyword { .. })));
        assert_eq!(kwl.get_or::<f64>("b", 2.5).unwrap(), 2.5);
        assert!(kwl.get_array::<3>("a").is_err());
    }

    #[test]
    fn test_comments_and_remove_prefix() {
        let mut kwl: Keywordlist = "// header\n\ngcp.count: 2\ngcp[0].line: 1\nsolver.strict: true\n"
            .parse()
            .unwrap();
        assert_eq!(kwl.len(), 3);
        kwl.remove_prefix("gcp");
        assert_eq!(kwl.len(), 1);
        assert!(kwl.get::<bool>("solver.strict").unwrap());
    }
}
