// src/version.rs

//! Plugin version handling
//!
//! Plugin versions are dotted-numeric (`2`, `1.0`, `1.2.3.4`) with a special
//! `latest` marker that compares newer than every concrete version.
//! Comparison is numeric segment-wise, never lexicographic: `1.10` is newer
//! than `1.9`, and `1.0` equals `1.0.0`.

use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

const LATEST: &str = "latest";

/// A parsed plugin version
#[derive(Debug, Clone)]
pub struct PluginVersion {
    raw: String,
    segments: Vec<u64>,
    latest: bool,
}

impl PluginVersion {
    /// Parse a dotted-numeric version string or the `latest` marker
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::MalformedSpec("empty version".to_string()));
        }
        if s == LATEST {
            return Ok(Self {
                raw: s.to_string(),
                segments: Vec::new(),
                latest: true,
            });
        }

        let mut segments = Vec::new();
        for part in s.split('.') {
            let n = part
                .parse::<u64>()
                .map_err(|_| Error::MalformedSpec(format!("unparseable version '{s}'")))?;
            segments.push(n);
        }

        Ok(Self {
            raw: s.to_string(),
            segments,
            latest: false,
        })
    }

    /// The `latest` marker version
    pub fn latest() -> Self {
        Self {
            raw: LATEST.to_string(),
            segments: Vec::new(),
            latest: true,
        }
    }

    /// Version `0`, used by the synthetic root record
    pub fn zero() -> Self {
        Self {
            raw: "0".to_string(),
            segments: vec![0],
            latest: false,
        }
    }

    pub fn is_latest(&self) -> bool {
        self.latest
    }

    /// Numeric segments of a concrete version (empty for `latest`)
    pub fn segments(&self) -> &[u64] {
        &self.segments
    }

    pub fn is_older_than(&self, other: &PluginVersion) -> bool {
        self < other
    }

    pub fn is_newer_than(&self, other: &PluginVersion) -> bool {
        self > other
    }

    /// Compare segment-wise with missing segments treated as zero;
    /// `latest` outranks every concrete version.
    fn compare(&self, other: &PluginVersion) -> Ordering {
        match (self.latest, other.latest) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                let len = self.segments.len().max(other.segments.len());
                for i in 0..len {
                    let a = self.segments.get(i).copied().unwrap_or(0);
                    let b = other.segments.get(i).copied().unwrap_or(0);
                    match a.cmp(&b) {
                        Ordering::Equal => {}
                        ord => return ord,
                    }
                }
                Ordering::Equal
            }
        }
    }
}

impl fmt::Display for PluginVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl FromStr for PluginVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl PartialEq for PluginVersion {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl Eq for PluginVersion {}

impl Ord for PluginVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl PartialOrd for PluginVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for PluginVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Must agree with Eq: trailing zero segments do not participate,
        // so "1.0" and "1.0.0" hash identically.
        self.latest.hash(state);
        let end = self
            .segments
            .iter()
            .rposition(|&n| n != 0)
            .map(|i| i + 1)
            .unwrap_or(0);
        self.segments[..end].hash(state);
    }
}
