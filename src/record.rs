// src/record.rs

//! Resolved plugin metadata
//!
//! A [`PluginRecord`] is the full metadata for one resolved plugin artifact:
//! identity, required host-core version, declared dependencies, break
//! constraints, and a lazy artifact handle. Records are built once by the
//! catalogue and never mutated afterwards.

use crate::spec::{Dependency, PluginSpec};
use crate::version::PluginVersion;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Name of the synthetic root record representing the requested install set
pub const ROOT_NAME: &str = "root";

/// Where a plugin artifact archive can be retrieved from.
///
/// Installers dereference this; the resolver itself never does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSource {
    pub url: String,
}

/// Full metadata for one resolved plugin
#[derive(Debug, Clone)]
pub struct PluginRecord {
    /// Owning group identifier
    pub group_id: Option<String>,
    pub name: String,
    pub version: PluginVersion,
    /// Minimum required host-core version
    pub core_version: PluginVersion,
    /// Declared dependencies, in manifest order
    pub dependencies: Vec<Dependency>,
    /// Break constraints: incompatible with versions of `name` older than
    /// `version`, forcing an upgrade when both are selected
    pub breaks: Vec<PluginSpec>,
    /// Lazy artifact handle
    pub source: Option<ArtifactSource>,
}

impl PluginRecord {
    /// The synthetic root record: name `root`, version `0`, carrying only
    /// the requested dependency list
    pub fn root(dependencies: Vec<Dependency>) -> Self {
        Self {
            group_id: None,
            name: ROOT_NAME.to_string(),
            version: PluginVersion::zero(),
            core_version: PluginVersion::zero(),
            dependencies,
            breaks: Vec::new(),
            source: None,
        }
    }

    /// The (name, version) identity of this record
    pub fn spec(&self) -> PluginSpec {
        PluginSpec::new(self.name.clone(), self.version.clone())
    }
}

// Identity is (name, version) only; the rest of the metadata does not
// participate. This is what conflict detection keys on.
impl PartialEq for PluginRecord {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.version == other.version
    }
}

impl Eq for PluginRecord {}

impl Hash for PluginRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.version.hash(state);
    }
}

impl Ord for PluginRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.version.cmp(&other.version))
    }
}

impl PartialOrd for PluginRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PluginRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, version: &str) -> PluginRecord {
        PluginRecord {
            group_id: Some("io.capstan.plugins".to_string()),
            name: name.to_string(),
            version: PluginVersion::parse(version).unwrap(),
            core_version: PluginVersion::parse("2.0").unwrap(),
            dependencies: Vec::new(),
            breaks: Vec::new(),
            source: None,
        }
    }

    #[test]
    fn test_equality_ignores_metadata() {
        let mut a = record("git", "1.0");
        let b = record("git", "1.0");
        a.group_id = Some("somewhere.else".to_string());
        a.dependencies
            .push(Dependency::required(PluginSpec::parse("scm-api:1.0").unwrap()));
        assert_eq!(a, b);
    }

    #[test]
    fn test_equality_requires_same_version() {
        assert_ne!(record("git", "1.0"), record("git", "2.0"));
        assert_ne!(record("git", "1.0"), record("ant", "1.0"));
    }

    #[test]
    fn test_ordering_by_name_then_version() {
        let mut records = vec![record("git", "2.0"), record("ant", "1.0"), record("git", "1.0")];
        records.sort();
        let rendered: Vec<String> = records.iter().map(|r| r.to_string()).collect();
        assert_eq!(rendered, vec!["ant:1.0", "git:1.0", "git:2.0"]);
    }

    #[test]
    fn test_root_record() {
        let deps = vec![Dependency::required(PluginSpec::parse("git:1.0").unwrap())];
        let root = PluginRecord::root(deps);
        assert_eq!(root.name, ROOT_NAME);
        assert_eq!(root.version, PluginVersion::zero());
        assert_eq!(root.dependencies.len(), 1);
        assert!(root.breaks.is_empty());
        assert!(root.source.is_none());
    }
}
