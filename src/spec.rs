// src/spec.rs

//! Plugin spec value types
//!
//! A [`PluginSpec`] names one plugin at one pinned version, written
//! `name:version`. A [`Dependency`] is a spec plus an optional flag, parsed
//! from manifest dependency tokens.

use crate::error::{Error, Result};
use crate::version::PluginVersion;
use std::fmt;
use std::str::FromStr;

/// Marker suffix on a manifest dependency token declaring it optional
const OPTIONAL_RESOLUTION: &str = ";resolution:=optional";

/// A plugin name and pinned version
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PluginSpec {
    pub name: String,
    pub version: PluginVersion,
}

impl PluginSpec {
    pub fn new(name: impl Into<String>, version: PluginVersion) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// Spec for the newest published version of a plugin
    pub fn latest(name: impl Into<String>) -> Self {
        Self::new(name, PluginVersion::latest())
    }

    /// Parse a `name:version` string; exactly one `:` separator is required
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(name), Some(version), None) if !name.is_empty() && !version.is_empty() => {
                let version = PluginVersion::parse(version).map_err(|_| {
                    Error::MalformedSpec(format!("unparseable version in plugin spec '{s}'"))
                })?;
                Ok(Self::new(name, version))
            }
            _ => Err(Error::MalformedSpec(format!(
                "expected name:version, got '{s}'"
            ))),
        }
    }
}

impl fmt::Display for PluginSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.version)
    }
}

impl FromStr for PluginSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// One declared dependency: a spec plus whether it is optional
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub spec: PluginSpec,
    pub optional: bool,
}

impl Dependency {
    pub fn new(spec: PluginSpec, optional: bool) -> Self {
        Self { spec, optional }
    }

    /// A mandatory dependency
    pub fn required(spec: PluginSpec) -> Self {
        Self::new(spec, false)
    }

    /// Parse a manifest token `name:version[;resolution:=optional]`
    pub fn from_manifest_token(token: &str) -> Result<Self> {
        let token = token.trim();
        let (token, optional) = match token.strip_suffix(OPTIONAL_RESOLUTION) {
            Some(stripped) => (stripped, true),
            None => (token, false),
        };
        Ok(Self::new(PluginSpec::parse(token)?, optional))
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.spec)?;
        if self.optional {
            write!(f, "{OPTIONAL_RESOLUTION}")?;
        }
        Ok(())
    }
}
