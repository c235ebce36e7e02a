// src/catalogue/manifest.rs

//! Plugin archive manifest parsing
//!
//! The metadata entry of a plugin archive is a line-oriented `Key: Value`
//! document. Lines beginning with a single space continue the previous
//! value (legacy tooling wraps long attribute values at 72 columns).
//!
//! Recognized attributes:
//! - `Short-Name` (required), `Group-Id`
//! - `Plugin-Version`, with `Implementation-Version` as the legacy fallback
//! - `Core-Version`, with `Server-Version` honored only up to the cutoff
//! - `Plugin-Dependencies`: comma-separated dependency tokens
//! - `Breaks`: comma-separated `name:version` break constraints

use crate::error::{Error, Result};
use crate::record::{ArtifactSource, PluginRecord};
use crate::spec::{Dependency, PluginSpec};
use crate::version::PluginVersion;
use std::collections::HashMap;

const ATTR_SHORT_NAME: &str = "Short-Name";
const ATTR_GROUP_ID: &str = "Group-Id";
const ATTR_PLUGIN_VERSION: &str = "Plugin-Version";
const ATTR_IMPLEMENTATION_VERSION: &str = "Implementation-Version";
const ATTR_CORE_VERSION: &str = "Core-Version";
const ATTR_SERVER_VERSION: &str = "Server-Version";
const ATTR_DEPENDENCIES: &str = "Plugin-Dependencies";
const ATTR_BREAKS: &str = "Breaks";

/// `Server-Version` values newer than this predate the `Core-Version`
/// rename and say nothing about the required core
const SERVER_VERSION_CUTOFF: &str = "1.395";

/// Assumed required core version when a manifest records none
const FALLBACK_CORE_VERSION: &str = "1.398";

/// Parse manifest text into an attribute map
pub fn parse_attributes(text: &str) -> HashMap<String, String> {
    let mut attrs: HashMap<String, String> = HashMap::new();
    let mut last_key: Option<String> = None;

    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            last_key = None;
            continue;
        }
        // Continuation line: append to the previous attribute value
        if let Some(rest) = line.strip_prefix(' ') {
            if let Some(key) = &last_key {
                if let Some(value) = attrs.get_mut(key) {
                    value.push_str(rest);
                }
            }
            continue;
        }
        if let Some(idx) = line.find(':') {
            let key = line[..idx].trim().to_string();
            let value = line[idx + 1..].trim().to_string();
            last_key = Some(key.clone());
            attrs.insert(key, value);
        }
    }

    attrs
}

/// Early packaging tooling wrote the literal string `null` for absent values
fn fix_null(value: Option<&String>) -> Option<&str> {
    match value.map(String::as_str) {
        None | Some("") | Some("null") => None,
        some => some,
    }
}

/// Build a [`PluginRecord`] from manifest text.
///
/// Fails with [`Error::MetadataParse`] when a required field is missing or
/// unparseable; no degraded record is ever produced.
pub fn record_from_manifest(text: &str, source: Option<ArtifactSource>) -> Result<PluginRecord> {
    let attrs = parse_attributes(text);

    let name = fix_null(attrs.get(ATTR_SHORT_NAME))
        .ok_or_else(|| Error::MetadataParse(format!("manifest missing {ATTR_SHORT_NAME}")))?;

    let version_text = fix_null(attrs.get(ATTR_PLUGIN_VERSION))
        .or_else(|| fix_null(attrs.get(ATTR_IMPLEMENTATION_VERSION)))
        .ok_or_else(|| {
            Error::MetadataParse(format!("manifest for {name} missing {ATTR_PLUGIN_VERSION}"))
        })?;
    let version = PluginVersion::parse(version_text).map_err(|_| {
        Error::MetadataParse(format!(
            "manifest for {name} has unparseable version '{version_text}'"
        ))
    })?;

    let core_version = required_core_version(&attrs)?;
    let dependencies = parse_dependencies(&attrs, name)?;
    let breaks = parse_breaks(&attrs, name)?;

    Ok(PluginRecord {
        group_id: fix_null(attrs.get(ATTR_GROUP_ID)).map(str::to_string),
        name: name.to_string(),
        version,
        core_version,
        dependencies,
        breaks,
        source,
    })
}

/// `Core-Version` wins; a parseable legacy `Server-Version` is honored only
/// at or below the cutoff; otherwise the fallback applies.
fn required_core_version(attrs: &HashMap<String, String>) -> Result<PluginVersion> {
    if let Some(v) = fix_null(attrs.get(ATTR_CORE_VERSION)) {
        return PluginVersion::parse(v).map_err(|_| {
            Error::MetadataParse(format!("unparseable {ATTR_CORE_VERSION} '{v}'"))
        });
    }

    if let Some(v) = fix_null(attrs.get(ATTR_SERVER_VERSION)) {
        let cutoff = PluginVersion::parse(SERVER_VERSION_CUTOFF)?;
        if let Ok(parsed) = PluginVersion::parse(v) {
            if !parsed.is_newer_than(&cutoff) {
                return Ok(parsed);
            }
        }
    }

    PluginVersion::parse(FALLBACK_CORE_VERSION)
}

fn parse_dependencies(attrs: &HashMap<String, String>, name: &str) -> Result<Vec<Dependency>> {
    let mut dependencies = Vec::new();
    if let Some(tokens) = fix_null(attrs.get(ATTR_DEPENDENCIES)) {
        for token in tokens.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            let dep = Dependency::from_manifest_token(token).map_err(|e| {
                Error::MetadataParse(format!(
                    "manifest for {name} has bad dependency token '{token}': {e}"
                ))
            })?;
            dependencies.push(dep);
        }
    }
    Ok(dependencies)
}

fn parse_breaks(attrs: &HashMap<String, String>, name: &str) -> Result<Vec<PluginSpec>> {
    let mut breaks = Vec::new();
    if let Some(tokens) = fix_null(attrs.get(ATTR_BREAKS)) {
        for token in tokens.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            let spec = PluginSpec::parse(token).map_err(|e| {
                Error::MetadataParse(format!(
                    "manifest for {name} has bad break constraint '{token}': {e}"
                ))
            })?;
            breaks.push(spec);
        }
    }
    Ok(breaks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_manifest() {
        let text = "\
Group-Id: io.capstan.plugins
Short-Name: workflow
Plugin-Version: 2.7
Core-Version: 2.138.4
Plugin-Dependencies: scm-api:1.3,dashboard:1.0;resolution:=optional
Breaks: git:2.0
";
        let record = record_from_manifest(text, None).unwrap();
        assert_eq!(record.name, "workflow");
        assert_eq!(record.group_id.as_deref(), Some("io.capstan.plugins"));
        assert_eq!(record.version, PluginVersion::parse("2.7").unwrap());
        assert_eq!(record.core_version, PluginVersion::parse("2.138.4").unwrap());
        assert_eq!(record.dependencies.len(), 2);
        assert!(!record.dependencies[0].optional);
        assert!(record.dependencies[1].optional);
        assert_eq!(record.breaks, vec![PluginSpec::parse("git:2.0").unwrap()]);
    }

    #[test]
    fn test_minimal_manifest_defaults() {
        let text = "Short-Name: mailer\nPlugin-Version: 1.2\n";
        let record = record_from_manifest(text, None).unwrap();
        assert_eq!(record.group_id, None);
        assert!(record.dependencies.is_empty());
        assert!(record.breaks.is_empty());
        assert_eq!(
            record.core_version,
            PluginVersion::parse(FALLBACK_CORE_VERSION).unwrap()
        );
    }

    #[test]
    fn test_implementation_version_fallback() {
        let text = "Short-Name: mailer\nImplementation-Version: 1.1\n";
        let record = record_from_manifest(text, None).unwrap();
        assert_eq!(record.version, PluginVersion::parse("1.1").unwrap());
    }

    #[test]
    fn test_plugin_version_wins_over_implementation_version() {
        let text = "Short-Name: mailer\nPlugin-Version: 2.0\nImplementation-Version: 1.1\n";
        let record = record_from_manifest(text, None).unwrap();
        assert_eq!(record.version, PluginVersion::parse("2.0").unwrap());
    }

    #[test]
    fn test_server_version_below_cutoff_is_honored() {
        let text = "Short-Name: mailer\nPlugin-Version: 1.0\nServer-Version: 1.390\n";
        let record = record_from_manifest(text, None).unwrap();
        assert_eq!(record.core_version, PluginVersion::parse("1.390").unwrap());
    }

    #[test]
    fn test_server_version_past_cutoff_falls_back() {
        let text = "Short-Name: mailer\nPlugin-Version: 1.0\nServer-Version: 1.400\n";
        let record = record_from_manifest(text, None).unwrap();
        assert_eq!(
            record.core_version,
            PluginVersion::parse(FALLBACK_CORE_VERSION).unwrap()
        );
    }

    #[test]
    fn test_core_version_wins_over_server_version() {
        let text =
            "Short-Name: mailer\nPlugin-Version: 1.0\nCore-Version: 2.0\nServer-Version: 1.390\n";
        let record = record_from_manifest(text, None).unwrap();
        assert_eq!(record.core_version, PluginVersion::parse("2.0").unwrap());
    }

    #[test]
    fn test_literal_null_is_absent() {
        let text = "Short-Name: mailer\nPlugin-Version: 1.0\nGroup-Id: null\nServer-Version: null\n";
        let record = record_from_manifest(text, None).unwrap();
        assert_eq!(record.group_id, None);
        assert_eq!(
            record.core_version,
            PluginVersion::parse(FALLBACK_CORE_VERSION).unwrap()
        );
    }

    #[test]
    fn test_continuation_lines() {
        let text = "\
Short-Name: workflow
Plugin-Version: 2.7
Plugin-Dependencies: scm-api:1.3,dashboa
 rd:1.0;resolution:=optional
";
        let record = record_from_manifest(text, None).unwrap();
        assert_eq!(record.dependencies.len(), 2);
        assert_eq!(record.dependencies[1].spec.name, "dashboard");
    }

    #[test]
    fn test_missing_short_name_fails() {
        let err = record_from_manifest("Plugin-Version: 1.0\n", None).unwrap_err();
        assert!(matches!(err, Error::MetadataParse(_)));
    }

    #[test]
    fn test_missing_version_fails() {
        let err = record_from_manifest("Short-Name: mailer\n", None).unwrap_err();
        assert!(matches!(err, Error::MetadataParse(_)));
    }

    #[test]
    fn test_bad_dependency_token_fails() {
        let text = "Short-Name: mailer\nPlugin-Version: 1.0\nPlugin-Dependencies: nonsense\n";
        let err = record_from_manifest(text, None).unwrap_err();
        assert!(matches!(err, Error::MetadataParse(_)));
        assert!(err.to_string().contains("nonsense"));
    }
}
