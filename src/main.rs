// src/main.rs

use anyhow::Result;
use capstan::{Dependency, PluginRecord, PluginSpec, PluginVersion, RemoteCatalogue, Solver};
use clap::Parser;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "capstan")]
#[command(author, version, about = "Plugin dependency resolver with conflict resolution and forced-upgrade handling", long_about = None)]
struct Cli {
    /// Plugin request file (YAML mapping of plugin name to pinned version)
    #[arg(short, long, default_value = "plugins.yaml")]
    input: PathBuf,

    /// Resolved plugin list output file
    #[arg(short, long, default_value = "plugins.txt")]
    output: PathBuf,

    /// Plugin metadata cache directory
    #[arg(long, default_value = ".cache")]
    cache_dir: PathBuf,

    /// Update site base URL
    #[arg(long, default_value = capstan::DEFAULT_UPDATE_SITE)]
    site: String,
}

/// Shape of the request file: a `plugins` mapping of name to version
#[derive(Debug, Deserialize)]
struct RequestFile {
    plugins: Option<BTreeMap<String, serde_yaml::Value>>,
}

/// Versions may be written as YAML strings or bare numbers (`2.5` scans as
/// a float); both are accepted
fn version_literal(name: &str, value: &serde_yaml::Value) -> capstan::Result<String> {
    match value {
        serde_yaml::Value::String(s) => Ok(s.clone()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        other => Err(capstan::Error::Config(format!(
            "plugin {name} has an unsupported version value: {other:?}"
        ))),
    }
}

/// Read the request file into root dependencies.
///
/// `None` means the `plugins` key is absent and there is nothing to
/// resolve. Every listed plugin becomes a mandatory root dependency.
fn read_request_file(path: &Path) -> capstan::Result<Option<Vec<Dependency>>> {
    let text = fs::read_to_string(path)?;
    let request: RequestFile = serde_yaml::from_str(&text)?;

    let Some(plugins) = request.plugins else {
        return Ok(None);
    };

    let mut dependencies = Vec::new();
    for (name, value) in plugins {
        let version = version_literal(&name, &value)?;
        let version = PluginVersion::parse(&version)?;
        dependencies.push(Dependency::required(PluginSpec::new(name, version)));
    }
    Ok(Some(dependencies))
}

/// Write the resolved set, one `name:version` per line, sorted by
/// (name, version) ascending
fn write_plugin_list(path: &Path, resolved: &[PluginRecord]) -> capstan::Result<()> {
    let mut out = String::new();
    for record in resolved {
        out.push_str(&format!("{}:{}\n", record.name, record.version));
    }
    fs::write(path, out)?;
    Ok(())
}

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let Some(requested) = read_request_file(&cli.input)? else {
        info!("no plugins requested in {}", cli.input.display());
        return Ok(());
    };

    let catalogue = RemoteCatalogue::new(cli.cache_dir, cli.site)?;
    let solver = Solver::new(&catalogue);
    let resolved = solver.solve(&requested)?;

    write_plugin_list(&cli.output, &resolved)?;
    println!(
        "plugin list written to {}",
        fs::canonicalize(&cli.output)?.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), content).unwrap();
        file
    }

    #[test]
    fn test_read_request_file() {
        let file = write_temp("plugins:\n  workflow: \"2.7\"\n  git: \"1.0\"\n");
        let deps = read_request_file(file.path()).unwrap().unwrap();
        assert_eq!(deps.len(), 2);
        // BTreeMap ordering: git before workflow
        assert_eq!(deps[0].spec.to_string(), "git:1.0");
        assert_eq!(deps[1].spec.to_string(), "workflow:2.7");
        assert!(deps.iter().all(|d| !d.optional));
    }

    #[test]
    fn test_read_request_file_numeric_version() {
        let file = write_temp("plugins:\n  git: 2.5\n");
        let deps = read_request_file(file.path()).unwrap().unwrap();
        assert_eq!(deps[0].spec.to_string(), "git:2.5");
    }

    #[test]
    fn test_read_request_file_missing_plugins_key() {
        let file = write_temp("something_else: true\n");
        assert!(read_request_file(file.path()).unwrap().is_none());
    }

    #[test]
    fn test_read_request_file_empty_mapping() {
        let file = write_temp("plugins: {}\n");
        let deps = read_request_file(file.path()).unwrap().unwrap();
        assert!(deps.is_empty());
    }

    #[test]
    fn test_read_request_file_bad_version() {
        let file = write_temp("plugins:\n  git: \"not-a-version\"\n");
        assert!(read_request_file(file.path()).is_err());
    }

    #[test]
    fn test_read_request_file_bad_yaml() {
        let file = write_temp("plugins: [unclosed\n");
        assert!(read_request_file(file.path()).is_err());
    }

    #[test]
    fn test_write_plugin_list_format() {
        let records = vec![
            PluginRecord {
                group_id: None,
                name: "ant".to_string(),
                version: PluginVersion::parse("1.0").unwrap(),
                core_version: PluginVersion::parse("2.0").unwrap(),
                dependencies: Vec::new(),
                breaks: Vec::new(),
                source: None,
            },
            PluginRecord {
                group_id: None,
                name: "git".to_string(),
                version: PluginVersion::parse("2.7.1").unwrap(),
                core_version: PluginVersion::parse("2.0").unwrap(),
                dependencies: Vec::new(),
                breaks: Vec::new(),
                source: None,
            },
        ];
        let file = tempfile::NamedTempFile::new().unwrap();
        write_plugin_list(file.path(), &records).unwrap();
        assert_eq!(
            fs::read_to_string(file.path()).unwrap(),
            "ant:1.0\ngit:2.7.1\n"
        );
    }
}
