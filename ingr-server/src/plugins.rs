//! Plugin discovery and execution
//!
//! Plugins live one directory deep under the plugins root, each described by
//! a `manifest.json`. Running a plugin goes through [`PluginRunner`]; the
//! default runner spawns the configured executor as a subprocess.

use async_trait::async_trait;
use ingr_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, warn};

const MANIFEST_FILE: &str = "manifest.json";

/// Contents of a plugin's `manifest.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginInfo {
    pub name: String,
    pub title: String,
    pub version: String,
    pub task: String,
    pub description: String,
    pub tags: Vec<String>,
}

/// Read every readable manifest under `plugins_dir`, sorted by name
///
/// Unreadable or malformed manifests are skipped. A missing plugins
/// directory is an error.
pub fn list_plugins(plugins_dir: &Path) -> Result<Vec<PluginInfo>> {
    let entries = std::fs::read_dir(plugins_dir).map_err(|e| {
        Error::Internal(format!(
            "Failed to read plugins directory {}: {}",
            plugins_dir.display(),
            e
        ))
    })?;

    let mut plugins = Vec::new();
    for entry in entries.flatten() {
        if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }

        let manifest_path = entry.path().join(MANIFEST_FILE);
        let data = match std::fs::read_to_string(&manifest_path) {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to read manifest {}: {}", manifest_path.display(), e);
                continue;
            }
        };

        match serde_json::from_str::<PluginInfo>(&data) {
            Ok(info) => plugins.push(info),
            Err(e) => warn!("Invalid manifest {}: {}", manifest_path.display(), e),
        }
    }

    plugins.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(plugins)
}

/// Runs a named plugin on a string input
#[async_trait]
pub trait PluginRunner: Send + Sync {
    async fn run(&self, plugin: &str, input: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct ExecutorOutput {
    result: String,
}

/// Spawns `<program> <args..> --plugin <name> --input <input>`
///
/// The process must print `{"result": "..."}` on stdout.
#[derive(Debug, Clone)]
pub struct ProcessPluginRunner {
    program: String,
    args: Vec<String>,
}

impl ProcessPluginRunner {
    /// Build from a command line such as `["python3", "plugin_executor.py"]`
    pub fn from_command(command: &[String]) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| Error::Config("plugin executor command is empty".to_string()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait]
impl PluginRunner for ProcessPluginRunner {
    async fn run(&self, plugin: &str, input: &str) -> Result<String> {
        validate_plugin_name(plugin)?;

        debug!(plugin = %plugin, program = %self.program, "Running plugin");

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg("--plugin")
            .arg(plugin)
            .arg("--input")
            .arg(input)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::Internal(format!("Failed to start plugin {}: {}", plugin, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Internal(format!(
                "Plugin {} failed ({}): {}",
                plugin,
                output.status,
                stderr.trim()
            )));
        }

        let parsed: ExecutorOutput = serde_json::from_slice(&output.stdout).map_err(|e| {
            Error::Internal(format!("Plugin {} returned invalid output: {}", plugin, e))
        })?;

        Ok(parsed.result)
    }
}

fn validate_plugin_name(plugin: &str) -> Result<()> {
    if plugin.trim().is_empty() {
        return Err(Error::required("plugin"));
    }
    if plugin.contains(['/', '\\']) || plugin.starts_with('.') {
        return Err(Error::Validation(format!("Invalid plugin name: {}", plugin)));
    }
    Ok(())
}
