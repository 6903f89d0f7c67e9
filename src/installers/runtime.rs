//! Process supervision runtime
//!
//! Generates a process-compose configuration that supervises the app's dev
//! process, the supervise agent and (when the caddy layer is present) the
//! reverse proxy, and declares process-compose as the image's default
//! process.

use crate::config::schema::RuntimeConfig;
use crate::error::{ForgeError, ForgeResult};
use crate::installers::{BuildContext, BuildResult, DetectContext, Installer};
use crate::layer::{DirectProcess, LayerHandle, LayerTypes, RuntimeMetadata};
use crate::util::copy_file;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};

const LAYER_NAME: &str = "runtime";

/// Top-level process-compose document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessConfig {
    #[serde(default, deserialize_with = "null_as_default")]
    pub processes: BTreeMap<String, ProcessEntry>,

    /// Template keys this installer does not manage, passed through as-is
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessEntry {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub command: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub depends_on: BTreeMap<String, DependencyConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environment: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencyConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub condition: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub struct RuntimeInstaller {
    caddy_config_path: PathBuf,
    caddy_binary_path: PathBuf,
    log_file: String,
}

impl RuntimeInstaller {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            caddy_config_path: config.caddy_config_path.clone(),
            caddy_binary_path: config.caddy_binary_path.clone(),
            log_file: config.log_file.clone(),
        }
    }

    /// Apply the managed process entries on top of `template`
    pub fn compose(
        &self,
        mut template: ProcessConfig,
        dev_command: &str,
        agent: &Path,
    ) -> ProcessConfig {
        let processes = &mut template.processes;

        if dev_command.is_empty() {
            processes.remove("dev");
        } else {
            processes.insert(
                "dev".to_string(),
                ProcessEntry {
                    description: "Development process from Procfile".to_string(),
                    command: dev_command.to_string(),
                    ..ProcessEntry::default()
                },
            );
        }

        processes.insert(
            "agent".to_string(),
            ProcessEntry {
                description: "Supervise agent".to_string(),
                command: agent.display().to_string(),
                ..ProcessEntry::default()
            },
        );

        if self.caddy_config_path.exists() {
            processes.insert(
                "caddy".to_string(),
                ProcessEntry {
                    description: "Caddy reverse proxy".to_string(),
                    command: format!(
                        "{} run --config {} --adapter caddyfile",
                        self.caddy_binary_path.display(),
                        self.caddy_config_path.display()
                    ),
                    depends_on: BTreeMap::from([(
                        "agent".to_string(),
                        DependencyConfig {
                            condition: "process_started".to_string(),
                        },
                    )]),
                    // Caddy autosaves its config; /tmp is writable at launch.
                    environment: vec!["XDG_CONFIG_HOME=/tmp".to_string()],
                    ..ProcessEntry::default()
                },
            );
        } else {
            debug!(
                "No caddy config at {}, not supervising caddy",
                self.caddy_config_path.display()
            );
            processes.remove("caddy");
        }

        template
    }
}

/// Command of the first `dev:` line in `<working_dir>/Procfile`, or empty
pub fn read_dev_command(working_dir: &Path) -> ForgeResult<String> {
    let path = working_dir.join("Procfile");
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(String::new()),
        Err(e) => return Err(ForgeError::io(format!("reading {}", path.display()), e)),
    };

    Ok(content
        .lines()
        .find_map(|line| line.strip_prefix("dev:"))
        .map(|command| command.trim().to_string())
        .unwrap_or_default())
}

/// Load the process-compose template; a missing or empty file is an empty config
pub fn load_template(path: &Path) -> ForgeResult<ProcessConfig> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ProcessConfig::default()),
        Err(e) => return Err(ForgeError::io(format!("reading {}", path.display()), e)),
    };

    if content.trim().is_empty() {
        return Ok(ProcessConfig::default());
    }
    Ok(serde_yaml::from_str(&content)?)
}

impl Installer for RuntimeInstaller {
    fn name(&self) -> &'static str {
        LAYER_NAME
    }

    /// Widen working directory permissions so the dev process can write to it
    fn detect(&self, ctx: &DetectContext) -> ForgeResult<()> {
        let status = Command::new("chmod")
            .arg("-R")
            .arg("a+w")
            .arg(&ctx.working_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => {}
            Ok(status) => debug!("chmod on {} exited with {}", ctx.working_dir.display(), status),
            Err(e) => debug!("chmod on {} failed: {}", ctx.working_dir.display(), e),
        }
        Ok(())
    }

    fn build(&self, ctx: &BuildContext) -> ForgeResult<BuildResult> {
        let mut layer = LayerHandle::open(&ctx.layers_dir, LAYER_NAME)?;
        layer.reset()?;
        let bin_dir = layer.ensure_dir("bin")?;
        let config_dir = layer.ensure_dir("config")?;
        let compose_home = layer.ensure_dir("config/process-compose")?;

        let agent_src = ctx.cnb_path.join("scripts").join("agent.sh");
        let agent = bin_dir.join("agent.sh");
        copy_file(&agent_src, &agent, 0o755)
            .map_err(|e| ForgeError::io(format!("copying {}", agent_src.display()), e))?;

        let dev_command = read_dev_command(&ctx.working_dir)?;

        let template = load_template(&ctx.cnb_path.join("config").join("process-compose.yaml"))?;
        let compose = self.compose(template, &dev_command, &agent);
        let compose_path = config_dir.join("process-compose.yaml");
        fs::write(&compose_path, serde_yaml::to_string(&compose)?)
            .map_err(|e| ForgeError::io(format!("writing {}", compose_path.display()), e))?;

        let compose_home = compose_home.display().to_string();
        let caddy_config = self.caddy_config_path.display().to_string();
        for (name, value) in [
            ("PROCESS_COMPOSE_HOME", compose_home.as_str()),
            ("TERM", "xterm-256color"),
            ("PC_DISABLE_TUI", "1"),
            ("PC_LOG_FILE", self.log_file.as_str()),
            ("CADDY_CONFIG", caddy_config.as_str()),
        ] {
            layer.launch_env_default(name, value)?;
        }

        layer.types = LayerTypes {
            launch: true,
            build: true,
            cache: false,
        };
        layer.write_metadata(&RuntimeMetadata {
            dev_command: dev_command.clone(),
        })?;

        info!("Installed runtime with dev process: {}", dev_command);

        let mut result = BuildResult::layer(layer);
        result.launch.processes.push(
            DirectProcess::new(
                "dev",
                vec!["pkgx".to_string()],
                vec![
                    "process-compose".to_string(),
                    "--tui=false".to_string(),
                    "-f".to_string(),
                    compose_path.display().to_string(),
                ],
            )
            .as_default(),
        );
        Ok(result)
    }
}
