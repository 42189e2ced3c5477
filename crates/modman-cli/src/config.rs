use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use modman_core::PackageId;
use modman_installer::ModLayout;
use modman_resolver::{DEFAULT_RELEASE_API_BASE, DEFAULT_USER_AGENT};
use serde::Deserialize;

pub(crate) const DEFAULT_CATALOG_URL: &str =
    "https://raw.githubusercontent.com/LoveGmod/mk8d-mod-manager/main/mods.json";
pub(crate) const DEFAULT_RELEASE_OWNER: &str = "LoveGmod";
pub(crate) const DEFAULT_MANAGER_REPO: &str = "mk8d-mod-manager";

const HOST_CONTENT_DIR: [&str; 3] = ["Ryujinx", "mods", "contents"];
const HOST_TITLE_ID: &str = "0100152000022000";

/// Values read from `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ConfigFile {
    pub(crate) catalog_url: Option<String>,
    pub(crate) release_api_base: Option<String>,
    pub(crate) release_owner: Option<String>,
    pub(crate) manager_repo: Option<String>,
    pub(crate) install_base: Option<PathBuf>,
    pub(crate) user_agent: Option<String>,
}

/// Command-line overrides applied on top of the config file.
#[derive(Debug, Clone, Default)]
pub(crate) struct ConfigOverrides {
    pub(crate) config_path: Option<PathBuf>,
    pub(crate) install_base: Option<PathBuf>,
    pub(crate) state_root: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub(crate) struct ManagerConfig {
    pub(crate) layout: ModLayout,
    pub(crate) catalog_url: String,
    pub(crate) release_api_base: String,
    pub(crate) release_owner: String,
    pub(crate) manager_repo: PackageId,
    pub(crate) user_agent: String,
}

pub(crate) fn parse_config_file(content: &str) -> Result<ConfigFile> {
    toml::from_str(content).context("failed parsing modman config")
}

fn read_config_file(path: &Path, required: bool) -> Result<ConfigFile> {
    match fs::read_to_string(path) {
        Ok(content) => parse_config_file(&content)
            .with_context(|| format!("invalid config file: {}", path.display())),
        Err(err) if err.kind() == io::ErrorKind::NotFound && !required => {
            Ok(ConfigFile::default())
        }
        Err(err) => {
            Err(err).with_context(|| format!("failed reading config file: {}", path.display()))
        }
    }
}

pub(crate) fn load_config(overrides: &ConfigOverrides) -> Result<ManagerConfig> {
    let env = |key: &str| std::env::var(key).ok();
    let state_root = match &overrides.state_root {
        Some(root) => root.clone(),
        None => default_state_root(env, cfg!(windows))?,
    };

    let file = match &overrides.config_path {
        Some(path) => read_config_file(path, true)?,
        None => read_config_file(&state_root.join("config.toml"), false)?,
    };

    build_config(file, overrides, state_root, || {
        default_install_base(env, cfg!(windows))
    })
}

pub(crate) fn build_config<F>(
    file: ConfigFile,
    overrides: &ConfigOverrides,
    state_root: PathBuf,
    default_install_base: F,
) -> Result<ManagerConfig>
where
    F: FnOnce() -> Result<PathBuf>,
{
    let install_base = match overrides.install_base.clone().or(file.install_base) {
        Some(base) => base,
        None => default_install_base()?,
    };

    let manager_repo = file
        .manager_repo
        .unwrap_or_else(|| DEFAULT_MANAGER_REPO.to_string());
    let manager_repo = PackageId::parse(manager_repo).context("invalid manager_repo in config")?;

    Ok(ManagerConfig {
        layout: ModLayout::new(install_base, state_root),
        catalog_url: file
            .catalog_url
            .unwrap_or_else(|| DEFAULT_CATALOG_URL.to_string()),
        release_api_base: file
            .release_api_base
            .unwrap_or_else(|| DEFAULT_RELEASE_API_BASE.to_string()),
        release_owner: file
            .release_owner
            .unwrap_or_else(|| DEFAULT_RELEASE_OWNER.to_string()),
        manager_repo,
        user_agent: file
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
    })
}

pub(crate) fn default_state_root<E>(env: E, windows: bool) -> Result<PathBuf>
where
    E: Fn(&str) -> Option<String>,
{
    if windows {
        let local_app_data = env("LOCALAPPDATA")
            .ok_or_else(|| anyhow!("LOCALAPPDATA is not set; cannot resolve Windows state root"))?;
        return Ok(PathBuf::from(local_app_data).join("Modman"));
    }

    let home = env("HOME").ok_or_else(|| anyhow!("HOME is not set; cannot resolve state root"))?;
    Ok(PathBuf::from(home).join(".modman"))
}

/// The host application's per-title mod directory.
pub(crate) fn default_install_base<E>(env: E, windows: bool) -> Result<PathBuf>
where
    E: Fn(&str) -> Option<String>,
{
    let config_home = if windows {
        PathBuf::from(env("APPDATA").ok_or_else(|| {
            anyhow!("APPDATA is not set; cannot resolve the host mod directory")
        })?)
    } else if let Some(xdg) = env("XDG_CONFIG_HOME").filter(|value| !value.is_empty()) {
        PathBuf::from(xdg)
    } else {
        let home = env("HOME")
            .ok_or_else(|| anyhow!("HOME is not set; cannot resolve the host mod directory"))?;
        PathBuf::from(home).join(".config")
    };

    let mut base = config_home;
    for segment in HOST_CONTENT_DIR {
        base.push(segment);
    }
    base.push(HOST_TITLE_ID);
    Ok(base)
}
