use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use modman_core::{AssetKind, Release};
use modman_installer::ModLayout;
use modman_resolver::{resolve_latest, GithubReleaseFeed, HttpClient};
use semver::Version;
use tracing::info;

use crate::config::ManagerConfig;
use crate::render::{ProgressUnit, TerminalRenderer};

pub(crate) const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

const FALLBACK_INSTALLER_NAME: &str = "modman-setup.exe";

/// Semantic comparison when both sides parse, plain inequality otherwise.
pub(crate) fn is_newer_release(current: &str, tag: &str) -> bool {
    let current = strip_tag_prefix(current);
    let tag = strip_tag_prefix(tag);
    match (Version::parse(current), Version::parse(tag)) {
        (Ok(current), Ok(tag)) => tag > current,
        _ => current != tag,
    }
}

fn strip_tag_prefix(value: &str) -> &str {
    let value = value.trim();
    value
        .strip_prefix('v')
        .or_else(|| value.strip_prefix('V'))
        .unwrap_or(value)
}

pub(crate) fn installer_download_path(layout: &ModLayout, release: &Release) -> PathBuf {
    let file_name = Path::new(&release.artifact_name)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .unwrap_or(FALLBACK_INSTALLER_NAME);
    layout.self_update_dir().join(file_name)
}

pub(crate) fn run_self_update(
    config: &ManagerConfig,
    client: &HttpClient,
    check_only: bool,
    renderer: TerminalRenderer,
) -> Result<()> {
    let feed = GithubReleaseFeed::new(
        client.clone(),
        config.release_api_base.clone(),
        config.release_owner.clone(),
    );
    let release = resolve_latest(&feed, &config.manager_repo, AssetKind::Installer)
        .context("failed to resolve the latest modman release")?;

    if !is_newer_release(CURRENT_VERSION, &release.version) {
        renderer.print_status("ok", &format!("modman {CURRENT_VERSION} is up to date"));
        return Ok(());
    }

    renderer.print_status(
        "info",
        &format!(
            "modman {} is available (running {CURRENT_VERSION})",
            release.version
        ),
    );
    if check_only {
        return Ok(());
    }

    let destination = installer_download_path(&config.layout, &release);
    let mut progress = renderer.start_progress(
        "self-update",
        ProgressUnit::Bytes,
        release.artifact_size.unwrap_or(0),
    );
    let downloaded = client.fetch_to_file(
        &release.artifact_url,
        &destination,
        &mut |received: u64, total: Option<u64>| {
            if let Some(total) = total {
                progress.set_total(total);
            }
            progress.set(received);
        },
    );
    match downloaded {
        Ok(bytes) => {
            progress.finish_success();
            info!(path = %destination.display(), bytes, "downloaded manager installer");
        }
        Err(err) => {
            progress.finish_abandon();
            return Err(err).context("failed to download the modman installer");
        }
    }

    launch_installer(&destination, renderer)
}

#[cfg(windows)]
fn launch_installer(path: &Path, renderer: TerminalRenderer) -> Result<()> {
    std::process::Command::new(path)
        .spawn()
        .with_context(|| format!("failed to launch installer: {}", path.display()))?;
    renderer.print_status(
        "ok",
        "installer launched; close modman to let it replace the current version",
    );
    Ok(())
}

#[cfg(not(windows))]
fn launch_installer(path: &Path, renderer: TerminalRenderer) -> Result<()> {
    renderer.print_status(
        "ok",
        &format!("installer downloaded to {}", path.display()),
    );
    Ok(())
}
