use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use modman_core::{AssetKind, Catalog, PackageId};
use modman_installer::{
    package_status, InstalledRegistry, Installer, RegistryStore,
};
use modman_resolver::{fetch_catalog, resolve_latest, GithubReleaseFeed, HttpClient, ReleaseFeed};
use tracing::debug;

use crate::completion::{write_completions_script, CliCompletionShell};
use crate::config::{load_config, ConfigOverrides, ManagerConfig};
use crate::render::{
    current_output_style, format_catalog_line, format_install_outcome_lines,
    format_status_label, format_uninstall_messages, status_badge, ProgressUnit, TerminalRenderer,
};
use crate::self_update::run_self_update;

#[derive(Parser, Debug)]
#[command(name = "modman")]
#[command(about = "Install and update mods for the host emulator", long_about = None)]
#[command(version)]
pub(crate) struct Cli {
    /// Read configuration from this file instead of `<state root>/config.toml`.
    #[arg(long, global = true)]
    pub(crate) config: Option<PathBuf>,
    /// Directory holding one subdirectory per installed mod.
    #[arg(long, global = true)]
    pub(crate) install_base: Option<PathBuf>,
    #[arg(long, global = true)]
    pub(crate) state_root: Option<PathBuf>,
    /// Disable colours and progress bars.
    #[arg(long, global = true)]
    pub(crate) plain: bool,
    #[arg(short, long, global = true)]
    pub(crate) verbose: bool,
    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Show every mod in the catalog with its install state.
    List {
        /// Also query each mod's latest release.
        #[arg(long)]
        check: bool,
    },
    /// Compare installed mods against their latest release.
    Status { package: Option<String> },
    Install {
        /// Catalog name or repository identifier.
        package: String,
        /// Treat the argument as a repository identifier without consulting the catalog.
        #[arg(long)]
        skip_catalog: bool,
    },
    /// Reinstall mods whose latest release differs from the installed one.
    Update { package: Option<String> },
    Uninstall { package: String },
    /// Print the directories modman reads and writes.
    Paths,
    SelfUpdate {
        #[arg(long)]
        check: bool,
    },
    Completions {
        #[arg(value_enum)]
        shell: CliCompletionShell,
    },
}

pub(crate) fn run_cli(cli: Cli) -> Result<()> {
    if let Commands::Completions { shell } = cli.command {
        let mut stdout = std::io::stdout();
        return write_completions_script(shell, &mut stdout);
    }

    let overrides = ConfigOverrides {
        config_path: cli.config.clone(),
        install_base: cli.install_base.clone(),
        state_root: cli.state_root.clone(),
    };
    let config = load_config(&overrides)?;
    let renderer = TerminalRenderer::from_style(current_output_style(cli.plain));
    debug!(
        install_base = %config.layout.install_base().display(),
        state_root = %config.layout.state_root().display(),
        "loaded configuration"
    );

    if let Commands::Paths = cli.command {
        for line in format_path_lines(&config) {
            println!("{line}");
        }
        return Ok(());
    }

    let client = HttpClient::new(&config.user_agent)?;
    let feed = Arc::new(GithubReleaseFeed::new(
        client.clone(),
        config.release_api_base.clone(),
        config.release_owner.clone(),
    ));
    let store = RegistryStore::new(config.layout.registry_path());
    let installer = Installer::new(
        config.layout.clone(),
        store.clone(),
        feed.clone(),
        Arc::new(client.clone()),
    );

    match cli.command {
        Commands::List { check } => {
            let catalog = fetch_catalog(&client, &config.catalog_url)
                .context("failed to fetch the mod catalog")?;
            let registry = load_registry_for_display(&store, renderer)?;
            renderer.print_section("Catalog");
            if catalog.entries.is_empty() {
                println!("catalog is empty");
            }
            for entry in &catalog.entries {
                let latest = if check {
                    latest_version_or_warn(feed.as_ref(), &entry.id, renderer)
                } else {
                    None
                };
                let status =
                    package_status(&config.layout, &registry, &entry.id, latest.as_deref());
                renderer.print_status(status_badge(&status), &format_catalog_line(entry, &status));
            }
        }
        Commands::Status { package } => {
            let registry = load_registry_for_display(&store, renderer)?;
            let targets = status_targets(&registry, package.as_deref())?;
            renderer.print_section("Status");
            if targets.is_empty() {
                println!("no mods installed");
            }
            for package_id in targets {
                let latest = latest_version_or_warn(feed.as_ref(), &package_id, renderer);
                let status =
                    package_status(&config.layout, &registry, &package_id, latest.as_deref());
                renderer.print_status(
                    status_badge(&status),
                    &format!("{package_id}: {}", format_status_label(&status)),
                );
            }
        }
        Commands::Install {
            package,
            skip_catalog,
        } => {
            let package_id = if skip_catalog {
                PackageId::parse(package.as_str())?
            } else {
                let catalog = fetch_catalog(&client, &config.catalog_url)
                    .context("failed to fetch the mod catalog")?;
                select_catalog_entry(&catalog, &package)?
            };
            run_install(&installer, package_id, "install", renderer)?;
        }
        Commands::Update { package } => {
            let registry = load_registry_for_display(&store, renderer)?;
            let targets = status_targets(&registry, package.as_deref())?;
            if targets.is_empty() {
                println!("no mods installed");
            }

            let mut failures = 0_usize;
            for package_id in targets {
                let latest = latest_version_or_warn(feed.as_ref(), &package_id, renderer);
                let status =
                    package_status(&config.layout, &registry, &package_id, latest.as_deref());
                if !status.needs_install() {
                    renderer.print_status(
                        status_badge(&status),
                        &format!("{package_id}: {}", format_status_label(&status)),
                    );
                    continue;
                }
                if let Err(err) = run_install(&installer, package_id.clone(), "update", renderer)
                {
                    failures += 1;
                    renderer.print_status("error", &format!("{err:#}"));
                }
            }

            if failures > 0 {
                return Err(anyhow!("{failures} mod(s) failed to update"));
            }
        }
        Commands::Uninstall { package } => {
            let package_id = PackageId::parse(package.as_str())?;
            let outcome = installer
                .spawn_uninstall(package_id.clone())?
                .wait()
                .with_context(|| format!("failed to uninstall {package_id}"))?;
            for line in format_uninstall_messages(&outcome) {
                println!("{line}");
            }
        }
        Commands::SelfUpdate { check } => {
            run_self_update(&config, &client, check, renderer)?;
        }
        Commands::Paths | Commands::Completions { .. } => {}
    }

    Ok(())
}

fn run_install(
    installer: &Installer,
    package_id: PackageId,
    label: &str,
    renderer: TerminalRenderer,
) -> Result<()> {
    installer.layout().ensure_base_dirs()?;
    let handle = installer.spawn_install(package_id.clone())?;
    let mut progress = renderer.start_progress(label, ProgressUnit::Percent, 100);
    let result = handle.wait_with(|percent| progress.set(u64::from(percent)));

    match result {
        Ok(record) => {
            progress.finish_success();
            renderer.print_lines(&format_install_outcome_lines(&record, renderer.style()));
            Ok(())
        }
        Err(err) => {
            progress.finish_abandon();
            Err(err).with_context(|| format!("failed to {label} {package_id}"))
        }
    }
}

/// Loads the registry for read-only commands, reporting a corrupt file as
/// "nothing installed" rather than failing.
fn load_registry_for_display(
    store: &RegistryStore,
    renderer: TerminalRenderer,
) -> Result<InstalledRegistry> {
    let registry = store.load_or_recover_with(|err| {
        renderer.print_status("warn", &format!("{err}; treating as nothing installed"));
    })?;
    Ok(registry)
}

fn latest_version_or_warn(
    feed: &dyn ReleaseFeed,
    package_id: &PackageId,
    renderer: TerminalRenderer,
) -> Option<String> {
    match resolve_latest(feed, package_id, AssetKind::Archive) {
        Ok(release) => Some(release.version),
        Err(err) => {
            renderer.print_status("warn", &format!("{package_id}: {err}"));
            None
        }
    }
}

pub(crate) fn status_targets(
    registry: &InstalledRegistry,
    package: Option<&str>,
) -> Result<Vec<PackageId>> {
    match package {
        Some(package) => Ok(vec![PackageId::parse(package)?]),
        None => Ok(registry.keys().cloned().collect()),
    }
}

pub(crate) fn select_catalog_entry(catalog: &Catalog, query: &str) -> Result<PackageId> {
    catalog
        .lookup(query)
        .map(|entry| entry.id.clone())
        .ok_or_else(|| {
            anyhow!("'{query}' is not in the catalog; pass --skip-catalog to install by identifier")
        })
}

pub(crate) fn format_path_lines(config: &ManagerConfig) -> Vec<String> {
    let layout = &config.layout;
    vec![
        format!("install base: {}", layout.install_base().display()),
        format!("state root: {}", layout.state_root().display()),
        format!("registry: {}", layout.registry_path().display()),
        format!("config: {}", layout.config_path().display()),
        format!("staging: {}", layout.staging_root().display()),
        format!("catalog: {}", config.catalog_url),
    ]
}

