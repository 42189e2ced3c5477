use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::error::ErrorKind;
use clap::Parser;
use modman_core::{Catalog, CatalogEntry, PackageId, Release};
use modman_installer::{
    InstalledRecord, ModLayout, PackageStatus, UninstallOutcome, UninstallStatus,
};

use crate::completion::{write_completions_script, CliCompletionShell};
use crate::config::{
    build_config, default_install_base, default_state_root, parse_config_file, ConfigFile,
    ConfigOverrides, DEFAULT_CATALOG_URL, DEFAULT_MANAGER_REPO, DEFAULT_RELEASE_OWNER,
};
use crate::dispatch::{format_path_lines, select_catalog_entry, status_targets, Cli, Commands};
use crate::render::{
    format_catalog_line, format_install_outcome_lines, format_status_label,
    format_uninstall_messages, render_progress_line, render_status_line, status_badge,
    OutputStyle, ProgressUnit,
};
use crate::self_update::{installer_download_path, is_newer_release};

fn id(value: &str) -> PackageId {
    PackageId::parse(value).expect("test id must be valid")
}

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

fn no_default_install_base() -> anyhow::Result<PathBuf> {
    Err(anyhow::anyhow!("default install base must not be consulted"))
}

#[test]
fn empty_config_file_uses_defaults() {
    let file = parse_config_file("").expect("empty config must parse");
    assert_eq!(file, ConfigFile::default());

    let config = build_config(
        file,
        &ConfigOverrides::default(),
        PathBuf::from("/state"),
        || Ok(PathBuf::from("/mods")),
    )
    .expect("config must build");

    assert_eq!(config.catalog_url, DEFAULT_CATALOG_URL);
    assert_eq!(config.release_owner, DEFAULT_RELEASE_OWNER);
    assert_eq!(config.manager_repo.as_str(), DEFAULT_MANAGER_REPO);
    assert_eq!(config.release_api_base, "https://api.github.com");
    assert!(config.user_agent.starts_with("modman/"));
    assert_eq!(config.layout.install_base(), Path::new("/mods"));
    assert_eq!(config.layout.state_root(), Path::new("/state"));
}

#[test]
fn config_file_values_override_defaults() {
    let file = parse_config_file(
        r#"
catalog_url = "https://mirror.example/mods.json"
release_api_base = "https://ghe.example/api/v3"
release_owner = "someone-else"
manager_repo = "forked-manager"
install_base = "/games/mods"
user_agent = "custom-agent/1.0"
"#,
    )
    .expect("config must parse");

    let config = build_config(
        file,
        &ConfigOverrides::default(),
        PathBuf::from("/state"),
        no_default_install_base,
    )
    .expect("config must build");

    assert_eq!(config.catalog_url, "https://mirror.example/mods.json");
    assert_eq!(config.release_api_base, "https://ghe.example/api/v3");
    assert_eq!(config.release_owner, "someone-else");
    assert_eq!(config.manager_repo.as_str(), "forked-manager");
    assert_eq!(config.user_agent, "custom-agent/1.0");
    assert_eq!(config.layout.install_base(), Path::new("/games/mods"));
}

#[test]
fn install_base_flag_wins_over_config_file() {
    let file = parse_config_file("install_base = \"/from/file\"").expect("config must parse");
    let overrides = ConfigOverrides {
        install_base: Some(PathBuf::from("/from/flag")),
        ..ConfigOverrides::default()
    };

    let config = build_config(file, &overrides, PathBuf::from("/state"), no_default_install_base)
        .expect("config must build");
    assert_eq!(config.layout.install_base(), Path::new("/from/flag"));
}

#[test]
fn unknown_config_keys_are_rejected() {
    let err = parse_config_file("catalog = \"typo\"").expect_err("unknown key must fail");
    assert!(format!("{err:#}").contains("catalog"));
}

#[test]
fn unsafe_manager_repo_is_rejected() {
    let file = parse_config_file("manager_repo = \"../escape\"").expect("config must parse");
    let err = build_config(
        file,
        &ConfigOverrides::default(),
        PathBuf::from("/state"),
        || Ok(PathBuf::from("/mods")),
    )
    .expect_err("unsafe repo must fail");
    assert!(format!("{err:#}").contains("manager_repo"));
}

#[test]
fn default_paths_on_windows_follow_appdata() {
    let env = env_from(&[
        ("APPDATA", r"C:\Users\me\AppData\Roaming"),
        ("LOCALAPPDATA", r"C:\Users\me\AppData\Local"),
    ]);

    let base = default_install_base(&env, true).expect("install base must resolve");
    let expected = PathBuf::from(r"C:\Users\me\AppData\Roaming")
        .join("Ryujinx")
        .join("mods")
        .join("contents")
        .join("0100152000022000");
    assert_eq!(base, expected);

    let state = default_state_root(&env, true).expect("state root must resolve");
    assert_eq!(
        state,
        PathBuf::from(r"C:\Users\me\AppData\Local").join("Modman")
    );
}

#[test]
fn default_paths_elsewhere_prefer_xdg_config_home() {
    let env = env_from(&[("HOME", "/home/me"), ("XDG_CONFIG_HOME", "/cfg")]);
    let base = default_install_base(&env, false).expect("install base must resolve");
    assert_eq!(
        base,
        PathBuf::from("/cfg/Ryujinx/mods/contents/0100152000022000")
    );

    let env = env_from(&[("HOME", "/home/me")]);
    let base = default_install_base(&env, false).expect("install base must resolve");
    assert_eq!(
        base,
        PathBuf::from("/home/me/.config/Ryujinx/mods/contents/0100152000022000")
    );
    let state = default_state_root(&env, false).expect("state root must resolve");
    assert_eq!(state, PathBuf::from("/home/me/.modman"));
}

#[test]
fn default_paths_require_environment() {
    let env = env_from(&[]);
    assert!(default_install_base(&env, true).is_err());
    assert!(default_state_root(&env, true).is_err());
    assert!(default_install_base(&env, false).is_err());
    assert!(default_state_root(&env, false).is_err());
}

#[test]
fn newer_release_uses_semver_when_possible() {
    assert!(is_newer_release("0.1.0", "v0.2.0"));
    assert!(is_newer_release("0.1.0", "0.1.1"));
    assert!(!is_newer_release("0.2.0", "v0.2.0"));
    assert!(!is_newer_release("0.3.0", "V0.2.9"));
    assert!(!is_newer_release("1.0.0", "1.0.0-rc.1"));
}

#[test]
fn newer_release_falls_back_to_inequality_for_free_form_tags() {
    assert!(is_newer_release("0.1.0", "spring-build"));
    assert!(!is_newer_release("nightly", "nightly"));
}

#[test]
fn installer_download_path_keeps_only_the_file_name() {
    let layout = ModLayout::new("/mods", "/state");
    let release = |name: &str| Release {
        package_id: id("mk8d-mod-manager"),
        version: "v2.0.0".to_string(),
        artifact_name: name.to_string(),
        artifact_url: "https://example.invalid/setup.exe".to_string(),
        artifact_size: None,
    };

    assert_eq!(
        installer_download_path(&layout, &release("Setup.exe")),
        layout.self_update_dir().join("Setup.exe")
    );
    assert_eq!(
        installer_download_path(&layout, &release("../../evil.exe")),
        layout.self_update_dir().join("evil.exe")
    );
    assert_eq!(
        installer_download_path(&layout, &release("")),
        layout.self_update_dir().join("modman-setup.exe")
    );
}

#[test]
fn status_line_plain_is_message_only() {
    assert_eq!(
        render_status_line(OutputStyle::Plain, "ok", "installed demo-pack v1"),
        "installed demo-pack v1"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "warn", "files missing"),
        "[WARN] files missing"
    );
}

#[test]
fn progress_line_is_suppressed_in_plain_mode() {
    assert_eq!(
        render_progress_line(OutputStyle::Plain, "install", ProgressUnit::Percent, 40, 100, None),
        None
    );

    let line = render_progress_line(
        OutputStyle::Rich,
        "install",
        ProgressUnit::Percent,
        40,
        100,
        Some(Duration::from_millis(1_250)),
    )
    .expect("rich mode must render");
    assert!(line.contains(" 40%"));
    assert!(line.contains("complete in 1.250s"));
}

#[test]
fn progress_line_clamps_overshoot() {
    let line = render_progress_line(OutputStyle::Rich, "update", ProgressUnit::Percent, 250, 100, None)
        .expect("rich mode must render");
    assert!(line.contains("100%"));
}

#[test]
fn status_labels_describe_each_state() {
    assert_eq!(format_status_label(&PackageStatus::NotInstalled), "not installed");
    assert_eq!(
        format_status_label(&PackageStatus::UpdateAvailable {
            installed: "v1".to_string(),
            latest: "v2".to_string(),
        }),
        "update available: v1 -> v2"
    );
    assert_eq!(
        format_status_label(&PackageStatus::MissingFiles {
            version: "v1".to_string()
        }),
        "v1 recorded, files missing"
    );
    assert_eq!(status_badge(&PackageStatus::NotInstalled), "info");
    assert_eq!(
        status_badge(&PackageStatus::UpToDate {
            version: "v1".to_string()
        }),
        "ok"
    );
    assert_eq!(status_badge(&PackageStatus::LegacyInstall), "warn");
}

#[test]
fn catalog_line_shows_name_identifier_and_state() {
    let entry = CatalogEntry {
        name: "Demo Pack".to_string(),
        id: id("demo-pack"),
    };
    let line = format_catalog_line(
        &entry,
        &PackageStatus::Installed {
            version: "v1".to_string(),
        },
    );
    assert_eq!(line, "Demo Pack (demo-pack): installed v1");
}

#[test]
fn install_outcome_lines_distinguish_reinstall() {
    let mut record = InstalledRecord {
        package_id: id("demo-pack"),
        version: "v1".to_string(),
        install_path: PathBuf::from("/mods/demo-pack"),
        artifact_sha256: "ab".repeat(32),
        replaced_existing: false,
    };

    let lines = format_install_outcome_lines(&record, OutputStyle::Plain);
    assert_eq!(lines[0], "installed demo-pack v1");
    assert_eq!(lines[1], "path: /mods/demo-pack");
    assert_eq!(lines[2], format!("artifact sha256: {}", "ab".repeat(32)));

    record.replaced_existing = true;
    let lines = format_install_outcome_lines(&record, OutputStyle::Rich);
    assert_eq!(lines[0], "[OK] reinstalled demo-pack v1");
}

#[test]
fn uninstall_messages_cover_each_status() {
    let outcome = |status, version: Option<&str>| UninstallOutcome {
        package_id: id("demo-pack"),
        version: version.map(str::to_string),
        removed_directory: false,
        status,
    };

    assert_eq!(
        format_uninstall_messages(&outcome(UninstallStatus::NotInstalled, None)),
        vec!["demo-pack is not installed".to_string()]
    );
    assert_eq!(
        format_uninstall_messages(&outcome(UninstallStatus::Uninstalled, Some("v1"))),
        vec!["uninstalled demo-pack v1".to_string()]
    );
    assert_eq!(
        format_uninstall_messages(&outcome(UninstallStatus::RepairedStaleState, Some("X"))),
        vec!["removed stale state for demo-pack X (package files already missing)".to_string()]
    );
}

#[test]
fn catalog_selection_accepts_identifier_or_display_name() {
    let catalog = Catalog {
        entries: vec![CatalogEntry {
            name: "Demo Pack".to_string(),
            id: id("demo-pack"),
        }],
    };

    assert_eq!(
        select_catalog_entry(&catalog, "demo-pack").expect("id must match"),
        id("demo-pack")
    );
    assert_eq!(
        select_catalog_entry(&catalog, "demo pack").expect("name must match"),
        id("demo-pack")
    );
    let err = select_catalog_entry(&catalog, "missing").expect_err("unknown must fail");
    assert!(err.to_string().contains("--skip-catalog"));
}

#[test]
fn status_targets_default_to_registry_keys() {
    let mut registry = modman_installer::InstalledRegistry::new();
    registry.insert(id("b-pack"), modman_installer::InstalledEntry::new("v1"));
    registry.insert(id("a-pack"), modman_installer::InstalledEntry::new("v2"));

    let targets = status_targets(&registry, None).expect("targets must resolve");
    assert_eq!(targets, vec![id("a-pack"), id("b-pack")]);

    let targets = status_targets(&registry, Some("c-pack")).expect("explicit target");
    assert_eq!(targets, vec![id("c-pack")]);

    assert!(status_targets(&registry, Some("../bad")).is_err());
}

#[test]
fn path_lines_list_layout_directories() {
    let config = build_config(
        ConfigFile::default(),
        &ConfigOverrides::default(),
        PathBuf::from("/state"),
        || Ok(PathBuf::from("/mods")),
    )
    .expect("config must build");

    let lines = format_path_lines(&config);
    assert_eq!(lines[0], "install base: /mods");
    assert_eq!(lines[1], "state root: /state");
    assert!(lines[2].ends_with("installed.json"));
    assert_eq!(lines[5], format!("catalog: {DEFAULT_CATALOG_URL}"));
}

#[test]
fn cli_parses_install_with_global_flags() {
    let cli = Cli::try_parse_from([
        "modman",
        "--plain",
        "install",
        "demo-pack",
        "--skip-catalog",
        "--install-base",
        "/mods",
    ])
    .expect("command must parse");

    assert!(cli.plain);
    assert_eq!(cli.install_base.as_deref(), Some(Path::new("/mods")));
    match cli.command {
        Commands::Install {
            package,
            skip_catalog,
        } => {
            assert_eq!(package, "demo-pack");
            assert!(skip_catalog);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn cli_parses_optional_update_target_and_self_update_check() {
    let cli = Cli::try_parse_from(["modman", "update"]).expect("command must parse");
    assert!(matches!(cli.command, Commands::Update { package: None }));

    let cli = Cli::try_parse_from(["modman", "-v", "self-update", "--check"])
        .expect("command must parse");
    assert!(cli.verbose);
    assert!(matches!(cli.command, Commands::SelfUpdate { check: true }));
}

#[test]
fn cli_rejects_install_without_package() {
    let err = Cli::try_parse_from(["modman", "install"]).expect_err("missing arg must fail");
    assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
}

#[test]
fn cli_rejects_unknown_completion_shell() {
    let err = Cli::try_parse_from(["modman", "completions", "tcsh"])
        .expect_err("unknown shell must fail");
    assert_eq!(err.kind(), ErrorKind::InvalidValue);
}

#[test]
fn completions_script_mentions_binary_and_subcommands() {
    let mut output = Vec::new();
    write_completions_script(CliCompletionShell::Bash, &mut output)
        .expect("completion generation must succeed");
    let script = String::from_utf8(output).expect("script must be utf-8");
    assert!(script.contains("modman"));
    assert!(script.contains("self-update"));
}
