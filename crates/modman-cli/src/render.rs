use std::io::IsTerminal;
use std::time::{Duration, Instant};

use anstyle::{AnsiColor, Effects, Style};
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use modman_core::CatalogEntry;
use modman_installer::{InstalledRecord, PackageStatus, UninstallOutcome, UninstallStatus};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

pub(crate) fn current_output_style(force_plain: bool) -> OutputStyle {
    if force_plain || std::env::var_os("NO_COLOR").is_some() || !std::io::stdout().is_terminal() {
        OutputStyle::Plain
    } else {
        OutputStyle::Rich
    }
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct TerminalRenderer {
    style: OutputStyle,
}

/// Progress display for one operation. Plain output prints nothing until
/// the final summary line.
pub(crate) struct TerminalProgress {
    style: OutputStyle,
    label: String,
    unit: ProgressUnit,
    total: u64,
    current: u64,
    progress_bar: Option<ProgressBar>,
    started_at: Instant,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum ProgressUnit {
    Percent,
    Bytes,
}

impl TerminalRenderer {
    pub(crate) fn from_style(style: OutputStyle) -> Self {
        Self { style }
    }

    pub(crate) fn style(self) -> OutputStyle {
        self.style
    }

    pub(crate) fn print_status(self, status: &str, message: &str) {
        println!("{}", render_status_line(self.style, status, message));
    }

    pub(crate) fn print_section(self, title: &str) {
        if self.style == OutputStyle::Rich {
            println!();
            println!("{}", colorize(section_style(), &format!("== {title} ==")));
        }
    }

    pub(crate) fn print_lines(self, lines: &[String]) {
        for line in lines {
            println!("{line}");
        }
    }

    pub(crate) fn start_progress(self, label: &str, unit: ProgressUnit, total: u64) -> TerminalProgress {
        let progress_bar = if self.style == OutputStyle::Rich {
            let progress_bar = ProgressBar::new(total.max(1));
            let template = match unit {
                ProgressUnit::Percent => {
                    "{spinner:.cyan.bold} {msg:<12} [{bar:24.cyan/blue}] {pos:>3}% {elapsed_precise}"
                }
                ProgressUnit::Bytes => {
                    "{spinner:.cyan.bold} {msg:<12} [{bar:24.cyan/blue}] {bytes}/{total_bytes} {elapsed_precise}"
                }
            };
            if let Ok(style) = ProgressStyle::with_template(template) {
                progress_bar.set_style(
                    style
                        .tick_chars(progress_tick_chars(label))
                        .progress_chars("=>-"),
                );
            }
            progress_bar.set_message(label.to_string());
            progress_bar.enable_steady_tick(Duration::from_millis(80));
            Some(progress_bar)
        } else {
            None
        };

        TerminalProgress {
            style: self.style,
            label: label.to_string(),
            unit,
            total,
            current: 0,
            progress_bar,
            started_at: Instant::now(),
        }
    }
}

impl TerminalProgress {
    pub(crate) fn set(&mut self, current: u64) {
        self.current = current;

        let Some(progress_bar) = &self.progress_bar else {
            return;
        };

        let safe_total = self.total.max(1);
        progress_bar.set_length(safe_total);
        progress_bar.set_position(self.current.min(safe_total));
    }

    pub(crate) fn set_total(&mut self, total: u64) {
        self.total = total;
        if let Some(progress_bar) = &self.progress_bar {
            progress_bar.set_length(total.max(1));
        }
    }

    pub(crate) fn finish_success(mut self) {
        let Some(progress_bar) = self.progress_bar.take() else {
            return;
        };

        progress_bar.finish_and_clear();
        if let Some(line) = render_progress_line(
            self.style,
            &self.label,
            self.unit,
            self.current,
            self.total,
            Some(self.started_at.elapsed()),
        ) {
            println!("{line}");
        }
    }

    pub(crate) fn finish_abandon(mut self) {
        if let Some(progress_bar) = self.progress_bar.take() {
            progress_bar.finish_and_clear();
        }
    }
}

pub(crate) fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => format!("[{}] {message}", status.to_ascii_uppercase()),
    }
}

pub(crate) fn render_progress_line(
    style: OutputStyle,
    label: &str,
    unit: ProgressUnit,
    current: u64,
    total: u64,
    elapsed: Option<Duration>,
) -> Option<String> {
    if style == OutputStyle::Plain {
        return None;
    }

    let width = 18_usize;
    let safe_total = total.max(1);
    let bounded_current = current.min(safe_total);
    let filled = ((bounded_current as usize) * width) / (safe_total as usize);
    let bar = format!(
        "{}{}",
        "=".repeat(filled),
        "-".repeat(width.saturating_sub(filled))
    );
    let percent = (bounded_current * 100) / safe_total;
    let counts = match unit {
        ProgressUnit::Percent => String::new(),
        ProgressUnit::Bytes => format!(" {}/{}", HumanBytes(current), HumanBytes(total)),
    };
    let suffix = elapsed
        .map(|value| format!(" complete in {}", format_elapsed(value)))
        .unwrap_or_default();

    Some(format!(
        "{} [{}] {:>3}%{}{}",
        colorize(progress_label_style(), label),
        colorize(progress_bar_style(), &bar),
        percent,
        counts,
        suffix
    ))
}

pub(crate) fn format_status_label(status: &PackageStatus) -> String {
    match status {
        PackageStatus::NotInstalled => "not installed".to_string(),
        PackageStatus::LegacyInstall => "installed (unknown version)".to_string(),
        PackageStatus::MissingFiles { version } => {
            format!("{version} recorded, files missing")
        }
        PackageStatus::Installed { version } => format!("installed {version}"),
        PackageStatus::UpToDate { version } => format!("up to date ({version})"),
        PackageStatus::UpdateAvailable { installed, latest } => {
            format!("update available: {installed} -> {latest}")
        }
    }
}

pub(crate) fn status_badge(status: &PackageStatus) -> &'static str {
    match status {
        PackageStatus::NotInstalled => "info",
        PackageStatus::Installed { .. } | PackageStatus::UpToDate { .. } => "ok",
        PackageStatus::LegacyInstall
        | PackageStatus::MissingFiles { .. }
        | PackageStatus::UpdateAvailable { .. } => "warn",
    }
}

pub(crate) fn format_catalog_line(entry: &CatalogEntry, status: &PackageStatus) -> String {
    format!(
        "{} ({}): {}",
        entry.name,
        entry.id,
        format_status_label(status)
    )
}

pub(crate) fn format_install_outcome_lines(
    record: &InstalledRecord,
    style: OutputStyle,
) -> Vec<String> {
    let verb = if record.replaced_existing {
        "reinstalled"
    } else {
        "installed"
    };
    vec![
        render_status_line(
            style,
            "ok",
            &format!("{verb} {} {}", record.package_id, record.version),
        ),
        render_status_line(
            style,
            "step",
            &format!("path: {}", record.install_path.display()),
        ),
        render_status_line(
            style,
            "step",
            &format!("artifact sha256: {}", record.artifact_sha256),
        ),
    ]
}

pub(crate) fn format_uninstall_messages(outcome: &UninstallOutcome) -> Vec<String> {
    let version = outcome.version.as_deref().unwrap_or("unknown");
    match outcome.status {
        UninstallStatus::NotInstalled => vec![format!("{} is not installed", outcome.package_id)],
        UninstallStatus::Uninstalled => {
            vec![format!("uninstalled {} {}", outcome.package_id, version)]
        }
        UninstallStatus::RepairedStaleState => vec![format!(
            "removed stale state for {} {} (package files already missing)",
            outcome.package_id, version
        )],
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let millis = elapsed.subsec_millis();
    format!("{secs}.{millis:03}s")
}

fn progress_tick_chars(label: &str) -> &'static str {
    match label {
        "install" => ".oO@* ",
        "update" => "<^>v ",
        "uninstall" => "\\|/- ",
        "self-update" => ".:;* ",
        _ => "|/-\\ ",
    }
}

fn section_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightBlue.into()))
        .effects(Effects::BOLD)
}

fn progress_label_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightCyan.into()))
        .effects(Effects::BOLD)
}

fn progress_bar_style() -> Style {
    Style::new().fg_color(Some(AnsiColor::BrightBlue.into()))
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}
