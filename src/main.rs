use anyhow::{bail, Context};
use std::env;
use std::path::{Path, PathBuf};
use twinpane::app::resolve_destination;
use twinpane::models::item_set::ItemSet;
use twinpane::models::operation::RunOutcome;
use twinpane::models::tab::Tab;
use twinpane::system::archive::detect_archive_format;
use twinpane::ui::{TerminalUi, UiBridge};
use twinpane::utils::formatter::{format_epoch, format_file_size};
use twinpane::utils::logging::init_logging;
use twinpane::{AppContext, Options};

const USAGE: &str = "\
usage: tp <action> [args]
  copy <dest> <name>...
  move <dest> <name>...
  delete <name>...
  rename <name>...
  backup <name>...
  size <name>...
  compress <format> <dir>...
  uncompress <dest> <archive>...
  mount <archive>";

/// 실행 결과 요약 (터미널 복구 후 출력)
enum Summary {
    Outcome(RunOutcome),
    Sizes(Option<Vec<(String, String)>>),
    Message(String),
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let Some((action, rest)) = args.split_first() else {
        println!("{}", USAGE);
        return Ok(());
    };

    let options = Options::load().context("failed to load options")?;
    let _guard = init_logging(&options.log).context("failed to initialize logging")?;
    if let Some(path) = Options::default_path().filter(|path| !path.exists()) {
        if let Err(e) = options.save_to(&path) {
            tracing::warn!(path = %path.display(), error = %e, "failed to write default config");
        }
    }
    let cwd = env::current_dir().context("cannot read current directory")?;
    tracing::info!(action = %action, args = rest.len(), "tp started");

    let ui = TerminalUi::new().context("failed to enter terminal mode")?;
    let mut app = AppContext::new(options, ui);
    let result = run_action(&mut app, action, rest, &cwd);
    app.ui.restore()?;

    match result? {
        Summary::Outcome(outcome) => print_outcome(&outcome),
        Summary::Sizes(None) => println!("stopped"),
        Summary::Sizes(Some(lines)) => {
            for (name, line) in lines {
                println!("{:<30} {}", name, line);
            }
        }
        Summary::Message(message) => println!("{}", message),
    }
    Ok(())
}

fn run_action(
    app: &mut AppContext<TerminalUi>,
    action: &str,
    args: &[String],
    cwd: &Path,
) -> anyhow::Result<Summary> {
    let summary = match (action, args) {
        ("copy" | "move", [dest, names @ ..]) if !names.is_empty() => {
            let (dest, rename_dir) = resolve_destination(dest, cwd, names)?;
            let set = ItemSet::build(names, cwd)?;
            let outcome = if action == "copy" {
                app.run_copy(&set, &dest, rename_dir)?
            } else {
                app.run_move(&set, &dest, rename_dir)?
            };
            Summary::Outcome(outcome)
        }
        ("delete", names) if !names.is_empty() => {
            let set = ItemSet::build(names, cwd)?;
            Summary::Outcome(app.run_delete(&set)?)
        }
        ("rename", names) if !names.is_empty() => {
            Summary::Outcome(app.run_rename(names.to_vec(), cwd)?)
        }
        ("backup", names) if !names.is_empty() => {
            Summary::Outcome(app.run_backup(names.to_vec(), cwd, None)?)
        }
        ("size", names) if !names.is_empty() => {
            let infos = app.run_dir_size(names.to_vec(), cwd)?;
            Summary::Sizes(infos.map(|infos| {
                names
                    .iter()
                    .cloned()
                    .zip(infos)
                    .map(|(name, info)| {
                        let line = format!(
                            "{}{} {:>10} {}",
                            info.file_type.marker(),
                            info.permissions,
                            format_file_size(info.size),
                            format_epoch(info.modified)
                        );
                        (name, line)
                    })
                    .collect()
            }))
        }
        ("compress", [format, dirs @ ..]) if !dirs.is_empty() => {
            let Some(format) = detect_archive_format(Path::new(&format!("archive.{}", format)))
            else {
                bail!("unknown archive format: {}", format);
            };
            let dirs: Vec<PathBuf> = dirs.iter().map(|d| cwd.join(d)).collect();
            Summary::Outcome(app.run_compress_dirs(&dirs, format)?)
        }
        ("uncompress", [dest, archives @ ..]) if !archives.is_empty() => {
            let archives: Vec<PathBuf> = archives.iter().map(|a| cwd.join(a)).collect();
            Summary::Outcome(app.run_uncompress(&archives, &cwd.join(dest))?)
        }
        ("mount", [archive]) => browse_archive(app, &cwd.join(archive), cwd)?,
        _ => bail!("{}", USAGE),
    };
    Ok(summary)
}

/// 아카이브를 열고, 빈 입력이 들어올 때까지 그 안을 이동한다
fn browse_archive(
    app: &mut AppContext<TerminalUi>,
    archive: &Path,
    cwd: &Path,
) -> anyhow::Result<Summary> {
    let mut tab = Tab::new(cwd.to_path_buf());
    if !app.mount_archive(&mut tab, archive)? {
        return Ok(Summary::Message("stopped".to_string()));
    }

    while tab.is_mounted() {
        let shown = tab.display_path().display().to_string();
        let input = app
            .ui
            .prompt_text("vfs", &format!("{}  (.. to go up, empty to leave)", shown), "");
        match input.as_deref().map(str::trim) {
            None | Some("") => {
                if !app.unmount_vfs(&mut tab)? {
                    continue;
                }
            }
            Some("..") => {
                app.exit_dir(&mut tab)?;
            }
            Some(target) => {
                let target = tab.path().join(target);
                if let Err(e) = app.go_to(&mut tab, &target) {
                    app.ui.report_error(&e.to_string());
                }
            }
        }
    }
    Ok(Summary::Message(format!(
        "left {}",
        tab.display_path().display()
    )))
}

fn print_outcome(outcome: &RunOutcome) {
    let report = outcome.report();
    if outcome.is_stopped() {
        println!("stopped by user");
    }
    println!(
        "processed {}, skipped {}, failed {}",
        report.processed.len(),
        report.skipped.len(),
        report.failures.len()
    );
    for failure in &report.failures {
        println!(
            "  {}: {} ({})",
            failure.path.display(),
            failure.message,
            failure.code
        );
    }
}
