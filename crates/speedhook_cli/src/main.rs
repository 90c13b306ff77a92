//! Scripted driver for the extension runtime.
//!
//! # Responsibility
//! - Boot the in-memory game host and feed one tick per command-line token
//!   through the trigger mapper.
//! - Print domain, active value and label color after every tick so a run
//!   can be compared line by line.
//!
//! Each tick is `-` (idle), `up`/`down` (host speed buttons) or a
//! comma-separated trigger list such as `Alpha5,Alpha7`; see `--help`.

use clap::Parser;
use speedhook_core::host::memory::{SimulatedGame, SimulatedTimeManager};
use speedhook_core::{
    default_log_level, init_logging, DomainOwner, ExtensionConfig, ExtensionContext, LogTarget,
    TriggerId, TriggerMapper,
};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::ExitCode;

const LABEL: &str = "Game Speed Text";

#[derive(Parser, Debug)]
#[command(name = "speedhook_cli", version, about = "Replay input ticks against the simulated game")]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value_t = default_log_level().to_string())]
    level: String,
    /// Absolute directory for rotating log files; logs go to stderr otherwise.
    #[arg(long)]
    log_dir: Option<PathBuf>,
    /// Ticks spent on the loading screen before the session loads.
    #[arg(long, default_value_t = 0)]
    boot_ticks: usize,
    /// `-` (idle), `up`/`down` or a comma-separated trigger list.
    #[arg(required = true)]
    ticks: Vec<String>,
}

impl Cli {
    fn log_target(&self) -> LogTarget {
        match &self.log_dir {
            Some(dir) => LogTarget::Directory(dir.clone()),
            None => LogTarget::Stderr,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(message) = init_logging(&cli.level, cli.log_target()) {
        eprintln!("speedhook_cli: logging disabled: {message}");
    }

    let mut ctx = match ExtensionContext::new(ExtensionConfig::game_speed()) {
        Ok(ctx) => ctx,
        Err(err) => {
            eprintln!("speedhook_cli: invalid configuration: {err}");
            return ExitCode::from(2);
        }
    };
    let mut game = SimulatedGame::booting();
    let mapper = TriggerMapper::new();

    println!("speedhook_core version={}", speedhook_core::core_version());
    for (tick, token) in cli.ticks.iter().enumerate() {
        if tick == cli.boot_ticks && game.time_manager().is_none() {
            game.load_session(SimulatedTimeManager::stock());
            game.add_label(LABEL, speedhook_core::Color::WHITE);
            log::info!("event=session_load module=cli tick={tick}");
        }

        match token.as_str() {
            "-" => {}
            "up" | "down" => match game.time_manager_mut() {
                Some(manager) if token == "up" => manager.increase(),
                Some(manager) => manager.decrease(),
                None => log::warn!("event=host_button module=cli status=skip reason=booting"),
            },
            triggers => {
                let report = mapper.on_tick(&mut ctx, &mut game, &parse_tick(triggers));
                for outcome in &report.outcomes {
                    log::debug!("event=tick_outcome module=cli tick={tick} outcome={outcome:?}");
                }
            }
        }
        print_state(tick, token, &game);
    }

    let stats = ctx.stats();
    println!(
        "stats ensure_calls={} merge_writes={} deferred={} activations={}",
        stats.ensure_calls, stats.merge_writes, stats.deferred, stats.activations
    );
    if let Some(reason) = ctx.disabled_reason() {
        println!("extension disabled: {reason}");
    }
    ExitCode::SUCCESS
}

fn parse_tick(token: &str) -> BTreeSet<TriggerId> {
    token
        .split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(TriggerId::new)
        .collect()
}

fn print_state(tick: usize, token: &str, game: &SimulatedGame) {
    let color = game
        .label(LABEL)
        .map(|label| label.borrow().color.to_string())
        .unwrap_or_else(|| "-".to_string());
    match game.time_manager() {
        Some(manager) => println!(
            "tick={tick} input={token} domain={:?} index={} value={:?} color={color}",
            manager.scales(),
            manager.active_index(),
            manager.active_value()
        ),
        None => println!("tick={tick} input={token} host=booting"),
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_tick, Cli};
    use clap::Parser;
    use speedhook_core::{LogTarget, TriggerId};
    use std::path::PathBuf;

    #[test]
    fn parses_flags_and_ticks() {
        let cli = Cli::try_parse_from([
            "speedhook_cli",
            "--level",
            "warn",
            "--boot-ticks",
            "2",
            "Alpha5",
            "-",
            "up",
        ])
        .expect("valid args");
        assert_eq!(cli.level, "warn");
        assert_eq!(cli.boot_ticks, 2);
        assert_eq!(cli.log_target(), LogTarget::Stderr);
        assert_eq!(cli.ticks, vec!["Alpha5", "-", "up"]);
    }

    #[test]
    fn log_dir_selects_file_target() {
        let cli = Cli::try_parse_from(["speedhook_cli", "--log-dir", "/tmp/speedhook", "Alpha0"])
            .expect("valid args");
        assert_eq!(
            cli.log_target(),
            LogTarget::Directory(PathBuf::from("/tmp/speedhook"))
        );
        assert_eq!(cli.boot_ticks, 0);
    }

    #[test]
    fn rejects_missing_ticks_and_unknown_flags() {
        assert!(Cli::try_parse_from(["speedhook_cli", "--level", "info"]).is_err());
        assert!(Cli::try_parse_from(["speedhook_cli", "--fast", "Alpha5"]).is_err());
        assert!(Cli::try_parse_from(["speedhook_cli", "--boot-ticks", "soon", "Alpha5"]).is_err());
    }

    #[test]
    fn splits_combined_triggers() {
        let tick = parse_tick("Alpha5, Alpha7,");
        assert_eq!(tick.len(), 2);
        assert!(tick.contains(&TriggerId::new("Alpha7")));
    }
}
