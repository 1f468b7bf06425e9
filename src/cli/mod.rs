pub mod client;
pub mod daemon_path;
pub mod output;
pub mod process;

use std::{env, path::Path, path::PathBuf};

use anyhow::{bail, Result};
use chrono::Weekday;
use clap::{Args as ClapArgs, Parser, Subcommand};
use client::ControlClient;
use daemon_path::to_daemon_path;
use output::{render_notification, render_status};
use process::{kill_previous_servers, restart_server};
use tracing::{info, level_filters::LevelFilter, warn};

use crate::{
    config::BudgetConfig,
    daemon::{
        control::protocol::{ControlRequest, ControlResponse},
        start_daemon,
    },
    utils::{
        dir::resolve_application_path,
        logging::{enable_logging, CLI_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "daybudget", version, long_about = None)]
#[command(about = "Daily computer time budget with overtime carry-over", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Starts a daemon for the application, replacing a running one")]
    Init,
    #[command(
        about = "Run a daemon directly in current console. Used for creating a daemon internally and for debugging"
    )]
    Serve,
    #[command(about = "Stop currently running daemon.")]
    Stop,
    #[command(about = "Show today's budget")]
    Status,
    #[command(about = "Pause the timer")]
    Pause,
    #[command(about = "Resume a paused timer")]
    Resume,
    #[command(about = "Turn accounting on")]
    Enable,
    #[command(about = "Turn accounting off")]
    Disable,
    #[command(about = "Change the configuration and apply it to a running daemon")]
    Configure {
        #[command(flatten)]
        budget: BudgetArgs,
        #[arg(long, help = "Pause the timer while the session is locked")]
        pause_on_lock: Option<bool>,
        #[arg(long, help = "Overtime opened when the budget runs out, in minutes")]
        default_overtime: Option<f64>,
    },
    #[command(about = "Grant overtime for today, only once the budget has run out")]
    Overtime {
        #[arg(help = "Overtime in minutes")]
        minutes: f64,
    },
    #[command(about = "Correct today's elapsed time")]
    Adjust {
        #[arg(allow_negative_numbers = true, help = "Seconds to add, negative to remove")]
        seconds: i64,
    },
    #[command(about = "Print notifications as they happen")]
    Watch,
}

/// Hours per weekday.
#[derive(ClapArgs, Debug, Default)]
struct BudgetArgs {
    #[arg(long)]
    monday: Option<f64>,
    #[arg(long)]
    tuesday: Option<f64>,
    #[arg(long)]
    wednesday: Option<f64>,
    #[arg(long)]
    thursday: Option<f64>,
    #[arg(long)]
    friday: Option<f64>,
    #[arg(long)]
    saturday: Option<f64>,
    #[arg(long)]
    sunday: Option<f64>,
}

impl BudgetArgs {
    fn entries(&self) -> [(Weekday, Option<f64>); 7] {
        [
            (Weekday::Mon, self.monday),
            (Weekday::Tue, self.tuesday),
            (Weekday::Wed, self.wednesday),
            (Weekday::Thu, self.thursday),
            (Weekday::Fri, self.friday),
            (Weekday::Sat, self.saturday),
            (Weekday::Sun, self.sunday),
        ]
    }
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();
    let dir = resolve_application_path(args.dir)?;

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(CLI_PREFIX, &dir.join("logs"), logging_level, args.log)?;

    match args.commands {
        Commands::Init => {
            let daemon = to_daemon_path(env::current_exe()?);
            restart_server(&daemon, &dir)?;
            println!("Daemon started");
            Ok(())
        }
        Commands::Serve => start_daemon(dir).await,
        Commands::Stop => {
            let daemon = to_daemon_path(env::current_exe()?);
            match kill_previous_servers(&daemon)? {
                0 => println!("No daemon is running"),
                count => println!("Stopped {count} daemon(s)"),
            }
            Ok(())
        }
        Commands::Status => {
            let response = ControlClient::connect(&dir)
                .await?
                .request(&ControlRequest::Status)
                .await?;
            match response {
                ControlResponse::Status { state } => {
                    println!("{}", render_status(&state));
                    Ok(())
                }
                other => unexpected(other),
            }
        }
        Commands::Pause => send(&dir, ControlRequest::Pause).await,
        Commands::Resume => send(&dir, ControlRequest::Resume).await,
        Commands::Enable => set_enabled(&dir, true).await,
        Commands::Disable => set_enabled(&dir, false).await,
        Commands::Configure {
            budget,
            pause_on_lock,
            default_overtime,
        } => {
            let mut config = BudgetConfig::load(&dir).await?;
            apply_changes(&mut config, &budget, pause_on_lock, default_overtime);
            config.save(&dir).await?;
            info!("Configuration saved {config:?}");
            apply_to_daemon(&dir, ControlRequest::Reconfigure).await
        }
        Commands::Overtime { minutes } => {
            send(&dir, ControlRequest::GrantOvertime { minutes }).await
        }
        Commands::Adjust { seconds } => send(&dir, ControlRequest::Adjust { seconds }).await,
        Commands::Watch => watch(&dir).await,
    }
}

fn apply_changes(
    config: &mut BudgetConfig,
    budget: &BudgetArgs,
    pause_on_lock: Option<bool>,
    default_overtime: Option<f64>,
) {
    for (weekday, hours) in budget.entries() {
        if let Some(hours) = hours {
            config.budget.set_hours(weekday, Some(hours));
        }
    }
    if let Some(pause_on_lock) = pause_on_lock {
        config.pause_on_lock = pause_on_lock;
    }
    if let Some(minutes) = default_overtime {
        config.default_overtime_minutes = minutes;
    }
}

/// Keeps the configuration in line so the choice survives a daemon restart.
async fn set_enabled(dir: &Path, enabled: bool) -> Result<()> {
    let mut config = BudgetConfig::load(dir).await?;
    config.enabled = enabled;
    config.save(dir).await?;
    let request = if enabled {
        ControlRequest::Enable
    } else {
        ControlRequest::Disable
    };
    apply_to_daemon(dir, request).await
}

/// Like [send], but a missing daemon is fine since the change is already on disk.
async fn apply_to_daemon(dir: &Path, request: ControlRequest) -> Result<()> {
    match ControlClient::connect(dir).await {
        Ok(mut client) => expect_ok(client.request(&request).await?),
        Err(e) => {
            warn!("Daemon not reachable {e:?}");
            println!("Saved, the change applies when the daemon starts");
            Ok(())
        }
    }
}

async fn send(dir: &Path, request: ControlRequest) -> Result<()> {
    let response = ControlClient::connect(dir).await?.request(&request).await?;
    expect_ok(response)
}

fn expect_ok(response: ControlResponse) -> Result<()> {
    match response {
        ControlResponse::Ok => {
            println!("Done");
            Ok(())
        }
        other => unexpected(other),
    }
}

fn unexpected(response: ControlResponse) -> Result<()> {
    match response {
        ControlResponse::Error { message } => bail!("Daemon refused: {message}"),
        other => bail!("Unexpected response {other:?}"),
    }
}

async fn watch(dir: &Path) -> Result<()> {
    let mut client = ControlClient::connect(dir).await?;
    expect_ok(client.request(&ControlRequest::Watch).await?)?;
    loop {
        match client.receive().await? {
            ControlResponse::Notification { event } => {
                println!("{}", render_notification(&event))
            }
            other => unexpected(other)?,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Weekday;
    use clap::Parser;

    use crate::config::BudgetConfig;

    use super::{apply_changes, Args, Commands};

    #[test]
    fn negative_adjustments_parse() {
        let args = Args::try_parse_from(["daybudget", "adjust", "-300"]).unwrap();
        assert!(matches!(args.commands, Commands::Adjust { seconds: -300 }));
    }

    #[test]
    fn configure_changes_only_given_fields() {
        let args = Args::try_parse_from([
            "daybudget",
            "configure",
            "--monday",
            "2.5",
            "--pause-on-lock",
            "false",
            "--dir",
            "/tmp/budget",
        ])
        .unwrap();
        let Commands::Configure {
            budget,
            pause_on_lock,
            default_overtime,
        } = args.commands
        else {
            panic!("Expected configure");
        };

        let mut config = BudgetConfig::default();
        config.budget.set_hours(Weekday::Tue, Some(1.));
        apply_changes(&mut config, &budget, pause_on_lock, default_overtime);

        assert_eq!(config.budget.hours(Weekday::Mon), Some(2.5));
        assert_eq!(config.budget.hours(Weekday::Tue), Some(1.));
        assert!(!config.pause_on_lock);
        assert_eq!(config.default_overtime_minutes, 0.);
        assert_eq!(args.dir.unwrap().to_str(), Some("/tmp/budget"));
    }
}
