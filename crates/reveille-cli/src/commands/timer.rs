use std::error::Error;
use std::time::Duration;

use clap::Subcommand;

use reveille_core::platform::RecordStore;
use reveille_core::session::{pause_timer, stop_timer, TimerSession};
use reveille_core::{format_hms, Clock};

use super::common::{self, App};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start a countdown ("25m", "90s", "1h10m", "05:00")
    Start {
        #[arg(value_parser = common::parse_duration_ms)]
        duration: i64,
        #[arg(long, default_value = "")]
        label: String,
        #[arg(long)]
        no_vibrate: bool,
        /// Stay attached and print the countdown until it finishes
        #[arg(long)]
        watch: bool,
    },
    /// List timers
    List {
        /// Emit JSON instead of the table
        #[arg(long)]
        json: bool,
    },
    /// Pause a running timer
    Pause { id: i64 },
    /// Resume a paused timer
    Resume {
        id: i64,
        /// Stay attached and print the countdown until it finishes
        #[arg(long)]
        watch: bool,
    },
    /// Stop a timer
    Stop { id: i64 },
    /// Start a fresh countdown with a finished timer's settings
    Restart {
        id: i64,
        #[arg(long)]
        watch: bool,
    },
}

pub async fn run(action: TimerAction) -> Result<(), Box<dyn Error>> {
    let app = common::init()?;
    match action {
        TimerAction::Start {
            duration,
            label,
            no_vibrate,
            watch,
        } => {
            let vibrate = !no_vibrate && app.config.timer.vibrate;
            let session = TimerSession::start(&app.ctx, duration, &label, vibrate)?;
            println!("timer #{} started ({})", session.timer_id(), format_hms(duration));
            if watch {
                watch_session(&app, &session).await;
            }
            Ok(())
        }
        TimerAction::List { json } => {
            let timers = app.store.list_timers()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&timers)?);
                return Ok(());
            }
            if timers.is_empty() {
                println!("no timers");
                return Ok(());
            }
            let now_ms = app.ctx.clock.now_ms();
            for timer in timers {
                let state = match (timer.finished, timer.paused) {
                    (true, _) => "finished",
                    (_, true) => "paused",
                    _ if timer.running => "running",
                    _ => "stopped",
                };
                println!(
                    "#{:<4} {:<8} {} / {}  {}",
                    timer.id,
                    state,
                    timer.formatted_remaining(now_ms),
                    format_hms(timer.duration_ms),
                    timer.label
                );
            }
            Ok(())
        }
        TimerAction::Pause { id } => {
            pause_timer(&app.ctx, id)?;
            println!("timer #{id} paused");
            Ok(())
        }
        TimerAction::Resume { id, watch } => {
            let session = TimerSession::resume(&app.ctx, id)?;
            println!("timer #{id} resumed");
            if watch {
                watch_session(&app, &session).await;
            }
            Ok(())
        }
        TimerAction::Stop { id } => {
            stop_timer(&app.ctx, id)?;
            println!("timer #{id} stopped");
            Ok(())
        }
        TimerAction::Restart { id, watch } => {
            let from = app
                .store
                .get_timer(id)?
                .ok_or_else(|| format!("no timer #{id}"))?;
            let session = TimerSession::restart(&app.ctx, &from)?;
            println!("timer #{} restarted ({})", session.timer_id(), format_hms(from.duration_ms));
            if watch {
                watch_session(&app, &session).await;
            }
            Ok(())
        }
    }
}

/// Block until the session stops (finish + alert window, or Ctrl-C).
async fn watch_session(app: &App, session: &std::sync::Arc<TimerSession>) {
    loop {
        if session.is_stopped() {
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(500)) => {}
            _ = tokio::signal::ctrl_c() => {
                let _ = stop_timer(&app.ctx, session.timer_id());
                println!("timer #{} stopped", session.timer_id());
                break;
            }
        }
    }
}
