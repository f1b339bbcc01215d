use std::error::Error;
use std::time::Duration;

use clap::Subcommand;

use reveille_core::platform::{RecordStore, TriggerPayload};
use reveille_core::session::{dismiss_ringing, handle_trigger, snooze_ringing};
use reveille_core::{Alarm, Clock, RingOutcome};

use super::common::{self, App};

#[derive(Subcommand)]
pub enum AlarmAction {
    /// Create an alarm and schedule it
    Add {
        /// Time of day, HH:MM
        #[arg(value_parser = common::parse_time)]
        time: chrono::NaiveTime,
        #[arg(long, default_value = "")]
        label: String,
        /// Repeat days: "mon,wed,fri", "weekdays", "weekends" or "daily"
        #[arg(long, value_parser = common::parse_days)]
        days: Option<reveille_core::WeekdaySet>,
        /// Number of pre-alarms before the main trigger (0-10)
        #[arg(long, default_value_t = 0)]
        pre_alarms: u32,
        #[arg(long)]
        no_vibrate: bool,
        #[arg(long)]
        flash: bool,
    },
    /// List alarms
    List {
        /// Emit JSON instead of the table
        #[arg(long)]
        json: bool,
    },
    /// Enable or disable an alarm
    Toggle { id: i64 },
    /// Delete an alarm and cancel its slots
    Remove { id: i64 },
    /// Ring an alarm now and interactively snooze or dismiss it
    Ring {
        id: i64,
        /// Snooze instead of dismissing after the preview
        #[arg(long)]
        snooze: bool,
        /// How long to let it ring, in seconds
        #[arg(long, default_value_t = 3)]
        seconds: u64,
    },
}

pub async fn run(action: AlarmAction) -> Result<(), Box<dyn Error>> {
    let app = common::init()?;
    match action {
        AlarmAction::Add {
            time,
            label,
            days,
            pre_alarms,
            no_vibrate,
            flash,
        } => {
            let mut alarm = Alarm::new(time);
            app.config.apply_alarm_defaults(&mut alarm);
            alarm.label = label;
            alarm.repeat_days = days.unwrap_or_default();
            alarm.pre_alarm_count = pre_alarms.min(reveille_core::MAX_PRE_ALARMS);
            alarm.vibrate = !no_vibrate;
            alarm.flash = flash;

            let id = app.store.save_alarm(&alarm)?;
            alarm.id = id;
            match app.ctx.scheduler.schedule(&alarm)? {
                Some(_) => println!(
                    "alarm #{id} set for {} ({})",
                    alarm.formatted_time(app.config.use_24h),
                    alarm.time_until(app.ctx.clock.now_local())
                ),
                None => println!("alarm #{id} saved (not scheduled)"),
            }
            Ok(())
        }
        AlarmAction::List { json } => {
            let alarms = app.store.list_alarms()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&alarms)?);
                return Ok(());
            }
            if alarms.is_empty() {
                println!("no alarms");
                return Ok(());
            }
            let now = app.ctx.clock.now_local();
            for alarm in alarms {
                let state = if alarm.enabled { "on " } else { "off" };
                let until = if alarm.enabled {
                    format!(" (in {})", alarm.time_until(now))
                } else {
                    String::new()
                };
                println!(
                    "#{:<4} {} {} {}{}  {}",
                    alarm.id,
                    state,
                    alarm.formatted_time(app.config.use_24h),
                    alarm.repeat_summary(),
                    until,
                    alarm.label
                );
            }
            Ok(())
        }
        AlarmAction::Toggle { id } => {
            let mut alarm = app
                .store
                .get_alarm(id)?
                .ok_or_else(|| format!("no alarm #{id}"))?;
            alarm.enabled = !alarm.enabled;
            app.store.save_alarm(&alarm)?;
            app.ctx.scheduler.schedule(&alarm)?;
            println!(
                "alarm #{id} {}",
                if alarm.enabled { "enabled" } else { "disabled" }
            );
            Ok(())
        }
        AlarmAction::Remove { id } => {
            app.ctx.scheduler.cancel(id);
            app.store.delete_alarm(id)?;
            println!("alarm #{id} removed");
            Ok(())
        }
        AlarmAction::Ring { id, snooze, seconds } => ring(&app, id, snooze, seconds).await,
    }
}

async fn ring(app: &App, id: i64, snooze: bool, seconds: u64) -> Result<(), Box<dyn Error>> {
    let Some(_session) = handle_trigger(&app.ctx, TriggerPayload::main(id))? else {
        return Err(format!("no alarm #{id}").into());
    };
    tokio::time::sleep(Duration::from_secs(seconds)).await;

    if snooze {
        match snooze_ringing(&app.ctx)? {
            Some(RingOutcome::Snoozed { until_ms }) => {
                let now_ms = app.ctx.clock.now_ms();
                println!(
                    "snoozed for {}",
                    reveille_core::format_hms(until_ms - now_ms)
                );
            }
            _ => println!("snooze not allowed, dismissed"),
        }
    } else {
        dismiss_ringing(&app.ctx)?;
        println!("dismissed");
    }
    Ok(())
}
