//! Shared CLI plumbing: wiring the core's session context with console
//! implementations of the platform traits, plus small input parsers.

use std::error::Error;
use std::sync::Arc;

use chrono::Weekday;
use tracing::{debug, info};

use reveille_core::clock::{Clock, SystemClock};
use reveille_core::effects::{FlashDevice, SoundDevice, VibrationDevice};
use reveille_core::error::EffectError;
use reveille_core::facility::{spawn_dispatcher, TokioTimerFacility};
use reveille_core::platform::{AlertKind, AlertPayload, AlertSink, ExactTimerFacility, SurfaceId};
use reveille_core::storage::{data_dir, Config, Database};
use reveille_core::{format_hms, AlarmScheduler, SessionContext, WeekdaySet};

pub struct App {
    pub ctx: Arc<SessionContext>,
    pub store: Arc<Database>,
    pub config: Config,
}

/// Open the store and stand the session context up on console devices.
///
/// The exact-timer facility is in-process: reservations only fire while
/// this invocation is alive, which is what the interactive `ring`/`watch`
/// commands need.
pub fn init() -> Result<App, Box<dyn Error>> {
    let config = Config::load()?;
    let store = Arc::new(Database::open(&data_dir()?.join("reveille.db"))?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let (facility, rx) = TokioTimerFacility::new(Arc::clone(&clock));
    let scheduler = Arc::new(AlarmScheduler::new(
        facility as Arc<dyn ExactTimerFacility>,
        Arc::clone(&clock),
    ));
    let ctx = Arc::new(SessionContext {
        store: store.clone(),
        sink: Arc::new(ConsoleSink),
        sound: Arc::new(ConsoleSound),
        vibration: Arc::new(ConsoleVibration),
        flash: Arc::new(ConsoleFlash),
        clock,
        scheduler,
        sessions: Default::default(),
    });
    spawn_dispatcher(Arc::clone(&ctx), rx);
    Ok(App { ctx, store, config })
}

// ── Console platform implementations ─────────────────────────────

struct ConsoleSink;

impl AlertSink for ConsoleSink {
    fn open_alert_surface(&self, kind: AlertKind, payload: &AlertPayload) -> SurfaceId {
        match payload {
            AlertPayload::Alarm { alarm_id, label, .. } => {
                let name = if label.is_empty() { "alarm" } else { label };
                match kind {
                    AlertKind::PreAlarm => println!("(pre-alarm) {name} [#{alarm_id}]"),
                    _ => println!("ALARM {name} [#{alarm_id}]"),
                }
            }
            AlertPayload::Timer { timer_id, label } => {
                let name = if label.is_empty() { "timer" } else { label };
                println!("timer {name} [#{timer_id}]");
            }
        }
        uuid_string()
    }

    fn update_progress(&self, _surface: &SurfaceId, remaining_ms: i64, total_ms: i64, paused: bool) {
        let state = if paused { " (paused)" } else { "" };
        println!("  {} / {}{state}", format_hms(remaining_ms), format_hms(total_ms));
    }

    fn close_alert_surface(&self, _surface: &SurfaceId) {
        debug!("alert surface closed");
    }
}

fn uuid_string() -> String {
    // The sink contract only wants a unique handle.
    format!("cli-{:x}", std::process::id() as u64 ^ chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0) as u64)
}

struct ConsoleSound;

impl SoundDevice for ConsoleSound {
    fn play(&self, looped: bool, volume: f32) -> Result<(), EffectError> {
        info!(looped, volume, "sound on");
        Ok(())
    }

    fn set_volume(&self, volume: f32) -> Result<(), EffectError> {
        debug!(volume, "volume");
        Ok(())
    }

    fn stop(&self) {
        info!("sound off");
    }
}

struct ConsoleVibration;

impl VibrationDevice for ConsoleVibration {
    fn start_pattern(&self, on_ms: u64, off_ms: u64, repeat: bool) -> Result<(), EffectError> {
        info!(on_ms, off_ms, repeat, "vibration on");
        Ok(())
    }

    fn cancel(&self) {
        info!("vibration off");
    }
}

struct ConsoleFlash;

impl FlashDevice for ConsoleFlash {
    fn has_flash(&self) -> bool {
        false
    }

    fn start_pattern(&self, _on_ms: u64, _off_ms: u64) -> Result<(), EffectError> {
        Err(EffectError::new("flash", "no flash on this host"))
    }

    fn stop(&self) {}
}

// ── Input parsing ────────────────────────────────────────────────

/// Parse "07:30" into a time of day.
pub fn parse_time(s: &str) -> Result<chrono::NaiveTime, String> {
    chrono::NaiveTime::parse_from_str(s, "%H:%M")
        .map_err(|_| format!("invalid time '{s}', expected HH:MM"))
}

/// Parse "mon,wed,fri" (also "weekdays", "weekends", "daily") into a set.
pub fn parse_days(s: &str) -> Result<WeekdaySet, String> {
    match s {
        "daily" | "all" => return Ok(WeekdaySet::ALL),
        "weekdays" => return Ok(WeekdaySet::WEEKDAYS),
        "weekends" => return Ok(WeekdaySet::WEEKENDS),
        _ => {}
    }
    let mut set = WeekdaySet::EMPTY;
    for part in s.split(',') {
        let day = match part.trim().to_ascii_lowercase().as_str() {
            "mon" | "monday" => Weekday::Mon,
            "tue" | "tuesday" => Weekday::Tue,
            "wed" | "wednesday" => Weekday::Wed,
            "thu" | "thursday" => Weekday::Thu,
            "fri" | "friday" => Weekday::Fri,
            "sat" | "saturday" => Weekday::Sat,
            "sun" | "sunday" => Weekday::Sun,
            other => return Err(format!("unknown weekday '{other}'")),
        };
        set.insert(day);
    }
    Ok(set)
}

/// Parse a duration like "25m", "90s", "1h10m30s" or "MM:SS" / "H:MM:SS".
pub fn parse_duration_ms(s: &str) -> Result<i64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration".into());
    }

    if s.contains(':') {
        let parts: Vec<&str> = s.split(':').collect();
        let nums: Result<Vec<i64>, _> = parts
            .iter()
            .map(|p| p.parse::<i64>().map_err(|_| format!("invalid duration '{s}'")))
            .collect();
        let nums = nums?;
        let seconds = match nums.as_slice() {
            [m, sec] => m * 60 + sec,
            [h, m, sec] => h * 3600 + m * 60 + sec,
            _ => return Err(format!("invalid duration '{s}'")),
        };
        return Ok(seconds * 1000);
    }

    let mut total_secs: i64 = 0;
    let mut digits = String::new();
    for ch in s.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }
        let value: i64 = digits
            .parse()
            .map_err(|_| format!("invalid duration '{s}'"))?;
        digits.clear();
        total_secs += match ch {
            'h' => value * 3600,
            'm' => value * 60,
            's' => value,
            _ => return Err(format!("invalid duration unit '{ch}'")),
        };
    }
    if !digits.is_empty() {
        // Bare number: minutes.
        total_secs += digits
            .parse::<i64>()
            .map_err(|_| format!("invalid duration '{s}'"))?
            * 60;
    }
    if total_secs <= 0 {
        return Err("duration must be positive".into());
    }
    Ok(total_secs * 1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_durations() {
        assert_eq!(parse_duration_ms("25m").unwrap(), 25 * 60_000);
        assert_eq!(parse_duration_ms("90s").unwrap(), 90_000);
        assert_eq!(parse_duration_ms("1h10m30s").unwrap(), 4_230_000);
        assert_eq!(parse_duration_ms("05:00").unwrap(), 300_000);
        assert_eq!(parse_duration_ms("1:00:00").unwrap(), 3_600_000);
        assert_eq!(parse_duration_ms("3").unwrap(), 180_000);
        assert!(parse_duration_ms("0s").is_err());
        assert!(parse_duration_ms("abc").is_err());
    }

    #[test]
    fn parses_day_sets() {
        assert_eq!(parse_days("daily").unwrap(), WeekdaySet::ALL);
        assert_eq!(parse_days("weekdays").unwrap(), WeekdaySet::WEEKDAYS);
        let set = parse_days("mon,wed,fri").unwrap();
        assert_eq!(set.len(), 3);
        assert!(set.contains(Weekday::Wed));
        assert!(parse_days("mon,foo").is_err());
    }

    #[test]
    fn parses_times() {
        assert_eq!(
            parse_time("07:30").unwrap(),
            chrono::NaiveTime::from_hms_opt(7, 30, 0).unwrap()
        );
        assert!(parse_time("25:00").is_err());
    }
}
