//! Daily trigger at a wall-clock time in a named timezone.

use std::future::Future;
use std::time::Duration;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Days, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use paper_notifier_core::config::ScheduleConfig;
use tracing::{error, info};

const DEFAULT_RUN_TIME: (u32, u32) = (9, 0);

#[derive(Debug, Clone, Copy)]
pub struct DailySchedule {
    tz: Tz,
    time: NaiveTime,
}

impl DailySchedule {
    pub fn from_config(config: &ScheduleConfig) -> Result<Self> {
        let tz: Tz = config
            .timezone
            .trim()
            .parse()
            .map_err(|_| anyhow!("unknown timezone: {}", config.timezone))?;
        let (hour, minute) = parse_run_time(&config.run_time);
        let time = NaiveTime::from_hms_opt(hour, minute, 0)
            .ok_or_else(|| anyhow!("invalid run time: {}", config.run_time))?;
        Ok(Self { tz, time })
    }

    /// First trigger strictly after `now`. A run time that falls into a DST
    /// gap fires at the first valid instant after it.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Tz> {
        let local_now = now.with_timezone(&self.tz);
        let mut day = local_now.date_naive();
        loop {
            if let Some(candidate) = self.resolve(day)
                && candidate > local_now
            {
                return candidate;
            }
            day = day.checked_add_days(Days::new(1)).unwrap_or(day);
        }
    }

    fn resolve(&self, day: chrono::NaiveDate) -> Option<DateTime<Tz>> {
        let naive = day.and_time(self.time);
        self.tz.from_local_datetime(&naive).earliest().or_else(|| {
            (0..=120)
                .map(|m| naive + chrono::Duration::minutes(m))
                .find_map(|shifted| self.tz.from_local_datetime(&shifted).earliest())
        })
    }
}

/// `H:MM` or `HH:MM`, clamped to 0–23 / 0–59; anything else is 09:00.
pub fn parse_run_time(value: &str) -> (u32, u32) {
    let Some((hour, minute)) = value.trim().split_once(':') else {
        return DEFAULT_RUN_TIME;
    };
    let digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    if !(1..=2).contains(&hour.len()) || minute.len() != 2 || !digits(hour) || !digits(minute) {
        return DEFAULT_RUN_TIME;
    }
    match (hour.parse::<u32>(), minute.parse::<u32>()) {
        (Ok(h), Ok(m)) => (h.min(23), m.min(59)),
        _ => DEFAULT_RUN_TIME,
    }
}

/// `"1h 2m 3s"`; zero components are omitted and non-positive input is `"0s"`.
pub fn format_countdown(seconds: i64) -> String {
    if seconds <= 0 {
        return "0s".to_string();
    }
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if secs > 0 || parts.is_empty() {
        parts.push(format!("{secs}s"));
    }
    parts.join(" ")
}

/// Run `job` at every trigger until Ctrl-C. A failed run is logged and the
/// loop waits for the next trigger.
pub async fn run_daily<F, Fut>(schedule: DailySchedule, mut job: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    info!(
        timezone = %schedule.tz,
        run_time = %schedule.time.format("%H:%M"),
        "scheduler started"
    );

    loop {
        let now = Utc::now();
        let next = schedule.next_after(now);
        let wait = (next.with_timezone(&Utc) - now).num_seconds();
        info!(
            next_run = %next.format("%Y-%m-%d %H:%M:%S %Z"),
            countdown = %format_countdown(wait),
            "waiting for next run"
        );

        let sleep = tokio::time::sleep(Duration::from_secs(wait.max(0).unsigned_abs()));
        tokio::select! {
            _ = sleep => {}
            _ = tokio::signal::ctrl_c() => {
                info!("scheduler stopped");
                return Ok(());
            }
        }

        if let Err(err) = job().await {
            error!(error = %err, "scheduled run failed");
        }
    }
}
