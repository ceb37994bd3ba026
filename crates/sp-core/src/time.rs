//! Simulation time model.
//!
//! # Design
//!
//! Absolute time is a `SimTime` holding Unix seconds (UTC).  The stepping
//! clock is held in `SimClock`:
//!
//!   current_time = start + step * time_step_secs
//!
//! Using integer seconds as the canonical time unit means all schedule
//! arithmetic is exact (no floating-point drift) and comparisons are O(1).
//! Civil-date conversion uses the proleptic Gregorian calendar, so ingestion
//! code can parse timestamps without a datetime library.

use std::fmt;

use crate::{CoreError, CoreResult};

// ── SimTime ──────────────────────────────────────────────────────────────────

/// An absolute instant, in whole seconds since the Unix epoch (UTC).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimTime(pub i64);

impl SimTime {
    pub const EPOCH: SimTime = SimTime(0);

    /// Build from a civil date and time of day.
    pub fn from_civil(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
    ) -> CoreResult<SimTime> {
        if !(1..=12).contains(&month) {
            return Err(CoreError::TimeParse(format!("month {month} out of range")));
        }
        if day == 0 || day > days_in_month(year, month) {
            return Err(CoreError::TimeParse(format!(
                "day {day} out of range for {year:04}-{month:02}"
            )));
        }
        if hour > 23 || minute > 59 || second > 59 {
            return Err(CoreError::TimeParse(format!(
                "time of day {hour:02}:{minute:02}:{second:02} out of range"
            )));
        }
        let days = days_from_civil(year as i64, month as i64, day as i64);
        Ok(SimTime(
            days * 86_400 + hour as i64 * 3_600 + minute as i64 * 60 + second as i64,
        ))
    }

    /// Decompose into `(year, month, day, hour, minute, second)`.
    pub fn to_civil(self) -> (i32, u32, u32, u32, u32, u32) {
        let days = self.0.div_euclid(86_400);
        let secs = self.0.rem_euclid(86_400);
        let (y, m, d) = civil_from_days(days);
        (
            y as i32,
            m as u32,
            d as u32,
            (secs / 3_600) as u32,
            ((secs % 3_600) / 60) as u32,
            (secs % 60) as u32,
        )
    }

    /// Parse `YYYY-MM-DDTHH:MM[:SS]` (a space may replace the `T`; a trailing
    /// `Z` is accepted).  A bare `YYYY-MM-DD` means midnight.
    pub fn parse_iso8601(s: &str) -> CoreResult<SimTime> {
        let s = s.trim();
        let s = s.strip_suffix('Z').unwrap_or(s);
        let (date, clock) = match s.find(['T', ' ']) {
            Some(i) => (&s[..i], &s[i + 1..]),
            None => (s, ""),
        };

        let bad = || CoreError::TimeParse(format!("invalid ISO-8601 timestamp {s:?}"));

        let mut date_parts = date.split('-');
        let year: i32 = date_parts.next().and_then(|p| p.parse().ok()).ok_or_else(bad)?;
        let month: u32 = date_parts.next().and_then(|p| p.parse().ok()).ok_or_else(bad)?;
        let day: u32 = date_parts.next().and_then(|p| p.parse().ok()).ok_or_else(bad)?;
        if date_parts.next().is_some() {
            return Err(bad());
        }

        let (mut hour, mut minute, mut second) = (0, 0, 0);
        if !clock.is_empty() {
            let mut clock_parts = clock.split(':');
            hour = clock_parts.next().and_then(|p| p.parse().ok()).ok_or_else(bad)?;
            minute = clock_parts.next().and_then(|p| p.parse().ok()).ok_or_else(bad)?;
            if let Some(sec) = clock_parts.next() {
                // Fractional seconds are truncated.
                let whole = sec.split('.').next().unwrap_or(sec);
                second = whole.parse().map_err(|_| bad())?;
            }
            if clock_parts.next().is_some() {
                return Err(bad());
            }
        }

        SimTime::from_civil(year, month, day, hour, minute, second)
    }

    /// The instant `secs` seconds after `self` (negative goes back).
    #[inline]
    pub fn offset(self, secs: i64) -> SimTime {
        SimTime(self.0 + secs)
    }

    /// Seconds elapsed from `earlier` to `self` (negative if `earlier` is
    /// later).
    #[inline]
    pub fn seconds_since(self, earlier: SimTime) -> i64 {
        self.0 - earlier.0
    }
}

impl std::ops::Add<i64> for SimTime {
    type Output = SimTime;
    #[inline]
    fn add(self, rhs: i64) -> SimTime {
        SimTime(self.0 + rhs)
    }
}

impl std::ops::Sub<i64> for SimTime {
    type Output = SimTime;
    #[inline]
    fn sub(self, rhs: i64) -> SimTime {
        SimTime(self.0 - rhs)
    }
}

impl std::ops::Sub for SimTime {
    type Output = i64;
    #[inline]
    fn sub(self, rhs: SimTime) -> i64 {
        self.0 - rhs.0
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (y, mo, d, h, mi, s) = self.to_civil();
        write!(f, "{y:04}-{mo:02}-{d:02}T{h:02}:{mi:02}:{s:02}")
    }
}

// ── Calendar helpers ──────────────────────────────────────────────────────────

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        _ => 28,
    }
}

/// Days since 1970-01-01 for a proleptic Gregorian date.
fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let mp = if month > 2 { month - 3 } else { month + 9 };
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

/// Inverse of [`days_from_civil`].
fn civil_from_days(days: i64) -> (i64, i64, i64) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + if month <= 2 { 1 } else { 0 };
    (year, month, day)
}

// ── SimClock ──────────────────────────────────────────────────────────────────

/// Tracks the current step of a driver loop and maps it to absolute time.
///
/// `SimClock` is cheap to copy and intentionally holds no heap data.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimClock {
    /// Absolute time of step 0.
    pub start: SimTime,
    /// Length of one step in seconds.
    pub time_step_secs: u32,
    /// The current step — advanced by `SimClock::advance()` each iteration.
    pub current_step: u64,
}

impl SimClock {
    pub fn new(start: SimTime, time_step_secs: u32) -> Self {
        Self {
            start,
            time_step_secs,
            current_step: 0,
        }
    }

    #[inline]
    pub fn advance(&mut self) {
        self.current_step += 1;
    }

    /// Return to step 0.
    #[inline]
    pub fn reset(&mut self) {
        self.current_step = 0;
    }

    /// Elapsed simulated seconds since step 0.
    #[inline]
    pub fn elapsed_secs(&self) -> i64 {
        self.current_step as i64 * self.time_step_secs as i64
    }

    #[inline]
    pub fn current_time(&self) -> SimTime {
        self.start + self.elapsed_secs()
    }

    /// How many steps span `secs` seconds? (rounds up)
    #[inline]
    pub fn steps_for_secs(&self, secs: u64) -> u64 {
        secs.div_ceil(self.time_step_secs.max(1) as u64)
    }
}

impl fmt::Display for SimClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} ({})", self.current_step, self.current_time())
    }
}

// ── DriverConfig ──────────────────────────────────────────────────────────────

/// Top-level stepping configuration for a release run.
///
/// Typically loaded from a TOML/JSON file by the application crate and passed
/// to the driver.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DriverConfig {
    /// Absolute time of the first step.
    pub start_time: SimTime,

    /// Seconds per step.  Must be non-zero.
    pub time_step_secs: u32,

    /// Total steps to run.
    pub num_steps: u64,

    /// Master RNG seed.  The same seed always produces identical releases.
    pub seed: u64,
}

impl DriverConfig {
    /// The instant at which the run ends (exclusive upper bound).
    #[inline]
    pub fn end_time(&self) -> SimTime {
        self.start_time + self.num_steps as i64 * self.time_step_secs as i64
    }

    /// Reject configurations the stepping loop can't run.
    pub fn validate(&self) -> CoreResult<()> {
        if self.time_step_secs == 0 {
            return Err(CoreError::Config("time_step_secs must be > 0".into()));
        }
        Ok(())
    }

    /// Construct a `SimClock` pre-configured for this run.
    pub fn make_clock(&self) -> SimClock {
        SimClock::new(self.start_time, self.time_step_secs)
    }
}
