//! Time sources and calendar-day arithmetic.
//!
//! The record store never reads the system clock directly. It asks an
//! injected [`Clock`] for "now" and a [`Zone`] for which calendar day a
//! timestamp belongs to, so "today" is explicit and testable.

use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, Offset, SubsecRound, Utc};

use crate::error::{Error, Result};

/// A source of the current time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;

    /// The current instant truncated to whole milliseconds.
    ///
    /// Stored timestamps use this so that their ISO-8601 form round-trips.
    fn now_millis(&self) -> DateTime<Utc> {
        self.now().trunc_subsecs(3)
    }
}

/// The wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock frozen at `now`.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Jump to a new instant.
    pub fn set(&self, now: DateTime<Utc>) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map_or_else(|e| *e.into_inner(), |guard| *guard)
    }
}

/// The time zone used to decide calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Zone {
    /// The host's local time zone, including daylight saving transitions.
    #[default]
    Local,
    /// A fixed offset from UTC.
    Fixed(FixedOffset),
}

impl Zone {
    /// UTC as a fixed zone.
    #[must_use]
    pub fn utc() -> Self {
        Self::Fixed(Utc.fix())
    }

    /// Parse a zone from `local`, `utc`, `Z`, or an offset like `+05:30` / `-0800`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the text is not a recognised zone.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("local") {
            return Ok(Self::Local);
        }
        if text.eq_ignore_ascii_case("utc") || text == "Z" {
            return Ok(Self::utc());
        }
        parse_offset(text).map(Self::Fixed).ok_or_else(|| Error::ConfigValidation {
            message: format!("invalid UTC offset '{text}' (expected local, utc or ±HH:MM)"),
        })
    }

    /// The calendar day that `timestamp` falls on in this zone.
    #[must_use]
    pub fn date_of(&self, timestamp: DateTime<Utc>) -> NaiveDate {
        match self {
            Self::Local => timestamp.with_timezone(&Local).date_naive(),
            Self::Fixed(offset) => timestamp.with_timezone(offset).date_naive(),
        }
    }

    /// `timestamp` as wall-clock time in this zone, for display.
    #[must_use]
    pub fn localize(&self, timestamp: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            Self::Local => timestamp.with_timezone(&Local).fixed_offset(),
            Self::Fixed(offset) => timestamp.with_timezone(offset),
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

fn parse_offset(text: &str) -> Option<FixedOffset> {
    // Byte-indexed splits below rely on ASCII input.
    if !text.is_ascii() {
        return None;
    }
    let (sign, rest) = match text.as_bytes().first()? {
        b'+' => (1, &text[1..]),
        b'-' => (-1, &text[1..]),
        _ => return None,
    };
    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() == 4 => rest.split_at(2),
        None if rest.len() <= 2 => (rest, "0"),
        None => return None,
    };
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
