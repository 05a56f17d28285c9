//! The fixed resolution tier table.
//!
//! Every wheel in the engine belongs to exactly one [`Tier`]. A tier knows how
//! often its wheel ticks, how much base-unit time (milliseconds) each tick is
//! worth, and which task intervals it accepts at registration. The table is
//! static: nothing here changes after startup.

use crate::error::TimerError;
use std::fmt;
use std::time::Duration;

const SEC: i64 = 1_000;
const MIN: i64 = 60 * SEC;
const HOUR: i64 = 60 * MIN;
const DAY: i64 = 24 * HOUR;
/// Calendar months are approximated as 30 days.
const MONTH: i64 = 30 * DAY;

/// One of the seven resolution classes, ordered from finest to coarsest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tier {
    /// 5ms ticks, intervals in `[5ms, 100ms]`.
    SmallMs = 1,
    /// 50ms ticks, intervals in `[100ms, 1s]`.
    BigMs = 2,
    /// 1s ticks, intervals in `[1s, 60s]`.
    Second = 3,
    /// 60s ticks, intervals in `[1min, 60min]`.
    Minute = 4,
    /// 30min ticks, intervals in `[1h, 24h]`.
    Day = 5,
    /// 12h ticks, intervals in `[1d, 30d]`.
    Month = 6,
    /// 15d ticks, intervals in `[1mo, 12mo]`.
    Year = 7,
}

/// The inclusive interval range, in milliseconds, a tier accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierRange {
    pub min: i64,
    pub max: i64,
}

impl TierRange {
    /// Registration check: both ends inclusive.
    pub fn accepts(&self, interval: i64) -> bool {
        self.min <= interval && interval <= self.max
    }

    /// Cascade check: `(min, max]`, plus the exact lower boundary.
    pub fn covers(&self, remaining: i64) -> bool {
        (self.min < remaining && remaining <= self.max) || remaining == self.min
    }
}

impl Tier {
    /// All tiers, finest first.
    pub const ALL: [Tier; 7] = [
        Tier::SmallMs,
        Tier::BigMs,
        Tier::Second,
        Tier::Minute,
        Tier::Day,
        Tier::Month,
        Tier::Year,
    ];

    pub const FINEST: Tier = Tier::SmallMs;
    pub const COARSEST: Tier = Tier::Year;

    /// Numeric identifier, `1..=7`.
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Wall-clock time between two ticks of this tier's wheel.
    pub fn period(self) -> Duration {
        Duration::from_millis(self.scale() as u64)
    }

    /// The tick period expressed in milliseconds.
    pub fn scale(self) -> i64 {
        match self {
            Tier::SmallMs => 5,
            Tier::BigMs => 50,
            Tier::Second => SEC,
            Tier::Minute => MIN,
            Tier::Day => 30 * MIN,
            Tier::Month => 12 * HOUR,
            Tier::Year => 15 * DAY,
        }
    }

    pub fn range(self) -> TierRange {
        let (min, max) = match self {
            Tier::SmallMs => (5, 100),
            Tier::BigMs => (100, SEC),
            Tier::Second => (SEC, MIN),
            Tier::Minute => (MIN, HOUR),
            Tier::Day => (HOUR, DAY),
            Tier::Month => (DAY, MONTH),
            Tier::Year => (MONTH, 12 * MONTH),
        };
        TierRange { min, max }
    }

    /// The next finer tier, or `None` for the finest one.
    pub fn finer(self) -> Option<Tier> {
        match self {
            Tier::SmallMs => None,
            other => Tier::try_from(other.id() - 1).ok(),
        }
    }

    pub fn is_finest(self) -> bool {
        self == Tier::FINEST
    }

    /// Index into per-tier arrays.
    pub(crate) fn index(self) -> usize {
        self.id() as usize - 1
    }
}

impl TryFrom<u8> for Tier {
    type Error = TimerError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Tier::ALL
            .iter()
            .copied()
            .find(|tier| tier.id() == id)
            .ok_or(TimerError::UnknownTier { id })
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Tier::SmallMs => "5ms",
            Tier::BigMs => "50ms",
            Tier::Second => "1s",
            Tier::Minute => "60s",
            Tier::Day => "30min",
            Tier::Month => "12h",
            Tier::Year => "15d",
        };
        f.write_str(label)
    }
}
