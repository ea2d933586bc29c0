use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::limits::MINUTES_PER_DAY;

/// Minutes since midnight — the only time-of-day type.
pub type Minutes = u32;

/// Half-open interval `[start, end)` in minutes since midnight.
///
/// A window parsed from "HH:MM-HH:MM" where the end clock reads at or before
/// the start clock wraps past midnight: its `end` is pushed out by 24h, so
/// "22:00-02:00" becomes `[1320, 1560)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: Minutes,
    pub end: Minutes,
}

impl TimeWindow {
    /// Returns true if `self` fully contains `other`.
    pub fn contains(&self, other: &TimeWindow) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let end = self.end % MINUTES_PER_DAY;
        write!(
            f,
            "{:02}:{:02}-{:02}:{:02}",
            self.start / 60,
            self.start % 60,
            end / 60,
            end % 60
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowParseError {
    MissingSeparator,
    BadClock(String),
}

impl fmt::Display for WindowParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowParseError::MissingSeparator => {
                write!(f, "time window must look like HH:MM-HH:MM")
            }
            WindowParseError::BadClock(token) => write!(f, "bad clock time: {token}"),
        }
    }
}

impl std::error::Error for WindowParseError {}

impl FromStr for TimeWindow {
    type Err = WindowParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (begin, finish) = s.split_once('-').ok_or(WindowParseError::MissingSeparator)?;
        let start = parse_clock(begin)?;
        let mut end = parse_clock(finish)?;
        if end <= start {
            // overnight span: the end clock reads the next day
            end += MINUTES_PER_DAY;
        }
        Ok(Self { start, end })
    }
}

fn parse_clock(token: &str) -> Result<Minutes, WindowParseError> {
    let bad = || WindowParseError::BadClock(token.to_string());
    let (h, m) = token.split_once(':').ok_or_else(bad)?;
    let h: Minutes = h.parse().map_err(|_| bad())?;
    let m: Minutes = m.parse().map_err(|_| bad())?;
    if h > 23 || m > 59 {
        return Err(bad());
    }
    Ok(h * 60 + m)
}

// Windows travel as their "HH:MM-HH:MM" string form in every document.
impl Serialize for TimeWindow {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeWindow {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Courier transport type. Determines the carrying capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourierType {
    Foot,
    Bike,
    Car,
}

impl CourierType {
    /// Static capacity table: foot carries 10, bike 15, car 50 weight units.
    pub fn max_weight(&self) -> f64 {
        match self {
            CourierType::Foot => 10.0,
            CourierType::Bike => 15.0,
            CourierType::Car => 50.0,
        }
    }
}

impl FromStr for CourierType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "foot" => Ok(CourierType::Foot),
            "bike" => Ok(CourierType::Bike),
            "car" => Ok(CourierType::Car),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    NotAssigned,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Courier {
    pub id: u64,
    pub courier_type: CourierType,
    pub regions: Vec<u32>,
    pub working_hours: Vec<TimeWindow>,
    /// Completed assignment batches, bumped once per batch when the courier
    /// returns to zero in-progress orders.
    pub assigns: u32,
}

/// Partial courier update; absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourierPatch {
    pub courier_type: Option<CourierType>,
    pub regions: Option<Vec<u32>>,
    pub working_hours: Option<Vec<TimeWindow>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub weight: f64,
    pub region: u32,
    pub delivery_hours: Vec<TimeWindow>,
    pub status: OrderStatus,
    pub courier_id: Option<u64>,
    pub assign_time: Option<DateTime<Utc>>,
    pub complete_time: Option<DateTime<Utc>>,
}

impl Order {
    pub fn new(id: u64, weight: f64, region: u32, delivery_hours: Vec<TimeWindow>) -> Self {
        Self {
            id,
            weight,
            region,
            delivery_hours,
            status: OrderStatus::NotAssigned,
            courier_id: None,
            assign_time: None,
            complete_time: None,
        }
    }
}
