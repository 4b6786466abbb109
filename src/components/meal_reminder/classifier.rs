use crate::config::WindowConfig;
use crate::error::{config_error, BotResult};
use crate::utils::time::parse_time;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Meal a reminder is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Lunch,
    Dinner,
}

impl MealType {
    pub const ALL: [MealType; 2] = [MealType::Lunch, MealType::Dinner];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed time-of-day interval; both ends count as inside
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MealWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl MealWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> BotResult<Self> {
        if start > end {
            return Err(config_error(&format!(
                "Window start {} is after end {}",
                start.format("%H:%M"),
                end.format("%H:%M")
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse a window from its "HH:MM" config form
    pub fn from_config(name: &str, window: &WindowConfig) -> BotResult<Self> {
        let parse = |value: &str| {
            parse_time(value)
                .ok_or_else(|| config_error(&format!("Invalid {} time: {}", name, value)))
        };
        Self::new(parse(&window.start)?, parse(&window.end)?)
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start <= time && time <= self.end
    }
}

/// Lunch and dinner windows used to classify event start times
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MealWindows {
    pub lunch: MealWindow,
    pub dinner: MealWindow,
}

impl MealWindows {
    /// Meal an event starting at `time` falls into, if any
    pub fn classify(&self, time: NaiveTime) -> Option<MealType> {
        if self.lunch.contains(time) {
            Some(MealType::Lunch)
        } else if self.dinner.contains(time) {
            Some(MealType::Dinner)
        } else {
            None
        }
    }
}
