//! Base travel questionnaire collected before the dialogue.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Preferred part of the day for the visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    #[default]
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    /// Default arrival time for this part of the day.
    pub fn default_arrival(&self) -> &'static str {
        match self {
            TimeOfDay::Morning => "09:00",
            TimeOfDay::Afternoon => "14:00",
            TimeOfDay::Evening => "18:00",
            TimeOfDay::Night => "20:00",
        }
    }

    /// Chinese label used in prompts.
    pub fn label(&self) -> &'static str {
        match self {
            TimeOfDay::Morning => "上午",
            TimeOfDay::Afternoon => "下午",
            TimeOfDay::Evening => "晚上",
            TimeOfDay::Night => "夜间",
        }
    }
}

/// Rational trip facts: when, how many, from where.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelQuestionnaire {
    pub travel_date: NaiveDate,
    #[serde(default)]
    pub travel_time: TimeOfDay,
    pub traveler_count: u32,
    pub departure_location: String,
}

impl TravelQuestionnaire {
    pub fn validate(&self) -> Result<()> {
        if self.traveler_count == 0 {
            return Err(Error::InvalidInput("travelerCount must be at least 1".into()));
        }
        if self.departure_location.trim().is_empty() {
            return Err(Error::InvalidInput("departureLocation is required".into()));
        }
        Ok(())
    }

    /// Region used for place search; `全国` when no departure location is known.
    pub fn search_region(&self) -> &str {
        let loc = self.departure_location.trim();
        if loc.is_empty() {
            "全国"
        } else {
            loc
        }
    }

    /// Prompt block describing the questionnaire.
    pub fn describe(&self) -> String {
        format!(
            "- 出行日期：{}\n- 出行时间：{}\n- 人数：{}\n- 出发地：{}",
            self.travel_date,
            self.travel_time.label(),
            self.traveler_count,
            self.departure_location
        )
    }
}
