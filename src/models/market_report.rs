use chrono::{DateTime, FixedOffset, Timelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Part of the trading day a briefing was written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayPart {
    Morning,
    Afternoon,
    Evening,
}

impl DayPart {
    /// Morning before noon, Afternoon until 18:00, Evening otherwise, in the given local offset.
    pub fn at(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        match now.with_timezone(&offset).hour() {
            0..=11 => DayPart::Morning,
            12..=17 => DayPart::Afternoon,
            _ => DayPart::Evening,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DayPart::Morning => "Morning",
            DayPart::Afternoon => "Afternoon",
            DayPart::Evening => "Evening",
        }
    }
}

impl From<String> for DayPart {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Morning" => DayPart::Morning,
            "Afternoon" => DayPart::Afternoon,
            _ => DayPart::Evening,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MarketReport {
    pub id: Uuid,
    pub content: String,
    #[sqlx(try_from = "String")]
    pub day_part: DayPart,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketBriefResponse {
    pub analysis: String,
    pub day_part: DayPart,
    pub generated_at: DateTime<Utc>,
    pub cached: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn day_part_follows_local_clock() {
        let kst = FixedOffset::east_opt(9 * 3600).unwrap();

        // 00:30 UTC is 09:30 KST
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 0, 30, 0).unwrap();
        assert_eq!(DayPart::at(t, kst), DayPart::Morning);

        // 05:00 UTC is 14:00 KST
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 5, 0, 0).unwrap();
        assert_eq!(DayPart::at(t, kst), DayPart::Afternoon);

        // 12:00 UTC is 21:00 KST
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(DayPart::at(t, kst), DayPart::Evening);
    }

    #[test]
    fn day_part_round_trips_through_text() {
        for part in [DayPart::Morning, DayPart::Afternoon, DayPart::Evening] {
            assert_eq!(DayPart::from(part.as_str().to_string()), part);
        }
    }
}
