use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Contribution cadence of a campaign.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    #[default]
    Monthly,
}

impl Frequency {
    /// Moves `from` forward by `steps` periods; month steps clamp the day to the target month.
    pub fn advance(self, from: NaiveDate, steps: u32) -> Option<NaiveDate> {
        match self {
            Frequency::Daily => from.checked_add_signed(Duration::days(steps as i64)),
            Frequency::Weekly => from.checked_add_signed(Duration::weeks(steps as i64)),
            Frequency::Monthly => from.checked_add_months(Months::new(steps)),
        }
    }

    /// Start of the period containing `now`: midnight UTC of the day, of Monday, or of the 1st.
    pub fn period_start(self, now: DateTime<Utc>) -> DateTime<Utc> {
        let date = now.date_naive();
        let start = match self {
            Frequency::Daily => date,
            Frequency::Weekly => {
                date - Duration::days(date.weekday().num_days_from_monday() as i64)
            }
            Frequency::Monthly => date - Duration::days(date.day0() as i64),
        };
        Utc.from_utc_datetime(&start.and_time(NaiveTime::MIN))
    }

    pub fn label(self) -> &'static str {
        match self {
            Frequency::Daily => "Daily",
            Frequency::Weekly => "Weekly",
            Frequency::Monthly => "Monthly",
        }
    }
}

/// How "has contributed this period" draws its period boundary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PeriodPolicy {
    /// Day, ISO week or calendar month, following the campaign frequency.
    #[default]
    Frequency,
    /// Always the calendar month, regardless of frequency.
    CalendarMonth,
}

impl PeriodPolicy {
    pub fn period_start(self, frequency: Frequency, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            PeriodPolicy::Frequency => frequency.period_start(now),
            PeriodPolicy::CalendarMonth => Frequency::Monthly.period_start(now),
        }
    }
}
