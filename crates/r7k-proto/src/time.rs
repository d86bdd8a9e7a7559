//! 7k time stamps.
//!
//! Records carry UTC time as year, day of year, hours, minutes and a `f32`
//! seconds field holding the fractional part. The wire layout is 10 bytes
//! inside the DRF header (see [`crate::header::DataRecordFrameHeader`]).

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// UTC time as carried in a data record frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Time7k {
    /// Full year (e.g. 2024)
    pub year: u16,
    /// Day of year, 1..=366
    pub day: u16,
    /// Seconds within the minute, including the fractional part
    pub seconds: f32,
    /// Hour of day, 0..=23
    pub hours: u8,
    /// Minute of hour, 0..=59
    pub minutes: u8,
}

impl Time7k {
    /// Size of the time stamp on the wire
    pub const SIZE: usize = 10;

    /// Samples the current UTC time.
    #[must_use]
    pub fn now() -> Self {
        Self::from_datetime(&Utc::now())
    }

    /// Converts a UTC date-time.
    ///
    /// Leap seconds fold into the following second's fraction, so `seconds`
    /// stays below 60.
    #[must_use]
    pub fn from_datetime(time: &DateTime<Utc>) -> Self {
        let nanos = time.nanosecond() % 1_000_000_000;
        Self {
            year: u16::try_from(time.year()).unwrap_or(0),
            day: time.ordinal() as u16,
            seconds: time.second() as f32 + nanos as f32 / 1e9,
            hours: time.hour() as u8,
            minutes: time.minute() as u8,
        }
    }

    /// Converts back to a UTC date-time.
    ///
    /// Returns `None` when any field is out of range (day 0, hour 24,
    /// non-finite seconds, ...).
    #[must_use]
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        if !self.seconds.is_finite() || !(0.0..61.0).contains(&self.seconds) {
            return None;
        }
        let naive = NaiveDate::from_yo_opt(i32::from(self.year), u32::from(self.day))?
            .and_hms_opt(u32::from(self.hours), u32::from(self.minutes), 0)?;
        let offset = Duration::nanoseconds((f64::from(self.seconds) * 1e9).round() as i64);
        Some(Utc.from_utc_datetime(&naive) + offset)
    }

    /// Seconds since the Unix epoch, with sub-second precision.
    #[must_use]
    pub fn to_epoch_seconds(&self) -> Option<f64> {
        self.to_datetime().map(|t| t.timestamp_micros() as f64 / 1e6)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_datetime_fields() {
        let t = Utc.with_ymd_and_hms(2024, 2, 1, 13, 45, 30).single().expect("valid date");
        let t7k = Time7k::from_datetime(&(t + Duration::milliseconds(250)));

        assert_eq!(t7k.year, 2024);
        assert_eq!(t7k.day, 32);
        assert_eq!(t7k.hours, 13);
        assert_eq!(t7k.minutes, 45);
        assert!((t7k.seconds - 30.25).abs() < 1e-4);
    }

    #[test]
    fn first_day_of_year_is_one() {
        let t = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).single().expect("valid date");
        assert_eq!(Time7k::from_datetime(&t).day, 1);
    }

    #[test]
    fn datetime_round_trip_to_millisecond() {
        let t = Utc.with_ymd_and_hms(2019, 12, 31, 23, 59, 59).single().expect("valid date")
            + Duration::milliseconds(500);
        let back = Time7k::from_datetime(&t).to_datetime().expect("in range");
        assert!((back - t).num_milliseconds().abs() <= 1);
    }

    #[test]
    fn epoch_seconds() {
        let t7k = Time7k { year: 1970, day: 2, seconds: 1.5, hours: 0, minutes: 0 };
        let secs = t7k.to_epoch_seconds().expect("in range");
        assert!((secs - 86_401.5).abs() < 1e-6);
    }

    #[test]
    fn out_of_range_fields() {
        let zero_day = Time7k { year: 2024, day: 0, ..Time7k::default() };
        assert_eq!(zero_day.to_datetime(), None);

        let bad_hour = Time7k { year: 2024, day: 1, hours: 24, ..Time7k::default() };
        assert_eq!(bad_hour.to_datetime(), None);

        let bad_seconds = Time7k { year: 2024, day: 1, seconds: f32::NAN, ..Time7k::default() };
        assert_eq!(bad_seconds.to_datetime(), None);
    }
}
