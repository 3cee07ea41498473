//! Parsing for the plant care fields, which travel as short strings.

use chrono::NaiveTime;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CareFieldError {
    #[error("lastChecked must be a HH:MM time, got '{0}'")]
    Clock(String),
    #[error("wateringInterval must be \"<days> <hours>\" with hours below 24, got '{0}'")]
    Watering(String),
    #[error("fertilizerInterval must be \"<months> <days>\" with days below 31, got '{0}'")]
    Fertilizer(String),
}

/// `"D H"`: days and hours between waterings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WateringInterval {
    pub days: u32,
    pub hours: u32,
}

/// `"M D"`: months and days between fertilizer applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FertilizerInterval {
    pub months: u32,
    pub days: u32,
}

impl WateringInterval {
    pub fn parse(value: &str) -> Result<Self, CareFieldError> {
        match split_pair(value) {
            Some((days, hours)) if hours < 24 => Ok(Self { days, hours }),
            _ => Err(CareFieldError::Watering(value.to_string())),
        }
    }
}

impl FertilizerInterval {
    pub fn parse(value: &str) -> Result<Self, CareFieldError> {
        match split_pair(value) {
            Some((months, days)) if days < 31 => Ok(Self { months, days }),
            _ => Err(CareFieldError::Fertilizer(value.to_string())),
        }
    }
}

pub fn parse_last_checked(value: &str) -> Result<NaiveTime, CareFieldError> {
    // %H:%M alone would accept "8:5"; the field is always zero padded.
    if value.len() != 5 {
        return Err(CareFieldError::Clock(value.to_string()));
    }
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|_| CareFieldError::Clock(value.to_string()))
}

fn split_pair(value: &str) -> Option<(u32, u32)> {
    let mut parts = value.split_whitespace();
    let first = parts.next()?.parse().ok()?;
    let second = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((first, second))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watering_interval() {
        assert_eq!(
            WateringInterval::parse("3 12").unwrap(),
            WateringInterval { days: 3, hours: 12 }
        );
        assert_eq!(
            WateringInterval::parse(" 0  6 ").unwrap(),
            WateringInterval { days: 0, hours: 6 }
        );
        assert!(WateringInterval::parse("3 24").is_err());
        assert!(WateringInterval::parse("3").is_err());
        assert!(WateringInterval::parse("3 1 2").is_err());
        assert!(WateringInterval::parse("three 1").is_err());
    }

    #[test]
    fn fertilizer_interval() {
        assert_eq!(
            FertilizerInterval::parse("1 15").unwrap(),
            FertilizerInterval { months: 1, days: 15 }
        );
        assert!(FertilizerInterval::parse("1 31").is_err());
        assert!(FertilizerInterval::parse("-1 2").is_err());
    }

    #[test]
    fn last_checked_clock() {
        assert!(parse_last_checked("08:30").is_ok());
        assert!(parse_last_checked("23:59").is_ok());
        assert!(parse_last_checked("24:00").is_err());
        assert!(parse_last_checked("8:30").is_err());
        assert!(parse_last_checked("noon").is_err());
    }
}
