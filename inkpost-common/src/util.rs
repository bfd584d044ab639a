use thiserror::Error;
use time::{Duration, UtcDateTime};

#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Default, Hash)]
pub struct PositiveDuration(Duration);

impl PositiveDuration {
    #[must_use]
    pub fn new(duration: Duration) -> Option<Self> {
        duration.is_positive().then_some(Self(duration))
    }

    #[must_use]
    pub fn from_seconds(seconds: i64) -> Option<Self> {
        Self::new(Duration::seconds(seconds))
    }

    #[must_use]
    pub fn get(&self) -> Duration {
        self.0
    }

    #[must_use]
    pub fn whole_seconds(&self) -> i64 {
        self.0.whole_seconds()
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The duration is not positive: {0}")]
pub struct NonPositiveDurationError(Duration);

impl TryFrom<Duration> for PositiveDuration {
    type Error = NonPositiveDurationError;

    fn try_from(value: Duration) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(NonPositiveDurationError(value))
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Unix timestamp {0} is out of range")]
pub struct TimestampOutOfRangeError(pub i64);

/// The current time at the one-second resolution timestamps are stored with.
#[must_use]
pub fn now_seconds() -> UtcDateTime {
    let now = UtcDateTime::now();
    now - Duration::nanoseconds(i64::from(now.nanosecond()))
}

/// Seconds since the unix epoch, the representation used for every stored timestamp.
pub fn from_unix_seconds(seconds: i64) -> Result<UtcDateTime, TimestampOutOfRangeError> {
    UtcDateTime::from_unix_timestamp(seconds).map_err(|_| TimestampOutOfRangeError(seconds))
}

#[cfg(test)]
mod tests {
    use crate::util::{PositiveDuration, from_unix_seconds, now_seconds};
    use time::{Duration, macros::utc_datetime};

    #[test]
    fn positive_duration() {
        assert!(PositiveDuration::new(Duration::seconds(1)).is_some());
        assert!(PositiveDuration::new(Duration::ZERO).is_none());
        assert!(PositiveDuration::from_seconds(-5).is_none());
        assert!(PositiveDuration::try_from(Duration::seconds(-1)).is_err());

        let week = PositiveDuration::from_seconds(604_800).unwrap();
        assert_eq!(week.get(), Duration::weeks(1));
        assert_eq!(week.whole_seconds(), 604_800);
    }

    #[test]
    fn unix_seconds() {
        assert_eq!(
            from_unix_seconds(1_761_300_000).unwrap(),
            utc_datetime!(2025-10-24 10:00)
        );
        assert!(from_unix_seconds(i64::MAX).is_err());

        let now = now_seconds();
        assert_eq!(now.nanosecond(), 0);
        assert_eq!(from_unix_seconds(now.unix_timestamp()).unwrap(), now);
    }
}
