use std::fmt;
use std::str::FromStr;

/// A cell or argument time, in milliseconds. Written as `HH:MM:SS:mmm`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeStamp(u64);

const MS_PER_SECOND: u64 = 1_000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;

impl TimeStamp {
    pub const ZERO: TimeStamp = TimeStamp(0);

    pub fn from_millis(ms: u64) -> Self {
        TimeStamp(ms)
    }

    pub fn millis(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed timestamp '{text}': {reason}")]
pub struct TimeStampError {
    pub text: String,
    pub reason: &'static str,
}

impl fmt::Display for TimeStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ms = self.0;
        write!(
            f,
            "{:02}:{:02}:{:02}:{:03}",
            ms / MS_PER_HOUR,
            (ms / MS_PER_MINUTE) % 60,
            (ms / MS_PER_SECOND) % 60,
            ms % MS_PER_SECOND
        )
    }
}

impl FromStr for TimeStamp {
    type Err = TimeStampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fail = |reason| TimeStampError {
            text: s.to_owned(),
            reason,
        };
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 4 {
            return Err(fail("expected HH:MM:SS:mmm"));
        }
        if parts.iter().any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit())) {
            return Err(fail("fields must be decimal digits"));
        }
        let (hh, mm, ss, ms) = (parts[0], parts[1], parts[2], parts[3]);
        if hh.len() < 2 || mm.len() != 2 || ss.len() != 2 || ms.len() != 3 {
            return Err(fail("expected HH:MM:SS:mmm"));
        }
        let hours: u64 = hh.parse().map_err(|_| fail("hours out of range"))?;
        // Field widths are fixed above, so these cannot fail.
        let minutes: u64 = mm.parse().unwrap_or(0);
        let seconds: u64 = ss.parse().unwrap_or(0);
        let millis: u64 = ms.parse().unwrap_or(0);
        if minutes >= 60 {
            return Err(fail("minutes must be below 60"));
        }
        if seconds >= 60 {
            return Err(fail("seconds must be below 60"));
        }
        hours
            .checked_mul(MS_PER_HOUR)
            .and_then(|h| h.checked_add(minutes * MS_PER_MINUTE + seconds * MS_PER_SECOND + millis))
            .map(TimeStamp)
            .ok_or_else(|| fail("hours out of range"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_formats() {
        let t: TimeStamp = "01:02:03:004".parse().unwrap();
        assert_eq!(t.millis(), 3_723_004);
        assert_eq!(t.to_string(), "01:02:03:004");
    }

    #[test]
    fn long_hours_are_allowed() {
        let t: TimeStamp = "123:00:00:000".parse().unwrap();
        assert_eq!(t.to_string(), "123:00:00:000");
    }

    #[test]
    fn rejects_bad_fields() {
        assert!("00:60:00:000".parse::<TimeStamp>().is_err());
        assert!("00:00:75:000".parse::<TimeStamp>().is_err());
        assert!("0:00:00:000".parse::<TimeStamp>().is_err());
        assert!("00:00:00:00".parse::<TimeStamp>().is_err());
        assert!("00:00:00".parse::<TimeStamp>().is_err());
    }
}
