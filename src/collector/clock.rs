use chrono::{DateTime, Utc};

/// Observation timestamps that never go backwards.
///
/// Wall-clock time can step back (NTP corrections); a stamp is the later of
/// now and the previous stamp.
#[derive(Debug, Default)]
pub struct ObservationClock {
    last: Option<DateTime<Utc>>,
}

impl ObservationClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stamp(&mut self) -> DateTime<Utc> {
        self.stamp_at(Utc::now())
    }

    pub(crate) fn stamp_at(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        let stamp = match self.last {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last = Some(stamp);
        stamp
    }
}
