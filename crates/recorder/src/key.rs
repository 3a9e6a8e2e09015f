//! Timestamp keys for snapshot naming

use chrono::{DateTime, SubsecRound, Utc};
use tracing::warn;

/// Wall-clock source
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// System UTC clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Generates snapshot keys from wall-clock time.
///
/// With sub-second resolution keys are strictly increasing: a timestamp not
/// after the previous one is bumped by one microsecond.
#[derive(Debug, Clone)]
pub struct KeyGenerator {
    subsecond: bool,
    last: Option<DateTime<Utc>>,
}

impl KeyGenerator {
    pub fn new(subsecond: bool) -> Self {
        Self {
            subsecond,
            last: None,
        }
    }

    /// Whether keys carry microseconds (and can be bumped on collision)
    pub fn subsecond(&self) -> bool {
        self.subsecond
    }

    /// Produce the event timestamp and its key
    pub fn next(&mut self, now: DateTime<Utc>) -> (DateTime<Utc>, String) {
        if !self.subsecond {
            let now = now.trunc_subsecs(0);
            if self.last == Some(now) {
                warn!("Snapshot key collision within one second: {}", format_key(now, false));
            }
            self.last = Some(now);
            return (now, format_key(now, false));
        }

        let mut ts = now.trunc_subsecs(6);
        if let Some(last) = self.last {
            if ts <= last {
                ts = last + chrono::Duration::microseconds(1);
            }
        }
        self.last = Some(ts);
        (ts, format_key(ts, true))
    }
}

fn format_key(ts: DateTime<Utc>, subsecond: bool) -> String {
    if subsecond {
        ts.format("%Y%m%d_%H%M%S_%6f").to_string()
    } else {
        ts.format("%Y%m%d_%H%M%S").to_string()
    }
}
