use std::sync::Mutex;

use chrono::{DateTime, Utc};

/// Time source shared by the rate limiter and the OTP store.
///
/// A fixed clock lets tests walk a key past a rate-limit window or an OTP
/// expiry without sleeping.
#[derive(Debug)]
pub struct Clock {
    fixed: Mutex<Option<DateTime<Utc>>>,
}

impl Clock {
    /// Wall-clock time; what the service runs on.
    pub fn system() -> Self {
        Clock {
            fixed: Mutex::new(None),
        }
    }

    /// A clock pinned to `at` until `set` moves it.
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Clock {
            fixed: Mutex::new(Some(at)),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.fixed
            .lock()
            .expect("clock mutex poisoned")
            .unwrap_or_else(Utc::now)
    }

    /// Pins the clock to `at`. A system clock becomes fixed from this point on.
    pub fn set(&self, at: DateTime<Utc>) {
        *self.fixed.lock().expect("clock mutex poisoned") = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn fixed_clock_holds_and_moves() {
        let start = Utc
            .with_ymd_and_hms(2026, 3, 14, 9, 30, 0)
            .single()
            .expect("valid timestamp");
        let clock = Clock::fixed(start);
        assert_eq!(clock.now(), start);

        clock.set(start + Duration::minutes(11));
        assert_eq!(clock.now(), start + Duration::minutes(11));
    }

    #[test]
    fn system_clock_advances() {
        let clock = Clock::system();
        let first = clock.now();
        assert!(clock.now() >= first);
    }
}
