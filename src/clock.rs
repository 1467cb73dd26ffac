use chrono::{DateTime, FixedOffset, Utc};

pub trait Clock {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall clock at a fixed UTC offset. Asia/Tokyo has no DST, so +09:00 is exact.
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

pub struct FixedClock(pub DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}
