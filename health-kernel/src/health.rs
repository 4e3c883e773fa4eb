use crate::ports::PortInfo;
use crate::store::RecordStore;
use serde::Serialize;
use std::time::Instant;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

#[derive(Debug, Serialize)]
pub struct KernelHealth {
    pub uptime_seconds: u64,
    pub started_at: String,
    pub users_tracked: usize,
    pub records_stored: usize,
    pub capacity: usize,
    pub storage: PortInfo,
}

#[derive(Clone)]
pub struct HealthTracker {
    start_time: Instant,
    started_at: OffsetDateTime,
}

impl HealthTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            started_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn get_health(&self, store: &RecordStore) -> KernelHealth {
        let stats = store.stats();
        KernelHealth {
            uptime_seconds: self.start_time.elapsed().as_secs(),
            started_at: self.started_at.format(&Rfc3339).unwrap_or_default(),
            users_tracked: stats.users,
            records_stored: stats.records,
            capacity: store.capacity(),
            storage: store.port_info(),
        }
    }
}

impl Default for HealthTracker {
    fn default() -> Self {
        Self::new()
    }
}
