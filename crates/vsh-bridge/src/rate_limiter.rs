//! Write-quota ledger
//!
//! Every endpoint gets an hourly counter; the daily total is the sum of all
//! counters whose window lies in the current day. Records are created on the
//! first write attempt and never removed.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use parking_lot::Mutex;
use vsh_core::RateLimitError;

use crate::config::RateLimitConfig;

/// Counter of one endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RateLimitRecord {
    /// Writes in the current window
    hourly: u32,
    /// Day and hour the window started in
    window: (NaiveDate, u32),
}

/// Per-endpoint hourly and global daily write limiter
#[derive(Debug)]
pub struct RateLimiter {
    records: Mutex<HashMap<String, RateLimitRecord>>,
    hourly_limit: u32,
    daily_limit: u32,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            hourly_limit: config.hourly_limit,
            daily_limit: config.daily_limit,
        }
    }

    /// Count one write for `endpoint_id`, returning the endpoint's hourly count.
    ///
    /// Must be called before the protected write.
    pub fn increment_and_get(&self, endpoint_id: &str) -> Result<u32, RateLimitError> {
        self.increment_and_get_at(endpoint_id, Utc::now())
    }

    /// Same as [`increment_and_get`](Self::increment_and_get) with an explicit clock
    pub fn increment_and_get_at(
        &self,
        endpoint_id: &str,
        now: DateTime<Utc>,
    ) -> Result<u32, RateLimitError> {
        let window = (now.date_naive(), now.hour());
        let mut records = self.records.lock();

        let record = records
            .entry(endpoint_id.to_string())
            .or_insert(RateLimitRecord { hourly: 0, window });
        if record.window != window {
            record.hourly = 0;
            record.window = window;
        }
        record.hourly += 1;
        let hourly = record.hourly;

        if hourly > self.hourly_limit {
            return Err(RateLimitError::HourlyLimitExceeded {
                endpoint_id: endpoint_id.to_string(),
                limit: self.hourly_limit,
            });
        }

        let daily: u32 = records
            .values()
            .filter(|r| r.window.0 == window.0)
            .map(|r| r.hourly)
            .sum();
        if daily > self.daily_limit {
            return Err(RateLimitError::DailyLimitExceeded {
                limit: self.daily_limit,
            });
        }

        Ok(hourly)
    }

    /// Current hourly count of an endpoint (0 when never written)
    pub fn hourly_count(&self, endpoint_id: &str) -> u32 {
        self.records
            .lock()
            .get(endpoint_id)
            .map(|r| r.hourly)
            .unwrap_or(0)
    }
}
