use crate::infrastructure::config::types::AppConfig;

const MAX_SUBMIT_ATTEMPTS: u32 = 10;

impl AppConfig {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.ledger.request_timeout_ms == 0 {
            errors.push("ledger.request_timeout_ms must be > 0".to_string());
        }
        if self.ledger.submit_timeout_ms == 0 {
            errors.push("ledger.submit_timeout_ms must be > 0".to_string());
        }
        if self.ledger.max_submit_attempts == 0 {
            errors.push("ledger.max_submit_attempts must be > 0".to_string());
        }
        if self.ledger.max_submit_attempts > MAX_SUBMIT_ATTEMPTS {
            errors.push(format!("ledger.max_submit_attempts should not exceed {}", MAX_SUBMIT_ATTEMPTS));
        }
        if self.ledger.query_retries == 0 {
            errors.push("ledger.query_retries must be > 0".to_string());
        }

        if self.signing.lock_timeout_ms == 0 {
            errors.push("signing.lock_timeout_ms must be > 0".to_string());
        }

        if self.reconciliation.interval_secs == 0 {
            errors.push("reconciliation.interval_secs must be > 0".to_string());
        }
        if self.reconciliation.abandon_after_secs <= self.reconciliation.confirmation_latency_secs {
            errors.push("reconciliation.abandon_after_secs must exceed confirmation_latency_secs".to_string());
        }

        if self.credentials.t_cost == 0 || self.credentials.p_cost == 0 {
            errors.push("credentials.t_cost and p_cost must be > 0".to_string());
        }
        if self.credentials.m_cost < 8 * self.credentials.p_cost {
            errors.push("credentials.m_cost must be at least 8 * p_cost".to_string());
        }

        if self.logging.filters.trim().is_empty() {
            errors.push("logging.filters must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
