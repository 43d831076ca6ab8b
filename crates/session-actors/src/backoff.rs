use std::time::Duration;

use control_protocol::ReconnectStrategy;

/// Calculates the delay before reconnect attempt number `attempt`.
///
/// - `Fixed`: the configured delay, every time
/// - `Exponential`: `base_ms * 2^(attempt - 1)`, capped at `max_ms`
///
/// # Arguments
/// * `strategy` - The configured reconnect strategy
/// * `attempt` - The current retry attempt number (1-based)
pub fn calculate_retry_delay(strategy: &ReconnectStrategy, attempt: u32) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let millis = match *strategy {
        ReconnectStrategy::Fixed { delay_ms } => delay_ms,
        ReconnectStrategy::Exponential { base_ms, max_ms } => {
            let attempt_idx = attempt.saturating_sub(1);
            let shift = attempt_idx.min(30); // Prevent overflow of u64 shift
            base_ms.saturating_mul(1 << shift).min(max_ms)
        }
    };

    Duration::from_millis(millis)
}
