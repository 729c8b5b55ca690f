use once_cell::sync::Lazy;
use std::time::Duration;

const DEFAULT_DEVICE_TIMEOUT_SECS: u64 = 120;

/// Per-device transport timeout (§5: "bounded by the per-device timeout,
/// default 120 s"), overridable via `NETMAN_DEVICE_TIMEOUT_SECS`.
static DEVICE_TIMEOUT: Lazy<Duration> = Lazy::new(|| {
    env_duration(
        "NETMAN_DEVICE_TIMEOUT_SECS",
        Duration::from_secs(DEFAULT_DEVICE_TIMEOUT_SECS),
    )
});

pub fn device_timeout() -> Duration {
    *DEVICE_TIMEOUT
}

fn env_duration(var: &str, default: Duration) -> Duration {
    std::env::var(var)
        .ok()
        .and_then(|value| value.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}
