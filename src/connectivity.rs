/// Boot-time connectivity check
///
/// Wi-Fi provisioning belongs to the platform (captive portal /
/// NetworkManager); this only verifies the uplink actually works
/// before the control loop starts.
use log::{info, warn};
use tokio::time::{sleep, Duration};

const PROBE_ATTEMPTS: u32 = 3;
const PROBE_RETRY_MS: u64 = 2_000;
const PROBE_TIMEOUT_SECS: u64 = 5;

/// Probe the configured connectivity-check endpoint
///
/// # Returns
/// true once a probe succeeds; false after all attempts fail, which
/// callers treat as fatal (exit and let the supervisor restart the
/// device)
pub async fn ensure_online(probe_url: &str) -> bool {
    let client = match reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(PROBE_TIMEOUT_SECS))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            warn!("Failed to build probe client: {}", e);
            return false;
        }
    };

    for attempt in 1..=PROBE_ATTEMPTS {
        match client.get(probe_url).send().await {
            Ok(response) if response.status().is_success() => {
                info!("Network is up ({})", probe_url);
                return true;
            }
            Ok(response) => {
                warn!(
                    "Connectivity probe attempt {}: unexpected status {}",
                    attempt,
                    response.status()
                );
            }
            Err(e) => {
                warn!("Connectivity probe attempt {} failed: {}", attempt, e);
            }
        }

        if attempt < PROBE_ATTEMPTS {
            sleep(Duration::from_millis(PROBE_RETRY_MS)).await;
        }
    }

    false
}
