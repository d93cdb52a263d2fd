//! Synthetic checkout traffic.
//!
//! Fires `POST /checkout` at a fixed rate with a random `X-User-Id`, so the
//! service produces a steady stream of wide events without an external load
//! generator. Requests are fire-and-forget; failures only show up at DEBUG.

use std::time::Duration;

use rand::Rng;
use reqwest::StatusCode;
use tokio::sync::broadcast;

use crate::checkout::{random_user_id, CheckoutResponse};
use crate::config::SimulatorConfig;
use crate::http::X_USER_ID;

/// Background task generating checkout requests.
pub struct TrafficSimulator {
    client: reqwest::Client,
    target_url: String,
    interval: Duration,
}

/// Tick interval for a requests-per-second rate. A rate of 0 means one per second.
pub fn interval_for(requests_per_second: u32) -> Duration {
    if requests_per_second == 0 {
        Duration::from_millis(1000)
    } else {
        Duration::from_millis((1000 / requests_per_second).max(1) as u64)
    }
}

/// Send a single checkout request and decode its body.
pub async fn send_checkout(
    client: &reqwest::Client,
    url: &str,
    user_id: Option<&str>,
) -> Result<(StatusCode, CheckoutResponse), reqwest::Error> {
    let mut request = client
        .post(url)
        .header(reqwest::header::CONTENT_TYPE, "application/json");
    if let Some(user_id) = user_id {
        request = request.header(X_USER_ID, user_id);
    }

    let response = request.send().await?;
    let status = response.status();
    let body = response.json::<CheckoutResponse>().await?;
    Ok((status, body))
}

impl TrafficSimulator {
    pub fn new(config: &SimulatorConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            target_url: config.target_url.clone(),
            interval: interval_for(config.requests_per_second),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Generate traffic until `shutdown` fires.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            target_url = %self.target_url,
            interval_ms = self.interval.as_millis() as u64,
            "Traffic simulator started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = ticker.tick() => self.fire(),
            }
        }

        tracing::info!("Traffic simulator stopped");
    }

    fn fire(&self) {
        let user_id = {
            let mut rng = rand::thread_rng();
            // Occasionally leave the caller anonymous.
            if rng.gen_bool(0.1) {
                None
            } else {
                Some(random_user_id(&mut rng))
            }
        };
        let client = self.client.clone();
        let url = self.target_url.clone();

        tokio::spawn(async move {
            if let Err(e) = send_checkout(&client, &url, user_id.as_deref()).await {
                tracing::debug!(error = %e, "Simulated checkout failed");
            }
        });
    }
}
