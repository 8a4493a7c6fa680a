//! HTTP beacon — posts encoded envelopes on a background task so the
//! caller never waits on the network.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tokio::runtime::Handle;
use tracing::{debug, warn};
use url::Url;

use trackpoint_core::{Beacon, BeaconRequest, TrackerError, TrackerResult};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Fire-and-forget HTTP transport. `send` spawns the POST onto the current
/// tokio runtime and returns immediately; the response is only logged.
#[derive(Clone)]
pub struct HttpBeacon {
    client: Client,
}

impl HttpBeacon {
    pub fn new() -> TrackerResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| TrackerError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Beacon for HttpBeacon {
    fn send(&self, request: BeaconRequest) -> bool {
        let url = match Url::parse(&request.url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            Ok(url) => {
                warn!(url = %url, "beacon url must be http(s)");
                return false;
            }
            Err(e) => {
                warn!(url = %request.url, error = %e, "beacon url does not parse");
                return false;
            }
        };
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!(url = %url, "no tokio runtime available for beacon delivery");
                return false;
            }
        };

        let client = self.client.clone();
        handle.spawn(async move {
            let result = client
                .post(url.clone())
                .header(CONTENT_TYPE, request.content_type)
                .body(request.body)
                .send()
                .await;
            match result {
                Ok(response) => {
                    metrics::counter!("trackpoint.beacon.delivered").increment(1);
                    debug!(url = %url, status = response.status().as_u16(), "beacon delivered");
                }
                Err(e) => {
                    metrics::counter!("trackpoint.beacon.failed").increment(1);
                    debug!(url = %url, error = %e, "beacon delivery failed");
                }
            }
        });
        true
    }
}
