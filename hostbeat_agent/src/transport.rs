//! Signed HTTP delivery to the ingest endpoint.
//!
//! Every POST carries three headers: the static API token, a unix-seconds
//! timestamp, and a hex HMAC-SHA256 signature over `"{timestamp}.{body}"`.
//! The service rejects bad signatures and stale timestamps; this side only
//! has to sign honestly and surface failures without concealment.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use sha2::Sha256;
use tracing::info;

use crate::queue::OfflineQueue;
use crate::types::Batch;

pub const TOKEN_HEADER: &str = "X-Api-Token";
pub const TIMESTAMP_HEADER: &str = "X-Signature-Ts";
pub const SIGNATURE_HEADER: &str = "X-Signature";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("ingest request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("ingest rejected batch: {status} {body}")]
    Rejected { status: u16, body: String },
}

pub struct SignedTransport {
    client: Client,
    ingest_url: String,
    token: String,
    secret: Vec<u8>,
}

impl SignedTransport {
    pub fn new(base_url: &str, token: &str, secret: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            ingest_url: format!("{}/api/ingest", base_url.trim_end_matches('/')),
            token: token.to_string(),
            secret: secret.as_bytes().to_vec(),
        })
    }

    /// Serializes and POSTs one batch. Does not retry and does not queue;
    /// on failure the caller decides what to buffer.
    pub async fn send(&self, body: &str) -> Result<(), DeliveryError> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign(&self.secret, &timestamp, body);
        let response = self
            .client
            .post(&self.ingest_url)
            .header("Content-Type", "application/json")
            .header(TOKEN_HEADER, &self.token)
            .header(TIMESTAMP_HEADER, &timestamp)
            .header(SIGNATURE_HEADER, &signature)
            .body(body.to_string())
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    pub fn serialize(&self, batch: &Batch) -> Result<String> {
        serde_json::to_string(batch).context("serializing batch")
    }

    /// Replays queued entries oldest-first, deleting each only after a
    /// confirmed 2xx. Stops at the first failure so delivery order is
    /// preserved; the remainder stays queued for the next tick. Returns how
    /// many entries were delivered.
    pub async fn flush_offline(&self, queue: &OfflineQueue) -> Result<usize> {
        let mut delivered = 0;
        for entry in queue.pending()? {
            let body = queue.read(&entry)?;
            self.send(&body)
                .await
                .with_context(|| format!("replaying {}", entry.display()))?;
            queue.remove(&entry)?;
            if let Some(name) = entry.file_name() {
                info!("flushed stored batch {}", name.to_string_lossy());
            }
            delivered += 1;
        }
        Ok(delivered)
    }
}

/// Pure signing function: hex HMAC-SHA256 over `"{timestamp}.{body}"`.
fn sign(secret: &[u8], timestamp: &str, body: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Recomputes a signature for verification. Test stubs use this to check
/// what the transport attached to a request.
pub fn expected_signature(secret: &[u8], timestamp: &str, body: &str) -> String {
    sign(secret, timestamp, body)
}
