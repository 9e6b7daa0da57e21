#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use elmahio_log_sink::client::ElmahIoApi;
use elmahio_log_sink::error::DeliveryError;
use elmahio_log_sink::installation::CreateInstallation;
use elmahio_log_sink::OutboundMessage;

/// Records every submitted batch; can be switched to fail.
#[derive(Default)]
pub struct RecordingApi {
    pub batches: Mutex<Vec<Vec<OutboundMessage>>>,
    pub installations: AtomicUsize,
    pub fail: AtomicBool,
}

impl RecordingApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let api = Self::default();
        api.fail.store(true, Ordering::SeqCst);
        Arc::new(api)
    }

    pub fn batches(&self) -> Vec<Vec<OutboundMessage>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.batches().into_iter().flatten().collect()
    }
}

#[async_trait]
impl ElmahIoApi for RecordingApi {
    async fn create_bulk_and_notify(
        &self,
        _log_id: Uuid,
        messages: &[OutboundMessage],
    ) -> Result<(), DeliveryError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DeliveryError::Status {
                status: 500,
                body: "boom".to_string(),
            });
        }
        self.batches.lock().unwrap().push(messages.to_vec());
        Ok(())
    }

    async fn create_installation(
        &self,
        _log_id: Uuid,
        _installation: &CreateInstallation,
    ) -> Result<(), DeliveryError> {
        self.installations.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(DeliveryError::client("installation rejected"));
        }
        Ok(())
    }
}

/// Poll `cond` until it holds or `limit` elapses.
pub async fn wait_until<F: Fn() -> bool>(cond: F, limit: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}
