use async_trait::async_trait;
use uuid::Uuid;

use crate::client::ElmahIoApi;
use crate::error::DeliveryError;
use crate::message::OutboundMessage;

/// An API that accepts and drops every batch.
///
/// Useful for measuring the overhead of the pipeline itself without any
/// network I/O, and for tests that don't care about delivery.
#[derive(Clone, Default)]
pub struct NoopApi;

#[async_trait]
impl ElmahIoApi for NoopApi {
    async fn create_bulk_and_notify(
        &self,
        _log_id: Uuid,
        _messages: &[OutboundMessage],
    ) -> Result<(), DeliveryError> {
        Ok(())
    }
}
