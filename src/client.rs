use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DeliveryError;
use crate::installation::CreateInstallation;
use crate::message::OutboundMessage;

/// Remote ingestion API consumed by the sink.
///
/// Implementations transport messages to elmah.io (see
/// [`HttpApi`](crate::http::HttpApi)) or anywhere else. The sink calls
/// these methods from its background task and never awaits them on the
/// thread that emitted the event.
#[async_trait]
pub trait ElmahIoApi: Send + Sync {
    /// Store a batch of messages and trigger notifications for it.
    ///
    /// **Parameters**
    /// - `log_id`: target log.
    /// - `messages`: non-empty batch, in emission order.
    ///
    /// **Returns**
    /// - `Ok(())` if the batch was accepted.
    /// - `Err(..)` on network, serialization or HTTP status failures. The
    ///   sink reports the error and drops the batch; it does not retry.
    async fn create_bulk_and_notify(
        &self,
        log_id: Uuid,
        messages: &[OutboundMessage],
    ) -> Result<(), DeliveryError>;

    /// Register this client with the log. Called once per sink, best-effort.
    ///
    /// Default implementation is a no-op.
    async fn create_installation(
        &self,
        _log_id: Uuid,
        _installation: &CreateInstallation,
    ) -> Result<(), DeliveryError> {
        Ok(())
    }
}
