use std::fmt;
use std::sync::Arc;

use crate::error::DeliveryError;
use crate::message::OutboundMessage;

/// Mutation hook run on every message that survives filtering.
pub type OnMessage = Arc<dyn Fn(&mut OutboundMessage) + Send + Sync>;
/// Called for each message of a batch that failed to deliver.
pub type OnError = Arc<dyn Fn(&OutboundMessage, &DeliveryError) + Send + Sync>;
/// Returning `true` drops the message.
pub type OnFilter = Arc<dyn Fn(&OutboundMessage) -> bool + Send + Sync>;

/// The three optional callbacks applied in the delivery path.
#[derive(Clone, Default)]
pub struct MessageHooks {
    pub on_message: Option<OnMessage>,
    pub on_error: Option<OnError>,
    pub on_filter: Option<OnFilter>,
}

impl MessageHooks {
    /// Apply the filter and then the mutation hook. Returns `false` when the
    /// message was filtered out; the mutation hook is not run in that case.
    pub fn admit(&self, message: &mut OutboundMessage) -> bool {
        if let Some(filter) = &self.on_filter {
            if filter(message) {
                return false;
            }
        }
        if let Some(on_message) = &self.on_message {
            on_message(message);
        }
        true
    }

    /// Filter and mutate a whole batch, keeping the order of survivors.
    pub fn admit_all(&self, messages: Vec<OutboundMessage>) -> Vec<OutboundMessage> {
        messages
            .into_iter()
            .filter_map(|mut m| self.admit(&mut m).then_some(m))
            .collect()
    }

    pub fn report_failure(&self, messages: &[OutboundMessage], error: &DeliveryError) {
        if let Some(on_error) = &self.on_error {
            for message in messages {
                on_error(message, error);
            }
        }
    }
}

impl fmt::Debug for MessageHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageHooks")
            .field("on_message", &self.on_message.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_filter", &self.on_filter.is_some())
            .finish()
    }
}
