use async_trait::async_trait;

use super::payload::WirePayload;
use crate::error::DeliveryError;

/// Where drained records go.
///
/// `Ok(())` means the remote side accepted this exact payload and the local
/// copy may be deleted.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn deliver(&self, payload: &WirePayload) -> Result<(), DeliveryError>;
}
