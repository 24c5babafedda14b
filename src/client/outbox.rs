use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use script_rehearsal_types::events::client::ResponseCreateEvent;
use script_rehearsal_types::ClientEvent;

use crate::directive::Directive;
use crate::error::TransportError;
use crate::transport::ControlChannel;

/// Writing half of the control channel.
pub(crate) struct Outbox {
    channel: Arc<dyn ControlChannel>,
    closed: Arc<AtomicBool>,
    auto_response: bool,
}

impl Outbox {
    pub(crate) fn new(channel: Arc<dyn ControlChannel>, closed: Arc<AtomicBool>, auto_response: bool) -> Self {
        Self {
            channel,
            closed,
            auto_response,
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) async fn send(&self, directive: &Directive) -> Result<(), TransportError> {
        self.send_event(&directive.to_client_event()).await?;
        tracing::info!("sent directive: {:?}", directive.text());
        if self.auto_response {
            self.send_event(&ClientEvent::ResponseCreate(ResponseCreateEvent::new())).await?;
        }
        Ok(())
    }

    async fn send_event(&self, event: &ClientEvent) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        if !self.channel.is_open() {
            tracing::warn!("control channel {} is not open", self.channel.label());
            return Err(TransportError::ChannelNotReady);
        }
        let text = serde_json::to_string(event)?;
        self.channel.send(text).await
    }
}
