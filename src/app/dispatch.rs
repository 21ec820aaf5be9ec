use crate::app::ports::MessagingPort;
use crate::domain::{NotificationEvent, RosterRecord};
use crate::error::DispatchError;
use crate::templating::{MessageContext, TemplateRenderer};
use std::sync::Arc;
use tracing::instrument;

/// Renders one reminder and hands it to the messaging collaborator.
///
/// No retries and no persistence happen here; the scan decides what a
/// failure means for the ledger.
pub struct Dispatcher {
    messenger: Arc<dyn MessagingPort>,
    renderer: TemplateRenderer,
    channel: String,
}

impl Dispatcher {
    pub fn new(
        messenger: Arc<dyn MessagingPort>,
        renderer: TemplateRenderer,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            messenger,
            renderer,
            channel: channel.into(),
        }
    }

    pub fn render(
        &self,
        record: &RosterRecord,
        event: &NotificationEvent,
    ) -> Result<String, DispatchError> {
        self.renderer.render(&MessageContext::new(record, event))
    }

    #[instrument(skip_all, fields(nip = %event.nip, channel = %self.messenger.channel_name()))]
    pub async fn send(
        &self,
        record: &RosterRecord,
        event: &NotificationEvent,
    ) -> Result<(), DispatchError> {
        let text = self.render(record, event)?;
        self.messenger.send_text(&self.channel, &text).await
    }
}
