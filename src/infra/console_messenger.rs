use crate::app::ports::MessagingPort;
use crate::error::DispatchError;
use async_trait::async_trait;
use tracing::info;

/// Writes messages to stdout instead of delivering them. For trial runs
/// against a real roster before a gateway is set up.
pub struct ConsoleMessenger;

#[async_trait]
impl MessagingPort for ConsoleMessenger {
    async fn send_text(&self, channel: &str, text: &str) -> Result<(), DispatchError> {
        info!(channel, "Console delivery");
        println!("──── to {channel} ────\n{text}\n");
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "console"
    }
}
