use std::time::Duration;

use tokio_stream::StreamExt;
use warden_discord::{
    twilight_gateway::Event,
    twilight_model::id::{marker::MessageMarker, Id},
    twilight_standby::Standby,
    Interaction,
};

#[derive(Debug, Clone)]
pub struct WatcherOptions {
    pub timeout: Duration,
}

impl Default for WatcherOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
        }
    }
}

/// In-handler awaiting of component presses on a specific message, backed
/// by standby. Every gateway event must be fed through `process`.
#[derive(Debug, Default)]
pub struct Watcher {
    standby: Standby,
}

impl Watcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&self, event: &Event) {
        self.standby.process(event);
    }

    /// Resolves with the first matching component interaction on the given
    /// message, or `None` once the timeout passes.
    pub async fn await_single_component<F: Fn(&Interaction) -> bool + Sync + Send + 'static>(
        &self,
        message_id: Id<MessageMarker>,
        filter: F,
        options: WatcherOptions,
    ) -> anyhow::Result<Option<Interaction>> {
        let stream = self
            .standby
            .wait_for_component_stream(message_id, filter)
            .timeout(options.timeout);
        tokio::pin!(stream);

        let Some(interaction) = stream.next().await else {
            return Ok(None);
        };

        Ok(Some(interaction?))
    }
}
