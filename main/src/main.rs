mod event_handler;

use std::sync::Arc;

pub use event_handler::EventHandler;

use tokio_stream::StreamExt;
use tracing_subscriber::EnvFilter;
use warden_common::config;
use warden_discord::twilight_gateway::{
    stream::{self, ShardEventStream},
    Config, Intents,
};
use warden_framework::{watcher::Watcher, CommandSetBuilder, Framework, WardenClient};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let discord_token = std::env::var(if config::DEBUG {
        "DEBUG_DISCORD_TOKEN"
    } else {
        "DISCORD_TOKEN"
    })
    .expect("expected a valid Discord token");

    let intents = Intents::GUILDS | Intents::GUILD_MESSAGES | Intents::MESSAGE_CONTENT;
    let gateway_config = Config::new(discord_token.clone(), intents);

    let client = Arc::new(WardenClient::new(discord_token));
    let watcher = Arc::new(Watcher::new());

    let mut commands = CommandSetBuilder::new();
    warden_commands::register_all(&mut commands).expect("command registration failed");

    let framework = Arc::new(Framework::new(client, watcher, commands.build()));

    // Load a single shard
    let mut shards = stream::create_range(0..1, 1, gateway_config, |_, builder| builder.build())
        .collect::<Vec<_>>();

    let mut stream = ShardEventStream::new(shards.iter_mut());

    while let Some((_shard, event)) = stream.next().await {
        let event = match event {
            Ok(event) => event,
            Err(source) => {
                if source.is_fatal() {
                    tracing::error!(?source, "fatal gateway error");
                    break;
                }

                continue;
            }
        };

        let event_handler = EventHandler::new(framework.clone());
        tokio::spawn(event_handler.handle(event));
    }
}
