use std::sync::{atomic::Ordering, Arc};

use warden_discord::{
    twilight_gateway::Event,
    twilight_model::gateway::payload::incoming::Ready,
};
use warden_framework::Framework;

pub struct EventHandler {
    framework: Arc<Framework>,
}

impl EventHandler {
    pub fn new(framework: Arc<Framework>) -> Self {
        Self { framework }
    }

    pub async fn handle(self, event: Event) {
        self.framework.watcher.process(&event);

        let result = match event {
            Event::Ready(ready) => self.ready(ready).await,
            Event::GuildCreate(guild_create) => {
                self.framework.client.cache_guild(&guild_create.0).await;
                Ok(())
            }
            Event::RoleCreate(role_create) => {
                self.framework
                    .client
                    .cache_role(role_create.guild_id, role_create.role)
                    .await;
                Ok(())
            }
            Event::RoleUpdate(role_update) => {
                self.framework
                    .client
                    .cache_role(role_update.guild_id, role_update.role)
                    .await;
                Ok(())
            }
            Event::RoleDelete(role_delete) => {
                self.framework
                    .client
                    .evict_role(role_delete.guild_id, role_delete.role_id)
                    .await;
                Ok(())
            }
            Event::InteractionCreate(interaction) => {
                self.framework.handle_interaction_create(interaction.0).await
            }
            Event::MessageCreate(message) => {
                self.framework.handle_message_create(message.0).await
            }
            Event::MessageUpdate(update) => self.framework.handle_message_update(*update).await,
            Event::MessageDelete(delete) => self.framework.handle_message_delete(delete).await,
            _ => Ok(()),
        };

        if let Err(error) = result {
            tracing::error!(?error, "event dispatch failed");
        }
    }

    async fn ready(&self, ready: Box<Ready>) -> anyhow::Result<()> {
        if self.framework.client.is_ready.swap(true, Ordering::Relaxed) {
            return Ok(());
        }

        tracing::info!(user = %ready.user.name, "gateway ready");
        self.framework.register_api_commands(ready.application.id).await?;

        Ok(())
    }
}
