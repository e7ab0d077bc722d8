use std::{collections::HashMap, sync::Arc};

use warden_discord::{
    twilight_model::id::{
        marker::{ApplicationMarker, GuildMarker},
        Id,
    },
    ApiCommand,
};

use crate::{
    builder::{ButtonCommandBuilder, IntoCommandDescriptors, ModalCommandBuilder, WithHandler},
    client::WardenClient,
    context::AWAITED_COMPONENT_BASE,
    descriptor::{ComponentDescriptor, TextCommandDescriptor},
};

/// Collects descriptors from feature components during the setup phase.
/// Passed explicitly to each component; there is no ambient registry.
#[derive(Default)]
pub struct CommandSetBuilder {
    text_commands: HashMap<String, Arc<TextCommandDescriptor>>,
    components: HashMap<String, Arc<ComponentDescriptor>>,
}

impl CommandSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every name a command builder declares. Names live in one
    /// flat namespace, aliases included; a duplicate anywhere is a
    /// configuration error raised here, not at first dispatch.
    pub fn add_command(&mut self, builder: impl IntoCommandDescriptors) -> anyhow::Result<()> {
        for descriptor in builder.into_descriptors()? {
            anyhow::ensure!(
                !self.text_commands.contains_key(&descriptor.name),
                "command name {:?} is already registered",
                descriptor.name
            );
            self.text_commands
                .insert(descriptor.name.clone(), Arc::new(descriptor));
        }

        Ok(())
    }

    /// Registers a button handler and hands the descriptor back so the
    /// component can encode identifiers for the buttons it posts.
    pub fn add_button(
        &mut self,
        builder: ButtonCommandBuilder<WithHandler>,
    ) -> anyhow::Result<Arc<ComponentDescriptor>> {
        self.add_component(builder.build()?)
    }

    /// Registers a modal handler; the returned descriptor builds the modal
    /// payloads the component opens.
    pub fn add_modal(
        &mut self,
        builder: ModalCommandBuilder<WithHandler>,
    ) -> anyhow::Result<Arc<ComponentDescriptor>> {
        self.add_component(builder.build()?)
    }

    fn add_component(
        &mut self,
        descriptor: ComponentDescriptor,
    ) -> anyhow::Result<Arc<ComponentDescriptor>> {
        anyhow::ensure!(
            descriptor.base_id != AWAITED_COMPONENT_BASE,
            "component base id {:?} is reserved for in-handler awaiting",
            descriptor.base_id
        );
        anyhow::ensure!(
            !self.components.contains_key(&descriptor.base_id),
            "component base id {:?} is already registered",
            descriptor.base_id
        );

        let descriptor = Arc::new(descriptor);
        self.components
            .insert(descriptor.base_id.clone(), descriptor.clone());

        Ok(descriptor)
    }

    pub fn build(self) -> CommandSet {
        CommandSet {
            text_commands: self.text_commands,
            components: self.components,
        }
    }
}

/// The immutable routing table dispatch reads: command names (aliases
/// included) and component base ids. Built once at startup.
pub struct CommandSet {
    text_commands: HashMap<String, Arc<TextCommandDescriptor>>,
    components: HashMap<String, Arc<ComponentDescriptor>>,
}

impl CommandSet {
    pub fn command(&self, name: &str) -> Option<&Arc<TextCommandDescriptor>> {
        self.text_commands.get(name)
    }

    pub fn component(&self, base_id: &str) -> Option<&Arc<ComponentDescriptor>> {
        self.components.get(base_id)
    }

    pub fn command_count(&self) -> usize {
        self.text_commands.len()
    }

    /// The declarative registration payloads for every slash-enabled name.
    pub fn api_commands(&self, application_id: Id<ApplicationMarker>) -> Vec<ApiCommand> {
        let mut descriptors: Vec<_> = self
            .text_commands
            .values()
            .filter(|descriptor| descriptor.slash)
            .collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));

        descriptors
            .iter()
            .map(|descriptor| descriptor.to_api_command(application_id))
            .collect()
    }

    /// Uploads the registration payloads, scoped to a guild in debug runs
    /// and global otherwise.
    pub async fn register_api_commands(
        &self,
        client: &WardenClient,
        application_id: Id<ApplicationMarker>,
        guild_id: Option<Id<GuildMarker>>,
    ) -> anyhow::Result<()> {
        let commands = self.api_commands(application_id);
        tracing::info!(count = commands.len(), "registering application commands");

        let interaction = client.http.interaction(application_id);
        match guild_id {
            Some(guild_id) => {
                interaction
                    .set_guild_commands(guild_id, &commands)
                    .await?;
            }
            None => {
                interaction.set_global_commands(&commands).await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        argument::{ArgumentOptions, Arguments},
        builder::TextCommandBuilder,
        context::CommandContext,
    };

    fn handler() -> impl Fn(CommandContext, Arguments) -> std::future::Ready<anyhow::Result<()>>
           + Send
           + Sync
           + 'static {
        |_ctx, _args| std::future::ready(Ok(()))
    }

    #[test]
    fn rejects_duplicate_command_names_at_registration() {
        let mut set = CommandSetBuilder::new();
        set.add_command(
            TextCommandBuilder::new("ping")
                .set_description("Pong")
                .set_handler(handler()),
        )
        .unwrap();

        let duplicate = set.add_command(
            TextCommandBuilder::new("ping")
                .set_description("Pong again")
                .set_handler(handler()),
        );
        assert!(duplicate.is_err());
    }

    #[test]
    fn alias_names_share_the_flat_namespace() {
        let mut set = CommandSetBuilder::new();
        set.add_command(
            TextCommandBuilder::new_aliased(&["echo", "say"])
                .set_description("Repeats a message")
                .set_handler(handler()),
        )
        .unwrap();

        let clash = set.add_command(
            TextCommandBuilder::new("say")
                .set_description("Something else entirely")
                .set_handler(handler()),
        );
        assert!(clash.is_err());

        let set = set.build();
        assert!(set.command("echo").is_some());
        assert!(set.command("say").is_some());
        assert_eq!(set.command("say").unwrap().alias_of.as_deref(), Some("echo"));
    }

    #[test]
    fn rejects_duplicate_component_base_ids() {
        let mut set = CommandSetBuilder::new();
        set.add_button(
            ButtonCommandBuilder::new("case")
                .add_number_option(ArgumentOptions::new("id", "case id"))
                .set_handler(handler()),
        )
        .unwrap();

        let duplicate = set.add_button(ButtonCommandBuilder::new("case").set_handler(handler()));
        assert!(duplicate.is_err());

        let reserved = set.add_button(
            ButtonCommandBuilder::new(AWAITED_COMPONENT_BASE).set_handler(handler()),
        );
        assert!(reserved.is_err());
    }

    #[test]
    fn only_slash_enabled_names_produce_payloads() {
        let mut set = CommandSetBuilder::new();
        set.add_command(
            TextCommandBuilder::new_aliased(&["echo", "say"])
                .set_description("Repeats a message")
                .set_slash_config(&[true, false])
                .set_handler(handler()),
        )
        .unwrap();

        let set = set.build();
        let payloads = set.api_commands(Id::new(1));
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].name, "echo");
    }
}
