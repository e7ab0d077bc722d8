use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use regex::Regex;
use warden_common::{config, SelfClearingMap};
use warden_discord::{
    twilight_model::{
        application::command::{CommandOptionChoice, CommandOptionChoiceValue},
        application::interaction::application_command::{
            CommandData, CommandDataOption, CommandOptionValue,
        },
        application::interaction::modal::ModalInteractionData,
        channel::Message,
        gateway::payload::incoming::{MessageDelete, MessageUpdate},
        http::interaction::{
            InteractionResponse, InteractionResponseData, InteractionResponseType,
        },
        id::{
            marker::{ApplicationMarker, MessageMarker},
            Id,
        },
    },
    Interaction, InteractionData, InteractionType, ModalResponse,
};

use crate::{
    argument::{ArgumentValue, Arguments},
    client::WardenClient,
    command_set::CommandSet,
    context::{
        CommandContext, InvocationOrigin, ReplyLog, SharedReplyLog, AWAITED_COMPONENT_BASE,
    },
    custom_id,
    descriptor::{ComponentKind, TextCommandDescriptor},
    parser::{self, ParseFailure},
    response::Response,
    watcher::Watcher,
};

static COMMAND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^{}(\S+)", regex::escape(config::COMMAND_PREFIX))).unwrap());
static SUBCOMMAND_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\S+").unwrap());

/// What edit/delete tracking keeps per issued text command. The reply log
/// is the same one the original dispatch wrote through, so a re-dispatch
/// can edit the existing reply in place.
#[derive(Clone)]
struct IssuedCommand {
    content: String,
    log: SharedReplyLog,
}

/// Routes every inbound event to a descriptor and runs its handler behind
/// the single error boundary. Descriptors are immutable once this exists;
/// each dispatch gets its own context and reply state.
pub struct Framework {
    pub client: Arc<WardenClient>,
    pub watcher: Arc<Watcher>,
    commands: CommandSet,
    issued_commands: SelfClearingMap<Id<MessageMarker>, IssuedCommand>,
}

impl Framework {
    pub fn new(client: Arc<WardenClient>, watcher: Arc<Watcher>, commands: CommandSet) -> Self {
        Self {
            client,
            watcher,
            commands,
            issued_commands: SelfClearingMap::new(config::ISSUED_COMMAND_WINDOW),
        }
    }

    pub fn commands(&self) -> &CommandSet {
        &self.commands
    }

    /// Uploads the slash registration payloads once the gateway reports
    /// the application id.
    pub async fn register_api_commands(
        &self,
        application_id: Id<ApplicationMarker>,
    ) -> anyhow::Result<()> {
        let guild_id = config::DEBUG.then(|| Id::new(config::DEBUG_GUILD_ID));
        self.commands
            .register_api_commands(&self.client, application_id, guild_id)
            .await
    }

    //
    // Text command dispatch
    //

    pub async fn handle_message_create(&self, message: Message) -> anyhow::Result<()> {
        if message.author.bot {
            return Ok(());
        }
        if !message.content.starts_with(config::COMMAND_PREFIX) {
            return Ok(());
        }

        self.handle_text_command(message, None).await?;
        Ok(())
    }

    /// Returns false when the message is not a registered command; not
    /// every message starting with the prefix is one.
    async fn handle_text_command(
        &self,
        message: Message,
        reused_log: Option<SharedReplyLog>,
    ) -> anyhow::Result<bool> {
        let Some(captures) = COMMAND_RE.captures(&message.content) else {
            return Ok(false);
        };
        let name = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
        let Some(descriptor) = self.commands.command(name) else {
            return Ok(false);
        };

        let mut descriptor = descriptor.clone();
        let mut body = message.content[captures.get(0).map(|m| m.end()).unwrap_or(0)..].trim();
        let mut command_name = name.to_string();

        let is_edit = reused_log.is_some();
        let log = reused_log.unwrap_or_else(|| Arc::new(Mutex::new(ReplyLog::default())));
        self.issued_commands.insert(
            message.id,
            IssuedCommand {
                content: message.content.clone(),
                log: log.clone(),
            },
        );

        let mut ctx = CommandContext::from_message(
            self.client.clone(),
            self.watcher.clone(),
            command_name.clone(),
            Box::new(message.clone()),
            log,
        );

        match walk_subcommands(&command_name, descriptor, body) {
            TextResolution::Command {
                descriptor: resolved,
                qualified_name,
                body: rest,
            } => {
                descriptor = resolved;
                command_name = qualified_name;
                body = rest;
            }
            TextResolution::ShowInfo(container) => {
                ctx.reply(Response::from(container.info_embed()).set_text_reply(true))
                    .await?;
                return Ok(true);
            }
        }
        ctx.command_name = command_name.clone();

        tracing::info!(
            command = %command_name,
            user = %message.author.name,
            user_id = %message.author.id,
            body = ?body,
            edit = is_edit,
            "received text command"
        );

        if !self.check_permissions(&descriptor, &mut ctx).await? {
            return Ok(true);
        }

        // The acknowledgment window is short; defer before parsing.
        ctx.apply_reply_mode(descriptor.reply_mode).await?;

        let guild_roles = match message.guild_id {
            Some(guild_id) => self.client.guild_roles(guild_id).await,
            None => vec![],
        };

        let args = match parser::parse_text_arguments(
            &descriptor,
            self.client.as_ref(),
            &guild_roles,
            body,
        )
        .await
        {
            Ok(args) => args,
            Err(failure) => {
                self.reply_parse_failure(&mut ctx, &descriptor, failure).await?;
                return Ok(true);
            }
        };

        self.invoke(&descriptor, ctx, args).await;
        Ok(true)
    }

    /// Re-parses an edited invocation, editing the existing reply in
    /// place. Editing the message into a non-command deletes the replies.
    pub async fn handle_message_update(&self, update: MessageUpdate) -> anyhow::Result<()> {
        let Some(issued) = self.issued_commands.get_cloned(&update.id) else {
            return Ok(());
        };

        let message = self
            .client
            .http
            .message(update.channel_id, update.id)
            .await?
            .model()
            .await?;

        // Same content means an embed refresh, not a user edit.
        if message.content == issued.content {
            return Ok(());
        }

        let replies = issued.log.lock().unwrap().replies.clone();
        if replies.len() > 1 {
            let notice = Response::error(
                "Can't edit a command that replied in multiple parts, please re-issue it.",
            );
            if let Some((channel_id, message_id)) = replies.first() {
                self.client
                    .http
                    .update_message(*channel_id, *message_id)
                    .payload_json(&notice.to_channel_message_json())
                    .await
                    .ok();
            }
            for (channel_id, message_id) in replies.iter().skip(1) {
                self.client
                    .http
                    .delete_message(*channel_id, *message_id)
                    .await
                    .ok();
            }
            return Ok(());
        }

        issued.log.lock().unwrap().state.editing = true;

        if !self.handle_text_command(message, Some(issued.log.clone())).await? {
            self.delete_tracked_replies(&issued).await;
            self.issued_commands.remove(&update.id);
        }

        Ok(())
    }

    /// Deleting the invoking message deletes everything it triggered.
    pub async fn handle_message_delete(&self, delete: MessageDelete) -> anyhow::Result<()> {
        let Some(issued) = self.issued_commands.remove(&delete.id) else {
            return Ok(());
        };

        self.delete_tracked_replies(&issued).await;
        Ok(())
    }

    async fn delete_tracked_replies(&self, issued: &IssuedCommand) {
        let replies = std::mem::take(&mut issued.log.lock().unwrap().replies);
        for (channel_id, message_id) in replies {
            self.client
                .http
                .delete_message(channel_id, message_id)
                .await
                .ok();
        }
    }

    //
    // Interaction dispatch
    //

    pub async fn handle_interaction_create(&self, interaction: Interaction) -> anyhow::Result<()> {
        match (interaction.kind, interaction.data.clone()) {
            (
                InteractionType::ApplicationCommand,
                Some(InteractionData::ApplicationCommand(data)),
            ) => self.handle_slash_command(interaction, data).await,
            (
                InteractionType::ApplicationCommandAutocomplete,
                Some(InteractionData::ApplicationCommand(data)),
            ) => self.handle_autocomplete(interaction, data).await,
            (InteractionType::MessageComponent, Some(InteractionData::MessageComponent(data))) => {
                self.handle_component(interaction, data.custom_id).await
            }
            (InteractionType::ModalSubmit, Some(InteractionData::ModalSubmit(data))) => {
                self.handle_modal(interaction, data.custom_id.clone(), data)
                    .await
            }
            _ => Ok(()),
        }
    }

    fn resolve_slash_descriptor(
        &self,
        data: &CommandData,
    ) -> Option<(Arc<TextCommandDescriptor>, String, Vec<CommandDataOption>)> {
        let descriptor = self.commands.command(&data.name)?.clone();

        // A subcommand invocation nests its options one level down.
        if let Some(first) = data.options.first() {
            if let CommandOptionValue::SubCommand(suboptions) = &first.value {
                let subcommand = descriptor.subcommand(&first.name)?.clone();
                let name = format!("{} {}", data.name, first.name);
                return Some((subcommand, name, suboptions.clone()));
            }
        }

        if descriptor.is_container() {
            return None;
        }

        let options = data.options.clone();
        Some((descriptor, data.name.clone(), options))
    }

    async fn handle_slash_command(
        &self,
        interaction: Interaction,
        data: Box<CommandData>,
    ) -> anyhow::Result<()> {
        let Some((descriptor, command_name, options)) = self.resolve_slash_descriptor(&data)
        else {
            self.reply_unknown_interaction(&interaction, "Unknown command")
                .await?;
            return Ok(());
        };

        let log = Arc::new(Mutex::new(ReplyLog::default()));
        let mut ctx = CommandContext::from_interaction(
            self.client.clone(),
            self.watcher.clone(),
            InvocationOrigin::Slash,
            command_name.clone(),
            Box::new(interaction),
            log,
        );

        tracing::info!(
            command = %command_name,
            user = ?ctx.author().map(|user| user.name.clone()),
            "received slash command"
        );

        if !self.check_permissions(&descriptor, &mut ctx).await? {
            return Ok(());
        }

        ctx.apply_reply_mode(descriptor.reply_mode).await?;

        let guild_roles = match ctx.guild_id() {
            Some(guild_id) => self.client.guild_roles(guild_id).await,
            None => vec![],
        };

        let args = match parser::extract_slash_arguments(
            &descriptor,
            self.client.as_ref(),
            &guild_roles,
            &options,
            data.resolved.as_ref(),
        )
        .await
        {
            Ok(args) => args,
            Err(failure) => {
                self.reply_parse_failure(&mut ctx, &descriptor, failure).await?;
                return Ok(());
            }
        };

        self.invoke(&descriptor, ctx, args).await;
        Ok(())
    }

    async fn handle_autocomplete(
        &self,
        interaction: Interaction,
        data: Box<CommandData>,
    ) -> anyhow::Result<()> {
        let Some((descriptor, command_name, options)) = self.resolve_slash_descriptor(&data)
        else {
            return Ok(());
        };

        let focused = options.iter().find_map(|option| match &option.value {
            CommandOptionValue::Focused(partial, _) => Some((option.name.clone(), partial.clone())),
            _ => None,
        });

        let choices = focused
            .and_then(|(option_name, partial)| {
                let decl = descriptor
                    .options
                    .iter()
                    .find(|decl| decl.title == option_name)?;
                let autocomplete = decl.autocomplete.as_ref()?;
                Some(autocomplete(&partial, &command_name))
            })
            .unwrap_or_default();

        let choices = choices
            .into_iter()
            .take(25)
            .map(|choice| CommandOptionChoice {
                name: truncate(choice.name, 100),
                name_localizations: None,
                value: CommandOptionChoiceValue::String(truncate(choice.value, 100)),
            })
            .collect();

        self.client
            .http
            .interaction(interaction.application_id)
            .create_response(
                interaction.id,
                &interaction.token,
                &InteractionResponse {
                    kind: InteractionResponseType::ApplicationCommandAutocompleteResult,
                    data: Some(InteractionResponseData {
                        choices: Some(choices),
                        ..Default::default()
                    }),
                },
            )
            .await?;

        Ok(())
    }

    async fn handle_component(
        &self,
        interaction: Interaction,
        raw_custom_id: String,
    ) -> anyhow::Result<()> {
        let base = custom_id::base_id(&raw_custom_id);
        if base == AWAITED_COMPONENT_BASE {
            // Owned by an in-handler watcher, not the registry.
            return Ok(());
        }

        let Some(descriptor) = self.commands.component(base).cloned() else {
            self.reply_unknown_interaction(&interaction, "This control has expired")
                .await?;
            return Ok(());
        };

        tracing::info!(
            component = %raw_custom_id,
            user = ?interaction.author().map(|user| user.name.clone()),
            "received button interaction"
        );

        let values = match custom_id::decode(&raw_custom_id, &descriptor.options) {
            Ok(values) => values,
            Err(error) => {
                tracing::debug!(component = %raw_custom_id, %error, "stale component identifier");
                self.reply_unknown_interaction(&interaction, "This control has expired")
                    .await?;
                return Ok(());
            }
        };

        let log = Arc::new(Mutex::new(ReplyLog::default()));
        let mut ctx = CommandContext::from_interaction(
            self.client.clone(),
            self.watcher.clone(),
            InvocationOrigin::Button,
            descriptor.base_id.clone(),
            Box::new(interaction),
            log,
        );

        if !self.check_component_permissions(&descriptor, &mut ctx).await? {
            return Ok(());
        }

        self.invoke_component(&descriptor, ctx, Arguments::new(values))
            .await;
        Ok(())
    }

    async fn handle_modal(
        &self,
        interaction: Interaction,
        raw_custom_id: String,
        data: ModalInteractionData,
    ) -> anyhow::Result<()> {
        let base = custom_id::base_id(&raw_custom_id);
        let Some(descriptor) = self.commands.component(base).cloned() else {
            self.reply_unknown_interaction(&interaction, "This form has expired")
                .await?;
            return Ok(());
        };

        tracing::info!(
            modal = %raw_custom_id,
            user = ?interaction.author().map(|user| user.name.clone()),
            "received modal submission"
        );

        let mut values = match custom_id::decode(&raw_custom_id, &descriptor.options) {
            Ok(values) => values,
            Err(error) => {
                tracing::debug!(modal = %raw_custom_id, %error, "stale modal identifier");
                self.reply_unknown_interaction(&interaction, "This form has expired")
                    .await?;
                return Ok(());
            }
        };

        // Field values follow the codec-carried state, in declared order.
        let ComponentKind::Modal { fields, .. } = &descriptor.kind else {
            self.reply_unknown_interaction(&interaction, "This form has expired")
                .await?;
            return Ok(());
        };

        let submitted = ModalResponse::new(interaction.clone(), data);
        for field in fields {
            match submitted.get_text_input(&field.custom_id) {
                Some(value) => values.push(ArgumentValue::String(value)),
                None if !field.required => values.push(ArgumentValue::None),
                None => {
                    self.reply_unknown_interaction(&interaction, "Required form field is missing")
                        .await?;
                    return Ok(());
                }
            }
        }

        let log = Arc::new(Mutex::new(ReplyLog::default()));
        let mut ctx = CommandContext::from_interaction(
            self.client.clone(),
            self.watcher.clone(),
            InvocationOrigin::Modal,
            descriptor.base_id.clone(),
            Box::new(interaction),
            log,
        );

        if !self.check_component_permissions(&descriptor, &mut ctx).await? {
            return Ok(());
        }

        self.invoke_component(&descriptor, ctx, Arguments::new(values))
            .await;
        Ok(())
    }

    //
    // Shared dispatch plumbing
    //

    /// Permission failures are expected and frequent: they short-circuit
    /// with a short denial and are never logged as faults.
    async fn check_permissions(
        &self,
        descriptor: &TextCommandDescriptor,
        ctx: &mut CommandContext,
    ) -> anyhow::Result<bool> {
        self.check_required_permissions(descriptor.permissions, ctx)
            .await
    }

    async fn check_component_permissions(
        &self,
        descriptor: &crate::descriptor::ComponentDescriptor,
        ctx: &mut CommandContext,
    ) -> anyhow::Result<bool> {
        self.check_required_permissions(descriptor.permissions, ctx)
            .await
    }

    async fn check_required_permissions(
        &self,
        required: Option<warden_discord::Permissions>,
        ctx: &mut CommandContext,
    ) -> anyhow::Result<bool> {
        let Some(required) = required else {
            return Ok(true);
        };

        let allowed = match ctx.author_permissions().await {
            Ok(held) => held.contains(required),
            Err(_) => false,
        };

        if !allowed {
            ctx.reply(
                Response::error("You don't have permission to use this command.").set_ephemeral(),
            )
            .await
            .ok();
        }

        Ok(allowed)
    }

    async fn reply_parse_failure(
        &self,
        ctx: &mut CommandContext,
        descriptor: &TextCommandDescriptor,
        failure: ParseFailure,
    ) -> anyhow::Result<()> {
        let mut message = failure.message;
        if failure.show_usage {
            message = format!(
                "{}\n\n**Usage:**\n{}",
                message,
                descriptor.get_usage(false)
            );
        }

        ctx.reply(Response::error(message).set_ephemeral()).await
    }

    /// One-off reply for interactions that never resolved to a descriptor.
    async fn reply_unknown_interaction(
        &self,
        interaction: &Interaction,
        message: &str,
    ) -> anyhow::Result<()> {
        self.client
            .http
            .interaction(interaction.application_id)
            .create_response(
                interaction.id,
                &interaction.token,
                &InteractionResponse {
                    kind: InteractionResponseType::ChannelMessageWithSource,
                    data: Some(Response::error(message).set_ephemeral().into()),
                },
            )
            .await?;

        Ok(())
    }

    /// The single error boundary: a handler fault is logged with its full
    /// context and surfaced as one generic failure reply. Dispatch itself
    /// keeps serving events.
    async fn invoke(
        &self,
        descriptor: &TextCommandDescriptor,
        ctx: CommandContext,
        args: Arguments,
    ) {
        let Some(handler) = descriptor.handler.clone() else {
            tracing::error!(command = %descriptor.name, "descriptor has no handler");
            return;
        };

        self.run_handler(handler, ctx, args).await;
    }

    async fn invoke_component(
        &self,
        descriptor: &crate::descriptor::ComponentDescriptor,
        ctx: CommandContext,
        args: Arguments,
    ) {
        self.run_handler(descriptor.handler.clone(), ctx, args).await;
    }

    async fn run_handler(
        &self,
        handler: crate::descriptor::CommandHandler,
        ctx: CommandContext,
        args: Arguments,
    ) {
        let command_name = ctx.command_name.clone();
        let author = ctx.author().map(|user| (user.name.clone(), user.id));
        let mut fault_ctx = ctx.clone();

        if let Err(error) = handler(ctx, args).await {
            tracing::error!(
                command = %command_name,
                user = ?author,
                error = ?error,
                "command handler failed"
            );

            fault_ctx
                .reply(
                    Response::error("Something went wrong while running this command.")
                        .set_ephemeral(),
                )
                .await
                .ok();
        }
    }
}

/// Outcome of resolving a text invocation against a descriptor: the leaf
/// to run, or the container whose info embed should be shown because no
/// subcommand matched.
enum TextResolution<'a> {
    Command {
        descriptor: Arc<TextCommandDescriptor>,
        qualified_name: String,
        body: &'a str,
    },
    ShowInfo(Arc<TextCommandDescriptor>),
}

/// Descends into subcommands token by token, consuming each matched token
/// from the body.
fn walk_subcommands<'a>(
    base_name: &str,
    mut descriptor: Arc<TextCommandDescriptor>,
    mut body: &'a str,
) -> TextResolution<'a> {
    let mut qualified_name = base_name.to_string();

    while descriptor.is_container() {
        let token = SUBCOMMAND_RE.find(body).map(|m| m.as_str());
        let subcommand = token.and_then(|token| descriptor.subcommand(token)).cloned();

        match subcommand {
            Some(subcommand) => {
                qualified_name = format!("{} {}", qualified_name, subcommand.name);
                body = body[token.unwrap_or_default().len()..].trim_start();
                descriptor = subcommand;
            }
            None => return TextResolution::ShowInfo(descriptor),
        }
    }

    TextResolution::Command {
        descriptor,
        qualified_name,
        body,
    }
}

fn truncate(value: String, limit: usize) -> String {
    if value.len() <= limit {
        return value;
    }

    let mut end = limit;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    value[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        argument::{ArgumentOptions, Arguments},
        builder::{IntoCommandDescriptors, TextCommandBuilder},
        context::CommandContext,
        parser::UserResolver,
    };
    use async_trait::async_trait;
    use warden_discord::twilight_model::{
        id::{marker::UserMarker, Id},
        user::User,
    };

    struct NoLookup;

    #[async_trait]
    impl UserResolver for NoLookup {
        async fn resolve_user(&self, _id: Id<UserMarker>) -> anyhow::Result<User> {
            anyhow::bail!("no lookups in this test")
        }
    }

    fn handler() -> impl Fn(CommandContext, Arguments) -> std::future::Ready<anyhow::Result<()>>
           + Send
           + Sync
           + 'static {
        |_ctx, _args| std::future::ready(Ok(()))
    }

    fn case_container() -> Arc<TextCommandDescriptor> {
        let descriptors = TextCommandBuilder::new("case")
            .set_description("Manage cases")
            .add_subcommand(
                TextCommandBuilder::new("add")
                    .set_description("Add a case")
                    .add_number_option(ArgumentOptions::new("id", "case id"))
                    .add_string_option(ArgumentOptions::new("reason", "why"))
                    .set_handler(handler()),
            )
            .add_subcommand(
                TextCommandBuilder::new("remove")
                    .set_description("Remove a case")
                    .add_number_option(ArgumentOptions::new("id", "case id"))
                    .set_handler(handler()),
            )
            .into_descriptors()
            .unwrap();

        Arc::new(descriptors.into_iter().next().unwrap())
    }

    #[tokio::test]
    async fn routes_subcommand_tokens_into_typed_arguments() {
        let container = case_container();

        let TextResolution::Command {
            descriptor,
            qualified_name,
            body,
        } = walk_subcommands("case", container, "add 7 reason text")
        else {
            panic!("expected a resolved subcommand");
        };

        assert_eq!(qualified_name, "case add");
        assert_eq!(descriptor.name, "add");
        assert_eq!(body, "7 reason text");

        let args = parser::parse_text_arguments(&descriptor, &NoLookup, &[], body)
            .await
            .unwrap();
        assert_eq!(args.number(0).unwrap(), 7);
        assert_eq!(args.string(1).unwrap(), "reason text");
    }

    #[test]
    fn unmatched_subcommand_token_shows_the_container_info() {
        let container = case_container();

        assert!(matches!(
            walk_subcommands("case", container.clone(), "frobnicate 7"),
            TextResolution::ShowInfo(_)
        ));
        assert!(matches!(
            walk_subcommands("case", container, ""),
            TextResolution::ShowInfo(_)
        ));
    }
}

