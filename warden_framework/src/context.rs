use std::sync::{Arc, Mutex};

use anyhow::Context as _;
use warden_common::config;
use warden_discord::{
    twilight_http::client::InteractionClient,
    twilight_model::{
        channel::message::component::ButtonStyle,
        channel::Message,
        guild::Permissions,
        http::interaction::{
            InteractionResponse, InteractionResponseData, InteractionResponseType,
        },
        id::{
            marker::{ChannelMarker, GuildMarker, MessageMarker, UserMarker},
            Id,
        },
        user::User,
    },
    ActionRowBuilder, ButtonBuilder, Interaction, InteractionExtension,
};

use crate::{
    client::WardenClient,
    descriptor::ReplyMode,
    response::Response,
    watcher::{Watcher, WatcherOptions},
};

/// Custom-id namespace for components awaited in-handler through the
/// watcher. The dispatcher never routes these to the registry.
pub const AWAITED_COMPONENT_BASE: &str = "await";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationOrigin {
    Text,
    Slash,
    Button,
    Modal,
}

#[derive(Clone)]
enum InvocationSource {
    Message(Box<Message>),
    Interaction(Box<Interaction>),
}

/// Which underlying platform call the next outbound message must use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyRoute {
    /// Nothing sent yet: create the initial response.
    CreateResponse,
    /// Acknowledged but not replied: fill in the deferred response.
    UpdateDeferred,
    /// Re-dispatched after an edit: edit the existing reply in place.
    EditExisting,
    /// Already replied: further messages are follow-ups.
    FollowUp,
}

/// `idle -> (deferred | replied) -> followed_up* -> terminal`. Created at
/// dispatch, mutated only through the reply surface, discarded with the
/// invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplyState {
    pub acknowledged: bool,
    pub replied: bool,
    pub editing: bool,
}

impl ReplyState {
    pub fn route_reply(&self) -> ReplyRoute {
        if self.editing {
            ReplyRoute::EditExisting
        } else if self.replied {
            ReplyRoute::FollowUp
        } else if self.acknowledged {
            ReplyRoute::UpdateDeferred
        } else {
            ReplyRoute::CreateResponse
        }
    }

    fn mark_acknowledged(&mut self) {
        self.acknowledged = true;
    }

    fn mark_replied(&mut self) {
        self.replied = true;
        self.editing = false;
    }
}

/// Reply bookkeeping that must survive the handler: the state machine and
/// the ids of the messages sent, used by the error boundary and by
/// edit/delete tracking of issued text commands.
#[derive(Debug, Default)]
pub struct ReplyLog {
    pub state: ReplyState,
    pub replies: Vec<(Id<ChannelMarker>, Id<MessageMarker>)>,
}

pub type SharedReplyLog = Arc<Mutex<ReplyLog>>;

/// The per-invocation context a handler receives. One is created per
/// inbound event and never reused or shared across dispatches. Clones
/// share the reply log, so the dispatch boundary's error path sees what
/// the handler already sent.
#[derive(Clone)]
pub struct CommandContext {
    pub client: Arc<WardenClient>,
    pub watcher: Arc<Watcher>,
    pub origin: InvocationOrigin,
    pub command_name: String,

    source: InvocationSource,
    log: SharedReplyLog,
}

impl CommandContext {
    pub(crate) fn from_message(
        client: Arc<WardenClient>,
        watcher: Arc<Watcher>,
        command_name: impl Into<String>,
        message: Box<Message>,
        log: SharedReplyLog,
    ) -> Self {
        Self {
            client,
            watcher,
            origin: InvocationOrigin::Text,
            command_name: command_name.into(),
            source: InvocationSource::Message(message),
            log,
        }
    }

    pub(crate) fn from_interaction(
        client: Arc<WardenClient>,
        watcher: Arc<Watcher>,
        origin: InvocationOrigin,
        command_name: impl Into<String>,
        interaction: Box<Interaction>,
        log: SharedReplyLog,
    ) -> Self {
        Self {
            client,
            watcher,
            origin,
            command_name: command_name.into(),
            source: InvocationSource::Interaction(interaction),
            log,
        }
    }

    pub fn is_interaction(&self) -> bool {
        matches!(self.source, InvocationSource::Interaction(_))
    }

    pub fn author(&self) -> Option<&User> {
        match &self.source {
            InvocationSource::Message(message) => Some(&message.author),
            InvocationSource::Interaction(interaction) => interaction.author(),
        }
    }

    pub fn author_id(&self) -> anyhow::Result<Id<UserMarker>> {
        match &self.source {
            InvocationSource::Message(message) => Ok(message.author.id),
            InvocationSource::Interaction(interaction) => {
                interaction.author_id().context("interaction has no author")
            }
        }
    }

    pub fn guild_id(&self) -> Option<Id<GuildMarker>> {
        match &self.source {
            InvocationSource::Message(message) => message.guild_id,
            InvocationSource::Interaction(interaction) => interaction.guild_id,
        }
    }

    pub fn channel_id(&self) -> anyhow::Result<Id<ChannelMarker>> {
        match &self.source {
            InvocationSource::Message(message) => Ok(message.channel_id),
            InvocationSource::Interaction(interaction) => interaction
                .channel
                .as_ref()
                .map(|channel| channel.id)
                .context("interaction has no channel"),
        }
    }

    pub fn reply_state(&self) -> ReplyState {
        self.log.lock().unwrap().state
    }

    pub fn reply_ids(&self) -> Vec<(Id<ChannelMarker>, Id<MessageMarker>)> {
        self.log.lock().unwrap().replies.clone()
    }

    /// Marks the next reply as an in-place edit of the previous one. Used
    /// when an issued text command message is edited and re-dispatched.
    pub fn set_editing(&mut self) {
        self.log.lock().unwrap().state.editing = true;
    }

    pub fn is_editing(&self) -> bool {
        self.log.lock().unwrap().state.editing
    }

    /// The invoking user's resolved guild permissions. Interactions carry
    /// them in the payload; text invocations fold them from the role cache.
    pub async fn author_permissions(&self) -> anyhow::Result<Permissions> {
        if let InvocationSource::Interaction(interaction) = &self.source {
            if let Some(permissions) = interaction.member.as_ref().and_then(|m| m.permissions) {
                return Ok(permissions);
            }
        }

        let guild_id = self.guild_id().context("not invoked in a guild")?;
        self.client
            .member_permissions(guild_id, self.author_id()?)
            .await
    }

    fn interaction(&self) -> anyhow::Result<&Interaction> {
        match &self.source {
            InvocationSource::Interaction(interaction) => Ok(interaction),
            InvocationSource::Message(_) => {
                anyhow::bail!("operation requires an interaction origin")
            }
        }
    }

    fn interaction_client(&self) -> anyhow::Result<InteractionClient<'_>> {
        let interaction = self.interaction()?;
        Ok(self.client.http.interaction(interaction.application_id))
    }

    /// Applies the descriptor's reply mode: eagerly defers structured
    /// interactions so slow handlers cannot miss the acknowledgment
    /// window. Text invocations have no such deadline and are unaffected.
    pub(crate) async fn apply_reply_mode(&mut self, mode: ReplyMode) -> anyhow::Result<()> {
        match mode {
            ReplyMode::None => Ok(()),
            ReplyMode::Ephemeral => self.defer(true).await,
            ReplyMode::Visible => self.defer(false).await,
        }
    }

    /// Acknowledges a structured interaction without sending content yet.
    pub async fn defer(&mut self, ephemeral: bool) -> anyhow::Result<()> {
        let InvocationSource::Interaction(interaction) = &self.source else {
            return Ok(());
        };

        {
            let state = self.log.lock().unwrap().state;
            if state.acknowledged || state.replied {
                return Ok(());
            }
        }

        let data = ephemeral.then(|| {
            InteractionResponseData::from(Response::default().set_ephemeral())
        });

        self.client
            .http
            .interaction(interaction.application_id)
            .create_response(
                interaction.id,
                &interaction.token,
                &InteractionResponse {
                    kind: InteractionResponseType::DeferredChannelMessageWithSource,
                    data,
                },
            )
            .await?;

        self.log.lock().unwrap().state.mark_acknowledged();
        Ok(())
    }

    /// The uniform reply surface: inspects the current state and picks
    /// create-response, deferred-update, in-place edit or follow-up, so
    /// callers never branch on where the invocation came from.
    pub async fn reply(&mut self, response: impl Into<Response>) -> anyhow::Result<()> {
        self.deliver(response.into()).await?;
        Ok(())
    }

    /// Like `reply`, but always hands back the resulting message.
    pub async fn send(&mut self, response: impl Into<Response>) -> anyhow::Result<Message> {
        match self.deliver(response.into()).await? {
            Some(message) => Ok(message),
            None => self.fetch_reply().await,
        }
    }

    /// Edits the current reply in place.
    pub async fn edit_reply(&mut self, response: impl Into<Response>) -> anyhow::Result<()> {
        self.set_editing();
        self.reply(response).await
    }

    async fn deliver(&mut self, response: Response) -> anyhow::Result<Option<Message>> {
        let route = self.log.lock().unwrap().state.route_reply();

        match &self.source {
            InvocationSource::Interaction(interaction) => {
                let client = self.client.http.interaction(interaction.application_id);
                match route {
                    ReplyRoute::CreateResponse => {
                        client
                            .create_response(
                                interaction.id,
                                &interaction.token,
                                &InteractionResponse {
                                    kind: InteractionResponseType::ChannelMessageWithSource,
                                    data: Some(response.into()),
                                },
                            )
                            .await?;
                        self.log.lock().unwrap().state.mark_replied();
                        Ok(None)
                    }
                    ReplyRoute::UpdateDeferred | ReplyRoute::EditExisting => {
                        let message = client
                            .update_response(&interaction.token)
                            .payload_json(&response.to_json())
                            .await?
                            .model()
                            .await?;
                        self.log.lock().unwrap().state.mark_replied();
                        Ok(Some(message))
                    }
                    ReplyRoute::FollowUp => {
                        let message = client
                            .create_followup(&interaction.token)
                            .payload_json(&response.to_json())
                            .await?
                            .model()
                            .await?;
                        let mut log = self.log.lock().unwrap();
                        log.replies.push((message.channel_id, message.id));
                        Ok(Some(message))
                    }
                }
            }
            InvocationSource::Message(invocation) => {
                match route {
                    ReplyRoute::EditExisting => {
                        let target = self.log.lock().unwrap().replies.first().copied();
                        let Some((channel_id, message_id)) = target else {
                            // Nothing to edit; fall through to a fresh send.
                            let message = self.send_in_channel(&response, invocation).await?;
                            let mut log = self.log.lock().unwrap();
                            log.state.mark_replied();
                            log.replies.push((message.channel_id, message.id));
                            return Ok(Some(message));
                        };

                        let message = self
                            .client
                            .http
                            .update_message(channel_id, message_id)
                            .payload_json(&response.to_channel_message_json())
                            .await?
                            .model()
                            .await?;
                        self.log.lock().unwrap().state.mark_replied();
                        Ok(Some(message))
                    }
                    _ => {
                        let message = self.send_in_channel(&response, invocation).await?;
                        let mut log = self.log.lock().unwrap();
                        log.state.mark_replied();
                        log.replies.push((message.channel_id, message.id));
                        Ok(Some(message))
                    }
                }
            }
        }
    }

    async fn send_in_channel(
        &self,
        response: &Response,
        invocation: &Message,
    ) -> anyhow::Result<Message> {
        let create = self.client.http.create_message(invocation.channel_id);
        let create = if response.text_reply {
            create.reply(invocation.id)
        } else {
            create
        };

        Ok(create
            .payload_json(&response.to_channel_message_json())
            .await?
            .model()
            .await?)
    }

    /// The message behind the initial interaction response.
    pub async fn fetch_reply(&self) -> anyhow::Result<Message> {
        anyhow::ensure!(
            self.reply_state().replied,
            "this invocation has not replied yet"
        );

        let interaction = self.interaction()?;
        Ok(self
            .interaction_client()?
            .response(&interaction.token)
            .await?
            .model()
            .await?)
    }

    /// For button presses: replaces the message the component lives on.
    pub async fn update_component_message(
        &mut self,
        response: impl Into<Response>,
    ) -> anyhow::Result<()> {
        let interaction = self.interaction()?;
        self.client
            .http
            .interaction(interaction.application_id)
            .create_response(
                interaction.id,
                &interaction.token,
                &InteractionResponse {
                    kind: InteractionResponseType::UpdateMessage,
                    data: Some(response.into().into()),
                },
            )
            .await?;

        self.log.lock().unwrap().state.mark_replied();
        Ok(())
    }

    /// Opens a modal. Only valid as the initial response to a command or
    /// button interaction.
    pub async fn open_modal(&mut self, data: InteractionResponseData) -> anyhow::Result<()> {
        let interaction = self.interaction()?;
        anyhow::ensure!(
            !self.reply_state().replied && !self.reply_state().acknowledged,
            "a modal must be the initial response"
        );

        self.client
            .http
            .interaction(interaction.application_id)
            .create_response(
                interaction.id,
                &interaction.token,
                &InteractionResponse {
                    kind: InteractionResponseType::Modal,
                    data: Some(data),
                },
            )
            .await?;

        self.log.lock().unwrap().state.mark_replied();
        Ok(())
    }

    /// Deletes everything this invocation sent: the interaction response
    /// and every tracked follow-up or channel message.
    pub async fn delete_replies(&mut self) -> anyhow::Result<()> {
        if !self.reply_state().replied {
            return Ok(());
        }

        let replies = {
            let mut log = self.log.lock().unwrap();
            std::mem::take(&mut log.replies)
        };

        if let InvocationSource::Interaction(interaction) = &self.source {
            self.client
                .http
                .interaction(interaction.application_id)
                .delete_response(&interaction.token)
                .await
                .ok();
        }

        for (channel_id, message_id) in replies {
            self.client
                .http
                .delete_message(channel_id, message_id)
                .await
                .ok();
        }

        Ok(())
    }

    /// Posts the response with confirm/cancel buttons, waits for the given
    /// user's press and reports the choice. Times out to `false`. The
    /// buttons are disabled afterwards either way.
    pub async fn create_confirmation(
        &mut self,
        user_id: Id<UserMarker>,
        response: impl Into<Response>,
    ) -> anyhow::Result<bool> {
        let yes_id = format!("{}:yes", AWAITED_COMPONENT_BASE);
        let no_id = format!("{}:no", AWAITED_COMPONENT_BASE);

        let buttons = vec![
            ButtonBuilder::new()
                .set_custom_id(&yes_id)
                .set_label("Confirm")
                .set_style(ButtonStyle::Success),
            ButtonBuilder::new()
                .set_custom_id(&no_id)
                .set_label("Cancel")
                .set_style(ButtonStyle::Danger),
        ];

        let response = response
            .into()
            .set_components(vec![ActionRowBuilder::new().add_buttons(buttons.clone())]);
        let message = self.send(response.clone()).await?;

        let pressed = self
            .watcher
            .await_single_component(
                message.id,
                move |interaction: &Interaction| interaction.author_id() == Some(user_id),
                WatcherOptions {
                    timeout: config::CONFIRMATION_TIMEOUT,
                },
            )
            .await;

        let Ok(Some(interaction)) = pressed else {
            // Timed out: disable the buttons on the prompt message.
            let disabled = buttons
                .into_iter()
                .map(|button| button.set_disabled(true).set_style(ButtonStyle::Secondary))
                .collect::<Vec<_>>();
            self.client
                .http
                .update_message(message.channel_id, message.id)
                .payload_json(
                    &response
                        .clone()
                        .set_components(vec![ActionRowBuilder::new().add_buttons(disabled)])
                        .to_channel_message_json(),
                )
                .await
                .ok();
            return Ok(false);
        };

        let data = interaction.parse_message_component_data()?;
        let confirmed = data.custom_id == yes_id;

        let disabled = buttons
            .into_iter()
            .map(|button| {
                let pressed = button.custom_id() == Some(data.custom_id.as_str());
                button
                    .set_disabled(true)
                    .set_style(if pressed {
                        ButtonStyle::Success
                    } else {
                        ButtonStyle::Secondary
                    })
            })
            .collect::<Vec<_>>();

        let mut press_ctx = CommandContext::from_interaction(
            self.client.clone(),
            self.watcher.clone(),
            InvocationOrigin::Button,
            self.command_name.clone(),
            Box::new(interaction),
            Arc::new(Mutex::new(ReplyLog::default())),
        );
        press_ctx
            .update_component_message(
                response.set_components(vec![ActionRowBuilder::new().add_buttons(disabled)]),
            )
            .await?;

        Ok(confirmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_state_creates_the_initial_response() {
        let state = ReplyState::default();
        assert_eq!(state.route_reply(), ReplyRoute::CreateResponse);
    }

    #[test]
    fn second_reply_routes_through_follow_up() {
        let mut state = ReplyState::default();
        state.mark_replied();
        assert_eq!(state.route_reply(), ReplyRoute::FollowUp);

        // Follow-ups keep the state terminal-replied.
        state.mark_replied();
        assert_eq!(state.route_reply(), ReplyRoute::FollowUp);
    }

    #[test]
    fn deferred_state_updates_the_deferred_response_once() {
        let mut state = ReplyState::default();
        state.mark_acknowledged();
        assert_eq!(state.route_reply(), ReplyRoute::UpdateDeferred);

        state.mark_replied();
        assert_eq!(state.route_reply(), ReplyRoute::FollowUp);
    }

    #[test]
    fn editing_takes_precedence_until_the_edit_lands() {
        let mut state = ReplyState::default();
        state.mark_replied();
        state.editing = true;
        assert_eq!(state.route_reply(), ReplyRoute::EditExisting);

        state.mark_replied();
        assert_eq!(state.route_reply(), ReplyRoute::FollowUp);
    }
}
