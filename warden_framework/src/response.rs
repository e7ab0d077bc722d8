use warden_common::Color;
use warden_discord::{
    twilight_model::{
        channel::message::{Component, MessageFlags},
        http::interaction::InteractionResponseData,
        user::User,
    },
    EmbedBuilder, UserExtension,
};

/// An outbound message, convertible both into an interaction response and
/// into a plain channel-message payload.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Response {
    pub content: Option<String>,
    pub embeds: Option<Vec<EmbedBuilder>>,
    pub flags: Option<MessageFlags>,
    pub components: Option<Vec<Component>>,

    /// In text-command origin, reply to the invoking message instead of
    /// posting a free-standing channel message.
    pub text_reply: bool,
}

impl From<Response> for InteractionResponseData {
    fn from(response: Response) -> Self {
        Self {
            content: response.content,
            embeds: response
                .embeds
                .map(|embeds| embeds.into_iter().map(|e| e.build()).collect()),
            flags: response.flags,
            components: response.components,
            ..Default::default()
        }
    }
}

impl Response {
    pub fn from_string(content: impl Into<String>) -> Response {
        Response {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn from_embeds(embeds: Vec<EmbedBuilder>) -> Response {
        Response {
            embeds: Some(embeds),
            ..Default::default()
        }
    }

    pub fn new_user_reply(user: &User, content: impl Into<String>) -> Response {
        Response::from_string(format!("**{}**, {}", user.mention(), content.into()))
    }

    /// The formatted failure reply used for parse and permission errors.
    pub fn error(message: impl Into<String>) -> Response {
        Response::from_embeds(vec![EmbedBuilder::new_common()
            .set_color(Color::RED)
            .set_description(message.into())])
        .set_text_reply(true)
    }

    pub fn success(message: impl Into<String>) -> Response {
        Response::from_embeds(vec![EmbedBuilder::new_common()
            .set_color(Color::GREEN)
            .set_description(message.into())])
    }

    pub fn add_embed(self, embed: EmbedBuilder) -> Response {
        let mut embeds = self.embeds.unwrap_or_default();
        embeds.push(embed);

        Response {
            embeds: Some(embeds),
            ..self
        }
    }

    pub fn set_ephemeral(self) -> Response {
        Response {
            flags: Some(MessageFlags::EPHEMERAL),
            ..self
        }
    }

    pub fn set_components(self, components: Vec<impl Into<Component>>) -> Response {
        Response {
            components: Some(components.into_iter().map(|c| c.into()).collect()),
            ..self
        }
    }

    pub fn remove_all_components(self) -> Response {
        Response {
            components: Some(vec![]),
            ..self
        }
    }

    pub fn set_text_reply(self, text_reply: bool) -> Response {
        Response { text_reply, ..self }
    }

    pub fn is_ephemeral(&self) -> bool {
        self.flags
            .is_some_and(|flags| flags.contains(MessageFlags::EPHEMERAL))
    }

    pub fn to_json(&self) -> Vec<u8> {
        let data = InteractionResponseData::from(self.clone());

        serde_json::to_vec(&data).unwrap_or_default()
    }

    /// Channel messages cannot be ephemeral; the flag is dropped when the
    /// reply surface falls back to a plain channel send.
    pub fn to_channel_message_json(&self) -> Vec<u8> {
        let mut response = self.clone();
        response.flags = response
            .flags
            .map(|flags| flags & !MessageFlags::EPHEMERAL)
            .filter(|flags| !flags.is_empty());
        response.to_json()
    }
}

impl From<EmbedBuilder> for Response {
    fn from(value: EmbedBuilder) -> Self {
        Self::from_embeds(vec![value])
    }
}

impl From<String> for Response {
    fn from(value: String) -> Self {
        Self::from_string(value)
    }
}

impl From<&str> for Response {
    fn from(value: &str) -> Self {
        Self::from_string(value.to_string())
    }
}
