use twilight_model::{
    application::interaction::{
        message_component::MessageComponentInteractionData, modal::ModalInteractionData,
        Interaction, InteractionData,
    },
    user::{CurrentUser, User},
};

const DEFAULT_AVATAR_URL: &str = "https://cdn.discordapp.com/embed/avatars/0.png";

pub trait UserExtension {
    fn avatar_url(&self) -> String;
    fn mention(&self) -> String;
    fn display_name(&self) -> String;
}

impl UserExtension for User {
    fn avatar_url(&self) -> String {
        let Some(avatar) = self.avatar else {
            return DEFAULT_AVATAR_URL.into();
        };

        format!(
            "https://cdn.discordapp.com/avatars/{}/{}.png",
            self.id, avatar
        )
    }

    fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }

    fn display_name(&self) -> String {
        self.global_name.clone().unwrap_or(self.name.clone())
    }
}

impl UserExtension for CurrentUser {
    fn avatar_url(&self) -> String {
        let Some(avatar) = self.avatar else {
            return DEFAULT_AVATAR_URL.into();
        };

        format!(
            "https://cdn.discordapp.com/avatars/{}/{}.png",
            self.id, avatar
        )
    }

    fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }

    fn display_name(&self) -> String {
        self.name.to_owned()
    }
}

pub trait InteractionExtension {
    fn parse_message_component_data(&self) -> anyhow::Result<MessageComponentInteractionData>;
    fn parse_modal_data(&self) -> anyhow::Result<ModalInteractionData>;
}

impl InteractionExtension for Interaction {
    fn parse_message_component_data(&self) -> anyhow::Result<MessageComponentInteractionData> {
        if let Some(InteractionData::MessageComponent(data)) = self.data.clone() {
            Ok(data)
        } else {
            anyhow::bail!("interaction does not carry message component data");
        }
    }

    fn parse_modal_data(&self) -> anyhow::Result<ModalInteractionData> {
        if let Some(InteractionData::ModalSubmit(data)) = self.data.clone() {
            Ok(data)
        } else {
            anyhow::bail!("interaction does not carry modal submit data");
        }
    }
}
