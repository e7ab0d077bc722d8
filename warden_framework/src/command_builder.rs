use warden_discord::{
    twilight_model::{
        application::command::{CommandOption, CommandOptionType, CommandType},
        guild::Permissions,
        id::{
            marker::{ApplicationMarker, GuildMarker},
            Id,
        },
    },
    ApiCommand,
};

/// Builds the declarative registration payload the platform consumes at
/// startup. Descriptors produce one of these per slash-enabled name.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiCommandBuilder {
    pub command: ApiCommand,
}

impl ApiCommandBuilder {
    pub fn new(
        application_id: Id<ApplicationMarker>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            command: ApiCommand {
                application_id: Some(application_id),
                name: name.into(),
                description: description.into(),
                default_member_permissions: None,
                name_localizations: None,
                description_localizations: None,
                dm_permission: None,
                guild_id: None,
                id: None,
                nsfw: None,
                kind: CommandType::ChatInput,
                options: vec![],
                version: Id::new(1),
            },
        }
    }

    pub fn set_guild_id(mut self, guild_id: Id<GuildMarker>) -> Self {
        self.command.guild_id = Some(guild_id);
        self
    }

    pub fn set_default_member_permissions(mut self, permissions: Permissions) -> Self {
        self.command.default_member_permissions = Some(permissions);
        self
    }

    pub fn add_option(mut self, option: ApiCommandOptionBuilder) -> Self {
        self.command.options.push(option.build());
        self
    }

    pub fn build(self) -> ApiCommand {
        self.command
    }
}

pub struct ApiCommandOptionBuilder {
    option: CommandOption,
}

impl ApiCommandOptionBuilder {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        kind: CommandOptionType,
    ) -> Self {
        Self {
            option: CommandOption {
                name: name.into(),
                description: description.into(),
                kind,
                autocomplete: None,
                channel_types: None,
                choices: None,
                name_localizations: None,
                description_localizations: None,
                min_length: None,
                max_length: None,
                min_value: None,
                max_value: None,
                options: None,
                required: None,
            },
        }
    }

    pub fn set_required(mut self, required: bool) -> Self {
        self.option.required = Some(required);
        self
    }

    pub fn set_autocomplete(mut self, autocomplete: bool) -> Self {
        self.option.autocomplete = Some(autocomplete);
        self
    }

    pub fn set_options(mut self, options: Vec<CommandOption>) -> Self {
        self.option.options = Some(options);
        self
    }

    pub fn build(self) -> CommandOption {
        self.option
    }
}
