use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc};

use warden_common::{config, Color};
use warden_discord::{
    twilight_model::{
        application::command::CommandOptionType,
        guild::Permissions,
        http::interaction::InteractionResponseData,
        id::{marker::ApplicationMarker, Id},
    },
    ApiCommand, EmbedBuilder, ModalBuilder, TextInputBuilder,
};

use crate::{
    argument::{ArgumentDecl, ArgumentKind, ArgumentValue, Arguments},
    command_builder::{ApiCommandBuilder, ApiCommandOptionBuilder},
    context::CommandContext,
    custom_id,
};

/// Whether the framework acknowledges a structured interaction before the
/// handler body runs. The platform's response window is a few seconds;
/// eager deferral trades a visible "thinking" indicator for immunity to
/// slow handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplyMode {
    #[default]
    None,
    Ephemeral,
    Visible,
}

pub type HandlerFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

/// The uniform handler signature: `(context, arguments) -> Result`.
pub type CommandHandler = Arc<dyn Fn(CommandContext, Arguments) -> HandlerFuture + Send + Sync>;

pub(crate) fn box_handler<F, Fut>(handler: F) -> CommandHandler
where
    F: Fn(CommandContext, Arguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |ctx, args| Box::pin(handler(ctx, args)))
}

/// An immutable, fully-configured text/slash command. Either a container
/// (non-empty subcommand map, no handler of its own) or a leaf (handler
/// plus parameter list), never both.
#[derive(Clone)]
pub struct TextCommandDescriptor {
    pub name: String,
    pub description: String,
    pub slash: bool,
    /// Set on descriptors registered under a non-primary name.
    pub alias_of: Option<String>,
    pub category: Option<String>,
    pub permissions: Option<Permissions>,
    pub reply_mode: ReplyMode,
    pub allow_trailing_text: bool,
    pub options: Vec<ArgumentDecl>,
    pub subcommands: Option<HashMap<String, Arc<TextCommandDescriptor>>>,
    pub handler: Option<CommandHandler>,
}

impl TextCommandDescriptor {
    pub fn is_container(&self) -> bool {
        self.subcommands.is_some()
    }

    pub fn subcommand(&self, name: &str) -> Option<&Arc<TextCommandDescriptor>> {
        self.subcommands.as_ref()?.get(name)
    }

    /// Renders `name <required> [optional]`, one line per subcommand for
    /// containers. The non-raw form is wrapped in backticks and prefixed.
    pub fn get_usage(&self, raw: bool) -> String {
        let prefix = if raw { "" } else { config::COMMAND_PREFIX };

        if let Some(subcommands) = &self.subcommands {
            let mut subcommands: Vec<_> = subcommands.values().collect();
            subcommands.sort_by(|a, b| a.name.cmp(&b.name));
            subcommands
                .iter()
                .map(|sub| {
                    let line = format!("{}{} {}", prefix, self.name, sub.get_usage(true));
                    if raw {
                        line
                    } else {
                        format!("`{}`", line)
                    }
                })
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            let mut parts = vec![format!("{}{}", prefix, self.name)];
            for option in &self.options {
                parts.push(if option.required {
                    format!("<{}>", option.title)
                } else {
                    format!("[{}]", option.title)
                });
            }

            let line = parts.join(" ");
            if raw {
                line
            } else {
                format!("`{}`", line)
            }
        }
    }

    /// The embed a container replies with when no subcommand matched.
    pub fn info_embed(&self) -> EmbedBuilder {
        let mut embed = EmbedBuilder::new_common()
            .set_color(Color::BLURPLE)
            .set_title(format!("{}{}", config::COMMAND_PREFIX, self.name))
            .set_description(self.description.clone())
            .add_field("Usage", self.get_usage(false), false);

        if let Some(category) = &self.category {
            embed = embed.set_footer_text(category.clone());
        }

        embed
    }

    fn option_kind(kind: &ArgumentKind) -> CommandOptionType {
        match kind {
            ArgumentKind::String { .. } => CommandOptionType::String,
            ArgumentKind::Number => CommandOptionType::Integer,
            ArgumentKind::Boolean => CommandOptionType::Boolean,
            ArgumentKind::User => CommandOptionType::User,
            // Multi-user lists ride in a string option and are re-parsed.
            ArgumentKind::Users => CommandOptionType::String,
            ArgumentKind::Role => CommandOptionType::Role,
            ArgumentKind::UserId => CommandOptionType::User,
        }
    }

    fn api_options(&self) -> Vec<ApiCommandOptionBuilder> {
        self.options
            .iter()
            .map(|decl| {
                let mut option = ApiCommandOptionBuilder::new(
                    decl.title.clone(),
                    decl.description.clone(),
                    Self::option_kind(&decl.kind),
                )
                .set_required(decl.required);
                if decl.autocomplete.is_some() {
                    option = option.set_autocomplete(true);
                }
                option
            })
            .collect()
    }

    /// The declarative registration payload for this descriptor.
    pub fn to_api_command(&self, application_id: Id<ApplicationMarker>) -> ApiCommand {
        let mut builder =
            ApiCommandBuilder::new(application_id, self.name.clone(), self.description.clone());

        if let Some(permissions) = self.permissions {
            builder = builder.set_default_member_permissions(permissions);
        }

        if let Some(subcommands) = &self.subcommands {
            let mut subcommands: Vec<_> = subcommands.values().collect();
            subcommands.sort_by(|a, b| a.name.cmp(&b.name));
            for sub in subcommands {
                builder = builder.add_option(
                    ApiCommandOptionBuilder::new(
                        sub.name.clone(),
                        sub.description.clone(),
                        CommandOptionType::SubCommand,
                    )
                    .set_options(sub.api_options().into_iter().map(|o| o.build()).collect()),
                );
            }
        } else {
            for option in self.api_options() {
                builder = builder.add_option(option);
            }
        }

        builder.build()
    }
}

/// Configuration of one text input inside a modal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalFieldConfig {
    pub custom_id: String,
    pub label: String,
    pub paragraph: bool,
    pub required: bool,
    pub placeholder: Option<String>,
}

impl ModalFieldConfig {
    pub fn new(custom_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            custom_id: custom_id.into(),
            label: label.into(),
            paragraph: false,
            required: true,
            placeholder: None,
        }
    }

    pub fn paragraph(mut self) -> Self {
        self.paragraph = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }
}

#[derive(Debug, Clone)]
pub enum ComponentKind {
    Button,
    Modal {
        title: String,
        fields: Vec<ModalFieldConfig>,
    },
}

/// An immutable button or modal handler registration. The parameter list
/// is the typed state round-tripped through the custom identifier.
#[derive(Clone)]
pub struct ComponentDescriptor {
    pub base_id: String,
    pub permissions: Option<Permissions>,
    pub options: Vec<ArgumentDecl>,
    pub kind: ComponentKind,
    pub handler: CommandHandler,
}

impl ComponentDescriptor {
    fn check_values(&self, values: &[ArgumentValue]) -> anyhow::Result<()> {
        anyhow::ensure!(
            values.len() == self.options.len(),
            "component {:?} declares {} parameters, got {} values",
            self.base_id,
            self.options.len(),
            values.len()
        );
        for (decl, value) in self.options.iter().zip(values) {
            anyhow::ensure!(
                decl.kind.accepts(value),
                "component {:?}: value {:?} does not fit parameter {:?}",
                self.base_id,
                value,
                decl.title
            );
        }
        Ok(())
    }

    /// Encodes the identifier a button/modal built from this descriptor
    /// must carry. Fails when the values mismatch the declarations or the
    /// encoded form exceeds the platform ceiling.
    pub fn encode_custom_id(&self, values: &[ArgumentValue]) -> anyhow::Result<String> {
        self.check_values(values)?;
        custom_id::encode(&self.base_id, values)
    }

    /// For modal descriptors: the interaction response payload opening the
    /// modal, with the argument state encoded in its identifier.
    pub fn build_modal(&self, values: &[ArgumentValue]) -> anyhow::Result<InteractionResponseData> {
        let ComponentKind::Modal { title, fields } = &self.kind else {
            anyhow::bail!("component {:?} is not a modal", self.base_id);
        };

        let mut builder = ModalBuilder::new(title.clone(), self.encode_custom_id(values)?);
        for field in fields {
            let mut input = TextInputBuilder::new(field.custom_id.clone(), field.label.clone())
                .set_required(field.required);
            if field.paragraph {
                input = input.set_paragraph();
            }
            if let Some(placeholder) = &field.placeholder {
                input = input.set_placeholder(placeholder.clone());
            }
            builder = builder.add_text_input(input);
        }

        Ok(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argument::ArgumentOptions;

    fn leaf(name: &str, options: Vec<ArgumentDecl>) -> TextCommandDescriptor {
        TextCommandDescriptor {
            name: name.into(),
            description: "a command".into(),
            slash: true,
            alias_of: None,
            category: None,
            permissions: None,
            reply_mode: ReplyMode::None,
            allow_trailing_text: false,
            options,
            subcommands: None,
            handler: Some(box_handler(|_ctx, _args| async { Ok(()) })),
        }
    }

    #[test]
    fn renders_leaf_usage() {
        let descriptor = leaf(
            "note",
            vec![
                ArgumentOptions::new("user", "who").into_decl(ArgumentKind::User),
                ArgumentOptions::new("text", "the note")
                    .optional()
                    .into_decl(ArgumentKind::plain_string()),
            ],
        );

        assert_eq!(descriptor.get_usage(false), "`!note <user> [text]`");
        assert_eq!(descriptor.get_usage(true), "note <user> [text]");
    }

    #[test]
    fn renders_container_usage_recursively() {
        let add = leaf(
            "add",
            vec![ArgumentOptions::new("text", "the text").into_decl(ArgumentKind::plain_string())],
        );
        let remove = leaf(
            "remove",
            vec![ArgumentOptions::new("id", "which one").into_decl(ArgumentKind::Number)],
        );

        let mut subcommands = HashMap::new();
        subcommands.insert("add".to_string(), Arc::new(add));
        subcommands.insert("remove".to_string(), Arc::new(remove));

        let container = TextCommandDescriptor {
            name: "tag".into(),
            description: "manage tags".into(),
            slash: true,
            alias_of: None,
            category: None,
            permissions: None,
            reply_mode: ReplyMode::None,
            allow_trailing_text: false,
            options: vec![],
            subcommands: Some(subcommands),
            handler: None,
        };

        assert_eq!(
            container.get_usage(false),
            "`!tag add <text>`\n`!tag remove <id>`"
        );
    }

    #[test]
    fn builds_registration_payload_with_subcommands() {
        let add = leaf(
            "add",
            vec![ArgumentOptions::new("text", "the text").into_decl(ArgumentKind::plain_string())],
        );

        let mut subcommands = HashMap::new();
        subcommands.insert("add".to_string(), Arc::new(add));

        let container = TextCommandDescriptor {
            name: "tag".into(),
            description: "manage tags".into(),
            slash: true,
            alias_of: None,
            category: None,
            permissions: Some(Permissions::MANAGE_MESSAGES),
            reply_mode: ReplyMode::None,
            allow_trailing_text: false,
            options: vec![],
            subcommands: Some(subcommands),
            handler: None,
        };

        let api = container.to_api_command(Id::new(1));
        assert_eq!(api.name, "tag");
        assert_eq!(
            api.default_member_permissions,
            Some(Permissions::MANAGE_MESSAGES)
        );
        assert_eq!(api.options.len(), 1);
        assert_eq!(api.options[0].name, "add");
        assert_eq!(api.options[0].kind, CommandOptionType::SubCommand);
        assert_eq!(api.options[0].options.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn component_encode_checks_declarations() {
        let descriptor = ComponentDescriptor {
            base_id: "case".into(),
            permissions: None,
            options: vec![
                ArgumentOptions::new("id", "case id").into_decl(ArgumentKind::Number),
                ArgumentOptions::new("resolve", "resolve it").into_decl(ArgumentKind::Boolean),
            ],
            kind: ComponentKind::Button,
            handler: box_handler(|_ctx, _args| async { Ok(()) }),
        };

        let id = descriptor
            .encode_custom_id(&[ArgumentValue::Number(9), ArgumentValue::Boolean(false)])
            .unwrap();
        assert_eq!(id, "case:9:false");

        // Wrong arity and wrong kind are caller errors.
        assert!(descriptor.encode_custom_id(&[]).is_err());
        assert!(descriptor
            .encode_custom_id(&[ArgumentValue::Boolean(true), ArgumentValue::Number(9)])
            .is_err());
    }
}
