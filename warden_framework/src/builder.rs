use std::{collections::HashMap, future::Future, marker::PhantomData, sync::Arc};

use warden_discord::twilight_model::guild::Permissions;

use crate::{
    argument::{ArgumentDecl, ArgumentKind, ArgumentOptions, Arguments},
    context::CommandContext,
    descriptor::{
        box_handler, CommandHandler, ComponentDescriptor, ComponentKind, ModalFieldConfig,
        ReplyMode, TextCommandDescriptor,
    },
};

/// Builder state: no handler bound yet. `build` is not available here, so
/// an unfinished builder cannot produce a descriptor.
pub struct MissingHandler;
/// Builder state: a handler is bound; the builder describes a leaf command.
pub struct WithHandler;
/// Builder state: subcommands attached; the builder describes a container.
pub struct WithSubcommands;

/// Shared parameter accumulation for all three builder flavors. Appending
/// is order-preserving; a duplicate title is a configuration error and
/// fails immediately.
#[derive(Clone, Default)]
struct ArgumentListBuilder {
    decls: Vec<ArgumentDecl>,
}

impl ArgumentListBuilder {
    fn push(&mut self, options: ArgumentOptions, kind: ArgumentKind) {
        assert!(
            !self.decls.iter().any(|decl| decl.title == options.title),
            "duplicate parameter title {:?}",
            options.title
        );
        if !matches!(kind, ArgumentKind::String { .. }) {
            assert!(
                options.pattern.is_none(),
                "parameter {:?}: patterns only apply to string parameters",
                options.title
            );
        }
        self.decls.push(options.into_decl(kind));
    }
}

/// Fluent configuration of a text/slash command. Descriptors come out of
/// `CommandSetBuilder::add_command`; the type parameter tracks whether the
/// builder already has a handler or subcommands attached.
pub struct TextCommandBuilder<State = MissingHandler> {
    names: Vec<String>,
    descriptions: Vec<String>,
    slash_config: Vec<bool>,
    category: Option<String>,
    permissions: Option<Permissions>,
    reply_mode: ReplyMode,
    allow_trailing_text: bool,
    args: ArgumentListBuilder,
    subcommands: Vec<TextCommandBuilder<WithHandler>>,
    handler: Option<CommandHandler>,
    _state: PhantomData<State>,
}

impl TextCommandBuilder<MissingHandler> {
    pub fn new(name: impl Into<String>) -> Self {
        Self::new_aliased(&[&name.into()])
    }

    /// A command reachable under several names. The first name is the
    /// primary; the others register as aliases pointing at it.
    pub fn new_aliased(names: &[&str]) -> Self {
        assert!(!names.is_empty(), "a command needs at least one name");
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
            descriptions: vec![],
            slash_config: vec![true; names.len()],
            category: None,
            permissions: None,
            reply_mode: ReplyMode::default(),
            allow_trailing_text: false,
            args: ArgumentListBuilder::default(),
            subcommands: vec![],
            handler: None,
            _state: PhantomData,
        }
    }

    pub fn set_handler<F, Fut>(self, handler: F) -> TextCommandBuilder<WithHandler>
    where
        F: Fn(CommandContext, Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let mut builder = self.into_state::<WithHandler>();
        builder.handler = Some(box_handler(handler));
        builder
    }

    pub fn add_subcommand(
        self,
        subcommand: TextCommandBuilder<WithHandler>,
    ) -> TextCommandBuilder<WithSubcommands> {
        let mut builder = self.into_state::<WithSubcommands>();
        builder.subcommands.push(subcommand);
        builder
    }
}

impl TextCommandBuilder<WithSubcommands> {
    pub fn add_subcommand(mut self, subcommand: TextCommandBuilder<WithHandler>) -> Self {
        self.subcommands.push(subcommand);
        self
    }
}

impl<State> TextCommandBuilder<State> {
    fn into_state<Next>(self) -> TextCommandBuilder<Next> {
        TextCommandBuilder {
            names: self.names,
            descriptions: self.descriptions,
            slash_config: self.slash_config,
            category: self.category,
            permissions: self.permissions,
            reply_mode: self.reply_mode,
            allow_trailing_text: self.allow_trailing_text,
            args: self.args,
            subcommands: self.subcommands,
            handler: self.handler,
            _state: PhantomData,
        }
    }

    /// One description broadcast to every name.
    pub fn set_description(mut self, description: impl Into<String>) -> Self {
        self.descriptions = vec![description.into()];
        self
    }

    /// One description per name; the count must match at build time.
    pub fn set_descriptions(mut self, descriptions: &[&str]) -> Self {
        self.descriptions = descriptions.iter().map(|d| d.to_string()).collect();
        self
    }

    /// One slash-enabled flag broadcast to every name.
    pub fn set_slash(mut self, slash: bool) -> Self {
        self.slash_config = vec![slash];
        self
    }

    /// One slash-enabled flag per name; the count must match at build time.
    pub fn set_slash_config(mut self, config: &[bool]) -> Self {
        self.slash_config = config.to_vec();
        self
    }

    pub fn set_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn set_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn set_reply_mode(mut self, reply_mode: ReplyMode) -> Self {
        self.reply_mode = reply_mode;
        self
    }

    /// Leftover text after the last parameter is normally rejected; this
    /// opts the command out of that check.
    pub fn allow_trailing_text(mut self) -> Self {
        self.allow_trailing_text = true;
        self
    }

    pub fn add_string_option(mut self, options: ArgumentOptions) -> Self {
        let pattern = options.pattern.clone();
        self.args.push(
            ArgumentOptions {
                pattern: None,
                ..options
            },
            ArgumentKind::String { pattern },
        );
        self
    }

    pub fn add_number_option(mut self, options: ArgumentOptions) -> Self {
        self.args.push(options, ArgumentKind::Number);
        self
    }

    pub fn add_boolean_option(mut self, options: ArgumentOptions) -> Self {
        self.args.push(options, ArgumentKind::Boolean);
        self
    }

    pub fn add_user_option(mut self, options: ArgumentOptions) -> Self {
        self.args.push(options, ArgumentKind::User);
        self
    }

    pub fn add_users_option(mut self, options: ArgumentOptions) -> Self {
        self.args.push(options, ArgumentKind::Users);
        self
    }

    pub fn add_role_option(mut self, options: ArgumentOptions) -> Self {
        self.args.push(options, ArgumentKind::Role);
        self
    }

    pub fn add_user_id_option(mut self, options: ArgumentOptions) -> Self {
        self.args.push(options, ArgumentKind::UserId);
        self
    }

    /// Expands per-name configuration, applying the single-entry broadcast
    /// rule, and validates the counts.
    fn expanded_config(&self) -> anyhow::Result<Vec<(String, String, bool)>> {
        let descriptions = match self.descriptions.len() {
            0 => anyhow::bail!("command {:?} is missing a description", self.names[0]),
            1 => vec![self.descriptions[0].clone(); self.names.len()],
            n if n == self.names.len() => self.descriptions.clone(),
            n => anyhow::bail!(
                "command {:?} has {} names but {} descriptions",
                self.names[0],
                self.names.len(),
                n
            ),
        };

        let slash_config = match self.slash_config.len() {
            1 => vec![self.slash_config[0]; self.names.len()],
            n if n == self.names.len() => self.slash_config.clone(),
            n => anyhow::bail!(
                "command {:?} has {} names but {} slash flags",
                self.names[0],
                self.names.len(),
                n
            ),
        };

        Ok(self
            .names
            .iter()
            .cloned()
            .zip(descriptions)
            .zip(slash_config)
            .map(|((name, description), slash)| (name, description, slash))
            .collect())
    }

    fn build_descriptors(self) -> anyhow::Result<Vec<TextCommandDescriptor>> {
        let config = self.expanded_config()?;
        let primary = self.names[0].clone();

        // Containers route, they do not parse.
        let subcommand_map = if self.subcommands.is_empty() {
            None
        } else {
            anyhow::ensure!(
                self.args.decls.is_empty(),
                "container command {:?} cannot declare its own parameters",
                primary
            );

            let mut map: HashMap<String, Arc<TextCommandDescriptor>> = HashMap::new();
            for subcommand in self.subcommands {
                let subcommand = TextCommandBuilder {
                    // Permission gating is declared once, on the container.
                    permissions: self.permissions,
                    ..subcommand
                };
                for descriptor in subcommand.build_descriptors()? {
                    anyhow::ensure!(
                        !map.contains_key(&descriptor.name),
                        "duplicate subcommand name {:?} under {:?}",
                        descriptor.name,
                        primary
                    );
                    map.insert(descriptor.name.clone(), Arc::new(descriptor));
                }
            }
            Some(map)
        };

        let descriptors = config
            .into_iter()
            .map(|(name, description, slash)| TextCommandDescriptor {
                alias_of: (name != primary).then(|| primary.clone()),
                name,
                description,
                slash,
                category: self.category.clone(),
                permissions: self.permissions,
                reply_mode: self.reply_mode,
                allow_trailing_text: self.allow_trailing_text,
                options: self.args.decls.clone(),
                subcommands: subcommand_map.clone(),
                handler: self.handler.clone(),
            })
            .collect();

        Ok(descriptors)
    }
}

/// Anything `CommandSetBuilder::add_command` accepts: a leaf builder with
/// a bound handler, or a container builder with subcommands.
pub trait IntoCommandDescriptors {
    fn into_descriptors(self) -> anyhow::Result<Vec<TextCommandDescriptor>>;
}

impl IntoCommandDescriptors for TextCommandBuilder<WithHandler> {
    fn into_descriptors(self) -> anyhow::Result<Vec<TextCommandDescriptor>> {
        self.build_descriptors()
    }
}

impl IntoCommandDescriptors for TextCommandBuilder<WithSubcommands> {
    fn into_descriptors(self) -> anyhow::Result<Vec<TextCommandDescriptor>> {
        self.build_descriptors()
    }
}

/// Fluent configuration of a button handler. Parameters are restricted to
/// the kinds the identifier codec can round-trip.
pub struct ButtonCommandBuilder<State = MissingHandler> {
    base_id: String,
    permissions: Option<Permissions>,
    args: ArgumentListBuilder,
    handler: Option<CommandHandler>,
    _state: PhantomData<State>,
}

impl ButtonCommandBuilder<MissingHandler> {
    pub fn new(base_id: impl Into<String>) -> Self {
        Self {
            base_id: base_id.into(),
            permissions: None,
            args: ArgumentListBuilder::default(),
            handler: None,
            _state: PhantomData,
        }
    }

    pub fn set_handler<F, Fut>(self, handler: F) -> ButtonCommandBuilder<WithHandler>
    where
        F: Fn(CommandContext, Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        ButtonCommandBuilder {
            base_id: self.base_id,
            permissions: self.permissions,
            args: self.args,
            handler: Some(box_handler(handler)),
            _state: PhantomData,
        }
    }
}

impl<State> ButtonCommandBuilder<State> {
    pub fn set_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn add_string_option(mut self, options: ArgumentOptions) -> Self {
        self.args.push(options, ArgumentKind::plain_string());
        self
    }

    pub fn add_number_option(mut self, options: ArgumentOptions) -> Self {
        self.args.push(options, ArgumentKind::Number);
        self
    }

    pub fn add_boolean_option(mut self, options: ArgumentOptions) -> Self {
        self.args.push(options, ArgumentKind::Boolean);
        self
    }

    pub fn add_user_id_option(mut self, options: ArgumentOptions) -> Self {
        self.args.push(options, ArgumentKind::UserId);
        self
    }
}

impl ButtonCommandBuilder<WithHandler> {
    pub fn build(self) -> anyhow::Result<ComponentDescriptor> {
        validate_base_id(&self.base_id)?;
        Ok(ComponentDescriptor {
            base_id: self.base_id,
            permissions: self.permissions,
            options: self.args.decls,
            kind: ComponentKind::Button,
            handler: self.handler.expect("typestate guarantees a handler"),
        })
    }
}

/// Fluent configuration of a modal handler: codec-carried parameters plus
/// the text input fields shown to the user.
pub struct ModalCommandBuilder<State = MissingHandler> {
    base_id: String,
    title: String,
    permissions: Option<Permissions>,
    args: ArgumentListBuilder,
    fields: Vec<ModalFieldConfig>,
    handler: Option<CommandHandler>,
    _state: PhantomData<State>,
}

impl ModalCommandBuilder<MissingHandler> {
    pub fn new(base_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            base_id: base_id.into(),
            title: title.into(),
            permissions: None,
            args: ArgumentListBuilder::default(),
            fields: vec![],
            handler: None,
            _state: PhantomData,
        }
    }

    pub fn set_handler<F, Fut>(self, handler: F) -> ModalCommandBuilder<WithHandler>
    where
        F: Fn(CommandContext, Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        ModalCommandBuilder {
            base_id: self.base_id,
            title: self.title,
            permissions: self.permissions,
            args: self.args,
            fields: self.fields,
            handler: Some(box_handler(handler)),
            _state: PhantomData,
        }
    }
}

impl<State> ModalCommandBuilder<State> {
    pub fn set_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn add_field(mut self, field: ModalFieldConfig) -> Self {
        assert!(
            !self.fields.iter().any(|f| f.custom_id == field.custom_id),
            "duplicate modal field {:?}",
            field.custom_id
        );
        self.fields.push(field);
        self
    }

    pub fn add_string_option(mut self, options: ArgumentOptions) -> Self {
        self.args.push(options, ArgumentKind::plain_string());
        self
    }

    pub fn add_number_option(mut self, options: ArgumentOptions) -> Self {
        self.args.push(options, ArgumentKind::Number);
        self
    }

    pub fn add_boolean_option(mut self, options: ArgumentOptions) -> Self {
        self.args.push(options, ArgumentKind::Boolean);
        self
    }

    pub fn add_user_id_option(mut self, options: ArgumentOptions) -> Self {
        self.args.push(options, ArgumentKind::UserId);
        self
    }
}

impl ModalCommandBuilder<WithHandler> {
    pub fn build(self) -> anyhow::Result<ComponentDescriptor> {
        validate_base_id(&self.base_id)?;
        anyhow::ensure!(
            !self.fields.is_empty() && self.fields.len() <= 5,
            "modal {:?} needs between one and five fields",
            self.base_id
        );
        Ok(ComponentDescriptor {
            base_id: self.base_id,
            permissions: self.permissions,
            options: self.args.decls,
            kind: ComponentKind::Modal {
                title: self.title,
                fields: self.fields,
            },
            handler: self.handler.expect("typestate guarantees a handler"),
        })
    }
}

fn validate_base_id(base_id: &str) -> anyhow::Result<()> {
    anyhow::ensure!(!base_id.is_empty(), "component base id cannot be empty");
    anyhow::ensure!(
        !base_id.contains(':'),
        "component base id {:?} cannot contain ':'",
        base_id
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> impl Fn(CommandContext, Arguments) -> std::future::Ready<anyhow::Result<()>>
           + Send
           + Sync
           + 'static {
        |_ctx, _args| std::future::ready(Ok(()))
    }

    #[test]
    fn broadcasts_single_description_and_slash_flag() {
        let descriptors = TextCommandBuilder::new_aliased(&["echo", "say"])
            .set_description("Repeats a message")
            .set_handler(handler())
            .into_descriptors()
            .unwrap();

        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].name, "echo");
        assert_eq!(descriptors[0].alias_of, None);
        assert_eq!(descriptors[1].name, "say");
        assert_eq!(descriptors[1].alias_of.as_deref(), Some("echo"));
        assert!(descriptors.iter().all(|d| d.description == "Repeats a message"));
        assert!(descriptors.iter().all(|d| d.slash));
    }

    #[test]
    fn per_name_config_must_match_name_count() {
        let result = TextCommandBuilder::new_aliased(&["echo", "say"])
            .set_descriptions(&["one", "two", "three"])
            .set_handler(handler())
            .into_descriptors();
        assert!(result.is_err());

        let result = TextCommandBuilder::new_aliased(&["echo", "say"])
            .set_description("fine")
            .set_slash_config(&[true, false, true])
            .set_handler(handler())
            .into_descriptors();
        assert!(result.is_err());
    }

    #[test]
    fn missing_description_is_a_configuration_error() {
        let result = TextCommandBuilder::new("echo")
            .set_handler(handler())
            .into_descriptors();
        assert!(result.is_err());
    }

    #[test]
    fn container_collects_subcommands_and_rejects_duplicates() {
        let descriptors = TextCommandBuilder::new("tag")
            .set_description("Manage tags")
            .add_subcommand(
                TextCommandBuilder::new("add")
                    .set_description("Add a tag")
                    .set_handler(handler()),
            )
            .add_subcommand(
                TextCommandBuilder::new("remove")
                    .set_description("Remove a tag")
                    .set_handler(handler()),
            )
            .into_descriptors()
            .unwrap();

        let container = &descriptors[0];
        assert!(container.is_container());
        assert!(container.subcommand("add").is_some());
        assert!(container.subcommand("remove").is_some());
        assert!(container.handler.is_none());

        let result = TextCommandBuilder::new("tag")
            .set_description("Manage tags")
            .add_subcommand(
                TextCommandBuilder::new("add")
                    .set_description("Add a tag")
                    .set_handler(handler()),
            )
            .add_subcommand(
                TextCommandBuilder::new("add")
                    .set_description("Add it twice")
                    .set_handler(handler()),
            )
            .into_descriptors();
        assert!(result.is_err());
    }

    #[test]
    fn container_permissions_flow_into_subcommands() {
        let descriptors = TextCommandBuilder::new("tag")
            .set_description("Manage tags")
            .set_permissions(Permissions::MANAGE_MESSAGES)
            .add_subcommand(
                TextCommandBuilder::new("add")
                    .set_description("Add a tag")
                    .set_handler(handler()),
            )
            .into_descriptors()
            .unwrap();

        let sub = descriptors[0].subcommand("add").unwrap();
        assert_eq!(sub.permissions, Some(Permissions::MANAGE_MESSAGES));
    }

    #[test]
    #[should_panic(expected = "duplicate parameter title")]
    fn duplicate_parameter_titles_fail_fast() {
        let _ = TextCommandBuilder::new("note")
            .set_description("Take a note")
            .add_string_option(ArgumentOptions::new("text", "the text"))
            .add_string_option(ArgumentOptions::new("text", "the text again"));
    }

    #[test]
    fn button_builder_produces_a_component_descriptor() {
        let descriptor = ButtonCommandBuilder::new("case")
            .add_number_option(ArgumentOptions::new("id", "case id"))
            .set_handler(handler())
            .build()
            .unwrap();

        assert_eq!(descriptor.base_id, "case");
        assert_eq!(descriptor.options.len(), 1);
    }

    #[test]
    fn component_base_ids_cannot_contain_colons() {
        let result = ButtonCommandBuilder::new("case:open")
            .set_handler(handler())
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn modals_need_at_least_one_field() {
        let result = ModalCommandBuilder::new("report", "Report a message")
            .set_handler(handler())
            .build();
        assert!(result.is_err());
    }
}
