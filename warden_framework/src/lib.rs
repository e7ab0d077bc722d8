mod argument;
mod builder;
mod client;
mod command_builder;
mod command_set;
mod context;
mod descriptor;
mod framework;
mod parser;
mod response;

pub mod custom_id;
pub mod watcher;

pub use argument::{
    ArgumentDecl, ArgumentKind, ArgumentOptions, ArgumentValue, Arguments, AutocompleteChoice,
};
pub use builder::{
    ButtonCommandBuilder, IntoCommandDescriptors, MissingHandler, ModalCommandBuilder,
    TextCommandBuilder, WithHandler, WithSubcommands,
};
pub use client::{GuildInfo, WardenClient};
pub use command_builder::{ApiCommandBuilder, ApiCommandOptionBuilder};
pub use command_set::{CommandSet, CommandSetBuilder};
pub use context::{
    CommandContext, InvocationOrigin, ReplyRoute, ReplyState, AWAITED_COMPONENT_BASE,
};
pub use descriptor::{
    CommandHandler, ComponentDescriptor, ComponentKind, ModalFieldConfig, ReplyMode,
    TextCommandDescriptor,
};
pub use framework::Framework;
pub use parser::{ParseFailure, UserResolver};
pub use response::Response;
