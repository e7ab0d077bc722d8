mod component;
mod embed;
mod extensions;
mod modal;

pub use component::*;
pub use embed::*;
pub use extensions::*;
pub use modal::*;

pub use twilight_gateway;
pub use twilight_http;
pub use twilight_model;
pub use twilight_standby;

pub use twilight_http::Client as DiscordHttpClient;
pub use twilight_model::application::command::Command as ApiCommand;
pub use twilight_model::application::interaction::*;
pub use twilight_model::guild::Permissions;
