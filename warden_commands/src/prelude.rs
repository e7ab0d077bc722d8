#![allow(unused)]
pub use warden_common::*;
pub use warden_discord::twilight_model::channel::message::component::ButtonStyle;
pub use warden_discord::twilight_model::{
    id::{marker::*, Id},
    user::*,
};
pub use warden_discord::*;
pub use warden_framework::*;

pub use anyhow::Context;
