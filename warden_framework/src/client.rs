use std::{
    collections::HashMap,
    fmt::Debug,
    sync::{atomic::AtomicBool, Arc},
};

use async_trait::async_trait;
use tokio::sync::RwLock;
use warden_common::{config, Cache};
use warden_discord::{
    twilight_model::{
        guild::{Guild, Permissions, Role},
        id::{
            marker::{GuildMarker, RoleMarker, UserMarker},
            Id,
        },
        user::{CurrentUser, User},
    },
    DiscordHttpClient,
};

use crate::parser::UserResolver;

/// What the parser and the permission gate need to know about a guild,
/// kept warm from gateway events.
#[derive(Debug, Clone)]
pub struct GuildInfo {
    pub owner_id: Id<UserMarker>,
    pub roles: HashMap<Id<RoleMarker>, Role>,
}

/// Shared HTTP handle plus the caches dispatch relies on. Registered once
/// at startup and read concurrently by every event task.
pub struct WardenClient {
    pub http: Arc<DiscordHttpClient>,
    pub is_ready: AtomicBool,

    users: Cache<Id<UserMarker>, User>,
    guilds: RwLock<HashMap<Id<GuildMarker>, GuildInfo>>,
}

impl Debug for WardenClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WardenClient").finish_non_exhaustive()
    }
}

impl WardenClient {
    pub fn new(token: String) -> Self {
        Self {
            http: Arc::new(DiscordHttpClient::new(token)),
            is_ready: AtomicBool::new(false),
            users: Cache::new(config::USER_CACHE_SIZE),
            guilds: RwLock::new(HashMap::new()),
        }
    }

    pub async fn current_user(&self) -> anyhow::Result<CurrentUser> {
        Ok(self.http.current_user().await?.model().await?)
    }

    pub async fn get_user(&self, id: Id<UserMarker>) -> anyhow::Result<User> {
        if let Some(user) = self.users.get_cloned(&id) {
            return Ok(user);
        }

        let user = self.http.user(id).await?.model().await?;
        self.users.insert(id, user.clone());

        Ok(user)
    }

    pub async fn get_guild(&self, id: Id<GuildMarker>) -> anyhow::Result<Guild> {
        Ok(self.http.guild(id).await?.model().await?)
    }

    /// Replaces the cached state for a guild, usually from a guild-create
    /// payload.
    pub async fn cache_guild(&self, guild: &Guild) {
        let info = GuildInfo {
            owner_id: guild.owner_id,
            roles: guild
                .roles
                .iter()
                .map(|role| (role.id, role.clone()))
                .collect(),
        };

        self.guilds.write().await.insert(guild.id, info);
    }

    pub async fn cache_role(&self, guild_id: Id<GuildMarker>, role: Role) {
        if let Some(info) = self.guilds.write().await.get_mut(&guild_id) {
            info.roles.insert(role.id, role);
        }
    }

    pub async fn evict_role(&self, guild_id: Id<GuildMarker>, role_id: Id<RoleMarker>) {
        if let Some(info) = self.guilds.write().await.get_mut(&guild_id) {
            info.roles.remove(&role_id);
        }
    }

    /// The live role cache for a guild, in no particular order. Empty when
    /// the guild has not been seen yet.
    pub async fn guild_roles(&self, guild_id: Id<GuildMarker>) -> Vec<Role> {
        self.guilds
            .read()
            .await
            .get(&guild_id)
            .map(|info| info.roles.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Guild-level permissions for a member, folded from the role cache.
    /// Structured interactions already carry resolved permissions; this is
    /// the fallback for text-command invocations.
    pub async fn member_permissions(
        &self,
        guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
    ) -> anyhow::Result<Permissions> {
        let member = self
            .http
            .guild_member(guild_id, user_id)
            .await?
            .model()
            .await?;

        let guilds = self.guilds.read().await;
        let info = guilds
            .get(&guild_id)
            .ok_or_else(|| anyhow::anyhow!("guild {} is not cached", guild_id))?;

        Ok(fold_permissions(info, guild_id, user_id, &member.roles))
    }
}

pub(crate) fn fold_permissions(
    info: &GuildInfo,
    guild_id: Id<GuildMarker>,
    user_id: Id<UserMarker>,
    member_roles: &[Id<RoleMarker>],
) -> Permissions {
    if info.owner_id == user_id {
        return Permissions::all();
    }

    // The implicit everyone role shares the guild's id.
    let mut permissions = info
        .roles
        .get(&guild_id.cast())
        .map(|role| role.permissions)
        .unwrap_or_else(Permissions::empty);

    for role_id in member_roles {
        if let Some(role) = info.roles.get(role_id) {
            permissions |= role.permissions;
        }
    }

    if permissions.contains(Permissions::ADMINISTRATOR) {
        Permissions::all()
    } else {
        permissions
    }
}

#[async_trait]
impl UserResolver for WardenClient {
    async fn resolve_user(&self, id: Id<UserMarker>) -> anyhow::Result<User> {
        self.get_user(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn role(id: u64, permissions: Permissions) -> Role {
        serde_json::from_value(json!({
            "id": id.to_string(),
            "name": format!("role-{id}"),
            "color": 0,
            "hoist": false,
            "managed": false,
            "mentionable": false,
            "permissions": permissions.bits().to_string(),
            "position": 1,
            "flags": 0,
        }))
        .unwrap()
    }

    fn info(owner: u64, roles: Vec<Role>) -> GuildInfo {
        GuildInfo {
            owner_id: Id::new(owner),
            roles: roles.into_iter().map(|r| (r.id, r.clone())).collect(),
        }
    }

    #[test]
    fn folds_everyone_and_member_roles() {
        let guild_id = Id::new(100);
        let info = info(
            1,
            vec![
                role(100, Permissions::SEND_MESSAGES),
                role(200, Permissions::MANAGE_MESSAGES),
            ],
        );

        let held = fold_permissions(&info, guild_id, Id::new(2), &[Id::new(200)]);
        assert!(held.contains(Permissions::SEND_MESSAGES | Permissions::MANAGE_MESSAGES));
        assert!(!held.contains(Permissions::BAN_MEMBERS));
    }

    #[test]
    fn owner_and_administrator_hold_everything() {
        let guild_id = Id::new(100);
        let info = info(1, vec![role(200, Permissions::ADMINISTRATOR)]);

        assert_eq!(
            fold_permissions(&info, guild_id, Id::new(1), &[]),
            Permissions::all()
        );
        assert_eq!(
            fold_permissions(&info, guild_id, Id::new(2), &[Id::new(200)]),
            Permissions::all()
        );
    }
}
