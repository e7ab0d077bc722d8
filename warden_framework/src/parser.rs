use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use warden_discord::twilight_model::{
    application::interaction::application_command::{
        CommandDataOption, CommandInteractionDataResolved, CommandOptionValue,
    },
    guild::Role,
    id::{marker::UserMarker, Id},
    user::User,
};

use crate::{
    argument::{ArgumentKind, ArgumentValue, Arguments},
    descriptor::TextCommandDescriptor,
};

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\S+").unwrap());
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+").unwrap());
static USER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:<@!?(\d{10,})>|(\d{10,}))").unwrap());

/// The async seam for user lookups, so argument extraction can be tested
/// without touching HTTP.
#[async_trait]
pub trait UserResolver: Send + Sync {
    async fn resolve_user(&self, id: Id<UserMarker>) -> anyhow::Result<User>;
}

/// A recoverable argument failure: surfaced to the user as a formatted
/// reply, optionally carrying the command's usage string. Never logged as
/// a fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub message: String,
    pub show_usage: bool,
}

impl ParseFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            show_usage: true,
        }
    }

    pub fn without_usage(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            show_usage: false,
        }
    }
}

fn advance<'a>(body: &'a str, consumed: usize) -> &'a str {
    body[consumed..].trim_start()
}

/// Extracts a typed argument list from the free-form remainder of a text
/// command. Parameters are processed strictly in declaration order; an
/// optional parameter that does not match consumes nothing and leaves a
/// null placeholder. There is no backtracking: a token consumed by an
/// earlier parameter is never reconsidered for a later one.
pub async fn parse_text_arguments(
    descriptor: &TextCommandDescriptor,
    resolver: &dyn UserResolver,
    guild_roles: &[Role],
    body: &str,
) -> Result<Arguments, ParseFailure> {
    let mut body = body.trim();
    let mut values = Vec::with_capacity(descriptor.options.len());
    let last = descriptor.options.len().saturating_sub(1);

    for (i, option) in descriptor.options.iter().enumerate() {
        match &option.kind {
            ArgumentKind::String { pattern: Some(pattern) } => {
                match pattern.find(body).filter(|m| m.start() == 0) {
                    Some(m) => {
                        values.push(ArgumentValue::String(m.as_str().to_string()));
                        body = advance(body, m.end());
                    }
                    None if !option.required => values.push(ArgumentValue::None),
                    None => {
                        return Err(ParseFailure::new(format!(
                            "Required argument \"{}\" not found",
                            option.title
                        )))
                    }
                }
            }
            ArgumentKind::String { pattern: None } if i == last => {
                // Rest-of-line capture: the standard idiom for a trailing
                // free-form argument.
                if !body.is_empty() {
                    values.push(ArgumentValue::String(body.to_string()));
                    body = "";
                } else if !option.required {
                    values.push(ArgumentValue::None);
                } else {
                    return Err(ParseFailure::new(format!(
                        "Required argument \"{}\" not found",
                        option.title
                    )));
                }
            }
            ArgumentKind::String { pattern: None } => match TOKEN_RE.find(body) {
                Some(m) => {
                    values.push(ArgumentValue::String(m.as_str().to_string()));
                    body = advance(body, m.end());
                }
                None if !option.required => values.push(ArgumentValue::None),
                None => {
                    return Err(ParseFailure::new(format!(
                        "Required argument \"{}\" not found",
                        option.title
                    )))
                }
            },
            ArgumentKind::Number => match NUMBER_RE.find(body) {
                Some(m) => match m.as_str().parse::<i64>() {
                    Ok(number) => {
                        values.push(ArgumentValue::Number(number));
                        body = advance(body, m.end());
                    }
                    Err(_) => {
                        return Err(ParseFailure::new(format!(
                            "Invalid numeric argument \"{}\"",
                            option.title
                        )))
                    }
                },
                None if !option.required => values.push(ArgumentValue::None),
                None => {
                    return Err(ParseFailure::new(format!(
                        "Required numeric argument \"{}\" not found",
                        option.title
                    )))
                }
            },
            ArgumentKind::Boolean => {
                let token = TOKEN_RE.find(body).map(|m| m.as_str());
                match token {
                    Some(token @ ("true" | "false")) => {
                        values.push(ArgumentValue::Boolean(token == "true"));
                        body = advance(body, token.len());
                    }
                    _ if !option.required => values.push(ArgumentValue::None),
                    _ => {
                        return Err(ParseFailure::new(format!(
                            "Required boolean argument \"{}\" not found",
                            option.title
                        )))
                    }
                }
            }
            ArgumentKind::User => match match_user_id(body) {
                Some((id, consumed)) => {
                    let user = resolver
                        .resolve_user(id)
                        .await
                        .map_err(|_| ParseFailure::without_usage("Unable to find user"))?;
                    values.push(ArgumentValue::User(Box::new(user)));
                    body = advance(body, consumed);
                }
                None if !option.required => values.push(ArgumentValue::None),
                None => {
                    return Err(ParseFailure::new(format!(
                        "Required user argument \"{}\" not found",
                        option.title
                    )))
                }
            },
            ArgumentKind::Users => {
                let mut users = Vec::new();
                while let Some((id, consumed)) = match_user_id(body) {
                    let user = resolver
                        .resolve_user(id)
                        .await
                        .map_err(|_| ParseFailure::without_usage("Unable to find user"))?;
                    users.push(user);
                    body = advance(body, consumed);
                }

                if !users.is_empty() {
                    values.push(ArgumentValue::Users(users));
                } else if !option.required {
                    values.push(ArgumentValue::None);
                } else {
                    return Err(ParseFailure::new(format!(
                        "Required user argument \"{}\" not found",
                        option.title
                    )));
                }
            }
            ArgumentKind::UserId => match match_user_id(body) {
                Some((id, consumed)) => {
                    values.push(ArgumentValue::UserId(id));
                    body = advance(body, consumed);
                }
                None if !option.required => values.push(ArgumentValue::None),
                None => {
                    return Err(ParseFailure::new(format!(
                        "Required user argument \"{}\" not found",
                        option.title
                    )))
                }
            },
            ArgumentKind::Role => match match_role(body, guild_roles) {
                Some(role) => {
                    let consumed = role.name.len();
                    values.push(ArgumentValue::Role(Box::new(role)));
                    body = advance(body, consumed);
                }
                None if !option.required => values.push(ArgumentValue::None),
                None => {
                    return Err(ParseFailure::new(format!(
                        "Required role argument \"{}\" not found",
                        option.title
                    )))
                }
            },
        }
    }

    if !body.is_empty() && !descriptor.allow_trailing_text {
        return Err(ParseFailure::new("Unexpected parameters provided"));
    }

    Ok(Arguments::new(values))
}

fn match_user_id(body: &str) -> Option<(Id<UserMarker>, usize)> {
    let captures = USER_RE.captures(body)?;
    let raw = captures.get(1).or_else(|| captures.get(2))?.as_str();
    let id = Id::new_checked(raw.parse().ok()?)?;
    Some((id, captures.get(0)?.len()))
}

/// Case-sensitive exact role-name match at the current position. When
/// several cached names prefix the text, the longest one wins; the
/// implicit everyone role never matches.
fn match_role(body: &str, guild_roles: &[Role]) -> Option<Role> {
    guild_roles
        .iter()
        .filter(|role| role.name != "@everyone")
        .filter(|role| body.starts_with(&role.name))
        .max_by_key(|role| role.name.len())
        .cloned()
}

/// Extracts a typed argument list from a structured interaction's options.
/// The platform already typed the values; this validates them against the
/// declarations and resolves user/role references.
pub async fn extract_slash_arguments(
    descriptor: &TextCommandDescriptor,
    resolver: &dyn UserResolver,
    guild_roles: &[Role],
    options: &[CommandDataOption],
    resolved: Option<&CommandInteractionDataResolved>,
) -> Result<Arguments, ParseFailure> {
    let mut values = Vec::with_capacity(descriptor.options.len());

    for option in &descriptor.options {
        let supplied = options.iter().find(|o| o.name == option.title);
        let Some(supplied) = supplied else {
            if option.required {
                return Err(ParseFailure::new(format!(
                    "Required argument \"{}\" not found",
                    option.title
                )));
            }
            values.push(ArgumentValue::None);
            continue;
        };

        let value = match (&option.kind, &supplied.value) {
            (ArgumentKind::String { pattern }, CommandOptionValue::String(text)) => {
                if let Some(pattern) = pattern {
                    if !pattern.is_match(text.trim()) {
                        return Err(ParseFailure::new(format!(
                            "Argument \"{}\" doesn't match the expected format",
                            option.title
                        )));
                    }
                }
                ArgumentValue::String(text.clone())
            }
            (ArgumentKind::Number, CommandOptionValue::Integer(number)) => {
                ArgumentValue::Number(*number)
            }
            (ArgumentKind::Boolean, CommandOptionValue::Boolean(boolean)) => {
                ArgumentValue::Boolean(*boolean)
            }
            (ArgumentKind::User, CommandOptionValue::User(id)) => {
                let user = match resolved.and_then(|r| r.users.get(id).cloned()) {
                    Some(user) => user,
                    None => resolver
                        .resolve_user(*id)
                        .await
                        .map_err(|_| ParseFailure::without_usage("Unable to find user"))?,
                };
                ArgumentValue::User(Box::new(user))
            }
            (ArgumentKind::UserId, CommandOptionValue::User(id)) => ArgumentValue::UserId(*id),
            (ArgumentKind::Users, CommandOptionValue::String(text)) => {
                let mut users = Vec::new();
                let mut rest = text.trim();
                while let Some((id, consumed)) = match_user_id(rest) {
                    let user = resolver
                        .resolve_user(id)
                        .await
                        .map_err(|_| ParseFailure::without_usage("Unable to find user"))?;
                    users.push(user);
                    rest = advance(rest, consumed);
                }
                if users.is_empty() {
                    if option.required {
                        return Err(ParseFailure::new(format!(
                            "Required user argument \"{}\" not found",
                            option.title
                        )));
                    }
                    ArgumentValue::None
                } else {
                    ArgumentValue::Users(users)
                }
            }
            (ArgumentKind::Role, CommandOptionValue::Role(id)) => {
                let role = resolved
                    .and_then(|r| r.roles.get(id).cloned())
                    .or_else(|| guild_roles.iter().find(|role| role.id == *id).cloned())
                    .ok_or_else(|| ParseFailure::without_usage("Unable to find role"))?;
                ArgumentValue::Role(Box::new(role))
            }
            _ => {
                return Err(ParseFailure::new(format!(
                    "Argument \"{}\" has an unexpected type",
                    option.title
                )))
            }
        };

        values.push(value);
    }

    Ok(Arguments::new(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        argument::ArgumentOptions,
        descriptor::{box_handler, ReplyMode},
    };
    use serde_json::json;
    use std::collections::HashMap;

    struct FakeResolver {
        users: HashMap<u64, User>,
    }

    #[async_trait]
    impl UserResolver for FakeResolver {
        async fn resolve_user(&self, id: Id<UserMarker>) -> anyhow::Result<User> {
            self.users
                .get(&id.get())
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("unknown user"))
        }
    }

    fn fake_user(id: u64, name: &str) -> User {
        serde_json::from_value(json!({
            "id": id.to_string(),
            "username": name,
            "discriminator": "0001",
            "avatar": null,
        }))
        .unwrap()
    }

    fn fake_role(id: u64, name: &str) -> Role {
        serde_json::from_value(json!({
            "id": id.to_string(),
            "name": name,
            "color": 0,
            "hoist": false,
            "managed": false,
            "mentionable": false,
            "permissions": "0",
            "position": 1,
            "flags": 0,
        }))
        .unwrap()
    }

    fn resolver() -> FakeResolver {
        let mut users = HashMap::new();
        users.insert(1034123502868275691, fake_user(1034123502868275691, "milo"));
        FakeResolver { users }
    }

    fn descriptor(options: Vec<crate::argument::ArgumentDecl>) -> TextCommandDescriptor {
        TextCommandDescriptor {
            name: "test".into(),
            description: "test command".into(),
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

    #[tokio::test]
    async fn parses_in_declaration_order_with_rest_of_line() {
        let descriptor = descriptor(vec![
            ArgumentOptions::new("word", "a word").into_decl(ArgumentKind::plain_string()),
            ArgumentOptions::new("count", "a count")
                .optional()
                .into_decl(ArgumentKind::Number),
            ArgumentOptions::new("rest", "the rest").into_decl(ArgumentKind::plain_string()),
        ]);

        let args = parse_text_arguments(&descriptor, &resolver(), &[], "foo 42 the rest of it")
            .await
            .unwrap();

        assert_eq!(args.string(0).unwrap(), "foo");
        assert_eq!(args.number(1).unwrap(), 42);
        assert_eq!(args.string(2).unwrap(), "the rest of it");
    }

    #[tokio::test]
    async fn optional_miss_leaves_a_null_placeholder() {
        let descriptor = descriptor(vec![
            ArgumentOptions::new("word", "a word").into_decl(ArgumentKind::plain_string()),
            ArgumentOptions::new("count", "a count")
                .optional()
                .into_decl(ArgumentKind::Number),
            ArgumentOptions::new("rest", "the rest")
                .optional()
                .into_decl(ArgumentKind::plain_string()),
        ]);

        let args = parse_text_arguments(&descriptor, &resolver(), &[], "foo")
            .await
            .unwrap();

        assert_eq!(args.len(), 3);
        assert_eq!(args.string(0).unwrap(), "foo");
        assert!(args.get(1).unwrap().is_none());
        assert!(args.get(2).unwrap().is_none());
    }

    #[tokio::test]
    async fn required_trailing_string_rejects_empty_input() {
        let descriptor = descriptor(vec![
            ArgumentOptions::new("word", "a word").into_decl(ArgumentKind::plain_string()),
            ArgumentOptions::new("count", "a count")
                .optional()
                .into_decl(ArgumentKind::Number),
            ArgumentOptions::new("rest", "the rest").into_decl(ArgumentKind::plain_string()),
        ]);

        let failure = parse_text_arguments(&descriptor, &resolver(), &[], "foo")
            .await
            .unwrap_err();
        assert!(failure.message.contains("rest"));
        assert!(failure.show_usage);
    }

    #[tokio::test]
    async fn rejects_trailing_junk_unless_allowed() {
        let descriptor = descriptor(vec![
            ArgumentOptions::new("word", "a word").into_decl(ArgumentKind::plain_string()),
            ArgumentOptions::new("count", "a count").into_decl(ArgumentKind::Number),
        ]);

        let failure = parse_text_arguments(&descriptor, &resolver(), &[], "foo 1 2")
            .await
            .unwrap_err();
        assert_eq!(failure.message, "Unexpected parameters provided");

        let mut lenient = descriptor.clone();
        lenient.allow_trailing_text = true;
        assert!(parse_text_arguments(&lenient, &resolver(), &[], "foo 1 2")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn string_patterns_must_match_at_the_start() {
        let descriptor = descriptor(vec![ArgumentOptions::new("range", "a line range")
            .into_decl(ArgumentKind::String {
                pattern: Some(Regex::new(r"\d+-\d+").unwrap()),
            })]);

        let args = parse_text_arguments(&descriptor, &resolver(), &[], "10-20")
            .await
            .unwrap();
        assert_eq!(args.string(0).unwrap(), "10-20");

        // A match later in the text does not count.
        assert!(parse_text_arguments(&descriptor, &resolver(), &[], "lines 10-20")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn resolves_mentions_and_raw_ids() {
        let descriptor = descriptor(vec![
            ArgumentOptions::new("user", "who").into_decl(ArgumentKind::User),
            ArgumentOptions::new("reason", "why")
                .optional()
                .into_decl(ArgumentKind::plain_string()),
        ]);

        let args = parse_text_arguments(
            &descriptor,
            &resolver(),
            &[],
            "<@1034123502868275691> spamming",
        )
        .await
        .unwrap();
        assert_eq!(args.user(0).unwrap().name, "milo");
        assert_eq!(args.string(1).unwrap(), "spamming");

        let args = parse_text_arguments(&descriptor, &resolver(), &[], "1034123502868275691")
            .await
            .unwrap();
        assert_eq!(args.user(0).unwrap().name, "milo");
    }

    #[tokio::test]
    async fn failed_user_lookup_is_reported_without_usage() {
        let descriptor =
            descriptor(vec![ArgumentOptions::new("user", "who").into_decl(ArgumentKind::User)]);

        let failure = parse_text_arguments(&descriptor, &resolver(), &[], "9999999999")
            .await
            .unwrap_err();
        assert_eq!(failure.message, "Unable to find user");
        assert!(!failure.show_usage);
    }

    #[tokio::test]
    async fn matches_the_longest_role_name_prefix() {
        let roles = vec![
            fake_role(10, "Moderator"),
            fake_role(11, "Moderator Emeritus"),
            fake_role(12, "@everyone"),
        ];
        let descriptor = descriptor(vec![
            ArgumentOptions::new("role", "which role").into_decl(ArgumentKind::Role),
        ]);

        let args = parse_text_arguments(&descriptor, &resolver(), &roles, "Moderator Emeritus")
            .await
            .unwrap();
        assert_eq!(args.role(0).unwrap().name, "Moderator Emeritus");

        // The everyone role never matches, and names are case-sensitive.
        assert!(parse_text_arguments(&descriptor, &resolver(), &roles, "@everyone")
            .await
            .is_err());
        assert!(parse_text_arguments(&descriptor, &resolver(), &roles, "moderator")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn collects_multiple_users_greedily() {
        let mut users = HashMap::new();
        users.insert(1034123502868275691, fake_user(1034123502868275691, "milo"));
        users.insert(2034123502868275692, fake_user(2034123502868275692, "iris"));
        let resolver = FakeResolver { users };

        let descriptor = descriptor(vec![
            ArgumentOptions::new("users", "who").into_decl(ArgumentKind::Users),
            ArgumentOptions::new("reason", "why")
                .optional()
                .into_decl(ArgumentKind::plain_string()),
        ]);

        let args = parse_text_arguments(
            &descriptor,
            &resolver,
            &[],
            "<@1034123502868275691> 2034123502868275692 raid",
        )
        .await
        .unwrap();

        let users = args.users(0).unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(args.string(1).unwrap(), "raid");
    }

    #[tokio::test]
    async fn slash_options_validate_patterns_and_arity() {
        let descriptor = descriptor(vec![
            ArgumentOptions::new("range", "a line range").into_decl(ArgumentKind::String {
                pattern: Some(Regex::new(r"^\d+-\d+$").unwrap()),
            }),
            ArgumentOptions::new("count", "how many")
                .optional()
                .into_decl(ArgumentKind::Number),
        ]);

        let options = vec![CommandDataOption {
            name: "range".into(),
            value: CommandOptionValue::String("10-20".into()),
        }];
        let args = extract_slash_arguments(&descriptor, &resolver(), &[], &options, None)
            .await
            .unwrap();
        assert_eq!(args.string(0).unwrap(), "10-20");
        assert!(args.get(1).unwrap().is_none());

        let options = vec![CommandDataOption {
            name: "range".into(),
            value: CommandOptionValue::String("nope".into()),
        }];
        assert!(
            extract_slash_arguments(&descriptor, &resolver(), &[], &options, None)
                .await
                .is_err()
        );

        assert!(extract_slash_arguments(&descriptor, &resolver(), &[], &[], None)
            .await
            .is_err());
    }
}
