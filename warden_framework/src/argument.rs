use std::{fmt, sync::Arc};

use regex::Regex;
use warden_discord::twilight_model::{
    guild::Role,
    id::{marker::UserMarker, Id},
    user::User,
};

/// An autocomplete callback: `(partial input, command name) -> choices`.
pub type AutocompleteFn = Arc<dyn Fn(&str, &str) -> Vec<AutocompleteChoice> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutocompleteChoice {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub enum ArgumentKind {
    /// A free-form string. With a pattern, the pattern must match at the
    /// start of the remaining text; without one, the token is whitespace
    /// delimited, except in last position where it captures the rest of
    /// the line.
    String { pattern: Option<Regex> },
    Number,
    Boolean,
    User,
    Users,
    Role,
    /// A user reference that is never resolved through a lookup.
    UserId,
}

impl ArgumentKind {
    pub fn plain_string() -> Self {
        Self::String { pattern: None }
    }

    /// Whether a value of this kind can round-trip through a custom id.
    pub fn is_codec_encodable(&self) -> bool {
        matches!(
            self,
            Self::String { .. } | Self::Number | Self::Boolean | Self::UserId
        )
    }

    pub fn accepts(&self, value: &ArgumentValue) -> bool {
        matches!(
            (self, value),
            (Self::String { .. }, ArgumentValue::String(_))
                | (Self::Number, ArgumentValue::Number(_))
                | (Self::Boolean, ArgumentValue::Boolean(_))
                | (Self::User, ArgumentValue::User(_))
                | (Self::Users, ArgumentValue::Users(_))
                | (Self::Role, ArgumentValue::Role(_))
                | (Self::UserId, ArgumentValue::UserId(_))
        )
    }
}

/// One declared parameter of a command, button or modal. Order of
/// declaration is both the text parse order and the codec token order.
#[derive(Clone)]
pub struct ArgumentDecl {
    pub title: String,
    pub description: String,
    pub kind: ArgumentKind,
    pub required: bool,
    pub autocomplete: Option<AutocompleteFn>,
}

impl fmt::Debug for ArgumentDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentDecl")
            .field("title", &self.title)
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("autocomplete", &self.autocomplete.is_some())
            .finish()
    }
}

/// Configuration for one parameter, consumed by the builders.
#[derive(Clone, Default)]
pub struct ArgumentOptions {
    pub title: String,
    pub description: String,
    pub optional: bool,
    pub pattern: Option<Regex>,
    pub autocomplete: Option<AutocompleteFn>,
}

impl ArgumentOptions {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn with_autocomplete<F>(mut self, autocomplete: F) -> Self
    where
        F: Fn(&str, &str) -> Vec<AutocompleteChoice> + Send + Sync + 'static,
    {
        self.autocomplete = Some(Arc::new(autocomplete));
        self
    }

    pub(crate) fn into_decl(self, kind: ArgumentKind) -> ArgumentDecl {
        ArgumentDecl {
            title: self.title,
            description: self.description,
            kind,
            required: !self.optional,
            autocomplete: self.autocomplete,
        }
    }
}

/// A parsed or decoded argument. `None` is the placeholder an unmatched
/// optional parameter leaves behind, preserving positional arity.
#[derive(Debug, Clone)]
pub enum ArgumentValue {
    String(String),
    Number(i64),
    Boolean(bool),
    User(Box<User>),
    Users(Vec<User>),
    Role(Box<Role>),
    UserId(Id<UserMarker>),
    None,
}

impl ArgumentValue {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// The positional argument list a handler receives. Accessors check the
/// kind at runtime; asking for the wrong kind or a missing required slot
/// is a handler fault, not a user error.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    values: Vec<ArgumentValue>,
}

macro_rules! typed_accessor {
    ($name:ident, $opt_name:ident, $variant:ident, $type:ty, $what:literal) => {
        pub fn $opt_name(&self, index: usize) -> Option<$type> {
            match self.values.get(index) {
                Some(ArgumentValue::$variant(value)) => Some(value.clone()),
                _ => None,
            }
        }

        pub fn $name(&self, index: usize) -> anyhow::Result<$type> {
            self.$opt_name(index).ok_or_else(|| {
                anyhow::anyhow!("expected argument {} to be {}", index, $what)
            })
        }
    };
}

impl Arguments {
    pub fn new(values: Vec<ArgumentValue>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ArgumentValue> {
        self.values.get(index)
    }

    pub fn values(&self) -> &[ArgumentValue] {
        &self.values
    }

    typed_accessor!(string, string_opt, String, String, "a string");
    typed_accessor!(number, number_opt, Number, i64, "a number");
    typed_accessor!(boolean, boolean_opt, Boolean, bool, "a boolean");
    typed_accessor!(role, role_opt, Role, Box<Role>, "a role");
    typed_accessor!(user_id, user_id_opt, UserId, Id<UserMarker>, "a user id");

    pub fn user_opt(&self, index: usize) -> Option<User> {
        match self.values.get(index) {
            Some(ArgumentValue::User(user)) => Some(*user.clone()),
            _ => None,
        }
    }

    pub fn user(&self, index: usize) -> anyhow::Result<User> {
        self.user_opt(index)
            .ok_or_else(|| anyhow::anyhow!("expected argument {} to be a user", index))
    }

    pub fn users(&self, index: usize) -> anyhow::Result<Vec<User>> {
        match self.values.get(index) {
            Some(ArgumentValue::Users(users)) => Ok(users.clone()),
            _ => anyhow::bail!("expected argument {} to be a user list", index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_accessors_check_the_kind() {
        let args = Arguments::new(vec![
            ArgumentValue::String("ban".into()),
            ArgumentValue::Number(7),
            ArgumentValue::None,
        ]);

        assert_eq!(args.string(0).unwrap(), "ban");
        assert_eq!(args.number(1).unwrap(), 7);
        assert!(args.string(1).is_err());
        assert_eq!(args.number_opt(2), None);
        assert!(args.number(3).is_err());
    }

    #[test]
    fn kind_accepts_matching_values() {
        assert!(ArgumentKind::Number.accepts(&ArgumentValue::Number(1)));
        assert!(!ArgumentKind::Number.accepts(&ArgumentValue::Boolean(true)));
        assert!(ArgumentKind::plain_string().accepts(&ArgumentValue::String("x".into())));
        assert!(!ArgumentKind::Role.accepts(&ArgumentValue::None));
    }

    #[test]
    fn codec_encodable_kinds() {
        assert!(ArgumentKind::UserId.is_codec_encodable());
        assert!(ArgumentKind::Boolean.is_codec_encodable());
        assert!(!ArgumentKind::Role.is_codec_encodable());
        assert!(!ArgumentKind::Users.is_codec_encodable());
    }
}
