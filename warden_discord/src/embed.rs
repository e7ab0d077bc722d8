use twilight_model::{
    channel::message::{
        embed::{
            EmbedAuthor as ApiEmbedAuthor, EmbedField as ApiEmbedField,
            EmbedFooter as ApiEmbedFooter,
        },
        Embed as ApiEmbed,
    },
    user::User,
    util::Timestamp,
};

use crate::UserExtension;

use warden_common::Color;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedAuthor {
    pub name: String,
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EmbedBuilder {
    author: Option<EmbedAuthor>,
    color: Option<Color>,
    title: Option<String>,
    description: Option<String>,
    fields: Vec<ApiEmbedField>,
    footer: Option<String>,
    timestamp: Option<Timestamp>,
}

impl EmbedBuilder {
    pub fn new() -> EmbedBuilder {
        Self::default()
    }

    /// The base embed every bot reply starts from.
    pub fn new_common() -> EmbedBuilder {
        Self::new().set_color(Color::BLURPLE).set_current_timestamp()
    }

    pub fn set_author(mut self, author: EmbedAuthor) -> Self {
        self.author = Some(author);
        self
    }

    pub fn set_author_to_user(self, user: &User) -> Self {
        self.set_author(EmbedAuthor {
            name: user.display_name(),
            icon_url: Some(user.avatar_url()),
        })
    }

    pub fn set_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn set_title(mut self, title: impl ToString) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn set_description(mut self, description: impl ToString) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn add_description_text(mut self, description: impl ToString) -> Self {
        match &mut self.description {
            Some(existing) => existing.push_str(&description.to_string()),
            None => self = self.set_description(description),
        }

        self
    }

    pub fn add_field(mut self, name: impl ToString, value: impl ToString, inline: bool) -> Self {
        self.fields.push(ApiEmbedField {
            name: name.to_string(),
            value: value.to_string(),
            inline,
        });
        self
    }

    pub fn set_footer_text(mut self, text: impl ToString) -> Self {
        self.footer = Some(text.to_string());
        self
    }

    pub fn set_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn set_current_timestamp(self) -> Self {
        match Timestamp::parse(chrono::Utc::now().to_rfc3339().as_str()) {
            Ok(timestamp) => self.set_timestamp(timestamp),
            Err(_) => self,
        }
    }

    pub fn build(self) -> ApiEmbed {
        ApiEmbed {
            author: self.author.map(|author| ApiEmbedAuthor {
                name: author.name,
                icon_url: author.icon_url,
                proxy_icon_url: None,
                url: None,
            }),
            color: self.color.map(|c| c.to_u32()),
            title: self.title,
            description: self.description,
            fields: self.fields,
            footer: self.footer.map(|text| ApiEmbedFooter {
                text,
                icon_url: None,
                proxy_icon_url: None,
            }),
            image: None,
            kind: "rich".to_string(),
            provider: None,
            thumbnail: None,
            timestamp: self.timestamp,
            url: None,
            video: None,
        }
    }
}

impl From<EmbedBuilder> for ApiEmbed {
    fn from(value: EmbedBuilder) -> Self {
        value.build()
    }
}
