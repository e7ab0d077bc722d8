use twilight_model::{
    application::interaction::{modal::ModalInteractionData, Interaction},
    channel::message::{
        component::{ActionRow, ComponentType, TextInput, TextInputStyle},
        Component,
    },
    http::interaction::InteractionResponseData,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextInputBuilder {
    data: TextInput,
}

impl TextInputBuilder {
    pub fn new(custom_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            data: TextInput {
                custom_id: custom_id.into(),
                label: label.into(),
                max_length: None,
                min_length: None,
                placeholder: None,
                required: Some(true),
                style: TextInputStyle::Short,
                value: None,
            },
        }
    }

    pub fn set_paragraph(mut self) -> Self {
        self.data.style = TextInputStyle::Paragraph;
        self
    }

    pub fn set_required(mut self, required: bool) -> Self {
        self.data.required = Some(required);
        self
    }

    pub fn set_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.data.placeholder = Some(placeholder.into());
        self
    }

    pub fn set_length_range(mut self, min: u16, max: u16) -> Self {
        self.data.min_length = Some(min);
        self.data.max_length = Some(max);
        self
    }

    pub fn custom_id(&self) -> &str {
        &self.data.custom_id
    }

    pub fn build(self) -> TextInput {
        self.data
    }
}

/// Builds the interaction response payload that opens a modal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModalBuilder {
    title: String,
    custom_id: String,
    components: Vec<Component>,
}

impl ModalBuilder {
    pub fn new(title: impl Into<String>, custom_id: impl Into<String>) -> ModalBuilder {
        Self {
            title: title.into(),
            custom_id: custom_id.into(),
            components: Vec::new(),
        }
    }

    pub fn custom_id(&self) -> &str {
        &self.custom_id
    }

    pub fn add_text_input(mut self, text_input: TextInputBuilder) -> Self {
        self.components.push(Component::ActionRow(ActionRow {
            components: vec![Component::TextInput(text_input.build())],
        }));
        self
    }

    pub fn build(self) -> InteractionResponseData {
        InteractionResponseData {
            title: Some(self.title),
            custom_id: Some(self.custom_id),
            components: Some(self.components),
            ..InteractionResponseData::default()
        }
    }
}

/// A submitted modal, paired with the interaction that carried it.
#[derive(Debug, Clone, PartialEq)]
pub struct ModalResponse {
    interaction: Interaction,
    data: ModalInteractionData,
}

impl ModalResponse {
    pub fn new(interaction: Interaction, data: ModalInteractionData) -> Self {
        Self { interaction, data }
    }

    pub fn data(&self) -> &ModalInteractionData {
        &self.data
    }

    pub fn interaction(&self) -> Box<Interaction> {
        self.interaction.clone().into()
    }

    pub fn get_text_input(&self, custom_id: &str) -> Option<String> {
        self.data
            .components
            .iter()
            .flat_map(|row| &row.components)
            .find(|component| {
                component.custom_id == custom_id && component.kind == ComponentType::TextInput
            })
            .and_then(|component| component.value.clone())
    }
}
