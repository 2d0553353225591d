//! Form Compositor: property descriptors to a platform-legal form plan.
//!
//! A creation form has two stages. Free-text kinds go into a single text
//! form; choice kinds become selection controls submitted together. Both are
//! bounded by the platform's UI ceilings, checked before any session starts.

use std::fmt;
use threadcard_core::{PropertyDescriptor, PropertyKind};

/// Maximum text inputs in one form.
pub const MAX_TEXT_FIELDS: usize = 5;
/// Maximum selection controls in one message (one row is kept for the confirm button).
pub const MAX_CHOICE_FIELDS: usize = 4;
/// Maximum options of one selection control.
pub const MAX_CONTROL_OPTIONS: usize = 25;

/// Name fragments marking a property as long-form text.
const MULTILINE_HINTS: [&str; 3] = ["desc", "detail", "detalhe"];

/// Which half of a form a capacity error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldGroup {
    Text,
    Choice,
}

impl fmt::Display for FieldGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldGroup::Text => write!(f, "text fields"),
            FieldGroup::Choice => write!(f, "choice fields"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("form has too many {group} ({count}); the maximum is {limit}")]
    TooLarge {
        group: FieldGroup,
        count: usize,
        limit: usize,
    },
    #[error("no properties are configured for manual card creation")]
    NoProperties,
}

/// One free-text input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextField {
    pub name: String,
    pub kind: PropertyKind,
    pub required: bool,
    pub multiline: bool,
    pub default: Option<String>,
}

/// One selection control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceField {
    pub name: String,
    pub kind: PropertyKind,
    /// At most [`MAX_CONTROL_OPTIONS`] labels.
    pub options: Vec<String>,
    pub multi: bool,
}

/// The two input stages of a creation flow.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormPlan {
    pub text_fields: Vec<TextField>,
    pub choice_fields: Vec<ChoiceField>,
}

impl FormPlan {
    /// Pre-fill the title input, e.g. with the name of the originating thread.
    pub fn with_default_title(mut self, title: Option<&str>) -> Self {
        if let Some(title) = title {
            for field in &mut self.text_fields {
                if field.kind == PropertyKind::Title {
                    field.default = Some(title.to_string());
                }
            }
        }
        self
    }

    pub fn has_choice_stage(&self) -> bool {
        !self.choice_fields.is_empty()
    }
}

/// Cap a list of selectable items to the per-control ceiling.
pub fn cap_options<T: Clone>(items: &[T]) -> Vec<T> {
    items.iter().take(MAX_CONTROL_OPTIONS).cloned().collect()
}

/// Partition `selected` into text and choice stages, enforcing capacity limits.
pub fn compose_form(selected: &[PropertyDescriptor]) -> Result<FormPlan, FormError> {
    if selected.is_empty() {
        return Err(FormError::NoProperties);
    }

    let (choices, texts): (Vec<&PropertyDescriptor>, Vec<&PropertyDescriptor>) =
        selected.iter().partition(|d| d.kind.is_choice());

    if texts.len() > MAX_TEXT_FIELDS {
        return Err(FormError::TooLarge {
            group: FieldGroup::Text,
            count: texts.len(),
            limit: MAX_TEXT_FIELDS,
        });
    }
    if choices.len() > MAX_CHOICE_FIELDS {
        return Err(FormError::TooLarge {
            group: FieldGroup::Choice,
            count: choices.len(),
            limit: MAX_CHOICE_FIELDS,
        });
    }

    let text_fields = texts
        .into_iter()
        .map(|d| {
            let lowered = d.name.to_lowercase();
            TextField {
                name: d.name.clone(),
                kind: d.kind.clone(),
                required: d.kind == PropertyKind::Title,
                multiline: MULTILINE_HINTS.iter().any(|hint| lowered.contains(hint)),
                default: None,
            }
        })
        .collect();

    let choice_fields = choices
        .into_iter()
        .map(|d| ChoiceField {
            name: d.name.clone(),
            kind: d.kind.clone(),
            options: cap_options(d.option_labels()),
            multi: d.kind == PropertyKind::MultiSelect,
        })
        .collect();

    Ok(FormPlan {
        text_fields,
        choice_fields,
    })
}
