//! Tags that render inside a form
//!
//! Each tag returns plain attribute maps for the page's HTML renderer and
//! records what the form needs to know through the registrar capabilities.

pub mod composite_key;
pub mod form;
pub mod input;
pub mod trigger;

pub use composite_key::{CompositeKeyKind, CompositeKeyTag};
pub use form::FormTag;
pub use input::InputTag;
pub use trigger::{TriggerKind, TriggerMarkup, TriggerTag};

use std::collections::BTreeMap;

/// Unescaped `name → value` attribute map
pub type Attributes = BTreeMap<String, String>;

pub(crate) fn attribute(attributes: &mut Attributes, name: &str, value: impl Into<String>) {
	attributes.insert(name.to_string(), value.into());
}
