use super::{Attributes, attribute};
use crate::error::{FormTagError, Result};
use crate::registrar::FieldNameRegistrar;
use crate::scope::validate_composite_key;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeKeyKind {
	Checkbox,
	Radio,
}

impl CompositeKeyKind {
	fn tag_name(&self) -> &'static str {
		match self {
			CompositeKeyKind::Checkbox => "composite_key_checkbox",
			CompositeKeyKind::Radio => "composite_key_radio",
		}
	}

	fn input_type(&self) -> &'static str {
		match self {
			CompositeKeyKind::Checkbox => "checkbox",
			CompositeKeyKind::Radio => "radio",
		}
	}
}

/// Checkbox or radio selecting one row identified by several keys
///
/// The element's value is a JSON object of the row's key values. Keys are
/// addressed on the wire as `<name_prefix>.<key>`, none of which may equal
/// the element's own name.
///
/// # Examples
///
/// ```
/// use reinhardt_form_tags::{CompositeKeyTag, RenderContext};
///
/// let mut ctx = RenderContext::in_memory();
/// ctx.open_form("f1").unwrap();
///
/// let attributes = CompositeKeyTag::checkbox("rows", "row")
///     .key("k1", "10")
///     .key("k2", "A")
///     .render(&mut ctx)
///     .unwrap();
/// assert_eq!(attributes["type"], "checkbox");
/// assert_eq!(attributes["value"], r#"{"k1":"10","k2":"A"}"#);
/// ```
#[derive(Debug, Clone)]
pub struct CompositeKeyTag {
	kind: CompositeKeyKind,
	name: String,
	name_prefix: String,
	keys: Vec<(String, String)>,
	checked: bool,
}

impl CompositeKeyTag {
	pub fn new(kind: CompositeKeyKind, name: impl Into<String>, name_prefix: impl Into<String>) -> Self {
		Self {
			kind,
			name: name.into(),
			name_prefix: name_prefix.into(),
			keys: Vec::new(),
			checked: false,
		}
	}

	pub fn checkbox(name: impl Into<String>, name_prefix: impl Into<String>) -> Self {
		Self::new(CompositeKeyKind::Checkbox, name, name_prefix)
	}

	pub fn radio(name: impl Into<String>, name_prefix: impl Into<String>) -> Self {
		Self::new(CompositeKeyKind::Radio, name, name_prefix)
	}

	pub fn key(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.keys.push((key.into(), value.into()));
		self
	}

	pub fn with_checked(mut self, checked: bool) -> Self {
		self.checked = checked;
		self
	}

	pub fn key_names(&self) -> Vec<String> {
		self.keys.iter().map(|(key, _)| key.clone()).collect()
	}

	pub fn render<R: FieldNameRegistrar>(&self, registrar: &mut R) -> Result<Attributes> {
		let tag = self.kind.tag_name();
		if self.keys.is_empty() {
			return Err(FormTagError::MissingAttribute {
				tag,
				attribute: "keys",
			});
		}
		let key_names = self.key_names();
		validate_composite_key(&self.name, &self.name_prefix, &key_names)?;
		registrar.register_field(tag, &self.name, None)?;
		registrar.register_composite_fields(tag, &self.name_prefix, &key_names)?;

		let value: Map<String, Value> = self
			.keys
			.iter()
			.map(|(key, value)| (key.clone(), Value::String(value.clone())))
			.collect();

		let mut attributes = Attributes::new();
		attribute(&mut attributes, "type", self.kind.input_type());
		attribute(&mut attributes, "name", &self.name);
		attribute(&mut attributes, "value", Value::Object(value).to_string());
		if self.checked {
			attribute(&mut attributes, "checked", "checked");
		}
		Ok(attributes)
	}
}
