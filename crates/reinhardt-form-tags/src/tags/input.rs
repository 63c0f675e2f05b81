use super::{Attributes, attribute};
use crate::error::Result;
use crate::registrar::FieldNameRegistrar;

const TAG: &str = "input";

/// Ordinary input whose name the form must know about
#[derive(Debug, Clone)]
pub struct InputTag {
	input_type: String,
	name: String,
	value: Option<String>,
}

impl InputTag {
	pub fn new(input_type: impl Into<String>, name: impl Into<String>) -> Self {
		Self {
			input_type: input_type.into(),
			name: name.into(),
			value: None,
		}
	}

	pub fn text(name: impl Into<String>) -> Self {
		Self::new("text", name)
	}

	pub fn hidden(name: impl Into<String>) -> Self {
		Self::new("hidden", name)
	}

	pub fn with_value(mut self, value: impl Into<String>) -> Self {
		self.value = Some(value.into());
		self
	}

	/// Register the input and return its attributes
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_form_tags::{FormTagError, InputTag, RenderContext};
	///
	/// let mut ctx = RenderContext::in_memory();
	/// let err = InputTag::text("id").render(&mut ctx).unwrap_err();
	/// assert!(matches!(err, FormTagError::InvalidLocation { tag: "input" }));
	///
	/// ctx.open_form("f1").unwrap();
	/// let attributes = InputTag::text("id").with_value("42").render(&mut ctx).unwrap();
	/// assert_eq!(attributes["value"], "42");
	/// assert!(ctx.form().unwrap().is_registered("id"));
	/// ```
	pub fn render<R: FieldNameRegistrar>(&self, registrar: &mut R) -> Result<Attributes> {
		registrar.register_field(TAG, &self.name, self.value.as_deref())?;

		let mut attributes = Attributes::new();
		attribute(&mut attributes, "type", &self.input_type);
		attribute(&mut attributes, "name", &self.name);
		if let Some(value) = &self.value {
			attribute(&mut attributes, "value", value);
		}
		Ok(attributes)
	}
}
