use super::{Attributes, attribute};
use crate::context::RenderContext;
use crate::error::Result;
use crate::finalize::FinalizationResult;

/// The form element opening and closing a [`FormScope`](crate::FormScope)
///
/// # Examples
///
/// ```
/// use reinhardt_form_tags::{FormTag, RenderContext};
///
/// let mut ctx = RenderContext::in_memory();
/// let form = FormTag::new("f1").with_action("/R0001");
///
/// let attributes = form.open(&mut ctx).unwrap();
/// assert_eq!(attributes["method"], "post");
///
/// let result = form.close(&mut ctx).unwrap();
/// assert_eq!(result.form_name, "f1");
/// ```
#[derive(Debug, Clone)]
pub struct FormTag {
	name: String,
	action: Option<String>,
	method: String,
	use_token: Option<bool>,
}

impl FormTag {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			action: None,
			method: "post".to_string(),
			use_token: None,
		}
	}

	pub fn with_action(mut self, action: impl Into<String>) -> Self {
		self.action = Some(action.into());
		self
	}

	pub fn with_method(mut self, method: impl Into<String>) -> Self {
		self.method = method.into().to_lowercase();
		self
	}

	/// Force or forbid the double-submission token for this form
	pub fn with_use_token(mut self, use_token: bool) -> Self {
		self.use_token = Some(use_token);
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Open the scope and return the `<form>` attributes
	pub fn open(&self, ctx: &mut RenderContext) -> Result<Attributes> {
		let scope = ctx.open_form(&self.name)?;
		scope.set_use_token(self.use_token);

		let mut attributes = Attributes::new();
		attribute(&mut attributes, "name", &self.name);
		attribute(&mut attributes, "method", &self.method);
		if let Some(action) = &self.action {
			attribute(&mut attributes, "action", action);
		}
		Ok(attributes)
	}

	/// Finalize the scope opened by [`FormTag::open`]
	pub fn close(&self, ctx: &mut RenderContext) -> Result<FinalizationResult> {
		ctx.close_form()
	}
}
