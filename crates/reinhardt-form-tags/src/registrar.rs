//! Capabilities tags use to talk to the open form
//!
//! Tags never reach into a [`RenderContext`](crate::RenderContext) directly.
//! A trigger depends on [`SubmissionRegistrar`], a plain input on
//! [`FieldNameRegistrar`], which keeps each tag testable against a stub.

use crate::descriptor::SubmissionDescriptor;
use crate::error::Result;

/// How a registered trigger must be hooked up to the submit function
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerWiring {
	/// Emit this `onclick` attribute value on the trigger element
	Inline { onclick: String },
	/// A binding statement was queued into the form's script block
	Deferred,
	/// The trigger submits natively
	None,
}

/// Records ordinary input names into the open form
pub trait FieldNameRegistrar {
	/// Register `name`, optionally with its current value
	///
	/// Fails with [`FormTagError::InvalidLocation`](crate::FormTagError::InvalidLocation)
	/// when no form is open.
	fn register_field(&mut self, tag: &'static str, name: &str, value: Option<&str>) -> Result<()>;

	/// Register the `<name_prefix>.<key>` fields a composite key input feeds
	fn register_composite_fields(
		&mut self,
		tag: &'static str,
		name_prefix: &str,
		key_names: &[String],
	) -> Result<()>;
}

/// Records submission triggers into the open form
pub trait SubmissionRegistrar {
	/// Fail with [`FormTagError::InvalidLocation`](crate::FormTagError::InvalidLocation)
	/// naming `tag` when no form is open
	fn ensure_in_form(&self, tag: &'static str) -> Result<()>;

	/// Name of the open form, if any
	fn form_name(&self) -> Option<&str>;

	/// Append `descriptor` to the open form and decide its wiring
	fn register_submission(
		&mut self,
		tag: &'static str,
		descriptor: SubmissionDescriptor,
	) -> Result<TriggerWiring>;

	/// Window options substituted when a popup trigger supplies none
	fn popup_default_options(&self) -> Option<&str>;

	/// Whether the current render is the confirmation step
	fn is_confirmation_page(&self) -> bool;
}
