//! Submission trigger tags
//!
//! A trigger is any element that submits the surrounding form: a submit
//! input, a button or a link, each in a normal, popup or download flavour.
//! Rendering one registers a [`SubmissionDescriptor`] and returns the
//! element's attributes.

use super::{Attributes, attribute};
use crate::descriptor::{ActionKind, CompositeKey, ElementKind, SubmissionDescriptor};
use crate::error::{FormTagError, Result};
use crate::registrar::{SubmissionRegistrar, TriggerWiring};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKind {
	Submit,
	Button,
	SubmitLink,
	PopupSubmit,
	PopupButton,
	PopupLink,
	DownloadSubmit,
	DownloadButton,
	DownloadLink,
}

impl TriggerKind {
	/// Name reported in authoring errors
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_form_tags::TriggerKind;
	///
	/// assert_eq!(TriggerKind::PopupLink.tag_name(), "popup_link");
	/// ```
	pub fn tag_name(&self) -> &'static str {
		match self {
			TriggerKind::Submit => "submit",
			TriggerKind::Button => "button",
			TriggerKind::SubmitLink => "submit_link",
			TriggerKind::PopupSubmit => "popup_submit",
			TriggerKind::PopupButton => "popup_button",
			TriggerKind::PopupLink => "popup_link",
			TriggerKind::DownloadSubmit => "download_submit",
			TriggerKind::DownloadButton => "download_button",
			TriggerKind::DownloadLink => "download_link",
		}
	}

	pub fn action_kind(&self) -> ActionKind {
		match self {
			TriggerKind::Submit | TriggerKind::Button | TriggerKind::SubmitLink => ActionKind::Normal,
			TriggerKind::PopupSubmit | TriggerKind::PopupButton | TriggerKind::PopupLink => {
				ActionKind::Popup
			}
			TriggerKind::DownloadSubmit | TriggerKind::DownloadButton | TriggerKind::DownloadLink => {
				ActionKind::Download
			}
		}
	}

	pub fn element_kind(&self) -> ElementKind {
		match self {
			TriggerKind::Submit | TriggerKind::PopupSubmit | TriggerKind::DownloadSubmit => {
				ElementKind::Input
			}
			TriggerKind::Button | TriggerKind::PopupButton | TriggerKind::DownloadButton => {
				ElementKind::Button
			}
			TriggerKind::SubmitLink | TriggerKind::PopupLink | TriggerKind::DownloadLink => {
				ElementKind::Anchor
			}
		}
	}
}

/// Rendered trigger element handed to the HTML renderer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerMarkup {
	pub element: ElementKind,
	pub attributes: Attributes,
	/// Text content for `button` and `a`, or the `value` of an input
	pub label: Option<String>,
}

/// Declaration of one submission trigger
///
/// # Examples
///
/// ```
/// use reinhardt_form_tags::{RenderContext, TriggerKind, TriggerTag};
///
/// let mut ctx = RenderContext::in_memory();
/// ctx.open_form("f1").unwrap();
///
/// let markup = TriggerTag::new(TriggerKind::PopupSubmit, "dummy")
///     .with_target("/R0002")
///     .with_popup_window("subWin1")
///     .render(&mut ctx)
///     .unwrap();
///
/// assert_eq!(
///     markup.attributes["onclick"],
///     "return window.reinhardt_submit.call(this, event);"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct TriggerTag {
	kind: TriggerKind,
	name: String,
	target_uri: Option<String>,
	label: Option<String>,
	popup_window_name: Option<String>,
	popup_options: Option<String>,
	allow_double_submission: Option<bool>,
	remaps: Vec<(String, String)>,
	params: Vec<(String, String)>,
	composite_key: Option<CompositeKey>,
	extra_attributes: Attributes,
}

impl TriggerTag {
	pub fn new(kind: TriggerKind, name: impl Into<String>) -> Self {
		Self {
			kind,
			name: name.into(),
			target_uri: None,
			label: None,
			popup_window_name: None,
			popup_options: None,
			allow_double_submission: None,
			remaps: Vec::new(),
			params: Vec::new(),
			composite_key: None,
			extra_attributes: Attributes::new(),
		}
	}

	pub fn with_target(mut self, target_uri: impl Into<String>) -> Self {
		self.target_uri = Some(target_uri.into());
		self
	}

	pub fn with_label(mut self, label: impl Into<String>) -> Self {
		self.label = Some(label.into());
		self
	}

	pub fn with_popup_window(mut self, window_name: impl Into<String>) -> Self {
		self.popup_window_name = Some(window_name.into());
		self
	}

	pub fn with_popup_options(mut self, options: impl Into<String>) -> Self {
		self.popup_options = Some(options.into());
		self
	}

	/// Without this, the trigger allows double submission except on a
	/// confirmation page. Download triggers always allow it.
	pub fn with_allow_double_submission(mut self, allow: bool) -> Self {
		self.allow_double_submission = Some(allow);
		self
	}

	/// Extra parameter sent only when this trigger is pressed
	pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.params.push((name.into(), value.into()));
		self
	}

	/// Resubmit the input `original` as `renamed` for this trigger
	pub fn change_param_name(mut self, original: impl Into<String>, renamed: impl Into<String>) -> Self {
		self.remaps.push((original.into(), renamed.into()));
		self
	}

	pub fn composite_key(mut self, composite_key: CompositeKey) -> Self {
		self.composite_key = Some(composite_key);
		self
	}

	/// Pass-through attribute such as `class` or `id`
	///
	/// Attributes the trigger manages itself take precedence.
	pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.extra_attributes.insert(name.into(), value.into());
		self
	}

	pub fn kind(&self) -> TriggerKind {
		self.kind
	}

	fn descriptor<R: SubmissionRegistrar>(&self, registrar: &R) -> Result<SubmissionDescriptor> {
		let tag = self.kind.tag_name();
		let target_uri = self
			.target_uri
			.clone()
			.ok_or(FormTagError::MissingAttribute {
				tag,
				attribute: "target",
			})?;

		let descriptor = match self.kind.action_kind() {
			ActionKind::Normal => SubmissionDescriptor::normal(&self.name, target_uri),
			ActionKind::Download => SubmissionDescriptor::download(&self.name, target_uri),
			ActionKind::Popup => {
				let window_name =
					self.popup_window_name
						.clone()
						.ok_or(FormTagError::MissingAttribute {
							tag,
							attribute: "popup_window_name",
						})?;
				let options = self
					.popup_options
					.clone()
					.or_else(|| registrar.popup_default_options().map(str::to_string));
				SubmissionDescriptor::popup(&self.name, target_uri, window_name, options)
			}
		};

		let allow = self
			.allow_double_submission
			.unwrap_or(!registrar.is_confirmation_page());
		let mut descriptor = descriptor
			.with_element(self.kind.element_kind())
			.with_allow_double_submission(allow);
		for (original, renamed) in &self.remaps {
			descriptor = descriptor.with_param_remap(original, renamed);
		}
		for (name, value) in &self.params {
			descriptor = descriptor.with_param(name, value);
		}
		if let Some(composite_key) = &self.composite_key {
			descriptor = descriptor.with_composite_key(composite_key.clone());
		}
		Ok(descriptor)
	}

	/// Register the trigger into the open form and build its markup
	///
	/// # Errors
	///
	/// [`FormTagError::InvalidLocation`] naming this trigger's tag when no
	/// form is open, [`FormTagError::MissingAttribute`] for a missing target
	/// or popup window, and every registration error of
	/// [`FormScope::register_submission`](crate::FormScope::register_submission).
	pub fn render<R: SubmissionRegistrar>(&self, registrar: &mut R) -> Result<TriggerMarkup> {
		let tag = self.kind.tag_name();
		registrar.ensure_in_form(tag)?;
		let form_name = registrar.form_name().unwrap_or_default().to_string();

		let descriptor = self.descriptor(registrar)?;
		let element = descriptor.element_kind();
		let target_uri = descriptor.target_uri().to_string();
		let wiring = registrar.register_submission(tag, descriptor)?;

		let mut attributes = self.extra_attributes.clone();
		attribute(&mut attributes, "name", &self.name);
		match element {
			ElementKind::Input => {
				attribute(&mut attributes, "type", "submit");
				if let Some(label) = &self.label {
					attribute(&mut attributes, "value", label);
				}
			}
			ElementKind::Button => attribute(&mut attributes, "type", "submit"),
			ElementKind::Anchor => {
				attribute(&mut attributes, "href", "#");
				attribute(&mut attributes, "data-form", form_name);
			}
		}
		match wiring {
			TriggerWiring::Inline { onclick } => attribute(&mut attributes, "onclick", onclick),
			TriggerWiring::Deferred => {
				attributes.remove("onclick");
			}
			TriggerWiring::None => attribute(&mut attributes, "formaction", target_uri),
		}

		Ok(TriggerMarkup {
			element,
			attributes,
			label: self.label.clone(),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::context::RenderContext;
	use rstest::rstest;

	fn open_context() -> RenderContext {
		let mut ctx = RenderContext::in_memory();
		ctx.open_form("f1").unwrap();
		ctx
	}

	#[rstest]
	#[case(TriggerKind::Submit, "submit")]
	#[case(TriggerKind::SubmitLink, "submit_link")]
	#[case(TriggerKind::PopupButton, "popup_button")]
	#[case(TriggerKind::DownloadLink, "download_link")]
	fn test_invalid_location_names_tag(#[case] kind: TriggerKind, #[case] expected: &'static str) {
		let mut ctx = RenderContext::in_memory();

		let err = TriggerTag::new(kind, "go")
			.with_target("/R")
			.with_popup_window("w")
			.render(&mut ctx)
			.unwrap_err();

		assert!(matches!(err, FormTagError::InvalidLocation { tag } if tag == expected));
		assert_eq!(
			err.to_string(),
			format!("The `{}` tag must be placed inside a form tag", expected)
		);
	}

	#[test]
	fn test_normal_submit_uses_formaction() {
		let mut ctx = open_context();

		let markup = TriggerTag::new(TriggerKind::Submit, "go")
			.with_target("/R0001")
			.with_label("Go")
			.render(&mut ctx)
			.unwrap();

		assert_eq!(markup.element, ElementKind::Input);
		assert_eq!(markup.attributes["formaction"], "/R0001");
		assert_eq!(markup.attributes["value"], "Go");
		assert!(!markup.attributes.contains_key("onclick"));
	}

	#[test]
	fn test_submit_link_is_wired() {
		let mut ctx = open_context();

		let markup = TriggerTag::new(TriggerKind::SubmitLink, "next")
			.with_target("/R0003")
			.render(&mut ctx)
			.unwrap();

		assert_eq!(markup.element, ElementKind::Anchor);
		assert_eq!(markup.attributes["data-form"], "f1");
		assert!(markup.attributes.contains_key("onclick"));
		assert!(!markup.attributes.contains_key("formaction"));
	}

	#[test]
	fn test_popup_requires_window_name() {
		let mut ctx = open_context();

		let err = TriggerTag::new(TriggerKind::PopupSubmit, "dummy")
			.with_target("/R0002")
			.render(&mut ctx)
			.unwrap_err();

		assert!(matches!(
			err,
			FormTagError::MissingAttribute {
				tag: "popup_submit",
				attribute: "popup_window_name"
			}
		));
	}

	#[test]
	fn test_target_required() {
		let mut ctx = open_context();

		let err = TriggerTag::new(TriggerKind::Button, "go")
			.render(&mut ctx)
			.unwrap_err();

		assert!(matches!(
			err,
			FormTagError::MissingAttribute { attribute: "target", .. }
		));
	}

	#[test]
	fn test_managed_attributes_override_pass_through() {
		let mut ctx = open_context();

		let markup = TriggerTag::new(TriggerKind::PopupButton, "p")
			.with_target("/R")
			.with_popup_window("w")
			.with_attribute("class", "primary")
			.with_attribute("onclick", "alert(1)")
			.render(&mut ctx)
			.unwrap();

		assert_eq!(markup.attributes["class"], "primary");
		assert_eq!(
			markup.attributes["onclick"],
			"return window.reinhardt_submit.call(this, event);"
		);
	}

	#[test]
	fn test_nonce_mode_drops_pass_through_onclick() {
		let mut ctx = RenderContext::in_memory().with_csp_nonce("n");
		ctx.open_form("f1").unwrap();

		let markup = TriggerTag::new(TriggerKind::DownloadButton, "csv")
			.with_target("/export")
			.with_attribute("onclick", "alert(1)")
			.render(&mut ctx)
			.unwrap();

		assert!(!markup.attributes.contains_key("onclick"));
	}
}
