//! Submission descriptors
//!
//! A [`SubmissionDescriptor`] describes one way of submitting a form: where it
//! goes, how (normal, popup window, download), and which fields it resubmits
//! under different wire names. Descriptors are assembled by trigger tags and
//! become read-only once registered into a [`FormScope`](crate::FormScope).

use serde::Serialize;
use std::collections::HashMap;

/// How a submission is carried out by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
	Normal,
	Popup,
	Download,
}

/// Markup element performing the submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
	/// `<input type="submit">` or `<input type="image">`
	Input,
	/// `<button>`
	Button,
	/// `<a>`
	Anchor,
}

impl ElementKind {
	/// Element name used in markup and selectors
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_form_tags::ElementKind;
	///
	/// assert_eq!(ElementKind::Anchor.as_str(), "a");
	/// assert_eq!(ElementKind::Button.as_str(), "button");
	/// ```
	pub fn as_str(&self) -> &'static str {
		match self {
			ElementKind::Input => "input",
			ElementKind::Button => "button",
			ElementKind::Anchor => "a",
		}
	}
}

/// Popup window target of a [`ActionKind::Popup`] submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupTarget {
	pub window_name: String,
	pub options: Option<String>,
}

/// Resubmit `original` under the wire name `renamed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamRemap {
	#[serde(rename = "from")]
	pub original: String,
	#[serde(rename = "to")]
	pub renamed: String,
}

/// Extra parameter sent only with one trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraParam {
	pub name: String,
	pub value: String,
}

/// Composite key fields `<name_prefix>.<key>` carried by a trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeKey {
	name_prefix: String,
	key_names: Vec<String>,
	values: HashMap<String, String>,
}

impl CompositeKey {
	pub fn new<I, S>(name_prefix: impl Into<String>, key_names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			name_prefix: name_prefix.into(),
			key_names: key_names.into_iter().map(Into::into).collect(),
			values: HashMap::new(),
		}
	}

	/// Set the value submitted for one key
	pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.values.insert(key.into(), value.into());
		self
	}

	pub fn name_prefix(&self) -> &str {
		&self.name_prefix
	}

	pub fn key_names(&self) -> &[String] {
		&self.key_names
	}

	pub fn value(&self, key: &str) -> &str {
		self.values.get(key).map(String::as_str).unwrap_or("")
	}

	/// Wire names in declaration order
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_form_tags::CompositeKey;
	///
	/// let key = CompositeKey::new("user", ["id", "version"]);
	/// assert_eq!(key.field_names(), vec!["user.id", "user.version"]);
	/// ```
	pub fn field_names(&self) -> Vec<String> {
		self.key_names
			.iter()
			.map(|key| composite_field_name(&self.name_prefix, key))
			.collect()
	}
}

pub(crate) fn composite_field_name(prefix: &str, key: &str) -> String {
	format!("{}.{}", prefix, key)
}

/// One declared submission trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionDescriptor {
	trigger_name: String,
	target_uri: String,
	action_kind: ActionKind,
	element_kind: ElementKind,
	popup: Option<PopupTarget>,
	allow_double_submission: bool,
	param_name_remaps: Vec<ParamRemap>,
	extra_params: Vec<ExtraParam>,
	composite_key: Option<CompositeKey>,
}

impl SubmissionDescriptor {
	fn new(trigger_name: String, target_uri: String, action_kind: ActionKind) -> Self {
		Self {
			trigger_name,
			target_uri,
			action_kind,
			element_kind: ElementKind::Input,
			popup: None,
			allow_double_submission: true,
			param_name_remaps: Vec::new(),
			extra_params: Vec::new(),
			composite_key: None,
		}
	}

	/// Plain submission of the form to `target_uri`
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_form_tags::{ActionKind, SubmissionDescriptor};
	///
	/// let descriptor = SubmissionDescriptor::normal("go", "/R0001");
	/// assert_eq!(descriptor.trigger_name(), "go");
	/// assert_eq!(descriptor.action_kind(), ActionKind::Normal);
	/// assert!(descriptor.allow_double_submission());
	/// ```
	pub fn normal(trigger_name: impl Into<String>, target_uri: impl Into<String>) -> Self {
		Self::new(trigger_name.into(), target_uri.into(), ActionKind::Normal)
	}

	/// Submission into a named popup window
	pub fn popup(
		trigger_name: impl Into<String>,
		target_uri: impl Into<String>,
		window_name: impl Into<String>,
		options: Option<String>,
	) -> Self {
		let mut descriptor = Self::new(trigger_name.into(), target_uri.into(), ActionKind::Popup);
		descriptor.popup = Some(PopupTarget {
			window_name: window_name.into(),
			options,
		});
		descriptor
	}

	/// Submission answered with a file download
	///
	/// Downloads always allow double submission, whatever is requested later.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_form_tags::SubmissionDescriptor;
	///
	/// let descriptor = SubmissionDescriptor::download("csv", "/export")
	///     .with_allow_double_submission(false);
	/// assert!(descriptor.allow_double_submission());
	/// ```
	pub fn download(trigger_name: impl Into<String>, target_uri: impl Into<String>) -> Self {
		Self::new(trigger_name.into(), target_uri.into(), ActionKind::Download)
	}

	pub fn with_element(mut self, element_kind: ElementKind) -> Self {
		self.element_kind = element_kind;
		self
	}

	pub fn with_allow_double_submission(mut self, allow: bool) -> Self {
		self.allow_double_submission = allow || self.action_kind == ActionKind::Download;
		self
	}

	pub fn with_param_remap(mut self, original: impl Into<String>, renamed: impl Into<String>) -> Self {
		self.param_name_remaps.push(ParamRemap {
			original: original.into(),
			renamed: renamed.into(),
		});
		self
	}

	pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.extra_params.push(ExtraParam {
			name: name.into(),
			value: value.into(),
		});
		self
	}

	pub fn with_composite_key(mut self, composite_key: CompositeKey) -> Self {
		self.composite_key = Some(composite_key);
		self
	}

	pub fn trigger_name(&self) -> &str {
		&self.trigger_name
	}

	pub fn target_uri(&self) -> &str {
		&self.target_uri
	}

	pub fn action_kind(&self) -> ActionKind {
		self.action_kind
	}

	pub fn element_kind(&self) -> ElementKind {
		self.element_kind
	}

	pub fn popup_target(&self) -> Option<&PopupTarget> {
		self.popup.as_ref()
	}

	pub fn popup_window_name(&self) -> Option<&str> {
		self.popup.as_ref().map(|p| p.window_name.as_str())
	}

	pub fn popup_options(&self) -> Option<&str> {
		self.popup.as_ref().and_then(|p| p.options.as_deref())
	}

	pub fn allow_double_submission(&self) -> bool {
		self.allow_double_submission || self.action_kind == ActionKind::Download
	}

	pub fn param_name_remaps(&self) -> &[ParamRemap] {
		&self.param_name_remaps
	}

	pub fn extra_params(&self) -> &[ExtraParam] {
		&self.extra_params
	}

	pub fn composite_key(&self) -> Option<&CompositeKey> {
		self.composite_key.as_ref()
	}

	/// Whether an explicit remap covers the trigger's own name, so that a
	/// collision with an ordinary input of that name is intended.
	pub fn remaps_own_name(&self) -> bool {
		self.composite_key.is_some()
			|| self
				.param_name_remaps
				.iter()
				.any(|remap| remap.original == self.trigger_name)
	}

	/// Whether the client must intercept this trigger to submit correctly
	///
	/// Normal `input`/`button` triggers without per-trigger fields submit
	/// natively through `formaction`.
	pub fn needs_client_wiring(&self) -> bool {
		self.action_kind != ActionKind::Normal
			|| self.element_kind == ElementKind::Anchor
			|| self.has_trigger_fields()
	}

	pub(crate) fn has_trigger_fields(&self) -> bool {
		!self.param_name_remaps.is_empty()
			|| !self.extra_params.is_empty()
			|| self.composite_key.is_some()
	}
}
