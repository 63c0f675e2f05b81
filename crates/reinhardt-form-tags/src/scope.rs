//! Per-form coordination state
//!
//! A [`FormScope`] lives from the opening form tag to the closing one. It only
//! ever grows: submissions and field names are appended in markup order and
//! nothing is removed until the scope is finalized or discarded.

use crate::descriptor::{SubmissionDescriptor, composite_field_name};
use crate::error::{FormTagError, Result};
use std::collections::{HashMap, HashSet};

/// Coordination state of one rendered form element
#[derive(Debug)]
pub struct FormScope {
	form_name: String,
	use_token: Option<bool>,
	submissions: Vec<SubmissionDescriptor>,
	registered_field_names: HashSet<String>,
	composite_field_names: HashSet<String>,
	field_values: HashMap<String, String>,
	inline_scripts: Vec<String>,
}

impl FormScope {
	pub(crate) fn new(form_name: String) -> Self {
		Self {
			form_name,
			use_token: None,
			submissions: Vec::new(),
			registered_field_names: HashSet::new(),
			composite_field_names: HashSet::new(),
			field_values: HashMap::new(),
			inline_scripts: Vec::new(),
		}
	}

	pub fn form_name(&self) -> &str {
		&self.form_name
	}

	/// Force (`Some(true)`), forbid (`Some(false)`) or leave to the default
	/// policy (`None`) the embedding of a double-submission token.
	pub fn set_use_token(&mut self, use_token: Option<bool>) {
		self.use_token = use_token;
	}

	pub fn use_token(&self) -> Option<bool> {
		self.use_token
	}

	/// Registered submissions in markup order
	pub fn submissions(&self) -> &[SubmissionDescriptor] {
		&self.submissions
	}

	pub fn registered_field_names(&self) -> &HashSet<String> {
		&self.registered_field_names
	}

	pub fn is_registered(&self, name: &str) -> bool {
		self.registered_field_names.contains(name)
	}

	/// Current value of a registered input, if one was supplied
	pub fn field_value(&self, name: &str) -> Option<&str> {
		self.field_values.get(name).map(String::as_str)
	}

	/// Statements to run once the markup is parsed
	pub fn inline_scripts(&self) -> &[String] {
		&self.inline_scripts
	}

	/// Record an ordinary input's name for later collision checks
	///
	/// Inputs may share a name with each other, but not with a composite key
	/// field or with a trigger whose remaps do not cover its own name.
	pub fn register_input(&mut self, tag: &'static str, name: &str) -> Result<()> {
		if name.is_empty() {
			return Err(FormTagError::MissingName { tag });
		}
		if self.composite_field_names.contains(name) {
			return Err(self.conflict(name, name));
		}
		if let Some(trigger) = self
			.submissions
			.iter()
			.find(|d| d.trigger_name() == name && !d.remaps_own_name())
		{
			return Err(self.conflict(trigger.trigger_name(), name));
		}
		self.registered_field_names.insert(name.to_string());
		Ok(())
	}

	/// Record the `<name_prefix>.<key>` fields of a composite key input
	///
	/// Rows of one table register the same fields repeatedly; only an
	/// ordinary input or a trigger already holding one of the names conflicts.
	pub fn register_composite_fields(
		&mut self,
		tag: &'static str,
		name_prefix: &str,
		key_names: &[String],
	) -> Result<()> {
		if name_prefix.is_empty() {
			return Err(FormTagError::MissingAttribute {
				tag,
				attribute: "name_prefix",
			});
		}
		let names: Vec<String> = key_names
			.iter()
			.map(|key| composite_field_name(name_prefix, key))
			.collect();
		if let Some(taken) = names.iter().find(|name| {
			self.registered_field_names.contains(name.as_str())
				&& !self.composite_field_names.contains(name.as_str())
		}) {
			return Err(self.conflict(taken, taken));
		}
		for name in names {
			self.registered_field_names.insert(name.clone());
			self.composite_field_names.insert(name);
		}
		Ok(())
	}

	/// Record an ordinary input together with its current value
	///
	/// The value is what remap fields copy when a trigger resubmits the input
	/// under another name.
	pub fn register_input_value(&mut self, tag: &'static str, name: &str, value: &str) -> Result<()> {
		self.register_input(tag, name)?;
		self.field_values.insert(name.to_string(), value.to_string());
		Ok(())
	}

	/// Append a submission after validating its names
	///
	/// # Errors
	///
	/// - [`FormTagError::MissingName`] for an empty trigger name
	/// - [`FormTagError::UnsafeName`] when the name cannot be embedded in a
	///   quoted attribute selector
	/// - [`FormTagError::NameRemapConflict`] when a composite sub-key equals
	///   the trigger name
	/// - [`FormTagError::ConflictingName`] when the name is already taken by a
	///   trigger, or by an input without a covering remap, or when a remap
	///   target shadows a registered input
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_form_tags::{FormTagError, RenderContext, SubmissionDescriptor};
	///
	/// let mut ctx = RenderContext::in_memory();
	/// let scope = ctx.open_form("f1").unwrap();
	///
	/// scope.register_submission("submit", SubmissionDescriptor::normal("go", "/R0001")).unwrap();
	/// let err = scope
	///     .register_submission("submit", SubmissionDescriptor::normal("go", "/R0002"))
	///     .unwrap_err();
	/// assert!(matches!(err, FormTagError::ConflictingName { .. }));
	/// ```
	pub fn register_submission(
		&mut self,
		tag: &'static str,
		descriptor: SubmissionDescriptor,
	) -> Result<()> {
		let name = descriptor.trigger_name();
		if name.is_empty() {
			return Err(FormTagError::MissingName { tag });
		}
		validate_selector_name(tag, name)?;

		if let Some(composite) = descriptor.composite_key() {
			validate_composite_key(name, composite.name_prefix(), composite.key_names())?;
		}

		if let Some(existing) = self.submissions.iter().find(|d| d.trigger_name() == name) {
			return Err(self.conflict(existing.trigger_name(), name));
		}

		if self.registered_field_names.contains(name) && !descriptor.remaps_own_name() {
			return Err(self.conflict(name, name));
		}

		if let Some(remap) = descriptor
			.param_name_remaps()
			.iter()
			.find(|remap| self.registered_field_names.contains(&remap.renamed))
		{
			return Err(self.conflict(&remap.renamed, name));
		}

		tracing::trace!(
			form_name = %self.form_name,
			trigger_name = name,
			kind = ?descriptor.action_kind(),
			"registered submission"
		);
		self.registered_field_names.insert(name.to_string());
		self.submissions.push(descriptor);
		Ok(())
	}

	pub(crate) fn into_submissions(self) -> Vec<SubmissionDescriptor> {
		self.submissions
	}

	pub(crate) fn push_inline_script(&mut self, statement: String) {
		self.inline_scripts.push(statement);
	}

	pub(crate) fn conflict(&self, existing: &str, incoming: &str) -> FormTagError {
		FormTagError::ConflictingName {
			form_name: self.form_name.clone(),
			existing: existing.to_string(),
			incoming: incoming.to_string(),
		}
	}
}

/// Check that `name` can sit inside `[name='...']` in a script block
///
/// # Examples
///
/// ```
/// use reinhardt_form_tags::scope::validate_selector_name;
///
/// assert!(validate_selector_name("submit", "user.id[0]").is_ok());
/// assert!(validate_selector_name("submit", "a'b").is_err());
/// assert!(validate_selector_name("submit", "</script>").is_err());
/// ```
pub fn validate_selector_name(tag: &'static str, name: &str) -> Result<()> {
	match name
		.chars()
		.find(|&c| matches!(c, '\'' | '"' | '\\' | '<' | '>') || c.is_control())
	{
		Some(character) => Err(FormTagError::UnsafeName {
			tag,
			name: name.to_string(),
			character,
		}),
		None => Ok(()),
	}
}

/// Check that no `<name_prefix>.<key>` field name equals `name`
///
/// # Examples
///
/// ```
/// use reinhardt_form_tags::scope::validate_composite_key;
///
/// assert!(validate_composite_key("test", "test", &["key1".to_string()]).is_ok());
///
/// let keys = vec!["value".to_string(), "key1".to_string(), "key2".to_string()];
/// let err = validate_composite_key("test.value", "test", &keys).unwrap_err();
/// assert_eq!(
///     err.to_string(),
///     "name attribute must differ from every composite key field name. \
///      name=[test.value], namePrefix=[test], keyNames=[key1, key2, value]"
/// );
/// ```
pub fn validate_composite_key(name: &str, name_prefix: &str, key_names: &[String]) -> Result<()> {
	let collides = key_names
		.iter()
		.any(|key| composite_field_name(name_prefix, key) == name);
	if collides {
		let mut sorted = key_names.to_vec();
		sorted.sort();
		return Err(FormTagError::NameRemapConflict {
			name: name.to_string(),
			name_prefix: name_prefix.to_string(),
			key_names: sorted,
		});
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::descriptor::CompositeKey;

	fn scope() -> FormScope {
		FormScope::new("f1".to_string())
	}

	#[test]
	fn test_registration_order_is_preserved() {
		let mut scope = scope();
		for name in ["c", "a", "b"] {
			scope
				.register_submission("submit", SubmissionDescriptor::normal(name, "/R"))
				.unwrap();
		}

		let names: Vec<_> = scope.submissions().iter().map(|d| d.trigger_name()).collect();
		assert_eq!(names, vec!["c", "a", "b"]);
	}

	#[test]
	fn test_empty_trigger_name() {
		let mut scope = scope();

		let err = scope
			.register_submission("submit", SubmissionDescriptor::normal("", "/R"))
			.unwrap_err();
		assert!(matches!(err, FormTagError::MissingName { tag: "submit" }));
	}

	#[test]
	fn test_collision_with_input_without_remap() {
		let mut scope = scope();
		scope.register_input("text", "id").unwrap();

		let err = scope
			.register_submission("submit", SubmissionDescriptor::normal("id", "/R"))
			.unwrap_err();
		match err {
			FormTagError::ConflictingName {
				form_name,
				existing,
				incoming,
			} => {
				assert_eq!(form_name, "f1");
				assert_eq!(existing, "id");
				assert_eq!(incoming, "id");
			}
			other => panic!("unexpected error: {other:?}"),
		}
	}

	#[test]
	fn test_collision_with_input_reconciled_by_remap() {
		let mut scope = scope();
		scope.register_input("text", "id").unwrap();

		scope
			.register_submission(
				"submit",
				SubmissionDescriptor::normal("id", "/R").with_param_remap("id", "target_id"),
			)
			.unwrap();
		assert_eq!(scope.submissions().len(), 1);
	}

	#[test]
	fn test_collision_with_input_reconciled_by_composite_key() {
		let mut scope = scope();
		scope.register_input("checkbox", "row").unwrap();

		scope
			.register_submission(
				"submit",
				SubmissionDescriptor::normal("row", "/R")
					.with_composite_key(CompositeKey::new("row", ["k1", "k2"])),
			)
			.unwrap();
	}

	#[test]
	fn test_remap_target_shadowing_input() {
		let mut scope = scope();
		scope.register_input("text", "target_id").unwrap();

		let err = scope
			.register_submission(
				"submit",
				SubmissionDescriptor::normal("go", "/R").with_param_remap("id", "target_id"),
			)
			.unwrap_err();
		assert!(matches!(err, FormTagError::ConflictingName { .. }));
	}

	#[test]
	fn test_composite_sub_key_equal_to_trigger_name() {
		let mut scope = scope();

		let err = scope
			.register_submission(
				"submit",
				SubmissionDescriptor::normal("test.value", "/R")
					.with_composite_key(CompositeKey::new("test", ["key1", "key2", "value"])),
			)
			.unwrap_err();

		assert!(err.to_string().ends_with(
			"name=[test.value], namePrefix=[test], keyNames=[key1, key2, value]"
		));
		assert!(scope.submissions().is_empty());
	}

	#[test]
	fn test_input_after_trigger_of_same_name() {
		let mut scope = scope();
		scope
			.register_submission("submit", SubmissionDescriptor::normal("id", "/R"))
			.unwrap();

		let err = scope.register_input("text", "id").unwrap_err();
		assert!(matches!(
			err,
			FormTagError::ConflictingName { ref existing, ref incoming, .. }
				if existing == "id" && incoming == "id"
		));
	}

	#[test]
	fn test_input_after_remapping_trigger_of_same_name() {
		let mut scope = scope();
		scope
			.register_submission(
				"submit",
				SubmissionDescriptor::normal("id", "/R").with_param_remap("id", "target_id"),
			)
			.unwrap();

		scope.register_input("text", "id").unwrap();
	}

	#[test]
	fn test_inputs_may_share_a_name() {
		let mut scope = scope();
		scope.register_input("radio", "color").unwrap();

		scope.register_input("radio", "color").unwrap();
	}

	#[test]
	fn test_composite_fields_registered_per_row() {
		let mut scope = scope();
		let keys = vec!["k1".to_string(), "k2".to_string()];

		scope.register_composite_fields("composite_key_radio", "row", &keys).unwrap();
		scope.register_composite_fields("composite_key_radio", "row", &keys).unwrap();

		assert!(scope.is_registered("row.k1"));
		assert!(scope.is_registered("row.k2"));
	}

	#[test]
	fn test_input_named_like_composite_field() {
		let mut scope = scope();
		scope
			.register_composite_fields("composite_key_checkbox", "row", &["k1".to_string()])
			.unwrap();

		assert!(matches!(
			scope.register_input("text", "row.k1"),
			Err(FormTagError::ConflictingName { .. })
		));
	}

	#[test]
	fn test_composite_field_named_like_input() {
		let mut scope = scope();
		scope.register_input("text", "row.k1").unwrap();

		assert!(matches!(
			scope.register_composite_fields("composite_key_checkbox", "row", &["k1".to_string()]),
			Err(FormTagError::ConflictingName { .. })
		));
	}

	#[test]
	fn test_unsafe_trigger_name() {
		let mut scope = scope();

		let err = scope
			.register_submission("submit", SubmissionDescriptor::normal("x']\"),alert(1)//", "/R"))
			.unwrap_err();
		assert!(matches!(
			err,
			FormTagError::UnsafeName { tag: "submit", character: '\'', .. }
		));
		assert!(scope.submissions().is_empty());
	}

	#[test]
	fn test_input_values_are_recorded() {
		let mut scope = scope();
		scope.register_input_value("text", "id", "42").unwrap();

		assert!(scope.is_registered("id"));
		assert_eq!(scope.field_value("id"), Some("42"));
	}
}
