//! Output of closing a form
//!
//! The coordinator never writes markup. It hands plain attribute maps and a
//! script body to the page renderer, which escapes and serializes them.

use crate::descriptor::SubmissionDescriptor;
use crate::scope::FormScope;
use crate::script;
use crate::settings::FormTagSettings;
use reinhardt_double_submit::Token;
use std::collections::BTreeMap;

/// A hidden input the coordinator wants emitted inside the form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HiddenField {
	pub name: String,
	pub value: String,
	/// Trigger the field belongs to; `None` for form-level fields
	pub trigger: Option<String>,
}

impl HiddenField {
	pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: value.into(),
			trigger: None,
		}
	}

	fn for_trigger(name: impl Into<String>, value: impl Into<String>, trigger: &str) -> Self {
		Self {
			name: name.into(),
			value: value.into(),
			trigger: Some(trigger.to_string()),
		}
	}

	/// Unescaped attribute map for the HTML renderer
	///
	/// Fields that belong to one trigger start disabled; the client enables
	/// the set of the trigger that was pressed.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_form_tags::HiddenField;
	///
	/// let attributes = HiddenField::new("_token", "abc").attributes();
	/// assert_eq!(attributes["type"], "hidden");
	/// assert_eq!(attributes["name"], "_token");
	/// assert_eq!(attributes["value"], "abc");
	/// assert!(!attributes.contains_key("disabled"));
	/// ```
	pub fn attributes(&self) -> BTreeMap<String, String> {
		let mut attributes = BTreeMap::new();
		attributes.insert("type".to_string(), "hidden".to_string());
		attributes.insert("name".to_string(), self.name.clone());
		attributes.insert("value".to_string(), self.value.clone());
		if let Some(trigger) = &self.trigger {
			attributes.insert("data-submission".to_string(), trigger.clone());
			attributes.insert("disabled".to_string(), "disabled".to_string());
		}
		attributes
	}
}

/// Script to emit after the form markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptBlock {
	/// CSP nonce the `<script>` element must carry
	pub nonce: Option<String>,
	pub body: String,
}

/// Everything the page renderer needs once a form closes
#[derive(Debug, Clone)]
pub struct FinalizationResult {
	pub form_name: String,
	pub confirmation_page: bool,
	/// Registered submissions in markup order
	pub submissions: Vec<SubmissionDescriptor>,
	pub hidden_fields: Vec<HiddenField>,
	pub script: Option<ScriptBlock>,
	/// Token embedded into this form
	pub token: Option<Token>,
}

impl FinalizationResult {
	pub fn hidden_field(&self, name: &str) -> Option<&HiddenField> {
		self.hidden_fields.iter().find(|field| field.name == name)
	}

	/// Fields sent only with `trigger_name`
	pub fn trigger_fields<'a>(&'a self, trigger_name: &'a str) -> impl Iterator<Item = &'a HiddenField> {
		self.hidden_fields
			.iter()
			.filter(move |field| field.trigger.as_deref() == Some(trigger_name))
	}

	pub fn has_token(&self) -> bool {
		self.token.is_some()
	}
}

/// Token field to embed, already encoded for the wire
pub(crate) struct EmbeddedField {
	pub name: String,
	pub value: String,
	pub token: Token,
}

pub(crate) fn assemble(
	scope: FormScope,
	settings: &FormTagSettings,
	confirmation_page: bool,
	token_field: Option<EmbeddedField>,
	nonce: Option<&str>,
) -> FinalizationResult {
	let wired = scope.submissions().iter().any(SubmissionDescriptor::needs_client_wiring);

	let mut hidden_fields = Vec::new();
	if wired {
		hidden_fields.push(HiddenField::new(&settings.submit_name_field, ""));
	}
	let token = token_field.map(|field| {
		hidden_fields.push(HiddenField::new(field.name, field.value));
		field.token
	});
	for descriptor in scope.submissions() {
		hidden_fields.extend(trigger_fields(&scope, descriptor));
	}

	let script = wired.then(|| ScriptBlock {
		nonce: nonce.map(str::to_string),
		body: script_body(&scope, settings),
	});

	FinalizationResult {
		form_name: scope.form_name().to_string(),
		confirmation_page,
		hidden_fields,
		script,
		token,
		submissions: scope.into_submissions(),
	}
}

fn trigger_fields(scope: &FormScope, descriptor: &SubmissionDescriptor) -> Vec<HiddenField> {
	let trigger = descriptor.trigger_name();
	let mut fields = Vec::new();

	for remap in descriptor.param_name_remaps() {
		let value = scope.field_value(&remap.original).unwrap_or("");
		fields.push(HiddenField::for_trigger(&remap.renamed, value, trigger));
	}
	if let Some(composite) = descriptor.composite_key() {
		for key in composite.key_names() {
			fields.push(HiddenField::for_trigger(
				crate::descriptor::composite_field_name(composite.name_prefix(), key),
				composite.value(key),
				trigger,
			));
		}
	}
	for param in descriptor.extra_params() {
		fields.push(HiddenField::for_trigger(&param.name, &param.value, trigger));
	}
	fields
}

fn script_body(scope: &FormScope, settings: &FormTagSettings) -> String {
	let mut lines = vec![script::registry_preamble(
		&settings.submission_registry_name,
		scope.form_name(),
	)];
	lines.extend(scope.submissions().iter().map(|descriptor| {
		script::registry_statement(&settings.submission_registry_name, scope.form_name(), descriptor)
	}));
	lines.extend(scope.inline_scripts().iter().cloned());
	lines.join("\n")
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::descriptor::CompositeKey;

	#[test]
	fn test_unwired_form_has_no_script_or_submit_name() {
		let mut scope = FormScope::new("f1".to_string());
		scope
			.register_submission("submit", SubmissionDescriptor::normal("go", "/R0001"))
			.unwrap();

		let result = assemble(scope, &FormTagSettings::default(), false, None, None);

		assert!(result.hidden_fields.is_empty());
		assert!(result.script.is_none());
		assert_eq!(result.submissions.len(), 1);
	}

	#[test]
	fn test_trigger_fields_order() {
		let mut scope = FormScope::new("f1".to_string());
		scope.register_input_value("text", "id", "42").unwrap();
		scope
			.register_submission(
				"submit",
				SubmissionDescriptor::normal("edit", "/R")
					.with_param_remap("id", "user_id")
					.with_composite_key(CompositeKey::new("row", ["k1"]).with_value("k1", "7"))
					.with_param("mode", "edit"),
			)
			.unwrap();

		let result = assemble(scope, &FormTagSettings::default(), false, None, None);

		let names: Vec<_> = result.hidden_fields.iter().map(|f| f.name.as_str()).collect();
		assert_eq!(names, vec!["_submit_name", "user_id", "row.k1", "mode"]);
		assert_eq!(result.hidden_field("user_id").unwrap().value, "42");
		assert_eq!(result.hidden_field("row.k1").unwrap().value, "7");
		assert_eq!(result.trigger_fields("edit").count(), 3);
	}

	#[test]
	fn test_trigger_field_attributes() {
		let field = HiddenField::for_trigger("mode", "edit", "go");

		let attributes = field.attributes();
		assert_eq!(attributes["data-submission"], "go");
		assert_eq!(attributes["disabled"], "disabled");
	}

	#[test]
	fn test_script_carries_nonce() {
		let mut scope = FormScope::new("f1".to_string());
		scope
			.register_submission("download_submit", SubmissionDescriptor::download("dl", "/export"))
			.unwrap();

		let result = assemble(scope, &FormTagSettings::default(), false, None, Some("n0nce"));

		let script = result.script.unwrap();
		assert_eq!(script.nonce.as_deref(), Some("n0nce"));
		assert!(script.body.contains(r#"["f1"]["dl"]"#));
	}
}
