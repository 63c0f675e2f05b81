//! Client-side wiring
//!
//! Every wired trigger calls one global submit function. The function reads
//! the per-form submission table published under the registry object to learn
//! the target, the kind of submission and which fields to enable.
//!
//! Two wiring modes exist:
//!
//! - inline: the trigger carries `onclick="return window.<fn>.call(this, event);"`
//! - nonce: no inline handler is allowed, so a statement binding the handler
//!   by element name is queued into the form's nonce-tagged script block

use crate::descriptor::{ActionKind, ElementKind, ParamRemap, SubmissionDescriptor};
use serde::Serialize;

/// Handler attribute value for inline wiring
///
/// # Examples
///
/// ```
/// use reinhardt_form_tags::script::inline_handler;
///
/// assert_eq!(
///     inline_handler("reinhardt_submit"),
///     "return window.reinhardt_submit.call(this, event);"
/// );
/// ```
pub fn inline_handler(submit_function_name: &str) -> String {
	format!("return window.{}.call(this, event);", submit_function_name)
}

/// Statement binding the submit function to a trigger after parsing
///
/// # Examples
///
/// ```
/// use reinhardt_form_tags::ElementKind;
/// use reinhardt_form_tags::script::binding_statement;
///
/// assert_eq!(
///     binding_statement(ElementKind::Input, "dummy", "reinhardt_submit"),
///     "document.querySelector(\"input[name='dummy']\").onclick = window.reinhardt_submit;"
/// );
/// ```
pub fn binding_statement(
	element_kind: ElementKind,
	trigger_name: &str,
	submit_function_name: &str,
) -> String {
	format!(
		"document.querySelector(\"{}[name='{}']\").onclick = window.{};",
		element_kind.as_str(),
		trigger_name,
		submit_function_name
	)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmissionEntry<'a> {
	action: &'a str,
	kind: ActionKind,
	allow_double_submission: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	popup_window_name: Option<&'a str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	popup_options: Option<&'a str>,
	#[serde(skip_serializing_if = "<[ParamRemap]>::is_empty")]
	change_param_names: &'a [ParamRemap],
}

/// Statements creating the form's submission table
pub(crate) fn registry_preamble(registry_name: &str, form_name: &str) -> String {
	format!(
		"window.{registry} = window.{registry} || {{}};\nwindow.{registry}[{form}] = {{}};",
		registry = registry_name,
		form = js_string(form_name),
	)
}

/// Statement publishing one submission into the form's table
///
/// # Examples
///
/// ```
/// use reinhardt_form_tags::SubmissionDescriptor;
/// use reinhardt_form_tags::script::registry_statement;
///
/// let descriptor = SubmissionDescriptor::normal("go", "/R0001");
/// assert_eq!(
///     registry_statement("__subs", "f1", &descriptor),
///     r#"window.__subs["f1"]["go"] = {"action":"/R0001","kind":"normal","allowDoubleSubmission":true};"#
/// );
/// ```
pub fn registry_statement(
	registry_name: &str,
	form_name: &str,
	descriptor: &SubmissionDescriptor,
) -> String {
	let entry = SubmissionEntry {
		action: descriptor.target_uri(),
		kind: descriptor.action_kind(),
		allow_double_submission: descriptor.allow_double_submission(),
		popup_window_name: descriptor.popup_window_name(),
		popup_options: descriptor.popup_options(),
		change_param_names: descriptor.param_name_remaps(),
	};
	format!(
		"window.{}[{}][{}] = {};",
		registry_name,
		js_string(form_name),
		js_string(descriptor.trigger_name()),
		to_json(&entry)
	)
}

fn js_string(value: &str) -> String {
	to_json(&value)
}

// Serializing plain strings and derived structs cannot fail.
fn to_json<T: Serialize>(value: &T) -> String {
	serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}
