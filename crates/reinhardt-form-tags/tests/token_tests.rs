//! Token embedding tests
//!
//! How rendered forms carry the double-submission token across the
//! input → confirmation → commit cycle.

use reinhardt_double_submit::{DoubleSubmitGuard, HiddenCipher, TokenState};
use reinhardt_form_tags::{
	FinalizationResult, FormTag, FormTagError, FormTagSettings, RenderContext, TriggerKind,
	TriggerTag,
};
use rstest::{fixture, rstest};
use std::collections::HashMap;
use std::sync::Arc;

const SESSION: &str = "session-1";

// =============================================================================
// Fixtures
// =============================================================================

#[fixture]
fn settings() -> Arc<FormTagSettings> {
	Arc::new(FormTagSettings::default())
}

#[fixture]
fn guard() -> Arc<DoubleSubmitGuard> {
	Arc::new(DoubleSubmitGuard::in_memory())
}

fn request(settings: &Arc<FormTagSettings>, guard: &Arc<DoubleSubmitGuard>) -> RenderContext {
	RenderContext::new(Arc::clone(settings), Arc::clone(guard)).with_token_scope(SESSION)
}

/// Render a form with one commit trigger that forbids double submission
fn render_commit_form(ctx: &mut RenderContext, form_name: &str) -> FinalizationResult {
	let form = FormTag::new(form_name);
	form.open(ctx).unwrap();
	TriggerTag::new(TriggerKind::Submit, "commit")
		.with_target("/commit")
		.with_allow_double_submission(false)
		.render(ctx)
		.unwrap();
	form.close(ctx).unwrap()
}

/// Decoded request parameters a browser would post back
fn posted(result: &FinalizationResult, guard: &DoubleSubmitGuard) -> HashMap<String, String> {
	result
		.hidden_fields
		.iter()
		.filter(|field| field.trigger.is_none())
		.map(|field| (field.name.clone(), field.value.clone()))
		.filter(|(name, _)| name == guard.hidden_field_name())
		.collect()
}

// =============================================================================
// Embedding Tests
// =============================================================================

/// Test a non-idempotent trigger embeds a token
///
/// **Category**: Happy Path
/// **Verifies**: "<parameterName>=<tokenValue>" hidden field
#[rstest]
fn test_token_embedded_for_commit(settings: Arc<FormTagSettings>, guard: Arc<DoubleSubmitGuard>) {
	let mut ctx = request(&settings, &guard);

	let result = render_commit_form(&mut ctx, "f1");

	let token = result.token.as_ref().unwrap();
	let field = result.hidden_field("_double_submit").unwrap();
	assert_eq!(field.value, format!("_token={}", token.value()));
	assert!(field.trigger.is_none());
	assert_eq!(guard.state(SESSION).unwrap(), TokenState::Issued);
}

/// Test several forms on one page share one token
///
/// **Category**: Happy Path
/// **Verifies**: Token issued once per request and reused
#[rstest]
fn test_token_reused_across_forms(settings: Arc<FormTagSettings>, guard: Arc<DoubleSubmitGuard>) {
	let mut ctx = request(&settings, &guard);

	let first = render_commit_form(&mut ctx, "f1");
	let second = render_commit_form(&mut ctx, "f2");

	assert_eq!(
		first.hidden_field("_double_submit").unwrap().value,
		second.hidden_field("_double_submit").unwrap().value
	);
	assert_eq!(ctx.rendered_forms(), ["f1", "f2"]);
	guard.check_request(SESSION, &posted(&second, &guard)).unwrap();
}

/// Test the confirmation page embeds a token without explicit flags
///
/// **Category**: Happy Path
/// **Verifies**: Confirmation pages default triggers to single submission
#[rstest]
fn test_confirmation_page_embeds_token(settings: Arc<FormTagSettings>, guard: Arc<DoubleSubmitGuard>) {
	let mut ctx = request(&settings, &guard);
	ctx.declare_confirmation_page().unwrap();

	let form = FormTag::new("confirm");
	form.open(&mut ctx).unwrap();
	TriggerTag::new(TriggerKind::Submit, "commit")
		.with_target("/commit")
		.render(&mut ctx)
		.unwrap();
	TriggerTag::new(TriggerKind::Submit, "back")
		.with_target("/input")
		.with_allow_double_submission(true)
		.render(&mut ctx)
		.unwrap();
	let result = form.close(&mut ctx).unwrap();

	assert!(result.confirmation_page);
	assert!(result.has_token());
	assert!(!result.submissions[0].allow_double_submission());
	assert!(result.submissions[1].allow_double_submission());
}

/// Test exempt paths skip the token
///
/// **Category**: Edge Case
/// **Verifies**: token_exempt_paths suppresses the default policy
#[rstest]
fn test_exempt_path(guard: Arc<DoubleSubmitGuard>) {
	let settings = Arc::new(FormTagSettings::default().with_token_exempt_path("/search"));
	let mut ctx = request(&settings, &guard).with_request_path("/search");

	let result = render_commit_form(&mut ctx, "f1");

	assert!(!result.has_token());
	assert_eq!(guard.state(SESSION).unwrap(), TokenState::NoToken);
}

/// Test use_token overrides the default policy both ways
///
/// **Category**: Edge Case
/// **Verifies**: Forced and forbidden token embedding
#[rstest]
#[case(Some(false), false)]
#[case(Some(true), true)]
#[case(None, true)]
fn test_use_token_override(
	settings: Arc<FormTagSettings>,
	guard: Arc<DoubleSubmitGuard>,
	#[case] use_token: Option<bool>,
	#[case] expected: bool,
) {
	let mut ctx = request(&settings, &guard);
	let form = match use_token {
		Some(use_token) => FormTag::new("f1").with_use_token(use_token),
		None => FormTag::new("f1"),
	};
	form.open(&mut ctx).unwrap();
	TriggerTag::new(TriggerKind::Submit, "commit")
		.with_target("/commit")
		.with_allow_double_submission(false)
		.render(&mut ctx)
		.unwrap();

	let result = form.close(&mut ctx).unwrap();

	assert_eq!(result.has_token(), expected);
}

/// Test encrypted embedding hides the parameter name
///
/// **Category**: Happy Path
/// **Verifies**: encrypt_hidden policy flag end to end
#[rstest]
fn test_encrypted_token_round_trip() {
	let settings = FormTagSettings::from_toml(
		r#"
[double_submit]
hidden_field_param_name = "nonce"
encrypt_hidden = true
"#,
	)
	.unwrap();
	let guard = Arc::new(settings.build_guard(Some(HiddenCipher::new([3u8; 32]))).unwrap());
	let settings = Arc::new(settings);
	let mut ctx = request(&settings, &guard);

	let result = render_commit_form(&mut ctx, "f1");

	let field = result.hidden_field("_double_submit").unwrap();
	assert!(!field.value.starts_with("nonce="));
	guard.check_request(SESSION, &posted(&result, &guard)).unwrap();
}

// =============================================================================
// Commit Cycle Tests
// =============================================================================

/// Test the rendered token authorizes exactly one commit
///
/// **Category**: Happy Path
/// **Verifies**: ISSUED -> CONSUMED and replay detection
#[rstest]
fn test_commit_accepted_once(settings: Arc<FormTagSettings>, guard: Arc<DoubleSubmitGuard>) {
	let mut ctx = request(&settings, &guard);
	let result = render_commit_form(&mut ctx, "f1");
	let params = posted(&result, &guard);

	guard.check_request(SESSION, &params).unwrap();
	let replay = guard.check_request(SESSION, &params).unwrap_err();

	assert!(replay.is_double_submission());
	assert!(!replay.is_tampering());
}

/// Test a newer render invalidates pages rendered by earlier requests
///
/// **Category**: Edge Case
/// **Verifies**: A stale replay fails and discards the fresh token too
#[rstest]
fn test_stale_page_rejected(settings: Arc<FormTagSettings>, guard: Arc<DoubleSubmitGuard>) {
	let stale = render_commit_form(&mut request(&settings, &guard), "f1");
	let fresh = render_commit_form(&mut request(&settings, &guard), "f1");

	let err = guard.check_request(SESSION, &posted(&stale, &guard)).unwrap_err();
	assert!(err.is_double_submission());

	let err = guard.check_request(SESSION, &posted(&fresh, &guard)).unwrap_err();
	assert!(err.is_double_submission());
}

/// Test the input -> confirmation -> commit cycle
///
/// **Category**: Scenario
/// **Verifies**: Confirmation render issues the token the commit spends
#[rstest]
fn test_input_confirm_commit_cycle(settings: Arc<FormTagSettings>, guard: Arc<DoubleSubmitGuard>) {
	let mut input = request(&settings, &guard);
	let form = FormTag::new("entry");
	form.open(&mut input).unwrap();
	TriggerTag::new(TriggerKind::Submit, "confirm")
		.with_target("/confirm")
		.render(&mut input)
		.unwrap();
	let input_page = form.close(&mut input).unwrap();
	assert!(!input_page.has_token());

	let mut confirm = request(&settings, &guard);
	confirm.declare_confirmation_page().unwrap();
	let confirm_page = render_commit_form(&mut confirm, "entry");
	assert!(confirm_page.confirmation_page);

	guard
		.check_request(SESSION, &posted(&confirm_page, &guard))
		.unwrap();
	assert_eq!(guard.state(SESSION).unwrap(), TokenState::Consumed);
}

/// Test a token-bearing form needs a scope key
///
/// **Category**: Error Path
/// **Verifies**: MissingTokenScope instead of an unscoped token
#[rstest]
fn test_missing_scope_key(settings: Arc<FormTagSettings>, guard: Arc<DoubleSubmitGuard>) {
	let mut ctx = RenderContext::new(settings, guard);
	let form = FormTag::new("f1").with_use_token(true);
	form.open(&mut ctx).unwrap();

	let err = form.close(&mut ctx).unwrap_err();
	assert!(matches!(err, FormTagError::MissingTokenScope { ref form_name } if form_name == "f1"));
}
