use std::borrow::Cow;
use std::sync::Arc;

use rmcp::model::CallToolResult;
use rmcp::model::Content;
use rmcp::model::JsonObject;
use rmcp::model::Tool;
use schemars::r#gen::SchemaSettings;
use serde_json::Value;
use serde_json::json;
use thinking_core::SubmitError;
use thinking_core::ThoughtArgs;
use thinking_core::ThoughtRouter;
use tracing::debug;

use crate::thought_display::ThoughtDisplay;

pub const THINK_TOOL_NAME: &str = "think";

const THINK_TOOL_DESCRIPTION: &str = "Process a sequential thinking step with support for \
revisions and branching. This tool facilitates a detailed, step-by-step thinking process for \
problem-solving and analysis. Only set nextThoughtNeeded to false when truly done and a \
satisfactory answer is reached.";

pub(crate) fn create_tool_for_think() -> Tool {
    Tool::new(
        Cow::Borrowed(THINK_TOOL_NAME),
        Cow::Borrowed(THINK_TOOL_DESCRIPTION),
        Arc::new(think_input_schema()),
    )
}

/// JSON schema of the `think` arguments, generated from [`ThoughtArgs`] and
/// closed to unrecognized keys.
fn think_input_schema() -> JsonObject {
    let schema = SchemaSettings::draft07()
        .with(|settings| {
            settings.inline_subschemas = true;
            settings.option_add_null_type = false;
        })
        .into_generator()
        .into_root_schema_for::<ThoughtArgs>();

    #[expect(clippy::expect_used)]
    let schema_value = serde_json::to_value(&schema).expect("ThoughtArgs schema should serialize");

    let mut input_schema = match schema_value {
        Value::Object(object) => object,
        _ => JsonObject::new(),
    };
    input_schema.remove("$schema");
    input_schema.remove("title");
    input_schema.insert("additionalProperties".to_string(), Value::Bool(false));
    input_schema
}

/// Runs one `think` call against the session and renders the outcome.
///
/// Failures are tool results with `isError` set, not protocol errors, so the
/// calling model can read the reason and retry.
pub(crate) fn call_think(
    router: &mut ThoughtRouter,
    display: &ThoughtDisplay,
    arguments: Option<JsonObject>,
) -> CallToolResult {
    let arguments = Value::Object(arguments.unwrap_or_default());
    match router.submit(arguments) {
        Ok(receipt) => {
            if let Some(record) = router.thought(&receipt.outcome) {
                display.thought(record);
            }
            debug!(outcome = ?receipt.outcome, "think accepted");
            CallToolResult {
                content: vec![Content::text(format!(
                    "✅ Processed thought {}/{}",
                    receipt.thought_number, receipt.total_thoughts
                ))],
                structured_content: Some(json!({
                    "thoughtNumber": receipt.thought_number,
                    "totalThoughts": receipt.total_thoughts,
                })),
                is_error: None,
                meta: None,
            }
        }
        Err(err) => {
            let message = match &err {
                SubmitError::Validation(err) => {
                    debug!(rule = err.rule(), "think rejected: {err}");
                    format!("Invalid thought data: {err}")
                }
                SubmitError::Session(err) => {
                    tracing::warn!("think failed after validation: {err}");
                    format!("Error processing thought: {err}")
                }
            };
            display.error(&message);
            CallToolResult {
                content: vec![Content::text(format!("❌ {message}"))],
                structured_content: None,
                is_error: Some(true),
                meta: None,
            }
        }
    }
}
