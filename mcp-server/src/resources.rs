//! The read-only `thoughts://` resources exposing session state.

use rmcp::model::AnnotateAble;
use rmcp::model::ErrorData;
use rmcp::model::RawResource;
use rmcp::model::RawResourceTemplate;
use rmcp::model::ReadResourceResult;
use rmcp::model::Resource;
use rmcp::model::ResourceContents;
use rmcp::model::ResourceTemplate;
use serde::Serialize;
use serde_json::json;
use thinking_core::SessionState;
use thinking_core::summarize;
use thinking_core::views::branch_overview;

pub const HISTORY_URI: &str = "thoughts://history";
pub const SUMMARY_URI: &str = "thoughts://summary";
pub const BRANCHES_URI: &str = "thoughts://branches";
pub const SESSION_URI: &str = "thoughts://session";
pub const BRANCH_URI_TEMPLATE: &str = "thoughts://branches/{branchId}";

const BRANCH_URI_PREFIX: &str = "thoughts://branches/";
const JSON_MIME_TYPE: &str = "application/json";

/// A parsed `thoughts://` URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ThoughtResource<'a> {
    History,
    Summary,
    Branches,
    Session,
    Branch(&'a str),
}

impl<'a> ThoughtResource<'a> {
    fn parse(uri: &'a str) -> Option<Self> {
        match uri {
            HISTORY_URI => Some(Self::History),
            SUMMARY_URI => Some(Self::Summary),
            BRANCHES_URI => Some(Self::Branches),
            SESSION_URI => Some(Self::Session),
            _ => uri.strip_prefix(BRANCH_URI_PREFIX).map(Self::Branch),
        }
    }
}

pub(crate) fn list_resources() -> Vec<Resource> {
    [
        (
            HISTORY_URI,
            "Thought History",
            "Complete history of all thoughts in the main branch",
        ),
        (
            SUMMARY_URI,
            "Thinking Summary",
            "Summary of the entire thinking process",
        ),
        (
            BRANCHES_URI,
            "Branch Overview",
            "Overview of all branches in the thinking process",
        ),
        (
            SESSION_URI,
            "Complete Session",
            "Complete thinking session with all thoughts and branches",
        ),
    ]
    .into_iter()
    .map(|(uri, name, description)| {
        RawResource {
            uri: uri.to_string(),
            name: name.to_string(),
            title: None,
            description: Some(description.to_string()),
            mime_type: Some(JSON_MIME_TYPE.to_string()),
            size: None,
            icons: None,
            meta: None,
        }
        .no_annotation()
    })
    .collect()
}

pub(crate) fn list_resource_templates() -> Vec<ResourceTemplate> {
    vec![
        RawResourceTemplate {
            uri_template: BRANCH_URI_TEMPLATE.to_string(),
            name: "Branch Thoughts".to_string(),
            title: None,
            description: Some("All thoughts recorded in a specific branch".to_string()),
            mime_type: Some(JSON_MIME_TYPE.to_string()),
            icons: None,
        }
        .no_annotation(),
    ]
}

/// Serves one resource read. Every read reflects the session as it is now.
pub(crate) fn read_resource(
    session: &SessionState,
    uri: &str,
) -> Result<ReadResourceResult, ErrorData> {
    let Some(resource) = ThoughtResource::parse(uri) else {
        return Err(ErrorData::resource_not_found(
            format!("Unknown resource: {uri}"),
            Some(json!({ "uri": uri })),
        ));
    };

    let text = match resource {
        ThoughtResource::History => to_pretty_json(&session.main_sequence()),
        ThoughtResource::Summary => to_pretty_json(&summarize(session)),
        ThoughtResource::Branches => to_pretty_json(&branch_overview(session)),
        ThoughtResource::Session => to_pretty_json(&session.snapshot()),
        ThoughtResource::Branch(branch_id) => match session.branch(branch_id) {
            Ok(thoughts) => to_pretty_json(&thoughts),
            Err(err) => {
                return Err(ErrorData::resource_not_found(
                    err.to_string(),
                    Some(json!({ "uri": uri, "branchId": branch_id })),
                ));
            }
        },
    }?;

    Ok(ReadResourceResult {
        contents: vec![ResourceContents::TextResourceContents {
            uri: uri.to_string(),
            mime_type: Some(JSON_MIME_TYPE.to_string()),
            text,
            meta: None,
        }],
    })
}

fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String, ErrorData> {
    serde_json::to_string_pretty(value).map_err(|err| {
        ErrorData::internal_error(format!("failed to serialize resource: {err}"), None)
    })
}
