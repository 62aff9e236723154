use rmcp::model::CallToolRequestParams;
use rmcp::model::CallToolResult;
use rmcp::model::ClientNotification;
use rmcp::model::ClientRequest;
use rmcp::model::Content;
use rmcp::model::ErrorCode;
use rmcp::model::ErrorData;
use rmcp::model::Implementation;
use rmcp::model::InitializeResult;
use rmcp::model::JsonRpcError;
use rmcp::model::JsonRpcMessage;
use rmcp::model::JsonRpcNotification;
use rmcp::model::JsonRpcRequest;
use rmcp::model::JsonRpcResponse;
use rmcp::model::ListPromptsResult;
use rmcp::model::ListResourceTemplatesResult;
use rmcp::model::ListResourcesResult;
use rmcp::model::ListToolsResult;
use rmcp::model::RequestId;
use rmcp::model::ServerCapabilities;
use serde_json::Value;
use serde_json::json;
use thinking_core::ThoughtRouter;

use crate::outgoing_message::OutgoingMessageSender;
use crate::resources;
use crate::think_tool::THINK_TOOL_NAME;
use crate::think_tool::call_think;
use crate::think_tool::create_tool_for_think;
use crate::thought_display::ThoughtDisplay;

/// Name reported in `serverInfo`.
pub const SERVER_NAME: &str = "sequential-thinking-mcp";

pub(crate) type IncomingMessage = JsonRpcMessage<ClientRequest, Value, ClientNotification>;

/// Handles one client message at a time. The processor owns the
/// [`ThoughtRouter`], and with it the only writable handle to the session.
pub(crate) struct MessageProcessor {
    outgoing: OutgoingMessageSender,
    initialized: bool,
    router: ThoughtRouter,
    display: ThoughtDisplay,
}

impl MessageProcessor {
    /// Create a new `MessageProcessor`, retaining a handle to the outgoing
    /// `Sender` so handlers can enqueue messages to be written to stdout.
    pub(crate) fn new(outgoing: OutgoingMessageSender, display: ThoughtDisplay) -> Self {
        let router = ThoughtRouter::default();
        tracing::info!(session_id = %router.session().id(), "thinking session started");
        display.startup(router.session().id());
        Self {
            outgoing,
            initialized: false,
            router,
            display,
        }
    }

    pub(crate) async fn process_message(&mut self, message: IncomingMessage) {
        match message {
            JsonRpcMessage::Request(r) => self.process_request(r).await,
            JsonRpcMessage::Response(r) => self.process_response(r),
            JsonRpcMessage::Notification(n) => self.process_notification(n),
            JsonRpcMessage::Error(e) => self.process_error(e),
        }
    }

    /// Renders the end-of-session summary. Called once the input stream is
    /// exhausted.
    pub(crate) fn shutdown(&self) {
        tracing::info!(
            session_id = %self.router.session().id(),
            main_thoughts = self.router.session().main_sequence().len(),
            branches = self.router.session().branch_count(),
            "thinking session ended"
        );
        self.display.session_summary(self.router.session());
    }

    pub(crate) async fn process_request(&mut self, request: JsonRpcRequest<ClientRequest>) {
        let request_id = request.id.clone();
        let client_request = request.request;

        match client_request {
            ClientRequest::InitializeRequest(params) => {
                self.handle_initialize(request_id, params.params).await;
            }
            ClientRequest::PingRequest(_params) => {
                self.handle_ping(request_id).await;
            }
            ClientRequest::ListResourcesRequest(params) => {
                self.handle_list_resources(request_id, params.params).await;
            }
            ClientRequest::ListResourceTemplatesRequest(params) => {
                self.handle_list_resource_templates(request_id, params.params)
                    .await;
            }
            ClientRequest::ReadResourceRequest(params) => {
                self.handle_read_resource(request_id, params.params).await;
            }
            ClientRequest::ListPromptsRequest(params) => {
                self.handle_list_prompts(request_id, params.params).await;
            }
            ClientRequest::ListToolsRequest(params) => {
                self.handle_list_tools(request_id, params.params).await;
            }
            ClientRequest::CallToolRequest(params) => {
                self.handle_call_tool(request_id, params.params).await;
            }
            ClientRequest::SetLevelRequest(params) => {
                self.handle_set_level(request_id, params.params).await;
            }
            ClientRequest::SubscribeRequest(_) => {
                self.handle_unsupported_request(request_id, "resources/subscribe")
                    .await;
            }
            ClientRequest::UnsubscribeRequest(_) => {
                self.handle_unsupported_request(request_id, "resources/unsubscribe")
                    .await;
            }
            ClientRequest::GetPromptRequest(_) => {
                self.handle_unsupported_request(request_id, "prompts/get")
                    .await;
            }
            ClientRequest::CompleteRequest(_) => {
                self.handle_unsupported_request(request_id, "completion/complete")
                    .await;
            }
            ClientRequest::GetTaskInfoRequest(_) => {
                self.handle_unsupported_request(request_id, "tasks/get_info")
                    .await;
            }
            ClientRequest::ListTasksRequest(_) => {
                self.handle_unsupported_request(request_id, "tasks/list")
                    .await;
            }
            ClientRequest::GetTaskResultRequest(_) => {
                self.handle_unsupported_request(request_id, "tasks/get_result")
                    .await;
            }
            ClientRequest::CancelTaskRequest(_) => {
                self.handle_unsupported_request(request_id, "tasks/cancel")
                    .await;
            }
            ClientRequest::CustomRequest(custom) => {
                self.handle_unsupported_request(request_id, &custom.method)
                    .await;
            }
        }
    }

    /// The server never issues requests, so any response is unsolicited.
    pub(crate) fn process_response(&mut self, response: JsonRpcResponse<Value>) {
        tracing::warn!("<- unexpected response: {:?}", response);
    }

    pub(crate) fn process_notification(
        &mut self,
        notification: JsonRpcNotification<ClientNotification>,
    ) {
        match notification.notification {
            ClientNotification::CancelledNotification(params) => {
                // Requests complete synchronously, so there is never anything
                // in flight to cancel.
                tracing::info!("notifications/cancelled -> params: {:?}", params.params);
            }
            ClientNotification::ProgressNotification(params) => {
                tracing::info!("notifications/progress -> params: {:?}", params.params);
            }
            ClientNotification::RootsListChangedNotification(_params) => {
                tracing::info!("notifications/roots/list_changed");
            }
            ClientNotification::InitializedNotification(_) => {
                tracing::info!("notifications/initialized");
            }
            ClientNotification::CustomNotification(_) => {
                tracing::warn!("ignoring custom client notification");
            }
        }
    }

    pub(crate) fn process_error(&mut self, err: JsonRpcError) {
        tracing::error!("<- error: {:?}", err);
    }

    async fn handle_initialize(
        &mut self,
        id: RequestId,
        params: rmcp::model::InitializeRequestParams,
    ) {
        tracing::info!("initialize -> params: {:?}", params);

        if self.initialized {
            self.outgoing
                .send_error(
                    id,
                    ErrorData::invalid_request("initialize called more than once", None),
                )
                .await;
            return;
        }

        let result = InitializeResult {
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_tool_list_changed()
                .enable_resources()
                .build(),
            instructions: None,
            protocol_version: params.protocol_version,
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                title: None,
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: None,
                icons: None,
                website_url: None,
            },
        };

        self.initialized = true;
        self.outgoing.send_response(id, result).await;
    }

    async fn handle_ping(&self, id: RequestId) {
        tracing::debug!("ping");
        self.outgoing.send_response(id, json!({})).await;
    }

    async fn handle_list_resources(
        &self,
        id: RequestId,
        params: Option<rmcp::model::PaginatedRequestParams>,
    ) {
        tracing::debug!("resources/list -> params: {:?}", params);
        let result = ListResourcesResult {
            meta: None,
            resources: resources::list_resources(),
            next_cursor: None,
        };
        self.outgoing.send_response(id, result).await;
    }

    async fn handle_list_resource_templates(
        &self,
        id: RequestId,
        params: Option<rmcp::model::PaginatedRequestParams>,
    ) {
        tracing::debug!("resources/templates/list -> params: {:?}", params);
        let result = ListResourceTemplatesResult {
            meta: None,
            next_cursor: None,
            resource_templates: resources::list_resource_templates(),
        };
        self.outgoing.send_response(id, result).await;
    }

    async fn handle_read_resource(
        &self,
        id: RequestId,
        params: rmcp::model::ReadResourceRequestParams,
    ) {
        tracing::debug!("resources/read -> params: {:?}", params);
        match resources::read_resource(self.router.session(), &params.uri) {
            Ok(result) => self.outgoing.send_response(id, result).await,
            Err(error) => self.outgoing.send_error(id, error).await,
        }
    }

    async fn handle_list_prompts(
        &self,
        id: RequestId,
        params: Option<rmcp::model::PaginatedRequestParams>,
    ) {
        tracing::debug!("prompts/list -> params: {:?}", params);
        let result = ListPromptsResult {
            meta: None,
            next_cursor: None,
            prompts: Vec::new(),
        };
        self.outgoing.send_response(id, result).await;
    }

    async fn handle_list_tools(
        &self,
        id: RequestId,
        params: Option<rmcp::model::PaginatedRequestParams>,
    ) {
        tracing::trace!("tools/list -> {params:?}");
        let result = ListToolsResult {
            meta: None,
            tools: vec![create_tool_for_think()],
            next_cursor: None,
        };

        self.outgoing.send_response(id, result).await;
    }

    async fn handle_call_tool(&mut self, id: RequestId, params: CallToolRequestParams) {
        tracing::info!("tools/call -> params: {:?}", params);
        let CallToolRequestParams {
            name, arguments, ..
        } = params;

        let result = match name.as_ref() {
            THINK_TOOL_NAME => call_think(&mut self.router, &self.display, arguments),
            _ => CallToolResult {
                content: vec![Content::text(format!("Unknown tool '{name}'"))],
                structured_content: None,
                is_error: Some(true),
                meta: None,
            },
        };
        self.outgoing.send_response(id, result).await;
    }

    async fn handle_set_level(&self, id: RequestId, params: rmcp::model::SetLevelRequestParams) {
        tracing::info!("logging/setLevel -> params: {:?}", params);
        self.outgoing.send_response(id, json!({})).await;
    }

    async fn handle_unsupported_request(&self, id: RequestId, method: &str) {
        tracing::debug!("unsupported request: {method}");
        self.outgoing
            .send_error(
                id,
                ErrorData::new(
                    ErrorCode::METHOD_NOT_FOUND,
                    format!("method not found: {method}"),
                    Some(json!({ "method": method })),
                ),
            )
            .await;
    }
}
