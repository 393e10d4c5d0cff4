//! Tool definition and builder API
//!
//! A [`Tool`] is its MCP metadata plus a boxed `Service<ToolRequest>`. The
//! builder turns a typed async handler into that service: arguments are
//! deserialized into the handler's input type and every failure (bad
//! arguments, handler error) comes back as a `CallToolResult` with
//! `is_error: true`, never as a protocol-level error.
//!
//! ```rust
//! use webinar_mcp::{CallToolResult, ToolBuilder};
//! use schemars::JsonSchema;
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize, JsonSchema)]
//! struct GreetInput {
//!     name: String,
//! }
//!
//! let tool = ToolBuilder::new("greet")
//!     .description("Greet someone by name")
//!     .read_only()
//!     .handler(|input: GreetInput| async move {
//!         Ok(CallToolResult::text(format!("Hello, {}!", input.name)))
//!     })
//!     .build()
//!     .expect("valid tool name");
//!
//! assert_eq!(tool.name, "greet");
//! ```

use std::borrow::Cow;
use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use schemars::{JsonSchema, Schema, SchemaGenerator};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tower::ServiceExt;
use tower::util::{BoxCloneSyncService, service_fn};

use crate::context::RequestContext;
use crate::error::{Error, Result};
use crate::protocol::{CallToolResult, ToolAnnotations, ToolDefinition};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Input of a tool service.
#[derive(Debug, Clone)]
pub struct ToolRequest {
    pub ctx: RequestContext,
    /// Raw `arguments` of the `tools/call` request
    pub args: Value,
}

/// A boxed, cloneable tool service. Failures are encoded in the result.
pub type BoxToolService = BoxCloneSyncService<ToolRequest, CallToolResult, Infallible>;

/// Marker input for tools that take no parameters.
///
/// The unit type `()` generates `"type": "null"` in JSON Schema, which MCP
/// clients reject. `NoParams` advertises an empty object and accepts `null`
/// or any object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoParams;

impl<'de> serde::Deserialize<'de> for NoParams {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct NoParamsVisitor;

        impl<'de> serde::de::Visitor<'de> for NoParamsVisitor {
            type Value = NoParams;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("null or an object")
            }

            fn visit_unit<E: serde::de::Error>(self) -> std::result::Result<NoParams, E> {
                Ok(NoParams)
            }

            fn visit_none<E: serde::de::Error>(self) -> std::result::Result<NoParams, E> {
                Ok(NoParams)
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<NoParams, A::Error>
            where
                A: serde::de::MapAccess<'de>,
            {
                while map
                    .next_entry::<serde::de::IgnoredAny, serde::de::IgnoredAny>()?
                    .is_some()
                {}
                Ok(NoParams)
            }
        }

        deserializer.deserialize_any(NoParamsVisitor)
    }
}

impl JsonSchema for NoParams {
    fn schema_name() -> Cow<'static, str> {
        Cow::Borrowed("NoParams")
    }

    fn json_schema(_generator: &mut SchemaGenerator) -> Schema {
        schemars::json_schema!({
            "type": "object",
            "properties": {}
        })
    }
}

/// Tool names must be 1-128 characters of ASCII alphanumerics, `_`, `-` or `.`.
pub fn validate_tool_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > 128 {
        return Err(Error::tool(format!(
            "Tool name '{}' must be between 1 and 128 characters",
            name
        )));
    }
    match name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
    {
        Some(c) => Err(Error::tool(format!(
            "Tool name '{}' contains invalid character '{}'",
            name, c
        ))),
        None => Ok(()),
    }
}

/// A registered tool: metadata plus the service that executes it.
pub struct Tool {
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub annotations: Option<ToolAnnotations>,
    input_schema: Value,
    service: BoxToolService,
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("annotations", &self.annotations)
            .finish_non_exhaustive()
    }
}

impl Tool {
    /// The entry returned by `tools/list`.
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
            annotations: self.annotations.clone(),
        }
    }

    pub fn call(&self, ctx: RequestContext, args: Value) -> BoxFuture<'static, CallToolResult> {
        let service = self.service.clone();
        Box::pin(async move {
            match service.oneshot(ToolRequest { ctx, args }).await {
                Ok(result) => result,
                Err(never) => match never {},
            }
        })
    }
}

/// Builder for [`Tool`].
pub struct ToolBuilder {
    name: String,
    title: Option<String>,
    description: Option<String>,
    annotations: Option<ToolAnnotations>,
}

impl ToolBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: None,
            description: None,
            annotations: None,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark the tool as read-only. Read-only tools are never destructive.
    pub fn read_only(self) -> Self {
        self.annotate(|a| {
            a.read_only_hint = true;
            a.destructive_hint = false;
        })
    }

    pub fn idempotent(self) -> Self {
        self.annotate(|a| a.idempotent_hint = true)
    }

    fn annotate(mut self, f: impl FnOnce(&mut ToolAnnotations)) -> Self {
        f(self.annotations.get_or_insert_with(ToolAnnotations::default));
        self
    }

    /// Handler that receives the request context and typed input.
    pub fn handler_with_context<I, F, Fut>(self, handler: F) -> TypedToolBuilder<I, F>
    where
        I: JsonSchema + DeserializeOwned + Send + 'static,
        F: Fn(RequestContext, I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CallToolResult>> + Send + 'static,
    {
        TypedToolBuilder {
            builder: self,
            handler,
            _input: PhantomData,
        }
    }

    /// Handler that only needs typed input.
    pub fn handler<I, F, Fut>(
        self,
        handler: F,
    ) -> TypedToolBuilder<I, impl Fn(RequestContext, I) -> Fut + Send + Sync + 'static>
    where
        I: JsonSchema + DeserializeOwned + Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CallToolResult>> + Send + 'static,
    {
        self.handler_with_context(move |_ctx: RequestContext, input: I| handler(input))
    }

    /// Handler with shared state and request context.
    ///
    /// The state is cloned for each invocation, so wrap expensive state in
    /// an `Arc`.
    pub fn handler_with_state_and_context<S, I, F, Fut>(
        self,
        state: S,
        handler: F,
    ) -> TypedToolBuilder<I, impl Fn(RequestContext, I) -> Fut + Send + Sync + 'static>
    where
        S: Clone + Send + Sync + 'static,
        I: JsonSchema + DeserializeOwned + Send + 'static,
        F: Fn(S, RequestContext, I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CallToolResult>> + Send + 'static,
    {
        self.handler_with_context(move |ctx: RequestContext, input: I| {
            handler(state.clone(), ctx, input)
        })
    }
}

/// A [`ToolBuilder`] with its handler attached.
pub struct TypedToolBuilder<I, F> {
    builder: ToolBuilder,
    handler: F,
    _input: PhantomData<fn() -> I>,
}

impl<I, F, Fut> TypedToolBuilder<I, F>
where
    I: JsonSchema + DeserializeOwned + Send + 'static,
    F: Fn(RequestContext, I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<CallToolResult>> + Send + 'static,
{
    /// Fails if the tool name is invalid.
    pub fn build(self) -> Result<Tool> {
        validate_tool_name(&self.builder.name)?;

        let input_schema = serde_json::to_value(schemars::schema_for!(I))?;
        let handler = Arc::new(self.handler);
        let service = service_fn(move |req: ToolRequest| {
            let handler = handler.clone();
            async move { Ok::<_, Infallible>(invoke::<I, _, _>(&*handler, req).await) }
        });

        Ok(Tool {
            name: self.builder.name,
            title: self.builder.title,
            description: self.builder.description,
            annotations: self.builder.annotations,
            input_schema,
            service: BoxCloneSyncService::new(service),
        })
    }
}

async fn invoke<I, F, Fut>(handler: &F, req: ToolRequest) -> CallToolResult
where
    I: DeserializeOwned,
    F: Fn(RequestContext, I) -> Fut,
    Fut: Future<Output = Result<CallToolResult>>,
{
    // Omitted arguments are treated as an empty object
    let args = match req.args {
        Value::Null => Value::Object(Default::default()),
        args => args,
    };
    let input: I = match serde_json::from_value(args) {
        Ok(input) => input,
        Err(e) => return CallToolResult::error(format!("Invalid input: {}", e)),
    };

    match handler(req.ctx, input).await {
        Ok(result) => result,
        Err(e) => CallToolResult::error(e.to_string()),
    }
}
