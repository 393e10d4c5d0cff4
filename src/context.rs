//! Request context for MCP handlers
//!
//! Every tool call receives a [`RequestContext`]. Besides the JSON-RPC request
//! id it carries an [`Extensions`] map that the HTTP transport fills with data
//! produced by middleware, most importantly the
//! [`AuthenticatedCaller`](crate::oauth::AuthenticatedCaller) placed there by
//! the OAuth layer.
//!
//! ```rust
//! use webinar_mcp::context::{Extensions, RequestContext};
//! use webinar_mcp::protocol::RequestId;
//! use std::sync::Arc;
//!
//! #[derive(Debug)]
//! struct Tenant(&'static str);
//!
//! let mut ext = Extensions::new();
//! ext.insert(Tenant("latam"));
//!
//! let ctx = RequestContext::new(RequestId::Number(1)).with_extensions(Arc::new(ext));
//! assert_eq!(ctx.extension::<Tenant>().map(|t| t.0), Some("latam"));
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::protocol::RequestId;

/// A minimal type-map for passing data through middleware.
///
/// Uses `Arc<dyn Any>` internally so `Clone` is cheap, which is needed for
/// batch requests that create multiple router requests from the same HTTP
/// request.
#[derive(Default, Clone)]
pub struct Extensions {
    map: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous value of the same type.
    pub fn insert<T: Send + Sync + 'static>(&mut self, val: T) {
        self.map.insert(TypeId::of::<T>(), Arc::new(val));
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|val| val.downcast_ref::<T>())
    }

    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.map.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl std::fmt::Debug for Extensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extensions")
            .field("len", &self.map.len())
            .finish()
    }
}

/// Per-call context handed to tool handlers.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: RequestId,
    extensions: Arc<Extensions>,
}

impl RequestContext {
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            extensions: Arc::new(Extensions::new()),
        }
    }

    /// Set the extensions for this request context.
    pub fn with_extensions(mut self, extensions: Arc<Extensions>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Get a reference to a value from the extensions map.
    pub fn extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }
}
