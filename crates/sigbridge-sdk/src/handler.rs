//! ScriptFunction: dynamic-language callables seen from the native side
//!
//! Property accessors, slots and signal receivers are all script
//! functions: a name, an optional doc string, and a body taking the
//! positional arguments.

use std::fmt;
use std::sync::Arc;

use crate::types::Value;

/// Outcome of invoking a script function. `Err` carries the raised message.
pub type ScriptResult = Result<Value, String>;

/// Body of a script function
pub type ScriptFn = Arc<dyn Fn(&[Value]) -> ScriptResult + Send + Sync>;

/// A named dynamic callable
#[derive(Clone)]
pub struct ScriptFunction {
    name: String,
    doc: Option<String>,
    body: ScriptFn,
}

impl ScriptFunction {
    /// Wrap a closure as a script function
    pub fn new(
        name: impl Into<String>,
        body: impl Fn(&[Value]) -> ScriptResult + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            doc: None,
            body: Arc::new(body),
        }
    }

    /// Attach a doc string
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Function name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Doc string, if any
    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Invoke with positional arguments
    #[inline]
    pub fn call(&self, args: &[Value]) -> ScriptResult {
        (self.body)(args)
    }
}

impl fmt::Debug for ScriptFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptFunction")
            .field("name", &self.name)
            .field("doc", &self.doc)
            .finish_non_exhaustive()
    }
}
