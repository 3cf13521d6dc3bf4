//! Core types for the module system.

use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::runner::ds::context::ScriptContext;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object::JsObjectType;
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::entry::ExtensionModuleEntry;

/// An in-process module exposed to script through `requireNative(name)`.
///
/// Instances are cheap: every `requireNative` call gets a fresh one.
pub trait NativeModule {
    fn create_instance(&self) -> JsObjectType;
}

/// An externally backed module that is only brought to life when script touches one
/// of its entry points.
pub trait ExtensionModule {
    /// Stable identifier of the backing extension.
    fn name(&self) -> &str;

    /// Builds the script-visible module value.
    ///
    /// May be arbitrarily expensive (process spawn, IPC handshake). The module system
    /// calls it at most once per context on success; after a failure it may be called
    /// again by a later access.
    fn materialize(&self, context: &ScriptContext) -> Result<JsValue, MaterializeError>;
}

/// Failure reported by an extension backend while materializing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MaterializeError {
    #[error("extension backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("extension handshake failed: {0}")]
    Handshake(String),
    #[error("extension script failed: {0}")]
    Script(#[from] JErrorType),
}

/// Description of one extension as reported by an [`ExtensionClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionInfo {
    pub name: String,
    pub entry_points: Vec<String>,
}

impl ExtensionInfo {
    pub fn new(name: impl Into<String>) -> Self {
        ExtensionInfo {
            name: name.into(),
            entry_points: Vec::new(),
        }
    }

    pub fn with_entry_points<S: Into<String>>(mut self, entry_points: Vec<S>) -> Self {
        self.entry_points = entry_points.into_iter().map(Into::into).collect();
        self
    }
}

/// The transport side of extensions: knows which extensions exist and how to build a
/// handle for one. The handle's `materialize` does the real work later.
pub trait ExtensionClient {
    /// One-time setup of the transport.
    fn initialize(&mut self) {}

    fn extensions(&self) -> Vec<ExtensionInfo>;

    fn create_module(&self, info: &ExtensionInfo) -> Rc<dyn ExtensionModule>;
}

/// Every module the system knows about, by kind.
#[derive(Clone)]
pub enum ModuleKind {
    Native(Rc<dyn NativeModule>),
    Extension(Rc<ExtensionModuleEntry>),
}

impl ModuleKind {
    pub fn is_native(&self) -> bool {
        matches!(self, ModuleKind::Native(_))
    }
}

impl fmt::Debug for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleKind::Native(_) => write!(f, "ModuleKind::Native"),
            ModuleKind::Extension(entry) => write!(f, "ModuleKind::Extension({})", entry.name()),
        }
    }
}
