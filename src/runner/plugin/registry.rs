//! Native module registry and the module system's error type.

use std::collections::HashMap;
use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, warn};

use super::types::NativeModule;

/// Error type for module system operations.
///
/// None of these is fatal for a context: a rejected registration leaves the earlier
/// binding in place and the context still starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BrokerError {
    #[error("native module already registered: {0}")]
    DuplicateNativeModule(String),
    #[error("extension already registered: {0}")]
    DuplicateExtension(String),
    #[error("entry point {entry_point} of {extension} is already claimed by {owner}")]
    DuplicateEntryPoint {
        entry_point: String,
        extension: String,
        owner: String,
    },
    #[error("invalid entry point '{path}': {reason}")]
    InvalidEntryPoint { path: String, reason: String },
    #[error("extension {0} declares no entry points")]
    NoEntryPoints(String),
    #[error("module system already initialized")]
    AlreadyInitialized,
    #[error("script context has been released")]
    ContextReleased,
    #[error("cannot install entry point {entry_point}: {reason}")]
    InvalidHolder { entry_point: String, reason: String },
    #[error("module system config error: {0}")]
    ConfigError(String),
}

/// Registry for native modules.
///
/// First registration of a name wins; later ones are rejected.
#[derive(Default)]
pub struct NativeModuleRegistry {
    modules: HashMap<String, Rc<dyn NativeModule>>,
}

impl NativeModuleRegistry {
    pub fn new() -> Self {
        NativeModuleRegistry {
            modules: HashMap::new(),
        }
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        module: Box<dyn NativeModule>,
    ) -> Result<(), BrokerError> {
        let name = name.into();
        if self.modules.contains_key(&name) {
            warn!(module = %name, "native module registered twice, keeping the first");
            return Err(BrokerError::DuplicateNativeModule(name));
        }
        debug!(module = %name, "registered native module");
        self.modules.insert(name, Rc::from(module));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Rc<dyn NativeModule>> {
        self.modules.get(name).cloned()
    }

    pub fn clear(&mut self) {
        self.modules.clear();
    }
}
