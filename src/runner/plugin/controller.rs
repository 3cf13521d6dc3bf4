//! Owns one module system per live script context.

use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::runner::ds::context::ScriptContext;
use crate::runner::plugin::builtin::register_builtins;
use crate::runner::plugin::config::BrokerConfig;
use crate::runner::plugin::module_system::ModuleSystem;
use crate::runner::plugin::types::ExtensionClient;

/// Host-facing entry point: the embedder reports context creation and release here.
pub struct ScriptContextController {
    initialized: bool,
    client: Box<dyn ExtensionClient>,
    config: BrokerConfig,
    module_systems: HashMap<Uuid, ModuleSystem>,
}

impl ScriptContextController {
    pub fn new(client: Box<dyn ExtensionClient>, config: BrokerConfig) -> Self {
        ScriptContextController {
            initialized: false,
            client,
            config,
            module_systems: HashMap::new(),
        }
    }

    /// Brings up the extension transport. Only the first call does anything.
    pub fn initialize_extensions(&mut self) {
        if self.initialized {
            debug!("extension client already initialized");
            return;
        }
        self.client.initialize();
        self.initialized = true;
        info!("extension client initialized");
    }

    pub fn did_create_script_context(&mut self, context: &Rc<ScriptContext>) {
        let id = context.id();
        if self.module_systems.contains_key(&id) {
            warn!(context = %id, "script context reported twice, ignoring");
            return;
        }

        let mut module_system = ModuleSystem::with_config(context, self.config.clone());
        register_builtins(&module_system, self.config.native_modules.as_slice());

        for info in self.client.extensions() {
            let module = self.client.create_module(&info);
            // Rejections are logged by the module system; the context still starts.
            let _ = module_system.register_extension_module(module, info.entry_points.as_slice());
        }

        if let Err(e) = module_system.initialize() {
            warn!(context = %id, error = %e, "module system failed to initialize");
        }
        self.module_systems.insert(id, module_system);
        debug!(context = %id, contexts = self.module_systems.len(), "script context attached");
    }

    pub fn will_release_script_context(&mut self, context: &ScriptContext) {
        match self.module_systems.remove(&context.id()) {
            Some(mut module_system) => {
                module_system.teardown();
                debug!(context = %context.id(), "script context released");
            }
            None => debug!(context = %context.id(), "release of unknown script context"),
        }
    }

    pub fn module_system(&self, context: &ScriptContext) -> Option<&ModuleSystem> {
        self.module_systems.get(&context.id())
    }

    pub fn context_count(&self) -> usize {
        self.module_systems.len()
    }
}

impl Drop for ScriptContextController {
    fn drop(&mut self) {
        for (_, mut module_system) in self.module_systems.drain() {
            module_system.teardown();
        }
    }
}
