//! The per-context module system.
//!
//! One [`ModuleSystem`] exists per script context. It is built when the context is
//! created, filled with native and extension modules, initialized once, and torn down
//! when the context is released.
//!
//! ## Lifecycle
//!
//! ```text
//! new(context)
//!   register_native_module(..)*      any time before teardown
//!   register_extension_module(..)*   before initialize
//! initialize()                       prefix resolution, arm trampolines,
//!                                    install requireNative, lock namespaces
//!   ... script runs, trampolines fire on first touch ...
//! teardown()                         revoke context handle, disarm, release
//! ```

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::{Rc, Weak};

use tracing::{debug, info, warn};

use crate::runner::ds::context::{ContextHandle, ScriptContext};
use crate::runner::ds::function_object::function_create;
use crate::runner::ds::object::JsObjectType;
use crate::runner::ds::object_property::{PropertyDescriptor, PropertyKey};
use crate::runner::ds::operations::object::{force_define_property, get_own_property};
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::config::BrokerConfig;
use crate::runner::plugin::entry::{mark_modules_with_trampoline, ExtensionModuleEntry};
use crate::runner::plugin::entry_point::EntryPoint;
use crate::runner::plugin::registry::{BrokerError, NativeModuleRegistry};
use crate::runner::plugin::trampoline::{
    disarm_all, TrampolineInstaller, TrampolineState, TrampolineStatus,
};
use crate::runner::plugin::types::{ExtensionModule, ModuleKind, NativeModule};

lazy_static! {
    static ref REQUIRE_NATIVE_PROP: PropertyKey = PropertyKey::Str("requireNative".to_string());
}

/// State reachable from script callbacks. Callbacks only ever hold a `Weak` to it.
pub(crate) struct BrokerShared {
    pub(crate) context: ContextHandle,
    pub(crate) native_modules: RefCell<NativeModuleRegistry>,
    pub(crate) extension_modules: RefCell<Vec<Rc<ExtensionModuleEntry>>>,
    pub(crate) trampolines: RefCell<Vec<Rc<TrampolineState>>>,
    pub(crate) lock_namespaces: bool,
}

impl BrokerShared {
    pub(crate) fn state_for(&self, entry_point: &EntryPoint) -> Option<Rc<TrampolineState>> {
        self.trampolines
            .borrow()
            .iter()
            .find(|s| s.entry_point() == entry_point)
            .cloned()
    }

    pub(crate) fn owner_of(&self, entry_point: &EntryPoint) -> Option<Rc<ExtensionModuleEntry>> {
        self.state_for(entry_point).and_then(|s| s.entry())
    }

    /// A fresh instance of the named native module, or `undefined`. The registry is
    /// not borrowed while the module builds its instance.
    pub(crate) fn require_native(&self, name: &str) -> JsValue {
        if !self.context.is_live() {
            return JsValue::Undefined;
        }
        let module = self.native_modules.borrow().get(name);
        match module {
            Some(module) => JsValue::Object(module.create_instance()),
            None => {
                debug!(module = %name, "requireNative for unknown module");
                JsValue::Undefined
            }
        }
    }

    fn extension(&self, name: &str) -> Option<Rc<ExtensionModuleEntry>> {
        self.extension_modules
            .borrow()
            .iter()
            .find(|e| e.name() == name)
            .cloned()
    }
}

pub struct ModuleSystem {
    shared: Rc<BrokerShared>,
    config: BrokerConfig,
    pending_extensions: Vec<ExtensionModuleEntry>,
    require_native_fn: Option<JsObjectType>,
    initialized: bool,
    released: bool,
}

impl ModuleSystem {
    pub fn new(context: &Rc<ScriptContext>) -> Self {
        Self::with_config(context, BrokerConfig::default())
    }

    pub fn with_config(context: &Rc<ScriptContext>, config: BrokerConfig) -> Self {
        debug!(context = %context.id(), "module system created");
        ModuleSystem {
            shared: Rc::new(BrokerShared {
                context: ContextHandle::new(context),
                native_modules: RefCell::new(NativeModuleRegistry::new()),
                extension_modules: RefCell::new(Vec::new()),
                trampolines: RefCell::new(Vec::new()),
                lock_namespaces: config.lock_namespaces,
            }),
            config,
            pending_extensions: Vec::new(),
            require_native_fn: None,
            initialized: false,
            released: false,
        }
    }

    /// The context this module system serves, or `None` once it is released.
    pub fn context(&self) -> Option<Rc<ScriptContext>> {
        self.shared.context.get()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn register_native_module(
        &self,
        name: impl Into<String>,
        module: Box<dyn NativeModule>,
    ) -> Result<(), BrokerError> {
        if !self.shared.context.is_live() {
            return Err(BrokerError::ContextReleased);
        }
        self.shared.native_modules.borrow_mut().register(name, module)
    }

    /// Registers an extension under `entry_points`.
    ///
    /// Rejected as a whole, with the earlier registration left in place, if any entry
    /// point is malformed or already claimed by another extension.
    pub fn register_extension_module<S: AsRef<str>>(
        &mut self,
        module: Rc<dyn ExtensionModule>,
        entry_points: &[S],
    ) -> Result<(), BrokerError> {
        let name = module.name().to_string();
        let result = self.check_extension(&name, entry_points);
        match result {
            Ok(paths) => {
                debug!(extension = %name, entry_points = paths.len(), "registered extension module");
                self.pending_extensions
                    .push(ExtensionModuleEntry::new(name, module, paths));
                Ok(())
            }
            Err(e) => {
                warn!(extension = %name, error = %e, "extension registration rejected");
                Err(e)
            }
        }
    }

    fn check_extension<S: AsRef<str>>(
        &self,
        name: &str,
        entry_points: &[S],
    ) -> Result<Vec<EntryPoint>, BrokerError> {
        if !self.shared.context.is_live() {
            return Err(BrokerError::ContextReleased);
        }
        if self.initialized {
            return Err(BrokerError::AlreadyInitialized);
        }
        if entry_points.is_empty() {
            return Err(BrokerError::NoEntryPoints(name.to_string()));
        }
        if self.pending_extensions.iter().any(|e| e.name() == name) {
            return Err(BrokerError::DuplicateExtension(name.to_string()));
        }

        let mut paths = Vec::with_capacity(entry_points.len());
        for entry_point in entry_points {
            let path = EntryPoint::parse(entry_point.as_ref())?;
            if let Some(owner) = self.pending_extensions.iter().find(|e| e.claims(&path)) {
                return Err(BrokerError::DuplicateEntryPoint {
                    entry_point: path.to_string(),
                    extension: name.to_string(),
                    owner: owner.name().to_string(),
                });
            }
            paths.push(path);
        }
        Ok(paths)
    }

    /// Finishes setup for the context. Runs before any script does.
    pub fn initialize(&mut self) -> Result<(), BrokerError> {
        if self.initialized {
            return Err(BrokerError::AlreadyInitialized);
        }
        let context = self.shared.context.get().ok_or(BrokerError::ContextReleased)?;

        let mut entries = std::mem::take(&mut self.pending_extensions);
        mark_modules_with_trampoline(&mut entries);
        let entries: Vec<Rc<ExtensionModuleEntry>> = entries.into_iter().map(Rc::new).collect();
        *self.shared.extension_modules.borrow_mut() = entries.clone();
        self.initialized = true;

        if self.config.expose_require_native {
            self.install_require_native(&context);
        }

        let installer = TrampolineInstaller::new(&self.shared, &context);
        let mut namespaces = BTreeSet::new();
        for entry in &entries {
            for slot in entry.entry_points().iter().filter(|s| s.is_outermost()) {
                match installer.arm(entry, &slot.path) {
                    Ok(()) => {
                        namespaces.insert(slot.path.top_level().to_string());
                    }
                    Err(e) => {
                        warn!(extension = entry.name(), error = %e, "could not install trampoline");
                    }
                }
            }
        }

        if self.config.lock_namespaces {
            for namespace in &namespaces {
                ensure_namespace_is_read_only(&context, namespace);
            }
        }

        info!(
            context = %context.id(),
            extensions = entries.len(),
            namespaces = namespaces.len(),
            "module system initialized"
        );
        Ok(())
    }

    fn install_require_native(&mut self, context: &ScriptContext) {
        let shared: Weak<BrokerShared> = Rc::downgrade(&self.shared);
        let require_native = function_create("requireNative", move |_this, args| {
            let shared = match shared.upgrade() {
                Some(shared) => shared,
                None => return Ok(JsValue::Undefined),
            };
            let instance = match args.first() {
                Some(JsValue::String(name)) => shared.require_native(name),
                _ => {
                    debug!("requireNative called without a module name");
                    JsValue::Undefined
                }
            };
            Ok(instance)
        });
        force_define_property(
            &context.global(),
            REQUIRE_NATIVE_PROP.clone(),
            PropertyDescriptor::Data {
                value: JsValue::Object(require_native.clone()),
                writable: false,
                enumerable: false,
                configurable: false,
            },
        );
        self.require_native_fn = Some(require_native);
    }

    /// A fresh instance of the named native module, or `undefined`.
    pub fn require_native(&self, name: &str) -> JsValue {
        self.shared.require_native(name)
    }

    /// Finds a module by native name first, then by extension name.
    pub fn lookup(&self, name: &str) -> Option<ModuleKind> {
        if let Some(native) = self.shared.native_modules.borrow().get(name) {
            return Some(ModuleKind::Native(native));
        }
        self.shared.extension(name).map(ModuleKind::Extension)
    }

    /// Loads a module by name without going through script: natives give a fresh
    /// instance, extensions are materialized (once) and their trampolines settled.
    pub fn load_module(&self, name: &str) -> JsValue {
        let context = match self.shared.context.get() {
            Some(context) => context,
            None => return JsValue::Undefined,
        };
        let value = match self.lookup(name) {
            Some(ModuleKind::Native(module)) => Some(JsValue::Object(module.create_instance())),
            Some(ModuleKind::Extension(entry)) => {
                TrampolineInstaller::new(&self.shared, &context).load_extension(&entry)
            }
            None => {
                debug!(module = %name, "load of unknown module");
                None
            }
        };
        value.unwrap_or(JsValue::Undefined)
    }

    pub fn extension(&self, name: &str) -> Option<Rc<ExtensionModuleEntry>> {
        self.shared.extension(name)
    }

    pub fn extensions(&self) -> Vec<Rc<ExtensionModuleEntry>> {
        self.shared.extension_modules.borrow().clone()
    }

    pub fn trampoline_status(&self, entry_point: &str) -> TrampolineStatus {
        EntryPoint::parse(entry_point)
            .ok()
            .and_then(|path| self.shared.state_for(&path))
            .map(|state| state.status())
            .unwrap_or(TrampolineStatus::Uninstalled)
    }

    /// Entry points currently waiting behind a trampoline, sorted.
    pub fn armed_entry_points(&self) -> Vec<String> {
        let mut armed: Vec<String> = self
            .shared
            .trampolines
            .borrow()
            .iter()
            .filter(|s| s.status() == TrampolineStatus::Armed)
            .map(|s| s.entry_point().to_string())
            .collect();
        armed.sort();
        armed
    }

    /// Releases everything tied to the context. The context handle is severed first so
    /// that any callback racing this sees a dead context. Safe to call more than once.
    pub fn teardown(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let context = self.shared.context.revoke();

        let disarmed = disarm_all(&self.shared);
        if let (Some(context), Some(require_native)) = (&context, self.require_native_fn.take()) {
            let global = context.global();
            let ours = match get_own_property(&global, &REQUIRE_NATIVE_PROP) {
                Some(PropertyDescriptor::Data {
                    value: JsValue::Object(f),
                    ..
                }) => Rc::ptr_eq(&f, &require_native),
                _ => false,
            };
            if ours {
                (*global)
                    .borrow_mut()
                    .as_js_object_mut()
                    .force_delete(&REQUIRE_NATIVE_PROP);
            }
        }

        self.shared.extension_modules.borrow_mut().clear();
        self.shared.native_modules.borrow_mut().clear();
        self.pending_extensions.clear();
        info!(disarmed, "module system torn down");
    }
}

impl Drop for ModuleSystem {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Makes the global `namespace` binding non-configurable, and non-writable when it is
/// a data property. Only privileged redefinition can change it afterwards.
fn ensure_namespace_is_read_only(context: &ScriptContext, namespace: &str) {
    let global = context.global();
    let key = PropertyKey::from(namespace);
    if let Some(descriptor) = get_own_property(&global, &key) {
        force_define_property(&global, key, descriptor.locked());
        debug!(namespace = %namespace, "namespace locked read-only");
    }
}
