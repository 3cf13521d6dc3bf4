//! Module broker: native modules, extension modules and lazy trampolines.
//!
//! Every script context gets its own [`ModuleSystem`]. It knows two kinds of modules:
//!
//! - **Native modules** ([`NativeModule`]) live in-process and are handed to script
//!   through the global `requireNative(name)` function. Each call builds a fresh
//!   instance.
//! - **Extension modules** ([`ExtensionModule`]) are backed by something expensive
//!   (a process, an IPC channel) and claim one or more dotted *entry points* such as
//!   `tizen.sensor`. They are never loaded up front.
//!
//! ## Trampolines
//!
//! At initialize time each outermost entry point gets an accessor pair, the
//! *trampoline*. Touching it (read or write) materializes the owning extension once,
//! swaps the accessor for a data property holding the module value, and arms any
//! entry points nested inside it:
//!
//! ```text
//! initialize          tizen.sensor = <trampoline>     ARMED
//! read tizen.sensor   materialize("sensor")           MATERIALIZED
//!                     tizen.sensor.light = <trampoline>   ARMED
//! teardown            remaining trampolines removed   TORN_DOWN
//! ```
//!
//! Entry points nested under another entry point (by dotted path, not by extension
//! name) ride on the outer trampoline; see [`entry::mark_modules_with_trampoline`].
//!
//! Top-level namespaces holding entry points are made read-only once armed, so script
//! cannot replace `tizen` with its own object.
//!
//! ## Example
//!
//! ```
//! use std::rc::Rc;
//! use just_broker::runner::ds::context::ScriptContext;
//! use just_broker::runner::ds::object::object_create;
//! use just_broker::runner::ds::value::JsValue;
//! use just_broker::runner::plugin::{ExtensionModule, MaterializeError, ModuleSystem};
//!
//! struct Clock;
//!
//! impl ExtensionModule for Clock {
//!     fn name(&self) -> &str { "clock" }
//!
//!     fn materialize(&self, _ctx: &ScriptContext) -> Result<JsValue, MaterializeError> {
//!         Ok(JsValue::Object(object_create()))
//!     }
//! }
//!
//! let context = ScriptContext::new();
//! let mut modules = ModuleSystem::new(&context);
//! modules.register_extension_module(Rc::new(Clock), &["sys.clock"]).unwrap();
//! modules.initialize().unwrap();
//!
//! // Nothing is loaded until script touches the entry point.
//! assert_eq!(modules.armed_entry_points(), vec!["sys.clock".to_string()]);
//! let clock = context.eval_path("sys.clock").unwrap();
//! assert!(clock.as_object().is_some());
//! assert!(modules.armed_entry_points().is_empty());
//! ```

pub mod builtin;
pub mod config;
pub mod controller;
pub mod entry;
pub mod entry_point;
pub mod module_system;
pub mod registry;
pub mod trampoline;
pub mod types;

pub use builtin::ObjectToolsModule;
pub use config::BrokerConfig;
pub use controller::ScriptContextController;
pub use entry::{Binding, ExtensionModuleEntry};
pub use entry_point::EntryPoint;
pub use module_system::ModuleSystem;
pub use registry::{BrokerError, NativeModuleRegistry};
pub use trampoline::TrampolineStatus;
pub use types::{
    ExtensionClient, ExtensionInfo, ExtensionModule, MaterializeError, ModuleKind, NativeModule,
};
