//! # just-broker - lazy module broker for script contexts
//!
//! Gives every script context a module system that exposes:
//! - **native modules**, handed out by the global `requireNative(name)` function
//! - **extension modules**, reachable at dotted entry points (`tizen.sensor`) and
//!   materialized only when script first touches them
//!
//! ## Quick Start
//!
//! ```
//! use std::rc::Rc;
//! use just_broker::runner::ds::context::ScriptContext;
//! use just_broker::runner::ds::object::object_create;
//! use just_broker::runner::ds::operations::object::create_data_property;
//! use just_broker::runner::ds::value::JsValue;
//! use just_broker::runner::plugin::{
//!     BrokerConfig, ExtensionClient, ExtensionInfo, ExtensionModule, MaterializeError,
//!     ScriptContextController,
//! };
//!
//! struct Sensor;
//!
//! impl ExtensionModule for Sensor {
//!     fn name(&self) -> &str { "sensor" }
//!
//!     fn materialize(&self, _ctx: &ScriptContext) -> Result<JsValue, MaterializeError> {
//!         let module = object_create();
//!         create_data_property(&module, "version", JsValue::from(2i64));
//!         Ok(JsValue::Object(module))
//!     }
//! }
//!
//! struct Client;
//!
//! impl ExtensionClient for Client {
//!     fn extensions(&self) -> Vec<ExtensionInfo> {
//!         vec![ExtensionInfo::new("sensor").with_entry_points(vec!["tizen.sensor"])]
//!     }
//!
//!     fn create_module(&self, _info: &ExtensionInfo) -> Rc<dyn ExtensionModule> {
//!         Rc::new(Sensor)
//!     }
//! }
//!
//! let mut controller = ScriptContextController::new(Box::new(Client), BrokerConfig::default());
//! controller.initialize_extensions();
//!
//! let context = ScriptContext::new();
//! controller.did_create_script_context(&context);
//!
//! // First touch materializes the extension.
//! let version = context.eval_path("tizen.sensor.version").unwrap();
//! assert_eq!(version, JsValue::from(2i64));
//!
//! // Native modules go through requireNative.
//! let tools = context
//!     .call_global("requireNative", vec![JsValue::from("objecttools")])
//!     .unwrap();
//! assert!(tools.as_object().is_some());
//!
//! controller.will_release_script_context(&context);
//! ```
//!
//! ## Architecture
//!
//! - **[`runner::ds`]** - Host object model (values, objects, property descriptors,
//!   script contexts)
//! - **[`runner::plugin`]** - Module registries, entry points, trampolines and the
//!   per-context controller
//! - **[`runtime`]** - Locale fallback resolution
//! - **[`utils`]** - String helpers

#[macro_use]
extern crate lazy_static;

pub mod runner;
pub mod runtime;
pub mod utils;
