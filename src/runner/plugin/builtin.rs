//! Native modules shipped with the broker.

use tracing::warn;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::function_object::function_create;
use crate::runner::ds::object::{object_create, JsObjectType};
use crate::runner::ds::object_property::{PropertyDescriptor, PropertyKey};
use crate::runner::ds::operations::object::{create_data_property, force_define_property, get_own_property};
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::module_system::ModuleSystem;
use crate::runner::plugin::types::NativeModule;

pub const OBJECT_TOOLS: &str = "objecttools";

/// `requireNative("objecttools")`: property helpers that script cannot express itself.
pub struct ObjectToolsModule;

impl NativeModule for ObjectToolsModule {
    fn create_instance(&self) -> JsObjectType {
        let tools = object_create();
        create_data_property(
            &tools,
            "forceSetProperty",
            JsValue::Object(function_create("forceSetProperty", force_set_property)),
        );
        create_data_property(
            &tools,
            "isAccessorProperty",
            JsValue::Object(function_create("isAccessorProperty", is_accessor_property)),
        );
        tools
    }
}

fn target_and_key(args: &[JsValue]) -> Option<(JsObjectType, PropertyKey)> {
    match (args.get(0), args.get(1)) {
        (Some(JsValue::Object(o)), Some(JsValue::String(name))) => {
            Some((o.clone(), PropertyKey::from(name.as_str())))
        }
        _ => None,
    }
}

fn force_set_property(_this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let (target, key) = match target_and_key(&args) {
        Some(pair) => pair,
        None => return Ok(JsValue::Boolean(false)),
    };
    let value = args.get(2).cloned().unwrap_or(JsValue::Undefined);
    force_define_property(&target, key, PropertyDescriptor::new_data(value));
    Ok(JsValue::Boolean(true))
}

fn is_accessor_property(_this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let is_accessor = target_and_key(&args)
        .and_then(|(target, key)| get_own_property(&target, &key))
        .map(|d| d.is_accessor_descriptor())
        .unwrap_or(false);
    Ok(JsValue::Boolean(is_accessor))
}

/// Registers every known built-in listed in `names`. Unknown names are skipped.
pub fn register_builtins<S: AsRef<str>>(module_system: &ModuleSystem, names: &[S]) {
    for name in names {
        let name = name.as_ref();
        let result = match name {
            OBJECT_TOOLS => module_system.register_native_module(name, Box::new(ObjectToolsModule)),
            _ => {
                warn!(module = %name, "no built-in native module by that name");
                continue;
            }
        };
        if let Err(e) = result {
            warn!(module = %name, error = %e, "built-in native module not registered");
        }
    }
}
