use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object::JsObjectType;
use crate::runner::ds::object_property::{PropertyDescriptor, PropertyKey};
use crate::runner::ds::value::JsValue;

/// Raw own-property lookup. Never fires accessors.
pub fn get_own_property(o: &JsObjectType, p: &PropertyKey) -> Option<PropertyDescriptor> {
    (**o).borrow().as_js_object().get_own_property(p).cloned()
}

/// Script-level [[Get]]. The borrow on `o` is released before a getter runs, so the
/// getter is free to redefine the property it was reached through.
pub fn get(o: &JsObjectType, p: &PropertyKey) -> Result<JsValue, JErrorType> {
    match get_own_property(o, p) {
        None => Ok(JsValue::Undefined),
        Some(PropertyDescriptor::Data { value, .. }) => Ok(value),
        Some(PropertyDescriptor::Accessor { get, .. }) => match get {
            None => Ok(JsValue::Undefined),
            Some(getter) => call(&getter, JsValue::Object(o.clone()), Vec::new()),
        },
    }
}

pub fn get_v(v: &JsValue, p: &PropertyKey) -> Result<JsValue, JErrorType> {
    match v {
        JsValue::Object(o) => get(o, p),
        JsValue::Undefined | JsValue::Null => Err(JErrorType::TypeError(format!(
            "Cannot read property '{}' of {}",
            p, v
        ))),
        _ => Ok(JsValue::Undefined),
    }
}

/// Script-level [[Set]]. Returns `Ok(false)` when the write is silently refused, as a
/// sloppy-mode assignment would be.
pub fn set(o: &JsObjectType, p: PropertyKey, value: JsValue) -> Result<bool, JErrorType> {
    match get_own_property(o, &p) {
        None => {
            let mut ot = (**o).borrow_mut();
            Ok(ot
                .as_js_object_mut()
                .define_own_property(p, PropertyDescriptor::new_data(value)))
        }
        Some(PropertyDescriptor::Data {
            writable,
            enumerable,
            configurable,
            ..
        }) => {
            if writable {
                let mut ot = (**o).borrow_mut();
                Ok(ot.as_js_object_mut().define_own_property(
                    p,
                    PropertyDescriptor::Data {
                        value,
                        writable,
                        enumerable,
                        configurable,
                    },
                ))
            } else {
                Ok(false)
            }
        }
        Some(PropertyDescriptor::Accessor { set, .. }) => match set {
            None => Ok(false),
            Some(setter) => {
                call(&setter, JsValue::Object(o.clone()), vec![value])?;
                Ok(true)
            }
        },
    }
}

pub fn call(f: &JsObjectType, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let behaviour = match (**f).borrow().as_function() {
        Some(func) => func.behaviour(),
        None => {
            return Err(JErrorType::TypeError(format!(
                "{} is not a function",
                (**f).borrow().as_js_object().to_string()
            )))
        }
    };
    behaviour(this, args)
}

pub fn define_property_or_throw(
    o: &JsObjectType,
    p: PropertyKey,
    desc: PropertyDescriptor,
) -> Result<(), JErrorType> {
    let message = format!("Cannot redefine property: {}", p);
    let success = (**o).borrow_mut().as_js_object_mut().define_own_property(p, desc);
    if success {
        Ok(())
    } else {
        Err(JErrorType::TypeError(message))
    }
}

pub fn force_define_property(o: &JsObjectType, p: PropertyKey, desc: PropertyDescriptor) {
    (**o)
        .borrow_mut()
        .as_js_object_mut()
        .force_define_own_property(p, desc);
}

pub fn create_data_property(o: &JsObjectType, p: impl Into<PropertyKey>, value: JsValue) -> bool {
    (**o)
        .borrow_mut()
        .as_js_object_mut()
        .define_own_property(p.into(), PropertyDescriptor::new_data(value))
}
