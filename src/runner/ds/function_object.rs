use std::cell::RefCell;
use std::rc::Rc;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object::{JsObject, JsObjectType, ObjectBase, ObjectType};
use crate::runner::ds::value::JsValue;

/// Host-provided function body. Receives `this` and the argument list.
pub type NativeFn = Rc<dyn Fn(JsValue, Vec<JsValue>) -> Result<JsValue, JErrorType>>;

pub trait JsFunctionObject: JsObject {
    fn name(&self) -> &str;

    /// The callable behaviour. Returned as a shared handle so callers can drop their
    /// borrow of the function object before invoking it.
    fn behaviour(&self) -> NativeFn;
}

pub struct NativeFunctionObject {
    name: String,
    behaviour: NativeFn,
    object_base: ObjectBase,
}
impl NativeFunctionObject {
    pub fn new(name: impl Into<String>, behaviour: NativeFn) -> Self {
        NativeFunctionObject {
            name: name.into(),
            behaviour,
            object_base: ObjectBase::new(),
        }
    }
}
impl JsObject for NativeFunctionObject {
    fn get_object_base_mut(&mut self) -> &mut ObjectBase {
        &mut self.object_base
    }

    fn get_object_base(&self) -> &ObjectBase {
        &self.object_base
    }

    fn as_super_trait(&self) -> &dyn JsObject {
        self
    }

    fn as_super_trait_mut(&mut self) -> &mut dyn JsObject {
        self
    }

    fn to_string(&self) -> String {
        format!("function {}() {{ [native code] }}", self.name)
    }
}
impl JsFunctionObject for NativeFunctionObject {
    fn name(&self) -> &str {
        &self.name
    }

    fn behaviour(&self) -> NativeFn {
        self.behaviour.clone()
    }
}

pub fn function_create<F>(name: impl Into<String>, behaviour: F) -> JsObjectType
where
    F: Fn(JsValue, Vec<JsValue>) -> Result<JsValue, JErrorType> + 'static,
{
    Rc::new(RefCell::new(ObjectType::Function(Box::new(
        NativeFunctionObject::new(name, Rc::new(behaviour)),
    ))))
}
