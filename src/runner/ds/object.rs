use crate::runner::ds::function_object::JsFunctionObject;
use crate::runner::ds::object_property::{same_function, PropertyDescriptor, PropertyKey};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub type JsObjectType = Rc<RefCell<ObjectType>>;

pub enum ObjectType {
    Ordinary(Box<dyn JsObject>),
    Function(Box<dyn JsFunctionObject>),
}
impl ObjectType {
    pub fn is_callable(&self) -> bool {
        match self {
            ObjectType::Function(_) => true,
            _ => false,
        }
    }

    pub fn as_js_object(&self) -> &dyn JsObject {
        match self {
            ObjectType::Ordinary(o) => o.as_super_trait(),
            ObjectType::Function(o) => o.as_super_trait(),
        }
    }

    pub fn as_js_object_mut(&mut self) -> &mut dyn JsObject {
        match self {
            ObjectType::Ordinary(o) => o.as_super_trait_mut(),
            ObjectType::Function(o) => o.as_super_trait_mut(),
        }
    }

    pub fn as_function(&self) -> Option<&dyn JsFunctionObject> {
        match self {
            ObjectType::Function(f) => Some(f.as_ref()),
            _ => None,
        }
    }
}

pub struct ObjectBase {
    properties: HashMap<PropertyKey, PropertyDescriptor>,
}
impl ObjectBase {
    pub fn new() -> Self {
        ObjectBase {
            properties: HashMap::new(),
        }
    }
}
impl Default for ObjectBase {
    fn default() -> Self {
        Self::new()
    }
}

pub trait JsObject {
    fn get_object_base_mut(&mut self) -> &mut ObjectBase;

    fn get_object_base(&self) -> &ObjectBase;

    fn as_super_trait(&self) -> &dyn JsObject;

    fn as_super_trait_mut(&mut self) -> &mut dyn JsObject;

    fn get_own_property(&self, property: &PropertyKey) -> Option<&PropertyDescriptor> {
        self.get_object_base().properties.get(property)
    }

    /// Script-level definition. Honours the configurable/writable flags of an existing
    /// property.
    fn define_own_property(&mut self, property: PropertyKey, descriptor: PropertyDescriptor) -> bool {
        ordinary_define_own_property(self, property, descriptor)
    }

    /// Host-level definition. Replaces whatever is there; script cannot reach this.
    fn force_define_own_property(&mut self, property: PropertyKey, descriptor: PropertyDescriptor) {
        self.get_object_base_mut()
            .properties
            .insert(property, descriptor);
    }

    fn force_delete(&mut self, property: &PropertyKey) -> Option<PropertyDescriptor> {
        self.get_object_base_mut().properties.remove(property)
    }

    fn to_string(&self) -> String {
        "object".to_string()
    }
}

pub fn ordinary_define_own_property<J: JsObject + ?Sized>(
    o: &mut J,
    property: PropertyKey,
    descriptor: PropertyDescriptor,
) -> bool {
    if let Some(current_descriptor) = o.get_own_property(&property) {
        if current_descriptor == &descriptor {
            return true;
        }
        if !current_descriptor.is_configurable() {
            if descriptor.is_configurable()
                || current_descriptor.is_enumerable() != descriptor.is_enumerable()
            {
                return false;
            }
            match (current_descriptor, &descriptor) {
                (
                    PropertyDescriptor::Data {
                        value: current_value,
                        writable: current_writable,
                        ..
                    },
                    PropertyDescriptor::Data {
                        value: desc_value,
                        writable: desc_writable,
                        ..
                    },
                ) => {
                    if !*current_writable && (*desc_writable || !current_value.same_value(desc_value))
                    {
                        return false;
                    }
                }
                (
                    PropertyDescriptor::Accessor {
                        get: current_get,
                        set: current_set,
                        ..
                    },
                    PropertyDescriptor::Accessor {
                        get: desc_get,
                        set: desc_set,
                        ..
                    },
                ) => {
                    if !same_function(current_get, desc_get) || !same_function(current_set, desc_set)
                    {
                        return false;
                    }
                }
                // A non-configurable property can never change kind.
                _ => return false,
            }
        }
    }
    o.get_object_base_mut()
        .properties
        .insert(property, descriptor);
    true
}

/// Plain object with no exotic behaviour.
pub struct SimpleObject {
    base: ObjectBase,
}
impl SimpleObject {
    pub fn new() -> Self {
        SimpleObject {
            base: ObjectBase::new(),
        }
    }
}
impl Default for SimpleObject {
    fn default() -> Self {
        Self::new()
    }
}
impl JsObject for SimpleObject {
    fn get_object_base_mut(&mut self) -> &mut ObjectBase {
        &mut self.base
    }

    fn get_object_base(&self) -> &ObjectBase {
        &self.base
    }

    fn as_super_trait(&self) -> &dyn JsObject {
        self
    }

    fn as_super_trait_mut(&mut self) -> &mut dyn JsObject {
        self
    }
}

pub fn object_create() -> JsObjectType {
    Rc::new(RefCell::new(ObjectType::Ordinary(Box::new(SimpleObject::new()))))
}
