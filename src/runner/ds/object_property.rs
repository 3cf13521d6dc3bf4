use std::fmt;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

use crate::runner::ds::object::JsObjectType;
use crate::runner::ds::value::JsValue;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    Str(String),
}
impl Display for PropertyKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::Str(s) => write!(f, "{}", s),
        }
    }
}
impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        PropertyKey::Str(s.to_string())
    }
}
impl From<String> for PropertyKey {
    fn from(s: String) -> Self {
        PropertyKey::Str(s)
    }
}

#[derive(Clone)]
pub enum PropertyDescriptor {
    Data {
        value: JsValue,
        writable: bool,
        enumerable: bool,
        configurable: bool,
    },
    Accessor {
        get: Option<JsObjectType>,
        set: Option<JsObjectType>,
        enumerable: bool,
        configurable: bool,
    },
}
impl PropertyDescriptor {
    /// A writable, enumerable, configurable data property; what plain assignment creates.
    pub fn new_data(value: JsValue) -> Self {
        PropertyDescriptor::Data {
            value,
            writable: true,
            enumerable: true,
            configurable: true,
        }
    }

    pub fn is_enumerable(&self) -> bool {
        match self {
            PropertyDescriptor::Data { enumerable, .. } => *enumerable,
            PropertyDescriptor::Accessor { enumerable, .. } => *enumerable,
        }
    }

    pub fn is_configurable(&self) -> bool {
        match self {
            PropertyDescriptor::Data { configurable, .. } => *configurable,
            PropertyDescriptor::Accessor { configurable, .. } => *configurable,
        }
    }

    pub fn is_data_descriptor(&self) -> bool {
        match self {
            PropertyDescriptor::Data { .. } => true,
            PropertyDescriptor::Accessor { .. } => false,
        }
    }

    pub fn is_accessor_descriptor(&self) -> bool {
        !self.is_data_descriptor()
    }

    /// Returns the same descriptor with `writable` (data only) and `configurable` cleared.
    pub fn locked(&self) -> Self {
        match self {
            PropertyDescriptor::Data {
                value, enumerable, ..
            } => PropertyDescriptor::Data {
                value: value.clone(),
                writable: false,
                enumerable: *enumerable,
                configurable: false,
            },
            PropertyDescriptor::Accessor {
                get,
                set,
                enumerable,
                ..
            } => PropertyDescriptor::Accessor {
                get: get.clone(),
                set: set.clone(),
                enumerable: *enumerable,
                configurable: false,
            },
        }
    }
}
impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PropertyDescriptor::Data {
                value,
                writable,
                enumerable,
                configurable,
            } => write!(
                f,
                "Data {{ value: {:?}, writable: {}, enumerable: {}, configurable: {} }}",
                value, writable, enumerable, configurable
            ),
            PropertyDescriptor::Accessor {
                get,
                set,
                enumerable,
                configurable,
            } => write!(
                f,
                "Accessor {{ get: {}, set: {}, enumerable: {}, configurable: {} }}",
                get.is_some(),
                set.is_some(),
                enumerable,
                configurable
            ),
        }
    }
}
impl PartialEq for PropertyDescriptor {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                PropertyDescriptor::Data {
                    value,
                    writable,
                    enumerable,
                    configurable,
                },
                PropertyDescriptor::Data {
                    value: other_value,
                    writable: other_writable,
                    enumerable: other_enumerable,
                    configurable: other_configurable,
                },
            ) => {
                value.same_value(other_value)
                    && writable == other_writable
                    && enumerable == other_enumerable
                    && configurable == other_configurable
            }
            (
                PropertyDescriptor::Accessor {
                    get: getter,
                    set: setter,
                    enumerable,
                    configurable,
                },
                PropertyDescriptor::Accessor {
                    get: other_getter,
                    set: other_setter,
                    enumerable: other_enumerable,
                    configurable: other_configurable,
                },
            ) => {
                same_function(getter, other_getter)
                    && same_function(setter, other_setter)
                    && enumerable == other_enumerable
                    && configurable == other_configurable
            }
            _ => false,
        }
    }
}

pub(crate) fn same_function(a: &Option<JsObjectType>, b: &Option<JsObjectType>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        _ => false,
    }
}
