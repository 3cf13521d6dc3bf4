//! Script contexts and the revocable handle the module system keeps on them.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use uuid::Uuid;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object::{object_create, JsObjectType};
use crate::runner::ds::object_property::PropertyKey;
use crate::runner::ds::operations::object::{call, get, get_v, set};
use crate::runner::ds::value::JsValue;

/// One script global scope. The host owns it through an `Rc`; everything else holds
/// a [`ContextHandle`].
pub struct ScriptContext {
    id: Uuid,
    global: JsObjectType,
}

impl ScriptContext {
    pub fn new() -> Rc<Self> {
        Rc::new(ScriptContext {
            id: Uuid::new_v4(),
            global: object_create(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn global(&self) -> JsObjectType {
        self.global.clone()
    }

    /// Evaluates a dotted member expression (`a.b.c`) against the global object,
    /// firing accessors exactly as script would.
    pub fn eval_path(&self, path: &str) -> Result<JsValue, JErrorType> {
        let mut segments = path.split('.');
        let first = segments
            .next()
            .ok_or_else(|| JErrorType::SyntaxError("empty member expression".to_string()))?;
        let mut value = get(&self.global, &PropertyKey::from(first))?;
        for segment in segments {
            value = get_v(&value, &PropertyKey::from(segment))?;
        }
        Ok(value)
    }

    /// Evaluates `a.b.c = value`. Returns whether the assignment was accepted; a write
    /// handed to an accessor's setter counts as accepted whatever the setter does with it.
    pub fn assign_path(&self, path: &str, value: JsValue) -> Result<bool, JErrorType> {
        let (holder_path, leaf) = match path.rfind('.') {
            Some(pos) => (Some(&path[..pos]), &path[pos + 1..]),
            None => (None, path),
        };
        let holder = match holder_path {
            None => self.global.clone(),
            Some(holder_path) => match self.eval_path(holder_path)? {
                JsValue::Object(o) => o,
                other => {
                    return Err(JErrorType::TypeError(format!(
                        "Cannot set property '{}' of {}",
                        leaf, other
                    )))
                }
            },
        };
        set(&holder, PropertyKey::from(leaf), value)
    }

    /// Calls a global function by name, e.g. `requireNative("objecttools")`.
    pub fn call_global(&self, name: &str, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
        match get(&self.global, &PropertyKey::from(name))? {
            JsValue::Object(f) if (*f).borrow().is_callable() => {
                call(&f, JsValue::Object(self.global.clone()), args)
            }
            _ => Err(JErrorType::ReferenceError(format!("{} is not defined", name))),
        }
    }
}

impl fmt::Debug for ScriptContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScriptContext({})", self.id)
    }
}

/// Non-owning, revocable reference to a [`ScriptContext`].
///
/// `get` fails once the host has dropped the context or once the handle has been
/// revoked, whichever comes first.
pub struct ContextHandle {
    context: RefCell<Option<Weak<ScriptContext>>>,
}

impl ContextHandle {
    pub fn new(context: &Rc<ScriptContext>) -> Self {
        ContextHandle {
            context: RefCell::new(Some(Rc::downgrade(context))),
        }
    }

    pub fn get(&self) -> Option<Rc<ScriptContext>> {
        self.context.borrow().as_ref().and_then(Weak::upgrade)
    }

    pub fn is_live(&self) -> bool {
        self.get().is_some()
    }

    /// Severs the handle, handing back the context if it is still alive so the caller
    /// can finish its own cleanup against it.
    pub fn revoke(&self) -> Option<Rc<ScriptContext>> {
        self.context.borrow_mut().take().and_then(|w| w.upgrade())
    }
}
