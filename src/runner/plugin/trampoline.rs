//! Lazy-loading trampolines.
//!
//! A trampoline is an accessor pair installed where an extension should appear. The
//! first read or write through it materializes the owning extension, replaces every
//! armed accessor of that extension with a plain data property holding the result,
//! and arms whatever entry points were hanging off the newly materialized paths.
//!
//! ```text
//! tizen.sensor.light            (script)
//!   |
//!   v
//! get tizen.sensor  --> accessor, ARMED
//!   |  materialize "sensor" extension (once)
//!   |  tizen.sensor := <module>      data property, MATERIALIZED
//!   |  arm tizen.sensor.light        accessor on <module>, ARMED
//!   v
//! get light  --> accessor, ARMED --> materialize "light" extension ...
//! ```
//!
//! Per entry point the lifecycle is `Uninstalled -> Armed -> Materialized`, or
//! `Uninstalled -> Armed -> TornDown` when the context goes away first.
//!
//! Callbacks hold only a `Weak` reference to the module system and check the context
//! handle before doing anything, so an accessor that outlives its module system
//! resolves to `undefined`.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::{debug, info, trace, warn};

use crate::runner::ds::context::ScriptContext;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::function_object::function_create;
use crate::runner::ds::object::{object_create, JsObjectType, ObjectType};
use crate::runner::ds::object_property::{PropertyDescriptor, PropertyKey};
use crate::runner::ds::operations::object::{force_define_property, get_own_property, set};
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::entry::ExtensionModuleEntry;
use crate::runner::plugin::entry_point::EntryPoint;
use crate::runner::plugin::module_system::BrokerShared;
use crate::runner::plugin::registry::BrokerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrampolineStatus {
    Uninstalled,
    Armed,
    Materialized,
    TornDown,
}

/// Bookkeeping for one interception point.
pub struct TrampolineState {
    entry_point: EntryPoint,
    entry: Weak<ExtensionModuleEntry>,
    holder: Weak<RefCell<ObjectType>>,
    getter: Option<JsObjectType>,
    status: Cell<TrampolineStatus>,
}

impl TrampolineState {
    pub fn entry_point(&self) -> &EntryPoint {
        &self.entry_point
    }

    pub fn status(&self) -> TrampolineStatus {
        self.status.get()
    }

    pub fn entry(&self) -> Option<Rc<ExtensionModuleEntry>> {
        self.entry.upgrade()
    }

    fn set_status(&self, status: TrampolineStatus) {
        self.status.set(status);
    }

    /// True if the holder still carries the accessor this state installed.
    fn owns_accessor(&self, holder: &JsObjectType) -> bool {
        match (&self.getter, get_own_property(holder, &self.entry_point.leaf_key())) {
            (Some(ours), Some(PropertyDescriptor::Accessor { get: Some(theirs), .. })) => {
                Rc::ptr_eq(ours, &theirs)
            }
            _ => false,
        }
    }
}

/// Installs and fires trampolines for one module system against one live context.
pub(crate) struct TrampolineInstaller<'a> {
    shared: &'a Rc<BrokerShared>,
    context: &'a ScriptContext,
}

impl<'a> TrampolineInstaller<'a> {
    pub(crate) fn new(shared: &'a Rc<BrokerShared>, context: &'a ScriptContext) -> Self {
        TrampolineInstaller { shared, context }
    }

    /// Walks the holder segments of `entry_point` from the global object using raw
    /// own-property reads, so no accessor fires on the way.
    pub(crate) fn resolve_holder(
        &self,
        entry_point: &EntryPoint,
        create: bool,
    ) -> Result<JsObjectType, BrokerError> {
        let invalid = |reason: String| BrokerError::InvalidHolder {
            entry_point: entry_point.to_string(),
            reason,
        };

        let mut holder = self.context.global();
        for segment in entry_point.holder_segments() {
            let key = PropertyKey::from(segment.as_str());
            let next = match get_own_property(&holder, &key) {
                Some(PropertyDescriptor::Data {
                    value: JsValue::Object(o),
                    ..
                }) => o,
                Some(PropertyDescriptor::Data { value, .. }) => {
                    return Err(invalid(format!("'{}' holds {}, not an object", segment, value)))
                }
                Some(PropertyDescriptor::Accessor { .. }) => {
                    return Err(invalid(format!("'{}' is not materialized yet", segment)))
                }
                None if create => {
                    let o = object_create();
                    let defined = (*holder).borrow_mut().as_js_object_mut().define_own_property(
                        key,
                        PropertyDescriptor::new_data(JsValue::Object(o.clone())),
                    );
                    if !defined {
                        return Err(invalid(format!("cannot create namespace '{}'", segment)));
                    }
                    trace!(entry_point = %entry_point, namespace = %segment, "created namespace object");
                    o
                }
                None => return Err(invalid(format!("'{}' does not exist", segment))),
            };
            holder = next;
        }
        Ok(holder)
    }

    /// UNINSTALLED -> ARMED for one entry point.
    pub(crate) fn arm(
        &self,
        entry: &Rc<ExtensionModuleEntry>,
        entry_point: &EntryPoint,
    ) -> Result<(), BrokerError> {
        if self.shared.state_for(entry_point).is_some() {
            trace!(entry_point = %entry_point, "entry point already has a trampoline");
            return Ok(());
        }

        let holder = self.resolve_holder(entry_point, true)?;
        let key = entry_point.leaf_key();
        if let Some(existing) = get_own_property(&holder, &key) {
            if !existing.is_configurable() {
                return Err(BrokerError::InvalidHolder {
                    entry_point: entry_point.to_string(),
                    reason: format!("'{}' is a non-configurable property", key),
                });
            }
            debug!(entry_point = %entry_point, "trampoline replaces an existing property");
        }

        let weak = Rc::downgrade(self.shared);
        let getter = trampoline_getter(weak.clone(), entry_point.clone());
        let setter = trampoline_setter(weak, entry_point.clone());
        force_define_property(
            &holder,
            key,
            PropertyDescriptor::Accessor {
                get: Some(getter.clone()),
                set: Some(setter),
                enumerable: true,
                configurable: true,
            },
        );

        self.shared.trampolines.borrow_mut().push(Rc::new(TrampolineState {
            entry_point: entry_point.clone(),
            entry: Rc::downgrade(entry),
            holder: Rc::downgrade(&holder),
            getter: Some(getter),
            status: Cell::new(TrampolineStatus::Armed),
        }));
        debug!(extension = entry.name(), entry_point = %entry_point, "trampoline armed");
        Ok(())
    }

    /// Materializes `entry` at most once and settles every armed accessor it owns.
    ///
    /// Returns `None` on failure, on re-entry while already materializing, and when the
    /// context is released during the call.
    pub(crate) fn load_extension(&self, entry: &Rc<ExtensionModuleEntry>) -> Option<JsValue> {
        if let Some(value) = entry.materialized() {
            return Some(value);
        }
        if entry.is_materializing() {
            debug!(extension = entry.name(), "re-entrant access while materializing");
            return None;
        }

        entry.set_materializing(true);
        let result = entry.module().materialize(self.context);
        entry.set_materializing(false);

        if !self.shared.context.is_live() {
            debug!(extension = entry.name(), "context released while materializing, discarding");
            return None;
        }

        match result {
            Err(e) => {
                warn!(extension = entry.name(), error = %e, "failed to materialize extension");
                None
            }
            Ok(value) => {
                info!(extension = entry.name(), "extension materialized");
                entry.set_materialized(value.clone());
                for slot in entry.entry_points() {
                    self.settle(&slot.path, &value);
                }
                Some(value)
            }
        }
    }

    /// ARMED -> MATERIALIZED: swap the accessor for a data property, then reveal the
    /// entry points nested under it.
    fn settle(&self, entry_point: &EntryPoint, value: &JsValue) {
        let state = match self.shared.state_for(entry_point) {
            Some(state) if state.status() == TrampolineStatus::Armed => state,
            _ => return,
        };
        let holder = match state.holder.upgrade() {
            Some(holder) => holder,
            None => {
                state.set_status(TrampolineStatus::TornDown);
                return;
            }
        };
        force_define_property(
            &holder,
            entry_point.leaf_key(),
            self.materialized_descriptor(entry_point, value.clone()),
        );
        state.set_status(TrampolineStatus::Materialized);
        trace!(entry_point = %entry_point, "trampoline replaced by module value");
        self.reveal_children(entry_point);
    }

    /// Entry points whose nearest ancestor is `parent` become reachable now.
    fn reveal_children(&self, parent: &EntryPoint) {
        let children: Vec<(Rc<ExtensionModuleEntry>, EntryPoint)> = self
            .shared
            .extension_modules
            .borrow()
            .iter()
            .flat_map(|entry| {
                entry
                    .entry_points()
                    .iter()
                    .filter(move |slot| slot.subsumed_by.as_ref() == Some(parent))
                    .map(move |slot| (entry.clone(), slot.path.clone()))
            })
            .collect();

        for (entry, path) in children {
            match entry.materialized() {
                Some(value) => {
                    if let Err(e) = self.define_revealed(&entry, &path, value) {
                        warn!(extension = entry.name(), error = %e, "could not expose nested entry point");
                    }
                }
                None => {
                    if let Err(e) = self.arm(&entry, &path) {
                        warn!(extension = entry.name(), error = %e, "could not arm nested entry point");
                    }
                }
            }
        }
    }

    /// A nested entry point whose extension is already materialized needs no
    /// trampoline, only its value.
    fn define_revealed(
        &self,
        entry: &Rc<ExtensionModuleEntry>,
        entry_point: &EntryPoint,
        value: JsValue,
    ) -> Result<(), BrokerError> {
        if self.shared.state_for(entry_point).is_some() {
            return Ok(());
        }
        let holder = self.resolve_holder(entry_point, true)?;
        force_define_property(
            &holder,
            entry_point.leaf_key(),
            self.materialized_descriptor(entry_point, value),
        );
        self.shared.trampolines.borrow_mut().push(Rc::new(TrampolineState {
            entry_point: entry_point.clone(),
            entry: Rc::downgrade(entry),
            holder: Rc::downgrade(&holder),
            getter: None,
            status: Cell::new(TrampolineStatus::Materialized),
        }));
        trace!(extension = entry.name(), entry_point = %entry_point, "nested entry point exposed");
        self.reveal_children(entry_point);
        Ok(())
    }

    fn materialized_descriptor(&self, entry_point: &EntryPoint, value: JsValue) -> PropertyDescriptor {
        let descriptor = PropertyDescriptor::new_data(value);
        if entry_point.depth() == 1 && self.shared.lock_namespaces {
            descriptor.locked()
        } else {
            descriptor
        }
    }
}

/// ARMED -> TORN_DOWN for every trampoline still armed. Accessors are removed from
/// holders that are still alive without being called. Returns how many were removed.
pub(crate) fn disarm_all(shared: &BrokerShared) -> usize {
    let states: Vec<Rc<TrampolineState>> = shared.trampolines.borrow().clone();
    let mut disarmed = 0;
    for state in states {
        if state.status() != TrampolineStatus::Armed {
            continue;
        }
        if let Some(holder) = state.holder.upgrade() {
            if state.owns_accessor(&holder) {
                (*holder)
                    .borrow_mut()
                    .as_js_object_mut()
                    .force_delete(&state.entry_point.leaf_key());
                disarmed += 1;
            }
        }
        state.set_status(TrampolineStatus::TornDown);
        trace!(entry_point = %state.entry_point, "trampoline torn down");
    }
    disarmed
}

fn trampoline_getter(shared: Weak<BrokerShared>, entry_point: EntryPoint) -> JsObjectType {
    function_create(format!("get {}", entry_point), move |_this, _args| {
        Ok(on_trampoline_get(&shared, &entry_point).unwrap_or(JsValue::Undefined))
    })
}

fn trampoline_setter(shared: Weak<BrokerShared>, entry_point: EntryPoint) -> JsObjectType {
    function_create(format!("set {}", entry_point), move |_this, mut args| {
        let value = if args.is_empty() {
            JsValue::Undefined
        } else {
            args.swap_remove(0)
        };
        on_trampoline_set(&shared, &entry_point, value)?;
        Ok(JsValue::Undefined)
    })
}

fn on_trampoline_get(shared: &Weak<BrokerShared>, entry_point: &EntryPoint) -> Option<JsValue> {
    let shared = shared.upgrade()?;
    let context = match shared.context.get() {
        Some(context) => context,
        None => {
            debug!(entry_point = %entry_point, "trampoline fired after context release");
            return None;
        }
    };
    let entry = shared.owner_of(entry_point)?;
    trace!(entry_point = %entry_point, extension = entry.name(), "trampoline fired");
    TrampolineInstaller::new(&shared, &context).load_extension(&entry)
}

/// Writes go to the real property: materialize first, then re-fetch the holder and
/// assign with script semantics.
fn on_trampoline_set(
    shared: &Weak<BrokerShared>,
    entry_point: &EntryPoint,
    value: JsValue,
) -> Result<(), JErrorType> {
    let shared = match shared.upgrade() {
        Some(shared) => shared,
        None => return Ok(()),
    };
    let context = match shared.context.get() {
        Some(context) => context,
        None => {
            debug!(entry_point = %entry_point, "trampoline write after context release");
            return Ok(());
        }
    };
    let entry = match shared.owner_of(entry_point) {
        Some(entry) => entry,
        None => return Ok(()),
    };

    let installer = TrampolineInstaller::new(&shared, &context);
    if installer.load_extension(&entry).is_none() {
        warn!(entry_point = %entry_point, "write dropped, extension is not materialized");
        return Ok(());
    }

    let holder = match installer.resolve_holder(entry_point, false) {
        Ok(holder) => holder,
        Err(e) => {
            debug!(error = %e, "write dropped, holder is gone");
            return Ok(());
        }
    };
    let key = entry_point.leaf_key();
    if let Some(PropertyDescriptor::Accessor { .. }) = get_own_property(&holder, &key) {
        warn!(entry_point = %entry_point, "write dropped, entry point is still pending");
        return Ok(());
    }
    if !set(&holder, key, value)? {
        debug!(entry_point = %entry_point, "write refused by read-only property");
    }
    Ok(())
}
