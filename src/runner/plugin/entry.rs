//! Extension module entries and entry-point prefix resolution.
//!
//! Entry points form a forest: `tizen` is the parent of `tizen.sensor`, which is the
//! parent of `tizen.sensor.light`. Only the roots of that forest get a trampoline when
//! a context starts. Everything else is reached by walking the materialized value of
//! its parent, and is armed at that point.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::runner::ds::value::JsValue;
use crate::runner::plugin::entry_point::EntryPoint;
use crate::runner::plugin::types::ExtensionModule;

/// One script-visible path of an extension, plus the nearest other path it hangs off.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryPointSlot {
    pub path: EntryPoint,
    pub subsumed_by: Option<EntryPoint>,
}

impl EntryPointSlot {
    pub fn is_outermost(&self) -> bool {
        self.subsumed_by.is_none()
    }
}

/// What an entry currently resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Pending,
    Materialized(JsValue),
}

pub struct ExtensionModuleEntry {
    name: String,
    module: Rc<dyn ExtensionModule>,
    entry_points: Vec<EntryPointSlot>,
    materializing: Cell<bool>,
    binding: RefCell<Binding>,
}

impl ExtensionModuleEntry {
    /// Duplicate paths within `entry_points` collapse to their first occurrence.
    pub fn new(
        name: impl Into<String>,
        module: Rc<dyn ExtensionModule>,
        entry_points: Vec<EntryPoint>,
    ) -> Self {
        let mut slots: Vec<EntryPointSlot> = Vec::with_capacity(entry_points.len());
        for path in entry_points {
            if !slots.iter().any(|s| s.path == path) {
                slots.push(EntryPointSlot {
                    path,
                    subsumed_by: None,
                });
            }
        }
        ExtensionModuleEntry {
            name: name.into(),
            module,
            entry_points: slots,
            materializing: Cell::new(false),
            binding: RefCell::new(Binding::Pending),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module(&self) -> &Rc<dyn ExtensionModule> {
        &self.module
    }

    pub fn entry_points(&self) -> &[EntryPointSlot] {
        &self.entry_points
    }

    pub fn claims(&self, path: &EntryPoint) -> bool {
        self.entry_points.iter().any(|s| &s.path == path)
    }

    /// False when any of this entry's paths rides on another entry point's trampoline.
    pub fn use_trampoline(&self) -> bool {
        self.entry_points.iter().all(EntryPointSlot::is_outermost)
    }

    pub fn is_materializing(&self) -> bool {
        self.materializing.get()
    }

    pub(crate) fn set_materializing(&self, materializing: bool) {
        self.materializing.set(materializing);
    }

    pub fn binding(&self) -> Binding {
        self.binding.borrow().clone()
    }

    pub fn materialized(&self) -> Option<JsValue> {
        match &*self.binding.borrow() {
            Binding::Materialized(value) => Some(value.clone()),
            Binding::Pending => None,
        }
    }

    pub fn is_materialized(&self) -> bool {
        self.materialized().is_some()
    }

    pub(crate) fn set_materialized(&self, value: JsValue) {
        *self.binding.borrow_mut() = Binding::Materialized(value);
    }
}

impl fmt::Debug for ExtensionModuleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionModuleEntry")
            .field("name", &self.name)
            .field("entry_points", &self.entry_points)
            .field("use_trampoline", &self.use_trampoline())
            .field("materializing", &self.materializing.get())
            .finish()
    }
}

/// Sorts `entries` by name and sets, for every entry point, the nearest other entry
/// point that is a proper dotted prefix of it.
///
/// All paths are sorted segment-wise and walked with a stack of open ancestors: a
/// path's parent is whatever remains on top of the stack once the entries that are
/// not its prefix have been popped.
pub fn mark_modules_with_trampoline(entries: &mut [ExtensionModuleEntry]) {
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    let mut all: Vec<(EntryPoint, usize, usize)> = vec![];
    for (ei, entry) in entries.iter().enumerate() {
        for (si, slot) in entry.entry_points.iter().enumerate() {
            all.push((slot.path.clone(), ei, si));
        }
    }
    all.sort_by(|a, b| a.0.cmp(&b.0));

    let mut ancestors: Vec<EntryPoint> = vec![];
    for (path, ei, si) in all {
        while let Some(top) = ancestors.last() {
            if top.is_proper_prefix_of(&path) {
                break;
            }
            ancestors.pop();
        }
        let parent = ancestors.last().cloned();
        if let Some(parent) = &parent {
            trace!(entry_point = %path, subsumed_by = %parent, "entry point rides on outer trampoline");
        }
        entries[ei].entry_points[si].subsumed_by = parent;
        ancestors.push(path);
    }
}
