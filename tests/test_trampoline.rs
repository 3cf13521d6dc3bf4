extern crate just_broker;


use broker_util::{extension, init_tracing, module_name, read, TestExtension};
use just_broker::runner::ds::context::ScriptContext;
use just_broker::runner::ds::object::object_create;
use just_broker::runner::ds::object_property::PropertyDescriptor;
use just_broker::runner::ds::operations::object::{
    call, define_property_or_throw, get_own_property,
};
use just_broker::runner::ds::value::JsValue;
use just_broker::runner::plugin::{BrokerConfig, ModuleSystem, TrampolineStatus};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

fn is_accessor(context: &ScriptContext, holder_path: Option<&str>, leaf: &str) -> bool {
    let holder = match holder_path {
        Some(path) => read(context, path).as_object().unwrap().clone(),
        None => context.global(),
    };
    matches!(
        get_own_property(&holder, &leaf.into()),
        Some(PropertyDescriptor::Accessor { .. })
    )
}

// ── Arming ───────────────────────────────────────────────────────────

#[test]
fn test_initialize_arms_without_materializing() {
    let context = ScriptContext::new();
    let mut modules = ModuleSystem::new(&context);
    let (sensor, calls) = extension("sensor");
    modules.register_extension_module(sensor, &["tizen.sensor"]).unwrap();
    modules.initialize().unwrap();

    assert_eq!(calls.get(), 0);
    assert_eq!(modules.trampoline_status("tizen.sensor"), TrampolineStatus::Armed);
    assert!(is_accessor(&context, Some("tizen"), "sensor"));
}

#[test]
fn test_one_trampoline_per_outermost_path() {
    let context = ScriptContext::new();
    let mut modules = ModuleSystem::new(&context);
    let (outer, _) = extension("outer");
    let (inner, inner_calls) = extension("inner");
    let (other, _) = extension("other");
    modules.register_extension_module(inner, &["a.b"]).unwrap();
    modules.register_extension_module(outer, &["a"]).unwrap();
    modules.register_extension_module(other, &["z.y"]).unwrap();
    modules.initialize().unwrap();

    assert_eq!(
        modules.armed_entry_points(),
        vec!["a".to_string(), "z.y".to_string()]
    );
    assert_eq!(modules.trampoline_status("a.b"), TrampolineStatus::Uninstalled);
    assert!(!modules.extension("inner").unwrap().use_trampoline());
    assert_eq!(inner_calls.get(), 0);
}

// ── Materialization ──────────────────────────────────────────────────

#[test]
fn test_first_read_materializes_once() {
    let context = ScriptContext::new();
    let mut modules = ModuleSystem::new(&context);
    let (sensor, calls) = extension("sensor");
    modules.register_extension_module(sensor, &["tizen.sensor"]).unwrap();
    modules.initialize().unwrap();

    let first = read(&context, "tizen.sensor");
    let second = read(&context, "tizen.sensor");
    assert_eq!(module_name(&first), Some("sensor".to_string()));
    assert_eq!(first, second);
    assert_eq!(calls.get(), 1);
    assert_eq!(modules.trampoline_status("tizen.sensor"), TrampolineStatus::Materialized);
    assert!(!is_accessor(&context, Some("tizen"), "sensor"));
}

#[test]
fn test_all_entry_points_of_an_extension_settle_together() {
    let context = ScriptContext::new();
    let mut modules = ModuleSystem::new(&context);
    let (multi, calls) = extension("multi");
    modules
        .register_extension_module(multi, &["tizen.one", "tizen.two"])
        .unwrap();
    modules.initialize().unwrap();

    let one = read(&context, "tizen.one");
    assert!(!is_accessor(&context, Some("tizen"), "two"));
    assert_eq!(read(&context, "tizen.two"), one);
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_failure_is_not_cached() {
    init_tracing();
    let context = ScriptContext::new();
    let mut modules = ModuleSystem::new(&context);
    let flaky = TestExtension::new("flaky").failing(1);
    let calls = flaky.calls();
    modules
        .register_extension_module(Rc::new(flaky), &["tizen.flaky"])
        .unwrap();
    modules.initialize().unwrap();

    assert_eq!(read(&context, "tizen.flaky"), JsValue::Undefined);
    assert_eq!(modules.trampoline_status("tizen.flaky"), TrampolineStatus::Armed);

    let value = read(&context, "tizen.flaky");
    assert_eq!(module_name(&value), Some("flaky".to_string()));
    assert_eq!(calls.get(), 2);
}

#[test]
fn test_reentrant_access_sees_undefined() {
    init_tracing();
    let context = ScriptContext::new();
    let mut modules = ModuleSystem::new(&context);
    let seen = Rc::new(RefCell::new(None));
    let seen_inside = seen.clone();
    let ext = TestExtension::new("loopy").on_materialize(move |ctx| {
        *seen_inside.borrow_mut() = Some(ctx.eval_path("tizen.loopy").unwrap());
    });
    let calls = ext.calls();
    modules
        .register_extension_module(Rc::new(ext), &["tizen.loopy"])
        .unwrap();
    modules.initialize().unwrap();

    let value = read(&context, "tizen.loopy");
    assert_eq!(module_name(&value), Some("loopy".to_string()));
    assert_eq!(*seen.borrow(), Some(JsValue::Undefined));
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_extension_may_touch_other_extensions_while_materializing() {
    let context = ScriptContext::new();
    let mut modules = ModuleSystem::new(&context);
    let seen = Rc::new(RefCell::new(None));
    let seen_inside = seen.clone();
    let app = TestExtension::new("app").on_materialize(move |ctx| {
        *seen_inside.borrow_mut() = module_name(&ctx.eval_path("tizen.base").unwrap());
    });
    let (base, base_calls) = extension("base");
    modules.register_extension_module(Rc::new(app), &["tizen.app"]).unwrap();
    modules.register_extension_module(base, &["tizen.base"]).unwrap();
    modules.initialize().unwrap();

    read(&context, "tizen.app");
    assert_eq!(*seen.borrow(), Some("base".to_string()));
    assert_eq!(base_calls.get(), 1);
}

// ── Writes ───────────────────────────────────────────────────────────

#[test]
fn test_write_before_read_materializes_then_assigns() {
    let context = ScriptContext::new();
    let mut modules = ModuleSystem::new(&context);
    let (sensor, calls) = extension("sensor");
    modules.register_extension_module(sensor, &["tizen.sensor"]).unwrap();
    modules.initialize().unwrap();

    let written = context
        .assign_path("tizen.sensor", JsValue::from(42i64))
        .unwrap();
    assert!(written);
    assert_eq!(calls.get(), 1);
    assert_eq!(read(&context, "tizen.sensor"), JsValue::from(42i64));
}

#[test]
fn test_write_to_failed_extension_is_dropped() {
    let context = ScriptContext::new();
    let mut modules = ModuleSystem::new(&context);
    let flaky = TestExtension::new("flaky").failing(1);
    modules
        .register_extension_module(Rc::new(flaky), &["tizen.flaky"])
        .unwrap();
    modules.initialize().unwrap();

    context.assign_path("tizen.flaky", JsValue::from(1i64)).unwrap();
    assert_eq!(modules.trampoline_status("tizen.flaky"), TrampolineStatus::Armed);
    assert_eq!(module_name(&read(&context, "tizen.flaky")), Some("flaky".to_string()));
}

#[test]
fn test_top_level_entry_point_is_read_only_after_write() {
    let context = ScriptContext::new();
    let mut modules = ModuleSystem::new(&context);
    let (top, calls) = extension("top");
    modules.register_extension_module(top, &["top"]).unwrap();
    modules.initialize().unwrap();

    context.assign_path("top", JsValue::from(1i64)).unwrap();
    assert_eq!(calls.get(), 1);
    assert_eq!(module_name(&read(&context, "top")), Some("top".to_string()));
    assert!(!context.assign_path("top", JsValue::from(2i64)).unwrap());
}

#[test]
fn test_top_level_entry_point_writable_without_locking() {
    let context = ScriptContext::new();
    let config = BrokerConfig {
        lock_namespaces: false,
        ..BrokerConfig::default()
    };
    let mut modules = ModuleSystem::with_config(&context, config);
    let (top, _) = extension("top");
    modules.register_extension_module(top, &["top"]).unwrap();
    modules.initialize().unwrap();

    context.assign_path("top", JsValue::from(7i64)).unwrap();
    assert_eq!(read(&context, "top"), JsValue::from(7i64));
}

// ── Namespaces ───────────────────────────────────────────────────────

#[test]
fn test_namespace_cannot_be_replaced() {
    let context = ScriptContext::new();
    let mut modules = ModuleSystem::new(&context);
    let (sensor, _) = extension("sensor");
    modules.register_extension_module(sensor, &["tizen.sensor"]).unwrap();
    modules.initialize().unwrap();

    let namespace = read(&context, "tizen");
    assert!(!context.assign_path("tizen", JsValue::from(0i64)).unwrap());
    assert!(define_property_or_throw(
        &context.global(),
        "tizen".into(),
        PropertyDescriptor::new_data(JsValue::Null)
    )
    .is_err());
    assert_eq!(read(&context, "tizen"), namespace);
    assert_eq!(module_name(&read(&context, "tizen.sensor")), Some("sensor".to_string()));
}

#[test]
fn test_existing_namespace_object_is_reused() {
    let context = ScriptContext::new();
    context
        .assign_path("tizen", JsValue::Object(object_create()))
        .unwrap();
    context.assign_path("tizen.version", JsValue::from("1.0")).unwrap();

    let mut modules = ModuleSystem::new(&context);
    let (sensor, _) = extension("sensor");
    modules.register_extension_module(sensor, &["tizen.sensor"]).unwrap();
    modules.initialize().unwrap();

    assert_eq!(read(&context, "tizen.version"), JsValue::from("1.0"));
    assert_eq!(module_name(&read(&context, "tizen.sensor")), Some("sensor".to_string()));
}

#[test]
fn test_non_object_holder_leaves_entry_point_unarmed() {
    let context = ScriptContext::new();
    context.assign_path("tizen", JsValue::from(3i64)).unwrap();

    let mut modules = ModuleSystem::new(&context);
    let (sensor, calls) = extension("sensor");
    modules.register_extension_module(sensor, &["tizen.sensor"]).unwrap();
    modules.initialize().unwrap();

    assert_eq!(modules.trampoline_status("tizen.sensor"), TrampolineStatus::Uninstalled);
    assert_eq!(read(&context, "tizen"), JsValue::from(3i64));
    assert_eq!(calls.get(), 0);
}

// ── Nested entry points ──────────────────────────────────────────────

#[test]
fn test_nested_entry_point_armed_when_parent_materializes() {
    let context = ScriptContext::new();
    let mut modules = ModuleSystem::new(&context);
    let (outer, outer_calls) = extension("outer");
    let (inner, inner_calls) = extension("inner");
    modules.register_extension_module(outer, &["a"]).unwrap();
    modules.register_extension_module(inner, &["a.b"]).unwrap();
    modules.initialize().unwrap();

    let a = read(&context, "a");
    assert_eq!(module_name(&a), Some("outer".to_string()));
    assert_eq!(modules.trampoline_status("a.b"), TrampolineStatus::Armed);
    assert!(is_accessor(&context, Some("a"), "b"));
    assert_eq!(inner_calls.get(), 0);

    let b = read(&context, "a.b");
    assert_eq!(module_name(&b), Some("inner".to_string()));
    assert_eq!(outer_calls.get(), 1);
    assert_eq!(inner_calls.get(), 1);
}

#[test]
fn test_deep_path_reached_in_one_expression() {
    let context = ScriptContext::new();
    let mut modules = ModuleSystem::new(&context);
    let (x, _) = extension("x");
    let (y, _) = extension("y");
    let (z, _) = extension("z");
    modules.register_extension_module(z, &["a.b.c"]).unwrap();
    modules.register_extension_module(y, &["a.b"]).unwrap();
    modules.register_extension_module(x, &["a"]).unwrap();
    modules.initialize().unwrap();

    assert_eq!(modules.armed_entry_points(), vec!["a".to_string()]);
    assert_eq!(module_name(&read(&context, "a.b.c")), Some("z".to_string()));
    assert!(modules.armed_entry_points().is_empty());
}

#[test]
fn test_nested_entry_point_of_already_materialized_extension() {
    let context = ScriptContext::new();
    let mut modules = ModuleSystem::new(&context);
    let (outer, _) = extension("outer");
    let (both, both_calls) = extension("both");
    modules.register_extension_module(outer, &["a"]).unwrap();
    modules.register_extension_module(both, &["a.b", "c"]).unwrap();
    modules.initialize().unwrap();

    let c = read(&context, "c");
    assert_eq!(modules.trampoline_status("a.b"), TrampolineStatus::Uninstalled);

    assert_eq!(read(&context, "a.b"), c);
    assert!(!is_accessor(&context, Some("a"), "b"));
    assert_eq!(modules.trampoline_status("a.b"), TrampolineStatus::Materialized);
    assert_eq!(both_calls.get(), 1);
}

// ── Teardown ─────────────────────────────────────────────────────────

#[test]
fn test_teardown_before_access_never_materializes() {
    let context = ScriptContext::new();
    let mut modules = ModuleSystem::new(&context);
    let (sensor, calls) = extension("sensor");
    modules.register_extension_module(sensor, &["tizen.sensor"]).unwrap();
    modules.initialize().unwrap();

    let getter = match get_own_property(
        read(&context, "tizen").as_object().unwrap(),
        &"sensor".into(),
    ) {
        Some(PropertyDescriptor::Accessor { get: Some(getter), .. }) => getter,
        other => panic!("expected trampoline, found {:?}", other),
    };

    modules.teardown();
    assert_eq!(modules.trampoline_status("tizen.sensor"), TrampolineStatus::TornDown);
    assert_eq!(read(&context, "tizen.sensor"), JsValue::Undefined);
    assert_eq!(call(&getter, JsValue::Undefined, vec![]).unwrap(), JsValue::Undefined);
    assert_eq!(calls.get(), 0);
}

#[test]
fn test_teardown_during_materialize_discards_result() {
    let context = ScriptContext::new();
    let slot: Rc<RefCell<Weak<RefCell<ModuleSystem>>>> = Rc::new(RefCell::new(Weak::new()));
    let slot_inside = slot.clone();
    let sensor = TestExtension::new("sensor").on_materialize(move |_ctx| {
        if let Some(modules) = slot_inside.borrow().upgrade() {
            modules.borrow_mut().teardown();
        }
    });
    let calls = sensor.calls();

    let modules = Rc::new(RefCell::new(ModuleSystem::new(&context)));
    *slot.borrow_mut() = Rc::downgrade(&modules);
    modules
        .borrow_mut()
        .register_extension_module(Rc::new(sensor), &["tizen.sensor"])
        .unwrap();
    modules.borrow_mut().initialize().unwrap();

    assert_eq!(read(&context, "tizen.sensor"), JsValue::Undefined);
    assert_eq!(calls.get(), 1);
    assert_eq!(
        modules.borrow().trampoline_status("tizen.sensor"),
        TrampolineStatus::TornDown
    );
    let tizen = read(&context, "tizen");
    assert!(get_own_property(tizen.as_object().unwrap(), &"sensor".into()).is_none());

    assert_eq!(read(&context, "tizen.sensor"), JsValue::Undefined);
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_dropping_module_system_removes_trampolines() {
    let context = ScriptContext::new();
    let (sensor, calls) = extension("sensor");
    {
        let mut modules = ModuleSystem::new(&context);
        modules.register_extension_module(sensor, &["tizen.sensor"]).unwrap();
        modules.initialize().unwrap();
    }
    assert_eq!(read(&context, "tizen.sensor"), JsValue::Undefined);
    assert_eq!(calls.get(), 0);
}

#[test]
fn test_materialized_values_survive_teardown() {
    let context = ScriptContext::new();
    let mut modules = ModuleSystem::new(&context);
    let (sensor, _) = extension("sensor");
    modules.register_extension_module(sensor, &["tizen.sensor"]).unwrap();
    modules.initialize().unwrap();

    let value = read(&context, "tizen.sensor");
    modules.teardown();
    modules.teardown();
    assert_eq!(read(&context, "tizen.sensor"), value);
    assert_eq!(modules.trampoline_status("tizen.sensor"), TrampolineStatus::Materialized);
}
