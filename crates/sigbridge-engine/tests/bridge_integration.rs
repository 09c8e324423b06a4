//! Bridge integration: registration through lookups, property
//! marshalling, attribute patching and signal delivery.

use std::sync::Arc;

use parking_lot::Mutex;
use sigbridge_engine::{
    compress_lines, AttrValue, Bridge, BridgeConfig, BridgeError, BuiltinFunction,
    ConverterRegistry, Entity, FuncKind, MetaCall, MetaKind, MetaMethod, MethodBinding, MethodDef,
    ModuleDef, NativeHandle, NativeProperty, NativeType, NativeValue, Owner, PropertyCall, PropertyDescriptor,
    Receiver, ScriptFunction, SignatureValue, Value, FUNC_KIND_MODIFIER,
};

fn noop(name: &str) -> ScriptFunction {
    ScriptFunction::new(name, |_| Ok(Value::None))
}

// ============================================================================
// Registration to lookup
// ============================================================================

mod lookups {
    use super::*;

    fn window() -> Arc<NativeType> {
        NativeType::builder("gui.Window")
            .module("gui")
            .qualname("Window")
            .method(MethodDef::new("setWindowTitle"))
            .method(MethodDef::new("show"))
            .method(MethodDef::new("instance").with_binding(MethodBinding::Static))
            .build()
    }

    fn bridge_for(ty: &Arc<NativeType>) -> Bridge {
        let bridge = Bridge::default();
        let payload = compress_lines(&[
            "gui.Window(self,title:str=\"\")",
            "gui.Window.setWindowTitle(self,title:str)",
            "1:gui.Window.show(self,animate:bool)",
            "0:gui.Window.show(self)",
            "gui.Window.instance()->gui.Window",
        ])
        .unwrap();
        bridge.init_signature_bytes(&Owner::Type(ty.clone()), &payload).unwrap();
        bridge.finish_signature_init(&ModuleDef::new("gui", vec![])).unwrap();
        bridge
    }

    fn signature_text(value: Option<SignatureValue>) -> String {
        match value {
            Some(SignatureValue::Signature(sig)) => sig.to_string(),
            other => panic!("expected a signature, got {:?}", other),
        }
    }

    #[test]
    fn test_compressed_registration_to_signature() {
        let ty = window();
        let bridge = bridge_for(&ty);
        let show = Entity::MethodDescriptor {
            owner: ty.clone(),
            def: ty.find_method("show").unwrap(),
        };
        assert_eq!(
            signature_text(bridge.get_signature(&show, None).unwrap()),
            "show(self)\nshow(self, animate: bool)"
        );
        assert_eq!(
            signature_text(bridge.get_signature(&show, Some("hintingstub")).unwrap()),
            "show(self)\nshow(self, animate: bool)"
        );
    }

    #[test]
    fn test_hintingstub_uses_ellipsis_defaults() {
        let ty = window();
        let bridge = bridge_for(&ty);
        assert_eq!(
            signature_text(bridge.get_signature(&Entity::Type(ty.clone()), Some("hintingstub")).unwrap()),
            "Window(self, title: str = ...)"
        );
        assert_eq!(
            signature_text(bridge.get_signature(&Entity::Type(ty.clone()), None).unwrap()),
            "Window(self, title: str = \"\")"
        );
    }

    #[test]
    fn test_alternate_spelling_through_get_attr() {
        let ty = window();
        let bridge = bridge_for(&ty);
        let Some(AttrValue::Entity(method)) = bridge.get_attr(&Entity::Type(ty.clone()), "set_window_title").unwrap()
        else {
            panic!("set_window_title should resolve");
        };
        match bridge.get_attr(&method, "__signature__").unwrap() {
            Some(AttrValue::Signature(Some(SignatureValue::Signature(sig)))) => {
                assert_eq!(sig.to_string(), "set_window_title(self, title: str)");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_static_method_owner_and_kind() {
        let ty = window();
        let bridge = bridge_for(&ty);
        let Some(AttrValue::Entity(entity)) = bridge.get_attr(&Entity::Type(ty.clone()), "instance").unwrap() else {
            panic!("instance should resolve");
        };
        assert!(matches!(entity, Entity::StaticMethod(_)));
        assert_eq!(
            bridge.get_signature(&entity, Some(FUNC_KIND_MODIFIER)).unwrap(),
            Some(SignatureValue::Kind(FuncKind::StaticMethod))
        );
        assert_eq!(
            signature_text(bridge.get_signature(&entity, None).unwrap()),
            "instance() -> gui.Window"
        );
    }

    #[test]
    fn test_instance_bound_method() {
        let ty = window();
        let bridge = bridge_for(&ty);
        let instance = bridge.wrap_instance(NativeHandle::from_raw(0xbeef), &ty);
        let Some(AttrValue::Entity(Entity::Builtin(func))) =
            bridge.get_attr(&Entity::Instance(instance), "setWindowTitle").unwrap()
        else {
            panic!("method should bind to the instance");
        };
        assert!(matches!(func.receiver, Receiver::Instance(_)));
        assert_eq!(
            signature_text(bridge.get_signature(&Entity::Builtin(func), None).unwrap()),
            "setWindowTitle(self, title: str)"
        );
    }

    fn dialog(base: &Arc<NativeType>, bridge: &Bridge) -> Arc<NativeType> {
        let ty = NativeType::builder("gui.Dialog")
            .module("gui")
            .qualname("Dialog")
            .base(base.clone())
            .method(MethodDef::new("exec"))
            .build();
        bridge
            .init_signature_strings(&Owner::Type(ty.clone()), &["gui.Dialog(self)", "gui.Dialog.exec(self)->int"])
            .unwrap();
        ty
    }

    #[test]
    fn test_inherited_method_keeps_base_signature() {
        let base = window();
        let bridge = bridge_for(&base);
        let derived = dialog(&base, &bridge);
        let Some(AttrValue::Entity(method)) =
            bridge.get_attr(&Entity::Type(derived.clone()), "set_window_title").unwrap()
        else {
            panic!("inherited alternate spelling should resolve");
        };
        assert_eq!(
            signature_text(bridge.get_signature(&method, None).unwrap()),
            "set_window_title(self, title: str)"
        );
        let Some(AttrValue::Entity(exec)) = bridge.get_attr(&Entity::Type(derived), "exec").unwrap() else {
            panic!("own method should resolve");
        };
        assert_eq!(signature_text(bridge.get_signature(&exec, None).unwrap()), "exec(self) -> int");
    }

    #[test]
    fn test_inherited_method_bound_to_derived_instance() {
        let base = window();
        let bridge = bridge_for(&base);
        let derived = dialog(&base, &bridge);
        let instance = bridge.wrap_instance(NativeHandle::from_raw(0xd1a1), &derived);
        let Some(AttrValue::Entity(Entity::Builtin(func))) =
            bridge.get_attr(&Entity::Instance(instance), "show").unwrap()
        else {
            panic!("inherited method should bind to the instance");
        };
        assert_eq!(
            signature_text(bridge.get_signature(&Entity::Builtin(func), None).unwrap()),
            "show(self)\nshow(self, animate: bool)"
        );
    }

    #[test]
    fn test_overload_mismatch_report() {
        let ty = window();
        let bridge = bridge_for(&ty);
        let instance = bridge.wrap_instance(NativeHandle::from_raw(0x5407), &ty);
        let Some(AttrValue::Entity(show)) = bridge.get_attr(&Entity::Instance(instance), "show").unwrap() else {
            panic!("show should resolve");
        };
        let err = bridge.argument_error(&show, &["str", "int"]).unwrap();
        assert!(matches!(&err, BridgeError::ArgumentMismatch { callable, .. } if callable == "gui.Window.show"));
        assert_eq!(
            err.to_string(),
            "'gui.Window.show' called with wrong argument types:\n  \
             gui.Window.show(str, int)\n\
             Supported signatures:\n  \
             gui.Window.show()\n  \
             gui.Window.show(bool)"
        );
    }

    #[test]
    fn test_malformed_owner_is_not_registered() {
        let bridge = Bridge::default();
        let broken = NativeType::builder("Broken").module("gui").build();
        let err = bridge
            .init_signature_strings(&Owner::Type(broken), &["Broken.f(self)"])
            .unwrap_err();
        assert!(matches!(err, BridgeError::MalformedEntity { .. }));
        assert!(!err.is_recoverable());
        assert!(bridge.registry().store().is_empty());
    }

    #[test]
    #[should_panic(expected = "unsupported entity kind")]
    fn test_classifying_a_script_function_panics() {
        let bridge = Bridge::default();
        bridge
            .registry()
            .class_or_module_of(&Entity::Function(Arc::new(noop("f"))));
    }

    #[test]
    fn test_module_function_after_finish() {
        let bridge = Bridge::default();
        let module = ModuleDef::new("gui", vec![MethodDef::new("qVersion")]);
        bridge
            .init_signature_strings(&Owner::Module(module.clone()), &["gui.qVersion()->str"])
            .unwrap();
        bridge.finish_signature_init(&module).unwrap();
        let func = Entity::Builtin(BuiltinFunction::new(module.functions()[0].clone(), Receiver::None));
        assert_eq!(
            signature_text(bridge.get_signature(&func, None).unwrap()),
            "qVersion() -> str"
        );
    }
}

// ============================================================================
// Property descriptors
// ============================================================================

mod properties {
    use super::*;

    #[test]
    fn test_inherited_native_property_under_true_property() {
        let base = NativeType::builder("gui.Widget")
            .module("gui")
            .qualname("Widget")
            .method(MethodDef::new("toolTip"))
            .method(MethodDef::new("setToolTip"))
            .native_property(NativeProperty::parse("toolTip::").unwrap())
            .build();
        let button = NativeType::builder("gui.Button")
            .module("gui")
            .qualname("Button")
            .base(base.clone())
            .build();
        let bridge = Bridge::new(BridgeConfig::new().with_category(sigbridge_engine::TRUE_PROPERTY_FEATURE, true));
        let instance = bridge.wrap_instance(NativeHandle::from_raw(0xb7), &button);

        match bridge.get_attr(&Entity::Instance(instance.clone()), "tool_tip").unwrap() {
            Some(AttrValue::NativeProperty { name, setter: Some(Entity::Builtin(setter)), .. }) => {
                assert_eq!(name, "toolTip");
                assert_eq!(setter.def.name(), "setToolTip");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(bridge.get_attr(&Entity::Instance(instance), "setToolTip").unwrap().is_none());
    }

    #[test]
    fn test_descriptor_without_accessors() {
        let prop = PropertyDescriptor::builder("value", "int").build().unwrap();
        let instance = Value::Object(NativeHandle::from_raw(1));
        assert_eq!(prop.get(&instance).unwrap(), None);
        assert_eq!(
            prop.set(&instance, Value::Int(1)).unwrap_err(),
            BridgeError::ReadOnlyAttribute { name: "value".to_string() }
        );
        assert_eq!(
            prop.reset(&instance).unwrap_err(),
            BridgeError::ResetUnsupported { name: "value".to_string() }
        );
    }

    #[test]
    fn test_copy_isolation() {
        let original = PropertyDescriptor::builder("value", "int")
            .getter(noop("value").with_doc("Current value"))
            .build()
            .unwrap();
        let copy = original.with_setter(noop("setValue"));

        assert!(original.setter().is_none());
        assert!(copy.setter().is_some());
        assert!(Arc::ptr_eq(original.getter().unwrap(), copy.getter().unwrap()));

        let refined = copy.with_getter(noop("value2").with_doc("Refined"));
        assert_eq!(original.doc().as_deref(), Some("Current value"));
        assert_eq!(copy.doc().as_deref(), Some("Current value"));
        assert_eq!(refined.doc().as_deref(), Some("Refined"));
        assert!(refined.setter().is_some());
    }

    #[test]
    fn test_unknown_converter_is_distinct() {
        let converters = ConverterRegistry::with_builtins();
        let prop = PropertyDescriptor::builder("text", "QString")
            .setter(noop("setText"))
            .build()
            .unwrap();
        let mut slots = [NativeValue::i32(3)];
        let err = prop
            .meta_call(PropertyCall::Write, &Value::None, &mut slots, &converters)
            .unwrap_err();
        assert!(err.is_unknown_type());
        assert_eq!(err, BridgeError::UnknownConverter { type_name: "QString".to_string() });

        let typed = PropertyDescriptor::builder("count", "int")
            .setter(noop("setCount"))
            .build()
            .unwrap();
        let mut slots = [NativeValue::bool(true)];
        let err = typed
            .meta_call(PropertyCall::Write, &Value::None, &mut slots, &converters)
            .unwrap_err();
        assert!(!err.is_unknown_type());
        assert!(matches!(err, BridgeError::Conversion { .. }));
    }

    #[test]
    fn test_metacall_reads_inherited_properties_first() {
        let base = NativeType::builder("Base")
            .property(
                "enabled",
                PropertyDescriptor::builder("enabled", "bool")
                    .getter(ScriptFunction::new("enabled", |_| Ok(Value::Bool(true))))
                    .build()
                    .unwrap(),
            )
            .build();
        let ty = NativeType::builder("Check")
            .base(base)
            .property(
                "ratio",
                PropertyDescriptor::builder("ratio", "qreal")
                    .getter(ScriptFunction::new("ratio", |_| Ok(Value::Float(0.5))))
                    .build()
                    .unwrap(),
            )
            .build();
        let bridge = Bridge::default();
        let handle = NativeHandle::from_raw(77);
        bridge.wrap_instance(handle, &ty);

        let mut slots = [NativeValue::null()];
        assert_eq!(bridge.qt_metacall(handle, MetaCall::ReadProperty, 0, &mut slots).unwrap(), -2);
        assert_eq!(slots[0].as_bool(), Some(true));
        assert_eq!(bridge.qt_metacall(handle, MetaCall::ReadProperty, 1, &mut slots).unwrap(), -1);
        assert_eq!(slots[0].as_f64(), Some(0.5));
    }
}

// ============================================================================
// Attribute patcher
// ============================================================================

mod patcher {
    use super::*;

    #[test]
    fn test_finish_twice_is_idempotent() {
        let bridge = Bridge::default();
        let module = ModuleDef::new("a", vec![]);
        bridge.finish_signature_init(&module).unwrap();
        bridge.finish_signature_init(&ModuleDef::new("b", vec![])).unwrap();
        assert!(bridge.patcher().is_installed());
        assert_eq!(bridge.patcher().install(MetaKind::Type, &[sigbridge_engine::Accessor::Doc]).unwrap(), 0);
    }

    #[test]
    fn test_shadowed_metatype_still_sees_accessors() {
        let bridge = Bridge::default();
        let shadow = bridge.patcher().shadow_metatype(MetaKind::MethodDescriptor);
        bridge.finish_signature_init(&ModuleDef::new("gui", vec![])).unwrap();
        assert!(shadow.get_own("__signature__").is_none());

        let ty = NativeType::builder("gui.Label")
            .module("gui")
            .qualname("Label")
            .method(MethodDef::new("clear"))
            .build();
        bridge
            .init_signature_strings(&Owner::Type(ty.clone()), &["gui.Label.clear(self)"])
            .unwrap();
        let clear = Entity::MethodDescriptor {
            owner: ty.clone(),
            def: ty.find_method("clear").unwrap(),
        };
        assert!(matches!(
            bridge.get_attr(&clear, "__signature__").unwrap(),
            Some(AttrValue::Signature(Some(_)))
        ));
    }

    #[test]
    fn test_doc_falls_back_to_metatype_doc() {
        let bridge = Bridge::default();
        bridge.finish_signature_init(&ModuleDef::new("gui", vec![])).unwrap();
        let ty = NativeType::builder("gui.Undocumented")
            .module("gui")
            .qualname("Undocumented")
            .build();
        match bridge.get_attr(&Entity::Type(ty), "__doc__").unwrap() {
            Some(AttrValue::Doc(Some(doc))) => assert_eq!(doc, "type(object) -> the object's type"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_conflicting_metatype_aborts_whole_install() {
        let bridge = Bridge::default();
        bridge
            .patcher()
            .metatype(MetaKind::StaticMethod)
            .insert("__signature__", sigbridge_engine::Attribute::Value(Value::Int(7)));
        let err = bridge.finish_signature_init(&ModuleDef::new("gui", vec![])).unwrap_err();
        assert!(matches!(err, BridgeError::PatchFailed { .. }));
        assert!(!bridge.patcher().is_installed());
        assert_eq!(bridge.patcher().injected(MetaKind::Type, "__signature__"), None);
        assert_eq!(bridge.patcher().injected(MetaKind::Builtin, "__signature__"), None);
        assert_eq!(bridge.patcher().injected(MetaKind::Type, "__doc__"), None);

        let ty = NativeType::builder("gui.Label").module("gui").qualname("Label").build();
        assert!(bridge.get_attr(&Entity::Type(ty), "__signature__").unwrap().is_none());
    }

    #[test]
    fn test_accessors_absent_before_install() {
        let bridge = Bridge::default();
        let ty = NativeType::builder("gui.Label").module("gui").qualname("Label").build();
        assert!(bridge.get_attr(&Entity::Type(ty), "__signature__").unwrap().is_none());
    }
}

// ============================================================================
// Signals
// ============================================================================

mod signals {
    use super::*;

    #[test]
    fn test_emit_through_metacall() {
        let ty = NativeType::builder("Slider")
            .meta_method(MetaMethod::signal("valueChanged(int)").unwrap())
            .build();
        let bridge = Bridge::default();
        let handle = NativeHandle::from_raw(0x51);
        let instance = bridge.wrap_instance(handle, &ty);

        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        bridge
            .signals()
            .connect(
                &instance,
                "valueChanged(int)",
                ScriptFunction::new("on_value", move |args| {
                    sink.lock().push(args[0].clone());
                    Ok(Value::None)
                }),
            )
            .unwrap();

        let mut slots = [NativeValue::null(), NativeValue::i32(42)];
        assert_eq!(bridge.qt_metacall(handle, MetaCall::InvokeMetaMethod, 0, &mut slots).unwrap(), -1);
        assert_eq!(*received.lock(), vec![Value::Int(42)]);
    }

    #[test]
    fn test_release_drops_connections() {
        let ty = NativeType::builder("Slider")
            .meta_method(MetaMethod::signal("valueChanged(int)").unwrap())
            .build();
        let bridge = Bridge::default();
        let handle = NativeHandle::from_raw(0x52);
        let instance = bridge.wrap_instance(handle, &ty);
        bridge
            .signals()
            .connect(&instance, "valueChanged(int)", noop("on_value"))
            .unwrap();
        assert_eq!(bridge.signals().connection_count(handle), 1);
        assert!(bridge.release_instance(handle));
        assert_eq!(bridge.signals().connection_count(handle), 0);

        // A stale wrapper cannot bring the table back
        assert!(bridge
            .signals()
            .connect(&instance, "valueChanged(int)", noop("late"))
            .is_err());
        assert_eq!(bridge.signals().table_count(), 0);
    }

    #[test]
    fn test_template_signal_round_trip() {
        let ty = NativeType::builder("Model")
            .meta_method(MetaMethod::signal("dataChanged(QMap<QString,int>,int)").unwrap())
            .build();
        let bridge = Bridge::default();
        let instance = bridge.wrap_instance(NativeHandle::from_raw(0x54), &ty);
        bridge
            .signals()
            .connect(&instance, "dataChanged(QMap<QString, int>, int)", noop("on_data"))
            .unwrap();
        assert_eq!(bridge.signals().method_count(&instance), 1);
        let method = bridge.signals().method(&instance, 0).unwrap();
        assert_eq!(method.parameter_types().len(), 2);
        assert!(!method.is_dynamic());
    }

    #[test]
    fn test_dynamic_slot_registration() {
        let config = BridgeConfig::from_rules("sigbridge.slots.warning=true");
        assert!(config.slot_warnings());
        let bridge = Bridge::new(config);
        let ty = NativeType::builder("Form").build();
        let instance = bridge.wrap_instance(NativeHandle::from_raw(0x53), &ty);
        let index = bridge
            .signals()
            .register_meta_method(&instance, MetaMethod::slot("accept()").unwrap())
            .unwrap();
        assert_eq!(index, 0);
        assert!(bridge.signals().method(&instance, 0).unwrap().is_dynamic());
        assert_eq!(
            bridge
                .signals()
                .register_meta_method(&instance, MetaMethod::slot("accept()").unwrap())
                .unwrap(),
            0
        );
    }
}
