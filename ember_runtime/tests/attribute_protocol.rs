//! End-to-end tests for attribute resolution.
//!
//! Coverage:
//! - Precedence between data descriptors, instance stores and methods
//! - Deleting missing attributes on instances and types
//! - Immutable built-in types
//! - Suspending descriptors with and without suspension allowed

use ember_runtime::object::attribute::{get_attribute, set_attribute};
use ember_runtime::types::function::NativeFunction;
use ember_runtime::{
    AttrStorage, Completion, Property, Suspension, TypeObject, Value, call, del_attr, get_attr,
    global_registry, intern, lookup_attr, set_attr,
};
use parking_lot::Mutex;
use std::sync::Arc;

fn new_type(name: &str) -> Arc<TypeObject> {
    let registry = global_registry();
    registry
        .new_subtype(name, &registry.builtins().object, AttrStorage::Dict)
        .unwrap()
}

fn instantiate(ty: &Arc<TypeObject>) -> Value {
    call(&Value::Type(ty.clone()), &[], &[]).unwrap()
}

// =============================================================================
// Precedence
// =============================================================================

mod precedence_tests {
    use super::*;

    #[test]
    fn test_data_descriptor_shadows_instance_store() {
        let ty = new_type("Celsius");
        let stored = Arc::new(Mutex::new(Value::Int(0)));
        let read = stored.clone();
        let write = stored.clone();
        ty.set_own(
            intern("degrees"),
            Property::readonly("degrees", move |_| Ok(Completion::Ready(read.lock().clone())))
                .with_setter(move |_, value| {
                    *write.lock() = value.unwrap_or(Value::None);
                    Ok(Completion::Ready(()))
                })
                .into_value(),
        );

        let obj = instantiate(&ty);
        obj.instance_dict()
            .unwrap()
            .insert(intern("degrees"), Value::str("shadowed"));

        set_attr(&obj, "degrees", Value::Int(21)).unwrap();
        assert!(get_attr(&obj, "degrees").unwrap().is(&Value::Int(21)));
        assert!(stored.lock().is(&Value::Int(21)));
    }

    #[test]
    fn test_instance_store_shadows_method() {
        let ty = new_type("Greeter");
        ty.set_own(
            intern("greet"),
            NativeFunction::method("Greeter", "greet", |_, _| Ok(Value::str("hello"))).into_value(),
        );

        let obj = instantiate(&ty);
        let bound = get_attr(&obj, "greet").unwrap();
        assert!(matches!(bound, Value::BoundMethod(_)));
        assert!(call(&bound, &[], &[]).unwrap().is(&Value::str("hello")));

        set_attr(&obj, "greet", Value::Int(5)).unwrap();
        assert!(get_attr(&obj, "greet").unwrap().is(&Value::Int(5)));
    }

    #[test]
    fn test_plain_type_attribute_visible_through_instance() {
        let ty = new_type("Config");
        set_attr(&Value::Type(ty.clone()), "limit", Value::Int(3)).unwrap();

        let obj = instantiate(&ty);
        assert!(get_attr(&obj, "limit").unwrap().is(&Value::Int(3)));

        set_attr(&obj, "limit", Value::Int(4)).unwrap();
        assert!(get_attr(&obj, "limit").unwrap().is(&Value::Int(4)));
        assert!(get_attr(&Value::Type(ty), "limit").unwrap().is(&Value::Int(3)));
    }

    #[test]
    fn test_inherited_method_binds_to_subtype_instance() {
        let base = new_type("Animal");
        base.set_own(
            intern("speak"),
            NativeFunction::method("Animal", "speak", |args, _| Ok(Value::Type(args[0].type_object())))
                .into_value(),
        );
        let registry = global_registry();
        let derived = registry.new_subtype("Dog", &base, AttrStorage::Slots).unwrap();
        assert!(derived.has_instance_dict());

        let obj = instantiate(&derived);
        let result = call(&get_attr(&obj, "speak").unwrap(), &[], &[]).unwrap();
        assert!(result.is(&Value::Type(derived)));
    }

    #[test]
    fn test_instance_keeps_reporting_its_type() {
        let ty = new_type("Ephemeral");
        let obj = instantiate(&ty);
        drop(ty);
        assert_eq!(obj.type_name().as_str(), "Ephemeral");
    }

    #[test]
    fn test_store_is_not_an_attribute() {
        let obj = instantiate(&new_type("Opaque"));
        set_attr(&obj, "x", Value::Int(1)).unwrap();

        assert!(lookup_attr(&obj, "__dict__").unwrap().is_none());
        let store = obj.instance_dict().unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.quick_lookup(&intern("x")).unwrap().is(&Value::Int(1)));
    }

    #[test]
    fn test_class_property_reports_type() {
        let ty = new_type("Marker");
        let obj = instantiate(&ty);
        assert!(get_attr(&obj, "__class__").unwrap().is(&Value::Type(ty.clone())));
        assert!(get_attr(&Value::Type(ty), "__name__").unwrap().is(&Value::str("Marker")));
    }
}

// =============================================================================
// Missing Attributes
// =============================================================================

mod missing_tests {
    use super::*;

    #[test]
    fn test_lookup_missing_returns_none() {
        let obj = instantiate(&new_type("Empty"));
        assert!(lookup_attr(&obj, "nothing").unwrap().is_none());
    }

    #[test]
    fn test_get_missing_raises() {
        let obj = instantiate(&new_type("Blank"));
        let err = get_attr(&obj, "nothing").unwrap_err();
        assert!(err.is_attribute_missing());
        assert_eq!(err.to_string(), "'Blank' object has no attribute 'nothing'");
    }

    #[test]
    fn test_delete_missing_instance_attribute() {
        let obj = instantiate(&new_type("Point"));
        set_attr(&obj, "x", Value::Int(1)).unwrap();
        del_attr(&obj, "x").unwrap();

        let err = del_attr(&obj, "x").unwrap_err();
        assert!(err.is_attribute_missing());
        assert_eq!(err.to_string(), "'Point' object has no attribute 'x'");
    }

    #[test]
    fn test_delete_missing_type_attribute() {
        let ty = Value::Type(new_type("Vector"));
        let err = del_attr(&ty, "z").unwrap_err();
        assert!(err.is_attribute_missing());
        assert_eq!(err.to_string(), "type object 'Vector' has no attribute 'z'");
    }

    #[test]
    fn test_set_on_value_without_store() {
        let err = set_attr(&Value::Int(1), "x", Value::None).unwrap_err();
        assert_eq!(err.to_string(), "'int' object has no attribute 'x'");
    }

    #[test]
    fn test_readonly_property_rejects_assignment() {
        let obj = instantiate(&new_type("Frozen"));
        let err = set_attr(&obj, "__class__", Value::None).unwrap_err();
        assert_eq!(err.to_string(), "property '__class__' of 'Frozen' object has no setter");
    }
}

// =============================================================================
// Immutable Types
// =============================================================================

mod immutable_tests {
    use super::*;

    #[test]
    fn test_builtin_tuple_rejects_assignment() {
        let tuple = Value::Type(global_registry().builtins().tuple.clone());
        let err = set_attr(&tuple, "extra", Value::Int(1)).unwrap_err();
        assert_eq!(err.exception_name(), "TypeError");
        assert_eq!(
            err.to_string(),
            "cannot set 'extra' attribute of immutable type 'tuple'"
        );
        assert!(lookup_attr(&tuple, "extra").unwrap().is_none());
    }

    #[test]
    fn test_heap_subtype_of_tuple_is_mutable() {
        let registry = global_registry();
        let ty = registry
            .new_subtype("Pair", &registry.builtins().tuple, AttrStorage::Dict)
            .unwrap();
        let value = Value::Type(ty);
        set_attr(&value, "arity", Value::Int(2)).unwrap();
        assert!(get_attr(&value, "arity").unwrap().is(&Value::Int(2)));
    }
}

// =============================================================================
// Suspension
// =============================================================================

mod suspension_tests {
    use super::*;

    fn suspending_type(name: &str, blocking: bool) -> Arc<TypeObject> {
        let ty = new_type(name);
        ty.set_own(
            intern("remote"),
            Property::readonly("remote", move |_| {
                let resume = || Ok(Completion::Ready(Value::Int(7)));
                Ok(Completion::Suspended(if blocking {
                    Suspension::blocking("fetch", resume)
                } else {
                    Suspension::optional("fetch", resume)
                }))
            })
            .into_value(),
        );
        ty
    }

    #[test]
    fn test_suspension_surfaces_when_allowed() {
        let obj = instantiate(&suspending_type("Lazy", false));
        let completion = get_attribute(&obj, &intern("remote"), true).unwrap();
        assert!(!completion.is_ready());

        let Completion::Suspended(suspension) = completion else {
            panic!("expected a suspension");
        };
        assert_eq!(suspension.label(), "fetch");
        let value = suspension.resume().unwrap().into_ready().unwrap();
        assert!(value.unwrap().is(&Value::Int(7)));
    }

    #[test]
    fn test_optional_suspension_resolved_in_place() {
        let obj = instantiate(&suspending_type("Eager", false));
        let completion = get_attribute(&obj, &intern("remote"), false).unwrap();
        assert!(completion.is_ready());
        assert!(get_attr(&obj, "remote").unwrap().is(&Value::Int(7)));
    }

    #[test]
    fn test_blocking_suspension_fails_without_suspension() {
        let obj = instantiate(&suspending_type("Stuck", true));
        let err = get_attr(&obj, "remote").unwrap_err();
        assert_eq!(err.exception_name(), "SystemError");

        let completion = get_attribute(&obj, &intern("remote"), true).unwrap();
        assert!(!completion.is_ready());
    }

    #[test]
    fn test_setter_suspension_is_drained() {
        let ty = new_type("Sink");
        let stored = Arc::new(Mutex::new(Value::None));
        let write = stored.clone();
        ty.set_own(
            intern("target"),
            Property::readonly("target", |_| Ok(Completion::Ready(Value::None)))
                .with_setter(move |_, value| {
                    let write = write.clone();
                    Ok(Completion::Suspended(Suspension::optional("store", move || {
                        *write.lock() = value.unwrap_or(Value::None);
                        Ok(Completion::Ready(()))
                    })))
                })
                .into_value(),
        );

        let obj = instantiate(&ty);
        let completion = set_attribute(&obj, &intern("target"), Some(Value::Int(9)), false).unwrap();
        assert!(completion.is_ready());
        assert!(stored.lock().is(&Value::Int(9)));
    }
}
