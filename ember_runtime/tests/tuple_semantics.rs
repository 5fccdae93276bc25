//! Behavioural tests for `tuple` and its iterators.
//!
//! Coverage:
//! - Searching, concatenation, repetition and indexing
//! - Lexicographic ordering with prefixes
//! - Construction of tuple subtypes and `__new__` safety
//! - Size-checked iteration over a mutable attribute store

use ember_runtime::object::call::call_method;
use ember_runtime::ops::{self, CompareOp};
use ember_runtime::types::slice::SliceObject;
use ember_runtime::types::function::NativeFunction;
use ember_runtime::{
    AttrDict, AttrStorage, Value, call, get_attr, global_registry, intern, set_attr,
};

fn ints(values: &[i64]) -> Value {
    Value::tuple(values.iter().copied().map(Value::Int).collect())
}

fn as_ints(value: &Value) -> Vec<i64> {
    value
        .as_tuple()
        .unwrap()
        .as_slice()
        .iter()
        .map(|v| v.as_int().unwrap())
        .collect()
}

// =============================================================================
// Sequence Operations
// =============================================================================

mod sequence_tests {
    use super::*;

    #[test]
    fn test_index_and_count() {
        let t = ints(&[1, 2, 2, 3]);
        assert!(call_method(&t, "index", &[Value::Int(2)], &[]).unwrap().is(&Value::Int(1)));
        assert!(call_method(&t, "count", &[Value::Int(2)], &[]).unwrap().is(&Value::Int(2)));

        let err = call_method(&t, "index", &[Value::Int(9)], &[]).unwrap_err();
        assert_eq!(err.exception_name(), "ValueError");
        assert_eq!(err.to_string(), "tuple.index(x): x not in tuple");
    }

    #[test]
    fn test_index_with_bounds() {
        let t = ints(&[5, 6, 5, 6]);
        let found = call_method(&t, "index", &[Value::Int(5), Value::Int(1)], &[]).unwrap();
        assert!(found.is(&Value::Int(2)));

        let err = call_method(&t, "index", &[Value::Int(5), Value::Int(1), Value::Int(2)], &[])
            .unwrap_err();
        assert_eq!(err.exception_name(), "ValueError");
    }

    #[test]
    fn test_concat_and_repeat() {
        let joined = ops::concat(&ints(&[1, 2]), &ints(&[3])).unwrap();
        assert_eq!(as_ints(&joined), vec![1, 2, 3]);

        let repeated = ops::repeat(&ints(&[1, 2]), &Value::Int(3)).unwrap();
        assert_eq!(as_ints(&repeated), vec![1, 2, 1, 2, 1, 2]);

        let empty = ops::repeat(&ints(&[1, 2]), &Value::Int(-1)).unwrap();
        assert_eq!(ops::len(&empty).unwrap(), 0);
    }

    #[test]
    fn test_concat_rejects_non_tuple() {
        let err = ops::concat(&ints(&[1]), &Value::Int(2)).unwrap_err();
        assert_eq!(err.to_string(), "can only concatenate tuple (not \"int\") to tuple");
    }

    #[test]
    fn test_negative_index() {
        let t = ints(&[10, 20, 30]);
        assert!(ops::getitem(&t, &Value::Int(-1)).unwrap().is(&Value::Int(30)));

        let err = ops::getitem(&t, &Value::Int(3)).unwrap_err();
        assert_eq!(err.exception_name(), "IndexError");
        assert_eq!(err.to_string(), "tuple index out of range");
    }

    #[test]
    fn test_slices() {
        let t = ints(&[0, 1, 2, 3, 4, 5]);
        let every_other = SliceObject::new(Some(1), None, Some(2)).unwrap().into_value();
        assert_eq!(as_ints(&ops::getitem(&t, &every_other).unwrap()), vec![1, 3, 5]);

        let backwards = SliceObject::new(None, None, Some(-1)).unwrap().into_value();
        assert_eq!(as_ints(&ops::getitem(&t, &backwards).unwrap()), vec![5, 4, 3, 2, 1, 0]);

        let err = SliceObject::new(None, None, Some(0)).unwrap_err();
        assert_eq!(err.to_string(), "slice step cannot be zero");
    }

    #[test]
    fn test_contains_and_repr() {
        let t = Value::tuple(vec![Value::Int(1), Value::str("a"), Value::None]);
        assert!(ops::contains(&t, &Value::str("a")).unwrap());
        assert!(!ops::contains(&t, &Value::Int(2)).unwrap());
        assert_eq!(ops::repr(&t), "(1, 'a', None)");
        assert_eq!(ops::repr(&ints(&[7])), "(7,)");
    }
}

// =============================================================================
// Ordering and Hashing
// =============================================================================

mod ordering_tests {
    use super::*;

    #[test]
    fn test_prefix_orders_first() {
        let short = ints(&[1, 2]);
        let long = ints(&[1, 2, 3]);
        assert!(ops::rich_compare(&short, &long, CompareOp::Lt).unwrap());
        assert!(ops::rich_compare(&long, &short, CompareOp::Gt).unwrap());
        assert!(!ops::rich_compare(&short, &long, CompareOp::Eq).unwrap());
    }

    #[test]
    fn test_first_difference_decides() {
        assert!(ops::rich_compare(&ints(&[1, 3]), &ints(&[1, 2, 9]), CompareOp::Gt).unwrap());
        assert!(ops::rich_compare(&ints(&[0]), &ints(&[1]), CompareOp::Le).unwrap());
    }

    #[test]
    fn test_ordering_against_non_tuple_fails() {
        let err = ops::rich_compare(&ints(&[1]), &Value::Int(1), CompareOp::Lt).unwrap_err();
        assert_eq!(err.exception_name(), "TypeError");
        assert!(!ops::equal(&ints(&[1]), &Value::Int(1)).unwrap());
    }

    #[test]
    fn test_equal_tuples_hash_equal() {
        let a = ints(&[1, 2, 3]);
        let b = ints(&[1, 2, 3]);
        assert!(!a.is(&b));
        assert!(ops::equal(&a, &b).unwrap());
        assert_eq!(ops::hash(&a).unwrap(), ops::hash(&b).unwrap());
    }

    #[test]
    fn test_large_int_and_rounded_float_differ() {
        let a = ints(&[(1 << 53) + 1]);
        let b = Value::tuple(vec![Value::Float(9_007_199_254_740_992.0)]);
        assert!(!ops::equal(&a, &b).unwrap());
        assert!(ops::rich_compare(&b, &a, CompareOp::Lt).unwrap());
    }

    #[test]
    fn test_unhashable_element() {
        let slice = SliceObject::new(None, None, None).unwrap().into_value();
        let err = ops::hash(&Value::tuple(vec![slice])).unwrap_err();
        assert_eq!(err.to_string(), "unhashable type: 'slice'");
    }
}

// =============================================================================
// Construction
// =============================================================================

mod construction_tests {
    use super::*;

    fn tuple_type() -> Value {
        Value::Type(global_registry().builtins().tuple.clone())
    }

    #[test]
    fn test_tuple_of_tuple_is_identity() {
        let t = ints(&[1, 2]);
        let copy = call(&tuple_type(), &[t.clone()], &[]).unwrap();
        assert!(copy.is(&t));
    }

    #[test]
    fn test_tuple_from_iterable() {
        let letters = call(&tuple_type(), &[Value::str("abc")], &[]).unwrap();
        assert_eq!(ops::repr(&letters), "('a', 'b', 'c')");
        assert_eq!(ops::len(&call(&tuple_type(), &[], &[]).unwrap()).unwrap(), 0);
    }

    #[test]
    fn test_tuple_rejects_extra_arguments() {
        let err = call(&tuple_type(), &[Value::None, Value::None], &[]).unwrap_err();
        assert_eq!(err.to_string(), "tuple() takes at most 1 argument (2 given)");
    }

    #[test]
    fn test_subtype_construction() {
        let registry = global_registry();
        let point = registry
            .new_subtype("Point", &registry.builtins().tuple, AttrStorage::Dict)
            .unwrap();
        let p = call(&Value::Type(point.clone()), &[ints(&[3, 4])], &[]).unwrap();

        assert!(!p.is_exact_tuple());
        assert!(p.type_object().is_subtype(&registry.builtins().tuple));
        assert_eq!(as_ints(&p), vec![3, 4]);
        assert!(ops::equal(&p, &ints(&[3, 4])).unwrap());
        assert!(call_method(&p, "count", &[Value::Int(4)], &[]).unwrap().is(&Value::Int(1)));

        let args = call_method(&p, "__getnewargs__", &[], &[]).unwrap();
        let inner = ops::getitem(&args, &Value::Int(0)).unwrap();
        assert!(inner.is_exact_tuple());
        assert_eq!(as_ints(&inner), vec![3, 4]);
    }

    #[test]
    fn test_subtype_keywords_reach_init() {
        let registry = global_registry();
        let labelled = registry
            .new_subtype("Labelled", &registry.builtins().tuple, AttrStorage::Dict)
            .unwrap();
        labelled.set_own(
            intern("__init__"),
            NativeFunction::method("Labelled", "__init__", |args, kwargs| {
                for (name, value) in kwargs {
                    set_attr(&args[0], name, value.clone())?;
                }
                Ok(Value::None)
            })
            .into_value(),
        );

        let kwargs = [(intern("label"), Value::str("origin"))];
        let t = call(&Value::Type(labelled), &[ints(&[0, 0])], &kwargs).unwrap();
        assert_eq!(as_ints(&t), vec![0, 0]);
        assert!(get_attr(&t, "label").unwrap().is(&Value::str("origin")));

        let tuple = Value::Type(registry.builtins().tuple.clone());
        let err = call(&tuple, &[ints(&[0])], &kwargs).unwrap_err();
        assert_eq!(err.exception_name(), "TypeError");
    }

    #[test]
    fn test_object_new_on_tuple_subtype_is_unsafe() {
        let registry = global_registry();
        let pair = registry
            .new_subtype("Pair", &registry.builtins().tuple, AttrStorage::Slots)
            .unwrap();
        let object = Value::Type(registry.builtins().object.clone());

        let err = call_method(&object, "__new__", &[Value::Type(pair)], &[]).unwrap_err();
        assert_eq!(err.exception_name(), "TypeError");
        assert_eq!(
            err.to_string(),
            "object.__new__(Pair) is not safe, use tuple.__new__()"
        );
    }

    #[test]
    fn test_tuple_new_requires_subtype() {
        let registry = global_registry();
        let new_fn = get_attr(&tuple_type(), "__new__").unwrap();
        let int = Value::Type(registry.builtins().int.clone());

        let err = call(&new_fn, &[int], &[]).unwrap_err();
        assert_eq!(err.to_string(), "tuple.__new__(int): int is not a subtype of tuple");

        let err = call(&new_fn, &[Value::Int(1)], &[]).unwrap_err();
        assert_eq!(err.to_string(), "tuple.__new__(X): X is not a type object (int)");

        let err = call(&new_fn, &[], &[]).unwrap_err();
        assert_eq!(err.to_string(), "tuple.__new__(): not enough arguments");
    }
}

// =============================================================================
// Iteration
// =============================================================================

mod iteration_tests {
    use super::*;

    #[test]
    fn test_reversed() {
        let reversed = ops::reversed(&ints(&[1, 2, 3])).unwrap();
        assert_eq!(reversed.type_name().as_str(), "reversed");
        let items: Vec<i64> = ops::collect(&reversed)
            .unwrap()
            .iter()
            .map(|v| v.as_int().unwrap())
            .collect();
        assert_eq!(items, vec![3, 2, 1]);
    }

    #[test]
    fn test_iterator_exhaustion_is_sticky() {
        let it = ops::iter(&ints(&[1])).unwrap();
        assert_eq!(it.type_name().as_str(), "tuple_iterator");
        assert!(ops::next(&it).unwrap().is_some());
        assert!(ops::next(&it).unwrap().is_none());
        assert!(ops::next(&it).unwrap().is_none());

        let err = call_method(&it, "__next__", &[], &[]).unwrap_err();
        assert!(err.is_stop_iteration());
    }

    #[test]
    fn test_checked_iterator_detects_growth() {
        let registry = global_registry();
        let ty = registry
            .new_subtype("Bag", &registry.builtins().object, AttrStorage::Dict)
            .unwrap();
        let obj = call(&Value::Type(ty), &[], &[]).unwrap();
        let dict = obj.instance_dict().unwrap().clone();
        dict.insert(ember_runtime::intern("a"), Value::Int(1));

        let keys = AttrDict::keys_iter(&dict).into_value();
        assert_eq!(keys.type_name().as_str(), "dict_keyiterator");
        assert!(ops::next(&keys).unwrap().unwrap().is(&Value::str("a")));

        dict.insert(ember_runtime::intern("b"), Value::Int(2));
        let err = ops::next(&keys).unwrap_err();
        assert_eq!(err.exception_name(), "RuntimeError");
        assert_eq!(err.to_string(), "dict changed size during iteration");
    }

    #[test]
    fn test_checked_iterator_survives_dropped_container() {
        let dict = std::sync::Arc::new(AttrDict::new());
        dict.insert(ember_runtime::intern("only"), Value::None);
        let keys = AttrDict::keys_iter(&dict).into_value();
        drop(dict);

        assert!(ops::next(&keys).unwrap().is_some());
        assert!(ops::next(&keys).unwrap().is_none());
    }
}
