//! Integration tests for bind interception
//!
//! Tests cover:
//! - Bound references resolving to the live dispatcher at call time
//! - Binding before and after advice exists
//! - Repeated rebinds and inherited methods
//! - Wrapping several utilities independently, and unwrapping
//! - Registry hygiene after full advice removal

use weave_aspect::{bind_all, bind_utility, Aspect, Function, Object, Value};

/// Subject with `get_id` (reads the `id` slot, default 0) available on
/// its prototype, the way the original consumers defined it.
fn subject_proto() -> Object {
    let proto = Object::new();
    proto.define_method("get_id", |this, _| {
        Ok(this
            .as_object()
            .and_then(|o| o.get("id"))
            .unwrap_or(Value::Int(0)))
    });
    proto
}

/// Bind `target[method]` to `target` through `lib`, returning the bound
/// function.
fn bind_method(lib: &Object, target: &Object, method: &str) -> Function {
    let func = target.get(method).expect("method should exist");
    let bound = lib
        .invoke("bind", &[func, Value::Object(target.clone())])
        .expect("bind should succeed");
    bound.as_function().expect("bind should return a function").clone()
}

fn call(f: &Function) -> i64 {
    f.call(&Value::Undefined, &[]).unwrap().as_int().unwrap()
}

#[test]
fn test_bound_reference_tracks_advice_attached_later() {
    let aspect = Aspect::new();
    let lib = bind_utility();
    let _wrap = aspect.wrap_bind(&lib);

    let obj = Object::with_proto(&subject_proto());

    // Bind before any advice exists.
    let bound = bind_method(&lib, &obj, "get_id");
    assert_eq!(call(&bound), 0);

    // Advice attached after the bind must be visible through the
    // earlier-bound reference: the proxy re-resolves at call time.
    let handle = aspect.after(&obj, "get_id", |_, result, _| {
        Ok(Value::Int(result.as_int().unwrap_or(0) + 1))
    });
    assert_eq!(call(&bound), 1);

    handle.remove();
    assert_eq!(call(&bound), 0);
}

#[test]
fn test_binding_an_advised_method() {
    let aspect = Aspect::new();
    let lib = bind_utility();
    let _wrap = aspect.wrap_bind(&lib);

    let obj = Object::with_proto(&subject_proto());
    let handle = aspect.after(&obj, "get_id", |_, result, _| {
        Ok(Value::Int(result.as_int().unwrap_or(0) + 1))
    });

    // The slot now holds the dispatcher; binding it still yields a
    // tracking reference.
    let bound = bind_method(&lib, &obj, "get_id");
    assert_eq!(call(&bound), 1);

    handle.remove();
    assert_eq!(call(&bound), 0);
}

#[test]
fn test_repeated_aspect_through_one_bound_reference() {
    let aspect = Aspect::new();
    let lib = bind_utility();
    let _wrap = aspect.wrap_bind(&lib);

    let obj = Object::with_proto(&subject_proto());
    let bound = bind_method(&lib, &obj, "get_id");

    // Keep stacking after-advice; the single bound reference sees each
    // addition.
    let mut handles = Vec::new();
    for expected in 1..=50 {
        handles.push(aspect.after(&obj, "get_id", |_, result, _| {
            Ok(Value::Int(result.as_int().unwrap_or(0) + 1))
        }));
        assert_eq!(call(&bound), expected);
    }
}

#[test]
fn test_rebind_then_aspect_many_times() {
    let aspect = Aspect::new();
    let lib = bind_utility();
    let _wrap = aspect.wrap_bind(&lib);

    let obj = Object::with_proto(&subject_proto());

    // Rebinding between attaches must keep finding the live dispatcher.
    let mut handles = Vec::new();
    for expected in 1..=50 {
        let bound = bind_method(&lib, &obj, "get_id");
        handles.push(aspect.after(&obj, "get_id", |_, result, _| {
            Ok(Value::Int(result.as_int().unwrap_or(0) + 1))
        }));
        assert_eq!(call(&bound), expected);
    }
}

#[test]
fn test_inherited_method_bound_then_advised() {
    let aspect = Aspect::new();
    let lib = bind_utility();
    let _wrap = aspect.wrap_bind(&lib);

    let proto = subject_proto();
    let descendant = Object::with_proto(&proto);
    descendant.set("id", Value::Int(10));

    // The bound function comes off the prototype; the advice then
    // installs a dispatcher directly on the descendant.
    let bound = bind_method(&lib, &descendant, "get_id");
    assert_eq!(call(&bound), 10);

    let handle = aspect.after(&descendant, "get_id", |_, result, _| {
        Ok(Value::Int(result.as_int().unwrap_or(0) + 1))
    });
    assert_eq!(call(&bound), 11);

    // The prototype and its other descendants are untouched.
    let sibling = Object::with_proto(&proto);
    sibling.set("id", Value::Int(3));
    assert_eq!(sibling.invoke("get_id", &[]).unwrap(), Value::Int(3));

    handle.remove();
    assert_eq!(call(&bound), 10);
}

#[test]
fn test_bind_all_through_wrapped_lib() {
    let aspect = Aspect::new();
    let lib = bind_utility();
    let _wrap = aspect.wrap_bind(&lib);

    let obj = Object::with_proto(&subject_proto());
    bind_all(&lib, &obj, &["get_id"]).unwrap();

    // The own slot now holds a bound function; advising it wraps that
    // bound function as the fallback.
    let handle = aspect.around(&obj, "get_id", |proceed| {
        move |this: &Value, args: &[Value]| -> weave_aspect::CallResult {
            Ok(Value::Int(proceed(this, args)?.as_int().unwrap_or(0) + 42))
        }
    });
    assert_eq!(obj.invoke("get_id", &[]).unwrap(), Value::Int(42));

    handle.remove();
    assert_eq!(obj.invoke("get_id", &[]).unwrap(), Value::Int(0));
}

#[test]
fn test_partial_arguments_survive_interception() {
    let aspect = Aspect::new();
    let lib = bind_utility();
    let _wrap = aspect.wrap_bind(&lib);

    let obj = Object::new();
    obj.define_method("sum", |_, args| {
        Ok(Value::Int(args.iter().filter_map(Value::as_int).sum()))
    });

    let bound = lib
        .invoke(
            "bind",
            &[
                obj.get("sum").unwrap(),
                Value::Object(obj.clone()),
                Value::Int(10),
            ],
        )
        .unwrap();
    let bound = bound.as_function().unwrap().clone();
    assert_eq!(bound.call(&Value::Undefined, &[Value::Int(5)]).unwrap(), Value::Int(15));

    // The proxy receives the partial-extended argument list, so advice
    // sees it too.
    let _before = aspect.before(&obj, "sum", |_, args| {
        let mut args = args.to_vec();
        args[0] = Value::Int(args[0].as_int().unwrap_or(0) + 1);
        Ok(Some(args))
    });
    assert_eq!(bound.call(&Value::Undefined, &[Value::Int(5)]).unwrap(), Value::Int(16));
}

#[test]
fn test_unwrap_restores_plain_binding() {
    let aspect = Aspect::new();
    let lib = bind_utility();
    let wrap = aspect.wrap_bind(&lib);
    wrap.remove();

    let obj = Object::with_proto(&subject_proto());
    let bound = bind_method(&lib, &obj, "get_id");

    // Without interception the bound reference captured the raw
    // method, so later advice is invisible to it.
    let _handle = aspect.after(&obj, "get_id", |_, result, _| {
        Ok(Value::Int(result.as_int().unwrap_or(0) + 1))
    });
    assert_eq!(call(&bound), 0);
    assert_eq!(obj.invoke("get_id", &[]).unwrap(), Value::Int(1));
}

#[test]
fn test_wrap_multiple_libs_independently() {
    let aspect = Aspect::new();
    let lib_a = bind_utility();
    let lib_b = bind_utility();
    let wrap_a = aspect.wrap_bind(&lib_a);
    let _wrap_b = aspect.wrap_bind(&lib_b);

    let obj = Object::with_proto(&subject_proto());
    wrap_a.remove();

    let bound_a = bind_method(&lib_a, &obj, "get_id");
    let bound_b = bind_method(&lib_b, &obj, "get_id");

    let _handle = aspect.after(&obj, "get_id", |_, result, _| {
        Ok(Value::Int(result.as_int().unwrap_or(0) + 1))
    });

    // Only the still-wrapped utility produces tracking references.
    assert_eq!(call(&bound_a), 0);
    assert_eq!(call(&bound_b), 1);
}

#[test]
fn test_non_function_bind_argument_passes_through() {
    let aspect = Aspect::new();
    let lib = bind_utility();
    let _wrap = aspect.wrap_bind(&lib);

    // The interceptor leaves a non-function first argument alone and
    // the utility's own type error surfaces.
    let err = lib.invoke("bind", &[Value::Int(1)]).unwrap_err();
    assert!(matches!(err, weave_aspect::CallError::TypeError(_)));
}

#[test]
fn test_registry_cleans_up_after_full_removal() {
    let aspect = Aspect::new();
    let lib = bind_utility();
    let _wrap = aspect.wrap_bind(&lib);

    let proto = subject_proto();
    let descendant = Object::with_proto(&proto);

    // One entry: the wrapped utility's own bind dispatcher.
    let baseline = aspect.dispatcher_count();

    for round in 0..30u32 {
        let method = format!("other{round}");
        descendant.define_method(&method, |_, _| Ok(Value::Undefined));

        let handle = match round % 3 {
            0 => aspect.after(&descendant, &method, |_, result, _| Ok(result)),
            1 => aspect.before(&descendant, &method, |_, _| Ok(None)),
            _ => aspect.around(&descendant, &method, |proceed| {
                move |this: &Value, args: &[Value]| -> weave_aspect::CallResult {
                    proceed(this, args)
                }
            }),
        };
        handle.remove();
    }

    assert_eq!(aspect.dispatcher_count(), baseline);
}
