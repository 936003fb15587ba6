//! Unit tests for umbra-shadow

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use test_case::test_case;
use umbra_types::{MethodSignature, RealType};

use crate::{
    ClassHierarchy, InvocationError, InvocationResult, ObjectRef, OverridePolicy, RealObject,
    ShadowBinder, ShadowDescriptor, ShadowError, ShadowRegistry, Value,
};

const OBJECT: &str = "java.lang.Object";
const DRAWABLE: &str = "android.graphics.drawable.Drawable";
const BITMAP: &str = "android.graphics.drawable.BitmapDrawable";
const COLOR: &str = "android.graphics.drawable.ColorDrawable";
const VIEW: &str = "android.view.View";

/// Real instance that counts how often its real bodies run.
struct Framework {
    real_type: RealType,
    real_calls: AtomicUsize,
}

impl Framework {
    fn new(real_type: &str) -> Arc<Self> {
        Arc::new(Self {
            real_type: RealType::new(real_type),
            real_calls: AtomicUsize::new(0),
        })
    }

    fn real_calls(&self) -> usize {
        self.real_calls.load(Ordering::SeqCst)
    }
}

impl RealObject for Framework {
    fn real_type(&self) -> RealType {
        self.real_type.clone()
    }

    fn invoke_real(&self, method: &MethodSignature, _args: &[Value]) -> InvocationResult {
        self.real_calls.fetch_add(1, Ordering::SeqCst);
        match method.name() {
            "getAlpha" => Ok(Value::Int(255)),
            "throwReal" => Err(InvocationError::thrown("IllegalStateException", "real body")),
            _ => Err(InvocationError::NoSuchMethod {
                real_type: self.real_type.clone(),
                method: method.clone(),
            }),
        }
    }
}

fn object_ref(framework: &Arc<Framework>) -> ObjectRef {
    Arc::clone(framework) as ObjectRef
}

#[derive(Default)]
struct ShadowDrawable {
    shadow_calls: AtomicUsize,
    bounds: Mutex<Option<(i64, i64)>>,
}

impl ShadowDrawable {
    fn calls(&self) -> usize {
        self.shadow_calls.load(Ordering::SeqCst)
    }

    fn bounds(&self) -> Option<(i64, i64)> {
        *self.bounds.lock().unwrap()
    }
}

fn drawable_descriptor() -> ShadowDescriptor {
    ShadowDescriptor::with_default::<ShadowDrawable>(DRAWABLE)
        .implement("getIntrinsicWidth()", |shadow, _| {
            shadow.shadow_calls.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Int(100))
        })
        .implement("setBounds(int,int)", |shadow, call| {
            shadow.shadow_calls.fetch_add(1, Ordering::SeqCst);
            let width = call.arg(0)?.as_int().unwrap_or_default();
            let height = call.arg(1)?.as_int().unwrap_or_default();
            *shadow.bounds.lock().unwrap() = Some((width, height));
            Ok(Value::Void)
        })
        .implement("invalidateSelf()", |_, _| {
            Err(InvocationError::thrown(
                "UnsupportedOperationException",
                "invalidateSelf is not simulated",
            ))
        })
        .implement_static("createFromPath(String)", |args| {
            Ok(Value::from(format!(
                "drawable:{}",
                args.first().and_then(Value::as_str).unwrap_or("")
            )))
        })
        .build()
}

fn hierarchy() -> ClassHierarchy {
    let mut hierarchy = ClassHierarchy::new();
    hierarchy.declare(DRAWABLE, OBJECT).unwrap();
    hierarchy.declare(BITMAP, DRAWABLE).unwrap();
    hierarchy.declare(COLOR, DRAWABLE).unwrap();
    hierarchy.declare(VIEW, OBJECT).unwrap();
    hierarchy
}

fn binder() -> ShadowBinder {
    let registry = ShadowRegistry::new(hierarchy());
    registry.register(drawable_descriptor()).unwrap();
    ShadowBinder::new(Arc::new(registry))
}

// ============================================================================
// Registry Tests
// ============================================================================

#[test]
fn duplicate_registration_is_rejected_and_keeps_first() {
    let registry = ShadowRegistry::new(hierarchy());
    let first = registry.register(drawable_descriptor()).unwrap();

    let second = ShadowDescriptor::with_default::<ShadowDrawable>(DRAWABLE).build();
    let err = registry.register(second).unwrap_err();

    assert_eq!(
        err,
        ShadowError::DuplicateRegistration {
            real_type: RealType::new(DRAWABLE)
        }
    );
    assert!(err.to_string().contains(DRAWABLE));
    let current = registry.get(&RealType::new(DRAWABLE)).unwrap();
    assert!(Arc::ptr_eq(&first, &current));
}

#[test]
fn reregistration_after_deregister_succeeds() {
    let registry = ShadowRegistry::new(hierarchy());
    registry.register(drawable_descriptor()).unwrap();
    registry.deregister(&RealType::new(DRAWABLE)).unwrap();
    assert!(registry.register(drawable_descriptor()).is_ok());
    assert_eq!(registry.len(), 1);
}

#[test_case(DRAWABLE, Some(DRAWABLE) ; "exact match")]
#[test_case(BITMAP, Some(DRAWABLE) ; "subtype falls back to parent")]
#[test_case(OBJECT, None ; "supertype does not see subtype shadow")]
#[test_case(VIEW, None ; "sibling branch is unshadowed")]
#[test_case("com.example.Undeclared", None ; "undeclared type")]
fn resolve_walks_ancestors(requested: &str, expected: Option<&str>) {
    let registry = ShadowRegistry::new(hierarchy());
    registry.register(drawable_descriptor()).unwrap();

    let resolved = registry.resolve(&RealType::new(requested));
    assert_eq!(
        resolved.as_ref().map(|d| d.real_type().qualified_name()),
        expected
    );
}

#[test]
fn nearest_ancestor_wins() {
    let registry = ShadowRegistry::new(hierarchy());
    registry.register(drawable_descriptor()).unwrap();
    registry
        .register(ShadowDescriptor::with_default::<ShadowDrawable>(OBJECT).build())
        .unwrap();
    registry
        .register(ShadowDescriptor::with_default::<ShadowDrawable>(BITMAP).build())
        .unwrap();

    let pick = |ty: &str| {
        registry
            .resolve(&RealType::new(ty))
            .map(|d| d.real_type().qualified_name().to_string())
    };
    assert_eq!(pick(BITMAP).as_deref(), Some(BITMAP));
    assert_eq!(pick(COLOR).as_deref(), Some(DRAWABLE));
    assert_eq!(pick(VIEW).as_deref(), Some(OBJECT));
}

#[test]
fn registered_types_are_sorted() {
    let registry = ShadowRegistry::new(hierarchy());
    registry
        .register(ShadowDescriptor::with_default::<ShadowDrawable>(VIEW).build())
        .unwrap();
    registry.register(drawable_descriptor()).unwrap();

    let names: Vec<_> = registry
        .registered_types()
        .iter()
        .map(|ty| ty.qualified_name().to_string())
        .collect();
    assert_eq!(names, vec![DRAWABLE.to_string(), VIEW.to_string()]);
}

#[test]
fn concurrent_resolution_agrees() {
    let registry = Arc::new(ShadowRegistry::new(hierarchy()));
    registry.register(drawable_descriptor()).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                registry
                    .resolve(&RealType::new(BITMAP))
                    .map(|d| d.real_type().clone())
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), Some(RealType::new(DRAWABLE)));
    }
}

// ============================================================================
// Binder Tests
// ============================================================================

#[test]
fn bind_is_idempotent() {
    let binder = binder();
    let bitmap = Framework::new(BITMAP);
    let real = object_ref(&bitmap);

    let first = binder.bind(&real).unwrap();
    let second = binder.bind(&real).unwrap();

    assert_eq!(first, second);
    assert_eq!(binder.binding_count(), 1);
    assert_eq!(first.real_type().qualified_name(), BITMAP);
    assert_eq!(first.descriptor().real_type().qualified_name(), DRAWABLE);
}

#[test]
fn distinct_instances_get_distinct_bindings() {
    let binder = binder();
    let a = object_ref(&Framework::new(BITMAP));
    let b = object_ref(&Framework::new(BITMAP));

    let first = binder.bind(&a).unwrap();
    let second = binder.bind(&b).unwrap();
    assert_ne!(first, second);
    assert_eq!(binder.binding_count(), 2);
}

#[test]
fn unshadowed_type_is_an_error_and_stores_nothing() {
    let binder = binder();
    let view = object_ref(&Framework::new(VIEW));

    let err = binder.bind(&view).unwrap_err();
    assert_eq!(
        err,
        ShadowError::UnshadowedType {
            real_type: RealType::new(VIEW)
        }
    );
    assert!(err.to_string().contains(VIEW));
    assert!(!binder.is_bound(&view));
    assert_eq!(binder.binding_count(), 0);
}

#[test]
fn overridden_methods_never_run_real_body() {
    let binder = binder();
    let bitmap = Framework::new(BITMAP);
    let real = object_ref(&bitmap);
    let binding = binder.bind(&real).unwrap();
    let width = MethodSignature::new("getIntrinsicWidth()");

    assert_eq!(
        binding.descriptor().policy_for(&width),
        OverridePolicy::Replace
    );
    for _ in 0..3 {
        assert_eq!(binder.dispatch(&binding, &width, &[]).unwrap(), Value::Int(100));
    }

    let shadow_calls = binder
        .with_shadow(&real, |shadow: &ShadowDrawable| shadow.calls())
        .unwrap();
    assert_eq!(shadow_calls, 3);
    assert_eq!(bitmap.real_calls(), 0);
}

#[test]
fn non_overridden_methods_delegate_to_real_body() {
    let binder = binder();
    let bitmap = Framework::new(BITMAP);
    let real = object_ref(&bitmap);
    let alpha = MethodSignature::new("getAlpha()");

    let result = binder.invoke(&real, &alpha, &[]).unwrap();

    assert_eq!(result, Value::Int(255));
    assert_eq!(bitmap.real_calls(), 1);
    let shadow_calls = binder
        .with_shadow(&real, |shadow: &ShadowDrawable| shadow.calls())
        .unwrap();
    assert_eq!(shadow_calls, 0);
}

#[test]
fn shadow_errors_propagate_unchanged() {
    let binder = binder();
    let real = object_ref(&Framework::new(BITMAP));

    let err = binder
        .invoke(&real, &MethodSignature::new("invalidateSelf()"), &[])
        .unwrap_err();
    assert_eq!(
        err,
        InvocationError::thrown(
            "UnsupportedOperationException",
            "invalidateSelf is not simulated"
        )
    );
}

#[test]
fn real_errors_propagate_unchanged() {
    let binder = binder();
    let real = object_ref(&Framework::new(BITMAP));

    let err = binder
        .invoke(&real, &MethodSignature::new("throwReal()"), &[])
        .unwrap_err();
    assert_eq!(
        err,
        InvocationError::thrown("IllegalStateException", "real body")
    );
}

#[test]
fn invoke_on_unshadowed_instance_reports_binding_error() {
    let binder = binder();
    let view = object_ref(&Framework::new(VIEW));

    let err = binder
        .invoke(&view, &MethodSignature::new("getAlpha()"), &[])
        .unwrap_err();
    assert!(matches!(
        err,
        InvocationError::Binding(ShadowError::UnshadowedType { .. })
    ));
}

#[test]
fn shadow_state_persists_across_calls() {
    let binder = binder();
    let real = object_ref(&Framework::new(COLOR));

    binder
        .invoke(
            &real,
            &MethodSignature::new("setBounds(int,int)"),
            &[Value::from(32), Value::from(64)],
        )
        .unwrap();

    let bounds = binder
        .with_shadow(&real, |shadow: &ShadowDrawable| shadow.bounds())
        .unwrap();
    assert_eq!(bounds, Some((32, 64)));
}

#[test]
fn missing_argument_is_a_thrown_exception() {
    let binder = binder();
    let real = object_ref(&Framework::new(COLOR));

    let err = binder
        .invoke(&real, &MethodSignature::new("setBounds(int,int)"), &[Value::from(1)])
        .unwrap_err();
    assert!(matches!(
        err,
        InvocationError::Thrown { ref exception, .. } if exception == "IllegalArgumentException"
    ));
}

#[test]
fn with_shadow_rejects_wrong_type() {
    let binder = binder();
    let real = object_ref(&Framework::new(BITMAP));

    let err = binder
        .with_shadow(&real, |_: &String| ())
        .unwrap_err();
    assert!(matches!(err, InvocationError::ShadowTypeMismatch { .. }));
}

/// Real drawable whose `computeWidth()` body calls back into the
/// overridden `getIntrinsicWidth()` through the binder.
struct LayeredDrawable {
    binder: std::sync::Weak<ShadowBinder>,
    this: std::sync::OnceLock<std::sync::Weak<LayeredDrawable>>,
}

impl RealObject for LayeredDrawable {
    fn real_type(&self) -> RealType {
        RealType::new(DRAWABLE)
    }

    fn invoke_real(&self, method: &MethodSignature, _args: &[Value]) -> InvocationResult {
        match method.name() {
            "computeWidth" => {
                let binder = self.binder.upgrade().unwrap();
                let this: ObjectRef = self.this.get().unwrap().upgrade().unwrap();
                binder.invoke(&this, &MethodSignature::new("getIntrinsicWidth()"), &[])
            }
            _ => Err(InvocationError::NoSuchMethod {
                real_type: self.real_type(),
                method: method.clone(),
            }),
        }
    }
}

#[test]
fn real_body_can_reenter_overridden_methods_of_same_instance() {
    let registry = Arc::new(ShadowRegistry::new(hierarchy()));
    let binder = Arc::new(ShadowBinder::new(Arc::clone(&registry)));
    registry
        .register(
            ShadowDescriptor::with_default::<ShadowDrawable>(DRAWABLE)
                .implement("setBounds(int,int)", |shadow, call| {
                    let width = call.arg(0)?.as_int().unwrap_or_default();
                    *shadow.bounds.lock().unwrap() = Some((width, width));
                    Ok(Value::Void)
                })
                .implement("getIntrinsicWidth()", |shadow, _| {
                    shadow.shadow_calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Value::Int(shadow.bounds().map_or(-1, |(width, _)| width)))
                })
                .implement("getBounds()", |shadow, call| {
                    shadow.shadow_calls.fetch_add(1, Ordering::SeqCst);
                    call.real.invoke_real(&MethodSignature::new("computeWidth()"), &[])
                })
                .build(),
        )
        .unwrap();

    let drawable = Arc::new(LayeredDrawable {
        binder: Arc::downgrade(&binder),
        this: std::sync::OnceLock::new(),
    });
    drawable.this.set(Arc::downgrade(&drawable)).unwrap();
    let real: ObjectRef = drawable;

    binder
        .invoke(&real, &MethodSignature::new("setBounds(int,int)"), &[Value::from(48)])
        .unwrap();
    let width = binder
        .invoke(&real, &MethodSignature::new("getBounds()"), &[])
        .unwrap();

    assert_eq!(width, Value::Int(48));
    let calls = binder
        .with_shadow(&real, |shadow: &ShadowDrawable| shadow.calls())
        .unwrap();
    assert_eq!(calls, 2);
}

#[test]
fn shadow_method_can_dispatch_into_its_own_binding() {
    let registry = Arc::new(ShadowRegistry::new(hierarchy()));
    let binder = Arc::new(ShadowBinder::new(Arc::clone(&registry)));

    let inner = Arc::downgrade(&binder);
    registry
        .register(
            ShadowDescriptor::with_default::<ShadowDrawable>(DRAWABLE)
                .implement("countDown(int)", move |shadow, call| {
                    shadow.shadow_calls.fetch_add(1, Ordering::SeqCst);
                    let remaining = call.arg(0)?.as_int().unwrap_or_default();
                    if remaining == 0 {
                        return Ok(Value::Int(0));
                    }
                    let binder = inner.upgrade().unwrap();
                    let this = call.this().unwrap();
                    binder.invoke(&this, call.method, &[Value::from(remaining - 1)])
                })
                .build(),
        )
        .unwrap();

    let real = object_ref(&Framework::new(DRAWABLE));
    let result = binder
        .invoke(&real, &MethodSignature::new("countDown(int)"), &[Value::from(3)])
        .unwrap();

    assert_eq!(result, Value::Int(0));
    let calls = binder
        .with_shadow(&real, |shadow: &ShadowDrawable| shadow.calls())
        .unwrap();
    assert_eq!(calls, 4);
}

#[test]
fn static_dispatch_uses_exact_type_only() {
    let binder = binder();
    let create = MethodSignature::new("createFromPath(String)");
    let real_body = |_: &[Value]| -> InvocationResult { Ok(Value::from("real")) };

    let shadowed = binder
        .dispatch_static(&RealType::new(DRAWABLE), &create, &[Value::from("a.png")], real_body)
        .unwrap();
    assert_eq!(shadowed, Value::from("drawable:a.png"));

    let other = MethodSignature::new("getOpacity()");
    let delegated = binder
        .dispatch_static(&RealType::new(DRAWABLE), &other, &[], real_body)
        .unwrap();
    assert_eq!(delegated, Value::from("real"));

    let err = binder
        .dispatch_static(&RealType::new(BITMAP), &create, &[], real_body)
        .unwrap_err();
    assert!(matches!(
        err,
        InvocationError::Binding(ShadowError::UnshadowedType { .. })
    ));
}

#[test]
fn shadow_constructor_sees_real_instance() {
    let registry = Arc::new(ShadowRegistry::new(hierarchy()));
    registry
        .register(
            ShadowDescriptor::builder(VIEW, |real: &crate::RealHandle| {
                real.upgrade().map(|this| this.real_type())
            })
            .build(),
        )
        .unwrap();
    let binder = ShadowBinder::new(registry);
    let real = object_ref(&Framework::new(VIEW));

    let seen = binder
        .with_shadow(&real, |seen: &Option<RealType>| seen.clone())
        .unwrap();
    assert_eq!(seen, Some(RealType::new(VIEW)));
}

#[test]
fn dispatch_after_real_instance_dropped() {
    let binder = binder();
    let real = object_ref(&Framework::new(BITMAP));
    let binding = binder.bind(&real).unwrap();
    drop(real);

    assert!(!binding.real().is_alive());
    let err = binder
        .dispatch(&binding, &MethodSignature::new("getAlpha()"), &[])
        .unwrap_err();
    assert!(matches!(err, InvocationError::RealInstanceDropped { .. }));

    // Overridden signatures still reach the shadow.
    let width = binder
        .dispatch(&binding, &MethodSignature::new("getIntrinsicWidth()"), &[])
        .unwrap();
    assert_eq!(width, Value::Int(100));
}

#[test]
fn purge_releases_only_dead_instances() {
    let binder = binder();
    let kept = object_ref(&Framework::new(BITMAP));
    let dropped = object_ref(&Framework::new(COLOR));
    binder.bind(&kept).unwrap();
    binder.bind(&dropped).unwrap();
    drop(dropped);

    assert_eq!(binder.purge_unreachable(), 1);
    assert_eq!(binder.binding_count(), 1);
    assert!(binder.is_bound(&kept));
}

#[test]
fn growing_table_sweeps_dead_bindings() {
    let binder = binder();
    for _ in 0..crate::binder::PURGE_THRESHOLD {
        let real = object_ref(&Framework::new(BITMAP));
        binder.bind(&real).unwrap();
    }
    assert_eq!(binder.binding_count(), crate::binder::PURGE_THRESHOLD);

    let kept = object_ref(&Framework::new(BITMAP));
    binder.bind(&kept).unwrap();
    assert_eq!(binder.binding_count(), 1);
    assert!(binder.is_bound(&kept));
}

#[test]
fn clear_releases_everything() {
    let binder = binder();
    let real = object_ref(&Framework::new(BITMAP));
    let before = binder.bind(&real).unwrap();
    binder
        .invoke(&real, &MethodSignature::new("getIntrinsicWidth()"), &[])
        .unwrap();

    binder.clear();
    assert_eq!(binder.binding_count(), 0);
    assert!(!binder.is_bound(&real));

    // A fresh binding starts from a fresh shadow.
    let after = binder.bind(&real).unwrap();
    assert_ne!(before, after);
    let calls = binder
        .with_shadow(&real, |shadow: &ShadowDrawable| shadow.calls())
        .unwrap();
    assert_eq!(calls, 0);
}
