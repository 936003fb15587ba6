//! A full test lifecycle through the top-level API: configure, register
//! shadows, set up, drive real objects and the main scheduler, tear down
//! and set up again.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use umbra::prelude::*;
use umbra::{ConfigField, Phase, ShadowBinder};

const DRAWABLE: &str = "android.graphics.drawable.Drawable";
const BITMAP_DRAWABLE: &str = "android.graphics.drawable.BitmapDrawable";

struct BitmapDrawable {
    real_calls: AtomicUsize,
}

impl BitmapDrawable {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            real_calls: AtomicUsize::new(0),
        })
    }
}

impl RealObject for BitmapDrawable {
    fn real_type(&self) -> RealType {
        RealType::new(BITMAP_DRAWABLE)
    }

    fn invoke_real(&self, method: &MethodSignature, _args: &[Value]) -> InvocationResult {
        self.real_calls.fetch_add(1, Ordering::SeqCst);
        match method.name() {
            "getAlpha" => Ok(Value::Int(255)),
            _ => Err(InvocationError::thrown(
                "UnsupportedOperationException",
                method.to_string(),
            )),
        }
    }
}

struct ShadowDrawable {
    real_type: RealType,
    bounds: Mutex<Option<(i64, i64)>>,
    simulated_calls: AtomicUsize,
}

fn drawable_shadow() -> ShadowDescriptor {
    ShadowDescriptor::builder(DRAWABLE, |real| ShadowDrawable {
        real_type: real.real_type().clone(),
        bounds: Mutex::new(None),
        simulated_calls: AtomicUsize::new(0),
    })
    .implement("setBounds(int,int)", |shadow, call| {
        shadow.simulated_calls.fetch_add(1, Ordering::SeqCst);
        let (Value::Int(width), Value::Int(height)) = (call.arg(0)?, call.arg(1)?) else {
            return Err(InvocationError::thrown("IllegalArgumentException", "bounds"));
        };
        *shadow.bounds.lock().unwrap() = Some((*width, *height));
        Ok(Value::Void)
    })
    .implement("getIntrinsicWidth()", |shadow, _| {
        shadow.simulated_calls.fetch_add(1, Ordering::SeqCst);
        let bounds = *shadow.bounds.lock().unwrap();
        Ok(Value::Int(bounds.map_or(-1, |(width, _)| width)))
    })
    .build()
}

fn project(toml: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("umbra.toml"), toml).unwrap();
    dir
}

fn harness(project_dir: &std::path::Path) -> Umbra {
    let umbra = Umbra::load(project_dir, ShadowRegistry::default()).unwrap();
    umbra.declare_type(BITMAP_DRAWABLE, DRAWABLE).unwrap();
    umbra.register(drawable_shadow()).unwrap();
    umbra
}

fn set_up(universe: &mut ParallelUniverse, method: &str, qualifiers: &str) {
    universe
        .set_up(
            &TestIdentity::new("com.example.DrawableTest", method),
            &StaticManifest::new("com.example"),
            &TestConfig::with_qualifiers(qualifiers),
            ResourceContexts::in_memory("com.example"),
        )
        .unwrap();
}

fn call(binder: &ShadowBinder, object: &ObjectRef, method: &str, args: &[Value]) -> InvocationResult {
    binder.invoke(object, &MethodSignature::new(method), args)
}

#[test]
fn shadowed_calls_never_reach_the_real_body() {
    let dir = project("");
    let umbra = harness(dir.path());
    let mut universe = umbra.universe();
    set_up(&mut universe, "bounds", "");

    let drawable = BitmapDrawable::new();
    let object: ObjectRef = drawable.clone();
    let binder = Arc::clone(universe.binder());

    call(&binder, &object, "setBounds(int,int)", &[Value::Int(48), Value::Int(32)]).unwrap();
    let width = call(&binder, &object, "getIntrinsicWidth()", &[]).unwrap();
    assert_eq!(width, Value::Int(48));
    assert_eq!(drawable.real_calls.load(Ordering::SeqCst), 0);

    let alpha = call(&binder, &object, "getAlpha()", &[]).unwrap();
    assert_eq!(alpha, Value::Int(255));
    assert_eq!(drawable.real_calls.load(Ordering::SeqCst), 1);

    let (calls, real_type) = binder
        .with_shadow::<ShadowDrawable, _>(&object, |shadow| {
            (shadow.simulated_calls.load(Ordering::SeqCst), shadow.real_type.clone())
        })
        .unwrap();
    assert_eq!(calls, 2);
    assert_eq!(real_type.qualified_name(), BITMAP_DRAWABLE);

    universe.tear_down().unwrap();
}

#[test]
fn shadow_state_does_not_survive_tear_down() {
    let dir = project("");
    let umbra = harness(dir.path());
    let mut universe = umbra.universe();

    let object: ObjectRef = BitmapDrawable::new();

    set_up(&mut universe, "first", "");
    call(universe.binder(), &object, "setBounds(int,int)", &[Value::Int(10), Value::Int(10)])
        .unwrap();
    assert_eq!(universe.binder().binding_count(), 1);
    universe.tear_down().unwrap();
    assert_eq!(universe.binder().binding_count(), 0);

    set_up(&mut universe, "second", "");
    let width = call(universe.binder(), &object, "getIntrinsicWidth()", &[]).unwrap();
    assert_eq!(width, Value::Int(-1));
    universe.tear_down().unwrap();
}

#[test]
fn main_scheduler_runs_posted_work_in_virtual_time_order() {
    let dir = project("[scheduler]\nstart_paused = true\n");
    let umbra = harness(dir.path());
    let mut universe = umbra.universe();
    set_up(&mut universe, "scheduling", "");

    let scheduler = universe.main_scheduler().unwrap();
    assert!(scheduler.is_paused());

    let order = Arc::new(Mutex::new(Vec::new()));
    for (label, delay) in [("A", 10), ("B", 0), ("C", 5)] {
        let order = Arc::clone(&order);
        scheduler.post_delayed(move || order.lock().unwrap().push(label), delay);
    }
    scheduler.advance_to(10);
    assert_eq!(*order.lock().unwrap(), vec!["B", "C", "A"]);

    scheduler.post_delayed(|| {}, 1_000);
    universe.tear_down().unwrap();
    assert_eq!(scheduler.pending(), 0);
    assert_eq!(scheduler.current_time(), 0);
}

#[test]
fn project_config_drives_the_simulated_device() {
    let dir = project(
        "[sdk]\napi_level = 16\n\n[device]\nscreen_width_dp = 400\n\n[filesystem]\ntemp_root = \"scratch\"\n",
    );
    let umbra = harness(dir.path());
    assert_eq!(umbra.config().sdk.api_level, 16);

    let mut universe = umbra.universe();
    set_up(&mut universe, "device", "xhdpi-port");

    let env = universe.environment().unwrap();
    assert_eq!(env.api_level(), ApiLevel::new(16));
    assert_eq!(env.qualifiers(), "sw320dp-w400dp-port-xhdpi-v16");
    assert_eq!(env.configuration().orientation, Some(Orientation::Portrait));
    assert!(!env.configuration().is_applied(ConfigField::DensityDpi));
    assert!(env.temp_dir().path().starts_with(dir.path().join("scratch")));

    universe.tear_down().unwrap();
    assert_eq!(universe.phase(), Phase::TornDown);
}

#[test]
fn unknown_types_are_reported_not_run_for_real() {
    let dir = project("");
    let umbra = harness(dir.path());
    let mut universe = umbra.universe();
    set_up(&mut universe, "unshadowed", "");

    struct Toast;
    impl RealObject for Toast {
        fn real_type(&self) -> RealType {
            RealType::new("android.widget.Toast")
        }

        fn invoke_real(&self, _method: &MethodSignature, _args: &[Value]) -> InvocationResult {
            panic!("real body must not run for an unshadowed type");
        }
    }

    let toast: ObjectRef = Arc::new(Toast);
    let err = call(universe.binder(), &toast, "show()", &[]).unwrap_err();
    assert!(err.to_string().contains("android.widget.Toast"), "{err}");
    universe.tear_down().unwrap();
}
