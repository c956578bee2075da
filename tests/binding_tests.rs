//! End-to-end tests for the binding layer.
//!
//! Each test declares classes through the public builders, initializes a
//! registry and drives the result through a [`Router`] the way a host
//! adapter would.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tether::prelude::*;
use tether_core::PrimitiveInfo;
use tether_registry::NamedType;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Clone, PartialEq)]
struct Point {
    x: f64,
    y: f64,
}

/// `getX` (1), `setX` (2), `move` (3), then a constructor (4).
fn point_class(drops: &Arc<AtomicUsize>) -> Arc<ClassEntry> {
    let drops = Arc::clone(drops);
    ClassBuilder::<Point>::new("Point")
        .property_getter("getX", |p: &Point| p.x)
        .property_setter("setX", |p: &mut Point, x: f64| p.x = x)
        .method("move", |ctx| {
            let (dx, dy): (f64, f64) = (ctx.arg(0)?, ctx.arg(1)?);
            let p = ctx.this_mut::<Point>()?;
            p.x += dx;
            p.y += dy;
            Ok(())
        })
        .params(&[TypeKey::of::<f64>(), TypeKey::of::<f64>()])
        .constructor(|ctx| {
            Ok(Point {
                x: ctx.arg(0)?,
                y: ctx.arg(1)?,
            })
        })
        .params(&[TypeKey::of::<f64>(), TypeKey::of::<f64>()])
        .deleter(move |_| {
            drops.fetch_add(1, Ordering::SeqCst);
        })
        .build()
}

fn point_router() -> (Router, ClassId, Arc<AtomicUsize>) {
    init_tracing();
    let drops = Arc::new(AtomicUsize::new(0));
    let mut registry = Registry::new();
    let class = registry.register_class(point_class(&drops)).unwrap();
    (Router::new(registry.initialize_all()), class, drops)
}

fn new_point(router: &mut Router, class: ClassId, x: f64, y: f64) -> WrapperHandle {
    router
        .construct(class, vec![Dynamic::Float(x), Dynamic::Float(y)])
        .unwrap()
}

// =============================================================================
// Dispatch
// =============================================================================

#[test]
fn test_point_member_nums() {
    let (router, class, _) = point_router();
    let binding = router.bindings().class(class).unwrap();

    assert_eq!(binding.signature(1).unwrap().name(), "getX");
    assert_eq!(binding.signature(2).unwrap().name(), "setX");
    assert_eq!(binding.method_num("move"), Some(3));
    assert_eq!(binding.constructors()[0].num(), 4);
}

#[test]
fn test_getter_then_setter_pair_into_one_accessor() {
    let (mut router, class, _) = point_router();
    let p = new_point(&mut router, class, 1.5, 0.0);
    let accessor = router.bindings().class(class).unwrap().accessor("x").unwrap().id;
    assert_eq!(accessor.bits(), (2 << 16) | 1);

    assert_eq!(router.get_property(p, accessor).unwrap(), Dynamic::Float(1.5));
    router.set_property(p, accessor, Dynamic::Int(7)).unwrap();
    assert_eq!(router.get_property(p, accessor).unwrap(), Dynamic::Float(7.0));
}

#[test]
fn test_move_updates_instance() {
    let (mut router, class, _) = point_router();
    let p = new_point(&mut router, class, 1.0, 1.0);

    router
        .call_method(p, "move", vec![Dynamic::Float(2.0), Dynamic::Float(-1.0)])
        .unwrap();
    assert_eq!(router.get(p, "x").unwrap(), Dynamic::Float(3.0));
}

#[test]
fn test_wrong_argument_count_is_rejected() {
    let (mut router, class, _) = point_router();
    let p = new_point(&mut router, class, 0.0, 0.0);

    let err = router.call_method(p, "move", vec![]).unwrap_err();
    assert!(err.is_argument_mismatch(), "{err}");
    let err = router.construct(class, vec![Dynamic::String("x".into())]).unwrap_err();
    assert!(err.is_argument_mismatch(), "{err}");
}

#[test]
fn test_free_functions_by_name_and_num() {
    init_tracing();
    let mut registry = Registry::new();
    let double = registry
        .function("double", |ctx| {
            let value: i64 = ctx.arg(0)?;
            ctx.set_return(value * 2);
            Ok(())
        })
        .unwrap();
    registry
        .register_function(
            "greet",
            FunctionBuilder::new("greet", |ctx| {
                let name: String = ctx.arg(0)?;
                ctx.set_return(format!("hello, {name}"));
                Ok(())
            })
            .params(&[TypeKey::of::<String>()])
            .returns(TypeKey::of::<String>())
            .build(),
        )
        .unwrap();
    let mut router = Router::new(registry.initialize_all());

    assert_eq!(double, 1);
    assert_eq!(
        router.invoke(Target::Global, double, vec![Dynamic::Int(21)]).unwrap(),
        Dynamic::Int(42)
    );
    assert_eq!(
        router
            .call_function("greet", vec![Dynamic::String("world".into())])
            .unwrap(),
        Dynamic::String("hello, world".into())
    );
}

// =============================================================================
// Accessor pairing
// =============================================================================

#[test]
fn test_cleared_getter_half_is_unbound() {
    init_tracing();
    let mut registry = Registry::new();
    let class = registry
        .register_class(
            ClassBuilder::<Point>::new("Point")
                .constructor(|_| Ok(Point { x: 1.0, y: 2.0 }))
                .property_getter("getX", |p: &Point| p.x)
                .property_setter("setX", |p: &mut Point, x: f64| p.x = x)
                .clear_getter()
                .property_getter("getY", |p: &Point| p.y)
                .build(),
        )
        .unwrap();
    let mut router = Router::new(registry.initialize_all());
    let p = router.construct(class, vec![]).unwrap();

    let write_only = router.bindings().class(class).unwrap().accessor("x").unwrap().id;
    assert_eq!(write_only.getter(), 0);
    assert_eq!(write_only.setter(), 3);

    let err = router.get(p, "x").unwrap_err();
    assert_eq!(
        err,
        BindError::UnboundMember {
            member: "Point.x (getter)".into()
        }
    );
    router.set(p, "x", Dynamic::Float(9.0)).unwrap();
    assert_eq!(router.get(p, "y").unwrap(), Dynamic::Float(2.0));
    // getY paired with the setX that was still pending
    router.set(p, "y", Dynamic::Float(5.0)).unwrap();
    let point = router
        .heap()
        .get(p)
        .and_then(|wrapper| wrapper.with::<Point, _>(|p| p.clone()))
        .unwrap();
    assert_eq!(point, Point { x: 5.0, y: 2.0 });
}

#[test]
fn test_clear_setter_makes_next_getter_read_only() {
    init_tracing();
    let mut registry = Registry::new();
    let class = registry
        .register_class(
            ClassBuilder::<Point>::new("Point")
                .constructor(|_| Ok(Point { x: 3.0, y: 4.0 }))
                .property("getX", "setX", |p: &Point| p.x, |p: &mut Point, x: f64| p.x = x)
                .clear_setter()
                .property_getter("getLength", |p: &Point| p.x.hypot(p.y))
                .build(),
        )
        .unwrap();
    let mut router = Router::new(registry.initialize_all());
    let p = router.construct(class, vec![]).unwrap();

    let binding = router.bindings().class(class).unwrap();
    let names: Vec<_> = binding.accessors().iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["x", "length"]);
    assert_eq!(binding.accessor("length").unwrap().id.setter(), 0);

    assert_eq!(router.get(p, "length").unwrap(), Dynamic::Float(5.0));
    assert!(router.set(p, "length", Dynamic::Float(1.0)).unwrap_err().is_unbound());
    router.set(p, "x", Dynamic::Float(0.0)).unwrap();
    assert_eq!(router.get(p, "length").unwrap(), Dynamic::Float(4.0));
}

#[test]
fn test_accessor_names_are_normalized() {
    init_tracing();
    struct Shape;
    let getter = |_: &Shape| 0_i64;
    let mut registry = Registry::new();
    let class = registry
        .register_class(
            ClassBuilder::<Shape>::new("Shape")
                .property_getter("getWidth", getter)
                .property_getter("get_height", getter)
                .property_getter("GetURL", getter)
                .property_getter("getlength", getter)
                .property_getter("get", getter)
                .build(),
        )
        .unwrap();
    let bindings = registry.initialize_all();

    let names: Vec<_> = bindings
        .class(class)
        .unwrap()
        .accessors()
        .iter()
        .map(|a| a.name.clone())
        .collect();
    assert_eq!(names, vec!["width", "height", "URL", "length", "get"]);
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn test_double_release_runs_deleter_once() {
    let (mut router, class, drops) = point_router();
    let p = new_point(&mut router, class, 0.0, 0.0);

    assert!(router.free(p));
    assert!(!router.free(p));
    assert_eq!(drops.load(Ordering::SeqCst), 1);

    let err = router.get(p, "x").unwrap_err();
    assert!(matches!(err, BindError::StaleHandle { .. }));
}

#[test]
fn test_implicit_free_member() {
    let (mut router, class, drops) = point_router();
    let p = new_point(&mut router, class, 0.0, 0.0);
    let q = new_point(&mut router, class, 0.0, 0.0);

    router.call_method(p, "free", vec![]).unwrap();
    assert_eq!(drops.load(Ordering::SeqCst), 1);
    assert!(router.heap().contains(q));

    drop(router);
    assert_eq!(drops.load(Ordering::SeqCst), 2);
}

#[test]
fn test_initialize_all_is_idempotent() {
    init_tracing();
    let drops = Arc::new(AtomicUsize::new(0));
    let mut registry = Registry::new();
    registry.register_class(point_class(&drops)).unwrap();

    let first = registry.initialize_all();
    let second = registry.initialize_all();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(registry.is_sealed());

    let err = registry.register_class(point_class(&drops)).unwrap_err();
    assert!(matches!(err, RegistrationError::Sealed(ref name) if name == "Point"));
    let err = registry.function("late", |_| Ok(())).unwrap_err();
    assert!(matches!(err, RegistrationError::Sealed(_)));
}

#[test]
fn test_root_class_initialized_first_and_once() {
    init_tracing();
    let drops = Arc::new(AtomicUsize::new(0));
    let mut registry = Registry::new();
    let point = point_class(&drops);
    let id = registry.register_class(Arc::clone(&point)).unwrap();
    assert_eq!(registry.register_class(Arc::clone(&point)).unwrap(), id);
    let bindings = registry.initialize_all();

    let names: Vec<_> = bindings.classes().iter().map(|c| c.name()).collect();
    assert_eq!(names, vec![ROOT_CLASS, TYPE_IDENTITY_CLASS, "Point"]);

    let root = bindings.root().unwrap();
    assert_eq!(bindings.classes()[0].id(), root);
    assert_eq!(bindings.classes()[0].root(), None);
    assert_eq!(bindings.class(id).unwrap().root(), Some(root));
    assert!(point.is_ready());
}

#[test]
fn test_duplicate_class_name_is_rejected() {
    let drops = Arc::new(AtomicUsize::new(0));
    let mut registry = Registry::new();
    registry.register_class(point_class(&drops)).unwrap();
    let err = registry.register_class(point_class(&drops)).unwrap_err();
    assert_eq!(err, RegistrationError::DuplicateClass("Point".into()));
}

// =============================================================================
// Introspection
// =============================================================================

#[derive(Default)]
struct Census {
    primitives: Vec<String>,
    types: Vec<String>,
    classes: Vec<String>,
    free_functions: Vec<String>,
}

impl ReflectVisitor for Census {
    fn primitive(&mut self, info: &PrimitiveInfo) -> Result<(), NativeError> {
        self.primitives.push(info.name.clone());
        Ok(())
    }

    fn ty(&mut self, ty: &NamedType) -> Result<(), NativeError> {
        self.types.push(ty.name.clone());
        Ok(())
    }

    fn class(&mut self, class: &ClassBinding) -> Result<(), NativeError> {
        self.classes.push(class.name().to_string());
        Ok(())
    }

    fn method(&mut self, class: Option<&ClassBinding>, signature: &Signature) -> Result<(), NativeError> {
        if class.is_none() {
            self.free_functions.push(signature.name().to_string());
        }
        Ok(())
    }
}

#[test]
fn test_reflect_reports_everything_registered() {
    init_tracing();
    let drops = Arc::new(AtomicUsize::new(0));
    let mut registry = Registry::new();
    registry.register_class(point_class(&drops)).unwrap();
    registry
        .register_type(TypeKey::from_name("Direction"), "Direction", TypeCategory::Enum)
        .unwrap();
    registry.register_primitive::<u16>("port").unwrap();
    registry.function("now", |_| Ok(())).unwrap();
    let bindings = registry.initialize_all();

    let mut census = Census::default();
    bindings.reflect(&mut census).unwrap();

    assert!(census.primitives.iter().any(|name| name == "port"));
    assert!(!census.primitives.iter().any(|name| name == "uint16"));
    assert_eq!(census.types, vec!["Direction"]);
    assert_eq!(census.classes, vec![ROOT_CLASS, TYPE_IDENTITY_CLASS, "Point"]);
    assert_eq!(census.free_functions, vec!["now"]);
}

#[test]
fn test_query_type_through_root_class() {
    let (mut router, _, _) = point_router();
    let root = router.bindings().class_by_name(ROOT_CLASS).unwrap().id();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let record = {
        let seen = Arc::clone(&seen);
        Callback::new(move |args| {
            let args: Vec<_> = args.iter().filter_map(Dynamic::clone_if_possible).collect();
            seen.lock().push(args);
            Ok(Dynamic::Bool(true))
        })
    };

    for identity in [TypeIdentity::of::<i32>(), TypeIdentity::of::<Point>()] {
        let result = router
            .call_static(
                root,
                "queryType",
                vec![
                    Dynamic::String(identity.as_hex().to_string()),
                    Dynamic::Callback(record.clone()),
                ],
            )
            .unwrap();
        assert_eq!(result, Dynamic::Bool(true));
    }

    let seen = seen.lock();
    assert_eq!(seen[0][0], Dynamic::String("primitive".into()));
    assert_eq!(seen[0][2], Dynamic::Int(4));
    assert_eq!(seen[1][0], Dynamic::String("class".into()));
    assert_eq!(seen[1][1], Dynamic::String("Point".into()));
}

#[test]
fn test_global_registry() {
    init_tracing();
    struct Gauge;
    let class = global::register_class(
        ClassBuilder::<Gauge>::new("GlobalGauge")
            .constructor(|_| Ok(Gauge))
            .build(),
    )
    .unwrap();
    global::with_registry(|registry| {
        registry.function("globalPing", |ctx| {
            ctx.set_return("pong");
            Ok(())
        })
    })
    .unwrap();

    let bindings = global::bindings();
    assert!(Arc::ptr_eq(&bindings, &global::bindings()));
    assert_eq!(bindings.class_by_name("GlobalGauge").map(ClassBinding::id), Some(class));

    let mut router = Router::new(bindings);
    assert!(router.construct(class, vec![]).is_ok());
    assert_eq!(
        router.call_function("globalPing", vec![]).unwrap(),
        Dynamic::String("pong".into())
    );
}
