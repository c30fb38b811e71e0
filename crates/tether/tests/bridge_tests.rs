//! Bridge integration tests
//!
//! Every test binds its own interpreter to the test thread and drops it
//! before returning, so tests stay independent under any thread count.

use std::collections::BTreeMap;

use tether::{methods, Bridge, BridgeError, ConversionError, KwArgs, Reflect};
use tether_runtime::{ExceptionKind, Interpreter, InterpreterConfig, Object};

// ============================================================================
// Fixtures
// ============================================================================

#[derive(Reflect, Debug, Default, Clone, PartialEq)]
#[reflect(methods)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

#[methods]
impl Point {
    #[tether(skip)]
    pub fn init(&mut self, x: i64, y: i64) {
        self.x = x;
        self.y = y;
    }

    /// Width times height
    pub fn area(&self) -> i64 {
        self.x * self.y
    }

    pub fn move_by(&mut self, dx: i64, dy: i64) {
        self.x += dx;
        self.y += dy;
    }

    pub fn swapped(self) -> Point {
        Point {
            x: self.y,
            y: self.x,
        }
    }

    pub fn coords(&self) -> (i64, i64) {
        (self.x, self.y)
    }

    pub fn scale(&mut self, options: KwArgs) -> i64 {
        let factor = options.get("factor").and_then(|f| f.as_int()).unwrap_or(1) as i64;
        self.x *= factor;
        self.y *= factor;
        factor
    }

    #[allow(dead_code)]
    fn hidden(&self) -> i64 {
        0
    }
}

#[derive(Reflect, Debug, Default, Clone, PartialEq)]
pub struct Meta {
    pub name: String,
    pub weight: f64,
}

#[derive(Reflect, Debug, Default, Clone, PartialEq)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
    pub tags: Vec<Meta>,
    pub pivot: Option<Box<Point>>,
}

#[derive(Reflect, Debug, Default, Clone, PartialEq)]
pub struct Inventory {
    pub counts: BTreeMap<String, u32>,
    pub payload: Vec<u8>,
    pub ratio: f32,
}

#[derive(Reflect, Default, Clone)]
#[reflect(opaque)]
pub struct Handle(#[allow(dead_code)] u64);

fn boot() -> (Interpreter, Bridge) {
    let _ = env_logger::builder().is_test(true).try_init();
    let interp = Interpreter::initialize(InterpreterConfig::default()).unwrap();
    let bridge = Bridge::new(&interp);
    (interp, bridge)
}

fn register_point(bridge: &Bridge, module: &Object) -> Object {
    bridge.register_type_with_init::<Point, _>(module, "Point", Point::init, "A point")
}

fn point_of(bridge: &Bridge, obj: &Object) -> Point {
    bridge.with_value(obj, |p: &mut Point| p.clone()).unwrap()
}

fn add_all(a: i64, b: i64, c: i64) -> i64 {
    a + b + c
}

fn make_point(x: i64) -> Box<Point> {
    Box::new(Point { x, y: x * 2 })
}

// ============================================================================
// Types and methods
// ============================================================================

#[test]
fn test_point_scenario() {
    let (interp, bridge) = boot();
    let geometry = bridge.create_module("geometry", "Shapes").unwrap();
    register_point(&bridge, &geometry);

    let ty = interp.import("geometry").unwrap().getattr("Point").unwrap();
    let p = ty.call(&[Object::int(3), Object::int(4)]).unwrap();

    assert_eq!(p.getattr("x").unwrap(), Object::int(3));
    assert_eq!(p.getattr("y").unwrap(), Object::int(4));
    assert_eq!(p.call_method("area", &[]).unwrap(), Object::int(12));

    let ret = p
        .call_method("move_by", &[Object::int(1), Object::int(2)])
        .unwrap();
    assert!(ret.is_none());
    assert_eq!(p.getattr("x").unwrap(), Object::int(4));
    assert_eq!(p.getattr("y").unwrap(), Object::int(6));
    assert_eq!(point_of(&bridge, &p), Point { x: 4, y: 6 });
    assert_eq!(p.call_method("area", &[]).unwrap(), Object::int(24));
}

#[test]
fn test_methods_returning_values() {
    let (_interp, bridge) = boot();
    let main = bridge.main_module();
    register_point(&bridge, &main);
    let p = bridge.to_dynamic(&Point { x: 2, y: 5 }).unwrap();

    let swapped = p.call_method("swapped", &[]).unwrap();
    assert_eq!(point_of(&bridge, &swapped), Point { x: 5, y: 2 });
    assert_eq!(point_of(&bridge, &p), Point { x: 2, y: 5 });

    let coords = p.call_method("coords", &[]).unwrap();
    assert!(coords.is_tuple());
    assert_eq!(coords, Object::tuple(vec![Object::int(2), Object::int(5)]));
}

#[test]
fn test_private_and_skipped_methods_are_not_exported() {
    let (_interp, bridge) = boot();
    let main = bridge.main_module();
    register_point(&bridge, &main);
    let p = bridge.to_dynamic(&Point::default()).unwrap();

    assert!(p.hasattr("area"));
    assert!(!p.hasattr("hidden"));
    assert!(!p.hasattr("init"));
}

#[test]
fn test_method_docs_and_text_signatures() {
    let (_interp, bridge) = boot();
    let main = bridge.main_module();
    register_point(&bridge, &main);
    let p = bridge.to_dynamic(&Point::default()).unwrap();

    let area = p.getattr("area").unwrap();
    assert_eq!(area.getattr("__doc__").unwrap(), Object::str("Width times height"));
    assert_eq!(area.getattr("__text_signature__").unwrap(), Object::str("()"));

    let move_by = p.getattr("move_by").unwrap();
    assert_eq!(
        move_by.getattr("__text_signature__").unwrap(),
        Object::str("(arg0, arg1, /)")
    );

    let scale = p.getattr("scale").unwrap();
    assert_eq!(
        scale.getattr("__text_signature__").unwrap(),
        Object::str("(**kwargs)")
    );
}

#[test]
fn test_keyword_arguments_reach_kwargs_parameter() {
    let (_interp, bridge) = boot();
    let main = bridge.main_module();
    register_point(&bridge, &main);
    let p = bridge.to_dynamic(&Point { x: 1, y: 2 }).unwrap();

    let kwargs = Object::dict_from(vec![(Object::str("factor"), Object::int(3))]).unwrap();
    let ret = p.getattr("scale").unwrap().call_kw(&[], Some(&kwargs)).unwrap();
    assert_eq!(ret, Object::int(3));
    assert_eq!(point_of(&bridge, &p), Point { x: 3, y: 6 });

    // No keywords means an empty mapping.
    let ret = p.call_method("scale", &[]).unwrap();
    assert_eq!(ret, Object::int(1));
}

#[test]
fn test_keywords_rejected_without_kwargs_parameter() {
    let (_interp, bridge) = boot();
    let main = bridge.main_module();
    register_point(&bridge, &main);
    let p = bridge.to_dynamic(&Point { x: 1, y: 2 }).unwrap();

    let kwargs = Object::dict_from(vec![(Object::str("dx"), Object::int(3))]).unwrap();
    let err = p
        .getattr("move_by")
        .unwrap()
        .call_kw(&[Object::int(1), Object::int(1)], Some(&kwargs))
        .unwrap_err();
    assert!(err.is(ExceptionKind::TypeError));
    assert_eq!(point_of(&bridge, &p), Point { x: 1, y: 2 });
}

// ============================================================================
// Faults leave state untouched
// ============================================================================

#[test]
fn test_arity_fault_leaves_receiver_unmodified() {
    let (_interp, bridge) = boot();
    let main = bridge.main_module();
    register_point(&bridge, &main);
    let p = bridge.to_dynamic(&Point { x: 1, y: 1 }).unwrap();

    let err = p.call_method("move_by", &[Object::int(5)]).unwrap_err();
    assert!(err.is(ExceptionKind::TypeError));
    assert!(err.message.contains("expects 2 arguments, got 1"), "{}", err.message);
    assert_eq!(point_of(&bridge, &p), Point { x: 1, y: 1 });
}

#[test]
fn test_argument_type_fault_leaves_receiver_unmodified() {
    let (_interp, bridge) = boot();
    let main = bridge.main_module();
    register_point(&bridge, &main);
    let p = bridge.to_dynamic(&Point { x: 1, y: 1 }).unwrap();

    let err = p
        .call_method("move_by", &[Object::int(5), Object::str("north")])
        .unwrap_err();
    assert!(err.is(ExceptionKind::TypeError));
    assert!(err.message.contains("failed to convert argument"), "{}", err.message);
    assert_eq!(point_of(&bridge, &p), Point { x: 1, y: 1 });
}

#[test]
fn test_field_setter_rejects_bad_values() {
    let (_interp, bridge) = boot();
    let main = bridge.main_module();
    register_point(&bridge, &main);
    let p = bridge.to_dynamic(&Point { x: 1, y: 1 }).unwrap();

    p.setattr("x", &Object::int(10)).unwrap();
    let err = p.setattr("y", &Object::str("ten")).unwrap_err();
    assert!(err.is(ExceptionKind::TypeError));
    assert!(err.message.contains("Point.y"), "{}", err.message);
    assert_eq!(point_of(&bridge, &p), Point { x: 10, y: 1 });
}

#[test]
fn test_constructor_arity_fault() {
    let (_interp, bridge) = boot();
    let main = bridge.main_module();
    let ty = register_point(&bridge, &main);
    let err = ty.call(&[Object::int(1)]).unwrap_err();
    assert!(err.is(ExceptionKind::TypeError));
}

// ============================================================================
// Registration
// ============================================================================

#[test]
fn test_registration_is_idempotent() {
    let (_interp, bridge) = boot();
    let main = bridge.main_module();
    let first = register_point(&bridge, &main);
    let second = bridge.register_type::<Point>(&main, "Point", "");
    let third = register_point(&bridge, &main);

    assert!(first.is(&second));
    assert!(first.is(&third));
    assert!(bridge.is_bridged(&first));
    assert!(bridge.type_of::<Point>().unwrap().is(&first));
    assert_eq!(
        main.module_names().iter().filter(|n| n.as_str() == "Point").count(),
        1
    );
}

#[test]
fn test_bridges_share_one_registry() {
    let (interp, bridge) = boot();
    let main = bridge.main_module();
    let ty = register_point(&bridge, &main);

    let other = Bridge::new(&interp);
    assert!(other.type_of::<Point>().unwrap().is(&ty));
    assert!(other.is_bridged(&ty));
}

#[test]
fn test_nested_struct_fields_register_their_types() {
    let (_interp, bridge) = boot();
    let main = bridge.main_module();
    bridge.register_type::<Segment>(&main, "Segment", "");

    assert!(bridge.type_of::<Point>().is_some());
    assert!(main.module_get("Point").is_some());
    // Sequence elements are not struct references.
    assert!(bridge.type_of::<Meta>().is_none());
}

#[test]
fn test_type_without_constructor_builds_zero_value() {
    let (_interp, bridge) = boot();
    let main = bridge.main_module();
    let ty = bridge.register_type::<Point>(&main, "Point", "");
    let p = ty.call(&[]).unwrap();
    assert_eq!(point_of(&bridge, &p), Point::default());
}

#[test]
fn test_factory_constructor() {
    let (_interp, bridge) = boot();
    let main = bridge.main_module();
    let ty = bridge.register_type_with_init::<Point, _>(&main, "Point", make_point, "");
    let p = ty.call(&[Object::int(7)]).unwrap();
    assert_eq!(point_of(&bridge, &p), Point { x: 7, y: 14 });
}

#[test]
#[should_panic(expected = "only structs can be registered")]
fn test_registering_non_struct_panics() {
    let (_interp, bridge) = boot();
    let main = bridge.main_module();
    bridge.register_type::<i64>(&main, "Int", "");
}

#[test]
#[should_panic(expected = "must return it or a Box of it")]
fn test_factory_with_wrong_return_type_panics() {
    let (_interp, bridge) = boot();
    let main = bridge.main_module();
    bridge.register_type_with_init::<Point, _>(&main, "Point", |x: i64| x, "");
}

#[test]
#[should_panic(expected = "cannot publish type 'Point'")]
fn test_type_name_collision_panics() {
    let (_interp, bridge) = boot();
    let main = bridge.main_module();
    main.add_object("Point", Object::int(1)).unwrap();
    register_point(&bridge, &main);
}

// ============================================================================
// Instances
// ============================================================================

#[test]
fn test_live_instances_track_wrappers() {
    let (interp, bridge) = boot();
    let main = bridge.main_module();
    let ty = register_point(&bridge, &main);

    let mut points: Vec<Object> = (0..10)
        .map(|i| ty.call(&[Object::int(i), Object::int(i)]).unwrap())
        .collect();
    assert_eq!(bridge.live_instances(), 10);

    points.truncate(6);
    assert_eq!(bridge.live_instances(), 6);

    let survivor = points.pop().unwrap();
    drop(points);
    assert_eq!(bridge.live_instances(), 1);

    interp.finalize();
    assert_eq!(bridge.live_instances(), 0);
    drop(survivor);
}

#[test]
fn test_repeated_dispatch_is_stable() {
    let (_interp, bridge) = boot();
    let main = bridge.main_module();
    register_point(&bridge, &main);
    let p = bridge.to_dynamic(&Point { x: 0, y: 1 }).unwrap();

    for i in 1..=1000 {
        p.call_method("move_by", &[Object::int(1), Object::int(0)]).unwrap();
        assert_eq!(p.call_method("area", &[]).unwrap(), Object::int(i));
    }
    assert_eq!(
        p.getattr("move_by").unwrap().getattr("__text_signature__").unwrap(),
        Object::str("(arg0, arg1, /)")
    );
}

#[test]
fn test_released_from_foreign_thread() {
    let (interp, bridge) = boot();
    let main = bridge.main_module();
    let ty = register_point(&bridge, &main);

    let p = ty.call(&[Object::int(1), Object::int(2)]).unwrap();
    let detached = interp.detach(p);
    std::thread::spawn(move || drop(detached)).join().unwrap();

    assert_eq!(interp.pending_decrefs(), 1);
    assert_eq!(bridge.live_instances(), 1);
    assert_eq!(interp.flush_decrefs(), 1);
    assert_eq!(bridge.live_instances(), 0);
}

#[test]
fn test_wrappers_outlive_finalize() {
    let (interp, bridge) = boot();
    let main = bridge.main_module();
    register_point(&bridge, &main);
    let p = bridge.to_dynamic(&Point { x: 2, y: 3 }).unwrap();

    interp.finalize();
    assert_eq!(bridge.live_instances(), 0);
    drop(p);
}

// ============================================================================
// Aliasing and copies
// ============================================================================

#[test]
fn test_registered_struct_field_aliases_parent() {
    let (_interp, bridge) = boot();
    let main = bridge.main_module();
    bridge.register_type::<Segment>(&main, "Segment", "");
    let segment = Segment {
        start: Point { x: 1, y: 1 },
        end: Point { x: 5, y: 5 },
        ..Default::default()
    };
    let seg = bridge.to_dynamic(&segment).unwrap();

    let start = seg.getattr("start").unwrap();
    start.call_method("move_by", &[Object::int(2), Object::int(3)]).unwrap();
    start.setattr("y", &Object::int(40)).unwrap();

    let now = bridge.with_value(&seg, |s: &mut Segment| s.start.clone()).unwrap();
    assert_eq!(now, Point { x: 3, y: 40 });

    // The alias keeps its parent alive.
    drop(seg);
    assert_eq!(start.getattr("x").unwrap(), Object::int(3));
}

#[test]
fn test_unregistered_struct_elements_are_copies() {
    let (_interp, bridge) = boot();
    let main = bridge.main_module();
    bridge.register_type::<Segment>(&main, "Segment", "");
    let segment = Segment {
        tags: vec![Meta {
            name: "a".to_string(),
            weight: 0.5,
        }],
        ..Default::default()
    };
    let seg = bridge.to_dynamic(&segment).unwrap();

    let tags = seg.getattr("tags").unwrap();
    let first = tags.get_item(0).unwrap();
    assert!(first.is_dict());
    first.dict_set(Object::str("name"), Object::str("changed")).unwrap();

    let again = seg.getattr("tags").unwrap().get_item(0).unwrap();
    assert_eq!(again.dict_get_str("name").unwrap(), Object::str("a"));
    let host = bridge.with_value(&seg, |s: &mut Segment| s.tags.clone()).unwrap();
    assert_eq!(host[0].name, "a");
}

#[test]
fn test_optional_boxed_field() {
    let (_interp, bridge) = boot();
    let main = bridge.main_module();
    bridge.register_type::<Segment>(&main, "Segment", "");
    let seg = bridge.to_dynamic(&Segment::default()).unwrap();

    assert!(seg.getattr("pivot").unwrap().is_none());

    let pivot = Object::dict_from(vec![
        (Object::str("x"), Object::int(1)),
        (Object::str("y"), Object::int(2)),
    ])
    .unwrap();
    seg.setattr("pivot", &pivot).unwrap();
    let host = bridge.with_value(&seg, |s: &mut Segment| s.pivot.clone()).unwrap();
    assert_eq!(host, Some(Box::new(Point { x: 1, y: 2 })));

    // Boxed fields come back as copies.
    let copy = seg.getattr("pivot").unwrap();
    copy.call_method("move_by", &[Object::int(10), Object::int(10)]).unwrap();
    let host = bridge.with_value(&seg, |s: &mut Segment| s.pivot.clone()).unwrap();
    assert_eq!(host, Some(Box::new(Point { x: 1, y: 2 })));

    seg.setattr("pivot", &Object::none()).unwrap();
    let host = bridge.with_value(&seg, |s: &mut Segment| s.pivot.clone()).unwrap();
    assert_eq!(host, None);
}

// ============================================================================
// Conversion
// ============================================================================

#[test]
fn test_unregistered_struct_converts_to_dict() {
    let (_interp, bridge) = boot();
    let inventory = Inventory {
        counts: BTreeMap::from([("bolts".to_string(), 4), ("nuts".to_string(), 9)]),
        payload: vec![0, 1, 255],
        ratio: 0.5,
    };
    let obj = bridge.to_dynamic(&inventory).unwrap();
    assert!(obj.is_dict());
    assert_eq!(obj.dict_get_str("payload").unwrap(), Object::bytes(vec![0, 1, 255]));
    let counts = obj.dict_get_str("counts").unwrap();
    assert_eq!(counts.dict_get_str("nuts").unwrap(), Object::int(9));

    let back: Inventory = bridge.from_dynamic(&obj).unwrap();
    assert_eq!(back, inventory);
}

#[test]
fn test_dict_to_struct_keeps_missing_fields_at_zero() {
    let (_interp, bridge) = boot();
    let obj = Object::dict_from(vec![(Object::str("ratio"), Object::int(2))]).unwrap();
    let back: Inventory = bridge.from_dynamic(&obj).unwrap();
    assert_eq!(back.ratio, 2.0);
    assert!(back.counts.is_empty());
}

#[test]
#[should_panic(expected = "failed to convert value to")]
fn test_dict_to_struct_field_failure_panics() {
    let (_interp, bridge) = boot();
    let obj = Object::dict_from(vec![(Object::str("ratio"), Object::str("half"))]).unwrap();
    let _ = bridge.from_dynamic::<Inventory>(&obj);
}

#[test]
fn test_wrapper_of_other_type_is_rejected() {
    let (_interp, bridge) = boot();
    let main = bridge.main_module();
    bridge.register_type::<Segment>(&main, "Segment", "");
    let p = bridge.to_dynamic(&Point::default()).unwrap();

    let err = bridge.from_dynamic::<Segment>(&p).unwrap_err();
    assert!(matches!(err, ConversionError::WrongWrapper { .. }), "{err}");

    let back: Point = bridge.from_dynamic(&p).unwrap();
    assert_eq!(back, Point::default());
}

#[test]
fn test_out_of_range_integer() {
    let (_interp, bridge) = boot();
    let err = bridge.from_dynamic::<u8>(&Object::int(300)).unwrap_err();
    assert!(matches!(err, ConversionError::OutOfRange { .. }), "{err}");
    let err = bridge.from_dynamic::<u32>(&Object::int(-1)).unwrap_err();
    assert!(matches!(err, ConversionError::OutOfRange { .. }), "{err}");
}

#[test]
#[should_panic(expected = "no runtime representation")]
fn test_opaque_values_cannot_cross() {
    let (_interp, bridge) = boot();
    let _ = bridge.to_dynamic(&Handle(7));
}

// ============================================================================
// Functions
// ============================================================================

#[test]
fn test_module_function_call() {
    let (interp, bridge) = boot();
    let math = bridge.create_module("mathx", "").unwrap();
    let f = bridge.register_function(&math, "", add_all, "Sum of three");

    assert_eq!(f.getattr("__name__").unwrap(), Object::str("add_all"));
    let f = interp.import("mathx").unwrap().getattr("add_all").unwrap();
    let ret = f
        .call(&[Object::int(1), Object::int(2), Object::int(3)])
        .unwrap();
    assert_eq!(ret, Object::int(6));
    assert_eq!(
        f.getattr("__text_signature__").unwrap(),
        Object::str("(arg0, arg1, arg2, /)")
    );
}

#[test]
fn test_function_names_are_snake_cased() {
    let (_interp, bridge) = boot();
    let math = bridge.create_module("mathx", "").unwrap();
    bridge.register_function(&math, "SumAll", add_all, "");
    assert!(math.module_get("sum_all").is_some());
    assert!(math.module_get("SumAll").is_none());
}

#[test]
#[should_panic(expected = "cannot publish function 'add_all'")]
fn test_function_name_collision_panics() {
    let (_interp, bridge) = boot();
    let math = bridge.create_module("mathx", "").unwrap();
    bridge.register_function(&math, "", add_all, "");
    bridge.register_function(&math, "", add_all, "");
}

#[test]
fn test_unnamed_closures_get_distinct_names() {
    let (_interp, bridge) = boot();
    let m = bridge.create_module("m", "").unwrap();
    let inc = bridge.register_function(&m, "", |a: i64| a + 1, "");
    let add_two = bridge.register_function(&m, "", |a: i64| a + 2, "");

    let first = m
        .module_get("test_unnamed_closures_get_distinct_names_closure_0")
        .unwrap();
    let second = m
        .module_get("test_unnamed_closures_get_distinct_names_closure_1")
        .unwrap();
    assert!(first.is(&inc));
    assert!(second.is(&add_two));
    assert_eq!(first.call(&[Object::int(1)]).unwrap(), Object::int(2));
    assert_eq!(second.call(&[Object::int(1)]).unwrap(), Object::int(3));
}

#[test]
fn test_created_function_lives_in_main() {
    let (_interp, bridge) = boot();
    let f = bridge.create_function("", |name: String| format!("hi {name}"), "");

    let main = bridge.main_module();
    let published = main
        .module_get("test_created_function_lives_in_main_closure_0")
        .unwrap();
    assert!(published.is(&f));
    assert_eq!(f.call(&[Object::str("ann")]).unwrap(), Object::str("hi ann"));

    let other = bridge.create_function("", |name: String| format!("bye {name}"), "");
    assert!(main
        .module_get("test_created_function_lives_in_main_closure_1")
        .unwrap()
        .is(&other));

    let g = bridge.create_function("Greeter", add_all, "");
    assert!(main.module_get("greeter").unwrap().is(&g));
}

#[test]
fn test_function_returning_tuple_and_errors() {
    let (_interp, bridge) = boot();
    let f = bridge.create_function("divmod", |a: i64, b: i64| (a / b, a % b), "");
    let ret = f.call(&[Object::int(17), Object::int(5)]).unwrap();
    assert_eq!(ret, Object::tuple(vec![Object::int(3), Object::int(2)]));

    let err = f.call(&[Object::int(17)]).unwrap_err();
    assert!(err.is(ExceptionKind::TypeError));
}

#[test]
fn test_call_runtime_callable_from_host() {
    let (_interp, bridge) = boot();
    let f = bridge.create_function("", add_all, "");

    let sum: i64 = bridge
        .call(&f, &[Object::int(1), Object::int(1), Object::int(1)])
        .unwrap();
    assert_eq!(sum, 3);

    let err = bridge.call::<String>(&f, &[Object::int(1)]).unwrap_err();
    assert!(matches!(err, BridgeError::Runtime(_)), "{err}");

    let err = bridge
        .call::<String>(&f, &[Object::int(1), Object::int(1), Object::int(1)])
        .unwrap_err();
    assert!(matches!(err, BridgeError::Conversion(_)), "{err}");
}

#[test]
fn test_host_struct_argument_from_wrapper_or_dict() {
    let (_interp, bridge) = boot();
    let main = bridge.main_module();
    register_point(&bridge, &main);
    let f = bridge.create_function("norm1", |p: Point| p.x.abs() + p.y.abs(), "");

    let p = bridge.to_dynamic(&Point { x: -3, y: 4 }).unwrap();
    assert_eq!(f.call(&[p]).unwrap(), Object::int(7));

    let d = Object::dict_from(vec![
        (Object::str("x"), Object::int(1)),
        (Object::str("y"), Object::int(-1)),
    ])
    .unwrap();
    assert_eq!(f.call(&[d]).unwrap(), Object::int(2));
}
