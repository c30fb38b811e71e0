use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::BTreeMap;
use tether::{methods, Bridge, Reflect};
use tether_runtime::{Interpreter, InterpreterConfig, Object};

#[derive(Reflect, Default, Clone)]
#[reflect(methods)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

#[methods]
impl Vec2 {
    pub fn dot(&self, x: f64, y: f64) -> f64 {
        self.x * x + self.y * y
    }

    pub fn nudge(&mut self, dx: f64) {
        self.x += dx;
    }
}

#[derive(Reflect, Default, Clone)]
pub struct Record {
    pub id: u64,
    pub name: String,
    pub scores: Vec<i32>,
    pub tags: BTreeMap<String, String>,
}

fn add(a: i64, b: i64) -> i64 {
    a + b
}

fn bench_method_dispatch(c: &mut Criterion) {
    let interp = Interpreter::initialize(InterpreterConfig::default()).unwrap();
    let bridge = Bridge::new(&interp);
    let main = bridge.main_module();
    bridge.register_type::<Vec2>(&main, "Vec2", "");
    let v = bridge.to_dynamic(&Vec2 { x: 1.0, y: 2.0 }).unwrap();
    let args = [Object::float(3.0), Object::float(4.0)];

    let mut group = c.benchmark_group("dispatch");
    group.bench_function("method_ref", |b| {
        b.iter(|| v.call_method("dot", black_box(&args)).unwrap());
    });
    group.bench_function("method_mut", |b| {
        let dx = [Object::float(0.5)];
        b.iter(|| v.call_method("nudge", black_box(&dx)).unwrap());
    });
    group.bench_function("field_get", |b| {
        b.iter(|| v.getattr(black_box("x")).unwrap());
    });

    let f = bridge.create_function("add", add, "");
    let ints = [Object::int(1), Object::int(2)];
    group.bench_function("function", |b| {
        b.iter(|| f.call(black_box(&ints)).unwrap());
    });
    group.finish();

    drop(v);
    interp.finalize();
}

fn bench_conversion(c: &mut Criterion) {
    let interp = Interpreter::initialize(InterpreterConfig::default()).unwrap();
    let bridge = Bridge::new(&interp);

    let mut group = c.benchmark_group("conversion");
    for size in [8usize, 64, 512] {
        let record = Record {
            id: 7,
            name: "sensor".to_string(),
            scores: (0..size as i32).collect(),
            tags: (0..size)
                .map(|i| (format!("k{i}"), format!("v{i}")))
                .collect(),
        };
        group.bench_with_input(BenchmarkId::new("to_dynamic", size), &record, |b, record| {
            b.iter(|| bridge.to_dynamic(black_box(record)).unwrap());
        });

        let obj = bridge.to_dynamic(&record).unwrap();
        group.bench_with_input(BenchmarkId::new("from_dynamic", size), &obj, |b, obj| {
            b.iter(|| bridge.from_dynamic::<Record>(black_box(obj)).unwrap());
        });
    }
    group.finish();

    interp.finalize();
}

criterion_group!(benches, bench_method_dispatch, bench_conversion);
criterion_main!(benches);
