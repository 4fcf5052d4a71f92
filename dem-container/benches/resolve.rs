#![allow(missing_docs)]

use std::{cell::RefCell, hint::black_box, rc::Rc};
use criterion::{criterion_group, criterion_main, Criterion};
use dem_container::{Container, ContainerConfig, Injectable, InjectionPoints, component};

trait Clock {
    fn now(&self) -> u64;
}

#[derive(Default)]
struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        1
    }
}

component!(SystemClock => dyn Clock);

#[derive(Default)]
struct Base {
    clock: Option<Rc<dyn Clock>>,
}

#[derive(Default)]
struct Derived {
    base: Base,
    clocks: Vec<Rc<dyn Clock>>,
}

impl Injectable for Base {
    fn injection_points(points: &mut InjectionPoints<Self>) {
        points.field("clock", |this: &mut Self, clock: Rc<dyn Clock>| this.clock = Some(clock));
    }
}

impl Injectable for Derived {
    fn injection_points(points: &mut InjectionPoints<Self>) {
        points
            .base(|this: &mut Self| &mut this.base)
            .field("clocks", |this: &mut Self, clocks: Vec<Rc<dyn Clock>>| this.clocks = clocks);
    }
}

fn build_container() -> Container {
    let container = Container::with_config(ContainerConfig::new().without_instrumentation());
    container.register_type::<dyn Clock, SystemClock>().unwrap();
    container
}

fn benchmark(c: &mut Criterion) {
    let container = build_container();
    container.resolve::<dyn Clock>().unwrap();

    c.bench_function("resolve cached", |b| {
        b.iter(|| black_box(container.resolve::<dyn Clock>().unwrap()))
    });

    c.bench_function("resolve first", |b| {
        b.iter(|| {
            let container = build_container();
            black_box(container.resolve::<dyn Clock>().unwrap())
        })
    });

    c.bench_function("inject hierarchy", |b| {
        b.iter(|| {
            let derived = Rc::new(RefCell::new(Derived::default()));
            container.inject(&derived).unwrap();
            let derived = derived.borrow();
            black_box(derived.clocks.len() + derived.base.clock.as_ref().map_or(0, |clock| clock.now() as usize))
        })
    });
}

criterion_group!(benches, benchmark);
criterion_main!(benches);
