#![allow(missing_docs)]

use std::rc::Rc;
use dem_container::{Component, Construct, Container, component};

trait Clock {
    fn now(&self) -> u64;
}

#[derive(Default)]
struct Fixed;

impl Clock for Fixed {
    fn now(&self) -> u64 {
        7
    }
}

component!(Fixed => dyn Clock);

#[derive(Construct)]
struct Scheduler {
    clock: Rc<dyn Clock>,
    #[construct(default)]
    ticks: u64,
}

impl Component for Scheduler {}

#[derive(Construct)]
struct Wrapper(Rc<Scheduler>);

impl Component for Wrapper {}

#[derive(Construct)]
struct Marker;

impl Component for Marker {}

fn main() {
    let container = Container::new();
    container.register_type::<dyn Clock, Fixed>().unwrap();
    container.register_type::<Scheduler, Scheduler>().unwrap();
    container.register_type::<Wrapper, Wrapper>().unwrap();
    container.register_type::<Marker, Marker>().unwrap();

    let wrapper = container.resolve::<Wrapper>().unwrap();

    assert_eq!(wrapper.0.clock.now(), 7);
    assert_eq!(wrapper.0.ticks, 0);
    assert!(container.resolve::<Marker>().is_ok());
}
