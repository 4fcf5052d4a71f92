#![allow(missing_docs)]

use std::{cell::RefCell, rc::Rc};
use dem_container::{Container, Injectable, component};

trait Theme {}
trait Clock {}

#[derive(Default)]
struct Dark;
impl Theme for Dark {}
component!(Dark => dyn Theme);

#[derive(Default)]
struct System;
impl Clock for System {}
component!(System => dyn Clock);

#[derive(Default, Injectable)]
struct View {
    #[inject]
    theme: Option<Rc<dyn Theme>>,
}

#[derive(Default, Injectable)]
#[inject(method = started, method = attach(Rc<dyn Theme>, Rc<dyn Clock>))]
struct Screen {
    #[inject(base)]
    base: View,
    #[inject(setter = set_clock)]
    clock: Option<Rc<dyn Clock>>,
    #[inject]
    themes: Vec<Rc<dyn Theme>>,
    starts: u32,
    attached: bool,
}

impl Screen {
    fn set_clock(&mut self, clock: Rc<dyn Clock>) {
        self.clock = Some(clock);
    }

    fn started(&mut self) {
        self.starts += 1;
    }

    fn attach(&mut self, _theme: Rc<dyn Theme>, _clock: Rc<dyn Clock>) {
        self.attached = true;
    }
}

fn main() {
    let container = Container::new();
    container.register_type::<dyn Theme, Dark>().unwrap();
    container.register_type::<dyn Clock, System>().unwrap();

    let screen = Rc::new(RefCell::new(Screen::default()));
    container.inject(&screen).unwrap();

    let screen = screen.borrow();
    assert!(screen.base.theme.is_some());
    assert!(screen.clock.is_some());
    assert_eq!(screen.themes.len(), 1);
    assert_eq!(screen.starts, 1);
    assert!(screen.attached);
}
