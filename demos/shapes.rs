//! Capabilities for types that know nothing about each other.
//!
//! This example declares a drawing capability and two numeric capabilities,
//! implements them for a few unrelated types, and calls them through all
//! three handle kinds.
//!
//! # Running this Example
//!
//! ```bash
//! cargo run --example shapes
//! ```
//!
//! # What It Shows
//!
//! - A generic implementation (`Draw` for anything `Display`) next to a
//!   hand-written one (`Draw` for `Circle`)
//! - A heterogeneous collection of owning handles
//! - Combining `Reset` and `Repeat` in one mutable handle, over an integer and
//!   a float

use std::{fmt, ops::AddAssign};

use dyncap::{Caps, DynBox, DynMut, DynRef, Impl, SelfMut, SelfRef, capability, invoke};

// ============================================================================
// Example 1: Drawing unrelated types
// ============================================================================

capability! {
    /// Writes a picture of the object to standard output.
    pub trait Draw {
        fn draw(&self, this: SelfRef);
    }
}

capability! {
    /// Returns the area covered by the object.
    pub trait Area {
        fn area(&self, this: SelfRef) -> f64;
    }
}

struct Circle {
    radius: f64,
}

struct Square {
    side: f64,
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[square {}]", self.side)
    }
}

impl<O: fmt::Display + 'static> Draw for Impl<O> {
    fn draw<'this>(&'this self, this: SelfRef<'this>) {
        println!("{}", self.instance(this));
    }
}

// `Circle` has no `Display`, so it gets its own implementation.
impl Draw for Impl<Circle> {
    fn draw<'this>(&'this self, this: SelfRef<'this>) {
        println!("(circle {})", self.instance(this).radius);
    }
}

impl Area for Impl<Circle> {
    fn area<'this>(&'this self, this: SelfRef<'this>) -> f64 {
        let radius = self.instance(this).radius;
        std::f64::consts::PI * radius * radius
    }
}

impl Area for Impl<Square> {
    fn area<'this>(&'this self, this: SelfRef<'this>) -> f64 {
        let side = self.instance(this).side;
        side * side
    }
}

fn draw_all(shapes: &[DynRef<'_, Caps![Draw]>]) {
    for shape in shapes {
        shape.call(<dyn Draw>::draw, ());
    }
}

fn drawing() {
    println!("Example 1: Drawing unrelated types\n");

    // Direct invocation, no handle
    invoke(<dyn Draw>::draw, &42, ());

    let label = "a label";
    let circle = Circle { radius: 1.0 };
    let borrowed: [DynRef<'_, Caps![Draw]>; 3] =
        [DynRef::new(&label), DynRef::new(&circle), DynRef::new(&7.5)];
    draw_all(&borrowed);

    let shapes: Vec<DynBox<Caps![Draw, Area]>> = vec![
        DynBox::new(Circle { radius: 2.0 }),
        DynBox::new(Square { side: 3.0 }),
    ];

    let mut total = 0.0;
    for shape in &shapes {
        if let Some(shape) = shape.as_dyn_ref() {
            shape.call(<dyn Draw>::draw, ());
            total += shape.call(<dyn Area>::area, ());
        }
    }
    println!("total area: {total:.2}\n");
}

// ============================================================================
// Example 2: Reset and repeat
// ============================================================================

capability! {
    /// Puts the object back into its default state.
    pub trait Reset {
        fn reset(&self, this: SelfMut);
    }
}

capability! {
    /// Doubles the object `n` times.
    pub trait Repeat {
        fn repeat(&self, this: SelfMut, n: u32);
    }
}

impl<O: Default + 'static> Reset for Impl<O> {
    fn reset<'this>(&'this self, this: SelfMut<'this>) {
        *self.instance_mut(this) = O::default();
    }
}

impl<O: AddAssign + Copy + 'static> Repeat for Impl<O> {
    fn repeat<'this>(&'this self, this: SelfMut<'this>, n: u32) {
        let value = self.instance_mut(this);
        for _ in 0..n {
            *value += *value;
        }
    }
}

fn reset_and_repeat(mut value: DynMut<'_, Caps![Reset, Repeat]>) {
    value.call(<dyn Reset>::reset, ());
    value.call(<dyn Repeat>::repeat, (2,));
}

fn repeating() {
    println!("Example 2: Reset and repeat\n");

    let mut integer = 42;
    let mut real = 13.37;
    reset_and_repeat(DynMut::new(&mut integer));
    reset_and_repeat(DynMut::new(&mut real));
    println!("after reset: integer = {integer}, real = {real}");

    let mut integer = 3;
    let mut handle: DynMut<'_, Caps![Reset, Repeat]> = DynMut::new(&mut integer);
    handle.call(<dyn Repeat>::repeat, (3,));
    println!("{handle:?}");
    println!("3 doubled three times = {integer}");
}

fn main() {
    drawing();
    repeating();
}
