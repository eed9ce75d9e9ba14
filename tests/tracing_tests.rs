//! Cache trace events under the `tracing` feature.
//!
//! The layer below builds a handle for every event it receives. Events are
//! emitted after the cache lock is released, so this must not deadlock.

#![cfg(feature = "tracing")]

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use dyncap::{Caps, DynBox, DynRef, Impl, SelfRef, capability};
use tracing::{Event, Subscriber};
use tracing_subscriber::{layer::Context, prelude::*};

capability! {
    pub trait Describe {
        fn describe(&self, this: SelfRef) -> String;
    }
}

capability! {
    pub trait Size {
        fn size(&self, this: SelfRef) -> usize;
    }
}

impl<O: ToString + 'static> Describe for Impl<O> {
    fn describe<'this>(&'this self, this: SelfRef<'this>) -> String {
        self.instance(this).to_string()
    }
}

impl<O: 'static> Size for Impl<O> {
    fn size<'this>(&'this self, _this: SelfRef<'this>) -> usize {
        size_of::<O>()
    }
}

/// Builds and calls a handle from inside every event.
struct HandleOnEvent {
    events: Arc<AtomicUsize>,
}

impl<S: Subscriber> tracing_subscriber::Layer<S> for HandleOnEvent {
    fn on_event(&self, _event: &Event<'_>, _ctx: Context<'_, S>) {
        self.events.fetch_add(1, Ordering::SeqCst);
        let value = 7u16;
        let handle: DynRef<'_, Caps![Describe]> = DynRef::new(&value);
        assert_eq!(handle.call(<dyn Describe>::describe, ()), "7");
    }
}

#[test]
fn test_layer_can_build_handles() {
    // Only used here, so every cache entry below is created by this test.
    struct Fresh(u8);

    impl std::fmt::Display for Fresh {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "fresh {}", self.0)
        }
    }

    let events = Arc::new(AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry().with(HandleOnEvent {
        events: events.clone(),
    });

    tracing::subscriber::with_default(subscriber, || {
        let owned: DynBox<Caps![Describe, Size]> = DynBox::new(Fresh(1));
        let view = owned.as_dyn_ref().map(|view| view.narrow::<Caps![Describe], _>());
        assert_eq!(
            view.map(|view| view.call(<dyn Describe>::describe, ())),
            Some(String::from("fresh 1"))
        );
    });

    // Three implementations including the deleter, then the visible, owning
    // and subset tables.
    assert_eq!(events.load(Ordering::SeqCst), 6);
}
