//! Demonstrates continuation-style chaining of deferred values.
//!
//! The second deferred value is only created once the first one has resolved, so the chain
//! takes the sum of both delays.

use std::time::Duration;

use deferred::{DelayedValueFactory, EventLoop};

fn main() {
    let event_loop = EventLoop::new();
    let handle = event_loop.handle();
    let factory =
        DelayedValueFactory::new(&handle, Duration::from_millis(100), "data1".to_string());

    let chained = factory.create().then(|data| {
        println!("First value resolved after {:?}", handle.elapsed());

        // Capture the first value by combining it into the second deferred value.
        handle.spawn({
            let second = factory.create();
            async move {
                let data2 = second.await.expect("factory values never fail");
                format!("{data} {data2}")
            }
        })
    });

    let combined = event_loop
        .block_on(chained)
        .expect("the chain only waits on timers, so it cannot stall")
        .expect("factory values never fail");

    println!("Promise: {combined}");
    println!("Both values resolved after {:?}", handle.elapsed());
}
