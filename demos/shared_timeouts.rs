//! Basic usage example for shared timeout contexts

use timeline::{sleep, Duration, Instant, Timeline};

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    let timeline = Timeline::with_resolution(Duration::from_millis(10));

    // Deadlines landing in the same 10ms window share a single context,
    // and therefore a single timer.
    let at = Instant::now() + Duration::from_millis(200);
    let first = timeline.deadline(at);
    let second = timeline.deadline(at);
    println!(
        "two requests, one shared deadline at {:?} from now",
        first.deadline() - Instant::now()
    );

    first.done().await;
    println!(
        "first expired: {:?}, second observed it too: {}",
        first.error(),
        second.is_done()
    );

    // Contexts wired into a select make plain timeouts.
    let context = timeline.timeout(Duration::from_millis(50));
    tokio::select! {
        _ = slow_work() => println!("work finished in time"),
        _ = context.done() => println!("work timed out: {:?}", context.error()),
    }

    // Cancellation reaches every outstanding context at once.
    let pending = timeline.timeout(Duration::from_secs(10));
    timeline.cancel();
    println!("after cancel: {:?}", pending.error());

    // The sleep helper stops early when its context fires.
    let context = timeline.timeout(Duration::from_millis(100));
    match sleep(&context, Duration::from_secs(5)).await {
        Ok(()) => println!("slept the full five seconds"),
        Err(err) => println!("sleep interrupted: {}", err),
    }
}

async fn slow_work() {
    tokio::time::sleep(Duration::from_secs(1)).await;
}
