use std::hint::black_box;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use prev_event::events::{KeyCode, KeyEvent};
use prev_event::EventChannel;

fn channel_with_handlers(count: usize) -> (EventChannel, Arc<AtomicU64>) {
    let channel = EventChannel::new();
    let total = Arc::new(AtomicU64::new(0));
    for _ in 0..count {
        let total = total.clone();
        channel.subscribe(move |_: &KeyEvent| {
            total.fetch_add(1, Ordering::Relaxed);
        });
    }
    (channel, total)
}

fn bench_broadcast(c: &mut Criterion) {
    let mut group = c.benchmark_group("broadcast");
    for handlers in [1, 8, 64] {
        let (channel, _) = channel_with_handlers(handlers);
        group.bench_with_input(BenchmarkId::from_parameter(handlers), &handlers, |b, _| {
            b.iter(|| channel.broadcast(black_box(&KeyEvent::press(KeyCode::KeyA))));
        });
    }
    group.finish();
}

fn bench_queued(c: &mut Criterion) {
    let (channel, _) = channel_with_handlers(8);
    c.bench_function("post_queued_dispatch_256", |b| {
        b.iter(|| {
            for _ in 0..256 {
                channel.post_queued(KeyEvent::press(KeyCode::KeyA));
            }
            black_box(channel.dispatch_all())
        });
    });
}

criterion_group!(benches, bench_broadcast, bench_queued);
criterion_main!(benches);
