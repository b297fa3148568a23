use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use ocd_protocol::{Event, Message};

fn parse_events(c: &mut Criterion) {
    c.bench_function("parse target_state", |b| {
        b.iter(|| Event::parse(black_box("type target_state state halted")))
    });
    c.bench_function("parse target_event", |b| {
        b.iter(|| Event::parse(black_box("type target_event event resumed")))
    });
    c.bench_function("parse semihost message", |b| {
        b.iter(|| Event::parse(black_box("type semihost-message message ~192.168.1.5")))
    });
}

fn classify_batch(c: &mut Criterion) {
    let batch = "type target_event event reset-start\r\n\x1a\
                 type target_state state reset\r\n\x1a\
                 type target_state state running\r\n\x1a\
                 type target_event event halted\r\n";
    c.bench_function("classify batch", |b| {
        b.iter(|| Message::classify(black_box(batch)))
    });
}

criterion_group!(benches, parse_events, classify_batch);
criterion_main!(benches);
