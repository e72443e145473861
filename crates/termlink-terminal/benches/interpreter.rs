//! Interpreter throughput benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use termlink_terminal::{Interpreter, ScreenBuffer};

fn bench_plain_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("interpreter");

    let input: String = (0..200)
        .map(|i| format!("Line {i}: Some text content here\r\n"))
        .collect();
    group.throughput(Throughput::Bytes(input.len() as u64));

    group.bench_function("plain_text_scrolling", |b| {
        b.iter(|| {
            let screen = ScreenBuffer::new(24, 80).unwrap();
            let mut interpreter = Interpreter::new();
            interpreter.feed(&screen, black_box(&input)).unwrap();
            black_box(screen)
        })
    });

    group.finish();
}

fn bench_control_sequences(c: &mut Criterion) {
    let mut group = c.benchmark_group("interpreter");

    let input = "\x1b[H\x1b[2J\x1b[1;31mHello\x1b[0m \x1b[38;5;33mWorld\x1b[0m\x1b[10;20H\x1b[K".repeat(100);
    group.throughput(Throughput::Bytes(input.len() as u64));

    group.bench_function("csi_heavy", |b| {
        b.iter(|| {
            let screen = ScreenBuffer::new(24, 80).unwrap();
            let mut interpreter = Interpreter::new();
            interpreter.feed(&screen, black_box(&input)).unwrap();
            black_box(screen)
        })
    });

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let screen = ScreenBuffer::new(50, 200).unwrap();
    let mut interpreter = Interpreter::new();
    interpreter.feed(&screen, &"x".repeat(50 * 200)).unwrap();

    c.bench_function("snapshot_50x200", |b| {
        b.iter(|| black_box(screen.snapshot().unwrap()))
    });
}

criterion_group!(benches, bench_plain_text, bench_control_sequences, bench_snapshot);
criterion_main!(benches);
