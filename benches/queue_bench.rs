use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use typedq::{MessageQueue, HEADER_SIZE};
use std::{sync::Arc, thread};

fn benchmark_single_threaded_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("MessageQueue_SingleThreaded");

    for payload_size in [4usize, 64, 1024].iter() {
        let capacity = 64 * (HEADER_SIZE + payload_size) as u32;
        group.throughput(Throughput::Bytes((64 * payload_size) as u64));
        group.bench_with_input(
            BenchmarkId::new("push_pop", payload_size),
            payload_size,
            |b, &payload_size| {
                let queue = MessageQueue::with_capacity(capacity).unwrap();
                let payload = vec![0xA5u8; payload_size];

                b.iter(|| {
                    // Fill completely
                    for i in 0..64 {
                        queue.try_push(i, &payload).unwrap();
                    }

                    // Drain completely
                    for _ in 0..64 {
                        queue.try_pop(payload_size as u32).unwrap();
                    }
                });
            },
        );
    }

    group.finish();
}

fn benchmark_producer_consumer(c: &mut Criterion) {
    let mut group = c.benchmark_group("MessageQueue_ProducerConsumer");
    let messages = 10_000u32;
    group.throughput(Throughput::Elements(messages as u64));

    for capacity in [64u32, 1024, 16384].iter() {
        group.bench_with_input(BenchmarkId::new("spsc", capacity), capacity, |b, &capacity| {
            b.iter(|| {
                let queue = Arc::new(MessageQueue::with_capacity(capacity).unwrap());

                let producer = {
                    let queue = queue.clone();
                    thread::spawn(move || {
                        for i in 0..messages {
                            queue.push(1, &i.to_le_bytes()).unwrap();
                        }
                    })
                };

                for _ in 0..messages {
                    queue.pop(4).unwrap();
                }
                producer.join().unwrap();
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_single_threaded_throughput, benchmark_producer_consumer);
criterion_main!(benches);
