// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Serialization Benchmark
//!
//! Measures topic-frame encoding for both wire formats with different:
//! - Payload sizes (64B to 64KB byte arrays)
//! - Field mixes (aligned numeric fields vs strings)
//!
//! Also measures the enqueue + send_next round through an OutgoingQueue.

#![allow(clippy::cast_possible_truncation)]

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rostcp::{OutgoingQueue, WireFormat, WireMessage, WireSerializer};
use std::hint::black_box as bb;
use std::sync::Arc;

/// `sensor_msgs/CompressedImage`-like message
struct Blob {
    stamp_sec: i32,
    stamp_nsec: u32,
    frame_id: String,
    format: String,
    data: Vec<u8>,
}

impl Blob {
    fn new(size: usize) -> Self {
        Self {
            stamp_sec: 1,
            stamp_nsec: 2,
            frame_id: "camera".to_string(),
            format: "jpeg".to_string(),
            data: vec![0xAB; size],
        }
    }
}

impl WireMessage for Blob {
    fn serialize_into(&self, ser: &mut WireSerializer) {
        ser.write(self.stamp_sec);
        ser.write(self.stamp_nsec);
        ser.write_str(&self.frame_id);
        ser.write_str(&self.format);
        ser.write_length(self.data.len());
        ser.write_bytes(&self.data);
    }
}

/// Mixed-alignment numeric message
struct Imu {
    orientation: [f64; 4],
    covariance: [f64; 9],
    seq: u16,
    valid: bool,
}

impl WireMessage for Imu {
    fn serialize_into(&self, ser: &mut WireSerializer) {
        ser.write(self.seq);
        ser.write(self.valid);
        ser.write_slice(&self.orientation);
        ser.write_slice(&self.covariance);
    }
}

fn bench_payload_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("topic_frame_by_size");

    for format in [WireFormat::Legacy, WireFormat::Cdr] {
        let mut ser = WireSerializer::new(format);
        for size in [64, 1024, 16384, 65536] {
            let message = Blob::new(size);
            group.throughput(Throughput::Bytes(size as u64));
            group.bench_with_input(
                BenchmarkId::new(format.to_string(), size),
                &message,
                |b, message| {
                    b.iter(|| {
                        ser.clear();
                        ser.serialize_topic_message("/camera/image/compressed", message);
                        bb(ser.len())
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_aligned_fields(c: &mut Criterion) {
    let mut group = c.benchmark_group("aligned_fields");
    let message = Imu {
        orientation: [0.0, 0.0, 0.0, 1.0],
        covariance: [0.01; 9],
        seq: 7,
        valid: true,
    };

    for format in [WireFormat::Legacy, WireFormat::Cdr] {
        let mut ser = WireSerializer::new(format);
        group.bench_function(format.to_string(), |b| {
            b.iter(|| {
                ser.clear();
                ser.serialize_message_with_length(bb(&message));
                bb(ser.to_bytes())
            });
        });
    }

    group.finish();
}

fn bench_queue_round(c: &mut Criterion) {
    let queue = OutgoingQueue::new("/imu", 10).expect("queue creation");
    let message = Arc::new(Imu {
        orientation: [0.0; 4],
        covariance: [0.0; 9],
        seq: 0,
        valid: false,
    });
    let mut ser = WireSerializer::new(WireFormat::Cdr);
    let mut sink = std::io::sink();

    c.bench_function("enqueue_send_next", |b| {
        b.iter(|| {
            queue.enqueue(Arc::clone(&message));
            bb(queue.send_next(&mut ser, &mut sink).expect("send"))
        });
    });
}

criterion_group!(
    benches,
    bench_payload_sizes,
    bench_aligned_fields,
    bench_queue_round
);
criterion_main!(benches);
