//! Frame decode and action publish benchmarks

use criterion::{Criterion, criterion_group, criterion_main};
use col::shm::layout::LAYOUT;
use col::shm::records::{ActionAxes, CameraBlockHeader, GlobalHeader};
use col::shm::streams::StreamFlags;
use col_shared_memory::{ActionChannel, FrameDecoder, Segment};
use std::hint::black_box;

fn populated_segment(cameras: u32, side: u32) -> Segment {
    let mut seg = Segment::anonymous("bench_frames").unwrap();
    let header = GlobalHeader {
        camera_count: cameras,
        ..Default::default()
    };
    seg.write(0, &header.encode()).unwrap();
    for block in 0..cameras as usize {
        let cam = CameraBlockHeader {
            camera_id: block as u32,
            width: side,
            height: side,
            channels: 4,
        };
        seg.write(LAYOUT.camera_block_offset(block), &cam.encode())
            .unwrap();
    }
    seg
}

/// Benchmark decoding for different camera counts and resolutions
fn bench_decode(c: &mut Criterion) {
    let decoder = FrameDecoder::new(LAYOUT, StreamFlags::all());

    for (cameras, side) in [(1u32, 128u32), (4, 128), (4, 2048)] {
        let seg = populated_segment(cameras, side);
        c.bench_function(&format!("decode_{cameras}x{side}"), |b| {
            b.iter(|| {
                let frames = decoder.decode(black_box(&seg)).unwrap();
                black_box(frames.len());
            });
        });
    }
}

/// Benchmark the per-tick action overwrite
fn bench_action_publish(c: &mut Criterion) {
    let mut seg = Segment::anonymous("bench_actions").unwrap();
    let mut channel = ActionChannel::new();
    let axes = ActionAxes {
        forward: 1,
        turn: -1,
        ..Default::default()
    };

    c.bench_function("action_publish", |b| {
        b.iter(|| {
            black_box(channel.publish(&mut seg, black_box(axes)).unwrap());
        });
    });
}

criterion_group!(benches, bench_decode, bench_action_publish);
criterion_main!(benches);
