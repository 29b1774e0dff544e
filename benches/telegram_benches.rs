//! Telegram encoding and reply parsing benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use s7_client::utils::{get_real_at, set_real_at};
use s7_client::{
    encode_password, Area, MultiReadCommand, ReadAreaCommand, S7Response, VarSpec, WordLength,
    WriteAreaCommand,
};

fn var_specs(count: usize) -> Vec<VarSpec> {
    (0..count)
        .map(|i| VarSpec {
            area: Area::DB,
            word_length: WordLength::Byte,
            db_number: 1,
            start: (i as u32) * 32,
            amount: 4,
        })
        .collect()
}

/// Multi-read reply carrying `count` items of 4 bytes.
fn multi_read_reply(count: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; 21];
    bytes[..7].copy_from_slice(&[0x03, 0x00, 0x00, 0x00, 0x02, 0xF0, 0x80]);
    bytes[7] = 0x32;
    bytes[8] = 0x03;
    bytes[19] = 0x04;
    bytes[20] = count as u8;
    for i in 0..count {
        bytes.extend_from_slice(&[0xFF, 0x04, 0x00, 32, i as u8, 1, 2, 3]);
    }
    let len = bytes.len() as u16;
    bytes[2..4].copy_from_slice(&len.to_be_bytes());
    bytes
}

fn bench_requests(c: &mut Criterion) {
    c.bench_function("read_area_request", |b| {
        b.iter(|| {
            ReadAreaCommand::new(Area::DB, black_box(1), WordLength::Byte, black_box(100), 222)
                .to_bytes()
        })
    });

    let data = vec![0x5Au8; 205];
    c.bench_function("write_area_request", |b| {
        b.iter(|| {
            WriteAreaCommand::new(Area::DB, 1, WordLength::Byte, black_box(0), 205, &data)
                .and_then(|cmd| cmd.to_bytes())
        })
    });

    let mut group = c.benchmark_group("multi_read_request");
    for count in [1usize, 10, 20] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| MultiReadCommand::new(var_specs(count)).and_then(|cmd| cmd.to_bytes()))
        });
    }
    group.finish();
}

fn bench_replies(c: &mut Criterion) {
    let mut group = c.benchmark_group("multi_read_reply");
    for count in [1usize, 10, 20] {
        let reply = S7Response::from_bytes(multi_read_reply(count));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| reply.multi_read_items(black_box(count)).map(|items| items.len()))
        });
    }
    group.finish();
}

fn bench_utils(c: &mut Criterion) {
    c.bench_function("encode_password", |b| {
        b.iter(|| encode_password(black_box("secret12")))
    });

    let mut buffer = [0u8; 64];
    c.bench_function("real_round_trip", |b| {
        b.iter(|| {
            for pos in (0..64).step_by(4) {
                let _ = set_real_at(&mut buffer, pos, black_box(21.5));
            }
            (0..64)
                .step_by(4)
                .filter_map(|pos| get_real_at(&buffer, pos).ok())
                .sum::<f32>()
        })
    });
}

criterion_group!(benches, bench_requests, bench_replies, bench_utils);
criterion_main!(benches);
