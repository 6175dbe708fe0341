use criterion::{black_box, criterion_group, criterion_main, Criterion};

use blockspool::Stream;

const RECORDS_PER_BLOCK: usize = 256;
const BLOCKS: usize = 8;

fn build_stream(algorithm: &str, payload: &[u8]) -> Stream {
    let mut stream = Stream::new(
        algorithm,
        "little",
        RECORDS_PER_BLOCK,
        "memory",
        std::env::temp_dir(),
        1 << 20,
    )
    .unwrap();
    stream.init().unwrap();
    for _ in 0..BLOCKS {
        for _ in 0..RECORDS_PER_BLOCK {
            stream.write_record(payload).unwrap();
        }
        stream.rotate().unwrap();
    }
    stream.close().unwrap();
    stream
}

fn bench_write(c: &mut Criterion) {
    let payload = vec![0x5au8; 512];
    let mut group = c.benchmark_group("write_and_seal");
    for algorithm in ["none", "lz4", "zstd"] {
        group.bench_function(algorithm, |b| {
            b.iter(|| build_stream(black_box(algorithm), black_box(&payload)))
        });
    }
    group.finish();
}

fn bench_sequential_read(c: &mut Criterion) {
    let payload = vec![0x5au8; 512];
    let mut group = c.benchmark_group("sequential_read");
    for algorithm in ["none", "lz4", "zstd"] {
        let stream = build_stream(algorithm, &payload);
        group.bench_function(algorithm, |b| {
            b.iter(|| {
                let mut it = stream.iterator().unwrap();
                let mut count = 0usize;
                while let Some(record) = it.next().unwrap() {
                    count += record.len();
                }
                it.close().unwrap();
                black_box(count)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_write, bench_sequential_read);
criterion_main!(benches);
