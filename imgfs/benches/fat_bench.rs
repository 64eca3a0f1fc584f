// SPDX-License-Identifier: MIT

use criterion::{Criterion, criterion_group, criterion_main};

use imgfs::{Capacity, Entry, FsDriver, FsKind, build_image, fat::FatDriver};

criterion_group!(benches, fat_bench, fat_component_bench);
criterion_main!(benches);

const SIZE_MB: u64 = 32;
const GUID: [u8; 16] = *b"benchmark-volume";

fn sample_tree() -> Vec<Entry> {
    let mut entries = vec![Entry::dir("boot"), Entry::dir("usr"), Entry::dir("usr/share")];
    entries.push(Entry::file("boot/kernel", vec![0xCC; 2 * 1024 * 1024]));
    for i in 0..200 {
        entries.push(Entry::file(&format!("usr/share/Document {i:03}.txt"), vec![b'x'; 3000]));
    }
    entries
}

pub fn fat_bench(c: &mut Criterion) {
    let cap = Capacity::from_bytes(SIZE_MB * 1024 * 1024, GUID);
    let tree = sample_tree();

    c.bench_function("fat_build_image", |b| {
        b.iter(|| build_image(FsKind::Fat, Some(&cap), &tree).expect("build failed"));
    });
}

pub fn fat_component_bench(c: &mut Criterion) {
    let cap = Capacity::from_bytes(SIZE_MB * 1024 * 1024, GUID);
    let tree = sample_tree();

    c.bench_function("fat_format", |b| {
        b.iter(|| FatDriver::open(Some(&cap)).expect("format failed"));
    });

    c.bench_function("fat_inject", |b| {
        b.iter_batched(
            || FatDriver::open(Some(&cap)).expect("format failed"),
            |mut driver| {
                for entry in &tree {
                    driver.add(entry).expect("inject failed");
                }
                driver
            },
            criterion::BatchSize::LargeInput,
        );
    });
}
