// SPDX-License-Identifier: MIT

//! FAT images read back through the `fatfs` crate.

use std::io::{Cursor, Read};

use fatfs::{FatType, FileSystem, FsOptions};
use fscommon::BufStream;
use imgfs::{Capacity, Entry, FsErrorKind, FsKind, build_image};

const GUID: [u8; 16] = *b"fat-readback-id!";

fn mount(image: Vec<u8>) -> FileSystem<BufStream<Cursor<Vec<u8>>>> {
    FileSystem::new(BufStream::new(Cursor::new(image)), FsOptions::new()).expect("mount")
}

fn read_all<T: Read>(mut file: T) -> Vec<u8> {
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).expect("read");
    buf
}

#[test]
fn minimum_volume_boundary() {
    let cap = Capacity::from_sectors(4152, GUID);
    let err = build_image(FsKind::Fat, Some(&cap), &[]).unwrap_err();
    assert_eq!(err.kind(), FsErrorKind::BelowMinimum);

    let cap = Capacity::from_sectors(4153, GUID);
    let entries = [Entry::dir("docs"), Entry::file("docs/readme.txt", b"hi".to_vec())];
    let image = build_image(FsKind::Fat, Some(&cap), &entries).unwrap();
    assert_eq!(image.len() as u64, cap.bytes());

    let fs = mount(image);
    assert_eq!(fs.fat_type(), FatType::Fat16);
    let docs = fs.root_dir().open_dir("docs").unwrap();
    let names: Vec<String> = docs
        .iter()
        .map(|e| e.unwrap().file_name())
        .filter(|n| n != "." && n != "..")
        .collect();
    assert_eq!(names, ["readme.txt"]);
    assert_eq!(read_all(docs.open_file("readme.txt").unwrap()), b"hi");
}

#[test]
fn long_names_and_large_directory() {
    let cap = Capacity::from_sectors(16384, GUID);
    let mut entries = vec![Entry::dir("src")];
    for i in 0..40 {
        entries.push(Entry::file(&format!("src/Module number {i:02}.rs"), format!("// {i}\n")));
    }
    entries.push(Entry::file("A file with a long name.txt", vec![7u8; 10_000]));
    let image = build_image(FsKind::Fat, Some(&cap), &entries).unwrap();

    let fs = mount(image);
    let root = fs.root_dir();
    assert_eq!(read_all(root.open_file("A file with a long name.txt").unwrap()), vec![7u8; 10_000]);

    let src = root.open_dir("src").unwrap();
    let mut count = 0;
    for item in src.iter() {
        let item = item.unwrap();
        let name = item.file_name();
        if name == "." || name == ".." {
            continue;
        }
        let n: usize = name["Module number ".len()..name.len() - 3].parse().unwrap();
        assert_eq!(read_all(item.to_file()), format!("// {n}\n").into_bytes());
        count += 1;
    }
    assert_eq!(count, 40);
}

#[test]
fn fat32_volume() {
    // 80 000 sectors at one sector per cluster is past the FAT16 cluster limit
    let cap = Capacity::from_sectors(80_000, GUID);
    let entries = [
        Entry::dir("boot"),
        Entry::dir("boot/grub"),
        Entry::file("boot/grub/grub.cfg", b"set timeout=0\n".to_vec()),
        Entry::file("boot/kernel", (0..200_000u32).map(|i| i as u8).collect::<Vec<_>>()),
    ];
    let image = build_image(FsKind::Fat, Some(&cap), &entries).unwrap();

    let fs = mount(image);
    assert_eq!(fs.fat_type(), FatType::Fat32);
    let boot = fs.root_dir().open_dir("boot").unwrap();
    assert_eq!(
        read_all(boot.open_file("grub/grub.cfg").unwrap()),
        b"set timeout=0\n"
    );
    let kernel = read_all(boot.open_file("kernel").unwrap());
    assert_eq!(kernel.len(), 200_000);
    assert!(kernel.iter().enumerate().all(|(i, b)| *b == i as u8));
}
