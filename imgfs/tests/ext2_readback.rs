// SPDX-License-Identifier: MIT

//! ext2 images walked with a small independent reader.

use imgfs::{Capacity, Entry, EntryKind, FsErrorKind, FsKind, build_image, ext2::check_file_size};

fn u16_at(b: &[u8], off: usize) -> u16 {
    u16::from_le_bytes(b[off..off + 2].try_into().unwrap())
}

fn u32_at(b: &[u8], off: usize) -> u32 {
    u32::from_le_bytes(b[off..off + 4].try_into().unwrap())
}

struct Reader<'a> {
    img: &'a [u8],
    block: usize,
    inodes_per_group: u32,
}

impl<'a> Reader<'a> {
    fn new(img: &'a [u8]) -> Self {
        let sb = &img[1024..2048];
        assert_eq!(u16_at(sb, 56), 0xEF53);
        Self {
            img,
            block: 1024 << u32_at(sb, 24),
            inodes_per_group: u32_at(sb, 40),
        }
    }

    fn inode(&self, ino: u32) -> &'a [u8] {
        let group = ((ino - 1) / self.inodes_per_group) as usize;
        let index = ((ino - 1) % self.inodes_per_group) as usize;
        let gdt = self.block + group * 32;
        let table = u32_at(self.img, gdt + 8) as usize * self.block;
        &self.img[table + index * 128..table + (index + 1) * 128]
    }

    fn blocks(&self, inode: &[u8]) -> Vec<usize> {
        let count = (u32_at(inode, 4) as usize).div_ceil(self.block);
        let mut out: Vec<usize> = (0..12.min(count)).map(|i| u32_at(inode, 40 + i * 4) as usize).collect();
        if count > 12 {
            let ind = u32_at(inode, 40 + 12 * 4) as usize * self.block;
            out.extend((0..count - 12).map(|i| u32_at(self.img, ind + i * 4) as usize));
        }
        out
    }

    fn read(&self, ino: u32) -> Vec<u8> {
        let inode = self.inode(ino);
        let size = u32_at(inode, 4) as usize;
        if u16_at(inode, 0) & 0o170000 == 0o120000 && u32_at(inode, 28) == 0 {
            return inode[40..40 + size].to_vec();
        }
        let mut data = Vec::with_capacity(size);
        for b in self.blocks(inode) {
            data.extend_from_slice(&self.img[b * self.block..(b + 1) * self.block]);
        }
        data.truncate(size);
        data
    }

    fn list(&self, ino: u32) -> Vec<(String, u32, u8)> {
        let data = self.read(ino);
        let mut out = Vec::new();
        let mut off = 0;
        while off < data.len() {
            let child = u32_at(&data, off);
            let rec_len = u16_at(&data, off + 4) as usize;
            let name_len = data[off + 6] as usize;
            if child != 0 {
                let name = String::from_utf8(data[off + 8..off + 8 + name_len].to_vec()).unwrap();
                out.push((name, child, data[off + 7]));
            }
            off += rec_len;
        }
        out
    }

    fn lookup(&self, path: &str) -> u32 {
        path.split('/').fold(2, |dir, name| {
            self.list(dir)
                .into_iter()
                .find(|(n, _, _)| n == name)
                .unwrap_or_else(|| panic!("{name} missing"))
                .1
        })
    }
}

#[test]
fn tree_reads_back() {
    let cap = Capacity::from_sectors(16384, [9; 16]);
    let big: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
    let entries = [
        Entry::dir("etc"),
        Entry::file("etc/hostname", b"box\n".to_vec()).with_mode(0o600).with_owner(1000, 100),
        Entry::dir("bin"),
        Entry::file("bin/init", big.clone()),
        Entry::symlink("bin/sh", "init"),
    ];
    let image = build_image(FsKind::Ext2, Some(&cap), &entries).unwrap();
    let fs = Reader::new(&image);

    let root: Vec<String> = fs.list(2).into_iter().map(|(n, _, _)| n).collect();
    for name in [".", "..", "lost+found", "etc", "bin"] {
        assert!(root.iter().any(|n| n == name), "{name} missing from root");
    }

    let hostname = fs.lookup("etc/hostname");
    assert_eq!(fs.read(hostname), b"box\n");
    let inode = fs.inode(hostname);
    assert_eq!(u16_at(inode, 0), 0o100600);
    assert_eq!(u16_at(inode, 2), 1000);
    assert_eq!(u16_at(inode, 24), 100);

    // 100 000 bytes spill into the single indirect block
    assert_eq!(fs.read(fs.lookup("bin/init")), big);

    let sh = fs.lookup("bin/sh");
    assert_eq!(u16_at(fs.inode(sh), 0) & 0o170000, 0o120000);
    assert_eq!(fs.read(sh), b"init");
    // short targets are fast symlinks: no data block, target in i_block
    let inode = fs.inode(sh);
    assert_eq!(u32_at(inode, 28), 0);
    assert_eq!(&inode[40..45], b"init\0");
}

#[test]
fn minimum_volume_geometry() {
    let cap = Capacity::from_sectors(128, [9; 16]);
    let image = build_image(FsKind::Ext2, Some(&cap), &[]).unwrap();
    let sb = &image[1024..2048];
    let inodes_per_group = u32_at(sb, 40);
    // at least one full inode table block
    assert!(inodes_per_group >= 4096 / 128, "{inodes_per_group}");
    assert_eq!(inodes_per_group % 8, 0);
    assert_eq!(u32_at(sb, 0), inodes_per_group);
}

#[test]
fn dirent_types_match_inode_modes() {
    let cap = Capacity::from_sectors(4096, [9; 16]);
    let entries = [
        Entry::dir("dev"),
        Entry::device("dev/null", EntryKind::CharDevice, 1, 3),
        Entry::device("dev/sda", EntryKind::BlockDevice, 8, 0),
        Entry::file("dev/readme", b"devices\n".to_vec()),
        Entry::symlink("dev/stdin", "/proc/self/fd/0"),
        Entry::symlink("dev/far", &"d/".repeat(40)),
    ];
    let image = build_image(FsKind::Ext2, Some(&cap), &entries).unwrap();
    let fs = Reader::new(&image);

    let mut checked = 0;
    for dir in [2, fs.lookup("dev")] {
        for (name, ino, file_type) in fs.list(dir) {
            let mode = u16_at(fs.inode(ino), 0) & 0o170000;
            let expected = match mode {
                0o100000 => 1,
                0o040000 => 2,
                0o020000 => 3,
                0o060000 => 4,
                0o120000 => 7,
                other => panic!("{name}: unexpected mode {other:o}"),
            };
            assert_eq!(file_type, expected, "{name}");
            checked += 1;
        }
    }
    // root: ".", "..", lost+found, dev; dev: ".", "..", five entries
    assert_eq!(checked, 4 + 7);

    assert_eq!(fs.read(fs.lookup("dev/stdin")), b"/proc/self/fd/0");
    let far = fs.lookup("dev/far");
    assert_eq!(u32_at(fs.inode(far), 28), 8);
    assert_eq!(fs.read(far), "d/".repeat(40).into_bytes());
}

#[test]
fn directory_link_counts() {
    let cap = Capacity::from_sectors(4096, [9; 16]);
    let entries = [Entry::dir("a"), Entry::dir("a/b"), Entry::dir("a/c")];
    let image = build_image(FsKind::Ext2, Some(&cap), &entries).unwrap();
    let fs = Reader::new(&image);

    let a = fs.lookup("a");
    assert_eq!(u16_at(fs.inode(a), 26), 4);
    assert_eq!(u16_at(fs.inode(fs.lookup("a/b")), 26), 2);
    // root: ".", "..", lost+found and a
    assert_eq!(u16_at(fs.inode(2), 26), 4);
}

#[test]
fn file_size_limit() {
    let max_blocks: u64 = 12 + 1024 + 1024 * 1024;
    assert!(check_file_size(0).is_ok());
    assert!(check_file_size(u32::MAX as u64).is_ok());
    assert!(check_file_size(max_blocks * 4096 + 1).is_err());

    let cap = Capacity::from_sectors(128, [9; 16]);
    let err = build_image(FsKind::Ext2, Some(&cap), &[Entry::file("huge", vec![1u8; 64 * 4096])])
        .unwrap_err();
    assert_eq!(err.kind(), FsErrorKind::OutOfSpace);
}
