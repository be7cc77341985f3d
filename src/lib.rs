pub mod bitmap;
pub mod dir;
pub mod error;
pub mod fs;
pub mod inode;
pub mod types;
pub mod util;
pub mod volume;

pub use error::Error;
pub use fs::Filesystem;
pub use volume::{ImageVolume, Volume};

/// Superblock location and size. All multi-byte fields are little-endian
/// regardless of the host.
pub const FSINFO_BASE: u64 = 0x0020_0000;
pub const FSINFO_SIZE: usize = 512;
pub const FSINFO_MAGIC: u32 = 0x2fab_f15e;

/// Heartbeat region used for cluster-wide locking. The descriptor table
/// starts at the first block boundary past it.
pub const HB_BASE: u64 = 0x0030_0000;
pub const HB_NUM: u64 = 2048;
pub const HB_SIZE: u64 = 0x200;

/// Meta files, all living in the root directory.
pub const FBB_FILENAME: &str = ".fbb.sf";
pub const FDC_FILENAME: &str = ".fdc.sf";
pub const PBC_FILENAME: &str = ".pbc.sf";
pub const SBC_FILENAME: &str = ".sbc.sf";

/// On-disk size of a descriptor record ("inode").
pub const INODE_SIZE: usize = 0x800;

/// On-disk size of a directory entry.
pub const DIRENT_SIZE: usize = 0x8c;

/// Size of one bitmap entry inside a bitmap file.
pub const BITMAP_ENTRY_SIZE: u64 = 0x400;

/// File types stored in descriptor records and directory entries.
pub const FILE_TYPE_DIR: u32 = 2;
pub const FILE_TYPE_FILE: u32 = 3;
pub const FILE_TYPE_META: u32 = 5;

/// Block-id tags, stored in the low 6 bits of a block id.
pub const BLK_TYPE_NONE: u32 = 0;
pub const BLK_TYPE_FB: u32 = 1;
pub const BLK_TYPE_FD: u32 = 4;
