use super::{error::Error, fs::Filesystem, util, BLK_TYPE_FB, FILE_TYPE_META, INODE_SIZE};
use std::cmp;

const OFS_ID: usize = 0x200;
const OFS_ID2: usize = 0x204;
const OFS_NLINK: usize = 0x208;
const OFS_TYPE: usize = 0x20c;
const OFS_FLAGS: usize = 0x210;
const OFS_SIZE: usize = 0x214;
const OFS_BLK_SIZE: usize = 0x21c;
const OFS_BLK_COUNT: usize = 0x224;
const OFS_ZLA: usize = 0x244;
const OFS_BLOCKS: usize = 0x400;
const BLK_COUNT: usize = 256;

/// A decoded descriptor record. Describes one file or directory: its size,
/// type, and the tagged block ids its content lives in.
#[derive(Debug, Default)]
pub struct Descriptor {
    pub id: u32,
    pub id2: u32,
    pub nlink: u32,
    pub typ: u32,
    pub flags: u32,
    pub size: u64,
    pub blk_size: u64,
    pub blk_count: u64,
    pub zla: u32,
    pub blocks: Vec<u32>,
}

impl Descriptor {
    pub fn read(buf: &[u8]) -> Result<Self, Error> {
        if buf.len() < INODE_SIZE {
            return Err(Error::InvalidFormat(format!(
                "short descriptor record: {} bytes",
                buf.len()
            )));
        }

        let mut blocks = Vec::with_capacity(BLK_COUNT);
        for i in 0..BLK_COUNT {
            blocks.push(util::read_le32(buf, OFS_BLOCKS + i * 4));
        }

        Ok(Self {
            id: util::read_le32(buf, OFS_ID),
            id2: util::read_le32(buf, OFS_ID2),
            nlink: util::read_le32(buf, OFS_NLINK),
            typ: util::read_le32(buf, OFS_TYPE),
            flags: util::read_le32(buf, OFS_FLAGS),
            size: util::read_le64(buf, OFS_SIZE),
            blk_size: util::read_le64(buf, OFS_BLK_SIZE),
            blk_count: util::read_le64(buf, OFS_BLK_COUNT),
            zla: util::read_le32(buf, OFS_ZLA),
            blocks,
        })
    }

    /// Read `buf.len()` bytes of file content starting at `pos`, resolving
    /// block pointers as it goes. Reads clamp at the recorded file size, so
    /// the return value may be short.
    pub fn read_at(&self, fs: &Filesystem, mut pos: u64, buf: &mut [u8]) -> Result<usize, Error> {
        let blk_size = fs.block_size();
        if blk_size == 0 {
            return Err(Error::InvalidFormat("zero block size".to_string()));
        }

        let mut total = 0;
        let mut remaining = cmp::min(buf.len() as u64, self.size.saturating_sub(pos)) as usize;

        while remaining > 0 {
            let index = (pos / blk_size) as usize;
            let within = pos % blk_size;
            let chunk = cmp::min(remaining as u64, blk_size - within) as usize;

            let blk_id = *self.blocks.get(index).ok_or_else(|| {
                Error::InvalidFormat(format!("block index {} out of range", index))
            })?;

            match util::blk_type(blk_id) {
                BLK_TYPE_FB => {
                    let n =
                        fs.read_block(util::blk_item(blk_id), within, &mut buf[total..total + chunk])?;
                    total += n;
                    if n < chunk {
                        return Ok(total);
                    }
                }
                other => {
                    return Err(Error::InvalidFormat(format!(
                        "unsupported block pointer type {}",
                        other
                    )))
                }
            }

            pos += chunk as u64;
            remaining -= chunk;
        }

        Ok(total)
    }
}

/// Fabricate the one-block metadata descriptor that seeds the FDC before any
/// lookup machinery exists. Never written to disk; its single storage pointer
/// is the block holding `base`.
pub fn synthetic_descriptor(block_size: u64, base: u64) -> Vec<u8> {
    let mut raw = vec![0u8; INODE_SIZE];
    util::write_le64(&mut raw, OFS_SIZE, block_size);
    util::write_le32(&mut raw, OFS_TYPE, FILE_TYPE_META);
    util::write_le32(&mut raw, OFS_BLOCKS, util::blk_fb((base / block_size) as u32));
    raw
}

/// Encode a descriptor record into an image fixture.
#[cfg(test)]
pub(crate) fn write_descriptor(
    buf: &mut [u8],
    typ: u32,
    size: u64,
    blk_size: u64,
    blocks: &[u32],
) {
    util::write_le32(buf, OFS_NLINK, 1);
    util::write_le32(buf, OFS_TYPE, typ);
    util::write_le64(buf, OFS_SIZE, size);
    util::write_le64(buf, OFS_BLK_SIZE, blk_size);
    util::write_le64(buf, OFS_BLK_COUNT, blocks.len() as u64);
    for (i, blk) in blocks.iter().enumerate() {
        util::write_le32(buf, OFS_BLOCKS + i * 4, *blk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_descriptor_encodes_base_block() -> anyhow::Result<()> {
        let block_size = 0x100_0000;
        let raw = synthetic_descriptor(block_size, 0x280_0000);
        let desc = Descriptor::read(&raw)?;

        assert_eq!(desc.typ, FILE_TYPE_META);
        assert_eq!(desc.size, block_size);
        assert_eq!(util::blk_type(desc.blocks[0]), BLK_TYPE_FB);
        assert_eq!(util::blk_item(desc.blocks[0]), 2);
        assert_eq!(desc.blocks[1], 0);

        Ok(())
    }

    #[test]
    fn decode_rejects_short_record() {
        assert!(matches!(
            Descriptor::read(&[0u8; 16]),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn decode_round_trips_fields() -> anyhow::Result<()> {
        let mut raw = vec![0u8; INODE_SIZE];
        write_descriptor(&mut raw, 2, 0x348, 0x10_0000, &[util::blk_fb(5)]);

        let desc = Descriptor::read(&raw)?;
        assert_eq!(desc.typ, 2);
        assert_eq!(desc.size, 0x348);
        assert_eq!(desc.blk_size, 0x10_0000);
        assert_eq!(desc.blk_count, 1);
        assert_eq!(desc.blocks[0], util::blk_fb(5));

        Ok(())
    }
}
