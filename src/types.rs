use super::{error::Error, util, volume::Volume, FSINFO_BASE, FSINFO_MAGIC, FSINFO_SIZE};
use uuid::Uuid;

const OFS_MAGIC: usize = 0x0000;
const OFS_VOLVER: usize = 0x0004;
const OFS_VER: usize = 0x0008;
const OFS_UUID: usize = 0x0009;
const OFS_LABEL: usize = 0x001d;
const OFS_BLKSIZE: usize = 0x00a1;
const OFS_LVM_UUID: usize = 0x00b1;
const LABEL_SIZE: usize = 128;

/// Decoded superblock. Field offsets are fixed by the on-disk format; every
/// multi-byte field is little-endian.
#[derive(Debug, Default)]
pub struct Superblock {
    pub magic: u32,
    pub vol_version: u32,
    pub version: u8,
    pub uuid: Uuid,
    pub label: String,
    pub block_size: u64,
    pub lvm_uuid: Uuid,
}

impl Superblock {
    /// Read and validate the superblock region of `vol`. The volume-group
    /// UUID cross-check is left to the caller so this stays usable for
    /// inspecting images outside an open volume-group context.
    pub fn read(vol: &dyn Volume) -> Result<Self, Error> {
        let mut buf = [0u8; FSINFO_SIZE];
        let n = vol.read_at(FSINFO_BASE, &mut buf)?;
        if n != FSINFO_SIZE {
            return Err(Error::InvalidFormat(format!(
                "short superblock read: {} of {} bytes",
                n, FSINFO_SIZE
            )));
        }

        Self::decode(&buf)
    }

    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        if buf.len() < FSINFO_SIZE {
            return Err(Error::InvalidFormat(format!(
                "superblock buffer too small: {} bytes",
                buf.len()
            )));
        }

        let magic = util::read_le32(buf, OFS_MAGIC);
        if magic != FSINFO_MAGIC {
            return Err(Error::InvalidFormat(format!(
                "invalid magic number {:#010x}",
                magic
            )));
        }

        Ok(Self {
            magic,
            vol_version: util::read_le32(buf, OFS_VOLVER),
            version: buf[OFS_VER],
            uuid: read_uuid(buf, OFS_UUID)?,
            label: util::read_fixed_string(buf, OFS_LABEL, LABEL_SIZE),
            block_size: util::read_le64(buf, OFS_BLKSIZE),
            lvm_uuid: read_uuid(buf, OFS_LVM_UUID)?,
        })
    }
}

fn read_uuid(buf: &[u8], offset: usize) -> Result<Uuid, Error> {
    Uuid::from_slice(&buf[offset..offset + 16])
        .map_err(|e| Error::InvalidFormat(format!("bad uuid field: {}", e)))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_superblock(
        block_size: u64,
        uuid: Uuid,
        lvm_uuid: Uuid,
        label: &str,
    ) -> Vec<u8> {
        let mut buf = vec![0u8; FSINFO_SIZE];
        util::write_le32(&mut buf, OFS_MAGIC, FSINFO_MAGIC);
        util::write_le32(&mut buf, OFS_VOLVER, 3);
        buf[OFS_VER] = 54;
        buf[OFS_UUID..OFS_UUID + 16].copy_from_slice(uuid.as_bytes());
        buf[OFS_LABEL..OFS_LABEL + label.len()].copy_from_slice(label.as_bytes());
        util::write_le64(&mut buf, OFS_BLKSIZE, block_size);
        buf[OFS_LVM_UUID..OFS_LVM_UUID + 16].copy_from_slice(lvm_uuid.as_bytes());
        buf
    }

    #[test]
    fn decode_valid_superblock() -> anyhow::Result<()> {
        let uuid = Uuid::from_u128(0x1111_2222_3333_4444_5555_6666_7777_8888);
        let lvm_uuid = Uuid::from_u128(0xaaaa_bbbb_cccc_dddd_eeee_ffff_0000_1111);
        let buf = sample_superblock(0x10_0000, uuid, lvm_uuid, "datastore1");

        let sb = Superblock::decode(&buf)?;
        assert_eq!(sb.magic, FSINFO_MAGIC);
        assert_eq!(sb.vol_version, 3);
        assert_eq!(sb.version, 54);
        assert_eq!(sb.uuid, uuid);
        assert_eq!(sb.label, "datastore1");
        assert_eq!(sb.block_size, 0x10_0000);
        assert_eq!(sb.lvm_uuid, lvm_uuid);

        Ok(())
    }

    #[test]
    fn decode_rejects_bad_magic() {
        let mut buf = sample_superblock(0x10_0000, Uuid::nil(), Uuid::nil(), "x");
        buf[0] ^= 0xff;

        match Superblock::decode(&buf) {
            Err(Error::InvalidFormat(msg)) => assert!(msg.contains("magic")),
            other => panic!("expected InvalidFormat, got {:?}", other),
        }
    }

    #[test]
    fn decode_rejects_short_buffer() {
        let buf = vec![0u8; 64];
        assert!(matches!(
            Superblock::decode(&buf),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn label_is_bounded_by_field_width() -> anyhow::Result<()> {
        let label = "a".repeat(LABEL_SIZE);
        let buf = sample_superblock(0x10_0000, Uuid::nil(), Uuid::nil(), &label);
        let sb = Superblock::decode(&buf)?;
        assert_eq!(sb.label.len(), LABEL_SIZE);

        Ok(())
    }
}
