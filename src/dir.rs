use super::{error::Error, fs::Filesystem, inode::Descriptor, util, DIRENT_SIZE, FILE_TYPE_DIR};

const OFS_TYPE: usize = 0x00;
const OFS_BLOCK_ID: usize = 0x04;
const OFS_RECORD_ID: usize = 0x08;
const OFS_NAME: usize = 0x0c;
const NAME_SIZE: usize = 128;

#[derive(Debug)]
pub struct DirEntry {
    pub typ: u32,
    pub block_id: u32,
    pub record_id: u32,
    pub name: String,
}

impl DirEntry {
    fn read(buf: &[u8]) -> Result<Self, Error> {
        if buf.len() < DIRENT_SIZE {
            return Err(Error::InvalidFormat(format!(
                "short directory entry: {} bytes",
                buf.len()
            )));
        }

        Ok(Self {
            typ: util::read_le32(buf, OFS_TYPE),
            block_id: util::read_le32(buf, OFS_BLOCK_ID),
            record_id: util::read_le32(buf, OFS_RECORD_ID),
            name: util::read_fixed_string(buf, OFS_NAME, NAME_SIZE),
        })
    }
}

/// A bound directory handle. Its content is a flat array of fixed-size
/// entries read through the descriptor's block pointers.
#[derive(Debug)]
pub struct Directory {
    desc: Descriptor,
}

impl Directory {
    /// Bind a raw descriptor record as a directory.
    pub fn bind(raw: &[u8]) -> Result<Self, Error> {
        let desc = Descriptor::read(raw).map_err(|e| Error::Bind(e.to_string()))?;
        if desc.typ != FILE_TYPE_DIR {
            return Err(Error::Bind(format!(
                "descriptor type {} is not a directory",
                desc.typ
            )));
        }

        Ok(Self { desc })
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.desc
    }

    /// Linear scan for an entry named `name`.
    pub fn lookup(&self, fs: &Filesystem, name: &str) -> Result<Option<DirEntry>, Error> {
        let count = self.desc.size / DIRENT_SIZE as u64;
        let mut buf = [0u8; DIRENT_SIZE];

        for i in 0..count {
            let n = self.desc.read_at(fs, i * DIRENT_SIZE as u64, &mut buf)?;
            if n != DIRENT_SIZE {
                return Err(Error::InvalidFormat(format!(
                    "short directory entry read at index {}",
                    i
                )));
            }

            let entry = DirEntry::read(&buf)?;
            if entry.name == name {
                return Ok(Some(entry));
            }
        }

        Ok(None)
    }
}

/// Encode a directory entry into an image fixture.
#[cfg(test)]
pub(crate) fn write_dirent(buf: &mut [u8], typ: u32, block_id: u32, record_id: u32, name: &str) {
    util::write_le32(buf, OFS_TYPE, typ);
    util::write_le32(buf, OFS_BLOCK_ID, block_id);
    util::write_le32(buf, OFS_RECORD_ID, record_id);
    buf[OFS_NAME..OFS_NAME + name.len()].copy_from_slice(name.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{inode, INODE_SIZE};

    #[test]
    fn dirent_round_trip() -> anyhow::Result<()> {
        let mut buf = [0u8; DIRENT_SIZE];
        write_dirent(&mut buf, 5, util::blk_fd(2), 7, ".fdc.sf");

        let entry = DirEntry::read(&buf)?;
        assert_eq!(entry.typ, 5);
        assert_eq!(entry.block_id, util::blk_fd(2));
        assert_eq!(entry.record_id, 7);
        assert_eq!(entry.name, ".fdc.sf");

        Ok(())
    }

    #[test]
    fn bind_rejects_non_directory() {
        let mut raw = vec![0u8; INODE_SIZE];
        inode::write_descriptor(&mut raw, crate::FILE_TYPE_META, 0, 0, &[]);

        match Directory::bind(&raw) {
            Err(Error::Bind(msg)) => assert!(msg.contains("not a directory")),
            other => panic!("expected Bind error, got {:?}", other),
        }
    }

    #[test]
    fn bind_accepts_directory_record() -> anyhow::Result<()> {
        let mut raw = vec![0u8; INODE_SIZE];
        inode::write_descriptor(&mut raw, FILE_TYPE_DIR, 0x348, 0x10_0000, &[util::blk_fb(5)]);

        let dir = Directory::bind(&raw)?;
        assert_eq!(dir.descriptor().typ, FILE_TYPE_DIR);

        Ok(())
    }
}
