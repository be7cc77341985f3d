use super::util;
use memmap::Mmap;
use std::{
    fs::OpenOptions,
    io,
    path::{Path, PathBuf},
};
use uuid::Uuid;

const VOLINFO_BASE: u64 = 0x0010_0000;
const VOLINFO_SIZE: usize = 512;
const VOLINFO_MAGIC: u32 = 0xc001_d00d;
const VOLINFO_OFS_MAGIC: usize = 0x00;
const VOLINFO_OFS_UUID: usize = 0x82;

/// Logical byte-addressable storage backing a file system. Implementations
/// already aggregate whatever physical spanning exists underneath; callers
/// only see one flat offset space.
pub trait Volume {
    /// Open the underlying storage. Called once, before any read.
    fn open(&mut self) -> io::Result<()>;

    /// Read at an absolute byte offset. Returns the number of bytes read,
    /// which may be short near the end of the volume.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;

    /// UUID the volume reports for itself, for cross-checking against the
    /// superblock's recorded owner.
    fn uuid(&self) -> Uuid;

    /// Verbosity copied into the file system at construction.
    fn debug_level(&self) -> u8 {
        0
    }

    /// Release the underlying storage. Must tolerate repeated calls.
    fn close(&mut self);
}

/// A volume backed by a flat image file, mapped read-only.
#[derive(Debug)]
pub struct ImageVolume {
    path: PathBuf,
    mmap: Option<Mmap>,
    uuid: Uuid,
    debug_level: u8,
}

impl ImageVolume {
    pub fn new<P: AsRef<Path>>(path: P, debug_level: u8) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            mmap: None,
            uuid: Uuid::nil(),
            debug_level,
        }
    }

    fn map(&self) -> io::Result<&Mmap> {
        self.mmap
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "volume is not open"))
    }
}

impl Volume for ImageVolume {
    fn open(&mut self) -> io::Result<()> {
        let file = OpenOptions::new().read(true).open(&self.path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        let end = VOLINFO_BASE as usize + VOLINFO_SIZE;
        if mmap.len() < end {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "image too small to hold a volume header",
            ));
        }

        let hdr = &mmap[VOLINFO_BASE as usize..end];
        if util::read_le32(hdr, VOLINFO_OFS_MAGIC) != VOLINFO_MAGIC {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "image has no volume header magic",
            ));
        }

        self.uuid = Uuid::from_slice(&hdr[VOLINFO_OFS_UUID..VOLINFO_OFS_UUID + 16])
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.mmap = Some(mmap);

        Ok(())
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let mmap = self.map()?;
        let len = mmap.len() as u64;
        if offset >= len {
            return Ok(0);
        }

        let avail = (len - offset) as usize;
        let n = buf.len().min(avail);
        let start = offset as usize;
        buf[..n].copy_from_slice(&mmap[start..start + n]);

        Ok(n)
    }

    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn debug_level(&self) -> u8 {
        self.debug_level
    }

    fn close(&mut self) {
        self.mmap = None;
    }
}

/// Write a volume header into an image fixture, claiming `uuid` for it.
#[cfg(test)]
pub(crate) fn write_volume_header(image: &mut [u8], uuid: Uuid) {
    let base = VOLINFO_BASE as usize;
    util::write_le32(image, base + VOLINFO_OFS_MAGIC, VOLINFO_MAGIC);
    image[base + VOLINFO_OFS_UUID..base + VOLINFO_OFS_UUID + 16].copy_from_slice(uuid.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn make_image(name: &str, uuid: Uuid) -> anyhow::Result<PathBuf> {
        let mut path = std::env::temp_dir();
        path.push(name);
        path.set_extension("img");
        if path.exists() {
            std::fs::remove_file(&path)?;
        }

        let mut image = vec![0u8; VOLINFO_BASE as usize + 0x1000];
        write_volume_header(&mut image, uuid);

        let mut file = std::fs::File::create(&path)?;
        file.write_all(&image)?;

        Ok(path)
    }

    #[test]
    fn open_reads_volume_uuid() -> anyhow::Result<()> {
        let uuid = Uuid::from_u128(0xdead_beef_0000_0000_0000_0000_0000_0001);
        let path = make_image("volume_uuid", uuid)?;

        let mut vol = ImageVolume::new(&path, 0);
        assert_eq!(vol.uuid(), Uuid::nil());
        vol.open()?;
        assert_eq!(vol.uuid(), uuid);

        vol.close();
        vol.close();

        Ok(std::fs::remove_file(&path)?)
    }

    #[test]
    fn read_clamps_at_end_of_image() -> anyhow::Result<()> {
        let path = make_image("volume_clamp", Uuid::nil())?;

        let mut vol = ImageVolume::new(&path, 0);
        vol.open()?;

        let len = std::fs::metadata(&path)?.len();
        let mut buf = [0u8; 64];
        assert_eq!(vol.read_at(len - 16, &mut buf)?, 16);
        assert_eq!(vol.read_at(len + 1, &mut buf)?, 0);

        Ok(std::fs::remove_file(&path)?)
    }

    #[test]
    fn read_before_open_is_an_error() {
        let vol = ImageVolume::new("/nonexistent.img", 0);
        let mut buf = [0u8; 8];
        assert!(vol.read_at(0, &mut buf).is_err());
    }
}
