use super::{
    bitmap::Bitmap,
    dir::Directory,
    error::Error,
    inode,
    types::Superblock,
    util,
    volume::Volume,
    BLK_TYPE_FD, FBB_FILENAME, FDC_FILENAME, HB_BASE, HB_NUM, HB_SIZE, INODE_SIZE, PBC_FILENAME,
    SBC_FILENAME,
};
use log::debug;
use std::cmp;

/// First byte usable by the descriptor table: past the heartbeat region and
/// aligned to at least one full block. When the heartbeat region ends below
/// the first block boundary, the block boundary wins.
pub fn bootstrap_base(hb_base: u64, hb_count: u64, hb_slot_size: u64, block_size: u64) -> u64 {
    cmp::max(hb_base + hb_count * hb_slot_size, block_size)
}

/// An open file system: one volume, one superblock, four bitmap-backed meta
/// files and the root directory. Created empty, populated by `open`, torn
/// down by `close`. Not internally synchronized.
pub struct Filesystem {
    vol: Box<dyn Volume>,
    sb: Superblock,
    fbb: Option<Bitmap>,
    fdc: Option<Bitmap>,
    pbc: Option<Bitmap>,
    sbc: Option<Bitmap>,
    root_dir: Option<Directory>,
    debug_level: u8,
}

impl Filesystem {
    pub fn create(vol: Box<dyn Volume>) -> Self {
        let debug_level = vol.debug_level();
        Self {
            vol,
            sb: Superblock::default(),
            fbb: None,
            fdc: None,
            pbc: None,
            sbc: None,
            root_dir: None,
            debug_level,
        }
    }

    /// Open the file system. Strictly sequential: volume open, superblock
    /// read and validation, volume-group UUID cross-check, descriptor
    /// bootstrap, then promotion of the four named meta files. Aborts at the
    /// first failure; the caller closes the instance regardless of outcome.
    pub fn open(&mut self) -> Result<(), Error> {
        self.vol.open().map_err(Error::VolumeOpen)?;

        self.sb = Superblock::read(self.vol.as_ref())?;
        if self.sb.lvm_uuid != self.vol.uuid() {
            return Err(Error::InconsistentVolume);
        }

        if self.debug_level > 0 {
            debug!(
                "superblock: label {:?}, uuid {}, volume version {}, version {}, block size {:#x}",
                self.sb.label,
                self.sb.uuid,
                self.sb.vol_version,
                self.sb.version,
                self.sb.block_size
            );
        }

        self.bootstrap_fdc()?;
        self.open_meta_files()?;

        debug!("file system opened successfully");
        Ok(())
    }

    /// Seed the FDC from superblock constants alone and bind the root
    /// directory out of its descriptor table. The FDC indexes every
    /// descriptor record including its own, so it cannot be located through
    /// name lookup; a synthetic one-block record breaks the cycle.
    fn bootstrap_fdc(&mut self) -> Result<(), Error> {
        let base = bootstrap_base(HB_BASE, HB_NUM, HB_SIZE, self.block_size());
        debug!("FDC base = {:#x}", base);

        let raw = inode::synthetic_descriptor(self.block_size(), base);
        let fdc = Bitmap::open_from_descriptor(self, &raw)
            .map_err(|e| Error::Bootstrap(e.to_string()))?;

        if self.debug_level > 0 {
            debug!("FDC bitmap:\n{}", fdc.header());
        }

        let table_offset = fdc.header().area_data_offset(0);
        let mut buf = vec![0u8; fdc.header().data_size as usize];
        let n = fdc
            .read_at(self, table_offset, &mut buf)
            .map_err(|e| Error::Bootstrap(e.to_string()))?;
        if n != buf.len() {
            return Err(Error::Bootstrap(format!(
                "short descriptor table read: {} of {} bytes",
                n,
                buf.len()
            )));
        }

        // The root directory's record is the first one in the table.
        self.root_dir = Some(Directory::bind(&buf)?);
        self.fdc = Some(fdc);

        Ok(())
    }

    /// Open the four meta files by name now that lookup works. The bootstrap
    /// FDC handle is superseded by the path-resolved one and dropped.
    fn open_meta_files(&mut self) -> Result<(), Error> {
        let fbb = self.open_meta_file(FBB_FILENAME)?;
        let fdc = self.open_meta_file(FDC_FILENAME)?;
        let pbc = self.open_meta_file(PBC_FILENAME)?;
        let sbc = self.open_meta_file(SBC_FILENAME)?;

        self.fbb = Some(fbb);
        self.fdc = Some(fdc);
        self.pbc = Some(pbc);
        self.sbc = Some(sbc);

        Ok(())
    }

    fn open_meta_file(&self, name: &'static str) -> Result<Bitmap, Error> {
        Bitmap::open_from_path(self, name).map_err(|e| Error::AllocatorOpen {
            name,
            source: Box::new(e),
        })
    }

    /// Fetch a raw descriptor record through the FDC, given its tagged block
    /// id from a directory entry.
    pub fn descriptor_record(&self, blk_id: u32) -> Result<Vec<u8>, Error> {
        if util::blk_type(blk_id) != BLK_TYPE_FD {
            return Err(Error::InvalidFormat(format!(
                "block id {:#x} is not a descriptor id",
                blk_id
            )));
        }

        let fdc = self
            .fdc
            .as_ref()
            .ok_or_else(|| Error::InvalidFormat("no descriptor allocator open".to_string()))?;

        let pos = fdc.header().item_offset(util::blk_item(blk_id))?;
        let mut raw = vec![0u8; INODE_SIZE];
        let n = fdc.read_at(self, pos, &mut raw)?;
        if n != INODE_SIZE {
            return Err(Error::InvalidFormat(format!(
                "short descriptor record read: {} of {} bytes",
                n, INODE_SIZE
            )));
        }

        Ok(raw)
    }

    /// Read `buf.len()` bytes starting at `offset` within block `blk`,
    /// translated to an absolute volume read. Short reads are the volume's
    /// to report; nothing is retried or reclassified here.
    pub fn read_block(&self, blk: u32, offset: u64, buf: &mut [u8]) -> Result<usize, Error> {
        let pos = blk as u64 * self.sb.block_size + offset;
        Ok(self.vol.read_at(pos, buf)?)
    }

    /// Release everything in reverse-acquisition order. Safe from any
    /// partially opened state and idempotent.
    pub fn close(&mut self) {
        self.fbb.take();
        self.fdc.take();
        self.pbc.take();
        self.sbc.take();
        self.root_dir.take();
        self.vol.close();
        self.sb = Superblock::default();
    }

    pub fn superblock(&self) -> &Superblock {
        &self.sb
    }

    pub fn block_size(&self) -> u64 {
        self.sb.block_size
    }

    pub fn fbb(&self) -> Option<&Bitmap> {
        self.fbb.as_ref()
    }

    pub fn fdc(&self) -> Option<&Bitmap> {
        self.fdc.as_ref()
    }

    pub fn pbc(&self) -> Option<&Bitmap> {
        self.pbc.as_ref()
    }

    pub fn sbc(&self) -> Option<&Bitmap> {
        self.sbc.as_ref()
    }

    pub fn root_dir(&self) -> Option<&Directory> {
        self.root_dir.as_ref()
    }
}
