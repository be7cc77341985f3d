use super::{error::Error, fs::Filesystem, inode::Descriptor, util, BITMAP_ENTRY_SIZE};
use std::fmt;

const HDR_SIZE: usize = 0x200;

const OFS_ITEMS_PER_ENTRY: usize = 0x00;
const OFS_ENTRIES_PER_AREA: usize = 0x04;
const OFS_HDR_SIZE: usize = 0x08;
const OFS_DATA_SIZE: usize = 0x0c;
const OFS_AREA_SIZE: usize = 0x10;
const OFS_TOTAL_ITEMS: usize = 0x14;
const OFS_AREA_COUNT: usize = 0x18;

/// Header at the start of every bitmap-backed meta file. Describes how the
/// file is cut into areas of bitmap entries followed by item payloads.
#[derive(Debug, Default, Clone)]
pub struct BitmapHeader {
    pub items_per_bitmap_entry: u32,
    pub bmp_entries_per_area: u32,
    pub hdr_size: u32,
    pub data_size: u32,
    pub area_size: u32,
    pub total_items: u32,
    pub area_count: u32,
}

impl BitmapHeader {
    pub fn read(buf: &[u8]) -> Result<Self, Error> {
        if buf.len() < HDR_SIZE {
            return Err(Error::InvalidFormat(format!(
                "short bitmap header: {} bytes",
                buf.len()
            )));
        }

        Ok(Self {
            items_per_bitmap_entry: util::read_le32(buf, OFS_ITEMS_PER_ENTRY),
            bmp_entries_per_area: util::read_le32(buf, OFS_ENTRIES_PER_AREA),
            hdr_size: util::read_le32(buf, OFS_HDR_SIZE),
            data_size: util::read_le32(buf, OFS_DATA_SIZE),
            area_size: util::read_le32(buf, OFS_AREA_SIZE),
            total_items: util::read_le32(buf, OFS_TOTAL_ITEMS),
            area_count: util::read_le32(buf, OFS_AREA_COUNT),
        })
    }

    fn area_offset(&self, area: u32) -> u64 {
        self.hdr_size as u64 + area as u64 * self.area_size as u64
    }

    /// Offset, within the bitmap file, where the item payloads of `area`
    /// start (past that area's bitmap entries).
    pub fn area_data_offset(&self, area: u32) -> u64 {
        self.area_offset(area) + self.bmp_entries_per_area as u64 * BITMAP_ENTRY_SIZE
    }

    /// Offset, within the bitmap file, of item `item`'s payload.
    pub fn item_offset(&self, item: u32) -> Result<u64, Error> {
        let items_per_area =
            self.bmp_entries_per_area as u64 * self.items_per_bitmap_entry as u64;
        if items_per_area == 0 {
            return Err(Error::InvalidFormat(
                "bitmap header declares no items per area".to_string(),
            ));
        }

        let area = (item as u64 / items_per_area) as u32;
        let slot = item as u64 % items_per_area;
        Ok(self.area_data_offset(area) + slot * self.data_size as u64)
    }
}

impl fmt::Display for BitmapHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  - Items per bitmap entry : {}", self.items_per_bitmap_entry)?;
        writeln!(f, "  - Bitmap entries per area: {}", self.bmp_entries_per_area)?;
        writeln!(f, "  - Header size            : {:#x}", self.hdr_size)?;
        writeln!(f, "  - Data size              : {:#x}", self.data_size)?;
        writeln!(f, "  - Area size              : {:#x}", self.area_size)?;
        writeln!(f, "  - Total items            : {}", self.total_items)?;
        write!(f, "  - Area count             : {}", self.area_count)
    }
}

/// An open bitmap-backed meta file: its header plus the descriptor its byte
/// stream is read through. The free/used tracking inside the bitmap entries
/// is not interpreted here.
#[derive(Debug)]
pub struct Bitmap {
    bmh: BitmapHeader,
    desc: Descriptor,
}

impl Bitmap {
    /// Acquisition by raw geometry: construct from a descriptor record that
    /// was never resolved by name. This is how the FDC is seeded during
    /// bootstrap, before any lookup machinery exists.
    pub fn open_from_descriptor(fs: &Filesystem, raw: &[u8]) -> Result<Self, Error> {
        let desc = Descriptor::read(raw)?;

        let mut buf = [0u8; HDR_SIZE];
        let n = desc.read_at(fs, 0, &mut buf)?;
        if n != HDR_SIZE {
            return Err(Error::InvalidFormat(format!(
                "short bitmap header read: {} of {} bytes",
                n, HDR_SIZE
            )));
        }

        Ok(Self {
            bmh: BitmapHeader::read(&buf)?,
            desc,
        })
    }

    /// Acquisition by name: resolve `name` in the root directory, fetch its
    /// descriptor record through the FDC, and open that. Only usable once the
    /// root directory is bound.
    pub fn open_from_path(fs: &Filesystem, name: &str) -> Result<Self, Error> {
        let root = fs
            .root_dir()
            .ok_or_else(|| Error::InvalidFormat("no root directory bound".to_string()))?;

        let entry = root.lookup(fs, name)?.ok_or_else(|| {
            Error::InvalidFormat(format!("no directory entry named {}", name))
        })?;

        let raw = fs.descriptor_record(entry.block_id)?;
        Self::open_from_descriptor(fs, &raw)
    }

    pub fn header(&self) -> &BitmapHeader {
        &self.bmh
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.desc
    }

    /// Read from the bitmap file's byte stream.
    pub fn read_at(&self, fs: &Filesystem, offset: u64, buf: &mut [u8]) -> Result<usize, Error> {
        self.desc.read_at(fs, offset, buf)
    }
}

/// Encode a bitmap header into an image fixture.
#[cfg(test)]
pub(crate) fn write_bitmap_header(buf: &mut [u8], bmh: &BitmapHeader) {
    util::write_le32(buf, OFS_ITEMS_PER_ENTRY, bmh.items_per_bitmap_entry);
    util::write_le32(buf, OFS_ENTRIES_PER_AREA, bmh.bmp_entries_per_area);
    util::write_le32(buf, OFS_HDR_SIZE, bmh.hdr_size);
    util::write_le32(buf, OFS_DATA_SIZE, bmh.data_size);
    util::write_le32(buf, OFS_AREA_SIZE, bmh.area_size);
    util::write_le32(buf, OFS_TOTAL_ITEMS, bmh.total_items);
    util::write_le32(buf, OFS_AREA_COUNT, bmh.area_count);
}
