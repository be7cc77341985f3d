use super::{BLK_TYPE_FB, BLK_TYPE_FD};

// Every multi-byte on-disk field goes through these, so the decoded value is
// independent of host byte order. Callers bound-check buffers before decoding.

pub fn read_le32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

pub fn read_le64(buf: &[u8], offset: usize) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&buf[offset..offset + 8]);
    u64::from_le_bytes(b)
}

pub fn write_le32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

pub fn write_le64(buf: &mut [u8], offset: usize, value: u64) {
    buf[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

/// Bounded copy of a fixed-width, nul-padded on-disk string field.
pub fn read_fixed_string(buf: &[u8], offset: usize, width: usize) -> String {
    let field = &buf[offset..offset + width];
    let len = field.iter().position(|&b| b == 0).unwrap_or(width);
    String::from_utf8_lossy(&field[..len]).into_owned()
}

// Block ids carry a type tag in the low 6 bits and the item index above it.

pub fn blk_type(blk_id: u32) -> u32 {
    blk_id & 0x3f
}

pub fn blk_item(blk_id: u32) -> u32 {
    blk_id >> 6
}

pub fn blk_fb(item: u32) -> u32 {
    BLK_TYPE_FB | (item << 6)
}

pub fn blk_fd(item: u32) -> u32 {
    BLK_TYPE_FD | (item << 6)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn little_endian_round_trip() {
        let mut buf = [0u8; 16];
        write_le32(&mut buf, 2, 0x2fab_f15e);
        write_le64(&mut buf, 8, 0x0123_4567_89ab_cdef);

        assert_eq!(buf[2], 0x5e);
        assert_eq!(buf[5], 0x2f);
        assert_eq!(read_le32(&buf, 2), 0x2fab_f15e);
        assert_eq!(read_le64(&buf, 8), 0x0123_4567_89ab_cdef);
    }

    #[test]
    fn fixed_string_is_nul_bounded() {
        let mut buf = [0u8; 8];
        buf[..3].copy_from_slice(b"abc");
        assert_eq!(read_fixed_string(&buf, 0, 8), "abc");

        let full = *b"datastore";
        assert_eq!(read_fixed_string(&full, 0, 9), "datastore");
    }

    #[test]
    fn block_id_tagging() {
        let blk = blk_fb(4);
        assert_eq!(blk, 0x101);
        assert_eq!(blk_type(blk), BLK_TYPE_FB);
        assert_eq!(blk_item(blk), 4);

        let blk = blk_fd(3);
        assert_eq!(blk_type(blk), BLK_TYPE_FD);
        assert_eq!(blk_item(blk), 3);
    }
}
