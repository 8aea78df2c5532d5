//! Big-endian 16-bit reads with a running byte-sum checksum.

use log::{trace, warn};

use crate::source::ByteSource;

/// Sum of every byte read so far, wrapping at 16 bits.
///
/// Accumulated as bytes come off the source rather than over a buffered copy,
/// so it works the same on a live stream.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Checksum(u16);

impl Checksum {
    pub fn new() -> Self {
        Checksum(0)
    }

    pub fn add(&mut self, byte: u8) {
        self.0 = self.0.wrapping_add(u16::from(byte));
    }

    pub fn value(&self) -> u16 {
        self.0
    }
}

/// Reads one big-endian `u16` (high byte first). When `checksum` is given,
/// both raw bytes are folded into it.
///
/// The caller is expected to have checked `available()`; a missing byte is
/// logged and read as zero, which the checksum will then catch.
pub fn read_u16<S: ByteSource + ?Sized>(source: &mut S, checksum: Option<&mut Checksum>) -> u16 {
    let high = next_byte(source);
    let low = next_byte(source);
    let value = u16::from_be_bytes([high, low]);

    if let Some(sum) = checksum {
        sum.add(high);
        sum.add(low);
    }

    trace!("high=0x{:02x} low=0x{:02x} result=0x{:04x}", high, low, value);
    value
}

fn next_byte<S: ByteSource + ?Sized>(source: &mut S) -> u8 {
    source.read().unwrap_or_else(|| {
        warn!("byte source ran dry mid-frame");
        0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::BufferedSource;

    #[test]
    fn big_endian() {
        let mut src = BufferedSource::new();
        src.push(&[0x42, 0x4D, 0x00, 0x1C]);
        assert_eq!(read_u16(&mut src, None), 0x424D);
        assert_eq!(read_u16(&mut src, None), 0x001C);
        assert_eq!(src.available(), 0);
    }

    #[test]
    fn sums_bytes_not_words() {
        let mut src = BufferedSource::new();
        src.push(&[0xFF, 0xFF, 0x01, 0x02]);
        let mut sum = Checksum::new();
        read_u16(&mut src, Some(&mut sum));
        read_u16(&mut src, Some(&mut sum));
        assert_eq!(sum.value(), 0xFF + 0xFF + 0x01 + 0x02);
    }

    #[test]
    fn skipping_the_accumulator() {
        let mut src = BufferedSource::new();
        src.push(&[0x12, 0x34]);
        let mut sum = Checksum::new();
        sum.add(7);
        assert_eq!(read_u16(&mut src, None), 0x1234);
        assert_eq!(sum.value(), 7);
    }

    #[test]
    fn checksum_wraps() {
        let mut sum = Checksum::new();
        for _ in 0..300 {
            sum.add(0xFF);
        }
        assert_eq!(sum.value(), (300u32 * 0xFF % 0x1_0000) as u16);
    }

    #[test]
    fn dry_source_reads_zero() {
        let mut src = BufferedSource::new();
        src.push(&[0xAB]);
        assert_eq!(read_u16(&mut src, None), 0xAB00);
    }
}
