use crc::{Crc, CRC_16_ARC};

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_ARC);

/// CRC-16/ARC of an information field, used for duplicate detection.
pub fn info_crc(info: &[u8]) -> u16 {
    CRC16.checksum(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_value() {
        assert_eq!(info_crc(b"123456789"), 0xBB3D);
    }

    #[test]
    fn empty_info() {
        assert_eq!(info_crc(b""), 0);
    }

    #[test]
    fn differs_on_single_byte() {
        assert_ne!(info_crc(b"!4903.50N/07201.75W-"), info_crc(b"!4903.50N/07201.76W-"));
    }
}
