//! X.25 (CRC-16/MCRF4XX) checksum used by MAVLink frames.

/// Seed value for every frame checksum.
pub const X25_INIT: u16 = 0xFFFF;

/// Fold one byte into a running checksum.
#[inline]
pub fn accumulate(byte: u8, crc: u16) -> u16 {
    let mut tmp = byte ^ (crc & 0xFF) as u8;
    tmp ^= tmp << 4;
    let tmp = tmp as u16;
    (crc >> 8) ^ (tmp << 8) ^ (tmp << 3) ^ (tmp >> 4)
}

/// Checksum of `bytes` starting from [`X25_INIT`].
pub fn calculate(bytes: &[u8]) -> u16 {
    bytes.iter().fold(X25_INIT, |crc, &b| accumulate(b, crc))
}

/// Frame checksum: header and payload bytes followed by the message's crc-extra seed.
pub fn frame_checksum(header_and_payload: &[u8], crc_extra: u8) -> u16 {
    accumulate(crc_extra, calculate(header_and_payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_mcrf4xx_check_value() {
        assert_eq!(calculate(b"123456789"), 0x6F91);
    }

    #[test]
    fn empty_input_is_seed() {
        assert_eq!(calculate(&[]), X25_INIT);
    }

    #[test]
    fn crc_extra_changes_result() {
        let data = [9u8, 0, 0, 0, 1, 1, 0, 0, 0];
        assert_ne!(frame_checksum(&data, 50), frame_checksum(&data, 51));
        assert_eq!(frame_checksum(&data, 50), accumulate(50, calculate(&data)));
    }
}
