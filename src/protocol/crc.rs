//! 32-bit frame checksum.
//!
//! CRC-32, MSB-first, **no** input/output reflection (the CRC-32/BZIP2
//! parameter set):
//!
//! | Parameter | Value        |
//! |-----------|--------------|
//! | poly      | `0x04C11DB7` |
//! | init      | `0xFFFFFFFF` |
//! | refin     | false        |
//! | refout    | false        |
//! | xorout    | `0xFFFFFFFF` |
//!
//! This is not the reflected CRC-32 used by zlib/Ethernet; the gateway
//! computes exactly this variant, so it must match bit for bit.

use crc::{CRC_32_BZIP2, Crc};

pub const POLY: u32 = CRC_32_BZIP2.poly;
pub const INIT: u32 = CRC_32_BZIP2.init;
pub const XOR_OUT: u32 = CRC_32_BZIP2.xorout;

const FRAME_CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_BZIP2);

/// Compute the checksum over `data`.
pub fn checksum(data: &[u8]) -> u32 {
    FRAME_CRC.checksum(data)
}

/// Recompute the checksum over `data` and compare with `expected`.
pub fn verify(data: &[u8], expected: u32) -> bool {
    checksum(data) == expected
}
