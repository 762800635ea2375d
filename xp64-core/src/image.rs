//! CRT container and raw BIN image handling.
//!
//! A CRT file is a 64-byte header followed by CHIP packets. All multi-byte
//! header fields are big-endian. A BIN image is a headerless dump whose
//! expected size depends on the cartridge type.

use std::fmt::{self, Formatter};
use std::io;
use thiserror::Error;

/// First 16 bytes of every CRT container.
const CRT_SIGNATURE: &[u8; 16] = b"C64 CARTRIDGE   ";
/// First 4 bytes of every chip packet.
const CHIP_SIGNATURE: &[u8; 4] = b"CHIP";

/// Minimum CRT header length; headers may be longer, never shorter.
const CRT_HEADER_LEN: usize = 0x40;
/// Fixed length of a chip packet header.
const CHIP_HEADER_LEN: usize = 0x10;

#[derive(Debug, Error)]
pub enum CartridgeError {
    #[error("error reading image: {0}")]
    Io(#[from] io::Error),
    #[error("not a CRT image (bad signature)")]
    BadSignature,
    #[error("CRT image truncated")]
    Truncated,
    #[error("CRT image contains no chip packets")]
    NoChips,
    #[error("CRT hardware type {0} has no handler")]
    UnsupportedHardware(u16),
    #[error("chip packet has unusable load address ${0:04X}")]
    BadLoadAddress(u16),
    #[error("chip packet bank {bank} out of range (cartridge has {banks} banks)")]
    BankOutOfRange { bank: u16, banks: u16 },
    #[error("chip packet size ${0:04X} not valid for this cartridge")]
    BadChipSize(u16),
    #[error("BIN image is {actual} bytes, expected {expected}")]
    BadBinSize { actual: usize, expected: &'static str },
    #[error("cartridge type cannot be attached from this file format")]
    WrongFileFormat,
    #[error(transparent)]
    IoConflict(#[from] crate::io::IoConflict),
}

/// Parsed CRT container header.
#[derive(Debug, Clone)]
pub struct CrtHeader {
    /// Hardware type id, matching the main-slot cartridge type ids.
    pub hardware: u16,
    /// State of the EXROM line at reset (true = asserted/low).
    pub exrom_line: bool,
    /// State of the GAME line at reset (true = asserted/low).
    pub game_line: bool,
    /// Cartridge name, NUL-trimmed.
    pub name: String,
}

/// One CHIP packet: header fields plus the raw ROM bytes that follow.
#[derive(Debug, Clone)]
pub struct ChipPacket {
    /// 0 = ROM, 1 = RAM (no data), 2 = flash.
    pub chip_type: u16,
    /// Bank number, big-endian 16-bit at offset 0x0A. Most cartridges only
    /// decode the low byte; a few use the high byte for their own purposes.
    pub bank: u16,
    /// Intended load address, big-endian 16-bit at offset 0x0C.
    pub load_address: u16,
    pub data: Vec<u8>,
}

impl ChipPacket {
    /// The low byte of the bank field, which is all the bank-switching
    /// hardware ever sees.
    pub fn bank_low(&self) -> u8 {
        (self.bank & 0xFF) as u8
    }

    /// High byte of the load address (0x80, 0xA0, 0xE0 for the three ROM
    /// windows).
    pub fn load_hi(&self) -> u8 {
        (self.load_address >> 8) as u8
    }
}

/// A fully parsed CRT container.
pub struct CrtImage {
    pub header: CrtHeader,
    pub chips: Vec<ChipPacket>,
}

impl fmt::Debug for CrtImage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrtImage")
            .field("header", &self.header)
            .field("chips", &self.chips.len())
            .finish()
    }
}

fn be16(data: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([data[offset], data[offset + 1]])
}

fn be32(data: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

/// Whether the buffer starts with the CRT container signature.
pub fn is_crt(data: &[u8]) -> bool {
    data.len() >= CRT_SIGNATURE.len() && &data[..CRT_SIGNATURE.len()] == CRT_SIGNATURE
}

impl CrtImage {
    /// Parse a whole CRT container. The image is validated up front; a
    /// parse error never leaves partially usable state behind.
    pub fn parse(data: &[u8]) -> Result<Self, CartridgeError> {
        if data.len() < CRT_HEADER_LEN {
            return Err(CartridgeError::Truncated);
        }
        if !is_crt(data) {
            return Err(CartridgeError::BadSignature);
        }

        let header_len = be32(data, 0x10) as usize;
        if header_len < CRT_HEADER_LEN || header_len > data.len() {
            return Err(CartridgeError::Truncated);
        }

        let hardware = be16(data, 0x16);
        // Header stores the line levels inverted: 0 means asserted (low).
        let exrom_line = data[0x18] == 0;
        let game_line = data[0x19] == 0;

        let name = data[0x20..CRT_HEADER_LEN]
            .iter()
            .take_while(|&&b| b != 0)
            .map(|&b| char::from(b))
            .collect::<String>();

        let mut chips = Vec::new();
        let mut offset = header_len;
        while offset + CHIP_HEADER_LEN <= data.len() {
            if &data[offset..offset + 4] != CHIP_SIGNATURE {
                break;
            }

            let packet_len = be32(data, offset + 0x04) as usize;
            let chip_type = be16(data, offset + 0x08);
            let bank = be16(data, offset + 0x0A);
            let load_address = be16(data, offset + 0x0C);
            let rom_size = be16(data, offset + 0x0E) as usize;

            let rom_start = offset + CHIP_HEADER_LEN;
            let rom_end = rom_start + rom_size;
            if rom_end > data.len() {
                return Err(CartridgeError::Truncated);
            }

            chips.push(ChipPacket {
                chip_type,
                bank,
                load_address,
                data: data[rom_start..rom_end].to_vec(),
            });

            // Some tools write packet_len without the header; trust the
            // chip size when the declared packet length is inconsistent.
            if packet_len >= CHIP_HEADER_LEN + rom_size {
                offset += packet_len;
            } else {
                offset = rom_end;
            }
        }

        if chips.is_empty() {
            return Err(CartridgeError::NoChips);
        }

        log::debug!(
            "parsed CRT '{}': hardware {hardware}, {} chip packet(s)",
            name,
            chips.len()
        );

        Ok(Self {
            header: CrtHeader {
                hardware,
                exrom_line,
                game_line,
                name,
            },
            chips,
        })
    }
}

/// Check a BIN image against the size the cartridge type expects.
pub(crate) fn expect_bin_size(
    data: &[u8],
    expected: usize,
    label: &'static str,
) -> Result<(), CartridgeError> {
    if data.len() == expected {
        Ok(())
    } else {
        Err(CartridgeError::BadBinSize {
            actual: data.len(),
            expected: label,
        })
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    //! Builders for synthetic images used across the test suites.

    /// Build a CRT container from (bank, load_address, data) chip tuples.
    pub(crate) fn build_crt(hardware: u16, exrom: u8, game: u8, chips: &[(u16, u16, &[u8])]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"C64 CARTRIDGE   ");
        out.extend_from_slice(&0x40u32.to_be_bytes());
        out.extend_from_slice(&[0x01, 0x00]); // version
        out.extend_from_slice(&hardware.to_be_bytes());
        out.push(exrom);
        out.push(game);
        out.extend_from_slice(&[0; 6]); // reserved
        let mut name = [0u8; 0x20];
        name[..4].copy_from_slice(b"TEST");
        out.extend_from_slice(&name);

        for &(bank, load, data) in chips {
            out.extend_from_slice(b"CHIP");
            out.extend_from_slice(&((0x10 + data.len()) as u32).to_be_bytes());
            out.extend_from_slice(&0u16.to_be_bytes()); // ROM chip
            out.extend_from_slice(&bank.to_be_bytes());
            out.extend_from_slice(&load.to_be_bytes());
            out.extend_from_slice(&(data.len() as u16).to_be_bytes());
            out.extend_from_slice(data);
        }

        out
    }

    /// An 8K bank whose every byte is the given sentinel.
    pub(crate) fn bank_filled(sentinel: u8) -> Vec<u8> {
        vec![sentinel; 0x2000]
    }
}

#[cfg(test)]
mod tests {
    use super::testutil::build_crt;
    use super::*;

    #[test]
    fn parses_header_and_chips() {
        let bank0 = vec![0xA0; 0x2000];
        let bank1 = vec![0xA1; 0x2000];
        let crt = build_crt(17, 0, 1, &[(0, 0x8000, &bank0), (1, 0x8000, &bank1)]);

        let image = CrtImage::parse(&crt).unwrap();
        assert_eq!(17, image.header.hardware);
        assert!(image.header.exrom_line);
        assert!(!image.header.game_line);
        assert_eq!("TEST", image.header.name);
        assert_eq!(2, image.chips.len());
        assert_eq!(1, image.chips[1].bank_low());
        assert_eq!(0x80, image.chips[1].load_hi());
        assert_eq!(bank1, image.chips[1].data);
    }

    #[test]
    fn rejects_bad_signature() {
        let mut crt = build_crt(0, 0, 1, &[(0, 0x8000, &[0u8; 0x2000])]);
        crt[0] = b'X';
        assert!(matches!(
            CrtImage::parse(&crt),
            Err(CartridgeError::BadSignature)
        ));
    }

    #[test]
    fn rejects_truncated_chip_data() {
        let mut crt = build_crt(0, 0, 1, &[(0, 0x8000, &[0u8; 0x2000])]);
        crt.truncate(crt.len() - 1);
        assert!(matches!(
            CrtImage::parse(&crt),
            Err(CartridgeError::Truncated)
        ));
    }

    #[test]
    fn rejects_empty_container() {
        let crt = build_crt(0, 0, 1, &[]);
        assert!(matches!(CrtImage::parse(&crt), Err(CartridgeError::NoChips)));
    }
}
