//! Plain 8K / 16K / Ultimax cartridges with no banking hardware.
//!
//! Everything here is driven purely by image size and the GAME/EXROM lines
//! from the container header; there are no registers to decode.

use serde::{Deserialize, Serialize};

use crate::cart::StagedCart;
use crate::image::{CartridgeError, CrtImage};
use crate::machine::Machine;
use crate::port::{BusState, CFLAG_READ, CMODE_16K_GAME, CMODE_8K_GAME, CMODE_ULTIMAX};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum GenericKind {
    Rom8k,
    Rom16k,
    Ultimax,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub(crate) struct GenericCart {
    pub(crate) kind: GenericKind,
}

impl GenericCart {
    pub(crate) fn mode(self) -> u8 {
        match self.kind {
            GenericKind::Rom8k => CMODE_8K_GAME,
            GenericKind::Rom16k => CMODE_16K_GAME,
            GenericKind::Ultimax => CMODE_ULTIMAX,
        }
    }

    pub(crate) fn config_init(self, bus: &mut BusState, machine: &mut dyn Machine) {
        let mode = self.mode();
        bus.config_changed(machine, mode, mode, CFLAG_READ);
    }
}

/// Default ROML read used by every cartridge without its own handler.
pub(crate) fn roml_read(bus: &BusState, addr: u16) -> u8 {
    bus.roml_byte(addr)
}

/// Default ROMH read (both the $A000 and the ultimax $E000 window).
pub(crate) fn romh_read(bus: &BusState, addr: u16) -> u8 {
    bus.romh_byte(addr)
}

pub(crate) fn bin_attach(kind: GenericKind, data: &[u8]) -> Result<StagedCart, CartridgeError> {
    let cart = GenericCart { kind };
    let mut staged = StagedCart::new(crate::cart::MainSlotCart::Generic(cart));
    staged.setup_mode = (cart.mode(), cart.mode());

    match (kind, data.len()) {
        (GenericKind::Rom8k, 0x2000) => {
            staged.roml = data.to_vec();
        }
        (GenericKind::Rom16k, 0x4000) => {
            staged.roml = data[..0x2000].to_vec();
            staged.romh = data[0x2000..].to_vec();
        }
        // An ultimax image is either a lone 8K ROMH or ROML plus ROMH.
        (GenericKind::Ultimax, 0x2000) => {
            staged.romh = data.to_vec();
        }
        (GenericKind::Ultimax, 0x4000) => {
            staged.roml = data[..0x2000].to_vec();
            staged.romh = data[0x2000..].to_vec();
        }
        (GenericKind::Rom8k | GenericKind::Ultimax, _) => {
            return Err(CartridgeError::BadBinSize {
                actual: data.len(),
                expected: "8192 (or 16384 for ultimax)",
            });
        }
        (GenericKind::Rom16k, _) => {
            return Err(CartridgeError::BadBinSize {
                actual: data.len(),
                expected: "16384",
            });
        }
    }

    Ok(staged)
}

pub(crate) fn crt_attach(image: &CrtImage) -> Result<StagedCart, CartridgeError> {
    // The header lines pick the configuration; chip load addresses place
    // the data.
    let kind = match (image.header.exrom_line, image.header.game_line) {
        (true, false) => GenericKind::Rom8k,
        (true, true) => GenericKind::Rom16k,
        (false, true) => GenericKind::Ultimax,
        (false, false) => return Err(CartridgeError::UnsupportedHardware(0)),
    };

    let cart = GenericCart { kind };
    let mut staged = StagedCart::new(crate::cart::MainSlotCart::Generic(cart));
    staged.setup_mode = (cart.mode(), cart.mode());
    staged.roml = vec![0xFF; 0x2000];
    staged.romh = vec![0xFF; 0x2000];
    for chip in &image.chips {
        if chip.data.len() > 0x4000 {
            return Err(CartridgeError::BadChipSize(chip.data.len() as u16));
        }
        match chip.load_hi() {
            0x80 => {
                let len = chip.data.len().min(0x2000);
                staged.roml[..len].copy_from_slice(&chip.data[..len]);
                // A single 16K chip at $8000 carries ROMH in its upper half.
                if chip.data.len() > 0x2000 {
                    staged.romh[..chip.data.len() - 0x2000].copy_from_slice(&chip.data[0x2000..]);
                }
            }
            0xA0 | 0xE0 => {
                let len = chip.data.len().min(0x2000);
                staged.romh[..len].copy_from_slice(&chip.data[..len]);
            }
            _ => return Err(CartridgeError::BadLoadAddress(chip.load_address)),
        }
    }

    Ok(staged)
}
