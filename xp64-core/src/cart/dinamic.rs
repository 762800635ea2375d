//! Dinamic Software game cartridges (Narco Police, Satan...).
//!
//! Sixteen 8K banks at $8000 in 8K game config. Banks switch on *reads*
//! of IO1: reading $DExx selects bank xx, but only when the low address
//! byte is itself a valid bank number (so $DE05 switches to bank 5 while
//! $DE15 does nothing).

use serde::{Deserialize, Serialize};

use crate::cart::{MainSlotCart, StagedCart};
use crate::image::{expect_bin_size, CartridgeError, CrtImage};
use crate::machine::Machine;
use crate::port::{BusState, CFLAG_READ};

const BANKS: u16 = 16;
const ROM_SIZE: usize = 0x2000 * BANKS as usize;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub(crate) struct Dinamic {
    bank: u8,
}

impl Dinamic {
    pub(crate) fn io1_read(&mut self, bus: &mut BusState, addr: u16) -> Option<u8> {
        let low = addr & 0xFF;
        if low & 0x0F == low {
            log::trace!("Dinamic: bank {low} selected");
            bus.set_roml_bank(low as usize);
            bus.set_romh_bank(low as usize);
            self.bank = low as u8;
        }
        None
    }

    pub(crate) fn io1_peek(&self) -> Option<u8> {
        Some(self.bank)
    }

    pub(crate) fn config_init(&self, bus: &mut BusState, machine: &mut dyn Machine) {
        bus.config_changed(machine, 0, 0, CFLAG_READ);
    }
}

fn staged(rom: Vec<u8>) -> StagedCart {
    let mut staged = StagedCart::new(MainSlotCart::Dinamic(Dinamic::default()));
    staged.roml = rom;
    staged
}

pub(crate) fn bin_attach(data: &[u8]) -> Result<StagedCart, CartridgeError> {
    expect_bin_size(data, ROM_SIZE, "131072")?;
    Ok(staged(data.to_vec()))
}

pub(crate) fn crt_attach(image: &CrtImage) -> Result<StagedCart, CartridgeError> {
    let mut rom = vec![0u8; ROM_SIZE];
    for chip in &image.chips {
        if chip.bank >= BANKS || chip.load_hi() != 0x80 {
            return Err(CartridgeError::BankOutOfRange {
                bank: chip.bank,
                banks: BANKS,
            });
        }
        if chip.data.len() != 0x2000 {
            return Err(CartridgeError::BadChipSize(chip.data.len() as u16));
        }
        let offset = (chip.bank as usize) << 13;
        rom[offset..offset + 0x2000].copy_from_slice(&chip.data);
    }
    Ok(staged(rom))
}
