//! Atomic Power / Nordic Power.
//!
//! Hardware is an Action Replay 5 with one twist: a specific control-byte
//! pattern maps cartridge RAM at $A000 instead of $8000.
//!
//! IO1 write decode (bit 7 unused):
//!   bit 6 releases freeze, bit 5 maps RAM at ROML + IO2, bits 4-3 select
//!   the ROM bank, bit 2 disables the cartridge, bits 1-0 drive the
//!   mapping mode. If `value & 0xE7 == 0x22` the cart instead enters 16K
//!   game config with RAM at $A000-$BFFF and in the IO2 window.

use serde::{Deserialize, Serialize};

use crate::address::BANK_OFFSET_MASK;
use crate::cart::{MainSlotCart, StagedCart};
use crate::image::{expect_bin_size, CartridgeError, CrtImage};
use crate::machine::Machine;
use crate::port::{
    BusState, CFLAG_EXPORT_RAM, CFLAG_PHI2_RAM, CFLAG_READ, CFLAG_RELEASE_FREEZE, CFLAG_WRITE,
    CMODE_BANK_SHIFT,
};

const ROM_SIZE: usize = 0x8000;
const BANKS: u16 = 4;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub(crate) struct AtomicPower {
    active: bool,
    ram_at_a000: bool,
}

impl AtomicPower {
    pub(crate) fn new() -> Self {
        Self {
            active: true,
            ram_at_a000: false,
        }
    }

    #[cfg(test)]
    pub(crate) fn ram_at_a000(&self) -> bool {
        self.ram_at_a000
    }

    pub(crate) fn io1_store(&mut self, bus: &mut BusState, machine: &mut dyn Machine, value: u8) {
        if !self.active {
            return;
        }

        let bank = (value >> 3) & 3;
        let mut mode = value & 3;
        let mut flags = CFLAG_WRITE;

        if value & 0xE7 == 0x22 {
            // Nordic Power special: 16K game with RAM at $A000.
            mode = 1;
            self.ram_at_a000 = true;
        } else {
            // Action Replay 5 compatible decode.
            self.ram_at_a000 = false;
            if value & 0x40 != 0 {
                flags |= CFLAG_RELEASE_FREEZE;
            }
            if value & 0x20 != 0 {
                flags |= CFLAG_EXPORT_RAM;
            }
        }
        if value & 0x04 != 0 {
            self.active = false;
        }

        log::trace!("Atomic Power control write {value:02X}: mode {mode} bank {bank}");
        bus.config_changed(
            machine,
            2,
            mode | (bank << CMODE_BANK_SHIFT),
            flags | CFLAG_PHI2_RAM,
        );
    }

    pub(crate) fn io2_read(&self, bus: &BusState, addr: u16) -> Option<u8> {
        if !self.active {
            return None;
        }

        if bus.export_ram || self.ram_at_a000 {
            return Some(bus.export_ram0[0x1F00 + (addr & 0xFF) as usize]);
        }

        if bus.roml_bank < BANKS as usize {
            Some(bus.roml_byte(0xDF00 | (addr & 0xFF)))
        } else {
            None
        }
    }

    pub(crate) fn io2_store(&self, bus: &mut BusState, addr: u16, value: u8) {
        if self.active && (bus.export_ram || self.ram_at_a000) {
            bus.export_ram0[0x1F00 + (addr & 0xFF) as usize] = value;
        }
    }

    pub(crate) fn roml_read(&self, bus: &BusState, addr: u16) -> u8 {
        if bus.export_ram {
            bus.export_ram0[(addr & BANK_OFFSET_MASK) as usize]
        } else {
            bus.roml_byte(addr)
        }
    }

    pub(crate) fn roml_store(&self, bus: &mut BusState, addr: u16, value: u8) {
        if bus.export_ram {
            bus.export_ram0[(addr & BANK_OFFSET_MASK) as usize] = value;
        }
    }

    pub(crate) fn romh_read(&self, bus: &BusState, addr: u16) -> u8 {
        if self.ram_at_a000 {
            bus.export_ram0[(addr & BANK_OFFSET_MASK) as usize]
        } else {
            bus.romh_byte(addr)
        }
    }

    pub(crate) fn romh_store(&self, bus: &mut BusState, addr: u16, value: u8) {
        if self.ram_at_a000 {
            bus.export_ram0[(addr & BANK_OFFSET_MASK) as usize] = value;
        }
    }

    pub(crate) fn freeze(&mut self, bus: &mut BusState, machine: &mut dyn Machine) {
        self.active = true;
        bus.config_changed(machine, 3, 3, CFLAG_READ | CFLAG_EXPORT_RAM);
    }

    pub(crate) fn reset(&mut self) {
        self.active = true;
    }

    pub(crate) fn config_init(&mut self, bus: &mut BusState, machine: &mut dyn Machine) {
        self.active = true;
        self.ram_at_a000 = false;
        bus.config_changed(machine, 0, 0, CFLAG_READ);
    }
}

fn staged(rom: Vec<u8>) -> StagedCart {
    let mut staged = StagedCart::new(MainSlotCart::AtomicPower(AtomicPower::new()));
    staged.romh = rom.clone();
    staged.roml = rom;
    staged
}

pub(crate) fn bin_attach(data: &[u8]) -> Result<StagedCart, CartridgeError> {
    expect_bin_size(data, ROM_SIZE, "32768")?;
    Ok(staged(data.to_vec()))
}

pub(crate) fn crt_attach(image: &CrtImage) -> Result<StagedCart, CartridgeError> {
    let mut rom = vec![0u8; ROM_SIZE];
    if image.chips.len() != BANKS as usize {
        return Err(CartridgeError::NoChips);
    }
    for chip in &image.chips {
        if chip.bank_low() as u16 >= BANKS {
            return Err(CartridgeError::BankOutOfRange {
                bank: chip.bank,
                banks: BANKS,
            });
        }
        if chip.data.len() != 0x2000 {
            return Err(CartridgeError::BadChipSize(chip.data.len() as u16));
        }
        let offset = (chip.bank_low() as usize) << 13;
        rom[offset..offset + 0x2000].copy_from_slice(&chip.data);
    }
    Ok(staged(rom))
}
