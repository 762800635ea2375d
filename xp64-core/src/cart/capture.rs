//! Jason Ranheim "Capture" cartridge.
//!
//! 8K ROM at $E000 and 8K RAM at $6000, both only visible in ultimax
//! config. Two flip-flops (cart enable, register enable) and a 13-input
//! address decoder implement the whole control scheme:
//!
//! - the cartridge is disabled after reset;
//! - pressing freeze raises an NMI; as soon as the CPU fetches from page
//!   $FE00 the cart switches to ultimax and the register logic arms;
//! - from then on any access to $FFF7 disables the cart, $FFF8 enables it,
//!   and $FFF9 disables it only while neither the freeze is pending nor
//!   ROMH is enabled (that last alias is what lets the freezer survive the
//!   kernal's RAM-clear loop).

use serde::{Deserialize, Serialize};

use crate::address::BANK_OFFSET_MASK;
use crate::cart::{MainSlotCart, StagedCart};
use crate::image::{expect_bin_size, CartridgeError, CrtImage};
use crate::machine::Machine;
use crate::port::{BusState, CFLAG_READ, CFLAG_RELEASE_FREEZE};

const ROM_SIZE: usize = 0x2000;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub(crate) struct Capture {
    cart_enabled: bool,
    freeze_pressed: bool,
    register_enabled: bool,
    romh_enabled: bool,
}

impl Capture {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> (bool, bool, bool, bool) {
        (
            self.cart_enabled,
            self.freeze_pressed,
            self.register_enabled,
            self.romh_enabled,
        )
    }

    /// The $FFF7/$FFF8/$FFF9 register aliasing. Runs on every ROMH-window
    /// access, reads and writes alike.
    fn reg(&mut self, addr: u16) {
        if !self.register_enabled {
            return;
        }
        match addr {
            0xFFF7 => {
                self.cart_enabled = false;
                log::trace!("Capture: cart disabled via $FFF7");
            }
            0xFFF8 => {
                self.cart_enabled = true;
                log::trace!("Capture: cart enabled via $FFF8");
            }
            0xFFF9 => {
                // Survives the RAM-clear loop: only disable once the
                // freezer is past its entry sequence.
                if !self.freeze_pressed && !self.romh_enabled {
                    self.cart_enabled = false;
                    log::trace!("Capture: cart disabled via $FFF9");
                }
            }
            _ => {}
        }
    }

    /// After freeze, the first fetch in page $FE00 flips the ROM in.
    fn romh_flip(&mut self, addr: u16) {
        if self.freeze_pressed && addr & 0xFF00 == 0xFE00 {
            self.freeze_pressed = false;
            self.romh_enabled = true;
            log::trace!("Capture: ROMH enabled by $FE00 fetch");
        }
    }

    pub(crate) fn romh_read(
        &mut self,
        bus: &BusState,
        machine: &mut dyn Machine,
        addr: u16,
    ) -> u8 {
        self.reg(addr);
        self.romh_flip(addr);

        if self.cart_enabled && self.romh_enabled {
            return bus.romh_banks[(addr & BANK_OFFSET_MASK) as usize];
        }
        machine.mem_read_without_ultimax(addr)
    }

    pub(crate) fn romh_store(&mut self, machine: &mut dyn Machine, addr: u16, value: u8) {
        self.reg(addr);
        if !self.cart_enabled {
            machine.mem_store_without_ultimax(addr, value);
        }
    }

    pub(crate) fn romh_peek(&self, bus: &BusState, machine: &mut dyn Machine, addr: u16) -> u8 {
        if self.cart_enabled && self.romh_enabled {
            bus.romh_banks[(addr & BANK_OFFSET_MASK) as usize]
        } else {
            machine.ram_read(addr)
        }
    }

    /// Cartridge RAM sits at $6000-$7FFF; the rest of the low window falls
    /// through to the faked normal mapping.
    pub(crate) fn low_read(&self, bus: &BusState, machine: &mut dyn Machine, addr: u16) -> u8 {
        if self.cart_enabled && addr >= 0x6000 {
            return bus.export_ram0[(addr - 0x6000) as usize];
        }
        machine.mem_read_without_ultimax(addr)
    }

    pub(crate) fn low_store(
        &self,
        bus: &mut BusState,
        machine: &mut dyn Machine,
        addr: u16,
        value: u8,
    ) {
        if self.cart_enabled {
            if addr >= 0x6000 {
                bus.export_ram0[(addr - 0x6000) as usize] = value;
            }
        } else {
            machine.mem_store_without_ultimax(addr, value);
        }
    }

    pub(crate) fn freeze(&mut self, bus: &mut BusState, machine: &mut dyn Machine) {
        log::debug!("Capture: freeze");
        if !self.freeze_pressed {
            bus.config_changed(machine, 2, 3, CFLAG_READ | CFLAG_RELEASE_FREEZE);
            self.cart_enabled = true;
            self.freeze_pressed = true;
            self.register_enabled = true;
            self.romh_enabled = false;
        }
    }

    pub(crate) fn reset(&mut self, bus: &mut BusState, machine: &mut dyn Machine) {
        self.cart_enabled = false;
        self.register_enabled = false;
        self.freeze_pressed = false;
        bus.config_changed(machine, 2, 2, CFLAG_READ);
    }

    pub(crate) fn config_init(&mut self, bus: &mut BusState, machine: &mut dyn Machine) {
        bus.config_changed(machine, 2, 2, CFLAG_READ);
    }
}

fn staged(rom: Vec<u8>) -> StagedCart {
    let mut staged = StagedCart::new(MainSlotCart::Capture(Capture::new()));
    staged.romh = rom;
    staged.clear_export_ram = Some(ROM_SIZE);
    staged.setup_mode = (2, 2);
    staged
}

pub(crate) fn bin_attach(data: &[u8]) -> Result<StagedCart, CartridgeError> {
    expect_bin_size(data, ROM_SIZE, "8192")?;
    Ok(staged(data.to_vec()))
}

pub(crate) fn crt_attach(image: &CrtImage) -> Result<StagedCart, CartridgeError> {
    let chip = &image.chips[0];
    if chip.data.len() != ROM_SIZE {
        return Err(CartridgeError::BadChipSize(chip.data.len() as u16));
    }
    Ok(staged(chip.data.clone()))
}
