//! Multi-EPROM menu cartridges: Dela EP256, Dela EP7x8, REX EP256.
//!
//! All three hold a fixed 8K menu ROM in the first bank and switch sockets
//! of user-supplied EPROMs into $8000, each with its own selection scheme.

use serde::{Deserialize, Serialize};

use crate::cart::{MainSlotCart, StagedCart};
use crate::image::{expect_bin_size, CartridgeError, CrtImage};
use crate::machine::Machine;
use crate::port::{BusState, CFLAG_READ, CFLAG_WRITE, CMODE_8K_GAME, CMODE_RAM};

/// Dela EP256: 32 sockets. IO1 write selects a socket; bit 7 high switches
/// EXROM off entirely.
///
/// Socket numbering folds bits 5:4 (inverted) and 2:0 together:
/// `bank = ((0x30 - (v & 0x30)) >> 1) + (v & 7) + 1`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub(crate) struct DelaEp256 {
    bank: u8,
}

impl DelaEp256 {
    pub(crate) fn io1_store(&mut self, bus: &mut BusState, machine: &mut dyn Machine, value: u8) {
        let config = if value & 0x80 != 0 {
            CMODE_RAM
        } else {
            CMODE_8K_GAME
        };
        bus.config_changed(machine, config, config, CFLAG_WRITE);

        let mut bank = ((0x30 - (value & 0x30)) >> 1) + (value & 7) + 1;
        if !(1..=32).contains(&bank) {
            bank = 0;
        }
        bus.set_roml_bank(bank as usize);
        self.bank = bank;
    }

    pub(crate) fn io1_peek(&self) -> Option<u8> {
        Some(self.bank)
    }

    pub(crate) fn config_init(&self, bus: &mut BusState, machine: &mut dyn Machine) {
        bus.config_changed(machine, 0, 0, CFLAG_READ);
        bus.set_roml_bank(0);
    }
}

/// Dela EP7x8: 8 sockets, one select line per socket, active low. Writing
/// $FF (no line low) switches EXROM off. With several lines low the
/// highest-numbered socket wins, which is why the decode counts the
/// leading zeros of the complement.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub(crate) struct DelaEp7x8 {
    bank: u8,
}

impl DelaEp7x8 {
    pub(crate) fn io1_store(&mut self, bus: &mut BusState, machine: &mut dyn Machine, value: u8) {
        let config = if value == 0xFF {
            CMODE_RAM
        } else {
            CMODE_8K_GAME
        };
        bus.config_changed(machine, config, config, CFLAG_WRITE);

        let mut bank: u8 = 0;
        let mut test = !value;
        while test != 0 {
            bank += 1;
            test >>= 1;
        }
        if bank != 0 {
            bus.set_roml_bank((bank - 1) as usize);
            self.bank = bank - 1;
        }
    }

    pub(crate) fn io1_peek(&self) -> Option<u8> {
        Some(self.bank)
    }

    pub(crate) fn config_init(&self, bus: &mut BusState, machine: &mut dyn Machine) {
        bus.config_changed(machine, 0, 0, CFLAG_READ);
        bus.set_roml_bank(0);
    }
}

/// REX EP256: 8 sockets populated with 8K, 16K or 32K EPROMs; only 8K
/// blocks can be switched in. $DFA0 writes select socket (low nibble) and
/// sub-bank (next two bits), scaled by the socket's declared size.
/// Reading $DFC0 switches EXROM off, reading $DFE0 switches it back on;
/// both toggle the line directly instead of going through the normal
/// config route.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub(crate) struct RexEp256 {
    /// Declared EPROM size per socket (0x2000/0x4000/0x8000).
    eprom_size: [u16; 8],
    /// First 8K bank of each socket inside the ROML image, minus the menu
    /// bank. Empty sockets point at erased (0xFF) space.
    bank_offset: [u8; 8],
}

impl Default for RexEp256 {
    fn default() -> Self {
        Self {
            eprom_size: [0x2000; 8],
            bank_offset: [0x1F; 8],
        }
    }
}

impl RexEp256 {
    pub(crate) fn io2_store(&self, bus: &mut BusState, addr: u16, value: u8) {
        if addr != 0xDFA0 {
            return;
        }

        let socket = (value & 0x0F) as usize;
        if socket > 7 {
            return;
        }
        let sub_bank = (value & 0xF0) >> 4;
        if sub_bank > 3 {
            return;
        }

        let part = match self.eprom_size[socket] {
            0x4000 => sub_bank & 1,
            0x8000 => sub_bank,
            _ => 0,
        };

        bus.set_roml_bank(self.bank_offset[socket] as usize + part as usize + 1);
    }

    pub(crate) fn io2_read(
        &self,
        bus: &mut BusState,
        machine: &mut dyn Machine,
        addr: u16,
    ) -> Option<u8> {
        if addr == 0xDFC0 {
            bus.signals.exrom = false;
            machine.pla_config_changed();
        }
        if addr == 0xDFE0 {
            bus.signals.exrom = true;
            machine.pla_config_changed();
        }
        None
    }

    pub(crate) fn io2_peek(&self) -> Option<u8> {
        Some(0)
    }

    pub(crate) fn config_init(&self, bus: &mut BusState, machine: &mut dyn Machine) {
        bus.config_changed(machine, 0, 0, CFLAG_READ);
        bus.set_roml_bank(0);
    }
}

/// All three systems keep the whole socket space erased (0xFF) so that
/// empty sockets read as blank EPROMs.
fn erased(banks: usize) -> Vec<u8> {
    vec![0xFF; banks * 0x2000]
}

pub(crate) fn delaep256_bin_attach(data: &[u8]) -> Result<StagedCart, CartridgeError> {
    expect_bin_size(data, 0x2000, "8192")?;
    let mut staged = StagedCart::new(MainSlotCart::DelaEp256(DelaEp256::default()));
    let mut rom = erased(33);
    rom[..0x2000].copy_from_slice(data);
    staged.roml = rom;
    Ok(staged)
}

pub(crate) fn delaep256_crt_attach(image: &CrtImage) -> Result<StagedCart, CartridgeError> {
    let mut rom = erased(33);
    for chip in &image.chips {
        if chip.data.len() != 0x2000 {
            return Err(CartridgeError::BadChipSize(chip.data.len() as u16));
        }
        if chip.bank > 32 {
            return Err(CartridgeError::BankOutOfRange {
                bank: chip.bank,
                banks: 33,
            });
        }
        let offset = (chip.bank as usize) << 13;
        rom[offset..offset + 0x2000].copy_from_slice(&chip.data);
    }
    let mut staged = StagedCart::new(MainSlotCart::DelaEp256(DelaEp256::default()));
    staged.roml = rom;
    Ok(staged)
}

pub(crate) fn delaep7x8_bin_attach(data: &[u8]) -> Result<StagedCart, CartridgeError> {
    expect_bin_size(data, 0x2000, "8192")?;
    let mut staged = StagedCart::new(MainSlotCart::DelaEp7x8(DelaEp7x8::default()));
    let mut rom = erased(8);
    rom[..0x2000].copy_from_slice(data);
    staged.roml = rom;
    Ok(staged)
}

pub(crate) fn delaep7x8_crt_attach(image: &CrtImage) -> Result<StagedCart, CartridgeError> {
    let mut rom = erased(8);
    for chip in &image.chips {
        if chip.data.len() != 0x2000 {
            return Err(CartridgeError::BadChipSize(chip.data.len() as u16));
        }
        if chip.bank > 7 {
            return Err(CartridgeError::BankOutOfRange {
                bank: chip.bank,
                banks: 8,
            });
        }
        let offset = (chip.bank as usize) << 13;
        rom[offset..offset + 0x2000].copy_from_slice(&chip.data);
    }
    let mut staged = StagedCart::new(MainSlotCart::DelaEp7x8(DelaEp7x8::default()));
    staged.roml = rom;
    Ok(staged)
}

pub(crate) fn rexep256_bin_attach(data: &[u8]) -> Result<StagedCart, CartridgeError> {
    expect_bin_size(data, 0x2000, "8192")?;
    let mut staged = StagedCart::new(MainSlotCart::RexEp256(RexEp256::default()));
    let mut rom = erased(33);
    rom[..0x2000].copy_from_slice(data);
    staged.roml = rom;
    Ok(staged)
}

pub(crate) fn rexep256_crt_attach(image: &CrtImage) -> Result<StagedCart, CartridgeError> {
    let mut cart = RexEp256::default();
    let mut rom = erased(33);

    // First packet is always the 8K menu ROM.
    let menu = &image.chips[0];
    if menu.data.len() != 0x2000 {
        return Err(CartridgeError::BadChipSize(menu.data.len() as u16));
    }
    rom[..0x2000].copy_from_slice(&menu.data);

    let mut total: usize = 0;
    for chip in &image.chips[1..] {
        let size = chip.data.len();
        if size != 0x2000 && size != 0x4000 && size != 0x8000 {
            return Err(CartridgeError::BadChipSize(size as u16));
        }
        if chip.bank == 0 || chip.bank > 8 {
            return Err(CartridgeError::BankOutOfRange {
                bank: chip.bank,
                banks: 8,
            });
        }
        if 0x2000 + total + size > rom.len() {
            return Err(CartridgeError::BadChipSize(size as u16));
        }
        let socket = (chip.bank - 1) as usize;
        cart.eprom_size[socket] = size as u16;
        cart.bank_offset[socket] = (total >> 13) as u8;
        rom[0x2000 + total..0x2000 + total + size].copy_from_slice(&chip.data);
        total += size;
    }

    let mut staged = StagedCart::new(MainSlotCart::RexEp256(cart));
    staged.roml = rom;
    Ok(staged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::tests::TestMachine;

    #[test]
    fn delaep7x8_decodes_select_line_position() {
        let mut machine = TestMachine::default();
        let mut bus = BusState::new();
        let mut cart = DelaEp7x8::default();

        // One select line low at a time.
        for (value, bank) in [(0xFEu8, 0usize), (0xFD, 1), (0xFB, 2), (0x7F, 7)] {
            cart.io1_store(&mut bus, &mut machine, value);
            assert_eq!(bank, bus.roml_bank, "value {value:02X}");
        }

        // With several lines low the highest-numbered socket wins.
        cart.io1_store(&mut bus, &mut machine, 0xFC);
        assert_eq!(1, bus.roml_bank);

        // All lines high: EXROM off; the config change clears the bank
        // field and no socket is selected on top of it.
        cart.io1_store(&mut bus, &mut machine, 0xFF);
        assert_eq!(0, bus.roml_bank);
        assert!(!bus.signals.exrom);
    }

    #[test]
    fn delaep256_decode_folds_high_and_low_bits() {
        let mut machine = TestMachine::default();
        let mut bus = BusState::new();
        let mut cart = DelaEp256::default();

        // Banks 1-8 live at $38-$3F, banks 25-32 at $08-$0F.
        cart.io1_store(&mut bus, &mut machine, 0x38);
        assert_eq!(1, bus.roml_bank);
        cart.io1_store(&mut bus, &mut machine, 0x3F);
        assert_eq!(8, bus.roml_bank);
        cart.io1_store(&mut bus, &mut machine, 0x08);
        assert_eq!(25, bus.roml_bank);
        cart.io1_store(&mut bus, &mut machine, 0x0F);
        assert_eq!(32, bus.roml_bank);
    }

    #[test]
    fn rexep256_scales_sub_bank_by_socket_size() {
        let mut bus = BusState::new();
        let cart = RexEp256 {
            eprom_size: [0x2000, 0x8000, 0x4000, 0x2000, 0x2000, 0x2000, 0x2000, 0x2000],
            bank_offset: [0, 1, 5, 7, 0x1F, 0x1F, 0x1F, 0x1F],
        };

        // 8K socket ignores the sub-bank bits.
        cart.io2_store(&mut bus, 0xDFA0, 0x30);
        assert_eq!(1, bus.roml_bank);

        // 32K socket uses both sub-bank bits.
        cart.io2_store(&mut bus, 0xDFA0, 0x31);
        assert_eq!(1 + 3 + 1, bus.roml_bank);

        // 16K socket only the low one.
        cart.io2_store(&mut bus, 0xDFA0, 0x32);
        assert_eq!(5 + 1 + 1, bus.roml_bank);

        // Writes anywhere else in IO2 are ignored.
        cart.io2_store(&mut bus, 0xDFA1, 0x01);
        assert_eq!(5 + 1 + 1, bus.roml_bank);
    }

    #[test]
    fn rexep256_reads_toggle_exrom_directly() {
        let mut machine = TestMachine::default();
        let mut bus = BusState::new();
        let cart = RexEp256::default();
        bus.signals.exrom = true;

        cart.io2_read(&mut bus, &mut machine, 0xDFC0);
        assert!(!bus.signals.exrom);
        cart.io2_read(&mut bus, &mut machine, 0xDFE0);
        assert!(bus.signals.exrom);
        assert_eq!(2, machine.pla_changes);
    }
}
