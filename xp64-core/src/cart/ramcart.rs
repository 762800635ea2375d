//! RAMCART, a battery-backed RAM expansion in slot 1.
//!
//! The RAM (64KB or 128KB) is exposed through a 256-byte window at
//! $DF00-$DFFF. The window's upper address bits come from the page
//! register at $DE00 plus, on the 128KB unit, the low bit of $DE01. With
//! the write-protect switch on and bit 7 of $DE01 clear the window is also
//! mirrored into $8000-$80FF, which is how the unit fakes a boot cartridge
//! after reset.

use serde::{Deserialize, Serialize};

use crate::image::CartridgeError;
use crate::io::{IoOwner, IoSource};
use crate::machine::Machine;
use crate::port::BusState;
use crate::slot::SlotDevice;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RamCart {
    regs: [u8; 2],
    ram: Vec<u8>,
    size_kb: u32,
    readonly: bool,
    enabled: bool,
}

impl RamCart {
    /// Create a unit of the given size; only the 64KB and 128KB flavours
    /// were produced.
    pub fn new(size_kb: u32) -> Result<Self, CartridgeError> {
        if size_kb != 64 && size_kb != 128 {
            return Err(CartridgeError::BadBinSize {
                actual: size_kb as usize * 1024,
                expected: "65536 or 131072",
            });
        }
        Ok(Self {
            regs: [0, 0],
            ram: vec![0; size_kb as usize * 1024],
            size_kb,
            readonly: false,
            enabled: true,
        })
    }

    /// Restore battery-backed contents from a saved image.
    pub fn from_image(data: &[u8]) -> Result<Self, CartridgeError> {
        let mut cart = Self::new((data.len() / 1024) as u32)?;
        cart.ram.copy_from_slice(data);
        Ok(cart)
    }

    /// The write-protect switch on the unit.
    pub fn set_readonly(&mut self, readonly: bool) {
        self.readonly = readonly;
    }

    pub fn ram(&self) -> &[u8] {
        &self.ram
    }

    fn window_base(&self) -> usize {
        (((self.regs[1] & 1) as usize) << 16) + self.regs[0] as usize * 256
    }

    fn window_read(&self, addr: u16) -> u8 {
        self.ram[self.window_base() + (addr & 0xFF) as usize]
    }

    fn window_store(&mut self, addr: u16, value: u8) {
        let base = self.window_base();
        self.ram[base + (addr & 0xFF) as usize] = value;
    }

    /// Whether the window is mirrored into $8000-$80FF.
    fn mirror_at_8000(&self) -> bool {
        self.readonly && self.size_kb == 128 && self.regs[1] & 0x80 == 0
    }
}

impl SlotDevice for RamCart {
    fn name(&self) -> &'static str {
        "RAMCART"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn io_claims(&self) -> Vec<IoSource> {
        vec![
            IoSource {
                name: "RAMCART",
                start: 0xDE00,
                end: 0xDEFF,
                address_mask: 0x01,
                owner: IoOwner::Slot1,
            },
            IoSource {
                name: "RAMCART",
                start: 0xDF00,
                end: 0xDFFF,
                address_mask: 0xFF,
                owner: IoOwner::Slot1,
            },
        ]
    }

    fn install(&mut self, bus: &mut BusState, machine: &mut dyn Machine) {
        // The unit asserts EXROM so its boot window takes over $8000.
        bus.signals.exrom = true;
        machine.pla_config_changed();
    }

    fn uninstall(&mut self, bus: &mut BusState, machine: &mut dyn Machine) {
        bus.signals.exrom = false;
        machine.pla_config_changed();
    }

    fn reset(&mut self, _bus: &mut BusState, _machine: &mut dyn Machine) {
        self.regs = [0, 0];
    }

    fn roml_read(&mut self, _bus: &mut BusState, machine: &mut dyn Machine, addr: u16) -> Option<u8> {
        if self.mirror_at_8000() && (0x8000..=0x80FF).contains(&addr) {
            return Some(self.window_read(addr));
        }
        Some(machine.ram_read(addr))
    }

    fn roml_store(
        &mut self,
        _bus: &mut BusState,
        machine: &mut dyn Machine,
        addr: u16,
        value: u8,
    ) -> bool {
        machine.ram_store(addr, value);
        true
    }

    fn io_read(&mut self, _bus: &mut BusState, machine: &mut dyn Machine, addr: u16) -> Option<u8> {
        match addr {
            0xDE00..=0xDEFF => {
                // Register page: only the low address bit decodes.
                if addr & 1 == 1 {
                    if self.size_kb == 128 {
                        // Unconnected bits read as bus noise.
                        Some((machine.vic_phi1_read() & 0x7E).wrapping_add(self.regs[1]))
                    } else {
                        Some(self.regs[1])
                    }
                } else {
                    Some(self.regs[0])
                }
            }
            _ => Some(self.window_read(addr)),
        }
    }

    fn io_store(&mut self, _bus: &mut BusState, _machine: &mut dyn Machine, addr: u16, value: u8) {
        match addr {
            0xDE00..=0xDEFF => {
                if addr & 1 == 1 {
                    if self.size_kb == 128 {
                        self.regs[1] = value & 0x81;
                    }
                } else {
                    self.regs[0] = value;
                }
            }
            _ => self.window_store(addr, value),
        }
    }

    fn io_peek(&mut self, _bus: &mut BusState, _machine: &mut dyn Machine, addr: u16) -> Option<u8> {
        match addr {
            0xDE00..=0xDEFF => Some(self.regs[(addr & 1) as usize]),
            _ => Some(self.window_read(addr)),
        }
    }

    fn peek(&mut self, _bus: &mut BusState, machine: &mut dyn Machine, addr: u16) -> Option<u8> {
        if self.mirror_at_8000() && (0x8000..=0x80FF).contains(&addr) {
            return Some(self.window_read(addr));
        }
        Some(machine.ram_read(addr))
    }
}
