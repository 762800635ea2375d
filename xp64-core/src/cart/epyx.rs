//! Epyx Fastload.
//!
//! An 8K ROM kept visible by a capacitor: reading ROML or IO1 discharges
//! it; left alone for long enough it charges up and the ROM drops off the
//! bus. The last ROM page is mirrored into the IO2 window regardless.

use serde::{Deserialize, Serialize};

use crate::alarm::AlarmKind;
use crate::cart::{MainSlotCart, StagedCart};
use crate::image::{expect_bin_size, CartridgeError, CrtImage};
use crate::machine::Machine;
use crate::port::{BusState, CFLAG_READ};

/// Cycles until the charged capacitor switches the ROM off.
pub(crate) const EPYX_ROM_CYCLES: u64 = 512;

const ROM_SIZE: usize = 0x2000;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub(crate) struct EpyxFastload;

impl EpyxFastload {
    /// Discharge the virtual capacitor and make sure the ROM is mapped.
    fn trigger_access(bus: &mut BusState, machine: &mut dyn Machine) {
        bus.alarms.unset(AlarmKind::EpyxRomOff);
        let due = bus.clock + EPYX_ROM_CYCLES;
        bus.alarms.set(AlarmKind::EpyxRomOff, due);
        bus.config_changed(machine, 0, 0, CFLAG_READ);
    }

    pub(crate) fn roml_read(&self, bus: &mut BusState, machine: &mut dyn Machine, addr: u16) -> u8 {
        Self::trigger_access(bus, machine);
        bus.roml_banks[(addr & 0x1FFF) as usize]
    }

    /// Monitor read: same byte, no discharge.
    pub(crate) fn roml_peek(&self, bus: &BusState, addr: u16) -> u8 {
        bus.roml_banks[(addr & 0x1FFF) as usize]
    }

    pub(crate) fn io1_read(&self, bus: &mut BusState, machine: &mut dyn Machine) -> Option<u8> {
        // IO1 discharges the capacitor but drives nothing onto the bus.
        Self::trigger_access(bus, machine);
        None
    }

    pub(crate) fn io1_peek(&self) -> Option<u8> {
        Some(0)
    }

    pub(crate) fn io2_read(&self, bus: &BusState, addr: u16) -> Option<u8> {
        // IO2 exposes the last 256 bytes of the ROM.
        Some(bus.roml_banks[0x1F00 + (addr & 0xFF) as usize])
    }

    pub(crate) fn reset(&self, bus: &mut BusState, machine: &mut dyn Machine) {
        // Reset discharges the capacitor so the ROM is visible.
        Self::trigger_access(bus, machine);
    }

    pub(crate) fn config_init(&self, bus: &mut BusState, machine: &mut dyn Machine) {
        bus.config_changed(machine, 0, 0, CFLAG_READ);
    }

    pub(crate) fn detach(&self, bus: &mut BusState) {
        if bus.alarms.is_pending(AlarmKind::EpyxRomOff) {
            log::debug!("cancelling armed capacitor alarm on detach");
        }
        bus.alarms.unset(AlarmKind::EpyxRomOff);
    }
}

fn staged(rom: Vec<u8>) -> StagedCart {
    let mut staged = StagedCart::new(MainSlotCart::EpyxFastload(EpyxFastload));
    staged.roml = rom;
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
