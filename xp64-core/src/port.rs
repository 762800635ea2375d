//! The expansion port: signal state, banked ROM/RAM images and the bus
//! dispatcher that decides, for every cartridge-visible access, which
//! device answers.
//!
//! Resolution order for every window is fixed: slot 0, then slot 1, then
//! the main-slot cartridge, then the generic image handler. An access
//! nothing claims reads as whatever the VIC-II last put on the bus, and
//! writes die silently.

#[cfg(test)]
pub(crate) mod tests;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::address::{
    BANK_OFFSET_MASK, BANK_SHIFT, IO1_END, IO1_START, IO2_END, IO2_START, RAM_IMAGE_LIMIT,
    ROM_IMAGE_LIMIT,
};
use crate::alarm::{AlarmKind, AlarmScheduler};
use crate::cart::{generic, ramcart::RamCart, HardwareType, MainSlotCart, StagedCart};
use crate::image::{is_crt, CartridgeError, CrtImage};
use crate::io::{IoOwner, IoRegistry, IoSource};
use crate::machine::Machine;
use crate::slot::SlotDevice;

//
// Mapping mode, low two bits of mode_phi1/mode_phi2
//

pub const CMODE_8K_GAME: u8 = 0;
pub const CMODE_16K_GAME: u8 = 1;
pub const CMODE_RAM: u8 = 2;
pub const CMODE_ULTIMAX: u8 = 3;

/// Bank index field of mode_phi1/mode_phi2.
pub const CMODE_BANK_SHIFT: u8 = 2;
pub const CMODE_BANK_MASK: u8 = 0x3F;

//
// Config-change flag bits
//

pub const CFLAG_READ: u8 = 0x00;
/// The change was caused by a write access.
pub const CFLAG_WRITE: u8 = 0x01;
/// Stop asserting the freeze NMI.
pub const CFLAG_RELEASE_FREEZE: u8 = 0x02;
/// The VIC-II always sees RAM on phi2 regardless of mode.
pub const CFLAG_PHI2_RAM: u8 = 0x04;
/// Cartridge RAM is mapped over ROML.
pub const CFLAG_EXPORT_RAM: u8 = 0x08;
/// Raise an NMI once the new config is in place.
pub const CFLAG_TRIGGER_NMI: u8 = 0x10;

/// The expansion-port lines as seen by the memory-map builder.
/// `true` means the line is asserted (electrically low).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSignals {
    pub game: bool,
    pub exrom: bool,
    /// The VIC-II sees the ultimax map on phi1 fetches.
    pub ultimax_phi1: bool,
    /// The VIC-II sees the ultimax map on phi2 fetches.
    pub ultimax_phi2: bool,
}

/// Banked images, bank registers and line state shared by every cartridge
/// handler. Split out of [`ExpansionPort`] so handlers can borrow it while
/// the port still holds the cartridge itself.
#[derive(Debug)]
pub struct BusState {
    pub signals: PortSignals,
    pub(crate) roml_banks: Vec<u8>,
    pub(crate) romh_banks: Vec<u8>,
    pub(crate) export_ram0: Vec<u8>,
    pub(crate) roml_bank: usize,
    pub(crate) romh_bank: usize,
    /// Cartridge RAM mapped over ROML.
    pub(crate) export_ram: bool,
    pub(crate) clock: u64,
    pub(crate) alarms: AlarmScheduler,
    pub(crate) io: IoRegistry,
}

impl Default for BusState {
    fn default() -> Self {
        Self::new()
    }
}

impl BusState {
    pub fn new() -> Self {
        Self {
            signals: PortSignals::default(),
            roml_banks: vec![0; ROM_IMAGE_LIMIT],
            romh_banks: vec![0; ROM_IMAGE_LIMIT],
            export_ram0: vec![0; RAM_IMAGE_LIMIT],
            roml_bank: 0,
            romh_bank: 0,
            export_ram: false,
            clock: 0,
            alarms: AlarmScheduler::default(),
            io: IoRegistry::default(),
        }
    }

    /// Byte of the currently selected ROML bank.
    pub(crate) fn roml_byte(&self, addr: u16) -> u8 {
        self.roml_banks[(addr & BANK_OFFSET_MASK) as usize + (self.roml_bank << BANK_SHIFT)]
    }

    /// Byte of the currently selected ROMH bank.
    pub(crate) fn romh_byte(&self, addr: u16) -> u8 {
        self.romh_banks[(addr & BANK_OFFSET_MASK) as usize + (self.romh_bank << BANK_SHIFT)]
    }

    pub(crate) fn set_roml_bank(&mut self, bank: usize) {
        self.roml_bank = bank;
    }

    pub(crate) fn set_romh_bank(&mut self, bank: usize) {
        self.romh_bank = bank;
    }

    /// Apply a mapping change. This is the single choke point through
    /// which every cartridge communicates with the machine; the bit
    /// contract is hardware-accurate and must not drift:
    ///
    /// - `mode_phiN` bits 1:0 are the mapping mode (8K game, 16K game,
    ///   RAM, ultimax), bits 7:2 the bank index;
    /// - `flags` carries the access kind plus the freeze/NMI/RAM bits
    ///   (`CFLAG_*`).
    pub fn config_changed(
        &mut self,
        machine: &mut dyn Machine,
        mode_phi1: u8,
        mode_phi2: u8,
        flags: u8,
    ) {
        log::trace!(
            "config change: phi1 mode {} phi2 mode {} bank {} flags {flags:02X}",
            mode_phi1 & 3,
            mode_phi2 & 3,
            (mode_phi2 >> CMODE_BANK_SHIFT) & CMODE_BANK_MASK
        );

        // Pending CPU alarms must run against the old configuration,
        // honoring read-modify-write on writes.
        machine.handle_pending_alarms(flags & CFLAG_WRITE != 0);

        self.signals.game = mode_phi2 & 1 != 0;
        self.signals.exrom = (mode_phi2 >> 1) & 1 == 0;
        let bank = ((mode_phi2 >> CMODE_BANK_SHIFT) & CMODE_BANK_MASK) as usize;
        self.set_romh_bank(bank);
        self.set_roml_bank(bank);
        self.export_ram = flags & CFLAG_EXPORT_RAM != 0;

        self.signals.ultimax_phi1 = mode_phi1 & 3 == CMODE_ULTIMAX;
        self.signals.ultimax_phi2 =
            self.signals.game && !self.signals.exrom && flags & CFLAG_PHI2_RAM == 0;

        machine.pla_config_changed();

        if flags & CFLAG_RELEASE_FREEZE != 0 {
            machine.nmi_release();
        }
        if flags & CFLAG_TRIGGER_NMI != 0 {
            machine.nmi_set();
        }
    }
}

/// The expansion port context: three cartridge slots plus the shared bus
/// state. Single-threaded; every access is a direct call from the emulated
/// CPU or VIC-II.
pub struct ExpansionPort {
    pub(crate) main: MainSlotCart,
    slot0: Option<Box<dyn SlotDevice>>,
    slot1: Option<Box<dyn SlotDevice>>,
    pub(crate) bus: BusState,
}

impl Default for ExpansionPort {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpansionPort {
    pub fn new() -> Self {
        Self {
            main: MainSlotCart::None,
            slot0: None,
            slot1: None,
            bus: BusState::new(),
        }
    }

    pub fn signals(&self) -> PortSignals {
        self.bus.signals
    }

    pub fn main_type(&self) -> HardwareType {
        self.main.kind()
    }

    pub fn roml_bank(&self) -> usize {
        self.bus.roml_bank
    }

    pub fn romh_bank(&self) -> usize {
        self.bus.romh_bank
    }

    pub fn export_ram_enabled(&self) -> bool {
        self.bus.export_ram
    }

    pub fn clock(&self) -> u64 {
        self.bus.clock
    }

    /// The I/O registry, for monitor-style queries about who owns which
    /// range of the expansion I/O pages.
    pub fn io_registry(&self) -> &IoRegistry {
        &self.bus.io
    }

    /// See [`BusState::config_changed`]. Exposed for machine reset code.
    pub fn config_changed(
        &mut self,
        machine: &mut dyn Machine,
        mode_phi1: u8,
        mode_phi2: u8,
        flags: u8,
    ) {
        self.bus.config_changed(machine, mode_phi1, mode_phi2, flags);
    }

    //
    // Clock and alarms
    //

    /// Advance the emulated clock, firing any alarms that come due. Called
    /// by the main emulation loop; alarms never fire outside this.
    pub fn advance_clock(&mut self, machine: &mut dyn Machine, cycles: u64) {
        self.bus.clock += cycles;
        while let Some(kind) = self.bus.alarms.pop_due(self.bus.clock) {
            match kind {
                AlarmKind::EpyxRomOff => {
                    log::debug!("Epyx capacitor charged, ROM off");
                    self.bus
                        .config_changed(machine, CMODE_RAM, CMODE_RAM, CFLAG_READ);
                }
            }
        }
    }

    //
    // Attach / detach
    //

    /// Attach a cartridge image file. `kind` picks the BIN layout;
    /// [`HardwareType::Crt`] (or a file carrying the CRT signature) reads
    /// the type from the container header. Returns the attached type.
    pub fn attach_image(
        &mut self,
        machine: &mut dyn Machine,
        kind: HardwareType,
        path: &Path,
    ) -> Result<HardwareType, CartridgeError> {
        let data = fs::read(path)?;
        if kind == HardwareType::Crt || is_crt(&data) {
            self.attach_crt(machine, &data)
        } else {
            self.attach_bin(machine, kind, &data)?;
            Ok(kind)
        }
    }

    /// Attach a CRT container from memory.
    pub fn attach_crt(
        &mut self,
        machine: &mut dyn Machine,
        data: &[u8],
    ) -> Result<HardwareType, CartridgeError> {
        let image = CrtImage::parse(data)?;
        let staged = stage_crt(&image)?;
        let kind = staged.cart.kind();
        self.install(machine, staged)?;
        Ok(kind)
    }

    /// Attach a headerless image from memory, with the layout `kind`
    /// expects.
    pub fn attach_bin(
        &mut self,
        machine: &mut dyn Machine,
        kind: HardwareType,
        data: &[u8],
    ) -> Result<(), CartridgeError> {
        let staged = stage_bin(kind, data)?;
        self.install(machine, staged)
    }

    /// Detach the main-slot cartridge and drop back to the no-cartridge
    /// configuration.
    pub fn detach(&mut self, machine: &mut dyn Machine) {
        if !matches!(self.main, MainSlotCart::None) {
            log::info!("detaching {} cartridge", self.main.kind());
        }
        self.main.detach(&mut self.bus);
        self.bus.io.unregister_owner(IoOwner::MainSlot);
        self.main = MainSlotCart::None;
        self.bus
            .config_changed(machine, CMODE_RAM, CMODE_RAM, CFLAG_READ);
    }

    /// Everything validated; commit the staged cartridge to the port.
    fn install(
        &mut self,
        machine: &mut dyn Machine,
        staged: StagedCart,
    ) -> Result<(), CartridgeError> {
        self.detach(machine);

        let (io1, io2) = staged.cart.io_claims();
        if let Some(name) = io1 {
            self.bus.io.register(IoSource {
                name,
                start: IO1_START,
                end: IO1_END,
                address_mask: 0xFF,
                owner: IoOwner::MainSlot,
            })?;
        }
        if let Some(name) = io2 {
            if let Err(conflict) = self.bus.io.register(IoSource {
                name,
                start: IO2_START,
                end: IO2_END,
                address_mask: 0xFF,
                owner: IoOwner::MainSlot,
            }) {
                self.bus.io.unregister_owner(IoOwner::MainSlot);
                return Err(conflict.into());
            }
        }

        self.bus.roml_banks[..staged.roml.len()].copy_from_slice(&staged.roml);
        self.bus.romh_banks[..staged.romh.len()].copy_from_slice(&staged.romh);
        if let Some(len) = staged.clear_export_ram {
            self.bus.export_ram0[..len].fill(0);
        }

        self.main = staged.cart;
        let (phi1, phi2) = staged.setup_mode;
        self.bus.config_changed(machine, phi1, phi2, CFLAG_READ);
        log::info!("attached {} cartridge", self.main.kind());
        Ok(())
    }

    /// Re-register the main cartridge's I/O claims, e.g. after restoring a
    /// snapshot into a fresh port.
    pub(crate) fn reclaim_io(&mut self) -> Result<(), CartridgeError> {
        self.bus.io.unregister_owner(IoOwner::MainSlot);
        let (io1, io2) = self.main.io_claims();
        if let Some(name) = io1 {
            self.bus.io.register(IoSource {
                name,
                start: IO1_START,
                end: IO1_END,
                address_mask: 0xFF,
                owner: IoOwner::MainSlot,
            })?;
        }
        if let Some(name) = io2 {
            if let Err(conflict) = self.bus.io.register(IoSource {
                name,
                start: IO2_START,
                end: IO2_END,
                address_mask: 0xFF,
                owner: IoOwner::MainSlot,
            }) {
                self.bus.io.unregister_owner(IoOwner::MainSlot);
                return Err(conflict.into());
            }
        }
        Ok(())
    }

    /// Install a slot-0 device (highest priority tier).
    pub fn install_slot0(
        &mut self,
        machine: &mut dyn Machine,
        device: Box<dyn SlotDevice>,
    ) -> Result<(), CartridgeError> {
        self.remove_slot0(machine);
        Self::install_slot(&mut self.slot0, &mut self.bus, machine, device, IoOwner::Slot0)
    }

    /// Install a slot-1 device (consulted after slot 0, before the main
    /// slot).
    pub fn install_slot1(
        &mut self,
        machine: &mut dyn Machine,
        device: Box<dyn SlotDevice>,
    ) -> Result<(), CartridgeError> {
        self.remove_slot1(machine);
        Self::install_slot(&mut self.slot1, &mut self.bus, machine, device, IoOwner::Slot1)
    }

    fn install_slot(
        slot: &mut Option<Box<dyn SlotDevice>>,
        bus: &mut BusState,
        machine: &mut dyn Machine,
        mut device: Box<dyn SlotDevice>,
        owner: IoOwner,
    ) -> Result<(), CartridgeError> {
        for claim in device.io_claims() {
            if let Err(conflict) = bus.io.register(claim) {
                bus.io.unregister_owner(owner);
                return Err(conflict.into());
            }
        }
        device.install(bus, machine);
        log::info!("installed {} in {owner:?}", device.name());
        *slot = Some(device);
        Ok(())
    }

    pub fn remove_slot0(&mut self, machine: &mut dyn Machine) -> Option<Box<dyn SlotDevice>> {
        let mut device = self.slot0.take()?;
        device.uninstall(&mut self.bus, machine);
        self.bus.io.unregister_owner(IoOwner::Slot0);
        Some(device)
    }

    pub fn remove_slot1(&mut self, machine: &mut dyn Machine) -> Option<Box<dyn SlotDevice>> {
        let mut device = self.slot1.take()?;
        device.uninstall(&mut self.bus, machine);
        self.bus.io.unregister_owner(IoOwner::Slot1);
        Some(device)
    }

    /// Convenience for the common slot-1 RAMCART setup.
    pub fn install_ramcart(
        &mut self,
        machine: &mut dyn Machine,
        ramcart: RamCart,
    ) -> Result<(), CartridgeError> {
        self.install_slot1(machine, Box::new(ramcart))
    }

    //
    // Control
    //

    /// The freeze button. Asserts an NMI and runs the cartridge's freeze
    /// logic; does nothing when the attached cartridge has no freezer.
    pub fn freeze(&mut self, machine: &mut dyn Machine) {
        if !self.main.has_freeze() {
            return;
        }
        log::debug!("freeze pressed");
        machine.nmi_set();
        self.main.freeze(&mut self.bus, machine);
    }

    /// Stop asserting the freeze NMI without touching cartridge logic.
    pub fn release_freeze(&mut self, machine: &mut dyn Machine) {
        machine.nmi_release();
    }

    /// Raise the cartridge NMI without running freeze logic (monitor use).
    pub fn trigger_freeze_nmi_only(&mut self, machine: &mut dyn Machine) {
        machine.nmi_set();
    }

    /// Hardware reset: per-cartridge reset logic, then the power-on
    /// configuration.
    pub fn reset(&mut self, machine: &mut dyn Machine) {
        if let Some(device) = self.slot0.as_mut() {
            device.reset(&mut self.bus, machine);
        }
        if let Some(device) = self.slot1.as_mut() {
            device.reset(&mut self.bus, machine);
        }
        self.main.reset(&mut self.bus, machine);
        self.main.config_init(&mut self.bus, machine);
    }

    //
    // ROML window ($8000-$9FFF)
    //

    pub fn roml_read(&mut self, machine: &mut dyn Machine, addr: u16) -> u8 {
        if let Some(device) = self.slot0.as_mut().filter(|d| d.is_enabled()) {
            if let Some(value) = device.roml_read(&mut self.bus, machine, addr) {
                return value;
            }
        }
        if let Some(device) = self.slot1.as_mut().filter(|d| d.is_enabled()) {
            if let Some(value) = device.roml_read(&mut self.bus, machine, addr) {
                return value;
            }
        }
        self.main.roml_read(&mut self.bus, machine, addr)
    }

    /// ROML store in ultimax config.
    pub fn roml_store(&mut self, machine: &mut dyn Machine, addr: u16, value: u8) {
        if let Some(device) = self.slot0.as_mut().filter(|d| d.is_enabled()) {
            if device.roml_store(&mut self.bus, machine, addr, value) {
                return;
            }
        }
        if let Some(device) = self.slot1.as_mut().filter(|d| d.is_enabled()) {
            if device.roml_store(&mut self.bus, machine, addr, value) {
                return;
            }
        }
        self.main.roml_store(&mut self.bus, machine, addr, value);
    }

    /// ROML store in 8K/16K game config (the write also reaches the RAM
    /// under the ROM).
    pub fn roml_no_ultimax_store(&mut self, machine: &mut dyn Machine, addr: u16, value: u8) {
        if let Some(device) = self.slot0.as_mut().filter(|d| d.is_enabled()) {
            if device.roml_store(&mut self.bus, machine, addr, value) {
                return;
            }
        }
        if let Some(device) = self.slot1.as_mut().filter(|d| d.is_enabled()) {
            if device.roml_store(&mut self.bus, machine, addr, value) {
                return;
            }
        }
        self.main
            .roml_no_ultimax_store(&mut self.bus, machine, addr, value);
    }

    //
    // ROMH window ($A000-$BFFF in 16K game, $E000-$FFFF in ultimax)
    //

    pub fn romh_read(&mut self, machine: &mut dyn Machine, addr: u16) -> u8 {
        if let Some(device) = self.slot0.as_mut().filter(|d| d.is_enabled()) {
            if let Some(value) = device.romh_read(&mut self.bus, machine, addr) {
                return value;
            }
        }
        if let Some(device) = self.slot1.as_mut().filter(|d| d.is_enabled()) {
            if let Some(value) = device.romh_read(&mut self.bus, machine, addr) {
                return value;
            }
        }
        self.main.romh_read(&mut self.bus, machine, addr)
    }

    /// ROMH read with the high window ($E000) selected.
    pub fn ultimax_romh_read_hirom(&mut self, machine: &mut dyn Machine, addr: u16) -> u8 {
        if let Some(device) = self.slot0.as_mut().filter(|d| d.is_enabled()) {
            if let Some(value) = device.romh_read(&mut self.bus, machine, addr) {
                return value;
            }
        }
        if let Some(device) = self.slot1.as_mut().filter(|d| d.is_enabled()) {
            if let Some(value) = device.romh_read(&mut self.bus, machine, addr) {
                return value;
            }
        }
        self.main
            .ultimax_romh_read_hirom(&mut self.bus, machine, addr)
    }

    /// ROMH store in ultimax config.
    pub fn romh_store(&mut self, machine: &mut dyn Machine, addr: u16, value: u8) {
        self.main.romh_store(&mut self.bus, machine, addr, value);
    }

    /// ROMH store in 16K game config.
    pub fn romh_no_ultimax_store(&mut self, machine: &mut dyn Machine, addr: u16, value: u8) {
        self.main
            .romh_no_ultimax_store(&mut self.bus, machine, addr, value);
    }

    //
    // VIC-II fetches from the ROMH window in ultimax config
    //

    pub fn ultimax_romh_phi1_read(&mut self, machine: &mut dyn Machine, addr: u16) -> u8 {
        self.main.romh_phi1_read(&mut self.bus, machine, addr)
    }

    pub fn ultimax_romh_phi2_read(&mut self, machine: &mut dyn Machine, addr: u16) -> u8 {
        self.main.romh_phi2_read(&mut self.bus, machine, addr)
    }

    //
    // Ultimax fallback windows
    //

    pub fn ultimax_1000_7fff_read(&mut self, machine: &mut dyn Machine, addr: u16) -> u8 {
        self.main.ultimax_low_read(&mut self.bus, machine, addr)
    }

    pub fn ultimax_1000_7fff_store(&mut self, machine: &mut dyn Machine, addr: u16, value: u8) {
        self.main
            .ultimax_low_store(&mut self.bus, machine, addr, value);
    }

    pub fn ultimax_a000_bfff_read(&mut self, machine: &mut dyn Machine, addr: u16) -> u8 {
        self.main.ultimax_a000_read(&mut self.bus, machine, addr)
    }

    pub fn ultimax_a000_bfff_store(&mut self, machine: &mut dyn Machine, addr: u16, value: u8) {
        self.main.ultimax_a000_store(machine, addr, value);
    }

    pub fn ultimax_c000_cfff_read(&mut self, machine: &mut dyn Machine, addr: u16) -> u8 {
        self.main.ultimax_c000_read(machine, addr)
    }

    pub fn ultimax_c000_cfff_store(&mut self, machine: &mut dyn Machine, addr: u16, value: u8) {
        self.main.ultimax_c000_store(machine, addr, value);
    }

    /// The $D000-$DFFF window in ultimax config. $DE00-$DFFF routes into
    /// the expansion I/O pages; the rest is the machine's I/O bank.
    pub fn ultimax_d000_dfff_read(&mut self, machine: &mut dyn Machine, addr: u16) -> u8 {
        if let Some(value) = self.main.ultimax_d000_read(machine, addr) {
            return value;
        }
        match addr {
            IO1_START..=IO1_END => self.io1_read(machine, addr),
            IO2_START..=IO2_END => self.io2_read(machine, addr),
            _ => machine.mem_read_without_ultimax(addr),
        }
    }

    pub fn ultimax_d000_dfff_store(&mut self, machine: &mut dyn Machine, addr: u16, value: u8) {
        if self.main.ultimax_d000_store(machine, addr, value) {
            return;
        }
        match addr {
            IO1_START..=IO1_END => self.io1_store(machine, addr, value),
            IO2_START..=IO2_END => self.io2_store(machine, addr, value),
            _ => machine.mem_store_without_ultimax(addr, value),
        }
    }

    //
    // Expansion I/O pages
    //

    fn slot_io_read(
        slot: &mut Option<Box<dyn SlotDevice>>,
        bus: &mut BusState,
        machine: &mut dyn Machine,
        addr: u16,
    ) -> Option<u8> {
        slot.as_mut()
            .filter(|device| device.is_enabled())
            .and_then(|device| device.io_read(bus, machine, addr))
    }

    pub fn io1_read(&mut self, machine: &mut dyn Machine, addr: u16) -> u8 {
        let owner = self.bus.io.device_at(addr).map(|source| source.owner);
        let value = match owner {
            Some(IoOwner::Slot0) => Self::slot_io_read(&mut self.slot0, &mut self.bus, machine, addr),
            Some(IoOwner::Slot1) => Self::slot_io_read(&mut self.slot1, &mut self.bus, machine, addr),
            Some(IoOwner::MainSlot) => self.main.io1_read(&mut self.bus, machine, addr),
            None => None,
        };
        // A device may decode the access for its side effects and still
        // leave the bus floating.
        value.unwrap_or_else(|| machine.vic_phi1_read())
    }

    pub fn io1_store(&mut self, machine: &mut dyn Machine, addr: u16, value: u8) {
        let owner = self.bus.io.device_at(addr).map(|source| source.owner);
        match owner {
            Some(IoOwner::Slot0) => {
                if let Some(device) = self.slot0.as_mut().filter(|d| d.is_enabled()) {
                    device.io_store(&mut self.bus, machine, addr, value);
                }
            }
            Some(IoOwner::Slot1) => {
                if let Some(device) = self.slot1.as_mut().filter(|d| d.is_enabled()) {
                    device.io_store(&mut self.bus, machine, addr, value);
                }
            }
            Some(IoOwner::MainSlot) => self.main.io1_store(&mut self.bus, machine, addr, value),
            None => {}
        }
    }

    pub fn io1_peek(&mut self, machine: &mut dyn Machine, addr: u16) -> u8 {
        let owner = self.bus.io.device_at(addr).map(|source| source.owner);
        let value = match owner {
            Some(IoOwner::Slot0) => self
                .slot0
                .as_mut()
                .filter(|d| d.is_enabled())
                .and_then(|d| d.io_peek(&mut self.bus, machine, addr)),
            Some(IoOwner::Slot1) => self
                .slot1
                .as_mut()
                .filter(|d| d.is_enabled())
                .and_then(|d| d.io_peek(&mut self.bus, machine, addr)),
            Some(IoOwner::MainSlot) => self.main.io1_peek(&self.bus, addr),
            None => None,
        };
        value.unwrap_or_else(|| machine.vic_phi1_read())
    }

    pub fn io2_read(&mut self, machine: &mut dyn Machine, addr: u16) -> u8 {
        let owner = self.bus.io.device_at(addr).map(|source| source.owner);
        let value = match owner {
            Some(IoOwner::Slot0) => Self::slot_io_read(&mut self.slot0, &mut self.bus, machine, addr),
            Some(IoOwner::Slot1) => Self::slot_io_read(&mut self.slot1, &mut self.bus, machine, addr),
            Some(IoOwner::MainSlot) => self.main.io2_read(&mut self.bus, machine, addr),
            None => None,
        };
        value.unwrap_or_else(|| machine.vic_phi1_read())
    }

    pub fn io2_store(&mut self, machine: &mut dyn Machine, addr: u16, value: u8) {
        let owner = self.bus.io.device_at(addr).map(|source| source.owner);
        match owner {
            Some(IoOwner::Slot0) => {
                if let Some(device) = self.slot0.as_mut().filter(|d| d.is_enabled()) {
                    device.io_store(&mut self.bus, machine, addr, value);
                }
            }
            Some(IoOwner::Slot1) => {
                if let Some(device) = self.slot1.as_mut().filter(|d| d.is_enabled()) {
                    device.io_store(&mut self.bus, machine, addr, value);
                }
            }
            Some(IoOwner::MainSlot) => self.main.io2_store(&mut self.bus, machine, addr, value),
            None => {}
        }
    }

    pub fn io2_peek(&mut self, machine: &mut dyn Machine, addr: u16) -> u8 {
        let owner = self.bus.io.device_at(addr).map(|source| source.owner);
        let value = match owner {
            Some(IoOwner::Slot0) => self
                .slot0
                .as_mut()
                .filter(|d| d.is_enabled())
                .and_then(|d| d.io_peek(&mut self.bus, machine, addr)),
            Some(IoOwner::Slot1) => self
                .slot1
                .as_mut()
                .filter(|d| d.is_enabled())
                .and_then(|d| d.io_peek(&mut self.bus, machine, addr)),
            Some(IoOwner::MainSlot) => self.main.io2_peek(&self.bus, addr),
            None => None,
        };
        value.unwrap_or_else(|| machine.vic_phi1_read())
    }

    //
    // Monitor
    //

    /// Read cartridge-visible memory without side effects, for a monitor
    /// or debugger.
    pub fn peek_mem(&mut self, machine: &mut dyn Machine, addr: u16) -> u8 {
        if let Some(device) = self.slot0.as_mut().filter(|d| d.is_enabled()) {
            if let Some(value) = device.peek(&mut self.bus, machine, addr) {
                return value;
            }
        }
        if let Some(device) = self.slot1.as_mut().filter(|d| d.is_enabled()) {
            if let Some(value) = device.peek(&mut self.bus, machine, addr) {
                return value;
            }
        }

        if (0x8000..=0x9FFF).contains(&addr) {
            return self.main.roml_peek(&self.bus, machine, addr);
        }
        let ultimax = self.bus.signals.game && !self.bus.signals.exrom;
        if ultimax {
            if addr >= 0xE000 {
                return self.main.romh_peek(&self.bus, machine, addr);
            }
        } else if (0xA000..=0xBFFF).contains(&addr) {
            return self.main.romh_peek(&self.bus, machine, addr);
        }
        machine.ram_read(addr)
    }
}

fn stage_crt(image: &CrtImage) -> Result<StagedCart, CartridgeError> {
    use crate::cart::{atomicpower, capture, dinamic, eprom, epyx, simple};

    let id = image.header.hardware;
    if id == 0 {
        return generic::crt_attach(image);
    }
    let Some(kind) = HardwareType::from_crt_id(id) else {
        return Err(CartridgeError::UnsupportedHardware(id));
    };
    match kind {
        HardwareType::SimonsBasic => simple::simonsbasic_crt_attach(image),
        HardwareType::FunPlay => simple::funplay_crt_attach(image),
        HardwareType::AtomicPower => atomicpower::crt_attach(image),
        HardwareType::EpyxFastload => epyx::crt_attach(image),
        HardwareType::Westermann => simple::westermann_crt_attach(image),
        HardwareType::RexUtility => simple::rexutility_crt_attach(image),
        HardwareType::Dinamic => dinamic::crt_attach(image),
        HardwareType::StructuredBasic => simple::stb_crt_attach(image),
        HardwareType::Ross => simple::ross_crt_attach(image),
        HardwareType::DelaEp7x8 => eprom::delaep7x8_crt_attach(image),
        HardwareType::DelaEp256 => eprom::delaep256_crt_attach(image),
        HardwareType::RexEp256 => eprom::rexep256_crt_attach(image),
        HardwareType::MikroAssembler => simple::mikroass_crt_attach(image),
        HardwareType::Capture => capture::crt_attach(image),
        HardwareType::Mach5 => simple::mach5_crt_attach(image),
        _ => Err(CartridgeError::UnsupportedHardware(id)),
    }
}

fn stage_bin(kind: HardwareType, data: &[u8]) -> Result<StagedCart, CartridgeError> {
    use crate::cart::generic::GenericKind;
    use crate::cart::{atomicpower, capture, dinamic, eprom, epyx, simple};

    match kind {
        HardwareType::Generic8k => generic::bin_attach(GenericKind::Rom8k, data),
        HardwareType::Generic16k => generic::bin_attach(GenericKind::Rom16k, data),
        HardwareType::Ultimax => generic::bin_attach(GenericKind::Ultimax, data),
        HardwareType::SimonsBasic => simple::simonsbasic_bin_attach(data),
        HardwareType::FunPlay => simple::funplay_bin_attach(data),
        HardwareType::AtomicPower => atomicpower::bin_attach(data),
        HardwareType::EpyxFastload => epyx::bin_attach(data),
        HardwareType::Westermann => simple::westermann_bin_attach(data),
        HardwareType::RexUtility => simple::rexutility_bin_attach(data),
        HardwareType::Dinamic => dinamic::bin_attach(data),
        HardwareType::StructuredBasic => simple::stb_bin_attach(data),
        HardwareType::Ross => simple::ross_bin_attach(data),
        HardwareType::DelaEp7x8 => eprom::delaep7x8_bin_attach(data),
        HardwareType::DelaEp256 => eprom::delaep256_bin_attach(data),
        HardwareType::RexEp256 => eprom::rexep256_bin_attach(data),
        HardwareType::MikroAssembler => simple::mikroass_bin_attach(data),
        HardwareType::Capture => capture::bin_attach(data),
        HardwareType::Mach5 => simple::mach5_bin_attach(data),
        HardwareType::Crt => Err(CartridgeError::WrongFileFormat),
        other => Err(CartridgeError::UnsupportedHardware(other.crt_id().max(0) as u16)),
    }
}
