//! Slot-0 and slot-1 expansion hardware.
//!
//! Besides the main-slot cartridge, up to one slot-0 device (pass-through
//! hardware like MMC64 or an IEEE488 interface) and one slot-1 device
//! (RAMCART, ISEPIC and friends) can be active at the same time. For every
//! bus access the dispatcher consults slot 0 first, then slot 1, then the
//! main slot; the first enabled device that claims the access answers it.

use crate::io::IoSource;
use crate::machine::Machine;
use crate::port::BusState;

/// A device plugged into slot 0 or slot 1.
///
/// Window hooks return `Some(value)` (or `true` for stores) when the device
/// claims the access. Returning `None`/`false` lets the access fall through
/// to the next priority tier. A disabled device is never consulted.
pub trait SlotDevice {
    fn name(&self) -> &'static str;

    /// Whether the device currently claims bus accesses at all.
    fn is_enabled(&self) -> bool;

    /// I/O window claims to register while the device is installed.
    fn io_claims(&self) -> Vec<IoSource> {
        Vec::new()
    }

    /// Called when the device is installed into a port.
    fn install(&mut self, bus: &mut BusState, machine: &mut dyn Machine) {
        let _ = (bus, machine);
    }

    /// Called when the device is removed from a port.
    fn uninstall(&mut self, bus: &mut BusState, machine: &mut dyn Machine) {
        let _ = (bus, machine);
    }

    fn reset(&mut self, bus: &mut BusState, machine: &mut dyn Machine) {
        let _ = (bus, machine);
    }

    fn roml_read(&mut self, bus: &mut BusState, machine: &mut dyn Machine, addr: u16) -> Option<u8> {
        let _ = (bus, machine, addr);
        None
    }

    fn roml_store(
        &mut self,
        bus: &mut BusState,
        machine: &mut dyn Machine,
        addr: u16,
        value: u8,
    ) -> bool {
        let _ = (bus, machine, addr, value);
        false
    }

    fn romh_read(&mut self, bus: &mut BusState, machine: &mut dyn Machine, addr: u16) -> Option<u8> {
        let _ = (bus, machine, addr);
        None
    }

    fn io_read(&mut self, bus: &mut BusState, machine: &mut dyn Machine, addr: u16) -> Option<u8> {
        let _ = (bus, machine, addr);
        None
    }

    fn io_store(&mut self, bus: &mut BusState, machine: &mut dyn Machine, addr: u16, value: u8) {
        let _ = (bus, machine, addr, value);
    }

    /// Monitor read without side effects.
    fn io_peek(&mut self, bus: &mut BusState, machine: &mut dyn Machine, addr: u16) -> Option<u8> {
        let _ = (bus, machine, addr);
        None
    }

    /// Monitor read of the ROM windows without side effects.
    fn peek(&mut self, bus: &mut BusState, machine: &mut dyn Machine, addr: u16) -> Option<u8> {
        let _ = (bus, machine, addr);
        None
    }
}
