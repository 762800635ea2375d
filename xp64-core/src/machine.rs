//! The seam between the expansion port and the rest of the machine.
//!
//! The port never touches the CPU, the PLA or the VIC-II directly; it calls
//! through this trait. The embedding emulator implements it once, test code
//! implements it with recording doubles.

/// Machine services consumed by the expansion port.
///
/// All methods take `&mut self` because the embedder usually wants to
/// record or react to these calls; the port itself is single-threaded and
/// never re-enters the trait from within a callback.
pub trait Machine {
    /// The GAME/EXROM lines or the active bank changed; the machine must
    /// rebuild its memory configuration before the next access.
    fn pla_config_changed(&mut self);

    /// Flush CPU-side alarms that are due before memory visibility changes.
    /// `rmw_write` is true when the change was caused by a write access, so
    /// the 6510's read-modify-write pattern stays coherent.
    fn handle_pending_alarms(&mut self, rmw_write: bool);

    /// Assert the NMI line (freeze button, cartridge-requested NMI).
    fn nmi_set(&mut self);

    /// Stop asserting the NMI line (freeze released).
    fn nmi_release(&mut self);

    /// The byte the VIC-II fetched last on phi1. This is what an open bus
    /// reads as; it is machine state, never a constant.
    fn vic_phi1_read(&mut self) -> u8;

    /// Read C64 memory as if the cartridge were not forcing ultimax.
    /// Used by carts that fake a different mapping while structurally in
    /// ultimax config.
    fn mem_read_without_ultimax(&mut self, addr: u16) -> u8;

    /// Store counterpart of [`Machine::mem_read_without_ultimax`].
    fn mem_store_without_ultimax(&mut self, addr: u16, value: u8);

    /// Raw system RAM read, bypassing the memory configuration entirely.
    fn ram_read(&mut self, addr: u16) -> u8;

    /// Raw system RAM store, bypassing the memory configuration entirely.
    fn ram_store(&mut self, addr: u16, value: u8);
}
