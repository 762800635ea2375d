//! Commodore 64 expansion-port emulation.
//!
//! For every CPU or VIC-II access in the cartridge-visible windows
//! ($8000-$9FFF, $A000-$BFFF, $E000-$FFFF, the expansion I/O pages and
//! the ultimax fallback ranges) this crate decides which device answers
//! and what side effects fire: bank switches, freeze NMIs, GAME/EXROM
//! line changes.
//!
//! The embedding emulator owns the CPU, PLA and VIC-II and talks to this
//! crate through two seams: it calls the [`ExpansionPort`] window hooks on
//! every access, and implements [`Machine`] for the services the port
//! consumes (memory-map recomputation, NMI line, open-bus byte, RAM).

pub mod address;
mod alarm;
mod cart;
mod image;
mod io;
mod machine;
mod port;
mod slot;
pub mod snapshot;

pub use cart::ramcart::RamCart;
pub use cart::HardwareType;
pub use image::{CartridgeError, ChipPacket, CrtHeader, CrtImage};
pub use io::{IoConflict, IoHandle, IoOwner, IoRegistry, IoSource};
pub use machine::Machine;
pub use port::{
    BusState, ExpansionPort, PortSignals, CFLAG_EXPORT_RAM, CFLAG_PHI2_RAM, CFLAG_READ,
    CFLAG_RELEASE_FREEZE, CFLAG_TRIGGER_NMI, CFLAG_WRITE, CMODE_16K_GAME, CMODE_8K_GAME,
    CMODE_BANK_MASK, CMODE_BANK_SHIFT, CMODE_RAM, CMODE_ULTIMAX,
};
pub use slot::SlotDevice;
pub use snapshot::SnapshotError;
