//! Whole-port save states.
//!
//! Everything the cartridge subsystem owns (line state, bank registers,
//! ROM/RAM images, pending alarms and the main-slot state machine) is
//! serialized with bincode. Slot-0/slot-1 devices are machine
//! configuration, not run state, so the embedder re-installs those before
//! restoring.

use std::path::Path;
use std::{fs, io};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::alarm::AlarmScheduler;
use crate::cart::MainSlotCart;
use crate::port::{ExpansionPort, PortSignals};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("error serializing/deserializing port state: {source}")]
    Serialization {
        #[from]
        source: bincode::Error,
    },
    #[error("error reading/writing port state: {source}")]
    FileSystem {
        #[from]
        source: io::Error,
    },
    #[error("snapshot conflicts with installed slot devices: {0}")]
    IoConflict(#[from] crate::image::CartridgeError),
}

#[derive(Serialize, Deserialize)]
struct PortState {
    signals: PortSignals,
    roml_banks: Vec<u8>,
    romh_banks: Vec<u8>,
    export_ram0: Vec<u8>,
    roml_bank: usize,
    romh_bank: usize,
    export_ram: bool,
    clock: u64,
    alarms: AlarmScheduler,
    main: MainSlotCart,
}

impl PortState {
    fn capture(port: &ExpansionPort) -> Self {
        Self {
            signals: port.bus.signals,
            roml_banks: port.bus.roml_banks.clone(),
            romh_banks: port.bus.romh_banks.clone(),
            export_ram0: port.bus.export_ram0.clone(),
            roml_bank: port.bus.roml_bank,
            romh_bank: port.bus.romh_bank,
            export_ram: port.bus.export_ram,
            clock: port.bus.clock,
            alarms: port.bus.alarms.clone(),
            main: port.main.clone(),
        }
    }

    fn restore(self, port: &mut ExpansionPort) -> Result<(), SnapshotError> {
        port.bus.signals = self.signals;
        port.bus.roml_banks = self.roml_banks;
        port.bus.romh_banks = self.romh_banks;
        port.bus.export_ram0 = self.export_ram0;
        port.bus.roml_bank = self.roml_bank;
        port.bus.romh_bank = self.romh_bank;
        port.bus.export_ram = self.export_ram;
        port.bus.clock = self.clock;
        port.bus.alarms = self.alarms;
        port.main = self.main;
        port.reclaim_io()?;
        Ok(())
    }
}

/// Write the port's state to `path`.
pub fn save_state<P>(port: &ExpansionPort, path: P) -> Result<(), SnapshotError>
where
    P: AsRef<Path>,
{
    let serialized = bincode::serialize(&PortState::capture(port))?;
    fs::write(path.as_ref(), serialized)?;

    log::info!(
        "wrote expansion port state to '{}'",
        path.as_ref().display()
    );
    Ok(())
}

/// Restore the port's state from `path`. The port keeps its current state
/// when reading or decoding fails; I/O claims are rebuilt to match the
/// restored cartridge.
pub fn load_state<P>(port: &mut ExpansionPort, path: P) -> Result<(), SnapshotError>
where
    P: AsRef<Path>,
{
    let serialized = fs::read(path.as_ref())?;
    let state: PortState = bincode::deserialize(&serialized)?;
    state.restore(port)?;

    log::info!(
        "restored expansion port state from '{}' ({} in the main slot)",
        path.as_ref().display(),
        port.main_type()
    );
    Ok(())
}
