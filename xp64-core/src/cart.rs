//! Cartridge type registry and main-slot dispatch.
//!
//! Every cartridge design gets a [`HardwareType`] tag (ids match the CRT
//! container's hardware field). The state machines of the implemented
//! designs live in the submodules; [`MainSlotCart`] holds the state of the
//! currently attached one and routes each bus window to it.

pub(crate) mod atomicpower;
pub(crate) mod capture;
pub(crate) mod dinamic;
pub(crate) mod eprom;
pub(crate) mod epyx;
pub(crate) mod generic;
pub(crate) mod ramcart;
pub(crate) mod simple;

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use xp64_proc_macros::HardwareLabel;

use crate::machine::Machine;
use crate::port::BusState;

use atomicpower::AtomicPower;
use capture::Capture;
use dinamic::Dinamic;
use eprom::{DelaEp256, DelaEp7x8, RexEp256};
use epyx::EpyxFastload;
use generic::GenericCart;
use simple::{
    FunPlay, Mach5, MikroAssembler, RexUtility, Ross, SimonsBasic, StructuredBasic, Westermann,
};

/// Every cartridge design the port knows by name. Ids above zero match the
/// CRT container's hardware field; the rest are attach selectors for
/// headerless images and slot devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, HardwareLabel)]
pub enum HardwareType {
    #[label("None")]
    None,
    #[label("CRT container")]
    Crt,
    #[label("Generic 8K")]
    Generic8k,
    #[label("Generic 16K")]
    Generic16k,
    #[label("Ultimax")]
    Ultimax,
    #[label("RAMCART")]
    Ramcart,
    #[label("Action Replay")]
    ActionReplay,
    #[label("KCS Power Cartridge")]
    KcsPower,
    #[label("Final Cartridge III")]
    FinalIii,
    #[label("Simons' Basic")]
    SimonsBasic,
    Ocean,
    #[label("Expert Cartridge")]
    Expert,
    #[label("Fun Play")]
    FunPlay,
    #[label("Super Games")]
    SuperGames,
    #[label("Atomic Power")]
    AtomicPower,
    #[label("Epyx Fastload")]
    EpyxFastload,
    Westermann,
    #[label("REX Utility")]
    RexUtility,
    #[label("Final Cartridge I")]
    FinalI,
    #[label("Magic Formel")]
    MagicFormel,
    #[label("C64 Games System")]
    Gs,
    #[label("Warp Speed")]
    Warpspeed,
    Dinamic,
    Zaxxon,
    #[label("Magic Desk")]
    MagicDesk,
    #[label("Super Snapshot V5")]
    SuperSnapshotV5,
    #[label("Comal-80")]
    Comal80,
    #[label("Structured Basic")]
    StructuredBasic,
    Ross,
    #[label("Dela EP64")]
    DelaEp64,
    #[label("Dela EP7x8")]
    DelaEp7x8,
    #[label("Dela EP256")]
    DelaEp256,
    #[label("REX EP256")]
    RexEp256,
    #[label("Mikro Assembler")]
    MikroAssembler,
    #[label("Final Cartridge Plus")]
    FinalPlus,
    #[label("Action Replay MK4")]
    ActionReplay4,
    #[label("StarDOS")]
    Stardos,
    EasyFlash,
    #[label("EasyFlash Xbank")]
    EasyFlashXbank,
    Capture,
    #[label("Action Replay MK3")]
    ActionReplay3,
    #[label("Retro Replay")]
    RetroReplay,
    #[label("MMC64")]
    Mmc64,
    #[label("MMC Replay")]
    MmcReplay,
    #[label("IDE64")]
    Ide64,
    #[label("Super Snapshot V4")]
    SuperSnapshotV4,
    #[label("IEEE488 Interface")]
    Ieee488,
    #[label("Game Killer")]
    GameKiller,
    #[label("Prophet 64")]
    Prophet64,
    #[label("EXOS")]
    Exos,
    #[label("Freeze Frame")]
    FreezeFrame,
    #[label("Freeze Machine")]
    FreezeMachine,
    #[label("Snapshot 64")]
    Snapshot64,
    #[label("Super Explode V5")]
    SuperExplodeV5,
    #[label("Magic Voice")]
    MagicVoice,
    #[label("Action Replay MK2")]
    ActionReplay2,
    #[label("Mach 5")]
    Mach5,
    #[label("Diashow Maker")]
    DiashowMaker,
}

impl HardwareType {
    pub const ALL: [Self; 58] = [
        Self::None,
        Self::Crt,
        Self::Generic8k,
        Self::Generic16k,
        Self::Ultimax,
        Self::Ramcart,
        Self::ActionReplay,
        Self::KcsPower,
        Self::FinalIii,
        Self::SimonsBasic,
        Self::Ocean,
        Self::Expert,
        Self::FunPlay,
        Self::SuperGames,
        Self::AtomicPower,
        Self::EpyxFastload,
        Self::Westermann,
        Self::RexUtility,
        Self::FinalI,
        Self::MagicFormel,
        Self::Gs,
        Self::Warpspeed,
        Self::Dinamic,
        Self::Zaxxon,
        Self::MagicDesk,
        Self::SuperSnapshotV5,
        Self::Comal80,
        Self::StructuredBasic,
        Self::Ross,
        Self::DelaEp64,
        Self::DelaEp7x8,
        Self::DelaEp256,
        Self::RexEp256,
        Self::MikroAssembler,
        Self::FinalPlus,
        Self::ActionReplay4,
        Self::Stardos,
        Self::EasyFlash,
        Self::EasyFlashXbank,
        Self::Capture,
        Self::ActionReplay3,
        Self::RetroReplay,
        Self::Mmc64,
        Self::MmcReplay,
        Self::Ide64,
        Self::SuperSnapshotV4,
        Self::Ieee488,
        Self::GameKiller,
        Self::Prophet64,
        Self::Exos,
        Self::FreezeFrame,
        Self::FreezeMachine,
        Self::Snapshot64,
        Self::SuperExplodeV5,
        Self::MagicVoice,
        Self::ActionReplay2,
        Self::Mach5,
        Self::DiashowMaker,
    ];

    /// The id used by the CRT container's hardware field. Negative values
    /// are internal selectors that never appear in a container.
    pub fn crt_id(self) -> i32 {
        match self {
            Self::None => -1,
            Self::Generic16k => -2,
            Self::Generic8k => -3,
            Self::Ultimax => -6,
            Self::Ramcart => -104,
            Self::Crt => 0,
            Self::ActionReplay => 1,
            Self::KcsPower => 2,
            Self::FinalIii => 3,
            Self::SimonsBasic => 4,
            Self::Ocean => 5,
            Self::Expert => 6,
            Self::FunPlay => 7,
            Self::SuperGames => 8,
            Self::AtomicPower => 9,
            Self::EpyxFastload => 10,
            Self::Westermann => 11,
            Self::RexUtility => 12,
            Self::FinalI => 13,
            Self::MagicFormel => 14,
            Self::Gs => 15,
            Self::Warpspeed => 16,
            Self::Dinamic => 17,
            Self::Zaxxon => 18,
            Self::MagicDesk => 19,
            Self::SuperSnapshotV5 => 20,
            Self::Comal80 => 21,
            Self::StructuredBasic => 22,
            Self::Ross => 23,
            Self::DelaEp64 => 24,
            Self::DelaEp7x8 => 25,
            Self::DelaEp256 => 26,
            Self::RexEp256 => 27,
            Self::MikroAssembler => 28,
            Self::FinalPlus => 29,
            Self::ActionReplay4 => 30,
            Self::Stardos => 31,
            Self::EasyFlash => 32,
            Self::EasyFlashXbank => 33,
            Self::Capture => 34,
            Self::ActionReplay3 => 35,
            Self::RetroReplay => 36,
            Self::Mmc64 => 37,
            Self::MmcReplay => 38,
            Self::Ide64 => 39,
            Self::SuperSnapshotV4 => 40,
            Self::Ieee488 => 41,
            Self::GameKiller => 42,
            Self::Prophet64 => 43,
            Self::Exos => 44,
            Self::FreezeFrame => 45,
            Self::FreezeMachine => 46,
            Self::Snapshot64 => 47,
            Self::SuperExplodeV5 => 48,
            Self::MagicVoice => 49,
            Self::ActionReplay2 => 50,
            Self::Mach5 => 51,
            Self::DiashowMaker => 52,
        }
    }

    /// Look a type up by the CRT container hardware field. Id 0 is the
    /// plain ROM cartridge and resolves through the header lines instead.
    pub fn from_crt_id(id: u16) -> Option<Self> {
        static BY_ID: Lazy<HashMap<u16, HardwareType>> = Lazy::new(|| {
            HardwareType::ALL
                .iter()
                .filter(|hw| hw.crt_id() > 0)
                .map(|&hw| (hw.crt_id() as u16, hw))
                .collect()
        });
        BY_ID.get(&id).copied()
    }

    /// Whether a main-slot state machine exists for this type.
    pub fn is_supported(self) -> bool {
        matches!(
            self,
            Self::Generic8k
                | Self::Generic16k
                | Self::Ultimax
                | Self::SimonsBasic
                | Self::FunPlay
                | Self::AtomicPower
                | Self::EpyxFastload
                | Self::Westermann
                | Self::RexUtility
                | Self::Dinamic
                | Self::StructuredBasic
                | Self::Ross
                | Self::DelaEp7x8
                | Self::DelaEp256
                | Self::RexEp256
                | Self::MikroAssembler
                | Self::Capture
                | Self::Mach5
        )
    }
}

/// Staging area produced by the per-cartridge attach routines. Nothing in
/// here touches the port until the whole image has validated.
pub(crate) struct StagedCart {
    pub(crate) cart: MainSlotCart,
    /// Bytes for the start of the ROML image.
    pub(crate) roml: Vec<u8>,
    /// Bytes for the start of the ROMH image.
    pub(crate) romh: Vec<u8>,
    /// Clear this many bytes of cartridge RAM at install time.
    pub(crate) clear_export_ram: Option<usize>,
    /// Initial mapping applied right after install (the reset handler may
    /// pick a different one later).
    pub(crate) setup_mode: (u8, u8),
}

impl StagedCart {
    pub(crate) fn new(cart: MainSlotCart) -> Self {
        Self {
            cart,
            roml: Vec::new(),
            romh: Vec::new(),
            clear_export_ram: None,
            setup_mode: (0, 0),
        }
    }
}

/// State of the cartridge in the main slot.
#[allow(clippy::large_enum_variant)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) enum MainSlotCart {
    None,
    Generic(GenericCart),
    AtomicPower(AtomicPower),
    Capture(Capture),
    EpyxFastload(EpyxFastload),
    Dinamic(Dinamic),
    SimonsBasic(SimonsBasic),
    Westermann(Westermann),
    MikroAssembler(MikroAssembler),
    Mach5(Mach5),
    RexUtility(RexUtility),
    Ross(Ross),
    StructuredBasic(StructuredBasic),
    FunPlay(FunPlay),
    DelaEp256(DelaEp256),
    DelaEp7x8(DelaEp7x8),
    RexEp256(RexEp256),
    /// A type tag that reached dispatch without a handler. Attaching one
    /// is rejected up front, so hitting this at runtime is a logic defect;
    /// accesses log and fall back to the generic handler.
    Unsupported(HardwareType),
}

impl MainSlotCart {
    pub(crate) fn kind(&self) -> HardwareType {
        match self {
            Self::None => HardwareType::None,
            Self::Generic(cart) => match cart.kind {
                generic::GenericKind::Rom8k => HardwareType::Generic8k,
                generic::GenericKind::Rom16k => HardwareType::Generic16k,
                generic::GenericKind::Ultimax => HardwareType::Ultimax,
            },
            Self::AtomicPower(_) => HardwareType::AtomicPower,
            Self::Capture(_) => HardwareType::Capture,
            Self::EpyxFastload(_) => HardwareType::EpyxFastload,
            Self::Dinamic(_) => HardwareType::Dinamic,
            Self::SimonsBasic(_) => HardwareType::SimonsBasic,
            Self::Westermann(_) => HardwareType::Westermann,
            Self::MikroAssembler(_) => HardwareType::MikroAssembler,
            Self::Mach5(_) => HardwareType::Mach5,
            Self::RexUtility(_) => HardwareType::RexUtility,
            Self::Ross(_) => HardwareType::Ross,
            Self::StructuredBasic(_) => HardwareType::StructuredBasic,
            Self::FunPlay(_) => HardwareType::FunPlay,
            Self::DelaEp256(_) => HardwareType::DelaEp256,
            Self::DelaEp7x8(_) => HardwareType::DelaEp7x8,
            Self::RexEp256(_) => HardwareType::RexEp256,
            Self::Unsupported(kind) => *kind,
        }
    }

    fn invalid_dispatch(&self, window: &str, addr: u16) {
        log::error!(
            "no main-slot handler for {} in {window} (addr ${addr:04X}); \
             falling back to the generic handler",
            self.kind()
        );
    }

    //
    // ROML window ($8000-$9FFF)
    //

    pub(crate) fn roml_read(
        &mut self,
        bus: &mut BusState,
        machine: &mut dyn Machine,
        addr: u16,
    ) -> u8 {
        match self {
            Self::AtomicPower(cart) => cart.roml_read(bus, addr),
            Self::EpyxFastload(cart) => cart.roml_read(bus, machine, addr),
            // Fake ultimax: the window actually shows the normal mapping.
            Self::Capture(_) => machine.mem_read_without_ultimax(addr),
            Self::Unsupported(_) => {
                self.invalid_dispatch("ROML read", addr);
                generic::roml_read(bus, addr)
            }
            _ => generic::roml_read(bus, addr),
        }
    }

    /// ROML store in ultimax config.
    pub(crate) fn roml_store(
        &mut self,
        bus: &mut BusState,
        machine: &mut dyn Machine,
        addr: u16,
        value: u8,
    ) {
        match self {
            Self::AtomicPower(cart) => cart.roml_store(bus, addr, value),
            Self::Capture(_) => machine.mem_store_without_ultimax(addr, value),
            Self::Unsupported(_) => self.invalid_dispatch("ROML store", addr),
            // ROM without a RAM overlay: the write dies on the bus.
            _ => {}
        }
    }

    /// ROML store in 8K/16K game config. The write always reaches the RAM
    /// under the ROM; carts with a RAM overlay update it first.
    pub(crate) fn roml_no_ultimax_store(
        &mut self,
        bus: &mut BusState,
        machine: &mut dyn Machine,
        addr: u16,
        value: u8,
    ) {
        match self {
            Self::AtomicPower(cart) => cart.roml_store(bus, addr, value),
            Self::Unsupported(_) => self.invalid_dispatch("ROML game store", addr),
            _ => {}
        }
        machine.ram_store(addr, value);
    }

    pub(crate) fn roml_peek(&self, bus: &BusState, machine: &mut dyn Machine, addr: u16) -> u8 {
        match self {
            Self::AtomicPower(cart) => cart.roml_read(bus, addr),
            Self::EpyxFastload(cart) => cart.roml_peek(bus, addr),
            Self::Capture(_) => machine.ram_read(addr),
            _ => generic::roml_read(bus, addr),
        }
    }

    //
    // ROMH window ($A000-$BFFF in 16K game, $E000-$FFFF in ultimax)
    //

    pub(crate) fn romh_read(
        &mut self,
        bus: &mut BusState,
        machine: &mut dyn Machine,
        addr: u16,
    ) -> u8 {
        match self {
            Self::AtomicPower(cart) => cart.romh_read(bus, addr),
            Self::Capture(cart) => cart.romh_read(bus, machine, addr),
            Self::Unsupported(_) => {
                self.invalid_dispatch("ROMH read", addr);
                generic::romh_read(bus, addr)
            }
            _ => generic::romh_read(bus, addr),
        }
    }

    /// ROMH read when the high ROM window ($E000) is selected. Only carts
    /// that treat VIC and CPU fetches differently would diverge from
    /// [`MainSlotCart::romh_read`]; none of the modeled ones do.
    pub(crate) fn ultimax_romh_read_hirom(
        &mut self,
        bus: &mut BusState,
        machine: &mut dyn Machine,
        addr: u16,
    ) -> u8 {
        self.romh_read(bus, machine, addr)
    }

    /// ROMH store in ultimax config.
    pub(crate) fn romh_store(
        &mut self,
        bus: &mut BusState,
        machine: &mut dyn Machine,
        addr: u16,
        value: u8,
    ) {
        let _ = bus;
        match self {
            Self::Capture(cart) => cart.romh_store(machine, addr, value),
            Self::Unsupported(_) => self.invalid_dispatch("ROMH store", addr),
            _ => {}
        }
    }

    /// ROMH store in 16K game config; the RAM under the ROM always takes
    /// the write.
    pub(crate) fn romh_no_ultimax_store(
        &mut self,
        bus: &mut BusState,
        machine: &mut dyn Machine,
        addr: u16,
        value: u8,
    ) {
        match self {
            Self::AtomicPower(cart) => cart.romh_store(bus, addr, value),
            Self::Unsupported(_) => self.invalid_dispatch("ROMH game store", addr),
            _ => {}
        }
        machine.ram_store(addr, value);
    }

    pub(crate) fn romh_peek(&self, bus: &BusState, machine: &mut dyn Machine, addr: u16) -> u8 {
        match self {
            Self::AtomicPower(cart) => cart.romh_read(bus, addr),
            Self::Capture(cart) => cart.romh_peek(bus, machine, addr),
            _ => generic::romh_read(bus, addr),
        }
    }

    //
    // VIC-II fetches from the high ROM window
    //

    pub(crate) fn romh_phi1_read(
        &mut self,
        bus: &mut BusState,
        machine: &mut dyn Machine,
        addr: u16,
    ) -> u8 {
        match self {
            Self::Generic(_) => generic::romh_read(bus, addr),
            _ => self.ultimax_romh_read_hirom(bus, machine, addr),
        }
    }

    pub(crate) fn romh_phi2_read(
        &mut self,
        bus: &mut BusState,
        machine: &mut dyn Machine,
        addr: u16,
    ) -> u8 {
        self.romh_phi1_read(bus, machine, addr)
    }

    //
    // Ultimax fallback windows
    //

    pub(crate) fn ultimax_low_read(
        &mut self,
        bus: &mut BusState,
        machine: &mut dyn Machine,
        addr: u16,
    ) -> u8 {
        match self {
            Self::Capture(cart) => cart.low_read(bus, machine, addr),
            Self::Unsupported(_) => {
                self.invalid_dispatch("ultimax $1000-$7FFF read", addr);
                machine.vic_phi1_read()
            }
            _ => machine.vic_phi1_read(),
        }
    }

    pub(crate) fn ultimax_low_store(
        &mut self,
        bus: &mut BusState,
        machine: &mut dyn Machine,
        addr: u16,
        value: u8,
    ) {
        match self {
            Self::Capture(cart) => cart.low_store(bus, machine, addr, value),
            Self::Unsupported(_) => self.invalid_dispatch("ultimax $1000-$7FFF store", addr),
            _ => {}
        }
    }

    pub(crate) fn ultimax_a000_read(
        &mut self,
        bus: &mut BusState,
        machine: &mut dyn Machine,
        addr: u16,
    ) -> u8 {
        let _ = bus;
        match self {
            Self::Capture(_) => machine.mem_read_without_ultimax(addr),
            Self::Unsupported(_) => {
                self.invalid_dispatch("ultimax $A000-$BFFF read", addr);
                machine.vic_phi1_read()
            }
            _ => machine.vic_phi1_read(),
        }
    }

    pub(crate) fn ultimax_a000_store(
        &mut self,
        machine: &mut dyn Machine,
        addr: u16,
        value: u8,
    ) {
        match self {
            Self::Capture(_) => machine.mem_store_without_ultimax(addr, value),
            Self::Unsupported(_) => self.invalid_dispatch("ultimax $A000-$BFFF store", addr),
            _ => {}
        }
    }

    pub(crate) fn ultimax_c000_read(&mut self, machine: &mut dyn Machine, addr: u16) -> u8 {
        match self {
            Self::Capture(_) => machine.mem_read_without_ultimax(addr),
            Self::Unsupported(_) => {
                self.invalid_dispatch("ultimax $C000-$CFFF read", addr);
                machine.vic_phi1_read()
            }
            _ => machine.vic_phi1_read(),
        }
    }

    pub(crate) fn ultimax_c000_store(
        &mut self,
        machine: &mut dyn Machine,
        addr: u16,
        value: u8,
    ) {
        match self {
            Self::Capture(_) => machine.mem_store_without_ultimax(addr, value),
            Self::Unsupported(_) => self.invalid_dispatch("ultimax $C000-$CFFF store", addr),
            _ => {}
        }
    }

    /// The $D000-$DFFF window in ultimax config. Fake-ultimax carts show
    /// the normal I/O + color RAM mapping; for everything else the access
    /// goes to the machine's I/O bank, which routes $DE00-$DFFF back into
    /// the expansion port.
    pub(crate) fn ultimax_d000_read(&mut self, machine: &mut dyn Machine, addr: u16) -> Option<u8> {
        match self {
            Self::Capture(_) => Some(machine.mem_read_without_ultimax(addr)),
            Self::Unsupported(_) => {
                self.invalid_dispatch("ultimax $D000-$DFFF read", addr);
                None
            }
            _ => None,
        }
    }

    pub(crate) fn ultimax_d000_store(
        &mut self,
        machine: &mut dyn Machine,
        addr: u16,
        value: u8,
    ) -> bool {
        match self {
            Self::Capture(_) => {
                machine.mem_store_without_ultimax(addr, value);
                true
            }
            Self::Unsupported(_) => {
                self.invalid_dispatch("ultimax $D000-$DFFF store", addr);
                false
            }
            _ => false,
        }
    }

    //
    // I/O windows
    //

    pub(crate) fn io1_read(
        &mut self,
        bus: &mut BusState,
        machine: &mut dyn Machine,
        addr: u16,
    ) -> Option<u8> {
        match self {
            Self::EpyxFastload(cart) => cart.io1_read(bus, machine),
            Self::Dinamic(cart) => cart.io1_read(bus, addr),
            Self::SimonsBasic(cart) => cart.io1_read(bus, machine),
            Self::MikroAssembler(cart) => cart.io1_read(bus, addr),
            Self::Mach5(cart) => cart.io1_read(bus, addr),
            Self::Ross(cart) => cart.io1_read(bus),
            Self::StructuredBasic(cart) => cart.io1_read(bus, machine, addr),
            _ => None,
        }
    }

    pub(crate) fn io1_store(
        &mut self,
        bus: &mut BusState,
        machine: &mut dyn Machine,
        addr: u16,
        value: u8,
    ) {
        match self {
            Self::AtomicPower(cart) => cart.io1_store(bus, machine, value),
            Self::SimonsBasic(cart) => cart.io1_store(bus, machine),
            Self::Mach5(cart) => cart.io1_store(bus, machine),
            Self::StructuredBasic(cart) => cart.io1_store(bus, machine, addr),
            Self::FunPlay(cart) => cart.io1_store(bus, machine, value),
            Self::DelaEp256(cart) => cart.io1_store(bus, machine, value),
            Self::DelaEp7x8(cart) => cart.io1_store(bus, machine, value),
            _ => {}
        }
    }

    pub(crate) fn io1_peek(&self, bus: &BusState, addr: u16) -> Option<u8> {
        match self {
            Self::EpyxFastload(cart) => cart.io1_peek(),
            Self::Dinamic(cart) => cart.io1_peek(),
            Self::SimonsBasic(cart) => cart.io1_peek(),
            Self::MikroAssembler(cart) => cart.io1_read(bus, addr),
            Self::Mach5(cart) => cart.io1_read(bus, addr),
            Self::Ross(cart) => cart.io1_peek(),
            Self::FunPlay(cart) => cart.io1_peek(),
            Self::DelaEp256(cart) => cart.io1_peek(),
            Self::DelaEp7x8(cart) => cart.io1_peek(),
            _ => None,
        }
    }

    pub(crate) fn io2_read(
        &mut self,
        bus: &mut BusState,
        machine: &mut dyn Machine,
        addr: u16,
    ) -> Option<u8> {
        match self {
            Self::AtomicPower(cart) => cart.io2_read(bus, addr),
            Self::EpyxFastload(cart) => cart.io2_read(bus, addr),
            Self::MikroAssembler(cart) => cart.io2_read(bus, addr),
            Self::Mach5(cart) => cart.io2_read(bus, addr),
            Self::RexUtility(cart) => cart.io2_read(bus, machine, addr),
            Self::Westermann(cart) => cart.io2_read(bus, machine),
            Self::Ross(cart) => cart.io2_read(bus, machine),
            Self::RexEp256(cart) => cart.io2_read(bus, machine, addr),
            _ => None,
        }
    }

    pub(crate) fn io2_store(
        &mut self,
        bus: &mut BusState,
        machine: &mut dyn Machine,
        addr: u16,
        value: u8,
    ) {
        match self {
            Self::AtomicPower(cart) => cart.io2_store(bus, addr, value),
            Self::Mach5(cart) => cart.io2_store(bus, machine),
            Self::RexEp256(cart) => cart.io2_store(bus, addr, value),
            _ => {}
        }
    }

    pub(crate) fn io2_peek(&self, bus: &BusState, addr: u16) -> Option<u8> {
        match self {
            Self::AtomicPower(cart) => cart.io2_read(bus, addr),
            Self::EpyxFastload(cart) => cart.io2_read(bus, addr),
            Self::MikroAssembler(cart) => cart.io2_read(bus, addr),
            Self::Mach5(cart) => cart.io2_read(bus, addr),
            Self::RexUtility(cart) => cart.io2_peek(),
            Self::Westermann(cart) => cart.io2_peek(),
            Self::Ross(cart) => cart.io2_peek(),
            Self::RexEp256(cart) => cart.io2_peek(),
            _ => None,
        }
    }

    //
    // Control
    //

    pub(crate) fn has_freeze(&self) -> bool {
        matches!(self, Self::AtomicPower(_) | Self::Capture(_))
    }

    pub(crate) fn freeze(&mut self, bus: &mut BusState, machine: &mut dyn Machine) {
        match self {
            Self::AtomicPower(cart) => cart.freeze(bus, machine),
            Self::Capture(cart) => cart.freeze(bus, machine),
            _ => {}
        }
    }

    pub(crate) fn reset(&mut self, bus: &mut BusState, machine: &mut dyn Machine) {
        match self {
            Self::AtomicPower(cart) => cart.reset(),
            Self::Capture(cart) => cart.reset(bus, machine),
            Self::EpyxFastload(cart) => cart.reset(bus, machine),
            _ => {}
        }
    }

    pub(crate) fn config_init(&mut self, bus: &mut BusState, machine: &mut dyn Machine) {
        match self {
            Self::None => {}
            Self::Generic(cart) => cart.config_init(bus, machine),
            Self::AtomicPower(cart) => cart.config_init(bus, machine),
            Self::Capture(cart) => cart.config_init(bus, machine),
            Self::EpyxFastload(cart) => cart.config_init(bus, machine),
            Self::Dinamic(cart) => cart.config_init(bus, machine),
            Self::SimonsBasic(cart) => cart.config_init(bus, machine),
            Self::Westermann(cart) => cart.config_init(bus, machine),
            Self::MikroAssembler(cart) => cart.config_init(bus, machine),
            Self::Mach5(cart) => cart.config_init(bus, machine),
            Self::RexUtility(cart) => cart.config_init(bus, machine),
            Self::Ross(cart) => cart.config_init(bus, machine),
            Self::StructuredBasic(cart) => cart.config_init(bus, machine),
            Self::FunPlay(cart) => cart.config_init(bus, machine),
            Self::DelaEp256(cart) => cart.config_init(bus, machine),
            Self::DelaEp7x8(cart) => cart.config_init(bus, machine),
            Self::RexEp256(cart) => cart.config_init(bus, machine),
            Self::Unsupported(_) => {}
        }
    }

    /// Cleanup before the cartridge leaves the slot.
    pub(crate) fn detach(&mut self, bus: &mut BusState) {
        if let Self::EpyxFastload(cart) = self {
            cart.detach(bus);
        }
    }

    /// I/O window claims this cartridge registers while attached, as
    /// `(IO1, IO2)` device names.
    pub(crate) fn io_claims(&self) -> (Option<&'static str>, Option<&'static str>) {
        match self {
            Self::AtomicPower(_) => (Some("Atomic Power"), Some("Atomic Power")),
            Self::EpyxFastload(_) => (Some("EPYX FASTLOAD"), Some("EPYX FASTLOAD")),
            Self::Dinamic(_) => (Some("Dinamic"), None),
            Self::SimonsBasic(_) => (Some("Simon's Basic"), None),
            Self::Westermann(_) => (None, Some("Westermann")),
            Self::MikroAssembler(_) => (Some("MIKRO ASSEMBLER"), Some("MIKRO ASSEMBLER")),
            Self::Mach5(_) => (Some("Mach 5"), Some("Mach 5")),
            Self::RexUtility(_) => (None, Some("REX UTIL CART")),
            Self::Ross(_) => (Some("ROSS"), Some("ROSS")),
            Self::StructuredBasic(_) => (Some("Structured Basic"), None),
            Self::FunPlay(_) => (Some("Fun Play"), None),
            Self::DelaEp256(_) => (Some("DELA EP256"), None),
            Self::DelaEp7x8(_) => (Some("DELA EP7x8"), None),
            Self::RexEp256(_) => (None, Some("REX EP256")),
            _ => (None, None),
        }
    }
}
