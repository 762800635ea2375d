//! Cartridges whose whole state machine is one or two latches: Simons'
//! Basic, Westermann, Mikro Assembler, Mach 5, REX Utility, Ross,
//! Structured Basic and Fun Play.

use serde::{Deserialize, Serialize};

use crate::cart::{MainSlotCart, StagedCart};
use crate::image::{expect_bin_size, CartridgeError, CrtImage};
use crate::machine::Machine;
use crate::port::{
    BusState, CFLAG_READ, CFLAG_WRITE, CMODE_8K_GAME, CMODE_BANK_SHIFT, CMODE_RAM,
};

/// Simons' Basic: 16K ROM. Reading IO1 drops to 8K config (BASIC
/// extension hidden), writing IO1 brings the full 16K back.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub(crate) struct SimonsBasic;

impl SimonsBasic {
    pub(crate) fn io1_read(&self, bus: &mut BusState, machine: &mut dyn Machine) -> Option<u8> {
        bus.config_changed(machine, 0, 0, CFLAG_READ);
        None
    }

    pub(crate) fn io1_peek(&self) -> Option<u8> {
        Some(0)
    }

    pub(crate) fn io1_store(&self, bus: &mut BusState, machine: &mut dyn Machine) {
        bus.config_changed(machine, 1, 1, CFLAG_WRITE);
    }

    pub(crate) fn config_init(&self, bus: &mut BusState, machine: &mut dyn Machine) {
        bus.config_changed(machine, 1, 1, CFLAG_READ);
    }
}

/// Westermann Learning: 16K ROM, any IO2 read switches to 8K config.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub(crate) struct Westermann;

impl Westermann {
    pub(crate) fn io2_read(&self, bus: &mut BusState, machine: &mut dyn Machine) -> Option<u8> {
        bus.config_changed(machine, 0, 0, CFLAG_READ);
        None
    }

    pub(crate) fn io2_peek(&self) -> Option<u8> {
        Some(0)
    }

    pub(crate) fn config_init(&self, bus: &mut BusState, machine: &mut dyn Machine) {
        bus.config_changed(machine, 1, 1, CFLAG_READ);
    }
}

/// Mikro Assembler: 8K ROM with its last two pages mirrored into IO1/IO2.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub(crate) struct MikroAssembler;

impl MikroAssembler {
    pub(crate) fn io1_read(&self, bus: &BusState, addr: u16) -> Option<u8> {
        Some(bus.roml_banks[0x1E00 + (addr & 0xFF) as usize])
    }

    pub(crate) fn io2_read(&self, bus: &BusState, addr: u16) -> Option<u8> {
        Some(bus.roml_banks[0x1F00 + (addr & 0xFF) as usize])
    }

    pub(crate) fn config_init(&self, bus: &mut BusState, machine: &mut dyn Machine) {
        bus.config_changed(machine, 0, 0, CFLAG_READ);
    }
}

/// Mach 5: same ROM mirroring as Mikro Assembler, but IO1 writes re-enable
/// the 8K config and IO2 writes disable the cartridge.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub(crate) struct Mach5;

impl Mach5 {
    pub(crate) fn io1_read(&self, bus: &BusState, addr: u16) -> Option<u8> {
        Some(bus.roml_banks[0x1E00 + (addr & 0xFF) as usize])
    }

    pub(crate) fn io1_store(&self, bus: &mut BusState, machine: &mut dyn Machine) {
        bus.config_changed(machine, 0, 0, CFLAG_WRITE);
    }

    pub(crate) fn io2_read(&self, bus: &BusState, addr: u16) -> Option<u8> {
        Some(bus.roml_banks[0x1F00 + (addr & 0xFF) as usize])
    }

    pub(crate) fn io2_store(&self, bus: &mut BusState, machine: &mut dyn Machine) {
        bus.config_changed(machine, 2, 2, CFLAG_WRITE);
    }

    pub(crate) fn config_init(&self, bus: &mut BusState, machine: &mut dyn Machine) {
        bus.config_changed(machine, 0, 0, CFLAG_READ);
    }
}

/// REX Utility: 8K ROM. IO2 reads below $DFC0 hide the ROM, from $DFC0 up
/// they bring the 8K config back.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub(crate) struct RexUtility;

impl RexUtility {
    pub(crate) fn io2_read(
        &self,
        bus: &mut BusState,
        machine: &mut dyn Machine,
        addr: u16,
    ) -> Option<u8> {
        if addr & 0xFF < 0xC0 {
            bus.config_changed(machine, CMODE_RAM, CMODE_RAM, CFLAG_READ);
        } else {
            bus.config_changed(machine, CMODE_8K_GAME, CMODE_8K_GAME, CFLAG_READ);
        }
        None
    }

    pub(crate) fn io2_peek(&self) -> Option<u8> {
        Some(0)
    }

    pub(crate) fn config_init(&self, bus: &mut BusState, machine: &mut dyn Machine) {
        bus.config_changed(machine, 0, 0, CFLAG_READ);
    }
}

/// Ross: 16K or 32K ROM in 16K game config. Any IO1 read selects the
/// second 16K bank; any IO2 read drops both lines and disables the
/// cartridge until reset.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub(crate) struct Ross {
    bank: u8,
}

impl Ross {
    pub(crate) fn io1_read(&mut self, bus: &mut BusState) -> Option<u8> {
        bus.set_romh_bank(1);
        bus.set_roml_bank(1);
        self.bank = 1;
        None
    }

    pub(crate) fn io1_peek(&self) -> Option<u8> {
        Some(self.bank)
    }

    pub(crate) fn io2_read(&self, bus: &mut BusState, machine: &mut dyn Machine) -> Option<u8> {
        // Drives both lines directly, bypassing the config routine.
        bus.signals.game = false;
        bus.signals.exrom = false;
        machine.pla_config_changed();
        None
    }

    pub(crate) fn io2_peek(&self) -> Option<u8> {
        Some(0)
    }

    pub(crate) fn config_init(&self, bus: &mut BusState, machine: &mut dyn Machine) {
        bus.config_changed(machine, 1, 1, CFLAG_READ);
    }
}

/// Structured Basic: two 8K banks. IO1 accesses latch the low two address
/// bits: 0/1 select bank 0, 2 selects bank 1, 3 hides the ROM.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub(crate) struct StructuredBasic;

impl StructuredBasic {
    fn io(bus: &mut BusState, machine: &mut dyn Machine, addr: u16) {
        match addr & 3 {
            0 | 1 => bus.config_changed(machine, CMODE_8K_GAME, CMODE_8K_GAME, CFLAG_READ),
            2 => {
                let mode = CMODE_8K_GAME | (1 << CMODE_BANK_SHIFT);
                bus.config_changed(machine, mode, mode, CFLAG_READ);
            }
            3 => bus.config_changed(machine, CMODE_RAM, CMODE_RAM, CFLAG_READ),
            _ => unreachable!(),
        }
    }

    pub(crate) fn io1_read(&self, bus: &mut BusState, machine: &mut dyn Machine, addr: u16) -> Option<u8> {
        Self::io(bus, machine, addr);
        None
    }

    pub(crate) fn io1_store(&self, bus: &mut BusState, machine: &mut dyn Machine, addr: u16) {
        Self::io(bus, machine, addr);
    }

    pub(crate) fn config_init(&self, bus: &mut BusState, machine: &mut dyn Machine) {
        bus.config_changed(machine, 0, 0, CFLAG_READ);
    }
}

/// Fun Play / Power Play: sixteen 8K banks selected through a scrambled
/// IO1 register, `bank = ((v >> 3) & 7) | ((v & 1) << 3)`. The register
/// drives GAME/EXROM asserted directly, bypassing the config routine.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub(crate) struct FunPlay {
    bank: u8,
}

pub(crate) fn funplay_decode(value: u8) -> u8 {
    ((value >> 3) & 7) | ((value & 1) << 3)
}

impl FunPlay {
    pub(crate) fn io1_store(&mut self, bus: &mut BusState, machine: &mut dyn Machine, value: u8) {
        self.bank = funplay_decode(value);
        bus.set_romh_bank(self.bank as usize);
        bus.set_roml_bank(self.bank as usize);
        bus.signals.game = true;
        bus.signals.exrom = true;
        machine.pla_config_changed();
        bus.signals.ultimax_phi1 = false;
        bus.signals.ultimax_phi2 = false;
    }

    pub(crate) fn io1_peek(&self) -> Option<u8> {
        Some(self.bank)
    }

    pub(crate) fn config_init(&mut self, bus: &mut BusState, machine: &mut dyn Machine) {
        bus.config_changed(machine, 1, 1, CFLAG_READ);
        self.io1_store(bus, machine, 0);
    }
}

//
// Attach helpers
//

fn split_16k(data: &[u8]) -> (Vec<u8>, Vec<u8>) {
    (data[..0x2000].to_vec(), data[0x2000..0x4000].to_vec())
}

pub(crate) fn simonsbasic_bin_attach(data: &[u8]) -> Result<StagedCart, CartridgeError> {
    expect_bin_size(data, 0x4000, "16384")?;
    let mut staged = StagedCart::new(MainSlotCart::SimonsBasic(SimonsBasic));
    (staged.roml, staged.romh) = split_16k(data);
    staged.setup_mode = (1, 1);
    Ok(staged)
}

pub(crate) fn simonsbasic_crt_attach(image: &CrtImage) -> Result<StagedCart, CartridgeError> {
    let mut staged = StagedCart::new(MainSlotCart::SimonsBasic(SimonsBasic));
    staged.roml = vec![0xFF; 0x2000];
    staged.romh = vec![0xFF; 0x2000];
    for chip in &image.chips {
        if chip.data.len() != 0x2000 {
            return Err(CartridgeError::BadChipSize(chip.data.len() as u16));
        }
        match chip.load_hi() {
            0x80 => staged.roml.copy_from_slice(&chip.data),
            0xA0 => staged.romh.copy_from_slice(&chip.data),
            _ => return Err(CartridgeError::BadLoadAddress(chip.load_address)),
        }
    }
    staged.setup_mode = (1, 1);
    Ok(staged)
}

pub(crate) fn westermann_bin_attach(data: &[u8]) -> Result<StagedCart, CartridgeError> {
    expect_bin_size(data, 0x4000, "16384")?;
    let mut staged = StagedCart::new(MainSlotCart::Westermann(Westermann));
    (staged.roml, staged.romh) = split_16k(data);
    staged.setup_mode = (1, 1);
    Ok(staged)
}

pub(crate) fn westermann_crt_attach(image: &CrtImage) -> Result<StagedCart, CartridgeError> {
    let chip = &image.chips[0];
    if chip.load_hi() != 0x80 || chip.data.len() != 0x4000 {
        return Err(CartridgeError::BadChipSize(chip.data.len() as u16));
    }
    let mut staged = StagedCart::new(MainSlotCart::Westermann(Westermann));
    (staged.roml, staged.romh) = split_16k(&chip.data);
    staged.setup_mode = (1, 1);
    Ok(staged)
}

fn plain_8k(cart: MainSlotCart, data: &[u8]) -> Result<StagedCart, CartridgeError> {
    expect_bin_size(data, 0x2000, "8192")?;
    let mut staged = StagedCart::new(cart);
    staged.roml = data.to_vec();
    Ok(staged)
}

pub(crate) fn mikroass_bin_attach(data: &[u8]) -> Result<StagedCart, CartridgeError> {
    plain_8k(MainSlotCart::MikroAssembler(MikroAssembler), data)
}

pub(crate) fn mikroass_crt_attach(image: &CrtImage) -> Result<StagedCart, CartridgeError> {
    mikroass_bin_attach(&image.chips[0].data)
}

pub(crate) fn mach5_bin_attach(data: &[u8]) -> Result<StagedCart, CartridgeError> {
    plain_8k(MainSlotCart::Mach5(Mach5), data)
}

pub(crate) fn mach5_crt_attach(image: &CrtImage) -> Result<StagedCart, CartridgeError> {
    mach5_bin_attach(&image.chips[0].data)
}

pub(crate) fn rexutility_bin_attach(data: &[u8]) -> Result<StagedCart, CartridgeError> {
    plain_8k(MainSlotCart::RexUtility(RexUtility), data)
}

pub(crate) fn rexutility_crt_attach(image: &CrtImage) -> Result<StagedCart, CartridgeError> {
    rexutility_bin_attach(&image.chips[0].data)
}

/// Ross images interleave: each 16K half is (ROML bank, ROMH bank).
fn ross_staged(raw: &[u8]) -> StagedCart {
    let mut staged = StagedCart::new(MainSlotCart::Ross(Ross::default()));
    staged.roml = vec![0u8; 0x4000];
    staged.romh = vec![0u8; 0x4000];
    staged.roml[..0x2000].copy_from_slice(&raw[0x0000..0x2000]);
    staged.romh[..0x2000].copy_from_slice(&raw[0x2000..0x4000]);
    staged.roml[0x2000..].copy_from_slice(&raw[0x4000..0x6000]);
    staged.romh[0x2000..].copy_from_slice(&raw[0x6000..0x8000]);
    staged.setup_mode = (0, 0);
    staged
}

pub(crate) fn ross_bin_attach(data: &[u8]) -> Result<StagedCart, CartridgeError> {
    match data.len() {
        0x8000 => Ok(ross_staged(data)),
        0x4000 => {
            // 16K image: bank 1 mirrors bank 0.
            let mut raw = data.to_vec();
            raw.extend_from_slice(data);
            Ok(ross_staged(&raw))
        }
        actual => Err(CartridgeError::BadBinSize {
            actual,
            expected: "16384 or 32768",
        }),
    }
}

pub(crate) fn ross_crt_attach(image: &CrtImage) -> Result<StagedCart, CartridgeError> {
    let mut raw = vec![0u8; 0x8000];
    for chip in &image.chips {
        if chip.load_hi() != 0x80 || chip.data.len() != 0x4000 || chip.bank > 1 {
            return Err(CartridgeError::BankOutOfRange {
                bank: chip.bank,
                banks: 2,
            });
        }
        let offset = (chip.bank as usize) << 14;
        raw[offset..offset + 0x4000].copy_from_slice(&chip.data);
    }
    if image.chips.len() == 1 {
        let (front, back) = raw.split_at_mut(0x4000);
        back.copy_from_slice(front);
    }
    Ok(ross_staged(&raw))
}

pub(crate) fn stb_bin_attach(data: &[u8]) -> Result<StagedCart, CartridgeError> {
    expect_bin_size(data, 0x4000, "16384")?;
    let mut staged = StagedCart::new(MainSlotCart::StructuredBasic(StructuredBasic));
    staged.roml = data.to_vec();
    Ok(staged)
}

pub(crate) fn stb_crt_attach(image: &CrtImage) -> Result<StagedCart, CartridgeError> {
    let mut rom = vec![0u8; 0x4000];
    for chip in &image.chips {
        if chip.load_hi() != 0x80 || chip.data.len() != 0x2000 || chip.bank > 1 {
            return Err(CartridgeError::BankOutOfRange {
                bank: chip.bank,
                banks: 2,
            });
        }
        let offset = (chip.bank as usize) << 13;
        rom[offset..offset + 0x2000].copy_from_slice(&chip.data);
    }
    let mut staged = StagedCart::new(MainSlotCart::StructuredBasic(StructuredBasic));
    staged.roml = rom;
    Ok(staged)
}

pub(crate) fn funplay_bin_attach(data: &[u8]) -> Result<StagedCart, CartridgeError> {
    expect_bin_size(data, 0x20000, "131072")?;
    let mut staged = StagedCart::new(MainSlotCart::FunPlay(FunPlay::default()));
    staged.roml = data.to_vec();
    staged.romh = data.to_vec();
    staged.setup_mode = (1, 1);
    Ok(staged)
}

pub(crate) fn funplay_crt_attach(image: &CrtImage) -> Result<StagedCart, CartridgeError> {
    let mut rom = vec![0u8; 0x20000];
    for chip in &image.chips {
        if (chip.load_hi() != 0x80 && chip.load_hi() != 0xA0) || chip.data.len() != 0x2000 {
            return Err(CartridgeError::BadLoadAddress(chip.load_address));
        }
        let offset = (funplay_decode(chip.bank_low()) as usize) << 13;
        rom[offset..offset + 0x2000].copy_from_slice(&chip.data);
    }
    let mut staged = StagedCart::new(MainSlotCart::FunPlay(FunPlay::default()));
    staged.roml = rom.clone();
    staged.romh = rom;
    staged.setup_mode = (1, 1);
    Ok(staged)
}
