use rand::{Rng, SeedableRng};

use crate::cart::ramcart::RamCart;
use crate::cart::{HardwareType, MainSlotCart};
use crate::image::CartridgeError;
use crate::io::{IoOwner, IoSource};
use crate::machine::Machine;
use crate::port::{BusState, ExpansionPort, CFLAG_READ, CFLAG_TRIGGER_NMI};
use crate::slot::SlotDevice;

/// Records every collaborator call the port makes; doubles as 64K of flat
/// RAM for the fake-ultimax paths.
pub(crate) struct TestMachine {
    pub ram: Vec<u8>,
    pub pla_changes: u32,
    pub alarm_flushes: Vec<bool>,
    pub nmi_sets: u32,
    pub nmi_releases: u32,
    pub phi1_value: u8,
}

impl Default for TestMachine {
    fn default() -> Self {
        Self {
            ram: vec![0; 0x1_0000],
            pla_changes: 0,
            alarm_flushes: Vec::new(),
            nmi_sets: 0,
            nmi_releases: 0,
            phi1_value: 0x55,
        }
    }
}

impl Machine for TestMachine {
    fn pla_config_changed(&mut self) {
        self.pla_changes += 1;
    }

    fn handle_pending_alarms(&mut self, rmw_write: bool) {
        self.alarm_flushes.push(rmw_write);
    }

    fn nmi_set(&mut self) {
        self.nmi_sets += 1;
    }

    fn nmi_release(&mut self) {
        self.nmi_releases += 1;
    }

    fn vic_phi1_read(&mut self) -> u8 {
        self.phi1_value
    }

    fn mem_read_without_ultimax(&mut self, addr: u16) -> u8 {
        self.ram[addr as usize]
    }

    fn mem_store_without_ultimax(&mut self, addr: u16, value: u8) {
        self.ram[addr as usize] = value;
    }

    fn ram_read(&mut self, addr: u16) -> u8 {
        self.ram[addr as usize]
    }

    fn ram_store(&mut self, addr: u16, value: u8) {
        self.ram[addr as usize] = value;
    }
}

/// `banks` 8K banks, each filled with a distinct sentinel byte.
fn banked_image(banks: usize) -> Vec<u8> {
    let mut data = vec![0u8; banks * 0x2000];
    for (bank, chunk) in data.chunks_mut(0x2000).enumerate() {
        chunk.fill(0xB0 ^ bank as u8);
    }
    data
}

#[test]
fn apply_config_is_idempotent() {
    let mut machine = TestMachine::default();
    let mut port = ExpansionPort::new();

    port.config_changed(&mut machine, 1, 1, CFLAG_READ);
    let first = port.signals();
    let (banks_l, banks_h) = (port.roml_bank(), port.romh_bank());

    port.config_changed(&mut machine, 1, 1, CFLAG_READ);
    assert_eq!(first, port.signals());
    assert_eq!((banks_l, banks_h), (port.roml_bank(), port.romh_bank()));
    assert_eq!(0, machine.nmi_sets);

    // The NMI fires once per config call that carries the trigger bit,
    // never as a leftover of a previous call.
    port.config_changed(&mut machine, 1, 1, CFLAG_READ | CFLAG_TRIGGER_NMI);
    assert_eq!(1, machine.nmi_sets);
    port.config_changed(&mut machine, 1, 1, CFLAG_READ);
    assert_eq!(1, machine.nmi_sets);
    port.config_changed(&mut machine, 1, 1, CFLAG_READ | CFLAG_TRIGGER_NMI);
    assert_eq!(2, machine.nmi_sets);
}

#[test]
fn config_write_flag_reaches_alarm_flush() {
    let mut machine = TestMachine::default();
    let mut port = ExpansionPort::new();

    port.config_changed(&mut machine, 0, 0, CFLAG_READ);
    port.config_changed(&mut machine, 0, 0, crate::port::CFLAG_WRITE);
    assert_eq!(vec![false, true], machine.alarm_flushes);
}

#[test]
fn generic_8k_round_trip() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0xC64);
    let image: Vec<u8> = (0..0x2000).map(|_| rng.gen()).collect();

    let mut machine = TestMachine::default();
    let mut port = ExpansionPort::new();
    port.attach_bin(&mut machine, HardwareType::Generic8k, &image)
        .unwrap();

    // 8K game config: EXROM asserted, GAME not.
    assert!(port.signals().exrom && !port.signals().game);

    for offset in [0usize, 1, 0x1000, 0x1FFF] {
        let addr = 0x8000 + offset as u16;
        assert_eq!(image[offset], port.roml_read(&mut machine, addr));
        assert_eq!(image[offset], port.peek_mem(&mut machine, addr));
    }
}

#[test]
fn generic_16k_round_trip() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x1541);
    let image: Vec<u8> = (0..0x4000).map(|_| rng.gen()).collect();

    let mut machine = TestMachine::default();
    let mut port = ExpansionPort::new();
    port.attach_bin(&mut machine, HardwareType::Generic16k, &image)
        .unwrap();

    assert!(port.signals().exrom && port.signals().game);
    assert_eq!(image[0x0123], port.peek_mem(&mut machine, 0x8123));
    assert_eq!(image[0x2123], port.peek_mem(&mut machine, 0xA123));
    assert_eq!(image[0x2123], port.romh_read(&mut machine, 0xA123));
}

#[test]
fn dinamic_bank_switch_on_io1_read() {
    let image = banked_image(16);
    let mut machine = TestMachine::default();
    let mut port = ExpansionPort::new();
    port.attach_bin(&mut machine, HardwareType::Dinamic, &image)
        .unwrap();

    // Reading $DE05 selects bank 5; ROML then mirrors source offset
    // 5 * 0x2000.
    port.io1_read(&mut machine, 0xDE05);
    assert_eq!(image[5 * 0x2000], port.roml_read(&mut machine, 0x8000));

    for bank in 0..16u16 {
        port.io1_read(&mut machine, 0xDE00 + bank);
        assert_eq!(
            image[bank as usize * 0x2000 + 0x42],
            port.roml_read(&mut machine, 0x8042),
            "bank {bank}"
        );
    }

    // $DE15 must not switch (low byte is not a bare bank number).
    port.io1_read(&mut machine, 0xDE0F);
    port.io1_read(&mut machine, 0xDE15);
    assert_eq!(image[15 * 0x2000], port.roml_read(&mut machine, 0x8000));
}

#[test]
fn atomicpower_bank_coverage() {
    let image = banked_image(4);
    let mut machine = TestMachine::default();
    let mut port = ExpansionPort::new();
    port.attach_bin(&mut machine, HardwareType::AtomicPower, &image)
        .unwrap();

    for bank in 0..4u8 {
        port.io1_store(&mut machine, 0xDE00, bank << 3);
        assert_eq!(
            image[bank as usize * 0x2000],
            port.roml_read(&mut machine, 0x8000),
            "bank {bank}"
        );
    }
}

#[test]
fn atomicpower_ram_at_a000_special_mode() {
    let image = banked_image(4);
    let mut machine = TestMachine::default();
    let mut port = ExpansionPort::new();
    port.attach_bin(&mut machine, HardwareType::AtomicPower, &image)
        .unwrap();

    // 0x22 matches the 0xE7 mask: 16K game with RAM at $A000.
    port.io1_store(&mut machine, 0xDE00, 0x22);
    assert!(port.signals().game && port.signals().exrom);
    match &port.main {
        MainSlotCart::AtomicPower(cart) => assert!(cart.ram_at_a000()),
        _ => panic!("expected Atomic Power in the main slot"),
    }

    // The $A000 window is now cartridge RAM: writes stick.
    port.romh_no_ultimax_store(&mut machine, 0xA123, 0x5A);
    assert_eq!(0x5A, port.romh_read(&mut machine, 0xA123));
    // And the same RAM is visible in the IO2 window.
    port.io2_store(&mut machine, 0xDF23, 0xA5);
    assert_eq!(0xA5, port.io2_read(&mut machine, 0xDF23));
}

#[test]
fn atomicpower_export_ram_overlays_roml() {
    let image = banked_image(4);
    let mut machine = TestMachine::default();
    let mut port = ExpansionPort::new();
    port.attach_bin(&mut machine, HardwareType::AtomicPower, &image)
        .unwrap();

    // Bit 5 maps cartridge RAM over ROML (and into the IO2 window).
    port.io1_store(&mut machine, 0xDE00, 0x20);
    assert!(port.export_ram_enabled());

    port.roml_no_ultimax_store(&mut machine, 0x8040, 0x42);
    assert_eq!(0x42, port.roml_read(&mut machine, 0x8040));
    // The write also reached the RAM under the ROM.
    assert_eq!(0x42, machine.ram[0x8040]);

    // With the overlay off the ROM shows through again and writes die.
    port.io1_store(&mut machine, 0xDE00, 0x00);
    assert_eq!(image[0x40], port.roml_read(&mut machine, 0x8040));
}

#[test]
fn epyx_capacitor_times_out_after_exact_cycle_count() {
    let image = banked_image(1);
    let mut machine = TestMachine::default();
    let mut port = ExpansionPort::new();
    port.attach_bin(&mut machine, HardwareType::EpyxFastload, &image)
        .unwrap();

    // ROML read at cycle 0 discharges the capacitor.
    assert_eq!(image[0], port.roml_read(&mut machine, 0x8000));
    assert!(port.signals().exrom, "ROM mapped right after the access");

    // One cycle short of the threshold: still 8K game config.
    port.advance_clock(&mut machine, 512 - 1);
    assert!(port.signals().exrom && !port.signals().game);

    // The 512th cycle charges the capacitor; the ROM drops off.
    port.advance_clock(&mut machine, 1);
    assert!(!port.signals().exrom && !port.signals().game);

    // An IO1 read discharges it again.
    port.io1_read(&mut machine, 0xDE00);
    assert!(port.signals().exrom);

    // IO2 mirrors the last ROM page without touching the capacitor.
    let before = port.clock();
    assert_eq!(image[0x1F42], port.io2_read(&mut machine, 0xDF42));
    assert_eq!(before, port.clock());
}

#[test]
fn epyx_peek_does_not_discharge() {
    let image = banked_image(1);
    let mut machine = TestMachine::default();
    let mut port = ExpansionPort::new();
    port.attach_bin(&mut machine, HardwareType::EpyxFastload, &image)
        .unwrap();

    port.roml_read(&mut machine, 0x8000);
    port.advance_clock(&mut machine, 511);
    // A monitor peek must not re-arm the capacitor...
    assert_eq!(image[0], port.peek_mem(&mut machine, 0x8000));
    port.advance_clock(&mut machine, 1);
    // ...so the ROM still switches off on schedule.
    assert!(!port.signals().exrom);
}

#[test]
fn capture_freeze_sequence() {
    let image = banked_image(1);
    let mut machine = TestMachine::default();
    let mut port = ExpansionPort::new();
    port.attach_bin(&mut machine, HardwareType::Capture, &image)
        .unwrap();

    port.freeze(&mut machine);
    assert_eq!(1, machine.nmi_sets);
    // Ultimax config: GAME asserted, EXROM not.
    assert!(port.signals().game && !port.signals().exrom);
    match &port.main {
        MainSlotCart::Capture(cart) => {
            let (cart_enabled, freeze_pressed, register_enabled, romh_enabled) = cart.state();
            assert!(cart_enabled && freeze_pressed && register_enabled);
            assert!(!romh_enabled);
        }
        _ => panic!("expected Capture in the main slot"),
    }

    // First fetch in page $FE00 flips the ROM in and clears the pending
    // freeze.
    port.ultimax_romh_read_hirom(&mut machine, 0xFE00);
    match &port.main {
        MainSlotCart::Capture(cart) => {
            let (cart_enabled, freeze_pressed, _, romh_enabled) = cart.state();
            assert!(cart_enabled && romh_enabled);
            assert!(!freeze_pressed);
        }
        _ => unreachable!(),
    }

    // ROMH now answers with cartridge bytes.
    assert_eq!(image[0x1F00], port.ultimax_romh_read_hirom(&mut machine, 0xFF00));

    // Any access to $FFF7 turns the cartridge off.
    port.romh_store(&mut machine, 0xFFF7, 0x00);
    match &port.main {
        MainSlotCart::Capture(cart) => assert!(!cart.state().0),
        _ => unreachable!(),
    }

    // $FFF8 turns it back on.
    port.ultimax_romh_read_hirom(&mut machine, 0xFFF8);
    match &port.main {
        MainSlotCart::Capture(cart) => assert!(cart.state().0),
        _ => unreachable!(),
    }
}

#[test]
fn capture_ram_window_in_low_area() {
    let image = banked_image(1);
    let mut machine = TestMachine::default();
    let mut port = ExpansionPort::new();
    port.attach_bin(&mut machine, HardwareType::Capture, &image)
        .unwrap();

    port.freeze(&mut machine);
    port.ultimax_1000_7fff_store(&mut machine, 0x6123, 0x42);
    assert_eq!(0x42, port.ultimax_1000_7fff_read(&mut machine, 0x6123));

    // Below $6000 the faked normal mapping answers.
    machine.ram[0x2345] = 0x24;
    assert_eq!(0x24, port.ultimax_1000_7fff_read(&mut machine, 0x2345));
}

/// Test double standing in for slot hardware like MMC64 (slot 0) or an
/// ISEPIC (slot 1).
struct SlotDouble {
    name: &'static str,
    enabled: bool,
    value: u8,
}

impl SlotDevice for SlotDouble {
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn roml_read(&mut self, _bus: &mut BusState, _machine: &mut dyn Machine, _addr: u16) -> Option<u8> {
        Some(self.value)
    }

    fn romh_read(&mut self, _bus: &mut BusState, _machine: &mut dyn Machine, _addr: u16) -> Option<u8> {
        Some(self.value)
    }
}

/// Slot 0 wins over slot 1 wins over the main slot, first match taken.
/// Note that both slots being populated at once is a combination real
/// hardware rarely saw; the ordering below documents the emulation's
/// behavior rather than verified hardware truth.
#[test]
fn slot_priority_ordering() {
    let image = banked_image(1);
    let mut machine = TestMachine::default();
    let mut port = ExpansionPort::new();
    port.attach_bin(&mut machine, HardwareType::Generic8k, &image)
        .unwrap();

    port.install_slot0(
        &mut machine,
        Box::new(SlotDouble {
            name: "slot0 double",
            enabled: true,
            value: 0xA0,
        }),
    )
    .unwrap();
    port.install_slot1(
        &mut machine,
        Box::new(SlotDouble {
            name: "slot1 double",
            enabled: true,
            value: 0xA1,
        }),
    )
    .unwrap();

    assert_eq!(0xA0, port.roml_read(&mut machine, 0x8000));
    assert_eq!(0xA0, port.romh_read(&mut machine, 0xA000));

    port.remove_slot0(&mut machine);
    assert_eq!(0xA1, port.roml_read(&mut machine, 0x8000));

    port.remove_slot1(&mut machine);
    assert_eq!(image[0], port.roml_read(&mut machine, 0x8000));
}

#[test]
fn disabled_slot_device_falls_through() {
    let image = banked_image(1);
    let mut machine = TestMachine::default();
    let mut port = ExpansionPort::new();
    port.attach_bin(&mut machine, HardwareType::Generic8k, &image)
        .unwrap();

    port.install_slot0(
        &mut machine,
        Box::new(SlotDouble {
            name: "slot0 double",
            enabled: false,
            value: 0xA0,
        }),
    )
    .unwrap();

    assert_eq!(image[0], port.roml_read(&mut machine, 0x8000));
}

#[test]
fn io_conflict_reported_and_leaves_no_partial_state() {
    let mut machine = TestMachine::default();
    let mut port = ExpansionPort::new();
    port.install_ramcart(&mut machine, RamCart::new(64).unwrap())
        .unwrap();

    // Atomic Power wants both I/O pages; RAMCART already owns them.
    let err = port
        .attach_bin(&mut machine, HardwareType::AtomicPower, &banked_image(4))
        .unwrap_err();
    assert!(matches!(err, CartridgeError::IoConflict(_)));

    assert_eq!(HardwareType::None, port.main_type());
    let owner = port.io_registry().device_at(0xDE00).map(|s| s.owner);
    assert_eq!(Some(IoOwner::Slot1), owner);

    // Detaching the conflicting device clears the way.
    port.remove_slot1(&mut machine);
    port.attach_bin(&mut machine, HardwareType::AtomicPower, &banked_image(4))
        .unwrap();
    assert_eq!(HardwareType::AtomicPower, port.main_type());
}

#[test]
fn io_pages_route_to_their_owners() {
    let image = banked_image(1);
    let mut machine = TestMachine::default();
    let mut port = ExpansionPort::new();
    port.attach_bin(&mut machine, HardwareType::EpyxFastload, &image)
        .unwrap();

    let io1 = port.io_registry().device_at(0xDE80).unwrap();
    assert_eq!("EPYX FASTLOAD", io1.name);
    let io2 = port.io_registry().device_at(0xDF80).unwrap();
    assert_eq!("EPYX FASTLOAD", io2.name);
    assert!(port.io_registry().device_at(0xDD00).is_none());
}

#[test]
fn unclaimed_io_reads_as_open_bus() {
    let mut machine = TestMachine::default();
    machine.phi1_value = 0x37;
    let mut port = ExpansionPort::new();

    assert_eq!(0x37, port.io1_read(&mut machine, 0xDE00));
    assert_eq!(0x37, port.io2_read(&mut machine, 0xDF00));
    // Writes die silently.
    port.io1_store(&mut machine, 0xDE00, 0xFF);
    port.io2_store(&mut machine, 0xDF00, 0xFF);
}

#[test]
fn invalid_main_slot_tag_falls_back_to_generic() {
    let image = banked_image(1);
    let mut machine = TestMachine::default();
    let mut port = ExpansionPort::new();
    port.attach_bin(&mut machine, HardwareType::Generic8k, &image)
        .unwrap();

    // Force the defect the dispatcher guards against: a tag with no
    // handler reaching runtime dispatch.
    port.main = MainSlotCart::Unsupported(HardwareType::Crt);
    assert_eq!(image[0x10], port.roml_read(&mut machine, 0x8010));
}

#[test]
fn detach_unregisters_io_and_cancels_alarms() {
    let image = banked_image(1);
    let mut machine = TestMachine::default();
    let mut port = ExpansionPort::new();
    port.attach_bin(&mut machine, HardwareType::EpyxFastload, &image)
        .unwrap();

    port.roml_read(&mut machine, 0x8000); // arms the capacitor alarm
    port.detach(&mut machine);

    assert!(port.io_registry().device_at(0xDE00).is_none());
    let signals = port.signals();
    port.advance_clock(&mut machine, 2048);
    assert_eq!(signals, port.signals(), "stale alarm must not fire");
}

#[test]
fn attach_failure_leaves_previous_state_detached_cleanly() {
    let mut machine = TestMachine::default();
    let mut port = ExpansionPort::new();

    let err = port
        .attach_bin(&mut machine, HardwareType::Dinamic, &[0u8; 0x1000])
        .unwrap_err();
    assert!(matches!(err, CartridgeError::BadBinSize { .. }));
    assert_eq!(HardwareType::None, port.main_type());
    assert!(port.io_registry().device_at(0xDE00).is_none());
}

#[test]
fn unsupported_types_are_rejected_at_attach() {
    let mut machine = TestMachine::default();
    let mut port = ExpansionPort::new();

    let err = port
        .attach_bin(&mut machine, HardwareType::EasyFlash, &[0u8; 0x2000])
        .unwrap_err();
    assert!(matches!(err, CartridgeError::UnsupportedHardware(32)));
}

#[test]
fn ramcart_window_and_mirror_through_the_port() {
    let mut machine = TestMachine::default();
    let mut port = ExpansionPort::new();
    let mut ramcart = RamCart::new(128).unwrap();
    ramcart.set_readonly(true);
    port.install_ramcart(&mut machine, ramcart).unwrap();

    // Installing asserts EXROM (boot-window takeover).
    assert!(port.signals().exrom);

    port.io1_store(&mut machine, 0xDE00, 0x02);
    port.io2_store(&mut machine, 0xDF10, 0x99);
    assert_eq!(0x99, port.io2_read(&mut machine, 0xDF10));

    // Page 0 mirror at $8000-$80FF (read-only switch on, bit 7 clear).
    port.io1_store(&mut machine, 0xDE00, 0x00);
    port.io2_store(&mut machine, 0xDF00, 0x77);
    assert_eq!(0x77, port.roml_read(&mut machine, 0x8000));
}

#[test]
fn westermann_reset_restores_16k() {
    let image = banked_image(2);
    let mut machine = TestMachine::default();
    let mut port = ExpansionPort::new();
    port.attach_bin(&mut machine, HardwareType::Westermann, &image)
        .unwrap();
    assert!(port.signals().game && port.signals().exrom);

    port.io2_read(&mut machine, 0xDF00);
    assert!(!port.signals().game && port.signals().exrom);

    port.reset(&mut machine);
    assert!(port.signals().game && port.signals().exrom);
}

#[test]
fn funplay_bank_cycle_through_the_port() {
    let image = banked_image(16);
    let mut machine = TestMachine::default();
    let mut port = ExpansionPort::new();
    port.attach_bin(&mut machine, HardwareType::FunPlay, &image)
        .unwrap();

    for bank in 0..16u8 {
        // Invert the scramble to produce the register value.
        let value = ((bank & 7) << 3) | ((bank >> 3) & 1);
        port.io1_store(&mut machine, 0xDE00, value);
        assert_eq!(
            image[bank as usize * 0x2000],
            port.roml_read(&mut machine, 0x8000),
            "bank {bank}"
        );
    }
}

#[test]
fn mach5_mirrors_rom_pages_into_io() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    let image: Vec<u8> = (0..0x2000).map(|_| rng.gen()).collect();
    let mut machine = TestMachine::default();
    let mut port = ExpansionPort::new();
    port.attach_bin(&mut machine, HardwareType::Mach5, &image)
        .unwrap();

    assert_eq!(image[0x1E07], port.io1_read(&mut machine, 0xDE07));
    assert_eq!(image[0x1F07], port.io2_read(&mut machine, 0xDF07));

    // IO2 write hides the cartridge.
    port.io2_store(&mut machine, 0xDF00, 0);
    assert!(!port.signals().exrom);
    // IO1 write brings the 8K config back.
    port.io1_store(&mut machine, 0xDE00, 0);
    assert!(port.signals().exrom);
}

#[test]
fn simonsbasic_switches_configs_on_io1_access() {
    let image = banked_image(2);
    let mut machine = TestMachine::default();
    let mut port = ExpansionPort::new();
    port.attach_bin(&mut machine, HardwareType::SimonsBasic, &image)
        .unwrap();
    assert!(port.signals().game && port.signals().exrom);

    port.io1_read(&mut machine, 0xDE00);
    assert!(!port.signals().game && port.signals().exrom);

    port.io1_store(&mut machine, 0xDE00, 0x00);
    assert!(port.signals().game && port.signals().exrom);
}

#[test]
fn ross_bank_switch_and_disable() {
    let image = banked_image(4); // two 16K halves
    let mut machine = TestMachine::default();
    let mut port = ExpansionPort::new();
    port.attach_bin(&mut machine, HardwareType::Ross, &image)
        .unwrap();
    port.reset(&mut machine);
    assert!(port.signals().game && port.signals().exrom);

    // Image layout interleaves ROML/ROMH per 16K half.
    assert_eq!(image[0], port.roml_read(&mut machine, 0x8000));
    assert_eq!(image[0x2000], port.romh_read(&mut machine, 0xA000));

    port.io1_read(&mut machine, 0xDE00);
    assert_eq!(image[0x4000], port.roml_read(&mut machine, 0x8000));
    assert_eq!(image[0x6000], port.romh_read(&mut machine, 0xA000));

    port.io2_read(&mut machine, 0xDF00);
    assert!(!port.signals().game && !port.signals().exrom);
}

#[test]
fn rexep256_crt_attach_and_bank_select() {
    use crate::image::testutil::build_crt;

    let menu = vec![0x10u8; 0x2000];
    let socket1 = vec![0x11u8; 0x4000]; // 16K EPROM in socket 1
    let crt = build_crt(
        27,
        0,
        1,
        &[(0, 0x8000, &menu), (1, 0x8000, &socket1)],
    );

    let mut machine = TestMachine::default();
    let mut port = ExpansionPort::new();
    assert_eq!(
        HardwareType::RexEp256,
        port.attach_crt(&mut machine, &crt).unwrap()
    );
    port.reset(&mut machine);

    assert_eq!(0x10, port.roml_read(&mut machine, 0x8000));

    // Socket 0, sub-bank 0 -> first 8K block of the 16K EPROM.
    port.io2_store(&mut machine, 0xDFA0, 0x00);
    assert_eq!(0x11, port.roml_read(&mut machine, 0x8000));

    // Empty socket reads as erased EPROM.
    port.io2_store(&mut machine, 0xDFA0, 0x05);
    assert_eq!(0xFF, port.roml_read(&mut machine, 0x8000));
}

#[test]
fn delaep7x8_crt_bank_coverage() {
    use crate::image::testutil::build_crt;

    let chips: Vec<Vec<u8>> = (0..8u8).map(|bank| vec![0xD0 | bank; 0x2000]).collect();
    let chip_refs: Vec<(u16, u16, &[u8])> = chips
        .iter()
        .enumerate()
        .map(|(bank, data)| (bank as u16, 0x8000, data.as_slice()))
        .collect();
    let crt = build_crt(25, 0, 1, &chip_refs);

    let mut machine = TestMachine::default();
    let mut port = ExpansionPort::new();
    port.attach_crt(&mut machine, &crt).unwrap();

    for bank in 0..8u8 {
        port.io1_store(&mut machine, 0xDE00, !(1 << bank));
        assert_eq!(
            0xD0 | bank,
            port.roml_read(&mut machine, 0x8000),
            "bank {bank}"
        );
    }
}

#[test]
fn crt_header_type_routes_to_the_right_handler() {
    use crate::image::testutil::build_crt;

    let bank = banked_image(1);
    let crt = build_crt(10, 0, 1, &[(0, 0x8000, &bank)]);

    let mut machine = TestMachine::default();
    let mut port = ExpansionPort::new();
    assert_eq!(
        HardwareType::EpyxFastload,
        port.attach_crt(&mut machine, &crt).unwrap()
    );

    let crt = build_crt(9999, 0, 1, &[(0, 0x8000, &bank)]);
    assert!(matches!(
        port.attach_crt(&mut machine, &crt),
        Err(CartridgeError::UnsupportedHardware(9999))
    ));
}

#[test]
fn io_registry_rejects_overlap_with_main_slot_claims() {
    let image = banked_image(1);
    let mut machine = TestMachine::default();
    let mut port = ExpansionPort::new();
    port.attach_bin(&mut machine, HardwareType::EpyxFastload, &image)
        .unwrap();

    let mut registry_probe = IoSource {
        name: "probe",
        start: 0xDE40,
        end: 0xDE41,
        address_mask: 0xFF,
        owner: IoOwner::Slot0,
    };
    assert!(port.bus.io.register(registry_probe.clone()).is_err());

    // A range outside both expansion pages is free.
    registry_probe.start = 0xD000;
    registry_probe.end = 0xD3FF;
    assert!(port.bus.io.register(registry_probe).is_ok());
}
