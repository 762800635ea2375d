use std::fs;
use std::path::Path;

use anyhow::Context;
use clap::Parser;
use xp64_core::{CrtImage, ExpansionPort, HardwareType, Machine};

/// Attach a cartridge image to an expansion port wired to a flat-RAM
/// machine, then dump what the bus sees. Handy for checking images and
/// bank layouts without booting a full emulator.
#[derive(Parser)]
struct Cli {
    /// Cartridge image (.crt container or raw binary dump)
    #[arg(short = 'f', long = "cart_file_path")]
    cart_file_path: String,
    /// Layout for raw dumps ("generic 8k", "dinamic", ...); CRT containers
    /// carry their own type
    #[arg(short = 't', long = "cart_type", default_value = "crt")]
    cart_type: String,
    /// First address of the peek dump (hex)
    #[arg(short = 'p', long = "peek_address", value_parser = parse_hex, default_value = "8000")]
    peek_address: u16,
    /// Number of bytes to dump
    #[arg(short = 'n', long = "peek_length", default_value_t = 64)]
    peek_length: u32,
}

fn parse_hex(s: &str) -> Result<u16, String> {
    let trimmed = s.trim_start_matches("0x").trim_start_matches('$');
    u16::from_str_radix(trimmed, 16).map_err(|err| err.to_string())
}

/// 64K of RAM and nothing else; open bus reads as 0xFF.
struct FlatRamMachine {
    ram: Vec<u8>,
}

impl FlatRamMachine {
    fn new() -> Self {
        Self {
            ram: vec![0; 0x1_0000],
        }
    }
}

impl Machine for FlatRamMachine {
    fn pla_config_changed(&mut self) {}

    fn handle_pending_alarms(&mut self, _rmw_write: bool) {}

    fn nmi_set(&mut self) {
        log::debug!("NMI asserted");
    }

    fn nmi_release(&mut self) {
        log::debug!("NMI released");
    }

    fn vic_phi1_read(&mut self) -> u8 {
        0xFF
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

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Cli::parse();

    let kind: HardwareType = args.cart_type.parse().map_err(anyhow::Error::msg)?;

    let data = fs::read(&args.cart_file_path)
        .with_context(|| format!("failed to read '{}'", args.cart_file_path))?;
    if let Ok(image) = CrtImage::parse(&data) {
        println!(
            "CRT container: \"{}\", hardware id {}, {} chip packet(s)",
            image.header.name,
            image.header.hardware,
            image.chips.len()
        );
        for chip in &image.chips {
            println!(
                "  chip: bank {:3}, load ${:04X}, {} bytes",
                chip.bank,
                chip.load_address,
                chip.data.len()
            );
        }
    }

    let mut machine = FlatRamMachine::new();
    let mut port = ExpansionPort::new();
    let attached = port
        .attach_image(&mut machine, kind, Path::new(&args.cart_file_path))
        .with_context(|| format!("failed to attach '{}'", args.cart_file_path))?;
    port.reset(&mut machine);

    let signals = port.signals();
    println!("attached: {attached}");
    println!(
        "lines: GAME {} / EXROM {}, ROML bank {}, ROMH bank {}",
        if signals.game { "asserted" } else { "high" },
        if signals.exrom { "asserted" } else { "high" },
        port.roml_bank(),
        port.romh_bank(),
    );

    for row_start in (0..args.peek_length).step_by(16) {
        let addr = args.peek_address.wrapping_add(row_start as u16);
        let row: Vec<String> = (0..16u16)
            .map(|i| port.peek_mem(&mut machine, addr.wrapping_add(i)))
            .map(|byte| format!("{byte:02X}"))
            .collect();
        println!("${addr:04X}: {}", row.join(" "));
    }

    Ok(())
}
