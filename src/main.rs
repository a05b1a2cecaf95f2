use std::env::set_var;

use anyhow::{Context, Result};
use clap::{arg, command, ArgAction};
use log::info;

use nvram_driver::FileNvram;
use wearkv::Store;

fn main() -> Result<()> {
    let matches = command!()
        .arg(
            arg!(-d --device <FILE> "Backing file for the NVRAM medium")
                .required(false)
                .default_value("wearkv.bin"),
        )
        .arg(
            arg!(-s --size <BYTES> "Total medium size in bytes, for a fresh device")
                .required(false)
                .default_value("4096"),
        )
        .arg(
            arg!(-r --reserved <BYTES> "Reserved-area size in bytes, for a fresh device")
                .required(false)
                .default_value("1024"),
        )
        .arg(arg!(-v --verbose "Print more debug information, or set `RUST_LOG=debug`").action(ArgAction::SetTrue)
            .required(false))
        .subcommand_required(true)
        .subcommand(clap::Command::new("init").about("Create or open the backing file and run cold boot"))
        .subcommand(
            clap::Command::new("get")
                .about("Print a key's current value")
                .arg(arg!(<key> "Key").value_parser(clap::value_parser!(u16))),
        )
        .subcommand(
            clap::Command::new("set")
                .about("Set a key to a value")
                .arg(arg!(<key> "Key").value_parser(clap::value_parser!(u16)))
                .arg(arg!(<value> "Value").value_parser(clap::value_parser!(i32))),
        )
        .subcommand(clap::Command::new("stat").about("Print directory occupancy"))
        .get_matches();

    if matches.get_flag("verbose") {
        set_var("RUST_LOG", "debug");
    }
    env_logger::init();

    let device = matches.get_one::<String>("device").unwrap();
    let size: u32 = matches.get_one::<String>("size").unwrap().parse()?;
    let reserved: u32 = matches.get_one::<String>("reserved").unwrap().parse()?;

    let nvram = FileNvram::open(device, size, reserved).context("opening backing file")?;
    let mut store = Store::init(nvram).context("cold boot failed")?;
    info!("cold boot complete, {} entries live", store.used_entries());

    match matches.subcommand() {
        Some(("init", _)) => {
            println!("initialized {device}");
        }
        Some(("get", sub)) => {
            let key = *sub.get_one::<u16>("key").unwrap();
            println!("{}", store.get(key)?);
        }
        Some(("set", sub)) => {
            let key = *sub.get_one::<u16>("key").unwrap();
            let value = *sub.get_one::<i32>("value").unwrap();
            store.set(key, value)?;
        }
        Some(("stat", _)) => {
            println!(
                "used {}/{} entries, main capacity {} records",
                store.used_entries(),
                store.used_entries() + store.free_entries(),
                store.main_capacity()
            );
        }
        _ => unreachable!("subcommand_required"),
    }

    Ok(())
}
