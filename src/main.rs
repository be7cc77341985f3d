use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};
use vmfs::{Filesystem, ImageVolume};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let matches = Command::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg_required_else_help(true)
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .action(ArgAction::Count)
                .global(true)
                .help("Increase debug output"),
        )
        .subcommand(
            Command::new("info")
                .about("Show file system information")
                .arg(Arg::new("image").required(true).help("File system image")),
        )
        .subcommand(
            Command::new("bitmaps")
                .about("Dump the metadata bitmap headers")
                .arg(Arg::new("image").required(true).help("File system image")),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("info", sub)) => with_open_fs(sub, show_info),
        Some(("bitmaps", sub)) => with_open_fs(sub, dump_bitmaps),
        _ => Ok(()),
    }
}

fn with_open_fs(matches: &ArgMatches, f: fn(&Filesystem)) -> anyhow::Result<()> {
    let image = matches.get_one::<String>("image").expect("required arg");
    let debug_level = matches.get_count("debug");

    let vol = ImageVolume::new(image, debug_level);
    let mut fs = Filesystem::create(Box::new(vol));
    let result = fs.open().with_context(|| format!("unable to open {}", image));

    if result.is_ok() {
        f(&fs);
    }
    fs.close();

    result
}

fn show_info(fs: &Filesystem) {
    let sb = fs.superblock();
    let pretty = byte_unit::Byte::from_bytes(sb.block_size as _).get_appropriate_unit(true);

    println!("File system information:");
    println!("  - Volume version : {}", sb.vol_version);
    println!("  - Version        : {}", sb.version);
    println!("  - Label          : {}", sb.label);
    println!("  - UUID           : {}", sb.uuid);
    println!("  - Block size     : {} ({:#x})", pretty, sb.block_size);
}

fn dump_bitmaps(fs: &Filesystem) {
    let bitmaps = [
        ("FBB", fs.fbb()),
        ("FDC", fs.fdc()),
        ("PBC", fs.pbc()),
        ("SBC", fs.sbc()),
    ];

    for (name, bitmap) in bitmaps {
        match bitmap {
            Some(b) => println!("{} bitmap:\n{}\n", name, b.header()),
            None => println!("{} bitmap: not open\n", name),
        }
    }
}
