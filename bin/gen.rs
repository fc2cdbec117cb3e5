use clap::{Arg, Command};
use std::io::{self, Write};

const CATEGORIES: [&str; 6] = ["Spark", "PySpark", "Python", "Math", "Music", "Chemistry"];

fn main() -> anyhow::Result<()> {
    let matches = Command::new("gen")
        .about("Write a deterministic sample export (email_hash,category) to stdout")
        .arg(
            Arg::new("rows")
                .long("rows")
                .value_parser(clap::value_parser!(u64))
                .required(true),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .help("Varies the hashes so several exports differ")
                .value_parser(clap::value_parser!(u64))
                .default_value("0"),
        )
        .arg(
            Arg::new("no_header")
                .long("no-header")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let rows = matches.get_one::<u64>("rows").copied().unwrap_or_default();
    let seed = matches.get_one::<u64>("seed").copied().unwrap_or_default();
    let with_header = !matches.get_flag("no_header");

    let mut out = io::BufWriter::new(io::stdout().lock());

    if with_header {
        writeln!(&mut out, "email_hash,category")?;
    }

    for i in 0..rows {
        // cheap mixing, stable across runs
        let hash = (i ^ seed.rotate_left(17)).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        let category = CATEGORIES[(i % CATEGORIES.len() as u64) as usize];
        writeln!(&mut out, "{:016x},{}", hash, category)?;
        if i % 10_000 == 0 {
            out.flush()?;
        } // keep buffers moving on huge runs
    }

    out.flush()?;
    Ok(())
}
