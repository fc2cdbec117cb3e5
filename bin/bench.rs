use clap::{Arg, ArgAction, Command};
use crc32fast::Hasher as Crc32;
use csv_combiner::{Combiner, MergeOptions, DEFAULT_CHUNK_SIZE};
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Instant;

struct RunStats {
    rows: u64,
    bytes: u64,
    skipped: usize,
    crc: u32,
    elapsed: f64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let matches = Command::new("bench")
        .arg(
            Arg::new("files")
                .num_args(1..)
                .required(true)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("chunk-size")
                .long("chunk-size")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("compare-chunk")
                .long("compare-chunk")
                .help("Rerun with this chunk size and require byte-identical output (by CRC32)")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .help("Only print the checksum")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let files: Vec<PathBuf> = matches
        .get_many::<PathBuf>("files")
        .map(|paths| paths.cloned().collect())
        .unwrap_or_default();
    let chunk_size = matches
        .get_one::<usize>("chunk-size")
        .copied()
        .unwrap_or(DEFAULT_CHUNK_SIZE);

    let first = run(&files, chunk_size).await?;
    report(chunk_size, &first, matches.get_flag("quiet"));

    if let Some(&other) = matches.get_one::<usize>("compare-chunk") {
        let second = run(&files, other).await?;
        report(other, &second, matches.get_flag("quiet"));
        if first.crc != second.crc {
            return Err(anyhow::anyhow!(
                "output differs between chunk sizes {} and {}: crc=0x{:08x} vs 0x{:08x}",
                chunk_size,
                other,
                first.crc,
                second.crc
            ));
        }
    }
    Ok(())
}

/// Merge `files` into a checksum instead of a real sink.
async fn run(files: &[PathBuf], chunk_size: usize) -> anyhow::Result<RunStats> {
    let options = MergeOptions::new(chunk_size)?;
    let start = Instant::now();

    let mut crc = Crc32::new();
    let mut stats = RunStats {
        rows: 0,
        bytes: 0,
        skipped: 0,
        crc: 0,
        elapsed: 0.0,
    };

    let segments = Combiner::new(files.iter().cloned(), options).segments();
    futures::pin_mut!(segments);
    while let Some(item) = segments.next().await {
        match item {
            Ok(segment) => {
                stats.rows += segment.rows() as u64;
                stats.bytes += segment.data().len() as u64;
                crc.update(segment.data());
            }
            Err(err) if err.is_recoverable() => {
                eprintln!("{err}");
                stats.skipped += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }

    stats.crc = crc.finalize();
    stats.elapsed = start.elapsed().as_secs_f64();
    Ok(stats)
}

fn report(chunk_size: usize, stats: &RunStats, quiet: bool) {
    if quiet {
        println!("crc=0x{:08x}", stats.crc);
        return;
    }
    let rps = (stats.rows as f64) / stats.elapsed.max(f64::EPSILON);
    println!(
        "chunk_size={} rows={} bytes={} skipped={} crc=0x{:08x}\nelapsed={:.2}s rows/sec={:.0}",
        chunk_size, stats.rows, stats.bytes, stats.skipped, stats.crc, stats.elapsed, rps
    );
}
