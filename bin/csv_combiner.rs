use anyhow::Context;
use clap::{Arg, Command};
use csv_combiner::{logging, merge_csv_files, MergeOptions, DEFAULT_CHUNK_SIZE};
use std::path::PathBuf;
use tokio::io::{self, AsyncWrite, BufWriter};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();

    let matches = Command::new("csv-combiner")
        .about("Concatenate CSV files, adding a `filename` column with each row's source file")
        .arg(
            Arg::new("files")
                .value_name("FILES")
                .num_args(0..)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("chunk-size")
                .long("chunk-size")
                .help("Maximum rows held in memory at a time [default: 100000]")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("encoding")
                .long("encoding")
                .help("Character encoding of the input files")
                .default_value("utf-8"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .help("Write merged CSV here instead of stdout")
                .value_parser(clap::value_parser!(PathBuf)),
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
    let encoding = matches
        .get_one::<String>("encoding")
        .map(String::as_str)
        .unwrap_or("utf-8");

    let options = MergeOptions::new(chunk_size)?.with_charset_label(encoding)?;

    let sink: Box<dyn AsyncWrite + Unpin> = match matches.get_one::<PathBuf>("output") {
        Some(path) => Box::new(
            tokio::fs::File::create(path)
                .await
                .with_context(|| format!("cannot create {}", path.display()))?,
        ),
        None => Box::new(io::stdout()),
    };
    let mut out = BufWriter::with_capacity(1 << 20, sink);
    let mut diag = io::stderr();

    let report = merge_csv_files(files, options, &mut out, &mut diag).await?;
    tracing::info!(
        files_merged = report.files_merged,
        files_skipped = report.files_skipped,
        rows = report.rows_written,
        "merge finished"
    );
    Ok(())
}
