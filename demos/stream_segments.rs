use csv_combiner::{Combiner, MergeOptions};
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let inputs = [
        Path::new("./data/A.csv"),
        Path::new("./data/B.csv"),
    ];
    let options = MergeOptions::new(10_000)?;

    let mut combiner = Combiner::new(inputs, options);
    while let Some(item) = combiner.next_segment().await {
        match item {
            Ok(segment) => {
                let _text = std::str::from_utf8(segment.data()).unwrap_or("");
            }
            Err(err) => eprintln!("{err}"),
        }
    }

    let report = combiner.report();
    println!(
        "files={} skipped={} rows={}",
        report.files_merged, report.files_skipped, report.rows_written
    );
    Ok(())
}
