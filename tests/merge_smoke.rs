use csv_combiner::{merge_csv_files, CombineError, Combiner, MergeOptions, MergeReport};
use futures::StreamExt;
use std::{fs, path::Path, path::PathBuf};

fn write_csv(dir: &Path, name: &str, contents: &str) -> anyhow::Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, contents)?;
    Ok(path)
}

async fn run(
    paths: &[PathBuf],
    options: MergeOptions,
) -> anyhow::Result<(String, String, MergeReport)> {
    let mut out = Vec::new();
    let mut diag = Vec::new();
    let report = merge_csv_files(paths.to_vec(), options, &mut out, &mut diag).await?;
    Ok((String::from_utf8(out)?, String::from_utf8(diag)?, report))
}

fn chunked(n: usize) -> MergeOptions {
    MergeOptions::new(n).expect("positive chunk size")
}

#[tokio::test]
async fn concatenates_in_order_with_one_header() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let a = write_csv(dir.path(), "A.csv", "id,val\na1,1\na2,2\n")?;
    let b = write_csv(dir.path(), "B.csv", "id,val\nb1,3\nb2,4\nb3,5\n")?;

    let (out, diag, report) = run(&[a, b], MergeOptions::default()).await?;

    assert_eq!(
        out,
        "id,val,filename\n\
         a1,1,A.csv\n\
         a2,2,A.csv\n\
         b1,3,B.csv\n\
         b2,4,B.csv\n\
         b3,5,B.csv\n"
    );
    assert!(diag.is_empty());
    assert_eq!(
        report,
        MergeReport {
            files_merged: 2,
            files_skipped: 0,
            rows_written: 5,
            header_emitted: true,
        }
    );
    Ok(())
}

#[tokio::test]
async fn chunk_size_does_not_change_output() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut body = String::from("sku,qty\n");
    for i in 0..2_500 {
        body.push_str(&format!("SKU{i:06},{i}\n"));
    }
    let a = write_csv(dir.path(), "a.csv", &body)?;
    let b = write_csv(dir.path(), "b.csv", "sku,qty\nX,1\n")?;
    let paths = [a, b];

    let (big, _, big_report) = run(&paths, chunked(100_000)).await?;
    let (one, _, _) = run(&paths, chunked(1)).await?;
    let (odd, _, _) = run(&paths, chunked(7)).await?;

    assert_eq!(big, one);
    assert_eq!(big, odd);
    assert_eq!(big_report.rows_written, 2_501);
    assert_eq!(big.lines().count(), 2_502);
    Ok(())
}

#[tokio::test]
async fn filename_is_the_base_name() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let nested = dir.path().join("exports").join("2024");
    fs::create_dir_all(&nested)?;
    let path = write_csv(&nested, "clothing.csv", "email_hash,category\nabc,Shirts\n")?;

    let (out, _, _) = run(&[path], MergeOptions::default()).await?;

    assert_eq!(out, "email_hash,category,filename\nabc,Shirts,clothing.csv\n");
    Ok(())
}

#[tokio::test]
async fn header_only_file_adds_no_rows_and_no_header() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let a = write_csv(dir.path(), "file1.csv", "email_hash,category\n21d5,Spark\n31d5,PySpark\n")?;
    let empty = write_csv(dir.path(), "file4.csv", "email_hash,category\n")?;
    let c = write_csv(dir.path(), "file3.csv", "email_hash,category\n81d5,Football\n")?;

    let (out, diag, report) = run(&[a, empty, c], MergeOptions::default()).await?;

    assert_eq!(
        out,
        "email_hash,category,filename\n\
         21d5,Spark,file1.csv\n\
         31d5,PySpark,file1.csv\n\
         81d5,Football,file3.csv\n"
    );
    assert!(diag.is_empty());
    assert_eq!(report.files_merged, 3);
    Ok(())
}

#[tokio::test]
async fn header_comes_from_first_file_with_rows() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let empty = write_csv(dir.path(), "empty.csv", "old_a,old_b\n")?;
    let data = write_csv(dir.path(), "data.csv", "x,y\n1,2\n")?;

    let (out, diag, _) = run(&[empty, data], MergeOptions::default()).await?;

    assert_eq!(out, "x,y,filename\n1,2,data.csv\n");
    assert!(diag.is_empty());
    Ok(())
}

#[tokio::test]
async fn no_inputs_reports_once_and_writes_nothing() -> anyhow::Result<()> {
    let (out, diag, report) = run(&[], MergeOptions::default()).await?;

    assert!(out.is_empty());
    assert_eq!(diag, "no files to combine\n");
    assert_eq!(report, MergeReport::default());
    Ok(())
}

#[tokio::test]
async fn missing_file_is_reported_and_skipped() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let a = write_csv(dir.path(), "A.csv", "id\na1\n")?;
    let missing = dir.path().join("nope.csv");
    let b = write_csv(dir.path(), "B.csv", "id\nb1\n")?;

    let (out, diag, report) = run(&[a, missing.clone(), b], MergeOptions::default()).await?;

    assert_eq!(out, "id,filename\na1,A.csv\nb1,B.csv\n");
    assert_eq!(diag.lines().count(), 1);
    assert!(diag.starts_with("error reading file "));
    assert!(diag.contains(&missing.display().to_string()));
    assert_eq!(report.files_merged, 2);
    assert_eq!(report.files_skipped, 1);
    Ok(())
}

#[tokio::test]
async fn zero_byte_file_is_an_error() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let blank = write_csv(dir.path(), "blank.csv", "")?;
    let a = write_csv(dir.path(), "A.csv", "id\n1\n")?;

    let (out, diag, report) = run(&[blank, a], MergeOptions::default()).await?;

    assert_eq!(out, "id,filename\n1,A.csv\n");
    assert!(diag.contains("blank.csv"));
    assert!(diag.contains("no columns to parse"));
    assert_eq!(report.files_skipped, 1);
    Ok(())
}

#[tokio::test]
async fn columns_align_by_name_and_unknown_columns_skip_the_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let a = write_csv(dir.path(), "a.csv", "id,name,score\n1,ann,10\n")?;
    let reordered = write_csv(dir.path(), "b.csv", "score,id\n20,2\n")?;
    let extra = write_csv(dir.path(), "c.csv", "id,name,score,bonus\n3,cy,30,1\n")?;

    let (out, diag, report) = run(&[a, reordered, extra], MergeOptions::default()).await?;

    assert_eq!(out, "id,name,score,filename\n1,ann,10,a.csv\n2,,20,b.csv\n");
    assert!(diag.contains("c.csv"));
    assert!(diag.contains("bonus"));
    assert_eq!(report.files_skipped, 1);
    Ok(())
}

#[tokio::test]
async fn malformed_row_stops_that_file_only() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let bad = write_csv(dir.path(), "bad.csv", "a,b\n1,2\n3,4,5\n6,7\n")?;
    let good = write_csv(dir.path(), "good.csv", "a,b\n8,9\n")?;

    let (out, diag, report) = run(&[bad, good], chunked(1)).await?;

    // rows before the bad line were already emitted in their own batch
    assert_eq!(out, "a,b,filename\n1,2,bad.csv\n8,9,good.csv\n");
    assert_eq!(diag.lines().count(), 1);
    assert!(diag.contains("line 3"));
    assert_eq!(report.files_skipped, 1);
    assert_eq!(report.files_merged, 1);
    Ok(())
}

#[tokio::test]
async fn short_rows_are_padded_and_quoting_is_preserved() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let a = write_csv(dir.path(), "q.csv", "a,b,c\n\"x,y\",\"say \"\"hi\"\"\",z\n1\n")?;

    let (out, _, _) = run(&[a], MergeOptions::default()).await?;

    assert_eq!(
        out,
        "a,b,c,filename\n\"x,y\",\"say \"\"hi\"\"\",z,q.csv\n1,,,q.csv\n"
    );
    Ok(())
}

#[tokio::test]
async fn latin1_input_is_transcoded() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("legacy.csv");
    fs::write(&path, b"city\nMontr\xe9al\n")?;

    let options = MergeOptions::default().with_charset_label("latin1")?;
    let (out, diag, _) = run(&[path], options).await?;

    assert!(diag.is_empty());
    assert_eq!(out, "city,filename\nMontréal,legacy.csv\n");
    Ok(())
}

#[tokio::test]
async fn utf8_bom_is_not_part_of_the_header() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("bom.csv");
    fs::write(&path, b"\xEF\xBB\xBFid\n1\n")?;

    let (out, _, _) = run(&[path], MergeOptions::default()).await?;

    assert_eq!(out, "id,filename\n1,bom.csv\n");
    Ok(())
}

#[tokio::test]
async fn segments_stream_is_lazy_and_bounded() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let a = write_csv(dir.path(), "A.csv", "id\n1\n2\n3\n4\n5\n")?;
    let missing = dir.path().join("missing.csv");

    let segments = Combiner::new([a, missing], chunked(2)).segments();
    futures::pin_mut!(segments);

    let mut sizes = Vec::new();
    let mut headers = 0;
    let mut errors = 0;
    while let Some(item) = segments.next().await {
        match item {
            Ok(segment) => {
                sizes.push(segment.rows());
                headers += usize::from(segment.includes_header());
            }
            Err(CombineError::FileRead(err)) => {
                assert!(err.path.ends_with("missing.csv"));
                errors += 1;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(sizes, [2, 2, 1]);
    assert_eq!(headers, 1);
    assert_eq!(errors, 1);
    Ok(())
}

#[test]
fn zero_chunk_size_is_rejected() {
    assert!(matches!(
        MergeOptions::new(0),
        Err(CombineError::InvalidChunkSize(0))
    ));
}
