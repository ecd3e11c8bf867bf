use std::io;
use std::path::Path;

use fs_err::File;
use lcrawl_crawler::Record;

pub const CSV_HEADER: [&str; 5] = ["url", "title", "category", "grade", "localPath"];

/// Writes the whole record set as a pretty-printed JSON array.
pub fn write_json(path: &Path, records: &[Record]) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let mut wtr = io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut wtr, records)?;
    io::Write::flush(&mut wtr)?;
    Ok(())
}

/// Writes one CSV row per record, after a fixed header. Absent fields are left empty.
pub fn write_csv(path: &Path, records: &[Record]) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    wtr.write_record(CSV_HEADER)?;
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}
