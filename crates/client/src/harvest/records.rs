//! CSV input and output for harvesting batches.

use std::path::Path;

use serde::Deserialize;
use sitecrawl_core::Error;
use url::Url;

use super::contacts::ContactRecord;
use crate::fetch::netloc;

/// Separator for multi-valued cells.
const MULTI_VALUE_SEPARATOR: &str = ";";

#[derive(Deserialize)]
struct WorkItemRow {
    url: String,
}

fn csv_error(path: &Path, err: csv::Error) -> Error {
    match err.into_kind() {
        csv::ErrorKind::Io(io) => Error::Io(io),
        other => Error::InvalidInput(format!("{}: {:?}", path.display(), other)),
    }
}

/// Domain of a work item: bare domains pass through, full URLs are reduced
/// to their host (and port).
pub fn work_item_domain(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.contains("://") {
        return Url::parse(raw).ok().and_then(|u| netloc(&u));
    }
    Some(raw.trim_end_matches('/').to_string())
}

/// Read the `url` column of a CSV file into a list of domains.
///
/// Blank or unparseable rows are skipped with a warning.
pub fn load_work_items(path: &Path) -> Result<Vec<String>, Error> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| csv_error(path, e))?;

    let mut domains = Vec::new();
    for (line, row) in reader.deserialize::<WorkItemRow>().enumerate() {
        let row = row.map_err(|e| csv_error(path, e))?;
        match work_item_domain(&row.url) {
            Some(domain) => domains.push(domain),
            None => tracing::warn!("skipping row {}: {:?}", line + 1, row.url),
        }
    }

    tracing::info!("loaded {} work items from {}", domains.len(), path.display());
    Ok(domains)
}

fn header(product_slots: usize) -> Vec<String> {
    let mut header: Vec<String> = ["url", "email", "facebook", "twitter"].iter().map(|s| s.to_string()).collect();
    for i in 1..=product_slots {
        header.push(format!("title_{i}"));
        header.push(format!("image_{i}"));
    }
    header
}

fn row(record: &ContactRecord) -> Vec<String> {
    let join = |values: &std::collections::BTreeSet<String>| {
        values.iter().map(String::as_str).collect::<Vec<_>>().join(MULTI_VALUE_SEPARATOR)
    };

    let mut row = vec![
        record.url.clone(),
        join(&record.contacts.emails),
        join(&record.contacts.facebook),
        join(&record.contacts.twitter),
    ];
    for product in &record.products {
        row.push(product.title.clone());
        row.push(product.image.clone());
    }
    row
}

/// Write records as CSV with a header derived from the first record.
///
/// An empty batch produces an empty file.
pub fn write_records(path: &Path, records: &[ContactRecord]) -> Result<(), Error> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;

    if let Some(first) = records.first() {
        writer.write_record(header(first.products.len())).map_err(|e| csv_error(path, e))?;
        for record in records {
            writer.write_record(row(record)).map_err(|e| csv_error(path, e))?;
        }
    }

    writer.flush()?;
    tracing::info!("wrote {} records to {}", records.len(), path.display());
    Ok(())
}
