use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::review::{Field, ListingMetadata, RawReview};

const COLUMNS: [&str; 5] = ["Product Name", "Average Rating", "User Rating", "Title", "Review"];

#[derive(Debug, Serialize, Deserialize)]
struct ExportRow {
    #[serde(rename = "Product Name")]
    item_name: String,
    #[serde(rename = "Average Rating")]
    aggregate_rating: String,
    #[serde(rename = "User Rating")]
    declared_rating: String,
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Review")]
    body: String,
}

/// Write the flat review table. Listing metadata appears on the first row
/// only; later rows leave those columns blank.
pub fn write_reviews<W: Write>(
    out: W,
    metadata: &ListingMetadata,
    reviews: &[RawReview],
) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(out);
    writer.write_record(COLUMNS)?;
    for (i, r) in reviews.iter().enumerate() {
        let (item_name, aggregate_rating) = if i == 0 {
            (metadata.item_name.clone(), metadata.aggregate_rating.clone())
        } else {
            (String::new(), String::new())
        };
        writer.serialize(ExportRow {
            item_name,
            aggregate_rating,
            declared_rating: r.declared_rating.text().to_string(),
            title: r.title.text().to_string(),
            body: r.body.text().to_string(),
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a table written by [`write_reviews`]. Metadata comes from the first
/// row, falling back to the unknown sentinels for an empty table.
pub fn read_reviews<R: Read>(input: R) -> Result<(ListingMetadata, Vec<RawReview>)> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);
    let mut metadata = ListingMetadata::default();
    let mut reviews = Vec::new();

    for (i, row) in reader.deserialize::<ExportRow>().enumerate() {
        let row = row.with_context(|| format!("bad review row {}", i + 1))?;
        if i == 0 {
            metadata = ListingMetadata {
                item_name: row.item_name,
                aggregate_rating: row.aggregate_rating,
            };
        }
        reviews.push(RawReview {
            declared_rating: Field::from_export(&row.declared_rating),
            title: Field::from_export(&row.title),
            body: Field::from_export(&row.body),
        });
    }
    Ok((metadata, reviews))
}

pub fn save_csv(path: &Path, metadata: &ListingMetadata, reviews: &[RawReview]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    write_reviews(file, metadata, reviews)
        .with_context(|| format!("failed to write {}", path.display()))
}

pub fn load_csv(path: &Path) -> Result<(ListingMetadata, Vec<RawReview>)> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    read_reviews(file).with_context(|| format!("failed to read {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (ListingMetadata, Vec<RawReview>) {
        let metadata = ListingMetadata {
            item_name: "Acme Kettle, 1.5L".into(),
            aggregate_rating: "4.3".into(),
        };
        let reviews = vec![
            RawReview {
                declared_rating: Field::Value("5".into()),
                title: Field::Value("Brilliant".into()),
                body: Field::Value("Boils fast, \"quiet\" too".into()),
            },
            RawReview {
                declared_rating: Field::Unavailable,
                title: Field::Unavailable,
                body: Field::Value("Lid broke".into()),
            },
        ];
        (metadata, reviews)
    }

    fn to_string(metadata: &ListingMetadata, reviews: &[RawReview]) -> String {
        let mut buf = Vec::new();
        write_reviews(&mut buf, metadata, reviews).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn metadata_only_on_first_row() {
        let (metadata, reviews) = sample();
        let text = to_string(&metadata, &reviews);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Product Name,Average Rating,User Rating,Title,Review");
        assert_eq!(lines[1], r#""Acme Kettle, 1.5L",4.3,5,Brilliant,"Boils fast, ""quiet"" too""#);
        assert_eq!(lines[2], ",,NA,NA,Lid broke");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn reads_back_what_it_writes() {
        let (metadata, reviews) = sample();
        let text = to_string(&metadata, &reviews);
        let (m, r) = read_reviews(text.as_bytes()).unwrap();
        assert_eq!(m, metadata);
        assert_eq!(r, reviews);
    }

    #[test]
    fn empty_table_keeps_header_and_sentinels() {
        let text = to_string(&ListingMetadata::default(), &[]);
        assert_eq!(text.trim_end(), COLUMNS.join(","));
        let (m, r) = read_reviews(text.as_bytes()).unwrap();
        assert_eq!(m, ListingMetadata::default());
        assert!(r.is_empty());
    }
}
