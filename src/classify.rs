use crate::grid::Grid;
use crate::types::{Aggregate, Record};
use geo::Point;

/// Parse one raw `latitude,longitude,language` line. Returns `None` for a
/// wrong field count, a non-numeric coordinate, or an empty language tag.
pub fn parse_record(line: &str) -> Option<Record> {
    let mut fields = line.trim().split(',');
    let latitude: f64 = fields.next()?.trim().parse().ok()?;
    let longitude: f64 = fields.next()?.trim().parse().ok()?;
    let language = fields.next()?.trim();
    if language.is_empty() || fields.next().is_some() {
        return None;
    }
    Some(Record {
        latitude,
        longitude,
        language: language.to_string(),
    })
}

/// Fold one raw line into the aggregate. Malformed lines and points outside
/// every cell are skipped without touching the three mappings; only the
/// drop counter records them. A skipped line never aborts the batch.
pub fn classify(line: &str, grid: &Grid, aggregate: &mut Aggregate) {
    let Some(record) = parse_record(line) else {
        aggregate.dropped += 1;
        return;
    };
    let point = Point::new(record.longitude, record.latitude);
    match grid.locate(point) {
        Some(cell) => {
            *aggregate.cell_counts.entry(cell).or_default() += 1;
            aggregate
                .cell_languages
                .entry(cell)
                .or_default()
                .insert(record.language.clone());
            *aggregate.language_counts.entry(record.language).or_default() += 1;
        }
        None => aggregate.dropped += 1,
    }
}

pub fn classify_batch(batch: &[String], grid: &Grid, aggregate: &mut Aggregate) {
    for line in batch {
        classify(line, grid, aggregate);
    }
}
