use crate::grid::Grid;
use crate::types::{Aggregate, CellId};
use anyhow::Result;
use std::io::Write;

/// Render the three global mappings once, after the run completes. Cells
/// appear in load order and languages are sorted, so identical runs print
/// identical reports.
pub fn render(out: &mut impl Write, grid: &Grid, global: &Aggregate) -> Result<()> {
    writeln!(out, "Records per cell:")?;
    for (i, cell) in grid.cells().iter().enumerate() {
        let id = CellId(i);
        let Some(count) = global.cell_counts.get(&id) else {
            continue;
        };
        let mut languages: Vec<&str> = global
            .cell_languages
            .get(&id)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default();
        languages.sort_unstable();
        writeln!(
            out,
            "  {}: {} records, {} languages ({})",
            cell.name,
            count,
            languages.len(),
            languages.join(", ")
        )?;
    }

    writeln!(out, "Records per language:")?;
    let mut totals: Vec<(&str, u64)> = global
        .language_counts
        .iter()
        .map(|(lang, count)| (lang.as_str(), *count))
        .collect();
    // Busiest language first; ties broken alphabetically.
    totals.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    for (language, count) in totals {
        writeln!(out, "  {}: {}", language, count)?;
    }

    Ok(())
}
