
use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use tracing::info;

use super::config::Config;
use super::scoring::{Category, Level};

type Row = HashMap<String, String>;

/// Integer cell parser tolerating thousands separators and whitespace.
pub(crate) fn parse_int_safe(value: &str) -> Option<i64> {
    value.replace(',', "").trim().parse().ok()
}

fn cell<'a>(row: &'a Row, col: &str) -> &'a str {
    row.get(col).map(String::as_str).unwrap_or("")
}

/// Ranking tuple: easiness score first, then dialect and frequency levels
/// as tie-breakers (H > M > L).
fn score_tuple(row: &Row) -> (i64, u8, u8) {
    let score = parse_int_safe(cell(row, "EasinessScore")).unwrap_or(-1);
    let dcom = Level::rank(Level::parse(cell(row, "DComLevel")));
    let dfreq = Level::rank(Level::parse(cell(row, "DFreqLevel")));
    (score, dcom, dfreq)
}

/// Highest-ranked row; the first one wins on exact ties.
fn pick_best<'a>(rows: &[&'a Row]) -> Option<&'a Row> {
    let mut best: Option<(&Row, (i64, u8, u8))> = None;
    for row in rows {
        let rank = score_tuple(row);
        match best {
            Some((_, best_rank)) if rank <= best_rank => {}
            _ => best = Some((row, rank)),
        }
    }
    best.map(|(row, _)| row)
}

const FIELDNAMES: [&str; 14] = [
    "ID",
    "English",
    "French",
    "MSA",
    "POS",
    "EasyCODA",
    "EasyRegion",
    "EasyEasinessScore",
    "MediumCODA",
    "MediumRegion",
    "MediumEasinessScore",
    "HardCODA",
    "HardRegion",
    "HardEasinessScore",
];

/// Stage 3: picks the best Easy/Medium/Hard word per concept and writes one
/// wide row per concept that has all three categories.
pub fn run(config: &Config) -> Result<()> {
    let easiness_path = config.resolve(&config.files.output.easiness);
    if !easiness_path.exists() {
        bail!("easiness file not found: {}", easiness_path.display());
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(&easiness_path)
        .with_context(|| format!("failed to open {}", easiness_path.display()))?;

    let mut by_id: HashMap<String, Vec<Row>> = HashMap::new();
    for row in reader.deserialize() {
        let row: Row = row?;
        by_id
            .entry(cell(&row, "ID").to_string())
            .or_default()
            .push(row);
    }

    let mut out_rows: Vec<((i64, String), Vec<String>)> = Vec::new();
    for (concept_id, rows) in &by_id {
        let in_category = |category: Category| -> Vec<&Row> {
            rows.iter()
                .filter(|r| Category::parse(cell(r, "EasinessCategory")) == Some(category))
                .collect()
        };

        let best_easy = pick_best(&in_category(Category::Easy));
        let best_medium = pick_best(&in_category(Category::Medium));
        let best_hard = pick_best(&in_category(Category::Hard));

        // Only concepts covering all three bands are kept.
        let (easy, medium, hard) = match (best_easy, best_medium, best_hard) {
            (Some(e), Some(m), Some(h)) => (e, m, h),
            _ => continue,
        };

        // Shared concept metadata comes from the easy row.
        let record = vec![
            concept_id.clone(),
            cell(easy, "English").to_string(),
            cell(easy, "French").to_string(),
            cell(easy, "MSA").to_string(),
            cell(easy, "POS").to_string(),
            cell(easy, "CODA").to_string(),
            cell(easy, "Region").to_string(),
            cell(easy, "EasinessScore").to_string(),
            cell(medium, "CODA").to_string(),
            cell(medium, "Region").to_string(),
            cell(medium, "EasinessScore").to_string(),
            cell(hard, "CODA").to_string(),
            cell(hard, "Region").to_string(),
            cell(hard, "EasinessScore").to_string(),
        ];
        let sort_key = (
            parse_int_safe(concept_id).unwrap_or(i64::MAX),
            concept_id.clone(),
        );
        out_rows.push((sort_key, record));
    }

    out_rows.par_sort_unstable_by(|a, b| a.0.cmp(&b.0));

    let out_path = config.resolve(&config.files.output.targets);
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(&out_path)
        .with_context(|| format!("failed to create {}", out_path.display()))?;
    writer.write_record(FIELDNAMES)?;
    let count = out_rows.len();
    for (_, record) in out_rows {
        writer.write_record(&record)?;
    }
    writer.flush()?;
    info!(concepts = count, path = %out_path.display(), "wrote targets");

    Ok(())
}
