
use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::info;

use super::config::Config;
use super::scoring::Category;

const FIELDNAMES: [&str; 13] = [
    "ID",
    "English",
    "French",
    "MSA",
    "POS",
    "Category",
    "CODA",
    "Region",
    "ASimLevel",
    "FSimLevel",
    "DFreqLevel",
    "DComLevel",
    "EasinessScore",
];

fn write_rows(path: &Path, rows: &[(String, Vec<String>)], keep: impl Fn(&str) -> bool) -> Result<usize> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    writer.write_record(FIELDNAMES)?;
    let mut written = 0usize;
    for (id, record) in rows {
        if keep(id) {
            writer.write_record(record)?;
            written += 1;
        }
    }
    writer.flush()?;
    Ok(written)
}

/// Stage 4: emits all categorized words per concept in long form, plus the
/// same rows filtered to concepts that have all three categories.
pub fn run(config: &Config) -> Result<()> {
    let easiness_path = config.resolve(&config.files.output.easiness);
    if !easiness_path.exists() {
        bail!("easiness file not found: {}", easiness_path.display());
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(&easiness_path)
        .with_context(|| format!("failed to open {}", easiness_path.display()))?;

    let mut rows: Vec<(String, Vec<String>)> = Vec::new();
    let mut categories_by_id: HashMap<String, HashSet<Category>> = HashMap::new();
    for row in reader.deserialize() {
        let row: HashMap<String, String> = row?;
        let cell = |col: &str| row.get(col).cloned().unwrap_or_default();

        let category = match Category::parse(&cell("EasinessCategory")) {
            Some(category) => category,
            None => continue,
        };
        let concept_id = cell("ID");
        categories_by_id
            .entry(concept_id.clone())
            .or_default()
            .insert(category);
        rows.push((
            concept_id.clone(),
            vec![
                concept_id,
                cell("English"),
                cell("French"),
                cell("MSA"),
                cell("POS"),
                category.to_string(),
                cell("CODA"),
                cell("Region"),
                cell("ASimLevel"),
                cell("FSimLevel"),
                cell("DFreqLevel"),
                cell("DComLevel"),
                cell("EasinessScore"),
            ],
        ));
    }

    let all_path = config.resolve(&config.files.output.targets_all_long);
    let written = write_rows(&all_path, &rows, |_| true)?;
    info!(words = written, path = %all_path.display(), "wrote long-form table");

    let triplet_ids: HashSet<String> = categories_by_id
        .into_iter()
        .filter(|(_, categories)| categories.len() == 3)
        .map(|(id, _)| id)
        .collect();
    let triplet_path = config.resolve(&config.files.output.targets_all_triplets);
    let written = write_rows(&triplet_path, &rows, |id| triplet_ids.contains(id))?;
    info!(
        words = written,
        concepts = triplet_ids.len(),
        path = %triplet_path.display(),
        "wrote triplet-complete long-form table"
    );

    Ok(())
}
