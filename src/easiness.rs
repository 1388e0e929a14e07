
use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use super::config::{Config, FrequenciesColumns};
use super::scoring::{bucket_cell, Combination, ScoringTable, Similarity};

type WordKey = (String, String, String, String, String);

/// Loads raw RCom values from the frequencies table, keyed by
/// (English, French, MSA, POS, CODA). A missing file leaves the lookup
/// empty; stage 1 may have been skipped.
fn load_rcom_lookup(path: &Path, cols: &FrequenciesColumns) -> Result<HashMap<WordKey, String>> {
    let mut lookup = HashMap::new();
    if !path.exists() {
        warn!(path = %path.display(), "frequencies file not found, RCom lookup is empty");
        return Ok(lookup);
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open frequencies file {}", path.display()))?;

    for record in reader.records() {
        let record = record?;
        let cell = |i: usize| record.get(i).unwrap_or("").trim().to_string();
        let key = (
            cell(cols.english),
            cell(cols.french),
            cell(cols.msa),
            cell(cols.pos),
            cell(cols.coda),
        );
        let rcom = cell(cols.rcom);
        let complete =
            !key.0.is_empty() && !key.1.is_empty() && !key.2.is_empty() && !key.3.is_empty()
                && !key.4.is_empty();
        if complete && !rcom.is_empty() {
            lookup.insert(key, rcom);
        }
    }
    Ok(lookup)
}

/// Output header: the input header with RCom inserted right after DCom,
/// then the level/score columns appended, RComLevel right after DComLevel.
fn output_columns(fieldnames: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(fieldnames.len() + 8);
    for col in fieldnames {
        out.push(col.clone());
        if col == "DCom" && !fieldnames.iter().any(|c| c == "RCom") {
            out.push(String::from("RCom"));
        }
    }

    const EXTRA: [&str; 6] = [
        "ASimLevel",
        "FSimLevel",
        "DFreqLevel",
        "DComLevel",
        "EasinessScore",
        "EasinessCategory",
    ];
    for col in EXTRA {
        if !out.iter().any(|c| c == col) {
            out.push(String::from(col));
            if col == "DComLevel" && !out.iter().any(|c| c == "RComLevel") {
                out.push(String::from("RComLevel"));
            }
        }
    }
    if let Some(i) = out.iter().position(|c| c == "DComLevel") {
        if !out.iter().any(|c| c == "RComLevel") {
            out.insert(i + 1, String::from("RComLevel"));
        }
    }
    out
}

/// Stage 2: maps raw features to levels, looks up the easiness score per
/// five-feature combination and writes the per-word easiness table.
pub fn run(config: &Config) -> Result<()> {
    let scores_path = config.resolve(&config.files.intermediate.scores);
    if !scores_path.exists() {
        bail!("scores file not found: {}", scores_path.display());
    }

    let table_path = config.resolve(&config.files.intermediate.scoring_table);
    let table = ScoringTable::parse(
        &table_path,
        &config.scoring_table,
        &config.category_thresholds,
    )?;
    info!(combinations = table.len(), "loaded scoring table");

    let frequencies_path = config.resolve(&config.files.intermediate.frequencies);
    let rcom_lookup = load_rcom_lookup(&frequencies_path, &config.frequencies_file.columns)?;
    info!(entries = rcom_lookup.len(), "loaded RCom lookup");

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(&scores_path)
        .with_context(|| format!("failed to open scores file {}", scores_path.display()))?;
    let fieldnames: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    let out_fieldnames = output_columns(&fieldnames);

    let out_path = config.resolve(&config.files.output.easiness);
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(&out_path)
        .with_context(|| format!("failed to create {}", out_path.display()))?;
    writer.write_record(&out_fieldnames)?;

    let thresholds = &config.mapping_thresholds;
    let mut written = 0usize;
    let mut unscored = 0usize;
    for row in reader.deserialize() {
        let mut row: HashMap<String, String> = row?;
        let get = |row: &HashMap<String, String>, col: &str| {
            row.get(col).map(|v| v.trim().to_string()).unwrap_or_default()
        };

        let asim = Similarity::from_binary(&get(&row, "ASim"));
        let fsim = Similarity::from_binary(&get(&row, "FSim"));
        let dfreq = bucket_cell(&get(&row, "DFreq"), &thresholds.dfreq);
        let dcom = bucket_cell(&get(&row, "DCom"), &thresholds.dcom);

        let lookup_key = (
            get(&row, "English"),
            get(&row, "French"),
            get(&row, "MSA"),
            get(&row, "POS"),
            get(&row, "CODA"),
        );
        let rcom_raw = rcom_lookup.get(&lookup_key).cloned().unwrap_or_default();
        let rcom = if rcom_raw.is_empty() {
            None
        } else {
            bucket_cell(&rcom_raw, &thresholds.rcom)
        };

        let scored = match (dfreq, dcom, rcom) {
            (Some(dfreq), Some(dcom), Some(rcom)) => table.get(&Combination {
                asim,
                fsim,
                dfreq,
                dcom,
                rcom,
            }),
            _ => None,
        };

        row.insert(String::from("ASimLevel"), asim.to_string());
        row.insert(String::from("FSimLevel"), fsim.to_string());
        row.insert(
            String::from("DFreqLevel"),
            dfreq.map(|l| l.to_string()).unwrap_or_default(),
        );
        row.insert(
            String::from("DComLevel"),
            dcom.map(|l| l.to_string()).unwrap_or_default(),
        );
        row.insert(String::from("RCom"), rcom_raw);
        row.insert(
            String::from("RComLevel"),
            rcom.map(|l| l.to_string()).unwrap_or_default(),
        );
        match scored {
            Some((score, category)) => {
                row.insert(String::from("EasinessScore"), score.to_string());
                row.insert(String::from("EasinessCategory"), category.to_string());
            }
            None => {
                unscored += 1;
                row.insert(String::from("EasinessScore"), String::new());
                row.insert(String::from("EasinessCategory"), String::new());
            }
        }

        let record: Vec<String> = out_fieldnames
            .iter()
            .map(|col| row.get(col).cloned().unwrap_or_default())
            .collect();
        writer.write_record(&record)?;
        written += 1;
    }
    writer.flush()?;
    info!(
        words = written,
        unscored,
        path = %out_path.display(),
        "wrote easiness table"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn rcom_follows_dcom_and_levels_follow_in_order() {
        let input = names(&["ID", "English", "CODA", "ASim", "FSim", "DFreq", "DCom"]);
        let out = output_columns(&input);
        let pos = |name: &str| out.iter().position(|c| c == name).unwrap();
        assert_eq!(pos("RCom"), pos("DCom") + 1);
        assert_eq!(pos("RComLevel"), pos("DComLevel") + 1);
        assert_eq!(
            out.last().map(String::as_str),
            Some("EasinessCategory")
        );
    }

    #[test]
    fn existing_columns_are_not_duplicated() {
        let input = names(&["ID", "DCom", "RCom", "DComLevel", "RComLevel"]);
        let out = output_columns(&input);
        assert_eq!(out.iter().filter(|c| c.as_str() == "RCom").count(), 1);
        assert_eq!(out.iter().filter(|c| c.as_str() == "RComLevel").count(), 1);
    }
}
