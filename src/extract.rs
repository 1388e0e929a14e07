
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use tracing::{debug, info};

use super::config::Config;
use super::normalize::{split_variants, extract_pos, Normalizer};

/// One lexicon row after feature computation, before grouping.
#[derive(Debug)]
struct RawRow {
    english: String,
    french: String,
    msa: String,
    dialect: String,
    coda: String,
    pos: String,
    msa_frequency: f64,
    da_frequency: f64,
    asim: u8,
    fsim: u8,
    root: String,
}

/// One dialectal word form: lexicon rows grouped by
/// (English, French, MSA, POS, CODA).
#[derive(Debug)]
struct FeatureRow {
    english: String,
    french: String,
    msa: String,
    pos: String,
    dialects: String,
    coda: String,
    dcom_regions: String,
    dcom: usize,
    root: String,
    rcom_regions: String,
    rcom: f64,
    msa_frequency: f64,
    da_frequency: f64,
    msa_freq_log: i64,
    dfreq_log: i64,
    asim: u8,
    fsim: u8,
}

/// Concept identity used for root communality.
type ConceptKey = (String, String, String);

/// Maps a comma-separated dialect label list to its unique regions
/// (first-seen order) and their count. Labels missing from the map are
/// skipped.
fn dialects_to_regions(labels: &str, regions: &HashMap<String, String>) -> (String, usize) {
    let mut seen: Vec<&str> = Vec::new();
    for label in labels.split(',') {
        let label = label.trim();
        if label.is_empty() {
            continue;
        }
        if let Some(region) = regions.get(label) {
            if !seen.contains(&region.as_str()) {
                seen.push(region);
            }
        }
    }
    (seen.join(", "), seen.len())
}

/// Rounded log10 of a frequency; non-positive frequencies collapse to 0.
fn log_round(frequency: f64) -> i64 {
    if frequency > 0.0 {
        frequency.log10().round() as i64
    } else {
        0
    }
}

/// Renders a numeric cell without a trailing ".0" for whole values.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Loads a headerless word<TAB>frequency list. Keys are trimmed, and
/// diacritic-stripped first when `strip_diacritics` is set (MSA list).
fn load_frequency_list(
    path: &Path,
    normalizer: &Normalizer,
    strip_diacritics: bool,
) -> Result<HashMap<String, f64>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("frequency list not found: {}", path.display()))?;

    let mut map = HashMap::new();
    for record in reader.records() {
        let record = record?;
        let word = record.get(0).unwrap_or("");
        let word = if strip_diacritics {
            normalizer.strip_diacritics(word).trim().to_string()
        } else {
            word.trim().to_string()
        };
        if word.is_empty() {
            continue;
        }
        let frequency: f64 = record.get(1).unwrap_or("").trim().parse().unwrap_or(0.0);
        map.insert(word, frequency);
    }
    Ok(map)
}

/// Loads the transliteration table into gloss -> normalized variant lists.
fn load_transliterations(
    path: &Path,
    normalizer: &Normalizer,
) -> Result<(HashMap<String, Vec<String>>, HashMap<String, Vec<String>>)> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("transliteration file not found: {}", path.display()))?;

    let headers = reader.headers()?.clone();
    let col = |name: &str| header_index(&headers, name, path);
    let english_col = col("English Word")?;
    let french_col = col("French Word")?;
    let en_translit_col = col("EN_ARTransliteration")?;
    let fr_translit_col = col("FR_ARTransliteration")?;

    let split_normalized = |cell: &str| -> Vec<String> {
        cell.split(',')
            .map(|t| normalizer.remove_weak_letters(t.trim()))
            .collect()
    };

    let mut en_map = HashMap::new();
    let mut fr_map = HashMap::new();
    for record in reader.records() {
        let record = record?;
        let cell = |i: usize| record.get(i).unwrap_or("").trim();
        en_map.insert(
            cell(english_col).to_string(),
            split_normalized(cell(en_translit_col)),
        );
        fr_map.insert(
            cell(french_col).to_string(),
            split_normalized(cell(fr_translit_col)),
        );
    }
    Ok((en_map, fr_map))
}

/// Loads the dialectal word -> cleaned root mapping.
fn load_roots(path: &Path) -> Result<HashMap<String, String>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("roots file not found: {}", path.display()))?;

    let headers = reader.headers()?.clone();
    let word_col = header_index(&headers, "dia_word", path)?;
    let root_col = header_index(&headers, "cleaned_dia_root", path)?;

    let mut map = HashMap::new();
    for record in reader.records() {
        let record = record?;
        let word = record.get(word_col).unwrap_or("").trim();
        let root = record.get(root_col).unwrap_or("").trim();
        if !word.is_empty() {
            map.insert(word.to_string(), root.to_string());
        }
    }
    Ok(map)
}

fn header_index(headers: &csv::StringRecord, name: &str, path: &Path) -> Result<usize> {
    match headers.iter().position(|h| h.trim() == name) {
        Some(i) => Ok(i),
        None => bail!("column {:?} not found in {}", name, path.display()),
    }
}

/// Stage 1: reads the lexicon and its side files, computes the per-word
/// feature table and writes the frequencies CSV.
pub fn run(config: &Config) -> Result<()> {
    let normalizer = Normalizer::new();
    let input = &config.files.input;

    let msa_freq = load_frequency_list(&config.resolve(&input.msa_frequencies), &normalizer, true)?;
    let da_freq = load_frequency_list(&config.resolve(&input.da_frequencies), &normalizer, false)?;
    let (en_translit, fr_translit) =
        load_transliterations(&config.resolve(&input.transliterations), &normalizer)?;
    let roots = load_roots(&config.resolve(&input.roots))?;
    info!(
        msa_frequencies = msa_freq.len(),
        da_frequencies = da_freq.len(),
        transliterations = en_translit.len() + fr_translit.len(),
        roots = roots.len(),
        "loaded lexicon side files"
    );

    let lexicon_path = config.resolve(&input.lexicon);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_path(&lexicon_path)
        .with_context(|| format!("lexicon not found: {}", lexicon_path.display()))?;

    let headers = reader.headers()?.clone();
    let col = |name: &str| header_index(&headers, name, &lexicon_path);
    let english_col = col("English")?;
    let french_col = col("French")?;
    let msa_col = col("MSA")?;
    let dialect_col = col("Dialect")?;
    let coda_col = col("CODA")?;
    let pos_col = col("MSA_lemma_POS")?;

    let mut rows: Vec<RawRow> = Vec::new();
    for record in reader.records() {
        let record = record?;
        let cell = |i: usize| record.get(i).unwrap_or("").trim().to_string();

        let english = cell(english_col);
        let french = cell(french_col);
        let msa = cell(msa_col);
        let dialect = cell(dialect_col);
        let coda = cell(coda_col);
        let pos = extract_pos(&cell(pos_col)).unwrap_or_default();

        // MSA frequency sums over the undiacritized MSA variants.
        let msa_frequency: f64 = split_variants(&msa)
            .iter()
            .map(|part| {
                let key = normalizer.strip_diacritics(part);
                msa_freq.get(key.trim()).copied().unwrap_or(0.0)
            })
            .sum();

        // DA frequency sums over the whitespace tokens of the bare CODA.
        let da_frequency: f64 = normalizer
            .strip_punctuation(&coda)
            .split_whitespace()
            .map(|token| da_freq.get(token).copied().unwrap_or(0.0))
            .sum();

        // ASim: normalized CODA matches one of the normalized MSA variants.
        let coda_normalized = normalizer.remove_weak_letters(&coda);
        let asim = (!coda_normalized.is_empty()
            && msa
                .split(super::normalize::ARABIC_COMMA)
                .any(|part| normalizer.remove_weak_letters(part) == coda_normalized))
            as u8;

        // FSim: normalized CODA matches an English or French transliteration.
        let fsim = (!coda_normalized.is_empty()
            && en_translit
                .get(&english)
                .into_iter()
                .chain(fr_translit.get(&french))
                .flatten()
                .any(|t| t == &coda_normalized)) as u8;

        let root = roots.get(&coda).cloned().unwrap_or_default();

        rows.push(RawRow {
            english,
            french,
            msa,
            dialect,
            coda,
            pos,
            msa_frequency,
            da_frequency,
            asim,
            fsim,
            root,
        });
    }
    info!(rows = rows.len(), "read lexicon");

    // (root, concept) -> dialect labels, from the ungrouped rows.
    let mut root_concept_dialects: HashMap<(String, ConceptKey), BTreeSet<String>> = HashMap::new();
    for row in &rows {
        if row.dialect.is_empty() {
            continue;
        }
        let concept = (row.english.clone(), row.french.clone(), row.msa.clone());
        for root in split_variants(&row.root) {
            root_concept_dialects
                .entry((root, concept.clone()))
                .or_default()
                .insert(row.dialect.clone());
        }
    }
    let root_concept_regions: HashMap<(String, ConceptKey), (String, usize)> =
        root_concept_dialects
            .into_iter()
            .map(|(key, dialects)| {
                let joined = dialects.into_iter().collect::<Vec<_>>().join(", ");
                (key, dialects_to_regions(&joined, &config.regions))
            })
            .collect();

    // Group rows into one entry per dialectal word, first-seen order.
    let mut grouped: Vec<FeatureRow> = Vec::new();
    let mut index: HashMap<(String, String, String, String, String), usize> = HashMap::new();
    let mut dialect_sets: Vec<BTreeSet<String>> = Vec::new();
    for row in rows {
        let key = (
            row.english.clone(),
            row.french.clone(),
            row.msa.clone(),
            row.pos.clone(),
            row.coda.clone(),
        );
        match index.get(&key).copied() {
            Some(i) => {
                if !row.dialect.is_empty() {
                    dialect_sets[i].insert(row.dialect);
                }
            }
            None => {
                index.insert(key, grouped.len());
                let mut dialects = BTreeSet::new();
                if !row.dialect.is_empty() {
                    dialects.insert(row.dialect);
                }
                dialect_sets.push(dialects);
                grouped.push(FeatureRow {
                    english: row.english,
                    french: row.french,
                    msa: row.msa,
                    pos: row.pos,
                    dialects: String::new(),
                    coda: row.coda,
                    dcom_regions: String::new(),
                    dcom: 0,
                    root: row.root,
                    rcom_regions: String::new(),
                    rcom: 0.0,
                    msa_frequency: row.msa_frequency,
                    da_frequency: row.da_frequency,
                    msa_freq_log: 0,
                    dfreq_log: 0,
                    asim: row.asim,
                    fsim: row.fsim,
                });
            }
        }
    }

    for (row, dialects) in grouped.iter_mut().zip(dialect_sets) {
        row.dialects = dialects.into_iter().collect::<Vec<_>>().join(", ");
        let (regions, count) = dialects_to_regions(&row.dialects, &config.regions);
        row.dcom_regions = regions;
        row.dcom = count;
        row.msa_freq_log = log_round(row.msa_frequency);
        row.dfreq_log = log_round(row.da_frequency);
    }

    // Root communality per grouped row; rows without a root fall back to
    // the dialect communality values.
    grouped.par_iter_mut().for_each(|row| {
        let roots = split_variants(&row.root);
        if roots.is_empty() {
            row.rcom_regions = row.dcom_regions.clone();
            row.rcom = row.dcom as f64;
            return;
        }
        let concept = (row.english.clone(), row.french.clone(), row.msa.clone());
        let mut all_regions: BTreeSet<String> = BTreeSet::new();
        let mut counts: Vec<usize> = Vec::new();
        for root in roots {
            match root_concept_regions.get(&(root, concept.clone())) {
                Some((regions, count)) => {
                    counts.push(*count);
                    for region in regions.split(',') {
                        let region = region.trim();
                        if !region.is_empty() {
                            all_regions.insert(region.to_string());
                        }
                    }
                }
                None => counts.push(0),
            }
        }
        row.rcom_regions = all_regions.into_iter().collect::<Vec<_>>().join(", ");
        row.rcom = counts.iter().sum::<usize>() as f64 / counts.len() as f64;
    });

    let out_path = config.resolve(&config.files.intermediate.frequencies);
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(&out_path)
        .with_context(|| format!("failed to create {}", out_path.display()))?;
    writer.write_record([
        "English",
        "French",
        "MSA",
        "POS",
        "Dialect",
        "DCom_Regions",
        "DCom",
        "CODA",
        "Root",
        "RCom_Regions",
        "RCom",
        "MSA_Frequency",
        "DA_Frequency",
        "MSAFreq",
        "DFreq",
        "ASim",
        "FSim",
    ])?;
    for row in &grouped {
        let dcom = row.dcom.to_string();
        let rcom = format_number(row.rcom);
        let msa_frequency = format_number(row.msa_frequency);
        let da_frequency = format_number(row.da_frequency);
        let msa_freq_log = row.msa_freq_log.to_string();
        let dfreq_log = row.dfreq_log.to_string();
        let asim = row.asim.to_string();
        let fsim = row.fsim.to_string();
        writer.write_record([
            row.english.as_str(),
            row.french.as_str(),
            row.msa.as_str(),
            row.pos.as_str(),
            row.dialects.as_str(),
            row.dcom_regions.as_str(),
            dcom.as_str(),
            row.coda.as_str(),
            row.root.as_str(),
            row.rcom_regions.as_str(),
            rcom.as_str(),
            msa_frequency.as_str(),
            da_frequency.as_str(),
            msa_freq_log.as_str(),
            dfreq_log.as_str(),
            asim.as_str(),
            fsim.as_str(),
        ])?;
    }
    writer.flush()?;
    debug!(path = %out_path.display(), "flushed frequencies table");
    info!(words = grouped.len(), "wrote frequencies table");

    Ok(())
}
