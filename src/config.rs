
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Pipeline configuration loaded from a single JSON file.
///
/// All paths in `files` are relative to the directory containing the config
/// file; use [`Config::resolve`] to turn them into absolute paths.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub files: Files,
    pub scoring_table: ScoringTableLayout,
    pub frequencies_file: FrequenciesFile,
    pub mapping_thresholds: MappingThresholds,
    pub category_thresholds: CategoryThresholds,
    /// Dialect city label (e.g. "CAI") to region name.
    #[serde(default = "default_regions")]
    pub regions: HashMap<String, String>,
    #[serde(default)]
    pub distractors: DistractorSettings,
    /// Directory the config file was loaded from; anchor for relative paths.
    #[serde(skip)]
    root: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Files {
    pub input: InputFiles,
    pub intermediate: IntermediateFiles,
    pub output: OutputFiles,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputFiles {
    /// MADAR lexicon TSV (English/French/MSA/Dialect/CODA/MSA_lemma_POS).
    pub lexicon: PathBuf,
    /// MSA word frequency list, headerless word<TAB>count.
    pub msa_frequencies: PathBuf,
    /// Dialectal word frequency list, headerless word<TAB>count.
    pub da_frequencies: PathBuf,
    /// English/French transliteration table.
    pub transliterations: PathBuf,
    /// Dialectal word to cleaned root mapping.
    pub roots: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntermediateFiles {
    /// Curated per-word table with concept IDs and regions.
    pub scores: PathBuf,
    /// Feature table written by the extract stage.
    pub frequencies: PathBuf,
    /// Scoring-table CSV with the combination grid.
    pub scoring_table: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputFiles {
    pub easiness: PathBuf,
    pub targets: PathBuf,
    pub targets_all_long: PathBuf,
    pub targets_all_triplets: PathBuf,
    pub targets_with_distractors: PathBuf,
}

/// Where the combination grid sits inside the scoring-table CSV.
/// Row numbers are 1-based as they appear in a spreadsheet.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringTableLayout {
    pub header_row: usize,
    pub data_start_row: usize,
    pub columns: ScoringColumns,
}

/// 0-based column indices inside the scoring-table CSV.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringColumns {
    pub asim: usize,
    pub fsim: usize,
    pub dfreq: usize,
    pub dcom: usize,
    pub rcom: usize,
    pub score: usize,
    pub category: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FrequenciesFile {
    pub columns: FrequenciesColumns,
}

/// 0-based column indices inside the frequencies CSV used for RCom lookup.
#[derive(Debug, Clone, Deserialize)]
pub struct FrequenciesColumns {
    pub english: usize,
    pub french: usize,
    pub msa: usize,
    pub pos: usize,
    pub coda: usize,
    pub rcom: usize,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MappingThresholds {
    pub dfreq: LevelThresholds,
    pub dcom: LevelThresholds,
    pub rcom: LevelThresholds,
}

/// value <= low_max => L, value <= medium_max => M, otherwise H.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LevelThresholds {
    pub low_max: f64,
    pub medium_max: f64,
}

/// score >= easy_min => Easy, score >= medium_min => Medium, otherwise Hard.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CategoryThresholds {
    pub easy_min: i32,
    pub medium_min: i32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DistractorSettings {
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for DistractorSettings {
    fn default() -> Self {
        DistractorSettings {
            seed: default_seed(),
        }
    }
}

fn default_seed() -> u64 {
    42
}

/// MADAR 25-city map used when the config does not override `regions`.
fn default_regions() -> HashMap<String, String> {
    const PAIRS: &[(&str, &str)] = &[
        ("RAB", "Morocco+Algeria"),
        ("FES", "Morocco+Algeria"),
        ("ALG", "Morocco+Algeria"),
        ("TUN", "Tunisia+Libya"),
        ("SFA", "Tunisia+Libya"),
        ("BEN", "Tunisia+Libya"),
        ("TRI", "Tunisia+Libya"),
        ("ALX", "Egypt+Sudan"),
        ("CAI", "Egypt+Sudan"),
        ("ASW", "Egypt+Sudan"),
        ("KHA", "Egypt+Sudan"),
        ("ALE", "Syria, Lebanon, Jordan, Palestine"),
        ("DAM", "Syria, Lebanon, Jordan, Palestine"),
        ("BEI", "Syria, Lebanon, Jordan, Palestine"),
        ("AMM", "Syria, Lebanon, Jordan, Palestine"),
        ("JER", "Syria, Lebanon, Jordan, Palestine"),
        ("SAL", "Syria, Lebanon, Jordan, Palestine"),
        ("BAG", "Iraq"),
        ("BAS", "Iraq"),
        ("MOS", "Iraq"),
        ("DOH", "Qatar+Saudi+Oman+Yemen"),
        ("RIY", "Qatar+Saudi+Oman+Yemen"),
        ("JED", "Qatar+Saudi+Oman+Yemen"),
        ("MUS", "Qatar+Saudi+Oman+Yemen"),
        ("SAN", "Qatar+Saudi+Oman+Yemen"),
    ];
    PAIRS
        .iter()
        .map(|(k, v)| (String::from(*k), String::from(*v)))
        .collect()
}

impl Config {
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let f = File::open(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Config =
            serde_json::from_reader(BufReader::new(f)).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.root = path.parent().map_or_else(PathBuf::new, Path::to_path_buf);
        Ok(config)
    }

    /// Resolves a configured path against the config file's directory.
    pub fn resolve(&self, rel: &Path) -> PathBuf {
        if rel.is_absolute() {
            rel.to_path_buf()
        } else {
            self.root.join(rel)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"{
        "files": {
            "input": {
                "lexicon": "data/input/lexicon.tsv",
                "msa_frequencies": "data/input/msa_freq.tsv",
                "da_frequencies": "data/input/da_freq.tsv",
                "transliterations": "data/input/translit.tsv",
                "roots": "data/input/roots.tsv"
            },
            "intermediate": {
                "scores": "data/intermediate/scores.csv",
                "frequencies": "data/intermediate/frequencies.csv",
                "scoring_table": "data/intermediate/scoring_table.csv"
            },
            "output": {
                "easiness": "data/output/easiness.csv",
                "targets": "data/output/targets.csv",
                "targets_all_long": "data/output/targets_all_long.csv",
                "targets_all_triplets": "data/output/targets_all_triplets.csv",
                "targets_with_distractors": "data/output/targets_with_distractors.csv"
            }
        },
        "scoring_table": {
            "header_row": 13,
            "data_start_row": 14,
            "columns": {
                "asim": 0, "fsim": 1, "dfreq": 2, "dcom": 3, "rcom": 4,
                "score": 5, "category": 6
            }
        },
        "frequencies_file": {
            "columns": {
                "english": 0, "french": 1, "msa": 2, "pos": 3, "coda": 7, "rcom": 10
            }
        },
        "mapping_thresholds": {
            "dfreq": { "low_max": 2, "medium_max": 4 },
            "dcom": { "low_max": 2, "medium_max": 4 },
            "rcom": { "low_max": 2, "medium_max": 4 }
        },
        "category_thresholds": { "easy_min": 12, "medium_min": 8 }
    }"#;

    #[test]
    fn loads_minimal_config_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut f = File::create(&path).unwrap();
        f.write_all(MINIMAL.as_bytes()).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.scoring_table.data_start_row, 14);
        assert_eq!(config.distractors.seed, 42);
        assert_eq!(config.regions.get("CAI").unwrap(), "Egypt+Sudan");
        assert_eq!(
            config.resolve(Path::new("data/output/easiness.csv")),
            dir.path().join("data/output/easiness.csv")
        );
    }

    #[test]
    fn missing_config_is_reported() {
        let err = Config::load(Path::new("no/such/config.json")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }
}
