
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use anyhow::{bail, Context, Result};

use super::config::{CategoryThresholds, LevelThresholds, ScoringTableLayout};

/// Binary similarity flag: S (same) or D (different).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Similarity {
    Same,
    Different,
}

impl Similarity {
    pub fn parse(s: &str) -> Option<Similarity> {
        match s.trim() {
            "S" => Some(Similarity::Same),
            "D" => Some(Similarity::Different),
            _ => None,
        }
    }

    /// Maps a raw 0/1 feature cell; anything that is not 1 (or "S") is D.
    pub fn from_binary(raw: &str) -> Similarity {
        let raw = raw.trim();
        let same = match raw.parse::<i64>() {
            Ok(v) => v == 1,
            Err(_) => raw == "S",
        };
        if same {
            Similarity::Same
        } else {
            Similarity::Different
        }
    }
}

impl fmt::Display for Similarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Similarity::Same => write!(f, "S"),
            Similarity::Different => write!(f, "D"),
        }
    }
}

/// Bucketed feature level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Low,
    Mid,
    High,
}

impl Level {
    pub fn parse(s: &str) -> Option<Level> {
        match s.trim() {
            "L" => Some(Level::Low),
            "M" => Some(Level::Mid),
            "H" => Some(Level::High),
            _ => None,
        }
    }

    /// Rank for tie-breaking: H > M > L; a missing level ranks 0.
    pub fn rank(level: Option<Level>) -> u8 {
        match level {
            Some(Level::High) => 3,
            Some(Level::Mid) => 2,
            Some(Level::Low) => 1,
            None => 0,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Low => write!(f, "L"),
            Level::Mid => write!(f, "M"),
            Level::High => write!(f, "H"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Easy,
    Medium,
    Hard,
}

impl Category {
    pub fn parse(s: &str) -> Option<Category> {
        match s.trim() {
            "Easy" => Some(Category::Easy),
            "Medium" => Some(Category::Medium),
            "Hard" => Some(Category::Hard),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Easy => write!(f, "Easy"),
            Category::Medium => write!(f, "Medium"),
            Category::Hard => write!(f, "Hard"),
        }
    }
}

/// Buckets a raw feature value into L/M/H against configured cutoffs.
/// Takes f64 because RCom can be a non-integer average of per-root counts.
pub fn bucket(value: f64, thresholds: &LevelThresholds) -> Level {
    if value <= thresholds.low_max {
        Level::Low
    } else if value <= thresholds.medium_max {
        Level::Mid
    } else {
        Level::High
    }
}

/// Buckets a raw feature cell, or None if it does not parse as a number.
pub fn bucket_cell(raw: &str, thresholds: &LevelThresholds) -> Option<Level> {
    let value: f64 = raw.trim().parse().ok()?;
    Some(bucket(value, thresholds))
}

/// Maps an easiness score to its category band.
pub fn classify(score: i32, thresholds: &CategoryThresholds) -> Category {
    if score >= thresholds.easy_min {
        Category::Easy
    } else if score >= thresholds.medium_min {
        Category::Medium
    } else {
        Category::Hard
    }
}

/// One five-feature combination in the scoring grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Combination {
    pub asim: Similarity,
    pub fsim: Similarity,
    pub dfreq: Level,
    pub dcom: Level,
    pub rcom: Level,
}

/// Scoring grid: combination -> (score, category).
#[derive(Debug, Default)]
pub struct ScoringTable {
    combos: HashMap<Combination, (i32, Category)>,
}

impl ScoringTable {
    /// Parses the scoring-table CSV using the configured row offsets and
    /// column indices. Rows before the data start row are ignored, as are
    /// rows with empty or invalid key cells or a non-integer score. A row
    /// without an explicit category gets one inferred from the score.
    pub fn parse(
        path: &Path,
        layout: &ScoringTableLayout,
        thresholds: &CategoryThresholds,
    ) -> Result<ScoringTable> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("scoring table not found: {}", path.display()))?;

        let rows: Vec<csv::StringRecord> = reader
            .records()
            .collect::<Result<_, _>>()
            .with_context(|| format!("failed to read scoring table {}", path.display()))?;

        if layout.data_start_row == 0 {
            bail!("scoring table data_start_row is 1-based and must be at least 1");
        }
        if rows.len() < layout.data_start_row {
            bail!(
                "scoring table {} has {} rows, expected at least {}",
                path.display(),
                rows.len(),
                layout.data_start_row
            );
        }

        let cols = &layout.columns;
        let mut combos = HashMap::new();

        for row in &rows[layout.data_start_row - 1..] {
            let cell = |i: usize| row.get(i).unwrap_or("").trim();

            let asim = Similarity::parse(cell(cols.asim));
            let fsim = Similarity::parse(cell(cols.fsim));
            let dfreq = Level::parse(cell(cols.dfreq));
            let dcom = Level::parse(cell(cols.dcom));
            let rcom = Level::parse(cell(cols.rcom));

            let (asim, fsim, dfreq, dcom, rcom) = match (asim, fsim, dfreq, dcom, rcom) {
                (Some(a), Some(f), Some(df), Some(dc), Some(rc)) => (a, f, df, dc, rc),
                _ => continue,
            };

            let score: i32 = match cell(cols.score).parse() {
                Ok(score) => score,
                Err(_) => continue,
            };

            let category = Category::parse(cell(cols.category))
                .unwrap_or_else(|| classify(score, thresholds));

            // Later rows win on duplicate combinations.
            combos.insert(
                Combination {
                    asim,
                    fsim,
                    dfreq,
                    dcom,
                    rcom,
                },
                (score, category),
            );
        }

        Ok(ScoringTable { combos })
    }

    pub fn get(&self, combo: &Combination) -> Option<(i32, Category)> {
        self.combos.get(combo).copied()
    }

    pub fn len(&self) -> usize {
        self.combos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combos.is_empty()
    }
}
