
use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::info;

use super::config::Config;
use super::scoring::Category;

/// Levenshtein distance, iterative two-row DP over chars.
pub(crate) fn edit_distance(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }
    let mut a: Vec<char> = a.chars().collect();
    let mut b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }
    // Keep the shorter string on the inner loop.
    if a.len() > b.len() {
        std::mem::swap(&mut a, &mut b);
    }

    let mut prev: Vec<usize> = (0..=a.len()).collect();
    for (j, bj) in b.iter().enumerate() {
        let mut curr = Vec::with_capacity(a.len() + 1);
        curr.push(j + 1);
        for (i, ai) in a.iter().enumerate() {
            let cost = usize::from(ai != bj);
            let deletion = prev[i + 1] + 1;
            let insertion = curr[i] + 1;
            let substitution = prev[i] + cost;
            curr.push(deletion.min(insertion).min(substitution));
        }
        prev = curr;
    }
    prev[a.len()]
}

/// Levenshtein distance normalized to [0, 1] by the longer string.
pub(crate) fn normalized_distance(a: &str, b: &str) -> f64 {
    let len_a = a.chars().count();
    let len_b = b.chars().count();
    if len_a == 0 && len_b == 0 {
        return 0.0;
    }
    edit_distance(a, b) as f64 / len_a.max(len_b).max(1) as f64
}

#[derive(Debug, Clone)]
struct Candidate {
    word: String,
    pos: String,
    concept_id: String,
    category: Category,
}

#[derive(Debug, Default)]
struct Concept {
    pos: String,
    words: Vec<String>,
}

/// Picks the three distractor slots for one concept:
/// an Easy/Medium word at random, a Hard word at random, and the closest
/// word by edit distance. Falls back to the pooled candidates when a
/// primary pool is empty, and pads with empty strings as a last resort.
fn select_distractors(
    anchors: &[String],
    pos: &str,
    concept_id: &str,
    candidates: &[Candidate],
    rng: &mut StdRng,
) -> Vec<String> {
    let eligible = |c: &&Candidate| {
        c.pos == pos && c.concept_id != concept_id && !anchors.contains(&c.word)
    };

    let mut easy_med_pool: Vec<&str> = candidates
        .iter()
        .filter(eligible)
        .filter(|c| matches!(c.category, Category::Easy | Category::Medium))
        .map(|c| c.word.as_str())
        .collect();
    let mut hard_pool: Vec<&str> = candidates
        .iter()
        .filter(eligible)
        .filter(|c| c.category == Category::Hard)
        .map(|c| c.word.as_str())
        .collect();
    let edit_pool: Vec<&str> = candidates
        .iter()
        .filter(eligible)
        .map(|c| c.word.as_str())
        .collect();

    let mut picks: Vec<String> = Vec::with_capacity(3);

    easy_med_pool.shuffle(rng);
    if let Some(word) = easy_med_pool.first() {
        picks.push(format!("{} [rand]", word));
    }

    hard_pool.shuffle(rng);
    if let Some(word) = hard_pool.first() {
        picks.push(format!("{} [hard]", word));
    }

    // Closest candidates by normalized edit distance to any anchor,
    // capped at roughly two edits, random pick among the top 6.
    if !edit_pool.is_empty() {
        let mut scored: Vec<(f64, &str)> = edit_pool
            .iter()
            .map(|word| {
                let score = anchors
                    .iter()
                    .map(|anchor| normalized_distance(word, anchor))
                    .fold(f64::INFINITY, f64::min);
                let score = if score.is_finite() { score } else { 1.0 };
                (score, *word)
            })
            .filter(|(score, word)| *score <= 2.0 / word.chars().count().max(1) as f64)
            .collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));
        let mut top_edit: Vec<&str> = scored.iter().take(6).map(|(_, word)| *word).collect();
        top_edit.shuffle(rng);
        if let Some(word) = top_edit.first() {
            picks.push(format!("{} [edit]", word));
        }
    }

    // Fallback fill from the pooled candidates.
    let mut fallback: Vec<&str> = Vec::new();
    fallback.extend(&easy_med_pool);
    fallback.extend(&hard_pool);
    fallback.extend(&edit_pool);
    fallback.shuffle(rng);

    let mut picked_words: HashSet<String> = picks
        .iter()
        .filter_map(|p| p.split(" [").next().map(String::from))
        .collect();
    for word in fallback {
        if picks.len() >= 3 {
            break;
        }
        if picked_words.contains(word) || anchors.iter().any(|a| a == word) {
            continue;
        }
        picks.push(format!("{} [rand]", word));
        picked_words.insert(word.to_string());
    }
    while picks.len() < 3 {
        picks.push(String::new());
    }
    picks.truncate(3);
    picks
}

/// Loads the triplet-complete long-form table into concepts and the flat
/// candidate pool.
fn load_pool(path: &Path) -> Result<(HashMap<String, Concept>, Vec<Candidate>)> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut concepts: HashMap<String, Concept> = HashMap::new();
    let mut candidates: Vec<Candidate> = Vec::new();
    for row in reader.deserialize() {
        let row: HashMap<String, String> = row?;
        let cell = |col: &str| row.get(col).map(|v| v.trim().to_string()).unwrap_or_default();

        let concept_id = cell("ID");
        let word = cell("CODA");
        let category = match Category::parse(&cell("Category")) {
            Some(category) => category,
            None => continue,
        };
        if concept_id.is_empty() || word.is_empty() {
            continue;
        }
        let pos = cell("POS");

        let concept = concepts.entry(concept_id.clone()).or_default();
        concept.pos = pos.clone();
        concept.words.push(word.clone());
        candidates.push(Candidate {
            word,
            pos,
            concept_id,
            category,
        });
    }
    Ok((concepts, candidates))
}

/// Stage 5: fills Easy/Medium/Hard distractor columns on the targets table,
/// drawing candidates from the long-form triplet pool. Seeded so repeated
/// runs produce identical picks.
pub fn run(config: &Config) -> Result<()> {
    let targets_path = config.resolve(&config.files.output.targets);
    if !targets_path.exists() {
        bail!("targets file not found: {}", targets_path.display());
    }
    let pool_path = config.resolve(&config.files.output.targets_all_triplets);
    if !pool_path.exists() {
        bail!("long-form triplet file not found: {}", pool_path.display());
    }

    let (concepts, candidates) = load_pool(&pool_path)?;
    info!(
        concepts = concepts.len(),
        candidates = candidates.len(),
        "loaded distractor pool"
    );

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(&targets_path)
        .with_context(|| format!("failed to open {}", targets_path.display()))?;
    let mut out_fieldnames: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    for col in ["Easy_distractor", "Medium_distractor", "Hard_distractor"] {
        if !out_fieldnames.iter().any(|c| c == col) {
            out_fieldnames.push(String::from(col));
        }
    }

    let out_path = config.resolve(&config.files.output.targets_with_distractors);
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(&out_path)
        .with_context(|| format!("failed to create {}", out_path.display()))?;
    writer.write_record(&out_fieldnames)?;

    let mut rng = StdRng::seed_from_u64(config.distractors.seed);
    let mut filled = 0usize;
    let mut passed_through = 0usize;
    for row in reader.deserialize() {
        let mut row: HashMap<String, String> = row?;
        let concept_id = row.get("ID").map(|v| v.trim().to_string()).unwrap_or_default();

        match concepts.get(&concept_id) {
            Some(concept) => {
                let picks = select_distractors(
                    &concept.words,
                    &concept.pos,
                    &concept_id,
                    &candidates,
                    &mut rng,
                );
                row.insert(String::from("Easy_distractor"), picks[0].clone());
                row.insert(String::from("Medium_distractor"), picks[1].clone());
                row.insert(String::from("Hard_distractor"), picks[2].clone());
                filled += 1;
            }
            // No pool entry for this concept: write the row through.
            None => passed_through += 1,
        }

        let record: Vec<String> = out_fieldnames
            .iter()
            .map(|col| row.get(col).cloned().unwrap_or_default())
            .collect();
        writer.write_record(&record)?;
    }
    writer.flush()?;
    info!(
        filled,
        passed_through,
        path = %out_path.display(),
        "wrote targets with distractors"
    );

    Ok(())
}
