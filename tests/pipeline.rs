//! Runs all five stages against a small lexicon fixture and checks the
//! produced tables stage by stage.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use basma_rs::config::Config;
use basma_rs::{distractors, easiness, extract, longform, targets};

const CONFIG: &str = r#"{
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
        "header_row": 2,
        "data_start_row": 3,
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
        "dcom": { "low_max": 1, "medium_max": 2 },
        "rcom": { "low_max": 1, "medium_max": 2 }
    },
    "category_thresholds": { "easy_min": 12, "medium_min": 8 }
}"#;

const LEXICON: &str = "\
English\tFrench\tMSA\tDialect\tCODA\tMSA_lemma_POS\n\
house\tmaison\tبيت\tCAI\tبيت\tbayt_1_NOUN\n\
house\tmaison\tبيت\tALX\tبيت\tbayt_1_NOUN\n\
house\tmaison\tبيت\tBAG\tدار\tbayt_1_NOUN\n\
house\tmaison\tبيت\tBAG\tمنزل\tbayt_1_NOUN\n\
book\tlivre\tكتاب\tCAI\tكتاب\tkitAb_1_NOUN\n";

const MSA_FREQ: &str = "بيت\t1000\nكتاب\t100\n";
const DA_FREQ: &str = "بيت\t500\nدار\t20\nمنزل\t5\nكتاب\t100\n";

const TRANSLIT: &str = "\
English Word\tFrench Word\tEN_ARTransliteration\tFR_ARTransliteration\n\
house\tmaison\tهاوس\tميزون\n\
book\tlivre\tبوك\tليفر\n";

const ROOTS: &str = "\
dia_word\tcleaned_dia_root\n\
بيت\tبيت\n\
دار\tدور\n\
منزل\tنزل\n\
كتاب\tكتب\n";

// Curated per-word scores table consumed by the easiness stage.
const SCORES: &str = "\
ID,English,French,MSA,POS,CODA,Region,ASim,FSim,DFreq,DCom\n\
1,house,maison,بيت,NOUN,بيت,Cairo,1,0,3,1\n\
1,house,maison,بيت,NOUN,دار,Baghdad,0,0,1,1\n\
1,house,maison,بيت,NOUN,منزل,Baghdad,0,0,0,3\n\
1,house,maison,بيت,NOUN,شقة,Cairo,0,0,1,1\n\
2,book,livre,كتاب,NOUN,كتاب,Cairo,1,0,2,1\n";

const SCORING_TABLE: &str = "\
notes,,,,,,\n\
ASim,FSim,DFreq,DCom,RCom,Score,Category\n\
S,D,M,L,L,13,Easy\n\
D,D,L,L,L,9,Medium\n\
D,D,L,H,L,4,Hard\n\
S,D,L,L,L,12,\n";

fn write(root: &Path, rel: &str, body: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

fn read_rows(path: &Path) -> Vec<HashMap<String, String>> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader
        .deserialize()
        .collect::<Result<Vec<HashMap<String, String>>, _>>()
        .unwrap()
}

fn find<'a>(
    rows: &'a [HashMap<String, String>],
    col: &str,
    value: &str,
) -> &'a HashMap<String, String> {
    rows.iter()
        .find(|r| r.get(col).map(String::as_str) == Some(value))
        .unwrap_or_else(|| panic!("no row with {} = {}", col, value))
}

fn setup() -> (tempfile::TempDir, Config) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "config.json", CONFIG);
    write(root, "data/input/lexicon.tsv", LEXICON);
    write(root, "data/input/msa_freq.tsv", MSA_FREQ);
    write(root, "data/input/da_freq.tsv", DA_FREQ);
    write(root, "data/input/translit.tsv", TRANSLIT);
    write(root, "data/input/roots.tsv", ROOTS);
    write(root, "data/intermediate/scores.csv", SCORES);
    write(root, "data/intermediate/scoring_table.csv", SCORING_TABLE);
    let config = Config::load(&root.join("config.json")).unwrap();
    (dir, config)
}

#[test]
fn full_pipeline_produces_expected_tables() {
    let (dir, config) = setup();
    let root = dir.path();

    // Stage 1: extraction.
    extract::run(&config).unwrap();
    let frequencies = read_rows(&root.join("data/intermediate/frequencies.csv"));
    assert_eq!(frequencies.len(), 4); // بيت rows grouped into one

    let bayt = find(&frequencies, "CODA", "بيت");
    assert_eq!(bayt.get("Dialect").unwrap(), "ALX, CAI");
    assert_eq!(bayt.get("DCom_Regions").unwrap(), "Egypt+Sudan");
    assert_eq!(bayt.get("DCom").unwrap(), "1");
    assert_eq!(bayt.get("DFreq").unwrap(), "3"); // log10(500) rounds to 3
    assert_eq!(bayt.get("ASim").unwrap(), "1");
    assert_eq!(bayt.get("FSim").unwrap(), "0");
    assert_eq!(bayt.get("RCom").unwrap(), "1");

    let dar = find(&frequencies, "CODA", "دار");
    assert_eq!(dar.get("ASim").unwrap(), "0");
    assert_eq!(dar.get("DCom_Regions").unwrap(), "Iraq");
    assert_eq!(dar.get("MSA_Frequency").unwrap(), "1000"); // shared MSA gloss

    // Stage 2: easiness.
    easiness::run(&config).unwrap();
    let rows = read_rows(&root.join("data/output/easiness.csv"));
    assert_eq!(rows.len(), 5);

    let bayt = find(&rows, "CODA", "بيت");
    assert_eq!(bayt.get("ASimLevel").unwrap(), "S");
    assert_eq!(bayt.get("DFreqLevel").unwrap(), "M");
    assert_eq!(bayt.get("DComLevel").unwrap(), "L");
    assert_eq!(bayt.get("RComLevel").unwrap(), "L");
    assert_eq!(bayt.get("EasinessScore").unwrap(), "13");
    assert_eq!(bayt.get("EasinessCategory").unwrap(), "Easy");

    let dar = find(&rows, "CODA", "دار");
    assert_eq!(dar.get("EasinessScore").unwrap(), "9");
    assert_eq!(dar.get("EasinessCategory").unwrap(), "Medium");

    let manzel = find(&rows, "CODA", "منزل");
    assert_eq!(manzel.get("DComLevel").unwrap(), "H");
    assert_eq!(manzel.get("EasinessCategory").unwrap(), "Hard");

    // No frequencies entry: RCom stays empty and the word goes unscored.
    let sheqqa = find(&rows, "CODA", "شقة");
    assert_eq!(sheqqa.get("RCom").unwrap(), "");
    assert_eq!(sheqqa.get("EasinessScore").unwrap(), "");
    assert_eq!(sheqqa.get("EasinessCategory").unwrap(), "");

    // Blank category cell in the scoring table: inferred from score 12.
    let kitab = find(&rows, "CODA", "كتاب");
    assert_eq!(kitab.get("EasinessScore").unwrap(), "12");
    assert_eq!(kitab.get("EasinessCategory").unwrap(), "Easy");

    // Stage 3: targets. Only concept 1 covers all three bands.
    targets::run(&config).unwrap();
    let rows = read_rows(&root.join("data/output/targets.csv"));
    assert_eq!(rows.len(), 1);
    let concept = &rows[0];
    assert_eq!(concept.get("ID").unwrap(), "1");
    assert_eq!(concept.get("EasyCODA").unwrap(), "بيت");
    assert_eq!(concept.get("EasyRegion").unwrap(), "Cairo");
    assert_eq!(concept.get("MediumCODA").unwrap(), "دار");
    assert_eq!(concept.get("HardCODA").unwrap(), "منزل");
    assert_eq!(concept.get("HardEasinessScore").unwrap(), "4");

    // Stage 4: long form. All categorized words, then triplet concepts only.
    longform::run(&config).unwrap();
    let all = read_rows(&root.join("data/output/targets_all_long.csv"));
    assert_eq!(all.len(), 4); // شقة has no category and is dropped
    let triplets = read_rows(&root.join("data/output/targets_all_triplets.csv"));
    assert_eq!(triplets.len(), 3);
    assert!(triplets.iter().all(|r| r.get("ID").unwrap() == "1"));

    // Stage 5: distractors. The pool has a single concept, so every slot
    // falls through to the empty-string padding.
    distractors::run(&config).unwrap();
    let rows = read_rows(&root.join("data/output/targets_with_distractors.csv"));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("Easy_distractor").unwrap(), "");
    assert_eq!(rows[0].get("Medium_distractor").unwrap(), "");
    assert_eq!(rows[0].get("Hard_distractor").unwrap(), "");
}

#[test]
fn easiness_reruns_are_deterministic() {
    let (dir, config) = setup();
    let root = dir.path();

    extract::run(&config).unwrap();
    easiness::run(&config).unwrap();
    let first = fs::read(root.join("data/output/easiness.csv")).unwrap();
    easiness::run(&config).unwrap();
    let second = fs::read(root.join("data/output/easiness.csv")).unwrap();
    assert_eq!(first, second);
}

#[test]
fn missing_scores_file_is_a_hard_error() {
    let (dir, config) = setup();
    fs::remove_file(dir.path().join("data/intermediate/scores.csv")).unwrap();
    let err = easiness::run(&config).unwrap_err();
    assert!(err.to_string().contains("scores file not found"));
}
