//! BASMA easiness pipeline.
//!
//! Four sequential stages turn the MADAR lexicon and its side files into
//! per-word easiness scores and per-concept target selections, followed by
//! an optional distractor pass. Every stage is a pure function from input
//! files and configuration to output files.

pub mod config;
pub mod distractors;
pub mod easiness;
pub mod extract;
pub mod longform;
pub mod normalize;
pub mod scoring;
pub mod targets;
