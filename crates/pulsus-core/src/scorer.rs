//! Textual similarity scoring between an intent and a candidate.
//!
//! Two independent signals, linearly combined with the configured ranker
//! weights: an LCS-based name similarity and a Jaccard keyword overlap over
//! the candidate's documentation. The history signal is reserved and always
//! contributes zero.

use crate::config::RankerConfig;

/// Weighted combination of name similarity and doc overlap, in [0,1].
pub fn score(intent_text: &str, candidate_name: &str, candidate_doc: &str, weights: &RankerConfig) -> f64 {
    let name_sim = name_similarity(intent_text, candidate_name);
    let doc_sim = doc_overlap(intent_text, candidate_doc);
    (weights.name_weight * name_sim + weights.doc_weight * doc_sim + weights.history_weight * 0.0)
        .clamp(0.0, 1.0)
}

/// Normalized longest-common-subsequence ratio between the lowercased intent
/// text and the candidate name with its file extension stripped.
pub fn name_similarity(intent_text: &str, candidate_name: &str) -> f64 {
    let a: Vec<char> = intent_text.to_lowercase().chars().collect();
    let b: Vec<char> = strip_extension(candidate_name).to_lowercase().chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let lcs = lcs_len(&a, &b);
    2.0 * lcs as f64 / (a.len() + b.len()) as f64
}

/// Jaccard similarity between the alphabetic tokens (len >= 3) of the intent
/// text and the candidate documentation; 0 when either token set is empty.
pub fn doc_overlap(intent_text: &str, candidate_doc: &str) -> f64 {
    let a = keyword_set(intent_text);
    let b = keyword_set(candidate_doc);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(&b).count();
    let union = a.union(&b).count();
    intersection as f64 / union as f64
}

fn keyword_set(text: &str) -> std::collections::BTreeSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphabetic())
        .filter(|t| t.len() >= 3)
        .map(|t| t.to_string())
        .collect()
}

fn strip_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.contains(['/', '\\']) => stem,
        _ => name,
    }
}

// Rolling two-row DP; candidate names and intents are short.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut cur = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            cur[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(cur[j])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}
