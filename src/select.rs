// src/select.rs
//! Source-diverse batch selection.
//!
//! - Candidates are grouped by `source` (first-appearance order) and shuffled
//!   within each group.
//! - Sources are visited round-robin; each visit picks a uniformly random
//!   article of that source not yet taken in this call.
//! - Stops at `target`, when every candidate is taken, or after
//!   `sources × target` visits.

use std::collections::{HashMap, HashSet};

use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;

use crate::ingest::types::ArticleRecord;

pub fn select_diverse<R: Rng + ?Sized>(
    candidates: &[ArticleRecord],
    target: usize,
    rng: &mut R,
) -> Vec<ArticleRecord> {
    if candidates.is_empty() || target == 0 {
        return Vec::new();
    }

    let mut group_index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<Vec<&ArticleRecord>> = Vec::new();
    for a in candidates {
        let gi = *group_index.entry(a.source.as_str()).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[gi].push(a);
    }
    for g in groups.iter_mut() {
        g.shuffle(rng);
    }

    let mut selected: Vec<ArticleRecord> = Vec::with_capacity(target.min(candidates.len()));
    let mut taken: HashSet<&str> = HashSet::new();
    let max_steps = groups.len().saturating_mul(target);
    let mut step = 0usize;

    while selected.len() < target && selected.len() < candidates.len() && step < max_steps {
        let group = &groups[step % groups.len()];
        let available: Vec<&ArticleRecord> = group
            .iter()
            .copied()
            .filter(|a| !taken.contains(a.id.as_str()))
            .collect();
        if let Some(pick) = available.choose(rng) {
            taken.insert(pick.id.as_str());
            selected.push((*pick).clone());
        }
        step += 1;
    }

    selected
}
