//! Multi-pass recognition plans and candidate voting
//!
//! Each region is recognized several times with different segmentation
//! modes. Candidates are scored as `confidence * 1000 + min(len, 200)`: a
//! confident reading wins, but a much longer reading can overtake a short one
//! that is only marginally more confident, up to the capped length bonus.

use super::types::{OcrResult, PageSegMode};
use crate::fields::FieldProfile;

/// Characters allowed in dates
pub const DATE_WHITELIST: &str = "0123456789/.-";

/// Characters allowed in identifiers
pub const IDENTIFIER_WHITELIST: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_./";

/// Length bonus cap in the candidate score
pub const MAX_LENGTH_BONUS: usize = 200;

/// One recognition attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OcrPass {
    pub psm: PageSegMode,
    pub whitelist: Option<&'static str>,
}

/// Passes to run for a field profile, in tie-break order
pub fn plan(profile: FieldProfile) -> Vec<OcrPass> {
    let (modes, whitelist): (&[PageSegMode], Option<&'static str>) = match profile {
        FieldProfile::Date => (
            &[PageSegMode::SingleLine, PageSegMode::SingleWord, PageSegMode::SingleBlock],
            Some(DATE_WHITELIST),
        ),
        FieldProfile::Identifier => (
            &[PageSegMode::SingleLine, PageSegMode::SingleWord, PageSegMode::SingleBlock],
            Some(IDENTIFIER_WHITELIST),
        ),
        FieldProfile::FreeText => (
            &[PageSegMode::SingleBlock, PageSegMode::SingleColumn, PageSegMode::Auto],
            None,
        ),
    };
    modes
        .iter()
        .map(|&psm| OcrPass { psm, whitelist })
        .collect()
}

/// Candidate score
pub fn score(result: &OcrResult) -> f64 {
    let length = result.text.trim().chars().count().min(MAX_LENGTH_BONUS);
    result.confidence as f64 * 1000.0 + length as f64
}

/// Index and value of the highest-scoring candidate.
///
/// Ties go to the earliest candidate.
pub fn select_best<I>(candidates: I) -> Option<(usize, OcrResult)>
where
    I: IntoIterator<Item = OcrResult>,
{
    let mut best: Option<(usize, f64, OcrResult)> = None;
    for (index, candidate) in candidates.into_iter().enumerate() {
        let candidate_score = score(&candidate);
        let better = match &best {
            Some((_, best_score, _)) => candidate_score > *best_score,
            None => true,
        };
        if better {
            best = Some((index, candidate_score, candidate));
        }
    }
    best.map(|(index, _, result)| (index, result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plans_use_field_whitelists() {
        let date = plan(FieldProfile::Date);
        assert_eq!(date.len(), 3);
        assert!(date.iter().all(|p| p.whitelist == Some(DATE_WHITELIST)));

        let ident = plan(FieldProfile::Identifier);
        assert!(ident.iter().all(|p| p.whitelist == Some(IDENTIFIER_WHITELIST)));

        let free = plan(FieldProfile::FreeText);
        assert!(free.iter().all(|p| p.whitelist.is_none()));
        assert_eq!(free[0].psm, PageSegMode::SingleBlock);
    }

    #[test]
    fn test_score_formula() {
        assert_eq!(score(&OcrResult::new("A-101", 0.9)), 0.9f32 as f64 * 1000.0 + 5.0);
        let long = "x".repeat(500);
        assert_eq!(score(&OcrResult::new(long, 0.0)), 200.0);
    }

    #[test]
    fn test_confidence_dominates() {
        let (index, best) = select_best(vec![
            OcrResult::new("GENERAL NOTES", 0.60),
            OcrResult::new("GENERAL", 0.95),
        ])
        .unwrap();
        assert_eq!(index, 1);
        assert_eq!(best.text, "GENERAL");
    }

    #[test]
    fn test_long_reading_beats_marginally_more_confident_short_one() {
        let long = "GROUND FLOOR PLAN - GENERAL ARRANGEMENT";
        let (index, _) = select_best(vec![
            OcrResult::new("GRO", 0.82),
            OcrResult::new(long, 0.80),
        ])
        .unwrap();
        assert_eq!(index, 1);
    }

    #[test]
    fn test_tie_goes_to_earlier_pass() {
        let (index, _) = select_best(vec![
            OcrResult::new("A-101", 0.5),
            OcrResult::new("B-202", 0.5),
            OcrResult::new("C-303", 0.5),
        ])
        .unwrap();
        assert_eq!(index, 0);
    }

    #[test]
    fn test_no_candidates() {
        assert!(select_best(Vec::new()).is_none());
    }
}
