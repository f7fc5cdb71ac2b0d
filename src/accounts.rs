//! Payment-account resolution
//!
//! Merges an explicit user override, a model-proposed label, and free-text
//! candidates into one canonical account name or None. First success wins;
//! nothing is merged across sources.

use crate::vocab;
use tracing::{debug, warn};

/// Resolve the authoritative payment account for a record.
///
/// Resolution order:
/// 1. explicit override, normalized against the vocabulary (a provided but
///    unrecognized override is logged and discarded, never fatal),
/// 2. the model-proposed account, normalized,
/// 3. the first free-text candidate containing a known alias on a word
///    boundary, accounts tried in vocabulary definition order.
///
/// Pure apart from logging: same inputs always yield the same output.
pub fn resolve_account(
    override_label: Option<&str>,
    model_proposed: Option<&str>,
    text_candidates: &[&str],
) -> Option<&'static str> {
    if let Some(label) = override_label.map(str::trim).filter(|l| !l.is_empty()) {
        match vocab::normalize_account(label) {
            Some(canonical) => {
                debug!(account = canonical, "Account resolved from override");
                return Some(canonical);
            }
            None => {
                warn!(label, "Account override not in vocabulary, discarding");
            }
        }
    }

    if let Some(proposed) = model_proposed {
        if let Some(canonical) = vocab::normalize_account(proposed) {
            debug!(account = canonical, "Account resolved from model proposal");
            return Some(canonical);
        }
    }

    for candidate in text_candidates {
        if candidate.trim().is_empty() {
            continue;
        }
        if let Some(canonical) = vocab::find_account_in_text(candidate) {
            debug!(account = canonical, "Account resolved from free text");
            return Some(canonical);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_wins() {
        assert_eq!(resolve_account(Some("GoPay"), None, &[]), Some("gopay"));
        assert_eq!(
            resolve_account(Some("GoPay"), Some("cash"), &["paid with ovo"]),
            Some("gopay")
        );
    }

    #[test]
    fn test_bad_override_is_discarded_not_fatal() {
        assert_eq!(
            resolve_account(Some("not-a-real-account"), None, &["paid via bca flazz"]),
            Some("bca")
        );
    }

    #[test]
    fn test_model_proposal_beats_text() {
        assert_eq!(
            resolve_account(None, Some("Cash"), &["paid with ovo"]),
            Some("cash")
        );
    }

    #[test]
    fn test_unrecognized_model_proposal_falls_through() {
        assert_eq!(
            resolve_account(None, Some("monopoly money"), &["paid with ovo"]),
            Some("ovo")
        );
    }

    #[test]
    fn test_candidates_scanned_in_order() {
        assert_eq!(
            resolve_account(None, None, &["no accounts here", "used gopay"]),
            Some("gopay")
        );
    }

    #[test]
    fn test_nothing_matches_is_none() {
        assert_eq!(resolve_account(None, None, &["lunch at warung"]), None);
        assert_eq!(resolve_account(None, None, &[]), None);
    }
}
