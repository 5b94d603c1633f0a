// src/labels.rs
//
// Deterministic mapping from the ensemble's raw probability vector to one
// committed label per output attribute. The binary prediction set is every
// label with probability above 0.5; category membership then decides
// between an unambiguous commit, a probability-qualified fallback, and an
// explicitly reported conflict.

use crate::lifecycle::LabelResults;
use std::collections::HashMap;

/// Probability above which a label counts as a binary prediction.
const BINARY_THRESHOLD: f32 = 0.5;

/// One output attribute and the labels that belong to it.
#[derive(Debug, Clone)]
pub struct LabelCategory {
    pub attribute: String,
    pub labels: Vec<String>,
}

impl LabelCategory {
    pub fn new(attribute: impl Into<String>, labels: &[&str]) -> Self {
        Self {
            attribute: attribute.into(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
        }
    }
}

pub struct LabelResolver {
    categories: Vec<LabelCategory>,
    /// Minimum probability for the no-hit fallback to commit a label.
    confidence_threshold: f32,
}

impl LabelResolver {
    pub fn new(categories: Vec<LabelCategory>, confidence_threshold: f32) -> Self {
        Self {
            categories,
            confidence_threshold,
        }
    }

    pub fn categories(&self) -> &[LabelCategory] {
        &self.categories
    }

    /// Resolve one committed label per attribute. Pure and independent
    /// across attributes; runs once per classification pass.
    pub fn resolve(&self, probabilities: &HashMap<String, f32>) -> LabelResults {
        let mut output = LabelResults::with_capacity(self.categories.len());

        for category in &self.categories {
            let hits: Vec<&String> = category
                .labels
                .iter()
                .filter(|label| {
                    probabilities
                        .get(*label)
                        .map_or(false, |p| *p > BINARY_THRESHOLD)
                })
                .collect();

            // Highest-probability label within the category; ties keep the
            // first label in category order.
            let (best_label, best_proba) = category.labels.iter().fold(
                ("UNKNOWN", -1.0f32),
                |(bl, bp), label| {
                    let p = probabilities.get(label).copied().unwrap_or(0.0);
                    if p > bp {
                        (label.as_str(), p)
                    } else {
                        (bl, bp)
                    }
                },
            );

            let committed = match hits.len() {
                1 => hits[0].clone(),
                0 => {
                    if best_proba >= self.confidence_threshold {
                        format!("{} ({:.1}%)", best_label, best_proba * 100.0)
                    } else {
                        "UNKNOWN".to_string()
                    }
                }
                _ => format!("CONFLICT -> {} ({:.1}%)", best_label, best_proba * 100.0),
            };

            output.insert(category.attribute.clone(), committed);
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> LabelResolver {
        LabelResolver::new(
            vec![
                LabelCategory::new("brand", &["Aqua", "Vit", "Cleo"]),
                LabelCategory::new("cap", &["with_cap", "no_cap"]),
            ],
            0.5,
        )
    }

    fn probs(pairs: &[(&str, f32)]) -> HashMap<String, f32> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_single_hit_commits_plain_label() {
        let out = resolver().resolve(&probs(&[
            ("Aqua", 0.9),
            ("Vit", 0.1),
            ("Cleo", 0.2),
            ("with_cap", 0.8),
            ("no_cap", 0.1),
        ]));

        assert_eq!(out["brand"], "Aqua");
        assert_eq!(out["cap"], "with_cap");
    }

    #[test]
    fn test_no_hit_below_threshold_is_unknown() {
        let out = resolver().resolve(&probs(&[
            ("Aqua", 0.3),
            ("Vit", 0.1),
            ("Cleo", 0.2),
        ]));
        assert_eq!(out["brand"], "UNKNOWN");
    }

    #[test]
    fn test_no_hit_above_threshold_commits_with_probability() {
        // 0.5 is not a binary hit (strict >) but passes the fallback.
        let out = resolver().resolve(&probs(&[("Aqua", 0.5), ("Vit", 0.1)]));
        assert_eq!(out["brand"], "Aqua (50.0%)");
    }

    #[test]
    fn test_conflict_reports_best_candidate() {
        let out = resolver().resolve(&probs(&[
            ("Aqua", 0.82),
            ("Vit", 0.7),
            ("Cleo", 0.1),
        ]));
        assert_eq!(out["brand"], "CONFLICT -> Aqua (82.0%)");
    }

    #[test]
    fn test_missing_probabilities_default_to_zero() {
        let out = resolver().resolve(&probs(&[]));
        assert_eq!(out["brand"], "UNKNOWN");
        assert_eq!(out["cap"], "UNKNOWN");
    }

    #[test]
    fn test_every_attribute_gets_a_value() {
        let out = resolver().resolve(&probs(&[("Aqua", 0.9)]));
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_hit_in_one_category_does_not_leak_into_another() {
        // with_cap is a hit for "cap" only; "brand" falls back.
        let out = resolver().resolve(&probs(&[("with_cap", 0.9), ("Aqua", 0.6)]));
        assert_eq!(out["cap"], "with_cap");
        assert_eq!(out["brand"], "Aqua");
    }
}
