//! A single categorical variable in a sampling network.

use crate::bayes::ConditionalTree;
use rand::Rng;
use std::collections::{HashMap, HashSet};

/// One categorical random variable, with its CPT.
///
/// Names beginning with `*` denote synthetic nodes injected during dataset
/// preparation rather than observed attributes.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub name: String,
    #[serde(default)]
    pub parent_names: Vec<String>,
    #[serde(default)]
    pub possible_values: Vec<String>,
    pub conditional_probabilities: ConditionalTree,
}

impl Node {
    /// Distribution over this node's values given the assigned parents.
    pub fn distribution<'a>(&'a self, assigned: &HashMap<String, String>) -> &'a [(String, f64)] {
        self.conditional_probabilities
            .distribution(&self.parent_names, assigned)
    }

    /// Draw a value from the full conditional distribution.
    ///
    /// Leaf weights are trusted to sum to one, so the accumulated draw runs
    /// against a fixed total of 1.0.
    pub fn sample<R: Rng>(&self, assigned: &HashMap<String, String>, rng: &mut R) -> Option<String> {
        let distribution = self.distribution(assigned);
        let support: Vec<(&str, f64)> = distribution
            .iter()
            .map(|(value, weight)| (value.as_str(), *weight))
            .collect();
        draw(&support, 1.0, rng).map(str::to_string)
    }

    /// Draw a value restricted to `allowed` (when non-empty) minus `banned`.
    ///
    /// Returns `None` when the restricted support is empty, which signals
    /// the backtracking sampler to fail this depth.
    pub fn sample_restricted<R: Rng>(
        &self,
        assigned: &HashMap<String, String>,
        allowed: Option<&[String]>,
        banned: &[String],
        rng: &mut R,
    ) -> Option<String> {
        let distribution = self.distribution(assigned);
        let allowed: Option<HashSet<&str>> = allowed
            .filter(|values| !values.is_empty())
            .map(|values| values.iter().map(String::as_str).collect());

        let mut support: Vec<(&str, f64)> = Vec::new();
        let mut total = 0.0;
        for (value, weight) in distribution {
            if banned.iter().any(|b| b == value) {
                continue;
            }
            if let Some(allowed) = &allowed {
                if !allowed.contains(value.as_str()) {
                    continue;
                }
            }
            support.push((value.as_str(), *weight));
            total += *weight;
        }

        draw(&support, total, rng).map(str::to_string)
    }
}

/// Inverse-CDF draw over `support`: first value whose running weight sum
/// exceeds a uniform anchor in `[0, total)`, defaulting to the first entry.
fn draw<'a, R: Rng>(support: &[(&'a str, f64)], total: f64, rng: &mut R) -> Option<&'a str> {
    let (first, _) = support.first()?;
    let anchor = rng.gen::<f64>() * total;
    let mut cumulative = 0.0;
    for (value, weight) in support {
        cumulative += weight;
        if cumulative > anchor {
            return Some(value);
        }
    }
    Some(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn node(json: &str) -> Node {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_sample_stays_in_distribution() {
        let node = node(
            r#"{"name": "n", "parentNames": [], "possibleValues": ["a", "b"],
                "conditionalProbabilities": {"a": 0.5, "b": 0.5}}"#,
        );
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let value = node.sample(&HashMap::new(), &mut rng).unwrap();
            assert!(value == "a" || value == "b");
        }
    }

    #[test]
    fn test_certain_weight_always_wins() {
        let node = node(
            r#"{"name": "n", "parentNames": [], "possibleValues": ["a", "b"],
                "conditionalProbabilities": {"a": 1.0, "b": 0.0}}"#,
        );
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            assert_eq!(node.sample(&HashMap::new(), &mut rng).unwrap(), "a");
        }
    }

    #[test]
    fn test_restricted_support_excludes_banned_and_disallowed() {
        let node = node(
            r#"{"name": "n", "parentNames": [], "possibleValues": ["a", "b", "c"],
                "conditionalProbabilities": {"a": 0.4, "b": 0.4, "c": 0.2}}"#,
        );
        let mut rng = StdRng::seed_from_u64(11);
        let allowed = vec!["a".to_string(), "b".to_string()];
        let banned = vec!["a".to_string()];
        for _ in 0..20 {
            let value = node
                .sample_restricted(&HashMap::new(), Some(&allowed), &banned, &mut rng)
                .unwrap();
            assert_eq!(value, "b");
        }
    }

    #[test]
    fn test_empty_support_yields_none() {
        let node = node(
            r#"{"name": "n", "parentNames": [], "possibleValues": ["a"],
                "conditionalProbabilities": {"a": 1.0}}"#,
        );
        let mut rng = StdRng::seed_from_u64(0);
        let banned = vec!["a".to_string()];
        assert!(node
            .sample_restricted(&HashMap::new(), None, &banned, &mut rng)
            .is_none());
    }

    #[test]
    fn test_empty_allowed_list_means_unconstrained() {
        let node = node(
            r#"{"name": "n", "parentNames": [], "possibleValues": ["a"],
                "conditionalProbabilities": {"a": 1.0}}"#,
        );
        let mut rng = StdRng::seed_from_u64(0);
        let value = node
            .sample_restricted(&HashMap::new(), Some(&[]), &[], &mut rng)
            .unwrap();
        assert_eq!(value, "a");
    }

    #[test]
    fn test_values_outside_distribution_are_ignored() {
        let node = node(
            r#"{"name": "n", "parentNames": [], "possibleValues": ["a", "b"],
                "conditionalProbabilities": {"a": 1.0}}"#,
        );
        let mut rng = StdRng::seed_from_u64(5);
        let allowed = vec!["b".to_string()];
        assert!(node
            .sample_restricted(&HashMap::new(), Some(&allowed), &[], &mut rng)
            .is_none());
    }
}
