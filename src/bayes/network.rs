//! Sampling networks: loading, ancestral sampling, constrained sampling.

use crate::bayes::Node;
use crate::models::{MimesisError, Result};
use rand::Rng;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// A directed acyclic network of categorical variables, with nodes held in
/// topological (sampling) order. Immutable after load; generators may share
/// one freely.
#[derive(Debug, Clone)]
pub struct Network {
    nodes: Vec<Node>,
    index_by_name: HashMap<String, usize>,
}

#[derive(Debug, serde::Deserialize)]
struct NetworkDefinition {
    nodes: Vec<Node>,
}

impl Network {
    /// Load a network from a zip archive holding one JSON document of the
    /// form `{"nodes": [...]}`.
    pub fn from_archive(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| MimesisError::network(path, format!("cannot open archive: {e}")))?;
        let mut archive = zip::ZipArchive::new(file)
            .map_err(|e| MimesisError::network(path, format!("cannot read archive: {e}")))?;
        if archive.is_empty() {
            return Err(MimesisError::network(path, "archive contains no entries"));
        }
        let mut entry = archive
            .by_index(0)
            .map_err(|e| MimesisError::network(path, format!("cannot open first entry: {e}")))?;
        let mut content = String::new();
        entry
            .read_to_string(&mut content)
            .map_err(|e| MimesisError::network(path, format!("cannot read first entry: {e}")))?;

        let definition: NetworkDefinition = serde_json::from_str(&content)
            .map_err(|e| MimesisError::network(path, format!("invalid definition JSON: {e}")))?;
        Ok(Self::from_nodes(definition.nodes))
    }

    /// Build a network from already-parsed nodes, assumed to be in
    /// topological order.
    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        let index_by_name = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.name.clone(), index))
            .collect();
        Self {
            nodes,
            index_by_name,
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.index_by_name.get(name).map(|&index| &self.nodes[index])
    }

    /// Ancestral sampling: every node not bound by `seed_values` is drawn in
    /// topological order, conditioned on what is already assigned.
    pub fn generate_sample<R: Rng>(
        &self,
        seed_values: &HashMap<String, String>,
        rng: &mut R,
    ) -> HashMap<String, String> {
        let mut sample = seed_values.clone();
        for node in &self.nodes {
            if !sample.contains_key(&node.name) {
                let value = node.sample(&sample, rng).unwrap_or_default();
                sample.insert(node.name.clone(), value);
            }
        }
        sample
    }

    /// Backtracking sampler respecting per-node allowed-value lists.
    ///
    /// Returns `None` when no assignment satisfies the restrictions. A key
    /// whose list is empty is treated as unconstrained; the constraint
    /// closure rejects genuinely empty constraints before they get here.
    pub fn generate_consistent_sample<R: Rng>(
        &self,
        possible_values: &HashMap<String, Vec<String>>,
        rng: &mut R,
    ) -> Option<HashMap<String, String>> {
        let mut assignment = HashMap::new();
        self.backtrack(&mut assignment, possible_values, 0, rng)
            .then_some(assignment)
    }

    fn backtrack<R: Rng>(
        &self,
        assignment: &mut HashMap<String, String>,
        possible_values: &HashMap<String, Vec<String>>,
        depth: usize,
        rng: &mut R,
    ) -> bool {
        let Some(node) = self.nodes.get(depth) else {
            return true;
        };

        let allowed = possible_values.get(&node.name).map(Vec::as_slice);
        let mut banned: Vec<String> = Vec::new();

        while let Some(value) = node.sample_restricted(assignment, allowed, &banned, rng) {
            assignment.insert(node.name.clone(), value.clone());
            if self.backtrack(assignment, possible_values, depth + 1, rng) {
                return true;
            }
            // Roll the failed branch back before redrawing, so deeper
            // failures can never leak a stale assignment.
            assignment.remove(&node.name);
            banned.push(value);
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Write;

    fn chain_network() -> Network {
        // os -> browser -> ua, with ua fully determined by browser.
        let nodes: Vec<Node> = serde_json::from_str(
            r#"[
                {"name": "os", "parentNames": [], "possibleValues": ["linux", "mac"],
                 "conditionalProbabilities": {"linux": 0.5, "mac": 0.5}},
                {"name": "browser", "parentNames": ["os"], "possibleValues": ["chrome", "safari"],
                 "conditionalProbabilities": {"deeper": {
                    "linux": {"chrome": 1.0},
                    "mac": {"chrome": 0.5, "safari": 0.5}}}},
                {"name": "ua", "parentNames": ["browser"], "possibleValues": ["ua-chrome", "ua-safari"],
                 "conditionalProbabilities": {"deeper": {
                    "chrome": {"ua-chrome": 1.0},
                    "safari": {"ua-safari": 1.0}}}}
            ]"#,
        )
        .unwrap();
        Network::from_nodes(nodes)
    }

    fn restrictions(pairs: &[(&str, &[&str])]) -> HashMap<String, Vec<String>> {
        pairs
            .iter()
            .map(|(k, vs)| (k.to_string(), vs.iter().map(|v| v.to_string()).collect()))
            .collect()
    }

    #[test]
    fn test_generate_sample_is_complete_and_in_domain() {
        let network = chain_network();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..25 {
            let sample = network.generate_sample(&HashMap::new(), &mut rng);
            assert_eq!(sample.len(), 3);
            for node in network.nodes() {
                assert!(node.possible_values.contains(&sample[&node.name]));
            }
        }
    }

    #[test]
    fn test_generate_sample_keeps_seed_values() {
        let network = chain_network();
        let mut rng = StdRng::seed_from_u64(1);
        let seed = HashMap::from([("browser".to_string(), "safari".to_string())]);
        let sample = network.generate_sample(&seed, &mut rng);
        assert_eq!(sample["browser"], "safari");
        assert_eq!(sample["ua"], "ua-safari");
    }

    #[test]
    fn test_consistent_sample_respects_restrictions() {
        let network = chain_network();
        let mut rng = StdRng::seed_from_u64(9);
        let possible = restrictions(&[("ua", &["ua-safari"])]);
        for _ in 0..20 {
            let sample = network.generate_consistent_sample(&possible, &mut rng).unwrap();
            assert_eq!(sample["ua"], "ua-safari");
            assert_eq!(sample["browser"], "safari");
            assert_eq!(sample["os"], "mac");
        }
    }

    #[test]
    fn test_unsatisfiable_restriction_returns_none() {
        let network = chain_network();
        let mut rng = StdRng::seed_from_u64(2);
        let possible = restrictions(&[("os", &["linux"]), ("ua", &["ua-safari"])]);
        assert!(network.generate_consistent_sample(&possible, &mut rng).is_none());
    }

    #[test]
    fn test_backtrack_leaves_no_stale_assignment() {
        // "linux" is overwhelmingly likely at depth 0 but only "mac" can
        // reach ua-safari, so the sampler must back out of the failed branch.
        let nodes: Vec<Node> = serde_json::from_str(
            r#"[
                {"name": "os", "parentNames": [], "possibleValues": ["linux", "mac"],
                 "conditionalProbabilities": {"linux": 0.99, "mac": 0.01}},
                {"name": "browser", "parentNames": ["os"], "possibleValues": ["chrome", "safari"],
                 "conditionalProbabilities": {"deeper": {
                    "linux": {"chrome": 1.0},
                    "mac": {"safari": 1.0}}}},
                {"name": "ua", "parentNames": ["browser"], "possibleValues": ["ua-chrome", "ua-safari"],
                 "conditionalProbabilities": {"deeper": {
                    "chrome": {"ua-chrome": 1.0},
                    "safari": {"ua-safari": 1.0}}}}
            ]"#,
        )
        .unwrap();
        let network = Network::from_nodes(nodes);
        let mut rng = StdRng::seed_from_u64(4);
        let possible = restrictions(&[("ua", &["ua-safari"])]);
        let sample = network.generate_consistent_sample(&possible, &mut rng).unwrap();
        assert_eq!(sample["os"], "mac");
        assert_eq!(sample["browser"], "safari");
        assert_eq!(sample.len(), 3);
    }

    #[test]
    fn test_from_archive_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.zip");
        let file = File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file("network.json", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer
            .write_all(
                br#"{"nodes": [{"name": "n", "parentNames": [], "possibleValues": ["a"],
                     "conditionalProbabilities": {"a": 1.0}}]}"#,
            )
            .unwrap();
        writer.finish().unwrap();

        let network = Network::from_archive(&path).unwrap();
        assert_eq!(network.nodes().len(), 1);
        assert!(network.node("n").is_some());
    }

    #[test]
    fn test_missing_archive_is_malformed() {
        let err = Network::from_archive("/nonexistent/net.zip").unwrap_err();
        assert!(matches!(err, MimesisError::MalformedNetwork { .. }));
    }

    #[test]
    fn test_garbage_archive_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.zip");
        std::fs::write(&path, b"not a zip").unwrap();
        let err = Network::from_archive(&path).unwrap_err();
        assert!(matches!(err, MimesisError::MalformedNetwork { .. }));
    }
}
