//! Crop Name Reconciler
//!
//! The classifier's labels ("chickpea", "pigeonpeas") and the production
//! dataset's crop names ("gram", "arhar/tur") were curated independently.
//! The alias table bridges the two vocabularies. It is configuration data:
//! a JSON object of canonical label → list of historical names, shipped in
//! `data/crop_aliases.json` and replaceable at startup.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::utils::normalization::normalize_name;

/// Default alias table compiled into the binary
const DEFAULT_ALIASES: &str = include_str!("../data/crop_aliases.json");

/// Canonical crop label → known historical names (all normalized)
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    aliases: FxHashMap<String, Vec<String>>,
}

impl AliasTable {
    /// The built-in table
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(DEFAULT_ALIASES).context("Failed to parse built-in alias table")
    }

    /// Load from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read alias table: {}", path.display()))?;
        Self::from_json_str(&contents)
            .with_context(|| format!("Failed to parse alias table: {}", path.display()))
    }

    /// Parse a JSON object of `label -> [historical names]`
    ///
    /// Keys and names are normalized; entries for the same normalized label
    /// are merged.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, Vec<String>> = serde_json::from_str(json)?;
        Ok(Self::from_pairs(raw))
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: IntoIterator,
        V::Item: AsRef<str>,
    {
        let mut aliases: FxHashMap<String, Vec<String>> = FxHashMap::default();
        for (label, names) in pairs {
            let label = normalize_name(label.as_ref());
            if label.is_empty() {
                continue;
            }
            let entry = aliases.entry(label).or_default();
            for name in names {
                let name = normalize_name(name.as_ref());
                if !name.is_empty() && !entry.contains(&name) {
                    entry.push(name);
                }
            }
        }
        Self { aliases }
    }

    /// Historical names registered for a canonical label
    pub fn aliases_for(&self, label: &str) -> &[String] {
        self.aliases
            .get(&normalize_name(label))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Iterate over every `(canonical, historical_name)` pair
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases
            .iter()
            .flat_map(|(label, names)| names.iter().map(move |n| (label.as_str(), n.as_str())))
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

/// Matches canonical labels against historical crop-name sets
#[derive(Debug, Clone)]
pub struct CropNameReconciler {
    table: AliasTable,
}

impl CropNameReconciler {
    pub fn new(table: AliasTable) -> Self {
        Self { table }
    }

    /// True if `label` (normalized) or any of its aliases is in `historical`
    ///
    /// `historical` must already hold normalized names, as produced by
    /// [`crate::history::HistoricalCropIndex::lookup`].
    pub fn is_historically_valid(&self, label: &str, historical: &FxHashSet<String>) -> bool {
        if historical.is_empty() {
            return false;
        }
        let label = normalize_name(label);
        if historical.contains(&label) {
            return true;
        }
        self.table
            .aliases
            .get(&label)
            .is_some_and(|names| names.iter().any(|n| historical.contains(n)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> FxHashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_builtin_table_loads() {
        let table = AliasTable::builtin().unwrap();
        assert_eq!(table.len(), 22);
        assert_eq!(table.aliases_for("Chickpea"), &["gram".to_string(), "bengal gram".to_string()]);
        assert!(table.aliases_for("quinoa").is_empty());
    }

    #[test]
    fn test_direct_match() {
        let reconciler = CropNameReconciler::new(AliasTable::default());
        let historical = set(&["rice", "maize"]);
        assert!(reconciler.is_historically_valid("rice", &historical));
        assert!(reconciler.is_historically_valid(" Maize ", &historical));
        assert!(!reconciler.is_historically_valid("banana", &historical));
    }

    #[test]
    fn test_alias_match() {
        let reconciler = CropNameReconciler::new(AliasTable::builtin().unwrap());
        assert!(reconciler.is_historically_valid("chickpea", &set(&["bengal gram", "wheat"])));
        assert!(reconciler.is_historically_valid("pigeonpeas", &set(&["arhar/tur"])));
        assert!(reconciler.is_historically_valid("rice", &set(&["paddy"])));
        assert!(!reconciler.is_historically_valid("chickpea", &set(&["wheat"])));
    }

    #[test]
    fn test_empty_history_never_matches() {
        let reconciler = CropNameReconciler::new(AliasTable::builtin().unwrap());
        assert!(!reconciler.is_historically_valid("rice", &FxHashSet::default()));
    }

    #[test]
    fn test_every_alias_round_trips() {
        let table = AliasTable::builtin().unwrap();
        let reconciler = CropNameReconciler::new(table.clone());
        for (canonical, variant) in table.iter() {
            assert!(
                reconciler.is_historically_valid(canonical, &set(&[variant])),
                "{} should match historical name {}",
                canonical,
                variant
            );
        }
    }

    #[test]
    fn test_custom_table_normalizes_and_merges() {
        let table = AliasTable::from_json_str(
            r#"{ "Sorghum ": ["JOWAR"], "sorghum": ["jowar", "Cholam"] }"#,
        )
        .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.aliases_for("sorghum"), &["jowar".to_string(), "cholam".to_string()]);
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        assert!(AliasTable::from_json_str(r#"["rice"]"#).is_err());
    }
}
