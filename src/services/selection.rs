use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::io::Storage;
use crate::services::api::{AnalysisResult, ConfidenceMap};

pub const CONFIRMED_KEY: &str = "confirmedAnalysisData";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Race,
    Age,
    Gender,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Race, Category::Age, Category::Gender];

    pub fn index(self) -> usize {
        match self {
            Category::Race => 0,
            Category::Age => 1,
            Category::Gender => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn key(self) -> &'static str {
        match self {
            Category::Race => "race",
            Category::Age => "age",
            Category::Gender => "gender",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Category::Race => "RACE",
            Category::Age => "AGE",
            Category::Gender => "GENDER",
        }
    }
}

impl AnalysisResult {
    pub fn mapping(&self, category: Category) -> &ConfidenceMap {
        match category {
            Category::Race => &self.race,
            Category::Age => &self.age,
            Category::Gender => &self.gender,
        }
    }
}

/// Highest-confidence label. Ties go to the label that came first; NaN is skipped.
pub fn top_entry(mapping: &ConfidenceMap) -> Option<(&str, f64)> {
    let mut best: Option<(&str, f64)> = None;
    for (label, &confidence) in mapping {
        if confidence.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, top)| confidence > top) {
            best = Some((label.as_str(), confidence));
        }
    }
    best
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayedEntry<'a> {
    pub label: &'a str,
    /// `None` when an override names a label the mapping does not contain.
    pub confidence: Option<f64>,
    pub is_override: bool,
}

#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
pub struct ConfirmedSelections {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub race: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

/// User overrides keyed by category (or concern) index.
#[derive(Default, Clone, Debug, PartialEq)]
pub struct SelectedEntries {
    entries: BTreeMap<usize, String>,
}

impl SelectedEntries {
    pub fn select_entry(&mut self, index: usize, label: &str) {
        self.entries.insert(index, label.to_string());
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(&index).map(|s| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn reset_entries(&mut self) {
        self.entries.clear();
    }

    pub fn displayed_entry<'a>(
        &'a self,
        index: usize,
        mapping: &'a ConfidenceMap,
    ) -> Option<DisplayedEntry<'a>> {
        if let Some(label) = self.get(index) {
            return Some(DisplayedEntry {
                label,
                confidence: mapping.get(label).copied(),
                is_override: true,
            });
        }
        top_entry(mapping).map(|(label, confidence)| DisplayedEntry {
            label,
            confidence: Some(confidence),
            is_override: false,
        })
    }

    pub fn to_confirmed(&self) -> ConfirmedSelections {
        let mut confirmed = ConfirmedSelections::default();
        for (&index, label) in &self.entries {
            let slot = match Category::from_index(index) {
                Some(Category::Race) => &mut confirmed.race,
                Some(Category::Age) => &mut confirmed.age,
                Some(Category::Gender) => &mut confirmed.gender,
                None => continue,
            };
            *slot = Some(label.clone());
        }
        confirmed
    }

    /// Writes the override snapshot under [`CONFIRMED_KEY`].
    pub async fn confirm_selections(&self, storage: &dyn Storage) -> Result<ConfirmedSelections> {
        let confirmed = self.to_confirmed();
        let content = serde_json::to_string(&confirmed)?;
        storage
            .set_item(CONFIRMED_KEY, &content)
            .await
            .context("Failed to store confirmed selections")?;
        info!("Confirmed selections: {}", content);
        Ok(confirmed)
    }
}

pub async fn load_confirmed(storage: &dyn Storage) -> Result<Option<ConfirmedSelections>> {
    match storage.get_item(CONFIRMED_KEY).await? {
        Some(content) => Ok(Some(
            serde_json::from_str(&content).context("Failed to parse confirmed selections")?,
        )),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(pairs: &[(&str, f64)]) -> ConfidenceMap {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_top_entry() {
        let m = mapping(&[("a", 0.2), ("b", 0.7), ("c", 0.1)]);
        assert_eq!(top_entry(&m), Some(("b", 0.7)));
        assert_eq!(top_entry(&ConfidenceMap::new()), None);
    }

    #[test]
    fn test_top_entry_tie_prefers_first() {
        let m = mapping(&[("x", 0.1), ("y", 0.45), ("z", 0.45)]);
        assert_eq!(top_entry(&m), Some(("y", 0.45)));

        let m = mapping(&[("nan", f64::NAN), ("ok", 0.3)]);
        assert_eq!(top_entry(&m), Some(("ok", 0.3)));
    }

    #[test]
    fn test_displayed_entry_prefers_override() {
        let m = mapping(&[("a", 0.9), ("b", 0.1)]);
        let mut selected = SelectedEntries::default();

        let shown = selected.displayed_entry(0, &m).unwrap();
        assert_eq!((shown.label, shown.confidence), ("a", Some(0.9)));
        assert!(!shown.is_override);

        selected.select_entry(0, "b");
        let shown = selected.displayed_entry(0, &m).unwrap();
        assert_eq!((shown.label, shown.confidence), ("b", Some(0.1)));
        assert!(shown.is_override);

        // other categories are untouched
        assert_eq!(selected.displayed_entry(1, &m).unwrap().label, "a");

        selected.select_entry(0, "gone");
        assert_eq!(selected.displayed_entry(0, &m).unwrap().confidence, None);

        selected.reset_entries();
        assert!(selected.is_empty());
        assert_eq!(selected.displayed_entry(0, &m).unwrap().label, "a");
    }

    #[test]
    fn test_to_confirmed_projects_known_categories() {
        let mut selected = SelectedEntries::default();
        selected.select_entry(0, "east asian");
        selected.select_entry(2, "female");
        selected.select_entry(7, "eye bags");

        let json = serde_json::to_string(&selected.to_confirmed()).unwrap();
        assert_eq!(json, r#"{"race":"east asian","gender":"female"}"#);
    }

    #[test]
    fn test_category_indexes() {
        for (i, c) in Category::ALL.iter().enumerate() {
            assert_eq!(c.index(), i);
            assert_eq!(Category::from_index(i), Some(*c));
        }
        assert_eq!(Category::from_index(3), None);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[tokio::test]
    async fn test_confirm_selections_writes_snapshot() -> Result<()> {
        use crate::core::io::NativeStorage;

        let dir = tempfile::tempdir()?;
        let storage = NativeStorage::new(dir.path());
        assert_eq!(load_confirmed(&storage).await?, None);

        let mut selected = SelectedEntries::default();
        selected.select_entry(1, "20-29");
        selected.confirm_selections(&storage).await?;

        assert_eq!(
            storage.get_item(CONFIRMED_KEY).await?.as_deref(),
            Some(r#"{"age":"20-29"}"#)
        );
        let loaded = load_confirmed(&storage).await?.unwrap();
        assert_eq!(loaded.age.as_deref(), Some("20-29"));
        assert_eq!(loaded.race, None);
        Ok(())
    }
}
