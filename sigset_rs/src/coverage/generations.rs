//! Vehicle generations: named, ordered, non-overlapping model-year ranges.
//!
//! Loaded from the workspace-level `generations.yaml`. A missing file means
//! "no generation information" and every year falls into the ungrouped bucket.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    pub name: String,
    pub start_year: i32,
    /// `None` while the generation is still in production.
    #[serde(default)]
    pub end_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Generation {
    pub fn contains(&self, year: i32) -> bool {
        year >= self.start_year && self.end_year.is_none_or(|end| year <= end)
    }

    pub fn is_ongoing(&self) -> bool {
        self.end_year.is_none()
    }
}

#[derive(Debug, Default, Deserialize)]
struct GenerationsFile {
    #[serde(default)]
    generations: Vec<Generation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generations {
    generations: Vec<Generation>,
}

impl Generations {
    pub fn new(mut generations: Vec<Generation>) -> Self {
        generations.sort_by_key(|g| g.start_year);
        for pair in generations.windows(2) {
            if let Some(end) = pair[0].end_year
                && end >= pair[1].start_year
            {
                tracing::warn!(
                    first = %pair[0].name,
                    second = %pair[1].name,
                    "generations overlap; the earlier one wins for shared years"
                );
            }
        }
        Self { generations }
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, serde_yaml::Error> {
        let file: GenerationsFile = serde_yaml::from_str(content)?;
        Ok(Self::new(file.generations))
    }

    /// Load from `path`. A missing or invalid file yields no generations.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no generations file");
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(content) => match Self::from_yaml_str(&content) {
                Ok(generations) => generations,
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.generations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Generation> {
        self.generations.iter()
    }

    pub fn by_name(&self, name: &str) -> Option<&Generation> {
        self.generations.iter().find(|g| g.name == name)
    }

    pub fn containing(&self, year: i32) -> Option<&Generation> {
        self.generations.iter().find(|g| g.contains(year))
    }

    /// Generation bounding a set of years: the one holding the earliest year.
    pub fn for_years(&self, years: &BTreeSet<i32>) -> Option<&Generation> {
        years.iter().find_map(|year| self.containing(*year))
    }

    /// Bucket years by generation name; `None` collects ungrouped years.
    pub fn group_years(&self, years: &BTreeSet<i32>) -> BTreeMap<Option<String>, Vec<i32>> {
        let mut grouped: BTreeMap<Option<String>, Vec<i32>> = BTreeMap::new();
        for year in years {
            let key = self.containing(*year).map(|g| g.name.clone());
            grouped.entry(key).or_default().push(*year);
        }
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const YAML: &str = r#"
generations:
  - name: "Gen 2"
    start_year: 2018
    end_year: null
    description: "Current body"
  - name: "Gen 1"
    start_year: 2010
    end_year: 2017
"#;

    #[test]
    fn test_parses_and_orders() {
        let gens = Generations::from_yaml_str(YAML).unwrap();
        let names: Vec<_> = gens.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Gen 1", "Gen 2"]);
        assert!(gens.by_name("Gen 2").unwrap().is_ongoing());
    }

    #[test]
    fn test_containing_and_bounds() {
        let gens = Generations::from_yaml_str(YAML).unwrap();
        assert_eq!(gens.containing(2017).unwrap().name, "Gen 1");
        assert_eq!(gens.containing(2030).unwrap().name, "Gen 2");
        assert!(gens.containing(2005).is_none());

        let years: BTreeSet<i32> = [2005, 2019, 2021].into_iter().collect();
        assert_eq!(gens.for_years(&years).unwrap().name, "Gen 2");
    }

    #[test]
    fn test_group_years_keeps_ungrouped() {
        let gens = Generations::from_yaml_str(YAML).unwrap();
        let years: BTreeSet<i32> = [2008, 2012, 2019].into_iter().collect();
        let grouped = gens.group_years(&years);
        assert_eq!(grouped.get(&None), Some(&vec![2008]));
        assert_eq!(grouped.get(&Some("Gen 1".to_string())), Some(&vec![2012]));
        assert_eq!(grouped.get(&Some("Gen 2".to_string())), Some(&vec![2019]));
    }

    #[test]
    fn test_missing_or_invalid_file_is_empty() {
        let temp = TempDir::new().expect("temp dir");
        assert!(Generations::load(&temp.path().join("generations.yaml")).is_empty());

        let bad = temp.path().join("bad.yaml");
        std::fs::write(&bad, "generations: [ {name: ").expect("write");
        assert!(Generations::load(&bad).is_empty());
    }
}
