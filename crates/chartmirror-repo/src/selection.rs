//! Which index records a mirror run downloads

use regex::Regex;

use crate::error::{RepoError, Result};
use crate::index::{IndexEntry, RepositoryIndex, compare_versions};

/// How versions of one chart are ranked against each other
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VersionRanking {
    /// Semantic version order
    #[default]
    Semver,
    /// First record listed in the index wins
    IndexOrder,
}

/// What to mirror
#[derive(Debug, Clone, Default)]
pub struct MirrorSelection {
    /// Chart name; an index key equal to it is selected alone, otherwise it
    /// is a regular expression searched (unanchored) in chart names. Empty
    /// matches all.
    pub name_pattern: String,

    /// Exact version to mirror
    pub version: Option<String>,

    /// Keep every version instead of only the highest ranked
    pub all_versions: bool,

    pub ranking: VersionRanking,
}

impl MirrorSelection {
    pub fn new(name_pattern: impl Into<String>) -> Self {
        Self {
            name_pattern: name_pattern.into(),
            ..Self::default()
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn all_versions(mut self, all: bool) -> Self {
        self.all_versions = all;
        self
    }

    pub fn with_ranking(mut self, ranking: VersionRanking) -> Self {
        self.ranking = ranking;
        self
    }

    /// Requested version, ignoring empty strings
    pub fn requested_version(&self) -> Option<&str> {
        self.version.as_deref().filter(|v| !v.is_empty())
    }
}

/// Compiled, validated selection
#[derive(Debug, Clone)]
pub struct EntryFilter {
    pattern: Regex,
    selection: MirrorSelection,
}

impl EntryFilter {
    /// Validate the selection; never touches the network
    pub fn new(selection: MirrorSelection) -> Result<Self> {
        if let Some(version) = selection.requested_version()
            && selection.name_pattern.is_empty()
        {
            return Err(RepoError::VersionWithoutName {
                version: version.to_string(),
            });
        }

        let pattern =
            Regex::new(&selection.name_pattern).map_err(|source| RepoError::InvalidPattern {
                pattern: selection.name_pattern.clone(),
                source,
            })?;

        Ok(Self { pattern, selection })
    }

    pub fn selection(&self) -> &MirrorSelection {
        &self.selection
    }

    /// Records to download: names ascending, then ranking order
    pub fn filter<'a>(&self, index: &'a RepositoryIndex) -> Vec<&'a IndexEntry> {
        let wanted = self.selection.name_pattern.as_str();
        // `chart` must not also pull in `chart2`
        let exact = !wanted.is_empty() && index.entries.contains_key(wanted);

        let mut selected = Vec::new();

        for (name, records) in &index.entries {
            let matched = if exact {
                name == wanted
            } else {
                self.pattern.is_match(name)
            };
            if !matched {
                continue;
            }

            if let Some(version) = self.selection.requested_version() {
                selected.extend(records.iter().filter(|e| e.version == version));
                continue;
            }

            let mut ranked: Vec<&IndexEntry> = records.iter().collect();
            if self.selection.ranking == VersionRanking::Semver {
                // stable sort keeps index order among equal versions
                ranked.sort_by(|a, b| compare_versions(&b.version, &a.version));
            }

            if self.selection.all_versions {
                selected.extend(ranked);
            } else if let Some(best) = ranked.first() {
                selected.push(*best);
            }
        }

        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> RepositoryIndex {
        RepositoryIndex::from_yaml(
            r#"
apiVersion: v1
entries:
  chart2:
    - name: chart2
      version: 0.0.0-rc1
      urls: [chart2-0.0.0-rc1.tgz]
    - name: chart2
      version: 1.2.0
      urls: [chart2-1.2.0.tgz]
  chart1:
    - name: chart1
      version: 1.0.0
      urls: [chart1-1.0.0.tgz]
  chart3:
    - name: chart3
      version: 2.0.0
      urls: [chart3-2.0.0.tgz]
"#,
        )
        .unwrap()
    }

    fn versions(entries: &[&IndexEntry]) -> Vec<String> {
        entries
            .iter()
            .map(|e| format!("{}-{}", e.name, e.version))
            .collect()
    }

    fn run(selection: MirrorSelection) -> Vec<String> {
        let index = index();
        let filter = EntryFilter::new(selection).unwrap();
        versions(&filter.filter(&index))
    }

    #[test]
    fn test_latest_per_chart() {
        assert_eq!(
            run(MirrorSelection::default()),
            vec!["chart1-1.0.0", "chart2-1.2.0", "chart3-2.0.0"]
        );
    }

    #[test]
    fn test_all_versions_highest_first() {
        assert_eq!(
            run(MirrorSelection::default().all_versions(true)),
            vec!["chart1-1.0.0", "chart2-1.2.0", "chart2-0.0.0-rc1", "chart3-2.0.0"]
        );
    }

    #[test]
    fn test_index_order_ranking() {
        assert_eq!(
            run(MirrorSelection::default().with_ranking(VersionRanking::IndexOrder)),
            vec!["chart1-1.0.0", "chart2-0.0.0-rc1", "chart3-2.0.0"]
        );
    }

    #[test]
    fn test_exact_name_wins_over_search() {
        let index = RepositoryIndex::from_yaml(
            r#"
apiVersion: v1
entries:
  chart:
    - name: chart
      version: 1.0.0
      urls: [chart-1.0.0.tgz]
  chart2:
    - name: chart2
      version: 1.0.0
      urls: [chart2-1.0.0.tgz]
    - name: chart2
      version: 0.0.0-rc1
      urls: [chart2-0.0.0-rc1.tgz]
"#,
        )
        .unwrap();
        let select = |selection: MirrorSelection| {
            versions(&EntryFilter::new(selection).unwrap().filter(&index))
        };

        assert_eq!(
            select(MirrorSelection::new("chart").with_version("1.0.0")),
            vec!["chart-1.0.0"]
        );
        assert_eq!(
            select(MirrorSelection::new("chart").all_versions(true)),
            vec!["chart-1.0.0"]
        );
        assert_eq!(
            select(MirrorSelection::new("chart2").with_version("0.0.0-rc1")),
            vec!["chart2-0.0.0-rc1"]
        );
        // no such key: the name is searched as a pattern
        assert_eq!(
            select(MirrorSelection::new("^chart").with_version("1.0.0")),
            vec!["chart-1.0.0", "chart2-1.0.0"]
        );
    }

    #[test]
    fn test_name_pattern_is_unanchored() {
        assert_eq!(run(MirrorSelection::new("2")), vec!["chart2-1.2.0"]);
        assert_eq!(run(MirrorSelection::new("^chart[13]$")).len(), 2);
        assert!(run(MirrorSelection::new("CHART")).is_empty());
    }

    #[test]
    fn test_exact_version() {
        assert_eq!(
            run(MirrorSelection::new("chart2").with_version("0.0.0-rc1")),
            vec!["chart2-0.0.0-rc1"]
        );
        assert!(run(MirrorSelection::new("chart2").with_version("7.0.0")).is_empty());
    }

    #[test]
    fn test_validation() {
        let err = EntryFilter::new(MirrorSelection::default().with_version("1.0.0")).unwrap_err();
        assert!(matches!(err, RepoError::VersionWithoutName { .. }));

        let err = EntryFilter::new(MirrorSelection::new("^(?:(?:aa)|.$")).unwrap_err();
        assert!(matches!(err, RepoError::InvalidPattern { .. }));

        // an empty version is no version
        assert!(EntryFilter::new(MirrorSelection::default().with_version("")).is_ok());
    }

    #[test]
    fn test_deterministic() {
        let selection = MirrorSelection::default().all_versions(true);
        assert_eq!(run(selection.clone()), run(selection));
    }
}
