use std::collections::BTreeSet;
use std::fmt;

use regex::{Regex, RegexBuilder};
use tracing::debug;

use super::{HelperError, Session};
use crate::galaxy::GalaxyApi;

/// Which identifier of a matching dataset to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchKey {
    #[default]
    Hid,
    DatasetId,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContentKey {
    Hid(u64),
    Id(String),
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKey::Hid(hid) => write!(f, "{hid}"),
            ContentKey::Id(id) => f.write_str(id),
        }
    }
}

/// Compile case-insensitive patterns that must match at the start of a name.
pub fn compile_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Regex>, HelperError> {
    patterns
        .iter()
        .map(|pattern| {
            let pattern = pattern.as_ref();
            RegexBuilder::new(&format!("^(?:{pattern})"))
                .case_insensitive(true)
                .build()
                .map_err(|source| HelperError::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                })
        })
        .collect()
}

impl<A: GalaxyApi> Session<A> {
    /// Identifiers of `ok` datasets whose name matches any of `patterns`.
    pub fn find_matching_history_ids<S: AsRef<str>>(
        &self,
        patterns: &[S],
        key: MatchKey,
    ) -> Result<BTreeSet<ContentKey>, HelperError> {
        let regexes = compile_patterns(patterns)?;
        let summary = self.api.show_history(&self.history_id)?;

        let mut matches = BTreeSet::new();
        for dataset_id in summary.ok_dataset_ids() {
            let dataset = self.api.show_dataset(dataset_id)?;
            if regexes.iter().any(|re| re.is_match(&dataset.name)) {
                debug!(
                    hid = dataset.hid,
                    id = %dataset.id,
                    name = %dataset.name,
                    "matched history item"
                );
                matches.insert(match key {
                    MatchKey::Hid => ContentKey::Hid(dataset.hid),
                    MatchKey::DatasetId => ContentKey::Id(dataset.id),
                });
            }
        }
        Ok(matches)
    }
}
