use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter, Result as FmtResult, Write},
    str::FromStr,
};

use serde::Deserialize;

use crate::error::Error;

/// Label whose value overrides the configured tenant for a single entry.
/// It never reaches a batch or the remote store.
pub const RESERVED_LABEL_TENANT_ID: &str = "__tenant_id__";

/// Set of label name/value pairs identifying a stream
///
/// Names are kept sorted, so two sets with the same content always render
/// the same stream key no matter in which order they were built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct LabelSet(BTreeMap<String, String>);

impl LabelSet {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with_label(mut self, name: &str, value: &str) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: &str) -> Option<String> {
        self.0.insert(name.to_owned(), value.to_owned())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Union of both sets, `other` wins when a name is present in both
    pub fn merge(&self, other: &LabelSet) -> LabelSet {
        let mut merged = self.0.clone();
        merged.extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self(merged)
    }

    /// Stream identifier, e.g. `{instance="localhost",job="test"}`
    pub fn canonical_key(&self) -> String {
        self.to_string()
    }
}

impl Display for LabelSet {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        f.write_char('{')?;
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_char(',')?;
            }
            write!(f, "{}=\"", name)?;
            for c in value.chars() {
                match c {
                    '"' => f.write_str("\\\"")?,
                    '\\' => f.write_str("\\\\")?,
                    '\n' => f.write_str("\\n")?,
                    c => f.write_char(c)?,
                }
            }
            f.write_char('"')?;
        }
        f.write_char('}')
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LabelSet {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

// Parses the command line form `name1=value1,name2=value2`
impl FromStr for LabelSet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut labels = LabelSet::new();
        for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let Some((name, value)) = pair.split_once('=') else {
                return Err(Error::Config(format!(
                    "label `{}` is not of the form name=value",
                    pair
                )));
            };
            let name = name.trim();
            if name.is_empty() {
                return Err(Error::Config(format!("label `{}` has an empty name", pair)));
            }
            labels.insert(name, value.trim());
        }
        Ok(labels)
    }
}

/// Picks the tenant an entry belongs to and strips the reserved label.
///
/// The reserved label's value wins over `default_tenant`, which may be empty
/// for single tenant deployments.
pub fn resolve_tenant(default_tenant: &str, mut labels: LabelSet) -> (String, LabelSet) {
    let tenant_id = match labels.remove(RESERVED_LABEL_TENANT_ID) {
        Some(tenant_id) => tenant_id,
        None => default_tenant.to_owned(),
    };
    (tenant_id, labels)
}
