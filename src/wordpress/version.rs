use std::cmp::Ordering;

/// Plugin version as reported by WP-CLI (`version`, `update_version`).
///
/// Plugin authors use anything from strict semver to four-part numbers to
/// free text, so parsing falls back in that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginVersion {
    pub original: String,
    pub parsed: VersionType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionType {
    Semantic(semver::Version),
    Numeric(Vec<u64>),
    Unknown(String),
}

impl PluginVersion {
    pub fn parse(version: &str) -> Self {
        let trimmed = version.trim().trim_start_matches(['v', 'V']);
        let parsed = if let Ok(v) = semver::Version::parse(trimmed) {
            VersionType::Semantic(v)
        } else if let Some(numeric) = Self::parse_numeric(trimmed) {
            VersionType::Numeric(numeric)
        } else {
            VersionType::Unknown(trimmed.to_string())
        };

        PluginVersion {
            original: version.to_string(),
            parsed,
        }
    }

    fn parse_numeric(version: &str) -> Option<Vec<u64>> {
        let numbers = version
            .split('.')
            .map(|part| part.parse::<u64>().ok())
            .collect::<Option<Vec<_>>>()?;
        (!numbers.is_empty()).then_some(numbers)
    }

    fn release_components(&self) -> Option<Vec<u64>> {
        match &self.parsed {
            VersionType::Semantic(v) => Some(vec![v.major, v.minor, v.patch]),
            VersionType::Numeric(n) => Some(n.clone()),
            VersionType::Unknown(_) => None,
        }
    }
}

impl PartialOrd for PluginVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PluginVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        if let (VersionType::Semantic(a), VersionType::Semantic(b)) = (&self.parsed, &other.parsed)
        {
            return a.cmp(b);
        }

        match (self.release_components(), other.release_components()) {
            (Some(a), Some(b)) => compare_padded(&a, &b),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => self.original.cmp(&other.original),
        }
    }
}

/// `1.2` and `1.2.0` compare equal.
fn compare_padded(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    for i in 0..len {
        let av = a.get(i).copied().unwrap_or(0);
        let bv = b.get(i).copied().unwrap_or(0);
        match av.cmp(&bv) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// Returns true if `candidate` is a newer release than `current`.
pub fn is_newer(candidate: &str, current: &str) -> bool {
    PluginVersion::parse(candidate) > PluginVersion::parse(current)
}
