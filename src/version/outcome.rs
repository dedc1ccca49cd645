//! Result of a single version-resolution attempt

/// Raw outcome reported by a strategy
///
/// `ok == false` means the module could not be found or loaded. The reason is
/// logged by the strategy and not carried here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionOutcome {
    pub ok: bool,
    pub value: Option<String>,
}

/// User-visible status of an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionStatus<'a> {
    /// Module could not be found or loaded
    Failed,
    /// Module loaded but carries no usable version
    Unknown,
    /// Resolved version string, reported verbatim
    Version(&'a str),
}

impl VersionOutcome {
    pub fn failed() -> Self {
        Self {
            ok: false,
            value: None,
        }
    }

    pub fn loaded(value: Option<String>) -> Self {
        Self { ok: true, value }
    }

    pub fn status(&self) -> VersionStatus<'_> {
        match &self.value {
            _ if !self.ok => VersionStatus::Failed,
            Some(value) if looks_like_version(value) => VersionStatus::Version(value),
            _ => VersionStatus::Unknown,
        }
    }
}

/// A value without a single digit is not treated as a version
pub fn looks_like_version(value: &str) -> bool {
    value.chars().any(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(VersionOutcome::failed(), VersionStatus::Failed)]
    #[case(VersionOutcome { ok: false, value: Some("1.0".to_string()) }, VersionStatus::Failed)]
    #[case(VersionOutcome::loaded(None), VersionStatus::Unknown)]
    #[case(VersionOutcome::loaded(Some(String::new())), VersionStatus::Unknown)]
    #[case(VersionOutcome::loaded(Some("beta".to_string())), VersionStatus::Unknown)]
    #[case(VersionOutcome::loaded(Some("1.23".to_string())), VersionStatus::Version("1.23"))]
    #[case(VersionOutcome::loaded(Some("v1.2.3".to_string())), VersionStatus::Version("v1.2.3"))]
    #[case(VersionOutcome::loaded(Some("1.02_01".to_string())), VersionStatus::Version("1.02_01"))]
    fn status_maps_outcome_to_tri_state(
        #[case] outcome: VersionOutcome,
        #[case] expected: VersionStatus<'static>,
    ) {
        assert_eq!(outcome.status(), expected);
    }
}
