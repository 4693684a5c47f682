//! Choosing how (and whether) features get installed.
//!
//! Opening an install session can fail for a handful of recognised reasons
//! ([`Scenario`]). Those never abort the invocation; [`decide`] maps them,
//! together with the project's configuration, onto one of three outcomes.

use std::fmt;

use crate::session::InstallSession;

/// A recognised condition under which the feature utility cannot be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scenario {
    /// The project has no `[features]` section.
    LicenseNotAccepted,
    /// The runtime's product properties name no Open Liberty version.
    NotOpenLiberty,
    /// The runtime's feature catalog could not be retrieved.
    CatalogUnavailable { coordinate: String },
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LicenseNotAccepted => f.write_str(
                "The features section is not configured, so the feature license has not been accepted",
            ),
            Self::NotOpenLiberty => {
                f.write_str("The runtime does not declare an Open Liberty product version")
            }
            Self::CatalogUnavailable { coordinate } => {
                write!(f, "The feature catalog {coordinate} is not available")
            }
        }
    }
}

/// Why nothing is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No `[features]` section.
    LicenseNotAccepted,
    /// User feature catalogs cannot be installed by the legacy installer.
    UserFeaturesUnsupported,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LicenseNotAccepted => f.write_str(
                "Skipping feature installation because the features license has not been accepted. \
                 Add a [features] section with accept_license = true to install features.",
            ),
            Self::UserFeaturesUnsupported => f.write_str(
                "Installing user features from feature BOMs is not supported by the installer \
                 available for this runtime. Skipping feature installation.",
            ),
        }
    }
}

/// The outcome of [`decide`], without any session attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Install nothing.
    Skip(SkipReason),
    /// Install through an [`InstallSession`].
    UseUtility,
    /// Hand the configured entries to `installUtility`.
    UseLegacyInstaller,
}

/// Pick an install path.
///
/// `scenario` is `None` when a session could be opened. With a scenario,
/// additional catalogs always mean skipping: the legacy installer cannot
/// install user features. Otherwise a missing `[features]` section skips
/// and a present one falls back to the legacy installer.
pub fn decide(
    features_section_present: bool,
    has_additional_jsons: bool,
    scenario: Option<&Scenario>,
) -> Decision {
    match (scenario, has_additional_jsons, features_section_present) {
        (None, _, _) => Decision::UseUtility,
        (Some(_), true, _) => Decision::Skip(SkipReason::UserFeaturesUnsupported),
        (Some(_), false, false) => Decision::Skip(SkipReason::LicenseNotAccepted),
        (Some(_), false, true) => Decision::UseLegacyInstaller,
    }
}

/// The selected strategy, carrying the session when there is one.
#[derive(Debug)]
pub enum Strategy {
    /// Install nothing; `scenario` is why the session could not open.
    Skip {
        reason: SkipReason,
        scenario: Scenario,
    },
    /// The opened session.
    UseUtility(Box<InstallSession>),
    /// Fall back to `installUtility`.
    UseLegacyInstaller {
        scenario: Scenario,
    },
}

impl Strategy {
    /// Combine the result of opening a session with [`decide`].
    pub fn from_open_result(
        opened: Result<InstallSession, Scenario>,
        features_section_present: bool,
        has_additional_jsons: bool,
    ) -> Self {
        match opened {
            Ok(session) => Self::UseUtility(Box::new(session)),
            Err(scenario) => {
                match decide(features_section_present, has_additional_jsons, Some(&scenario)) {
                    Decision::Skip(reason) => Self::Skip { reason, scenario },
                    Decision::UseLegacyInstaller | Decision::UseUtility => {
                        Self::UseLegacyInstaller { scenario }
                    }
                }
            }
        }
    }

    /// The [`Decision`] this strategy was built from.
    pub fn decision(&self) -> Decision {
        match self {
            Self::Skip { reason, .. } => Decision::Skip(*reason),
            Self::UseUtility(_) => Decision::UseUtility,
            Self::UseLegacyInstaller { .. } => Decision::UseLegacyInstaller,
        }
    }

    /// The session, for [`Strategy::UseUtility`] only.
    pub fn session(&self) -> Option<&InstallSession> {
        match self {
            Self::UseUtility(session) => Some(session),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIOS: [Scenario; 3] = [
        Scenario::LicenseNotAccepted,
        Scenario::NotOpenLiberty,
        Scenario::CatalogUnavailable {
            coordinate: String::new(),
        },
    ];

    #[test]
    fn test_session_opened_uses_utility() {
        for section in [true, false] {
            for jsons in [true, false] {
                assert_eq!(decide(section, jsons, None), Decision::UseUtility);
            }
        }
    }

    #[test]
    fn test_additional_jsons_always_skip() {
        for scenario in &SCENARIOS {
            for section in [true, false] {
                assert_eq!(
                    decide(section, true, Some(scenario)),
                    Decision::Skip(SkipReason::UserFeaturesUnsupported)
                );
            }
        }
    }

    #[test]
    fn test_no_features_section_skips() {
        assert_eq!(
            decide(false, false, Some(&Scenario::LicenseNotAccepted)),
            Decision::Skip(SkipReason::LicenseNotAccepted)
        );
    }

    #[test]
    fn test_features_section_falls_back_to_legacy() {
        for scenario in &SCENARIOS {
            assert_eq!(
                decide(true, false, Some(scenario)),
                Decision::UseLegacyInstaller
            );
        }
    }

    #[test]
    fn test_strategy_from_failed_open() {
        let strategy = Strategy::from_open_result(Err(Scenario::NotOpenLiberty), true, false);
        assert_eq!(strategy.decision(), Decision::UseLegacyInstaller);
        assert!(strategy.session().is_none());

        let strategy = Strategy::from_open_result(Err(Scenario::LicenseNotAccepted), false, true);
        assert!(matches!(
            strategy,
            Strategy::Skip {
                reason: SkipReason::UserFeaturesUnsupported,
                scenario: Scenario::LicenseNotAccepted
            }
        ));
    }
}
