use std::fmt;

/// Business category of a transaction, derived from its order reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Nature {
    Parcoursup,
    Taiga,
    Miscellaneous,
    AdministrativeEnrolment,
    EnsaApp,
    Unknown,
}

impl Nature {
    pub const ALL: [Nature; 6] = [
        Nature::Parcoursup,
        Nature::Taiga,
        Nature::Miscellaneous,
        Nature::AdministrativeEnrolment,
        Nature::EnsaApp,
        Nature::Unknown,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Parcoursup => "Parcoursup",
            Self::Taiga => "Taiga",
            Self::Miscellaneous => "Voyage, remplacement carte, divers...",
            Self::AdministrativeEnrolment => "Inscription ADM",
            Self::EnsaApp => "ensa app",
            Self::Unknown => "Inconnu",
        }
    }
}

impl fmt::Display for Nature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

type Rule = (fn(&str) -> bool, Nature);

/// Evaluated top to bottom, the first matching rule wins.
///
/// Order matters: `reinsc_nant_`/`regul_nant_` references must be caught before the broader
/// `regul_`/`reinsc_` prefixes.
const RULES: &[Rule] = &[
    (is_parcoursup, Nature::Parcoursup),
    (is_taiga, Nature::Taiga),
    (is_regularisation, Nature::Miscellaneous),
    (is_reenrolment, Nature::AdministrativeEnrolment),
    (is_plain_code, Nature::EnsaApp),
];

fn is_parcoursup(reference: &str) -> bool {
    reference.contains("Parcoursup") || reference.starts_with("pri_")
}

fn is_taiga(reference: &str) -> bool {
    reference.starts_with("reinsc_nant_") || reference.starts_with("regul_nant_")
}

fn is_regularisation(reference: &str) -> bool {
    reference.starts_with("regul_")
}

fn is_reenrolment(reference: &str) -> bool {
    reference.starts_with("reinsc_")
}

// Mobile app orders carry a bare code
fn is_plain_code(reference: &str) -> bool {
    !reference.contains('-') && !reference.contains('_')
}

/// Assigns a nature to an order reference. Matching is case-sensitive.
pub fn classify(reference: &str) -> Nature {
    RULES
        .iter()
        .find(|(matches, _)| matches(reference))
        .map_or(Nature::Unknown, |(_, nature)| *nature)
}
