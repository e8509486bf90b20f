const INSTITUTIONAL_DOMAIN: &str = "nantes.archi";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub prenom: String,
    pub nom: String,
}

/// Guesses first and last name from an institutional address such as
/// `jean.dupont@nantes.archi.fr`.
///
/// Other addresses yield an empty identity.
pub fn extract_identity(mail: &str) -> Identity {
    if !mail.contains(INSTITUTIONAL_DOMAIN) {
        return Identity::default();
    }
    let local_part = mail.split('@').next().unwrap_or_default();
    let (prenom, nom) = local_part.split_once('.').unwrap_or((local_part, ""));
    Identity {
        prenom: prenom.to_owned(),
        nom: nom.to_owned(),
    }
}
