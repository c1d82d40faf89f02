//! Name and version validation used at registration and build time.

use crate::error::BuildError;

/// Maximum accepted server name length.
pub const MAX_SERVER_NAME_LEN: usize = 128;

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Validate a server name: non-empty, at most 128 chars, `[A-Za-z0-9_-]` only.
pub fn validate_server_name(name: &str) -> Result<(), BuildError> {
    if name.is_empty() {
        return Err(BuildError::InvalidServerName("name is empty".to_string()));
    }
    if name.len() > MAX_SERVER_NAME_LEN {
        return Err(BuildError::InvalidServerName(format!(
            "name exceeds {} characters",
            MAX_SERVER_NAME_LEN
        )));
    }
    if let Some(c) = name.chars().find(|c| !is_name_char(*c)) {
        return Err(BuildError::InvalidServerName(format!(
            "character '{}' not allowed",
            c
        )));
    }
    Ok(())
}

/// Validate a tool or prompt name against the same charset as server names.
pub fn validate_capability_name(kind: &'static str, name: &str) -> Result<(), BuildError> {
    if name.is_empty() || !name.chars().all(is_name_char) {
        return Err(BuildError::InvalidCapabilityName {
            kind,
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Validate a loose semver string: `MAJOR.MINOR[.PATCH][-pre][+build]`.
///
/// Looser than full semver on purpose: pre-release and build tags are only
/// checked for a sane charset, and the patch component may be absent.
pub fn validate_version(version: &str) -> Result<(), BuildError> {
    let invalid = || BuildError::InvalidVersion(version.to_string());

    let (rest, build) = match version.split_once('+') {
        Some((rest, build)) => (rest, Some(build)),
        None => (version, None),
    };
    let (core, pre) = match rest.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (rest, None),
    };

    let components: Vec<&str> = core.split('.').collect();
    if !(components.len() == 2 || components.len() == 3) {
        return Err(invalid());
    }
    for component in &components {
        if component.is_empty() || !component.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
    }

    for tag in [pre, build].into_iter().flatten() {
        if tag.is_empty()
            || !tag
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        {
            return Err(invalid());
        }
    }

    Ok(())
}
