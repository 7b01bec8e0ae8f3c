use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchError {
    #[error("email {0:?} has no local part")]
    MissingLocalPart(String),
    #[error("email {0:?} does not start with a batch code")]
    MissingBatch(String),
    #[error("{0:?} must contain only letters and digits")]
    InvalidCharacters(String),
    #[error("batch must not be empty")]
    Empty,
}

fn local_part(email: &str) -> Result<&str, BatchError> {
    let local = email.trim().split('@').next().unwrap_or_default();
    if local.is_empty() {
        return Err(BatchError::MissingLocalPart(email.to_string()));
    }
    if !local.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(BatchError::InvalidCharacters(email.to_string()));
    }
    Ok(local)
}

/// Upper-cased local part of an institutional email, e.g. `2023UGCS041`.
pub fn username_from_email(email: &str) -> Result<String, BatchError> {
    local_part(email).map(str::to_ascii_uppercase)
}

/// Cohort code from an institutional email: the local part without its
/// trailing roll number, so `2023ugcs041@...` belongs to `2023UGCS`.
pub fn derive_batch(email: &str) -> Result<String, BatchError> {
    let username = username_from_email(email)?;
    let batch = username.trim_end_matches(|c: char| c.is_ascii_digit());
    if batch.is_empty() {
        return Err(BatchError::MissingBatch(email.to_string()));
    }
    Ok(batch.to_string())
}

/// Normalizes a user-supplied batch filter. Only letters and digits are
/// accepted so the value can be used as a `LIKE` prefix as-is.
pub fn validate_batch(raw: &str) -> Result<String, BatchError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(BatchError::Empty);
    }
    if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(BatchError::InvalidCharacters(trimmed.to_string()));
    }
    Ok(trimmed.to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_batch_from_email_prefix() {
        assert_eq!(derive_batch("2023ugcs041@nitjsr.ac.in").unwrap(), "2023UGCS");
        assert_eq!(derive_batch("2022pgme007@nitjsr.ac.in").unwrap(), "2022PGME");
        assert_eq!(
            username_from_email("2023ugcs041@nitjsr.ac.in").unwrap(),
            "2023UGCS041"
        );
    }

    #[test]
    fn rejects_emails_without_batch_code() {
        assert_eq!(
            derive_batch("12345@nitjsr.ac.in"),
            Err(BatchError::MissingBatch("12345@nitjsr.ac.in".to_string()))
        );
        assert!(matches!(
            derive_batch("@nitjsr.ac.in"),
            Err(BatchError::MissingLocalPart(_))
        ));
        assert!(matches!(
            derive_batch("first.last@nitjsr.ac.in"),
            Err(BatchError::InvalidCharacters(_))
        ));
    }

    #[test]
    fn batch_filter_is_normalized() {
        assert_eq!(validate_batch(" 2023ugcsme ").unwrap(), "2023UGCSME");
        assert_eq!(validate_batch("   "), Err(BatchError::Empty));
        assert!(matches!(
            validate_batch("2023%"),
            Err(BatchError::InvalidCharacters(_))
        ));
    }
}
