//! Descriptor validation utilities.

use crate::types::{Error, Result};

/// Validate that a name is not empty.
pub fn validate_non_empty(s: &str, field: &str) -> Result<()> {
    if s.is_empty() {
        return Err(Error::invalid_descriptor(format!(
            "{} cannot be empty",
            field
        )));
    }
    Ok(())
}

/// Validate that a version is positive.
pub fn validate_positive(n: u32, field: &str) -> Result<()> {
    if n == 0 {
        return Err(Error::invalid_descriptor(format!(
            "{} must be positive",
            field
        )));
    }
    Ok(())
}

/// Validate that a member's `since` does not exceed the interface version.
pub fn validate_since(since: u32, max: u32, field: &str) -> Result<()> {
    validate_positive(since, field)?;
    if since > max {
        return Err(Error::invalid_descriptor(format!(
            "{} is since version {}, but the interface is only at version {}",
            field, since, max
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_since() {
        assert!(validate_since(1, 1, "x").is_ok());
        assert!(validate_since(0, 1, "x").is_err());
        let err = validate_since(3, 2, "intf_A.foo.third").unwrap_err();
        assert!(err.to_string().contains("since version 3"));
    }
}
