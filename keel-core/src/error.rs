use crate::Error;

/// A single-row read, an update or a delete matched no row.
#[derive(Debug, Clone, thiserror::Error)]
#[error("No record found in table `{table}`")]
pub struct NotFound {
    pub table: String,
}

impl NotFound {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }
}

/// True when `NotFound` appears anywhere in the error chain.
pub fn is_not_found(error: &Error) -> bool {
    error.chain().any(|e| e.is::<NotFound>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn not_found_survives_context() {
        let error = Error::new(NotFound::new("users"));
        assert!(is_not_found(&error));
        let wrapped = Err::<(), _>(error)
            .context("While fetching a user")
            .unwrap_err();
        assert!(is_not_found(&wrapped));
        assert!(!is_not_found(&Error::msg("something else")));
        assert_eq!(
            NotFound::new("users").to_string(),
            "No record found in table `users`"
        );
    }
}
