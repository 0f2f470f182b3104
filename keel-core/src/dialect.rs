use crate::{GenericSqlWriter, SqlWriter};
use std::{
    collections::HashMap,
    sync::{Arc, LazyLock, PoisonError, RwLock},
};

static DIALECTS: LazyLock<RwLock<HashMap<String, Arc<dyn SqlWriter>>>> =
    LazyLock::new(Default::default);

/// Makes `writer` available under `name`, replacing any previous registration.
pub fn register_dialect(name: &str, writer: Arc<dyn SqlWriter>) {
    log::debug!("Registering the SQL dialect `{}`", name);
    DIALECTS
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(name.to_string(), writer);
}

/// The writer registered under `name`, the generic writer when none is.
pub fn dialect(name: &str) -> Arc<dyn SqlWriter> {
    match DIALECTS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(name)
    {
        Some(writer) => writer.clone(),
        None => {
            log::debug!("No SQL dialect registered as `{}`, using the generic one", name);
            Arc::new(GenericSqlWriter)
        }
    }
}

pub fn registered_dialects() -> Vec<String> {
    let mut result = DIALECTS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .keys()
        .cloned()
        .collect::<Vec<_>>();
    result.sort();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Custom;
    impl SqlWriter for Custom {
        fn name(&self) -> &'static str {
            "custom"
        }
    }

    #[test]
    fn registry() {
        assert_eq!(dialect("never_registered").name(), "generic");
        register_dialect("custom", Arc::new(Custom));
        assert_eq!(dialect("custom").name(), "custom");
        assert!(registered_dialects().contains(&"custom".to_string()));
    }
}
