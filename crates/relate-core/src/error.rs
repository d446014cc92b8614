use relate_domain::{RegistryError, RegistryResult};

/// Normalises unclassified failures to `InvalidArgument` at the registry boundary.
///
/// A `RegistryError` already inside the chain is passed through untouched.
pub(crate) trait IntoRegistry<T> {
    fn or_invalid(self, what: impl FnOnce() -> String) -> RegistryResult<T>;
}

impl<T> IntoRegistry<T> for anyhow::Result<T> {
    fn or_invalid(self, what: impl FnOnce() -> String) -> RegistryResult<T> {
        self.map_err(|err| {
            if let Some(registry) = err.downcast_ref::<RegistryError>() {
                return registry.clone();
            }
            RegistryError::invalid_argument(format!("{}: {err:#}", what()))
        })
    }
}

impl<T> IntoRegistry<T> for std::io::Result<T> {
    fn or_invalid(self, what: impl FnOnce() -> String) -> RegistryResult<T> {
        self.map_err(|err| RegistryError::invalid_argument(format!("{}: {err}", what())))
    }
}
