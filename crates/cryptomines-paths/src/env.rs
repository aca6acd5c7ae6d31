use std::{collections::BTreeMap, env, ffi::OsString};

/// Read-only view of environment variables.
pub trait EnvSource {
    /// Returns the raw value of `key`, or `None` when unset.
    fn var_os(&self, key: &str) -> Option<OsString>;
}

/// The environment of the running process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var_os(&self, key: &str) -> Option<OsString> {
        env::var_os(key)
    }
}

impl EnvSource for BTreeMap<String, OsString> {
    fn var_os(&self, key: &str) -> Option<OsString> {
        self.get(key).cloned()
    }
}

impl<E: EnvSource + ?Sized> EnvSource for &E {
    fn var_os(&self, key: &str) -> Option<OsString> {
        (**self).var_os(key)
    }
}
