use std::{
    env,
    ffi::OsString,
    os::unix::ffi::OsStrExt,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use serde::Serialize;
use tracing::debug;

use crate::{
    EnvSource, HomeResolver, ProcessEnv, RootPathError, SystemHome, expand_home, normalize,
};

/// Overrides the main data root.
pub const ROOT_ENV: &str = "CRYPTOMINES_ROOT";
/// Overrides the key storage root.
pub const KEYS_ROOT_ENV: &str = "CRYPTOMINES_KEYS_ROOT";
/// Overrides the simulator data root.
pub const SIMULATOR_ROOT_ENV: &str = "CRYPTOMINES_SIMULATOR_ROOT";

/// Main data root used when `CRYPTOMINES_ROOT` is unset.
pub const DEFAULT_ROOT: &str = "~/.chia/mainnet";
/// Key storage root used when `CRYPTOMINES_KEYS_ROOT` is unset.
pub const DEFAULT_KEYS_ROOT: &str = "~/.chia_keys";
/// Simulator root used when `CRYPTOMINES_SIMULATOR_ROOT` is unset.
pub const DEFAULT_SIMULATOR_ROOT: &str = "~/.chia/simulator";

/// The logical data roots an installation uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RootKind {
    Main,
    Keys,
    Simulator,
}

impl RootKind {
    /// Every root, in display order.
    pub const ALL: [RootKind; 3] = [RootKind::Main, RootKind::Keys, RootKind::Simulator];

    /// Environment variable that overrides this root.
    pub fn env_var(self) -> &'static str {
        match self {
            RootKind::Main => ROOT_ENV,
            RootKind::Keys => KEYS_ROOT_ENV,
            RootKind::Simulator => SIMULATOR_ROOT_ENV,
        }
    }

    /// Location used when the override is unset, before home expansion.
    pub fn default_path(self) -> &'static str {
        match self {
            RootKind::Main => DEFAULT_ROOT,
            RootKind::Keys => DEFAULT_KEYS_ROOT,
            RootKind::Simulator => DEFAULT_SIMULATOR_ROOT,
        }
    }

    /// Short lowercase name used in logs and CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            RootKind::Main => "main",
            RootKind::Keys => "keys",
            RootKind::Simulator => "simulator",
        }
    }
}

/// Where a resolved root's raw value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootSource {
    Override,
    Default,
}

impl RootSource {
    /// Lowercase label used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            RootSource::Override => "override",
            RootSource::Default => "default",
        }
    }
}

/// One fully resolved root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoot {
    /// Which root this is.
    pub kind: RootKind,
    /// Whether the override or the default supplied the raw value.
    pub source: RootSource,
    /// Absolute, normalized location.
    pub path: PathBuf,
}

/// Resolved data roots, computed once at startup and shared by reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootPaths {
    main: PathBuf,
    keys: PathBuf,
    simulator: PathBuf,
}

impl RootPaths {
    /// Resolves every root against the real process environment.
    pub fn from_env() -> Result<Self, RootPathError> {
        Resolver::system().resolve_all()
    }

    /// Main data root.
    pub fn main(&self) -> &Path {
        &self.main
    }

    /// Key storage root.
    pub fn keys(&self) -> &Path {
        &self.keys
    }

    /// Simulator data root.
    pub fn simulator(&self) -> &Path {
        &self.simulator
    }

    /// Root for `kind`.
    pub fn get(&self, kind: RootKind) -> &Path {
        match kind {
            RootKind::Main => &self.main,
            RootKind::Keys => &self.keys,
            RootKind::Simulator => &self.simulator,
        }
    }

    /// Iterates roots in [`RootKind::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (RootKind, &Path)> {
        RootKind::ALL.into_iter().map(move |kind| (kind, self.get(kind)))
    }
}

static PROCESS_ROOTS: OnceLock<RootPaths> = OnceLock::new();

/// Returns the process-wide roots, resolving them on first use.
///
/// Later calls return the same value even if the environment changed.
/// A failed resolution is not cached, so the next call retries.
pub fn process_roots() -> Result<&'static RootPaths, RootPathError> {
    if let Some(roots) = PROCESS_ROOTS.get() {
        return Ok(roots);
    }
    let resolved = RootPaths::from_env()?;
    Ok(PROCESS_ROOTS.get_or_init(|| resolved))
}

/// Applies override lookup, home expansion and normalization.
#[derive(Debug, Clone)]
pub struct Resolver<E = ProcessEnv, H = SystemHome> {
    env: E,
    home: H,
    base_dir: Option<PathBuf>,
}

impl Resolver {
    /// Resolver bound to the process environment, user database and cwd.
    pub fn system() -> Self {
        Self::new(ProcessEnv, SystemHome)
    }
}

impl<E: EnvSource, H: HomeResolver> Resolver<E, H> {
    /// Resolver over `env` and `home`, anchored at the current directory.
    pub fn new(env: E, home: H) -> Self {
        Self {
            env,
            home,
            base_dir: None,
        }
    }

    /// Anchors relative values at `dir` instead of the current directory.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Resolves the value of `var`, falling back to `default` when unset.
    pub fn resolve_root(
        &self,
        var: &'static str,
        default: &str,
    ) -> Result<(PathBuf, RootSource), RootPathError> {
        let (raw, source) = match self.env.var_os(var) {
            Some(value) if value.is_empty() => {
                return Err(RootPathError::EmptyOverride { var });
            }
            Some(value) => (value, RootSource::Override),
            None => (OsString::from(default), RootSource::Default),
        };

        if raw.as_bytes().contains(&0) {
            return Err(RootPathError::InvalidPath {
                path: PathBuf::from(raw),
                reason: "contains a NUL byte",
            });
        }

        let expanded = expand_home(&raw, &self.home)?;
        let path = if expanded.is_absolute() {
            normalize(&expanded, Path::new("/"))?
        } else {
            normalize(&expanded, &self.base_dir()?)?
        };

        debug!(
            var,
            source = source.as_str(),
            path = %path.display(),
            "resolved root path"
        );
        Ok((path, source))
    }

    /// Resolves one root and reports where its value came from.
    pub fn resolve(&self, kind: RootKind) -> Result<ResolvedRoot, RootPathError> {
        let (path, source) = self.resolve_root(kind.env_var(), kind.default_path())?;
        Ok(ResolvedRoot { kind, source, path })
    }

    /// Resolves all three roots; the first failure aborts.
    pub fn resolve_all(&self) -> Result<RootPaths, RootPathError> {
        Ok(RootPaths {
            main: self.resolve(RootKind::Main)?.path,
            keys: self.resolve(RootKind::Keys)?.path,
            simulator: self.resolve(RootKind::Simulator)?.path,
        })
    }

    fn base_dir(&self) -> Result<PathBuf, RootPathError> {
        match &self.base_dir {
            Some(dir) => Ok(dir.clone()),
            None => env::current_dir().map_err(RootPathError::CurrentDir),
        }
    }
}
