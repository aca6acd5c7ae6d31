pub mod env;
pub mod errors;
pub mod home;
pub mod normalize;
pub mod roots;

pub use env::{EnvSource, ProcessEnv};
pub use errors::RootPathError;
pub use home::{HomeResolver, SystemHome, expand_home};
pub use normalize::{MAX_SYMLINK_HOPS, normalize};
pub use roots::{
    DEFAULT_KEYS_ROOT, DEFAULT_ROOT, DEFAULT_SIMULATOR_ROOT, KEYS_ROOT_ENV, ROOT_ENV,
    ResolvedRoot, Resolver, RootKind, RootPaths, RootSource, SIMULATOR_ROOT_ENV, process_roots,
};
