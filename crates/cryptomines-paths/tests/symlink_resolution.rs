use std::{
    collections::BTreeMap,
    ffi::OsString,
    fs,
    os::unix::fs::{PermissionsExt, symlink},
    path::{Path, PathBuf},
};

use cryptomines_paths::{
    EnvSource, HomeResolver, MAX_SYMLINK_HOPS, Resolver, RootKind, RootPathError, normalize,
};

struct FixedHome(PathBuf);

impl HomeResolver for FixedHome {
    fn home_dir(&self, _user: Option<&str>) -> Result<PathBuf, RootPathError> {
        Ok(self.0.clone())
    }
}

fn scratch() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let canonical = fs::canonicalize(dir.path()).expect("tempdir should canonicalize");
    (dir, canonical)
}

fn main_root(env: impl EnvSource, home: &Path) -> Result<PathBuf, RootPathError> {
    Resolver::new(env, FixedHome(home.to_path_buf()))
        .resolve(RootKind::Main)
        .map(|resolved| resolved.path)
}

#[test]
fn symlinked_home_is_resolved() {
    let (_dir, root) = scratch();
    let real_home = root.join("real-home");
    fs::create_dir_all(&real_home).expect("home should be created");
    symlink(&real_home, root.join("home-link")).expect("symlink should be created");

    let env: BTreeMap<String, OsString> = BTreeMap::new();
    let path = main_root(env, &root.join("home-link")).expect("resolution should succeed");

    assert_eq!(path, real_home.join(".chia/mainnet"));
}

#[test]
fn parent_after_symlink_applies_to_target() {
    let (_dir, root) = scratch();
    fs::create_dir_all(root.join("a/b")).expect("dirs should be created");
    symlink(root.join("a/b"), root.join("link")).expect("symlink should be created");

    let out = normalize(&root.join("link/../sibling"), Path::new("/"))
        .expect("normalize should succeed");

    assert_eq!(out, root.join("a/sibling"));
}

#[test]
fn relative_symlink_targets_resolve_from_link_parent() {
    let (_dir, root) = scratch();
    fs::create_dir_all(root.join("store/chain")).expect("dirs should be created");
    fs::create_dir_all(root.join("links")).expect("dirs should be created");
    symlink("../store/chain", root.join("links/chain")).expect("symlink should be created");

    let mut env = BTreeMap::new();
    env.insert(
        "CRYPTOMINES_ROOT".to_string(),
        OsString::from(root.join("links/chain/db")),
    );

    let path = main_root(env, &root).expect("resolution should succeed");

    assert_eq!(path, root.join("store/chain/db"));
}

#[test]
fn dangling_symlink_is_followed_without_error() {
    let (_dir, root) = scratch();
    symlink(root.join("not-yet"), root.join("dangling")).expect("symlink should be created");

    let out = normalize(&root.join("dangling/inner"), Path::new("/"))
        .expect("normalize should succeed");

    assert_eq!(out, root.join("not-yet/inner"));
}

#[test]
fn symlink_cycle_is_reported() {
    let (_dir, root) = scratch();
    symlink(root.join("ping"), root.join("pong")).expect("symlink should be created");
    symlink(root.join("pong"), root.join("ping")).expect("symlink should be created");

    let err = normalize(&root.join("ping/data"), Path::new("/"))
        .expect_err("cycle must fail");

    assert!(matches!(err, RootPathError::SymlinkLoop { .. }));
}

#[test]
fn path_through_regular_file_is_kept_lexically() {
    let (_dir, root) = scratch();
    fs::write(root.join("file"), b"x").expect("file should be written");

    let out = normalize(&root.join("file/child"), Path::new("/"))
        .expect("normalize should succeed");

    assert_eq!(out, root.join("file/child"));
}

#[test]
fn long_chain_of_distinct_links_hits_hop_limit() {
    let (_dir, root) = scratch();
    fs::create_dir_all(root.join("end")).expect("dir should be created");
    let mut previous = root.join("end");
    for index in 0..=MAX_SYMLINK_HOPS {
        let link = root.join(format!("hop-{index}"));
        symlink(&previous, &link).expect("symlink should be created");
        previous = link;
    }

    let err = normalize(&previous, Path::new("/")).expect_err("hop limit must apply");

    assert!(matches!(err, RootPathError::SymlinkLoop { .. }));
}

#[test]
fn chain_within_hop_limit_resolves() {
    let (_dir, root) = scratch();
    fs::create_dir_all(root.join("end")).expect("dir should be created");
    let mut previous = root.join("end");
    for index in 0..MAX_SYMLINK_HOPS {
        let link = root.join(format!("hop-{index}"));
        symlink(&previous, &link).expect("symlink should be created");
        previous = link;
    }

    let out = normalize(&previous.join("db"), Path::new("/")).expect("normalize should succeed");

    assert_eq!(out, root.join("end/db"));
}

#[test]
fn overlong_component_is_kept_lexically() {
    let (_dir, root) = scratch();
    let long = "a".repeat(300);

    let out = normalize(&root.join(&long).join("chain"), Path::new("/"))
        .expect("normalize should succeed");

    assert_eq!(out, root.join(long).join("chain"));
}

#[test]
fn unreadable_directory_is_kept_lexically() {
    // SAFETY: geteuid has no preconditions.
    if unsafe { libc::geteuid() } == 0 {
        return;
    }

    let (_dir, root) = scratch();
    let locked = root.join("locked");
    fs::create_dir_all(locked.join("inner")).expect("dirs should be created");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000))
        .expect("permissions should be set");

    let result = normalize(&locked.join("inner/chain"), Path::new("/"));

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755))
        .expect("permissions should be restored");
    assert_eq!(
        result.expect("normalize should succeed"),
        locked.join("inner/chain")
    );
}

#[test]
fn unreadable_directory_in_override_resolves() {
    // SAFETY: geteuid has no preconditions.
    if unsafe { libc::geteuid() } == 0 {
        return;
    }

    let (_dir, root) = scratch();
    let locked = root.join("locked");
    fs::create_dir_all(locked.join("inner")).expect("dirs should be created");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000))
        .expect("permissions should be set");

    let mut env = BTreeMap::new();
    env.insert(
        "CRYPTOMINES_ROOT".to_string(),
        OsString::from(locked.join("inner/chain")),
    );
    let result = main_root(env, &root);

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755))
        .expect("permissions should be restored");
    assert_eq!(
        result.expect("resolution should succeed"),
        locked.join("inner/chain")
    );
}
