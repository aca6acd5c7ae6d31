use std::{
    ffi::{CStr, CString, OsStr},
    io,
    mem::MaybeUninit,
    os::unix::ffi::OsStrExt,
    path::PathBuf,
    ptr,
};

use crate::RootPathError;

const PW_BUFFER_FALLBACK: usize = 1024;
const PW_BUFFER_MAX: usize = 1 << 20;

/// Looks up home directories for the current or a named user.
pub trait HomeResolver {
    /// Returns the home of `user`, or of the invoking user when `None`.
    fn home_dir(&self, user: Option<&str>) -> Result<PathBuf, RootPathError>;
}

/// Home lookup backed by `$HOME` and the system password database.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHome;

impl HomeResolver for SystemHome {
    fn home_dir(&self, user: Option<&str>) -> Result<PathBuf, RootPathError> {
        match user {
            None => dirs::home_dir().ok_or(RootPathError::HomeUnavailable),
            Some(name) => passwd_home(name),
        }
    }
}

impl<H: HomeResolver + ?Sized> HomeResolver for &H {
    fn home_dir(&self, user: Option<&str>) -> Result<PathBuf, RootPathError> {
        (**self).home_dir(user)
    }
}

/// Replaces a leading `~` or `~name` with the matching home directory.
///
/// Values without a leading `~` are returned unchanged. The marker only
/// extends to the first `/`, so `~name/data` looks up `name`.
pub fn expand_home(raw: &OsStr, home: &dyn HomeResolver) -> Result<PathBuf, RootPathError> {
    let bytes = raw.as_bytes();
    let Some(after_tilde) = bytes.strip_prefix(b"~") else {
        return Ok(PathBuf::from(raw));
    };

    let split = after_tilde
        .iter()
        .position(|byte| *byte == b'/')
        .unwrap_or(after_tilde.len());
    let (user, rest) = after_tilde.split_at(split);

    let base = if user.is_empty() {
        home.home_dir(None)?
    } else {
        let name = std::str::from_utf8(user).map_err(|_| RootPathError::UnknownUser {
            user: String::from_utf8_lossy(user).into_owned(),
        })?;
        home.home_dir(Some(name))?
    };

    let rest = OsStr::from_bytes(trim_leading_slashes(rest));
    if rest.is_empty() {
        Ok(base)
    } else {
        Ok(base.join(rest))
    }
}

fn trim_leading_slashes(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|byte| *byte != b'/').unwrap_or(bytes.len());
    &bytes[start..]
}

fn passwd_home(user: &str) -> Result<PathBuf, RootPathError> {
    let name = CString::new(user).map_err(|_| RootPathError::InvalidPath {
        path: PathBuf::from(format!("~{}", user.escape_debug())),
        reason: "user name contains a NUL byte",
    })?;

    // SAFETY: sysconf only reads a configuration constant.
    let advertised = unsafe { libc::sysconf(libc::_SC_GETPW_R_SIZE_MAX) };
    let mut buf_len = usize::try_from(advertised)
        .ok()
        .filter(|len| *len > 0)
        .unwrap_or(PW_BUFFER_FALLBACK);

    loop {
        let mut buf = vec![0 as libc::c_char; buf_len];
        let mut entry = MaybeUninit::<libc::passwd>::zeroed();
        let mut found: *mut libc::passwd = ptr::null_mut();

        // SAFETY: every pointer references a live allocation and `buf.len()`
        // is the exact size of the scratch buffer.
        let rc = unsafe {
            libc::getpwnam_r(
                name.as_ptr(),
                entry.as_mut_ptr(),
                buf.as_mut_ptr(),
                buf.len(),
                &mut found,
            )
        };

        if rc == libc::ERANGE && buf_len < PW_BUFFER_MAX {
            buf_len *= 2;
            continue;
        }
        // Some libcs report a missing account through the return code.
        let missing = matches!(rc, libc::ENOENT | libc::ESRCH | libc::EBADF | libc::EPERM);
        if rc != 0 && !missing {
            return Err(RootPathError::Io {
                path: PathBuf::from(format!("~{user}")),
                source: io::Error::from_raw_os_error(rc),
            });
        }
        if missing || found.is_null() {
            return Err(RootPathError::UnknownUser {
                user: user.to_string(),
            });
        }

        // SAFETY: getpwnam_r succeeded, so `found` points at `entry` and
        // `pw_dir` is a NUL-terminated string stored inside `buf`.
        let dir = unsafe { CStr::from_ptr((*found).pw_dir) };
        return Ok(PathBuf::from(OsStr::from_bytes(dir.to_bytes())));
    }
}
