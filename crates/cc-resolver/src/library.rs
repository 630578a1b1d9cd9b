//! Cross-platform dynamic library handle, grounded on
//! `raya-engine/src/vm/ffi/loader.rs`'s `Library`/`LibraryHandle` split —
//! same `dlopen`/`dlsym` vs. `LoadLibraryW`/`GetProcAddress` shape, but
//! returning raw symbol addresses (`u64`) instead of a typed function
//! pointer, since a [`DynamicSymbol`](cc_ast::DynamicSymbol) only needs the
//! address, not a callable signature.

use std::ffi::{CStr, CString};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("library not found: {name}")]
    NotFound { name: String },

    #[error("invalid library name '{name}': contains a NUL byte")]
    InvalidName { name: String },
}

pub struct Library {
    handle: PlatformHandle,
    name: String,
}

impl Library {
    /// Opens `name` using the platform's conventional shared-library naming
    /// (`lib<name>.so` on Linux, `<name>.dll` on Windows) if `name` is bare,
    /// or as a literal path if it already looks like one (contains `/`, `\`,
    /// or a platform library extension).
    pub fn open(name: &str) -> Result<Self, ResolverError> {
        let candidate = if looks_like_path(name) { name.to_string() } else { platform_filename(name) };
        let handle = PlatformHandle::load(&candidate).ok_or_else(|| ResolverError::NotFound { name: candidate.clone() })?;
        Ok(Library { handle, name: name.to_string() })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the absolute address of `symbol` in this library, or `None`
    /// if it does not export one by that name.
    pub fn symbol_address(&self, symbol: &str) -> Result<Option<u64>, ResolverError> {
        let c_symbol = CString::new(symbol).map_err(|_| ResolverError::InvalidName { name: symbol.to_string() })?;
        Ok(self.handle.symbol(&c_symbol))
    }
}

fn looks_like_path(name: &str) -> bool {
    name.contains('/') || name.contains('\\') || name.ends_with(".so") || name.ends_with(".dll") || name.ends_with(".dylib")
}

#[cfg(target_os = "macos")]
fn platform_filename(name: &str) -> String {
    format!("lib{name}.dylib")
}

#[cfg(all(unix, not(target_os = "macos")))]
fn platform_filename(name: &str) -> String {
    format!("lib{name}.so")
}

#[cfg(windows)]
fn platform_filename(name: &str) -> String {
    format!("{name}.dll")
}

#[cfg(unix)]
struct PlatformHandle(*mut std::ffi::c_void);

#[cfg(unix)]
impl PlatformHandle {
    fn load(path: &str) -> Option<Self> {
        let c_path = CString::new(path).ok()?;
        let handle = unsafe { libc::dlopen(c_path.as_ptr(), libc::RTLD_NOW | libc::RTLD_GLOBAL) };
        if handle.is_null() {
            None
        } else {
            Some(PlatformHandle(handle))
        }
    }

    fn symbol(&self, name: &CStr) -> Option<u64> {
        unsafe {
            libc::dlerror();
            let addr = libc::dlsym(self.0, name.as_ptr());
            if addr.is_null() || !libc::dlerror().is_null() {
                None
            } else {
                Some(addr as u64)
            }
        }
    }
}

#[cfg(unix)]
impl Drop for PlatformHandle {
    fn drop(&mut self) {
        unsafe {
            libc::dlclose(self.0);
        }
    }
}

#[cfg(unix)]
unsafe impl Send for PlatformHandle {}

#[cfg(windows)]
struct PlatformHandle(*mut std::ffi::c_void);

#[cfg(windows)]
impl PlatformHandle {
    fn load(path: &str) -> Option<Self> {
        use std::ffi::OsStr;
        use std::os::windows::ffi::OsStrExt;
        let wide: Vec<u16> = OsStr::new(path).encode_wide().chain(std::iter::once(0)).collect();
        let handle = unsafe { LoadLibraryW(wide.as_ptr()) };
        if handle.is_null() {
            None
        } else {
            Some(PlatformHandle(handle))
        }
    }

    fn symbol(&self, name: &CStr) -> Option<u64> {
        let addr = unsafe { GetProcAddress(self.0, name.as_ptr()) };
        if addr.is_null() {
            None
        } else {
            Some(addr as u64)
        }
    }
}

#[cfg(windows)]
impl Drop for PlatformHandle {
    fn drop(&mut self) {
        unsafe {
            FreeLibrary(self.0);
        }
    }
}

#[cfg(windows)]
unsafe impl Send for PlatformHandle {}

#[cfg(windows)]
extern "system" {
    fn LoadLibraryW(filename: *const u16) -> *mut std::ffi::c_void;
    fn GetProcAddress(module: *mut std::ffi::c_void, procname: *const i8) -> *mut std::ffi::c_void;
    fn FreeLibrary(module: *mut std::ffi::c_void) -> i32;
}
