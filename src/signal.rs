//! Ctrl-C handling.
//!
//! The first SIGINT flips the run's [`CancelToken`] so the teardown stops
//! after the resource in flight. The handler then restores the default
//! disposition, so a second Ctrl-C terminates immediately.

use anyhow::Result;
use teardown::CancelToken;

#[cfg(unix)]
mod imp {
    use anyhow::{Result, bail};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, OnceLock};
    use teardown::CancelToken;

    static FLAG: OnceLock<Arc<AtomicBool>> = OnceLock::new();

    extern "C" fn on_sigint(_signal: libc::c_int) {
        if let Some(flag) = FLAG.get() {
            flag.store(true, Ordering::SeqCst);
        }
        // SAFETY: signal() is async-signal-safe.
        unsafe {
            libc::signal(libc::SIGINT, libc::SIG_DFL);
        }
    }

    pub fn install(token: &CancelToken) -> Result<()> {
        if FLAG.set(token.flag()).is_err() {
            bail!("interrupt handler already installed");
        }

        let handler = on_sigint as extern "C" fn(libc::c_int) as libc::sighandler_t;
        // SAFETY: the handler only touches an atomic and re-arms the default.
        let previous = unsafe { libc::signal(libc::SIGINT, handler) };
        if previous == libc::SIG_ERR {
            bail!("could not install interrupt handler");
        }
        Ok(())
    }
}

#[cfg(not(unix))]
mod imp {
    use anyhow::Result;
    use teardown::CancelToken;

    pub fn install(_token: &CancelToken) -> Result<()> {
        log::debug!("Interrupt handling not supported on this platform");
        Ok(())
    }
}

/// Route Ctrl-C to `token`. Can be called once per process.
pub fn install(token: &CancelToken) -> Result<()> {
    imp::install(token)
}
