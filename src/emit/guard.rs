//! Process-wide exclusive export flag.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::util::{Error, Result};

static EXPORTING: AtomicBool = AtomicBool::new(false);

/// Held for the duration of one export run; released on drop.
#[derive(Debug)]
pub struct ExportGuard {
    _private: (),
}

impl ExportGuard {
    /// Claim the flag, failing with [`Error::ExportInProgress`] if another
    /// run holds it.
    pub fn acquire() -> Result<Self> {
        EXPORTING
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self { _private: () })
            .map_err(|_| Error::ExportInProgress)
    }

    pub fn is_exporting() -> bool {
        EXPORTING.load(Ordering::Acquire)
    }
}

impl Drop for ExportGuard {
    fn drop(&mut self) {
        EXPORTING.store(false, Ordering::Release);
    }
}
