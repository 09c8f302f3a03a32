//! Cooperative abort and progress reporting for long transfers

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::debug;

use crate::tiff::errors::{TiffError, TiffResult};

/// A shared flag another thread can raise to stop a running transfer
///
/// The transfer loop polls it between units; clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Receives (done, total) counts as a transfer advances
pub trait ProgressObserver {
    fn on_progress(&self, done: u64, total: u64);
}

/// Abort flag and progress observer handed to read and write loops
#[derive(Default)]
pub struct TransferControl<'a> {
    abort: Option<AbortFlag>,
    progress: Option<&'a dyn ProgressObserver>,
}

impl<'a> TransferControl<'a> {
    /// No abort flag, no progress reporting
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_abort(mut self, flag: AbortFlag) -> Self {
        self.abort = Some(flag);
        self
    }

    pub fn with_progress(mut self, observer: &'a dyn ProgressObserver) -> Self {
        self.progress = Some(observer);
        self
    }

    /// Fails with `Aborted` once the flag has been raised
    pub fn check(&self) -> TiffResult<()> {
        match &self.abort {
            Some(flag) if flag.is_aborted() => {
                debug!("Transfer aborted");
                Err(TiffError::Aborted)
            }
            _ => Ok(()),
        }
    }

    pub fn report(&self, done: u64, total: u64) {
        if let Some(observer) = self.progress {
            observer.on_progress(done, total);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Recorder(RefCell<Vec<(u64, u64)>>);

    impl ProgressObserver for Recorder {
        fn on_progress(&self, done: u64, total: u64) {
            self.0.borrow_mut().push((done, total));
        }
    }

    #[test]
    fn test_abort_is_shared_between_clones() {
        let flag = AbortFlag::new();
        let control = TransferControl::none().with_abort(flag.clone());
        assert!(control.check().is_ok());
        flag.abort();
        assert!(matches!(control.check(), Err(TiffError::Aborted)));
    }

    #[test]
    fn test_progress_is_forwarded() {
        let recorder = Recorder(RefCell::new(Vec::new()));
        let control = TransferControl::none().with_progress(&recorder);
        control.report(1, 4);
        control.report(4, 4);
        assert_eq!(*recorder.0.borrow(), vec![(1, 4), (4, 4)]);
    }
}
