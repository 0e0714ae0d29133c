use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Process-wide "don't ask again" switch for environment checks.
///
/// Clones share the flag. Once suppressed, `ensure_env` is a no-op for
/// every project until the workspace is dropped.
#[derive(Debug, Clone, Default)]
pub struct EnvPolicy {
    suppressed: Arc<AtomicBool>,
}

impl EnvPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed.load(Ordering::SeqCst)
    }

    pub fn suppress(&self) {
        tracing::info!("Environment checks suppressed for this session");
        self.suppressed.store(true, Ordering::SeqCst);
    }
}
