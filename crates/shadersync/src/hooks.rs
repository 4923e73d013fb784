use tracing::debug;

use crate::fingerprint::Fingerprint;
use crate::kind::ShaderKind;

/// Development lifecycle callbacks fired around shader swaps.
pub trait ReloadHooks {
    /// A new fragment source was compiled and attached.
    fn accepted(&mut self, fingerprint: Fingerprint) {
        debug!(%fingerprint, "Accept!");
    }

    /// A previously attached shader was detached from the program.
    fn disposed(&mut self, kind: ShaderKind) {
        debug!(%kind, "Dispose!");
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHooks;

impl ReloadHooks for LoggingHooks {}
