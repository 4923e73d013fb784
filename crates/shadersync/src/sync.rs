use std::fmt;

use tracing::{debug, info, trace, warn};

use crate::fetch::{FetchError, SourceFetcher};
use crate::fingerprint::Fingerprint;
use crate::hooks::{LoggingHooks, ReloadHooks};
use crate::kind::ShaderKind;
use crate::program::ShaderProgram;

/// Shader source text tagged with the order in which it was fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedSource {
    pub sequence: u64,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResyncOutcome {
    /// Source matched the applied fingerprint; nothing was recompiled.
    Unchanged(Fingerprint),
    /// A new fragment shader was attached and the program relinked.
    Applied { fingerprint: Fingerprint, linked: bool },
    /// A newer fetch has already been applied; this one was dropped.
    Stale { sequence: u64 },
}

impl ResyncOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Fragment-shader hot-reload state machine.
///
/// Holds the fingerprint of the last applied source and swaps the fragment
/// shader of a [`ShaderProgram`] only when fetched text hashes differently.
pub struct ShaderSync {
    fingerprint: Option<Fingerprint>,
    last_sequence: Option<u64>,
    hooks: Box<dyn ReloadHooks>,
}

impl ShaderSync {
    pub fn new() -> Self {
        Self::with_hooks(LoggingHooks)
    }

    pub fn with_hooks(hooks: impl ReloadHooks + 'static) -> Self {
        Self {
            fingerprint: None,
            last_sequence: None,
            hooks: Box::new(hooks),
        }
    }

    /// Fingerprint of the applied fragment source; `None` until the first sync.
    pub fn fingerprint(&self) -> Option<Fingerprint> {
        self.fingerprint
    }

    /// Fetches the current source and applies it if it changed.
    pub fn resync<F, P>(&mut self, fetcher: &F, program: &mut P) -> Result<ResyncOutcome, FetchError>
    where
        F: SourceFetcher + ?Sized,
        P: ShaderProgram + ?Sized,
    {
        let text = fetcher.fetch()?;
        Ok(self.apply_text(&text, program))
    }

    /// Applies a source fetched elsewhere, dropping it if a later fetch already landed.
    pub fn apply<P>(&mut self, fetched: &FetchedSource, program: &mut P) -> ResyncOutcome
    where
        P: ShaderProgram + ?Sized,
    {
        if let Some(last) = self.last_sequence {
            if fetched.sequence <= last {
                debug!(
                    sequence = fetched.sequence,
                    last, "dropping out-of-order shader source"
                );
                return ResyncOutcome::Stale {
                    sequence: fetched.sequence,
                };
            }
        }
        self.last_sequence = Some(fetched.sequence);
        self.apply_text(&fetched.text, program)
    }

    /// Detaches the fragment shader and forgets the applied fingerprint.
    pub fn dispose<P>(&mut self, program: &mut P)
    where
        P: ShaderProgram + ?Sized,
    {
        if program.detach_shader(ShaderKind::Fragment).is_some() {
            self.hooks.disposed(ShaderKind::Fragment);
        }
        self.fingerprint = None;
    }

    fn apply_text<P>(&mut self, text: &str, program: &mut P) -> ResyncOutcome
    where
        P: ShaderProgram + ?Sized,
    {
        let fingerprint = Fingerprint::of(text);
        if self.fingerprint == Some(fingerprint) {
            trace!(%fingerprint, "shader source unchanged");
            return ResyncOutcome::Unchanged(fingerprint);
        }

        self.fingerprint = Some(fingerprint);

        if program.detach_shader(ShaderKind::Fragment).is_some() {
            self.hooks.disposed(ShaderKind::Fragment);
        }

        info!(%fingerprint, "Re-injecting Shader...");
        program.create_shader(ShaderKind::Fragment, text);

        let linked = match program.link() {
            Ok(()) => true,
            Err(err) => {
                warn!(%fingerprint, error = %err, "program did not link; rendering black");
                false
            }
        };
        self.hooks.accepted(fingerprint);

        ResyncOutcome::Applied {
            fingerprint,
            linked,
        }
    }
}

impl Default for ShaderSync {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ShaderSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderSync")
            .field("fingerprint", &self.fingerprint)
            .field("last_sequence", &self.last_sequence)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::program::{vert, ActiveShaders, ProgramError};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Create(ShaderKind, String),
        Detach(ShaderKind),
        Link,
    }

    #[derive(Default)]
    struct RecordingProgram {
        shaders: ActiveShaders<String>,
        calls: Vec<Call>,
        fail_link: bool,
    }

    impl RecordingProgram {
        fn compiles(&self) -> usize {
            self.calls
                .iter()
                .filter(|call| matches!(call, Call::Create(ShaderKind::Fragment, _)))
                .count()
        }
    }

    impl ShaderProgram for RecordingProgram {
        type Handle = String;

        fn create_shader(&mut self, kind: ShaderKind, source: &str) -> String {
            self.calls.push(Call::Create(kind, source.to_string()));
            self.shaders.insert(kind, source.to_string());
            source.to_string()
        }

        fn detach_shader(&mut self, kind: ShaderKind) -> Option<String> {
            let removed = self.shaders.remove(kind);
            if removed.is_some() {
                self.calls.push(Call::Detach(kind));
            }
            removed
        }

        fn link(&mut self) -> Result<(), ProgramError> {
            self.calls.push(Call::Link);
            if self.fail_link {
                return Err(ProgramError::Link("forced".into()));
            }
            if !self.shaders.contains(ShaderKind::Vertex) {
                return Err(ProgramError::MissingStage(ShaderKind::Vertex));
            }
            Ok(())
        }
    }

    fn fetched(sequence: u64, text: &str) -> FetchedSource {
        FetchedSource {
            sequence,
            text: text.to_string(),
        }
    }

    #[test]
    fn first_apply_compiles_without_detach() {
        let mut program = RecordingProgram::default();
        vert(&mut program, "vs");
        program.calls.clear();

        let mut sync = ShaderSync::new();
        let outcome = sync.apply(&fetched(1, "fs-a"), &mut program);

        assert!(outcome.is_applied());
        assert_eq!(
            program.calls,
            vec![Call::Create(ShaderKind::Fragment, "fs-a".into()), Call::Link]
        );
        assert_eq!(sync.fingerprint(), Some(Fingerprint::of("fs-a")));
    }

    #[test]
    fn changed_source_detaches_then_attaches_then_links() {
        let mut program = RecordingProgram::default();
        vert(&mut program, "vs");
        let mut sync = ShaderSync::new();
        sync.apply(&fetched(1, "fs-a"), &mut program);
        program.calls.clear();

        sync.apply(&fetched(2, "fs-b"), &mut program);

        assert_eq!(
            program.calls,
            vec![
                Call::Detach(ShaderKind::Fragment),
                Call::Create(ShaderKind::Fragment, "fs-b".into()),
                Call::Link,
            ]
        );
        assert_eq!(
            program.shaders.get(ShaderKind::Fragment).map(String::as_str),
            Some("fs-b")
        );
    }

    #[test]
    fn unchanged_source_is_a_no_op() {
        let mut program = RecordingProgram::default();
        let mut sync = ShaderSync::new();
        sync.apply(&fetched(1, "fs"), &mut program);
        let calls_after_first = program.calls.len();

        let outcome = sync.apply(&fetched(2, "fs"), &mut program);

        assert_eq!(outcome, ResyncOutcome::Unchanged(Fingerprint::of("fs")));
        assert_eq!(program.calls.len(), calls_after_first);
        assert_eq!(program.compiles(), 1);
    }

    #[test]
    fn stale_sequence_is_dropped() {
        let mut program = RecordingProgram::default();
        let mut sync = ShaderSync::new();
        sync.apply(&fetched(5, "newer"), &mut program);

        let outcome = sync.apply(&fetched(4, "older"), &mut program);

        assert_eq!(outcome, ResyncOutcome::Stale { sequence: 4 });
        assert_eq!(sync.fingerprint(), Some(Fingerprint::of("newer")));
        assert_eq!(program.compiles(), 1);
    }

    #[test]
    fn source_hashing_to_zero_is_still_applied() {
        let mut program = RecordingProgram::default();
        let mut sync = ShaderSync::new();

        let outcome = sync.apply(&fetched(1, "\0"), &mut program);

        assert_eq!(
            outcome,
            ResyncOutcome::Applied {
                fingerprint: Fingerprint::from(0),
                linked: false,
            }
        );
        assert_eq!(program.compiles(), 1);
    }

    #[test]
    fn link_failure_still_records_fingerprint() {
        let mut program = RecordingProgram {
            fail_link: true,
            ..RecordingProgram::default()
        };
        vert(&mut program, "vs");
        let mut sync = ShaderSync::new();

        let first = sync.apply(&fetched(1, "broken"), &mut program);
        let second = sync.apply(&fetched(2, "broken"), &mut program);

        assert!(matches!(first, ResyncOutcome::Applied { linked: false, .. }));
        assert!(matches!(second, ResyncOutcome::Unchanged(_)));
        assert_eq!(program.compiles(), 1);
    }

    #[test]
    fn dispose_detaches_and_forgets_fingerprint() {
        #[derive(Default)]
        struct Counting {
            accepted: usize,
            disposed: usize,
        }

        struct SharedHooks(Rc<RefCell<Counting>>);

        impl ReloadHooks for SharedHooks {
            fn accepted(&mut self, _fingerprint: Fingerprint) {
                self.0.borrow_mut().accepted += 1;
            }

            fn disposed(&mut self, _kind: ShaderKind) {
                self.0.borrow_mut().disposed += 1;
            }
        }

        let counts = Rc::new(RefCell::new(Counting::default()));
        let mut program = RecordingProgram::default();
        let mut sync = ShaderSync::with_hooks(SharedHooks(counts.clone()));

        sync.apply(&fetched(1, "a"), &mut program);
        sync.apply(&fetched(2, "b"), &mut program);
        sync.dispose(&mut program);

        assert_eq!(counts.borrow().accepted, 2);
        assert_eq!(counts.borrow().disposed, 2);
        assert_eq!(sync.fingerprint(), None);
        assert!(!program.shaders.contains(ShaderKind::Fragment));
    }
}
