use std::fs;
use std::time::{Duration, Instant};

use crossbeam_channel::unbounded;
use shadersync::{
    vert, ActiveShaders, FileFetcher, Fingerprint, Poller, ProgramError, ResyncOutcome,
    ShaderKind, ShaderProgram, ShaderSync,
};
use tempfile::TempDir;

#[derive(Default)]
struct TableProgram {
    shaders: ActiveShaders<String>,
    links: usize,
}

impl ShaderProgram for TableProgram {
    type Handle = String;

    fn create_shader(&mut self, kind: ShaderKind, source: &str) -> String {
        self.shaders.insert(kind, source.to_string());
        source.to_string()
    }

    fn detach_shader(&mut self, kind: ShaderKind) -> Option<String> {
        self.shaders.remove(kind)
    }

    fn link(&mut self) -> Result<(), ProgramError> {
        self.links += 1;
        if self.shaders.len() == 2 {
            Ok(())
        } else {
            Err(ProgramError::MissingStage(ShaderKind::Fragment))
        }
    }
}

#[test]
fn poller_picks_up_file_edits() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hello.frag");
    fs::write(&path, "void main(){gl_FragColor=vec4(1.0);}").unwrap();

    let (tx, rx) = unbounded();
    let poller = Poller::spawn(FileFetcher::new(&path), Duration::from_millis(20), move |fetched| {
        tx.send(fetched).is_ok()
    })
    .unwrap();

    let mut program = TableProgram::default();
    vert(&mut program, "attribute vec4 a_Position;");
    let mut sync = ShaderSync::new();

    let mut applied = Vec::new();
    let mut rewritten = false;
    let deadline = Instant::now() + Duration::from_secs(10);
    while applied.len() < 2 && Instant::now() < deadline {
        let Ok(fetched) = rx.recv_timeout(Duration::from_secs(1)) else {
            continue;
        };
        if let ResyncOutcome::Applied { fingerprint, linked } = sync.apply(&fetched, &mut program)
        {
            assert!(linked);
            applied.push(fingerprint);
        }
        if !rewritten {
            // Rename so the poller never observes a half-written file.
            let staged = dir.path().join("hello.frag.tmp");
            fs::write(&staged, "void main(){gl_FragColor=vec4(0.0);}").unwrap();
            fs::rename(&staged, &path).unwrap();
            rewritten = true;
        }
    }
    drop(rx);
    drop(poller);

    assert_eq!(
        applied,
        vec![
            Fingerprint::of("void main(){gl_FragColor=vec4(1.0);}"),
            Fingerprint::of("void main(){gl_FragColor=vec4(0.0);}"),
        ]
    );
    assert_eq!(program.links, 2);
    assert_eq!(
        program.shaders.get(ShaderKind::Fragment).map(String::as_str),
        Some("void main(){gl_FragColor=vec4(0.0);}")
    );
}
