//! A fuzzing session: output directory, corpus queue and seen-state.
//!
//! Created at run start, either fresh from the seed set or resumed from a
//! persisted queue. On termination the queue (and the novelty sets, in a
//! companion file) are written back so the next session can pick up where
//! this one stopped.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use lockprobe_explore::corpus::{self, DuplicateFilter, Queue, QueueError};
use lockprobe_explore::oracle::SeenState;
use lockprobe_explore::CommandSequence;
use tracing::info;

use crate::config::SessionConfig;
use crate::findings::FindingWriter;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to create session directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot resume session: {0}")]
    Resume(#[source] QueueError),

    #[error("failed to persist session: {0}")]
    Persist(#[source] QueueError),
}

/// Companion file holding the novelty sets next to a queue file.
pub fn seen_path_for(queue_path: &Path) -> PathBuf {
    let mut name = queue_path.as_os_str().to_owned();
    name.push(".seen.json");
    PathBuf::from(name)
}

/// Create a fresh `session_<timestamp>` directory under `root`. A name
/// already taken gets a `_<n>` suffix.
fn create_session_dir(root: &Path) -> Result<PathBuf, SessionError> {
    fs::create_dir_all(root).map_err(|source| SessionError::CreateDir {
        path: root.to_path_buf(),
        source,
    })?;
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S_%3f").to_string();
    let mut attempt = 0u32;
    loop {
        let name = match attempt {
            0 => format!("session_{stamp}"),
            n => format!("session_{stamp}_{n}"),
        };
        let dir = root.join(name);
        match fs::create_dir(&dir) {
            Ok(()) => return Ok(dir),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(source) => return Err(SessionError::CreateDir { path: dir, source }),
        }
    }
}

pub struct Session {
    dir: PathBuf,
    persist_path: PathBuf,
    resumed: bool,
    pub(crate) queue: Queue,
    pub(crate) seen: SeenState,
    pub(crate) findings: FindingWriter,
}

impl Session {
    /// Create the session directory and load or seed the corpus.
    ///
    /// A configured resume path that exists is loaded (malformed content is
    /// fatal here, and only here). A configured path that does not exist yet
    /// starts fresh and becomes the persistence target.
    pub fn start(
        config: &SessionConfig,
        seeds: &[CommandSequence],
        initial_weight: f64,
    ) -> Result<Self, SessionError> {
        let dir = create_session_dir(&config.output_root)?;

        let (queue, seen, persist_path, resumed) = match &config.resume_path {
            Some(path) if path.exists() => {
                let (queue, tested) = corpus::load_resume(path).map_err(SessionError::Resume)?;
                let mut seen = SeenState::new(tested);
                let seen_file = seen_path_for(path);
                if seen_file.exists() {
                    let snapshot =
                        SeenState::load_novelty(&seen_file).map_err(SessionError::Resume)?;
                    seen.restore(snapshot);
                }
                (queue, seen, path.clone(), true)
            }
            other => {
                let queue = Queue::uniform(seeds.iter().cloned(), initial_weight);
                let seen = SeenState::new(DuplicateFilter::from_sequences(seeds.iter().cloned()));
                let persist_path = other.clone().unwrap_or_else(|| dir.join("queue.json"));
                (queue, seen, persist_path, false)
            }
        };

        info!(
            dir = %dir.display(),
            entries = queue.len(),
            tested = seen.tested.len(),
            resumed,
            "session started"
        );

        Ok(Self {
            findings: FindingWriter::new(&dir),
            dir,
            persist_path,
            resumed,
            queue,
            seen,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn persist_path(&self) -> &Path {
        &self.persist_path
    }

    pub fn resumed(&self) -> bool {
        self.resumed
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn seen(&self) -> &SeenState {
        &self.seen
    }

    pub fn findings_written(&self) -> u64 {
        self.findings.written()
    }

    /// Write the queue and its companion novelty file.
    pub fn persist(&self) -> Result<(), SessionError> {
        self.queue
            .persist(&self.persist_path)
            .map_err(SessionError::Persist)?;
        self.seen
            .persist_novelty(&seen_path_for(&self.persist_path))
            .map_err(SessionError::Persist)?;
        info!(
            path = %self.persist_path.display(),
            entries = self.queue.len(),
            "queue persisted"
        );
        Ok(())
    }

    /// Persist and tear down. Returns the queue path.
    pub fn close(self) -> Result<PathBuf, SessionError> {
        self.persist()?;
        Ok(self.persist_path)
    }
}
