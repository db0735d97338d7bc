use std::fs;

use lockprobe_core::config::{default_seeds, SessionConfig};
use lockprobe_core::session::{seen_path_for, Session, SessionError};
use lockprobe_explore::corpus::{Queue, QueueError};
use lockprobe_explore::CommandSequence;

fn seq(bytes: &[u8]) -> CommandSequence {
    CommandSequence::new(bytes.to_vec()).unwrap()
}

fn session_config(root: &std::path::Path) -> SessionConfig {
    SessionConfig {
        output_root: root.join("out"),
        resume_path: None,
    }
}

#[test]
fn test_fresh_session_seeds_queue_and_tested_set() {
    let root = tempfile::tempdir().unwrap();
    let session = Session::start(&session_config(root.path()), &default_seeds(), 1.0).unwrap();

    assert!(!session.resumed());
    assert!(session.dir().is_dir());
    let name = session.dir().file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("session_"), "{name}");
    assert_eq!(session.persist_path(), session.dir().join("queue.json"));

    assert_eq!(session.queue().len(), 4);
    assert!(session.queue().entries().iter().all(|e| e.weight == 1.0));
    assert_eq!(session.seen().tested.len(), 4);
    assert!(session.seen().tested.contains(&seq(&[0xAA])));
}

#[test]
fn test_resume_loads_queue_and_persists_back() {
    let root = tempfile::tempdir().unwrap();
    let resume = root.path().join("resume.json");
    fs::write(&resume, r#"[{"sequence":[1,2],"weight":2.0}]"#).unwrap();

    let config = SessionConfig {
        resume_path: Some(resume.clone()),
        ..session_config(root.path())
    };
    let session = Session::start(&config, &default_seeds(), 1.0).unwrap();

    assert!(session.resumed());
    assert_eq!(session.queue().len(), 1);
    assert_eq!(session.queue().entries()[0].sequence, seq(&[1, 2]));
    assert_eq!(session.queue().entries()[0].weight, 2.0);
    assert!(session.seen().tested.contains(&seq(&[1, 2])));
    assert!(!session.seen().tested.contains(&seq(&[0x00])));
    assert_eq!(session.persist_path(), resume.as_path());
}

#[test]
fn test_malformed_resume_is_fatal() {
    let root = tempfile::tempdir().unwrap();
    let resume = root.path().join("resume.json");
    fs::write(&resume, "{ not a queue").unwrap();

    let config = SessionConfig {
        resume_path: Some(resume),
        ..session_config(root.path())
    };
    let err = Session::start(&config, &default_seeds(), 1.0).err().unwrap();
    assert!(matches!(
        err,
        SessionError::Resume(QueueError::MalformedResumeFile { .. })
    ));
}

#[test]
fn test_missing_resume_file_starts_fresh_at_that_path() {
    let root = tempfile::tempdir().unwrap();
    let resume = root.path().join("later.json");
    let config = SessionConfig {
        resume_path: Some(resume.clone()),
        ..session_config(root.path())
    };

    let session = Session::start(&config, &default_seeds(), 1.0).unwrap();
    assert!(!session.resumed());
    assert_eq!(session.queue().len(), 4);

    let path = session.close().unwrap();
    assert_eq!(path, resume);
    assert!(resume.is_file());
    assert!(seen_path_for(&resume).is_file());
}

#[test]
fn test_close_then_resume_round_trip() {
    let root = tempfile::tempdir().unwrap();
    let first = Session::start(&session_config(root.path()), &default_seeds(), 3.0).unwrap();
    let entries = first.queue().entries().to_vec();
    let path = first.close().unwrap();

    let config = SessionConfig {
        resume_path: Some(path),
        ..session_config(root.path())
    };
    let second = Session::start(&config, &[seq(&[0x42])], 1.0).unwrap();
    assert!(second.resumed());
    assert_eq!(second.queue().entries(), entries.as_slice());
    assert!(!second.seen().tested.contains(&seq(&[0x42])));
}

#[test]
fn test_back_to_back_sessions_get_distinct_directories() {
    let root = tempfile::tempdir().unwrap();
    let config = session_config(root.path());

    let first = Session::start(&config, &[seq(&[1])], 1.0).unwrap();
    let second = Session::start(&config, &[seq(&[2])], 1.0).unwrap();
    assert_ne!(first.dir(), second.dir());
    let name = second.dir().file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("session_"), "{name}");

    let first_queue = first.close().unwrap();
    let second_queue = second.close().unwrap();
    assert_ne!(first_queue, second_queue);
    assert_eq!(Queue::load(&first_queue).unwrap().entries()[0].sequence, seq(&[1]));
    assert_eq!(Queue::load(&second_queue).unwrap().entries()[0].sequence, seq(&[2]));
}
