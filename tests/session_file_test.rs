//! File-backed session persistence

use deployx_console::session::{FileSessionPersistence, PersistedSession, SessionPersistence};
use deployx_console::SessionStore;
use std::sync::Arc;
use tempfile::tempdir;

#[test]
fn test_session_survives_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("session.json");

    let store = SessionStore::rehydrate(Arc::new(FileSessionPersistence::new(&path)));
    assert!(!store.is_authenticated());
    store.set_auth("t1", "admin", true).unwrap();
    assert!(path.exists());

    let restarted = SessionStore::rehydrate(Arc::new(FileSessionPersistence::new(&path)));
    assert!(restarted.is_authenticated());
    assert_eq!(restarted.token().as_deref(), Some("t1"));
    assert_eq!(restarted.username().as_deref(), Some("admin"));
    assert!(restarted.is_superuser());
}

#[test]
fn test_logout_purges_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.json");

    let store = SessionStore::rehydrate(Arc::new(FileSessionPersistence::new(&path)));
    store.set_auth("t1", "admin", false).unwrap();
    store.logout();
    assert!(!path.exists());
    assert!(!store.is_authenticated());

    // Clearing twice is fine
    store.logout();

    let restarted = SessionStore::rehydrate(Arc::new(FileSessionPersistence::new(&path)));
    assert!(!restarted.is_authenticated());
}

#[test]
fn test_partial_record_is_discarded() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, r#"{"token": "t1", "username": null, "is_superuser": true}"#).unwrap();

    let store = SessionStore::rehydrate(Arc::new(FileSessionPersistence::new(&path)));
    assert!(!store.is_authenticated());
    assert!(!store.is_superuser());
    assert!(store.username().is_none());
}

#[test]
fn test_corrupt_file_starts_anonymous() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, "not json").unwrap();

    let persistence = FileSessionPersistence::new(&path);
    assert!(persistence.load().is_err());

    let store = SessionStore::rehydrate(Arc::new(persistence));
    assert!(!store.is_authenticated());

    // A new login overwrites the corrupt file
    store.set_auth("t2", "operator", false).unwrap();
    let record = FileSessionPersistence::new(&path).load().unwrap().unwrap();
    assert_eq!(
        record,
        PersistedSession {
            token: Some("t2".into()),
            username: Some("operator".into()),
            is_superuser: false,
        }
    );
}

#[cfg(unix)]
#[test]
fn test_session_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let path = dir.path().join("session.json");
    let store = SessionStore::rehydrate(Arc::new(FileSessionPersistence::new(&path)));
    store.set_auth("t1", "admin", true).unwrap();

    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[cfg(unix)]
#[test]
fn test_existing_loose_file_is_tightened() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, "{}").unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

    let store = SessionStore::rehydrate(Arc::new(FileSessionPersistence::new(&path)));
    store.set_auth("t1", "admin", true).unwrap();

    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
    let record = FileSessionPersistence::new(&path).load().unwrap().unwrap();
    assert_eq!(record.token.as_deref(), Some("t1"));
}
