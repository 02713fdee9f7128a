//! Runs in its own test binary: it changes the process working directory.

use host_primitives::ErrorKind;
use host_tools::{SandboxError, SandboxRoot, ToolError};

#[cfg(target_os = "linux")]
#[test]
fn relative_root_under_deleted_cwd_fails_closed() {
    let home = std::env::temp_dir();
    let dir = tempfile::tempdir().expect("tempdir");
    std::env::set_current_dir(dir.path()).expect("enter tempdir");
    std::fs::remove_dir(dir.path()).expect("remove cwd");
    assert!(std::env::current_dir().is_err());

    let root = SandboxRoot::new("scripts");
    std::env::set_current_dir(&home).expect("leave deleted dir");

    assert!(!root.is_resolved());
    assert_ne!(root.path(), std::path::Path::new("/"));

    let err = root.resolve("etc/passwd").expect_err("nothing is admitted");
    assert!(matches!(err, SandboxError::Unresolved { .. }));

    let err = ToolError::from(err);
    assert_eq!(err.kind(), ErrorKind::Configuration);
}
