use subst::context::Snapshot;

#[test_log::test]
fn test_capture_environment() {
    let snapshot = Snapshot::capture().unwrap();

    let environ: Vec<(String, String)> = std::env::vars().collect();
    assert_eq!(snapshot.env().len(), environ.len());
    for (name, value) in environ {
        assert_eq!(snapshot.lookup_env(&name), Some(value.as_str()), "{name}");
    }
}

#[test_log::test]
fn test_capture_process() {
    let snapshot = Snapshot::capture().unwrap();
    let process = snapshot.process();

    assert_eq!(process.pid, std::process::id());
    assert_eq!(
        process.cwd,
        std::env::current_dir().unwrap().display().to_string()
    );
    assert!(!process.executable.is_empty());
    assert!(!process.temp_dir.is_empty());
    assert!(!process.user_home_dir.is_empty());
    assert_eq!(process.path, snapshot.getenv("PATH"));
    assert_eq!(process.shell, snapshot.getenv("SHELL"));
}
