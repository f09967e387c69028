// tests/resolver.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use procexec::ExecutableResolver;
use procexec::fs::mock::MockFileSystem;
use procexec::resolve::parse_search_path;

fn mock_resolver(fs: &MockFileSystem, search_path: &[&str]) -> ExecutableResolver {
    ExecutableResolver::with_filesystem(
        Arc::new(fs.clone()),
        search_path.iter().map(PathBuf::from).collect(),
    )
}

#[test]
fn finds_first_match_in_search_order() {
    let fs = MockFileSystem::new("/home/user");
    fs.add_executable("/usr/local/bin/tool");
    fs.add_executable("/usr/bin/tool");
    let resolver = mock_resolver(&fs, &["/usr/local/bin", "/usr/bin"]);

    assert_eq!(
        resolver.resolve("tool", None),
        Some(PathBuf::from("/usr/local/bin/tool"))
    );
}

#[test]
fn non_executable_files_are_skipped() {
    let fs = MockFileSystem::new("/home/user");
    fs.add_file("/a/tool");
    fs.add_executable("/b/tool");
    let resolver = mock_resolver(&fs, &["/a", "/b"]);

    assert_eq!(resolver.resolve("tool", None), Some(PathBuf::from("/b/tool")));
}

#[test]
fn repeated_lookups_hit_the_cache() {
    let fs = MockFileSystem::new("/home/user");
    fs.add_executable("/usr/bin/tool");
    let resolver = mock_resolver(&fs, &["/opt/bin", "/usr/bin"]);

    assert!(resolver.resolve("tool", None).is_some());
    let probes = fs.probe_count();
    assert!(probes >= 2);

    assert!(resolver.resolve("tool", None).is_some());
    assert!(resolver.resolve("tool", Some(Path::new("/home/user"))).is_some());
    assert_eq!(fs.probe_count(), probes);
    assert_eq!(resolver.cached_len(), 1);
}

#[test]
fn negative_results_are_cached_too() {
    let fs = MockFileSystem::new("/home/user");
    let resolver = mock_resolver(&fs, &["/usr/bin"]);

    assert_eq!(resolver.resolve("ghost", None), None);
    // Appearing later does not help until the cache is cleared.
    fs.add_executable("/usr/bin/ghost");
    assert_eq!(resolver.resolve("ghost", None), None);

    resolver.clear_cache();
    assert_eq!(
        resolver.resolve("ghost", None),
        Some(PathBuf::from("/usr/bin/ghost"))
    );
}

#[test]
fn other_working_directories_bypass_the_cache() {
    let fs = MockFileSystem::new("/home/user");
    fs.add_executable("/home/user/bin/tool");
    fs.add_executable("/srv/project/bin/tool");
    let resolver = mock_resolver(&fs, &["bin"]);

    assert_eq!(
        resolver.resolve("tool", None),
        Some(PathBuf::from("/home/user/bin/tool"))
    );
    assert_eq!(
        resolver.resolve("tool", Some(Path::new("/srv/project"))),
        Some(PathBuf::from("/srv/project/bin/tool"))
    );
    assert_eq!(resolver.resolve("tool", Some(Path::new("/nowhere"))), None);

    // Only the lookup from the resolver's own directory was remembered.
    assert_eq!(resolver.cached_len(), 1);
    assert_eq!(
        resolver.resolve("tool", None),
        Some(PathBuf::from("/home/user/bin/tool"))
    );
}

#[test]
fn paths_are_validated_not_searched() {
    let fs = MockFileSystem::new("/home/user");
    fs.add_executable("/opt/tool");
    fs.add_executable("/work/scripts/run");
    let resolver = mock_resolver(&fs, &["/usr/bin"]);

    assert_eq!(resolver.resolve("/opt/tool", None), Some(PathBuf::from("/opt/tool")));
    assert_eq!(resolver.resolve("/opt/missing", None), None);
    assert_eq!(
        resolver.resolve("scripts/run", Some(Path::new("/work"))),
        Some(PathBuf::from("/work/scripts/run"))
    );
    assert_eq!(resolver.resolve("scripts/run", None), None);
    assert_eq!(resolver.cached_len(), 0);
}

#[test]
fn empty_program_resolves_to_nothing() {
    let fs = MockFileSystem::new("/home/user");
    let resolver = mock_resolver(&fs, &["/usr/bin"]);

    assert_eq!(resolver.resolve("", None), None);
    assert_eq!(fs.probe_count(), 0);
}

#[test]
fn search_path_parsing_drops_empty_entries() {
    #[cfg(unix)]
    let parsed = parse_search_path("/usr/bin::/bin:");
    #[cfg(windows)]
    let parsed = parse_search_path(r"C:\bin;;D:\tools;");

    assert_eq!(parsed.len(), 2);
}

#[cfg(unix)]
#[test]
fn real_filesystem_relative_entries_follow_working_directory() -> Result<(), Box<dyn std::error::Error>> {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    let root = tempfile::tempdir()?;
    let project = root.path().join("project");
    fs::create_dir_all(project.join("bin"))?;

    let script = project.join("bin").join("hello-tool");
    fs::write(&script, "#!/bin/sh\necho hi\n")?;
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755))?;

    let plain = project.join("bin").join("not-exec");
    fs::write(&plain, "data")?;
    fs::set_permissions(&plain, fs::Permissions::from_mode(0o644))?;

    let resolver = ExecutableResolver::with_search_path(vec![PathBuf::from("bin")]);
    assert_eq!(resolver.resolve("hello-tool", Some(project.as_path())), Some(script));
    assert_eq!(resolver.resolve("not-exec", Some(project.as_path())), None);
    assert_eq!(resolver.resolve("hello-tool", Some(root.path())), None);
    Ok(())
}
