//! End-to-end launches through the `burrow` binary.
//!
//! Most tests build a throwaway root from the host's `/bin/sh` and
//! `/bin/echo` plus the libraries `ldd` lists for them. They skip themselves
//! when the host refuses unprivileged user namespaces or a fresh procfs.
//! The network test needs a prepared root named by `BURROW_TEST_ROOTFS`;
//! run it with `cargo test -- --ignored`.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn burrow() -> Command {
    Command::new(env!("CARGO_BIN_EXE_burrow"))
}

fn test_rootfs() -> Option<PathBuf> {
    std::env::var_os("BURROW_TEST_ROOTFS").map(PathBuf::from)
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Copy `file` into `root` at the same absolute path.
fn copy_into(root: &Path, file: &Path) {
    let dest = root.join(file.strip_prefix("/").expect("absolute path"));
    std::fs::create_dir_all(dest.parent().expect("parent")).expect("mkdir");
    std::fs::copy(file, &dest).expect("copy");
}

/// A root holding just `/bin/sh`, `/bin/echo` and their shared libraries.
/// `None` when `ldd` is not available.
fn tiny_rootfs() -> Option<TempDir> {
    let dir = tempfile::tempdir().expect("tempdir");
    for binary in ["/bin/sh", "/bin/echo"] {
        copy_into(dir.path(), Path::new(binary));
        let ldd = Command::new("ldd").arg(binary).output().ok()?;
        // ldd fails on static binaries, which need nothing else
        if !ldd.status.success() {
            continue;
        }
        let listing = String::from_utf8_lossy(&ldd.stdout).into_owned();
        for lib in listing.split_whitespace().filter(|w| w.starts_with('/')) {
            copy_into(dir.path(), Path::new(lib));
        }
    }
    Some(dir)
}

fn launch_in(root: &Path, strategy: &str, argv: &[&str]) -> Output {
    burrow()
        .args(["parent", "--no-network", "--strategy", strategy, "--root"])
        .arg(root)
        .args(argv)
        .output()
        .expect("run burrow")
}

/// Whether `output` failed because the host would not let the child set up
/// its namespaces at all.
fn namespaces_refused(output: &Output) -> bool {
    !output.status.success() && stderr(output).contains("failed to start child")
}

/// Build a tiny root and check a plain chroot launch works on this host.
/// Returns `None` (after saying why) when the host cannot run containers.
fn usable_rootfs() -> Option<TempDir> {
    let Some(root) = tiny_rootfs() else {
        eprintln!("ldd not available, skipping");
        return None;
    };
    let output = launch_in(root.path(), "chroot", &["/bin/echo", "ready"]);
    let err = stderr(&output);
    if namespaces_refused(&output)
        || err.contains("failed to mount proc")
        || err.contains("execution error")
    {
        eprintln!("host cannot run containers, skipping: {err}");
        return None;
    }
    Some(root)
}

#[test]
fn usage_error_without_command() {
    let output = burrow().arg("parent").output().expect("run burrow");
    assert!(!output.status.success());
}

#[test]
fn nonexistent_root_is_fatal() {
    let output = launch_in(
        Path::new("/nonexistent/burrow-rootfs"),
        "chroot",
        &["/bin/echo", "hello"],
    );
    if namespaces_refused(&output) {
        eprintln!("user namespaces unavailable, skipping: {}", stderr(&output));
        return;
    }

    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("root setup error"), "{err}");
    assert!(!err.contains("proc mounted"), "{err}");
    assert!(stdout(&output).is_empty());
}

#[test]
fn echo_runs_in_the_container() {
    let Some(root) = usable_rootfs() else {
        return;
    };

    for strategy in ["chroot", "pivot"] {
        let output = launch_in(root.path(), strategy, &["/bin/echo", "hello"]);

        assert_eq!(output.status.code(), Some(0), "{strategy}: {}", stderr(&output));
        assert_eq!(stdout(&output), "hello\n");
        assert!(
            !root.path().join(".pivot_root").exists(),
            "{strategy}: old root mount point left behind"
        );
    }
}

#[test]
fn new_root_is_sealed_with_its_own_proc() {
    let Some(root) = usable_rootfs() else {
        return;
    };
    let host_path = root.path().display().to_string();
    let script = format!(
        "pwd; test -d /proc/1 && echo proc; \
         test -e /.pivot_root || echo no-old-root; \
         test -e {host_path} || echo no-host-path"
    );

    for strategy in ["chroot", "pivot"] {
        let output = launch_in(root.path(), strategy, &["/bin/sh", "-c", &script]);

        assert_eq!(output.status.code(), Some(0), "{strategy}: {}", stderr(&output));
        assert_eq!(stdout(&output), "/\nproc\nno-old-root\nno-host-path\n", "{strategy}");
        assert!(root.path().join("proc").is_dir(), "{strategy}: proc mount point");
    }
}

#[test]
fn child_is_pid_one_in_its_own_namespace() {
    let Some(root) = usable_rootfs() else {
        return;
    };

    // $$ of the shell is the child's child, so PID 1 must be the re-executed
    // burrow and /proc must show the container's own view
    let output = launch_in(
        root.path(),
        "pivot",
        &["/bin/sh", "-c", "echo $$; test -d /proc/1 && pwd"],
    );

    assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));
    let out = stdout(&output);
    let mut lines = out.lines();
    let inner_pid: u32 = lines.next().and_then(|l| l.trim().parse().ok()).expect("pid line");
    assert_ne!(inner_pid, std::process::id());
    assert!(inner_pid < 100, "pid {inner_pid} is not namespaced");
    assert_eq!(lines.next(), Some("/"));
}

#[test]
fn failing_command_exits_one() {
    let Some(root) = usable_rootfs() else {
        return;
    };

    let output = launch_in(root.path(), "chroot", &["/bin/sh", "-c", "exit 4"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("execution error"));
}

#[test]
#[ignore = "needs user namespaces and BURROW_TEST_ROOTFS"]
fn missing_network_helper_is_only_a_warning() {
    let Some(rootfs) = test_rootfs() else {
        eprintln!("BURROW_TEST_ROOTFS not set, skipping");
        return;
    };

    let dir = tempfile::tempdir().expect("tempdir");
    let config = dir.path().join("burrow.json");
    std::fs::write(
        &config,
        r#"{"network": {"helper": "burrow-no-such-helper", "timeout_ms": 2000}}"#,
    )
    .expect("write config");

    let output = burrow()
        .env("RUST_LOG", "burrow=info")
        .arg("parent")
        .arg("--config")
        .arg(&config)
        .arg("--root")
        .arg(&rootfs)
        .args(["/bin/echo", "hello"])
        .output()
        .expect("run burrow");

    assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));
    assert_eq!(stdout(&output), "hello\n");
    assert!(stderr(&output).contains("network setup failed"));
}
