//! Integration tests for hollow
//!
//! End-to-end scenarios through the public API: boot a kernel, switch
//! between processes and check what each one can see and do.

use hollow::kernel::{
    Arg, CredStatus, Errno, Fd, FileMode, Gid, OpenFlags, Pid, SyscallRet, Uid, Whence,
};
use hollow::{Kernel, KernelConfig, boot};

fn booted() -> Kernel {
    boot(&KernelConfig::default()).unwrap()
}

/// Root builds a tree, then switches to an unprivileged user
fn with_user(k: &mut Kernel, uid: u32) -> Pid {
    let pid = k.create_process(Uid(uid), Gid(uid), "/");
    assert!(k.set_current(pid));
    pid
}

// ============================================================================
// Permissions
// ============================================================================

#[test]
fn test_other_read_then_revoked() {
    let mut k = Kernel::new();
    k.mkdir("/a", None).unwrap();
    k.mkdir("/a/b", None).unwrap();
    k.write_file("/a/b/f", "hi", 0o644).unwrap();

    with_user(&mut k, 1000);
    assert_eq!(k.read_file("/a/b/f").unwrap(), "hi");
    assert_eq!(k.write_file("/a/b/f", "x", 0o644), Err(Errno::AccessDenied));

    k.set_current(Pid::ROOT);
    k.chmod("/a/b/f", 0o640).unwrap();

    k.set_current(Pid(2));
    assert_eq!(k.read_file("/a/b/f"), Err(Errno::AccessDenied));
}

#[test]
fn test_traversal_needs_exec() {
    let mut k = Kernel::new();
    k.mkdir("/locked", Some(0o700)).unwrap();
    k.write_file("/locked/f", "secret", 0o644).unwrap();

    with_user(&mut k, 1000);
    assert_eq!(k.read_file("/locked/f"), Err(Errno::AccessDenied));
    assert_eq!(k.stat("/locked/f").err(), Some(Errno::AccessDenied));
    assert_eq!(k.chdir("/locked"), Err(Errno::AccessDenied));
}

#[test]
fn test_booted_layout_as_user() {
    let mut k = booted();
    with_user(&mut k, 1000);

    assert!(k.read_file("/etc/passwd").unwrap().starts_with("root:x:0:0"));
    assert_eq!(k.getdents("/root").err(), Some(Errno::AccessDenied));
    assert_eq!(k.create_file("/etc/mine", 0o644), Err(Errno::AccessDenied));
    assert_eq!(k.unlink("/etc/passwd"), Err(Errno::AccessDenied));

    let names: Vec<String> = k.getdents("/usr").unwrap().into_iter().map(|e| e.name).collect();
    assert_eq!(
        names,
        ["bin", "include", "lib", "lib64", "libexec", "local", "sbin", "share", "src"]
    );
}

#[test]
fn test_group_owner_can_write() {
    let mut k = booted();
    k.mkdir("/srv", None).unwrap();
    k.write_file("/srv/log", "", 0o664).unwrap();
    // An explicit mode is not umasked
    assert_eq!(k.mode_of("/srv/log"), Ok(FileMode(0o664)));
    k.chown("/srv/log", Some(Uid(1)), Some(Gid(50))).unwrap();

    let pid = k.create_process(Uid(1000), Gid(50), "/srv");
    k.set_current(pid);
    assert_eq!(k.append_file("log", "line\n"), Ok(5));
    assert_eq!(k.read_file("/srv/log").unwrap(), "line\n");
    assert_eq!(k.chmod("/srv/log", 0o666), Err(Errno::NotPermitted));
}

// ============================================================================
// Credentials
// ============================================================================

#[test]
fn test_setuid_drops_privileges_for_good() {
    let mut k = Kernel::new();
    let pid = k.create_process(Uid::ROOT, Gid::ROOT, "/");
    k.set_current(pid);
    k.setgid(Gid(1000)).unwrap();

    assert_eq!(k.setuid(Uid(1000)), Ok(CredStatus::Ok));
    assert_eq!(k.getresuid(), Ok((Uid(1000), Uid(1000), Uid(1000))));

    assert_eq!(k.setuid(Uid(0)), Ok(CredStatus::Denied));
    assert_eq!(k.getresuid(), Ok((Uid(1000), Uid(1000), Uid(1000))));
    assert_eq!(k.chown("/", Some(Uid(1000)), None), Err(Errno::NotPermitted));
}

#[test]
fn test_seteuid_round_trip_through_saved_id() {
    let mut k = Kernel::new();
    let pid = k.create_process(Uid::ROOT, Gid(100), "/");
    k.set_current(pid);

    // Privileged: real 1000, effective and saved 0
    assert_eq!(
        k.setresuid(Some(Uid(1000)), Some(Uid(1000)), Some(Uid(0))),
        Ok(CredStatus::Ok)
    );
    // Unprivileged now, but the saved id lets us pick 0 again
    assert_eq!(k.seteuid(Uid(0)), Ok(CredStatus::Ok));
    assert_eq!(k.geteuid(), Ok(Uid(0)));
    assert_eq!(k.getuid(), Ok(Uid(1000)));
}

// ============================================================================
// Files and directories
// ============================================================================

#[test]
fn test_unlink_rules() {
    let mut k = Kernel::new();
    k.mkdir("/home", None).unwrap();
    k.mkdir("/home/u", None).unwrap();
    k.chown("/home/u", Some(Uid(1000)), Some(Gid(1000))).unwrap();

    with_user(&mut k, 1000);
    assert_eq!(k.unlink("/home/u"), Err(Errno::IsADirectory));
    k.write_file("/home/u/notes", "todo", 0o600).unwrap();
    assert_eq!(k.getdents("/home/u").unwrap().len(), 1);

    k.unlink("/home/u/notes").unwrap();
    assert!(k.getdents("/home/u").unwrap().is_empty());
    assert_eq!(k.unlink("/home/u/notes"), Err(Errno::NoSuchEntry));
}

#[test]
fn test_open_excl_and_trunc() {
    let mut k = Kernel::new();
    let flags = OpenFlags::WRITE | OpenFlags::O_EXCL;
    let fd = k.open("/lock", flags, None).unwrap();
    k.write(fd, "pid 2").unwrap();
    k.close(fd).unwrap();

    assert_eq!(k.open("/lock", flags, None), Err(Errno::AlreadyExists));

    let fd = k.open("/lock", OpenFlags::O_WRONLY | OpenFlags::O_TRUNC, None).unwrap();
    k.close(fd).unwrap();
    assert_eq!(k.read_file("/lock").unwrap(), "");
}

#[test]
fn test_rmdir_lifecycle() {
    let mut k = Kernel::new();
    k.mkdir("/d", None).unwrap();
    k.mkdir("/d/e", None).unwrap();

    assert_eq!(k.rmdir("/d"), Err(Errno::DirectoryNotEmpty));
    assert_eq!(k.rmdir("/"), Err(Errno::NotPermitted));
    k.write_file("/d/file", "", 0o644).unwrap();
    assert_eq!(k.rmdir("/d/file"), Err(Errno::NotADirectory));

    k.rmdir("/d/e").unwrap();
    k.unlink("/d/file").unwrap();
    k.rmdir("/d").unwrap();
    assert_eq!(k.stat("/d").err(), Some(Errno::NoSuchEntry));
}

#[test]
fn test_write_seek_read() {
    let mut k = Kernel::new();
    let fd = k.open("/f", OpenFlags::RDWR | OpenFlags::O_CREAT, None).unwrap();

    assert_eq!(k.write(fd, "hello world"), Ok(11));
    assert_eq!(k.lseek(fd, -5, Whence::End), Ok(6));
    assert_eq!(k.read(fd, Some(3)).unwrap(), "wor");
    assert_eq!(k.lseek(fd, 0, Whence::Cur), Ok(9));
    assert_eq!(k.lseek(fd, 0, Whence::Set), Ok(0));
    assert_eq!(k.write(fd, "J"), Ok(1));
    assert_eq!(k.read(fd, None).unwrap(), "ello world");
    assert_eq!(k.read(fd, None).unwrap(), "");

    // Writing past the end lands at the end
    assert_eq!(k.lseek(fd, 13, Whence::Set), Ok(13));
    k.write(fd, "!").unwrap();
    k.close(fd).unwrap();
    assert_eq!(k.read_file("/f").unwrap(), "Jello world!");
    assert_eq!(k.close(fd), Err(Errno::BadDescriptor));
}

#[test]
fn test_unlinked_file_lives_until_closed() {
    let mut k = Kernel::new();
    k.write_file("/tmpfile", "still here", 0o644).unwrap();
    let nodes = k.vfs().len();

    let fd = k.open("/tmpfile", OpenFlags::READ, None).unwrap();
    k.unlink("/tmpfile").unwrap();
    assert!(!k.exists("/tmpfile"));

    assert_eq!(k.fstat(fd).unwrap().nlink, 0);
    assert_eq!(k.read(fd, None).unwrap(), "still here");
    assert_eq!(k.vfs().len(), nodes);

    k.close(fd).unwrap();
    assert_eq!(k.vfs().len(), nodes - 1);
}

#[test]
fn test_relative_paths_follow_cwd() {
    let mut k = booted();
    k.chdir("/usr/local").unwrap();
    assert_eq!(k.getcwd().unwrap(), "/usr/local");

    k.mkdir("share", None).unwrap();
    k.write_file("share/readme", "r", 0o644).unwrap();
    assert_eq!(k.read_file("/usr/local/share/readme").unwrap(), "r");

    k.chdir("..").unwrap();
    assert_eq!(k.getcwd().unwrap(), "/usr");
    assert_eq!(k.chdir("/etc/passwd"), Err(Errno::NotADirectory));
}

#[test]
fn test_umask_shapes_new_modes() {
    let mut k = Kernel::new();
    assert_eq!(k.umask(0o077), Ok(0o022));
    k.mkdir("/private", None).unwrap();
    k.append_file("/private/key", "k").unwrap();
    k.create_file("/private/pub", 0o644).unwrap();

    assert_eq!(k.mode_of("/private"), Ok(FileMode(0o700)));
    assert_eq!(k.mode_of("/private/key"), Ok(FileMode(0o600)));
    // An explicit mode bypasses the umask
    assert_eq!(k.mode_of("/private/pub"), Ok(FileMode(0o644)));
}

// ============================================================================
// Raw interface and tracing
// ============================================================================

#[test]
fn test_raw_calls() {
    let mut k = Kernel::new();

    // open("/x", O_WRONLY | O_CREAT, -1)
    let ret = k
        .syscall_raw(2, vec!["/x".into(), Arg::Int(0x41), Arg::Int(-1)])
        .unwrap();
    assert_eq!(ret, SyscallRet::Fd(Fd(3)));

    let ret = k.syscall_raw(1, vec![Arg::Int(3), "abc".into()]).unwrap();
    assert_eq!(ret.as_raw(), Some(3));

    // The descriptor is write-only
    assert_eq!(
        k.syscall_raw(0, vec![Arg::Int(3), Arg::Int(-1)]),
        Err(Errno::AccessDenied)
    );
    assert_eq!(
        k.syscall_raw(8, vec![Arg::Int(3), Arg::Int(0), Arg::Int(9)]),
        Err(Errno::InvalidArgument)
    );
    assert_eq!(k.syscall_raw(3, vec![Arg::Int(3)]).unwrap().as_raw(), Some(0));
    assert_eq!(k.syscall_raw(3, vec!["3".into()]), Err(Errno::InvalidArgument));
}

#[test]
fn test_tracing_from_json_config() {
    let config = KernelConfig::from_json(r#"{"trace": true, "trace_capacity": 4}"#).unwrap();
    let mut k = boot(&config).unwrap();
    k.set_time(7.0);

    let _ = k.unlink("/etc");
    let last = k.tracer().events().back().cloned().unwrap();
    assert_eq!(last.errno, Some(Errno::IsADirectory));
    assert_eq!(last.to_string(), "[7] pid:0 unlink(87) = -21 (EISDIR)");
    assert_eq!(k.tracer().events().len(), 4);

    let summary = k.trace_summary();
    assert!(summary.syscall_count > 4);
    assert_eq!(summary.syscall_errors, 1);
}
