// ============================================================================
// src/store/atomic.rs – durable, permissioned atomic writes of store documents
// ============================================================================

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

fn io_error(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::Other, msg)
}

/// Parent directory of `path`, `.` for bare file names.
fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Fsync a directory so the rename itself is persisted.
fn fsync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

/// Reject writes if target is a symlink.
fn reject_symlink_target(path: &Path) -> io::Result<()> {
    if let Ok(meta) = fs::symlink_metadata(path) {
        if meta.file_type().is_symlink() {
            return Err(io_error(format!(
                "refusing to write to symlink: {}",
                path.display()
            )));
        }
    }
    Ok(())
}

/// Write `bytes` to a temp file beside `path`, fsync, rename into place, then
/// fsync the parent directory. The file gets exactly `mode` (umask ignored).
pub fn atomic_write_bytes(path: &Path, bytes: &[u8], mode: u32) -> io::Result<()> {
    reject_symlink_target(path)?;

    let dir = parent_dir(path);
    if !dir.exists() {
        fs::create_dir_all(&dir)?;
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| io_error(format!("target has no file name: {}", path.display())))?
        .to_string_lossy()
        .into_owned();

    let mut tmp = dir.join(format!("{file_name}.tmp"));
    for _ in 0..8 {
        tmp.set_file_name(format!("{}.tmp-{}", file_name, nanoid::nanoid!(8)));
        if !tmp.exists() {
            break;
        }
    }

    let mut f = OpenOptions::new()
        .create_new(true)
        .write(true)
        .mode(mode)
        .open(&tmp)?;

    let written = f.write_all(bytes).and_then(|_| f.sync_all());
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    drop(f);

    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    fsync_dir(&dir)?;

    Ok(())
}
