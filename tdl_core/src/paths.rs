//! Directory helpers shared by the logger and the client's startup code.

use std::fs;
use std::io;
use std::path::Path;

/// Mode for directories created by the downloader (owner rwx, group/other rx).
pub const DIR_PERMISSIONS: u32 = 0o755;

/// Recursively creates `path` with [`DIR_PERMISSIONS`].
///
/// Succeeds if the directory already exists. Fails with
/// `io::ErrorKind::AlreadyExists` if `path` exists but is not a directory.
pub fn create_dir_all(path: &Path) -> io::Result<()> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => return Ok(()),
        Ok(_) => {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "Path exists but is not a directory",
            ));
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIR_PERMISSIONS);
    }
    builder.create(path)
}
