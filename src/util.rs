//! Small filesystem helpers shared by the installers

use std::fs;
use std::io;
use std::path::Path;

/// `mkdir -p` with mode 0755 for every created directory
pub fn create_dir_0755(path: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder.create(path)
}

/// Set permission bits exactly (no umask)
#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777))
}

#[cfg(not(unix))]
pub fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

/// Copy `src` to `dst` as a regular file with the given mode
pub fn copy_file(src: &Path, dst: &Path, mode: u32) -> io::Result<()> {
    let data = fs::read(src)?;
    fs::write(dst, data)?;
    set_mode(dst, mode)
}
