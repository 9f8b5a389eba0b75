//! File-system capability used for texture lookup and the save protocol.

use std::{fs, io, path::Path};

/// The file operations the model codec needs besides reading and writing the
/// model itself.
pub trait FileSystem {
    fn exists(&self, path: &Path) -> bool;

    fn file_size(&self, path: &Path) -> io::Result<u64>;

    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Moves `from` to `to`, replacing `to` if the platform allows it.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
}

/// [`FileSystem`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

pub(crate) static LOCAL_FILE_SYSTEM: LocalFileSystem = LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn file_size(&self, path: &Path) -> io::Result<u64> {
        Ok(fs::metadata(path)?.len())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_file_system_round_trip() {
        let dir = std::env::temp_dir().join(format!("g3d_ngin_fs_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let from = dir.join("a.bin");
        let to = dir.join("b.bin");
        fs::write(&from, [1u8, 2, 3]).unwrap();

        let local = LocalFileSystem;
        assert!(local.exists(&from));
        assert!(!local.exists(&dir));
        assert_eq!(local.file_size(&from).unwrap(), 3);
        local.rename(&from, &to).unwrap();
        assert!(!local.exists(&from));
        local.remove_file(&to).unwrap();
        assert!(!local.exists(&to));

        fs::remove_dir_all(&dir).unwrap();
    }
}
