// 📁 Transient upload storage
// Save-by-name / delete-by-name, with a guard that always cleans up

use log::{debug, warn};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Directory holding uploads for the duration of one analysis
#[derive(Debug, Clone)]
pub struct UploadDir {
    root: PathBuf,
}

impl UploadDir {
    /// Open (and create if missing) an upload directory
    pub fn create<P: AsRef<Path>>(root: P) -> io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(UploadDir { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Save bytes under a fresh name derived from the client filename
    ///
    /// The client name is never used as a path; only its extension is kept.
    pub fn save(&self, original_name: &str, bytes: &[u8]) -> io::Result<TransientFile> {
        self.save_from(original_name, bytes)
    }

    /// Stream an upload to disk; a write that fails partway leaves nothing behind
    pub fn save_from<R: Read>(&self, original_name: &str, mut reader: R) -> io::Result<TransientFile> {
        let extension = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin")
            .to_lowercase();
        let name = format!("{}.{}", Uuid::new_v4(), extension);

        // Guard owns the path before the first byte is written
        let file = TransientFile { path: self.path_for(&name) };
        let mut out = File::create(file.path())?;
        io::copy(&mut reader, &mut out)?;
        out.sync_all()?;
        debug!("Saved upload {:?} as {}", original_name, file.path().display());

        Ok(file)
    }

    pub fn delete(&self, name: &str) -> io::Result<()> {
        fs::remove_file(self.path_for(name))
    }

    /// Number of files currently held
    pub fn len(&self) -> io::Result<usize> {
        Ok(fs::read_dir(&self.root)?.count())
    }

    pub fn is_empty(&self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// A saved upload that is removed when dropped
///
/// Dropping covers every exit path: success, `?` propagation, and unwinding.
#[derive(Debug)]
pub struct TransientFile {
    path: PathBuf,
}

impl TransientFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TransientFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed transient file {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove transient file {}: {}", self.path.display(), e),
        }
    }
}
