//! Secure volume deletion used by the truncate path.

use std::fs::{self, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;
use tapevault_common::{Result, VaultError};
use tracing::debug;

/// Erases the contents of a single file before it is unlinked.
///
/// Injected into [`delete_volume`] so the erasure strategy stays a
/// testable collaborator rather than a hard-wired filesystem call.
pub trait SecureEraser {
    fn erase(&self, path: &Path) -> Result<()>;
}

/// Overwrites the file with zeroes, syncs, then unlinks it.
#[derive(Debug, Default)]
pub struct ZeroFillEraser;

const FILL_CHUNK: usize = 64 * 1024;

impl SecureEraser for ZeroFillEraser {
    fn erase(&self, path: &Path) -> Result<()> {
        let mut file = OpenOptions::new().write(true).open(path)?;
        let len = file.metadata()?.len();

        file.seek(SeekFrom::Start(0))?;
        let zeroes = vec![0u8; FILL_CHUNK];
        let mut remaining = len;
        while remaining > 0 {
            let n = remaining.min(FILL_CHUNK as u64) as usize;
            file.write_all(&zeroes[..n])?;
            remaining -= n as u64;
        }
        file.sync_all()?;
        drop(file);

        fs::remove_file(path)?;
        Ok(())
    }
}

/// Securely deletes a volume directory: every file inside is erased
/// through `eraser`, then the directory itself is removed.
///
/// A volume directory is flat. Finding a subdirectory means the path
/// does not belong to us, and the deletion is abandoned with the
/// directory left as it stands.
pub fn delete_volume(path: &Path, eraser: &dyn SecureEraser) -> Result<()> {
    let mut files = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            return Err(VaultError::NestedDirectory { path: entry.path() });
        }
        files.push(entry.path());
    }

    for file in &files {
        debug!(file = %file.display(), "erasing volume file");
        eraser.erase(file)?;
    }

    fs::remove_dir(path)?;
    Ok(())
}
