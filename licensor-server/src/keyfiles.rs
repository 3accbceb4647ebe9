//! Writing a freshly generated key set to disk.
//!
//! `private_key.pem` and `aes_key.bin` are created owner-only (0600) on Unix;
//! `public_key.pem` gets the process umask.

use licensor_crypto::{CryptoError, SigningKey, SymmetricKey};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const PRIVATE_KEY_FILE: &str = "private_key.pem";
pub const PUBLIC_KEY_FILE: &str = "public_key.pem";
pub const AES_KEY_FILE: &str = "aes_key.bin";

#[derive(Debug, Error)]
pub enum KeyFileError {
    #[error("{0} already exists (use --force to overwrite)")]
    Exists(PathBuf),

    #[error("key file I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Paths of the three key files inside one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyFiles {
    pub private_key: PathBuf,
    pub public_key: PathBuf,
    pub aes_key: PathBuf,
}

impl KeyFiles {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            private_key: dir.join(PRIVATE_KEY_FILE),
            public_key: dir.join(PUBLIC_KEY_FILE),
            aes_key: dir.join(AES_KEY_FILE),
        }
    }

    fn all(&self) -> [&Path; 3] {
        [&self.private_key, &self.public_key, &self.aes_key]
    }
}

/// Writes the key set into `out_dir`, creating it if needed.
///
/// Without `force`, nothing is written if any of the files already exists.
pub fn write_key_files(
    out_dir: &Path,
    signing_key: &SigningKey,
    symmetric_key: &SymmetricKey,
    force: bool,
) -> Result<KeyFiles, KeyFileError> {
    let files = KeyFiles::in_dir(out_dir);
    if !force {
        if let Some(existing) = files.all().into_iter().find(|p| p.exists()) {
            return Err(KeyFileError::Exists(existing.to_path_buf()));
        }
    }

    fs::create_dir_all(out_dir)?;
    write_secret(&files.private_key, signing_key.to_pem()?.as_bytes())?;
    fs::write(&files.public_key, signing_key.verification_key().to_pem()?)?;
    write_secret(&files.aes_key, symmetric_key.as_bytes())?;
    Ok(files)
}

fn write_secret(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;

    // `mode` only applies on creation; tighten files being overwritten too.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(contents)?;
    file.sync_all()
}
