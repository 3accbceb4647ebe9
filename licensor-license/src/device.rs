//! Device fingerprinting for license binding.
//!
//! The device id is the hex SHA-256 of `hostname || os || arch || $USER ||
//! $USERNAME`. It stays stable for a given machine, user and OS, and is the
//! value a license's `device_id` must equal.
//!
//! `os` and `arch` use the GOOS/GOARCH spelling (`darwin`, `amd64`, `arm64`)
//! rather than Rust's `std::env::consts` names, so a machine gets the same id
//! from this crate as from license tooling built with Go.

use crate::error::{LicenseError, LicenseResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::env;

/// Information about the current device, for display next to its id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Operating system name.
    pub os_name: String,
    /// Operating system version.
    pub os_version: String,
    /// Hostname.
    pub hostname: String,
    /// CPU architecture.
    pub arch: String,
}

impl DeviceInfo {
    /// Collects information about the current device.
    ///
    /// # Errors
    /// [`LicenseError::DeviceIdUnavailable`] if the hostname cannot be read.
    pub fn collect() -> LicenseResult<Self> {
        Ok(Self {
            os_name: env::consts::OS.to_string(),
            os_version: get_os_version(),
            hostname: get_hostname()?,
            arch: env::consts::ARCH.to_string(),
        })
    }
}

/// A derived device id together with when it was derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFingerprint {
    /// Hex SHA-256 of the identity components.
    id: String,
    /// When the fingerprint was generated.
    generated_at: chrono::DateTime<chrono::Utc>,
}

impl DeviceFingerprint {
    /// Generates a fingerprint for the current device.
    pub fn generate() -> LicenseResult<Self> {
        Ok(Self {
            id: derive_device_id()?,
            generated_at: chrono::Utc::now(),
        })
    }

    /// Returns the fingerprint ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns when this fingerprint was generated.
    #[must_use]
    pub fn generated_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.generated_at
    }

    /// Validates that this fingerprint matches the current device.
    #[must_use]
    pub fn matches_current(&self) -> bool {
        derive_device_id().is_ok_and(|id| id == self.id)
    }
}

/// Derives the device id for the current machine and user.
///
/// No fallback is synthesized: if the hostname is unreadable, there is no id.
///
/// # Errors
/// [`LicenseError::DeviceIdUnavailable`] if the hostname cannot be read.
pub fn derive_device_id() -> LicenseResult<String> {
    let user = env::var("USER").unwrap_or_default();
    let username = env::var("USERNAME").unwrap_or_default();
    Ok(device_id_from_parts(
        &get_hostname()?,
        canonical_os(env::consts::OS),
        canonical_arch(env::consts::ARCH),
        &user,
        &username,
    ))
}

/// Maps a Rust OS name to its GOOS spelling.
#[must_use]
pub fn canonical_os(os: &str) -> &str {
    match os {
        "macos" => "darwin",
        other => other,
    }
}

/// Maps a Rust architecture name to its GOARCH spelling.
#[must_use]
pub fn canonical_arch(arch: &str) -> &str {
    match arch {
        "x86_64" => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        "powerpc64" => "ppc64",
        "loongarch64" => "loong64",
        other => other,
    }
}

/// Hashes already-collected identity components.
#[must_use]
pub fn device_id_from_parts(
    hostname: &str,
    os: &str,
    arch: &str,
    user: &str,
    username: &str,
) -> String {
    let mut hasher = Sha256::new();
    for part in [hostname, os, arch, user, username] {
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Gets the machine hostname.
fn get_hostname() -> LicenseResult<String> {
    let name = hostname::get().map_err(|e| LicenseError::DeviceIdUnavailable(e.to_string()))?;
    name.into_string()
        .map_err(|_| LicenseError::DeviceIdUnavailable("hostname is not valid UTF-8".to_string()))
}

/// Gets the OS version string.
fn get_os_version() -> String {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("sw_vers")
            .arg("-productVersion")
            .output()
            .ok()
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/etc/os-release")
            .ok()
            .and_then(|content| {
                content
                    .lines()
                    .find(|l| l.starts_with("VERSION_ID="))
                    .map(|l| {
                        l.trim_start_matches("VERSION_ID=")
                            .trim_matches('"')
                            .to_string()
                    })
            })
            .unwrap_or_else(|| "unknown".to_string())
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        "unknown".to_string()
    }
}
