//! Host platform identification.
//!
//! Used by release asset scoring and by strategies that need
//! platform-specific layouts (e.g. `Scripts\pip.exe` on Windows).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform identifier combining OS and architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    /// Operating system.
    pub os: Os,
    /// CPU architecture.
    pub arch: Arch,
}

impl Platform {
    /// Create a new platform.
    #[must_use]
    pub const fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Get the current platform.
    #[must_use]
    pub fn current() -> Self {
        Self {
            os: Os::current(),
            arch: Arch::current(),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

/// Operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    /// Microsoft Windows.
    Windows,
    /// macOS.
    Darwin,
    /// Linux.
    Linux,
    /// Anything else; never matches a release asset.
    Other,
}

impl Os {
    /// Get the current OS.
    #[must_use]
    pub fn current() -> Self {
        Self::parse(std::env::consts::OS).unwrap_or(Self::Other)
    }

    /// Parse from string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "windows" | "win" => Some(Self::Windows),
            "darwin" | "macos" | "osx" => Some(Self::Darwin),
            "linux" => Some(Self::Linux),
            _ => None,
        }
    }

    /// Lowercase substrings that identify this OS in asset names.
    #[must_use]
    pub const fn markers(self) -> &'static [&'static str] {
        match self {
            Self::Windows => &["win", "windows", "mingw"],
            Self::Darwin => &["osx", "darwin", "mac"],
            Self::Linux => &["linux"],
            Self::Other => &[],
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Windows => write!(f, "windows"),
            Self::Darwin => write!(f, "darwin"),
            Self::Linux => write!(f, "linux"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    /// 64-bit ARM.
    Arm64,
    /// 64-bit x86.
    X86_64,
    /// Anything else; never matches a release asset.
    Other,
}

impl Arch {
    /// Get the current architecture.
    #[must_use]
    pub fn current() -> Self {
        Self::parse(std::env::consts::ARCH).unwrap_or(Self::Other)
    }

    /// Parse from string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "arm64" | "aarch64" => Some(Self::Arm64),
            "x86_64" | "amd64" | "x64" => Some(Self::X86_64),
            _ => None,
        }
    }

    /// Lowercase substrings that identify this architecture in asset names.
    #[must_use]
    pub const fn markers(self) -> &'static [&'static str] {
        match self {
            Self::X86_64 => &["x64", "x86_64", "amd64"],
            Self::Arm64 => &["arm64", "aarch64"],
            Self::Other => &[],
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Arm64 => write!(f, "arm64"),
            Self::X86_64 => write!(f, "x86_64"),
            Self::Other => write!(f, "other"),
        }
    }
}
