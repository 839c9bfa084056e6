//! Host operating system and architecture detection.

use once_cell::sync::Lazy;
use sysinfo::System;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OS {
    Windows,
    Macos,
    Linux,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X86,
    X86_64,
    ARM,
    ARM64,
    Unknown,
}

impl From<&str> for Arch {
    fn from(s: &str) -> Self {
        match s {
            "i386" | "i686" | "x86" => Arch::X86,
            "x86_64" | "amd64" => Arch::X86_64,
            "arm" | "armv7l" => Arch::ARM,
            "aarch64" | "arm64" => Arch::ARM64,
            _ => Arch::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    pub os: OS,
    pub arch: Arch,
}

static HOST: Lazy<Host> = Lazy::new(Host::detect);

impl Host {
    fn detect() -> Self {
        let os = if cfg!(target_os = "windows") {
            OS::Windows
        } else if cfg!(target_os = "macos") {
            OS::Macos
        } else if cfg!(target_os = "linux") {
            OS::Linux
        } else {
            OS::Unknown
        };

        let arch = Arch::from(System::cpu_arch().as_str());
        Self { os, arch }
    }
}

pub fn host() -> &'static Host {
    &HOST
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arch_from_str() {
        assert_eq!(Arch::from("x86_64"), Arch::X86_64);
        assert_eq!(Arch::from("arm64"), Arch::ARM64);
        assert_eq!(Arch::from("aarch64"), Arch::ARM64);
        assert_eq!(Arch::from("mips"), Arch::Unknown);
    }

    #[test]
    fn test_host_os_matches_target() {
        let host = host();
        #[cfg(target_os = "linux")]
        assert_eq!(host.os, OS::Linux);
        #[cfg(target_os = "macos")]
        assert_eq!(host.os, OS::Macos);
        assert!(std::ptr::eq(host, super::host()));
    }
}
