use std::process::Command;

/// An external conversion toolchain the pipeline shells out to.
#[derive(Debug, Clone, Copy)]
pub struct Toolchain {
    pub name: &'static str,
    probe: &'static [&'static str],
    pub install: &'static str,
}

/// Everything the full pipeline may need, covering both the native-export
/// and the interchange conversion routes. Checked up front; nothing runs
/// if any of these are absent.
pub const REQUIRED_TOOLCHAINS: [Toolchain; 3] = [
    Toolchain {
        name: "yolo",
        probe: &["version"],
        install: "pip install ultralytics",
    },
    Toolchain {
        name: "onnx2tf",
        probe: &["-V"],
        install: "pip install onnx2tf",
    },
    Toolchain {
        name: "tflite_convert",
        probe: &["--help"],
        install: "pip install tensorflow",
    },
];

impl Toolchain {
    pub fn is_available(&self) -> bool {
        Command::new(self.name)
            .args(self.probe)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    pub fn find(name: &str) -> Option<&'static Toolchain> {
        REQUIRED_TOOLCHAINS.iter().find(|t| t.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct ToolchainStatus {
    pub name: &'static str,
    pub present: bool,
    pub install: &'static str,
}

/// Probes every required toolchain. Never attempts installation.
pub fn check_all() -> Vec<ToolchainStatus> {
    REQUIRED_TOOLCHAINS
        .iter()
        .map(|t| ToolchainStatus {
            name: t.name,
            present: t.is_available(),
            install: t.install,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_known_toolchains() {
        assert_eq!(Toolchain::find("onnx2tf").unwrap().install, "pip install onnx2tf");
        assert_eq!(Toolchain::find("yolo").unwrap().install, "pip install ultralytics");
        assert!(Toolchain::find("gcc").is_none());
    }

    #[test]
    fn test_absent_tool_reports_unavailable() {
        let bogus = Toolchain {
            name: "chessprep-no-such-tool",
            probe: &["--version"],
            install: "n/a",
        };
        assert!(!bogus.is_available());
    }

    #[test]
    fn test_check_all_covers_every_toolchain() {
        let statuses = check_all();
        assert_eq!(statuses.len(), REQUIRED_TOOLCHAINS.len());
        for (status, tool) in statuses.iter().zip(REQUIRED_TOOLCHAINS.iter()) {
            assert_eq!(status.name, tool.name);
        }
    }
}
