//! On-disk layout of a working directory.

use crate::tool::ToolName;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Directory holding tool checkouts.
pub const TOOLS_DIR: &str = "osintmaster_tools";
/// Directory holding reports.
pub const RESULTS_DIR: &str = "osintmaster_results";
/// Python virtual environment directory.
pub const VENV_DIR: &str = "venv";
/// JSON report file name.
pub const REPORT_FILE: &str = "osint_results.json";
/// CSV report file name.
pub const CSV_REPORT_FILE: &str = "osint_results.csv";

/// Paths derived from a base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    base: PathBuf,
}

impl Layout {
    /// Layout rooted at `base`.
    pub fn new(base: impl AsRef<Path>) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
        }
    }

    /// Base directory.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Default config file location.
    pub fn config_path(&self) -> PathBuf {
        self.base.join("config.json")
    }

    /// Parent of all tool checkouts.
    pub fn tools_dir(&self) -> PathBuf {
        self.base.join(TOOLS_DIR)
    }

    /// Checkout directory of one tool.
    pub fn tool_dir(&self, tool: ToolName) -> PathBuf {
        self.tools_dir().join(tool.as_str())
    }

    /// Report directory.
    pub fn results_dir(&self) -> PathBuf {
        self.base.join(RESULTS_DIR)
    }

    /// JSON report path.
    pub fn report_path(&self) -> PathBuf {
        self.results_dir().join(REPORT_FILE)
    }

    /// CSV report path.
    pub fn csv_report_path(&self) -> PathBuf {
        self.results_dir().join(CSV_REPORT_FILE)
    }

    /// Virtual environment root.
    pub fn venv_dir(&self) -> PathBuf {
        self.base.join(VENV_DIR)
    }

    /// Virtual environment executables directory.
    pub fn venv_bin(&self) -> PathBuf {
        if cfg!(windows) {
            self.venv_dir().join("Scripts")
        } else {
            self.venv_dir().join("bin")
        }
    }

    /// Interpreter inside the virtual environment.
    pub fn venv_python(&self) -> PathBuf {
        self.venv_bin().join(exe("python"))
    }

    /// pip inside the virtual environment.
    pub fn venv_pip(&self) -> PathBuf {
        self.venv_bin().join(exe("pip"))
    }

    /// Environment that activates the virtual environment for a child
    /// process.
    ///
    /// `inherited_path` is the caller's `PATH`; it is prefixed, never
    /// modified in place.
    pub fn venv_env(&self, inherited_path: Option<&str>) -> HashMap<String, String> {
        let bin = self.venv_bin().display().to_string();
        let path = match inherited_path.filter(|p| !p.is_empty()) {
            Some(rest) => format!("{}{}{}", bin, path_separator(), rest),
            None => bin,
        };

        let mut env = HashMap::new();
        env.insert("VIRTUAL_ENV".to_string(), self.venv_dir().display().to_string());
        env.insert("PATH".to_string(), path);
        env
    }
}

fn exe(name: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", name)
    } else {
        name.to_string()
    }
}

fn path_separator() -> char {
    if cfg!(windows) {
        ';'
    } else {
        ':'
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let layout = Layout::new("/srv/osint");
        assert_eq!(layout.tool_dir(ToolName::Sherlock), Path::new("/srv/osint/osintmaster_tools/sherlock"));
        assert_eq!(layout.report_path(), Path::new("/srv/osint/osintmaster_results/osint_results.json"));
        assert_eq!(layout.config_path(), Path::new("/srv/osint/config.json"));
    }

    #[cfg(unix)]
    #[test]
    fn test_venv_env_prefixes_path() {
        let layout = Layout::new("/srv/osint");
        let env = layout.venv_env(Some("/usr/bin:/bin"));
        assert_eq!(env["VIRTUAL_ENV"], "/srv/osint/venv");
        assert_eq!(env["PATH"], "/srv/osint/venv/bin:/usr/bin:/bin");

        let env = layout.venv_env(None);
        assert_eq!(env["PATH"], "/srv/osint/venv/bin");
    }
}
