//! Shared test infrastructure for integration tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A throwaway run root holding target files and a manifest.
pub struct Sandbox {
    dir: TempDir,
}

#[allow(dead_code, clippy::new_without_default)]
impl Sandbox {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create sandbox dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, name: &str, contents: &str) {
        fs::write(self.dir.path().join(name), contents).expect("write sandbox file");
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.dir.path().join(name)).expect("read sandbox file")
    }

    /// Write a manifest into the sandbox and return its path.
    pub fn manifest(&self, json: &str) -> PathBuf {
        let path = self.dir.path().join("manifest.json");
        fs::write(&path, json).expect("write manifest");
        path
    }

    /// Run dotpatch against this sandbox's root.
    pub fn run(&self, subcommand: &str, manifest: &Path, extra: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_dotpatch"))
            .arg(subcommand)
            .arg("--config")
            .arg(manifest)
            .arg("--root")
            .arg(self.dir.path())
            .args(extra)
            .output()
            .expect("run dotpatch")
    }
}

#[allow(dead_code)]
pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[allow(dead_code)]
pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
