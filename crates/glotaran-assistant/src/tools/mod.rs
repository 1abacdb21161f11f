//! # Tool Functions
//!
//! Stateless request/response operations the agents may ask the proxy
//! executor to run. Relative paths resolve against a [`Workspace`] root.

mod fs;
mod generate;
mod notebook;
mod retrieve;

use std::path::{Path, PathBuf};

pub use fs::ReadFileTool;
pub use generate::GenerateFilesTool;
pub use notebook::{CreateNotebookTool, ReadNotebookTool, create_empty_notebook, read_notebook_content};
pub use retrieve::RetrieveContentTool;

pub const READ_FILE: &str = "read_file";
pub const READ_NOTEBOOK: &str = "read_notebook_content";
pub const GENERATE_FILES: &str = "generate_model_parameter_data_files";
pub const CREATE_NOTEBOOK: &str = "create_empty_notebook";
pub const RETRIEVE_CONTENT: &str = "retrieve_content";

/// Directory that tool paths are relative to
#[derive(Clone, Debug)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute paths pass through; relative ones join the root
    pub fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path.trim());
        if path.is_absolute() { path.to_path_buf() } else { self.root.join(path) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve() {
        let workspace = Workspace::new("/work");
        assert_eq!(workspace.resolve("a/b.txt"), PathBuf::from("/work/a/b.txt"));
        assert_eq!(workspace.resolve(" /etc/hosts "), PathBuf::from("/etc/hosts"));
    }
}
