//! Project-relative path handling for `file://` URIs.

use crate::error::{IndexError, Result};
use std::path::{Component, Path, PathBuf};
use url::Url;

/// Absolute path for a `file://` URI, percent-decoded.
pub fn path_for_file_uri(uri: &str) -> Result<PathBuf> {
    let url = Url::parse(uri).map_err(|err| IndexError::invalid_uri(format!("{uri}: {err}")))?;
    if url.scheme() != "file" {
        return Err(IndexError::invalid_uri(format!("{uri}: not a file URI")));
    }
    url.to_file_path()
        .map_err(|()| IndexError::invalid_uri(format!("{uri}: no local path")))
}

/// `file://` URI for an absolute path
pub fn file_uri_for_path(path: &Path) -> Result<String> {
    Url::from_file_path(path)
        .map(String::from)
        .map_err(|()| IndexError::invalid_uri(format!("{}: path is not absolute", path.display())))
}

/// Resolves index URIs against a project root.
///
/// Purely lexical: paths are normalized (`.` and `..` removed) but never
/// canonicalized against the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathManager {
    project_root: PathBuf,
}

impl PathManager {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            project_root: normalize(project_root.as_ref()),
        }
    }

    #[must_use]
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    #[must_use]
    pub fn is_within_project(&self, path: &Path) -> bool {
        normalize(path).starts_with(&self.project_root)
    }

    /// Whether a `file://` URI points inside the project. Non-file URIs
    /// never do.
    #[must_use]
    pub fn is_uri_within_project(&self, uri: &str) -> bool {
        path_for_file_uri(uri).is_ok_and(|path| self.is_within_project(&path))
    }

    /// Project-relative path for a URI. URIs that are not `file://` come
    /// back unchanged, files outside the project come back absolute.
    #[must_use]
    pub fn uri_to_relative_path(&self, uri: &str) -> String {
        let Ok(path) = path_for_file_uri(uri) else {
            return uri.to_string();
        };
        let path = normalize(&path);
        match path.strip_prefix(&self.project_root) {
            Ok(relative) => relative.to_string_lossy().into_owned(),
            Err(_) => path.to_string_lossy().into_owned(),
        }
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Translation-unit role of a file, decided by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFileKind {
    CSource,
    CppSource,
    /// C++20 module interface unit
    CppModule,
    Header,
    Other,
}

const CPP_SOURCE_EXTENSIONS: &[&str] = &["cpp", "cc", "cxx"];
const CPP_MODULE_EXTENSIONS: &[&str] = &["cppm", "ccm", "cxxm", "c++m"];
const HEADER_EXTENSIONS: &[&str] = &["h", "hpp", "hh", "hxx", "h++"];

impl SourceFileKind {
    pub fn from_path(path: &Path) -> Self {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return Self::Other;
        };
        let ext = ext.to_ascii_lowercase();
        if ext == "c" {
            Self::CSource
        } else if CPP_SOURCE_EXTENSIONS.contains(&ext.as_str()) {
            Self::CppSource
        } else if CPP_MODULE_EXTENSIONS.contains(&ext.as_str()) {
            Self::CppModule
        } else if HEADER_EXTENSIONS.contains(&ext.as_str()) {
            Self::Header
        } else {
            Self::Other
        }
    }

    /// Compiled on its own as a translation unit
    #[must_use]
    pub const fn is_translation_unit(self) -> bool {
        matches!(self, Self::CSource | Self::CppSource | Self::CppModule)
    }

    #[must_use]
    pub const fn is_header(self) -> bool {
        matches!(self, Self::Header)
    }
}
