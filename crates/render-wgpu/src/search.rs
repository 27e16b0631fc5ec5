use std::fmt;
use std::path::{Path, PathBuf};

pub const VERTEX_SHADER_FILE: &str = "sphere.vert.wgsl";
pub const FRAGMENT_SHADER_FILE: &str = "sphere.frag.wgsl";

/// Directories searched when none are configured, relative to the working directory.
pub const DEFAULT_SHADER_DIRS: [&str; 3] = ["shaders", "../shaders", "../../shaders"];

/// A vertex/fragment file pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderPaths {
    pub vertex: PathBuf,
    pub fragment: PathBuf,
}

impl ShaderPaths {
    pub fn new(vertex: impl Into<PathBuf>, fragment: impl Into<PathBuf>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }

    /// The standard file names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join(VERTEX_SHADER_FILE), dir.join(FRAGMENT_SHADER_FILE))
    }

    pub fn exist(&self) -> bool {
        self.vertex.is_file() && self.fragment.is_file()
    }

    fn read(&self) -> Result<(String, String), ShaderSearchError> {
        let read = |path: &Path| {
            std::fs::read_to_string(path).map_err(|source| ShaderSearchError::Read {
                path: path.to_path_buf(),
                source,
            })
        };
        Ok((read(&self.vertex)?, read(&self.fragment)?))
    }
}

impl fmt::Display for ShaderPaths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} + {}", self.vertex.display(), self.fragment.display())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ShaderSearchError {
    #[error("failed to read shader {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("fallback shader pair {paths} failed to load: {message}")]
    Rejected { paths: ShaderPaths, message: String },
}

/// Ordered shader locations plus the pair tried last.
///
/// Candidates are skipped when either file is missing or when loading them
/// fails. The fallback is always attempted and its failure is final.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSearch {
    candidates: Vec<ShaderPaths>,
    fallback: ShaderPaths,
}

impl Default for ShaderSearch {
    fn default() -> Self {
        Self::from_dirs(DEFAULT_SHADER_DIRS)
    }
}

impl ShaderSearch {
    pub fn new(candidates: Vec<ShaderPaths>, fallback: ShaderPaths) -> Self {
        Self {
            candidates,
            fallback,
        }
    }

    /// One candidate per directory; the fallback is `shaders/` in the working directory.
    pub fn from_dirs<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let candidates = dirs.into_iter().map(ShaderPaths::in_dir).collect();
        Self::new(candidates, ShaderPaths::in_dir(DEFAULT_SHADER_DIRS[0]))
    }

    pub fn candidates(&self) -> &[ShaderPaths] {
        &self.candidates
    }

    pub fn fallback(&self) -> &ShaderPaths {
        &self.fallback
    }

    /// Feed each pair's sources to `load` until one succeeds.
    pub fn resolve<T, E, F>(&self, mut load: F) -> Result<(ShaderPaths, T), ShaderSearchError>
    where
        E: fmt::Display,
        F: FnMut(&str, &str) -> Result<T, E>,
    {
        for paths in &self.candidates {
            if !paths.exist() {
                tracing::debug!(%paths, "shader candidate not found");
                continue;
            }
            let (vertex, fragment) = match paths.read() {
                Ok(sources) => sources,
                Err(err) => {
                    tracing::warn!("{err}");
                    continue;
                }
            };
            match load(&vertex, &fragment) {
                Ok(loaded) => {
                    tracing::info!(%paths, "loaded shaders");
                    return Ok((paths.clone(), loaded));
                }
                Err(err) => tracing::warn!(%paths, "shader candidate rejected: {err}"),
            }
        }

        tracing::warn!(fallback = %self.fallback, "no shader candidate loaded, trying fallback");
        let (vertex, fragment) = self.fallback.read()?;
        match load(&vertex, &fragment) {
            Ok(loaded) => Ok((self.fallback.clone(), loaded)),
            Err(err) => Err(ShaderSearchError::Rejected {
                paths: self.fallback.clone(),
                message: err.to_string(),
            }),
        }
    }
}
