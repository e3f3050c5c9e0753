use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use log::{debug, error, warn};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::ImageFormat;

/// A class of files recognised by name patterns
pub trait Matcher {
    /// Short name of the class, for logging
    fn name(&self) -> &str;

    /// Glob patterns matched against file names
    fn patterns(&self) -> Vec<String>;
}

/// Matches typical image files of one format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMatch {
    format: ImageFormat,
    patterns: Vec<String>,
}

impl ImageMatch {
    /// Matcher with custom patterns
    pub fn new(format: ImageFormat, patterns: Vec<String>) -> Self {
        Self { format, patterns }
    }

    /// Matcher with the usual extensions for `format`
    pub fn for_format(format: ImageFormat) -> Self {
        let patterns = format
            .default_patterns()
            .iter()
            .map(|p| p.to_string())
            .collect();
        Self::new(format, patterns)
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }
}

impl Matcher for ImageMatch {
    fn name(&self) -> &str {
        self.format.name()
    }

    fn patterns(&self) -> Vec<String> {
        self.patterns.clone()
    }
}

/// Matchers for every format enabled in the configuration
pub fn matchers_for(config: &Config) -> Vec<ImageMatch> {
    config
        .formats
        .iter()
        .copied()
        .map(ImageMatch::for_format)
        .collect()
}

/// Compile matcher patterns into a single case-insensitive set
fn build_globs<M: Matcher>(matchers: &[M]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for matcher in matchers {
        for pattern in matcher.patterns() {
            debug!("matcher {} uses pattern {}", matcher.name(), pattern);
            builder.add(
                GlobBuilder::new(&pattern)
                    .case_insensitive(true)
                    .literal_separator(true)
                    .build()?,
            );
        }
    }
    Ok(builder.build()?)
}

/// A lazy recursive walk over one root that yields matching file paths
pub struct Discovery {
    entries: walkdir::IntoIter,
    globs: GlobSet,
}

impl Discovery {
    /// Prepare a walk of `root`; nothing is read until iteration starts
    pub fn new<M: Matcher>(root: &Path, matchers: &[M], config: &Config) -> Result<Self> {
        if !root.exists() {
            return Err(Error::FileNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(Error::NotADirectory(root.to_path_buf()));
        }

        let mut walker = WalkDir::new(root).follow_links(config.follow_links);
        if let Some(depth) = config.max_depth {
            walker = walker.max_depth(depth);
        }

        Ok(Self {
            entries: walker.into_iter(),
            globs: build_globs(matchers)?,
        })
    }
}

impl Iterator for Discovery {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            match self.entries.next()? {
                Ok(entry) => {
                    if entry.file_type().is_file() && self.globs.is_match(entry.file_name()) {
                        debug!("path matched: {}", entry.path().display());
                        return Some(entry.into_path());
                    }
                }
                Err(e) => {
                    // Log error but continue with other entries
                    warn!("Error walking directory: {}", e);
                }
            }
        }
    }
}

/// Lazily discover candidate files under several roots.
///
/// Roots that cannot be walked are logged and skipped.
pub fn discover<'a, P: AsRef<Path>>(
    roots: &'a [P],
    config: &'a Config,
) -> Result<impl Iterator<Item = PathBuf> + 'a> {
    let matchers = matchers_for(config);
    // Fail early on bad patterns rather than once per root
    build_globs(&matchers)?;

    Ok(roots.iter().flat_map(move |root| {
        let root = root.as_ref();
        let discovery = match Discovery::new(root, &matchers, config) {
            Ok(discovery) => Some(discovery),
            Err(e) => {
                error!("Skipping {}: {}", root.display(), e);
                None
            }
        };
        discovery.into_iter().flatten()
    }))
}

// -- Tests --
