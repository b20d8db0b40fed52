//! Module import simulation over a resolution context.
//!
//! Mirrors the plugin host runtime's lookup order: the module cache is
//! consulted before the search path for every dotted prefix, roots are
//! tried in order, and the first root that supplies a name owns every
//! deeper segment. A regular package found early therefore shadows a more
//! complete package on a later root, and a miss below it does not fall
//! back. Every resolved prefix is registered in the cache, including the
//! packages above a failing segment, which is what makes the shadowing
//! sticky after the search path changes.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::context::{LoadedModule, ResolutionContext, SearchPriority};
use crate::error::ImportError;

/// Module source file extension used by the host's plugin payloads.
const SOURCE_EXT: &str = "py";

/// Package marker file within a package directory.
const PACKAGE_INIT: &str = "__init__.py";

/// Outcome of a successful import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// The module satisfying the request.
    pub module: LoadedModule,
    /// False when the full name was already in the cache.
    pub fresh: bool,
}

/// Classification buckets for a probe's single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutcomeClass {
    /// The import resolved a module.
    Success,
    /// A resolution or import failure the harness exists to observe.
    ExpectedFailure,
    /// Anything else; handled by the probe driver, never raised.
    UnexpectedFailure,
}

impl OutcomeClass {
    /// Classify an import attempt. Import errors are always the expected
    /// class; unexpected failures do not travel through this `Result` at
    /// all, they escape as `ProbeError`.
    pub fn of_import(result: &Result<Import, ImportError>) -> Self {
        match result {
            Ok(_) => OutcomeClass::Success,
            Err(_) => OutcomeClass::ExpectedFailure,
        }
    }
}

impl fmt::Display for OutcomeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeClass::Success => write!(f, "success"),
            OutcomeClass::ExpectedFailure => write!(f, "expected-failure"),
            OutcomeClass::UnexpectedFailure => write!(f, "unexpected-failure"),
        }
    }
}

/// What one directory level yielded for one name segment.
enum Located {
    File { file: PathBuf },
    Package { init: PathBuf, dir: PathBuf },
}

impl Located {
    fn into_module(self, name: String, search_root: &Path, pid: u32) -> LoadedModule {
        match self {
            Located::File { file } => LoadedModule {
                name,
                file,
                package_dir: None,
                search_root: search_root.to_path_buf(),
                loaded_by: pid,
            },
            Located::Package { init, dir } => LoadedModule {
                name,
                file: init,
                package_dir: Some(dir),
                search_root: search_root.to_path_buf(),
                loaded_by: pid,
            },
        }
    }
}

/// Look for `segment` directly inside `dir`. Packages win over plain
/// modules; a directory without the package init file does not match.
fn locate_in_dir(dir: &Path, segment: &str) -> Option<Located> {
    let package = dir.join(segment);
    let init = package.join(PACKAGE_INIT);
    if init.is_file() {
        return Some(Located::Package { init, dir: package });
    }
    let file = dir.join(format!("{segment}.{SOURCE_EXT}"));
    if file.is_file() {
        return Some(Located::File { file });
    }
    None
}

/// Resolve `name` through `ctx`, registering every newly loaded prefix in
/// the module cache.
pub fn import_module(ctx: &mut ResolutionContext, name: &str) -> Result<Import, ImportError> {
    if let Some(cached) = ctx.modules().get(name) {
        return Ok(Import {
            module: cached.clone(),
            fresh: false,
        });
    }

    let segments: Vec<&str> = name.split('.').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(ImportError::ModuleNotFound {
            module: name.to_string(),
            searched: ctx.search_path().iter().map(Path::to_path_buf).collect(),
        });
    }

    let pid = std::process::id();
    let head = segments[0];

    // Head segment: cache first, then the roots in order. First match wins
    // and pins the root for the rest of the name.
    let mut current = match ctx.modules().get(head) {
        Some(cached) => cached.clone(),
        None => {
            let located = ctx
                .search_path()
                .iter()
                .find_map(|root| locate_in_dir(root, head).map(|found| (found, root.to_path_buf())));
            match located {
                Some((found, root)) => {
                    let module = found.into_module(head.to_string(), &root, pid);
                    ctx.modules_mut().insert(module.clone());
                    module
                }
                None => {
                    return Err(ImportError::ModuleNotFound {
                        module: head.to_string(),
                        searched: ctx.search_path().iter().map(Path::to_path_buf).collect(),
                    })
                }
            }
        }
    };

    // Deeper segments only ever look inside the owning package. No
    // backtracking to later roots on a miss.
    for (index, segment) in segments.iter().enumerate().skip(1) {
        let prefix = segments[..=index].join(".");
        if let Some(cached) = ctx.modules().get(&prefix) {
            current = cached.clone();
            continue;
        }

        let Some(package_dir) = current.package_dir.clone() else {
            return Err(ImportError::NotAPackage {
                module: name.to_string(),
                parent: current.name.clone(),
            });
        };

        match locate_in_dir(&package_dir, segment) {
            Some(found) => {
                let module = found.into_module(prefix, &current.search_root, pid);
                ctx.modules_mut().insert(module.clone());
                current = module;
            }
            None => {
                return Err(ImportError::SubmoduleNotFound {
                    module: name.to_string(),
                    package: current.name.clone(),
                    missing: segment.to_string(),
                    package_dir,
                });
            }
        }
    }

    Ok(Import {
        module: current,
        fresh: true,
    })
}

/// Import `module` with `payload_dir` temporarily at the front of the
/// search path. This is the shared shape of every bootstrap attempt.
///
/// The payload directory must exist up front; inserting paths that were
/// never checked is the legacy behavior the fall-through probes
/// reconstruct on purpose, not something this helper does.
pub fn import_from_payload(
    ctx: &mut ResolutionContext,
    payload_dir: &Path,
    module: &str,
) -> Result<Import, ImportError> {
    if !payload_dir.exists() {
        return Err(ImportError::PayloadMissing {
            path: payload_dir.to_path_buf(),
        });
    }
    ctx.with_scoped_entry(payload_dir, SearchPriority::Front, |ctx| {
        import_module(ctx, module)
    })
}
