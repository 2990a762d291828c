//! Duet Artifacts
//!
//! File sets exchanged between the generating and reviewing roles, and the
//! text formats models use to describe them.
//!
//! # Core Concepts
//!
//! - [`ArtifactPath`]: Validated relative path
//! - [`FileSet`]: Path-ordered mapping of path to content
//! - [`parse`] / [`render`]: `FILE:` section format
//! - [`Hunk`]: Targeted replace/insert/delete against one file
//! - [`apply`]: Reconcile a [`ChangeSet`] with an existing file set
//!
//! # Example
//!
//! ```rust
//! use duet_artifact::{apply, parse_change_set, FileSet};
//!
//! let files = FileSet::try_from_pairs([("calc.py", "return n / 8\n")]).unwrap();
//! let revision = parse_change_set("CHANGE: replace\nTARGET: calc.py\nOLD: n / 8\nNEW: n % 8");
//! let report = apply(&files, &revision.change_set);
//! assert_eq!(report.files.get_str("calc.py"), Some("return n % 8\n"));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod file_set;
mod hash;
mod hunk;
mod parser;
mod patch;
mod path;
mod sentinel;

pub use file_set::FileSet;
pub use hash::{ContentHash, HashError};
pub use hunk::{
    has_change_blocks, parse_hunks, Hunk, HunkAction, HunkParse, Placement, SkipReason,
    SkippedHunk, CHANGE_MARKER,
};
pub use parser::{is_fence, parse, render, strip_fences, ParsedArtifacts, DELETE_MARKER, FILE_MARKER};
pub use patch::{
    apply, apply_hunk, parse_change_set, ChangeSet, HunkOutcome, HunkResult, PatchReport,
    RevisionParse,
};
pub use path::{ArtifactPath, PathError};
pub use sentinel::{is_accepted, is_not_applicable, ACCEPTANCE_PHRASE, NOT_APPLICABLE_PHRASE};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
