pub mod annotate;
pub mod dump;
pub mod error;
pub mod model;
pub mod resolve;
pub mod select;
pub mod session;
pub mod summary;

pub use crate::annotate::{AnnotatedDocument, Annotator, CommentField, OrderPolicy, RenderMode};
pub use crate::dump::{SelectionPolicy, Selected, parse_dump, select_change};
pub use crate::error::{ChangeError, DumpError, GrError, SummaryError};
pub use crate::model::{ChangeRecord, Comment, Message, PatchSet};
pub use crate::select::{PatchSetSelection, revision_for, select_patch_set};
pub use crate::session::{AnnotationRun, RunReport, SkipReason};
pub use crate::summary::{SummaryFilter, SummaryFormat, render_summary};
