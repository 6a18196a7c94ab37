//! Translate a graph of structured content entries into other locales.
//!
//! A run starts from one entry, walks its fields and linked entries to find
//! translatable text, translates the selected candidates through a
//! [`MachineTranslator`](mt::MachineTranslator), and writes the results back
//! as drafts through a [`ContentClient`](content::ContentClient).

pub mod classifier;
pub mod config;
pub mod content;
pub mod error;
pub mod failure_log;
pub mod mt;
pub mod pipeline;
pub mod reconcile;
pub mod registry;
pub mod rich_text;
pub mod translation;
pub mod walker;


pub use classifier::{Classifier, TextClass};
pub use config::{Credentials, TranslateConfig};
pub use content::{ContentClient, Entry, ManagementClient, MemoryClient};
pub use error::{ConfigError, ContentError, ContentResult};
pub use failure_log::FailureLog;
pub use pipeline::{PageDeps, PageOutcome, Selection, plan, process_page};
pub use reconcile::{FailureMap, FieldFailure, ReconcileReport, Reconciler};
pub use registry::FieldRegistry;
pub use rich_text::{PathKey, extract, reconstruct};
pub use translation::{TranslationEntry, Updates, translate_selected};
pub use walker::{FieldAnalysis, FieldStatus, WalkOptions, Walker};
