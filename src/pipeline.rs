//! One (page, locale) run: plan, select, translate, reconcile.
//!
//! The plan phase only reads. Choosing which candidates to translate is left
//! to the caller through [`Selection`], so an interactive front end can sit
//! between [`plan`] and the apply half of [`process_page`].

use crate::classifier::Classifier;
use crate::config::TranslateConfig;
use crate::content::client::ContentClient;
use crate::content::model::Entry;
use crate::failure_log::FailureLog;
use crate::mt::translator::MachineTranslator;
use crate::reconcile::{FailureMap, ReconcileReport, Reconciler, merge_failures};
use crate::registry::FieldRegistry;
use crate::translation::{TranslationEntry, Updates, translate_selected};
use crate::walker::{WalkOptions, Walker};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{error, info};

/// Everything a page run borrows
pub struct PageDeps<'a> {
    pub client: &'a dyn ContentClient,
    pub translator: &'a dyn MachineTranslator,
    pub config: &'a TranslateConfig,
    pub classifier: &'a Classifier,
    pub selection: &'a Selection,
    pub options: WalkOptions,
    pub dry_run: bool,
}

/// Discover all candidates under `entry` for `locale`
pub async fn plan(entry: &Entry, locale: &str, deps: &PageDeps<'_>) -> FieldRegistry {
    Walker::new(deps.config, deps.classifier, deps.client)
        .with_options(deps.options)
        .collect(entry, locale)
        .await
}

/// Narrows the translatable candidates of a plan
#[derive(Debug, Clone, Default)]
pub struct Selection {
    fields: Option<HashSet<String>>,
    entry_ids: Option<HashSet<String>>,
}

impl Selection {
    /// Every translatable candidate
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_entries<I, S>(mut self, entry_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entry_ids = Some(entry_ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn matches(&self, candidate: &TranslationEntry) -> bool {
        self.fields
            .as_ref()
            .is_none_or(|f| f.contains(&candidate.field_name))
            && self
                .entry_ids
                .as_ref()
                .is_none_or(|ids| ids.contains(&candidate.entry_id))
    }

    pub fn select(&self, registry: &FieldRegistry, classifier: &Classifier) -> Vec<TranslationEntry> {
        registry
            .translatable(classifier)
            .into_iter()
            .filter(|candidate| self.matches(candidate))
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PageOutcome {
    pub entry_id: String,
    pub locale: String,
    /// Candidates registered by the walker
    pub discovered: usize,
    pub selected: usize,
    pub translated: usize,
    pub updates: Updates,
    /// `None` on a dry run
    pub report: Option<ReconcileReport>,
    /// Translation and reconciliation failures together
    pub failures: FailureMap,
    pub failure_log: Option<PathBuf>,
}

impl PageOutcome {
    pub fn has_changes(&self) -> bool {
        self.report.as_ref().is_some_and(|r| r.has_changes)
    }
}

/// Run the whole matrix cell for one page and one locale
///
/// Never fails: every error below this level is recorded in the outcome.
pub async fn process_page(page: &mut Entry, locale: &str, deps: &PageDeps<'_>) -> PageOutcome {
    let registry = plan(page, locale, deps).await;
    let mut selected = deps.selection.select(&registry, deps.classifier);

    info!(
        entry_id = page.id(),
        locale,
        discovered = registry.len(),
        selected = selected.len(),
        "planned translation"
    );

    let batch = translate_selected(&mut selected, deps.translator, deps.classifier).await;
    let mut outcome = PageOutcome {
        entry_id: page.id().to_string(),
        locale: locale.to_string(),
        discovered: registry.len(),
        selected: selected.len(),
        translated: batch.updates.len(),
        updates: batch.updates,
        failures: batch.failures,
        ..PageOutcome::default()
    };

    if deps.dry_run {
        info!(entry_id = page.id(), locale, "dry run, skipping updates");
        return outcome;
    }

    if !outcome.updates.is_empty() {
        let report = Reconciler::new(deps.client, &deps.config.source_locale)
            .apply(page, &outcome.updates, locale)
            .await;
        merge_failures(&mut outcome.failures, report.failures.clone());
        outcome.report = Some(report);
    }

    if deps.config.logging.save_failed_translations && !outcome.failures.is_empty() {
        match FailureLog::write(
            &deps.config.logging.failed_translations_path,
            locale,
            &outcome.failures,
        ) {
            Ok(path) => outcome.failure_log = Some(path),
            Err(err) => error!(locale, error = %err, "failed to write failure log"),
        }
    }

    outcome
}
