use anyhow::{Context, Result, bail};
use clap::{Arg, ArgAction, Command};
use contentful_translate::config::DEFAULT_CONFIG_FILE;
use contentful_translate::mt::{DeepLProvider, MachineTranslator, MockMode, MockTranslator};
use contentful_translate::{
    Classifier, ContentClient, Credentials, Entry, ManagementClient, PageDeps, Selection,
    TranslateConfig, WalkOptions, Walker, process_page,
};
use std::path::PathBuf;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let matches = Command::new("contentful-translate")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Translate Contentful entries and everything they link to")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Path to the configuration file")
                .default_value(DEFAULT_CONFIG_FILE),
        )
        .arg(
            Arg::new("entry")
                .long("entry")
                .short('e')
                .help("Entry id to translate (repeatable; default: every entry of the starting content type)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("locale")
                .long("locale")
                .short('l')
                .help("Target locale (repeatable; default: every supported locale)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("field")
                .long("field")
                .short('f')
                .help("Only translate fields with this name (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Translate and report, but write nothing")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("mock")
                .long("mock")
                .short('m')
                .help("Use mock translator instead of DeepL")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .help("Log per-field discovery at trace level only")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let strings = |name: &str| -> Vec<String> {
        matches
            .get_many::<String>(name)
            .map(|values| values.cloned().collect())
            .unwrap_or_default()
    };
    let use_mock = matches.get_flag("mock");
    let dry_run = matches.get_flag("dry-run");

    dotenv::from_filename(".env.development").ok();

    let config_path = matches
        .get_one::<String>("config")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = TranslateConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let credentials = Credentials::from_env(!use_mock)?;
    let classifier = Classifier::new(&config)?;

    let client = ManagementClient::new(&credentials).context("building content client")?;
    let translator: Box<dyn MachineTranslator> = if use_mock {
        Box::new(MockTranslator::new(MockMode::Suffix))
    } else {
        let key = credentials.deepl_api_key.clone().unwrap_or_default();
        Box::new(DeepLProvider::new(key).context("building DeepL client")?)
    };

    let locales = {
        let requested = strings("locale");
        if requested.is_empty() {
            config.supported_locales.clone()
        } else {
            for locale in &requested {
                if !config.is_supported_locale(locale) {
                    bail!(
                        "locale '{}' is not in supportedLocales ({})",
                        locale,
                        config.supported_locales.join(", ")
                    );
                }
            }
            requested
        }
    };

    let mut pages = load_pages(&client, &config, &strings("entry")).await?;
    if pages.is_empty() {
        warn!("no entries to translate");
        return Ok(());
    }

    let fields = strings("field");
    let selection = if fields.is_empty() {
        Selection::all()
    } else {
        Selection::all().with_fields(fields)
    };
    let deps = PageDeps {
        client: &client,
        translator: translator.as_ref(),
        config: &config,
        classifier: &classifier,
        selection: &selection,
        options: WalkOptions {
            silent: matches.get_flag("quiet"),
        },
        dry_run,
    };

    info!(
        provider = translator.provider_name(),
        pages = pages.len(),
        locales = %locales.join(", "),
        dry_run,
        "starting translation"
    );

    let mut failed_runs = 0;
    for page in pages.iter_mut() {
        let title = page.display_title(&config.source_locale);

        if dry_run {
            let walker = Walker::new(&config, &classifier, &client);
            for row in walker.analyze(page).await {
                info!(entry = %title, path = %row.path, status = %row.status, "field");
            }
        }

        for locale in &locales {
            let outcome = process_page(page, locale, &deps).await;
            let failures: usize = outcome.failures.values().map(Vec::len).sum();

            if failures > 0 {
                failed_runs += 1;
                warn!(
                    entry = %title,
                    locale = %locale,
                    translated = outcome.translated,
                    failures,
                    log = ?outcome.failure_log,
                    "finished with failures"
                );
                for (entry_id, list) in &outcome.failures {
                    for failure in list {
                        error!(
                            entry_id = %entry_id,
                            field = failure.field_name.as_deref().unwrap_or("-"),
                            error = %failure.error,
                            "update failed"
                        );
                    }
                }
            } else {
                info!(
                    entry = %title,
                    locale = %locale,
                    translated = outcome.translated,
                    saved = outcome.has_changes(),
                    "finished"
                );
            }
        }
    }

    info!(
        pages = pages.len(),
        locales = locales.len(),
        runs_with_failures = failed_runs,
        "translation run complete"
    );
    Ok(())
}

/// Fetch the requested entries, or every entry of the starting content type
async fn load_pages(
    client: &dyn ContentClient,
    config: &TranslateConfig,
    ids: &[String],
) -> Result<Vec<Entry>> {
    if ids.is_empty() {
        let content_type = config
            .starting_content_type
            .as_deref()
            .context("startingContentType must be set when no --entry is given")?;
        return client
            .get_entries(content_type)
            .await
            .with_context(|| format!("listing entries of type {}", content_type));
    }

    let mut pages = Vec::with_capacity(ids.len());
    for id in ids {
        match client.get_entry(id).await {
            Ok(Some(entry)) => pages.push(entry),
            Ok(None) => warn!(entry_id = %id, "entry not found, skipping"),
            Err(err) => error!(entry_id = %id, error = %err, "failed to fetch entry"),
        }
    }
    Ok(pages)
}
