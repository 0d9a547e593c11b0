use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use chrono::Datelike;
use clap::Parser;

use bibtidy_core::config_file::{self, ConfigFile, PromptMode};
use bibtidy_core::lookup::AcmDigitalLibrary;
use bibtidy_core::lookup::acm::{
    DEFAULT_DELAY, DEFAULT_EXPORT_URL, DEFAULT_SEARCH_URL, DEFAULT_TIMEOUT,
};
use bibtidy_core::{Corpus, DEFAULT_TITLE_FILE, ProgressEvent, Reconciler, VenueStore};

mod output;
mod prompt;

use output::ColorMode;

/// Reconcile a BibTeX bibliography against a curated reference corpus,
/// beautifying entries of known venues
#[derive(Parser, Debug)]
#[command(name = "bibtidy", version, about, long_about = None)]
struct Cli {
    /// BibTeX file to reconcile
    input: PathBuf,

    /// Where to write the result (default: <input>-beautified.bib)
    output: Option<PathBuf>,

    /// Directory holding title.bib and the venue record files
    /// (default: the directory of this executable)
    #[arg(long)]
    corpus_dir: Option<PathBuf>,

    /// Add every beautified entry to its venue file without asking
    #[arg(long, conflicts_with = "no_persist")]
    yes: bool,

    /// Never add beautified entries to venue files
    #[arg(long)]
    no_persist: bool,

    /// Disable the ACM Digital Library lookup
    #[arg(long)]
    no_lookup: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Path to a config file (default: .bibtidy.toml over the platform config)
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Fully resolved run settings.
#[derive(Debug, Clone, PartialEq)]
struct Settings {
    corpus_dir: PathBuf,
    title_file: String,
    lookup_enabled: bool,
    lookup_delay: Duration,
    lookup_timeout: Duration,
    search_url: String,
    export_url: String,
    prompt: PromptMode,
}

fn env_secs(env: &dyn Fn(&str) -> Option<String>, name: &str) -> Option<u64> {
    env(name).and_then(|v| v.trim().parse().ok())
}

/// Resolve configuration: CLI flags > env vars > config file > defaults.
fn resolve_settings(
    cli: &Cli,
    file: &ConfigFile,
    env: &dyn Fn(&str) -> Option<String>,
    default_corpus_dir: PathBuf,
) -> Settings {
    let corpus = file.corpus.clone().unwrap_or_default();
    let lookup = file.lookup.clone().unwrap_or_default();
    let prompt = file.prompt.clone().unwrap_or_default();

    let corpus_dir = cli
        .corpus_dir
        .clone()
        .or_else(|| env("BIBTIDY_CORPUS_DIR").map(PathBuf::from))
        .or_else(|| corpus.dir.map(PathBuf::from))
        .unwrap_or(default_corpus_dir);

    let delay_secs = env_secs(env, "BIBTIDY_LOOKUP_DELAY_SECS")
        .or(lookup.delay_secs)
        .unwrap_or(DEFAULT_DELAY.as_secs());
    let timeout_secs = env_secs(env, "BIBTIDY_LOOKUP_TIMEOUT_SECS")
        .or(lookup.timeout_secs)
        .unwrap_or(DEFAULT_TIMEOUT.as_secs());

    let prompt = if cli.yes {
        PromptMode::Yes
    } else if cli.no_persist {
        PromptMode::No
    } else {
        prompt.assume.unwrap_or_default()
    };

    Settings {
        corpus_dir,
        title_file: corpus
            .title_file
            .unwrap_or_else(|| DEFAULT_TITLE_FILE.to_string()),
        lookup_enabled: !cli.no_lookup && lookup.enabled.unwrap_or(true),
        lookup_delay: Duration::from_secs(delay_secs),
        lookup_timeout: Duration::from_secs(timeout_secs),
        search_url: lookup
            .search_url
            .unwrap_or_else(|| DEFAULT_SEARCH_URL.to_string()),
        export_url: lookup
            .export_url
            .unwrap_or_else(|| DEFAULT_EXPORT_URL.to_string()),
        prompt,
    }
}

/// `refs.bib` -> `refs-beautified.bib`; any other name gets the suffix appended.
fn default_output_path(input: &Path) -> PathBuf {
    let name = input.to_string_lossy();
    match name.strip_suffix(".bib") {
        Some(stem) => PathBuf::from(format!("{}-beautified.bib", stem)),
        None => PathBuf::from(format!("{}-beautified.bib", name)),
    }
}

fn executable_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();
    run(cli).await
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let file_config = match &cli.config {
        Some(path) => config_file::load_from_path(path)
            .with_context(|| format!("could not read config file {}", path.display()))?,
        None => config_file::load_config(),
    };
    let settings = resolve_settings(
        &cli,
        &file_config,
        &|name| std::env::var(name).ok(),
        executable_dir(),
    );
    tracing::debug!(?settings, "resolved settings");

    if !cli.input.exists() {
        anyhow::bail!("File not found: {}", cli.input.display());
    }
    let targets = bibtidy_bib::parse_file(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;
    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.input));

    let mut corpus = Corpus::load(&settings.corpus_dir, &settings.title_file).with_context(|| {
        format!(
            "failed to load reference corpus from {}",
            settings.corpus_dir.display()
        )
    })?;
    let store = VenueStore::new(&settings.corpus_dir);

    let color = ColorMode(!cli.no_color && std::io::stdout().is_terminal());
    let mut writer = std::io::stdout();
    output::print_header(
        &mut writer,
        &cli.input,
        targets.len(),
        &settings.corpus_dir,
        corpus.len(),
        color,
    )?;

    let client = reqwest::Client::builder()
        .user_agent(concat!("bibtidy/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;
    let acm = AcmDigitalLibrary {
        search_url: settings.search_url.clone(),
        export_url: settings.export_url.clone(),
        delay: settings.lookup_delay,
        timeout: settings.lookup_timeout,
    };

    let progress = move |event: ProgressEvent| {
        let mut w = std::io::stdout().lock();
        let _ = output::print_progress(&mut w, &event, color);
        let _ = w.flush();
    };
    let mut confirm = prompt::confirmer(settings.prompt);
    let current_year = chrono::Local::now().year();

    let mut reconciler = Reconciler::new(
        &mut corpus,
        &store,
        &client,
        confirm.as_mut(),
        current_year,
    )
    .with_progress(&progress);
    if settings.lookup_enabled {
        reconciler = reconciler.with_lookup(&acm);
    }
    let (entries, stats) = reconciler.run(&targets).await;

    std::fs::write(&output_path, bibtidy_bib::write_bibliography(&entries))
        .with_context(|| format!("failed to write {}", output_path.display()))?;
    tracing::info!(path = %output_path.display(), entries = entries.len(), "output written");

    output::print_summary(&mut writer, &stats, &output_path, color)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bibtidy_core::config_file::{CorpusConfig, LookupConfig, PromptConfig};
    use std::collections::HashMap;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("bibtidy").chain(args.iter().copied()))
    }

    fn env_of(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn file_config() -> ConfigFile {
        ConfigFile {
            corpus: Some(CorpusConfig {
                dir: Some("/from/config".into()),
                title_file: Some("master.bib".into()),
            }),
            lookup: Some(LookupConfig {
                enabled: Some(true),
                delay_secs: Some(3),
                timeout_secs: Some(7),
                search_url: Some("http://localhost/search".into()),
                export_url: None,
            }),
            prompt: Some(PromptConfig {
                assume: Some(PromptMode::No),
            }),
        }
    }

    #[test]
    fn output_path_replaces_or_appends_suffix() {
        assert_eq!(
            default_output_path(Path::new("paper/refs.bib")),
            PathBuf::from("paper/refs-beautified.bib")
        );
        assert_eq!(
            default_output_path(Path::new("refs.txt")),
            PathBuf::from("refs.txt-beautified.bib")
        );
    }

    #[test]
    fn defaults_without_config_or_env() {
        let s = resolve_settings(
            &cli(&["in.bib"]),
            &ConfigFile::default(),
            &env_of(&[]),
            PathBuf::from("/exe"),
        );
        assert_eq!(s.corpus_dir, PathBuf::from("/exe"));
        assert_eq!(s.title_file, "title.bib");
        assert!(s.lookup_enabled);
        assert_eq!(s.lookup_delay, Duration::from_secs(10));
        assert_eq!(s.lookup_timeout, Duration::from_secs(30));
        assert_eq!(s.search_url, DEFAULT_SEARCH_URL);
        assert_eq!(s.prompt, PromptMode::Ask);
    }

    #[test]
    fn config_file_fills_in_defaults() {
        let s = resolve_settings(
            &cli(&["in.bib"]),
            &file_config(),
            &env_of(&[]),
            PathBuf::from("/exe"),
        );
        assert_eq!(s.corpus_dir, PathBuf::from("/from/config"));
        assert_eq!(s.title_file, "master.bib");
        assert_eq!(s.lookup_delay, Duration::from_secs(3));
        assert_eq!(s.search_url, "http://localhost/search");
        assert_eq!(s.export_url, DEFAULT_EXPORT_URL);
        assert_eq!(s.prompt, PromptMode::No);
    }

    #[test]
    fn env_overrides_config_and_flags_override_env() {
        let env = env_of(&[
            ("BIBTIDY_CORPUS_DIR", "/from/env"),
            ("BIBTIDY_LOOKUP_DELAY_SECS", "0"),
            ("BIBTIDY_LOOKUP_TIMEOUT_SECS", "not a number"),
        ]);
        let s = resolve_settings(&cli(&["in.bib"]), &file_config(), &env, PathBuf::from("/exe"));
        assert_eq!(s.corpus_dir, PathBuf::from("/from/env"));
        assert_eq!(s.lookup_delay, Duration::ZERO);
        assert_eq!(s.lookup_timeout, Duration::from_secs(7));

        let s = resolve_settings(
            &cli(&["in.bib", "--corpus-dir", "/from/flag", "--yes", "--no-lookup"]),
            &file_config(),
            &env,
            PathBuf::from("/exe"),
        );
        assert_eq!(s.corpus_dir, PathBuf::from("/from/flag"));
        assert_eq!(s.prompt, PromptMode::Yes);
        assert!(!s.lookup_enabled);
    }

    #[test]
    fn yes_and_no_persist_conflict() {
        let result = Cli::try_parse_from(["bibtidy", "in.bib", "--yes", "--no-persist"]);
        assert!(result.is_err());
    }

    #[test]
    fn input_is_required() {
        assert!(Cli::try_parse_from(["bibtidy"]).is_err());
    }

    #[tokio::test]
    async fn end_to_end_writes_beautified_output() {
        let dir = tempfile::tempdir().unwrap();
        let corpus_dir = dir.path().join("db");
        std::fs::create_dir(&corpus_dir).unwrap();
        std::fs::write(
            corpus_dir.join("title.bib"),
            "@inproceedings{ghemawat03google,\n  author={Ghemawat, Sanjay},\n  title={The Google File System},\n  year={2003}\n}\n",
        )
        .unwrap();
        let input = dir.path().join("refs.bib");
        std::fs::write(
            &input,
            "@misc{gfs, title = {The Google file system}}\n@misc{blog, title = {A blog post}, note = {x}}\n",
        )
        .unwrap();

        let args = cli(&[
            input.to_str().unwrap(),
            "--corpus-dir",
            corpus_dir.to_str().unwrap(),
            "--no-persist",
            "--no-lookup",
            "--no-color",
            "--config",
            dir.path().join("missing.toml").to_str().unwrap(),
        ]);
        assert!(run(args).await.is_err(), "missing explicit config is an error");

        let config_path = dir.path().join("bibtidy.toml");
        std::fs::write(&config_path, "[prompt]\nassume = \"no\"\n").unwrap();
        let args = cli(&[
            input.to_str().unwrap(),
            "--corpus-dir",
            corpus_dir.to_str().unwrap(),
            "--no-lookup",
            "--no-color",
            "--config",
            config_path.to_str().unwrap(),
        ]);
        run(args).await.unwrap();

        let written = std::fs::read_to_string(dir.path().join("refs-beautified.bib")).unwrap();
        let entries = bibtidy_bib::parse_str(&written).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, "gfs");
        assert!(entries[0].get("ids").is_none());
        assert_eq!(entries[0].author(), Some("Ghemawat, Sanjay"));
        assert_eq!(entries[1].key, "blog");
    }
}
