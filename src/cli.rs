use crate::config::{self, FetchSettings, SearchQuery};
use crate::error::{AppError, AppResult};
use crate::model::common::FetchTarget;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Discovers, fetches and merges course catalog records.",
    long_about = None,
    arg_required_else_help = true
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Walk the search listing and write every course path to a targets file
    Discover(DiscoverArgs),
    /// Fetch the detail page of every target and write the deduplicated dataset
    Fetch(FetchCmdArgs),
    /// Split sections out of catalog codes and normalize them
    Clean(CleanArgs),
    /// Join the current dataset with historical analytics into one snapshot
    Merge(MergeArgs),
    /// Run the detail extractor on a saved HTML page
    Extract(ExtractArgs),
    /// Write the JSON Schema of the merged snapshot
    Schema(SchemaArgs),
}

/// Network knobs shared by the fetching stages. Unset values keep the
/// stage defaults.
#[derive(Args, Debug, Default, Clone)]
pub struct FetchArgs {
    #[arg(long, value_name = "URL", help = "Base URL of the catalog site")]
    base_url: Option<String>,

    #[arg(short = 'c', long, value_name = "N", help = "Maximum requests in flight")]
    concurrency: Option<usize>,

    #[arg(long, value_name = "SECS", help = "Per-request timeout")]
    timeout: Option<u64>,

    #[arg(long, value_name = "SECS", help = "Connect timeout")]
    connect_timeout: Option<u64>,

    #[arg(long, value_name = "N", help = "Retries after the first attempt")]
    retries: Option<u32>,

    #[arg(long, value_name = "SECS", help = "Base backoff delay, doubled per retry")]
    retry_delay: Option<f32>,

    #[arg(long, value_name = "N", help = "Targets per chunk")]
    chunk_size: Option<usize>,

    #[arg(long, value_name = "MILLIS", help = "Pause between chunks")]
    chunk_delay: Option<u64>,
}

impl FetchArgs {
    pub fn apply(&self, defaults: FetchSettings) -> AppResult<FetchSettings> {
        let mut settings = defaults;
        if let Some(url) = &self.base_url {
            settings.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(n) = self.concurrency {
            if n == 0 {
                return Err(AppError::Argument("--concurrency must be at least 1".into()));
            }
            settings.max_concurrent = n;
        }
        if let Some(secs) = self.timeout {
            settings.timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.connect_timeout {
            settings.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(n) = self.retries {
            settings.max_retries = n;
        }
        if let Some(secs) = self.retry_delay {
            settings.base_delay = Duration::try_from_secs_f32(secs).map_err(|_| {
                AppError::Argument("--retry-delay must be a non-negative number of seconds".into())
            })?;
        }
        if let Some(n) = self.chunk_size {
            if n == 0 {
                return Err(AppError::Argument("--chunk-size must be at least 1".into()));
            }
            settings.chunk_size = n;
        }
        if let Some(ms) = self.chunk_delay {
            settings.chunk_delay = Duration::from_millis(ms);
        }
        Ok(settings)
    }
}

#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    #[arg(long, default_value = config::DEFAULT_TERM, help = "Term name, e.g. Fall or Spring")]
    term: String,

    #[arg(long, default_value = config::DEFAULT_YEAR, help = "Academic year")]
    year: String,

    #[arg(long, default_value = config::DEFAULT_SCHOOL, help = "School filter")]
    school: String,
}

impl QueryArgs {
    pub fn query(&self) -> SearchQuery {
        SearchQuery {
            term: self.term.trim().to_string(),
            year: self.year.trim().to_string(),
            school: self.school.trim().to_string(),
        }
    }
}

#[derive(Args, Debug)]
pub struct DiscoverArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    #[command(flatten)]
    pub fetch: FetchArgs,

    #[arg(
        short, long,
        default_value = config::DEFAULT_TARGETS_FILE,
        value_name = "FILE_PATH",
        help = "Where to write the discovered targets"
    )]
    output: String,
}

impl DiscoverArgs {
    pub fn get_output(&self) -> PathBuf {
        PathBuf::from(&self.output)
    }
}

#[derive(Args, Debug)]
pub struct FetchCmdArgs {
    #[command(flatten)]
    pub fetch: FetchArgs,

    #[arg(
        short, long,
        default_value = config::DEFAULT_TARGETS_FILE,
        value_name = "FILE_PATH",
        help = "Targets file, one course path per line"
    )]
    input: String,

    #[arg(
        short, long,
        default_value = config::DEFAULT_COURSES_FILE,
        value_name = "FILE_PATH",
        help = "Where to write the course dataset"
    )]
    output: String,

    #[arg(long, value_name = "N", help = "Only fetch the first N targets")]
    pub sample: Option<usize>,
}

impl FetchCmdArgs {
    pub fn get_input(&self) -> PathBuf {
        PathBuf::from(&self.input)
    }

    pub fn get_output(&self) -> PathBuf {
        PathBuf::from(&self.output)
    }
}

#[derive(Args, Debug)]
pub struct CleanArgs {
    #[arg(short, long, default_value = config::DEFAULT_COURSES_FILE, value_name = "FILE_PATH")]
    input: String,

    #[arg(short, long, default_value = config::DEFAULT_CLEANED_FILE, value_name = "FILE_PATH")]
    output: String,
}

impl CleanArgs {
    pub fn get_input(&self) -> PathBuf {
        PathBuf::from(&self.input)
    }

    pub fn get_output(&self) -> PathBuf {
        PathBuf::from(&self.output)
    }
}

#[derive(Args, Debug)]
pub struct MergeArgs {
    #[arg(long, default_value = config::DEFAULT_CLEANED_FILE, value_name = "FILE_PATH", help = "Current course dataset")]
    courses: String,

    #[arg(long, default_value = config::DEFAULT_ANALYTICS_FILE, value_name = "FILE_PATH", help = "Historical analytics")]
    analytics: String,

    #[arg(long, default_value = config::DEFAULT_RESULTS_DIR, value_name = "DIR_PATH", help = "Output directory")]
    out_dir: String,

    #[arg(
        long,
        value_name = "FILE_PATH",
        help = "Previous snapshot used to back-fill locations [default: the snapshot about to be replaced]"
    )]
    previous: Option<String>,

    #[arg(long, requires = "year", help = "Term for a term-specific snapshot name")]
    term: Option<String>,

    #[arg(long, requires = "term", help = "Year for a term-specific snapshot name")]
    year: Option<String>,
}

impl MergeArgs {
    pub fn get_courses(&self) -> PathBuf {
        PathBuf::from(&self.courses)
    }

    pub fn get_analytics(&self) -> PathBuf {
        PathBuf::from(&self.analytics)
    }

    pub fn get_out_dir(&self) -> PathBuf {
        PathBuf::from(&self.out_dir)
    }

    /// `master_courses_{term}{year}.json` with the term lowercased, or
    /// `master_courses.json` without a term.
    pub fn get_snapshot_path(&self) -> PathBuf {
        let name = match (&self.term, &self.year) {
            (Some(term), Some(year)) => format!(
                "master_courses_{}{}.json",
                term.trim().to_lowercase(),
                year.trim()
            ),
            _ => "master_courses.json".to_string(),
        };
        self.get_out_dir().join(name)
    }

    pub fn get_previous(&self) -> PathBuf {
        self.previous
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| self.get_snapshot_path())
    }
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    #[arg(value_name = "HTML_FILE", help = "Saved course detail page")]
    input: String,

    #[arg(
        long,
        value_name = "PATH",
        help = "Course path the page was fetched from (recorded as course_url)"
    )]
    target: Option<String>,

    #[arg(short, long, default_value = "extract_output.json", value_name = "OUTPUT_FILE")]
    output: String,
}

impl ExtractArgs {
    pub fn get_input(&self) -> PathBuf {
        PathBuf::from(&self.input)
    }

    pub fn get_output(&self) -> PathBuf {
        PathBuf::from(&self.output)
    }

    /// The given target, else the input file name.
    pub fn get_target(&self) -> FetchTarget {
        let raw = self.target.clone().unwrap_or_else(|| {
            self.get_input()
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.input.clone())
        });
        FetchTarget::from_path(&raw)
    }
}

#[derive(Args, Debug)]
pub struct SchemaArgs {
    #[arg(long, default_value = config::DEFAULT_RESULTS_DIR, value_name = "DIR_PATH")]
    out_dir: String,

    #[arg(long, value_name = "FILE_PATH", help = "Snapshot to draw the example entry from")]
    snapshot: Option<String>,
}

impl SchemaArgs {
    pub fn get_out_dir(&self) -> PathBuf {
        PathBuf::from(&self.out_dir)
    }

    pub fn get_snapshot(&self) -> Option<PathBuf> {
        self.snapshot.as_deref().map(PathBuf::from)
    }
}
