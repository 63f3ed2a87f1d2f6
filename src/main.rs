use clap::{Args, Parser, Subcommand};
use roku_catalog::{
    AwsCliBucket, CatalogConfig, CatalogError, LocalMirror, ObjectLister, ProgressEvent,
    StorageError, StorageObject, TagFetcher, TagSet, build_catalog, inspect_key, write_feed,
};
use std::path::PathBuf;
use std::process;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Build a Roku direct publisher feed from the videos stored in a bucket
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Catalog configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log per-object details
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the bucket and write the feed
    Build {
        #[command(flatten)]
        source: SourceArgs,

        /// File the feed is written to
        #[arg(short, long, default_value = "mctv-roku.json")]
        output: PathBuf,

        /// Provider name shown in the feed
        #[arg(long)]
        provider: Option<String>,

        /// Public URL prefix of the bucket contents
        #[arg(long)]
        cdn_base: Option<String>,
    },

    /// Show how a single key is parsed and resolved
    Inspect {
        #[command(flatten)]
        source: SourceArgs,

        /// Key of the object to inspect
        key: String,
    },
}

#[derive(Debug, Args)]
struct SourceArgs {
    /// Name of the S3 bucket, accessed through the AWS CLI
    #[arg(long, conflicts_with = "mirror", required_unless_present = "mirror")]
    bucket: Option<String>,

    /// AWS CLI profile used for the bucket
    #[arg(long, requires = "bucket")]
    profile: Option<String>,

    /// Local directory mirroring the bucket
    #[arg(long)]
    mirror: Option<PathBuf>,
}

/// Where the objects come from
enum Source {
    Bucket(AwsCliBucket),
    Mirror(LocalMirror),
}

impl From<SourceArgs> for Source {
    fn from(args: SourceArgs) -> Self {
        match args.bucket {
            Some(bucket) => Source::Bucket(AwsCliBucket::new(bucket).with_profile(args.profile)),
            // Without a bucket clap requires a mirror; default to the working directory
            None => Source::Mirror(LocalMirror::new(args.mirror.unwrap_or_else(|| ".".into()))),
        }
    }
}

impl ObjectLister for Source {
    fn list_objects(&self) -> Result<Vec<StorageObject>, StorageError> {
        match self {
            Source::Bucket(bucket) => bucket.list_objects(),
            Source::Mirror(mirror) => mirror.list_objects(),
        }
    }
}

impl TagFetcher for Source {
    fn fetch_tags(&self, key: &str) -> Result<TagSet, StorageError> {
        match self {
            Source::Bucket(bucket) => bucket.fetch_tags(key),
            Source::Mirror(mirror) => mirror.fetch_tags(key),
        }
    }
}

/// Handles progress events and logs them
fn handle_progress_event(event: ProgressEvent) {
    match event {
        ProgressEvent::Started { provider_name } => {
            info!("Building catalog for {}", provider_name);
        }
        ProgressEvent::ListingObjects => {
            info!("Listing bucket contents...");
        }
        ProgressEvent::ObjectsListed { count } => {
            info!("Found {} object(s)", count);
        }
        ProgressEvent::ProcessingObject { index, total, key } => match total {
            Some(total) => debug!("[{}/{}] Processing: {}", index + 1, total, key),
            None => debug!("[{}] Processing: {}", index + 1, key),
        },
        ProgressEvent::SeriesCreated { title } => {
            info!("Creating new series: {}", title);
        }
        ProgressEvent::SeasonCreated { series, season } => {
            info!("Creating new season {} of {}", season, series);
        }
        ProgressEvent::EpisodeAdded {
            key,
            series,
            season,
            episode_number,
        } => {
            debug!(
                "Added {} as episode {} of {} season {}",
                key, episode_number, series, season
            );
        }
        ProgressEvent::ObjectSkipped { key, reason } => {
            warn!("Skipping {}: {}", key, reason);
        }
        ProgressEvent::TagFetchFailed { key, error } => {
            warn!("Using default metadata for {}: {}", key, error);
        }
        ProgressEvent::Complete {
            series_count,
            episode_count,
            skipped_count,
        } => {
            info!(
                "Catalog complete: {} series, {} episode(s), {} object(s) skipped",
                series_count, episode_count, skipped_count
            );
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), CatalogError> {
    let mut config = CatalogConfig::resolve(cli.config.as_deref())?;

    match cli.command {
        Command::Build {
            source,
            output,
            provider,
            cdn_base,
        } => {
            if let Some(provider) = provider {
                config.provider_name = provider;
            }
            if let Some(cdn_base) = cdn_base {
                config.cdn_base = cdn_base;
            }

            let source = Source::from(source);
            let feed = build_catalog(
                &source,
                &source,
                &config,
                chrono::Utc::now(),
                handle_progress_event,
            )?;

            write_feed(&feed, &output)?;
            println!(
                "Wrote {} series with {} episode(s) to {}",
                feed.series.len(),
                feed.episode_count(),
                output.display()
            );
        }
        Command::Inspect { source, key } => {
            let source = Source::from(source);
            let inspection = inspect_key(&key, &source, &config);

            println!("Key: {}", inspection.key);
            match &inspection.episode_key {
                Ok(episode) => {
                    println!("  Series: {}", episode.name);
                    println!("  Season: {}", episode.season);
                    println!("  File: {}", episode.file_name());
                }
                Err(reason) => {
                    println!("  Not published: {}", reason);
                    return Ok(());
                }
            }
            match &inspection.derived {
                Some(Ok(derived)) => {
                    println!("  Title: {}", derived.title);
                    println!("  Release date: {}", derived.release_date);
                    if let Some(prefix) = &derived.prefix {
                        println!("  Prefix: {}", prefix);
                    }
                }
                Some(Err(e)) => println!("  Not published: {}", e),
                None => {}
            }
            if let Some(tags) = &inspection.tags {
                let mut tags: Vec<_> = tags.iter().collect();
                tags.sort();
                for (name, value) in tags {
                    println!("  Tag {}: {}", name, value);
                }
            }
            if let Some(error) = &inspection.tag_error {
                println!("  Tags unavailable, using defaults: {}", error);
            }
            if let Some(metadata) = &inspection.metadata {
                println!("  Duration: {}s", metadata.duration);
                println!("  Short description: {}", metadata.short_description);
                println!("  Long description: {}", metadata.long_description);
                println!("  Thumbnail: {}", metadata.thumbnail);
            }
            if let Some(url) = &inspection.url {
                println!("  URL: {}", url);
            }
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        error!("{}", e);
        process::exit(1);
    }
}
