use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::report::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "s3dedup")]
#[command(
    about = "Find duplicate and look-alike objects in a bucket index and plan their cleanup",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Args)]
pub struct IndexArgs {
    /// CSV export of the bucket listing
    #[arg(long, default_value = "index.csv")]
    pub index: PathBuf,
    /// Only consider keys under this prefix
    #[arg(long)]
    pub prefix: Option<String>,
}

#[derive(Debug, Args)]
pub struct HashArgs {
    /// Local mirror of the bucket, used to hash ambiguous candidates
    #[arg(long)]
    pub mirror: Option<PathBuf>,
    /// Hashing threads (0 uses one per core)
    #[arg(long)]
    pub workers: Option<usize>,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
    /// Write the report here instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct TargetArgs {
    /// Bucket the generated script acts on
    #[arg(long)]
    pub bucket: String,
    /// Custom endpoint for S3-compatible stores
    #[arg(long)]
    pub endpoint_url: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Report objects proven identical
    Duplicates {
        #[command(flatten)]
        index: IndexArgs,
        #[command(flatten)]
        hash: HashArgs,
        #[command(flatten)]
        report: ReportArgs,
    },
    /// Report objects whose names collide after normalization
    Suspects {
        #[command(flatten)]
        index: IndexArgs,
        #[command(flatten)]
        hash: HashArgs,
        #[command(flatten)]
        report: ReportArgs,
    },
    /// Report media objects carrying the same artist and title
    Media {
        #[command(flatten)]
        index: IndexArgs,
        #[command(flatten)]
        hash: HashArgs,
        /// CSV output of the tag extractor
        #[arg(long)]
        tags: PathBuf,
        #[command(flatten)]
        report: ReportArgs,
    },
    /// Write a reviewable script deleting duplicates
    PlanDelete {
        #[command(flatten)]
        index: IndexArgs,
        #[command(flatten)]
        hash: HashArgs,
        #[command(flatten)]
        target: TargetArgs,
        /// Retention criteria, e.g. cleanest,shortest,oldest
        #[arg(long)]
        keep: Option<String>,
        #[arg(long, default_value = "delete_duplicates.sh")]
        output: PathBuf,
    },
    /// Write a reviewable script renaming keys with the clean rules
    Clean {
        #[command(flatten)]
        index: IndexArgs,
        #[command(flatten)]
        target: TargetArgs,
        /// Comma-separated clean rules
        #[arg(long, value_delimiter = ',')]
        rules: Vec<String>,
        #[arg(long, default_value = "clean_keys.sh")]
        output: PathBuf,
    },
    /// Summarize the index and its duplicates
    Stats {
        #[command(flatten)]
        index: IndexArgs,
        #[command(flatten)]
        hash: HashArgs,
        #[command(flatten)]
        report: ReportArgs,
    },
    /// Print configuration values
    PrintConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_clean() {
        let cli = Cli::parse_from([
            "s3dedup",
            "clean",
            "--index",
            "bucket.csv",
            "--prefix",
            "photos/",
            "--bucket",
            "media",
            "--rules",
            "strip-spaces",
        ]);
        match cli.command {
            Some(Commands::Clean {
                index,
                target,
                rules,
                output,
            }) => {
                assert_eq!(index.index, PathBuf::from("bucket.csv"));
                assert_eq!(index.prefix.as_deref(), Some("photos/"));
                assert_eq!(target.bucket, "media");
                assert_eq!(rules, vec!["strip-spaces".to_string()]);
                assert_eq!(output, PathBuf::from("clean_keys.sh"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_duplicates_csv() {
        let cli = Cli::parse_from(["s3dedup", "duplicates", "--format", "csv", "--workers", "8"]);
        match cli.command {
            Some(Commands::Duplicates { hash, report, .. }) => {
                assert_eq!(report.format, OutputFormat::Csv);
                assert_eq!(hash.workers, Some(8));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_suspects_with_mirror() {
        let cli = Cli::parse_from(["s3dedup", "suspects", "--mirror", "/srv/mirror"]);
        match cli.command {
            Some(Commands::Suspects { hash, .. }) => {
                assert_eq!(hash.mirror, Some(PathBuf::from("/srv/mirror")));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
