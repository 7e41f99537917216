use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "lfasr")]
#[command(version, about = "Long-form transcription with the iFlytek lfasr API")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log progress and request details to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub credentials: CredentialArgs,
}

#[derive(Args, Debug, Clone, Default)]
pub struct CredentialArgs {
    /// Application id (overrides XFYUN_APP_ID and the settings file)
    #[arg(long, global = true)]
    pub app_id: Option<String>,

    /// Secret key (overrides XFYUN_SECRET_KEY and the settings file)
    #[arg(long, global = true)]
    pub secret_key: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct PollArgs {
    /// Seconds between status queries
    #[arg(long)]
    pub interval: Option<u64>,

    /// Give up after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload a file and print the task id
    Upload {
        /// Audio or video file
        file: PathBuf,
    },

    /// Check a task, or fetch its transcript once finished
    Result {
        task_id: String,

        /// Keep polling until the task finishes
        #[arg(long)]
        wait: bool,

        /// Also write <task_id>_transcript.txt/.json here
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        #[command(flatten)]
        poll: PollArgs,
    },

    /// Upload, wait and write the transcript for one file
    Transcribe {
        file: PathBuf,

        /// Directory for the transcript files (default: next to the input)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        #[command(flatten)]
        poll: PollArgs,
    },

    /// Transcribe many files concurrently and write a report
    Batch {
        /// Files and/or directories (searched recursively)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Directory for transcripts and the report (default: the first input's directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Pipelines in flight at once
        #[arg(short, long)]
        workers: Option<usize>,

        /// Extensions to pick up from directories, comma separated (e.g. mp4,wav)
        #[arg(short, long, value_delimiter = ',')]
        extensions: Option<Vec<String>>,

        #[command(flatten)]
        poll: PollArgs,
    },

    /// Show or change stored settings
    Config(ConfigArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Store the application id
    #[arg(long = "set-app-id", value_name = "APP_ID")]
    pub app_id: Option<String>,

    /// Store the secret key
    #[arg(long = "set-secret-key", value_name = "SECRET_KEY")]
    pub secret_key: Option<String>,

    /// API base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Upload slice size in bytes
    #[arg(long)]
    pub slice_size: Option<u64>,

    /// Default seconds between status queries
    #[arg(long)]
    pub interval: Option<u64>,

    /// Default polling timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Default batch worker count
    #[arg(long)]
    pub workers: Option<usize>,

    /// Print the current settings
    #[arg(long)]
    pub show: bool,
}
