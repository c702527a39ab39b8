use crate::scanner::Extensions;
use crate::transfer::FailurePolicy;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "photo-batcher")]
#[command(about = "Copy a folder of photos and videos into one dated folder, renaming each file by capture time")]
pub struct Args {
    /// Source directory holding the batch (not recursed into)
    #[arg(short, long, default_value = "files")]
    pub input: PathBuf,

    /// Destination root where the dated folder will be created
    #[arg(short, long, default_value = "dest")]
    pub output: PathBuf,

    /// Name of the temporary folder files are copied into before the final rename
    #[arg(long, default_value = "tmp")]
    pub staging: String,

    /// Title appended to the final folder name
    #[arg(short, long)]
    pub title: Option<String>,

    /// Separator between the dated folder name and the title
    #[arg(long, default_value = "_")]
    pub separator: String,

    /// What to do when a single file cannot be read or copied
    #[arg(long, value_enum, default_value_t = FailurePolicy::Skip)]
    pub on_error: FailurePolicy,

    /// Number of concurrent copy workers (defaults to the number of CPUs)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Image extensions to pick up, comma separated
    #[arg(long, value_delimiter = ',')]
    pub image_ext: Option<Vec<String>>,

    /// Video extensions to pick up, comma separated
    #[arg(long, value_delimiter = ',')]
    pub video_ext: Option<Vec<String>>,

    /// Print the batch summary as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Hide the progress indicator
    #[arg(long, default_value_t = false)]
    pub no_progress: bool,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn extensions(&self) -> Extensions {
        let mut extensions = Extensions::default();
        if let Some(images) = &self.image_ext {
            extensions.images = normalize(images);
        }
        if let Some(videos) = &self.video_ext {
            extensions.videos = normalize(videos);
        }
        extensions
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.output.join(&self.staging)
    }
}

/// Lowercase and strip a leading dot so `.JPG` and `jpg` mean the same thing.
fn normalize(exts: &[String]) -> Vec<String> {
    exts.iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["photo-batcher"]);
        assert_eq!(args.input, PathBuf::from("files"));
        assert_eq!(args.staging_dir(), PathBuf::from("dest").join("tmp"));
        assert_eq!(args.separator, "_");
        assert_eq!(args.on_error, FailurePolicy::Skip);
        assert!(args.title.is_none());
    }

    #[test]
    fn test_extension_overrides() {
        let args = Args::parse_from([
            "photo-batcher",
            "--image-ext",
            ".JPG, png",
            "--on-error",
            "abort",
            "-t",
            "vacation",
        ]);
        let extensions = args.extensions();
        assert_eq!(extensions.images, vec!["jpg", "png"]);
        assert!(extensions.videos.contains(&"mp4".to_string()));
        assert_eq!(args.on_error, FailurePolicy::Abort);
        assert_eq!(args.title.as_deref(), Some("vacation"));
    }
}
