use super::app_config::LogLevel;
use crate::domain::entities::RequestDescriptor;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(
    name = "cached-image",
    version,
    about = "Fetch an image through the cached loader and print every state it goes through",
    long_about = None
)]
pub struct CliArgs {
    /// Image URL.
    pub url: String,

    /// HTTP method.
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,

    /// Extra request header, as "Name: value". Repeatable.
    #[arg(short = 'H', long = "header", value_name = "HEADER", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Number of times to load the image with a fresh loader.
    /// Rounds after the first are served from the memory cache.
    #[arg(long, default_value_t = 1)]
    pub repeat: u32,

    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// User agent for image requests.
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Maximum concurrent downloads.
    #[arg(long)]
    pub max_concurrent_downloads: Option<usize>,
}

impl CliArgs {
    /// Builds the request described by the arguments.
    #[must_use]
    pub fn request(&self) -> RequestDescriptor {
        self.headers.iter().fold(
            RequestDescriptor::new(&self.url).with_method(&self.method),
            |request, (name, value)| request.with_header(name, value.clone()),
        )
    }
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected \"Name: value\", got {raw:?}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing header name in {raw:?}"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::ImageKey;

    #[test]
    fn test_request_from_args() {
        let args = CliArgs::parse_from([
            "cached-image",
            "https://example.com/image.jpg",
            "-H",
            "Accept: image/webp",
            "--header",
            "X-Token:abc",
        ]);

        let expected = RequestDescriptor::new("https://example.com/image.jpg")
            .with_header("accept", "image/webp")
            .with_header("x-token", "abc");
        assert_eq!(ImageKey::from(args.request()), ImageKey::from(expected));
        assert_eq!(args.repeat, 1);
    }

    #[test]
    fn test_rejects_malformed_header() {
        assert!(parse_header("no separator").is_err());
        assert!(parse_header(": value").is_err());
        assert_eq!(
            parse_header("Range: bytes=0-").unwrap(),
            ("Range".to_string(), "bytes=0-".to_string())
        );
    }
}
