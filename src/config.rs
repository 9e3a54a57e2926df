use std::io::Write;
use std::path::Path;

use thiserror::Error;

/// Flat directory all accepted images end up in, created at startup.
pub const OUTPUT_DIR: &str = "output";

/// Browser-style user agent; some image hosts refuse requests without one.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; WOW64; rv:46.0) Gecko/20100101 Firefox/46.0";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid post count: {0}")]
    InvalidCount(String),

    #[error("not enough arguments")]
    NotEnoughArguments,

    #[error("failed to read subreddit file: {0}")]
    SubredditFile(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Number of top posts to search in each subreddit.
    pub count: u32,
    /// Path to the reference sub-image to search with.
    pub reference_path: String,
    /// Subreddits to search, in search order.
    pub subreddits: Vec<String>,
}

impl Config {
    /// Build a config from command line arguments, or interactively when none
    /// are given. Invalid argument shapes print usage and exit the process.
    pub fn from_args() -> Self {
        let args: Vec<String> = std::env::args().collect();

        if args.len() == 1 {
            return Self::from_prompts();
        }

        match Self::parse_args(&args[1..]) {
            Ok(config) => config,
            Err(e) => usage_and_exit(Some(&e.to_string())),
        }
    }

    fn parse_args(args: &[String]) -> Result<Self, ConfigError> {
        if args.len() < 3 {
            return Err(ConfigError::NotEnoughArguments);
        }

        let count: u32 = args[0]
            .parse()
            .map_err(|_| ConfigError::InvalidCount(args[0].clone()))?;

        let reference_path = args[1].clone();

        // Remaining words form either a file path or a literal list; a list
        // containing spaces arrives as multiple argv entries, so re-join them.
        let subreddits = parse_subreddits(&args[2..].join(" "))?;

        Ok(Config {
            count,
            reference_path,
            subreddits,
        })
    }

    fn from_prompts() -> Self {
        let count = loop {
            let answer = prompt("How many posts to search in each subreddit: ");
            match answer.parse::<u32>() {
                Ok(n) => break n,
                Err(_) => continue,
            }
        };

        let reference_path = prompt("Give path of sub-image to search with: ");

        let subreddits = loop {
            let answer =
                prompt("Put a full file path or comma + space delimited list of subreddits: ");
            match parse_subreddits(&answer) {
                Ok(subs) if !subs.is_empty() => break subs,
                _ => continue,
            }
        };

        Config {
            count,
            reference_path,
            subreddits,
        }
    }
}

/// Interpret the subreddit argument as a newline-delimited file when it names
/// an existing path, otherwise as a literal comma + space delimited list.
fn parse_subreddits(path_or_list: &str) -> Result<Vec<String>, ConfigError> {
    if Path::new(path_or_list).exists() {
        let contents = std::fs::read_to_string(path_or_list)?;
        Ok(contents
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect())
    } else {
        Ok(path_or_list
            .split(", ")
            .map(str::to_string)
            .filter(|s| !s.is_empty())
            .collect())
    }
}

fn prompt(message: &str) -> String {
    print!("{message}");
    let _ = std::io::stdout().flush();

    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        usage_and_exit(Some("failed to read from stdin"));
    }
    answer.trim().to_string()
}

fn usage_and_exit(error: Option<&str>) -> ! {
    if let Some(error) = error {
        eprintln!("{error}");
    }
    eprintln!("Usage: subsearch <count> <reference-image> <subreddits>");
    eprintln!("  <count>            number of top posts to search in each subreddit");
    eprintln!("  <reference-image>  path to the sub-image to search with");
    eprintln!("  <subreddits>       path to a newline-delimited file, or a");
    eprintln!("                     comma + space delimited list of subreddits");
    std::process::exit(2);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_subreddits_literal_list() {
        let subs = parse_subreddits("pics, earthporn, wallpapers").unwrap();
        assert_eq!(subs, vec!["pics", "earthporn", "wallpapers"]);
    }

    #[test]
    fn test_parse_subreddits_single_entry() {
        let subs = parse_subreddits("pics").unwrap();
        assert_eq!(subs, vec!["pics"]);
    }

    #[test]
    fn test_parse_subreddits_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subs.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "pics").unwrap();
        writeln!(file, "earthporn").unwrap();
        writeln!(file).unwrap();

        let subs = parse_subreddits(path.to_str().unwrap()).unwrap();
        assert_eq!(subs, vec!["pics", "earthporn"]);
    }

    #[test]
    fn test_parse_args_joins_trailing_words() {
        let args: Vec<String> = ["25", "ref.png", "pics,", "earthporn"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let config = Config::parse_args(&args).unwrap();
        assert_eq!(config.count, 25);
        assert_eq!(config.reference_path, "ref.png");
        assert_eq!(config.subreddits, vec!["pics", "earthporn"]);
    }

    #[test]
    fn test_parse_args_rejects_bad_count() {
        let args: Vec<String> = ["many", "ref.png", "pics"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!(matches!(
            Config::parse_args(&args),
            Err(ConfigError::InvalidCount(_))
        ));
    }

    #[test]
    fn test_parse_args_rejects_missing_arguments() {
        let args: Vec<String> = ["25", "ref.png"].iter().map(|s| s.to_string()).collect();
        assert!(matches!(
            Config::parse_args(&args),
            Err(ConfigError::NotEnoughArguments)
        ));
    }
}
