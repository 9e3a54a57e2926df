use std::path::PathBuf;

use futures::StreamExt;
use reqwest::Client;

use crate::classify;
use crate::download::{self, DownloadOutcome};
use crate::feed::{Feed, FeedError};
use crate::matcher::{self, Reference};
use crate::resolver::ResolverRegistry;

/// Sequential search pipeline: one community, one post, one candidate at a
/// time. No failure below listing level stops the run, and a listing failure
/// only skips the rest of that community.
pub struct Pipeline<F> {
    feed: F,
    registry: ResolverRegistry,
    client: Client,
    reference: Reference,
    output_dir: PathBuf,
}

impl<F: Feed> Pipeline<F> {
    pub fn new(
        feed: F,
        registry: ResolverRegistry,
        client: Client,
        reference: Reference,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            feed,
            registry,
            client,
            reference,
            output_dir,
        }
    }

    /// Search every subreddit in input order, keeping only candidates that
    /// score at or above the match threshold.
    pub async fn run(&self, subreddits: &[String], count: u32) {
        let mut downloaded = 0usize;
        let mut matched = 0usize;

        for subreddit in subreddits {
            tracing::info!("-- {subreddit}");

            let posts = match self.feed.top_posts(subreddit, count).await {
                Ok(posts) => posts,
                Err(FeedError::NotFound) => {
                    tracing::warn!("{subreddit} not found, skipping");
                    continue;
                }
                Err(e) => {
                    tracing::warn!("failed to list {subreddit}: {e}, skipping");
                    continue;
                }
            };

            for post in posts {
                let mut candidates = classify::classify_and_expand(&self.registry, &post.url);

                while let Some(url) = candidates.next().await {
                    match download::download(&self.client, &url, &self.output_dir).await {
                        DownloadOutcome::Saved(path) => {
                            tracing::info!("downloaded {url}");
                            downloaded += 1;
                            if matcher::matches(&self.reference, &path) {
                                matched += 1;
                            }
                        }
                        DownloadOutcome::Skipped(reason) => {
                            tracing::debug!("skipped {url}: {reason}");
                        }
                    }
                }
            }
        }

        tracing::info!("search complete: {downloaded} downloaded, {matched} kept");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::Post;
    use image::{GrayImage, Luma};

    enum StubFeed {
        NotFound,
        Posts(Vec<Post>),
    }

    impl Feed for StubFeed {
        async fn top_posts(&self, _subreddit: &str, limit: u32) -> Result<Vec<Post>, FeedError> {
            match self {
                StubFeed::NotFound => Err(FeedError::NotFound),
                StubFeed::Posts(posts) => {
                    Ok(posts.iter().take(limit as usize).cloned().collect())
                }
            }
        }
    }

    fn pipeline_with(feed: StubFeed, output_dir: &std::path::Path) -> Pipeline<StubFeed> {
        let reference_path = output_dir.join("reference.png");
        GrayImage::from_pixel(10, 10, Luma([128]))
            .save(&reference_path)
            .unwrap();
        let reference = Reference::load(reference_path.to_str().unwrap()).unwrap();

        let client = Client::new();
        Pipeline::new(
            feed,
            ResolverRegistry::with_default_hosts(client.clone()),
            client,
            reference,
            output_dir.to_path_buf(),
        )
    }

    #[tokio::test]
    async fn test_missing_subreddit_completes_with_no_downloads() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_with(StubFeed::NotFound, dir.path());

        pipeline
            .run(&["doesnotexist123".to_string()], 10)
            .await;

        // Only the reference fixture is on disk.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_unresolvable_posts_produce_no_downloads() {
        let dir = tempfile::tempdir().unwrap();
        let posts = vec![
            Post {
                url: "https://example.com/article".to_string(),
            },
            // Animated: classifier passes it through, downloader refuses it.
            Post {
                url: "http://i.imgur.com/abc123.gifv".to_string(),
            },
        ];
        let pipeline = pipeline_with(StubFeed::Posts(posts), dir.path());

        pipeline.run(&["pics".to_string()], 10).await;

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
