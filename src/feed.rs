use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;

/// Reddit caps a single listing page at 100 entries; larger requests paginate.
const PAGE_LIMIT: u32 = 100;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("subreddit not found")]
    NotFound,

    #[error("listing request failed with status {0}")]
    Status(StatusCode),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// One submission from a community listing. Only the target URL is consumed
/// downstream; everything else in the listing payload is ignored.
#[derive(Debug, Clone)]
pub struct Post {
    pub url: String,
}

/// Source of top posts for a community. The pipeline is generic over this so
/// tests can drive it without the network.
#[allow(async_fn_in_trait)]
pub trait Feed {
    async fn top_posts(&self, subreddit: &str, limit: u32) -> Result<Vec<Post>, FeedError>;
}

/// Feed backed by Reddit's public JSON listing endpoint, sorted by
/// top-of-all-time.
pub struct RedditFeed {
    client: Client,
}

impl RedditFeed {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn listing_page(
        &self,
        subreddit: &str,
        limit: u32,
        after: Option<&str>,
    ) -> Result<Listing, FeedError> {
        let url = format!("https://www.reddit.com/r/{subreddit}/top.json");
        let mut params = vec![("t", "all".to_string()), ("limit", limit.to_string())];
        if let Some(after) = after {
            params.push(("after", after.to_string()));
        }

        let response = self.client.get(&url).query(&params).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(FeedError::NotFound),
            status if !status.is_success() => Err(FeedError::Status(status)),
            _ => Ok(response.json::<Listing>().await?),
        }
    }
}

impl Feed for RedditFeed {
    /// Collect up to `limit` top posts, following the listing's `after` cursor
    /// across pages until the limit is reached or the listing runs out.
    async fn top_posts(&self, subreddit: &str, limit: u32) -> Result<Vec<Post>, FeedError> {
        let mut posts = Vec::new();
        let mut after: Option<String> = None;

        while (posts.len() as u32) < limit {
            let remaining = limit - posts.len() as u32;
            let page = self
                .listing_page(subreddit, remaining.min(PAGE_LIMIT), after.as_deref())
                .await?;

            if page.data.children.is_empty() {
                break;
            }

            posts.extend(
                page.data
                    .children
                    .into_iter()
                    .map(|child| Post { url: child.data.url }),
            );

            after = page.data.after;
            if after.is_none() {
                break;
            }
        }

        posts.truncate(limit as usize);
        Ok(posts)
    }
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    after: Option<String>,
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: ChildData,
}

#[derive(Debug, Deserialize)]
struct ChildData {
    url: String,
}
