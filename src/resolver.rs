use std::collections::HashSet;
use std::sync::LazyLock;

use futures::stream::{self, BoxStream, StreamExt};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;

use crate::classify::is_direct_file;

/// Turns a hosting provider's page URL into zero or more direct-file URLs.
///
/// Resolvers produce a pull-based stream so the caller can stop consuming
/// early. Network or parse failures inside a resolver log a warning and end
/// the stream; they never propagate to the orchestrator.
pub trait HostResolver: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &'static str;

    /// Whether this resolver recognizes the URL's host.
    fn handles(&self, url: &str) -> bool;

    fn resolve(&self, url: &str) -> BoxStream<'static, String>;
}

/// Provider dispatch table. New hosts register independently; nothing else
/// needs to change to support one.
#[derive(Default)]
pub struct ResolverRegistry {
    resolvers: Vec<Box<dyn HostResolver>>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in host wired to the shared HTTP client.
    pub fn with_default_hosts(client: Client) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ImgurResolver::new(client.clone())));
        registry.register(Box::new(GfycatResolver::new(client)));
        registry
    }

    pub fn register(&mut self, resolver: Box<dyn HostResolver>) {
        self.resolvers.push(resolver);
    }

    pub fn find(&self, url: &str) -> Option<&dyn HostResolver> {
        self.resolvers
            .iter()
            .find(|r| r.handles(url))
            .map(Box::as_ref)
    }
}

/// Direct `i.imgur.com` links embedded in an album page, including
/// JSON-escaped slashes and stray numeric query suffixes.
static IMGUR_DIRECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?:(?:\\?/){2}i\.imgur\.com\\?/[A-Za-z0-9]+\.(?:jpe?g|png|gif|webm)(?:\?\w*)?")
        .expect("IMGUR_DIRECT regex")
});

/// Imgur: albums and galleries expand to one URL per contained image; single
/// image pages rewrite to the direct host without a network call.
pub struct ImgurResolver {
    client: Client,
}

impl ImgurResolver {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn album_images(client: Client, page_url: String) -> Vec<String> {
        let response = match client.get(&page_url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("failed to fetch imgur album {page_url}: {e}");
                return Vec::new();
            }
        };

        let html = match response.text().await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("failed to read imgur album {page_url}: {e}");
                return Vec::new();
            }
        };

        extract_album_images(&html)
    }
}

impl HostResolver for ImgurResolver {
    fn name(&self) -> &'static str {
        "imgur"
    }

    fn handles(&self, url: &str) -> bool {
        url.contains("imgur")
    }

    fn resolve(&self, url: &str) -> BoxStream<'static, String> {
        let url = url.trim_end_matches('/').to_string();

        if url.contains("/a/") || url.contains("/gallery/") {
            let client = self.client.clone();
            stream::once(Self::album_images(client, url))
                .flat_map(stream::iter)
                .boxed()
        } else {
            // imgur.com/<id> maps straight onto i.imgur.com/<id>.jpg; the
            // direct host serves the image regardless of its real format.
            match single_image_url(&url) {
                Some(direct) => stream::iter([direct]).boxed(),
                None => {
                    tracing::warn!("unrecognized imgur url shape: {url}");
                    stream::empty().boxed()
                }
            }
        }
    }
}

/// Every direct image link in an album page, deduplicated in document order.
fn extract_album_images(html: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    IMGUR_DIRECT
        .find_iter(html)
        .map(|m| strip_query_suffix(&m.as_str().replace("\\/", "/")))
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// Imgur sometimes appends a stray query such as `.jpg?1`; truncate it so the
/// filename derived from the URL stays clean.
fn strip_query_suffix(url: &str) -> String {
    if let Some(pos) = url.find('?')
        && is_direct_file(&url[..pos])
    {
        return url[..pos].to_string();
    }
    url.to_string()
}

fn single_image_url(page_url: &str) -> Option<String> {
    let id = page_url.rsplit('/').next()?;
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(format!("https://i.imgur.com/{id}.jpg"))
}

#[derive(Debug, Deserialize)]
struct GfycatResponse {
    #[serde(rename = "gfyItem")]
    gfy_item: GfyItem,
}

#[derive(Debug, Deserialize)]
struct GfyItem {
    #[serde(rename = "webmUrl")]
    webm_url: String,
}

/// Gfycat: the metadata endpoint yields exactly one canonical video URL.
///
/// The produced extension is always `.webm`, which the downloader rejects as
/// animated content, so gfycat posts can never produce a match. This mirrors
/// the historical behavior; extracting a still frame would need a decision on
/// which frame is representative.
pub struct GfycatResolver {
    client: Client,
}

impl GfycatResolver {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn video_url(client: Client, page_url: String) -> Vec<String> {
        let Some(id) = gfycat_id(&page_url) else {
            tracing::warn!("unrecognized gfycat url shape: {page_url}");
            return Vec::new();
        };

        let api_url = format!("https://api.gfycat.com/v1/gfycats/{id}");
        let response = match client.get(&api_url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("failed to fetch gfycat metadata for {page_url}: {e}");
                return Vec::new();
            }
        };

        match response.json::<GfycatResponse>().await {
            Ok(body) => vec![body.gfy_item.webm_url],
            Err(e) => {
                tracing::warn!("failed to parse gfycat metadata for {page_url}: {e}");
                Vec::new()
            }
        }
    }
}

impl HostResolver for GfycatResolver {
    fn name(&self) -> &'static str {
        "gfycat"
    }

    fn handles(&self, url: &str) -> bool {
        url.contains("gfycat")
    }

    fn resolve(&self, url: &str) -> BoxStream<'static, String> {
        let client = self.client.clone();
        stream::once(Self::video_url(client, url.to_string()))
            .flat_map(stream::iter)
            .boxed()
    }
}

/// Detail pages look like `gfycat.com/AdjectiveAdjectiveAnimal`, sometimes
/// with a readable slug appended after a dash.
fn gfycat_id(page_url: &str) -> Option<String> {
    let segment = page_url.trim_end_matches('/').rsplit('/').next()?;
    let id = segment.split('-').next()?;
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(id.to_string())
}
