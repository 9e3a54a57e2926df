use futures::stream::{self, BoxStream, StreamExt};

use crate::resolver::ResolverRegistry;

/// Extensions that already name a single retrievable file; such URLs need no
/// resolver.
const DIRECT_EXTENSIONS: [&str; 5] = ["jpeg", "jpg", "gif", "png", "webm"];

/// Whether the URL references a file directly, judging only by its extension.
pub fn is_direct_file(url: &str) -> bool {
    let url = url.to_ascii_lowercase();
    DIRECT_EXTENSIONS
        .iter()
        .any(|ext| url.ends_with(&format!(".{ext}")))
}

/// Expand a submission URL into a stream of direct-file URLs.
///
/// Direct files pass through unchanged, provider pages go through the matching
/// resolver, and anything else contributes no candidates. A post that cannot
/// be classified is logged and skipped, never an error.
pub fn classify_and_expand(
    registry: &ResolverRegistry,
    url: &str,
) -> BoxStream<'static, String> {
    // Legacy animated-gallery links point at a wrapper page; the .webm
    // sibling is the actual file.
    let url = url.replace(".gifv", ".webm");

    if is_direct_file(&url) {
        return stream::iter([url]).boxed();
    }

    match registry.find(&url) {
        Some(resolver) => {
            tracing::debug!("resolving {url} via {}", resolver.name());
            resolver.resolve(&url)
        }
        None => {
            tracing::info!("no handler for {url}");
            stream::empty().boxed()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use reqwest::Client;

    fn registry() -> ResolverRegistry {
        ResolverRegistry::with_default_hosts(Client::new())
    }

    #[test]
    fn test_is_direct_file_known_extensions() {
        for ext in DIRECT_EXTENSIONS {
            assert!(is_direct_file(&format!("http://host/file.{ext}")), "{ext}");
        }
        assert!(is_direct_file("http://host/FILE.PNG"));
        assert!(!is_direct_file("http://host/page"));
        assert!(!is_direct_file("http://host/clip.mp4"));
    }

    #[tokio::test]
    async fn test_direct_url_passes_through_unchanged() {
        let registry = registry();
        let urls: Vec<String> = classify_and_expand(&registry, "http://i.imgur.com/abc.png")
            .collect()
            .await;
        assert_eq!(urls, vec!["http://i.imgur.com/abc.png"]);
    }

    #[tokio::test]
    async fn test_gifv_normalizes_to_webm() {
        let registry = registry();
        let urls: Vec<String> = classify_and_expand(&registry, "http://i.imgur.com/abc123.gifv")
            .collect()
            .await;
        assert_eq!(urls, vec!["http://i.imgur.com/abc123.webm"]);
    }

    #[tokio::test]
    async fn test_unknown_host_yields_nothing() {
        let registry = registry();
        let urls: Vec<String> =
            classify_and_expand(&registry, "https://example.com/some/article")
                .collect()
                .await;
        assert!(urls.is_empty());
    }
}
