//! Media URL utilities.

use url::Url;

/// Hosts that accept the `name`/`format` rendition query parameters.
const QUALITY_PARAM_HOSTS: &[&str] = &["pbs.twimg.com"];

/// Default photo extension when neither the URL nor its query names one.
const DEFAULT_PHOTO_EXTENSION: &str = "jpg";

/// Transport used by a video source URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoTransport {
    /// HLS playlist, must be converted to MP4.
    Hls,
    /// Progressive MP4, downloaded directly.
    Mp4,
    Unsupported,
}

impl VideoTransport {
    /// Classify a video URL. The HLS marker wins over any `.mp4` appearing elsewhere.
    pub fn classify(url: &str) -> Self {
        if url.contains(".m3u8") {
            return VideoTransport::Hls;
        }

        let is_mp4 = url.ends_with(".mp4")
            || extract_extension_from_url(url).as_deref() == Some("mp4");
        if is_mp4 {
            VideoTransport::Mp4
        } else {
            VideoTransport::Unsupported
        }
    }
}

/// Rewrite a photo URL to request the original-quality rendition.
///
/// Any existing `name` parameter is dropped, a `format` parameter is added from the
/// original extension when missing, and `name=orig` is appended. Applying this twice
/// yields the same URL. Hosts without rendition support are returned untouched.
pub fn rewrite_photo_url(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return raw.to_string();
    };

    let supported = url
        .host_str()
        .map(|host| QUALITY_PARAM_HOSTS.contains(&host))
        .unwrap_or(false);
    if !supported {
        return raw.to_string();
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "name")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    let has_format = pairs.iter().any(|(key, _)| key == "format");
    let path_extension = extract_extension_from_url(raw);

    {
        let mut query = url.query_pairs_mut();
        query.clear();
        for (key, value) in &pairs {
            query.append_pair(key, value);
        }
        if !has_format {
            if let Some(ext) = path_extension.as_deref() {
                query.append_pair("format", ext);
            }
        }
        query.append_pair("name", "orig");
    }

    url.to_string()
}

/// File extension to use for a photo URL.
///
/// Prefers the `format` query parameter, then the path extension. Only extensions that
/// map to an image MIME type are accepted.
pub fn photo_extension(raw: &str) -> String {
    let from_query = Url::parse(raw).ok().and_then(|url| {
        url.query_pairs()
            .find(|(key, _)| key == "format")
            .map(|(_, value)| value.to_lowercase())
    });

    from_query
        .or_else(|| extract_extension_from_url(raw))
        .filter(|ext| is_image_extension(ext))
        .unwrap_or_else(|| DEFAULT_PHOTO_EXTENSION.to_string())
}

fn is_image_extension(ext: &str) -> bool {
    mime_guess::from_ext(ext)
        .first()
        .map(|mime| mime.type_().as_str() == "image")
        .unwrap_or(false)
}

/// Extract extension from URL path.
pub fn extract_extension_from_url(url: &str) -> Option<String> {
    // Remove query string
    let path = url.split(['?', '#']).next()?;

    // Get the last segment
    let filename = path.rsplit('/').next()?;
    if !filename.contains('.') {
        return None;
    }

    // Get extension
    let ext = filename.rsplit('.').next()?;

    // Validate it looks like an extension (1-10 chars, alphanumeric)
    if !ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(ext.to_lowercase())
    } else {
        None
    }
}
