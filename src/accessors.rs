//! Caption and image URL helpers
//!
//! Fixed key layout and TTL for the two cached operations of the content
//! generator: caption lists per topic, and rendered image URLs per template
//! and overlay text.

use crate::error::Result;
use crate::facade::ContentCache;
use crate::keys::build_key;

pub const CAPTIONS_NAMESPACE: &str = "captions";
/// Captions are cheap to regenerate and go stale quickly.
pub const CAPTIONS_TTL_SECONDS: u64 = 300;

pub const IMAGE_NAMESPACE: &str = "image";
pub const IMAGE_URL_TTL_SECONDS: u64 = 86_400;

// == Keys ==
/// `cache:captions:<topic>[:<template>]`.
///
/// A whitespace-only template id is treated the same as `None`: it would
/// normalize to an empty segment, so `Some("  ")` and `None` share one key.
pub fn captions_key(topic: &str, template_id: Option<&str>) -> String {
    match template_id.filter(|id| !id.trim().is_empty()) {
        Some(id) => build_key(CAPTIONS_NAMESPACE, &[topic, id]),
        None => build_key(CAPTIONS_NAMESPACE, &[topic]),
    }
}

/// `cache:image:<template>:<top>:<bottom>`. Empty texts keep their segment.
pub fn image_url_key(template_id: &str, top_text: &str, bottom_text: &str) -> String {
    build_key(IMAGE_NAMESPACE, &[template_id, top_text, bottom_text])
}

impl ContentCache {
    // == Captions ==
    pub async fn get_captions(&self, topic: &str, template_id: Option<&str>) -> Option<Vec<String>> {
        self.get(&captions_key(topic, template_id)).await
    }

    pub async fn set_captions(
        &self,
        topic: &str,
        template_id: Option<&str>,
        captions: &[String],
    ) -> Result<()> {
        self.set(
            &captions_key(topic, template_id),
            captions,
            CAPTIONS_TTL_SECONDS,
        )
        .await
    }

    // == Image URLs ==
    pub async fn get_image_url(
        &self,
        template_id: &str,
        top_text: &str,
        bottom_text: &str,
    ) -> Option<String> {
        self.get(&image_url_key(template_id, top_text, bottom_text))
            .await
    }

    pub async fn set_image_url(
        &self,
        template_id: &str,
        top_text: &str,
        bottom_text: &str,
        url: &str,
    ) -> Result<()> {
        self.set(
            &image_url_key(template_id, top_text, bottom_text),
            url,
            IMAGE_URL_TTL_SECONDS,
        )
        .await
    }
}
