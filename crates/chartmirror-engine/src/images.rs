//! Image reference extraction from rendered manifests

use crate::chart_renderer::Manifests;

/// Marker that identifies an image declaration line
pub const IMAGE_MARKER: &str = "image:";

/// Clean one `image:` line down to the bare reference
///
/// The steps run in a fixed order: drop at most two double quotes, trim,
/// drop one leading `-` (list item), trim, drop the `image: ` key, trim.
///
/// ```
/// use chartmirror_engine::sanitize_image;
///
/// assert_eq!(sanitize_image(r#"  - image: "nginx:1.25""#), "nginx:1.25");
/// ```
pub fn sanitize_image(line: &str) -> String {
    let mut unquoted = String::with_capacity(line.len());
    let mut quotes_left = 2;
    for c in line.chars() {
        if c == '"' && quotes_left > 0 {
            quotes_left -= 1;
            continue;
        }
        unquoted.push(c);
    }

    let trimmed = unquoted.trim();
    let trimmed = trimmed.strip_prefix('-').unwrap_or(trimmed).trim();
    let trimmed = trimmed.strip_prefix("image: ").unwrap_or(trimmed).trim();
    trimmed.to_string()
}

/// Accumulates image references in discovery order
///
/// The buffer is append-only and keeps duplicates.
#[derive(Debug, Default, Clone)]
pub struct ImageScanner {
    images: Vec<String>,
}

impl ImageScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan one rendered document line by line
    pub fn scan_document(&mut self, document: &str) -> usize {
        let before = self.images.len();
        self.images.extend(
            document
                .lines()
                .filter(|line| line.contains(IMAGE_MARKER))
                .map(sanitize_image),
        );
        self.images.len() - before
    }

    /// Scan every document of a rendered chart, in document order
    pub fn scan_manifests(&mut self, manifests: &Manifests) -> usize {
        manifests
            .iter()
            .map(|(name, document)| {
                let found = self.scan_document(document);
                if found > 0 {
                    tracing::debug!(document = %name, images = found, "found image references");
                }
                found
            })
            .sum()
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn into_images(self) -> Vec<String> {
        self.images
    }
}
