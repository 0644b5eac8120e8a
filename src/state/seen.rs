use std::collections::HashSet;
use std::sync::Mutex;
use url::Url;

/// Process-wide set of canonical URLs already enqueued or saved
///
/// The only mutation is [`SeenSet::try_claim`], a check-and-insert under one
/// lock, so two workers can never both claim the same URL.
#[derive(Debug, Default)]
pub struct SeenSet {
    urls: Mutex<HashSet<String>>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `url` as seen; returns false if it already was
    pub fn try_claim(&self, url: &Url) -> bool {
        let mut urls = self.urls.lock().unwrap_or_else(|e| e.into_inner());
        urls.insert(url.as_str().to_string())
    }

    pub fn contains(&self, url: &Url) -> bool {
        let urls = self.urls.lock().unwrap_or_else(|e| e.into_inner());
        urls.contains(url.as_str())
    }

    pub fn len(&self) -> usize {
        self.urls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
