//! Avatar images from disk or over HTTP(S), decoded once per source.

use ahash::RandomState;
use anyhow::{Context, Result, bail};
use image::DynamicImage;
use log::debug;
use reqwest::blocking::Client as HttpClient;
use reqwest::redirect::Policy;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Where an avatar comes from. Strings starting with `http://` or `https://`
/// are URLs, everything else is a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AvatarSource {
    Path(PathBuf),
    Url(String),
}

impl AvatarSource {
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        let lower = s.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            AvatarSource::Url(s.to_string())
        } else {
            AvatarSource::Path(PathBuf::from(s))
        }
    }
}

impl FromStr for AvatarSource {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for AvatarSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AvatarSource::Path(p) => write!(f, "{}", p.display()),
            AvatarSource::Url(u) => f.write_str(u),
        }
    }
}

/// Fetches and decodes avatars, keeping every decoded image for reuse.
#[derive(Debug)]
pub struct AvatarLoader {
    http: HttpClient,
    cache: Mutex<HashMap<AvatarSource, Arc<DynamicImage>, RandomState>>,
}

impl AvatarLoader {
    pub fn new() -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .redirect(Policy::limited(5))
            .user_agent(concat!("quotecard/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building http client")?;
        Ok(Self {
            http,
            cache: Mutex::new(HashMap::default()),
        })
    }

    /// Decoded image for `source`, loaded on first use.
    pub fn load(&self, source: &AvatarSource) -> Result<Arc<DynamicImage>> {
        if let Some(img) = self.cached(source) {
            return Ok(img);
        }
        let bytes = self.fetch(source)?;
        let img = image::load_from_memory(&bytes)
            .with_context(|| format!("decoding avatar {source}"))?;
        debug!("decoded avatar {source} ({}x{})", img.width(), img.height());
        let img = Arc::new(img);
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(cache.entry(source.clone()).or_insert(img)))
    }

    /// Seed the cache, e.g. with an image already in memory.
    pub fn insert(&self, source: AvatarSource, img: DynamicImage) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(source, Arc::new(img));
    }

    pub fn cached(&self, source: &AvatarSource) -> Option<Arc<DynamicImage>> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(source)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn fetch(&self, source: &AvatarSource) -> Result<Vec<u8>> {
        match source {
            AvatarSource::Path(path) => std::fs::read(path)
                .with_context(|| format!("reading avatar {}", path.display())),
            AvatarSource::Url(url) => self.get(url).with_context(|| format!("GET {url}")),
        }
    }

    fn get(&self, url: &str) -> Result<Vec<u8>> {
        let mut last_err: Option<anyhow::Error> = None;
        for backoff_ms in [100u64, 300, 700] {
            match self.http.get(url).send() {
                Ok(r) if r.status().is_success() => {
                    return Ok(r.bytes().context("reading body")?.to_vec());
                }
                Ok(r) if r.status().is_server_error() => { /* retry */ }
                Ok(r) => bail!("request failed with HTTP {}", r.status()),
                Err(e) => last_err = Some(e.into()),
            }
            std::thread::sleep(Duration::from_millis(backoff_ms));
        }
        bail!("network error: {:?}", last_err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn sources_are_classified() {
        assert_eq!(
            AvatarSource::parse("https://cdn.example.com/a.png"),
            AvatarSource::Url("https://cdn.example.com/a.png".into())
        );
        assert_eq!(
            AvatarSource::parse("HTTP://x/y"),
            AvatarSource::Url("HTTP://x/y".into())
        );
        assert_eq!(
            AvatarSource::parse("./me.png"),
            AvatarSource::Path(PathBuf::from("./me.png"))
        );
    }

    #[test]
    fn files_are_decoded_and_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        RgbImage::from_pixel(4, 3, Rgb([10, 20, 30]))
            .save(&path)
            .unwrap();

        let loader = AvatarLoader::new().unwrap();
        let source = AvatarSource::Path(path.clone());
        let first = loader.load(&source).unwrap();
        assert_eq!((first.width(), first.height()), (4, 3));

        // a cache hit must not touch the file again
        std::fs::remove_file(&path).unwrap();
        let second = loader.load(&source).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.len(), 1);
    }

    #[test]
    fn undecodable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.png");
        std::fs::write(&path, b"not an image").unwrap();
        let loader = AvatarLoader::new().unwrap();
        let err = loader.load(&AvatarSource::Path(path)).unwrap_err();
        assert!(format!("{err:#}").contains("decoding avatar"));
        assert!(loader.is_empty());
    }
}
