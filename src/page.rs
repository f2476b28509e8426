use std::env;
use std::fs;

use html::Document;
use tracing::{span, Level};
use url::Url;

use crate::error::{Error, Result};

/// A saved page loaded from disk
pub struct Page {
    url: Url,
    pub dom: Document,
}

impl Page {
    /// Load and parse a page from a path or a `file://` URL. Remote URLs are refused.
    pub fn open(location: &str) -> Result<Self> {
        let url = resolve_location(location)?;
        let span = span!(Level::DEBUG, "Loading page", "{}", &url);
        let _enter = span.enter();
        let path = url
            .to_file_path()
            .map_err(|_| Error::InvalidPath(location.to_string()))?;
        let text = fs::read_to_string(path)?;
        Ok(Self::from_html(&text, url))
    }

    pub fn from_html(text: &str, url: Url) -> Self {
        Self {
            url,
            dom: Document::parse(text),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// Turn user input into a `file://` URL
fn resolve_location(location: &str) -> Result<Url> {
    match Url::parse(location) {
        Ok(url) if url.scheme() == "file" => Ok(url),
        // A single letter is a Windows drive, not a scheme
        Ok(url) if url.scheme().len() > 1 => Err(Error::UnsupportedScheme(url.to_string())),
        _ => {
            let path = env::current_dir()?.join(location);
            Url::from_file_path(&path).map_err(|_| Error::InvalidPath(location.to_string()))
        }
    }
}
