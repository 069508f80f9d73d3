//! Capabilities a content object exposes to the purge subsystem.

/// Links returned by a custom purge-link provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurgeLinks {
    One(String),
    Many(Vec<String>),
}

impl PurgeLinks {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            PurgeLinks::One(link) => vec![link],
            PurgeLinks::Many(links) => links,
        }
    }
}

impl From<&str> for PurgeLinks {
    fn from(value: &str) -> Self {
        PurgeLinks::One(value.to_string())
    }
}

impl From<String> for PurgeLinks {
    fn from(value: String) -> Self {
        PurgeLinks::One(value)
    }
}

impl From<Vec<String>> for PurgeLinks {
    fn from(value: Vec<String>) -> Self {
        PurgeLinks::Many(value)
    }
}

/// A content object whose cached URLs can be purged.
///
/// Only `object_id` and `is_versioned` are mandatory. The remaining methods
/// are optional capabilities: the default `None` means the object does not
/// expose them.
pub trait PurgeSubject: Send + Sync {
    /// Stable identifier used in logs.
    fn object_id(&self) -> String;

    /// Whether the object has separate draft and live states.
    fn is_versioned(&self) -> bool;

    /// Custom list of site-relative URLs to purge.
    fn purge_links(&self) -> Option<PurgeLinks> {
        None
    }

    /// Canonical site-relative link of the object.
    fn link(&self) -> Option<String> {
        None
    }

    /// Opt-in for purging on a plain write.
    fn purge_on_write(&self) -> Option<bool> {
        None
    }
}

/// Resolve the relative links for `subject`.
///
/// A custom purge-link provider wins over the canonical link; blank entries
/// are dropped.
pub fn resolve_links(subject: &dyn PurgeSubject) -> Vec<String> {
    let links = match subject.purge_links() {
        Some(links) => links.into_vec(),
        None => subject.link().into_iter().collect(),
    };

    links
        .into_iter()
        .filter(|link| !link.trim().is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Page {
        custom: Option<PurgeLinks>,
        link: Option<String>,
    }

    impl PurgeSubject for Page {
        fn object_id(&self) -> String {
            "page".into()
        }

        fn is_versioned(&self) -> bool {
            true
        }

        fn purge_links(&self) -> Option<PurgeLinks> {
            self.custom.clone()
        }

        fn link(&self) -> Option<String> {
            self.link.clone()
        }
    }

    #[test]
    fn custom_links_take_precedence() {
        let page = Page {
            custom: Some(PurgeLinks::Many(vec!["/a".into(), "/b".into()])),
            link: Some("/ignored".into()),
        };
        assert_eq!(resolve_links(&page), vec!["/a", "/b"]);
    }

    #[test]
    fn single_custom_link_is_wrapped() {
        let page = Page {
            custom: Some("/only".into()),
            link: None,
        };
        assert_eq!(resolve_links(&page), vec!["/only"]);
    }

    #[test]
    fn falls_back_to_canonical_link() {
        let page = Page {
            custom: None,
            link: Some("/news/1".into()),
        };
        assert_eq!(resolve_links(&page), vec!["/news/1"]);
    }

    #[test]
    fn no_capability_yields_no_links() {
        let page = Page {
            custom: None,
            link: None,
        };
        assert!(resolve_links(&page).is_empty());
    }

    #[test]
    fn blank_links_are_dropped() {
        let page = Page {
            custom: Some(PurgeLinks::Many(vec!["".into(), "  ".into()])),
            link: Some("/fallback".into()),
        };
        assert!(resolve_links(&page).is_empty());
    }
}
