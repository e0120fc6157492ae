//! Reload policy: which changed files warrant a rebuild and a notification.

use std::path::Path;

/// Suffixes that warrant a reload under the default policy.
const MARKUP_EXTENSIONS: &[&str] = &[
    "html", "htm", "tmpl", "tera", "hbs", "css", "scss", "sass",
];

/// Decides, per changed path, whether to rebuild and notify clients.
///
/// Applied after debouncing; paths rejected here trigger neither the rebuild
/// callback nor a broadcast.
#[derive(Debug, Clone, Default)]
pub enum ReloadPolicy {
    /// Accept template/markup/style suffixes (the default).
    #[default]
    Markup,
    /// Accept every change unconditionally.
    All,
    /// Accept only the given extensions (compared case-insensitively,
    /// without the leading dot).
    Extensions(Vec<String>),
}

impl ReloadPolicy {
    /// Whether a change to `path` warrants a reload.
    pub fn accepts(&self, path: &Path) -> bool {
        match self {
            Self::All => true,
            Self::Markup => Self::has_extension(path, MARKUP_EXTENSIONS.iter().copied()),
            Self::Extensions(exts) => {
                Self::has_extension(path, exts.iter().map(String::as_str))
            }
        }
    }

    fn has_extension<'a>(path: &Path, mut extensions: impl Iterator<Item = &'a str>) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        extensions.any(|candidate| candidate.eq_ignore_ascii_case(ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_markup_accepts_templates_and_styles() {
        let policy = ReloadPolicy::Markup;
        assert!(policy.accepts(&PathBuf::from("/views/index.html")));
        assert!(policy.accepts(&PathBuf::from("/views/base.tera")));
        assert!(policy.accepts(&PathBuf::from("/assets/site.css")));
        assert!(policy.accepts(&PathBuf::from("/views/UPPER.HTML")));
    }

    #[test]
    fn test_markup_rejects_other_suffixes() {
        let policy = ReloadPolicy::Markup;
        assert!(!policy.accepts(&PathBuf::from("/assets/logo.png")));
        assert!(!policy.accepts(&PathBuf::from("/src/main.rs")));
        assert!(!policy.accepts(&PathBuf::from("/views/Makefile")));
    }

    #[test]
    fn test_all_accepts_everything() {
        let policy = ReloadPolicy::All;
        assert!(policy.accepts(&PathBuf::from("/assets/logo.png")));
        assert!(policy.accepts(&PathBuf::from("/no/extension")));
    }

    #[test]
    fn test_custom_extensions() {
        let policy = ReloadPolicy::Extensions(vec!["md".into(), "typ".into()]);
        assert!(policy.accepts(&PathBuf::from("/content/post.md")));
        assert!(policy.accepts(&PathBuf::from("/content/index.typ")));
        assert!(!policy.accepts(&PathBuf::from("/views/index.html")));
    }
}
