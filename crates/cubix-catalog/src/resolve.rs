//! Case resolution with formatting tolerance
//!
//! User input arrives with inconsistent zero-padding ("Caso 5" vs
//! "Caso 05"). Resolution applies an ordered list of candidate labels and
//! takes the first hit, against the catalog for algorithms and against the
//! asset namespace for images.

use crate::{Catalog, Category};
use std::path::PathBuf;

const CASE_PREFIX: &str = "Caso ";

/// Canonical textual form of numeric case N: unpadded below 10, two-digit
/// zero-padded from 10 up. The asymmetry is load-bearing: it decides which
/// catalog keys numeric input reaches.
pub fn canonical_label(n: i64) -> String {
    if (1..=9).contains(&n) {
        format!("Caso {}", n)
    } else {
        format!("Caso {:02}", n)
    }
}

/// Ordered catalog-key candidates for a raw label: the label itself, then
/// the zero-padded or zero-stripped variant of its numeric suffix.
pub fn label_candidates(raw: &str) -> Vec<String> {
    let mut candidates = vec![raw.to_string()];
    if let Some(suffix) = raw.strip_prefix(CASE_PREFIX) {
        if suffix.len() == 1 {
            candidates.push(format!("Caso 0{}", suffix));
        } else if let Some(stripped) = suffix.strip_prefix('0') {
            candidates.push(format!("Caso {}", stripped));
        }
    }
    candidates
}

/// Total: malformed input yields `None`, never an error.
pub fn resolve_algorithm<'a>(catalog: &'a Catalog, category: Category, raw: &str) -> Option<&'a str> {
    label_candidates(raw)
        .iter()
        .find_map(|label| catalog.lookup(category, label))
}

/// Ordered image file-name candidates. The primary name keeps the space of
/// the case label ("F2L_Caso 31.png") while the fallbacks use underscores;
/// both forms exist in the asset tree.
pub fn image_candidates(category: Category, raw: &str) -> Vec<String> {
    let cat = category.as_str();
    let mut names = Vec::new();
    let mut push = |name: String| {
        if !names.contains(&name) {
            names.push(name);
        }
    };

    if let Some(suffix) = raw.strip_prefix(CASE_PREFIX) {
        push(format!("{}_{}.png", cat, raw));
        if suffix.len() == 1 {
            push(format!("{}_Caso_0{}.png", cat, suffix));
        } else if let Some(stripped) = suffix.strip_prefix('0') {
            push(format!("{}_Caso_{}.png", cat, stripped));
        }
    } else {
        push(format!("{}_Caso_{}.png", cat, raw));
        if category == Category::Pll {
            // Direct letter-named lookup, e.g. PLL_Caso_UA.png.
            push(format!("{}_Caso_{}.png", cat, raw));
        }
    }

    names
}

/// Existence-check view over the image asset tree. The resolver never reads
/// asset bytes; the transport does.
#[async_trait::async_trait]
pub trait AssetNamespace: Send + Sync {
    async fn contains(&self, category: Category, file_name: &str) -> bool;

    /// Reference handed to the transport for a file known to exist.
    fn asset_ref(&self, category: Category, file_name: &str) -> String;
}

/// Filesystem-backed namespace: `{root}/{CATEGORY}/{file}`.
#[derive(Debug, Clone)]
pub struct ImageDir {
    root: PathBuf,
}

impl ImageDir {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    fn path_of(&self, category: Category, file_name: &str) -> PathBuf {
        self.root.join(category.as_str()).join(file_name)
    }
}

#[async_trait::async_trait]
impl AssetNamespace for ImageDir {
    async fn contains(&self, category: Category, file_name: &str) -> bool {
        matches!(
            tokio::fs::try_exists(self.path_of(category, file_name)).await,
            Ok(true)
        )
    }

    fn asset_ref(&self, category: Category, file_name: &str) -> String {
        self.path_of(category, file_name).display().to_string()
    }
}

/// Total, like [`resolve_algorithm`]: returns the asset reference of the
/// first candidate present in the namespace.
pub async fn resolve_image(
    assets: &dyn AssetNamespace,
    category: Category,
    raw: &str,
) -> Option<String> {
    for name in image_candidates(category, raw) {
        if assets.contains(category, &name).await {
            return Some(assets.asset_ref(category, &name));
        }
    }
    None
}
