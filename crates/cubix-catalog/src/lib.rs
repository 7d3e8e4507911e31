//! Cubix Catalog
//!
//! Algorithm catalog loaded from `algs.json`, plus the static group index
//! for the two categories that browse by group

pub mod resolve;

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// The three algorithm categories of the CFOP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    F2l,
    Oll,
    Pll,
}

impl Category {
    /// Tag used as top-level key in `algs.json` and as image directory name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::F2l => "F2L",
            Category::Oll => "OLL",
            Category::Pll => "PLL",
        }
    }

    /// Highest numeric case for categories indexed by number.
    /// PLL cases are letter-named, so it has no numeric range.
    pub fn numeric_case_count(&self) -> Option<i64> {
        match self {
            Category::F2l => Some(41),
            Category::Oll => Some(57),
            Category::Pll => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse catalog document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("empty algorithm notation for {category} case '{label}'")]
    EmptyNotation { category: Category, label: String },
}

#[derive(Debug, Default, Deserialize)]
struct CatalogDocument {
    #[serde(rename = "F2L", default)]
    f2l: BTreeMap<String, String>,
    #[serde(rename = "OLL", default)]
    oll: BTreeMap<String, String>,
    #[serde(rename = "PLL", default)]
    pll: BTreeMap<String, String>,
}

/// Immutable case label -> algorithm notation mapping per category.
///
/// A category key absent from the source document yields an empty map, not
/// an error. Entries with empty notation are rejected at load time.
#[derive(Debug, Default)]
pub struct Catalog {
    f2l: BTreeMap<String, String>,
    oll: BTreeMap<String, String>,
    pll: BTreeMap<String, String>,
}

impl Catalog {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| CatalogError::Io {
            path: path.as_ref().display().to_string(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self, CatalogError> {
        let doc: CatalogDocument = serde_json::from_str(content)?;
        let catalog = Self {
            f2l: doc.f2l,
            oll: doc.oll,
            pll: doc.pll,
        };
        catalog.check_notations()?;
        Ok(catalog)
    }

    fn check_notations(&self) -> Result<(), CatalogError> {
        for category in [Category::F2l, Category::Oll, Category::Pll] {
            for (label, notation) in self.cases(category) {
                if notation.trim().is_empty() {
                    return Err(CatalogError::EmptyNotation {
                        category,
                        label: label.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn cases(&self, category: Category) -> &BTreeMap<String, String> {
        match category {
            Category::F2l => &self.f2l,
            Category::Oll => &self.oll,
            Category::Pll => &self.pll,
        }
    }

    /// Exact-key lookup. Formatting tolerance lives in [`resolve`].
    pub fn lookup(&self, category: Category, label: &str) -> Option<&str> {
        self.cases(category).get(label).map(String::as_str)
    }

    pub fn contains(&self, category: Category, label: &str) -> bool {
        self.cases(category).contains_key(label)
    }

    pub fn case_labels(&self, category: Category) -> impl Iterator<Item = &str> {
        self.cases(category).keys().map(String::as_str)
    }

    pub fn case_count(&self, category: Category) -> usize {
        self.cases(category).len()
    }
}

/// One named sub-group of cases inside a category.
#[derive(Debug, Clone, Copy)]
pub struct CaseGroup {
    pub name: &'static str,
    pub cases: &'static [&'static str],
}

impl CaseGroup {
    pub fn contains(&self, label: &str) -> bool {
        self.cases.iter().any(|case| *case == label)
    }
}

// Fixed curation data. Some listed labels may be absent from the loaded
// catalog; they are kept as-is and surface as "not found" on lookup.
const F2L_GROUPS: &[CaseGroup] = &[
    CaseGroup {
        name: "Canto e Aresta Corretamente Orientados",
        cases: &["Caso 1", "Caso 2", "Caso 3", "Caso 4"],
    },
    CaseGroup {
        name: "Canto Orientado, Aresta Mal Orientada",
        cases: &[
            "Caso 5", "Caso 6", "Caso 7", "Caso 8", "Caso 9", "Caso 10", "Caso 11", "Caso 12",
        ],
    },
    CaseGroup {
        name: "Canto Mal Orientado, Aresta Orientada",
        cases: &[
            "Caso 13", "Caso 14", "Caso 15", "Caso 16", "Caso 17", "Caso 18", "Caso 19", "Caso 20",
        ],
    },
    CaseGroup {
        name: "Canto e Aresta Mal Orientados",
        cases: &[
            "Caso 21", "Caso 22", "Caso 23", "Caso 24", "Caso 25", "Caso 26", "Caso 27", "Caso 28",
        ],
    },
    CaseGroup {
        name: "Casos com Slot Preenchido",
        cases: &[
            "Caso 29", "Caso 30", "Caso 31", "Caso 32", "Caso 33", "Caso 34", "Caso 35", "Caso 36",
        ],
    },
    CaseGroup {
        name: "Casos Avançados",
        cases: &["Caso 37", "Caso 38", "Caso 39", "Caso 40", "Caso 41"],
    },
];

const OLL_GROUPS: &[CaseGroup] = &[
    CaseGroup {
        name: "Todos os Cantos Orientados",
        cases: &[
            "Caso 1", "Caso 2", "Caso 3", "Caso 4", "Caso 5", "Caso 6", "Caso 7", "Caso 8",
        ],
    },
    CaseGroup {
        name: "Linha na Face Superior",
        cases: &["Caso 9", "Caso 10", "Caso 11", "Caso 12", "Caso 13", "Caso 14"],
    },
    CaseGroup {
        name: "Dot na Face Superior",
        cases: &[
            "Caso 15", "Caso 16", "Caso 17", "Caso 18", "Caso 19", "Caso 20", "Caso 21",
        ],
    },
    CaseGroup {
        name: "Cantos em L",
        cases: &["Caso 22", "Caso 23", "Caso 24", "Caso 25", "Caso 26", "Caso 27"],
    },
    CaseGroup {
        name: "Padrões de Cruz",
        cases: &["Caso 28", "Caso 29", "Caso 30", "Caso 31", "Caso 32", "Caso 33"],
    },
    CaseGroup {
        name: "Padrões em T",
        cases: &["Caso 34", "Caso 35", "Caso 36", "Caso 37", "Caso 38", "Caso 39"],
    },
    CaseGroup {
        name: "Padrões em W",
        cases: &["Caso 40", "Caso 41", "Caso 42", "Caso 43", "Caso 44", "Caso 45"],
    },
    CaseGroup {
        name: "Padrões em P",
        cases: &["Caso 46", "Caso 47", "Caso 48", "Caso 49", "Caso 50", "Caso 51"],
    },
    CaseGroup {
        name: "Padrões Avançados",
        cases: &["Caso 52", "Caso 53", "Caso 54", "Caso 55", "Caso 56", "Caso 57"],
    },
];

/// Ordered sub-group tables for the categories that have them.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupIndex;

impl GroupIndex {
    pub fn groups_of(category: Category) -> &'static [CaseGroup] {
        match category {
            Category::F2l => F2L_GROUPS,
            Category::Oll => OLL_GROUPS,
            Category::Pll => &[],
        }
    }

    /// 1-based, as shown in the category menus.
    pub fn group_at(category: Category, index: i64) -> Option<&'static CaseGroup> {
        if index < 1 {
            return None;
        }
        Self::groups_of(category).get(index as usize - 1)
    }

    pub fn group_named(category: Category, name: &str) -> Option<&'static CaseGroup> {
        Self::groups_of(category)
            .iter()
            .find(|group| group.name == name)
    }
}
