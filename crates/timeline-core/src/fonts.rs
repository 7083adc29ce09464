//! Font resolution for overlay rendering.
//!
//! Overlays name a family and a weight; the transcoder needs a font file.
//! Resolution cascades from the requested weight to the family's regular
//! weight to a universal fallback face, so it always yields a path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use splice_common::config::FontConfig;
use splice_project_model::overlay::FontWeight;

/// Families bundled with the render image, with their file stem.
const BUNDLED_FAMILIES: &[(&str, &str)] = &[
    ("Inter", "Inter"),
    ("Montserrat", "Montserrat"),
    ("Roboto", "Roboto"),
    ("Playfair Display", "PlayfairDisplay"),
    ("Oswald", "Oswald"),
    ("Open Sans", "OpenSans"),
    ("Lato", "Lato"),
    ("Poppins", "Poppins"),
];

/// Families that ship without a light cut; their light slot maps to regular.
const NO_LIGHT_VARIANT: &[&str] = &["Playfair Display"];

/// How a font request was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FontSource {
    Requested,
    RegularWeight,
    UniversalFallback,
}

/// A concrete font file for a family/weight request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedFont {
    pub path: PathBuf,
    pub source: FontSource,
}

/// Maps a family and weight to a renderable font file. Never fails.
pub trait FontResolver: Send + Sync {
    fn resolve(&self, family: &str, weight: FontWeight) -> ResolvedFont;
}

/// Decides whether a font file is usable.
pub trait FontProbe: Send + Sync {
    fn is_usable(&self, path: &Path) -> bool;
}

/// Probe backed by the filesystem: the file exists and is larger than a
/// minimum size (small files are usually saved error pages).
#[derive(Debug, Clone)]
pub struct FsFontProbe {
    pub min_valid_bytes: u64,
}

impl FontProbe for FsFontProbe {
    fn is_usable(&self, path: &Path) -> bool {
        std::fs::metadata(path)
            .map(|meta| meta.is_file() && meta.len() > self.min_valid_bytes)
            .unwrap_or(false)
    }
}

/// Availability of one catalog entry.
#[derive(Debug, Clone, Serialize)]
pub struct FontAvailability {
    /// `weight/Family` or `fallback/<stem>`.
    pub name: String,
    pub path: PathBuf,
    pub exists: bool,
    pub size_bytes: u64,
    pub valid: bool,
}

/// Family/weight table plus fallback faces.
pub struct FontCatalog<P: FontProbe = FsFontProbe> {
    entries: HashMap<(String, FontWeight), PathBuf>,
    fallback_regular: PathBuf,
    fallback_bold: PathBuf,
    probe: P,
}

impl FontCatalog<FsFontProbe> {
    /// The bundled families laid out under `config.font_dir` as
    /// `<Stem>-<Regular|Bold|Light>.ttf`.
    pub fn standard(config: &FontConfig) -> Self {
        Self::with_bundled_families(
            config,
            FsFontProbe {
                min_valid_bytes: config.min_valid_bytes,
            },
        )
    }
}

impl<P: FontProbe> FontCatalog<P> {
    /// An empty catalog that only knows the fallback faces.
    pub fn new(fallback_regular: impl Into<PathBuf>, fallback_bold: impl Into<PathBuf>, probe: P) -> Self {
        Self {
            entries: HashMap::new(),
            fallback_regular: fallback_regular.into(),
            fallback_bold: fallback_bold.into(),
            probe,
        }
    }

    /// The bundled families with a custom probe.
    pub fn with_bundled_families(config: &FontConfig, probe: P) -> Self {
        let mut catalog = Self::new(
            config.fallback_regular.clone(),
            config.fallback_bold.clone(),
            probe,
        );
        for (family, stem) in BUNDLED_FAMILIES {
            let file = |cut: &str| config.font_dir.join(format!("{stem}-{cut}.ttf"));
            catalog.insert(family, FontWeight::Normal, file("Regular"));
            catalog.insert(family, FontWeight::Bold, file("Bold"));
            let light = if NO_LIGHT_VARIANT.contains(family) {
                file("Regular")
            } else {
                file("Light")
            };
            catalog.insert(family, FontWeight::Light, light);
        }
        catalog
    }

    /// Register a font file for a family and weight.
    pub fn insert(&mut self, family: &str, weight: FontWeight, path: impl Into<PathBuf>) {
        self.entries.insert((family.to_string(), weight), path.into());
    }

    fn lookup(&self, family: &str, weight: FontWeight) -> Option<&PathBuf> {
        self.entries.get(&(family.to_string(), weight))
    }

    fn fallback_for(&self, weight: FontWeight) -> &PathBuf {
        match weight {
            FontWeight::Bold => &self.fallback_bold,
            FontWeight::Normal | FontWeight::Light => &self.fallback_regular,
        }
    }

    /// Availability of every catalog entry and both fallbacks, sorted by name.
    pub fn availability(&self) -> Vec<FontAvailability> {
        let mut report: Vec<FontAvailability> = self
            .entries
            .iter()
            .map(|((family, weight), path)| {
                let weight = match weight {
                    FontWeight::Normal => "regular",
                    other => other.as_str(),
                };
                self.describe(format!("{weight}/{family}"), path)
            })
            .collect();

        for path in [&self.fallback_regular, &self.fallback_bold] {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            report.push(self.describe(format!("fallback/{stem}"), path));
        }

        report.sort_by(|a, b| a.name.cmp(&b.name));
        report.dedup_by(|a, b| a.name == b.name);
        report
    }

    fn describe(&self, name: String, path: &Path) -> FontAvailability {
        let size_bytes = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        FontAvailability {
            name,
            path: path.to_path_buf(),
            exists: path.exists(),
            size_bytes,
            valid: self.probe.is_usable(path),
        }
    }
}

impl<P: FontProbe> FontResolver for FontCatalog<P> {
    fn resolve(&self, family: &str, weight: FontWeight) -> ResolvedFont {
        if let Some(path) = self.lookup(family, weight) {
            if self.probe.is_usable(path) {
                tracing::debug!(family, weight = weight.as_str(), path = %path.display(), "Font resolved");
                return ResolvedFont {
                    path: path.clone(),
                    source: FontSource::Requested,
                };
            }
            tracing::warn!(path = %path.display(), "Font file missing or invalid");
        }

        if weight != FontWeight::Normal {
            if let Some(path) = self.lookup(family, FontWeight::Normal) {
                if self.probe.is_usable(path) {
                    tracing::info!(family, weight = weight.as_str(), path = %path.display(), "Falling back to regular weight");
                    return ResolvedFont {
                        path: path.clone(),
                        source: FontSource::RegularWeight,
                    };
                }
            }
        }

        let fallback = self.fallback_for(weight);
        tracing::warn!(family, weight = weight.as_str(), path = %fallback.display(), "Using universal fallback font");
        ResolvedFont {
            path: fallback.clone(),
            source: FontSource::UniversalFallback,
        }
    }
}
