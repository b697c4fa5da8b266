use std::path::Path;

use crate::image::Resolution;

use super::{definition::CascadeDefinition, HaarCascadeStage, HaarFeature};

/// A trained Haar cascade: a base window size and a sequence of stages.
///
/// Cascades are plain data. To evaluate one, hand it to a
/// [`HaarClassifier`](super::HaarClassifier), which owns its own copy and rescales it as needed.
#[derive(Debug, Clone, PartialEq)]
pub struct HaarCascade {
    pub(super) width: u32,
    pub(super) height: u32,
    pub(super) stages: Vec<HaarCascadeStage>,
    has_tilted_features: bool,
}

impl HaarCascade {
    /// Creates a cascade with a `width x height` base window.
    ///
    /// Returns an error if the cascade has no stages, if the window is empty, if any feature
    /// rectangle does not fit inside the base window, or if stage links are out of range.
    pub fn new(width: u32, height: u32, stages: Vec<HaarCascadeStage>) -> anyhow::Result<Self> {
        anyhow::ensure!(
            width > 0 && height > 0,
            "cascade window must not be empty (got {width}x{height})"
        );
        anyhow::ensure!(!stages.is_empty(), "cascade must contain at least one stage");

        for (index, stage) in stages.iter().enumerate() {
            for link in [stage.parent, stage.next].into_iter().flatten() {
                anyhow::ensure!(
                    link < stages.len(),
                    "stage {index} links to nonexistent stage {link}"
                );
            }
            for feature in stage.features() {
                check_bounds(feature, width, height)
                    .map_err(|e| e.context(format!("invalid feature in stage {index}")))?;
            }
        }

        let has_tilted_features = stages
            .iter()
            .flat_map(HaarCascadeStage::features)
            .any(HaarFeature::is_tilted);

        Ok(Self {
            width,
            height,
            stages,
            has_tilted_features,
        })
    }

    /// Loads a cascade from a JSON file.
    ///
    /// The path must have a `.json` extension.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Self::load_impl(path.as_ref())
    }

    fn load_impl(path: &Path) -> anyhow::Result<Self> {
        match path.extension() {
            Some(ext) if ext == "json" => {}
            _ => anyhow::bail!(
                "invalid cascade path '{}' (must have a `.json` extension)",
                path.display()
            ),
        }

        let text = std::fs::read_to_string(path)?;
        let cascade = Self::from_json(&text)?;
        log::debug!(
            "loaded {}x{} cascade with {} stages from '{}'",
            cascade.width,
            cascade.height,
            cascade.stages.len(),
            path.display(),
        );
        Ok(cascade)
    }

    /// Parses a cascade from its JSON representation.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let definition: CascadeDefinition = serde_json::from_str(json)?;
        definition.try_into()
    }

    /// Serializes this cascade to JSON.
    ///
    /// The output can be read back with [`HaarCascade::from_json`].
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(&CascadeDefinition::from(self))?)
    }

    /// Returns the size of the base window the cascade was trained on.
    pub fn window_size(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stages(&self) -> &[HaarCascadeStage] {
        &self.stages
    }

    /// Returns whether any feature of this cascade uses 45° rotated rectangles.
    pub fn has_tilted_features(&self) -> bool {
        self.has_tilted_features
    }

    /// Rescales every feature of the cascade.
    pub(super) fn set_scale(&mut self, scale: f32, inv_area: f32) {
        for feature in self.stages.iter_mut().flat_map(HaarCascadeStage::features_mut) {
            feature.set_scale_and_weight(scale, inv_area);
        }
    }
}

fn check_bounds(feature: &HaarFeature, width: u32, height: u32) -> anyhow::Result<()> {
    for r in feature.rectangles() {
        let (x, y, w, h) = (
            u64::from(r.x()),
            u64::from(r.y()),
            u64::from(r.width()),
            u64::from(r.height()),
        );
        let (width, height) = (u64::from(width), u64::from(height));

        let fits = if feature.is_tilted() {
            x >= h && x + w <= width && y + w + h <= height
        } else {
            x + w <= width && y + h <= height
        };
        anyhow::ensure!(
            fits,
            "{}rectangle ({x},{y}) {w}x{h} exceeds the {width}x{height} window",
            if feature.is_tilted() { "tilted " } else { "" },
        );
    }
    Ok(())
}
