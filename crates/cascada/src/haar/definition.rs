//! Serializable cascade definitions.
//!
//! Child node and stage link indices use `-1` for "none", matching the convention of common
//! cascade file formats. Missing links default to `-1`.

use serde::{Deserialize, Serialize};

use super::{HaarCascade, HaarCascadeStage, HaarFeature, HaarFeatureNode, HaarRectangle};

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct CascadeDefinition {
    width: u32,
    height: u32,
    stages: Vec<StageDefinition>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StageDefinition {
    threshold: f64,
    #[serde(default = "no_index")]
    parent: i64,
    #[serde(default = "no_index")]
    next: i64,
    trees: Vec<Vec<NodeDefinition>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct NodeDefinition {
    threshold: f64,
    left_value: f64,
    right_value: f64,
    #[serde(default = "no_index")]
    left_node: i64,
    #[serde(default = "no_index")]
    right_node: i64,
    feature: FeatureDefinition,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct FeatureDefinition {
    #[serde(default)]
    tilted: bool,
    rects: Vec<RectDefinition>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RectDefinition {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    weight: f64,
}

fn no_index() -> i64 {
    -1
}

fn parse_index(index: i64) -> anyhow::Result<Option<usize>> {
    match index {
        -1 => Ok(None),
        i if i >= 0 => Ok(Some(usize::try_from(i)?)),
        i => anyhow::bail!("invalid index {i} (must be -1 or non-negative)"),
    }
}

fn encode_index(index: Option<usize>) -> i64 {
    index.map_or(-1, |i| i as i64)
}

impl TryFrom<CascadeDefinition> for HaarCascade {
    type Error = anyhow::Error;

    fn try_from(def: CascadeDefinition) -> anyhow::Result<Self> {
        let stages = def
            .stages
            .into_iter()
            .enumerate()
            .map(|(i, stage)| {
                HaarCascadeStage::try_from(stage).map_err(|e| e.context(format!("in stage {i}")))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        HaarCascade::new(def.width, def.height, stages)
    }
}

impl TryFrom<StageDefinition> for HaarCascadeStage {
    type Error = anyhow::Error;

    fn try_from(def: StageDefinition) -> anyhow::Result<Self> {
        let trees = def
            .trees
            .into_iter()
            .map(|tree| {
                tree.into_iter()
                    .map(HaarFeatureNode::try_from)
                    .collect::<anyhow::Result<Vec<_>>>()
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(HaarCascadeStage::new(def.threshold, trees)?
            .with_links(parse_index(def.parent)?, parse_index(def.next)?))
    }
}

impl TryFrom<NodeDefinition> for HaarFeatureNode {
    type Error = anyhow::Error;

    fn try_from(def: NodeDefinition) -> anyhow::Result<Self> {
        let rects = def
            .feature
            .rects
            .into_iter()
            .map(|r| HaarRectangle::new(r.x, r.y, r.width, r.height, r.weight))
            .collect::<anyhow::Result<Vec<_>>>()?;
        let feature = HaarFeature::new(def.feature.tilted, rects)?;
        Ok(
            HaarFeatureNode::new(def.threshold, def.left_value, def.right_value, feature)
                .with_children(parse_index(def.left_node)?, parse_index(def.right_node)?),
        )
    }
}

impl From<&HaarCascade> for CascadeDefinition {
    fn from(cascade: &HaarCascade) -> Self {
        Self {
            width: cascade.width(),
            height: cascade.height(),
            stages: cascade.stages().iter().map(StageDefinition::from).collect(),
        }
    }
}

impl From<&HaarCascadeStage> for StageDefinition {
    fn from(stage: &HaarCascadeStage) -> Self {
        Self {
            threshold: stage.threshold(),
            parent: encode_index(stage.parent()),
            next: encode_index(stage.next()),
            trees: stage
                .trees()
                .iter()
                .map(|tree| tree.iter().map(NodeDefinition::from).collect())
                .collect(),
        }
    }
}

impl From<&HaarFeatureNode> for NodeDefinition {
    fn from(node: &HaarFeatureNode) -> Self {
        let feature = node.feature();
        Self {
            threshold: node.threshold(),
            left_value: node.left_value(),
            right_value: node.right_value(),
            left_node: encode_index(node.left_node()),
            right_node: encode_index(node.right_node()),
            feature: FeatureDefinition {
                tilted: feature.is_tilted(),
                rects: feature
                    .rectangles()
                    .iter()
                    .map(|r| RectDefinition {
                        x: r.x(),
                        y: r.y(),
                        width: r.width(),
                        height: r.height(),
                        weight: r.weight(),
                    })
                    .collect(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::haar::HaarCascade;

    const FACE_LIKE: &str = r#"{
        "width": 20,
        "height": 20,
        "stages": [
            {
                "threshold": 0.8,
                "trees": [
                    [
                        {
                            "threshold": 0.004,
                            "left_value": 0.03,
                            "right_value": 0.83,
                            "left_node": 1,
                            "feature": {
                                "rects": [
                                    { "x": 3, "y": 7, "width": 14, "height": 4, "weight": -1.0 },
                                    { "x": 3, "y": 9, "width": 14, "height": 2, "weight": 2.0 }
                                ]
                            }
                        },
                        {
                            "threshold": 0.01,
                            "left_value": -0.5,
                            "right_value": 0.5,
                            "feature": {
                                "tilted": true,
                                "rects": [
                                    { "x": 6, "y": 1, "width": 4, "height": 4, "weight": -1.0 },
                                    { "x": 6, "y": 1, "width": 2, "height": 2, "weight": 4.0 }
                                ]
                            }
                        }
                    ]
                ]
            }
        ]
    }"#;

    #[test]
    fn parses_definition() {
        let cascade = HaarCascade::from_json(FACE_LIKE).unwrap();
        assert_eq!((cascade.width(), cascade.height()), (20, 20));
        assert!(cascade.has_tilted_features());

        let stage = &cascade.stages()[0];
        assert_eq!(stage.threshold(), 0.8);
        assert_eq!(stage.parent(), None);
        assert_eq!(stage.next(), None);

        let tree = &stage.trees()[0];
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].left_node(), Some(1));
        assert_eq!(tree[0].right_node(), None);
        assert_eq!(tree[0].feature().rectangles()[1].weight(), 2.0);
        assert!(tree[1].feature().is_tilted());
    }

    #[test]
    fn rejects_malformed() {
        let negative_child = FACE_LIKE.replace(r#""left_node": 1"#, r#""left_node": -4"#);
        assert!(HaarCascade::from_json(&negative_child).is_err());

        let backwards = FACE_LIKE.replace(r#""left_node": 1"#, r#""left_node": 0"#);
        assert!(HaarCascade::from_json(&backwards).is_err());

        let unknown_field = FACE_LIKE.replace(r#""threshold": 0.8"#, r#""threshhold": 0.8"#);
        assert!(HaarCascade::from_json(&unknown_field).is_err());

        assert!(HaarCascade::from_json("{}").is_err());
        assert!(HaarCascade::from_json("not json").is_err());
    }
}
