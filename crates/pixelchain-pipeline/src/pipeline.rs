//! The ordered, editable list of filter stages.
//!
//! A [`Pipeline`] owns its [`FilterStage`]s and is the only way to
//! create or mutate them, so every stored parameter has been through
//! the catalog's clamping. Stage order is execution order.
//!
//! ```rust
//! # use pixelchain_pipeline::{Pipeline, PipelineError};
//! # fn main() -> Result<(), PipelineError> {
//! let mut pipeline = Pipeline::new();
//! let blur = pipeline.create_stage("gaussian")?;
//! let edges = pipeline.create_stage("sobel")?;
//! pipeline.set_param(blur, "sigma", 2.5.into())?;
//! pipeline.reorder_stage(edges, 0)?;
//! assert_eq!(pipeline.stages()[1].id(), blur);
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{FilterKind, ParamValue};
use crate::stage::{FilterStage, StageId};
use crate::types::PipelineError;

// ───────────────────────────── Pipeline ─────────────────────────────

/// Ordered sequence of configured filter stages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pipeline {
    stages: Vec<FilterStage>,
    #[serde(skip)]
    next_id: u64,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// An empty pipeline. Running it returns the source unchanged.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            stages: Vec::new(),
            next_id: 1,
        }
    }

    /// Append a stage for the catalog kind named `kind`.
    ///
    /// The stage starts enabled with the schema defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidFilterKind`] if `kind` is not a
    /// catalog name; the pipeline is left unchanged.
    pub fn create_stage(&mut self, kind: &str) -> Result<StageId, PipelineError> {
        let kind: FilterKind = kind.parse()?;
        Ok(self.add_stage(kind))
    }

    /// Append a stage for an already-typed kind.
    pub fn add_stage(&mut self, kind: FilterKind) -> StageId {
        let id = StageId::new(self.next_id);
        self.next_id += 1;
        self.stages.push(FilterStage::new(id, kind));
        id
    }

    /// Remove a stage, returning it.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownStage`] if no stage has this id.
    pub fn remove_stage(&mut self, id: StageId) -> Result<FilterStage, PipelineError> {
        let index = self.index_of(id)?;
        Ok(self.stages.remove(index))
    }

    /// Flip a stage's enabled flag, returning the new state.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownStage`] if no stage has this id.
    pub fn toggle_stage(&mut self, id: StageId) -> Result<bool, PipelineError> {
        let stage = self.stage_mut(id)?;
        let enabled = !stage.is_enabled();
        stage.set_enabled(enabled);
        Ok(enabled)
    }

    /// Set a stage's enabled flag explicitly.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownStage`] if no stage has this id.
    pub fn set_enabled(&mut self, id: StageId, enabled: bool) -> Result<(), PipelineError> {
        self.stage_mut(id)?.set_enabled(enabled);
        Ok(())
    }

    /// Move a stage to `new_index`, shifting the stages in between.
    ///
    /// `new_index` is clamped to the last position. Returns the index
    /// the stage ended up at.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownStage`] if no stage has this id.
    pub fn reorder_stage(&mut self, id: StageId, new_index: usize) -> Result<usize, PipelineError> {
        let from = self.index_of(id)?;
        let to = new_index.min(self.stages.len() - 1);
        if from != to {
            let stage = self.stages.remove(from);
            self.stages.insert(to, stage);
        }
        Ok(to)
    }

    /// Set one parameter of a stage, clamped into the schema range.
    ///
    /// Returns the value actually stored.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownStage`] for an unknown id,
    /// [`PipelineError::UnknownParameter`] if the stage's kind has no
    /// such parameter, and [`PipelineError::InvalidParameterValue`] for
    /// a value that cannot be interpreted at all (NaN, or an unknown
    /// choice). The stage is unchanged on error.
    pub fn set_param(
        &mut self,
        id: StageId,
        name: &str,
        value: ParamValue,
    ) -> Result<ParamValue, PipelineError> {
        self.stage_mut(id)?.set_param(name, &value)
    }

    /// Restore every parameter of a stage to its schema default.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownStage`] if no stage has this id.
    pub fn reset_stage(&mut self, id: StageId) -> Result<(), PipelineError> {
        self.stage_mut(id)?.reset_params();
        Ok(())
    }

    /// Look up a stage by id.
    #[must_use]
    pub fn stage(&self, id: StageId) -> Option<&FilterStage> {
        self.stages.iter().find(|s| s.id() == id)
    }

    /// Index of a stage, i.e. its position in execution order.
    #[must_use]
    pub fn position(&self, id: StageId) -> Option<usize> {
        self.stages.iter().position(|s| s.id() == id)
    }

    /// All stages in execution order.
    #[must_use]
    pub fn stages(&self) -> &[FilterStage] {
        &self.stages
    }

    /// Number of stages, enabled or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the pipeline has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Number of stages the executor will run.
    #[must_use]
    pub fn enabled_count(&self) -> usize {
        self.stages.iter().filter(|s| s.is_enabled()).count()
    }

    fn index_of(&self, id: StageId) -> Result<usize, PipelineError> {
        self.position(id).ok_or(PipelineError::UnknownStage(id))
    }

    fn stage_mut(&mut self, id: StageId) -> Result<&mut FilterStage, PipelineError> {
        self.stages
            .iter_mut()
            .find(|s| s.id() == id)
            .ok_or(PipelineError::UnknownStage(id))
    }
}

// ────────────────────────────── Presets ─────────────────────────────

/// Portable description of a pipeline, without stage ids.
///
/// Serializes as a JSON array of `{kind, enabled, params}` objects.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipelinePreset {
    /// Stages in execution order.
    pub stages: Vec<PresetStage>,
}

/// One stage of a [`PipelinePreset`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetStage {
    /// Catalog name (case-insensitive on load).
    pub kind: String,
    /// Defaults to `true` when omitted.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Parameter overrides; anything missing keeps its default.
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
}

const fn enabled_by_default() -> bool {
    true
}

impl PresetStage {
    /// An enabled preset stage with no overrides.
    #[must_use]
    pub fn new(kind: FilterKind) -> Self {
        Self {
            kind: kind.name().to_string(),
            enabled: true,
            params: BTreeMap::new(),
        }
    }

    /// Add a parameter override.
    #[must_use]
    pub fn with_param(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }
}

impl Pipeline {
    /// Snapshot the pipeline as a preset with every parameter spelled out.
    #[must_use]
    pub fn to_preset(&self) -> PipelinePreset {
        let stages = self
            .stages
            .iter()
            .map(|stage| PresetStage {
                kind: stage.kind().name().to_string(),
                enabled: stage.is_enabled(),
                params: stage
                    .params()
                    .iter()
                    .map(|(name, value)| (name.to_string(), value.clone()))
                    .collect(),
            })
            .collect();
        PipelinePreset { stages }
    }

    /// Build a fresh pipeline from a preset.
    ///
    /// Parameters go through the same clamping as [`set_param`](Self::set_param).
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidFilterKind`] for an unknown kind,
    /// [`PipelineError::UnknownParameter`] for a parameter the kind does
    /// not have, and [`PipelineError::InvalidParameterValue`] for a value
    /// that cannot be interpreted.
    pub fn from_preset(preset: &PipelinePreset) -> Result<Self, PipelineError> {
        let mut pipeline = Self::new();
        for entry in &preset.stages {
            let id = pipeline.create_stage(&entry.kind)?;
            for (name, value) in &entry.params {
                pipeline.set_param(id, name, value.clone())?;
            }
            pipeline.set_enabled(id, entry.enabled)?;
        }
        Ok(pipeline)
    }
}

impl From<&Pipeline> for PipelinePreset {
    fn from(pipeline: &Pipeline) -> Self {
        pipeline.to_preset()
    }
}

impl TryFrom<&PipelinePreset> for Pipeline {
    type Error = PipelineError;

    fn try_from(preset: &PipelinePreset) -> Result<Self, Self::Error> {
        Self::from_preset(preset)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn kinds(pipeline: &Pipeline) -> Vec<FilterKind> {
        pipeline.stages().iter().map(FilterStage::kind).collect()
    }

    fn three_stage() -> (Pipeline, [StageId; 3]) {
        let mut p = Pipeline::new();
        let a = p.add_stage(FilterKind::Gamma);
        let b = p.add_stage(FilterKind::Mean);
        let c = p.add_stage(FilterKind::Threshold);
        (p, [a, b, c])
    }

    #[test]
    fn create_stage_appends_with_defaults() {
        let mut p = Pipeline::new();
        let id = p.create_stage("median").unwrap();
        assert_eq!(p.len(), 1);
        let stage = p.stage(id).unwrap();
        assert_eq!(stage.kind(), FilterKind::Median);
        assert!(stage.is_enabled());
        assert_eq!(stage.params(), &FilterKind::Median.default_params());
    }

    #[test]
    fn create_stage_rejects_unknown_kind() {
        let mut p = Pipeline::new();
        let err = p.create_stage("emboss").unwrap_err();
        assert_eq!(err, PipelineError::InvalidFilterKind("emboss".to_string()));
        assert!(p.is_empty());
    }

    #[test]
    fn ids_are_unique_and_never_reused() {
        let mut p = Pipeline::new();
        let a = p.add_stage(FilterKind::Gamma);
        p.remove_stage(a).unwrap();
        let b = p.add_stage(FilterKind::Gamma);
        assert_ne!(a, b);
        assert_eq!(p.remove_stage(a).unwrap_err(), PipelineError::UnknownStage(a));
    }

    #[test]
    fn remove_keeps_order_of_the_rest() {
        let (mut p, [_, b, _]) = three_stage();
        let removed = p.remove_stage(b).unwrap();
        assert_eq!(removed.kind(), FilterKind::Mean);
        assert_eq!(kinds(&p), [FilterKind::Gamma, FilterKind::Threshold]);
    }

    #[test]
    fn toggle_flips_and_reports() {
        let (mut p, [a, _, _]) = three_stage();
        assert!(!p.toggle_stage(a).unwrap());
        assert_eq!(p.enabled_count(), 2);
        assert!(p.toggle_stage(a).unwrap());
        assert_eq!(p.enabled_count(), 3);
    }

    #[test]
    fn reorder_moves_stage() {
        let (mut p, [a, _, c]) = three_stage();
        assert_eq!(p.reorder_stage(c, 0).unwrap(), 0);
        assert_eq!(
            kinds(&p),
            [FilterKind::Threshold, FilterKind::Gamma, FilterKind::Mean]
        );
        assert_eq!(p.reorder_stage(a, 2).unwrap(), 2);
        assert_eq!(
            kinds(&p),
            [FilterKind::Threshold, FilterKind::Mean, FilterKind::Gamma]
        );
    }

    #[test]
    fn reorder_clamps_index() {
        let (mut p, [a, _, _]) = three_stage();
        assert_eq!(p.reorder_stage(a, 99).unwrap(), 2);
        assert_eq!(p.position(a), Some(2));
    }

    #[test]
    fn reorder_to_same_index_is_noop() {
        let (mut p, [_, b, _]) = three_stage();
        let before = p.clone();
        p.reorder_stage(b, 1).unwrap();
        assert_eq!(p, before);
    }

    #[test]
    fn unknown_id_is_rejected_everywhere() {
        let (mut p, _) = three_stage();
        let ghost = StageId::new(999);
        let want = PipelineError::UnknownStage(ghost);
        assert_eq!(p.toggle_stage(ghost).unwrap_err(), want);
        assert_eq!(p.reorder_stage(ghost, 0).unwrap_err(), want);
        assert_eq!(p.set_param(ghost, "gamma", 1.0.into()).unwrap_err(), want);
        assert_eq!(p.reset_stage(ghost).unwrap_err(), want);
        assert_eq!(p.set_enabled(ghost, false).unwrap_err(), want);
        assert_eq!(p.remove_stage(ghost).unwrap_err(), want);
        assert_eq!(p.len(), 3);
    }

    #[test]
    fn set_param_clamps() {
        let (mut p, [a, b, _]) = three_stage();
        assert_eq!(p.set_param(a, "gamma", 99.0.into()).unwrap(), ParamValue::Number(5.0));
        assert_eq!(p.set_param(b, "kernel", 4.0.into()).unwrap(), ParamValue::Number(5.0));
    }

    #[test]
    fn set_param_unknown_name() {
        let (mut p, [a, _, _]) = three_stage();
        let err = p.set_param(a, "sigma", 1.0.into()).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownParameter { .. }), "{err}");
    }

    #[test]
    fn reset_restores_defaults() {
        let (mut p, [_, _, c]) = three_stage();
        p.set_param(c, "thresh", 10.0.into()).unwrap();
        p.reset_stage(c).unwrap();
        assert_eq!(p.stage(c).unwrap().params().number("thresh"), Some(128.0));
    }

    #[test]
    fn preset_round_trip() {
        let (mut p, [a, b, _]) = three_stage();
        p.set_param(a, "gamma", 2.2.into()).unwrap();
        p.toggle_stage(b).unwrap();
        let preset = p.to_preset();
        let rebuilt = Pipeline::from_preset(&preset).unwrap();
        assert_eq!(rebuilt.to_preset(), preset);
        assert_eq!(rebuilt.enabled_count(), 2);
    }

    #[test]
    fn preset_json_shape() {
        let preset = PipelinePreset {
            stages: vec![
                PresetStage::new(FilterKind::Sobel).with_param("operator", "prewitt"),
                PresetStage::new(FilterKind::Jpeg).with_param("quality", 30.0),
            ],
        };
        let json = serde_json::to_value(&preset).unwrap();
        assert_eq!(json[0]["kind"], "sobel");
        assert_eq!(json[0]["params"]["operator"], "prewitt");
        assert_eq!(json[1]["params"]["quality"], 30.0);
    }

    #[test]
    fn preset_loading_fills_defaults_and_clamps() {
        let preset: PipelinePreset = serde_json::from_str(
            r#"[{"kind": "Canny", "params": {"high": 400}}, {"kind": "mean", "enabled": false}]"#,
        )
        .unwrap();
        let p = Pipeline::from_preset(&preset).unwrap();
        let canny = &p.stages()[0];
        assert_eq!(canny.params().number("low"), Some(30.0));
        assert_eq!(canny.params().number("high"), Some(255.0));
        assert!(!p.stages()[1].is_enabled());
    }

    #[test]
    fn preset_with_bad_kind_or_param_fails() {
        let bad_kind = PipelinePreset {
            stages: vec![PresetStage {
                kind: "vignette".to_string(),
                enabled: true,
                params: BTreeMap::new(),
            }],
        };
        assert!(matches!(
            Pipeline::from_preset(&bad_kind),
            Err(PipelineError::InvalidFilterKind(_))
        ));

        let bad_param = PipelinePreset {
            stages: vec![PresetStage::new(FilterKind::Gamma).with_param("sigma", 1.0)],
        };
        assert!(matches!(
            Pipeline::from_preset(&bad_param),
            Err(PipelineError::UnknownParameter { .. })
        ));
    }
}
