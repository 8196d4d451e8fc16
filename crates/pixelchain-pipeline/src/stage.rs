//! Stage identifiers and configured filter stages.
//!
//! A [`FilterStage`] is one catalog entry placed in a pipeline: its
//! kind, its (always in-range) parameters and an enabled flag. Its
//! position is implicit, the index in [`Pipeline::stages`].
//!
//! [`Pipeline::stages`]: crate::Pipeline::stages

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::{FilterKind, ParamValue, Params};
use crate::filter::Filter;
use crate::types::PipelineError;

/// Unique identity of a stage within one pipeline.
///
/// Ids are never reused by the pipeline that issued them, so a stale id
/// held by the UI after a removal fails with
/// [`PipelineError::UnknownStage`] instead of hitting another stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageId(u64);

impl StageId {
    /// Wrap a raw id.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One configured filter in a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterStage {
    id: StageId,
    kind: FilterKind,
    params: Params,
    enabled: bool,
}

impl FilterStage {
    /// A new enabled stage holding the schema defaults for `kind`.
    pub(crate) fn new(id: StageId, kind: FilterKind) -> Self {
        Self {
            id,
            kind,
            params: kind.default_params(),
            enabled: true,
        }
    }

    /// The stage's identity.
    #[must_use]
    pub const fn id(&self) -> StageId {
        self.id
    }

    /// Which filter this stage runs.
    #[must_use]
    pub const fn kind(&self) -> FilterKind {
        self.kind
    }

    /// Current parameter values.
    #[must_use]
    pub const fn params(&self) -> &Params {
        &self.params
    }

    /// Whether the executor runs this stage.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The typed filter described by this stage's kind and parameters.
    #[must_use]
    pub fn filter(&self) -> Filter {
        Filter::from_params(self.kind, &self.params)
    }

    /// Store a parameter, clamped into its schema range.
    ///
    /// Returns the value actually stored.
    pub(crate) fn set_param(
        &mut self,
        name: &str,
        value: &ParamValue,
    ) -> Result<ParamValue, PipelineError> {
        let normalized = self.kind.normalize_param(name, value)?;
        self.params.insert(name, normalized.clone());
        Ok(normalized)
    }

    pub(crate) const fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub(crate) fn reset_params(&mut self) {
        self.params = self.kind.default_params();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn new_stage_is_enabled_with_defaults() {
        let stage = FilterStage::new(StageId::new(1), FilterKind::Canny);
        assert!(stage.is_enabled());
        assert_eq!(stage.params(), &FilterKind::Canny.default_params());
        assert_eq!(stage.filter(), Filter::Canny { low: 30, high: 90 });
    }

    #[test]
    fn set_param_stores_clamped_value() {
        let mut stage = FilterStage::new(StageId::new(1), FilterKind::Jpeg);
        let stored = stage.set_param("quality", &150.0.into()).unwrap();
        assert_eq!(stored, ParamValue::Number(100.0));
        assert_eq!(stage.params().number("quality"), Some(100.0));
    }

    #[test]
    fn set_param_rejects_unknown_name_without_change() {
        let mut stage = FilterStage::new(StageId::new(1), FilterKind::Gamma);
        let before = stage.clone();
        assert!(stage.set_param("radius", &1.0.into()).is_err());
        assert_eq!(stage, before);
    }

    #[test]
    fn reset_restores_defaults() {
        let mut stage = FilterStage::new(StageId::new(1), FilterKind::Sharpen);
        stage.set_param("amount", &2.0.into()).unwrap();
        stage.reset_params();
        assert_eq!(stage.params(), &FilterKind::Sharpen.default_params());
    }

    #[test]
    fn stage_id_display() {
        assert_eq!(StageId::new(12).to_string(), "#12");
    }

    #[test]
    fn stage_serializes_with_catalog_names() {
        let stage = FilterStage::new(StageId::new(3), FilterKind::Sobel);
        let json = serde_json::to_value(&stage).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["kind"], "sobel");
        assert_eq!(json["params"]["operator"], "sobel");
        assert_eq!(json["enabled"], true);
    }
}
