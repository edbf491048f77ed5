//! OCR models offered by the service.

use std::{fmt, str::FromStr};

use clap::ValueEnum;

use crate::prelude::*;

/// An OCR model the service knows how to run.
///
/// The wire values are part of the service contract and are sent verbatim in
/// the `model` query parameter.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum,
)]
pub enum LaylaModel {
    /// Best quality, multilingual, markdown output.
    #[default]
    #[serde(rename = "doc_qwen_3b_multi_v2.0.0_prod")]
    #[clap(name = "doc_qwen_3b_multi_v2.0.0_prod")]
    DocQwen3bMultiV2,

    /// Table-aware, produces HTML tables.
    #[serde(rename = "doc_trf_3b_multi_v1.0.0_prod")]
    #[clap(name = "doc_trf_3b_multi_v1.0.0_prod")]
    DocTrf3bMultiV1,

    /// Fastest, covers 109 languages.
    #[serde(rename = "doc_trf_0.9b_multi_v1.0.0_prod")]
    #[clap(name = "doc_trf_0.9b_multi_v1.0.0_prod")]
    DocTrf09bMultiV1,
}

impl LaylaModel {
    /// Every model, in the order the service documents them.
    pub const ALL: [LaylaModel; 3] = [
        LaylaModel::DocQwen3bMultiV2,
        LaylaModel::DocTrf3bMultiV1,
        LaylaModel::DocTrf09bMultiV1,
    ];

    /// The identifier sent to the service.
    pub fn as_str(self) -> &'static str {
        match self {
            LaylaModel::DocQwen3bMultiV2 => "doc_qwen_3b_multi_v2.0.0_prod",
            LaylaModel::DocTrf3bMultiV1 => "doc_trf_3b_multi_v1.0.0_prod",
            LaylaModel::DocTrf09bMultiV1 => "doc_trf_0.9b_multi_v1.0.0_prod",
        }
    }

    /// A one-line description, shown while a job runs.
    pub fn description(self) -> &'static str {
        match self {
            LaylaModel::DocQwen3bMultiV2 => "Best quality, multilingual (default)",
            LaylaModel::DocTrf3bMultiV1 => "Table-aware, HTML output",
            LaylaModel::DocTrf09bMultiV1 => "Fastest, 109 languages",
        }
    }
}

impl fmt::Display for LaylaModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LaylaModel {
    type Err = LaylaError;

    /// Accepts either the wire identifier or the upper-case constant name
    /// (`DOC_QWEN_3B_MULTI_V2_0_0_PROD`).
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        LaylaModel::ALL
            .into_iter()
            .find(|model| {
                model.as_str() == wanted
                    || constant_name(model.as_str()).eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| {
                LaylaError::InvalidOptions(format!("unknown OCR model: {wanted:?}"))
            })
    }
}

/// `doc_trf_0.9b_multi_v1.0.0_prod` -> `DOC_TRF_0_9B_MULTI_V1_0_0_PROD`.
fn constant_name(wire: &str) -> String {
    wire.replace('.', "_").to_ascii_uppercase()
}
