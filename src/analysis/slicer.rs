//! Published views of the shaped table.

use crate::error::Result;
use crate::models::{
    rows_to_frame, FactorModel, PredictorSet, RiskLevel, ShapedRow, ShapedTable, COL_GROUP,
    COL_METRIC, COL_PREDICTOR_SET, COL_VARIABLE, QUARTILE_SUBSET,
};
use polars::prelude::DataFrame;

/// Which published table a view feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    /// Performance across risk quartiles for the single-source predictor sets.
    Quartile,
    /// Performance within each demographic group.
    Demographic,
}

impl ViewKind {
    pub fn title(&self) -> &'static str {
        match self {
            ViewKind::Quartile => "Quartile subset performance",
            ViewKind::Demographic => "Demographic subset performance",
        }
    }

    /// Output header. Both views drop `Factor model`; the quartile view also
    /// drops the now-constant `Variable`.
    pub fn columns(&self) -> Vec<&'static str> {
        let keys: &[&'static str] = match self {
            ViewKind::Quartile => &[COL_PREDICTOR_SET, COL_METRIC, COL_GROUP],
            ViewKind::Demographic => {
                &[COL_PREDICTOR_SET, COL_METRIC, COL_VARIABLE, COL_GROUP]
            }
        };
        keys.iter()
            .copied()
            .chain(RiskLevel::ALL.iter().map(|l| l.column_name()))
            .collect()
    }

    fn keeps(&self, row: &ShapedRow) -> bool {
        if row.factor_model != FactorModel::WithinEvent.label() {
            return false;
        }
        match self {
            ViewKind::Quartile => {
                row.variable == QUARTILE_SUBSET
                    && [PredictorSet::Symptoms, PredictorSet::Questions]
                        .iter()
                        .any(|p| row.predictor_set == p.label())
            }
            ViewKind::Demographic => row.variable != QUARTILE_SUBSET,
        }
    }
}

/// Filtered rows of the shaped table, in shaped-table order.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedView {
    pub kind: ViewKind,
    pub rows: Vec<ShapedRow>,
}

impl PublishedView {
    pub fn to_frame(&self) -> Result<DataFrame> {
        rows_to_frame(&self.rows, &self.kind.columns())
    }
}

fn slice(shaped: &ShapedTable, kind: ViewKind) -> PublishedView {
    PublishedView {
        kind,
        rows: shaped
            .rows
            .iter()
            .filter(|row| kind.keeps(row))
            .cloned()
            .collect(),
    }
}

/// Within-event quartile-subset rows for `{CBCL scales}` and `{Questions}`.
pub fn quartile_view(shaped: &ShapedTable) -> PublishedView {
    slice(shaped, ViewKind::Quartile)
}

/// Within-event rows for every variable except the quartile subset.
pub fn demographic_view(shaped: &ShapedTable) -> PublishedView {
    slice(shaped, ViewKind::Demographic)
}
