//! Indicator computation port trait.

use crate::domain::error::ScoreTraderError;
use crate::domain::indicator::{IndicatorDescriptor, IndicatorOutput};
use crate::domain::series::PriceSeries;

/// Stateless computation of one indicator over a full price series.
///
/// Implementations return one array per component of `descriptor.kind`, in
/// the order of [`IndicatorKind::components`](crate::domain::indicator::IndicatorKind::components),
/// and fail with `InsufficientData` when the series is not longer than the
/// kind's lookback.
pub trait IndicatorEngine: Send + Sync {
    fn compute(
        &self,
        descriptor: &IndicatorDescriptor,
        series: &PriceSeries,
    ) -> Result<IndicatorOutput, ScoreTraderError>;
}
