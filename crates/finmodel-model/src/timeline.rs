//! Model timelines: historical periods followed by forecast periods.

use crate::error::{ModelError, Result};
use derive_more::Display;
use finmodel_curate::PeriodKind;
use serde::{Deserialize, Serialize};

/// Timeline granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Granularity {
    /// One period per fiscal year
    #[default]
    #[display("ANNUAL")]
    Annual,
    /// One period per fiscal quarter (not supported)
    #[display("QUARTERLY")]
    Quarterly,
}

/// Parameters of a timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineSpec {
    /// Most recent historical fiscal year
    pub base_year: i32,
    /// Number of historical years, at least 1
    pub historical_years: u32,
    /// Number of forecast years
    pub forecast_years: u32,
    /// Period granularity
    pub granularity: Granularity,
}

impl TimelineSpec {
    /// Annual timeline.
    pub const fn annual(base_year: i32, historical_years: u32, forecast_years: u32) -> Self {
        Self { base_year, historical_years, forecast_years, granularity: Granularity::Annual }
    }
}

/// One period of a timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    /// Zero-based position in the timeline
    pub index: usize,
    /// Fiscal year
    pub fiscal_year: i32,
    /// Fiscal quarter, none for annual periods
    pub fiscal_quarter: Option<u8>,
    /// Period kind
    pub kind: PeriodKind,
    /// Actuals (true) or forecast (false)
    pub is_historical: bool,
    /// Display label, e.g. `FY2024` or `FY2025E`
    pub label: String,
}

/// Year and index bounds of a timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodRange {
    /// First fiscal year
    pub min_year: i32,
    /// Last fiscal year
    pub max_year: i32,
    /// First index
    pub min_index: usize,
    /// Last index
    pub max_index: usize,
}

/// Ordered periods with historical periods first.
///
/// Deserialization rebuilds the timeline from its counts and rejects periods
/// that differ from what [`build_timeline`] produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredTimeline")]
pub struct ModelTimeline {
    periods: Vec<Period>,
    historical_count: usize,
    forecast_count: usize,
    base_year: i32,
}

#[derive(Deserialize)]
struct StoredTimeline {
    periods: Vec<Period>,
    historical_count: usize,
    forecast_count: usize,
    base_year: i32,
}

impl TryFrom<StoredTimeline> for ModelTimeline {
    type Error = ModelError;

    fn try_from(stored: StoredTimeline) -> Result<Self> {
        let count = |n: usize| {
            u32::try_from(n).map_err(|_| ModelError::InvalidTimeline(format!("{n} periods")))
        };
        let spec =
            TimelineSpec::annual(stored.base_year, count(stored.historical_count)?, count(stored.forecast_count)?);
        let timeline = build_timeline(&spec)?;
        if timeline.periods != stored.periods {
            return Err(ModelError::InvalidTimeline(format!(
                "periods do not match {} historical and {} forecast years ending {}",
                stored.historical_count, stored.forecast_count, stored.base_year
            )));
        }
        Ok(timeline)
    }
}

impl ModelTimeline {
    /// All periods in index order.
    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    /// Number of historical periods.
    pub const fn historical_count(&self) -> usize {
        self.historical_count
    }

    /// Number of forecast periods.
    pub const fn forecast_count(&self) -> usize {
        self.forecast_count
    }

    /// Most recent historical year.
    pub const fn base_year(&self) -> i32 {
        self.base_year
    }

    /// Index of the last historical period.
    pub const fn boundary_index(&self) -> usize {
        self.historical_count - 1
    }

    /// Period at an index.
    pub fn period(&self, index: usize) -> Option<&Period> {
        self.periods.get(index)
    }

    /// Period for a fiscal year.
    pub fn period_for_year(&self, fiscal_year: i32) -> Option<&Period> {
        self.periods.iter().find(|p| p.fiscal_year == fiscal_year)
    }

    /// Historical periods.
    pub fn historical(&self) -> &[Period] {
        &self.periods[..self.historical_count]
    }

    /// Forecast periods.
    pub fn forecast(&self) -> &[Period] {
        &self.periods[self.historical_count..]
    }

    /// Year and index bounds.
    pub fn range(&self) -> PeriodRange {
        let first = &self.periods[0];
        let last = &self.periods[self.periods.len() - 1];
        PeriodRange {
            min_year: first.fiscal_year,
            max_year: last.fiscal_year,
            min_index: first.index,
            max_index: last.index,
        }
    }

    /// Timeline parameters, for reconstruction.
    pub fn spec(&self) -> TimelineSpec {
        TimelineSpec::annual(self.base_year, self.historical_count as u32, self.forecast_count as u32)
    }
}

/// Display label of a period.
pub fn format_period_label(
    fiscal_year: i32,
    fiscal_quarter: Option<u8>,
    kind: PeriodKind,
    is_historical: bool,
) -> String {
    let suffix = if is_historical { "" } else { "E" };
    match (kind, fiscal_quarter) {
        (PeriodKind::Annual, _) | (_, None) => format!("FY{fiscal_year}{suffix}"),
        (_, Some(quarter)) => format!("Q{quarter} {fiscal_year}{suffix}"),
    }
}

fn annual_period(index: usize, fiscal_year: i32, is_historical: bool) -> Period {
    Period {
        index,
        fiscal_year,
        fiscal_quarter: None,
        kind: PeriodKind::Annual,
        is_historical,
        label: format_period_label(fiscal_year, None, PeriodKind::Annual, is_historical),
    }
}

/// Build a timeline.
///
/// Historical years `base - (h-1) ..= base` take indices `0..h`; forecast
/// years `base+1 ..= base+f` continue from `h`.
pub fn build_timeline(spec: &TimelineSpec) -> Result<ModelTimeline> {
    if spec.granularity != Granularity::Annual {
        return Err(ModelError::UnsupportedGranularity(spec.granularity));
    }
    if spec.historical_years == 0 {
        return Err(ModelError::InvalidTimeline("at least one historical year is required".to_string()));
    }

    let historical = i32::try_from(spec.historical_years)
        .map_err(|_| ModelError::InvalidTimeline(format!("{} historical years", spec.historical_years)))?;
    let forecast = i32::try_from(spec.forecast_years)
        .map_err(|_| ModelError::InvalidTimeline(format!("{} forecast years", spec.forecast_years)))?;
    let first_year = spec
        .base_year
        .checked_sub(historical - 1)
        .ok_or_else(|| ModelError::InvalidTimeline(format!("base year {}", spec.base_year)))?;
    spec.base_year
        .checked_add(forecast)
        .ok_or_else(|| ModelError::InvalidTimeline(format!("base year {}", spec.base_year)))?;

    let mut periods = Vec::with_capacity((spec.historical_years + spec.forecast_years) as usize);
    for offset in 0..historical {
        periods.push(annual_period(periods.len(), first_year + offset, true));
    }
    for offset in 1..=forecast {
        periods.push(annual_period(periods.len(), spec.base_year + offset, false));
    }

    Ok(ModelTimeline {
        periods,
        historical_count: spec.historical_years as usize,
        forecast_count: spec.forecast_years as usize,
        base_year: spec.base_year,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_five_plus_five() {
        let timeline = build_timeline(&TimelineSpec::annual(2024, 5, 5)).unwrap();
        assert_eq!(timeline.periods().len(), 10);
        assert_eq!(timeline.boundary_index(), 4);

        let first = timeline.period(0).unwrap();
        assert_eq!((first.fiscal_year, first.is_historical, first.label.as_str()), (2020, true, "FY2020"));
        let base = timeline.period(4).unwrap();
        assert_eq!((base.fiscal_year, base.is_historical), (2024, true));
        let next = timeline.period(5).unwrap();
        assert_eq!((next.fiscal_year, next.is_historical, next.label.as_str()), (2025, false, "FY2025E"));
        assert_eq!(timeline.period(9).unwrap().fiscal_year, 2029);

        for (i, period) in timeline.periods().iter().enumerate() {
            assert_eq!(period.index, i);
        }
    }

    #[test]
    fn test_lookups() {
        let timeline = build_timeline(&TimelineSpec::annual(2024, 3, 2)).unwrap();
        assert_eq!(timeline.period_for_year(2023).map(|p| p.index), Some(1));
        assert!(timeline.period_for_year(2019).is_none());
        assert_eq!(timeline.historical().len(), 3);
        assert_eq!(timeline.forecast().len(), 2);
        assert!(timeline.forecast().iter().all(|p| !p.is_historical));
        assert_eq!(
            timeline.range(),
            PeriodRange { min_year: 2022, max_year: 2026, min_index: 0, max_index: 4 }
        );
        assert_eq!(timeline.spec(), TimelineSpec::annual(2024, 3, 2));
    }

    #[test]
    fn test_no_forecast() {
        let timeline = build_timeline(&TimelineSpec::annual(2024, 1, 0)).unwrap();
        assert_eq!(timeline.periods().len(), 1);
        assert!(timeline.forecast().is_empty());
        assert_eq!(timeline.boundary_index(), 0);
    }

    #[test]
    fn test_quarterly_fails_fast() {
        let spec = TimelineSpec { granularity: Granularity::Quarterly, ..TimelineSpec::annual(2024, 5, 5) };
        assert!(matches!(build_timeline(&spec), Err(ModelError::UnsupportedGranularity(Granularity::Quarterly))));
    }

    #[test]
    fn test_zero_historical_years() {
        assert!(matches!(
            build_timeline(&TimelineSpec::annual(2024, 0, 5)),
            Err(ModelError::InvalidTimeline(_))
        ));
    }

    #[test]
    fn test_deserialize_round_trip() {
        let timeline = build_timeline(&TimelineSpec::annual(2024, 2, 1)).unwrap();
        let json = serde_json::to_string(&timeline).unwrap();
        let restored: ModelTimeline = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, timeline);
    }

    #[test]
    fn test_deserialize_rejects_empty_history() {
        let json = r#"{"periods":[],"historical_count":0,"forecast_count":0,"base_year":2024}"#;
        let err = serde_json::from_str::<ModelTimeline>(json).unwrap_err();
        assert!(err.to_string().contains("at least one historical year"));
    }

    #[test]
    fn test_deserialize_rejects_mismatched_periods() {
        let timeline = build_timeline(&TimelineSpec::annual(2024, 2, 1)).unwrap();
        let mut value = serde_json::to_value(&timeline).unwrap();
        value["historical_count"] = serde_json::json!(3);
        assert!(serde_json::from_value::<ModelTimeline>(value).is_err());
    }

    #[rstest]
    #[case(2024, None, PeriodKind::Annual, true, "FY2024")]
    #[case(2025, None, PeriodKind::Annual, false, "FY2025E")]
    #[case(2024, Some(1), PeriodKind::Quarter, true, "Q1 2024")]
    #[case(2025, Some(3), PeriodKind::Quarter, false, "Q3 2025E")]
    fn test_labels(
        #[case] year: i32,
        #[case] quarter: Option<u8>,
        #[case] kind: PeriodKind,
        #[case] historical: bool,
        #[case] expected: &str,
    ) {
        assert_eq!(format_period_label(year, quarter, kind, historical), expected);
    }
}
