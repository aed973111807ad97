//! Time series with station or grid point metadata.

use crate::error::{MetgridError, Result};
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Named `f64` columns over a time index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    index: Vec<NaiveDateTime>,
    columns: BTreeMap<String, Vec<f64>>,
}

impl TimeSeries {
    /// An empty series over `index`.
    pub fn new(index: Vec<NaiveDateTime>) -> Self {
        Self {
            index,
            columns: BTreeMap::new(),
        }
    }

    /// Add or replace a column; it needs one value per index entry.
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        if values.len() != self.index.len() {
            return Err(MetgridError::shape_mismatch(&[self.index.len()], &[values.len()]));
        }
        self.columns.insert(name.into(), values);
        Ok(self)
    }

    /// The time index.
    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    /// Column names in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Values of one column.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Value of `column` at `time`; with repeated times the last one counts.
    pub fn value(&self, time: NaiveDateTime, column: &str) -> Option<f64> {
        let values = self.columns.get(column)?;
        let row = self.index.iter().rposition(|t| *t == time)?;
        Some(values[row])
    }

    /// Number of index entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Merge `newer` series into this one.
    ///
    /// The result covers the union of all times (sorted) and all columns.
    /// Each cell takes the value of the newest series that has a non-NaN
    /// value there; later entries in `newer` are newer.
    pub fn update(&self, newer: &[TimeSeries]) -> TimeSeries {
        let sources: Vec<&TimeSeries> = std::iter::once(self).chain(newer).rev().collect();
        let rows: Vec<HashMap<NaiveDateTime, usize>> = sources
            .iter()
            .map(|series| series.index.iter().enumerate().map(|(row, &t)| (t, row)).collect())
            .collect();

        let index: Vec<NaiveDateTime> = sources
            .iter()
            .flat_map(|series| series.index.iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let names: BTreeSet<&String> = sources.iter().flat_map(|series| series.columns.keys()).collect();

        let columns = names
            .into_iter()
            .map(|name| {
                let values = index
                    .iter()
                    .map(|time| {
                        sources
                            .iter()
                            .zip(&rows)
                            .filter_map(|(series, rows)| {
                                let row = rows.get(time)?;
                                series.columns.get(name).map(|column| column[*row])
                            })
                            .find(|value| !value.is_nan())
                            .unwrap_or(f64::NAN)
                    })
                    .collect();
                (name.clone(), values)
            })
            .collect();

        TimeSeries { index, columns }
    }
}

/// Where a series came from.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Provenance {
    /// Unknown origin.
    #[default]
    Unknown,
    /// Measured at a station.
    Station {
        /// Station latitude.
        lat: f64,
        /// Station longitude.
        lon: f64,
    },
    /// Extracted from a grid point.
    GridPoint {
        /// Latitude of the grid point.
        lat: f64,
        /// Longitude of the grid point.
        lon: f64,
    },
}

/// A [`TimeSeries`] bound to a location.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesAccessor {
    series: TimeSeries,
    lonlat: Option<(f64, f64)>,
    provenance: Provenance,
}

impl SeriesAccessor {
    /// Wrap a series of unknown origin.
    pub fn new(series: TimeSeries) -> Self {
        Self {
            series,
            lonlat: None,
            provenance: Provenance::Unknown,
        }
    }

    /// Set the location explicitly.
    pub fn with_lonlat(mut self, lon: f64, lat: f64) -> Self {
        self.lonlat = Some((lon, lat));
        self
    }

    /// Record where the series came from.
    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    /// `(lon, lat)`: the explicit location, else the one of the provenance.
    pub fn lonlat(&self) -> Option<(f64, f64)> {
        self.lonlat.or(match self.provenance {
            Provenance::Unknown => None,
            Provenance::Station { lat, lon } | Provenance::GridPoint { lat, lon } => Some((lon, lat)),
        })
    }

    /// Origin of the series.
    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    /// The wrapped series.
    pub fn series(&self) -> &TimeSeries {
        &self.series
    }

    /// Unwrap the series.
    pub fn into_series(self) -> TimeSeries {
        self.series
    }

    /// Merge newer series in, keeping location and provenance.
    pub fn update(&self, newer: &[TimeSeries]) -> SeriesAccessor {
        Self {
            series: self.series.update(newer),
            lonlat: self.lonlat,
            provenance: self.provenance,
        }
    }
}
