//! Historical Crop Index
//!
//! In-memory table of (region, season) → crops observed in the historical
//! production dataset. Built once at startup and read-only afterwards, so it
//! is shared across requests behind an `Arc` without locking.
//!
//! Every region, season and crop name is normalized (trim + lowercase) before
//! indexing. The dataset is curated by hand and the same state or season shows
//! up with several spellings that differ only in case or padding.
//!
//! If the dataset cannot be loaded the index is built in the *unavailable*
//! state: lookups return the empty set and the ranker falls back to pure
//! probability ranking.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::error::RecommendError;
use crate::utils::normalization::{is_missing, normalize_name, title_case};

/// Season tag used by the dataset for perennial crops
pub const WHOLE_YEAR: &str = "whole year";

const REGION_COL: &str = "State_Name";
const SUB_REGION_COL: &str = "District_Name";
const SEASON_COL: &str = "Season";
const CROP_COL: &str = "Crop";

/// One row of the historical dataset (raw, not yet normalized)
#[derive(Debug, Clone)]
pub struct HistoricalRecord {
    pub region: String,
    pub sub_region: Option<String>,
    pub season: String,
    pub crop: String,
}

impl HistoricalRecord {
    pub fn new(region: &str, season: &str, crop: &str) -> Self {
        Self {
            region: region.to_string(),
            sub_region: None,
            season: season.to_string(),
            crop: crop.to_string(),
        }
    }

    pub fn with_sub_region(mut self, sub_region: &str) -> Self {
        self.sub_region = Some(sub_region.to_string());
        self
    }
}

/// Index statistics (logged at startup)
#[derive(Debug, Clone, Serialize)]
pub struct HistoryStats {
    pub available: bool,
    pub records: usize,
    pub regions: usize,
    pub sub_regions: usize,
    pub seasons: usize,
    pub region_season_pairs: usize,
}

type CropSet = FxHashSet<String>;

pub struct HistoricalCropIndex {
    by_region: FxHashMap<(String, String), CropSet>,
    by_sub_region: FxHashMap<(String, String, String), CropSet>,
    /// Display caches for the region picker
    regions: Vec<String>,
    sub_regions: BTreeMap<String, Vec<String>>,
    seasons: Vec<String>,
    /// Normalized season keys present in the dataset
    season_keys: FxHashSet<String>,
    include_whole_year: bool,
    records: usize,
    available: bool,
    empty: CropSet,
}

impl HistoricalCropIndex {
    /// Index with no data. Every lookup returns the empty set.
    pub fn unavailable() -> Self {
        Self {
            by_region: FxHashMap::default(),
            by_sub_region: FxHashMap::default(),
            regions: Vec::new(),
            sub_regions: BTreeMap::new(),
            seasons: Vec::new(),
            season_keys: FxHashSet::default(),
            include_whole_year: false,
            records: 0,
            available: false,
            empty: CropSet::default(),
        }
    }

    /// Load the production dataset, degrading to [`Self::unavailable`] on failure
    pub fn load_or_unavailable(path: &Path, include_whole_year: bool) -> Self {
        match Self::try_load(path, include_whole_year) {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!("{}; recommendations fall back to probability-only ranking", e);
                Self::unavailable()
            }
        }
    }

    /// [`Self::from_csv`] with the failure reported as `DataUnavailable`
    pub fn try_load(path: &Path, include_whole_year: bool) -> crate::error::Result<Self> {
        Self::from_csv(path, include_whole_year)
            .map_err(|e| RecommendError::DataUnavailable(format!("{:#}", e)))
    }

    /// Load the production dataset from CSV
    ///
    /// Only the region, sub-region, season and crop columns are materialized.
    /// The sub-region column is optional.
    pub fn from_csv(path: &Path, include_whole_year: bool) -> Result<Self> {
        let start = std::time::Instant::now();

        let mut lf = LazyCsvReader::new(path)
            .with_has_header(true)
            .finish()
            .with_context(|| format!("Failed to scan CSV: {}", path.display()))?;

        let schema = lf
            .collect_schema()
            .with_context(|| format!("Failed to read CSV header: {}", path.display()))?;

        for required in [REGION_COL, SEASON_COL, CROP_COL] {
            if !schema.contains(required) {
                anyhow::bail!("Column '{}' not found in {}", required, path.display());
            }
        }
        let has_sub_region = schema.contains(SUB_REGION_COL);

        let mut columns = vec![
            col(REGION_COL).cast(DataType::String),
            col(SEASON_COL).cast(DataType::String),
            col(CROP_COL).cast(DataType::String),
        ];
        if has_sub_region {
            columns.push(col(SUB_REGION_COL).cast(DataType::String));
        }

        let df = lf
            .select(columns)
            .collect()
            .with_context(|| format!("Failed to load historical dataset: {}", path.display()))?;

        let regions = df.column(REGION_COL)?.str()?;
        let seasons = df.column(SEASON_COL)?.str()?;
        let crops = df.column(CROP_COL)?.str()?;
        let sub_regions = if has_sub_region {
            Some(df.column(SUB_REGION_COL)?.str()?)
        } else {
            None
        };

        let mut records = Vec::with_capacity(df.height());
        for idx in 0..df.height() {
            if let (Some(region), Some(season), Some(crop)) =
                (regions.get(idx), seasons.get(idx), crops.get(idx))
            {
                records.push(HistoricalRecord {
                    region: region.to_string(),
                    sub_region: sub_regions.and_then(|s| s.get(idx)).map(|s| s.to_string()),
                    season: season.to_string(),
                    crop: crop.to_string(),
                });
            }
        }

        let index = Self::from_records(records, include_whole_year);
        tracing::info!(
            "Historical crop index built in {:?} ({} records, {} regions, {} seasons)",
            start.elapsed(),
            index.records,
            index.regions.len(),
            index.seasons.len()
        );

        Ok(index)
    }

    /// Build the index from already-parsed records
    ///
    /// With `include_whole_year`, crops recorded under the "Whole Year" season
    /// are merged into every season of the same region (and sub-region).
    pub fn from_records<I>(records: I, include_whole_year: bool) -> Self
    where
        I: IntoIterator<Item = HistoricalRecord>,
    {
        let mut by_region: FxHashMap<(String, String), CropSet> = FxHashMap::default();
        let mut by_sub_region: FxHashMap<(String, String, String), CropSet> = FxHashMap::default();
        let mut hierarchy: FxHashMap<String, FxHashSet<String>> = FxHashMap::default();
        let mut season_names: FxHashSet<String> = FxHashSet::default();
        let mut count = 0usize;

        for record in records {
            let region = normalize_name(&record.region);
            let season = normalize_name(&record.season);
            let crop = normalize_name(&record.crop);
            if is_missing(&region) || is_missing(&season) || is_missing(&crop) {
                continue;
            }
            let sub_region = record
                .sub_region
                .as_deref()
                .map(normalize_name)
                .filter(|s| !is_missing(s));

            count += 1;
            season_names.insert(season.clone());

            let subs = hierarchy.entry(region.clone()).or_default();
            if let Some(sub) = sub_region {
                subs.insert(sub.clone());
                by_sub_region
                    .entry((region.clone(), sub, season.clone()))
                    .or_default()
                    .insert(crop.clone());
            }

            by_region.entry((region, season)).or_default().insert(crop);
        }

        if include_whole_year {
            merge_whole_year(&mut by_region, |(region, season)| {
                (season != WHOLE_YEAR).then(|| (region.clone(), WHOLE_YEAR.to_string()))
            });
            merge_whole_year(&mut by_sub_region, |(region, sub, season)| {
                (season != WHOLE_YEAR)
                    .then(|| (region.clone(), sub.clone(), WHOLE_YEAR.to_string()))
            });
        }

        let mut regions: Vec<String> = hierarchy.keys().map(|r| title_case(r)).collect();
        regions.sort();

        let sub_regions: BTreeMap<String, Vec<String>> = hierarchy
            .into_iter()
            .map(|(region, subs)| {
                let mut display: Vec<String> = subs.iter().map(|s| title_case(s)).collect();
                display.sort();
                (title_case(&region), display)
            })
            .collect();

        let mut seasons: Vec<String> = season_names.iter().map(|s| title_case(s)).collect();
        seasons.sort();

        Self {
            by_region,
            by_sub_region,
            regions,
            sub_regions,
            seasons,
            season_keys: season_names,
            include_whole_year,
            records: count,
            available: count > 0,
            empty: CropSet::default(),
        }
    }

    /// Whether the dataset loaded and contained at least one usable record
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Crops historically observed for `region` in `season` (normalized names)
    ///
    /// Returns the empty set when the pair is unknown or the index is
    /// unavailable.
    pub fn lookup(&self, region: &str, season: &str) -> &CropSet {
        let region = normalize_name(region);
        let season = normalize_name(season);
        self.region_set(&region, &season).unwrap_or(&self.empty)
    }

    /// Like [`Self::lookup`] but narrowed to a sub-region when one is given
    /// and has records for that season.
    pub fn lookup_in(&self, region: &str, sub_region: Option<&str>, season: &str) -> &CropSet {
        let region = normalize_name(region);
        let season = normalize_name(season);

        if let Some(sub) = sub_region.map(normalize_name).filter(|s| !s.is_empty()) {
            let found = self
                .by_sub_region
                .get(&(region.clone(), sub.clone(), season.clone()))
                .or_else(|| {
                    self.perennial_fallback(&season).then(|| {
                        self.by_sub_region
                            .get(&(region.clone(), sub.clone(), WHOLE_YEAR.to_string()))
                    })?
                });
            if let Some(set) = found.filter(|s| !s.is_empty()) {
                return set;
            }
            tracing::debug!(
                "No sub-region records for '{}' / '{}' / '{}', using region level",
                region, sub, season
            );
        }

        self.region_set(&region, &season).unwrap_or(&self.empty)
    }

    fn region_set(&self, region: &str, season: &str) -> Option<&CropSet> {
        self.by_region
            .get(&(region.to_string(), season.to_string()))
            .or_else(|| {
                // No seasonal records for this region: perennials still apply
                self.perennial_fallback(season).then(|| {
                    self.by_region
                        .get(&(region.to_string(), WHOLE_YEAR.to_string()))
                })?
            })
    }

    /// Whole-year records stand in for a missing season only when merging is
    /// enabled and the season is one the dataset knows about.
    fn perennial_fallback(&self, season: &str) -> bool {
        self.include_whole_year && season != WHOLE_YEAR && self.season_keys.contains(season)
    }

    /// Sorted display names of all regions
    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    /// Region → sorted sub-regions (display names)
    pub fn sub_regions(&self) -> &BTreeMap<String, Vec<String>> {
        &self.sub_regions
    }

    /// Sorted display names of all seasons in the dataset
    pub fn seasons(&self) -> &[String] {
        &self.seasons
    }

    pub fn stats(&self) -> HistoryStats {
        HistoryStats {
            available: self.available,
            records: self.records,
            regions: self.regions.len(),
            sub_regions: self.sub_regions.values().map(|v| v.len()).sum(),
            seasons: self.seasons.len(),
            region_season_pairs: self.by_region.len(),
        }
    }
}

/// Union each key's whole-year sibling set into it
fn merge_whole_year<K, F>(map: &mut FxHashMap<K, CropSet>, whole_year_key: F)
where
    K: std::hash::Hash + Eq + Clone,
    F: Fn(&K) -> Option<K>,
{
    let additions: Vec<(K, CropSet)> = map
        .keys()
        .filter_map(|key| {
            let wy = whole_year_key(key)?;
            map.get(&wy).map(|set| (key.clone(), set.clone()))
        })
        .collect();

    for (key, crops) in additions {
        if let Some(set) = map.get_mut(&key) {
            set.extend(crops);
        }
    }
}
