//! Debug-filter calculation and optimization.
//!
//! A filter `{to, years, from}` excludes years `< to`, `> from` and every
//! listed year. The calculation bounds the filter by the vehicle generation;
//! the optimization only ever tightens an authored filter.

use std::collections::BTreeSet;

use super::generations::Generation;
use crate::document::Filter;

/// Outcome of [`optimize_debug_filter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOptimization {
    /// Nothing to tighten.
    AlreadyOptimal,
    /// Every component was removed; drop the `dbgfilter` field.
    Remove,
    Tightened(Filter),
}

/// Derive a bounded filter from the supported and unsupported years.
///
/// `None` means no bounded filter is possible (no year data, or every year
/// falls outside the generation) and the caller should fall back to the
/// unconditional `dbg` flag. A generation that does not hold every supported
/// year is not used as a bound.
pub fn calculate_debug_filter(
    supported: &BTreeSet<i32>,
    unsupported: &BTreeSet<i32>,
    generation: Option<&Generation>,
) -> Option<Filter> {
    let all: BTreeSet<i32> = supported.union(unsupported).copied().collect();
    let (mut min, mut max) = (*all.first()?, *all.last()?);

    // A bound that would push a supported year outside the filter is ignored.
    let generation = generation.filter(|g| supported.iter().all(|year| g.contains(*year)));
    if generation.is_none() && !supported.is_empty() {
        tracing::debug!("supported years span generations; using year bounds only");
    }

    if let Some(generation) = generation {
        min = min.max(generation.start_year);
        if let Some(end) = generation.end_year {
            max = max.min(end);
        }
    }
    if min > max {
        tracing::debug!(min, max, "all known years fall outside the generation");
        return None;
    }

    let to = min - 1;
    let to = generation
        .is_none_or(|g| to >= g.start_year)
        .then_some(to);

    let from = max + 1;
    let from = generation
        .is_none_or(|g| g.end_year.is_none_or(|end| from <= end + 1))
        .then_some(from);

    let gaps: Vec<i32> = (min + 1..max)
        .filter(|year| !supported.contains(year) && !unsupported.contains(year))
        .collect();

    let filter = Filter {
        to,
        years: (!gaps.is_empty()).then_some(gaps),
        from,
    };
    (!filter.is_empty()).then_some(filter)
}

/// Tighten an authored filter so it stops excluding supported years.
///
/// `to` drops below the lowest supported year it covers, `from` rises above
/// the highest one, and supported entries leave `years`. This departs from
/// the "(max such year) - 1" formula on purpose: stepping past the highest
/// covered year can still leave a lower supported year excluded, so the
/// bound moves past the lowest (or, for `from`, the highest) one and a single
/// pass converges.
pub fn optimize_debug_filter(existing: &Filter, supported: &BTreeSet<i32>) -> FilterOptimization {
    let mut out = existing.clone();
    let mut changed = false;

    if let Some(to) = existing.to
        && let Some(lowest) = supported.iter().copied().find(|year| *year <= to)
    {
        out.to = Some(lowest - 1);
        changed = true;
    }

    if let Some(from) = existing.from
        && let Some(highest) = supported.iter().rev().copied().find(|year| *year >= from)
    {
        out.from = Some(highest + 1);
        changed = true;
    }

    if let Some(years) = &existing.years {
        let kept: Vec<i32> = years
            .iter()
            .copied()
            .filter(|year| !supported.contains(year))
            .collect();
        if kept.len() != years.len() {
            changed = true;
        }
        out.years = (!kept.is_empty()).then_some(kept);
    }

    finish(changed, out)
}

/// [`optimize_debug_filter`], then list unknown-status gap years between the
/// lowest and highest supported year. Gaps are only added when the filter has
/// no `years` array of its own.
pub fn optimize_debug_filter_with_gaps(
    existing: &Filter,
    supported: &BTreeSet<i32>,
    unsupported: &BTreeSet<i32>,
) -> FilterOptimization {
    let base = optimize_debug_filter(existing, supported);
    if existing.years.is_some() {
        return base;
    }
    let (Some(&low), Some(&high)) = (supported.first(), supported.last()) else {
        return base;
    };

    let mut out = match &base {
        FilterOptimization::AlreadyOptimal => existing.clone(),
        FilterOptimization::Remove => Filter::default(),
        FilterOptimization::Tightened(filter) => filter.clone(),
    };

    let gaps: Vec<i32> = (low + 1..high)
        .filter(|year| {
            !supported.contains(year) && !unsupported.contains(year) && !out.excludes(*year)
        })
        .collect();
    if gaps.is_empty() {
        return base;
    }
    out.years = Some(gaps);
    finish(true, out)
}

fn finish(changed: bool, out: Filter) -> FilterOptimization {
    if !changed {
        FilterOptimization::AlreadyOptimal
    } else if out.is_empty() {
        FilterOptimization::Remove
    } else {
        FilterOptimization::Tightened(out)
    }
}

impl FilterOptimization {
    /// The filter to keep after optimization, `None` when it should go.
    pub fn resolve(&self, existing: &Filter) -> Option<Filter> {
        match self {
            Self::AlreadyOptimal => Some(existing.clone()),
            Self::Remove => None,
            Self::Tightened(filter) => Some(filter.clone()),
        }
    }
}

/// Collapse years into ranges: `["2019","2020","2021","2023"]` gives
/// `"2019-2021, 2023"`. Entries that are not years are ignored.
pub fn format_years_as_ranges<S: AsRef<str>>(years: &[S]) -> String {
    let parsed: BTreeSet<i32> = years
        .iter()
        .filter_map(|y| y.as_ref().trim().parse().ok())
        .collect();
    format_year_set(&parsed)
}

pub fn format_year_set(years: &BTreeSet<i32>) -> String {
    let mut ranges: Vec<(i32, i32)> = Vec::new();
    for &year in years {
        match ranges.last_mut() {
            Some((_, end)) if *end + 1 == year => *end = year,
            _ => ranges.push((year, year)),
        }
    }
    ranges
        .iter()
        .map(|(start, end)| {
            if start == end {
                start.to_string()
            } else {
                format!("{start}-{end}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(years: &[i32]) -> BTreeSet<i32> {
        years.iter().copied().collect()
    }

    fn ongoing(start: i32) -> Generation {
        Generation {
            name: "Gen".to_string(),
            start_year: start,
            end_year: None,
            description: None,
        }
    }

    fn bounded(start: i32, end: i32) -> Generation {
        Generation {
            end_year: Some(end),
            ..ongoing(start)
        }
    }

    #[test]
    fn test_calculate_with_gap_and_ongoing_generation() {
        let filter =
            calculate_debug_filter(&set(&[2019, 2021]), &set(&[]), Some(&ongoing(2018))).unwrap();
        assert_eq!(
            filter,
            Filter {
                to: Some(2018),
                years: Some(vec![2020]),
                from: Some(2022),
            }
        );
    }

    #[test]
    fn test_calculate_without_data_is_none() {
        assert_eq!(calculate_debug_filter(&set(&[]), &set(&[]), None), None);
    }

    #[test]
    fn test_calculate_drops_to_below_generation_start() {
        let filter =
            calculate_debug_filter(&set(&[2018, 2019]), &set(&[]), Some(&bounded(2018, 2022)))
                .unwrap();
        assert_eq!(filter.to, None);
        assert_eq!(filter.from, Some(2020));
        assert_eq!(filter.years, None);
    }

    #[test]
    fn test_calculate_clamps_to_generation() {
        let filter = calculate_debug_filter(
            &set(&[2018, 2019]),
            &set(&[2015, 2024]),
            Some(&bounded(2017, 2021)),
        )
        .unwrap();
        // min clamps to 2017 (to = 2016 < start, dropped), max clamps to 2021
        assert_eq!(filter.to, None);
        assert_eq!(filter.from, Some(2022));
        assert_eq!(filter.years, Some(vec![2020]));
    }

    #[test]
    fn test_calculate_never_excludes_supported_years() {
        let supported = set(&[2015, 2019, 2021]);
        let unsupported = set(&[]);
        let filter =
            calculate_debug_filter(&supported, &unsupported, Some(&bounded(2010, 2017))).unwrap();
        for year in &supported {
            assert!(!filter.excludes(*year), "{year} excluded by {filter:?}");
        }
        assert_eq!(filter.to, Some(2014));
        assert_eq!(filter.from, Some(2022));
        assert_eq!(
            optimize_debug_filter_with_gaps(&filter, &supported, &unsupported),
            FilterOptimization::AlreadyOptimal
        );
    }

    #[test]
    fn test_calculate_known_unsupported_is_not_a_gap() {
        let filter = calculate_debug_filter(&set(&[2019, 2021]), &set(&[2020]), None).unwrap();
        assert_eq!(filter.years, None);
        assert_eq!(filter.to, Some(2018));
        assert_eq!(filter.from, Some(2022));
    }

    #[test]
    fn test_optimize_after_calculate_is_noop() {
        let cases: Vec<(BTreeSet<i32>, BTreeSet<i32>, Option<Generation>)> = vec![
            (set(&[2019, 2021]), set(&[]), Some(ongoing(2018))),
            (set(&[2019, 2021]), set(&[2020]), None),
            (set(&[2016, 2017, 2020]), set(&[2022]), Some(bounded(2015, 2023))),
            (set(&[2010]), set(&[]), None),
        ];
        for (supported, unsupported, generation) in cases {
            let filter =
                calculate_debug_filter(&supported, &unsupported, generation.as_ref()).unwrap();
            assert_eq!(
                optimize_debug_filter(&filter, &supported),
                FilterOptimization::AlreadyOptimal
            );
            assert_eq!(
                optimize_debug_filter_with_gaps(&filter, &supported, &unsupported),
                FilterOptimization::AlreadyOptimal
            );
        }
    }

    #[test]
    fn test_optimize_tightens_to_and_from() {
        let existing = Filter {
            to: Some(2020),
            years: None,
            from: Some(2015),
        };
        let result = optimize_debug_filter(&existing, &set(&[2016, 2018]));
        assert_eq!(
            result,
            FilterOptimization::Tightened(Filter {
                to: Some(2015),
                years: None,
                from: Some(2019),
            })
        );
    }

    #[test]
    fn test_optimize_empties_filter() {
        let existing = Filter {
            years: Some(vec![2019, 2020]),
            ..Filter::default()
        };
        assert_eq!(
            optimize_debug_filter(&existing, &set(&[2019, 2020])),
            FilterOptimization::Remove
        );
    }

    #[test]
    fn test_optimize_drops_supported_years_only() {
        let existing = Filter {
            to: Some(2010),
            years: Some(vec![2019, 2020]),
            from: Some(2030),
        };
        let result = optimize_debug_filter(&existing, &set(&[2019]));
        assert_eq!(
            result,
            FilterOptimization::Tightened(Filter {
                to: Some(2010),
                years: Some(vec![2020]),
                from: Some(2030),
            })
        );
    }

    #[test]
    fn test_optimize_converges_in_one_pass() {
        let existing = Filter {
            to: Some(2018),
            years: Some(vec![2020, 2021]),
            from: Some(2019),
        };
        let supported = set(&[2013, 2015, 2017, 2020, 2024]);
        let once = optimize_debug_filter(&existing, &supported);
        let FilterOptimization::Tightened(first) = once else {
            panic!("expected a tightened filter, got {once:?}");
        };
        assert_eq!(
            optimize_debug_filter(&first, &supported),
            FilterOptimization::AlreadyOptimal
        );
    }

    #[test]
    fn test_gap_filling_only_without_years_array() {
        let existing = Filter {
            to: Some(2017),
            years: None,
            from: Some(2023),
        };
        let supported = set(&[2018, 2021]);
        let unsupported = set(&[2019]);
        assert_eq!(
            optimize_debug_filter_with_gaps(&existing, &supported, &unsupported),
            FilterOptimization::Tightened(Filter {
                to: Some(2017),
                years: Some(vec![2020]),
                from: Some(2023),
            })
        );

        // A pre-existing years array is only pruned, never extended.
        let with_years = Filter {
            years: Some(vec![2025]),
            ..existing.clone()
        };
        assert_eq!(
            optimize_debug_filter_with_gaps(&with_years, &supported, &unsupported),
            FilterOptimization::AlreadyOptimal
        );
    }

    #[test]
    fn test_format_years_as_ranges() {
        assert_eq!(
            format_years_as_ranges(&["2019", "2020", "2021", "2023"]),
            "2019-2021, 2023"
        );
        let empty: [&str; 0] = [];
        assert_eq!(format_years_as_ranges(&empty), "");
        assert_eq!(format_years_as_ranges(&["2020", "x", "2018"]), "2018, 2020");
    }
}
