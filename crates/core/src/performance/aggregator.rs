use crate::domain::performance::{CandidateMeta, PerformanceRow};
use crate::domain::round_dp;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Holding periods (trading days) reported per horizon.
pub const HORIZONS: [i32; 4] = [1, 2, 3, 5];
const GROUPING_HORIZON: i32 = 1;
const EXTREMES_LEN: usize = 5;
const UNBUYABLE_LIST_LEN: usize = 10;

pub const DEFAULT_ROLE: &str = "follower";
const UNKNOWN_LABEL: &str = "unknown";
const SCORE_BUCKETS: [&str; 4] = ["90+", "80-89", "70-79", "<70"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonStats {
    pub horizon: String,
    pub days_held: i32,
    pub count: usize,
    pub avg_return: f64,
    pub win_rate: f64,
    pub max_return: f64,
    pub min_return: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub label: String,
    pub count: usize,
    pub avg_return: f64,
    pub win_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedReturn {
    pub code: String,
    pub name: String,
    pub sector: String,
    pub role: Option<String>,
    pub recommend_price: f64,
    pub return_pct: f64,
    pub report_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnbuyableEntry {
    pub code: String,
    pub name: String,
    pub sector: String,
    pub role: Option<String>,
    pub open_change: f64,
    pub change_pct: f64,
    pub reason: Option<String>,
    pub report_date: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub total_count: usize,
    pub buyable_count: usize,
    pub unbuyable_count: usize,
    pub win_count: usize,
    pub win_rate: f64,
    pub avg_return: f64,
    pub by_horizon: Vec<HorizonStats>,
    pub by_role: Vec<GroupStats>,
    pub by_score: Vec<GroupStats>,
    pub by_volume: Vec<GroupStats>,
    pub by_strength: Vec<GroupStats>,
    pub by_weak_to_strong: Vec<GroupStats>,
    pub by_leading_mover: Vec<GroupStats>,
    pub best: Vec<RankedReturn>,
    pub worst: Vec<RankedReturn>,
    pub unbuyable: Vec<UnbuyableEntry>,
}

/// Observations of one recommended instrument, keyed by holding period.
struct Tracked<'a> {
    meta: &'a CandidateMeta,
    returns: BTreeMap<i32, f64>,
}

impl Tracked<'_> {
    fn grouping_return(&self) -> Option<f64> {
        self.returns.get(&GROUPING_HORIZON).copied()
    }
}

/// Folds joined rows into one entry per candidate, in first-seen order.
fn collect(rows: &[PerformanceRow]) -> Vec<Tracked<'_>> {
    let mut index: HashMap<Uuid, usize> = HashMap::new();
    let mut out: Vec<Tracked<'_>> = Vec::new();

    for row in rows {
        let idx = *index.entry(row.candidate.candidate_id).or_insert_with(|| {
            out.push(Tracked {
                meta: &row.candidate,
                returns: BTreeMap::new(),
            });
            out.len() - 1
        });
        if let Some(obs) = row.observation {
            out[idx].returns.insert(obs.days_held, obs.return_pct);
        }
    }
    out
}

struct Basic {
    count: usize,
    wins: usize,
    avg_return: f64,
    win_rate: f64,
}

fn basic(returns: &[f64]) -> Option<Basic> {
    if returns.is_empty() {
        return None;
    }
    let count = returns.len();
    let wins = returns.iter().filter(|r| **r > 0.0).count();
    Some(Basic {
        count,
        wins,
        avg_return: round_dp(returns.iter().sum::<f64>() / count as f64, 2),
        win_rate: round_dp(wins as f64 / count as f64 * 100.0, 1),
    })
}

fn horizon_stats(tracked: &[Tracked<'_>], days_held: i32) -> Option<HorizonStats> {
    let returns: Vec<f64> = tracked
        .iter()
        .filter_map(|t| t.returns.get(&days_held).copied())
        .collect();
    let b = basic(&returns)?;
    Some(HorizonStats {
        horizon: format!("T+{days_held}"),
        days_held,
        count: b.count,
        avg_return: b.avg_return,
        win_rate: b.win_rate,
        max_return: round_dp(returns.iter().copied().fold(f64::MIN, f64::max), 2),
        min_return: round_dp(returns.iter().copied().fold(f64::MAX, f64::min), 2),
    })
}

/// Groups by label using the T+1 return only. `seed` fixes the order of known labels;
/// other labels follow in first-seen order. Groups without observations are omitted.
fn group_by<F>(tracked: &[Tracked<'_>], seed: &[&str], label: F) -> Vec<GroupStats>
where
    F: Fn(&CandidateMeta) -> String,
{
    let mut groups: Vec<(String, Vec<f64>)> = seed.iter().map(|s| (s.to_string(), Vec::new())).collect();

    for t in tracked {
        let key = label(t.meta);
        let idx = match groups.iter().position(|(k, _)| *k == key) {
            Some(idx) => idx,
            None => {
                groups.push((key, Vec::new()));
                groups.len() - 1
            }
        };
        if let Some(r) = t.grouping_return() {
            groups[idx].1.push(r);
        }
    }

    groups
        .into_iter()
        .filter_map(|(label, returns)| {
            basic(&returns).map(|b| GroupStats {
                label,
                count: b.count,
                avg_return: b.avg_return,
                win_rate: b.win_rate,
            })
        })
        .collect()
}

pub fn score_bucket(score: i32) -> &'static str {
    match score {
        s if s >= 90 => SCORE_BUCKETS[0],
        s if s >= 80 => SCORE_BUCKETS[1],
        s if s >= 70 => SCORE_BUCKETS[2],
        _ => SCORE_BUCKETS[3],
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

fn ranked_return(t: &Tracked<'_>, return_pct: f64) -> RankedReturn {
    RankedReturn {
        code: t.meta.code.clone(),
        name: t.meta.name.clone(),
        sector: t.meta.sector.clone(),
        role: t.meta.role.clone(),
        recommend_price: t.meta.recommend_price,
        return_pct,
        report_date: t.meta.report_date,
    }
}

/// Summarises realized returns.
///
/// `rows` are candidates left-joined with their observations inside the window, already
/// restricted to buyable candidates unless the caller asked otherwise. `unbuyable` holds the
/// unbuyable candidates of the same window, newest first.
pub fn aggregate(rows: &[PerformanceRow], unbuyable: &[CandidateMeta]) -> PerformanceSummary {
    let tracked = collect(rows);

    let by_horizon = HORIZONS
        .iter()
        .filter_map(|h| horizon_stats(&tracked, *h))
        .collect();

    let by_role = group_by(&tracked, &[], |m| {
        non_empty_or(m.role.as_deref().unwrap_or_default(), DEFAULT_ROLE)
    });
    let by_score = group_by(&tracked, &SCORE_BUCKETS, |m| score_bucket(m.score).to_string());
    let by_volume = group_by(&tracked, &[], |m| non_empty_or(&m.volume_level, UNKNOWN_LABEL));
    let by_strength = group_by(&tracked, &[], |m| non_empty_or(&m.strength, UNKNOWN_LABEL));
    let by_weak_to_strong = group_by(&tracked, &["weak-to-strong", "other"], |m| {
        let label = if m.is_weak_to_strong { "weak-to-strong" } else { "other" };
        label.to_string()
    });
    let by_leading_mover = group_by(&tracked, &["leading-mover", "other"], |m| {
        let label = if m.is_leading_mover { "leading-mover" } else { "other" };
        label.to_string()
    });

    let t1: Vec<RankedReturn> = tracked
        .iter()
        .filter_map(|t| t.grouping_return().map(|r| ranked_return(t, r)))
        .collect();
    let overall = basic(&t1.iter().map(|r| r.return_pct).collect::<Vec<_>>());

    let mut best = t1.clone();
    best.sort_by(|a, b| b.return_pct.total_cmp(&a.return_pct));
    best.truncate(EXTREMES_LEN);
    // Ascending with ties kept in row order, not the reversed tail of `best`.
    let mut worst = t1;
    worst.sort_by(|a, b| a.return_pct.total_cmp(&b.return_pct));
    worst.truncate(EXTREMES_LEN);

    let buyable_count = tracked.iter().filter(|t| t.meta.is_buyable).count();
    let unbuyable_count = unbuyable.len();

    PerformanceSummary {
        total_count: buyable_count + unbuyable_count,
        buyable_count,
        unbuyable_count,
        win_count: overall.as_ref().map(|b| b.wins).unwrap_or(0),
        win_rate: overall.as_ref().map(|b| b.win_rate).unwrap_or(0.0),
        avg_return: overall.as_ref().map(|b| b.avg_return).unwrap_or(0.0),
        by_horizon,
        by_role,
        by_score,
        by_volume,
        by_strength,
        by_weak_to_strong,
        by_leading_mover,
        best,
        worst,
        unbuyable: unbuyable
            .iter()
            .take(UNBUYABLE_LIST_LEN)
            .map(|m| UnbuyableEntry {
                code: m.code.clone(),
                name: m.name.clone(),
                sector: m.sector.clone(),
                role: m.role.clone(),
                open_change: m.open_change,
                change_pct: m.change_pct,
                reason: m.unbuyable_reason.clone(),
                report_date: m.report_date,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::performance::Observation;

    fn meta(n: u128, score: i32) -> CandidateMeta {
        CandidateMeta {
            candidate_id: Uuid::from_u128(n),
            report_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            sector: "Robotics".to_string(),
            code: format!("{n:06}"),
            name: format!("Name {n}"),
            role: None,
            score,
            volume_level: "elevated".to_string(),
            strength: "firm".to_string(),
            is_weak_to_strong: false,
            is_leading_mover: false,
            recommend_price: 10.0,
            change_pct: 3.0,
            open_change: 1.0,
            is_buyable: true,
            unbuyable_reason: None,
        }
    }

    fn row(m: &CandidateMeta, obs: Option<(i32, f64)>) -> PerformanceRow {
        PerformanceRow {
            candidate: m.clone(),
            observation: obs.map(|(days_held, return_pct)| Observation {
                days_held,
                return_pct,
            }),
        }
    }

    #[test]
    fn horizons_use_only_exact_observations() {
        let a = meta(1, 85);
        let b = meta(2, 75);
        let c = meta(3, 60);
        let rows = vec![
            row(&a, Some((1, 2.0))),
            row(&a, Some((2, 3.0))),
            row(&b, Some((1, -1.0))),
            row(&c, None),
        ];
        let s = aggregate(&rows, &[]);

        let t1 = &s.by_horizon[0];
        assert_eq!(t1.horizon, "T+1");
        assert_eq!(t1.count, 2);
        assert_eq!(t1.avg_return, 0.5);
        assert_eq!(t1.win_rate, 50.0);
        assert_eq!(t1.max_return, 2.0);
        assert_eq!(t1.min_return, -1.0);

        let t2 = &s.by_horizon[1];
        assert_eq!((t2.days_held, t2.count), (2, 1));
        // no T+3 or T+5 observations at all
        assert_eq!(s.by_horizon.len(), 2);
        assert_eq!(s.buyable_count, 3);
    }

    #[test]
    fn groups_use_the_first_day_return_only() {
        let mut a = meta(1, 92);
        a.role = Some("leader".to_string());
        a.is_weak_to_strong = true;
        let b = meta(2, 81);
        let rows = vec![
            row(&a, Some((1, 4.0))),
            row(&a, Some((5, -8.0))),
            row(&b, Some((1, -2.0))),
            row(&b, Some((3, 6.0))),
        ];
        let s = aggregate(&rows, &[]);

        let roles: Vec<(&str, usize, f64)> = s
            .by_role
            .iter()
            .map(|g| (g.label.as_str(), g.count, g.avg_return))
            .collect();
        assert_eq!(roles, vec![("leader", 1, 4.0), (DEFAULT_ROLE, 1, -2.0)]);

        let buckets: Vec<&str> = s.by_score.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(buckets, vec!["90+", "80-89"]);

        assert_eq!(s.by_weak_to_strong[0].label, "weak-to-strong");
        assert_eq!(s.by_weak_to_strong[0].win_rate, 100.0);
        assert_eq!(s.by_weak_to_strong[1].win_rate, 0.0);
        assert_eq!(s.by_leading_mover.len(), 1);

        assert_eq!(s.win_count, 1);
        assert_eq!(s.win_rate, 50.0);
        assert_eq!(s.avg_return, 1.0);
    }

    #[test]
    fn win_rate_is_exact_ratio() {
        let rows: Vec<PerformanceRow> = [1.0, 0.5, -0.3]
            .iter()
            .enumerate()
            .map(|(i, r)| row(&meta(i as u128 + 1, 80), Some((1, *r))))
            .collect();
        let s = aggregate(&rows, &[]);
        assert_eq!(s.win_count, 2);
        assert_eq!(s.win_rate, 66.7);
    }

    #[test]
    fn empty_window_divides_by_nothing() {
        let s = aggregate(&[], &[]);
        assert_eq!(s.win_rate, 0.0);
        assert_eq!(s.avg_return, 0.0);
        assert!(s.by_horizon.is_empty());
        assert!(s.by_role.is_empty());
        assert_eq!(s.total_count, 0);
    }

    #[test]
    fn extremes_break_ties_by_row_order() {
        let returns = [3.0, 5.0, 3.0, -1.0, -1.0, 0.0, 7.0];
        let rows: Vec<PerformanceRow> = returns
            .iter()
            .enumerate()
            .map(|(i, r)| row(&meta(i as u128 + 1, 80), Some((1, *r))))
            .collect();
        let s = aggregate(&rows, &[]);

        let best: Vec<&str> = s.best.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(best, vec!["000007", "000002", "000001", "000003", "000006"]);
        let worst: Vec<&str> = s.worst.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(worst, vec!["000004", "000005", "000006", "000001", "000003"]);
    }

    #[test]
    fn unbuyable_counts_merge_into_total() {
        let rows = vec![row(&meta(1, 80), Some((1, 1.0))), row(&meta(2, 80), None)];
        let unbuyable: Vec<CandidateMeta> = (10..22)
            .map(|n| {
                let mut m = meta(n, 88);
                m.is_buyable = false;
                m.unbuyable_reason = Some("locked from open".to_string());
                m
            })
            .collect();
        let s = aggregate(&rows, &unbuyable);
        assert_eq!(s.buyable_count, 2);
        assert_eq!(s.unbuyable_count, 12);
        assert_eq!(s.total_count, 14);
        assert_eq!(s.unbuyable.len(), 10);
        assert_eq!(s.unbuyable[0].code, "000010");
    }
}
