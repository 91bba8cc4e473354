use crate::domain::candidate::{CandidateDisplay, CandidateRecord, RankedEntry, UnavailableInstrument};
use crate::domain::market::InstrumentSnapshot;
use crate::error::EngineError;
use crate::scoring::composite::CompositeScorer;
use crate::scoring::strength::MarketContext;
use crate::scoring::{format, narrator};

#[derive(Debug, Clone, Default)]
pub struct CandidateRanker {
    scorer: CompositeScorer,
}

impl CandidateRanker {
    pub fn new(scorer: CompositeScorer) -> Self {
        Self { scorer }
    }

    /// Scores one instrument and renders it for display.
    pub fn build(
        &self,
        snapshot: &InstrumentSnapshot,
        ctx: MarketContext,
    ) -> Result<CandidateRecord, EngineError> {
        let detail = self.scorer.score(snapshot, ctx)?;
        let price = snapshot.valid_price().unwrap_or_default();

        let display = CandidateDisplay {
            price: format::price(price),
            change_pct: format::change_pct(snapshot.change_pct),
            volume: format::volume_lots(snapshot.volume),
            traded_value: format::traded_value(snapshot.traded_value),
            market_cap: format::market_cap(snapshot.market_cap),
            amplitude: format::percent(snapshot.amplitude, 2),
            turnover_rate: format::percent(detail.volume_price.turnover_rate, 1),
        };

        Ok(CandidateRecord {
            code: snapshot.code.clone(),
            name: snapshot.name.clone(),
            price,
            change_pct: snapshot.change_pct,
            amplitude: snapshot.amplitude,
            traded_value: snapshot.traded_value,
            market_cap: snapshot.market_cap,
            signal: narrator::signal(&detail),
            rationale: narrator::rationale(&detail),
            is_first_limit_up: false,
            detail,
            display,
        })
    }

    /// Ranks one sector's instruments: valid records by score (stable), then the
    /// instruments that could not be scored, in input order.
    pub fn rank(&self, instruments: &[InstrumentSnapshot], ctx: MarketContext) -> Vec<RankedEntry> {
        let mut valid = Vec::with_capacity(instruments.len());
        let mut unavailable = Vec::new();

        for snapshot in instruments {
            match self.build(snapshot, ctx) {
                Ok(record) => valid.push(record),
                Err(err) => {
                    tracing::debug!(code = %snapshot.code, error = %err, "instrument skipped");
                    unavailable.push(UnavailableInstrument {
                        code: snapshot.code.clone(),
                        name: snapshot.name.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }

        valid.sort_by(|a, b| b.score().cmp(&a.score()));

        tag_first_limit_up(valid)
            .into_iter()
            .map(|c| RankedEntry::Candidate(Box::new(c)))
            .chain(unavailable.into_iter().map(RankedEntry::Unavailable))
            .collect()
    }
}

/// Marks the first limit-up record of an already sorted list and clears the flag everywhere else.
pub fn tag_first_limit_up(sorted: Vec<CandidateRecord>) -> Vec<CandidateRecord> {
    let first = sorted.iter().position(|c| c.is_limit_up());
    sorted
        .into_iter()
        .enumerate()
        .map(|(idx, c)| CandidateRecord {
            is_first_limit_up: Some(idx) == first,
            ..c
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(code: &str, change_pct: f64, turnover_value: f64) -> InstrumentSnapshot {
        InstrumentSnapshot {
            code: code.to_string(),
            name: format!("Name {code}"),
            price: Some(10.0 * (1.0 + change_pct / 100.0)),
            prev_close: 10.0,
            open: 10.0,
            high: 10.0 * (1.0 + change_pct.max(0.0) / 100.0),
            low: 9.9,
            change_pct,
            amplitude: 2.0,
            volume: 120_000.0,
            traded_value: turnover_value,
            float_cap: 1.0e10,
            ..Default::default()
        }
    }

    fn ctx() -> MarketContext {
        MarketContext {
            market_change: 0.2,
            sector_change: 1.5,
        }
    }

    #[test]
    fn sorts_by_score_and_appends_unavailable() {
        let mut halted = quote("600003", 0.0, 0.0);
        halted.price = None;
        let input = vec![
            quote("600001", 0.5, 3.0e8),
            halted,
            quote("600002", 5.0, 1.0e9),
        ];
        let out = CandidateRanker::default().rank(&input, ctx());
        let codes: Vec<&str> = out.iter().map(|e| e.code()).collect();
        assert_eq!(codes, vec!["600002", "600001", "600003"]);
        match &out[2] {
            RankedEntry::Unavailable(u) => {
                assert_eq!(u.name, "Name 600003");
                assert!(u.error.contains("price"));
            }
            other => panic!("expected unavailable entry, got {other:?}"),
        }
    }

    #[test]
    fn ties_keep_input_order() {
        let input = vec![
            quote("000010", 1.0, 3.0e8),
            quote("000011", 1.0, 3.0e8),
            quote("000012", 1.0, 3.0e8),
        ];
        let out = CandidateRanker::default().rank(&input, ctx());
        let scores: Vec<i32> = out.iter().filter_map(|e| e.as_candidate()).map(|c| c.score()).collect();
        assert!(scores.windows(2).all(|w| w[0] == w[1]));
        let codes: Vec<&str> = out.iter().map(|e| e.code()).collect();
        assert_eq!(codes, vec!["000010", "000011", "000012"]);
    }

    #[test]
    fn only_the_top_ranked_limit_up_is_first() {
        let input = vec![
            quote("300001", 10.0, 3.0e8),
            quote("300002", 10.01, 1.0e9),
            quote("300003", 2.0, 3.0e8),
        ];
        let out = CandidateRanker::default().rank(&input, ctx());
        let firsts: Vec<&str> = out
            .iter()
            .filter_map(|e| e.as_candidate())
            .filter(|c| c.is_first_limit_up)
            .map(|c| c.code.as_str())
            .collect();
        assert_eq!(firsts.len(), 1);
        let top = out[0].as_candidate().unwrap();
        assert!(top.is_limit_up());
        assert_eq!(firsts[0], top.code);
    }

    #[test]
    fn no_limit_up_means_no_first_flag() {
        let input = vec![quote("000020", 3.0, 3.0e8), quote("000021", 6.0, 3.0e8)];
        let out = CandidateRanker::default().rank(&input, ctx());
        assert!(out
            .iter()
            .filter_map(|e| e.as_candidate())
            .all(|c| !c.is_first_limit_up));
    }

    #[test]
    fn tagging_clears_stale_flags() {
        let ranker = CandidateRanker::default();
        let mut stale = ranker.build(&quote("1", 1.0, 3.0e8), ctx()).unwrap();
        stale.is_first_limit_up = true;
        let limit = ranker.build(&quote("2", 10.0, 3.0e8), ctx()).unwrap();
        let out = tag_first_limit_up(vec![stale, limit]);
        assert!(!out[0].is_first_limit_up);
        assert!(out[1].is_first_limit_up);
    }

    #[test]
    fn ranking_is_repeatable() {
        let input = vec![
            quote("000030", 4.0, 9.0e8),
            quote("000031", 9.95, 2.0e8),
            quote("000032", -2.0, 1.6e9),
        ];
        let ranker = CandidateRanker::default();
        assert_eq!(ranker.rank(&input, ctx()), ranker.rank(&input, ctx()));
    }

    #[test]
    fn renders_display_fields() {
        let c = CandidateRanker::default()
            .build(&quote("000040", 5.0, 1.2e9), ctx())
            .unwrap();
        assert_eq!(c.display.price, "10.50");
        assert_eq!(c.display.change_pct, "+5.00%");
        assert_eq!(c.display.volume, "12.0万手");
        assert_eq!(c.display.traded_value, "12.00亿");
        assert_eq!(c.display.turnover_rate, "12.0%");
        assert_eq!(c.display.market_cap, "-");
    }
}
