use crate::domain::market::InstrumentSnapshot;
use crate::domain::{round_dp, LIMIT_UP_PCT};
use crate::scoring::rules::{at_least, first_match, Rule};
use serde::{Deserialize, Serialize};

/// Broad-market and sector moves the instrument is judged against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketContext {
    pub market_change: f64,
    pub sector_change: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OpenStrength {
    LimitUpAtOpen,
    StrongOpen,
    GapUpStrength,
    SlightGapUp,
    FlatOpen,
    SlightGapDown,
    WeakOpen,
}

impl OpenStrength {
    pub fn from_open_change(open_change: f64) -> Self {
        let rules: [Rule<f64, OpenStrength>; 6] = [
            Rule {
                when: |c: &f64| *c >= 9.5,
                then: OpenStrength::LimitUpAtOpen,
            },
            Rule {
                when: |c: &f64| *c >= 5.0,
                then: OpenStrength::StrongOpen,
            },
            Rule {
                when: |c: &f64| *c >= 3.0,
                then: OpenStrength::GapUpStrength,
            },
            Rule {
                when: |c: &f64| *c >= 1.0,
                then: OpenStrength::SlightGapUp,
            },
            Rule {
                when: |c: &f64| *c <= -3.0,
                then: OpenStrength::WeakOpen,
            },
            Rule {
                when: |c: &f64| *c <= -1.0,
                then: OpenStrength::SlightGapDown,
            },
        ];
        first_match(&rules, &open_change, OpenStrength::FlatOpen)
    }

    pub fn is_gap_up(self) -> bool {
        matches!(
            self,
            OpenStrength::LimitUpAtOpen
                | OpenStrength::StrongOpen
                | OpenStrength::GapUpStrength
                | OpenStrength::SlightGapUp
        )
    }

    pub fn is_gap_down(self) -> bool {
        matches!(self, OpenStrength::SlightGapDown | OpenStrength::WeakOpen)
    }

    pub fn label(self) -> &'static str {
        match self {
            OpenStrength::LimitUpAtOpen => "limit-up at open",
            OpenStrength::StrongOpen => "strong open",
            OpenStrength::GapUpStrength => "gap-up strength",
            OpenStrength::SlightGapUp => "slight gap-up",
            OpenStrength::FlatOpen => "flat open",
            OpenStrength::SlightGapDown => "slight gap-down",
            OpenStrength::WeakOpen => "weak open",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrengthTier {
    LimitUp,
    Strong,
    Firm,
    Choppy,
    Soft,
    Weak,
}

impl StrengthTier {
    const TIERS: [(f64, StrengthTier); 5] = [
        (LIMIT_UP_PCT, StrengthTier::LimitUp),
        (7.0, StrengthTier::Strong),
        (3.0, StrengthTier::Firm),
        (0.0, StrengthTier::Choppy),
        (-3.0, StrengthTier::Soft),
    ];

    pub fn from_change(change_pct: f64) -> Self {
        at_least(&Self::TIERS, change_pct, StrengthTier::Weak)
    }

    pub fn label(self) -> &'static str {
        match self {
            StrengthTier::LimitUp => "limit-up",
            StrengthTier::Strong => "strong",
            StrengthTier::Firm => "firm",
            StrengthTier::Choppy => "choppy",
            StrengthTier::Soft => "soft",
            StrengthTier::Weak => "weak",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WeakToStrongKind {
    GapDownRally,
    PullbackConfirmed,
    IntradayReversal,
}

impl WeakToStrongKind {
    pub fn label(self) -> &'static str {
        match self {
            WeakToStrongKind::GapDownRally => "gap-down-rally",
            WeakToStrongKind::PullbackConfirmed => "pullback-confirmed",
            WeakToStrongKind::IntradayReversal => "intraday-reversal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LeaderTag {
    CounterTrendRally,
    CounterTrendStrength,
    SectorLeader,
    IndependentStrength,
    SharpRally,
    StrongLock,
    Locked,
    OpenStrengthRealized,
}

impl LeaderTag {
    pub fn label(self) -> &'static str {
        match self {
            LeaderTag::CounterTrendRally => "counter-trend-rally",
            LeaderTag::CounterTrendStrength => "counter-trend-strength",
            LeaderTag::SectorLeader => "sector-leader",
            LeaderTag::IndependentStrength => "independent-strength",
            LeaderTag::SharpRally => "sharp-rally",
            LeaderTag::StrongLock => "strong-lock",
            LeaderTag::Locked => "locked",
            LeaderTag::OpenStrengthRealized => "open-strength-realized",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrengthAnalysis {
    pub open_strength: OpenStrength,
    /// Percent, rounded to 2 dp.
    pub open_change: f64,
    pub strength: StrengthTier,
    pub is_weak_to_strong: bool,
    /// Kind reported by the last weak-to-strong rule that matched.
    pub weak_to_strong_kind: Option<WeakToStrongKind>,
    pub is_leading_mover: bool,
    pub leading_mover_tags: Vec<LeaderTag>,
}

struct Inputs {
    change: f64,
    open_change: f64,
    amplitude: f64,
    position: Option<f64>,
}

impl Inputs {
    fn closed_above(&self, fraction: f64) -> bool {
        self.position.is_some_and(|p| p >= fraction)
    }
}

fn weak_to_strong(i: &Inputs) -> Option<WeakToStrongKind> {
    let rules: [Rule<Inputs, WeakToStrongKind>; 3] = [
        Rule {
            when: |i: &Inputs| i.open_change <= 0.0 && i.change >= 3.0,
            then: WeakToStrongKind::GapDownRally,
        },
        Rule {
            when: |i: &Inputs| i.amplitude >= 5.0 && i.change >= 3.0 && i.closed_above(0.7),
            then: WeakToStrongKind::PullbackConfirmed,
        },
        Rule {
            when: |i: &Inputs| i.amplitude >= 4.0 && i.change >= 5.0 && i.open_change <= 1.0,
            then: WeakToStrongKind::IntradayReversal,
        },
    ];
    // Later patterns overwrite earlier ones.
    rules
        .iter()
        .filter(|rule| (rule.when)(i))
        .map(|rule| rule.then)
        .last()
}

fn leading_mover(i: &Inputs, ctx: MarketContext) -> (bool, Vec<LeaderTag>) {
    let mut flagged = false;
    let mut tags = Vec::new();
    let mut tag = |t: LeaderTag, sets_flag: bool| {
        tags.push(t);
        flagged |= sets_flag;
    };

    if ctx.market_change < -0.5 && i.change > 0.0 {
        tag(LeaderTag::CounterTrendRally, true);
    } else if ctx.market_change < 0.0 && i.change >= 3.0 {
        tag(LeaderTag::CounterTrendStrength, true);
    }

    if ctx.sector_change < 1.0 && i.change >= ctx.sector_change + 3.0 {
        tag(LeaderTag::SectorLeader, true);
    } else if ctx.sector_change < 0.0 && i.change > 0.0 {
        tag(LeaderTag::IndependentStrength, true);
    }

    if i.amplitude >= 6.0 && i.change >= 5.0 && i.closed_above(0.8) {
        tag(LeaderTag::SharpRally, true);
    }

    if i.change >= LIMIT_UP_PCT {
        if i.amplitude <= 5.0 {
            tag(LeaderTag::StrongLock, true);
        } else if i.amplitude <= 8.0 {
            // A wider-range lock is noted but is not leadership on its own.
            tag(LeaderTag::Locked, false);
        }
    }

    if i.open_change >= 3.0 && i.change >= i.open_change {
        tag(LeaderTag::OpenStrengthRealized, true);
    }

    (flagged, tags)
}

pub fn classify(snapshot: &InstrumentSnapshot, ctx: MarketContext) -> StrengthAnalysis {
    let inputs = Inputs {
        change: snapshot.change_pct,
        open_change: snapshot.open_change_pct(),
        amplitude: snapshot.amplitude,
        position: snapshot.intraday_position(),
    };

    let weak_to_strong_kind = weak_to_strong(&inputs);
    let (is_leading_mover, leading_mover_tags) = leading_mover(&inputs, ctx);

    StrengthAnalysis {
        open_strength: OpenStrength::from_open_change(inputs.open_change),
        open_change: round_dp(inputs.open_change, 2),
        strength: StrengthTier::from_change(inputs.change),
        is_weak_to_strong: weak_to_strong_kind.is_some(),
        weak_to_strong_kind,
        is_leading_mover,
        leading_mover_tags,
    }
}
