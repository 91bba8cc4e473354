//! Sector quality along three axes: size of the theme, novelty and strength of the thesis.

use crate::domain::market::{InstrumentSnapshot, SectorHistory, SectorSnapshot};
use crate::domain::{round_dp, LIMIT_UP_PCT};
use crate::scoring::rules::at_least;
use serde::{Deserialize, Serialize};

/// Themes with a trillion-scale addressable market.
pub const MEGA_THEME_KEYWORDS: &[&str] = &[
    "人工智能", "AI", "芯片", "半导体", "新能源", "光伏", "储能", "锂电",
    "汽车", "智能驾驶", "机器人", "数字经济", "云计算", "大数据", "5G", "6G",
    "医药", "创新药", "医疗器械", "军工", "航空航天", "卫星", "量子",
    "消费电子", "元宇宙", "虚拟现实", "AR", "VR", "物联网", "工业互联网",
];

/// National-strategy policy themes.
pub const POLICY_KEYWORDS: &[&str] = &[
    "国产替代", "自主可控", "信创", "安全", "数字中国", "新基建",
    "碳中和", "碳达峰", "双碳", "乡村振兴", "一带一路", "国企改革",
    "专精特新", "卡脖子", "核心技术", "战略新兴", "高端制造",
];

/// Recently emerged concepts.
pub const EMERGING_KEYWORDS: &[&str] = &[
    "Sora", "GPT", "大模型", "AIGC", "生成式", "具身智能", "人形机器人",
    "低空经济", "飞行汽车", "eVTOL", "固态电池", "钠离子", "氢能",
    "脑机接口", "合成生物", "商业航天", "可控核聚变", "室温超导",
    "MR", "苹果", "华为", "鸿蒙", "星链", "算力", "液冷", "CPO",
];

const TAG_THRESHOLD: i32 = 60;
const MEGA_THEME_POINTS: i32 = 15;

/// Ordered scan; the earliest keyword in the list wins.
pub fn first_keyword(name: &str, keywords: &[&'static str]) -> Option<&'static str> {
    keywords.iter().copied().find(|kw| name.contains(kw))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QualityDimension {
    Size,
    Novelty,
    Strength,
}

impl QualityDimension {
    pub fn label(self) -> &'static str {
        match self {
            QualityDimension::Size => "Size",
            QualityDimension::Novelty => "Novelty",
            QualityDimension::Strength => "Strength",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            QualityDimension::Size => "#3498db",
            QualityDimension::Novelty => "#9b59b6",
            QualityDimension::Strength => "#e74c3c",
        }
    }

    fn default_desc(self) -> &'static str {
        match self {
            QualityDimension::Size => "large market capacity",
            QualityDimension::Novelty => "fresh concept",
            QualityDimension::Strength => "solid thesis",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubScore {
    pub score: i32,
    /// Matched reasons in evaluation order.
    pub reasons: Vec<String>,
}

impl SubScore {
    pub fn first_reason(&self) -> Option<&str> {
        self.reasons.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityTag {
    pub dimension: QualityDimension,
    pub name: String,
    pub score: i32,
    pub color: String,
    pub desc: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QualityRating {
    Premium,
    Good,
    Average,
    Weak,
}

impl QualityRating {
    pub fn from_total(total: f64) -> Self {
        at_least(
            &[
                (80.0, QualityRating::Premium),
                (60.0, QualityRating::Good),
                (40.0, QualityRating::Average),
            ],
            total,
            QualityRating::Weak,
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            QualityRating::Premium => "premium",
            QualityRating::Good => "good",
            QualityRating::Average => "average",
            QualityRating::Weak => "weak",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            QualityRating::Premium => "#2ecc71",
            QualityRating::Good => "#3498db",
            QualityRating::Average => "#f39c12",
            QualityRating::Weak => "#95a5a6",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorQuality {
    pub size: SubScore,
    pub novelty: SubScore,
    pub strength: SubScore,
    pub total_score: f64,
    pub rating: QualityRating,
    pub rating_color: String,
    pub tags: Vec<QualityTag>,
}

pub fn size_score(sector: &SectorSnapshot, instruments: &[InstrumentSnapshot]) -> SubScore {
    let mut score: i32 = 0;
    let mut reasons = Vec::new();

    if let Some(kw) = first_keyword(&sector.name, MEGA_THEME_KEYWORDS) {
        score += MEGA_THEME_POINTS;
        reasons.push(format!("mega theme: {kw}"));
    }

    let count = sector.constituent_count();
    if count >= 100 {
        reasons.push(format!("{count} constituents"));
    }
    score += at_least(&[(100.0, 20), (50.0, 15), (30.0, 10), (15.0, 5)], count as f64, 0);

    let total_cap: f64 = instruments.iter().map(|s| s.market_cap).sum();
    if total_cap >= 1.0e12 {
        reasons.push("trillion-scale market cap".to_string());
    }
    score += at_least(
        &[(1.0e12, 25), (5.0e11, 20), (1.0e11, 15), (5.0e10, 10)],
        total_cap,
        0,
    );

    let total_traded: f64 = instruments.iter().map(|s| s.traded_value).sum();
    if total_traded >= 5.0e10 {
        reasons.push("heavy trading".to_string());
    }
    score += at_least(&[(5.0e10, 15), (2.0e10, 10), (1.0e10, 5)], total_traded, 0);

    SubScore {
        score: score.min(100),
        reasons,
    }
}

pub fn novelty_score(sector: &SectorSnapshot, history: &SectorHistory) -> SubScore {
    let mut score: i32 = 50;
    let mut reasons = Vec::new();

    if let Some(kw) = first_keyword(&sector.name, EMERGING_KEYWORDS) {
        score += 40;
        reasons.push(format!("emerging concept: {kw}"));
    }

    // Sustained momentum means the theme is already well known.
    match history.consecutive_up {
        n if n >= 5 => {
            score -= 30;
            reasons.push("up for many days".to_string());
        }
        n if n >= 3 => score -= 15,
        n if n <= 1 => {
            score += 15;
            reasons.push("just starting".to_string());
        }
        _ => {}
    }

    let change_3d = history.change_3d;
    if change_3d >= 15.0 {
        score -= 20;
    } else if change_3d >= 10.0 {
        score -= 10;
    } else if change_3d <= 3.0 {
        score += 10;
    }

    SubScore {
        score: score.clamp(0, 100),
        reasons,
    }
}

pub fn strength_score(sector: &SectorSnapshot, instruments: &[InstrumentSnapshot]) -> SubScore {
    let mut score: i32 = 0;
    let mut reasons = Vec::new();

    if let Some(kw) = first_keyword(&sector.name, POLICY_KEYWORDS) {
        score += 35;
        reasons.push(format!("policy backed: {kw}"));
    }

    let limit_ups = instruments
        .iter()
        .filter(|s| s.change_pct >= LIMIT_UP_PCT)
        .count();
    if limit_ups >= 5 {
        reasons.push(format!("{limit_ups} limit-ups"));
    }
    score += at_least(&[(5.0, 25), (3.0, 20), (2.0, 15), (1.0, 10)], limit_ups as f64, 0);

    if sector.change_pct >= 5.0 {
        reasons.push("strong advance".to_string());
    }
    score += at_least(&[(5.0, 20), (3.0, 15), (2.0, 10), (1.0, 5)], sector.change_pct, 0);

    if sector.constituent_count() > 0 {
        let up_ratio = sector.up_ratio_pct() / 100.0;
        if up_ratio >= 0.8 {
            reasons.push("broad advance".to_string());
        }
        score += at_least(&[(0.8, 20), (0.7, 15), (0.6, 10)], up_ratio, 0);
    }

    SubScore {
        score: score.min(100),
        reasons,
    }
}

pub fn evaluate(
    sector: &SectorSnapshot,
    instruments: &[InstrumentSnapshot],
    history: &SectorHistory,
) -> SectorQuality {
    let size = size_score(sector, instruments);
    let novelty = novelty_score(sector, history);
    let strength = strength_score(sector, instruments);

    let total = (size.score + novelty.score + strength.score) as f64 / 3.0;
    let rating = QualityRating::from_total(total);

    let tags = [
        (QualityDimension::Size, &size),
        (QualityDimension::Novelty, &novelty),
        (QualityDimension::Strength, &strength),
    ]
    .into_iter()
    .filter(|(_, sub)| sub.score >= TAG_THRESHOLD)
    .map(|(dimension, sub)| QualityTag {
        dimension,
        name: dimension.label().to_string(),
        score: sub.score,
        color: dimension.color().to_string(),
        desc: sub
            .first_reason()
            .unwrap_or(dimension.default_desc())
            .to_string(),
    })
    .collect();

    SectorQuality {
        total_score: round_dp(total, 1),
        rating,
        rating_color: rating.color().to_string(),
        size,
        novelty,
        strength,
        tags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sector(name: &str, change_pct: f64, up_count: u32, down_count: u32) -> SectorSnapshot {
        SectorSnapshot {
            code: "BK1000".to_string(),
            name: name.to_string(),
            change_pct,
            up_count,
            down_count,
        }
    }

    fn instruments(n: usize, limit_ups: usize, market_cap: f64, traded_value: f64) -> Vec<InstrumentSnapshot> {
        (0..n)
            .map(|i| InstrumentSnapshot {
                code: format!("{i:06}"),
                price: Some(10.0),
                change_pct: if i < limit_ups { 10.0 } else { 1.0 },
                market_cap,
                traded_value,
                ..Default::default()
            })
            .collect()
    }

    fn history(consecutive_up: u32, change_3d: f64) -> SectorHistory {
        SectorHistory {
            consecutive_up,
            change_3d,
            ..Default::default()
        }
    }

    #[test]
    fn keyword_scan_returns_earliest_in_list_order() {
        // both 芯片 and 半导体 appear; 芯片 comes first in the list
        assert_eq!(first_keyword("半导体芯片", MEGA_THEME_KEYWORDS), Some("芯片"));
        assert_eq!(first_keyword("白酒", MEGA_THEME_KEYWORDS), None);
    }

    #[test]
    fn mega_theme_size() {
        let s = sector("人工智能", 2.0, 90, 30);
        let list = instruments(10, 0, 1.2e11, 6.0e9);
        let size = size_score(&s, &list);
        // 15 + 20 + 25 + 15
        assert_eq!(size.score, 75);
        assert_eq!(size.first_reason(), Some("mega theme: 人工智能"));
        assert_eq!(size.reasons.len(), 4);
    }

    #[test]
    fn small_sector_size_tiers() {
        let s = sector("白酒", 1.0, 20, 12);
        let list = instruments(4, 0, 2.0e10, 3.0e9);
        // 32 constituents → 10, cap 8e10 → 10, traded 1.2e10 → 5
        assert_eq!(size_score(&s, &list).score, 25);
        assert!(size_score(&s, &list).reasons.is_empty());
    }

    #[test]
    fn novelty_rewards_fresh_concepts() {
        let fresh = novelty_score(&sector("低空经济", 1.0, 5, 5), &history(0, 2.0));
        assert_eq!(fresh.score, 100);
        assert_eq!(fresh.reasons, vec!["emerging concept: 低空经济", "just starting"]);

        let stale = novelty_score(&sector("白酒", 1.0, 5, 5), &history(5, 16.0));
        assert_eq!(stale.score, 0);

        let middling = novelty_score(&sector("白酒", 1.0, 5, 5), &history(3, 12.0));
        assert_eq!(middling.score, 25);

        let two_days = novelty_score(&sector("白酒", 1.0, 5, 5), &history(2, 3.0));
        // exactly 3% still counts as room to run
        assert_eq!(two_days.score, 60);
    }

    #[test]
    fn policy_theme_strength() {
        let s = sector("信创", 5.0, 80, 20);
        let list = instruments(8, 5, 1.0e10, 1.0e9);
        let strength = strength_score(&s, &list);
        assert_eq!(strength.score, 100);
        assert_eq!(strength.first_reason(), Some("policy backed: 信创"));
    }

    #[test]
    fn strength_skips_breadth_without_counts() {
        let s = sector("白酒", 1.0, 0, 0);
        let list = instruments(3, 1, 1.0e10, 1.0e9);
        // 10 for one limit-up, 5 for change
        assert_eq!(strength_score(&s, &list).score, 15);
    }

    #[test]
    fn rating_and_tags() {
        let s = sector("人工智能算力", 5.0, 85, 35);
        let list = instruments(10, 5, 1.2e11, 6.0e9);
        let q = evaluate(&s, &list, &history(1, 2.0));
        // size 75, novelty 100 (算力), strength 25 + 20 + 15
        assert_eq!(q.size.score, 75);
        assert_eq!(q.novelty.score, 100);
        assert_eq!(q.strength.score, 60);
        assert_eq!(q.total_score, 78.3);
        assert_eq!(q.rating, QualityRating::Good);

        let names: Vec<&str> = q.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Size", "Novelty", "Strength"]);
        assert_eq!(q.tags[0].desc, "mega theme: 人工智能");
        assert_eq!(q.tags[2].desc, "5 limit-ups");
    }

    #[test]
    fn weak_sector_has_no_tags() {
        let s = sector("白酒", -1.0, 10, 40);
        let q = evaluate(&s, &[], &history(3, 1.0));
        // novelty 50 - 15 + 10
        assert_eq!(q.novelty.score, 45);
        assert!(q.tags.is_empty());
        assert_eq!(q.rating, QualityRating::Weak);
        assert_eq!(q.rating_color, "#95a5a6");
    }

    #[test]
    fn tag_falls_back_to_default_desc() {
        let s = sector("白酒", 1.0, 5, 5);
        let q = evaluate(&s, &[], &history(2, 1.0));
        // 50 + 10, no reasons matched
        assert_eq!(q.novelty.score, 60);
        assert_eq!(q.tags.len(), 1);
        assert_eq!(q.tags[0].desc, "fresh concept");
    }
}
