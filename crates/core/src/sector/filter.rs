/// Board names that describe a trading pattern or a flow list rather than a theme.
pub const EXCLUDED_NAME_KEYWORDS: &[&str] = &[
    "连板", "一字板", "涨停", "跌停", "打板", "首板", "二板", "三板",
    "昨日", "今日", "反包", "炸板", "烂板", "换手板", "缩量板",
    "ST板块", "摘帽", "复牌", "新股", "次新", "破净", "破发",
    "高送转", "填权", "除权", "分红", "回购", "增持", "减持",
    "解禁", "质押", "融资融券", "北向资金", "主力", "游资",
    "龙虎榜", "大单", "资金流", "净流入", "净流出",
];

/// True when the sector name is a real theme worth scoring.
pub fn is_theme_sector(name: &str) -> bool {
    let name = name.trim();
    !name.is_empty() && !EXCLUDED_NAME_KEYWORDS.iter().any(|kw| name.contains(kw))
}
