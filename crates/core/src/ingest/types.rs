use crate::domain::lenient;
use crate::domain::market::{InstrumentSnapshot, SectorSnapshot};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketIndexResponse {
    #[serde(default)]
    pub index_code: String,
    #[serde(default, deserialize_with = "lenient::zero")]
    pub change_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotSectorsResponse {
    pub items: Vec<HotSectorItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotSectorItem {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::zero")]
    pub change_pct: f64,
    #[serde(default, deserialize_with = "lenient::count")]
    pub up_count: u32,
    #[serde(default, deserialize_with = "lenient::count")]
    pub down_count: u32,
    /// Net capital inflow for the session.
    #[serde(default, deserialize_with = "lenient::zero")]
    pub net_inflow: f64,
}

impl HotSectorItem {
    pub fn snapshot(&self) -> SectorSnapshot {
        SectorSnapshot {
            code: self.code.clone(),
            name: self.name.clone(),
            change_pct: self.change_pct,
            up_count: self.up_count,
            down_count: self.down_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorInstrumentsResponse {
    pub sector_code: String,
    pub items: Vec<InstrumentSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotesResponse {
    pub items: Vec<QuoteItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteItem {
    pub code: String,
    #[serde(default, deserialize_with = "lenient::option")]
    pub price: Option<f64>,
}

/// A hot sector as fetched, with the session's net inflow kept for the daily history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotSector {
    pub sector: SectorSnapshot,
    pub net_inflow: f64,
}
