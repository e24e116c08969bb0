//! Stock universe: the seed list of tracked equities.
//!
//! Stored as TOML with one `[[stocks]]` table per symbol. Seeding a store
//! from a universe is idempotent; tickers already present are left alone.

use crate::domain::SymbolSeed;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Universe {
    pub stocks: Vec<SymbolSeed>,
}

impl Universe {
    /// Load a universe from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("read universe file: {e}"))?;
        Self::from_toml(&content)
    }

    /// Parse a universe from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, String> {
        let universe: Universe =
            toml::from_str(content).map_err(|e| format!("parse universe TOML: {e}"))?;
        if let Some(blank) = universe.stocks.iter().find(|s| s.ticker.trim().is_empty()) {
            return Err(format!("universe entry '{}' has an empty ticker", blank.name));
        }
        Ok(universe)
    }

    /// Serialize the universe to TOML.
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("serialize universe: {e}"))
    }

    pub fn tickers(&self) -> Vec<&str> {
        self.stocks.iter().map(|s| s.ticker.as_str()).collect()
    }

    /// Tickers grouped by sector; stocks without a sector are omitted.
    pub fn by_sector(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut sectors: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for stock in &self.stocks {
            if let Some(sector) = stock.sector.as_deref() {
                sectors.entry(sector).or_default().push(stock.ticker.as_str());
            }
        }
        sectors
    }

    pub fn len(&self) -> usize {
        self.stocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stocks.is_empty()
    }

    /// The 50 largest S&P 500 constituents by market cap (2024).
    pub fn default_sp50() -> Self {
        let stocks = vec![
            SymbolSeed::new("AAPL", "Apple Inc.", "Technology", "Consumer Electronics"),
            SymbolSeed::new("MSFT", "Microsoft Corporation", "Technology", "Software"),
            SymbolSeed::new("GOOGL", "Alphabet Inc. Class A", "Technology", "Internet Services"),
            SymbolSeed::new("AMZN", "Amazon.com Inc.", "Consumer Cyclical", "E-commerce"),
            SymbolSeed::new("NVDA", "NVIDIA Corporation", "Technology", "Semiconductors"),
            SymbolSeed::new("META", "Meta Platforms Inc.", "Technology", "Social Media"),
            SymbolSeed::new("TSLA", "Tesla Inc.", "Consumer Cyclical", "Auto Manufacturers"),
            SymbolSeed::new("BRK.B", "Berkshire Hathaway Inc. Class B", "Financial Services", "Insurance"),
            SymbolSeed::new("JPM", "JPMorgan Chase & Co.", "Financial Services", "Banking"),
            SymbolSeed::new("V", "Visa Inc.", "Financial Services", "Credit Services"),
            SymbolSeed::new("JNJ", "Johnson & Johnson", "Healthcare", "Pharmaceuticals"),
            SymbolSeed::new("WMT", "Walmart Inc.", "Consumer Defensive", "Discount Stores"),
            SymbolSeed::new("MA", "Mastercard Incorporated", "Financial Services", "Credit Services"),
            SymbolSeed::new("PG", "Procter & Gamble Company", "Consumer Defensive", "Household Products"),
            SymbolSeed::new("UNH", "UnitedHealth Group Incorporated", "Healthcare", "Healthcare Plans"),
            SymbolSeed::new("HD", "The Home Depot Inc.", "Consumer Cyclical", "Home Improvement"),
            SymbolSeed::new("DIS", "The Walt Disney Company", "Communication Services", "Entertainment"),
            SymbolSeed::new("XOM", "Exxon Mobil Corporation", "Energy", "Oil & Gas"),
            SymbolSeed::new("BAC", "Bank of America Corporation", "Financial Services", "Banking"),
            SymbolSeed::new("COST", "Costco Wholesale Corporation", "Consumer Defensive", "Discount Stores"),
            SymbolSeed::new("ABBV", "AbbVie Inc.", "Healthcare", "Pharmaceuticals"),
            SymbolSeed::new("CVX", "Chevron Corporation", "Energy", "Oil & Gas"),
            SymbolSeed::new("PFE", "Pfizer Inc.", "Healthcare", "Pharmaceuticals"),
            SymbolSeed::new("AVGO", "Broadcom Inc.", "Technology", "Semiconductors"),
            SymbolSeed::new("KO", "The Coca-Cola Company", "Consumer Defensive", "Beverages"),
            SymbolSeed::new("PEP", "PepsiCo Inc.", "Consumer Defensive", "Beverages"),
            SymbolSeed::new("TMO", "Thermo Fisher Scientific Inc.", "Healthcare", "Diagnostics"),
            SymbolSeed::new("MRK", "Merck & Co. Inc.", "Healthcare", "Pharmaceuticals"),
            SymbolSeed::new("CSCO", "Cisco Systems Inc.", "Technology", "Networking"),
            SymbolSeed::new("ACN", "Accenture plc", "Technology", "IT Services"),
            SymbolSeed::new("ADBE", "Adobe Inc.", "Technology", "Software"),
            SymbolSeed::new("NKE", "NIKE Inc.", "Consumer Cyclical", "Footwear"),
            SymbolSeed::new("NFLX", "Netflix Inc.", "Communication Services", "Entertainment"),
            SymbolSeed::new("ORCL", "Oracle Corporation", "Technology", "Software"),
            SymbolSeed::new("CRM", "Salesforce Inc.", "Technology", "Software"),
            SymbolSeed::new("AMD", "Advanced Micro Devices Inc.", "Technology", "Semiconductors"),
            SymbolSeed::new("INTC", "Intel Corporation", "Technology", "Semiconductors"),
            SymbolSeed::new("ABT", "Abbott Laboratories", "Healthcare", "Medical Devices"),
            SymbolSeed::new("DHR", "Danaher Corporation", "Healthcare", "Diagnostics"),
            SymbolSeed::new("LLY", "Eli Lilly and Company", "Healthcare", "Pharmaceuticals"),
            SymbolSeed::new("VZ", "Verizon Communications Inc.", "Communication Services", "Telecom"),
            SymbolSeed::new("TXN", "Texas Instruments Incorporated", "Technology", "Semiconductors"),
            SymbolSeed::new("CMCSA", "Comcast Corporation", "Communication Services", "Entertainment"),
            SymbolSeed::new("WFC", "Wells Fargo & Company", "Financial Services", "Banking"),
            SymbolSeed::new("BMY", "Bristol-Myers Squibb Company", "Healthcare", "Pharmaceuticals"),
            SymbolSeed::new("QCOM", "QUALCOMM Incorporated", "Technology", "Semiconductors"),
            SymbolSeed::new("MS", "Morgan Stanley", "Financial Services", "Banking"),
            SymbolSeed::new("UPS", "United Parcel Service Inc.", "Industrials", "Package Delivery"),
            SymbolSeed::new("HON", "Honeywell International Inc.", "Industrials", "Conglomerates"),
            SymbolSeed::new("LOW", "Lowe's Companies Inc.", "Consumer Cyclical", "Home Improvement"),
        ];
        Self { stocks }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_universe_has_fifty_unique_tickers() {
        let u = Universe::default_sp50();
        assert_eq!(u.len(), 50);
        let mut tickers = u.tickers();
        tickers.sort_unstable();
        tickers.dedup();
        assert_eq!(tickers.len(), 50);
        assert!(tickers.contains(&"BRK.B"));
    }

    #[test]
    fn toml_roundtrip() {
        let u = Universe::default_sp50();
        let toml_str = u.to_toml().unwrap();
        let parsed = Universe::from_toml(&toml_str).unwrap();
        assert_eq!(u, parsed);
    }

    #[test]
    fn sector_and_industry_optional_in_toml() {
        let u = Universe::from_toml(
            r#"
            [[stocks]]
            ticker = "ZZZ"
            name = "Sleepy Corp"
            "#,
        )
        .unwrap();
        assert_eq!(u.stocks[0].sector, None);
        assert!(u.by_sector().is_empty());
    }

    #[test]
    fn blank_ticker_rejected() {
        let err = Universe::from_toml("[[stocks]]\nticker = \" \"\nname = \"Nobody\"\n");
        assert!(err.is_err());
    }

    #[test]
    fn sector_grouping() {
        let u = Universe::default_sp50();
        let sectors = u.by_sector();
        assert!(sectors["Energy"].contains(&"XOM"));
        assert!(sectors["Energy"].contains(&"CVX"));
        assert!(sectors.contains_key("Technology"));
    }
}
