//! Curated list of frequently used SGS series.

use crate::core::series::SeriesCode;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::Display;

/// Publication frequency of a series at the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NativeFrequency {
    Daily,
    Monthly,
    Quarterly,
    Annual,
}

impl Display for NativeFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                NativeFrequency::Daily => "D",
                NativeFrequency::Monthly => "M",
                NativeFrequency::Quarterly => "Q",
                NativeFrequency::Annual => "A",
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    pub category: &'static str,
    pub code: SeriesCode,
    pub name: &'static str,
    pub description: &'static str,
    pub frequency: NativeFrequency,
}

const fn entry(
    category: &'static str,
    code: u32,
    name: &'static str,
    description: &'static str,
    frequency: NativeFrequency,
) -> CatalogEntry {
    CatalogEntry {
        category,
        code: SeriesCode(code),
        name,
        description,
        frequency,
    }
}

use NativeFrequency::{Daily, Monthly, Quarterly};

pub static POPULAR_SERIES: &[CatalogEntry] = &[
    entry("Inflation", 433, "IPCA", "IPCA - monthly change (%)", Monthly),
    entry("Inflation", 192, "INCC", "INCC-DI - monthly change (%)", Monthly),
    entry("Inflation", 189, "IGP-M", "IGP-M - monthly change (%)", Monthly),
    entry("Inflation", 190, "IGP-DI", "IGP-DI - monthly change (%)", Monthly),
    entry("Interest", 432, "Selic Target", "Selic target rate (% p.a.)", Daily),
    entry("Interest", 11, "Selic Over", "Selic overnight rate (% p.a.)", Daily),
    entry("Interest", 12, "CDI", "CDI accumulated in the month (%)", Monthly),
    entry("Interest", 4389, "CDI Annual", "CDI annualized (% p.a.)", Daily),
    entry("Interest", 226, "TR", "Reference rate TR (%)", Monthly),
    entry("Exchange", 1, "USD Buy", "USD/BRL exchange rate - buy", Daily),
    entry("Exchange", 10813, "USD Sell", "USD/BRL exchange rate - sell", Daily),
    entry("Exchange", 21619, "EUR Buy", "EUR/BRL exchange rate - buy", Daily),
    entry("Exchange", 21620, "EUR Sell", "EUR/BRL exchange rate - sell", Daily),
    entry("Activity", 24363, "Monthly GDP", "Monthly GDP - current values (BRL million)", Monthly),
    entry("Activity", 4380, "Real GDP", "Real GDP - quarterly change (%)", Quarterly),
    entry("Activity", 28183, "IBC-Br", "IBC-Br - economic activity index", Monthly),
    entry("Credit", 20542, "Credit Balance", "Outstanding credit operations (BRL million)", Monthly),
    entry("Credit", 20714, "Household Default", "Household default rate - non-earmarked (%)", Monthly),
    entry("Fiscal", 4505, "Net Debt/GDP", "Public sector net debt (% GDP)", Monthly),
    entry("Fiscal", 4536, "Primary/GDP", "Primary balance (% GDP) - 12m", Monthly),
];

pub fn lookup(code: SeriesCode) -> Option<&'static CatalogEntry> {
    POPULAR_SERIES.iter().find(|e| e.code == code)
}

/// Case-insensitive match on name, description or code. Queries shorter
/// than two characters match nothing.
pub fn search(query: &str) -> Vec<&'static CatalogEntry> {
    let query = query.trim().to_lowercase();
    if query.chars().count() < 2 {
        return Vec::new();
    }
    POPULAR_SERIES
        .iter()
        .filter(|e| {
            e.name.to_lowercase().contains(&query)
                || e.description.to_lowercase().contains(&query)
                || e.code.to_string().contains(&query)
        })
        .collect()
}

/// Catalog name for `code`, or an empty label for unknown series.
pub fn default_label(code: SeriesCode) -> String {
    lookup(code).map(|e| e.name.to_string()).unwrap_or_default()
}

/// True when the known series among `codes` are published at different frequencies.
pub fn has_mixed_frequencies(codes: &[SeriesCode]) -> bool {
    let frequencies: HashSet<NativeFrequency> = codes
        .iter()
        .filter_map(|c| lookup(*c).map(|e| e.frequency))
        .collect();
    frequencies.len() > 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_matches_name_description_and_code() {
        let by_name: Vec<_> = search("ipca").iter().map(|e| e.code).collect();
        assert_eq!(by_name, vec![SeriesCode(433)]);

        let by_description = search("exchange rate");
        assert_eq!(by_description.len(), 4);

        let by_code: Vec<_> = search("4380").iter().map(|e| e.code).collect();
        assert_eq!(by_code, vec![SeriesCode(4380)]);

        assert!(search("i").is_empty());
        assert!(search("nothing like this").is_empty());
    }

    #[test]
    fn test_default_label() {
        assert_eq!(default_label(SeriesCode(12)), "CDI");
        assert_eq!(default_label(SeriesCode(999_999)), "");
    }

    #[test]
    fn test_mixed_frequencies() {
        assert!(has_mixed_frequencies(&[SeriesCode(433), SeriesCode(1)]));
        assert!(!has_mixed_frequencies(&[SeriesCode(433), SeriesCode(189)]));
        // Unknown codes do not count.
        assert!(!has_mixed_frequencies(&[SeriesCode(433), SeriesCode(999_999)]));
    }
}
