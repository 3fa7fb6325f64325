//! Sales aggregates

use crate::ledger::Sale;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SellerStats {
    pub sales: u64,
    pub quantity: u64,
    pub revenue: u128,
}

/// Per-seller totals and their sum over a set of sales.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub summary_per_seller: BTreeMap<String, SellerStats>,
    pub total_sales: u64,
    pub total_cocoa: u64,
    pub total_revenue: u128,
    pub average_price_per_kg: String,
}

impl SalesSummary {
    pub fn from_sales<'a, I>(sales: I) -> Self
    where
        I: IntoIterator<Item = &'a Sale>,
    {
        let mut summary = SalesSummary::default();
        for sale in sales {
            let stats = summary
                .summary_per_seller
                .entry(sale.seller_id.clone())
                .or_default();
            stats.sales += 1;
            stats.quantity = stats.quantity.saturating_add(sale.quantity_kg);
            stats.revenue += sale.revenue();

            summary.total_sales += 1;
            summary.total_cocoa = summary.total_cocoa.saturating_add(sale.quantity_kg);
            summary.total_revenue += sale.revenue();
        }
        summary.average_price_per_kg = average_price(summary.total_revenue, summary.total_cocoa);
        summary
    }

    /// Sellers ordered by revenue, highest first; ties broken by seller id.
    pub fn top_sellers(&self, limit: usize) -> Vec<(&str, &SellerStats)> {
        let mut ranked: Vec<(&str, &SellerStats)> = self
            .summary_per_seller
            .iter()
            .map(|(id, stats)| (id.as_str(), stats))
            .collect();
        ranked.sort_by(|a, b| b.1.revenue.cmp(&a.1.revenue).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(limit);
        ranked
    }
}

/// Two-decimal average, `"0.00"` when nothing was sold.
pub fn average_price(total_revenue: u128, total_cocoa: u64) -> String {
    if total_cocoa == 0 {
        return "0.00".to_string();
    }
    format!("{:.2}", total_revenue as f64 / total_cocoa as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sale(id: u64, seller: &str, qty: u64, price: u64) -> Sale {
        Sale {
            sale_id: id,
            seller_id: seller.to_string(),
            buyer_name: "Buyer".to_string(),
            quantity_kg: qty,
            price,
            timestamp: 0,
        }
    }

    #[test]
    fn test_empty_summary() {
        let summary = SalesSummary::from_sales(&Vec::<Sale>::new());
        assert_eq!(summary.total_sales, 0);
        assert_eq!(summary.total_cocoa, 0);
        assert_eq!(summary.total_revenue, 0);
        assert_eq!(summary.average_price_per_kg, "0.00");
        assert!(summary.summary_per_seller.is_empty());
    }

    #[test]
    fn test_totals_equal_sum_of_sellers() {
        let sales = vec![
            sale(0, "SELa", 100, 3),
            sale(1, "SELb", 50, 7),
            sale(2, "SELa", 20, 4),
            sale(3, "SELc", 1, 1),
        ];
        let summary = SalesSummary::from_sales(&sales);

        let qty: u64 = summary.summary_per_seller.values().map(|s| s.quantity).sum();
        let revenue: u128 = summary.summary_per_seller.values().map(|s| s.revenue).sum();
        let count: u64 = summary.summary_per_seller.values().map(|s| s.sales).sum();

        assert_eq!(summary.total_cocoa, qty);
        assert_eq!(summary.total_revenue, revenue);
        assert_eq!(summary.total_sales, count);
        assert_eq!(summary.total_cocoa, 171);
        assert_eq!(summary.total_revenue, 300 + 350 + 80 + 1);

        let a = &summary.summary_per_seller["SELa"];
        assert_eq!(a.sales, 2);
        assert_eq!(a.quantity, 120);
        assert_eq!(a.revenue, 380);
    }

    #[test]
    fn test_average_price_two_decimals() {
        assert_eq!(average_price(10, 3), "3.33");
        assert_eq!(average_price(500, 100), "5.00");
    }

    #[test]
    fn test_top_sellers_order() {
        let sales = vec![
            sale(0, "SELa", 10, 1),
            sale(1, "SELb", 10, 5),
            sale(2, "SELc", 10, 5),
            sale(3, "SELd", 10, 2),
        ];
        let summary = SalesSummary::from_sales(&sales);
        let top: Vec<&str> = summary.top_sellers(3).into_iter().map(|(id, _)| id).collect();
        assert_eq!(top, vec!["SELb", "SELc", "SELd"]);
    }
}
