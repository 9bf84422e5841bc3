use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::pricing::PriceQuote;

/// One product tile as scraped from a catalog page, before any pricing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawItem {
    pub brand: String,
    pub title: String,
    /// `None` when the tile shows a single, undiscounted price.
    pub original_price: Option<String>,
    pub sale_price: String,
    pub image_urls: Vec<String>,
    pub product_url: String,
}

/// An accepted listing with every derived price, ready for repost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    /// 1-based position among accepted items of one traversal.
    pub sequence_index: u32,
    pub brand: String,
    pub title: String,
    pub original_price: i64,
    pub sale_price: i64,
    pub landed_cost: i64,
    pub selling_price: i64,
    pub profit: i64,
    pub profit_margin: f64,
    pub image_urls: Vec<String>,
    pub product_url: String,
}

impl ListingRecord {
    #[must_use]
    pub fn new(sequence_index: u32, item: &RawItem, quote: &PriceQuote) -> Self {
        let brand = path_safe(&item.brand);
        let title = normalize_title(&brand, &item.title);
        Self {
            sequence_index,
            brand,
            title,
            original_price: quote.original_price,
            sale_price: quote.sale_price,
            landed_cost: quote.landed_cost,
            selling_price: quote.selling_price,
            profit: quote.profit,
            profit_margin: quote.profit_margin,
            image_urls: item.image_urls.clone(),
            product_url: item.product_url.clone(),
        }
    }

    /// Sequence index zero-padded to three digits (`"007"`).
    #[must_use]
    pub fn padded_index(&self) -> String {
        format!("{:03}", self.sequence_index)
    }

    /// File name for the `n`th image (0-based) of this listing.
    #[must_use]
    pub fn image_file_name(&self, n: usize) -> String {
        let stem = format!("{} - {} - {}", self.padded_index(), self.brand, self.title);
        if n == 0 {
            format!("{stem}.jpg")
        } else {
            format!("{stem} ({}).jpg", n + 1)
        }
    }

    /// Caption for the repost image: brand, title and selling price.
    #[must_use]
    pub fn insert_text(&self) -> String {
        format!(
            "{}\n{}\n${}",
            self.brand,
            self.title,
            group_thousands(self.selling_price)
        )
    }

    /// Multi-line block appended to a section's listing log.
    #[must_use]
    pub fn display_block(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "-------- [ Product No.{} ] --------", self.padded_index());
        let _ = writeln!(out, "Brand:          {}", self.brand);
        let _ = writeln!(out, "Name:           {}", self.title);
        let _ = writeln!(out, "Retail Price:   ${}", group_thousands(self.original_price));
        let _ = writeln!(out, "Sale Price:     ${}", group_thousands(self.sale_price));
        let _ = writeln!(out, "Estimated cost: ${}", group_thousands(self.landed_cost));
        let _ = writeln!(out, "Selling Price:  ${}", group_thousands(self.selling_price));
        for (i, url) in self.image_urls.iter().enumerate() {
            let _ = writeln!(out, "Photo {} URL:    {url}", i + 1);
        }
        let _ = writeln!(out, "Product URL:    {}", self.product_url);
        out
    }
}

/// Makes a scraped title safe for file names and captions.
///
/// `/` becomes `-`, `"` becomes `'`, and a leading copy of the brand name is
/// removed. A title that is nothing but the brand is kept as is.
#[must_use]
pub fn normalize_title(brand: &str, title: &str) -> String {
    let cleaned = path_safe(title);
    let brand = path_safe(brand);
    if brand.is_empty() {
        return cleaned;
    }

    match cleaned.get(..brand.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(&brand) => {
            let tail = &cleaned[brand.len()..];
            let rest = tail.trim_start();
            if rest.is_empty() || rest.len() == tail.len() {
                cleaned
            } else {
                rest.to_string()
            }
        }
        _ => cleaned,
    }
}

fn path_safe(text: &str) -> String {
    text.trim().replace('/', "-").replace('"', "'")
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        grouped.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_item() -> RawItem {
        RawItem {
            brand: "Our Legacy".to_string(),
            title: "Our Legacy Box Shirt S/S \"Cream\"".to_string(),
            original_price: Some("$450.00".to_string()),
            sale_price: "$300.00".to_string(),
            image_urls: vec![
                "https://cdn.example.com/a.jpg".to_string(),
                "https://cdn.example.com/b.jpg".to_string(),
            ],
            product_url: "https://uptherestore.com/products/box-shirt".to_string(),
        }
    }

    fn sample_quote() -> PriceQuote {
        PriceQuote {
            original_price: 33_990,
            sale_price: 22_660,
            landed_cost: 27_272,
            selling_price: 29_460,
            profit: 2_188,
            profit_margin: 7.43,
        }
    }

    #[test]
    fn normalize_title_replaces_path_and_quote_characters() {
        assert_eq!(
            normalize_title("Acme", "Tee 1/2 \"Black\""),
            "Tee 1-2 'Black'"
        );
    }

    #[test]
    fn normalize_title_strips_leading_brand() {
        assert_eq!(normalize_title("Acne Studios", "Acne Studios Scarf"), "Scarf");
        assert_eq!(normalize_title("acne studios", "ACNE STUDIOS Scarf"), "Scarf");
    }

    #[test]
    fn normalize_title_keeps_title_equal_to_brand() {
        assert_eq!(normalize_title("Stussy", "Stussy"), "Stussy");
    }

    #[test]
    fn normalize_title_only_strips_whole_words() {
        assert_eq!(normalize_title("Acne", "Acneiform Tee"), "Acneiform Tee");
    }

    #[test]
    fn normalize_title_handles_multibyte_titles() {
        assert_eq!(normalize_title("Comme des Garçons", "Comme des Garçons Wallet"), "Wallet");
        assert_eq!(normalize_title("Maison Kitsuné", "Tee"), "Tee");
    }

    #[test]
    fn record_copies_quote_and_cleans_title() {
        let record = ListingRecord::new(7, &sample_item(), &sample_quote());
        assert_eq!(record.sequence_index, 7);
        assert_eq!(record.title, "Box Shirt S-S 'Cream'");
        assert_eq!(record.selling_price, 29_460);
        assert_eq!(record.profit, record.selling_price - record.landed_cost);
        assert_eq!(record.image_urls.len(), 2);
    }

    #[test]
    fn image_file_names_are_indexed() {
        let record = ListingRecord::new(7, &sample_item(), &sample_quote());
        assert_eq!(
            record.image_file_name(0),
            "007 - Our Legacy - Box Shirt S-S 'Cream'.jpg"
        );
        assert_eq!(
            record.image_file_name(1),
            "007 - Our Legacy - Box Shirt S-S 'Cream' (2).jpg"
        );
    }

    #[test]
    fn brand_with_slash_stays_in_one_file_name() {
        let item = RawItem {
            brand: "Maison Margiela / MM6".to_string(),
            title: "Maison Margiela / MM6 Tote".to_string(),
            ..sample_item()
        };
        let record = ListingRecord::new(3, &item, &sample_quote());
        assert_eq!(record.brand, "Maison Margiela - MM6");
        assert_eq!(record.title, "Tote");
        assert_eq!(
            record.image_file_name(0),
            "003 - Maison Margiela - MM6 - Tote.jpg"
        );
        assert!(!record.image_file_name(1).contains('/'));
    }

    #[test]
    fn insert_text_groups_thousands() {
        let record = ListingRecord::new(1, &sample_item(), &sample_quote());
        assert_eq!(
            record.insert_text(),
            "Our Legacy\nBox Shirt S-S 'Cream'\n$29,460"
        );
    }

    #[test]
    fn display_block_lists_prices_and_photos() {
        let record = ListingRecord::new(12, &sample_item(), &sample_quote());
        let block = record.display_block();
        assert!(block.starts_with("-------- [ Product No.012 ] --------\n"));
        assert!(block.contains("Retail Price:   $33,990\n"));
        assert!(block.contains("Estimated cost: $27,272\n"));
        assert!(block.contains("Photo 2 URL:    https://cdn.example.com/b.jpg\n"));
        assert!(block.ends_with("Product URL:    https://uptherestore.com/products/box-shirt\n"));
    }

    #[test]
    fn group_thousands_formats_small_large_and_negative() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_000), "1,000");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
        assert_eq!(group_thousands(-12_000), "-12,000");
    }
}
