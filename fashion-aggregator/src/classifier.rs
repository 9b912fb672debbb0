//! Keyword based article classification.
//!
//! Every category owns a list of keywords and phrases compiled into a single
//! case-insensitive, word-bounded pattern. An article is scored against each
//! category by counting pattern matches in its title and description; the
//! highest score wins and ties go to the category declared first in
//! [`Category::ALL`].

use crate::types::AggregatorError;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Fashion Business")]
    FashionBusiness,
    #[serde(rename = "Beauty")]
    Beauty,
    #[serde(rename = "Luxury")]
    Luxury,
    #[serde(rename = "Retail")]
    Retail,
    #[serde(rename = "E-commerce")]
    ECommerce,
    #[serde(rename = "Fashion Trends")]
    FashionTrends,
}

impl Category {
    /// Declaration order. Tie-breaks and `categories()` both follow it.
    pub const ALL: [Category; 6] = [
        Category::FashionBusiness,
        Category::Beauty,
        Category::Luxury,
        Category::Retail,
        Category::ECommerce,
        Category::FashionTrends,
    ];

    pub const DEFAULT: Category = Category::FashionTrends;

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::FashionBusiness => "Fashion Business",
            Category::Beauty => "Beauty",
            Category::Luxury => "Luxury",
            Category::Retail => "Retail",
            Category::ECommerce => "E-commerce",
            Category::FashionTrends => "Fashion Trends",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = AggregatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AggregatorError::InvalidCategory(s.to_string()))
    }
}

fn default_keywords(category: Category) -> &'static [&'static str] {
    match category {
        Category::FashionBusiness => &[
            "revenue", "sales", "profit", "earnings", "IPO", "acquisition", "merger",
            "CEO", "CFO", "executive", "investment", "funding", "valuation",
            "market share", "business", "company", "corporation", "financial",
            "strategy", "expansion", "growth", "partnership", "collaboration",
            "retail strategy", "digital transformation", "supply chain",
            "manufacturing", "production", "factory", "sustainability report",
        ],
        Category::Beauty => &[
            "makeup", "cosmetics", "skincare", "beauty", "lipstick", "foundation",
            "mascara", "eyeshadow", "blush", "concealer", "serum", "moisturizer",
            "cleanser", "toner", "sunscreen", "SPF", "anti-aging", "wrinkle",
            "acne", "skincare routine", "beauty tips", "beauty trends",
            "fragrance", "perfume", "cologne", "scent", "nail polish",
            "manicure", "pedicure", "hair care", "shampoo", "conditioner",
        ],
        Category::Luxury => &[
            "luxury", "haute couture", "high-end", "premium", "exclusive",
            "limited edition", "bespoke", "artisan", "craftsmanship",
            "Hermès", "Chanel", "Louis Vuitton", "Gucci", "Prada", "Dior",
            "Burberry", "Cartier", "Tiffany", "Rolex", "luxury goods",
            "luxury market", "affluent", "ultra-high-net-worth", "UHNW",
            "luxury experience", "concierge", "VIP", "private shopping",
        ],
        Category::Retail => &[
            "retail", "store", "shopping", "mall", "outlet", "flagship",
            "pop-up", "brick-and-mortar", "physical store", "retail space",
            "customer experience", "in-store", "merchandising", "inventory",
            "point of sale", "POS", "cashier", "checkout", "shopping center",
            "department store", "boutique", "showroom", "retail technology",
            "RFID", "smart fitting room", "retail analytics", "foot traffic",
        ],
        Category::ECommerce => &[
            "e-commerce", "ecommerce", "online shopping", "digital", "website",
            "mobile app", "app", "online store", "marketplace", "Amazon",
            "Shopify", "direct-to-consumer", "D2C", "DTC", "omnichannel",
            "click-and-collect", "buy online pick up in store", "BOPIS",
            "shipping", "delivery", "fulfillment", "logistics", "warehouse",
            "last mile", "subscription", "personalization", "AI", "AR", "VR",
            "social commerce", "influencer marketing", "conversion rate",
            "SEO", "SEM", "digital marketing", "performance marketing",
        ],
        Category::FashionTrends => &[
            "trend", "trending", "fashion week", "runway", "collection",
            "designer", "style", "outfit", "look", "fashion", "seasonal",
            "spring", "summer", "fall", "winter", "resort", "pre-fall",
            "streetwear", "athleisure", "sustainable fashion", "eco-friendly",
            "vintage", "retro", "minimalist", "maximalist", "boho", "grunge",
            "preppy", "casual", "formal", "evening wear", "red carpet",
            "celebrity style", "fashion influencer", "styling tips",
        ],
    }
}

/// Substring heuristics consulted, in order, when no keyword matched at all.
const FALLBACK_HINTS: &[(Category, &[&str])] = &[
    (Category::FashionBusiness, &["business", "financial", "earnings", "revenue"]),
    (Category::Beauty, &["beauty", "makeup", "skincare"]),
    (Category::Luxury, &["luxury", "haute", "premium"]),
    (Category::ECommerce, &["ecommerce", "online", "digital"]),
    (Category::Retail, &["retail", "store", "shopping"]),
];

struct CategoryRule {
    category: Category,
    keywords: Vec<String>,
    pattern: Option<Regex>,
}

impl CategoryRule {
    fn new(category: Category, keywords: Vec<String>) -> Self {
        let pattern = compile_pattern(&keywords);
        Self { category, keywords, pattern }
    }

    fn score(&self, text: &str) -> usize {
        self.pattern
            .as_ref()
            .map(|p| p.find_iter(text).count())
            .unwrap_or(0)
    }
}

fn compile_pattern(keywords: &[String]) -> Option<Regex> {
    if keywords.is_empty() {
        return None;
    }
    let alternation = keywords
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    // Escaped literals only, so the pattern always compiles.
    RegexBuilder::new(&format!(r"\b(?:{})\b", alternation))
        .case_insensitive(true)
        .build()
        .ok()
}

pub struct Classifier {
    rules: Vec<CategoryRule>,
}

static DEFAULT_CLASSIFIER: Lazy<Classifier> = Lazy::new(Classifier::new);

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier {
    pub fn new() -> Self {
        let rules = Category::ALL
            .iter()
            .map(|&category| {
                let keywords = default_keywords(category)
                    .iter()
                    .map(|k| k.to_string())
                    .collect();
                CategoryRule::new(category, keywords)
            })
            .collect();
        Self { rules }
    }

    /// The shared classifier built from the default keyword table.
    pub fn shared() -> &'static Classifier {
        &DEFAULT_CLASSIFIER
    }

    pub fn classify(&self, title: &str, description: Option<&str>) -> Category {
        let text = format!("{} {}", title, description.unwrap_or(""));

        let mut best: Option<(Category, usize)> = None;
        for rule in &self.rules {
            let score = rule.score(&text);
            // Strictly greater, so the earlier declared category keeps a tie.
            if score > best.map(|(_, s)| s).unwrap_or(0) {
                best = Some((rule.category, score));
            }
        }

        if let Some((category, score)) = best {
            debug!("Classified {:?} as {} (score {})", title, category, score);
            return category;
        }

        fallback_category(&text)
    }

    pub fn scores(&self, title: &str, description: Option<&str>) -> Vec<(Category, usize)> {
        let text = format!("{} {}", title, description.unwrap_or(""));
        self.rules
            .iter()
            .map(|rule| (rule.category, rule.score(&text)))
            .collect()
    }

    pub fn keywords(&self, category: Category) -> &[String] {
        self.rules
            .iter()
            .find(|r| r.category == category)
            .map(|r| r.keywords.as_slice())
            .unwrap_or(&[])
    }

    /// Extends a category's keyword list and recompiles its pattern.
    pub fn add_keywords<I, S>(&mut self, category: Category, keywords: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Some(rule) = self.rules.iter_mut().find(|r| r.category == category) {
            rule.keywords.extend(keywords.into_iter().map(Into::into));
            rule.pattern = compile_pattern(&rule.keywords);
        }
    }

    pub fn categories(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.category.as_str()).collect()
    }
}

fn fallback_category(text: &str) -> Category {
    let lower = text.to_lowercase();
    FALLBACK_HINTS
        .iter()
        .find(|(_, hints)| hints.iter().any(|h| lower.contains(h)))
        .map(|(category, _)| *category)
        .unwrap_or(Category::DEFAULT)
}

/// Classifies with the shared default keyword table.
pub fn classify(title: &str, description: Option<&str>) -> Category {
    Classifier::shared().classify(title, description)
}

/// All category labels in declaration order.
pub fn categories() -> Vec<&'static str> {
    Category::ALL.iter().map(|c| c.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tie_goes_to_first_declared_category() {
        let classifier = Classifier::new();
        let scores = classifier.scores("Beauty Revenue Soars", Some("makeup sales up"));
        assert_eq!(scores[0], (Category::FashionBusiness, 2));
        assert_eq!(scores[1], (Category::Beauty, 2));

        assert_eq!(
            classify("Beauty Revenue Soars", Some("makeup sales up")),
            Category::FashionBusiness
        );
    }

    #[test]
    fn highest_score_wins() {
        let category = classify(
            "New serum and moisturizer launch",
            Some("The skincare line adds a sunscreen"),
        );
        assert_eq!(category, Category::Beauty);
    }

    #[test]
    fn matching_is_case_insensitive_and_word_bounded() {
        assert_eq!(classify("CHANEL opens in Paris", None), Category::Luxury);
        // "apparel" must not count as the keyword "app"
        assert_eq!(
            classify("Apparel giant", None),
            Category::FashionTrends
        );
    }

    #[test]
    fn no_keywords_falls_back_to_default() {
        assert_eq!(classify("Weekend reading list", Some("")), Category::FashionTrends);
    }

    #[test]
    fn fallback_heuristics_apply_in_order() {
        // "businesses" is not a whole-word keyword, but contains "business"
        assert_eq!(classify("Businesses rethink", None), Category::FashionBusiness);
        assert_eq!(classify("Stores reopen", None), Category::Retail);
        assert_eq!(classify("Going online first", None), Category::ECommerce);
        assert_eq!(classify("Premiums rise", None), Category::Luxury);
    }

    #[test]
    fn categories_follow_declaration_order() {
        assert_eq!(
            categories(),
            vec!["Fashion Business", "Beauty", "Luxury", "Retail", "E-commerce", "Fashion Trends"]
        );
        assert_eq!(Classifier::new().categories(), categories());
    }

    #[test]
    fn category_labels_round_trip() {
        assert_eq!("e-commerce".parse::<Category>().unwrap(), Category::ECommerce);
        assert_eq!(" Beauty ".parse::<Category>().unwrap(), Category::Beauty);
        assert!("Sports".parse::<Category>().is_err());
    }

    #[test]
    fn added_keywords_take_effect() {
        let mut classifier = Classifier::new();
        assert_eq!(classifier.classify("Sneaker drop", None), Category::FashionTrends);

        classifier.add_keywords(Category::Retail, ["sneaker drop"]);
        assert_eq!(classifier.classify("Sneaker drop", None), Category::Retail);
        assert!(classifier
            .keywords(Category::Retail)
            .contains(&"sneaker drop".to_string()));
    }
}
