use crate::classifier::Category;
use crate::rss_utils::url::is_valid_feed_url;
use crate::types::{AggregatorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Major,
    Regional,
    Specialty,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Major => "major",
            Tier::Regional => "regional",
            Tier::Specialty => "specialty",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = AggregatorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "major" => Ok(Tier::Major),
            "regional" => Ok(Tier::Regional),
            "specialty" => Ok(Tier::Specialty),
            other => Err(AggregatorError::InvalidSource(format!("unknown tier '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    pub url: String,
    pub category: Option<Category>,
    pub tier: Tier,
    pub active: bool,
}

impl Source {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            category: None,
            tier: Tier::Specialty,
            active: true,
        }
    }

    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// (name, feed url, declared category). Position decides the tier: the first
/// ten are the major publications, the next ten the regional editions.
const BUILTIN_FEEDS: &[(&str, &str, Option<Category>)] = &[
    ("Vogue", "https://www.vogue.com/feed/rss", None),
    ("WWD", "https://wwd.com/feed/", Some(Category::FashionBusiness)),
    ("Business of Fashion", "https://www.businessoffashion.com/feed/", Some(Category::FashionBusiness)),
    ("Harper's Bazaar", "https://www.harpersbazaar.com/rss/all.xml/", None),
    ("Elle", "https://www.elle.com/rss/all.xml/", None),
    ("Marie Claire", "https://www.marieclaire.com/rss/all.xml/", None),
    ("Fashionista", "https://fashionista.com/feed", None),
    ("Glossy", "https://glossy.co/feed/", None),
    ("Allure", "https://www.allure.com/feed/rss", Some(Category::Beauty)),
    ("InStyle", "https://www.instyle.com/syndication/rss", None),
    ("Vogue UK", "https://www.vogue.co.uk/rss", None),
    ("Vogue Paris", "https://www.vogue.fr/rss", None),
    ("Vogue Italia", "https://www.vogue.it/rss/all", None),
    ("Grazia", "https://graziamagazine.com/feed/", None),
    ("Stylist", "https://www.stylist.co.uk/feed", None),
    ("Refinery29", "https://www.refinery29.com/rss.xml", None),
    ("Who What Wear", "https://www.whowhatwear.com/rss", Some(Category::FashionTrends)),
    ("Hypebeast", "https://hypebeast.com/feed", Some(Category::FashionTrends)),
    ("Highsnobiety", "https://www.highsnobiety.com/feed/", Some(Category::FashionTrends)),
    ("Fashion Network", "https://www.fashionnetwork.com/rss/", Some(Category::FashionBusiness)),
    ("Beauty Independent", "https://www.beautyindependent.com/feed/", Some(Category::Beauty)),
    ("Retail Dive", "https://www.retaildive.com/feeds/news/", Some(Category::Retail)),
    ("Modern Retail", "https://www.modernretail.co/feed/", Some(Category::Retail)),
    ("Drapers", "https://www.drapersonline.com/rss", Some(Category::Retail)),
    ("Fashion United", "https://fashionunited.com/rss/news", Some(Category::FashionBusiness)),
    ("Fashion Head", "https://www.fashionhead.com/feed", None),
    ("Vogue Germany", "https://www.vogue.de/rss/alle", None),
    ("Vogue Spain", "https://www.vogue.es/rss", None),
    ("Vogue Australia", "https://www.vogue.com.au/rss", None),
    ("Vogue India", "https://www.vogue.in/rss", None),
    ("Cosmopolitan", "https://www.cosmopolitan.com/rss/all.xml/", None),
    ("Teen Vogue", "https://www.teenvogue.com/feed/rss", None),
    ("Byrdie", "https://www.byrdie.com/rss", Some(Category::Beauty)),
    ("Into The Gloss", "https://intothegloss.com/feed/", Some(Category::Beauty)),
    ("Beautylish", "https://www.beautylish.com/rss/articles", Some(Category::Beauty)),
    ("Temptalia", "https://www.temptalia.com/feed/", Some(Category::Beauty)),
    ("Makeup and Beauty Blog", "https://www.makeupandbeautyblog.com/feed/", Some(Category::Beauty)),
    ("Retail TouchPoints", "https://www.retailtouchpoints.com/rss.xml", Some(Category::Retail)),
    ("Chain Store Age", "https://chainstoreage.com/rss.xml", Some(Category::Retail)),
    ("Sourcing Journal", "https://sourcingjournal.com/feed/", Some(Category::FashionBusiness)),
    ("Fashion Dive", "https://www.fashiondive.com/feeds/news/", Some(Category::FashionBusiness)),
    ("Glossy Beauty", "https://glossy.co/beauty/feed/", Some(Category::Beauty)),
    ("Fashion Revolution", "https://www.fashionrevolution.org/feed/", None),
    ("Eco-Age", "https://eco-age.com/feed/", None),
    ("Fashion for Good", "https://fashionforgood.com/feed/", None),
    ("The Business of Fashion Tech", "https://www.businessoffashion.com/tags/technology/feed/", Some(Category::ECommerce)),
    ("Luxury Society", "https://www.luxurysociety.com/en/rss", Some(Category::Luxury)),
    ("Jing Daily", "https://jingdaily.com/feed/", Some(Category::Luxury)),
    ("Luxury Daily", "https://www.luxurydaily.com/feed/", Some(Category::Luxury)),
    ("Harper's Bazaar Singapore", "https://harpersbazaar.com.sg/rss.xml", None),
    ("Elle Japan", "https://www.elle.com/jp/rss/", None),
    ("Vogue Japan", "https://www.vogue.co.jp/rss", None),
    ("The Cut", "https://www.thecut.com/rss.xml", None),
    ("Man Repeller", "https://repeller.com/feed/", None),
    ("Fashionista Street Style", "https://fashionista.com/category/street-style/feed", Some(Category::FashionTrends)),
];

fn tier_for_position(index: usize) -> Tier {
    match index {
        0..=9 => Tier::Major,
        10..=19 => Tier::Regional,
        _ => Tier::Specialty,
    }
}

/// Static table of feed sources, kept in declaration order.
#[derive(Debug, Clone)]
pub struct FeedRegistry {
    sources: Vec<Source>,
}

impl Default for FeedRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl FeedRegistry {
    pub fn builtin() -> Self {
        let sources = BUILTIN_FEEDS
            .iter()
            .enumerate()
            .map(|(i, (name, url, category))| Source {
                name: name.to_string(),
                url: url.to_string(),
                category: *category,
                tier: tier_for_position(i),
                active: true,
            })
            .collect();
        Self { sources }
    }

    /// Builds a registry from caller supplied sources, rejecting blank or
    /// duplicate names and non-http(s) endpoints.
    pub fn from_sources(sources: Vec<Source>) -> Result<Self> {
        let mut seen = HashSet::new();
        for source in &sources {
            if source.name.trim().is_empty() {
                return Err(AggregatorError::InvalidSource("empty source name".to_string()));
            }
            if !seen.insert(source.name.as_str()) {
                return Err(AggregatorError::InvalidSource(format!(
                    "duplicate source name '{}'",
                    source.name
                )));
            }
            if !is_valid_feed_url(&source.url) {
                return Err(AggregatorError::InvalidSource(format!(
                    "'{}' has an invalid feed url '{}'",
                    source.name, source.url
                )));
            }
        }
        Ok(Self { sources })
    }

    pub fn all_sources(&self) -> BTreeMap<String, String> {
        self.sources
            .iter()
            .map(|s| (s.name.clone(), s.url.clone()))
            .collect()
    }

    pub fn source_names(&self) -> BTreeSet<String> {
        self.sources.iter().map(|s| s.name.clone()).collect()
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn active_sources(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter().filter(|s| s.active)
    }

    pub fn get(&self, name: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.name == name)
    }

    pub fn sources_by_tier(&self) -> BTreeMap<Tier, Vec<&Source>> {
        let mut tiers: BTreeMap<Tier, Vec<&Source>> = BTreeMap::new();
        for source in &self.sources {
            tiers.entry(source.tier).or_default().push(source);
        }
        tiers
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
