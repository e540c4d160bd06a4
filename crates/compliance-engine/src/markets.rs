//! Market-specific policy rule tables
//!
//! Rules are layered the same way for every market:
//! 1. Default - ad-platform policies that apply everywhere
//! 2. Market - consumer-protection rules for the selected country/region
//!
//! Unknown markets resolve to the default layer only.

use std::collections::HashMap;

use lazy_static::lazy_static;
use shared_types::{PolicyRule, Severity};

/// Key used for the market-agnostic rule layer and law fallback
pub const DEFAULT_MARKET: &str = "default";

/// Statutory reference attached to violations raised in a market
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LawReference {
    pub law: &'static str,
    pub source_url: &'static str,
}

lazy_static! {
    static ref DEFAULT_RULES: Vec<PolicyRule> = vec![
        PolicyRule::new(
            "Medical Claims",
            Severity::High,
            &[
                "cure",
                "heal",
                "treats",
                "treatment for",
                "prevents disease",
                "clinically proven",
                "fda approved",
                "medical grade",
                "remedy for",
            ],
            "Products may not claim to diagnose, treat, cure or prevent a disease",
        ),
        PolicyRule::new(
            "Misleading Claims",
            Severity::Medium,
            &[
                "guaranteed results",
                "100% guaranteed",
                "risk-free",
                "miracle",
                "instant results",
                "no side effects",
                "best in the world",
            ],
            "Claims must be substantiated and must not overstate what the product does",
        ),
        PolicyRule::new(
            "Weight Loss",
            Severity::High,
            &[
                "weight loss",
                "lose weight",
                "fat burner",
                "fat burning",
                "slimming",
                "appetite suppressant",
                "detox",
            ],
            "Weight-loss promises and unrealistic body-image claims are restricted",
        ),
        PolicyRule::new(
            "Restricted Substances",
            Severity::High,
            &["cbd", "thc", "kratom", "nicotine", "hemp extract", "delta-8", "psilocybin"],
            "Unapproved or restricted substances cannot be advertised",
        ),
        PolicyRule::new(
            "Dangerous Products",
            Severity::High,
            &[
                "firearm",
                "ammunition",
                "explosive",
                "switchblade",
                "stun gun",
                "brass knuckles",
            ],
            "Weapons and products that can cause harm are prohibited",
        ),
        PolicyRule::new(
            "Counterfeit Goods",
            Severity::High,
            &["replica", "counterfeit", "knockoff", "knock-off", "1:1 copy"],
            "Products imitating another brand's trademarks are prohibited",
        ),
        PolicyRule::new(
            "Financial Claims",
            Severity::Medium,
            &[
                "get rich",
                "guaranteed income",
                "passive income",
                "double your money",
            ],
            "Earnings and financial-return promises require substantiation",
        ),
        PolicyRule::new(
            "Pricing Claims",
            Severity::Low,
            &[
                "lowest price guaranteed",
                "cheapest anywhere",
                "price match guarantee",
                "limited time only",
            ],
            "Price comparisons and urgency claims must be accurate and verifiable",
        ),
    ];

    static ref MARKET_RULES: HashMap<&'static str, Vec<PolicyRule>> = {
        let mut rules = HashMap::new();
        rules.insert(
            "us",
            vec![
                PolicyRule::new(
                    "Dietary Supplement Claims",
                    Severity::High,
                    &["boosts immunity", "immune support", "testosterone booster", "supplement"],
                    "Supplement structure/function claims need FDA disclaimers and evidence",
                ),
                PolicyRule::new(
                    "Made in USA Claims",
                    Severity::Medium,
                    &["made in usa", "made in america", "american made"],
                    "Unqualified origin claims require all or virtually all US content",
                ),
            ],
        );
        rules.insert(
            "uk",
            vec![
                PolicyRule::new(
                    "Age-Restricted Products",
                    Severity::High,
                    &["vape", "e-cigarette", "e-liquid", "alcohol", "spirits"],
                    "Age-restricted products need compliant targeting and age verification",
                ),
                PolicyRule::new(
                    "Unauthorised Health Claims",
                    Severity::Medium,
                    &["boosts metabolism", "immune boosting", "superfood"],
                    "Only authorised nutrition and health claims may be made",
                ),
                PolicyRule::new(
                    "Pricing Transparency",
                    Severity::Low,
                    &["was £", "rrp"],
                    "Reference prices must reflect a genuine previous selling price",
                ),
            ],
        );
        rules.insert(
            "eu",
            vec![
                PolicyRule::new(
                    "Environmental Claims",
                    Severity::Medium,
                    &[
                        "eco-friendly",
                        "carbon neutral",
                        "climate neutral",
                        "biodegradable",
                        "sustainable",
                        "plastic-free",
                    ],
                    "Generic environmental claims must be specific and substantiated",
                ),
                PolicyRule::new(
                    "Cosmetic Claims",
                    Severity::Medium,
                    &["hypoallergenic", "dermatologically tested", "chemical-free"],
                    "Cosmetic claims must meet the common criteria for honesty and evidence",
                ),
                PolicyRule::new(
                    "Product Safety Marking",
                    Severity::Low,
                    &["ce certified", "ce marked"],
                    "Conformity markings may only be shown for assessed products",
                ),
            ],
        );
        rules.insert(
            "au",
            vec![
                PolicyRule::new(
                    "Therapeutic Goods",
                    Severity::High,
                    &["tga approved", "therapeutic", "pain relief", "relieves pain"],
                    "Therapeutic claims require ARTG listing and TGA advertising compliance",
                ),
                PolicyRule::new(
                    "Country of Origin",
                    Severity::Medium,
                    &["made in australia", "australian made"],
                    "Origin claims must satisfy the substantial transformation test",
                ),
            ],
        );
        rules.insert(
            "ca",
            vec![
                PolicyRule::new(
                    "Natural Health Products",
                    Severity::High,
                    &["natural health product", "relieves symptoms", "immune support"],
                    "Health claims require a Natural Product Number and licensed wording",
                ),
                PolicyRule::new(
                    "Made in Canada Claims",
                    Severity::Medium,
                    &["made in canada", "product of canada"],
                    "Origin claims must meet Competition Bureau content thresholds",
                ),
            ],
        );
        rules
    };

    static ref LAW_REFERENCES: HashMap<&'static str, LawReference> = {
        let mut laws = HashMap::new();
        laws.insert(
            DEFAULT_MARKET,
            LawReference {
                law: "Google Ads Policies (Misrepresentation; Healthcare and medicines)",
                source_url: "https://support.google.com/adspolicy/answer/6008942",
            },
        );
        laws.insert(
            "us",
            LawReference {
                law: "FTC Act Section 5 (15 U.S.C. § 45)",
                source_url: "https://www.ftc.gov/legal-library/browse/statutes/federal-trade-commission-act",
            },
        );
        laws.insert(
            "uk",
            LawReference {
                law: "Consumer Protection from Unfair Trading Regulations 2008 / CAP Code",
                source_url: "https://www.asa.org.uk/codes-and-rulings/advertising-codes/non-broadcast-code.html",
            },
        );
        laws.insert(
            "eu",
            LawReference {
                law: "Unfair Commercial Practices Directive 2005/29/EC",
                source_url: "https://eur-lex.europa.eu/eli/dir/2005/29/oj",
            },
        );
        laws.insert(
            "au",
            LawReference {
                law: "Australian Consumer Law (Competition and Consumer Act 2010, Sch. 2)",
                source_url: "https://consumer.gov.au/australian-consumer-law",
            },
        );
        laws.insert(
            "ca",
            LawReference {
                law: "Competition Act (R.S.C. 1985, c. C-34), deceptive marketing practices",
                source_url: "https://laws-lois.justice.gc.ca/eng/acts/c-34/",
            },
        );
        laws
    };
}

/// Normalize a market code for table lookups
pub fn market_key(market: &str) -> String {
    let key = market.trim().to_lowercase();
    if key.is_empty() {
        DEFAULT_MARKET.to_string()
    } else {
        key
    }
}

/// Default rules followed by the market's own rules
pub fn get_policy_rules(market: &str) -> Vec<PolicyRule> {
    let key = market_key(market);
    let mut rules = DEFAULT_RULES.clone();
    if let Some(specific) = MARKET_RULES.get(key.as_str()) {
        rules.extend(specific.iter().cloned());
    }
    rules
}

/// Markets with a dedicated rule layer, plus the default layer
pub fn supported_markets() -> Vec<&'static str> {
    let mut markets: Vec<&'static str> = MARKET_RULES.keys().copied().collect();
    markets.sort_unstable();
    markets.insert(0, DEFAULT_MARKET);
    markets
}

/// Static law reference for a market, falling back to the default entry
pub fn law_reference(market: &str) -> LawReference {
    let key = market_key(market);
    LAW_REFERENCES
        .get(key.as_str())
        .or_else(|| LAW_REFERENCES.get(DEFAULT_MARKET))
        .copied()
        .unwrap_or(LawReference {
            law: "Google Ads Policies",
            source_url: "https://support.google.com/adspolicy/answer/6008942",
        })
}

/// What the AI reviewer should focus on for a market
pub fn law_focus(market: &str) -> &'static str {
    match market_key(market).as_str() {
        "us" => "FTC truth-in-advertising rules, FDA health and supplement claims, Made in USA labelling",
        "uk" => "CAP Code, CPRs 2008, age-restricted products, authorised nutrition and health claims",
        "eu" => "Unfair Commercial Practices Directive, Green Claims rules, Cosmetics Regulation claims",
        "au" => "Australian Consumer Law misleading conduct, TGA advertising code, origin labelling",
        "ca" => "Competition Act deceptive marketing, Food and Drugs Act, Natural Health Products Regulations",
        _ => "Google Ads policies on misrepresentation, healthcare, dangerous and restricted products",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules_always_first() {
        let defaults = get_policy_rules(DEFAULT_MARKET);
        for market in supported_markets() {
            let rules = get_policy_rules(market);
            assert_eq!(&rules[..defaults.len()], &defaults[..]);
        }
    }

    #[test]
    fn test_market_lookup_is_case_insensitive() {
        assert_eq!(get_policy_rules("UK"), get_policy_rules("uk"));
        assert_eq!(get_policy_rules(" Eu "), get_policy_rules("eu"));
        assert!(get_policy_rules("uk").len() > get_policy_rules(DEFAULT_MARKET).len());
    }

    #[test]
    fn test_unknown_market_gets_defaults_only() {
        assert_eq!(get_policy_rules("zz"), get_policy_rules(DEFAULT_MARKET));
        assert_eq!(get_policy_rules(""), get_policy_rules(DEFAULT_MARKET));
    }

    #[test]
    fn test_medical_claims_contains_cure() {
        let rules = get_policy_rules(DEFAULT_MARKET);
        let medical = rules.iter().find(|r| r.category == "Medical Claims").unwrap();
        assert_eq!(medical.severity, Severity::High);
        assert!(medical.keywords.iter().any(|k| k == "cure"));
    }

    #[test]
    fn test_law_reference_falls_back_to_default() {
        assert_eq!(law_reference("zz"), law_reference(DEFAULT_MARKET));
        assert!(law_reference("UK").law.contains("CAP Code"));
    }

    #[test]
    fn test_supported_markets_lists_default_first() {
        let markets = supported_markets();
        assert_eq!(markets[0], DEFAULT_MARKET);
        assert!(markets.contains(&"us"));
        assert!(markets.contains(&"eu"));
    }
}
