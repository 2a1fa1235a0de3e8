//! Illustrative knowledge entries for demos and tests.

use super::{DomainKnowledgeStore, KnowledgeCategory, KnowledgeEntry, KnowledgeError};

/// The built-in sample entries.
#[must_use]
pub fn sample_entries() -> Vec<KnowledgeEntry> {
    use KnowledgeCategory::{AuditRules, Compliance, MarketPricing, VendorProfiles};

    vec![
        KnowledgeEntry::new(
            "MP001",
            MarketPricing,
            "Digital advertising market prices: display ad CPM averages $2-$10 across the industry. Premium placements run $15-$30.",
        )
        .with_meta("type", "advertising")
        .with_meta("updated", "2024-01"),
        KnowledgeEntry::new(
            "MP002",
            MarketPricing,
            "Standard IT equipment price ranges: enterprise servers $5,000-$50,000, network equipment $500-$10,000.",
        )
        .with_meta("type", "hardware")
        .with_meta("updated", "2024-01"),
        KnowledgeEntry::new(
            "MP003",
            MarketPricing,
            "Consulting hourly rates: junior $100-$200/hour, senior $250-$500/hour, partner $500-$1000/hour.",
        )
        .with_meta("type", "services")
        .with_meta("updated", "2024-01"),
        KnowledgeEntry::new(
            "VP001",
            VendorProfiles,
            "ABC Technologies: IT equipment supplier. Reliability: high. Three years of transaction history. Payment terms: Net 30.",
        )
        .with_meta("vendor_id", "V001")
        .with_meta("risk_level", "low"),
        KnowledgeEntry::new(
            "VP002",
            VendorProfiles,
            "XYZ Media Agency: advertising agency. Reliability: medium. New vendor. Payment terms: 50% prepayment.",
        )
        .with_meta("vendor_id", "V002")
        .with_meta("risk_level", "medium"),
        KnowledgeEntry::new(
            "AR001",
            AuditRules,
            "Price deviation rule: a deviation of 20% or more from the market price requires additional approval.",
        )
        .with_meta("rule_type", "pricing")
        .with_meta("severity", "high"),
        KnowledgeEntry::new(
            "AR002",
            AuditRules,
            "Split order rule: three or more consecutive orders to the same vendor whose total exceeds the approval limit must be investigated.",
        )
        .with_meta("rule_type", "procurement")
        .with_meta("severity", "medium"),
        KnowledgeEntry::new(
            "AR003",
            AuditRules,
            "Timing anomaly rule: orders concentrated within 3 days of month-end or quarter-end need attention.",
        )
        .with_meta("rule_type", "timing")
        .with_meta("severity", "medium"),
        KnowledgeEntry::new(
            "CP001",
            Compliance,
            "Internal control standard: orders of 100,000 yen or more require department head approval; 1,000,000 yen or more require executive approval.",
        )
        .with_meta("regulation", "internal_control"),
        KnowledgeEntry::new(
            "CP002",
            Compliance,
            "Related party transactions: transactions with parties related to officers or employees require prior disclosure and board approval.",
        )
        .with_meta("regulation", "related_party"),
    ]
}

/// Create a keyword-indexed store seeded with [`sample_entries`].
///
/// # Errors
///
/// Returns `KnowledgeError::Index` if an entry cannot be indexed.
pub fn load_sample_knowledge() -> Result<DomainKnowledgeStore, KnowledgeError> {
    let mut store = DomainKnowledgeStore::new();
    store.add_entries(sample_entries())?;
    Ok(store)
}
