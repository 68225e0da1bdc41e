//! Compliance marketing reports
//!
//! Report content for the compliance pane. Visibility is gated on
//! `release-marketing-security-report`, and the variant shown follows
//! `show-region-based-security-report` ("GDPR", "CCPA", or the
//! default "SOC 2").

/// Flag gating the compliance pane
pub const REPORT_FLAG: &str = "release-marketing-security-report";

/// Flag selecting which report variant is shown
pub const REPORT_VARIANT_FLAG: &str = "show-region-based-security-report";

/// One region-specific compliance report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComplianceReport {
    pub title: &'static str,
    pub description: &'static str,
    pub features: [&'static str; 4],
}

/// Report for a variant value, falling back to SOC 2 for anything
/// unrecognized
pub fn for_variant(variant: &str) -> ComplianceReport {
    match variant {
        "GDPR" => ComplianceReport {
            title: "GDPR Compliance: Protecting EU User Privacy",
            description: "Ledgr complies with GDPR regulations by ensuring full data privacy, \
                          transparency, and user control.",
            features: [
                "✅ Right to Access & Data Portability",
                "✅ Right to be Forgotten (Data Deletion Requests)",
                "✅ End-to-End Encryption for Personal Data",
                "✅ Compliance with Article 5 (Lawful, Fair & Transparent Processing)",
            ],
        },
        "CCPA" => ComplianceReport {
            title: "CCPA Compliance: California Consumer Rights",
            description: "Ledgr meets all CCPA requirements, ensuring transparency and opt-out \
                          mechanisms for data collection.",
            features: [
                "✅ Consumer Data Protection & Opt-Out",
                "✅ No Selling of Personal Information",
                "✅ Transparent Data Collection & Usage",
                "✅ Right to Request Personal Data Disclosure",
            ],
        },
        _ => ComplianceReport {
            title: "SOC 2 Compliance: Secure & Reliable Operations",
            description: "Ledgr is SOC 2 certified, ensuring high security, availability, and \
                          confidentiality standards for enterprise data.",
            features: [
                "✅ 24/7 Security Monitoring",
                "✅ Multi-Factor Authentication (MFA) for Admins",
                "✅ Role-Based Access Control (RBAC)",
                "✅ Annual Compliance Audits",
            ],
        },
    }
}
