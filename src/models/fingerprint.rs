use serde::{Deserialize, Serialize};

/// Normalized identity of the environment a login attempt originates from.
///
/// All attributes are stored exactly as supplied by the upstream extraction
/// layer; this type performs no parsing or normalization of its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextFingerprint {
    pub ip: String,
    pub country: String,
    pub city: String,
    pub browser: String,
    pub platform: String,
    pub os: String,
    pub device: String,
    pub device_type: String,
}

impl ContextFingerprint {
    /// Compare two fingerprints for exact equality across every attribute.
    ///
    /// Comparison is case-sensitive and total: a single differing field
    /// means the fingerprints do not match. There is no subnet grouping,
    /// typo tolerance, or partial-overlap scoring at this layer; fuzzy
    /// risk scoring belongs to callers.
    pub fn matches(&self, other: &ContextFingerprint) -> bool {
        self == other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desktop_chrome() -> ContextFingerprint {
        ContextFingerprint {
            ip: "192.168.1.1".to_string(),
            country: "US".to_string(),
            city: "New York".to_string(),
            browser: "Chrome 98.0.4758.102".to_string(),
            platform: "Windows".to_string(),
            os: "Windows 10".to_string(),
            device: "Unknown".to_string(),
            device_type: "Desktop".to_string(),
        }
    }

    #[test]
    fn test_identical_fingerprints_match() {
        let a = desktop_chrome();
        let b = desktop_chrome();
        assert!(a.matches(&b));
        assert!(b.matches(&a));
    }

    #[test]
    fn test_single_field_difference_is_a_non_match() {
        let a = desktop_chrome();

        let variants: Vec<Box<dyn Fn(&mut ContextFingerprint)>> = vec![
            Box::new(|f| f.ip = "192.168.1.2".to_string()),
            Box::new(|f| f.country = "CA".to_string()),
            Box::new(|f| f.city = "Los Angeles".to_string()),
            Box::new(|f| f.browser = "Firefox 97.0".to_string()),
            Box::new(|f| f.platform = "Linux".to_string()),
            Box::new(|f| f.os = "Windows 11".to_string()),
            Box::new(|f| f.device = "Pixel 6".to_string()),
            Box::new(|f| f.device_type = "Mobile".to_string()),
        ];

        for mutate in variants {
            let mut b = desktop_chrome();
            mutate(&mut b);
            assert!(!a.matches(&b), "expected non-match for {:?}", b);
        }
    }

    #[test]
    fn test_comparison_is_case_sensitive() {
        let a = desktop_chrome();
        let mut b = desktop_chrome();
        b.city = "new york".to_string();
        assert!(!a.matches(&b));
    }
}
