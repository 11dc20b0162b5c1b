use thiserror::Error;

pub mod app_config;
pub mod category;
pub mod config;
pub mod snapshot;

pub use app_config::{AppConfig, Environment};
pub use category::{detect_category, ProductCategory};
pub use config::{load_app_config, load_app_config_from_env};
pub use snapshot::{
    AggregatedSnapshot, EditorialQuote, EditorialRecord, PlatformEntry, PlatformInsights,
    PlatformKey, Price, ProductIdentity, Rating, RetailRecord, ReviewSnippet, SocialPost,
    SocialRecord, Specifications, SummarizedReview,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for env var {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

/// The subject of one aggregation run, resolved from a product row by the
/// caller before the pipeline starts.
#[derive(Debug, Clone)]
pub struct Subject {
    pub name: String,
    pub brand: Option<String>,
    pub description: Option<String>,
}

impl Subject {
    /// Display form used in prompts and log fields: `"{brand} {name}"` when
    /// the brand is known and not already part of the name.
    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.brand {
            Some(brand) if !self.name.to_lowercase().contains(&brand.to_lowercase()) => {
                format!("{brand} {}", self.name)
            }
            _ => self.name.clone(),
        }
    }

    /// Filesystem-safe slug for debug artifact file names.
    #[must_use]
    pub fn slug(&self) -> String {
        self.name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '-'
                }
            })
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_prepends_brand() {
        let subject = Subject {
            name: "Hydrating Serum X".to_string(),
            brand: Some("AcmeCo".to_string()),
            description: None,
        };
        assert_eq!(subject.display_name(), "AcmeCo Hydrating Serum X");
    }

    #[test]
    fn display_name_skips_brand_already_in_name() {
        let subject = Subject {
            name: "AcmeCo Hydrating Serum X".to_string(),
            brand: Some("acmeco".to_string()),
            description: None,
        };
        assert_eq!(subject.display_name(), "AcmeCo Hydrating Serum X");
    }

    #[test]
    fn slug_is_filesystem_safe() {
        let subject = Subject {
            name: "Hydrating Serum X (30ml / 1oz)".to_string(),
            brand: None,
            description: None,
        };
        assert_eq!(subject.slug(), "hydrating-serum-x-30ml-1oz");
    }
}
