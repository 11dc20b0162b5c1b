//! Keyword-based product category detection.
//!
//! Categories parameterize the retail and synthesis prompts with the
//! attribute and aspect vocabulary relevant to the product, changing what is
//! asked for without changing the pipeline's control flow.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductCategory {
    Fragrance,
    Makeup,
    Skincare,
    Tools,
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProductCategory::Fragrance => "Fragrance",
            ProductCategory::Makeup => "Makeup",
            ProductCategory::Skincare => "Skincare",
            ProductCategory::Tools => "Tools",
        })
    }
}

impl ProductCategory {
    const ALL: [ProductCategory; 4] = [
        ProductCategory::Fragrance,
        ProductCategory::Makeup,
        ProductCategory::Skincare,
        ProductCategory::Tools,
    ];

    fn keywords(self) -> &'static [&'static str] {
        match self {
            ProductCategory::Fragrance => &[
                "perfume",
                "eau de parfum",
                "eau de toilette",
                "cologne",
                "fragrance",
                "scent",
            ],
            ProductCategory::Makeup => &[
                "foundation",
                "lipstick",
                "mascara",
                "eyeshadow",
                "blush",
                "concealer",
                "powder",
                "makeup",
                "cosmetic",
            ],
            ProductCategory::Skincare => &[
                "serum",
                "moisturizer",
                "cleanser",
                "cream",
                "lotion",
                "essence",
                "toner",
                "treatment",
                "skincare",
            ],
            ProductCategory::Tools => &[
                "brush", "sponge", "curler", "applicator", "tool", "device", "blender",
            ],
        }
    }

    /// Category-specific specification attribute names requested from the
    /// synthesis stage.
    #[must_use]
    pub fn spec_attributes(self) -> &'static [&'static str] {
        match self {
            ProductCategory::Fragrance => &[
                "fragrance_notes",
                "concentration",
                "longevity_hours",
                "sillage_rating",
                "season_suitability",
                "occasion_suitability",
            ],
            ProductCategory::Makeup => &[
                "coverage_level",
                "finish_type",
                "shade_range",
                "undertones",
                "application_method",
                "skin_type_suitability",
            ],
            ProductCategory::Skincare => &[
                "skin_concerns",
                "active_ingredients",
                "ph_level",
                "texture_type",
                "skin_type_suitability",
                "usage_frequency",
            ],
            ProductCategory::Tools => &[
                "material",
                "bristle_type",
                "handle_design",
                "cleaning_ease",
                "durability_rating",
                "ergonomics",
            ],
        }
    }

    /// Aspect names scored by the synthesis stage for this category.
    #[must_use]
    pub fn aspects(self) -> &'static [&'static str] {
        match self {
            ProductCategory::Fragrance => &[
                "longevity",
                "sillage",
                "uniqueness",
                "versatility",
                "value_for_money",
            ],
            ProductCategory::Makeup => &[
                "coverage",
                "blendability",
                "longevity",
                "color_accuracy",
                "ease_of_application",
                "value_for_money",
            ],
            ProductCategory::Skincare => &[
                "effectiveness",
                "gentleness",
                "absorption",
                "hydration",
                "non_comedogenic",
                "value_for_money",
            ],
            ProductCategory::Tools => &[
                "durability",
                "ease_of_use",
                "effectiveness",
                "ergonomics",
                "cleaning_ease",
                "value_for_money",
            ],
        }
    }
}

/// Classify a subject into a [`ProductCategory`] by keyword scoring over the
/// concatenated name, brand, and description.
///
/// Each keyword occurrence counts once. The highest-scoring category wins;
/// a zero score everywhere, or a tie for the top score, resolves to
/// [`ProductCategory::Makeup`].
#[must_use]
pub fn detect_category(name: &str, brand: Option<&str>, description: Option<&str>) -> ProductCategory {
    let haystack = format!(
        "{} {} {}",
        name,
        brand.unwrap_or_default(),
        description.unwrap_or_default()
    )
    .to_lowercase();

    let mut best = ProductCategory::Makeup;
    let mut best_score = 0usize;
    let mut tied = false;

    for category in ProductCategory::ALL {
        let score = category
            .keywords()
            .iter()
            .filter(|keyword| haystack.contains(*keyword))
            .count();
        if score > best_score {
            best = category;
            best_score = score;
            tied = false;
        } else if score == best_score && score > 0 && category != best {
            tied = true;
        }
    }

    if best_score == 0 || tied {
        ProductCategory::Makeup
    } else {
        best
    }
}
