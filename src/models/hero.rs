use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Landing-page hero banner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hero {
    pub id: i64,
    #[serde(rename = "heroHeader")]
    pub hero_header: String,
    #[serde(rename = "heroTitle1")]
    pub hero_title1: String,
    #[serde(rename = "heroTitle2")]
    pub hero_title2: String,
    #[serde(rename = "heroTitle3")]
    pub hero_title3: String,
    #[serde(rename = "targetUrl")]
    pub target_url: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub heroimg_count: i64,
}

/// Body of both create and update. Every field is required; they are
/// optional here only so the handler can list all missing ones at once.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroInput {
    pub hero_header: Option<String>,
    pub hero_title1: Option<String>,
    pub hero_title2: Option<String>,
    pub hero_title3: Option<String>,
    pub target_url: Option<String>,
}

/// Validated hero fields.
#[derive(Debug, Clone)]
pub struct HeroFields {
    pub hero_header: String,
    pub hero_title1: String,
    pub hero_title2: String,
    pub hero_title3: String,
    pub target_url: String,
}

impl HeroInput {
    pub fn validate(self) -> Result<HeroFields> {
        fn present(v: &Option<String>) -> bool {
            v.as_deref().is_some_and(|s| !s.trim().is_empty())
        }

        let missing: Vec<&str> = [
            ("heroHeader", &self.hero_header),
            ("heroTitle1", &self.hero_title1),
            ("heroTitle2", &self.hero_title2),
            ("heroTitle3", &self.hero_title3),
            ("targetUrl", &self.target_url),
        ]
        .into_iter()
        .filter(|(_, v)| !present(v))
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(AppError::BadRequest(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        Ok(HeroFields {
            hero_header: self.hero_header.unwrap_or_default(),
            hero_title1: self.hero_title1.unwrap_or_default(),
            hero_title2: self.hero_title2.unwrap_or_default(),
            hero_title3: self.hero_title3.unwrap_or_default(),
            target_url: self.target_url.unwrap_or_default(),
        })
    }
}
