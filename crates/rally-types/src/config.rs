use serde::{Deserialize, Serialize};

/// On-disk economy configuration. Loaded once at startup and validated
/// by `rally-core` before anything reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EconomyFile {
    #[serde(default = "default_reasons")]
    pub reasons: Vec<ReasonDef>,
    #[serde(default = "default_tiers")]
    pub tiers: Vec<TierDef>,
    #[serde(default)]
    pub feedback: FeedbackDef,
    #[serde(default = "default_resolution_emoji")]
    pub resolution_emoji: String,
}

impl Default for EconomyFile {
    fn default() -> Self {
        Self {
            reasons: default_reasons(),
            tiers: default_tiers(),
            feedback: FeedbackDef::default(),
            resolution_emoji: default_resolution_emoji(),
        }
    }
}

/// One row of the points-reason table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasonDef {
    pub emoji: String,
    pub text: String,
    pub points: i64,
}

/// One row of the threshold table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierDef {
    pub threshold: i64,
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedbackDef {
    pub positive_emoji: String,
    pub negative_emoji: String,
    pub positive_reply: String,
    pub negative_reply: String,
}

impl Default for FeedbackDef {
    fn default() -> Self {
        Self {
            positive_emoji: "👍".into(),
            negative_emoji: "👎".into(),
            positive_reply: "Thanks for the feedback, glad that helped!".into(),
            negative_reply: "Thanks for the feedback, we'll use it to improve our answers.".into(),
        }
    }
}

fn default_resolution_emoji() -> String {
    "✅".into()
}

fn default_reasons() -> Vec<ReasonDef> {
    [
        ("💡", "Shared a helpful idea", 50),
        ("🐛", "Reported a bug", 100),
        ("🛠️", "Provided a fix or workaround", 150),
        ("📚", "Improved documentation", 75),
        ("🤝", "Helped another community member", 50),
        ("⭐", "Outstanding contribution", 250),
        ("🚫", "Broke community guidelines", -100),
    ]
    .into_iter()
    .map(|(emoji, text, points)| ReasonDef {
        emoji: emoji.into(),
        text: text.into(),
        points,
    })
    .collect()
}

fn default_tiers() -> Vec<TierDef> {
    [
        (1000, "contributor", "Contributor"),
        (2500, "regular", "Regular"),
        (5000, "expert", "Expert"),
        (10000, "champion", "Champion"),
        (25000, "legend", "Legend"),
    ]
    .into_iter()
    .map(|(threshold, id, name)| TierDef {
        threshold,
        id: id.into(),
        name: name.into(),
    })
    .collect()
}
