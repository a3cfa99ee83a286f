use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Fixed scenario grouping used to disambiguate identical trigger words.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Inventory,
    Testing,
    Production,
    Comparison,
    Exploration,
}

impl Category {
    pub const ALL: [Self; 5] = [
        Self::Inventory,
        Self::Testing,
        Self::Production,
        Self::Comparison,
        Self::Exploration,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inventory => "inventory",
            Self::Testing => "testing",
            Self::Production => "production",
            Self::Comparison => "comparison",
            Self::Exploration => "exploration",
        }
    }

    /// Keywords whose presence in a query points at this category.
    ///
    /// Latin keywords are lowercase; queries are case-folded before lookup.
    #[must_use]
    pub const fn default_keywords(&self) -> &'static [&'static str] {
        match self {
            Self::Inventory => &["库存", "在库", "仓库", "inventory", "stock"],
            Self::Testing => &["检验", "检测", "测试", "不良", "合格", "inspection", "test"],
            Self::Production => &["生产", "上线", "在线", "产线", "production", "online"],
            Self::Comparison => &["对比", "比较", "compare", "versus"],
            Self::Exploration => &["分析", "趋势", "分布", "explore", "trend"],
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inventory" => Ok(Self::Inventory),
            "testing" => Ok(Self::Testing),
            "production" => Ok(Self::Production),
            "comparison" => Ok(Self::Comparison),
            "exploration" => Ok(Self::Exploration),
            _ => Err(anyhow::anyhow!("unknown rule category: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuleStatus {
    #[default]
    Active,
    Inactive,
}

impl std::fmt::Display for RuleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Inactive => write!(f, "inactive"),
        }
    }
}

impl std::str::FromStr for RuleStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            _ => Err(anyhow::anyhow!("unknown rule status: {s}")),
        }
    }
}

/// Semantic type of an extracted parameter value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    String,
    Number,
    Date,
    Enum,
}

/// How a parameter finds its value in the query text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParameterKind {
    /// A closed set of literals matched as substrings of the query.
    LiteralSet {
        values: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fallback_pattern: Option<String>,
    },
    /// Canonical values plus alias spellings that resolve to them.
    EnumWithAliases {
        values: Vec<String>,
        #[serde(default)]
        aliases: BTreeMap<String, String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fallback_pattern: Option<String>,
    },
    /// A regex whose first capture group is the value.
    RegexPattern { pattern: String },
}

impl ParameterKind {
    /// Every literal that may appear in a query: canonical values followed by
    /// alias spellings, in declaration order.
    #[must_use]
    pub fn literals(&self) -> Vec<&str> {
        match self {
            Self::LiteralSet { values, .. } => values.iter().map(String::as_str).collect(),
            Self::EnumWithAliases {
                values, aliases, ..
            } => values
                .iter()
                .map(String::as_str)
                .chain(aliases.keys().map(String::as_str))
                .collect(),
            Self::RegexPattern { .. } => Vec::new(),
        }
    }

    #[must_use]
    pub fn pattern(&self) -> Option<&str> {
        match self {
            Self::LiteralSet {
                fallback_pattern, ..
            }
            | Self::EnumWithAliases {
                fallback_pattern, ..
            } => fallback_pattern.as_deref(),
            Self::RegexPattern { pattern } => Some(pattern),
        }
    }

    /// Resolve a matched literal to its canonical value.
    #[must_use]
    pub fn canonical<'a>(&'a self, literal: &'a str) -> &'a str {
        match self {
            Self::EnumWithAliases { aliases, .. } => {
                aliases.get(literal).map_or(literal, String::as_str)
            }
            Self::LiteralSet { .. } | Self::RegexPattern { .. } => literal,
        }
    }

    /// Canonical values a resolved value must belong to, if the set is closed.
    #[must_use]
    pub fn allowed_values(&self) -> Option<&[String]> {
        match self {
            Self::LiteralSet { values, .. } | Self::EnumWithAliases { values, .. } => {
                Some(values)
            }
            Self::RegexPattern { .. } => None,
        }
    }
}

/// A matched value that must not pull rows whose field contains
/// `excluded_substring` ("电池" must not return "电池盖").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Exclusion {
    pub value: String,
    pub excluded_substring: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(default)]
    pub value_type: ValueType,
    #[serde(flatten)]
    pub kind: ParameterKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclusions: Vec<Exclusion>,
    /// Result-row field the value is compared against. Defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

const fn default_required() -> bool {
    true
}

impl ParameterSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            value_type: ValueType::String,
            kind,
            exclusions: Vec::new(),
            field: None,
            required: true,
            default: None,
        }
    }

    #[must_use]
    pub fn literal<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            ParameterKind::LiteralSet {
                values: values.into_iter().map(Into::into).collect(),
                fallback_pattern: None,
            },
        )
    }

    #[must_use]
    pub fn regex(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(
            name,
            ParameterKind::RegexPattern {
                pattern: pattern.into(),
            },
        )
    }

    #[must_use]
    pub fn enumeration<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut spec = Self::new(
            name,
            ParameterKind::EnumWithAliases {
                values: values.into_iter().map(Into::into).collect(),
                aliases: BTreeMap::new(),
                fallback_pattern: None,
            },
        );
        spec.value_type = ValueType::Enum;
        spec
    }

    /// Register an alias spelling. Only meaningful for enum parameters.
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>, canonical: impl Into<String>) -> Self {
        if let ParameterKind::EnumWithAliases { aliases, .. } = &mut self.kind {
            aliases.insert(alias.into(), canonical.into());
        }
        self
    }

    #[must_use]
    pub fn with_fallback_pattern(mut self, pattern: impl Into<String>) -> Self {
        match &mut self.kind {
            ParameterKind::LiteralSet {
                fallback_pattern, ..
            }
            | ParameterKind::EnumWithAliases {
                fallback_pattern, ..
            } => *fallback_pattern = Some(pattern.into()),
            ParameterKind::RegexPattern { pattern: existing } => *existing = pattern.into(),
        }
        self
    }

    #[must_use]
    pub fn with_exclusion(
        mut self,
        value: impl Into<String>,
        excluded_substring: impl Into<String>,
    ) -> Self {
        self.exclusions.push(Exclusion {
            value: value.into(),
            excluded_substring: excluded_substring.into(),
        });
        self
    }

    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    #[must_use]
    pub const fn with_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }

    #[must_use]
    pub const fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    #[must_use]
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Field compared against rows when applying exclusions.
    #[must_use]
    pub fn comparable_field(&self) -> &str {
        self.field.as_deref().unwrap_or(&self.name)
    }

    /// Excluded substrings registered for `value`.
    pub fn exclusions_for<'a>(&'a self, value: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.exclusions
            .iter()
            .filter(move |e| e.value == value)
            .map(|e| e.excluded_substring.as_str())
    }
}

/// A stored mapping from a natural-language pattern to a retrieval template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntentRule {
    #[serde(default)]
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: Category,
    #[serde(default)]
    pub trigger_words: Vec<String>,
    #[serde(default)]
    pub synonyms: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    /// Retrieval template with positional `?` placeholders.
    pub template: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub status: RuleStatus,
    #[serde(default)]
    pub example_query: String,
}

impl IntentRule {
    #[must_use]
    pub fn new(
        id: i32,
        name: impl Into<String>,
        category: Category,
        template: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            category,
            trigger_words: Vec::new(),
            synonyms: BTreeMap::new(),
            parameters: Vec::new(),
            template: template.into(),
            priority: 0,
            sort_order: 0,
            status: RuleStatus::Active,
            example_query: String::new(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Append trigger words, skipping duplicates.
    #[must_use]
    pub fn with_trigger_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for word in words {
            let word = word.into();
            if !self.trigger_words.contains(&word) {
                self.trigger_words.push(word);
            }
        }
        self
    }

    #[must_use]
    pub fn with_synonyms<I, S>(mut self, word: impl Into<String>, equivalents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.synonyms
            .entry(word.into())
            .or_default()
            .extend(equivalents.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_parameter(mut self, spec: ParameterSpec) -> Self {
        self.parameters.push(spec);
        self
    }

    #[must_use]
    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub const fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }

    #[must_use]
    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.example_query = example.into();
        self
    }

    #[must_use]
    pub const fn inactive(mut self) -> Self {
        self.status = RuleStatus::Inactive;
        self
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == RuleStatus::Active
    }

    /// Trigger words followed by synonym keys and equivalents, deduplicated,
    /// in declaration order.
    #[must_use]
    pub fn keywords(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        let synonyms = self
            .synonyms
            .iter()
            .flat_map(|(word, eqs)| std::iter::once(word).chain(eqs.iter()));
        for word in self.trigger_words.iter().chain(synonyms) {
            let word = word.as_str();
            if !word.is_empty() && !out.contains(&word) {
                out.push(word);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_merge_triggers_and_synonyms() {
        let rule = IntentRule::new(1, "库存查询", Category::Inventory, "SELECT 1")
            .with_trigger_words(["库存", "供应商", "库存"])
            .with_synonyms("库存", ["存货", "在库"]);

        assert_eq!(rule.trigger_words, vec!["库存", "供应商"]);
        assert_eq!(rule.keywords(), vec!["库存", "供应商", "存货", "在库"]);
    }

    #[test]
    fn alias_resolves_to_canonical() {
        let spec = ParameterSpec::enumeration("result", ["合格", "不合格"])
            .with_alias("OK", "合格")
            .with_alias("NG", "不合格");

        assert_eq!(spec.kind.canonical("NG"), "不合格");
        assert_eq!(spec.kind.canonical("合格"), "合格");
        assert_eq!(spec.kind.literals(), vec!["合格", "不合格", "NG", "OK"]);
    }

    #[test]
    fn comparable_field_defaults_to_name() {
        let spec = ParameterSpec::literal("material", ["电池"]);
        assert_eq!(spec.comparable_field(), "material");
        let spec = spec.with_field("material_name");
        assert_eq!(spec.comparable_field(), "material_name");
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn parameter_spec_json_layout() {
        let json = r#"{
            "name": "supplier",
            "kind": "literal_set",
            "values": ["聚龙", "BOE"],
            "exclusions": [{"value": "电池", "excluded_substring": "电池盖"}]
        }"#;
        let spec: ParameterSpec = serde_json::from_str(json).expect("valid spec JSON");

        assert!(spec.required);
        assert_eq!(spec.value_type, ValueType::String);
        assert_eq!(spec.kind.literals(), vec!["聚龙", "BOE"]);
        assert_eq!(spec.exclusions_for("电池").collect::<Vec<_>>(), vec!["电池盖"]);
    }

    #[test]
    fn category_round_trips_through_str() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().ok(), Some(category));
        }
        assert!("warehouse".parse::<Category>().is_err());
    }
}
