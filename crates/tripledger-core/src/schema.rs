//! Template schema and dynamic content generation
//!
//! The text service is asked which template variables come from records and
//! which need generated prose. Every answer has a deterministic stand-in that
//! is computed before the call, so a slow or broken service never blocks a
//! report.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::ai::parsing::extract_json_object;
use crate::ai::{AIBackend, AIClient};
use crate::models::{Expense, ExpenseType, MileageRecord};
use crate::prompts::PromptId;
use crate::report::variables::total;
use crate::template::analyze::TemplateAnalysis;

/// Where a schema came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaSource {
    Ai,
    #[default]
    Fallback,
}

impl SchemaSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ai => "ai",
            Self::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataStructure {
    #[serde(default)]
    pub tables: Vec<String>,
    #[serde(default)]
    pub dynamic_tables: Vec<String>,
    #[serde(default)]
    pub single_values: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSchema {
    /// Variables filled from stored records
    #[serde(default)]
    pub required_fields: Vec<String>,
    /// Variables filled with generated prose
    #[serde(default)]
    pub dynamic_content: Vec<String>,
    #[serde(default)]
    pub data_structure: DataStructure,
    #[serde(default)]
    pub source: SchemaSource,
}

/// Whether a dotted name addresses one row of a table (`expense.3.vendor`)
fn is_row_variable(name: &str) -> bool {
    name.split('.').any(|part| part.parse::<u32>().is_ok())
}

fn is_dynamic_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("summary") || lower.contains("description")
}

/// Deterministic schema derived from the analysis alone
pub fn fallback_schema(analysis: &TemplateAnalysis) -> TemplateSchema {
    let names = analysis.variable_names();
    let dynamic_content: Vec<String> = names
        .iter()
        .filter(|n| is_dynamic_name(n))
        .cloned()
        .collect();
    let single_values = names
        .iter()
        .filter(|n| !is_row_variable(n) && !dynamic_content.contains(n))
        .cloned()
        .collect();

    TemplateSchema {
        required_fields: names,
        dynamic_content,
        data_structure: DataStructure {
            tables: if analysis.has_expense_table {
                vec!["expenses".to_string()]
            } else {
                Vec::new()
            },
            dynamic_tables: Vec::new(),
            single_values,
        },
        source: SchemaSource::Fallback,
    }
}

fn schema_prompt_variables(analysis: &TemplateAnalysis) -> String {
    if analysis.variables.is_empty() {
        return "(none)".to_string();
    }
    analysis
        .variables
        .values()
        .map(|v| format!("- {} ({})", v.name, v.inferred_type.as_str()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Ask the text service for a schema, falling back on any failure
///
/// Names the service invents are dropped; an answer that keeps none of the
/// template's variables counts as a failure.
pub async fn generate_schema(ai: Option<&AIClient>, analysis: &TemplateAnalysis) -> TemplateSchema {
    let Some(ai) = ai else {
        return fallback_schema(analysis);
    };

    let variables = schema_prompt_variables(analysis);
    let has_expense = analysis.has_expense_table.to_string();
    let has_mileage = analysis.has_mileage_table.to_string();
    let has_summary = analysis.has_summary_section.to_string();

    let mut vars = HashMap::new();
    vars.insert("variables", variables.as_str());
    vars.insert("has_expense_table", has_expense.as_str());
    vars.insert("has_mileage_table", has_mileage.as_str());
    vars.insert("has_summary_section", has_summary.as_str());
    vars.insert("complexity", analysis.complexity.as_str());

    let parsed = ai
        .generate_text(PromptId::GenerateSchema, &vars)
        .await
        .and_then(|text| extract_json_object::<TemplateSchema>(&text));

    let mut schema = match parsed {
        Ok(schema) => schema,
        Err(e) => {
            warn!(error = %e, "Schema generation failed, using fallback schema");
            return fallback_schema(analysis);
        }
    };

    let known = |name: &String| analysis.variables.contains_key(name);
    schema.required_fields.retain(known);
    schema.dynamic_content.retain(known);
    schema.data_structure.single_values.retain(known);

    if !analysis.variables.is_empty()
        && schema.required_fields.is_empty()
        && schema.dynamic_content.is_empty()
    {
        warn!("Schema answer referenced no template variables, using fallback schema");
        return fallback_schema(analysis);
    }

    schema.source = SchemaSource::Ai;
    info!(
        required = schema.required_fields.len(),
        dynamic = schema.dynamic_content.len(),
        "Generated template schema"
    );
    schema
}

/// Figures the prose generator may talk about
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentAggregates {
    pub trip_name: Option<String>,
    /// Human-readable covered period, empty when unknown
    pub period: String,
    pub currency: String,
    pub expense_count: usize,
    pub expense_total: f64,
    pub mileage_count: usize,
    pub total_distance: f64,
    pub mileage_total: f64,
    /// Per-category totals, largest first
    pub categories: Vec<(ExpenseType, f64)>,
    pub sample_descriptions: Vec<String>,
}

impl ContentAggregates {
    pub fn from_records(
        expenses: &[Expense],
        mileage: &[MileageRecord],
        trip_name: Option<&str>,
        period: &str,
        currency: &str,
    ) -> Self {
        let mut by_type: HashMap<ExpenseType, f64> = HashMap::new();
        for e in expenses {
            *by_type.entry(e.expense_type).or_default() += e.amount;
        }
        let mut categories: Vec<(ExpenseType, f64)> = by_type.into_iter().collect();
        categories.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.as_str().cmp(b.0.as_str())));

        let sample_descriptions = expenses
            .iter()
            .map(|e| match e.description.as_deref().map(str::trim) {
                Some(d) if !d.is_empty() => d.to_string(),
                _ => format!("{} at {}", e.expense_type.label().to_lowercase(), e.vendor),
            })
            .take(3)
            .collect();

        Self {
            trip_name: trip_name.map(str::to_string),
            period: period.to_string(),
            currency: currency.to_string(),
            expense_count: expenses.len(),
            expense_total: total(expenses.iter().map(|e| e.amount)),
            mileage_count: mileage.len(),
            total_distance: total(mileage.iter().map(|m| m.distance)),
            mileage_total: total(mileage.iter().map(|m| m.cost)),
            categories,
            sample_descriptions,
        }
    }

    pub fn grand_total(&self) -> f64 {
        self.expense_total + self.mileage_total
    }

    fn prompt_text(&self) -> String {
        let mut lines = Vec::new();
        if let Some(ref name) = self.trip_name {
            lines.push(format!("- Trip: {}", name));
        }
        if !self.period.is_empty() {
            lines.push(format!("- Period: {}", self.period));
        }
        lines.push(format!(
            "- Expenses: {} totaling {:.2} {}",
            self.expense_count, self.expense_total, self.currency
        ));
        lines.push(format!(
            "- Mileage: {} entries, {:.1} miles, cost {:.2} {}",
            self.mileage_count, self.total_distance, self.mileage_total, self.currency
        ));
        lines.push(format!("- Grand total: {:.2} {}", self.grand_total(), self.currency));
        for (kind, amount) in &self.categories {
            lines.push(format!("- Category {}: {:.2}", kind.label(), amount));
        }
        if !self.sample_descriptions.is_empty() {
            lines.push(format!(
                "- Sample expenses: {}",
                self.sample_descriptions.join("; ")
            ));
        }
        lines.join("\n")
    }
}

/// The three independently generated groups of dynamic fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentGroup {
    ReportSummary,
    CategoryAnalysis,
    DescriptionSummary,
}

impl ContentGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReportSummary => "report-summary",
            Self::CategoryAnalysis => "category-analysis",
            Self::DescriptionSummary => "description-summary",
        }
    }

    pub fn for_field(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.contains("category") || lower.contains("analysis") {
            Self::CategoryAnalysis
        } else if lower.contains("description") {
            Self::DescriptionSummary
        } else {
            Self::ReportSummary
        }
    }

    /// Prose used when the text service does not answer
    pub fn fallback_text(&self, agg: &ContentAggregates) -> String {
        match self {
            Self::ReportSummary => {
                if agg.expense_count == 0 && agg.mileage_count == 0 {
                    return "No expenses or mileage were recorded for this period.".to_string();
                }
                let subject = match agg.trip_name {
                    Some(ref name) => format!("The {} trip", name),
                    None => "This report".to_string(),
                };
                format!(
                    "{} includes {} expenses totaling ${:.2} and {} mileage entries covering {:.1} miles (${:.2}), for a grand total of ${:.2}.",
                    subject,
                    agg.expense_count,
                    agg.expense_total,
                    agg.mileage_count,
                    agg.total_distance,
                    agg.mileage_total,
                    agg.grand_total()
                )
            }
            Self::CategoryAnalysis => match agg.categories.first() {
                Some((kind, amount)) if agg.expense_total > 0.0 => format!(
                    "The largest expense category is {} at ${:.2}, representing {:.0}% of total expenses.",
                    kind.label(),
                    amount,
                    amount / agg.expense_total * 100.0
                ),
                _ => "No expenses were recorded, so there is no category breakdown.".to_string(),
            },
            Self::DescriptionSummary => match agg.sample_descriptions.as_slice() {
                [] => "No expense descriptions are available.".to_string(),
                [only] => format!("Expenses include {}.", only),
                [init @ .., last] => format!("Expenses include {} and {}.", init.join(", "), last),
            },
        }
    }
}

/// Generate prose for every dynamic field
///
/// Fields are grouped, the groups are requested concurrently, and each group
/// keeps its fallback text when its own call fails.
pub async fn generate_dynamic_content(
    ai: Option<&AIClient>,
    fields: &[String],
    aggregates: &ContentAggregates,
) -> BTreeMap<String, String> {
    let mut content = BTreeMap::new();
    let mut groups: BTreeMap<&'static str, (ContentGroup, Vec<String>)> = BTreeMap::new();
    for field in fields {
        let group = ContentGroup::for_field(field);
        content.insert(field.clone(), group.fallback_text(aggregates));
        groups
            .entry(group.as_str())
            .or_insert_with(|| (group, Vec::new()))
            .1
            .push(field.clone());
    }

    let Some(ai) = ai else {
        return content;
    };

    let aggregates_text = aggregates.prompt_text();
    let empty = Vec::new();
    let fields_of = |group: ContentGroup| {
        groups
            .get(group.as_str())
            .map(|(_, f)| f)
            .unwrap_or(&empty)
    };

    let (summary, category, description) = tokio::join!(
        generate_group(ai, ContentGroup::ReportSummary, fields_of(ContentGroup::ReportSummary), &aggregates_text),
        generate_group(ai, ContentGroup::CategoryAnalysis, fields_of(ContentGroup::CategoryAnalysis), &aggregates_text),
        generate_group(ai, ContentGroup::DescriptionSummary, fields_of(ContentGroup::DescriptionSummary), &aggregates_text),
    );

    for generated in [summary, category, description] {
        content.extend(generated);
    }
    content
}

async fn generate_group(
    ai: &AIClient,
    group: ContentGroup,
    fields: &[String],
    aggregates_text: &str,
) -> BTreeMap<String, String> {
    if fields.is_empty() {
        return BTreeMap::new();
    }

    let field_list = fields
        .iter()
        .map(|f| format!("- {}", f))
        .collect::<Vec<_>>()
        .join("\n");
    let mut vars = HashMap::new();
    vars.insert("group", group.as_str());
    vars.insert("fields", field_list.as_str());
    vars.insert("aggregates", aggregates_text);

    let parsed = ai
        .generate_text(PromptId::GenerateContent, &vars)
        .await
        .and_then(|text| extract_json_object::<HashMap<String, Value>>(&text));

    match parsed {
        Ok(answer) => {
            let generated: BTreeMap<String, String> = fields
                .iter()
                .filter_map(|f| {
                    let text = answer.get(f)?.as_str()?.trim();
                    (!text.is_empty()).then(|| (f.clone(), text.to_string()))
                })
                .collect();
            debug!(group = group.as_str(), generated = generated.len(), "Generated dynamic content");
            generated
        }
        Err(e) => {
            warn!(group = group.as_str(), error = %e, "Content generation failed, keeping fallback text");
            BTreeMap::new()
        }
    }
}
