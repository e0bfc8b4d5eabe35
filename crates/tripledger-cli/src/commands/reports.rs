//! Report and template commands

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tripledger_core::ai::AIClient;
use tripledger_core::schema::generate_schema;
use tripledger_core::{
    analyze_template, Database, RecordFilter, ReportAssembler, RequestContext, TemplateSource,
    Workbook,
};

/// A remote URL or a local workbook path
pub fn template_source(template: &str) -> Result<TemplateSource> {
    if template.starts_with("http://") || template.starts_with("https://") {
        return Ok(TemplateSource::Url(template.to_string()));
    }
    let bytes = std::fs::read(template)
        .with_context(|| format!("Failed to read template {}", template))?;
    Ok(TemplateSource::Bytes(bytes))
}

/// Generate a report and write it to `output` (or a derived name in the
/// current directory); returns the written path
pub async fn cmd_report(
    db: &Database,
    ctx: &RequestContext,
    ai: Option<AIClient>,
    filter: RecordFilter,
    template: Option<&str>,
    output: Option<&Path>,
) -> Result<PathBuf> {
    println!("📊 Generating expense report...");

    let template = template.map(template_source).transpose()?;
    let report = ReportAssembler::new(db.clone())
        .with_ai(ai)
        .generate(ctx, filter, template)
        .await
        .context("Failed to generate report")?;

    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&report.filename));
    std::fs::write(&path, &report.bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("   Expenses: {}", report.expense_count);
    println!("   Mileage entries: {}", report.mileage_count);
    if report.template_used {
        let source = report.schema_source.unwrap_or_default();
        println!("   Template: filled (schema: {})", source.as_str());
    } else {
        println!("   Template: standard layout");
    }
    println!("✅ Report written to {}", path.display());

    Ok(path)
}

/// Print a template's variables, tables and generated schema
pub async fn cmd_analyze(file: &Path, ai: Option<&AIClient>) -> Result<()> {
    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let workbook = Workbook::from_bytes(&bytes).context("Not a readable xlsx workbook")?;

    let analysis = analyze_template(&workbook);
    let schema = generate_schema(ai, &analysis).await;

    println!("\n📋 Template: {}", file.display());
    println!("{}", "─".repeat(70));
    println!("  Sheets: {}", analysis.sheet_names.join(", "));
    println!("  Complexity: {}", analysis.complexity.as_str());
    println!(
        "  Tables: expenses={} mileage={} summary={}",
        analysis.has_expense_table, analysis.has_mileage_table, analysis.has_summary_section
    );

    println!("\n  Variables ({}):", analysis.variable_count());
    for (name, info) in &analysis.variables {
        println!(
            "    {{{{{}}}}}  {}  ×{}  {}",
            name,
            info.inferred_type.as_str(),
            info.count,
            info.locations.join(", ")
        );
    }

    println!("\n  Schema ({}):", schema.source.as_str());
    println!("    Required: {}", schema.required_fields.join(", "));
    if !schema.dynamic_content.is_empty() {
        println!("    Generated: {}", schema.dynamic_content.join(", "));
    }
    if !schema.data_structure.tables.is_empty() {
        println!("    Tables: {}", schema.data_structure.tables.join(", "));
    }
    println!();

    Ok(())
}
