//! Quotation document rendering.
//!
//! The layout lives in a Tera template that produces Typst source. By
//! default ([`OutputFormat::Pdf`]) that source is compiled by the `typst`
//! binary and removed; [`OutputFormat::Typst`] keeps the source as the artifact.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tera::{Context, Tera};
use tracing::{debug, info, warn};

use crate::error::{QuotationError, Result};
use crate::format::{format_currency, format_quantity};
use crate::model::{CompanyProfile, Quotation, QuotationRequest};

// Embed template at compile time to ensure availability
pub const DEFAULT_TEMPLATE: &str = include_str!("../templates/quotation.tera");
const TEMPLATE_NAME: &str = "quotation.typ";

pub const TERMS: [&str; 5] = [
    "1. This quotation is valid for 30 days from the date of issue.",
    "2. Payment terms: 50% advance, 50% upon completion.",
    "3. GST will be charged as applicable.",
    "4. Delivery timeline will be confirmed upon order confirmation.",
    "5. Any additional requirements will be charged extra.",
];

pub const TABLE_HEADER: [&str; 5] = ["Sr No", "Description", "Quantity", "Rate", "Amount"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Typst source, for machines without the `typst` binary
    Typst,
    /// PDF compiled with the `typst` binary
    #[default]
    Pdf,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Typst => "typ",
            OutputFormat::Pdf => "pdf",
        }
    }
}

/// What to do when today's file for an identifier already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Replace the existing file
    #[default]
    Overwrite,
    /// Fail and leave the existing file alone
    Reject,
    /// Write `..._YYYYMMDD-2`, `-3`, ... instead
    Suffix,
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub output_dir: PathBuf,
    pub format: OutputFormat,
    pub on_collision: CollisionPolicy,
}

impl RenderOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            format: OutputFormat::default(),
            on_collision: CollisionPolicy::default(),
        }
    }
}

/// `{dir}/Quotation_{identifier}_{YYYYMMDD}.{ext}`
pub fn output_path(dir: &Path, identifier: &str, date: NaiveDate, format: OutputFormat) -> PathBuf {
    dir.join(format!(
        "Quotation_{}_{}.{}",
        identifier,
        date.format("%Y%m%d"),
        format.extension()
    ))
}

fn resolve_collision(path: PathBuf, policy: CollisionPolicy) -> Result<PathBuf> {
    if !path.exists() {
        return Ok(path);
    }
    match policy {
        CollisionPolicy::Overwrite => {
            warn!(path = %path.display(), "overwriting existing quotation");
            Ok(path)
        }
        CollisionPolicy::Reject => Err(QuotationError::OutputExists(path)),
        CollisionPolicy::Suffix => {
            let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
            let ext = path.extension().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
            let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
            let mut next_idx = 2;
            loop {
                let candidate = parent.join(format!("{stem}-{next_idx}.{ext}"));
                if !candidate.exists() {
                    return Ok(candidate);
                }
                next_idx += 1;
            }
        }
    }
}

// ==========================================
// Template context
// ==========================================

#[derive(Debug, Serialize)]
pub struct DetailLine {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct TableRow {
    pub sr_no: String,
    pub description: String,
    pub quantity: String,
    pub rate: String,
    pub amount: String,
}

/// Display-ready strings for the template; numbers are already formatted.
#[derive(Debug, Serialize)]
pub struct QuotationView {
    pub identifier: String,
    pub date: String,
    pub company_name: String,
    pub company_lines: Vec<String>,
    pub client_details: Vec<DetailLine>,
    pub header: [&'static str; 5],
    pub rows: Vec<TableRow>,
    /// Table row (0 = header) that carries the grand total.
    pub total_row: usize,
    pub total: String,
    pub terms: [&'static str; 5],
}

impl QuotationView {
    pub fn from_quotation(q: &Quotation) -> Self {
        let c = &q.company;
        let company_lines = [
            c.address.trim().to_string(),
            labelled("Phone", &c.phone),
            labelled("Email", &c.email),
            labelled("Website", &c.website),
            labelled("GST", &c.tax_id),
        ]
        .into_iter()
        .filter(|line| !line.is_empty())
        .collect();

        let client_details = vec![
            DetailLine { label: "Name:", value: q.client.name.clone() },
            DetailLine { label: "Address:", value: q.client.address.clone() },
            DetailLine { label: "Phone:", value: q.client.phone.clone() },
            DetailLine { label: "Email:", value: q.client.email.clone() },
        ];

        let rows: Vec<TableRow> = q
            .items
            .lines
            .iter()
            .map(|line| TableRow {
                sr_no: line.index.to_string(),
                description: line.description.clone(),
                quantity: format_quantity(line.quantity),
                rate: format_currency(line.rate),
                amount: format_currency(line.amount),
            })
            .collect();

        Self {
            identifier: q.identifier.clone(),
            date: q.issued_on.format("%d-%m-%Y").to_string(),
            company_name: c.name.trim().to_string(),
            company_lines,
            client_details,
            header: TABLE_HEADER,
            total_row: rows.len() + 1,
            rows,
            total: format_currency(q.items.total),
            terms: TERMS,
        }
    }
}

fn labelled(label: &str, value: &str) -> String {
    let value = value.trim();
    if value.is_empty() { String::new() } else { format!("{label}: {value}") }
}

/// Tera filter turning any value into a quoted Typst string literal.
fn typst_str_filter(value: &tera::Value, _args: &HashMap<String, tera::Value>) -> tera::Result<tera::Value> {
    let raw = match value {
        tera::Value::String(s) => s.clone(),
        tera::Value::Null => String::new(),
        other => other.to_string(),
    };
    Ok(tera::Value::String(typst_string_literal(&raw)))
}

pub fn typst_string_literal(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('"');
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

// ==========================================
// Renderer
// ==========================================

#[derive(Debug, Clone)]
pub struct Renderer {
    tera: Tera,
    typst_bin: PathBuf,
}

impl Renderer {
    pub fn new() -> Result<Self> {
        Self::with_template(DEFAULT_TEMPLATE)
    }

    pub fn with_template(source: &str) -> Result<Self> {
        let mut tera = Tera::default();
        tera.register_filter("typst_str", typst_str_filter);
        tera.add_raw_template(TEMPLATE_NAME, source)?;
        Ok(Self { tera, typst_bin: PathBuf::from("typst") })
    }

    pub fn from_template_file(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path).map_err(|e| QuotationError::fs(path, e))?;
        Self::with_template(&source)
    }

    pub fn with_typst_binary(mut self, bin: impl Into<PathBuf>) -> Self {
        self.typst_bin = bin.into();
        self
    }

    /// Typst source for a quotation, without touching the filesystem.
    pub fn render_source(&self, quotation: &Quotation) -> Result<String> {
        let view = QuotationView::from_quotation(quotation);
        let context = Context::from_serialize(&view)?;
        Ok(self.tera.render(TEMPLATE_NAME, &context)?)
    }

    /// Renders and writes the quotation, returning the path written.
    pub fn generate(&self, quotation: &Quotation, options: &RenderOptions) -> Result<PathBuf> {
        let source = self.render_source(quotation)?;

        let target = output_path(
            &options.output_dir,
            &quotation.identifier,
            quotation.issued_on,
            options.format,
        );
        let target = resolve_collision(target, options.on_collision)?;

        if options.format == OutputFormat::Pdf {
            self.ensure_typst()?;
        }

        fs::create_dir_all(&options.output_dir)
            .map_err(|e| QuotationError::fs(&options.output_dir, e))?;

        match options.format {
            OutputFormat::Typst => {
                fs::write(&target, source).map_err(|e| QuotationError::fs(&target, e))?;
            }
            OutputFormat::Pdf => {
                // An existing quotation is only replaced once the new one compiled.
                let typ_path = target.with_extension("source.typ");
                let partial = target.with_extension("partial.pdf");
                fs::write(&typ_path, source).map_err(|e| QuotationError::fs(&typ_path, e))?;
                let compiled = self.compile(&typ_path, &partial);
                fs::remove_file(&typ_path).ok();
                if let Err(e) = compiled {
                    fs::remove_file(&partial).ok();
                    return Err(e);
                }
                fs::rename(&partial, &target).map_err(|e| {
                    fs::remove_file(&partial).ok();
                    QuotationError::fs(&target, e)
                })?;
            }
        }

        info!(
            identifier = %quotation.identifier,
            rows = quotation.items.lines.len(),
            path = %target.display(),
            "quotation generated"
        );
        Ok(target)
    }

    fn ensure_typst(&self) -> Result<()> {
        match Command::new(&self.typst_bin).arg("--version").output() {
            Ok(out) if out.status.success() => Ok(()),
            _ => Err(QuotationError::TypstUnavailable),
        }
    }

    fn compile(&self, source: &Path, target: &Path) -> Result<()> {
        debug!(source = %source.display(), target = %target.display(), "compiling with typst");
        let output = Command::new(&self.typst_bin)
            .arg("compile")
            .arg(source)
            .arg(target)
            .output()
            .map_err(|_| QuotationError::TypstUnavailable)?;

        if !output.status.success() {
            return Err(QuotationError::Compile(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(())
    }
}

/// Validates, prices and renders in one call.
///
/// All validation runs before the first filesystem write, so a rejected
/// request never leaves a file behind.
pub fn generate_quotation(
    renderer: &Renderer,
    request: &QuotationRequest,
    company: &CompanyProfile,
    issued_on: NaiveDate,
    options: &RenderOptions,
) -> Result<PathBuf> {
    let quotation = Quotation::build(request, company, issued_on)?;
    renderer.generate(&quotation, options)
}
