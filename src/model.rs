use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{QuotationError, Result};
use crate::pricing::PricedItems;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct CompanyProfile {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub website: String,
    #[serde(alias = "gst")] // company_details.json from older installs
    pub tax_id: String,
}

impl Default for CompanyProfile {
    fn default() -> Self {
        Self {
            name: "Your Company Name".into(),
            address: "Your Company Address".into(),
            phone: "Your Phone Number".into(),
            email: "your.email@example.com".into(),
            website: "www.yourcompany.com".into(),
            tax_id: "Your GST Number".into(),
        }
    }
}

impl CompanyProfile {
    /// Only the name is mandatory; blank contact lines are left out of the header.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(QuotationError::missing("company", "name"));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ClientProfile {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
}

impl ClientProfile {
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("name", &self.name),
            ("address", &self.address),
            ("phone", &self.phone),
            ("email", &self.email),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(QuotationError::missing("client", field));
            }
        }
        Ok(())
    }
}

/// One row as typed by the user; numbers are still text.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub description: String,
    #[serde(deserialize_with = "text_or_number")]
    pub quantity: String,
    #[serde(deserialize_with = "text_or_number")]
    pub rate: String,
}

// Request files may carry `"quantity": 2` as well as `"quantity": "2"`.
fn text_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(n) => n.to_string(),
    })
}

impl LineItem {
    pub fn new(
        description: impl Into<String>,
        quantity: impl Into<String>,
        rate: impl Into<String>,
    ) -> Self {
        Self { description: description.into(), quantity: quantity.into(), rate: rate.into() }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PricedLine {
    pub index: usize, // 1-based
    pub description: String,
    pub quantity: f64,
    pub rate: f64,
    pub amount: f64,
}

/// Everything a caller hands over for one generation call.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QuotationRequest {
    pub identifier: String,
    pub client: ClientProfile,
    pub items: Vec<LineItem>,
}

#[derive(Debug, Clone)]
pub struct Quotation {
    pub identifier: String,
    pub issued_on: NaiveDate,
    pub company: CompanyProfile,
    pub client: ClientProfile,
    pub items: PricedItems,
}

impl Quotation {
    /// Validates every input and prices the items. Nothing touches the disk here.
    pub fn build(
        request: &QuotationRequest,
        company: &CompanyProfile,
        issued_on: NaiveDate,
    ) -> Result<Self> {
        validate_identifier(&request.identifier)?;
        company.validate()?;
        request.client.validate()?;
        let items = crate::pricing::price_items(&request.items)?;

        Ok(Self {
            identifier: request.identifier.trim().to_string(),
            issued_on,
            company: company.clone(),
            client: request.client.clone(),
            items,
        })
    }
}

fn validate_identifier(identifier: &str) -> Result<()> {
    let id = identifier.trim();
    if id.is_empty() {
        return Err(QuotationError::missing("quotation", "identifier"));
    }
    if id.contains(['/', '\\']) || id == "." || id == ".." {
        return Err(QuotationError::InvalidIdentifier(id.to_string()));
    }
    Ok(())
}
