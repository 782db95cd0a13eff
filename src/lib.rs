//! Priced quotations rendered to Typst/PDF documents.
//!
//! ```no_run
//! use chrono::Local;
//! use quotation_maker::{
//!     generate_quotation, ClientProfile, CompanyProfile, LineItem, QuotationRequest,
//!     RenderOptions, Renderer,
//! };
//!
//! let request = QuotationRequest {
//!     identifier: "QT2024001".into(),
//!     client: ClientProfile {
//!         name: "XYZ Corporation".into(),
//!         address: "456 Corporate Avenue".into(),
//!         phone: "+91 9876543210".into(),
//!         email: "contact@xyzcorp.com".into(),
//!     },
//!     items: vec![LineItem::new("Web Development Services", "1", "50000")],
//! };
//! let path = generate_quotation(
//!     &Renderer::new()?,
//!     &request,
//!     &CompanyProfile::default(),
//!     Local::now().date_naive(),
//!     &RenderOptions::new("quotations"),
//! )?;
//! println!("{}", path.display());
//! # Ok::<(), quotation_maker::QuotationError>(())
//! ```

pub mod error;
pub mod format;
pub mod model;
pub mod pricing;
pub mod render;
pub mod settings;

pub use error::{ItemField, QuotationError, SettingsError};
pub use format::format_currency;
pub use model::{ClientProfile, CompanyProfile, LineItem, PricedLine, Quotation, QuotationRequest};
pub use pricing::{price_items, PricedItems};
pub use render::{
    generate_quotation, output_path, CollisionPolicy, OutputFormat, RenderOptions, Renderer,
};
pub use settings::{AppSettings, SettingsStore};
