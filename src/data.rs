use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{ser::SerializeStruct, Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Format of every date we write out.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One row of the vendor export, as raw text. Nothing is parsed at this stage: a missing
/// column simply gives an empty string, and amounts/dates are only interpreted when the
/// booking is turned into invoice lines (see `compute::transform`), so the coercion policy
/// lives in one place.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct Booking {
    pub date: String,
    pub kind: String,
    pub confirmation_code: String,
    pub guest: String,
    pub listing: String,
    pub currency: String,
    pub amount: String,
    pub service_fee: String,
    pub cleaning_fee: String,
    pub nights: String,
}

/// The line items a booking can be split into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum LineKind {
    Rental,
    ServiceFee,
    CleaningFee,
}

/// One row of the accounting import. The first line of an invoice (the "header" line)
/// carries the invoice identity; the following ones only carry a line item, so all the
/// `Option`s below are `None` on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InvoiceLine {
    pub id: Option<String>,
    pub name: Option<String>,
    pub partner: Option<String>,
    pub invoice_date: Option<NaiveDate>,
    pub invoice_date_due: Option<NaiveDate>,
    pub reference: Option<String>,
    pub activity_ids: Option<String>,
    pub product: String,
    pub account: String,
    pub quantity: Decimal,
    pub unit_of_measure: String,
    pub price_unit: Decimal,
    pub tax: String,
    pub listing: Option<String>,
    pub currency: Option<String>,
}

impl InvoiceLine {
    pub fn is_header(&self) -> bool {
        self.id.is_some()
    }
}

/// Output columns, named after the headers the accounting system expects. The same names
/// are used in schema files to declare which columns get written, and in which order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub(crate) enum Column {
    #[serde(rename = "id")]
    Id,
    #[serde(rename = "name")]
    Name,
    #[serde(rename = "partner_id")]
    Partner,
    #[serde(rename = "invoice_date")]
    InvoiceDate,
    #[serde(rename = "invoice_date_due")]
    InvoiceDateDue,
    #[serde(rename = "ref")]
    Reference,
    #[serde(rename = "activity_ids")]
    ActivityIds,
    #[serde(rename = "invoice_line_ids/product_id")]
    Product,
    #[serde(rename = "invoice_line_ids/account_id")]
    Account,
    #[serde(rename = "invoice_line_ids/quantity")]
    Quantity,
    #[serde(rename = "invoice_line_ids/product_uom_id")]
    UnitOfMeasure,
    #[serde(rename = "invoice_line_ids/price_unit")]
    PriceUnit,
    #[serde(rename = "invoice_line_ids/tax_ids")]
    Tax,
    #[serde(rename = "Listing")]
    Listing,
    #[serde(rename = "Currency")]
    Currency,
}

impl Column {
    pub const ALL: [Column; 15] = [
        Column::Id,
        Column::Name,
        Column::Partner,
        Column::InvoiceDate,
        Column::InvoiceDateDue,
        Column::Reference,
        Column::ActivityIds,
        Column::Product,
        Column::Account,
        Column::Quantity,
        Column::UnitOfMeasure,
        Column::PriceUnit,
        Column::Tax,
        Column::Listing,
        Column::Currency,
    ];

    pub fn header(self) -> &'static str {
        match self {
            Column::Id => "id",
            Column::Name => "name",
            Column::Partner => "partner_id",
            Column::InvoiceDate => "invoice_date",
            Column::InvoiceDateDue => "invoice_date_due",
            Column::Reference => "ref",
            Column::ActivityIds => "activity_ids",
            Column::Product => "invoice_line_ids/product_id",
            Column::Account => "invoice_line_ids/account_id",
            Column::Quantity => "invoice_line_ids/quantity",
            Column::UnitOfMeasure => "invoice_line_ids/product_uom_id",
            Column::PriceUnit => "invoice_line_ids/price_unit",
            Column::Tax => "invoice_line_ids/tax_ids",
            Column::Listing => "Listing",
            Column::Currency => "Currency",
        }
    }
}

/// Serialization proxy for an `InvoiceLine`: only the declared columns are emitted, in the
/// declared order. `None` fields end up as empty cells.
pub(crate) struct Projection<'a> {
    pub columns: &'a [Column],
    pub line: &'a InvoiceLine,
}

impl Serialize for Projection<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let line = self.line;
        let mut row = serializer.serialize_struct("InvoiceLine", self.columns.len())?;
        for &column in self.columns {
            let key = column.header();
            match column {
                Column::Id => row.serialize_field(key, &line.id)?,
                Column::Name => row.serialize_field(key, &line.name)?,
                Column::Partner => row.serialize_field(key, &line.partner)?,
                Column::InvoiceDate => row.serialize_field(key, &format_date(line.invoice_date))?,
                Column::InvoiceDateDue => {
                    row.serialize_field(key, &format_date(line.invoice_date_due))?
                }
                Column::Reference => row.serialize_field(key, &line.reference)?,
                Column::ActivityIds => row.serialize_field(key, &line.activity_ids)?,
                Column::Product => row.serialize_field(key, &line.product)?,
                Column::Account => row.serialize_field(key, &line.account)?,
                Column::Quantity => row.serialize_field(key, &line.quantity)?,
                Column::UnitOfMeasure => row.serialize_field(key, &line.unit_of_measure)?,
                Column::PriceUnit => row.serialize_field(key, &line.price_unit)?,
                Column::Tax => row.serialize_field(key, &line.tax)?,
                Column::Listing => row.serialize_field(key, &line.listing)?,
                Column::Currency => row.serialize_field(key, &line.currency)?,
            }
        }
        row.end()
    }
}

fn format_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|date| date.format(DATE_FORMAT).to_string())
}

/// Reasons a booking can't be turned into invoice lines. The row is skipped and the
/// run goes on.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("{field} is not a decimal amount: {value:?}")]
    InvalidAmount { field: &'static str, value: String },
    #[error("Unparseable date {0:?}")]
    InvalidDate(String),
    #[error("Nights count is zero, can't price the rental per night")]
    ZeroNights,
    #[error("Amount overflow while pricing the rental line")]
    Overflow,
}
