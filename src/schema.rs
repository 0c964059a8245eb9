use crate::data::{Column, LineKind};
use serde::Deserialize;

/// Names of the export's columns we read. Exports from different periods don't agree on
/// all of them (the service fee was once called "Host fee" for instance), hence this table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub(crate) struct SourceColumns {
    pub date: String,
    #[serde(rename = "type")]
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

impl Default for SourceColumns {
    fn default() -> Self {
        Self {
            date: "Date".into(),
            kind: "Type".into(),
            confirmation_code: "Confirmation Code".into(),
            guest: "Guest".into(),
            listing: "Listing".into(),
            currency: "Currency".into(),
            amount: "Amount".into(),
            service_fee: "Service fee".into(),
            cleaning_fee: "Cleaning fee".into(),
            nights: "Nights".into(),
        }
    }
}

/// One line item of the generated invoices, with the product and account it is booked on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct LineSpec {
    pub kind: LineKind,
    pub product: String,
    pub account: String,
}

impl LineSpec {
    fn new(kind: LineKind, product: &str, account: &str) -> Self {
        Self {
            kind,
            product: product.into(),
            account: account.into(),
        }
    }

    fn rental() -> Self {
        Self::new(LineKind::Rental, "[AIRBNB] Airbnb Rental", "200000 Rental Income")
    }

    fn service_fee() -> Self {
        Self::new(LineKind::ServiceFee, "[HOST] Hosting Fee", "210000 Hosting Fee")
    }

    fn cleaning_fee() -> Self {
        Self::new(
            LineKind::CleaningFee,
            "[CLEANING] Cleaning Fee",
            "200005 Cleaning Services Income",
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Grouping {
    /// One file per listing, in an output directory.
    ByListing,
    /// Everything in one file.
    Single,
}

/// Everything that differs between the target formats we support. Deserializable so a
/// schema can be given as a JSON file; missing keys take the values of the default
/// (`listing`) variant.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub(crate) struct Schema {
    /// Only rows of this type produce invoices; `None` takes every row.
    pub accept_type: Option<String>,
    pub columns: SourceColumns,
    pub partner: String,
    pub unit_of_measure: String,
    pub tax: String,
    /// Line items of each invoice, the first one being the header line.
    pub lines: Vec<LineSpec>,
    /// Bill the rental line per night instead of as a single unit.
    pub nightly_rental: bool,
    pub output: Vec<Column>,
    pub grouping: Grouping,
    pub extension: String,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            accept_type: Some("Reservation".into()),
            columns: SourceColumns::default(),
            partner: "Airbnb".into(),
            unit_of_measure: "Unit(s)".into(),
            tax: "No VAT (Sales)".into(),
            lines: vec![
                LineSpec::rental(),
                LineSpec::service_fee(),
                LineSpec::cleaning_fee(),
            ],
            nightly_rental: false,
            output: Column::ALL.to_vec(),
            grouping: Grouping::ByListing,
            extension: "csv".into(),
        }
    }
}

impl Schema {
    pub fn from_json<R: std::io::Read>(reader: R) -> Result<Self, anyhow::Error> {
        let schema: Schema = serde_json::from_reader(reader)?;
        schema.check()?;
        Ok(schema)
    }

    fn check(&self) -> Result<(), anyhow::Error> {
        anyhow::ensure!(!self.lines.is_empty(), "schema declares no invoice line");
        anyhow::ensure!(!self.output.is_empty(), "schema declares no output column");
        anyhow::ensure!(!self.extension.is_empty(), "schema has an empty file extension");
        Ok(())
    }
}

/// The built-in schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum Variant {
    /// Rental, service fee and cleaning fee lines, one file per listing
    Listing,
    /// Like `listing`, but the rental is billed per night
    Nightly,
    /// Rental, service fee and cleaning fee lines, all in one file
    Single,
    /// Only the rental line, one file per listing
    Rental,
}

impl Variant {
    pub fn schema(self) -> Schema {
        let default = Schema::default();
        match self {
            Variant::Listing => default,
            Variant::Nightly => Schema {
                nightly_rental: true,
                ..default
            },
            Variant::Single => Schema {
                grouping: Grouping::Single,
                ..default
            },
            Variant::Rental => Schema {
                lines: vec![LineSpec::rental()],
                ..default
            },
        }
    }
}
