use crate::{
    data::{Booking, Error, InvoiceLine, LineKind, DATE_FORMAT},
    read::BookingUser,
    schema::{Grouping, LineSpec, Schema},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Date formats found in exports: ISO, and the US format the vendor uses by default.
const INPUT_DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

fn parse_date(value: &str) -> Result<NaiveDate, Error> {
    INPUT_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .ok_or_else(|| Error::InvalidDate(value.to_owned()))
}

/// A blank cell counts as zero (exports leave fees empty when there are none), anything
/// else must be a decimal number.
fn parse_amount(field: &'static str, value: &str) -> Result<Decimal, Error> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(Decimal::ZERO);
    }
    value.parse().map_err(|_| Error::InvalidAmount {
        field,
        value: value.to_owned(),
    })
}

/// Quantity and unit price of the rental line: the gross amount plus the service fee minus
/// the cleaning fee (billed on its own line), either as one unit or spread over the nights.
fn rental_pricing(
    schema: &Schema,
    booking: &Booking,
    amount: Decimal,
    service_fee: Decimal,
    cleaning_fee: Decimal,
) -> Result<(Decimal, Decimal), Error> {
    let total = amount
        .checked_add(service_fee)
        .and_then(|total| total.checked_sub(cleaning_fee))
        .ok_or(Error::Overflow)?;
    if !schema.nightly_rental {
        return Ok((Decimal::ONE, total));
    }
    let nights = parse_amount("nights", &booking.nights)?;
    if nights.is_zero() {
        return Err(Error::ZeroNights);
    }
    let per_night = total.checked_div(nights).ok_or(Error::Overflow)?;
    Ok((nights, per_night))
}

fn line_item(
    schema: &Schema,
    spec: &LineSpec,
    quantity: Decimal,
    price_unit: Decimal,
) -> InvoiceLine {
    InvoiceLine {
        id: None,
        name: None,
        partner: None,
        invoice_date: None,
        invoice_date_due: None,
        reference: None,
        activity_ids: None,
        product: spec.product.clone(),
        account: spec.account.clone(),
        quantity: quantity.normalize(),
        unit_of_measure: schema.unit_of_measure.clone(),
        price_unit: price_unit.normalize(),
        tax: schema.tax.clone(),
        listing: None,
        currency: None,
    }
}

/// Turns one booking into the lines of one invoice, in the order the schema declares them.
/// The first line carries the invoice identity, the others are plain line items. Bookings
/// of another type than the accepted one give no line at all.
pub(crate) fn transform(schema: &Schema, booking: &Booking) -> Result<Vec<InvoiceLine>, Error> {
    if let Some(accepted) = &schema.accept_type {
        if booking.kind != *accepted {
            return Ok(Vec::new());
        }
    }
    let date = parse_date(&booking.date)?;
    let amount = parse_amount("amount", &booking.amount)?;
    let service_fee = parse_amount("service fee", &booking.service_fee)?;
    let cleaning_fee = parse_amount("cleaning fee", &booking.cleaning_fee)?;

    let mut lines = Vec::with_capacity(schema.lines.len());
    for spec in &schema.lines {
        let (quantity, price_unit) = match spec.kind {
            LineKind::Rental => {
                rental_pricing(schema, booking, amount, service_fee, cleaning_fee)?
            }
            LineKind::ServiceFee => (Decimal::ONE, -service_fee),
            LineKind::CleaningFee => (Decimal::ONE, cleaning_fee),
        };
        lines.push(line_item(schema, spec, quantity, price_unit));
    }
    if let Some(header) = lines.first_mut() {
        header.id = Some(format!(
            "{}_{}",
            booking.confirmation_code,
            date.format(DATE_FORMAT)
        ));
        header.partner = Some(schema.partner.clone());
        header.invoice_date = Some(date);
        header.invoice_date_due = Some(date);
        header.reference = Some(booking.guest.clone());
        header.activity_ids = Some(String::new());
        header.listing = Some(booking.listing.clone());
        header.currency = Some(booking.currency.clone());
    }
    Ok(lines)
}

/// Turns a listing name into a file name. Only spaces are replaced: path separators and
/// other characters a file system may refuse are kept as they are.
pub(crate) fn file_name(label: &str, extension: &str) -> String {
    format!("{}.{extension}", label.replace(' ', "_"))
}

/// The invoice lines of one listing, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Group {
    pub label: String,
    pub lines: Vec<InvoiceLine>,
}

/// This is where invoice lines are accumulated while reading an export; nothing is written
/// before the whole export has been read. Depending on the schema, lines go either to the
/// group of their listing or to a single flat list.
#[derive(Debug)]
pub(crate) struct Invoices<'s> {
    schema: &'s Schema,
    groups: Vec<Group>,
    index: HashMap<String, usize>,
    lines: Vec<InvoiceLine>,
    pub invoices: usize,
}

impl<'s> Invoices<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            groups: Vec::new(),
            index: HashMap::new(),
            lines: Vec::new(),
            invoices: 0,
        }
    }

    /// Groups in order of first appearance of their file name.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Lines of the single output, for ungrouped schemas.
    pub fn lines(&self) -> &[InvoiceLine] {
        &self.lines
    }

    /// Appends the lines of one invoice. The batch goes as a whole to the group named by
    /// its header line. Listings that map to the same file name share one group, labelled
    /// after the first of them.
    pub fn push(&mut self, batch: Vec<InvoiceLine>) {
        let Some(header) = batch.first() else {
            return;
        };
        self.invoices += 1;
        match self.schema.grouping {
            Grouping::Single => self.lines.extend(batch),
            Grouping::ByListing => {
                let label = header.listing.clone().unwrap_or_default();
                let key = file_name(&label, &self.schema.extension);
                let groups = &mut self.groups;
                let position = *self.index.entry(key).or_insert_with(|| {
                    groups.push(Group {
                        label,
                        lines: Vec::new(),
                    });
                    groups.len() - 1
                });
                self.groups[position].lines.extend(batch);
            }
        }
    }
}

impl BookingUser for Invoices<'_> {
    fn use_booking(&mut self, booking: Booking) -> Result<(), Error> {
        let batch = transform(self.schema, &booking)?;
        self.push(batch);
        Ok(())
    }
}
