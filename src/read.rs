use crate::{
    data::{Booking, Error},
    schema::SourceColumns,
};
use csv::{StringRecord, Trim};
use log::{error, warn};

/// Trait for doing something with a `Booking` read from a CSV export. Used by the
/// `Invoices` accumulator, but also by mock tests to check what we get out of a CSV stream.
pub(crate) trait BookingUser {
    fn use_booking(&mut self, booking: Booking) -> Result<(), Error>;
}

/// What happened to the rows of an export.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReadSummary {
    pub rows: usize,
    /// Rows the CSV parser couldn't decode.
    pub malformed: usize,
    /// Rows the `BookingUser` refused.
    pub rejected: usize,
}

/// Where each `Booking` field sits in the export, resolved once from the header row.
/// A column the export doesn't have stays `None` and reads as an empty string.
struct Layout {
    date: Option<usize>,
    kind: Option<usize>,
    confirmation_code: Option<usize>,
    guest: Option<usize>,
    listing: Option<usize>,
    currency: Option<usize>,
    amount: Option<usize>,
    service_fee: Option<usize>,
    cleaning_fee: Option<usize>,
    nights: Option<usize>,
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    let position = headers.iter().position(|header| header == name);
    if position.is_none() {
        warn!("Column {name:?} not found in the export, reading it as empty");
    }
    position
}

impl Layout {
    fn resolve(headers: &StringRecord, columns: &SourceColumns) -> Self {
        let find = |name: &String| find_column(headers, name);
        Self {
            date: find(&columns.date),
            kind: find(&columns.kind),
            confirmation_code: find(&columns.confirmation_code),
            guest: find(&columns.guest),
            listing: find(&columns.listing),
            currency: find(&columns.currency),
            amount: find(&columns.amount),
            service_fee: find(&columns.service_fee),
            cleaning_fee: find(&columns.cleaning_fee),
            nights: find(&columns.nights),
        }
    }

    fn booking(&self, record: &StringRecord) -> Booking {
        let get = |index: Option<usize>| {
            index
                .and_then(|index| record.get(index))
                .unwrap_or_default()
                .to_owned()
        };
        Booking {
            date: get(self.date),
            kind: get(self.kind),
            confirmation_code: get(self.confirmation_code),
            guest: get(self.guest),
            listing: get(self.listing),
            currency: get(self.currency),
            amount: get(self.amount),
            service_fee: get(self.service_fee),
            cleaning_fee: get(self.cleaning_fee),
            nights: get(self.nights),
        }
    }
}

/// CSV importer for `Booking`s. Blank lines are ignored; rows that can't be decoded or that
/// the user refuses are logged and skipped. Only a failure to read the file at all (or its
/// header row) is returned as an error.
pub(crate) fn read_bookings<R: std::io::Read, U: BookingUser>(
    reader: R,
    columns: &SourceColumns,
    user: &mut U,
) -> Result<ReadSummary, anyhow::Error> {
    let mut rdr = csv::ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let layout = Layout::resolve(rdr.headers()?, columns);
    let mut summary = ReadSummary::default();
    for result in rdr.records() {
        summary.rows += 1;
        let record = match result {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                error!("Skipping malformed row: {e}");
                summary.malformed += 1;
                continue;
            }
        };
        let booking = layout.booking(&record);
        let code = booking.confirmation_code.clone();
        if let Err(e) = user.use_booking(booking) {
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            warn!("Booking {code:?} on line {line} skipped: {e}");
            summary.rejected += 1;
        }
    }
    Ok(summary)
}
