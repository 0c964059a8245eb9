use crate::{
    compute::Invoices,
    read::{read_bookings, ReadSummary},
    schema::{Grouping, Schema},
    write::{write_groups, write_single},
};
use anyhow::Context;
use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Summary {
    pub read: ReadSummary,
    pub invoices: usize,
    pub written: Vec<PathBuf>,
    pub failed: usize,
}

/// Reads the whole export at `input`, then writes the invoices to `output`: a directory
/// for grouped schemas, a file otherwise.
pub(crate) fn convert(
    input: &Path,
    output: &Path,
    schema: &Schema,
) -> Result<Summary, anyhow::Error> {
    let file = File::open(input).with_context(|| format!("can't open {}", input.display()))?;
    let mut invoices = Invoices::new(schema);
    let read = read_bookings(BufReader::new(file), &schema.columns, &mut invoices)
        .with_context(|| format!("can't read {}", input.display()))?;

    let (written, failed) = match schema.grouping {
        Grouping::Single => {
            write_single(output, schema, invoices.lines())?;
            (vec![output.to_path_buf()], 0)
        }
        Grouping::ByListing => {
            std::fs::create_dir_all(output)
                .with_context(|| format!("can't create directory {}", output.display()))?;
            let summary = write_groups(output, schema, invoices.groups());
            if summary.written.is_empty() && summary.failed > 0 {
                anyhow::bail!("none of the {} listings could be written", summary.failed);
            }
            (summary.written, summary.failed)
        }
    };
    Ok(Summary {
        read,
        invoices: invoices.invoices,
        written,
        failed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Variant;

    const EXPORT: &str = "\
Date,Arriving by date,Type,Confirmation Code,Booking date,Start Date,End date,Nights,Guest,Listing,Details,Reference code,Currency,Amount,Paid Out,Service fee,Fast pay fee,Cleaning fee,Gross Earnings,Occupancy taxes,Earnings year
01/05/2023,,Reservation,ABC123,12/20/2022,01/05/2023,01/07/2023,2,Jane Doe,Blue House,,,USD,100,,10,,20,130,,2023

01/06/2023,01/06/2023,Payout,,,,,,,,Transfer to ****1234,,USD,,100,,,,,,
01/09/2023,,Reservation,XYZ789,12/22/2022,01/09/2023,01/12/2023,3,John Roe,Red Loft,,,USD,270,,15,,30,300,,2023
01/10/2023,,Reservation,BAD000,12/22/2022,01/10/2023,01/12/2023,2,Bad Amount,Red Loft,,,USD,oops,,15,,30,300,,2023
01/11/2023,,Reservation,DEF456,12/23/2022,01/11/2023,01/13/2023,2,Ann Poe,Blue House,,,USD,150.50,,12.25,,25,175,,2023
";

    fn export(dir: &Path) -> PathBuf {
        let path = dir.join("export.csv");
        std::fs::write(&path, EXPORT).unwrap();
        path
    }

    #[test]
    fn convert_by_listing() {
        let dir = tempfile::tempdir().unwrap();
        let input = export(dir.path());
        let out = dir.path().join("out");
        let summary = convert(&input, &out, &Schema::default()).unwrap();
        assert_eq!(
            summary.read,
            ReadSummary {
                rows: 5,
                malformed: 0,
                rejected: 1
            }
        );
        assert_eq!(summary.invoices, 3);
        assert_eq!(summary.failed, 0);
        assert_eq!(
            summary.written,
            [out.join("Blue_House.csv"), out.join("Red_Loft.csv")]
        );

        let blue = std::fs::read_to_string(out.join("Blue_House.csv")).unwrap();
        let rows: Vec<_> = blue.lines().collect();
        assert_eq!(rows.len(), 7);
        assert_eq!(
            rows[1],
            "ABC123_2023-01-05,,Airbnb,2023-01-05,2023-01-05,Jane Doe,,[AIRBNB] Airbnb Rental,200000 Rental Income,1,Unit(s),90,No VAT (Sales),Blue House,USD"
        );
        assert_eq!(
            rows[2],
            ",,,,,,,[HOST] Hosting Fee,210000 Hosting Fee,1,Unit(s),-10,No VAT (Sales),,"
        );
        assert_eq!(
            rows[3],
            ",,,,,,,[CLEANING] Cleaning Fee,200005 Cleaning Services Income,1,Unit(s),20,No VAT (Sales),,"
        );
        // 150.50 + 12.25 - 25
        assert!(rows[4].starts_with("DEF456_2023-01-11,"));
        assert!(rows[4].contains(",137.75,"));

        let red = std::fs::read_to_string(out.join("Red_Loft.csv")).unwrap();
        assert_eq!(red.lines().count(), 4);
        assert!(!red.contains("BAD000"));
    }

    #[test]
    fn convert_single_nightly() {
        let dir = tempfile::tempdir().unwrap();
        let input = export(dir.path());
        let out = dir.path().join("all.csv");
        let schema = Schema {
            nightly_rental: true,
            ..Variant::Single.schema()
        };
        let summary = convert(&input, &out, &schema).unwrap();
        assert_eq!(summary.written, [out.clone()]);
        let all = std::fs::read_to_string(&out).unwrap();
        let rows: Vec<_> = all.lines().collect();
        assert_eq!(rows.len(), 1 + 9);
        // 90 over 2 nights, then 255 over 3 nights
        assert!(rows[1].contains(",2,Unit(s),45,"));
        assert!(rows[4].starts_with("XYZ789_2023-01-09,"));
        assert!(rows[4].contains(",3,Unit(s),85,"));
    }

    #[test]
    fn convert_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let input = export(dir.path());
        let out = dir.path().join("out");
        convert(&input, &out, &Schema::default()).unwrap();
        let first = std::fs::read(out.join("Blue_House.csv")).unwrap();
        convert(&input, &out, &Schema::default()).unwrap();
        let second = std::fs::read(out.join("Blue_House.csv")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn missing_input_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let result = convert(
            &dir.path().join("nope.csv"),
            &dir.path().join("out"),
            &Schema::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn no_reservation_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("export.csv");
        std::fs::write(&input, "Date,Type,Listing\n01/06/2023,Payout,\n").unwrap();
        let out = dir.path().join("out");
        let summary = convert(&input, &out, &Schema::default()).unwrap();
        assert!(summary.written.is_empty());
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn listings_with_same_file_name_share_it() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("export.csv");
        std::fs::write(
            &input,
            "\
Date,Type,Confirmation Code,Listing,Amount
01/05/2023,Reservation,A,Blue House,1
01/06/2023,Reservation,B,Blue_House,2
",
        )
        .unwrap();
        let out = dir.path().join("out");
        let summary = convert(&input, &out, &Schema::default()).unwrap();
        assert_eq!(summary.written, [out.join("Blue_House.csv")]);
        assert_eq!(summary.failed, 0);
        let blue = std::fs::read_to_string(out.join("Blue_House.csv")).unwrap();
        let rows: Vec<_> = blue.lines().collect();
        assert_eq!(rows.len(), 7);
        assert!(rows[1].starts_with("A_2023-01-05,"));
        assert!(rows[4].starts_with("B_2023-01-06,"));
    }
}
