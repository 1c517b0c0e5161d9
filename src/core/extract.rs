//! Extract ingestion and row aggregation.
//!
//! The case system delivers a payment extract as five CSV files. They are loaded
//! verbatim into the `fineos_extract_*` tables, scoped to a new reference file,
//! and later regrouped per payment by [`ExtractData`].

use crate::{
    core::lookups::ReferenceFileType,
    entities::{
        VbiRequestedAbsence, Vpei, VpeiClaimDetails, VpeiPaymentDetails, VpeiPaymentLine,
        reference_file, vbi_requested_absence, vpei, vpei_claim_details, vpei_payment_details,
        vpei_payment_line,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::de::DeserializeOwned;
use std::{
    collections::HashMap,
    fmt,
    fs::File,
    io::Read,
    path::Path,
};

/// Payment header rows, one per payment. Required.
pub const VPEI_FILE: &str = "vpei.csv";
/// Pay period rows
pub const PAYMENT_DETAILS_FILE: &str = "vpei_paymentdetails.csv";
/// Amount lines of each pay period
pub const PAYMENT_LINE_FILE: &str = "vpei_paymentline.csv";
/// Absence case and leave request of each payment
pub const CLAIM_DETAILS_FILE: &str = "vpei_claimdetails.csv";
/// Leave requests, shared between payments
pub const REQUESTED_ABSENCE_FILE: &str = "vbi_requestedabsence.csv";

/// The case system's two-part identifier of a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CiIdentifier {
    /// Class id
    pub c: String,
    /// Index id
    pub i: String,
}

impl CiIdentifier {
    /// Creates an identifier from its two parts.
    #[must_use]
    pub fn new(c: impl Into<String>, i: impl Into<String>) -> Self {
        Self {
            c: c.into(),
            i: i.into(),
        }
    }
}

impl fmt::Display for CiIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C={},I={}", self.c, self.i)
    }
}

/// Deserializes every row of a CSV source, tolerating unknown columns.
pub fn read_csv_rows<T, R>(source: R) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    R: Read,
{
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(source)
        .into_deserialize()
        .map(|row| row.map_err(Error::from))
        .collect()
}

fn read_optional_file<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<Vec<T>> {
    let path = dir.join(name);
    if !path.exists() {
        tracing::warn!(file = %path.display(), "Extract file absent, treating as empty");
        return Ok(Vec::new());
    }
    read_csv_rows(File::open(path)?)
}

/// Builds the staging `ActiveModel` for one extract row.
macro_rules! staged_row {
    ($module:ident, $row:ident, $reference_file_id:expr, [$($field:ident),+ $(,)?]) => {
        $module::ActiveModel {
            reference_file_id: Set($reference_file_id),
            $($field: Set($row.$field),)+
            ..Default::default()
        }
    };
}

/// Loads an extract directory into the staging tables under a new reference file.
///
/// `vpei.csv` must exist; the other files may be absent.
pub async fn load_extract_directory<C>(
    db: &C,
    dir: &Path,
    now: DateTime<Utc>,
) -> Result<reference_file::Model>
where
    C: ConnectionTrait,
{
    let vpei_path = dir.join(VPEI_FILE);
    if !vpei_path.exists() {
        return Err(Error::MissingFile {
            path: vpei_path.display().to_string(),
        });
    }

    let headers: Vec<vpei::Model> = read_csv_rows(File::open(&vpei_path)?)?;
    let details: Vec<vpei_payment_details::Model> = read_optional_file(dir, PAYMENT_DETAILS_FILE)?;
    let lines: Vec<vpei_payment_line::Model> = read_optional_file(dir, PAYMENT_LINE_FILE)?;
    let claim_details: Vec<vpei_claim_details::Model> =
        read_optional_file(dir, CLAIM_DETAILS_FILE)?;
    let absences: Vec<vbi_requested_absence::Model> =
        read_optional_file(dir, REQUESTED_ABSENCE_FILE)?;

    let reference_file = reference_file::ActiveModel {
        file_location: Set(dir.display().to_string()),
        reference_file_type: Set(ReferenceFileType::PaymentExtract),
        created_at: Set(now),
        processed_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;
    let rf = reference_file.id;

    let header_count = headers.len();
    for row in headers {
        staged_row!(vpei, row, rf, [
            c, i, payeesocnumbe, paymentadd1, paymentadd2, paymentadd4, paymentadd6,
            paymentpostco, paymentmethod, paymentdate, amount_monamt, payeebanksort,
            payeeaccountn, payeeaccountt, eventtype, eventreason, payeeidentifi,
            payeefullname, amalgamationc,
        ])
        .insert(db)
        .await?;
    }
    for row in details {
        staged_row!(vpei_payment_details, row, rf, [
            peclassid, peindexid, c, i, paymentstartp, paymentendper,
            balancingamou_monamt, businessnetbe_monamt,
        ])
        .insert(db)
        .await?;
    }
    for row in lines {
        staged_row!(vpei_payment_line, row, rf, [
            c, i, amount_monamt, linetype, paymentdetailclassid, paymentdetailindexid,
            c_pymnteif_paymentlines, i_pymnteif_paymentlines,
        ])
        .insert(db)
        .await?;
    }
    for row in claim_details {
        staged_row!(vpei_claim_details, row, rf, [
            peclassid, peindexid, absencecasenu, leaverequesti,
        ])
        .insert(db)
        .await?;
    }
    for row in absences {
        staged_row!(vbi_requested_absence, row, rf, [
            leaverequest_id, leaverequest_decision, absence_casenumber,
            absencereason_coverage, absenceperiod_type, absenceperiod_start,
            absenceperiod_end,
        ])
        .insert(db)
        .await?;
    }

    tracing::info!(
        reference_file_id = rf,
        payments = header_count,
        "Loaded payment extract"
    );
    Ok(reference_file)
}

/// Every extract row belonging to one payment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentExtractRows {
    /// The payment row itself; absent when only child rows reference the key
    pub header: Option<vpei::Model>,
    /// Pay periods
    pub details: Vec<vpei_payment_details::Model>,
    /// Amount lines
    pub lines: Vec<vpei_payment_line::Model>,
    /// Claim link
    pub claim_details: Option<vpei_claim_details::Model>,
    /// Leave request found through the claim link
    pub requested_absence: Option<vbi_requested_absence::Model>,
}

/// All extract rows of one batch, indexed for per-payment aggregation.
#[derive(Debug, Default)]
pub struct ExtractData {
    /// Batch the rows were loaded from
    pub reference_file_id: i64,
    /// Distinct payment keys in extract order
    keys: Vec<CiIdentifier>,
    headers: HashMap<CiIdentifier, Vec<vpei::Model>>,
    details: HashMap<CiIdentifier, Vec<vpei_payment_details::Model>>,
    lines: HashMap<CiIdentifier, Vec<vpei_payment_line::Model>>,
    claim_details: HashMap<CiIdentifier, Vec<vpei_claim_details::Model>>,
    absences: HashMap<String, Vec<vbi_requested_absence::Model>>,
}

fn first_of<T>(rows: Option<&Vec<T>>, what: &str, key: &str) -> Option<T>
where
    T: Clone,
{
    let rows = rows?;
    if rows.len() > 1 {
        tracing::error!(
            key,
            count = rows.len(),
            "Multiple {what} rows found where one was expected, using the first"
        );
    }
    rows.first().cloned()
}

impl ExtractData {
    /// Reads every staged row of `reference_file_id`.
    pub async fn load<C>(db: &C, reference_file_id: i64) -> Result<Self>
    where
        C: ConnectionTrait,
    {
        let mut data = Self {
            reference_file_id,
            ..Default::default()
        };

        for row in Vpei::find()
            .filter(vpei::Column::ReferenceFileId.eq(reference_file_id))
            .order_by_asc(vpei::Column::Id)
            .all(db)
            .await?
        {
            let key = CiIdentifier::new(row.c.clone(), row.i.clone());
            let rows = data.headers.entry(key.clone()).or_default();
            if rows.is_empty() {
                data.keys.push(key);
            }
            rows.push(row);
        }

        for row in VpeiPaymentDetails::find()
            .filter(vpei_payment_details::Column::ReferenceFileId.eq(reference_file_id))
            .order_by_asc(vpei_payment_details::Column::Id)
            .all(db)
            .await?
        {
            let key = CiIdentifier::new(row.peclassid.clone(), row.peindexid.clone());
            data.details.entry(key).or_default().push(row);
        }

        for row in VpeiPaymentLine::find()
            .filter(vpei_payment_line::Column::ReferenceFileId.eq(reference_file_id))
            .order_by_asc(vpei_payment_line::Column::Id)
            .all(db)
            .await?
        {
            let (Some(c), Some(i)) = (&row.c_pymnteif_paymentlines, &row.i_pymnteif_paymentlines)
            else {
                tracing::warn!(c = %row.c, i = %row.i, "Payment line without owning payment");
                continue;
            };
            let key = CiIdentifier::new(c.clone(), i.clone());
            data.lines.entry(key).or_default().push(row);
        }

        for row in VpeiClaimDetails::find()
            .filter(vpei_claim_details::Column::ReferenceFileId.eq(reference_file_id))
            .order_by_asc(vpei_claim_details::Column::Id)
            .all(db)
            .await?
        {
            let key = CiIdentifier::new(row.peclassid.clone(), row.peindexid.clone());
            data.claim_details.entry(key).or_default().push(row);
        }

        for row in VbiRequestedAbsence::find()
            .filter(vbi_requested_absence::Column::ReferenceFileId.eq(reference_file_id))
            .order_by_asc(vbi_requested_absence::Column::Id)
            .all(db)
            .await?
        {
            if let Some(id) = row.leaverequest_id.clone() {
                data.absences.entry(id).or_default().push(row);
            }
        }

        Ok(data)
    }

    /// Distinct payment keys in extract order.
    #[must_use]
    pub fn payment_keys(&self) -> Vec<CiIdentifier> {
        self.keys.clone()
    }

    /// Gathers every row belonging to the payment `key`.
    #[must_use]
    pub fn aggregate(&self, key: &CiIdentifier) -> PaymentExtractRows {
        let record_key = key.to_string();
        let header = first_of(self.headers.get(key), "vpei", &record_key);

        let claim_details = first_of(self.claim_details.get(key), "claim details", &record_key);
        let requested_absence = claim_details
            .as_ref()
            .and_then(|cd| cd.leaverequesti.as_deref())
            .and_then(|id| first_of(self.absences.get(id), "requested absence", &record_key));

        PaymentExtractRows {
            header,
            details: self.details.get(key).cloned().unwrap_or_default(),
            lines: self.lines.get(key).cloned().unwrap_or_default(),
            claim_details,
            requested_absence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{setup_test_db, test_now, write_extract_dir, ExtractFixture};

    #[test]
    fn test_read_csv_rows_tolerates_extra_and_missing_columns() -> Result<()> {
        let data = "C,I,AMOUNT_MONAMT,SOMETHING_NEW\n7326,301,500.00,x\n";
        let rows: Vec<vpei::Model> = read_csv_rows(data.as_bytes())?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].c, "7326");
        assert_eq!(rows[0].amount_monamt.as_deref(), Some("500.00"));
        assert_eq!(rows[0].paymentmethod, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_vpei_file_is_structural_error() -> Result<()> {
        let db = setup_test_db().await?;
        let dir = tempfile::tempdir()?;
        let result = load_extract_directory(&db, dir.path(), test_now()).await;
        assert!(matches!(result, Err(Error::MissingFile { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_load_and_aggregate() -> Result<()> {
        let db = setup_test_db().await?;
        let dir = tempfile::tempdir()?;
        let fixture = ExtractFixture::standard("7326", "1001", "123456789");
        write_extract_dir(dir.path(), &[fixture])?;

        let reference_file = load_extract_directory(&db, dir.path(), test_now()).await?;
        assert_eq!(
            reference_file.reference_file_type,
            ReferenceFileType::PaymentExtract
        );

        let data = ExtractData::load(&db, reference_file.id).await?;
        let keys = data.payment_keys();
        assert_eq!(keys, vec![CiIdentifier::new("7326", "1001")]);

        let rows = data.aggregate(&keys[0]);
        assert!(rows.header.is_some());
        assert_eq!(rows.details.len(), 1);
        assert_eq!(rows.lines.len(), 1);
        assert!(rows.claim_details.is_some());
        assert_eq!(
            rows.requested_absence
                .and_then(|a| a.leaverequest_decision),
            Some("Approved".to_string())
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_aggregate_uses_first_duplicate_and_isolates_batches() -> Result<()> {
        let db = setup_test_db().await?;

        let first_dir = tempfile::tempdir()?;
        let fixture = ExtractFixture::standard("7326", "1002", "123456789");
        write_extract_dir(first_dir.path(), &[fixture.clone(), fixture.clone()])?;
        let first = load_extract_directory(&db, first_dir.path(), test_now()).await?;

        let second_dir = tempfile::tempdir()?;
        write_extract_dir(second_dir.path(), &[ExtractFixture::standard("7326", "2002", "123456789")])?;
        let second = load_extract_directory(&db, second_dir.path(), test_now()).await?;

        let data = ExtractData::load(&db, first.id).await?;
        let keys = data.payment_keys();
        assert_eq!(keys.len(), 1);
        let rows = data.aggregate(&keys[0]);
        assert!(rows.header.is_some());
        assert!(rows.claim_details.is_some());
        // Duplicate detail rows are all kept; they are distinct pay periods
        assert_eq!(rows.details.len(), 2);

        let other = ExtractData::load(&db, second.id).await?;
        assert_eq!(other.payment_keys(), vec![CiIdentifier::new("7326", "2002")]);
        Ok(())
    }

    #[tokio::test]
    async fn test_keys_keep_extract_order_and_first_header() -> Result<()> {
        let db = setup_test_db().await?;
        let dir = tempfile::tempdir()?;
        let first = ExtractFixture::standard("7326", "3001", "123456789");
        let second = ExtractFixture::standard("7326", "3000", "123456789");
        let mut repeat = first.clone();
        repeat.header.amount_monamt = Some("1.00".to_string());
        repeat.details.clear();
        repeat.lines.clear();
        repeat.claim_details = None;
        write_extract_dir(dir.path(), &[first, second, repeat])?;
        let reference_file = load_extract_directory(&db, dir.path(), test_now()).await?;

        let data = ExtractData::load(&db, reference_file.id).await?;
        assert_eq!(
            data.payment_keys(),
            vec![
                CiIdentifier::new("7326", "3001"),
                CiIdentifier::new("7326", "3000"),
            ]
        );
        let rows = data.aggregate(&CiIdentifier::new("7326", "3001"));
        assert_eq!(
            rows.header.and_then(|h| h.amount_monamt),
            Some("500.00".to_string())
        );
        Ok(())
    }

    #[test]
    fn test_aggregate_missing_key_is_empty() {
        let data = ExtractData::default();
        let rows = data.aggregate(&CiIdentifier::new("1", "2"));
        assert_eq!(rows, PaymentExtractRows::default());
    }
}
