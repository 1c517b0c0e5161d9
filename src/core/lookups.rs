//! Closed lookup enumerations.
//!
//! Every enumeration here has a stable integer id (persisted by `SeaORM` as an
//! integer column) and a human-readable description. The id and description
//! maps are generated together by [`lookup_enum!`] so they cannot drift apart.

/// Declares a lookup enum with an id <-> description bidirectional map.
macro_rules! lookup_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = ($id:tt, $desc:tt)
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            sea_orm::EnumIter,
            sea_orm::DeriveActiveEnum,
        )]
        #[sea_orm(rs_type = "i32", db_type = "Integer")]
        $vis enum $name {
            $(
                #[doc = $desc]
                $(#[$vmeta])*
                #[sea_orm(num_value = $id)]
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Stable integer id of the variant.
            #[must_use]
            pub const fn id(self) -> i32 {
                match self {
                    $(Self::$variant => $id,)+
                }
            }

            /// Human-readable description of the variant.
            #[must_use]
            pub const fn description(self) -> &'static str {
                match self {
                    $(Self::$variant => $desc,)+
                }
            }

            /// Looks a variant up by its integer id.
            #[must_use]
            pub fn from_id(id: i32) -> Option<Self> {
                Self::ALL.iter().copied().find(|v| v.id() == id)
            }

            /// Looks a variant up by its exact description.
            #[must_use]
            pub fn from_description(description: &str) -> Option<Self> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.description() == description)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.description())
            }
        }
    };
}

lookup_enum! {
    /// A state machine that state logs are recorded against.
    pub enum Flow {
        DelegatedPayment = (1, "Delegated payment"),
        DelegatedPeiWriteback = (2, "Delegated PEI writeback"),
        DelegatedEft = (3, "Delegated EFT"),
        CtrPayment = (4, "CTR payment"),
        VendorCheck = (5, "Vendor check"),
    }
}

lookup_enum! {
    /// End states recorded in the state log.
    pub enum State {
        PaymentReadyForAddressValidation = (100, "Payment ready for address validation"),
        DelegatedPaymentStagedForPaymentAuditReportSampling =
            (101, "Staged for payment audit report sampling"),
        DelegatedPaymentAddToPaymentAuditReport = (102, "Add to payment audit report"),
        DelegatedPaymentPaymentAuditReportSent = (103, "Payment audit report sent"),
        DelegatedPaymentValidated = (104, "Payment validated"),
        DelegatedPaymentAddToPaymentRejectReport = (105, "Add to payment reject report"),
        DelegatedPaymentAddToPaymentRejectReportRestartable =
            (106, "Add to payment reject report - restartable"),
        DelegatedPaymentAddToPaymentErrorReport = (107, "Add to payment error report"),
        DelegatedPaymentAddToPaymentErrorReportRestartable =
            (111, "Add to payment error report - restartable"),
        DelegatedPaymentProcessedCancellation = (108, "Processed - cancellation"),
        DelegatedPaymentProcessedZeroPayment = (109, "Processed - zero dollar payment"),
        DelegatedPaymentProcessedOverpayment = (110, "Processed - overpayment"),

        StateWithholdingReadyForProcessing = (120, "State withholding ready for processing"),
        StateWithholdingPendingAudit = (121, "State withholding pending audit"),
        StateWithholdingOrphanedPendingAudit = (122, "State withholding orphaned pending audit"),
        StateWithholdingSendFunds = (123, "State withholding send funds"),
        StateWithholdingError = (124, "State withholding error"),
        StateWithholdingErrorRestartable = (125, "State withholding error - restartable"),

        FederalWithholdingReadyForProcessing = (130, "Federal withholding ready for processing"),
        FederalWithholdingPendingAudit = (131, "Federal withholding pending audit"),
        FederalWithholdingOrphanedPendingAudit =
            (132, "Federal withholding orphaned pending audit"),
        FederalWithholdingSendFunds = (133, "Federal withholding send funds"),
        FederalWithholdingError = (134, "Federal withholding error"),
        FederalWithholdingErrorRestartable = (135, "Federal withholding error - restartable"),

        EmployerReimbursementReadyForProcessing =
            (140, "Employer reimbursement ready for processing"),
        EmployerReimbursementPendingAudit = (141, "Employer reimbursement pending audit"),
        EmployerReimbursementOrphanedPendingAudit =
            (142, "Employer reimbursement orphaned pending audit"),
        EmployerReimbursementReadyForPayment = (143, "Employer reimbursement ready for payment"),
        EmployerReimbursementError = (144, "Employer reimbursement error"),
        EmployerReimbursementErrorRestartable =
            (145, "Employer reimbursement error - restartable"),

        DelegatedAddToFineosWriteback = (200, "Add to FINEOS writeback"),

        DelegatedEftSendPrenote = (300, "EFT send prenote"),
        DelegatedEftPrenoteApproved = (301, "EFT prenote approved"),

        ConfirmPayment = (400, "Confirm payment"),
        AddToGaxErrorReport = (401, "Add to GAX error report"),
        PaymentDisbursementSent = (402, "Payment disbursement sent"),
        AddToPaymentReturnErrorReport = (403, "Add to payment return error report"),

        MmarsStatusConfirmed = (500, "MMARS status confirmed"),
        AddToVccErrorReport = (501, "Add to VCC error report"),
        VendorCodeConfirmed = (502, "Vendor customer code confirmed"),
        AddToVendorReturnErrorReport = (503, "Add to vendor return error report"),
    }
}

impl State {
    /// The flow this state belongs to.
    #[must_use]
    pub const fn flow(self) -> Flow {
        match self.id() {
            100..=199 => Flow::DelegatedPayment,
            200..=299 => Flow::DelegatedPeiWriteback,
            300..=399 => Flow::DelegatedEft,
            400..=499 => Flow::CtrPayment,
            _ => Flow::VendorCheck,
        }
    }

    /// Whether the pipeline retries a payment sitting in this state on the
    /// next run (the case system reissues it).
    #[must_use]
    pub const fn is_restartable(self) -> bool {
        matches!(
            self,
            Self::DelegatedPaymentAddToPaymentErrorReportRestartable
                | Self::DelegatedPaymentAddToPaymentRejectReportRestartable
                | Self::StateWithholdingErrorRestartable
                | Self::FederalWithholdingErrorRestartable
                | Self::EmployerReimbursementErrorRestartable
        )
    }

    /// Either payment error report state, restartable or not.
    #[must_use]
    pub const fn is_payment_error_report(self) -> bool {
        matches!(
            self,
            Self::DelegatedPaymentAddToPaymentErrorReport
                | Self::DelegatedPaymentAddToPaymentErrorReportRestartable
        )
    }
}

lookup_enum! {
    /// Kind of payment, as classified from the extract.
    pub enum PaymentTransactionType {
        Standard = (1, "Standard"),
        ZeroDollar = (2, "Zero Dollar"),
        Overpayment = (3, "Overpayment"),
        Cancellation = (4, "Cancellation"),
        Unknown = (5, "Unknown"),
        EmployerReimbursement = (6, "Employer Reimbursement"),
        OverpaymentActualRecovery = (7, "Overpayment Actual Recovery"),
        OverpaymentRecovery = (8, "Overpayment Recovery"),
        OverpaymentAdjustment = (9, "Overpayment Adjustment"),
        OverpaymentRecoveryReverse = (10, "Overpayment Recovery Reverse"),
        OverpaymentRecoveryCancellation = (11, "Overpayment Recovery Cancellation"),
        FederalTaxWithholding = (12, "Federal Tax Withholding"),
        StateTaxWithholding = (13, "State Tax Withholding"),
    }
}

impl PaymentTransactionType {
    /// Secondary payments tied to a primary standard payment.
    #[must_use]
    pub const fn is_split_payment(self) -> bool {
        matches!(
            self,
            Self::FederalTaxWithholding | Self::StateTaxWithholding | Self::EmployerReimbursement
        )
    }

    /// Payments that result in money leaving the program.
    #[must_use]
    pub const fn is_disbursable(self) -> bool {
        matches!(self, Self::Standard) || self.is_split_payment()
    }

    /// Overpayment and its recovery subtypes.
    #[must_use]
    pub const fn is_overpayment(self) -> bool {
        matches!(
            self,
            Self::Overpayment
                | Self::OverpaymentActualRecovery
                | Self::OverpaymentRecovery
                | Self::OverpaymentAdjustment
                | Self::OverpaymentRecoveryReverse
                | Self::OverpaymentRecoveryCancellation
        )
    }
}

lookup_enum! {
    /// Who a payment is ultimately for.
    pub enum PaymentRelevantParty {
        Claimant = (1, "Claimant"),
        ReimbursedEmployer = (2, "Reimbursed Employer"),
        StateTax = (3, "State Tax"),
        FederalTax = (4, "Federal Tax"),
    }
}

impl PaymentRelevantParty {
    /// Transaction type of a positive `PaymentOut` event for this party.
    #[must_use]
    pub const fn standard_transaction_type(self) -> PaymentTransactionType {
        match self {
            Self::Claimant => PaymentTransactionType::Standard,
            Self::ReimbursedEmployer => PaymentTransactionType::EmployerReimbursement,
            Self::StateTax => PaymentTransactionType::StateTaxWithholding,
            Self::FederalTax => PaymentTransactionType::FederalTaxWithholding,
        }
    }
}

lookup_enum! {
    /// Event types used by the case system on payment extract rows.
    pub enum PaymentEventType {
        PaymentOut = (1, "PaymentOut"),
        PaymentOutCancellation = (2, "PaymentOut Cancellation"),
        Overpayment = (3, "Overpayment"),
        OverpaymentActualRecovery = (4, "Overpayment Actual Recovery"),
        OverpaymentRecovery = (5, "Overpayment Recovery"),
        OverpaymentAdjustment = (6, "Overpayment Adjustment"),
        OverpaymentRecoveryReverse = (7, "Overpayment Recovery Reverse"),
        OverpaymentRecoveryCancellation = (8, "Overpayment Recovery Cancellation"),
    }
}

impl PaymentEventType {
    /// The overpayment subtype this event describes, if any.
    #[must_use]
    pub const fn overpayment_transaction_type(self) -> Option<PaymentTransactionType> {
        match self {
            Self::Overpayment => Some(PaymentTransactionType::Overpayment),
            Self::OverpaymentActualRecovery => {
                Some(PaymentTransactionType::OverpaymentActualRecovery)
            }
            Self::OverpaymentRecovery => Some(PaymentTransactionType::OverpaymentRecovery),
            Self::OverpaymentAdjustment => Some(PaymentTransactionType::OverpaymentAdjustment),
            Self::OverpaymentRecoveryReverse => {
                Some(PaymentTransactionType::OverpaymentRecoveryReverse)
            }
            Self::OverpaymentRecoveryCancellation => {
                Some(PaymentTransactionType::OverpaymentRecoveryCancellation)
            }
            Self::PaymentOut | Self::PaymentOutCancellation => None,
        }
    }
}

lookup_enum! {
    /// How a payment is disbursed.
    pub enum PaymentMethod {
        Ach = (1, "Elec Funds Transfer"),
        Check = (2, "Check"),
        Debit = (3, "Debit"),
    }
}

lookup_enum! {
    /// Kind of bank account behind an EFT record.
    pub enum BankAccountType {
        Checking = (1, "Checking"),
        Savings = (2, "Savings"),
    }
}

lookup_enum! {
    /// Prenote lifecycle of an EFT record.
    pub enum PrenoteState {
        PendingPrePub = (1, "Pending - PUB"),
        PendingWithPub = (2, "Pending with PUB"),
        Approved = (3, "Approved"),
        Rejected = (4, "Rejected"),
    }
}

/// Period status reported alongside a writeback transaction status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritebackPeriodStatus {
    /// The pay period is settled
    Active,
    /// The pay period waits on something outside the payment
    PendingActive,
}

impl WritebackPeriodStatus {
    /// Label used in the writeback file.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::PendingActive => "Pending Active",
        }
    }
}

lookup_enum! {
    /// Status reported back to the case system for a payment.
    pub enum WritebackStatus {
        FailedAutomatedValidation = (1, "Payment Validation Error"),
        DataIssueInSystem = (2, "Data Issue in System"),
        ExemptEmployer = (3, "Exempt Employer"),
        SelfReportedAdditionalIncome = (4, "Self-Reported Additional Income"),
        LeaveInReview = (5, "Leave Plan In Review"),
        PendingPrenote = (6, "Pending Prenote"),
        PrenoteError = (7, "Prenote Error"),
        Processed = (8, "Processed"),
        FailedManualValidation = (9, "Payment Audit Error"),
    }
}

impl WritebackStatus {
    /// Period status that accompanies this status in the writeback.
    #[must_use]
    pub const fn period_status(self) -> WritebackPeriodStatus {
        match self {
            Self::ExemptEmployer
            | Self::SelfReportedAdditionalIncome
            | Self::LeaveInReview
            | Self::PendingPrenote
            | Self::PrenoteError => WritebackPeriodStatus::PendingActive,
            Self::FailedAutomatedValidation
            | Self::DataIssueInSystem
            | Self::Processed
            | Self::FailedManualValidation => WritebackPeriodStatus::Active,
        }
    }
}

lookup_enum! {
    /// Kind of file a reference file row tracks.
    pub enum ReferenceFileType {
        PaymentExtract = (1, "Payment extract"),
        PaymentAuditReport = (2, "Payment audit report"),
        PaymentRejects = (3, "Payment rejects"),
        OutboundStatusReturn = (4, "Outbound status return"),
        OutboundVendorCustomerReturn = (5, "Outbound vendor customer return"),
        OutboundPaymentReturn = (6, "Outbound payment return"),
    }
}

lookup_enum! {
    /// Issues surfaced on the audit report for manual review.
    pub enum AuditReportType {
        DuaAdditionalIncome = (1, "DUA Additional Income"),
        DiaAdditionalIncome = (2, "DIA Additional Income"),
        DorFineosNameMismatch = (3, "DOR FINEOS Name Mismatch"),
        MaxWeeklyBenefitExceeded = (4, "Max Weekly Benefit Exceeded"),
    }
}

lookup_enum! {
    /// Case-system task types that matter to payment processing.
    pub enum ManualReviewTaskType {
        EmployeeReportedOtherIncome = (1, "Employee Reported Other Income"),
        EmployerReportedOtherIncome = (2, "Employer Reported Other Income"),
        OtherIncomeEligibility = (3, "Other Income - Eligibility"),
        IdentityReview = (4, "Identity Review"),
    }
}

impl ManualReviewTaskType {
    /// Tasks that block payment until additional income is reviewed.
    #[must_use]
    pub const fn is_income_task(self) -> bool {
        matches!(
            self,
            Self::EmployeeReportedOtherIncome
                | Self::EmployerReportedOtherIncome
                | Self::OtherIncomeEligibility
        )
    }
}

lookup_enum! {
    /// Shape of a requested absence.
    pub enum AbsencePeriodType {
        Continuous = (1, "Continuous"),
        Intermittent = (2, "Intermittent"),
        ReducedSchedule = (3, "Reduced Schedule"),
    }
}

impl AbsencePeriodType {
    /// Parses a case-system period type, accepting its legacy aliases.
    #[must_use]
    pub fn from_case_system(value: &str) -> Option<Self> {
        match value {
            "Time off period" => Some(Self::Continuous),
            "Episodic" => Some(Self::Intermittent),
            other => Self::from_description(other),
        }
    }
}

lookup_enum! {
    /// Leave type of a claim.
    pub enum ClaimType {
        Family = (1, "Family Leave"),
        Medical = (2, "Medical Leave"),
    }
}

lookup_enum! {
    /// Entity kind a state log row is attached to.
    pub enum AssociatedType {
        Payment = (1, "Payment"),
        Employee = (2, "Employee"),
    }
}

lookup_enum! {
    /// Kind of document sent to the comptroller, identified by its document code.
    pub enum DocumentKind {
        PaymentDocument = (1, "GAX"),
        VendorDocument = (2, "VCC"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_and_description_maps_are_inverse() {
        for state in State::ALL {
            assert_eq!(State::from_id(state.id()), Some(*state));
            assert_eq!(State::from_description(state.description()), Some(*state));
        }
        for kind in PaymentTransactionType::ALL {
            assert_eq!(PaymentTransactionType::from_id(kind.id()), Some(*kind));
        }
    }

    #[test]
    fn test_unknown_lookups() {
        assert_eq!(Flow::from_id(999), None);
        assert_eq!(PaymentMethod::from_description("Wire"), None);
        assert_eq!(
            PaymentMethod::from_description("Elec Funds Transfer"),
            Some(PaymentMethod::Ach)
        );
    }

    #[test]
    fn test_state_flows() {
        assert_eq!(
            State::DelegatedPaymentValidated.flow(),
            Flow::DelegatedPayment
        );
        assert_eq!(
            State::FederalWithholdingSendFunds.flow(),
            Flow::DelegatedPayment
        );
        assert_eq!(
            State::DelegatedAddToFineosWriteback.flow(),
            Flow::DelegatedPeiWriteback
        );
        assert_eq!(State::DelegatedEftSendPrenote.flow(), Flow::DelegatedEft);
        assert_eq!(State::ConfirmPayment.flow(), Flow::CtrPayment);
        assert_eq!(State::VendorCodeConfirmed.flow(), Flow::VendorCheck);
    }

    #[test]
    fn test_restartable_states() {
        assert!(State::DelegatedPaymentAddToPaymentErrorReportRestartable.is_restartable());
        assert!(!State::DelegatedPaymentAddToPaymentErrorReport.is_restartable());
        assert!(State::DelegatedPaymentAddToPaymentErrorReport.is_payment_error_report());
        assert!(
            State::DelegatedPaymentAddToPaymentErrorReportRestartable.is_payment_error_report()
        );
        assert!(!State::StateWithholdingErrorRestartable.is_payment_error_report());
        assert!(State::DelegatedPaymentAddToPaymentRejectReportRestartable.is_restartable());
        assert!(!State::DelegatedPaymentAddToPaymentRejectReport.is_restartable());
        assert!(!State::DelegatedPaymentStagedForPaymentAuditReportSampling.is_restartable());
    }

    #[test]
    fn test_absence_period_aliases() {
        assert_eq!(
            AbsencePeriodType::from_case_system("Episodic"),
            Some(AbsencePeriodType::Intermittent)
        );
        assert_eq!(
            AbsencePeriodType::from_case_system("Reduced Schedule"),
            Some(AbsencePeriodType::ReducedSchedule)
        );
        assert_eq!(AbsencePeriodType::from_case_system("Sabbatical"), None);
    }
}
