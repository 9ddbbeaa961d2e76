//! Converters for market violations.

use tracing::error;

use marketroles_core::Violation;
use marketroles_processes::{MarketViolation, ViolationKind};

use crate::error_message::OutboundErrorMessage;
use crate::registry::{ErrorConverterRegistry, RegistryError};

/// Registry with one converter per `ViolationKind`, checked for completeness.
pub fn market_error_converters() -> Result<ErrorConverterRegistry<MarketViolation>, RegistryError>
{
    let registry = ErrorConverterRegistry::new()
        .with(ViolationKind::InvalidAccountingPointId, invalid_accounting_point_id)?
        .with(ViolationKind::UnknownAccountingPoint, unknown_accounting_point)?
        .with(ViolationKind::InvalidGlnNumber, invalid_gln_number)?
        .with(ViolationKind::SenderMismatch, sender_mismatch)?
        .with(
            ViolationKind::BusinessProcessRegisteredOnSameDate,
            business_process_registered_on_same_date,
        )?
        .with(ViolationKind::MissingEnergySupplier, missing_energy_supplier)?
        .with(ViolationKind::BusinessProcessNotPending, business_process_not_pending)?
        .with(
            ViolationKind::BusinessProcessIdAlreadyRegistered,
            business_process_id_already_registered,
        )?
        .with(ViolationKind::BusinessProcessKindMismatch, business_process_kind_mismatch)?;

    registry.ensure_complete()?;
    Ok(registry)
}

/// Fallback for a converter handed a variant it does not own, which means it
/// was registered under the wrong kind. The answer still carries the right
/// code.
fn unexpected(violation: &MarketViolation) -> OutboundErrorMessage {
    error!(
        kind = ?violation.kind(),
        "converter registered under the wrong violation kind"
    );
    OutboundErrorMessage::new(violation.code(), violation.message())
}

fn invalid_accounting_point_id(violation: &MarketViolation) -> OutboundErrorMessage {
    let MarketViolation::InvalidAccountingPointId { accounting_point_id } = violation else {
        return unexpected(violation);
    };
    OutboundErrorMessage::new(
        violation.code(),
        format!("Accounting point id {accounting_point_id} is not a valid GSRN number"),
    )
}

fn unknown_accounting_point(violation: &MarketViolation) -> OutboundErrorMessage {
    let MarketViolation::UnknownAccountingPoint { accounting_point_id } = violation else {
        return unexpected(violation);
    };
    OutboundErrorMessage::new(
        violation.code(),
        format!("Accounting point {accounting_point_id} is not known"),
    )
}

fn invalid_gln_number(violation: &MarketViolation) -> OutboundErrorMessage {
    let MarketViolation::InvalidGlnNumber { gln } = violation else {
        return unexpected(violation);
    };
    OutboundErrorMessage::new(
        violation.code(),
        format!("Market participant id {gln} is not a valid GLN number"),
    )
}

fn sender_mismatch(violation: &MarketViolation) -> OutboundErrorMessage {
    let MarketViolation::SenderMismatch {
        sender,
        energy_supplier,
    } = violation
    else {
        return unexpected(violation);
    };
    OutboundErrorMessage::new(
        violation.code(),
        format!(
            "Sender {sender} is not authorized to act on behalf of energy supplier {energy_supplier}"
        ),
    )
}

fn business_process_registered_on_same_date(violation: &MarketViolation) -> OutboundErrorMessage {
    let MarketViolation::BusinessProcessRegisteredOnSameDate {
        process,
        accounting_point_id,
        effective_date,
    } = violation
    else {
        return unexpected(violation);
    };
    OutboundErrorMessage::new(
        violation.code(),
        format!(
            "A {process} is already registered on accounting point {accounting_point_id} effective {effective_date}"
        ),
    )
}

fn missing_energy_supplier(violation: &MarketViolation) -> OutboundErrorMessage {
    let MarketViolation::MissingEnergySupplier { accounting_point_id } = violation else {
        return unexpected(violation);
    };
    OutboundErrorMessage::new(
        violation.code(),
        format!("No energy supplier is associated with accounting point {accounting_point_id}"),
    )
}

fn business_process_not_pending(violation: &MarketViolation) -> OutboundErrorMessage {
    let MarketViolation::BusinessProcessNotPending {
        process_id,
        accounting_point_id,
    } = violation
    else {
        return unexpected(violation);
    };
    OutboundErrorMessage::new(
        violation.code(),
        format!("Business process {process_id} on accounting point {accounting_point_id} is not pending"),
    )
}

fn business_process_id_already_registered(violation: &MarketViolation) -> OutboundErrorMessage {
    let MarketViolation::BusinessProcessIdAlreadyRegistered {
        process_id,
        accounting_point_id,
    } = violation
    else {
        return unexpected(violation);
    };
    OutboundErrorMessage::new(
        violation.code(),
        format!("Business process id {process_id} is already in use on accounting point {accounting_point_id}"),
    )
}

fn business_process_kind_mismatch(violation: &MarketViolation) -> OutboundErrorMessage {
    let MarketViolation::BusinessProcessKindMismatch {
        process_id,
        accounting_point_id,
        expected,
        registered,
    } = violation
    else {
        return unexpected(violation);
    };
    OutboundErrorMessage::new(
        violation.code(),
        format!(
            "Business process {process_id} on accounting point {accounting_point_id} is a {registered}, not a {expected}"
        ),
    )
}
