use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use marketroles_core::{AggregateRoot, DomainError, DomainResult, ProcessId};

use crate::identifiers::{GlnNumber, Gsrn};

/// Kind of business process registered on an accounting point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessKind {
    MoveIn,
    ChangeOfSupplier,
}

impl core::fmt::Display for ProcessKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ProcessKind::MoveIn => f.write_str("move-in"),
            ProcessKind::ChangeOfSupplier => f.write_str("change of supplier"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    Pending,
    Effectuated,
}

/// A move-in or change of supplier registered against an accounting point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessProcess {
    pub process_id: ProcessId,
    pub kind: ProcessKind,
    pub energy_supplier: GlnNumber,
    pub effective_date: NaiveDate,
    pub status: ProcessStatus,
}

/// Aggregate root: AccountingPoint.
///
/// Persisted as a full snapshot. `version` is the snapshot version it was
/// loaded at and is only ever advanced by the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountingPoint {
    gsrn: Gsrn,
    energy_supplier: Option<GlnNumber>,
    processes: Vec<BusinessProcess>,
    version: u64,
}

impl AccountingPoint {
    /// A never-persisted accounting point without an energy supplier.
    pub fn new(gsrn: Gsrn) -> Self {
        Self {
            gsrn,
            energy_supplier: None,
            processes: Vec::new(),
            version: 0,
        }
    }

    pub fn with_energy_supplier(mut self, supplier: GlnNumber) -> Self {
        self.energy_supplier = Some(supplier);
        self
    }

    /// Stamp the snapshot version (repositories only).
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn gsrn(&self) -> &Gsrn {
        &self.gsrn
    }

    pub fn energy_supplier(&self) -> Option<&GlnNumber> {
        self.energy_supplier.as_ref()
    }

    pub fn processes(&self) -> &[BusinessProcess] {
        &self.processes
    }

    pub fn process(&self, process_id: &ProcessId) -> Option<&BusinessProcess> {
        self.processes.iter().find(|p| &p.process_id == process_id)
    }

    /// Whether a process of `kind` is registered for `date`, pending or
    /// already effectuated.
    pub fn has_process_on(&self, kind: ProcessKind, date: NaiveDate) -> bool {
        self.processes
            .iter()
            .any(|p| p.kind == kind && p.effective_date == date)
    }

    /// Register a pending business process.
    pub fn register_process(
        &mut self,
        process_id: ProcessId,
        kind: ProcessKind,
        energy_supplier: GlnNumber,
        effective_date: NaiveDate,
    ) -> DomainResult<()> {
        if self.process(&process_id).is_some() {
            return Err(DomainError::conflict(format!(
                "process {process_id} already registered on {}",
                self.gsrn
            )));
        }
        if self.has_process_on(kind, effective_date) {
            return Err(DomainError::invariant(format!(
                "a {kind} is already registered on {} for {effective_date}",
                self.gsrn
            )));
        }

        self.processes.push(BusinessProcess {
            process_id,
            kind,
            energy_supplier,
            effective_date,
            status: ProcessStatus::Pending,
        });
        Ok(())
    }

    /// Effectuate a pending process: its energy supplier becomes the
    /// accounting point's current supplier.
    pub fn effectuate(&mut self, process_id: &ProcessId) -> DomainResult<()> {
        let process = self
            .processes
            .iter_mut()
            .find(|p| &p.process_id == process_id)
            .ok_or_else(|| DomainError::not_found(format!("process {process_id}")))?;

        if process.status != ProcessStatus::Pending {
            return Err(DomainError::invariant(format!(
                "process {process_id} is not pending"
            )));
        }

        process.status = ProcessStatus::Effectuated;
        self.energy_supplier = Some(process.energy_supplier.clone());
        Ok(())
    }
}

impl AggregateRoot for AccountingPoint {
    type Id = Gsrn;

    fn id(&self) -> &Self::Id {
        &self.gsrn
    }

    fn version(&self) -> u64 {
        self.version
    }
}
