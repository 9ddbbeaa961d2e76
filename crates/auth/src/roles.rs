use serde::{Deserialize, Serialize};

/// Market role an actor may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketRole {
    EnergySupplier,
    GridOperator,
    BalanceResponsibleParty,
    MeteredDataResponsible,
}

impl core::fmt::Display for MarketRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            MarketRole::EnergySupplier => "energy_supplier",
            MarketRole::GridOperator => "grid_operator",
            MarketRole::BalanceResponsibleParty => "balance_responsible_party",
            MarketRole::MeteredDataResponsible => "metered_data_responsible",
        };
        f.write_str(name)
    }
}
