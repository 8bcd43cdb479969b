pub mod accounts;
pub mod metrics;

pub use accounts::{Account, AccountsStore, NewAccount, count_accounts};
pub use metrics::{Activity, Metric, MetricsStore};

use serde::{Deserialize, Deserializer};

/// Read an explicit JSON `null` as the type's default, same as a missing field.
/// Use together with `#[serde(default)]`.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
