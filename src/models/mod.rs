mod cart;
mod checkout;
mod gallery;
mod hero;
mod product;
mod session;

pub use cart::*;
pub use checkout::*;
pub use gallery::*;
pub use hero::*;
pub use product::*;
pub use session::*;

use serde::{Deserialize, Deserializer};

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
