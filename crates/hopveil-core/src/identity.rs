//! Node identity abstractions
//!
//! The [`NodeIdentity`] trait lets the same routing and attack logic run
//! over letter-named scenario graphs ('A'..'Z') and large generated or
//! imported topologies keyed by integers or strings.

use std::fmt::{Debug, Display};
use std::hash::Hash;

use serde::{de::DeserializeOwned, Serialize};

/// Trait for node identity abstraction
///
/// `Ord` is required so searches break cost ties deterministically and
/// anonymity sets iterate in a stable order.
pub trait NodeIdentity:
    Clone + Eq + Ord + Hash + Send + Sync + Debug + Display + Serialize + DeserializeOwned + 'static
{
    /// Get a short display form (for logging)
    fn short_id(&self) -> String {
        format!("{}", self)
    }
}

impl NodeIdentity for char {}

impl NodeIdentity for u32 {}

impl NodeIdentity for u64 {}

impl NodeIdentity for String {
    fn short_id(&self) -> String {
        self.chars().take(8).collect()
    }
}
