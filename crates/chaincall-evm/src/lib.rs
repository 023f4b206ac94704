//! chaincall-evm — contract invocation on top of chaincall-core connections.
//!
//! - [`ContractClient`]: `read` (sequenced `eth_call`) and `write`
//!   (preflight simulation, then `eth_sendTransaction`)
//! - [`RevertDecoder`]: `Error(string)`, `Panic(uint256)` and ABI custom errors
//! - [`abi`]: argument coercion and reply shaping
//! - [`convert`]: total conversions for raw reply values
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chaincall_core::{EndpointPool, ProviderCache};
//! use chaincall_evm::{ContractClient, ContractDescriptor};
//! use chaincall_http::HttpConnector;
//!
//! # async fn example(abi_json: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let connector = Arc::new(HttpConnector::new(Default::default())?);
//! let cache = Arc::new(ProviderCache::new(EndpointPool::public_defaults(), connector));
//! let token = ContractDescriptor::from_abi_json(
//!     "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48".parse()?,
//!     abi_json,
//!     1,
//! )?;
//! let client = ContractClient::new(token, cache, None);
//! let supply = client.read("totalSupply", &[]).await?;
//! println!("{supply}");
//! # Ok(())
//! # }
//! ```

pub mod abi;
pub mod contract;
pub mod convert;
pub mod decoder;
pub mod payload;
pub mod registry;
pub mod revert;

pub use contract::{ContractClient, ContractDescriptor, PendingSubmission};
pub use decoder::{DecodedRevert, RevertDecoder};
pub use registry::{ErrorParam, ErrorRegistry, ErrorSignature};
