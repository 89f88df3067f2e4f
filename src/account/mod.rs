//! Account records as the coordinator reports them, and the lookup seam the
//! atomic group builder resolves indexes and nonces through.

pub mod lookup;
pub mod model;

pub use lookup::{find_token_account, AccountLookup, AccountOwner, ResolvedAccount};
pub use model::{Account, AccountApiResponse, Token, TokensApiResponse};
